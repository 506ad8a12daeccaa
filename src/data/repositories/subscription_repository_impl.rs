use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    config::IapReceiptConfig,
    data::{
        datasources::{
            apple_receipt_datasource::{AppleReceiptDatasource, AppleReceiptDatasourceImpl},
            unified_receipt_datasource::{
                UnifiedReceiptDatasource, UnifiedReceiptDatasourceImpl,
            },
        },
        models::{
            apple_receipt::{
                introductory_price_model::{IntroductoryPriceModel, JsonScalar},
                receipt_attribute_model::{
                    InAppAttributeType, ReceiptAttributeModel, ReceiptAttributeType,
                },
            },
            google_play::{
                developer_payload_model::UpdateSubscriptionMetadataModel,
                sku_details_model::SkuDetailsModel,
            },
        },
    },
    domain::{
        entities::{
            apple_receipt::{AppleInAppPurchaseReceipt, AppleReceipt, AppleStoreProductType},
            subscription_period::{parse_duration, SubscriptionPeriodUnit},
            subscription_source::{
                AppleIntroductoryOffer, GooglePlayPurchase, GooglePlaySkuDetails, Store,
                SubscriptionSource,
            },
            subscription_update::SubscriptionUpdateMetadata,
        },
        repositories::subscription_repository::SubscriptionRepository,
    },
    errors::IapReceiptError,
};

pub(crate) struct SubscriptionRepositoryImpl<A: AppleReceiptDatasource, U: UnifiedReceiptDatasource>
{
    apple_receipt_datasource: A,
    unified_receipt_datasource: U,
    require_receipt_creation_date: bool,
}

impl<A: AppleReceiptDatasource, U: UnifiedReceiptDatasource> SubscriptionRepository
    for SubscriptionRepositoryImpl<A, U>
{
    fn parse_apple_receipt(&self, receipt: &[u8]) -> Result<AppleReceipt, IapReceiptError> {
        let attributes = self
            .apple_receipt_datasource
            .parse_receipt_attributes(receipt)?;
        AppleReceipt::from_attributes(
            &self.apple_receipt_datasource,
            attributes,
            self.require_receipt_creation_date,
        )
    }

    fn parse_apple_receipt_base64(&self, receipt: &str) -> Result<AppleReceipt, IapReceiptError> {
        let bytes = self.unified_receipt_datasource.decode_apple_payload(receipt)?;
        self.parse_apple_receipt(&bytes)
    }

    fn receipt_store(&self, unified_receipt: Option<&str>) -> Result<Store, IapReceiptError> {
        let receipt = unified_receipt.ok_or(IapReceiptError::NullReceipt)?;
        let model = self.unified_receipt_datasource.parse_unified_receipt(receipt)?;
        model
            .store
            .as_deref()
            .map(Store::from_name)
            .ok_or(IapReceiptError::NullReceipt)
    }

    fn subscription_source(
        &self,
        unified_receipt: Option<&str>,
        product_id: Option<&str>,
        introductory_price_json: Option<&str>,
    ) -> Result<Option<SubscriptionSource>, IapReceiptError> {
        let receipt = unified_receipt.ok_or(IapReceiptError::NullReceipt)?;
        let model = self.unified_receipt_datasource.parse_unified_receipt(receipt)?;
        let (store, payload) = match (model.store, model.payload) {
            (Some(store), Some(payload)) => (Store::from_name(&store), payload),
            _ => return Err(IapReceiptError::NullReceipt),
        };

        match store {
            Store::GooglePlay => Ok(Some(SubscriptionSource::GooglePlay(
                self.google_play_purchase(&payload)?,
            ))),
            Store::AppleAppStore | Store::MacAppStore => {
                let product_id = product_id.ok_or(IapReceiptError::NullProductId)?;
                if payload.trim().is_empty() {
                    warn!("Apple receipt is empty; the app receipt must be refreshed first.");
                    return Ok(None);
                }
                let apple_receipt = self.parse_apple_receipt_base64(&payload)?;
                let Some(in_app) = apple_receipt.latest_receipt_for_product(product_id) else {
                    debug!(product_id, "Receipt holds no purchase of the product.");
                    return Ok(None);
                };
                let introductory_offer = introductory_price_json
                    .filter(|json| !json.trim().is_empty())
                    .map(|json| {
                        self.unified_receipt_datasource
                            .parse_introductory_price(json)
                            .map(AppleIntroductoryOffer::from_model)
                    })
                    .transpose()?;
                Ok(Some(SubscriptionSource::Apple {
                    receipt: in_app.clone(),
                    introductory_offer,
                }))
            }
            Store::AmazonAppStore => Ok(Some(SubscriptionSource::Amazon {
                product_id: product_id.map(str::to_string),
            })),
            Store::Other(store_name) => Ok(Some(SubscriptionSource::Unsupported { store_name })),
        }
    }
}

impl SubscriptionRepositoryImpl<AppleReceiptDatasourceImpl, UnifiedReceiptDatasourceImpl> {
    pub(crate) fn new(config: &IapReceiptConfig) -> Self {
        Self {
            apple_receipt_datasource: AppleReceiptDatasourceImpl::new(config.asn1_max_depth),
            unified_receipt_datasource: UnifiedReceiptDatasourceImpl::new(),
            require_receipt_creation_date: config.require_receipt_creation_date,
        }
    }
}

/// Repository backed by the built-in ASN.1 and JSON decoders. This is what
/// `IapReceiptUtil::new` uses.
pub struct DefaultSubscriptionRepository {
    inner: SubscriptionRepositoryImpl<AppleReceiptDatasourceImpl, UnifiedReceiptDatasourceImpl>,
}

impl DefaultSubscriptionRepository {
    pub fn new(config: &IapReceiptConfig) -> Self {
        Self {
            inner: SubscriptionRepositoryImpl::new(config),
        }
    }
}

impl SubscriptionRepository for DefaultSubscriptionRepository {
    fn parse_apple_receipt(&self, receipt: &[u8]) -> Result<AppleReceipt, IapReceiptError> {
        self.inner.parse_apple_receipt(receipt)
    }

    fn parse_apple_receipt_base64(&self, receipt: &str) -> Result<AppleReceipt, IapReceiptError> {
        self.inner.parse_apple_receipt_base64(receipt)
    }

    fn receipt_store(&self, unified_receipt: Option<&str>) -> Result<Store, IapReceiptError> {
        self.inner.receipt_store(unified_receipt)
    }

    fn subscription_source(
        &self,
        unified_receipt: Option<&str>,
        product_id: Option<&str>,
        introductory_price_json: Option<&str>,
    ) -> Result<Option<SubscriptionSource>, IapReceiptError> {
        self.inner
            .subscription_source(unified_receipt, product_id, introductory_price_json)
    }
}

impl<A: AppleReceiptDatasource, U: UnifiedReceiptDatasource> SubscriptionRepositoryImpl<A, U> {
    fn google_play_purchase(&self, payload: &str) -> Result<GooglePlayPurchase, IapReceiptError> {
        let (wrapper, purchase, developer_payload, sku_details) = self
            .unified_receipt_datasource
            .parse_google_play_payload(payload)?;
        let developer_payload = developer_payload.unwrap_or_default();
        let update_metadata = if developer_payload.is_updated {
            developer_payload
                .update_subscription_metadata
                .as_deref()
                .map(|metadata| self.unified_receipt_datasource.parse_update_metadata(metadata))
                .transpose()?
                .map(SubscriptionUpdateMetadata::from_model)
        } else {
            None
        };
        Ok(GooglePlayPurchase {
            sku_details: sku_details.map(GooglePlaySkuDetails::from_model),
            raw_sku_details: wrapper
                .sku_details
                .as_ref()
                .and_then(|list| list.first())
                .map(str::to_string),
            is_auto_renewing: purchase.auto_renewing,
            // Google reports milliseconds since the epoch; absent means zero.
            purchase_date: purchase.purchase_time.unwrap_or_default(),
            is_free_trial: developer_payload.is_free_trial,
            has_introductory_price_trial: developer_payload.has_introductory_price_trial,
            update_metadata,
        })
    }
}

impl AppleReceipt {
    fn from_attributes<A: AppleReceiptDatasource>(
        datasource: &A,
        attributes: Vec<ReceiptAttributeModel>,
        require_creation_date: bool,
    ) -> Result<Self, IapReceiptError> {
        let mut bundle_id = None;
        let mut app_version = None;
        let mut opaque_value = None;
        let mut sha1_hash = None;
        let mut creation_date = None;
        let mut has_creation_date = false;
        let mut in_app_purchase_receipts = Vec::new();
        let mut original_application_version = None;
        let mut expiration_date = None;

        for attribute in attributes {
            let Some(attribute_type) = ReceiptAttributeType::from_code(attribute.attribute_type)
            else {
                debug!(
                    attribute_type = attribute.attribute_type,
                    "Skipping unknown receipt attribute."
                );
                continue;
            };
            match attribute_type {
                ReceiptAttributeType::BundleId => {
                    bundle_id = Some(decode_string(datasource, &attribute)?)
                }
                ReceiptAttributeType::AppVersion => {
                    app_version = Some(decode_string(datasource, &attribute)?)
                }
                ReceiptAttributeType::OpaqueValue => opaque_value = Some(attribute.value),
                ReceiptAttributeType::Sha1Hash => sha1_hash = Some(attribute.value),
                ReceiptAttributeType::CreationDate => {
                    has_creation_date = true;
                    creation_date = decode_date(datasource, &attribute)?;
                }
                ReceiptAttributeType::InAppPurchaseReceipt => {
                    let in_app_attributes = datasource.parse_attribute_set(&attribute.value)?;
                    in_app_purchase_receipts.push(AppleInAppPurchaseReceipt::from_attributes(
                        datasource,
                        in_app_attributes,
                    )?);
                }
                ReceiptAttributeType::OriginalApplicationVersion => {
                    original_application_version = Some(decode_string(datasource, &attribute)?)
                }
                ReceiptAttributeType::ExpirationDate => {
                    expiration_date = decode_date(datasource, &attribute)?
                }
            }
        }

        if require_creation_date && !has_creation_date {
            return Err(IapReceiptError::MissingReceiptAttribute("creation_date"));
        }
        Ok(AppleReceipt {
            bundle_id: bundle_id.ok_or(IapReceiptError::MissingReceiptAttribute("bundle_id"))?,
            app_version: app_version
                .ok_or(IapReceiptError::MissingReceiptAttribute("app_version"))?,
            opaque_value: opaque_value
                .ok_or(IapReceiptError::MissingReceiptAttribute("opaque_value"))?,
            sha1_hash: sha1_hash.ok_or(IapReceiptError::MissingReceiptAttribute("sha1_hash"))?,
            creation_date,
            in_app_purchase_receipts,
            original_application_version,
            expiration_date,
        })
    }
}

impl AppleInAppPurchaseReceipt {
    fn from_attributes<A: AppleReceiptDatasource>(
        datasource: &A,
        attributes: Vec<ReceiptAttributeModel>,
    ) -> Result<Self, IapReceiptError> {
        let mut product_id = None;
        let mut quantity = 0;
        let mut transaction_id = None;
        let mut original_transaction_id = None;
        let mut purchase_date = None;
        let mut alternate_purchase_date = None;
        let mut original_purchase_date = None;
        let mut subscription_expiration_date = None;
        let mut cancellation_date = None;
        let mut web_order_line_item_id = None;
        let mut product_type = AppleStoreProductType::default();
        let mut is_free_trial = false;
        let mut is_introductory_price_period = false;

        for attribute in attributes {
            let Some(attribute_type) = InAppAttributeType::from_code(attribute.attribute_type)
            else {
                debug!(
                    attribute_type = attribute.attribute_type,
                    "Skipping unknown in-app receipt attribute."
                );
                continue;
            };
            match attribute_type {
                InAppAttributeType::Quantity => quantity = decode_integer(datasource, &attribute)?,
                InAppAttributeType::ProductId => {
                    product_id = Some(decode_string(datasource, &attribute)?)
                }
                InAppAttributeType::TransactionId => {
                    transaction_id = Some(decode_string(datasource, &attribute)?)
                }
                InAppAttributeType::PurchaseDate => {
                    purchase_date = decode_date(datasource, &attribute)?
                }
                InAppAttributeType::OriginalTransactionId => {
                    original_transaction_id = Some(decode_string(datasource, &attribute)?)
                }
                InAppAttributeType::OriginalPurchaseDate => {
                    original_purchase_date = decode_date(datasource, &attribute)?
                }
                InAppAttributeType::AlternatePurchaseDate => {
                    alternate_purchase_date = decode_date(datasource, &attribute)?
                }
                InAppAttributeType::SubscriptionExpirationDate => {
                    subscription_expiration_date = decode_date(datasource, &attribute)?
                }
                InAppAttributeType::WebOrderLineItemId => {
                    web_order_line_item_id = Some(decode_integer(datasource, &attribute)?)
                }
                InAppAttributeType::CancellationDate => {
                    cancellation_date = decode_date(datasource, &attribute)?
                }
                InAppAttributeType::ProductType => {
                    product_type =
                        AppleStoreProductType::from_code(decode_integer(datasource, &attribute)?)
                }
                InAppAttributeType::IsTrialPeriod => {
                    is_free_trial = decode_integer(datasource, &attribute)? == 1
                }
                InAppAttributeType::IsInIntroOfferPeriod => {
                    is_introductory_price_period = decode_integer(datasource, &attribute)? == 1
                }
            }
        }

        Ok(AppleInAppPurchaseReceipt {
            product_id: product_id.ok_or(IapReceiptError::MissingReceiptAttribute("product_id"))?,
            quantity,
            transaction_id: transaction_id
                .ok_or(IapReceiptError::MissingReceiptAttribute("transaction_id"))?,
            original_transaction_id,
            purchase_date: purchase_date
                .or(alternate_purchase_date)
                .ok_or(IapReceiptError::MissingReceiptAttribute("purchase_date"))?,
            original_purchase_date,
            subscription_expiration_date,
            cancellation_date,
            web_order_line_item_id,
            product_type,
            is_free_trial,
            is_introductory_price_period,
        })
    }
}

impl AppleIntroductoryOffer {
    fn from_model(m: IntroductoryPriceModel) -> Self {
        let price = [&m.introductory_price, &m.introductory_price_locale]
            .into_iter()
            .flatten()
            .map(JsonScalar::to_text)
            .collect::<String>();
        if price.is_empty() {
            return Self::not_available();
        }
        let parsed = (|| {
            Some((
                scalar_or_zero(&m.introductory_price_number_of_periods)?,
                scalar_or_zero(&m.number_of_units)?,
                scalar_or_zero(&m.unit)?,
            ))
        })();
        match parsed {
            Some((cycles, number_of_units, unit)) => Self {
                price: Some(price),
                cycles,
                number_of_units,
                unit: SubscriptionPeriodUnit::from_code(unit),
            },
            None => {
                warn!(
                    ?m,
                    "Unable to parse introductory period cycles and duration; \
                     treating the product as having no introductory period."
                );
                Self {
                    price: Some(price),
                    ..Self::not_available()
                }
            }
        }
    }
}

impl GooglePlaySkuDetails {
    fn from_model(m: SkuDetailsModel) -> Self {
        Self {
            product_type: m.product_type,
            product_id: m.product_id,
            subscription_period: m.subscription_period,
            free_trial_period: m.free_trial_period,
            introductory_price: m.introductory_price,
            introductory_price_period: m.introductory_price_period,
            introductory_price_cycles: m.introductory_price_cycles.unwrap_or(0),
        }
    }
}

impl SubscriptionUpdateMetadata {
    fn from_model(m: UpdateSubscriptionMetadataModel) -> Self {
        Self {
            old_remaining_time: m.old_sku_remaining_seconds,
            old_price_micros: m.old_sku_price_in_micros,
            old_period: parse_duration(Some(&m.old_sku_period_string)),
            new_price_micros: m.new_sku_price_in_micros,
        }
    }
}

/// Absent fields count as zero; present but non-numeric ones fail.
fn scalar_or_zero(field: &Option<JsonScalar>) -> Option<i64> {
    match field {
        None => Some(0),
        Some(value) => value.to_i64(),
    }
}

fn decode_string<A: AppleReceiptDatasource>(
    datasource: &A,
    attribute: &ReceiptAttributeModel,
) -> Result<String, IapReceiptError> {
    Ok(datasource
        .parse_value(&attribute.value)?
        .as_string()
        .map_err(|e| attribute_error(attribute, e))?
        .to_string())
}

fn decode_integer<A: AppleReceiptDatasource>(
    datasource: &A,
    attribute: &ReceiptAttributeModel,
) -> Result<i64, IapReceiptError> {
    datasource
        .parse_value(&attribute.value)?
        .as_integer()
        .map_err(|e| attribute_error(attribute, e))
}

/// Dates are RFC 3339 IA5Strings; an empty string means no date.
fn decode_date<A: AppleReceiptDatasource>(
    datasource: &A,
    attribute: &ReceiptAttributeModel,
) -> Result<Option<DateTime<Utc>>, IapReceiptError> {
    let text = decode_string(datasource, attribute)?;
    if text.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(&text)
        .map(|date| Some(date.with_timezone(&Utc)))
        .map_err(|e| {
            IapReceiptError::invalid_receipt(format!(
                "attribute {} holds an invalid date '{}': {}",
                attribute.attribute_type, text, e
            ))
        })
}

fn attribute_error(
    attribute: &ReceiptAttributeModel,
    e: impl std::fmt::Display,
) -> IapReceiptError {
    IapReceiptError::invalid_receipt(format!(
        "attribute {} has an unexpected value: {}",
        attribute.attribute_type, e
    ))
}
