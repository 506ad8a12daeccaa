use chrono::{DateTime, Utc};
use tracing::warn;

pub use crate::data::repositories::subscription_repository_impl::DefaultSubscriptionRepository;
use crate::{
    config::IapReceiptConfig,
    domain::{
        entities::{
            apple_receipt::AppleReceipt,
            subscription_info::SubscriptionInfo,
            subscription_source::Store,
            subscription_update::SubscriptionUpdate,
        },
        repositories::subscription_repository::SubscriptionRepository,
    },
    errors::IapReceiptError,
};

pub struct IapReceiptUtil<R: SubscriptionRepository> {
    subscription_repository: R,
}

impl<R: SubscriptionRepository> IapReceiptUtil<R> {
    pub fn with_repository(subscription_repository: R) -> Self {
        Self {
            subscription_repository,
        }
    }

    /// Decodes a binary App Store receipt. The PKCS#7 signature is not
    /// verified.
    pub fn parse_apple_receipt(&self, receipt: &[u8]) -> Result<AppleReceipt, IapReceiptError> {
        self.subscription_repository.parse_apple_receipt(receipt)
    }

    pub fn parse_apple_receipt_base64(
        &self,
        receipt: &str,
    ) -> Result<AppleReceipt, IapReceiptError> {
        self.subscription_repository
            .parse_apple_receipt_base64(receipt)
    }

    /// Like `parse_apple_receipt_base64`, but yields `None` instead of an
    /// error. Failures are logged.
    pub fn try_parse_apple_receipt(&self, receipt: Option<&str>) -> Option<AppleReceipt> {
        let receipt = receipt.filter(|r| !r.trim().is_empty())?;
        match self.subscription_repository.parse_apple_receipt_base64(receipt) {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                warn!(error = %e, "Unable to parse Apple receipt.");
                None
            }
        }
    }

    /// Subscription state of a product as of now.
    ///
    /// Returns `None` when an Apple receipt holds no purchase of the
    /// product.
    pub fn subscription_info(
        &self,
        unified_receipt: Option<&str>,
        product_id: Option<&str>,
        introductory_price_json: Option<&str>,
    ) -> Result<Option<SubscriptionInfo>, IapReceiptError> {
        self.subscription_info_at(
            unified_receipt,
            product_id,
            introductory_price_json,
            Utc::now(),
        )
    }

    /// Subscription state of a product as of `now`.
    pub fn subscription_info_at(
        &self,
        unified_receipt: Option<&str>,
        product_id: Option<&str>,
        introductory_price_json: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionInfo>, IapReceiptError> {
        self.subscription_repository
            .subscription_source(unified_receipt, product_id, introductory_price_json)?
            .map(|source| source.subscription_info(now))
            .transpose()
    }

    /// Works out how to move a user from the subscription bought with
    /// `old_unified_receipt` to `new_product_id`.
    pub fn plan_subscription_update(
        &self,
        old_unified_receipt: Option<&str>,
        old_product_id: Option<&str>,
        new_product_id: &str,
        developer_payload: Option<&str>,
    ) -> Result<SubscriptionUpdate, IapReceiptError> {
        self.plan_subscription_update_at(
            old_unified_receipt,
            old_product_id,
            new_product_id,
            developer_payload,
            Utc::now(),
        )
    }

    pub fn plan_subscription_update_at(
        &self,
        old_unified_receipt: Option<&str>,
        old_product_id: Option<&str>,
        new_product_id: &str,
        developer_payload: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionUpdate, IapReceiptError> {
        let store = self
            .subscription_repository
            .receipt_store(old_unified_receipt)?;
        match store {
            Store::GooglePlay => {
                let old_subscription = self
                    .subscription_repository
                    .subscription_source(old_unified_receipt, old_product_id, None)?
                    .map(|source| source.subscription_info(now))
                    .transpose()?
                    .ok_or(IapReceiptError::NullReceipt)?;
                Ok(SubscriptionUpdate::GooglePlay {
                    old_subscription_json: old_subscription.update_payload_json()?,
                    new_product_id: new_product_id.to_string(),
                })
            }
            Store::AppleAppStore | Store::MacAppStore => Ok(SubscriptionUpdate::AppleAppStore {
                new_product_id: new_product_id.to_string(),
                developer_payload: developer_payload.map(str::to_string),
            }),
            other => Err(IapReceiptError::StoreSubscriptionInfoNotSupported(
                other.name().to_string(),
            )),
        }
    }
}

impl IapReceiptUtil<DefaultSubscriptionRepository> {
    pub fn new(config: IapReceiptConfig) -> Self {
        Self {
            subscription_repository: DefaultSubscriptionRepository::new(&config),
        }
    }
}
