use serde_json::Value;
use tracing::debug;

use crate::{
    data::{
        datasources::utils::{decode_base64, parse_json},
        models::{
            apple_receipt::introductory_price_model::IntroductoryPriceModel,
            google_play::{
                developer_payload_model::{DeveloperPayloadModel, UpdateSubscriptionMetadataModel},
                purchase_json_model::PurchaseJsonModel,
                purchase_payload_model::PurchasePayloadModel,
                sku_details_model::SkuDetailsModel,
            },
            unified_receipt_model::UnifiedReceiptModel,
        },
    },
    errors::IapReceiptError,
};

pub(crate) trait UnifiedReceiptDatasource {
    /// Parse the store-agnostic receipt wrapper:
    /// {"Store": "...", "TransactionID": "...", "Payload": "..."}
    fn parse_unified_receipt(&self, receipt: &str) -> Result<UnifiedReceiptModel, IapReceiptError>;

    /// Parse the `Payload` of a Google Play receipt, along with the JSON
    /// documents nested inside it as strings.
    ///
    /// Returns the payload wrapper, the original purchase JSON, the developer
    /// payload (if present and a JSON object) and the first SKU details entry (if any).
    fn parse_google_play_payload(
        &self,
        payload: &str,
    ) -> Result<
        (
            PurchasePayloadModel,
            PurchaseJsonModel,
            Option<DeveloperPayloadModel>,
            Option<SkuDetailsModel>,
        ),
        IapReceiptError,
    >;

    fn parse_update_metadata(
        &self,
        metadata: &str,
    ) -> Result<UpdateSubscriptionMetadataModel, IapReceiptError>;

    /// Parse the introductory offer JSON produced for an Apple product.
    fn parse_introductory_price(
        &self,
        json: &str,
    ) -> Result<IntroductoryPriceModel, IapReceiptError>;

    /// Base64-decode the `Payload` of an Apple receipt into PKCS#7 bytes.
    fn decode_apple_payload(&self, payload: &str) -> Result<Vec<u8>, IapReceiptError>;
}

pub(crate) struct UnifiedReceiptDatasourceImpl;

impl UnifiedReceiptDatasource for UnifiedReceiptDatasourceImpl {
    fn parse_unified_receipt(&self, receipt: &str) -> Result<UnifiedReceiptModel, IapReceiptError> {
        parse_json(receipt, "unified receipt")
    }

    fn parse_google_play_payload(
        &self,
        payload: &str,
    ) -> Result<
        (
            PurchasePayloadModel,
            PurchaseJsonModel,
            Option<DeveloperPayloadModel>,
            Option<SkuDetailsModel>,
        ),
        IapReceiptError,
    > {
        let wrapper: PurchasePayloadModel = parse_json(payload, "Google Play payload")?;
        let purchase: PurchaseJsonModel = parse_json(&wrapper.json, "Google Play purchase JSON")?;
        let developer_payload = purchase
            .developer_payload
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(parse_developer_payload)
            .transpose()?
            .flatten();
        let sku_details: Option<SkuDetailsModel> = wrapper
            .sku_details
            .as_ref()
            .and_then(|list| list.first())
            .map(|raw| parse_json(raw, "Google Play SKU details"))
            .transpose()?;
        Ok((wrapper, purchase, developer_payload, sku_details))
    }

    fn parse_update_metadata(
        &self,
        metadata: &str,
    ) -> Result<UpdateSubscriptionMetadataModel, IapReceiptError> {
        parse_json(metadata, "subscription update metadata")
    }

    fn parse_introductory_price(
        &self,
        json: &str,
    ) -> Result<IntroductoryPriceModel, IapReceiptError> {
        parse_json(json, "introductory price JSON")
    }

    fn decode_apple_payload(&self, payload: &str) -> Result<Vec<u8>, IapReceiptError> {
        decode_base64(payload, "Apple receipt payload")
    }
}

impl UnifiedReceiptDatasourceImpl {
    pub(crate) fn new() -> Self {
        Self
    }
}

/// Apps may put arbitrary strings in the developer payload; only a JSON
/// object is ours. A JSON object that does not match the model is an error.
fn parse_developer_payload(raw: &str) -> Result<Option<DeveloperPayloadModel>, IapReceiptError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| IapReceiptError::invalid_data("failed to parse developer payload", &e)),
        _ => {
            debug!("Developer payload is not a JSON object; ignoring it.");
            Ok(None)
        }
    }
}
