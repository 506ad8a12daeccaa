use serde::Deserialize;

/// Store-agnostic receipt wrapper handed out by the purchasing layer.
///
/// Example:
/// {"Store":"AppleAppStore","TransactionID":"1000000123","Payload":"MIIT..."}
///
/// `Payload` is a base64 PKCS#7 receipt for Apple stores and a JSON encoded
/// `PurchasePayloadModel` for Google Play.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UnifiedReceiptModel {
    pub(crate) store: Option<String>,
    #[serde(rename = "TransactionID")]
    #[allow(dead_code)]
    pub(crate) transaction_id: Option<String>,
    pub(crate) payload: Option<String>,
}
