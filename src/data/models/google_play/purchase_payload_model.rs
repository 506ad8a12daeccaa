use serde::Deserialize;

/// `Payload` of a Google Play unified receipt, as assembled by the billing
/// client bridge.
///
/// Example:
/// {"json":"{\"orderId\":\"GPA.1234\",...}","signature":"...",
///  "skuDetails":["{\"productId\":\"monthly\",\"type\":\"subs\",...}"]}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PurchasePayloadModel {
    /// Original purchase JSON, itself JSON encoded as a string.
    pub(crate) json: String,
    /// Signature over `json`. Not verified here.
    #[allow(dead_code)]
    pub(crate) signature: Option<String>,
    /// SKU details of the purchased product(s), each JSON encoded as a string.
    pub(crate) sku_details: Option<SkuDetailsList>,
}

/// Older bridges wrote a single string, newer ones a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SkuDetailsList {
    Many(Vec<String>),
    One(String),
}

impl SkuDetailsList {
    pub(crate) fn first(&self) -> Option<&str> {
        match self {
            SkuDetailsList::Many(list) => list.first().map(String::as_str),
            SkuDetailsList::One(single) => Some(single.as_str()),
        }
    }
}
