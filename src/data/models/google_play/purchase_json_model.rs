use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::{serde_as, TimestampMilliSeconds};

/// Original purchase JSON returned by the Play Billing Library
/// (`Purchase.getOriginalJson()`).
///
/// https://developer.android.com/reference/com/android/billingclient/api/Purchase
///
/// Only the fields that drive the subscription state are modelled; the rest
/// (order id, purchase state, token, ...) are ignored so that values added by
/// newer billing versions cannot break decoding.
#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PurchaseJsonModel {
    /// The time the product was purchased, in milliseconds since the epoch
    /// (Jan 1, 1970).
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    pub(crate) purchase_time: Option<DateTime<Utc>>,
    /// JSON encoded `DeveloperPayloadModel`, written by the purchasing layer
    /// when the purchase was initiated.
    pub(crate) developer_payload: Option<String>,
    #[serde(default)]
    pub(crate) auto_renewing: bool,
}
