use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// SKU details JSON of a Google Play product
/// (`SkuDetails.getOriginalJson()`).
///
/// https://developer.android.com/reference/com/android/billingclient/api/SkuDetails
///
/// Period fields are ISO 8601 durations ("P1W", "P1M", "P3D", ...). Pricing
/// fields other than the introductory price are not read.
#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SkuDetailsModel {
    /// "subs" or "inapp".
    #[serde(rename = "type")]
    pub(crate) product_type: Option<String>,
    pub(crate) product_id: Option<String>,
    pub(crate) subscription_period: Option<String>,
    pub(crate) free_trial_period: Option<String>,
    /// Formatted introductory price, e.g. "$0.99".
    pub(crate) introductory_price: Option<String>,
    pub(crate) introductory_price_period: Option<String>,
    /// Number of billing cycles at the introductory price. Some bridges
    /// stringify it.
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub(crate) introductory_price_cycles: Option<i64>,
}
