use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};

/// Developer payload attached to a Google Play purchase by the purchasing
/// layer. Keys are snake_case, unlike the surrounding Google JSON.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct DeveloperPayloadModel {
    pub(crate) is_free_trial: bool,
    pub(crate) has_introductory_price_trial: bool,
    /// Set when the purchase replaced another subscription.
    pub(crate) is_updated: bool,
    /// JSON encoded `UpdateSubscriptionMetadataModel`. Only consulted when
    /// `is_updated` is set.
    pub(crate) update_subscription_metadata: Option<String>,
}

/// Credit left over from the subscription that was replaced.
#[serde_as]
#[derive(Debug, Deserialize)]
pub(crate) struct UpdateSubscriptionMetadataModel {
    #[serde_as(as = "DurationSeconds<i64>")]
    pub(crate) old_sku_remaining_seconds: chrono::Duration,
    pub(crate) old_sku_price_in_micros: i64,
    /// ISO 8601 duration of the old subscription period, e.g. "P1M".
    pub(crate) old_sku_period_string: String,
    pub(crate) new_sku_price_in_micros: i64,
}
