use chrono::Duration;
use serde::Serialize;
use serde_with::{serde_as, DurationSecondsWithFrac};

use crate::errors::IapReceiptError;

/// Snapshot of a subscription handed to the Google Play billing client when
/// the user switches to another subscription, so the remaining credit can be
/// carried over.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionUpdatePayload {
    #[serde(rename = "productId")]
    pub product_id: Option<String>,
    pub is_free_trial: bool,
    pub is_introductory_price_period: bool,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub remaining_time_in_seconds: Duration,
}

/// Credit carried over from the subscription a Google Play purchase
/// replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionUpdateMetadata {
    pub old_remaining_time: Duration,
    pub old_price_micros: i64,
    pub old_period: Duration,
    pub new_price_micros: i64,
}

impl SubscriptionUpdateMetadata {
    /// Time the new subscription runs on credit before its own billing
    /// starts: the unused fraction of the old period, valued at the old
    /// price, converted into periods of the new subscription.
    pub fn extra_time(&self, new_period: Duration) -> Result<Duration, IapReceiptError> {
        let old_period_seconds = self.old_period.num_milliseconds() as f64 / 1000.0;
        if old_period_seconds <= 0.0 {
            return Err(IapReceiptError::InvalidUpdateMetadata(
                "old subscription period is zero".to_string(),
            ));
        }
        if self.new_price_micros == 0 {
            return Err(IapReceiptError::InvalidUpdateMetadata(
                "new subscription price is zero".to_string(),
            ));
        }
        let remaining_seconds = self.old_remaining_time.num_milliseconds() as f64 / 1000.0;
        let new_period_seconds = new_period.num_milliseconds() as f64 / 1000.0;
        let extra_seconds = remaining_seconds / old_period_seconds
            * self.old_price_micros as f64
            / self.new_price_micros as f64
            * new_period_seconds;
        if !extra_seconds.is_finite() || extra_seconds <= 0.0 {
            return Ok(Duration::zero());
        }
        Ok(Duration::try_milliseconds((extra_seconds * 1000.0).round() as i64)
            .unwrap_or(Duration::MAX))
    }
}

/// What the store layer must do to move a user from one subscription to
/// another.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionUpdate {
    /// Launch a replacement purchase carrying the old subscription's state.
    GooglePlay {
        /// Serialized `SubscriptionUpdatePayload`.
        old_subscription_json: String,
        new_product_id: String,
    },
    /// App Store handles proration itself; just buy the new product.
    AppleAppStore {
        new_product_id: String,
        developer_payload: Option<String>,
    },
}
