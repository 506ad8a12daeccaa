use chrono::{DateTime, Duration, Utc};

use crate::{
    domain::entities::{
        apple_receipt::{AppleInAppPurchaseReceipt, AppleStoreProductType},
        subscription_period::{
            accumulate_duration, next_billing_date, parse_duration, parse_period_units,
            scale_duration, SubscriptionPeriodUnit,
        },
        subscription_source::{AppleIntroductoryOffer, GooglePlayPurchase},
        subscription_update::SubscriptionUpdatePayload,
    },
    errors::IapReceiptError,
};

const NOT_AVAILABLE: &str = "not available";

/// Tri-state answer to a subscription query. `Unsupported` means the store
/// does not expose enough information to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryResult {
    True,
    False,
    Unsupported,
}

impl From<bool> for QueryResult {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

impl QueryResult {
    pub fn is_true(self) -> bool {
        self == Self::True
    }
}

/// State of one subscription evaluated at a fixed instant. Nothing is
/// recomputed after construction; build a new value to re-evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionInfo {
    product_id: Option<String>,
    purchase_date: Option<DateTime<Utc>>,
    is_subscribed: QueryResult,
    is_expired: QueryResult,
    is_cancelled: QueryResult,
    is_free_trial: QueryResult,
    is_auto_renewing: QueryResult,
    is_introductory_price_period: QueryResult,
    expire_date: Option<DateTime<Utc>>,
    cancel_date: Option<DateTime<Utc>>,
    remaining_time: Duration,
    introductory_price: Option<String>,
    introductory_price_period: Duration,
    introductory_price_cycles: i64,
    introductory_price_total_duration: Duration,
    free_trial_period: Duration,
    subscription_period: Duration,
    free_trial_period_string: Option<String>,
    sku_details: Option<String>,
}

impl SubscriptionInfo {
    /// Evaluates an App Store purchase. Only subscription product types are
    /// accepted.
    pub fn from_apple(
        receipt: &AppleInAppPurchaseReceipt,
        introductory_offer: Option<&AppleIntroductoryOffer>,
        now: DateTime<Utc>,
    ) -> Result<Self, IapReceiptError> {
        if !receipt.product_type.is_subscription() {
            return Err(IapReceiptError::InvalidProductType(format!(
                "{:?}",
                receipt.product_type
            )));
        }

        let (introductory_price, introductory_price_period, introductory_price_cycles) =
            match introductory_offer {
                None => (None, Duration::zero(), 0),
                Some(offer) if offer.unit == SubscriptionPeriodUnit::NotAvailable => {
                    (offer.price.clone(), Duration::zero(), 0)
                }
                Some(offer) => (
                    offer.price.clone(),
                    offer.unit.span(offer.number_of_units, now),
                    offer.cycles,
                ),
            };

        let (
            is_subscribed,
            is_expired,
            is_cancelled,
            is_free_trial,
            is_auto_renewing,
            is_introductory_price_period,
        ) = if receipt.product_type == AppleStoreProductType::NonRenewingSubscription {
            // The App Store keeps no expiration date for these.
            (
                QueryResult::Unsupported,
                QueryResult::Unsupported,
                QueryResult::Unsupported,
                QueryResult::Unsupported,
                QueryResult::Unsupported,
                QueryResult::Unsupported,
            )
        } else {
            let cancelled = receipt.cancellation_date.is_some_and(|date| date < now);
            let expiration = receipt.subscription_expiration_date;
            let expired = expiration.is_some_and(|date| date < now);
            (
                QueryResult::from(expiration.is_some_and(|date| date >= now)),
                QueryResult::from(expired),
                QueryResult::from(cancelled),
                QueryResult::from(receipt.is_free_trial),
                QueryResult::from(
                    receipt.product_type == AppleStoreProductType::AutoRenewingSubscription
                        && !cancelled
                        && !expired,
                ),
                QueryResult::from(receipt.is_introductory_price_period),
            )
        };

        let remaining_time = match receipt.subscription_expiration_date {
            Some(expiration) if is_subscribed.is_true() => expiration - now,
            _ => Duration::zero(),
        };

        Ok(Self {
            product_id: Some(receipt.product_id.clone()),
            purchase_date: Some(receipt.purchase_date),
            is_subscribed,
            is_expired,
            is_cancelled,
            is_free_trial,
            is_auto_renewing,
            is_introductory_price_period,
            expire_date: receipt.subscription_expiration_date,
            cancel_date: receipt.cancellation_date,
            remaining_time,
            introductory_price,
            introductory_price_period,
            introductory_price_cycles,
            introductory_price_total_duration: scale_duration(
                introductory_price_period,
                introductory_price_cycles,
            ),
            free_trial_period: Duration::zero(),
            subscription_period: Duration::zero(),
            free_trial_period_string: None,
            sku_details: None,
        })
    }

    /// Evaluates a Google Play purchase.
    ///
    /// Google only reports the purchase time, so the current expiration is
    /// reconstructed by rolling forward from the purchase date through, in
    /// order: credit carried over from a replaced subscription, the free
    /// trial, the introductory cycles, and then regular billing periods.
    pub fn from_google_play(
        purchase: &GooglePlayPurchase,
        now: DateTime<Utc>,
    ) -> Result<Self, IapReceiptError> {
        let sku = purchase
            .sku_details
            .as_ref()
            .ok_or_else(|| IapReceiptError::InvalidProductType("no SKU details".to_string()))?;
        match sku.product_type.as_deref() {
            None => {
                return Err(IapReceiptError::InvalidProductType(
                    "SKU details have no type".to_string(),
                ))
            }
            Some("inapp") => {
                return Err(IapReceiptError::InvalidProductType("inapp".to_string()));
            }
            Some(_) => {}
        }

        let subscription_period_string = sku.subscription_period.as_deref();
        let introductory_period_string = sku.introductory_price_period.as_deref();

        let subscription_period =
            parse_period_units(subscription_period_string).span_from(now);
        let free_trial_period = if purchase.is_free_trial {
            parse_duration(sku.free_trial_period.as_deref())
        } else {
            Duration::zero()
        };

        let mut introductory_price_period = Duration::zero();
        let mut total_introductory_duration = Duration::zero();
        if purchase.has_introductory_price_trial {
            introductory_price_period = if introductory_period_string.is_some()
                && introductory_period_string == subscription_period_string
            {
                subscription_period
            } else {
                parse_duration(introductory_period_string)
            };
            total_introductory_duration = accumulate_duration(
                parse_period_units(introductory_period_string),
                sku.introductory_price_cycles,
                now,
            );
        }

        let extra_time = match &purchase.update_metadata {
            Some(metadata) => metadata.extra_time(subscription_period)?,
            None => Duration::zero(),
        };

        let purchase_date = purchase.purchase_date;
        let elapsed = now - purchase_date;
        let trial_end = saturating_sum(&[extra_time, free_trial_period]);
        let introductory_end = saturating_sum(&[trial_end, total_introductory_duration]);

        let mut is_free_trial = QueryResult::False;
        let mut is_introductory_price_period = QueryResult::False;
        let expire_date = if elapsed <= extra_time {
            // Still running on credit from the replaced subscription.
            saturating_add(purchase_date, extra_time)
        } else if elapsed <= trial_end {
            is_free_trial = QueryResult::True;
            saturating_add(purchase_date, trial_end)
        } else if elapsed < introductory_end {
            is_introductory_price_period = QueryResult::True;
            next_billing_date(
                saturating_add(purchase_date, trial_end),
                parse_period_units(introductory_period_string),
                now,
            )
        } else {
            // Cancelled or not, access lasts until the next billing date.
            next_billing_date(
                saturating_add(purchase_date, introductory_end),
                parse_period_units(subscription_period_string),
                now,
            )
        };

        Ok(Self {
            product_id: sku.product_id.clone(),
            purchase_date: Some(purchase_date),
            is_subscribed: QueryResult::True,
            is_expired: QueryResult::False,
            is_cancelled: QueryResult::from(!purchase.is_auto_renewing),
            is_free_trial,
            is_auto_renewing: QueryResult::from(purchase.is_auto_renewing),
            is_introductory_price_period,
            expire_date: Some(expire_date),
            cancel_date: None,
            remaining_time: (expire_date - now).max(Duration::zero()),
            introductory_price: sku.introductory_price.clone(),
            introductory_price_period,
            introductory_price_cycles: sku.introductory_price_cycles,
            introductory_price_total_duration: total_introductory_duration,
            free_trial_period,
            subscription_period,
            free_trial_period_string: sku.free_trial_period.clone(),
            sku_details: purchase.raw_sku_details.clone(),
        })
    }

    /// Stores that expose no subscription details. The purchase is trusted
    /// to be active.
    pub fn from_amazon(product_id: Option<String>) -> Self {
        Self {
            product_id,
            purchase_date: None,
            is_subscribed: QueryResult::True,
            is_expired: QueryResult::False,
            is_cancelled: QueryResult::Unsupported,
            is_free_trial: QueryResult::Unsupported,
            is_auto_renewing: QueryResult::Unsupported,
            is_introductory_price_period: QueryResult::Unsupported,
            expire_date: None,
            cancel_date: None,
            remaining_time: Duration::MAX,
            introductory_price: None,
            introductory_price_period: Duration::MAX,
            introductory_price_cycles: 0,
            introductory_price_total_duration: Duration::zero(),
            free_trial_period: Duration::zero(),
            subscription_period: Duration::zero(),
            free_trial_period_string: None,
            sku_details: None,
        }
    }

    pub fn product_id(&self) -> Option<&str> {
        self.product_id.as_deref()
    }

    pub fn purchase_date(&self) -> Option<DateTime<Utc>> {
        self.purchase_date
    }

    pub fn is_subscribed(&self) -> QueryResult {
        self.is_subscribed
    }

    pub fn is_expired(&self) -> QueryResult {
        self.is_expired
    }

    pub fn is_cancelled(&self) -> QueryResult {
        self.is_cancelled
    }

    pub fn is_free_trial(&self) -> QueryResult {
        self.is_free_trial
    }

    pub fn is_auto_renewing(&self) -> QueryResult {
        self.is_auto_renewing
    }

    pub fn is_introductory_price_period(&self) -> QueryResult {
        self.is_introductory_price_period
    }

    /// Time left until expiration; never negative.
    pub fn remaining_time(&self) -> Duration {
        self.remaining_time
    }

    /// Introductory price, or "not available".
    pub fn introductory_price(&self) -> &str {
        match self.introductory_price.as_deref() {
            Some(price) if !price.is_empty() => price,
            _ => NOT_AVAILABLE,
        }
    }

    /// Length of one introductory price period.
    pub fn introductory_price_period(&self) -> Duration {
        self.introductory_price_period
    }

    pub fn introductory_price_period_cycles(&self) -> i64 {
        self.introductory_price_cycles
    }

    /// Length of all introductory cycles together.
    pub fn introductory_price_total_duration(&self) -> Duration {
        self.introductory_price_total_duration
    }

    pub fn expire_date(&self) -> Option<DateTime<Utc>> {
        self.expire_date
    }

    pub fn cancel_date(&self) -> Option<DateTime<Utc>> {
        self.cancel_date
    }

    pub fn free_trial_period(&self) -> Duration {
        self.free_trial_period
    }

    pub fn subscription_period(&self) -> Duration {
        self.subscription_period
    }

    pub fn free_trial_period_string(&self) -> Option<&str> {
        self.free_trial_period_string.as_deref()
    }

    pub fn sku_details(&self) -> Option<&str> {
        self.sku_details.as_deref()
    }

    pub fn update_payload(&self) -> SubscriptionUpdatePayload {
        SubscriptionUpdatePayload {
            product_id: self.product_id.clone(),
            is_free_trial: self.is_free_trial.is_true(),
            is_introductory_price_period: self.is_introductory_price_period.is_true(),
            remaining_time_in_seconds: self.remaining_time,
        }
    }

    pub fn update_payload_json(&self) -> Result<String, IapReceiptError> {
        serde_json::to_string(&self.update_payload()).map_err(|e| {
            IapReceiptError::invalid_data("failed to serialize subscription update payload", &e)
        })
    }
}

fn saturating_add(date: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    date.checked_add_signed(span)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn saturating_sum(spans: &[Duration]) -> Duration {
    spans.iter().fold(Duration::zero(), |total, span| {
        total.checked_add(span).unwrap_or(Duration::MAX)
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::entities::{
        subscription_source::GooglePlaySkuDetails,
        subscription_update::SubscriptionUpdateMetadata,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn apple_receipt(
        product_type: AppleStoreProductType,
        expiration: Option<DateTime<Utc>>,
    ) -> AppleInAppPurchaseReceipt {
        AppleInAppPurchaseReceipt {
            product_id: "monthly".to_string(),
            quantity: 1,
            transaction_id: "1000000001".to_string(),
            original_transaction_id: Some("1000000000".to_string()),
            purchase_date: now() - Duration::days(29),
            original_purchase_date: None,
            subscription_expiration_date: expiration,
            cancellation_date: None,
            web_order_line_item_id: None,
            product_type,
            is_free_trial: false,
            is_introductory_price_period: false,
        }
    }

    fn google_purchase(sku: GooglePlaySkuDetails, purchased_days_ago: i64) -> GooglePlayPurchase {
        GooglePlayPurchase {
            sku_details: Some(sku),
            raw_sku_details: Some(r#"{"type":"subs"}"#.to_string()),
            is_auto_renewing: true,
            purchase_date: now() - Duration::days(purchased_days_ago),
            is_free_trial: false,
            has_introductory_price_trial: false,
            update_metadata: None,
        }
    }

    fn subs(period: &str) -> GooglePlaySkuDetails {
        GooglePlaySkuDetails {
            product_type: Some("subs".to_string()),
            product_id: Some("monthly".to_string()),
            subscription_period: Some(period.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_apple_active_subscription() {
        let receipt = apple_receipt(
            AppleStoreProductType::AutoRenewingSubscription,
            Some(now() + Duration::hours(1)),
        );
        let info = SubscriptionInfo::from_apple(&receipt, None, now()).unwrap();
        assert_eq!(info.is_subscribed(), QueryResult::True);
        assert_eq!(info.is_expired(), QueryResult::False);
        assert_eq!(info.is_cancelled(), QueryResult::False);
        assert_eq!(info.is_auto_renewing(), QueryResult::True);
        assert_eq!(info.remaining_time(), Duration::hours(1));
        assert_eq!(info.introductory_price(), "not available");
        assert_eq!(info.product_id(), Some("monthly"));
    }

    #[test]
    fn test_apple_expired_subscription() {
        let receipt = apple_receipt(
            AppleStoreProductType::AutoRenewingSubscription,
            Some(now() - Duration::hours(1)),
        );
        let info = SubscriptionInfo::from_apple(&receipt, None, now()).unwrap();
        assert_eq!(info.is_subscribed(), QueryResult::False);
        assert_eq!(info.is_expired(), QueryResult::True);
        assert_eq!(info.is_auto_renewing(), QueryResult::False);
        assert_eq!(info.remaining_time(), Duration::zero());
    }

    #[test]
    fn test_apple_cancelled_subscription() {
        let mut receipt = apple_receipt(
            AppleStoreProductType::AutoRenewingSubscription,
            Some(now() + Duration::days(1)),
        );
        receipt.cancellation_date = Some(now() - Duration::days(1));
        let info = SubscriptionInfo::from_apple(&receipt, None, now()).unwrap();
        assert_eq!(info.is_cancelled(), QueryResult::True);
        assert_eq!(info.is_auto_renewing(), QueryResult::False);
        assert_eq!(info.cancel_date(), receipt.cancellation_date);
    }

    #[test]
    fn test_apple_rejects_non_subscriptions() {
        for product_type in [
            AppleStoreProductType::Consumable,
            AppleStoreProductType::NonConsumable,
        ] {
            let receipt = apple_receipt(product_type, None);
            assert!(matches!(
                SubscriptionInfo::from_apple(&receipt, None, now()),
                Err(IapReceiptError::InvalidProductType(_))
            ));
        }
    }

    #[test]
    fn test_apple_non_renewing_is_unsupported() {
        let receipt = apple_receipt(
            AppleStoreProductType::NonRenewingSubscription,
            Some(now() + Duration::days(1)),
        );
        let info = SubscriptionInfo::from_apple(&receipt, None, now()).unwrap();
        for result in [
            info.is_subscribed(),
            info.is_expired(),
            info.is_cancelled(),
            info.is_free_trial(),
            info.is_auto_renewing(),
            info.is_introductory_price_period(),
        ] {
            assert_eq!(result, QueryResult::Unsupported);
        }
        assert_eq!(info.remaining_time(), Duration::zero());
    }

    #[test]
    fn test_apple_introductory_offer() {
        let receipt = apple_receipt(
            AppleStoreProductType::AutoRenewingSubscription,
            Some(now() + Duration::days(1)),
        );
        let offer = AppleIntroductoryOffer {
            price: Some("0.99USD".to_string()),
            cycles: 3,
            number_of_units: 1,
            unit: SubscriptionPeriodUnit::Month,
        };
        let info = SubscriptionInfo::from_apple(&receipt, Some(&offer), now()).unwrap();
        assert_eq!(info.introductory_price(), "0.99USD");
        // June has 30 days.
        assert_eq!(info.introductory_price_period(), Duration::days(30));
        assert_eq!(info.introductory_price_period_cycles(), 3);
        assert_eq!(info.introductory_price_total_duration(), Duration::days(90));

        let unusable = AppleIntroductoryOffer {
            unit: SubscriptionPeriodUnit::NotAvailable,
            ..offer
        };
        let info = SubscriptionInfo::from_apple(&receipt, Some(&unusable), now()).unwrap();
        assert_eq!(info.introductory_price_period(), Duration::zero());
        assert_eq!(info.introductory_price_period_cycles(), 0);
    }

    #[test]
    fn test_google_rolls_forward_to_next_billing_date() {
        let purchase = google_purchase(subs("P30D"), 40);
        let info = SubscriptionInfo::from_google_play(&purchase, now()).unwrap();
        assert_eq!(info.is_subscribed(), QueryResult::True);
        assert_eq!(info.is_cancelled(), QueryResult::False);
        assert_eq!(info.expire_date(), Some(purchase.purchase_date + Duration::days(60)));
        assert_eq!(info.remaining_time(), Duration::days(20));
        assert_eq!(info.subscription_period(), Duration::days(30));
    }

    #[test]
    fn test_google_weekly_period() {
        let purchase = google_purchase(subs("P1W"), 10);
        let info = SubscriptionInfo::from_google_play(&purchase, now()).unwrap();
        assert_eq!(info.subscription_period(), Duration::days(7));
        assert_eq!(info.remaining_time(), Duration::days(4));
    }

    #[test]
    fn test_google_free_trial() {
        let mut sku = subs("P1M");
        sku.free_trial_period = Some("P7D".to_string());
        let mut purchase = google_purchase(sku, 3);
        purchase.is_free_trial = true;
        purchase.is_auto_renewing = false;

        let info = SubscriptionInfo::from_google_play(&purchase, now()).unwrap();
        assert_eq!(info.is_free_trial(), QueryResult::True);
        assert_eq!(info.is_cancelled(), QueryResult::True);
        assert_eq!(info.free_trial_period(), Duration::days(7));
        assert_eq!(info.free_trial_period_string(), Some("P7D"));
        assert_eq!(info.remaining_time(), Duration::days(4));
    }

    #[test]
    fn test_google_introductory_period() {
        let mut sku = subs("P1M");
        sku.introductory_price = Some("$0.99".to_string());
        sku.introductory_price_period = Some("P1W".to_string());
        sku.introductory_price_cycles = 2;
        let mut purchase = google_purchase(sku, 10);
        purchase.has_introductory_price_trial = true;

        let info = SubscriptionInfo::from_google_play(&purchase, now()).unwrap();
        assert_eq!(info.is_introductory_price_period(), QueryResult::True);
        assert_eq!(info.is_free_trial(), QueryResult::False);
        assert_eq!(info.introductory_price(), "$0.99");
        assert_eq!(info.introductory_price_period(), Duration::days(7));
        assert_eq!(info.introductory_price_total_duration(), Duration::days(14));
        assert_eq!(info.remaining_time(), Duration::days(4));
    }

    #[test]
    fn test_google_upgrade_credit() {
        let mut purchase = google_purchase(subs("P1M"), 10);
        purchase.update_metadata = Some(SubscriptionUpdateMetadata {
            old_remaining_time: Duration::days(15),
            old_price_micros: 2_000_000,
            old_period: Duration::days(30),
            new_price_micros: 1_000_000,
        });
        let info = SubscriptionInfo::from_google_play(&purchase, now()).unwrap();
        // Half a period at twice the price buys one full 30 day June period.
        assert_eq!(info.expire_date(), Some(purchase.purchase_date + Duration::days(30)));
        assert_eq!(info.remaining_time(), Duration::days(20));
        assert_eq!(info.is_free_trial(), QueryResult::False);
    }

    #[test]
    fn test_google_upgrade_with_zero_old_period() {
        let mut purchase = google_purchase(subs("P1M"), 10);
        purchase.update_metadata = Some(SubscriptionUpdateMetadata {
            old_remaining_time: Duration::days(15),
            old_price_micros: 2_000_000,
            old_period: Duration::zero(),
            new_price_micros: 1_000_000,
        });
        assert!(matches!(
            SubscriptionInfo::from_google_play(&purchase, now()),
            Err(IapReceiptError::InvalidUpdateMetadata(_))
        ));
    }

    #[test]
    fn test_google_rejects_inapp_and_missing_sku() {
        let mut sku = subs("P1M");
        sku.product_type = Some("inapp".to_string());
        let purchase = google_purchase(sku, 1);
        assert!(matches!(
            SubscriptionInfo::from_google_play(&purchase, now()),
            Err(IapReceiptError::InvalidProductType(_))
        ));

        let purchase = GooglePlayPurchase {
            sku_details: None,
            ..purchase
        };
        assert!(matches!(
            SubscriptionInfo::from_google_play(&purchase, now()),
            Err(IapReceiptError::InvalidProductType(_))
        ));
    }

    #[test]
    fn test_amazon_trusts_the_store() {
        let info = SubscriptionInfo::from_amazon(Some("monthly".to_string()));
        assert_eq!(info.is_subscribed(), QueryResult::True);
        assert_eq!(info.is_expired(), QueryResult::False);
        assert_eq!(info.is_cancelled(), QueryResult::Unsupported);
        assert_eq!(info.is_auto_renewing(), QueryResult::Unsupported);
        assert_eq!(info.remaining_time(), Duration::MAX);
        assert_eq!(info.introductory_price_period(), Duration::MAX);
        assert_eq!(info.introductory_price(), "not available");
    }

    #[test]
    fn test_update_payload_json() {
        let purchase = google_purchase(subs("P30D"), 40);
        let info = SubscriptionInfo::from_google_play(&purchase, now()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&info.update_payload_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "productId": "monthly",
                "is_free_trial": false,
                "is_introductory_price_period": false,
                "remaining_time_in_seconds": 1_728_000.0,
            })
        );
    }
}
