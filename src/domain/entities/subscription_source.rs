use chrono::{DateTime, Utc};

use crate::{
    domain::entities::{
        apple_receipt::AppleInAppPurchaseReceipt,
        subscription_info::SubscriptionInfo,
        subscription_period::SubscriptionPeriodUnit,
        subscription_update::SubscriptionUpdateMetadata,
    },
    errors::IapReceiptError,
};

/// Store named by a unified receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Store {
    GooglePlay,
    AppleAppStore,
    MacAppStore,
    AmazonAppStore,
    Other(String),
}

impl Store {
    pub fn from_name(name: &str) -> Self {
        match name {
            "GooglePlay" => Self::GooglePlay,
            "AppleAppStore" => Self::AppleAppStore,
            "MacAppStore" => Self::MacAppStore,
            "AmazonAppStore" => Self::AmazonAppStore,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::GooglePlay => "GooglePlay",
            Self::AppleAppStore => "AppleAppStore",
            Self::MacAppStore => "MacAppStore",
            Self::AmazonAppStore => "AmazonAppStore",
            Self::Other(name) => name,
        }
    }
}

/// Introductory offer configured for an Apple product. A `NotAvailable` unit
/// means the product has no usable introductory period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppleIntroductoryOffer {
    /// Price followed by its currency code, e.g. "0.99USD".
    pub price: Option<String>,
    pub cycles: i64,
    pub number_of_units: i64,
    pub unit: SubscriptionPeriodUnit,
}

impl AppleIntroductoryOffer {
    pub fn not_available() -> Self {
        Self {
            price: None,
            cycles: 0,
            number_of_units: 0,
            unit: SubscriptionPeriodUnit::NotAvailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GooglePlaySkuDetails {
    /// "subs" or "inapp".
    pub product_type: Option<String>,
    pub product_id: Option<String>,
    pub subscription_period: Option<String>,
    pub free_trial_period: Option<String>,
    pub introductory_price: Option<String>,
    pub introductory_price_period: Option<String>,
    pub introductory_price_cycles: i64,
}

/// Everything a Google Play receipt says about a subscription purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct GooglePlayPurchase {
    /// `None` when the receipt carries no SKU details.
    pub sku_details: Option<GooglePlaySkuDetails>,
    /// SKU details JSON as found in the receipt.
    pub raw_sku_details: Option<String>,
    pub is_auto_renewing: bool,
    pub purchase_date: DateTime<Utc>,
    pub is_free_trial: bool,
    pub has_introductory_price_trial: bool,
    /// Present when this purchase replaced another subscription.
    pub update_metadata: Option<SubscriptionUpdateMetadata>,
}

/// A receipt resolved to the inputs of one `SubscriptionInfo` constructor.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionSource {
    Apple {
        receipt: AppleInAppPurchaseReceipt,
        introductory_offer: Option<AppleIntroductoryOffer>,
    },
    GooglePlay(GooglePlayPurchase),
    /// Amazon exposes no subscription details client-side.
    Amazon { product_id: Option<String> },
    Unsupported { store_name: String },
}

impl SubscriptionSource {
    pub fn subscription_info(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionInfo, IapReceiptError> {
        match self {
            Self::Apple {
                receipt,
                introductory_offer,
            } => SubscriptionInfo::from_apple(receipt, introductory_offer.as_ref(), now),
            Self::GooglePlay(purchase) => SubscriptionInfo::from_google_play(purchase, now),
            Self::Amazon { product_id } => Ok(SubscriptionInfo::from_amazon(product_id.clone())),
            Self::Unsupported { store_name } => Err(
                IapReceiptError::StoreSubscriptionInfoNotSupported(store_name.clone()),
            ),
        }
    }
}
