use chrono::{DateTime, Utc};

/// Receipt-level fields of a decoded App Store receipt. Read-only once
/// decoded.
///
/// https://developer.apple.com/library/archive/releasenotes/General/ValidateAppStoreReceipt/Chapters/ReceiptFields.html
#[derive(Debug, Clone, PartialEq)]
pub struct AppleReceipt {
    pub(crate) bundle_id: String,
    pub(crate) app_version: String,
    pub(crate) opaque_value: Vec<u8>,
    pub(crate) sha1_hash: Vec<u8>,
    pub(crate) creation_date: Option<DateTime<Utc>>,
    /// One entry per purchase, in receipt order. Empty when the user has not
    /// bought anything.
    pub(crate) in_app_purchase_receipts: Vec<AppleInAppPurchaseReceipt>,
    pub(crate) original_application_version: Option<String>,
    /// Only set for apps bought through the Volume Purchase Program.
    pub(crate) expiration_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppleInAppPurchaseReceipt {
    pub(crate) product_id: String,
    pub(crate) quantity: i64,
    pub(crate) transaction_id: String,
    pub(crate) original_transaction_id: Option<String>,
    pub(crate) purchase_date: DateTime<Utc>,
    pub(crate) original_purchase_date: Option<DateTime<Utc>>,
    /// `None` for products that are not auto-renewable subscriptions.
    pub(crate) subscription_expiration_date: Option<DateTime<Utc>>,
    /// Set when Apple customer support refunded the purchase.
    pub(crate) cancellation_date: Option<DateTime<Utc>>,
    pub(crate) web_order_line_item_id: Option<i64>,
    pub(crate) product_type: AppleStoreProductType,
    pub(crate) is_free_trial: bool,
    pub(crate) is_introductory_price_period: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppleStoreProductType {
    /// Receipts without a product type attribute predate subscriptions.
    #[default]
    NonConsumable,
    Consumable,
    NonRenewingSubscription,
    AutoRenewingSubscription,
    Unknown(i64),
}

impl AppleStoreProductType {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::NonConsumable,
            1 => Self::Consumable,
            2 => Self::NonRenewingSubscription,
            3 => Self::AutoRenewingSubscription,
            other => Self::Unknown(other),
        }
    }

    pub fn is_subscription(&self) -> bool {
        matches!(
            self,
            Self::NonRenewingSubscription | Self::AutoRenewingSubscription
        )
    }
}

impl AppleInAppPurchaseReceipt {
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn original_transaction_id(&self) -> Option<&str> {
        self.original_transaction_id.as_deref()
    }

    pub fn purchase_date(&self) -> DateTime<Utc> {
        self.purchase_date
    }

    pub fn original_purchase_date(&self) -> Option<DateTime<Utc>> {
        self.original_purchase_date
    }

    pub fn subscription_expiration_date(&self) -> Option<DateTime<Utc>> {
        self.subscription_expiration_date
    }

    pub fn cancellation_date(&self) -> Option<DateTime<Utc>> {
        self.cancellation_date
    }

    pub fn web_order_line_item_id(&self) -> Option<i64> {
        self.web_order_line_item_id
    }

    pub fn product_type(&self) -> AppleStoreProductType {
        self.product_type
    }

    pub fn is_free_trial(&self) -> bool {
        self.is_free_trial
    }

    pub fn is_introductory_price_period(&self) -> bool {
        self.is_introductory_price_period
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_date.is_some()
    }
}

impl AppleReceipt {
    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    pub fn opaque_value(&self) -> &[u8] {
        &self.opaque_value
    }

    pub fn sha1_hash(&self) -> &[u8] {
        &self.sha1_hash
    }

    pub fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.creation_date
    }

    pub fn in_app_purchase_receipts(&self) -> &[AppleInAppPurchaseReceipt] {
        &self.in_app_purchase_receipts
    }

    pub fn original_application_version(&self) -> Option<&str> {
        self.original_application_version.as_deref()
    }

    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        self.expiration_date
    }

    pub fn has_in_app_purchase_receipts(&self) -> bool {
        !self.in_app_purchase_receipts.is_empty()
    }

    /// All purchases of `product_id`, most recent first.
    pub fn receipts_for_product(&self, product_id: &str) -> Vec<&AppleInAppPurchaseReceipt> {
        let mut receipts: Vec<_> = self
            .in_app_purchase_receipts
            .iter()
            .filter(|r| r.product_id == product_id)
            .collect();
        receipts.sort_by(|a, b| b.purchase_date.cmp(&a.purchase_date));
        receipts
    }

    /// Most recent purchase of `product_id` that has not been cancelled.
    pub fn find_most_recent_receipt_for_product(
        &self,
        product_id: &str,
    ) -> Option<&AppleInAppPurchaseReceipt> {
        self.receipts_for_product(product_id)
            .into_iter()
            .find(|r| !r.is_cancelled())
    }

    /// Most recent purchase of `product_id`, cancelled or not.
    pub fn latest_receipt_for_product(
        &self,
        product_id: &str,
    ) -> Option<&AppleInAppPurchaseReceipt> {
        self.receipts_for_product(product_id).into_iter().next()
    }
}
