use crate::{
    domain::entities::{
        apple_receipt::AppleReceipt,
        subscription_source::{Store, SubscriptionSource},
    },
    errors::IapReceiptError,
};

pub trait SubscriptionRepository {
    /// Decodes a binary (PKCS#7) App Store receipt.
    fn parse_apple_receipt(&self, receipt: &[u8]) -> Result<AppleReceipt, IapReceiptError>;

    /// Decodes a base64 App Store receipt, as returned by StoreKit.
    fn parse_apple_receipt_base64(&self, receipt: &str) -> Result<AppleReceipt, IapReceiptError>;

    /// Store named by a unified receipt.
    fn receipt_store(&self, unified_receipt: Option<&str>) -> Result<Store, IapReceiptError>;

    /// Resolves a unified receipt into the purchase data a subscription is
    /// evaluated from.
    ///
    /// unified_receipt:
    ///   {"Store": "...", "TransactionID": "...", "Payload": "..."}
    /// product_id:
    ///   Store-specific product id. Required for Apple receipts, which hold
    ///   every purchase of the app.
    /// introductory_price_json:
    ///   Introductory offer JSON of the product (Apple only).
    ///
    /// Returns `None` when an Apple receipt holds no purchase of the product.
    fn subscription_source(
        &self,
        unified_receipt: Option<&str>,
        product_id: Option<&str>,
        introductory_price_json: Option<&str>,
    ) -> Result<Option<SubscriptionSource>, IapReceiptError>;
}
