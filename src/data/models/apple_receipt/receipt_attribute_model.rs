/// One entry of an Apple receipt attribute set:
///
/// ```text
/// ReceiptAttribute ::= SEQUENCE {
///     type    INTEGER,
///     version INTEGER,
///     value   OCTET STRING
/// }
/// ```
///
/// https://developer.apple.com/library/archive/releasenotes/General/ValidateAppStoreReceipt/Chapters/ReceiptFields.html
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReceiptAttributeModel {
    pub(crate) attribute_type: i64,
    /// Unused by Apple; carried for completeness.
    #[allow(dead_code)]
    pub(crate) version: i64,
    /// DER encoding of the attribute value.
    pub(crate) value: Vec<u8>,
}

/// Attribute types found in the top-level receipt payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReceiptAttributeType {
    /// UTF8String.
    BundleId,
    /// UTF8String, CFBundleVersion of the app.
    AppVersion,
    /// Opaque bytes used with the hash to validate the receipt.
    OpaqueValue,
    /// SHA-1 hash used to validate the receipt.
    Sha1Hash,
    /// IA5String, RFC 3339 date.
    CreationDate,
    /// SET of in-app purchase receipt attributes.
    InAppPurchaseReceipt,
    /// UTF8String.
    OriginalApplicationVersion,
    /// IA5String, RFC 3339 date. Volume purchase program only.
    ExpirationDate,
}

impl ReceiptAttributeType {
    pub(crate) fn from_code(code: i64) -> Option<Self> {
        match code {
            2 => Some(Self::BundleId),
            3 => Some(Self::AppVersion),
            4 => Some(Self::OpaqueValue),
            5 => Some(Self::Sha1Hash),
            12 => Some(Self::CreationDate),
            17 => Some(Self::InAppPurchaseReceipt),
            19 => Some(Self::OriginalApplicationVersion),
            21 => Some(Self::ExpirationDate),
            _ => None,
        }
    }
}

/// Attribute types found inside an in-app purchase receipt (attribute 17).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InAppAttributeType {
    /// INTEGER.
    Quantity,
    /// UTF8String.
    ProductId,
    /// UTF8String.
    TransactionId,
    /// IA5String, RFC 3339 date.
    PurchaseDate,
    /// UTF8String.
    OriginalTransactionId,
    /// IA5String, RFC 3339 date.
    OriginalPurchaseDate,
    /// IA5String, RFC 3339 date. Only consulted when `PurchaseDate` is
    /// absent.
    AlternatePurchaseDate,
    /// IA5String, RFC 3339 date. Empty for non-subscriptions.
    SubscriptionExpirationDate,
    /// INTEGER.
    WebOrderLineItemId,
    /// IA5String, RFC 3339 date. Empty unless refunded by Apple support.
    CancellationDate,
    /// INTEGER, see `AppleStoreProductType`.
    ProductType,
    /// INTEGER, 1 when in a free trial.
    IsTrialPeriod,
    /// INTEGER, 1 when in an introductory price period.
    IsInIntroOfferPeriod,
}

impl InAppAttributeType {
    pub(crate) fn from_code(code: i64) -> Option<Self> {
        match code {
            1701 => Some(Self::Quantity),
            1702 => Some(Self::ProductId),
            1703 => Some(Self::TransactionId),
            1704 => Some(Self::PurchaseDate),
            1705 => Some(Self::OriginalTransactionId),
            1706 => Some(Self::OriginalPurchaseDate),
            1707 => Some(Self::AlternatePurchaseDate),
            1708 => Some(Self::SubscriptionExpirationDate),
            1711 => Some(Self::WebOrderLineItemId),
            1712 => Some(Self::CancellationDate),
            1713 => Some(Self::ProductType),
            1717 => Some(Self::IsTrialPeriod),
            1719 => Some(Self::IsInIntroOfferPeriod),
            _ => None,
        }
    }
}
