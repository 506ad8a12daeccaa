use std::fmt::Debug;

use thiserror::Error;

/// Structural failure while decoding a BER/DER byte stream. Every variant
/// carries the offset (relative to the buffer handed to the decoder) at which
/// decoding stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Asn1Error {
    #[error("Unexpected end of input at offset {offset} while reading {reading}.")]
    UnexpectedEnd {
        offset: usize,
        reading: &'static str,
    },
    #[error("Length {length} at offset {offset} exceeds the {remaining} remaining bytes.")]
    LengthExceedsInput {
        offset: usize,
        length: usize,
        remaining: usize,
    },
    #[error("Reserved length octet 0xFF at offset {offset}.")]
    ReservedLength { offset: usize },
    #[error("Length-of-length {octets} at offset {offset} does not fit in a usize.")]
    LengthTooLong { offset: usize, octets: usize },
    #[error("Indefinite-length node at offset {offset} has no end-of-contents marker.")]
    UnterminatedIndefiniteLength { offset: usize },
    #[error("Primitive node at offset {offset} uses the indefinite length form.")]
    IndefinitePrimitive { offset: usize },
    #[error("Tag number at offset {offset} overflows 32 bits.")]
    TagNumberOverflow { offset: usize },
    #[error("Nesting exceeds the maximum depth of {max_depth} at offset {offset}.")]
    TooDeep { offset: usize, max_depth: usize },
    #[error("Empty input.")]
    EmptyInput,
    #[error("Invalid {expected} content in node at offset {offset}: {reason}.")]
    InvalidContent {
        offset: usize,
        expected: &'static str,
        reason: &'static str,
    },
    #[error("Unexpected node: expected {expected}, found {found}.")]
    UnexpectedNode {
        expected: &'static str,
        found: String,
    },
}

/// Error returned by receipt parsing and subscription-state derivation.
#[derive(Error, Debug)]
pub enum IapReceiptError {
    #[error("ASN.1 decoding failed: {0}")]
    Asn1(#[from] Asn1Error),

    /// The PKCS#7 container or one of the receipt attribute values is not
    /// shaped the way Apple encodes receipts.
    #[error("Invalid receipt structure: {0}")]
    InvalidReceipt(String),

    #[error("Receipt is missing mandatory attribute '{0}'.")]
    MissingReceiptAttribute(&'static str),

    /// Base64 or JSON input could not be decoded. `debug` holds the
    /// underlying decoder error.
    #[error("Invalid receipt data: {message} ({debug})")]
    InvalidReceiptData { message: String, debug: String },

    #[error("Receipt is null or does not name a store and payload.")]
    NullReceipt,

    #[error("Product ID is null.")]
    NullProductId,

    #[error("Invalid product type for subscription info: {0}.")]
    InvalidProductType(String),

    #[error("Store not supported: {0}")]
    StoreSubscriptionInfoNotSupported(String),

    #[error("Invalid subscription update metadata: {0}")]
    InvalidUpdateMetadata(String),
}

impl IapReceiptError {
    pub(crate) fn invalid_receipt(message: impl Into<String>) -> Self {
        Self::InvalidReceipt(message.into())
    }

    pub(crate) fn invalid_data(message: impl Into<String>, debug: &impl Debug) -> Self {
        Self::InvalidReceiptData {
            message: message.into(),
            debug: format!("{:?}", debug),
        }
    }
}
