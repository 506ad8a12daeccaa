use serde::Deserialize;

/// Tunables for receipt decoding. Hosts typically deserialize this from their
/// own settings file; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct IapReceiptConfig {
    /// Maximum nesting depth accepted by the ASN.1 decoder. Apple receipts
    /// nest about a dozen levels deep.
    pub asn1_max_depth: usize,
    /// Whether a receipt without a creation date (attribute 12) is rejected.
    pub require_receipt_creation_date: bool,
}

pub const DEFAULT_ASN1_MAX_DEPTH: usize = 32;

impl Default for IapReceiptConfig {
    fn default() -> Self {
        Self {
            asn1_max_depth: DEFAULT_ASN1_MAX_DEPTH,
            require_receipt_creation_date: true,
        }
    }
}
