use base64::{prelude::BASE64_STANDARD, Engine as _};
use serde::de::DeserializeOwned;

use crate::errors::IapReceiptError;

/// Decodes standard (padded) base64, tolerating surrounding whitespace.
pub(crate) fn decode_base64(data: &str, what: &str) -> Result<Vec<u8>, IapReceiptError> {
    BASE64_STANDARD
        .decode(data.trim())
        .map_err(|e| IapReceiptError::invalid_data(format!("{} is not valid base64", what), &e))
}

pub(crate) fn parse_json<T: DeserializeOwned>(
    data: &str,
    what: &str,
) -> Result<T, IapReceiptError> {
    serde_json::from_str(data)
        .map_err(|e| IapReceiptError::invalid_data(format!("failed to parse {}", what), &e))
}
