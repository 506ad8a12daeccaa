#![allow(dead_code)]

//! Builders for DER/BER encoded App Store receipts and unified receipt JSON.

use base64::{prelude::BASE64_STANDARD, Engine as _};
use serde_json::json;

pub const OID_SIGNED_DATA: [u8; 9] = [0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02];
pub const OID_DATA: [u8; 9] = [0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x01];

pub fn length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let bytes: Vec<u8> = len
        .to_be_bytes()
        .into_iter()
        .skip_while(|b| *b == 0)
        .collect();
    let mut out = vec![0x80 | bytes.len() as u8];
    out.extend(bytes);
    out
}

/// Definite-length encoding.
pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    out.extend(length(content.len()));
    out.extend_from_slice(content);
    out
}

/// Indefinite-length encoding of a constructed tag.
pub fn indefinite(tag: u8, children: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![tag, 0x80];
    for child in children {
        out.extend_from_slice(child);
    }
    out.extend([0x00, 0x00]);
    out
}

pub fn constructed(tag: u8, children: &[Vec<u8>]) -> Vec<u8> {
    tlv(tag, &children.concat())
}

pub fn sequence(children: &[Vec<u8>]) -> Vec<u8> {
    constructed(0x30, children)
}

pub fn set(children: &[Vec<u8>]) -> Vec<u8> {
    constructed(0x31, children)
}

pub fn integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    tlv(0x02, &bytes[start..])
}

pub fn utf8(text: &str) -> Vec<u8> {
    tlv(0x0C, text.as_bytes())
}

pub fn ia5(text: &str) -> Vec<u8> {
    tlv(0x16, text.as_bytes())
}

pub fn octets(bytes: &[u8]) -> Vec<u8> {
    tlv(0x04, bytes)
}

pub fn oid(encoded: &[u8]) -> Vec<u8> {
    tlv(0x06, encoded)
}

/// SEQUENCE { type INTEGER, version INTEGER, value OCTET STRING }
pub fn attribute(attribute_type: i64, value: &[u8]) -> Vec<u8> {
    sequence(&[integer(attribute_type), integer(1), octets(value)])
}

/// How the eContent OCTET STRING of the PKCS#7 container is encoded.
#[derive(Clone, Copy)]
pub enum Container {
    /// Definite lengths everywhere.
    Der,
    /// Indefinite lengths on the outer layers, as StoreKit writes receipts.
    Ber,
    /// Indefinite lengths plus a constructed, segmented eContent.
    BerSegmented,
}

/// Wraps a receipt attribute set in a PKCS#7 SignedData ContentInfo.
pub fn pkcs7(payload: &[u8], container: Container) -> Vec<u8> {
    let econtent = match container {
        Container::BerSegmented => {
            let (head, tail) = payload.split_at(payload.len() / 2);
            indefinite(0x24, &[octets(head), octets(tail)])
        }
        _ => octets(payload),
    };
    let version = integer(1);
    let digest_algorithms = set(&[sequence(&[oid(&[0x2B, 0x0E, 0x03, 0x02, 0x1A])])]);
    let signer_infos = set(&[]);
    match container {
        Container::Der => sequence(&[
            oid(&OID_SIGNED_DATA),
            constructed(
                0xA0,
                &[sequence(&[
                    version,
                    digest_algorithms,
                    sequence(&[oid(&OID_DATA), constructed(0xA0, &[econtent])]),
                    signer_infos,
                ])],
            ),
        ]),
        Container::Ber | Container::BerSegmented => indefinite(
            0x30,
            &[
                oid(&OID_SIGNED_DATA),
                indefinite(
                    0xA0,
                    &[indefinite(
                        0x30,
                        &[
                            version,
                            digest_algorithms,
                            indefinite(0x30, &[oid(&OID_DATA), indefinite(0xA0, &[econtent])]),
                            signer_infos,
                        ],
                    )],
                ),
            ],
        ),
    }
}

/// One in-app purchase receipt. Dates are RFC 3339; an empty string encodes
/// "no date" the way the App Store does.
#[derive(Clone)]
pub struct InApp {
    pub product_id: String,
    pub transaction_id: String,
    pub purchase_date: String,
    pub expiration_date: String,
    pub cancellation_date: String,
    pub product_type: Option<i64>,
    pub is_trial: bool,
    pub is_intro: bool,
}

impl InApp {
    pub fn subscription(product_id: &str, transaction_id: &str, purchase_date: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            transaction_id: transaction_id.to_string(),
            purchase_date: purchase_date.to_string(),
            expiration_date: String::new(),
            cancellation_date: String::new(),
            product_type: Some(3),
            is_trial: false,
            is_intro: false,
        }
    }

    pub fn expires(mut self, date: &str) -> Self {
        self.expiration_date = date.to_string();
        self
    }

    pub fn cancelled(mut self, date: &str) -> Self {
        self.cancellation_date = date.to_string();
        self
    }

    pub fn product_type(mut self, product_type: Option<i64>) -> Self {
        self.product_type = product_type;
        self
    }

    pub fn attributes(&self) -> Vec<Vec<u8>> {
        let mut attributes = vec![
            attribute(1701, &integer(1)),
            attribute(1702, &utf8(&self.product_id)),
            attribute(1703, &utf8(&self.transaction_id)),
            attribute(1704, &ia5(&self.purchase_date)),
            attribute(1705, &utf8(&self.transaction_id)),
            attribute(1706, &ia5(&self.purchase_date)),
            attribute(1708, &ia5(&self.expiration_date)),
            attribute(1711, &integer(1_000_000_042)),
            attribute(1712, &ia5(&self.cancellation_date)),
            attribute(1717, &integer(self.is_trial as i64)),
            attribute(1719, &integer(self.is_intro as i64)),
        ];
        if let Some(product_type) = self.product_type {
            attributes.push(attribute(1713, &integer(product_type)));
        }
        attributes
    }

    /// Receipt attribute 17 holding this purchase.
    pub fn to_attribute(&self) -> Vec<u8> {
        attribute(17, &set(&self.attributes()))
    }
}

pub fn receipt_attributes(in_apps: &[InApp]) -> Vec<Vec<u8>> {
    let mut attributes = vec![
        attribute(2, &utf8("com.example.app")),
        attribute(3, &utf8("42")),
        attribute(4, &[0xDE, 0xAD, 0xBE, 0xEF]),
        attribute(5, &[0x01; 20]),
        attribute(12, &ia5("2024-05-30T12:00:00Z")),
        attribute(19, &utf8("1.0")),
        // Undocumented attribute types show up in real receipts.
        attribute(8, &ia5("2024-05-30T12:00:00Z")),
    ];
    attributes.extend(in_apps.iter().map(InApp::to_attribute));
    attributes
}

pub fn apple_receipt(in_apps: &[InApp]) -> Vec<u8> {
    pkcs7(&set(&receipt_attributes(in_apps)), Container::Ber)
}

pub fn apple_unified_receipt(in_apps: &[InApp]) -> String {
    json!({
        "Store": "AppleAppStore",
        "TransactionID": "1000000001",
        "Payload": BASE64_STANDARD.encode(apple_receipt(in_apps)),
    })
    .to_string()
}

pub fn google_unified_receipt(
    purchase: serde_json::Value,
    sku_details: Option<serde_json::Value>,
) -> String {
    let mut payload = json!({
        "json": purchase.to_string(),
        "signature": "c2lnbmF0dXJl",
    });
    if let Some(sku_details) = sku_details {
        payload["skuDetails"] = json!([sku_details.to_string()]);
    }
    json!({
        "Store": "GooglePlay",
        "TransactionID": "GPA.1234-5678-9012-34567",
        "Payload": payload.to_string(),
    })
    .to_string()
}
