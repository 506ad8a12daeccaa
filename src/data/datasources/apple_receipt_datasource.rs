use tracing::debug;

use crate::{
    asn1::{
        asn1_node::{universal, Asn1Node, Tag},
        asn1_processor::Asn1Processor,
    },
    data::models::apple_receipt::receipt_attribute_model::ReceiptAttributeModel,
    errors::IapReceiptError,
};

const OID_PKCS7_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
const OID_PKCS7_DATA: &str = "1.2.840.113549.1.7.1";

pub(crate) trait AppleReceiptDatasource {
    /// Unwraps the PKCS#7 container of a binary App Store receipt and decodes
    /// the receipt attribute set it carries. The signature is not verified.
    ///
    /// ```text
    /// ContentInfo ::= SEQUENCE {
    ///     contentType OBJECT IDENTIFIER (signedData),
    ///     content     [0] EXPLICIT SignedData }
    /// SignedData ::= SEQUENCE {
    ///     version, digestAlgorithms SET,
    ///     encapContentInfo SEQUENCE {
    ///         eContentType OBJECT IDENTIFIER (data),
    ///         eContent     [0] EXPLICIT OCTET STRING },
    ///     ... }
    /// ```
    fn parse_receipt_attributes(
        &self,
        receipt: &[u8],
    ) -> Result<Vec<ReceiptAttributeModel>, IapReceiptError>;

    /// Decodes a `SET OF ReceiptAttribute`. Used for the top-level payload as
    /// well as for each in-app purchase receipt.
    fn parse_attribute_set(
        &self,
        data: &[u8],
    ) -> Result<Vec<ReceiptAttributeModel>, IapReceiptError>;

    /// Decodes the DER value carried by one attribute.
    fn parse_value(&self, data: &[u8]) -> Result<Asn1Node, IapReceiptError>;
}

pub(crate) struct AppleReceiptDatasourceImpl {
    max_depth: usize,
}

impl AppleReceiptDatasource for AppleReceiptDatasourceImpl {
    fn parse_receipt_attributes(
        &self,
        receipt: &[u8],
    ) -> Result<Vec<ReceiptAttributeModel>, IapReceiptError> {
        let content_info = self.parse_value(receipt)?;
        content_info.expect_sequence()?;
        expect_oid(content_info.child(0)?, OID_PKCS7_SIGNED_DATA)?;
        let signed_data = explicit_content(content_info.child(1)?)?.expect_sequence()?;

        // encapContentInfo is the first SEQUENCE after version and
        // digestAlgorithms.
        let encap_content_info = signed_data
            .children()
            .iter()
            .find(|node| node.tag().is_universal(universal::SEQUENCE))
            .ok_or_else(|| {
                IapReceiptError::invalid_receipt("SignedData has no encapsulated content")
            })?;
        expect_oid(encap_content_info.child(0)?, OID_PKCS7_DATA)?;
        let payload = explicit_content(encap_content_info.child(1)?)?.as_octets()?;
        debug!(
            payload_len = payload.len(),
            "Unwrapped PKCS#7 receipt payload."
        );

        self.parse_attribute_set(&payload)
    }

    fn parse_attribute_set(
        &self,
        data: &[u8],
    ) -> Result<Vec<ReceiptAttributeModel>, IapReceiptError> {
        let set = self.parse_value(data)?;
        set.expect_set()?;
        set.children()
            .iter()
            .map(|attribute| {
                attribute.expect_sequence()?;
                Ok(ReceiptAttributeModel {
                    attribute_type: attribute.child(0)?.as_integer()?,
                    version: attribute.child(1)?.as_integer()?,
                    value: attribute.child(2)?.as_octets()?.into_owned(),
                })
            })
            .collect()
    }

    fn parse_value(&self, data: &[u8]) -> Result<Asn1Node, IapReceiptError> {
        Ok(Asn1Processor::new(data)
            .with_max_depth(self.max_depth)
            .read_root()?)
    }
}

impl AppleReceiptDatasourceImpl {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

fn expect_oid(node: &Asn1Node, expected: &'static str) -> Result<(), IapReceiptError> {
    let oid = node.as_object_identifier()?;
    if oid == expected {
        Ok(())
    } else {
        Err(IapReceiptError::invalid_receipt(format!(
            "unexpected content type {} (expected {})",
            oid, expected
        )))
    }
}

/// Child of a `[0] EXPLICIT` wrapper.
fn explicit_content(node: &Asn1Node) -> Result<&Asn1Node, IapReceiptError> {
    if node.tag() != Tag::context_specific(0, true) {
        return Err(IapReceiptError::invalid_receipt(format!(
            "expected [0] EXPLICIT content at offset {}",
            node.offset()
        )));
    }
    Ok(node.child(0)?)
}
