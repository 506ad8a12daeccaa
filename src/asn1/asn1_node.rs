use std::borrow::Cow;

use crate::errors::Asn1Error;

/// Universal tag numbers recognized by the typed accessors. Any other number
/// is still decoded and kept as a raw leaf.
pub mod universal {
    pub const END_OF_CONTENTS: u32 = 0;
    pub const BOOLEAN: u32 = 1;
    pub const INTEGER: u32 = 2;
    pub const BIT_STRING: u32 = 3;
    pub const OCTET_STRING: u32 = 4;
    pub const NULL: u32 = 5;
    pub const OBJECT_IDENTIFIER: u32 = 6;
    pub const ENUMERATED: u32 = 10;
    pub const UTF8_STRING: u32 = 12;
    pub const SEQUENCE: u32 = 16;
    pub const SET: u32 = 17;
    pub const PRINTABLE_STRING: u32 = 19;
    pub const T61_STRING: u32 = 20;
    pub const IA5_STRING: u32 = 22;
    pub const UTC_TIME: u32 = 23;
    pub const GENERALIZED_TIME: u32 = 24;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub class: TagClass,
    pub constructed: bool,
    pub number: u32,
}

impl Tag {
    pub const fn universal(number: u32, constructed: bool) -> Self {
        Self {
            class: TagClass::Universal,
            constructed,
            number,
        }
    }

    pub const fn context_specific(number: u32, constructed: bool) -> Self {
        Self {
            class: TagClass::ContextSpecific,
            constructed,
            number,
        }
    }

    pub fn is_universal(&self, number: u32) -> bool {
        self.class == TagClass::Universal && self.number == number
    }

    /// Human readable name of a universal tag, if known.
    pub fn name(&self) -> Option<&'static str> {
        if self.class != TagClass::Universal {
            return None;
        }
        match self.number {
            universal::BOOLEAN => Some("BOOLEAN"),
            universal::INTEGER => Some("INTEGER"),
            universal::BIT_STRING => Some("BIT STRING"),
            universal::OCTET_STRING => Some("OCTET STRING"),
            universal::NULL => Some("NULL"),
            universal::OBJECT_IDENTIFIER => Some("OBJECT IDENTIFIER"),
            universal::ENUMERATED => Some("ENUMERATED"),
            universal::UTF8_STRING => Some("UTF8String"),
            universal::SEQUENCE => Some("SEQUENCE"),
            universal::SET => Some("SET"),
            universal::PRINTABLE_STRING => Some("PrintableString"),
            universal::T61_STRING => Some("T61String"),
            universal::IA5_STRING => Some("IA5String"),
            universal::UTC_TIME => Some("UTCTime"),
            universal::GENERALIZED_TIME => Some("GeneralizedTime"),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => format!("{:?} [{}]", self.class, self.number),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asn1Length {
    Definite(usize),
    /// Content runs until a matching pair of zero octets.
    Indefinite,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Asn1Value {
    Primitive(Vec<u8>),
    Constructed(Vec<Asn1Node>),
}

/// One decoded TLV element.
///
/// Equality is structural: two nodes are equal when their tags, primitive
/// contents and children match, regardless of whether they were encoded with
/// definite or indefinite lengths.
#[derive(Debug, Clone)]
pub struct Asn1Node {
    tag: Tag,
    length: Asn1Length,
    offset: usize,
    header_len: usize,
    value: Asn1Value,
}

impl PartialEq for Asn1Node {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.value == other.value
    }
}

impl Asn1Node {
    pub(crate) fn new(
        tag: Tag,
        length: Asn1Length,
        offset: usize,
        header_len: usize,
        value: Asn1Value,
    ) -> Self {
        Self {
            tag,
            length,
            offset,
            header_len,
            value,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn is_constructed(&self) -> bool {
        self.tag.constructed
    }

    pub fn length(&self) -> Asn1Length {
        self.length
    }

    pub fn is_definite_length(&self) -> bool {
        matches!(self.length, Asn1Length::Definite(_))
    }

    /// Offset of the tag octet within the buffer the node was decoded from.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of tag and length octets.
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn value(&self) -> &Asn1Value {
        &self.value
    }

    /// Number of content octets, excluding any end-of-contents marker.
    pub fn content_len(&self) -> usize {
        match (self.length, &self.value) {
            (Asn1Length::Definite(len), _) => len,
            (Asn1Length::Indefinite, Asn1Value::Constructed(children)) => {
                children.iter().map(Asn1Node::encoded_len).sum()
            }
            (Asn1Length::Indefinite, Asn1Value::Primitive(bytes)) => bytes.len(),
        }
    }

    /// Total octets the node occupied in its encoding.
    pub fn encoded_len(&self) -> usize {
        let eoc = match self.length {
            Asn1Length::Definite(_) => 0,
            Asn1Length::Indefinite => 2,
        };
        self.header_len + self.content_len() + eoc
    }

    /// Content octets of a primitive node.
    pub fn content(&self) -> Option<&[u8]> {
        match &self.value {
            Asn1Value::Primitive(bytes) => Some(bytes),
            Asn1Value::Constructed(_) => None,
        }
    }

    /// Children of a constructed node; empty for primitives.
    pub fn children(&self) -> &[Asn1Node] {
        match &self.value {
            Asn1Value::Constructed(children) => children,
            Asn1Value::Primitive(_) => &[],
        }
    }

    pub fn child(&self, index: usize) -> Result<&Asn1Node, Asn1Error> {
        self.children()
            .get(index)
            .ok_or_else(|| Asn1Error::UnexpectedNode {
                expected: "child node",
                found: format!(
                    "{} with {} children (wanted index {})",
                    self.tag.describe(),
                    self.children().len(),
                    index
                ),
            })
    }

    /// Checks the node is a universal node of the given number and
    /// constructed-ness.
    pub fn expect_universal(
        &self,
        number: u32,
        constructed: bool,
        expected: &'static str,
    ) -> Result<&Self, Asn1Error> {
        if self.tag.is_universal(number) && self.tag.constructed == constructed {
            Ok(self)
        } else {
            Err(self.unexpected(expected))
        }
    }

    pub fn expect_sequence(&self) -> Result<&Self, Asn1Error> {
        self.expect_universal(universal::SEQUENCE, true, "SEQUENCE")
    }

    pub fn expect_set(&self) -> Result<&Self, Asn1Error> {
        self.expect_universal(universal::SET, true, "SET")
    }

    /// Decodes a two's complement INTEGER of at most eight octets.
    pub fn as_integer(&self) -> Result<i64, Asn1Error> {
        let bytes = self
            .expect_universal(universal::INTEGER, false, "INTEGER")?
            .primitive_bytes("INTEGER")?;
        if bytes.is_empty() {
            return Err(self.invalid_content("INTEGER", "no content octets"));
        }
        // BER allows redundant sign octets; DER does not, but strip them either
        // way.
        let mut digits = bytes;
        while digits.len() > 1 {
            let redundant = (digits[0] == 0x00 && digits[1] & 0x80 == 0)
                || (digits[0] == 0xFF && digits[1] & 0x80 != 0);
            if !redundant {
                break;
            }
            digits = &digits[1..];
        }
        if digits.len() > 8 {
            return Err(self.invalid_content("INTEGER", "value does not fit in 64 bits"));
        }
        let mut value: i64 = if digits[0] & 0x80 != 0 { -1 } else { 0 };
        for &b in digits {
            value = (value << 8) | b as i64;
        }
        Ok(value)
    }

    pub fn as_boolean(&self) -> Result<bool, Asn1Error> {
        let bytes = self
            .expect_universal(universal::BOOLEAN, false, "BOOLEAN")?
            .primitive_bytes("BOOLEAN")?;
        match bytes {
            [b] => Ok(*b != 0),
            _ => Err(self.invalid_content("BOOLEAN", "expected a single octet")),
        }
    }

    /// Text of a UTF8String, IA5String or PrintableString.
    pub fn as_string(&self) -> Result<&str, Asn1Error> {
        let is_text = self.tag.class == TagClass::Universal
            && !self.tag.constructed
            && matches!(
                self.tag.number,
                universal::UTF8_STRING | universal::IA5_STRING | universal::PRINTABLE_STRING
            );
        if !is_text {
            return Err(self.unexpected("string"));
        }
        let bytes = self.primitive_bytes("string")?;
        std::str::from_utf8(bytes).map_err(|_| self.invalid_content("string", "not valid UTF-8"))
    }

    /// Octets of an OCTET STRING. Constructed (segmented BER) strings are
    /// concatenated.
    pub fn as_octets(&self) -> Result<Cow<'_, [u8]>, Asn1Error> {
        if !self.tag.is_universal(universal::OCTET_STRING) {
            return Err(self.unexpected("OCTET STRING"));
        }
        match &self.value {
            Asn1Value::Primitive(bytes) => Ok(Cow::Borrowed(bytes)),
            Asn1Value::Constructed(segments) => {
                let mut joined = Vec::new();
                for segment in segments {
                    joined.extend_from_slice(&segment.as_octets()?);
                }
                Ok(Cow::Owned(joined))
            }
        }
    }

    /// Dotted-decimal form of an OBJECT IDENTIFIER.
    pub fn as_object_identifier(&self) -> Result<String, Asn1Error> {
        let bytes = self
            .expect_universal(universal::OBJECT_IDENTIFIER, false, "OBJECT IDENTIFIER")?
            .primitive_bytes("OBJECT IDENTIFIER")?;
        if bytes.is_empty() {
            return Err(self.invalid_content("OBJECT IDENTIFIER", "no content octets"));
        }
        let mut subidentifiers = Vec::new();
        let mut value: u64 = 0;
        for &b in bytes {
            if value >> 57 != 0 {
                return Err(self.invalid_content("OBJECT IDENTIFIER", "arc overflow"));
            }
            value = (value << 7) | (b & 0x7F) as u64;
            if b & 0x80 == 0 {
                subidentifiers.push(value);
                value = 0;
            }
        }
        if bytes[bytes.len() - 1] & 0x80 != 0 {
            return Err(self.invalid_content("OBJECT IDENTIFIER", "truncated subidentifier"));
        }
        // The first subidentifier packs the first two arcs; arc 2 takes every
        // value from 80 upwards.
        let (first, second) = match subidentifiers[0] {
            v if v < 40 => (0, v),
            v if v < 80 => (1, v - 40),
            v => (2, v - 80),
        };
        let arcs: Vec<String> = [first, second]
            .into_iter()
            .chain(subidentifiers[1..].iter().copied())
            .map(|arc| arc.to_string())
            .collect();
        Ok(arcs.join("."))
    }

    fn primitive_bytes(&self, expected: &'static str) -> Result<&[u8], Asn1Error> {
        self.content()
            .ok_or_else(|| self.invalid_content(expected, "node is constructed"))
    }

    fn unexpected(&self, expected: &'static str) -> Asn1Error {
        Asn1Error::UnexpectedNode {
            expected,
            found: format!(
                "{}{} at offset {}",
                self.tag.describe(),
                if self.tag.constructed {
                    " (constructed)"
                } else {
                    ""
                },
                self.offset
            ),
        }
    }

    fn invalid_content(&self, expected: &'static str, reason: &'static str) -> Asn1Error {
        Asn1Error::InvalidContent {
            offset: self.offset,
            expected,
            reason,
        }
    }
}
