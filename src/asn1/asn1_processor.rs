use crate::{
    asn1::asn1_node::{Asn1Length, Asn1Node, Asn1Value, Tag, TagClass},
    config::DEFAULT_ASN1_MAX_DEPTH,
    errors::Asn1Error,
};

/// Recursive-descent BER decoder. Accepts both definite (DER) and indefinite
/// length encodings and builds an owned tree of [`Asn1Node`]s.
pub struct Asn1Processor<'a> {
    input: &'a [u8],
    position: usize,
    // End of the region the current node must fit in. Narrowed while decoding
    // the children of a definite-length constructed node.
    limit: usize,
    max_depth: usize,
}

impl<'a> Asn1Processor<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            position: 0,
            limit: input.len(),
            max_depth: DEFAULT_ASN1_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Decodes the first element of `input`.
    pub fn parse(input: &[u8]) -> Result<Asn1Node, Asn1Error> {
        Asn1Processor::new(input).read_root()
    }

    /// Decodes one element at the current position. Trailing bytes are
    /// left unread.
    pub fn read_root(&mut self) -> Result<Asn1Node, Asn1Error> {
        if self.is_done() {
            return Err(Asn1Error::EmptyInput);
        }
        let node = self.read_node(0)?;
        if !self.is_done() {
            tracing::debug!(
                trailing_bytes = self.limit - self.position,
                "ignoring bytes after ASN.1 root element"
            );
        }
        Ok(node)
    }

    /// Decodes consecutive sibling elements until the input is exhausted.
    pub fn read_all(&mut self) -> Result<Vec<Asn1Node>, Asn1Error> {
        let mut nodes = Vec::new();
        while !self.is_done() {
            nodes.push(self.read_node(0)?);
        }
        Ok(nodes)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_done(&self) -> bool {
        self.position >= self.limit
    }

    fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.position)
    }

    fn read_byte(&mut self, reading: &'static str) -> Result<u8, Asn1Error> {
        if self.position < self.limit {
            let byte = self.input[self.position];
            self.position += 1;
            Ok(byte)
        } else {
            Err(Asn1Error::UnexpectedEnd {
                offset: self.position,
                reading,
            })
        }
    }

    fn read_n(&mut self, n: usize, reading: &'static str) -> Result<&'a [u8], Asn1Error> {
        if n <= self.remaining() {
            let slice = &self.input[self.position..self.position + n];
            self.position += n;
            Ok(slice)
        } else {
            Err(Asn1Error::UnexpectedEnd {
                offset: self.position,
                reading,
            })
        }
    }

    fn read_tag(&mut self) -> Result<Tag, Asn1Error> {
        let offset = self.position;
        let first_byte = self.read_byte("tag")?;

        let class = match first_byte >> 6 {
            0b00 => TagClass::Universal,
            0b01 => TagClass::Application,
            0b10 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        };
        let constructed = (first_byte & 0b0010_0000) != 0;
        let mut number = (first_byte & 0b0001_1111) as u32;

        // High-tag-number form: base-128 digits follow, high bit set on all
        // but the last.
        if number == 0b0001_1111 {
            number = 0;
            loop {
                let byte = self.read_byte("high tag number")?;
                if number > (u32::MAX >> 7) {
                    return Err(Asn1Error::TagNumberOverflow { offset });
                }
                number = (number << 7) | (byte & 0b0111_1111) as u32;
                if (byte & 0b1000_0000) == 0 {
                    break;
                }
            }
        }

        Ok(Tag {
            class,
            constructed,
            number,
        })
    }

    fn read_length(&mut self) -> Result<Asn1Length, Asn1Error> {
        let offset = self.position;
        let first_byte = self.read_byte("length")?;
        match first_byte {
            0x00..=0x7F => Ok(Asn1Length::Definite(first_byte as usize)),
            0x80 => Ok(Asn1Length::Indefinite),
            0xFF => Err(Asn1Error::ReservedLength { offset }),
            _ => {
                let octets = (first_byte & 0x7F) as usize;
                if octets > std::mem::size_of::<usize>() {
                    return Err(Asn1Error::LengthTooLong { offset, octets });
                }
                let length = self
                    .read_n(octets, "long-form length")?
                    .iter()
                    .fold(0usize, |acc, &b| (acc << 8) | b as usize);
                Ok(Asn1Length::Definite(length))
            }
        }
    }

    fn read_node(&mut self, depth: usize) -> Result<Asn1Node, Asn1Error> {
        let offset = self.position;
        if depth > self.max_depth {
            return Err(Asn1Error::TooDeep {
                offset,
                max_depth: self.max_depth,
            });
        }

        let tag = self.read_tag()?;
        let length = self.read_length()?;
        let header_len = self.position - offset;

        let value = match length {
            Asn1Length::Definite(len) => {
                let remaining = self.remaining();
                if len > remaining {
                    return Err(Asn1Error::LengthExceedsInput {
                        offset,
                        length: len,
                        remaining,
                    });
                }
                if tag.constructed {
                    let end = self.position + len;
                    let outer_limit = std::mem::replace(&mut self.limit, end);
                    let children = self.read_children_until_limit(depth);
                    self.limit = outer_limit;
                    Asn1Value::Constructed(children?)
                } else {
                    Asn1Value::Primitive(self.read_n(len, "content")?.to_vec())
                }
            }
            Asn1Length::Indefinite => {
                if !tag.constructed {
                    return Err(Asn1Error::IndefinitePrimitive { offset });
                }
                Asn1Value::Constructed(self.read_children_until_eoc(offset, depth)?)
            }
        };

        Ok(Asn1Node::new(tag, length, offset, header_len, value))
    }

    fn read_children_until_limit(&mut self, depth: usize) -> Result<Vec<Asn1Node>, Asn1Error> {
        let mut children = Vec::new();
        while !self.is_done() {
            children.push(self.read_node(depth + 1)?);
        }
        Ok(children)
    }

    // Each nested indefinite child consumes its own end-of-contents pair in
    // its own call, so a zero pair seen here always belongs to this node.
    fn read_children_until_eoc(
        &mut self,
        offset: usize,
        depth: usize,
    ) -> Result<Vec<Asn1Node>, Asn1Error> {
        let mut children = Vec::new();
        loop {
            if self.remaining() < 2 {
                return Err(Asn1Error::UnterminatedIndefiniteLength { offset });
            }
            if self.input[self.position] == 0x00 && self.input[self.position + 1] == 0x00 {
                self.position += 2;
                return Ok(children);
            }
            children.push(self.read_node(depth + 1)?);
        }
    }
}
