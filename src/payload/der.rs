//! Minimal DER reader for Authenticode signature blobs.
//!
//! Only definite-length, low-tag-number encodings are accepted, which is
//! what signing tools emit for PKCS#7 SignedData. Anything else reads as
//! `None` and the caller treats the signature as absent.

pub(crate) const TAG_INTEGER: u8 = 0x02;
pub(crate) const TAG_BIT_STRING: u8 = 0x03;
pub(crate) const TAG_OID: u8 = 0x06;
pub(crate) const TAG_SEQUENCE: u8 = 0x30;
pub(crate) const TAG_SET: u8 = 0x31;
pub(crate) const TAG_CONTEXT_0: u8 = 0xA0;

/// One tag-length-value element.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Tlv<'a> {
    pub tag: u8,
    /// Value bytes only
    pub contents: &'a [u8],
    /// Tag, length and value bytes
    pub raw: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Reads one element from the front of `input`, returning it and the rest.
    pub fn read(input: &'a [u8]) -> Option<(Tlv<'a>, &'a [u8])> {
        let (&tag, rest) = input.split_first()?;
        if tag & 0x1F == 0x1F {
            return None;
        }

        let (&first, rest) = rest.split_first()?;
        let (length, rest) = if first < 0x80 {
            (first as usize, rest)
        } else {
            let count = (first & 0x7F) as usize;
            if count == 0 || count > 4 || rest.len() < count {
                return None;
            }
            let length = rest[..count]
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | *b as usize);
            (length, &rest[count..])
        };

        if rest.len() < length {
            return None;
        }
        let header_len = input.len() - rest.len();
        let element = Tlv {
            tag,
            contents: &rest[..length],
            raw: &input[..header_len + length],
        };
        Some((element, &rest[length..]))
    }

    /// Reads one element and requires a specific tag.
    pub fn expect(input: &'a [u8], tag: u8) -> Option<(Tlv<'a>, &'a [u8])> {
        Self::read(input).filter(|(tlv, _)| tlv.tag == tag)
    }

    /// Iterates the children of a constructed element.
    pub fn children(&self) -> Children<'a> {
        Children {
            remaining: self.contents,
        }
    }
}

/// Iterator over consecutive elements.
pub(crate) struct Children<'a> {
    remaining: &'a [u8],
}

impl<'a> Iterator for Children<'a> {
    type Item = Tlv<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }
        match Tlv::read(self.remaining) {
            Some((tlv, rest)) => {
                self.remaining = rest;
                Some(tlv)
            }
            None => {
                // Malformed tail ends iteration.
                self.remaining = &[];
                None
            }
        }
    }
}
