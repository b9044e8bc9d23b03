//! Binary element encoding and decoding.
//!
//! Elements are written as a stream of tokens. Each token starts with a
//! header that packs a variable-length number and a 3-bit token type; a
//! single zero byte closes the innermost open element. Element tags are
//! dictionary codes (see [`crate::dtag`]), so the codec never needs a text
//! parser to read names and selectors off the wire.

use crate::dtag;
use crate::error::Error;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::borrow::Cow;
use std::fmt;

/* ---------------------------------------------------------------- *
 * Token type constants
 * ---------------------------------------------------------------- */

pub const TT_EXT: u8 = 0;
pub const TT_TAG: u8 = 1;
pub const TT_DTAG: u8 = 2;
pub const TT_ATTR: u8 = 3;
pub const TT_DATTR: u8 = 4;
pub const TT_BLOB: u8 = 5;
pub const TT_UDATA: u8 = 6;

/// Closes the innermost open element.
pub const CLOSE: u8 = 0x00;

const TT_BITS: u32 = 3;
const TT_MASK: u8 = 0x07;
const TT_HBIT: u8 = 0x80;
const MAX_TINY: u64 = (1 << (7 - TT_BITS)) - 1;

/// Longest header a `u64` can need: 4 bits in the final byte, 7 in each other.
const MAX_HEADER_LEN: usize = 10;

/// Maximum element nesting accepted by the decoder.
pub const MAX_DEPTH: usize = 64;

/* ---------------------------------------------------------------- *
 * Encoding helpers
 * ---------------------------------------------------------------- */

/// Encode a token header carrying `numval` and the token type `tt`.
///
/// * the final byte has its high bit set and holds the low 4 bits of the number
/// * every preceding byte holds 7 more bits, most significant first
pub fn encode_tt(numval: u64, tt: u8, buf: &mut BytesMut) {
    let mut tmp = [0u8; MAX_HEADER_LEN];
    let mut i = MAX_HEADER_LEN - 1;
    tmp[i] = TT_HBIT | (((numval & MAX_TINY) as u8) << TT_BITS) | (tt & TT_MASK);
    let mut val = numval >> (7 - TT_BITS);
    while val != 0 {
        i -= 1;
        tmp[i] = (val as u8) & !TT_HBIT;
        val >>= 7;
    }
    buf.extend_from_slice(&tmp[i..]);
}

/// Append a BLOB token.
pub fn encode_blob(value: &[u8], buf: &mut BytesMut) {
    encode_tt(value.len() as u64, TT_BLOB, buf);
    buf.extend_from_slice(value);
}

/// Append a UDATA token.
pub fn encode_udata(value: &str, buf: &mut BytesMut) {
    encode_tt(value.len() as u64, TT_UDATA, buf);
    buf.extend_from_slice(value.as_bytes());
}

/* ---------------------------------------------------------------- *
 * Decoding helpers
 * ---------------------------------------------------------------- */

/// Decode a token header, returning `(numval, token type)`.
pub fn decode_tt(buf: &mut impl Buf) -> Result<(u64, u8), Error> {
    let mut val: u64 = 0;
    for _ in 0..MAX_HEADER_LEN {
        if !buf.has_remaining() {
            return Err(Error::Codec("Buffer underflow when decoding token header".into()));
        }
        let b = buf.get_u8();
        if b & TT_HBIT != 0 {
            if val > (u64::MAX >> (7 - TT_BITS)) {
                return Err(Error::Codec("Token header number overflows 64 bits".into()));
            }
            val = (val << (7 - TT_BITS)) | ((b >> TT_BITS) as u64 & MAX_TINY);
            return Ok((val, b & TT_MASK));
        }
        if val > (u64::MAX >> 7) {
            return Err(Error::Codec("Token header number overflows 64 bits".into()));
        }
        val = (val << 7) | b as u64;
    }
    Err(Error::Codec("Token header longer than 10 bytes".into()))
}

fn peek(buf: &impl Buf) -> Option<u8> {
    buf.chunk().first().copied()
}

fn take_value(buf: &mut impl Buf, len: u64) -> Result<Bytes, Error> {
    let len = usize::try_from(len)
        .map_err(|_| Error::Codec(format!("Token length {} does not fit in memory", len)))?;
    if buf.remaining() < len {
        return Err(Error::Codec(format!(
            "Buffer underflow: token value requires {} bytes but only {} available",
            len,
            buf.remaining()
        )));
    }
    Ok(buf.copy_to_bytes(len))
}

/* ---------------------------------------------------------------- *
 * Element tree
 * ---------------------------------------------------------------- */

/// A node inside an element: a nested element or a leaf value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CcnbNode {
    Element(CcnbElement),
    Blob(Bytes),
    Udata(String),
}

/// A decoded element: its symbolic dictionary tag and its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CcnbElement {
    pub tag: Cow<'static, str>,
    pub children: Vec<CcnbNode>,
}

impl CcnbElement {
    /// Create an empty element. The tag is only checked against the
    /// dictionary when the element is encoded.
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tag: tag.into(),
            children: Vec::new(),
        }
    }

    /// Element holding a single BLOB.
    pub fn with_blob_value(tag: impl Into<Cow<'static, str>>, value: impl Into<Bytes>) -> Self {
        Self::new(tag).with(CcnbNode::Blob(value.into()))
    }

    /// Element holding a non-negative number as decimal UDATA.
    pub fn with_number_value(tag: impl Into<Cow<'static, str>>, value: u64) -> Self {
        Self::new(tag).with(CcnbNode::Udata(value.to_string()))
    }

    /// Append a child node.
    pub fn with(mut self, node: CcnbNode) -> Self {
        self.children.push(node);
        self
    }

    /// Append a nested element.
    pub fn with_element(self, element: CcnbElement) -> Self {
        self.with(CcnbNode::Element(element))
    }

    /// Append a nested element when one is given.
    pub fn with_optional(self, element: Option<CcnbElement>) -> Self {
        match element {
            Some(e) => self.with_element(e),
            None => self,
        }
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Iterate over the nested elements, skipping leaf values.
    pub fn elements(&self) -> impl Iterator<Item = &CcnbElement> {
        self.children.iter().filter_map(|c| match c {
            CcnbNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First nested element with the given tag.
    pub fn child(&self, tag: &str) -> Option<&CcnbElement> {
        self.elements().find(|e| e.is(tag))
    }

    /// Nested element with the given tag, or a codec error naming it.
    pub fn required(&self, tag: &str) -> Result<&CcnbElement, Error> {
        self.child(tag).ok_or_else(|| {
            Error::Codec(format!("<{}> is missing required <{}>", self.tag, tag))
        })
    }

    /// Concatenated BLOB content. An element without value children is empty.
    pub fn blob(&self) -> Result<Bytes, Error> {
        let mut blobs = self.children.iter().map(|c| match c {
            CcnbNode::Blob(b) => Ok(b.clone()),
            _ => Err(Error::Codec(format!("<{}> must contain only BLOB data", self.tag))),
        });
        match (blobs.next(), blobs.next()) {
            (None, _) => Ok(Bytes::new()),
            (Some(first), None) => first,
            (Some(first), Some(second)) => {
                let mut out = BytesMut::new();
                out.extend_from_slice(&first?);
                out.extend_from_slice(&second?);
                for b in blobs {
                    out.extend_from_slice(&b?);
                }
                Ok(out.freeze())
            }
        }
    }

    /// UDATA content as a string.
    pub fn udata(&self) -> Result<&str, Error> {
        match self.children.as_slice() {
            [CcnbNode::Udata(s)] => Ok(s),
            _ => Err(Error::Codec(format!("<{}> must contain a single UDATA value", self.tag))),
        }
    }

    /// UDATA content parsed as a non-negative decimal number.
    pub fn number(&self) -> Result<u64, Error> {
        let text = self.udata()?;
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Codec(format!("<{}> holds non-numeric value {:?}", self.tag, text)));
        }
        text.parse::<u64>()
            .map_err(|e| Error::Codec(format!("<{}> number out of range: {}", self.tag, e)))
    }

    /// Encode this element into `buf`.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        let code = dtag::code_of(&self.tag)?;
        encode_tt(code as u64, TT_DTAG, buf);
        for child in &self.children {
            match child {
                CcnbNode::Element(e) => e.encode(buf)?,
                CcnbNode::Blob(b) => encode_blob(b, buf),
                CcnbNode::Udata(s) => encode_udata(s, buf),
            }
        }
        buf.put_u8(CLOSE);
        Ok(())
    }

    /// Encode this element into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        let mut buf = BytesMut::with_capacity(self.encoded_len_hint());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode one element from the front of `buf`, leaving any trailing bytes.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, Error> {
        let (numval, tt) = decode_tt(buf)?;
        if tt != TT_DTAG {
            return Err(Error::Codec(format!(
                "Expected an element opening token, got token type {}",
                tt
            )));
        }
        Self::decode_body(numval, buf, 1)
    }

    /// Decode exactly one element from `bytes`; trailing bytes are an error.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, Error> {
        let mut buf: Bytes = bytes.into();
        if buf.is_empty() {
            return Err(Error::Codec("Empty input".into()));
        }
        let element = Self::decode(&mut buf)?;
        if buf.has_remaining() {
            return Err(Error::Codec(format!(
                "{} trailing bytes after <{}>",
                buf.remaining(),
                element.tag
            )));
        }
        Ok(element)
    }

    fn decode_body(code: u64, buf: &mut impl Buf, depth: usize) -> Result<Self, Error> {
        if depth > MAX_DEPTH {
            return Err(Error::Codec(format!("Elements nested deeper than {}", MAX_DEPTH)));
        }
        let code = u32::try_from(code).map_err(|_| Error::UnknownDtag(u32::MAX))?;
        let tag = dtag::name_of(code)?;
        let mut children = Vec::new();

        loop {
            match peek(&*buf) {
                None => {
                    return Err(Error::Codec(format!("Unterminated <{}>", tag)));
                }
                Some(CLOSE) => {
                    buf.advance(1);
                    break;
                }
                Some(_) => {}
            }

            let (numval, tt) = decode_tt(buf)?;
            let node = match tt {
                TT_DTAG => CcnbNode::Element(Self::decode_body(numval, buf, depth + 1)?),
                TT_BLOB => CcnbNode::Blob(take_value(buf, numval)?),
                TT_UDATA => {
                    let raw = take_value(buf, numval)?;
                    let text = String::from_utf8(raw.to_vec())
                        .map_err(|_| Error::Codec(format!("Invalid UTF-8 in <{}>", tag)))?;
                    CcnbNode::Udata(text)
                }
                TT_EXT | TT_TAG | TT_ATTR | TT_DATTR => {
                    return Err(Error::Codec(format!(
                        "Unsupported token type {} inside <{}>",
                        tt, tag
                    )));
                }
                _ => return Err(Error::Codec(format!("Invalid token type {}", tt))),
            };
            children.push(node);
        }

        Ok(Self {
            tag: Cow::Borrowed(tag),
            children,
        })
    }

    fn encoded_len_hint(&self) -> usize {
        self.children
            .iter()
            .map(|c| match c {
                CcnbNode::Element(e) => e.encoded_len_hint(),
                CcnbNode::Blob(b) => b.len() + 4,
                CcnbNode::Udata(s) => s.len() + 4,
            })
            .sum::<usize>()
            + 6
    }
}

impl fmt::Display for CcnbElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.children.is_empty() {
            return write!(f, "<{}/>", self.tag);
        }
        write!(f, "<{}>", self.tag)?;
        for child in &self.children {
            match child {
                CcnbNode::Element(e) => write!(f, "{}", e)?,
                CcnbNode::Blob(b) => {
                    for byte in b.iter() {
                        write!(f, "{:02x}", byte)?;
                    }
                }
                CcnbNode::Udata(s) => write!(f, "{}", s)?,
            }
        }
        write!(f, "</{}>", self.tag)
    }
}

/// Decode a sequence of elements, unwrapping an outer `CCNProtocolDataUnit`
/// framing when present.
pub fn decode_pdu(bytes: impl Into<Bytes>) -> Result<Vec<CcnbElement>, Error> {
    let mut buf: Bytes = bytes.into();
    let mut out = Vec::new();
    while buf.has_remaining() {
        let element = CcnbElement::decode(&mut buf)?;
        if element.is("CCNProtocolDataUnit") {
            for child in element.children {
                match child {
                    CcnbNode::Element(e) => out.push(e),
                    _ => {
                        return Err(Error::Codec(
                            "CCNProtocolDataUnit may only contain elements".into(),
                        ))
                    }
                }
            }
        } else {
            out.push(element);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_header_is_one_byte() {
        let mut buf = BytesMut::new();
        encode_tt(14, TT_DTAG, &mut buf);
        assert_eq!(buf.len(), 2);

        buf.clear();
        encode_tt(3, TT_BLOB, &mut buf);
        assert_eq!(buf.as_ref(), &[0x80 | (3 << 3) | TT_BLOB]);
    }

    #[test]
    fn test_header_number_widths() {
        for value in [0u64, 15, 16, 127, 2048, 17_702_112, u64::MAX] {
            let mut buf = BytesMut::new();
            encode_tt(value, TT_UDATA, &mut buf);
            // Only the final byte carries the high bit
            let (last, rest) = buf.split_last().unwrap();
            assert!(last & 0x80 != 0);
            assert!(rest.iter().all(|b| b & 0x80 == 0));
            let (decoded, tt) = decode_tt(&mut buf.freeze()).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(tt, TT_UDATA);
        }
    }

    #[test]
    fn test_decode_nested_element() {
        let element = CcnbElement::new("Name")
            .with_element(CcnbElement::with_blob_value("Component", &b"a"[..]))
            .with_element(CcnbElement::new("Component"));
        let wire = element.to_bytes().unwrap();
        let decoded = CcnbElement::from_bytes(wire).unwrap();
        assert_eq!(decoded, element);
        assert_eq!(decoded.elements().count(), 2);
        assert_eq!(decoded.child("Component").unwrap().blob().unwrap(), &b"a"[..]);
    }

    #[test]
    fn test_unknown_tag_fails_encode() {
        let element = CcnbElement::new("Bogus");
        assert_eq!(
            element.to_bytes(),
            Err(Error::UnknownTag("Bogus".to_string()))
        );
    }

    #[test]
    fn test_unknown_code_fails_decode() {
        let mut buf = BytesMut::new();
        encode_tt(9999, TT_DTAG, &mut buf);
        buf.put_u8(CLOSE);
        assert_eq!(
            CcnbElement::from_bytes(buf.freeze()),
            Err(Error::UnknownDtag(9999))
        );
    }

    #[test]
    fn test_truncated_and_trailing_input() {
        let wire = CcnbElement::with_blob_value("Nonce", &b"abcd"[..])
            .to_bytes()
            .unwrap();
        assert!(matches!(
            CcnbElement::from_bytes(wire.slice(..wire.len() - 1)),
            Err(Error::Codec(_))
        ));
        assert!(matches!(
            CcnbElement::from_bytes(wire.slice(..3)),
            Err(Error::Codec(_))
        ));

        let mut extra = BytesMut::from(&wire[..]);
        extra.put_u8(0x42);
        assert!(matches!(
            CcnbElement::from_bytes(extra.freeze()),
            Err(Error::Codec(_))
        ));
        assert!(matches!(CcnbElement::from_bytes(Bytes::new()), Err(Error::Codec(_))));
    }

    #[test]
    fn test_named_tag_tokens_rejected() {
        let mut buf = BytesMut::new();
        encode_tt(dtag::DTAG_NAME as u64, TT_DTAG, &mut buf);
        encode_tt(2, TT_TAG, &mut buf);
        buf.extend_from_slice(b"abc");
        buf.put_u8(CLOSE);
        assert!(matches!(CcnbElement::from_bytes(buf.freeze()), Err(Error::Codec(_))));
    }

    #[test]
    fn test_excessive_nesting_rejected() {
        let mut buf = BytesMut::new();
        for _ in 0..(MAX_DEPTH + 1) {
            encode_tt(dtag::DTAG_NAME as u64, TT_DTAG, &mut buf);
        }
        for _ in 0..(MAX_DEPTH + 1) {
            buf.put_u8(CLOSE);
        }
        assert!(matches!(CcnbElement::from_bytes(buf.freeze()), Err(Error::Codec(_))));
    }

    #[test]
    fn test_number_values() {
        let element = CcnbElement::with_number_value("Scope", 2);
        let decoded = CcnbElement::from_bytes(element.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.number().unwrap(), 2);

        let bad = CcnbElement::new("Scope").with(CcnbNode::Udata("-1".into()));
        assert!(bad.number().is_err());
    }

    #[test]
    fn test_pdu_unwraps_framing() {
        let inner = CcnbElement::with_number_value("Scope", 1);
        let pdu = CcnbElement::new("CCNProtocolDataUnit")
            .with_element(inner.clone())
            .with_element(inner.clone());
        let mut buf = BytesMut::new();
        pdu.encode(&mut buf).unwrap();
        inner.encode(&mut buf).unwrap();

        let elements = decode_pdu(buf.freeze()).unwrap();
        assert_eq!(elements, vec![inner.clone(), inner.clone(), inner]);
    }

    #[test]
    fn test_display_is_readable() {
        let element = CcnbElement::new("Name")
            .with_element(CcnbElement::with_blob_value("Component", &b"\xab"[..]));
        assert_eq!(element.to_string(), "<Name><Component>ab</Component></Name>");
    }
}
