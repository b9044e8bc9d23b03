//! Hierarchical names.
//!
//! A name is an ordered sequence of opaque binary components. Names are
//! immutable: every operation that extends a name returns a new one.

use crate::ccnb::CcnbElement;
use crate::error::Error;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marker byte that opens a version component.
pub const VERSION_MARKER: u8 = 0xFD;

/// Marker byte that opens a segment component.
pub const SEGMENT_MARKER: u8 = 0x00;

const URI_SCHEME: &str = "ccnx:";

/// Represents a name component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NameComponent(pub Bytes);

impl NameComponent {
    /// Creates a new name component from a byte slice.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Returns the component as bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Version component: the marker byte followed by the big-endian value
    /// without leading zero bytes.
    pub fn version(version: u64) -> Self {
        Self::marked(VERSION_MARKER, version)
    }

    /// Segment component: the marker byte followed by the big-endian index
    /// without leading zero bytes.
    pub fn segment(index: u64) -> Self {
        Self::marked(SEGMENT_MARKER, index)
    }

    /// The version value if this is a version component.
    pub fn as_version(&self) -> Option<u64> {
        self.unmarked(VERSION_MARKER)
    }

    /// The segment index if this is a segment component.
    pub fn as_segment(&self) -> Option<u64> {
        self.unmarked(SEGMENT_MARKER)
    }

    fn marked(marker: u8, value: u64) -> Self {
        let be = value.to_be_bytes();
        let skip = be.iter().take_while(|&&b| b == 0).count();
        let mut buf = BytesMut::with_capacity(1 + be.len() - skip);
        buf.extend_from_slice(&[marker]);
        buf.extend_from_slice(&be[skip..]);
        Self(buf.freeze())
    }

    fn unmarked(&self, marker: u8) -> Option<u64> {
        match self.0.split_first() {
            Some((&m, rest)) if m == marker && rest.len() <= 8 => {
                Some(rest.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
            }
            _ => None,
        }
    }

    /// Encodes this component as an element.
    pub fn to_element(&self) -> CcnbElement {
        CcnbElement::with_blob_value("Component", self.0.clone())
    }

    /// Decodes a component from an element.
    pub fn from_element(element: &CcnbElement) -> Result<Self, Error> {
        if !element.is("Component") {
            return Err(Error::MalformedName(format!(
                "Expected <Component>, got <{}>",
                element.tag
            )));
        }
        let value = element
            .blob()
            .map_err(|e| Error::MalformedName(e.to_string()))?;
        Ok(Self(value))
    }

    fn parse_uri_segment(segment: &str) -> Result<Self, Error> {
        let mut out = Vec::with_capacity(segment.len());
        let bytes = segment.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| {
                        Error::MalformedName(format!("Invalid percent escape in {:?}", segment))
                    })?;
                out.push(hex);
                i += 3;
            } else {
                out.push(bytes[i]);
                i += 1;
            }
        }

        // A component made only of dots loses three of them; "." and ".." are invalid.
        if !out.is_empty() && out.iter().all(|&b| b == b'.') {
            if out.len() < 3 {
                return Err(Error::MalformedName(format!(
                    "Relative component {:?} is not allowed",
                    segment
                )));
            }
            out.truncate(out.len() - 3);
        }
        Ok(Self(Bytes::from(out)))
    }
}

impl From<&str> for NameComponent {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<&[u8]> for NameComponent {
    fn from(b: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(b))
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().all(|&b| b == b'.') {
            // Covers the empty component too
            return write!(f, "...{}", ".".repeat(self.0.len()));
        }
        for &b in self.0.iter() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'+' | b',' | b'=') {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "%{:02X}", b)?;
            }
        }
        Ok(())
    }
}

/// Represents a name, which is a sequence of name components.
///
/// Names order component by component, each component compared as a byte
/// string, and a name sorts before every proper extension of itself. All
/// names sharing a prefix are therefore contiguous in that order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    /// Creates a new empty name.
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Creates a name from its components.
    pub fn from_components(components: impl IntoIterator<Item = NameComponent>) -> Self {
        Self {
            components: components.into_iter().collect(),
        }
    }

    /// Parses the URI form, e.g. `ccnx:/parc/%00%01/...`.
    ///
    /// The scheme is optional, `%XX` escapes any byte and a component of only
    /// dots stands for the same component with three dots removed.
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        let path = uri.strip_prefix(URI_SCHEME).unwrap_or(uri);
        if path.contains(['?', '#']) {
            return Err(Error::MalformedName(format!(
                "Query or fragment not allowed in {:?}",
                uri
            )));
        }
        let components = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(NameComponent::parse_uri_segment)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }

    /// Returns the number of components in the name.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if the name has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns the name components.
    pub fn components(&self) -> &[NameComponent] {
        &self.components
    }

    /// Gets a component at the specified index.
    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    /// Gets a component at the specified index, failing past the end.
    pub fn component(&self, index: usize) -> Result<&NameComponent, Error> {
        self.components.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.components.len(),
        })
    }

    /// Returns the last component, if any.
    pub fn last(&self) -> Option<&NameComponent> {
        self.components.last()
    }

    /// Returns a prefix of this name with the specified length.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            components: self.components.iter().take(len).cloned().collect(),
        }
    }

    /// Checks if this name is a prefix of another name.
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.components[..] == other.components[..self.len()]
    }

    /// Returns a new name with `component` appended.
    pub fn append(&self, component: impl Into<NameComponent>) -> Self {
        let mut components = Vec::with_capacity(self.components.len() + 1);
        components.extend_from_slice(&self.components);
        components.push(component.into());
        Self { components }
    }

    /// Returns a new name with every component of `suffix` appended.
    pub fn concat(&self, suffix: &Name) -> Self {
        let mut components = self.components.clone();
        components.extend_from_slice(&suffix.components);
        Self { components }
    }

    /// Returns a new name with a version component appended.
    pub fn append_version(&self, version: u64) -> Self {
        self.append(NameComponent::version(version))
    }

    /// Returns a new name with a segment component appended.
    pub fn append_segment(&self, index: u64) -> Self {
        self.append(NameComponent::segment(index))
    }

    /// The components following `prefix`, or `None` if `prefix` does not
    /// prefix this name.
    pub fn postfix(&self, prefix: &Name) -> Option<Self> {
        if !prefix.is_prefix_of(self) {
            return None;
        }
        Some(Self {
            components: self.components[prefix.len()..].to_vec(),
        })
    }

    /// Encodes this name as an element.
    pub fn to_element(&self) -> CcnbElement {
        self.components
            .iter()
            .fold(CcnbElement::new("Name"), |el, c| el.with_element(c.to_element()))
    }

    /// Decodes a name from an element.
    pub fn from_element(element: &CcnbElement) -> Result<Self, Error> {
        if !element.is("Name") {
            return Err(Error::MalformedName(format!(
                "Expected <Name>, got <{}>",
                element.tag
            )));
        }
        if element.children.len() != element.elements().count() {
            return Err(Error::MalformedName("<Name> may only contain <Component> elements".into()));
        }
        let components = element
            .elements()
            .map(NameComponent::from_element)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }

        for component in &self.components {
            write!(f, "/{}", component)?;
        }

        Ok(())
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn test_name_creation() {
        let name = name("ccnx:/test/data/1");
        assert_eq!(name.len(), 3);
        assert_eq!(name.components()[0].as_bytes(), &b"test"[..]);
        assert_eq!(name.components()[2].as_bytes(), &b"1"[..]);
        assert_eq!(name.to_string(), "/test/data/1");
    }

    #[test]
    fn test_uri_escapes_and_dots() {
        let n = name("/a%2Fb/.../....");
        assert_eq!(n.component(0).unwrap().as_bytes(), &b"a/b"[..]);
        assert!(n.component(1).unwrap().is_empty());
        assert_eq!(n.component(2).unwrap().as_bytes(), &b"."[..]);
        assert_eq!(n.to_string(), "/a%2Fb/.../....");
        assert_eq!(Name::from_uri(&n.to_string()).unwrap(), n);

        assert!(matches!(Name::from_uri("/a/../b"), Err(Error::MalformedName(_))));
        assert!(matches!(Name::from_uri("/a/%zz"), Err(Error::MalformedName(_))));
        assert!(matches!(Name::from_uri("/a/%4"), Err(Error::MalformedName(_))));
    }

    #[test]
    fn test_component_out_of_range() {
        let n = name("/a/b");
        assert_eq!(
            n.component(2),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_prefix_is_component_wise() {
        let abc = name("/a/b/c");
        let ab = name("/a/b");
        assert!(ab.is_prefix_of(&abc));
        assert!(!abc.is_prefix_of(&ab));
        assert!(Name::new().is_prefix_of(&ab));
        // A partial component never matches
        assert!(!name("/a/b").is_prefix_of(&name("/a/bc")));
    }

    #[test]
    fn test_append_does_not_mutate() {
        let base = name("/a");
        for c in ["", "x", "\u{7f}"] {
            let extended = base.append(c);
            assert!(base.is_prefix_of(&extended));
            assert_eq!(extended.len(), base.len() + 1);
        }
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_ordering() {
        assert_eq!(name("/a").cmp(&name("/a/b")), Ordering::Less);
        assert_eq!(name("/a/b").cmp(&name("/a/c")), Ordering::Less);
        assert_eq!(name("/a/z").cmp(&name("/ab")), Ordering::Less);
        assert_eq!(name("/a/b").cmp(&name("/a/b")), Ordering::Equal);
        assert_eq!(name("/b").cmp(&name("/a/b/c")), Ordering::Greater);
    }

    #[test]
    fn test_version_and_segment_components() {
        let n = name("/file").append_version(0x0102).append_segment(0);
        assert_eq!(n.component(1).unwrap().as_bytes(), &[0xFDu8, 0x01, 0x02][..]);
        assert_eq!(n.component(1).unwrap().as_version(), Some(0x0102));
        assert_eq!(n.component(2).unwrap().as_bytes(), &[0x00u8][..]);
        assert_eq!(n.component(2).unwrap().as_segment(), Some(0));
        assert_eq!(n.component(0).unwrap().as_version(), None);
    }

    #[test]
    fn test_postfix() {
        let n = name("/prefix/dir/file.txt");
        assert_eq!(n.postfix(&name("/prefix")), Some(name("/dir/file.txt")));
        assert_eq!(n.postfix(&name("/other")), None);
    }

    #[test]
    fn test_element_form() {
        let n = name("/a/.../c");
        let element = n.to_element();
        assert_eq!(Name::from_element(&element).unwrap(), n);

        let decoded = CcnbElement::from_bytes(element.to_bytes().unwrap()).unwrap();
        assert_eq!(Name::from_element(&decoded).unwrap(), n);

        let wrong = CcnbElement::new("Interest");
        assert!(matches!(Name::from_element(&wrong), Err(Error::MalformedName(_))));
    }
}
