//! Interest and ContentObject messages.
//!
//! This module provides typed views over decoded protocol elements. Both
//! message kinds are immutable once built: the `with_*` builders consume and
//! return the value, and every selector invariant is checked at the point
//! where the selector is set or decoded.

use crate::ccnb::{self, CcnbElement, CcnbNode};
use crate::error::Error;
use crate::exclude::ExcludeFilter;
use crate::name::Name;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/* ---------------------------------------------------------------- *
 * Selectors
 * ---------------------------------------------------------------- */

/// Preferred ordering among several acceptable answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChildSelector {
    /// Lowest matching name.
    #[default]
    LeftmostDescendant,
    /// Highest matching name.
    RightmostDescendant,
    /// Lowest sibling sorting after the Interest's last component.
    NextSibling,
    /// Highest sibling sorting after the Interest's last component.
    LastSibling,
    /// Only the Interest name itself.
    EntirePrefix,
}

impl ChildSelector {
    pub fn tag(&self) -> &'static str {
        match self {
            ChildSelector::LeftmostDescendant => "MatchFirstAvailableDescendant",
            ChildSelector::RightmostDescendant => "MatchLastAvailableDescendant",
            ChildSelector::NextSibling => "MatchNextAvailableSibling",
            ChildSelector::LastSibling => "MatchLastAvailableSibling",
            ChildSelector::EntirePrefix => "MatchEntirePrefix",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "MatchFirstAvailableDescendant" => Some(ChildSelector::LeftmostDescendant),
            "MatchLastAvailableDescendant" => Some(ChildSelector::RightmostDescendant),
            "MatchNextAvailableSibling" => Some(ChildSelector::NextSibling),
            "MatchLastAvailableSibling" => Some(ChildSelector::LastSibling),
            "MatchEntirePrefix" => Some(ChildSelector::EntirePrefix),
            _ => None,
        }
    }

    /// True for the selectors that match against the parent of the Interest name.
    pub fn is_sibling(&self) -> bool {
        matches!(self, ChildSelector::NextSibling | ChildSelector::LastSibling)
    }

    /// True when the highest-sorting candidate wins.
    pub fn prefers_highest(&self) -> bool {
        matches!(
            self,
            ChildSelector::RightmostDescendant | ChildSelector::LastSibling
        )
    }
}

/// Which kinds of answer an Interest accepts, as a bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnswerOriginKind(u8);

impl AnswerOriginKind {
    /// Answers already held in a content store.
    pub const CONTENT_STORE: u8 = 1;
    /// Answers generated on demand by a producer.
    pub const GENERATED: u8 = 2;
    /// Cached answers past their freshness period.
    pub const STALE: u8 = 4;

    const ALL: u8 = Self::CONTENT_STORE | Self::GENERATED | Self::STALE;

    pub fn new(bits: u8) -> Result<Self, Error> {
        if bits == 0 {
            return Err(Error::InvalidSelector(
                "AnswerOriginKind must allow at least one origin".into(),
            ));
        }
        if bits & !Self::ALL != 0 {
            return Err(Error::InvalidSelector(format!(
                "AnswerOriginKind has unknown bits {:#x}",
                bits & !Self::ALL
            )));
        }
        Ok(Self(bits))
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn allows_content_store(&self) -> bool {
        self.0 & Self::CONTENT_STORE != 0
    }

    pub fn allows_generated(&self) -> bool {
        self.0 & Self::GENERATED != 0
    }

    pub fn allows_stale(&self) -> bool {
        self.0 & Self::STALE != 0
    }
}

impl Default for AnswerOriginKind {
    fn default() -> Self {
        Self(Self::CONTENT_STORE | Self::GENERATED)
    }
}

/* ---------------------------------------------------------------- *
 * Interest
 * ---------------------------------------------------------------- */

/// A consumer's request for named content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    name: Name,
    min_suffix: Option<usize>,
    max_suffix: Option<usize>,
    publisher_id: Option<Bytes>,
    exclude: Option<ExcludeFilter>,
    child_selector: ChildSelector,
    answer_origin_kind: AnswerOriginKind,
    scope: Option<u32>,
    lifetime: Option<Duration>,
    nonce: Option<Bytes>,
}

impl Interest {
    /// Creates an Interest with default selectors.
    pub fn new(name: Name) -> Self {
        Self {
            name,
            min_suffix: None,
            max_suffix: None,
            publisher_id: None,
            exclude: None,
            child_selector: ChildSelector::default(),
            answer_origin_kind: AnswerOriginKind::default(),
            scope: None,
            lifetime: None,
            nonce: None,
        }
    }

    /// Sets the minimum number of components after the prefix.
    pub fn with_min_suffix(mut self, min: usize) -> Result<Self, Error> {
        check_suffix_range(Some(min), self.max_suffix)?;
        self.min_suffix = Some(min);
        Ok(self)
    }

    /// Sets the maximum number of components after the prefix.
    pub fn with_max_suffix(mut self, max: usize) -> Result<Self, Error> {
        check_suffix_range(self.min_suffix, Some(max))?;
        self.max_suffix = Some(max);
        Ok(self)
    }

    pub fn with_publisher_id(mut self, publisher_id: impl Into<Bytes>) -> Self {
        self.publisher_id = Some(publisher_id.into());
        self
    }

    /// Attaches an exclusion filter. An empty filter is the same as none.
    pub fn with_exclude(mut self, exclude: ExcludeFilter) -> Self {
        self.exclude = if exclude.is_empty() { None } else { Some(exclude) };
        self
    }

    /// Sets the child selector. Sibling selectors need a non-empty name.
    pub fn with_child_selector(mut self, selector: ChildSelector) -> Result<Self, Error> {
        if selector.is_sibling() && self.name.is_empty() {
            return Err(Error::InvalidSelector(format!(
                "{} needs a non-empty name",
                selector.tag()
            )));
        }
        self.child_selector = selector;
        Ok(self)
    }

    pub fn with_answer_origin_kind(mut self, kind: AnswerOriginKind) -> Self {
        self.answer_origin_kind = kind;
        self
    }

    /// Sets the hop bound: 0 stays in the local content store, 1 stays on this node.
    pub fn with_scope(mut self, scope: u32) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Sets how long the Interest may stay pending. Wire precision is whole
    /// milliseconds, so the lifetime is truncated to a millisecond here.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(Duration::from_millis(lifetime_millis(lifetime)));
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<Bytes>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn min_suffix(&self) -> Option<usize> {
        self.min_suffix
    }

    pub fn max_suffix(&self) -> Option<usize> {
        self.max_suffix
    }

    pub fn publisher_id(&self) -> Option<&Bytes> {
        self.publisher_id.as_ref()
    }

    pub fn exclude(&self) -> Option<&ExcludeFilter> {
        self.exclude.as_ref()
    }

    pub fn child_selector(&self) -> ChildSelector {
        self.child_selector
    }

    pub fn answer_origin_kind(&self) -> AnswerOriginKind {
        self.answer_origin_kind
    }

    pub fn scope(&self) -> Option<u32> {
        self.scope
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime
    }

    pub fn nonce(&self) -> Option<&Bytes> {
        self.nonce.as_ref()
    }

    /// Number of leading components a matching name must share with this
    /// Interest. Sibling selectors match against the parent name.
    pub fn match_prefix_len(&self) -> usize {
        if self.child_selector.is_sibling() {
            self.name.len().saturating_sub(1)
        } else {
            self.name.len()
        }
    }

    /// The leading components a matching name must share with this Interest.
    pub fn match_prefix(&self) -> Name {
        self.name.prefix(self.match_prefix_len())
    }

    /// Encodes this Interest as an element.
    pub fn to_element(&self) -> CcnbElement {
        let order = (self.child_selector != ChildSelector::default()).then(|| {
            CcnbElement::new("OrderPreference")
                .with_element(CcnbElement::new(self.child_selector.tag()))
        });
        let aok = (self.answer_origin_kind != AnswerOriginKind::default()).then(|| {
            CcnbElement::with_number_value("AnswerOriginKind", self.answer_origin_kind.bits() as u64)
        });

        CcnbElement::new("Interest")
            .with_element(self.name.to_element())
            .with_optional(
                self.min_suffix
                    .map(|n| CcnbElement::with_number_value("MinSuffixComponents", n as u64)),
            )
            .with_optional(
                self.max_suffix
                    .map(|n| CcnbElement::with_number_value("MaxSuffixComponents", n as u64)),
            )
            .with_optional(
                self.publisher_id
                    .as_ref()
                    .map(|p| CcnbElement::with_blob_value("PublisherID", p.clone())),
            )
            .with_optional(self.exclude.as_ref().map(ExcludeFilter::to_element))
            .with_optional(order)
            .with_optional(aok)
            .with_optional(
                self.scope
                    .map(|s| CcnbElement::with_number_value("Scope", s as u64)),
            )
            .with_optional(self.lifetime.map(|l| {
                CcnbElement::with_number_value("InterestLifetime", lifetime_millis(l))
            }))
            .with_optional(
                self.nonce
                    .as_ref()
                    .map(|n| CcnbElement::with_blob_value("Nonce", n.clone())),
            )
    }

    /// Decodes and validates an Interest element.
    pub fn from_element(element: &CcnbElement) -> Result<Self, Error> {
        if !element.is("Interest") {
            return Err(Error::Codec(format!("Expected <Interest>, got <{}>", element.tag)));
        }
        let name = Name::from_element(element.required("Name")?)?;
        let mut interest = Interest::new(name);
        let mut seen: Vec<&str> = Vec::new();

        for child in only_elements(element)? {
            if seen.contains(&child.tag.as_ref()) {
                return Err(Error::Codec(format!("Repeated <{}> in <Interest>", child.tag)));
            }
            seen.push(child.tag.as_ref());

            match child.tag.as_ref() {
                "Name" => {}
                "MinSuffixComponents" => {
                    interest = interest.with_min_suffix(to_usize(child)?)?;
                }
                "MaxSuffixComponents" => {
                    interest = interest.with_max_suffix(to_usize(child)?)?;
                }
                "PublisherID" => interest = interest.with_publisher_id(child.blob()?),
                "Exclude" => interest = interest.with_exclude(ExcludeFilter::from_element(child)?),
                "OrderPreference" => {
                    let selector = match child.children.as_slice() {
                        [CcnbNode::Element(e)] if e.children.is_empty() => {
                            ChildSelector::from_tag(&e.tag)
                        }
                        _ => None,
                    }
                    .ok_or_else(|| {
                        Error::InvalidSelector(format!("Unrecognised {}", child))
                    })?;
                    interest = interest.with_child_selector(selector)?;
                }
                "AnswerOriginKind" => {
                    let bits = u8::try_from(child.number()?).map_err(|_| {
                        Error::InvalidSelector("AnswerOriginKind out of range".into())
                    })?;
                    interest = interest.with_answer_origin_kind(AnswerOriginKind::new(bits)?);
                }
                "Scope" => {
                    let scope = u32::try_from(child.number()?)
                        .map_err(|_| Error::Codec("<Scope> out of range".into()))?;
                    interest = interest.with_scope(scope);
                }
                "InterestLifetime" => {
                    interest = interest.with_lifetime(Duration::from_millis(child.number()?));
                }
                "Nonce" => interest = interest.with_nonce(child.blob()?),
                other => {
                    return Err(Error::Codec(format!("Unexpected <{}> inside <Interest>", other)));
                }
            }
        }
        Ok(interest)
    }

    /// Encodes this Interest to wire bytes.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        self.to_element().to_bytes()
    }

    /// Decodes an Interest from wire bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, Error> {
        Self::from_element(&CcnbElement::from_bytes(bytes)?)
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        match (self.min_suffix, self.max_suffix) {
            (None, None) => {}
            (min, max) => write!(
                f,
                " suffix=[{},{}]",
                min.unwrap_or(0),
                max.map_or_else(|| "*".to_string(), |m| m.to_string())
            )?,
        }
        if self.child_selector != ChildSelector::default() {
            write!(f, " {:?}", self.child_selector)?;
        }
        if let Some(scope) = self.scope {
            write!(f, " scope={}", scope)?;
        }
        Ok(())
    }
}

fn check_suffix_range(min: Option<usize>, max: Option<usize>) -> Result<(), Error> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(Error::SelectorConflict { min, max }),
        _ => Ok(()),
    }
}

fn to_usize(element: &CcnbElement) -> Result<usize, Error> {
    usize::try_from(element.number()?)
        .map_err(|_| Error::Codec(format!("<{}> out of range", element.tag)))
}

fn only_elements(element: &CcnbElement) -> Result<impl Iterator<Item = &CcnbElement>, Error> {
    if element.children.len() != element.elements().count() {
        return Err(Error::Codec(format!("<{}> may only contain elements", element.tag)));
    }
    Ok(element.elements())
}

/* ---------------------------------------------------------------- *
 * ContentObject
 * ---------------------------------------------------------------- */

/// Signature block of a content object. Opaque to the matching rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub digest_algorithm: Option<String>,
    pub bits: Bytes,
}

/// Publisher and cache metadata of a content object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInfo {
    pub publisher_id: Bytes,
    /// Milliseconds since the Unix epoch.
    pub timestamp: Option<u64>,
    pub content_type: Option<Bytes>,
    /// How long a cached copy stays fresh.
    pub freshness: Option<Duration>,
}

/// A named, signed unit of data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentObject {
    name: Name,
    signature: Signature,
    signed_info: SignedInfo,
    content: Bytes,
}

impl ContentObject {
    /// Creates an unsigned content object.
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            signature: Signature::default(),
            signed_info: SignedInfo::default(),
            content: content.into(),
        }
    }

    pub fn with_publisher_id(mut self, publisher_id: impl Into<Bytes>) -> Self {
        self.signed_info.publisher_id = publisher_id.into();
        self
    }

    pub fn with_timestamp(mut self, millis: u64) -> Self {
        self.signed_info.timestamp = Some(millis);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<Bytes>) -> Self {
        self.signed_info.content_type = Some(content_type.into());
        self
    }

    /// Sets the staleness hint. Wire precision is whole seconds.
    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.signed_info.freshness = Some(freshness);
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn publisher_id(&self) -> &Bytes {
        &self.signed_info.publisher_id
    }

    pub fn freshness(&self) -> Option<Duration> {
        self.signed_info.freshness
    }

    pub fn signed_info(&self) -> &SignedInfo {
        &self.signed_info
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Encodes this content object as an element.
    pub fn to_element(&self) -> CcnbElement {
        let signature = CcnbElement::new("Signature")
            .with_optional(self.signature.digest_algorithm.as_ref().map(|alg| {
                CcnbElement::new("DigestAlgorithm").with(CcnbNode::Udata(alg.clone()))
            }))
            .with_element(CcnbElement::with_blob_value(
                "SignatureBits",
                self.signature.bits.clone(),
            ));

        let info = &self.signed_info;
        let authenticator = CcnbElement::new("ContentAuthenticator")
            .with_element(CcnbElement::with_blob_value(
                "PublisherKeyID",
                info.publisher_id.clone(),
            ))
            .with_optional(
                info.timestamp
                    .map(|t| CcnbElement::with_number_value("Timestamp", t)),
            )
            .with_optional(
                info.content_type
                    .as_ref()
                    .map(|t| CcnbElement::with_blob_value("Type", t.clone())),
            )
            .with_optional(
                info.freshness
                    .map(|f| CcnbElement::with_number_value("FreshnessSeconds", f.as_secs())),
            );

        CcnbElement::new("ContentObject")
            .with_element(signature)
            .with_element(self.name.to_element())
            .with_element(authenticator)
            .with_element(CcnbElement::with_blob_value("Content", self.content.clone()))
    }

    /// Decodes a content object element.
    pub fn from_element(element: &CcnbElement) -> Result<Self, Error> {
        if !element.is("ContentObject") {
            return Err(Error::Codec(format!(
                "Expected <ContentObject>, got <{}>",
                element.tag
            )));
        }
        let parts: Vec<&CcnbElement> = only_elements(element)?.collect();
        let [sig, name, auth, content] = parts.as_slice() else {
            return Err(Error::Codec(
                "<ContentObject> must hold Signature, Name, ContentAuthenticator, Content".into(),
            ));
        };
        for (el, tag) in [
            (sig, "Signature"),
            (auth, "ContentAuthenticator"),
            (content, "Content"),
        ] {
            if !el.is(tag) {
                return Err(Error::Codec(format!("Expected <{}>, got <{}>", tag, el.tag)));
            }
        }

        let mut signature = Signature::default();
        for child in only_elements(sig)? {
            match child.tag.as_ref() {
                "DigestAlgorithm" => signature.digest_algorithm = Some(child.udata()?.to_string()),
                "SignatureBits" => signature.bits = child.blob()?,
                "Witness" => {}
                other => {
                    return Err(Error::Codec(format!("Unexpected <{}> inside <Signature>", other)));
                }
            }
        }

        let mut signed_info = SignedInfo {
            publisher_id: auth.required("PublisherKeyID")?.blob()?,
            ..SignedInfo::default()
        };
        for child in only_elements(auth)? {
            match child.tag.as_ref() {
                "PublisherKeyID" | "KeyLocator" => {}
                "Timestamp" => signed_info.timestamp = Some(child.number()?),
                "Type" => signed_info.content_type = Some(child.blob()?),
                "FreshnessSeconds" => {
                    signed_info.freshness = Some(Duration::from_secs(child.number()?));
                }
                other => {
                    return Err(Error::Codec(format!(
                        "Unexpected <{}> inside <ContentAuthenticator>",
                        other
                    )));
                }
            }
        }

        Ok(Self {
            name: Name::from_element(name)?,
            signature,
            signed_info,
            content: content.blob()?,
        })
    }

    /// Encodes this content object to wire bytes.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        self.to_element().to_bytes()
    }

    /// Decodes a content object from wire bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, Error> {
        Self::from_element(&CcnbElement::from_bytes(bytes)?)
    }
}

impl fmt::Display for ContentObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.name, self.content.len())
    }
}

/// Whole milliseconds of `lifetime`, saturating at `u64::MAX`.
fn lifetime_millis(lifetime: Duration) -> u64 {
    u64::try_from(lifetime.as_millis()).unwrap_or(u64::MAX)
}

/* ---------------------------------------------------------------- *
 * Messages
 * ---------------------------------------------------------------- */

/// Any top-level message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Interest(Interest),
    Content(ContentObject),
}

impl Message {
    pub fn from_element(element: &CcnbElement) -> Result<Self, Error> {
        match element.tag.as_ref() {
            "Interest" => Interest::from_element(element).map(Message::Interest),
            "ContentObject" => ContentObject::from_element(element).map(Message::Content),
            other => Err(Error::Codec(format!("<{}> is not a message", other))),
        }
    }

    /// Decodes exactly one message.
    pub fn decode(bytes: impl Into<Bytes>) -> Result<Self, Error> {
        Self::from_element(&CcnbElement::from_bytes(bytes)?)
    }

    /// Decodes a stream of messages, with or without PDU framing.
    pub fn decode_all(bytes: impl Into<Bytes>) -> Result<Vec<Self>, Error> {
        ccnb::decode_pdu(bytes)?
            .iter()
            .map(Self::from_element)
            .collect()
    }

    pub fn name(&self) -> &Name {
        match self {
            Message::Interest(i) => i.name(),
            Message::Content(c) => c.name(),
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        match self {
            Message::Interest(i) => i.to_bytes(),
            Message::Content(c) => c.to_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn test_suffix_conflict_rejected() {
        let result = Interest::new(name("/a"))
            .with_min_suffix(3)
            .unwrap()
            .with_max_suffix(1);
        assert_eq!(result, Err(Error::SelectorConflict { min: 3, max: 1 }));

        let ok = Interest::new(name("/a"))
            .with_max_suffix(2)
            .unwrap()
            .with_min_suffix(2)
            .unwrap();
        assert_eq!(ok.min_suffix(), Some(2));
    }

    #[test]
    fn test_answer_origin_kind_bits() {
        assert!(AnswerOriginKind::new(0).is_err());
        assert!(AnswerOriginKind::new(8).is_err());
        let kind = AnswerOriginKind::new(AnswerOriginKind::GENERATED).unwrap();
        assert!(kind.allows_generated());
        assert!(!kind.allows_content_store());
        assert!(!kind.allows_stale());
        assert!(AnswerOriginKind::default().allows_content_store());
    }

    #[test]
    fn test_sibling_selector_on_empty_name() {
        assert!(matches!(
            Interest::new(Name::new()).with_child_selector(ChildSelector::NextSibling),
            Err(Error::InvalidSelector(_))
        ));
        let interest = Interest::new(name("/a/b"))
            .with_child_selector(ChildSelector::NextSibling)
            .unwrap();
        assert_eq!(interest.match_prefix(), name("/a"));
    }

    #[test]
    fn test_interest_wire_form() {
        let interest = Interest::new(name("/x/y"))
            .with_min_suffix(1)
            .unwrap()
            .with_max_suffix(4)
            .unwrap()
            .with_publisher_id(&b"pub"[..])
            .with_exclude(ExcludeFilter::new().with_component("old"))
            .with_child_selector(ChildSelector::RightmostDescendant)
            .unwrap()
            .with_answer_origin_kind(AnswerOriginKind::new(5).unwrap())
            .with_scope(1)
            .with_lifetime(Duration::from_millis(2500))
            .with_nonce(&b"\x01\x02\x03\x04"[..]);
        let decoded = Interest::from_bytes(interest.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, interest);

        let minimal = Interest::new(name("/x"));
        let wire = minimal.to_bytes().unwrap();
        assert_eq!(Interest::from_bytes(wire).unwrap(), minimal);
    }

    #[test]
    fn test_lifetime_kept_to_the_millisecond() {
        let interest = Interest::new(name("/x")).with_lifetime(Duration::from_micros(1500));
        assert_eq!(interest.lifetime(), Some(Duration::from_millis(1)));
        let decoded = Interest::from_bytes(interest.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, interest);

        let huge = Interest::new(name("/x")).with_lifetime(Duration::MAX);
        assert_eq!(huge.lifetime(), Some(Duration::from_millis(u64::MAX)));
        let decoded = Interest::from_bytes(huge.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.lifetime(), Some(Duration::from_millis(u64::MAX)));
    }

    #[test]
    fn test_interest_decode_rejects_bad_selectors() {
        let conflict = CcnbElement::new("Interest")
            .with_element(name("/a").to_element())
            .with_element(CcnbElement::with_number_value("MinSuffixComponents", 5))
            .with_element(CcnbElement::with_number_value("MaxSuffixComponents", 2));
        assert_eq!(
            Interest::from_element(&conflict),
            Err(Error::SelectorConflict { min: 5, max: 2 })
        );

        let zero_aok = CcnbElement::new("Interest")
            .with_element(name("/a").to_element())
            .with_element(CcnbElement::with_number_value("AnswerOriginKind", 0));
        assert!(matches!(
            Interest::from_element(&zero_aok),
            Err(Error::InvalidSelector(_))
        ));

        let bad_order = CcnbElement::new("Interest")
            .with_element(name("/a").to_element())
            .with_element(CcnbElement::new("OrderPreference").with_element(CcnbElement::new("Nonce")));
        assert!(matches!(
            Interest::from_element(&bad_order),
            Err(Error::InvalidSelector(_))
        ));

        let no_name = CcnbElement::new("Interest");
        assert!(matches!(Interest::from_element(&no_name), Err(Error::Codec(_))));
    }

    #[test]
    fn test_malformed_name_inside_interest() {
        let element = CcnbElement::new("Interest").with_element(
            CcnbElement::new("Name").with_element(CcnbElement::with_number_value("Component", 1)),
        );
        assert!(matches!(
            Interest::from_element(&element),
            Err(Error::MalformedName(_))
        ));
    }

    #[test]
    fn test_content_object_wire_form() {
        let content = ContentObject::new(name("/x/v1"), &b"hello"[..])
            .with_publisher_id(&b"key"[..])
            .with_timestamp(1_700_000_000_000)
            .with_freshness(Duration::from_secs(30))
            .with_signature(Signature {
                digest_algorithm: Some("2.16.840.1.101.3.4.2.1".into()),
                bits: Bytes::from_static(b"sig"),
            });
        let decoded = ContentObject::from_bytes(content.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, content);
        assert_eq!(decoded.freshness(), Some(Duration::from_secs(30)));
        assert_eq!(decoded.content().as_ref(), b"hello");
    }

    #[test]
    fn test_message_stream() {
        let interest = Interest::new(name("/a"));
        let content = ContentObject::new(name("/a/1"), Bytes::new());
        let pdu = CcnbElement::new("CCNProtocolDataUnit")
            .with_element(interest.to_element())
            .with_element(content.to_element());
        let messages = Message::decode_all(pdu.to_bytes().unwrap()).unwrap();
        assert_eq!(
            messages,
            vec![Message::Interest(interest), Message::Content(content)]
        );
        assert!(Message::decode(name("/a").to_element().to_bytes().unwrap()).is_err());
    }
}
