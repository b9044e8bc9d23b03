//! Per-Interest exclusion of the next name component.
//!
//! An exclusion filter is an ordered list of entries, each either a literal
//! component value or a seeded Bloom filter block. A component is excluded
//! when any entry matches it. Bloom blocks can report false positives but
//! never false negatives, so a compact filter may exclude a little more than
//! the issuer asked for and never less.

use crate::ccnb::{CcnbElement, CcnbNode};
use crate::error::Error;
use crate::name::NameComponent;
use bytes::{Bytes, BytesMut};
use log::debug;
use serde::{Deserialize, Serialize};

/// Largest bit array carried by a single Bloom block, in bytes.
pub const MAX_BLOOM_BYTES: usize = 1024;

/// Largest number of hash rounds per Bloom block.
pub const MAX_BLOOM_HASHES: u8 = 16;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Anything that can decide whether a next component is excluded.
pub trait ComponentFilter {
    fn excludes(&self, component: &[u8]) -> bool;
}

/* ---------------------------------------------------------------- *
 * Bloom block
 * ---------------------------------------------------------------- */

/// A seeded Bloom filter over name components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BloomFilter {
    seed: Bytes,
    hash_count: u8,
    bits: Bytes,
}

impl BloomFilter {
    /// Wraps an existing bit array, e.g. one read off the wire.
    pub fn from_parts(
        seed: impl Into<Bytes>,
        hash_count: u8,
        bits: impl Into<Bytes>,
    ) -> Result<Self, Error> {
        let bits = bits.into();
        Self::check_params(hash_count, bits.len())?;
        Ok(Self {
            seed: seed.into(),
            hash_count,
            bits,
        })
    }

    /// Builds a filter of `size_bytes` bytes holding every value in `components`.
    pub fn build<I, C>(
        seed: impl Into<Bytes>,
        hash_count: u8,
        size_bytes: usize,
        components: I,
    ) -> Result<Self, Error>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self::check_params(hash_count, size_bytes)?;
        let seed = seed.into();
        let nbits = size_bytes * 8;
        let mut bits = vec![0u8; size_bytes];
        for component in components {
            for idx in bit_indexes(&seed, hash_count, nbits, component.as_ref()) {
                bits[idx / 8] |= 1 << (idx % 8);
            }
        }
        Ok(Self {
            seed,
            hash_count,
            bits: Bytes::from(bits),
        })
    }

    /// Suggested `(size_bytes, hash_count)` for `n` values: ten bits per
    /// value and seven rounds, bounded by the wire limits.
    pub fn dimensions_for(n: usize) -> (usize, u8) {
        let size = ((n.max(1) * 10 + 7) / 8).clamp(8, MAX_BLOOM_BYTES);
        (size, 7)
    }

    /// Tests membership. Every value the filter was built from tests positive.
    pub fn contains(&self, component: &[u8]) -> bool {
        let nbits = self.bits.len() * 8;
        if nbits == 0 {
            return false;
        }
        bit_indexes(&self.seed, self.hash_count, nbits, component)
            .all(|idx| self.bits[idx / 8] & (1 << (idx % 8)) != 0)
    }

    pub fn seed(&self) -> &Bytes {
        &self.seed
    }

    pub fn hash_count(&self) -> u8 {
        self.hash_count
    }

    pub fn bits(&self) -> &Bytes {
        &self.bits
    }

    fn check_params(hash_count: u8, size_bytes: usize) -> Result<(), Error> {
        if hash_count == 0 || hash_count > MAX_BLOOM_HASHES {
            return Err(Error::InvalidBloom(format!(
                "hash count {} outside 1..={}",
                hash_count, MAX_BLOOM_HASHES
            )));
        }
        if size_bytes == 0 || size_bytes > MAX_BLOOM_BYTES {
            return Err(Error::InvalidBloom(format!(
                "bit array of {} bytes outside 1..={}",
                size_bytes, MAX_BLOOM_BYTES
            )));
        }
        Ok(())
    }

    fn to_elements(&self) -> [CcnbElement; 2] {
        let mut body = BytesMut::with_capacity(1 + self.bits.len());
        body.extend_from_slice(&[self.hash_count]);
        body.extend_from_slice(&self.bits);
        [
            CcnbElement::with_blob_value("BloomSeed", self.seed.clone()),
            CcnbElement::with_blob_value("Bloom", body.freeze()),
        ]
    }

    fn from_element(element: &CcnbElement, seed: Bytes) -> Result<Self, Error> {
        let body = element.blob()?;
        let (&hash_count, _) = body
            .split_first()
            .ok_or_else(|| Error::Codec("<Bloom> is empty".into()))?;
        Self::from_parts(seed, hash_count, body.slice(1..))
            .map_err(|e| Error::Codec(e.to_string()))
    }
}

impl ComponentFilter for BloomFilter {
    fn excludes(&self, component: &[u8]) -> bool {
        self.contains(component)
    }
}

/// Seeded FNV-1a with a murmur-style finaliser, one round per hash index.
fn bloom_hash(seed: &[u8], round: u8, component: &[u8]) -> u32 {
    let mut h = FNV_OFFSET;
    let len = (component.len() as u32).to_le_bytes();
    for &b in seed.iter().chain(&[round]).chain(&len).chain(component) {
        h ^= b as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^ (h >> 16)
}

fn bit_indexes<'a>(
    seed: &'a [u8],
    hash_count: u8,
    nbits: usize,
    component: &'a [u8],
) -> impl Iterator<Item = usize> + 'a {
    (0..hash_count).map(move |round| bloom_hash(seed, round, component) as usize % nbits)
}

/* ---------------------------------------------------------------- *
 * Exclusion filter
 * ---------------------------------------------------------------- */

/// One entry of an exclusion filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExclusionEntry {
    Component(NameComponent),
    Bloom(BloomFilter),
}

impl ExclusionEntry {
    fn excludes(&self, component: &[u8]) -> bool {
        match self {
            ExclusionEntry::Component(c) => c.as_bytes().as_ref() == component,
            ExclusionEntry::Bloom(b) => b.contains(component),
        }
    }
}

/// The exclusion filter attached to an Interest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExcludeFilter {
    entries: Vec<ExclusionEntry>,
}

impl ExcludeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a literal component entry.
    pub fn with_component(mut self, component: impl Into<NameComponent>) -> Self {
        self.entries.push(ExclusionEntry::Component(component.into()));
        self
    }

    /// Adds a Bloom block entry.
    pub fn with_bloom(mut self, bloom: BloomFilter) -> Self {
        self.entries.push(ExclusionEntry::Bloom(bloom));
        self
    }

    /// Builds a filter excluding `values`: literal entries when there are at
    /// most `compact_threshold` of them, otherwise a single Bloom block.
    pub fn from_components(
        values: &[NameComponent],
        compact_threshold: usize,
        seed: impl Into<Bytes>,
    ) -> Result<Self, Error> {
        if values.len() <= compact_threshold {
            return Ok(values
                .iter()
                .cloned()
                .fold(Self::new(), |f, c| f.with_component(c)));
        }
        let (size, hashes) = BloomFilter::dimensions_for(values.len());
        debug!(
            "Compacting {} excluded components into a {}-byte Bloom block",
            values.len(),
            size
        );
        let bloom = BloomFilter::build(seed, hashes, size, values.iter().map(|c| c.as_bytes()))?;
        Ok(Self::new().with_bloom(bloom))
    }

    pub fn entries(&self) -> &[ExclusionEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if any entry matches or tests positive for `component`.
    pub fn excludes(&self, component: &[u8]) -> bool {
        self.entries.iter().any(|e| e.excludes(component))
    }

    /// Encodes this filter as an `<Exclude>` element.
    pub fn to_element(&self) -> CcnbElement {
        self.entries
            .iter()
            .fold(CcnbElement::new("Exclude"), |el, entry| match entry {
                ExclusionEntry::Component(c) => el.with_element(c.to_element()),
                ExclusionEntry::Bloom(b) => {
                    let [seed, bits] = b.to_elements();
                    el.with_element(seed).with_element(bits)
                }
            })
    }

    /// Decodes an `<Exclude>` element.
    pub fn from_element(element: &CcnbElement) -> Result<Self, Error> {
        if !element.is("Exclude") {
            return Err(Error::Codec(format!("Expected <Exclude>, got <{}>", element.tag)));
        }
        let mut entries = Vec::new();
        let mut pending_seed: Option<Bytes> = None;
        for child in &element.children {
            let child = match child {
                CcnbNode::Element(e) => e,
                _ => return Err(Error::Codec("<Exclude> may only contain elements".into())),
            };
            match child.tag.as_ref() {
                "Component" if pending_seed.is_none() => {
                    entries.push(ExclusionEntry::Component(NameComponent::from_element(child)?));
                }
                "BloomSeed" if pending_seed.is_none() => pending_seed = Some(child.blob()?),
                "Bloom" => {
                    let seed = pending_seed.take().unwrap_or_default();
                    entries.push(ExclusionEntry::Bloom(BloomFilter::from_element(child, seed)?));
                }
                other => {
                    return Err(Error::Codec(format!("Unexpected <{}> inside <Exclude>", other)));
                }
            }
        }
        if pending_seed.is_some() {
            return Err(Error::Codec("<BloomSeed> without a following <Bloom>".into()));
        }
        Ok(Self { entries })
    }
}

impl ComponentFilter for ExcludeFilter {
    fn excludes(&self, component: &[u8]) -> bool {
        ExcludeFilter::excludes(self, component)
    }
}

/* ---------------------------------------------------------------- *
 * Widened exclusion
 * ---------------------------------------------------------------- */

/// The exclusion used for an aggregate of several Interests: a component is
/// excluded only if every contributing filter excludes it. A contributor
/// without a filter makes the aggregate exclude nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidenedExclusion {
    filters: Vec<ExcludeFilter>,
    unrestricted: bool,
}

impl WidenedExclusion {
    /// Starts from the filter of the first contributing Interest.
    pub fn from_filter(filter: Option<&ExcludeFilter>) -> Self {
        match filter {
            Some(f) if !f.is_empty() => Self {
                filters: vec![f.clone()],
                unrestricted: false,
            },
            _ => Self::unrestricted(),
        }
    }

    fn unrestricted() -> Self {
        Self {
            filters: Vec::new(),
            unrestricted: true,
        }
    }

    /// Widens to also admit everything `filter` admits.
    pub fn widen(&mut self, filter: Option<&ExcludeFilter>) {
        if self.unrestricted {
            return;
        }
        match filter {
            Some(f) if !f.is_empty() => {
                if !self.filters.contains(f) {
                    self.filters.push(f.clone());
                }
            }
            _ => *self = Self::unrestricted(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }
}

impl ComponentFilter for WidenedExclusion {
    fn excludes(&self, component: &[u8]) -> bool {
        !self.unrestricted && self.filters.iter().all(|f| f.excludes(component))
    }
}
