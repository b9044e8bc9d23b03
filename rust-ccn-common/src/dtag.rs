//! Tag dictionary shared by both directions of the binary codec.
//!
//! Every element on the wire is opened by a numeric dictionary tag. The
//! table below is the single source of truth for the mapping between those
//! codes and the symbolic names used by the message model. It is consulted
//! through two indexes that are built once, on first use, and never mutated
//! afterwards.

use crate::error::Error;
use std::collections::HashMap;
use std::sync::OnceLock;

/* ---------------------------------------------------------------- *
 * Dictionary codes
 * ---------------------------------------------------------------- */

pub const DTAG_NAME: u32 = 14;
pub const DTAG_COMPONENT: u32 = 15;
pub const DTAG_CERTIFICATE: u32 = 16;
pub const DTAG_COLLECTION: u32 = 17;
pub const DTAG_COMPLETE_NAME: u32 = 18;
pub const DTAG_CONTENT: u32 = 19;
pub const DTAG_CONTENT_AUTHENTICATOR: u32 = 20;
pub const DTAG_CONTENT_DIGEST: u32 = 21;
pub const DTAG_CONTENT_HASH: u32 = 22;
pub const DTAG_COUNT: u32 = 24;
pub const DTAG_HEADER: u32 = 25;
pub const DTAG_INTEREST: u32 = 26;
pub const DTAG_KEY: u32 = 27;
pub const DTAG_KEY_LOCATOR: u32 = 28;
pub const DTAG_KEY_NAME: u32 = 29;
pub const DTAG_LENGTH: u32 = 30;
pub const DTAG_LINK: u32 = 31;
pub const DTAG_LINK_AUTHENTICATOR: u32 = 32;
pub const DTAG_NAME_COMPONENT_COUNT: u32 = 33;
pub const DTAG_PUBLISHER_ID: u32 = 34;
pub const DTAG_PUBLISHER_KEY_ID: u32 = 35;
pub const DTAG_ROOT_DIGEST: u32 = 36;
pub const DTAG_SIGNATURE: u32 = 37;
pub const DTAG_START: u32 = 38;
pub const DTAG_TIMESTAMP: u32 = 39;
pub const DTAG_TYPE: u32 = 40;
pub const DTAG_NONCE: u32 = 41;
pub const DTAG_SCOPE: u32 = 42;
pub const DTAG_EXCLUDE: u32 = 43;
pub const DTAG_BLOOM: u32 = 44;
pub const DTAG_BLOOM_SEED: u32 = 45;
pub const DTAG_ORDER_PREFERENCE: u32 = 46;
pub const DTAG_ANSWER_ORIGIN_KIND: u32 = 47;
pub const DTAG_INTEREST_LIFETIME: u32 = 48;
pub const DTAG_WITNESS: u32 = 53;
pub const DTAG_SIGNATURE_BITS: u32 = 54;
pub const DTAG_DIGEST_ALGORITHM: u32 = 55;
pub const DTAG_FRESHNESS_SECONDS: u32 = 58;
pub const DTAG_CONTENT_OBJECT: u32 = 64;
pub const DTAG_MIN_SUFFIX_COMPONENTS: u32 = 83;
pub const DTAG_MAX_SUFFIX_COMPONENTS: u32 = 84;
pub const DTAG_MATCH_FIRST_AVAILABLE_DESCENDANT: u32 = 90;
pub const DTAG_MATCH_LAST_AVAILABLE_DESCENDANT: u32 = 91;
pub const DTAG_MATCH_NEXT_AVAILABLE_SIBLING: u32 = 92;
pub const DTAG_MATCH_LAST_AVAILABLE_SIBLING: u32 = 93;
pub const DTAG_MATCH_ENTIRE_PREFIX: u32 = 94;
pub const DTAG_CCN_PROTOCOL_DATA_UNIT: u32 = 17_702_112;
pub const DTAG_EXPERIMENTAL_RESPONSE_FILTER: u32 = 17_702_113;

/// A single dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictEntry {
    pub code: u32,
    pub name: &'static str,
}

const fn entry(code: u32, name: &'static str) -> DictEntry {
    DictEntry { code, name }
}

/// The dictionary, in table order.
pub static DICTIONARY: &[DictEntry] = &[
    entry(DTAG_NAME, "Name"),
    entry(DTAG_COMPONENT, "Component"),
    entry(DTAG_CERTIFICATE, "Certificate"),
    entry(DTAG_COLLECTION, "Collection"),
    entry(DTAG_COMPLETE_NAME, "CompleteName"),
    entry(DTAG_CONTENT, "Content"),
    entry(DTAG_CONTENT_AUTHENTICATOR, "ContentAuthenticator"),
    entry(DTAG_CONTENT_DIGEST, "ContentDigest"),
    entry(DTAG_CONTENT_HASH, "ContentHash"),
    entry(DTAG_CONTENT_OBJECT, "ContentObject"),
    entry(DTAG_COUNT, "Count"),
    entry(DTAG_HEADER, "Header"),
    entry(DTAG_INTEREST, "Interest"),
    entry(DTAG_KEY, "Key"),
    entry(DTAG_KEY_LOCATOR, "KeyLocator"),
    entry(DTAG_KEY_NAME, "KeyName"),
    entry(DTAG_LENGTH, "Length"),
    entry(DTAG_LINK, "Link"),
    entry(DTAG_LINK_AUTHENTICATOR, "LinkAuthenticator"),
    entry(DTAG_NAME_COMPONENT_COUNT, "NameComponentCount"),
    entry(DTAG_PUBLISHER_ID, "PublisherID"),
    entry(DTAG_PUBLISHER_KEY_ID, "PublisherKeyID"),
    entry(DTAG_ROOT_DIGEST, "RootDigest"),
    entry(DTAG_SIGNATURE, "Signature"),
    entry(DTAG_START, "Start"),
    entry(DTAG_TIMESTAMP, "Timestamp"),
    entry(DTAG_TYPE, "Type"),
    entry(DTAG_NONCE, "Nonce"),
    entry(DTAG_SCOPE, "Scope"),
    entry(DTAG_EXCLUDE, "Exclude"),
    entry(DTAG_BLOOM, "Bloom"),
    entry(DTAG_BLOOM_SEED, "BloomSeed"),
    entry(DTAG_ORDER_PREFERENCE, "OrderPreference"),
    entry(DTAG_ANSWER_ORIGIN_KIND, "AnswerOriginKind"),
    entry(DTAG_MATCH_FIRST_AVAILABLE_DESCENDANT, "MatchFirstAvailableDescendant"),
    entry(DTAG_MATCH_LAST_AVAILABLE_DESCENDANT, "MatchLastAvailableDescendant"),
    entry(DTAG_MATCH_NEXT_AVAILABLE_SIBLING, "MatchNextAvailableSibling"),
    entry(DTAG_MATCH_LAST_AVAILABLE_SIBLING, "MatchLastAvailableSibling"),
    entry(DTAG_MATCH_ENTIRE_PREFIX, "MatchEntirePrefix"),
    entry(DTAG_WITNESS, "Witness"),
    entry(DTAG_SIGNATURE_BITS, "SignatureBits"),
    entry(DTAG_DIGEST_ALGORITHM, "DigestAlgorithm"),
    entry(DTAG_CCN_PROTOCOL_DATA_UNIT, "CCNProtocolDataUnit"),
    entry(DTAG_EXPERIMENTAL_RESPONSE_FILTER, "ExperimentalResponseFilter"),
    // Selector and freshness tags used by the message model
    entry(DTAG_MIN_SUFFIX_COMPONENTS, "MinSuffixComponents"),
    entry(DTAG_MAX_SUFFIX_COMPONENTS, "MaxSuffixComponents"),
    entry(DTAG_INTEREST_LIFETIME, "InterestLifetime"),
    entry(DTAG_FRESHNESS_SECONDS, "FreshnessSeconds"),
];

struct Indexes {
    by_code: HashMap<u32, &'static str>,
    by_name: HashMap<&'static str, u32>,
}

fn indexes() -> &'static Indexes {
    static INDEXES: OnceLock<Indexes> = OnceLock::new();
    INDEXES.get_or_init(|| Indexes {
        by_code: DICTIONARY.iter().map(|e| (e.code, e.name)).collect(),
        by_name: DICTIONARY.iter().map(|e| (e.name, e.code)).collect(),
    })
}

/// Resolve a numeric code to its symbolic name.
pub fn name_of(code: u32) -> Result<&'static str, Error> {
    indexes()
        .by_code
        .get(&code)
        .copied()
        .ok_or(Error::UnknownDtag(code))
}

/// Resolve a symbolic name to its numeric code.
pub fn code_of(name: &str) -> Result<u32, Error> {
    indexes()
        .by_name
        .get(name)
        .copied()
        .ok_or_else(|| Error::UnknownTag(name.to_string()))
}

/// Resolve a symbolic name to the `'static` spelling stored in the table.
pub fn canonical(name: &str) -> Result<&'static str, Error> {
    let code = code_of(name)?;
    name_of(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_both_directions() {
        assert_eq!(name_of(DTAG_INTEREST).unwrap(), "Interest");
        assert_eq!(code_of("BloomSeed").unwrap(), DTAG_BLOOM_SEED);
        assert_eq!(
            code_of("MatchLastAvailableDescendant").unwrap(),
            DTAG_MATCH_LAST_AVAILABLE_DESCENDANT
        );
        assert_eq!(canonical("Exclude").unwrap(), "Exclude");
    }

    #[test]
    fn test_unknown_entries_fail() {
        assert_eq!(name_of(9999), Err(Error::UnknownDtag(9999)));
        assert_eq!(
            code_of("NotATag"),
            Err(Error::UnknownTag("NotATag".to_string()))
        );
    }

    #[test]
    fn test_table_is_a_bijection() {
        let codes: HashSet<_> = DICTIONARY.iter().map(|e| e.code).collect();
        let names: HashSet<_> = DICTIONARY.iter().map(|e| e.name).collect();
        assert_eq!(codes.len(), DICTIONARY.len());
        assert_eq!(names.len(), DICTIONARY.len());
    }
}
