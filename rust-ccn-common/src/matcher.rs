//! Deciding which content answers which Interest.
//!
//! Everything here is pure: the functions take shared references, never
//! touch the tables that call them and can run on any thread.
//!
//! A content object matches an Interest when all of these hold:
//!
//! * the Interest's match prefix (its name, or its parent name for sibling
//!   selectors) is a component-wise prefix of the content name
//! * the number of components after that prefix lies within the suffix bounds
//! * the child selector's structural rule holds (exact name for
//!   `EntirePrefix`, strictly later sibling for the sibling selectors)
//! * the component right after the prefix, if any, is not excluded
//! * the publisher matches when the Interest names one
//!
//! Where the content came from is a separate check, [`origin_allowed`],
//! since the same object can be a fresh cache hit, a stale one or a newly
//! generated answer.

use crate::ccn::{ChildSelector, ContentObject, Interest};
use crate::exclude::ComponentFilter;
use crate::name::{Name, NameComponent};

/// Where a candidate answer comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A fresh content store entry.
    ContentStore,
    /// A content store entry past its freshness period.
    StaleContentStore,
    /// Generated on demand by a producer, or arriving from upstream.
    Generated,
}

/// True if `content` satisfies `interest`, exclusion included.
pub fn matches(interest: &Interest, content: &ContentObject) -> bool {
    match interest.exclude() {
        Some(filter) => matches_with_filter(interest, content, filter),
        None => structure_matches(interest, content).is_some(),
    }
}

/// As [`matches`], but with `filter` standing in for the Interest's own
/// exclusion filter.
pub fn matches_with_filter<F>(interest: &Interest, content: &ContentObject, filter: &F) -> bool
where
    F: ComponentFilter + ?Sized,
{
    match structure_matches(interest, content) {
        Some(Some(next)) => !filter.excludes(next.as_bytes()),
        Some(None) => true,
        None => false,
    }
}

/// As [`matches`], also requiring the answer-origin policy to accept `origin`.
pub fn matches_from(interest: &Interest, content: &ContentObject, origin: Origin) -> bool {
    origin_allowed(interest, origin) && matches(interest, content)
}

/// True if the Interest's answer-origin policy accepts answers from `origin`.
pub fn origin_allowed(interest: &Interest, origin: Origin) -> bool {
    let kind = interest.answer_origin_kind();
    match origin {
        Origin::ContentStore => kind.allows_content_store(),
        Origin::StaleContentStore => kind.allows_content_store() && kind.allows_stale(),
        Origin::Generated => kind.allows_generated(),
    }
}

/// True if some name extending `prefix` could ever match `interest`.
///
/// Used to find the pending Interests worth testing against new content.
pub fn could_match_under(interest: &Interest, prefix: &Name) -> bool {
    interest.match_prefix_len() <= prefix.len()
        && interest.name().components()[..interest.match_prefix_len()]
            == prefix.components()[..interest.match_prefix_len()]
}

/// Picks the best matching candidate according to the child selector.
///
/// Leftmost and next-sibling selection pick the lowest name, rightmost and
/// last-sibling selection the highest. Candidates are taken in insertion
/// order, and among equal names the most recently inserted wins. `None` is
/// the ordinary "no answer yet" outcome.
pub fn select_best<'a, I>(interest: &Interest, candidates: I) -> Option<&'a ContentObject>
where
    I: IntoIterator<Item = &'a ContentObject>,
{
    let highest = interest.child_selector().prefers_highest();
    candidates
        .into_iter()
        .filter(|c| matches(interest, c))
        .fold(None, |best: Option<&'a ContentObject>, candidate| match best {
            Some(b) if better(candidate.name(), b.name(), highest) => Some(candidate),
            Some(b) => Some(b),
            None => Some(candidate),
        })
}

fn better(candidate: &Name, best: &Name, highest: bool) -> bool {
    if highest {
        candidate >= best
    } else {
        candidate <= best
    }
}

/// Checks every structural rule except exclusion. On success, returns the
/// component right after the match prefix, if the content name has one.
fn structure_matches<'a>(
    interest: &Interest,
    content: &'a ContentObject,
) -> Option<Option<&'a NameComponent>> {
    let wanted = interest.name().components();
    let have = content.name().components();
    let prefix_len = interest.match_prefix_len();

    if have.len() < prefix_len || wanted[..prefix_len] != have[..prefix_len] {
        return None;
    }

    let suffix = have.len() - prefix_len;
    if interest.min_suffix().is_some_and(|min| suffix < min)
        || interest.max_suffix().is_some_and(|max| suffix > max)
    {
        return None;
    }

    let next = have.get(prefix_len);
    match interest.child_selector() {
        ChildSelector::EntirePrefix if have.len() != wanted.len() => return None,
        ChildSelector::NextSibling | ChildSelector::LastSibling => {
            // Sibling selectors always carry a non-empty name.
            match (next, wanted.last()) {
                (Some(n), Some(last)) if n > last => {}
                _ => return None,
            }
        }
        _ => {}
    }

    if let Some(publisher) = interest.publisher_id() {
        if content.publisher_id() != publisher {
            return None;
        }
    }

    Some(next)
}
