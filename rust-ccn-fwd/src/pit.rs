//! Pending Interest Table.
//!
//! Interests that would accept the same set of content objects share one
//! entry. Two Interests belong together when their names and every selector
//! agree, except for the exclusion filter, the nonce, the scope and the
//! lifetime. The entry's exclusion is the widened intersection of its
//! waiters' filters, so any content acceptable to one waiter still reaches
//! the entry; each waiter's own Interest is re-checked before delivery.
//!
//! The table is a plain synchronous structure. Callers pass the current
//! time in, and serialise access themselves.

use bytes::Bytes;
use log::{debug, trace};
use rust_ccn_common::{
    exclude::WidenedExclusion,
    matcher::{self, Origin},
    types::FaceId,
    AnswerOriginKind, ChildSelector, ContentObject, Interest, Name,
};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

/* ---------------------------------------------------------------- *
 * Keys and entries
 * ---------------------------------------------------------------- */

/// The aggregation key of an Interest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PitKey {
    name: Name,
    min_suffix: Option<usize>,
    max_suffix: Option<usize>,
    publisher_id: Option<Bytes>,
    child_selector: ChildSelector,
    answer_origin_kind: AnswerOriginKind,
}

impl PitKey {
    pub fn from_interest(interest: &Interest) -> Self {
        Self {
            name: interest.name().clone(),
            min_suffix: interest.min_suffix(),
            max_suffix: interest.max_suffix(),
            publisher_id: interest.publisher_id().cloned(),
            child_selector: interest.child_selector(),
            answer_origin_kind: interest.answer_origin_kind(),
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }
}

/// One consumer waiting on an entry.
#[derive(Debug, Clone)]
pub struct Waiter {
    pub(crate) face: FaceId,
    pub(crate) interest: Interest,
    pub(crate) arrived: Instant,
    pub(crate) deadline: Instant,
}

impl Waiter {
    fn same_request(&self, face: FaceId, interest: &Interest) -> bool {
        self.face == face
            && self.interest.exclude() == interest.exclude()
            && self.interest.scope() == interest.scope()
    }
}

/// A pending entry: the waiters of one aggregation key, in arrival order.
#[derive(Debug)]
pub struct PitEntry {
    representative: Interest,
    match_prefix: Name,
    exclusion: WidenedExclusion,
    waiters: Vec<Waiter>,
    created: Instant,
}

impl PitEntry {
    fn new(waiter: Waiter) -> Self {
        Self {
            representative: waiter.interest.clone(),
            match_prefix: waiter.interest.match_prefix(),
            exclusion: WidenedExclusion::from_filter(waiter.interest.exclude()),
            created: waiter.arrived,
            waiters: vec![waiter],
        }
    }

    /// The first Interest of the entry.
    pub fn representative(&self) -> &Interest {
        &self.representative
    }

    pub fn waiters(&self) -> &[Waiter] {
        &self.waiters
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    /// The latest deadline among the waiters.
    pub fn deadline(&self) -> Option<Instant> {
        self.waiters.iter().map(|w| w.deadline).max()
    }

    pub fn exclusion(&self) -> &WidenedExclusion {
        &self.exclusion
    }

    /// True if `content` could satisfy at least one waiter.
    pub fn could_satisfy(&self, content: &ContentObject) -> bool {
        matcher::matches_with_filter(&self.representative, content, &self.exclusion)
    }

    fn rebuild_exclusion(&mut self) {
        let mut waiters = self.waiters.iter();
        if let Some(first) = waiters.next() {
            let mut exclusion = WidenedExclusion::from_filter(first.interest.exclude());
            for w in waiters {
                exclusion.widen(w.interest.exclude());
            }
            self.exclusion = exclusion;
        }
    }
}

/// The result of adding an Interest to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitInsert {
    /// A new entry was created. Producers should be asked.
    Created,
    /// The Interest joined an existing entry.
    Aggregated,
    /// The same face re-expressed an Interest it is already waiting on;
    /// its deadline was extended.
    Refreshed,
    /// An Interest with the same nonce is already pending. Dropped.
    Duplicate,
}

/// A waiter answered by arriving content.
#[derive(Debug, Clone)]
pub struct Satisfied {
    pub face: FaceId,
    pub interest: Interest,
    pub arrived: Instant,
}

/// A waiter whose deadline passed.
#[derive(Debug, Clone)]
pub struct Expired {
    pub face: FaceId,
    pub interest: Interest,
}

/// What content arrival did to the table.
#[derive(Debug, Default)]
pub struct Satisfaction {
    /// Waiters to notify, entry by entry, each in arrival order
    pub satisfied: Vec<Satisfied>,
    /// Entries that were emptied and removed
    pub removed: Vec<PitKey>,
}

/* ---------------------------------------------------------------- *
 * Table
 * ---------------------------------------------------------------- */

/// The Pending Interest Table.
#[derive(Debug, Default)]
pub struct Pit {
    entries: HashMap<PitKey, PitEntry>,
    /// Entry keys by their match prefix, in creation order
    by_prefix: HashMap<Name, Vec<PitKey>>,
}

impl Pit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &PitKey) -> Option<&PitEntry> {
        self.entries.get(key)
    }

    /// Total number of waiters over all entries.
    pub fn waiter_count(&self) -> usize {
        self.entries.values().map(|e| e.waiters.len()).sum()
    }

    /// Add `interest`, received on `face`, waiting at most `lifetime`.
    pub fn insert(
        &mut self,
        face: FaceId,
        interest: Interest,
        lifetime: Duration,
        now: Instant,
    ) -> PitInsert {
        let key = PitKey::from_interest(&interest);
        let waiter = Waiter {
            face,
            arrived: now,
            deadline: now + lifetime,
            interest,
        };

        let Some(entry) = self.entries.get_mut(&key) else {
            debug!("[PIT] New entry for {}", waiter.interest);
            self.by_prefix
                .entry(waiter.interest.match_prefix())
                .or_default()
                .push(key.clone());
            self.entries.insert(key, PitEntry::new(waiter));
            return PitInsert::Created;
        };

        if let Some(nonce) = waiter.interest.nonce() {
            if entry.waiters.iter().any(|w| w.interest.nonce() == Some(nonce)) {
                debug!("[PIT] Duplicate nonce for {}", waiter.interest);
                return PitInsert::Duplicate;
            }
        }

        if let Some(existing) = entry
            .waiters
            .iter_mut()
            .find(|w| w.same_request(waiter.face, &waiter.interest))
        {
            trace!("[PIT] {} refreshed {}", waiter.face, waiter.interest);
            existing.deadline = existing.deadline.max(waiter.deadline);
            existing.interest = waiter.interest;
            return PitInsert::Refreshed;
        }

        trace!("[PIT] {} joins {}", waiter.face, waiter.interest);
        entry.exclusion.widen(waiter.interest.exclude());
        entry.waiters.push(waiter);
        PitInsert::Aggregated
    }

    /// Hand `content` to every waiter it satisfies.
    ///
    /// Only entries whose match prefix is a prefix of the content name are
    /// examined. A waiter whose own Interest rejects the content stays
    /// pending. Waiters already past their deadline are left for [`expire`].
    ///
    /// [`expire`]: Pit::expire
    pub fn satisfy(&mut self, content: &ContentObject, now: Instant) -> Satisfaction {
        let mut out = Satisfaction::default();
        let name = content.name();

        for len in 0..=name.len() {
            let Some(keys) = self.by_prefix.get(&name.prefix(len)) else {
                continue;
            };
            for key in keys.clone() {
                let Some(entry) = self.entries.get_mut(&key) else {
                    continue;
                };
                if !entry.could_satisfy(content) {
                    continue;
                }

                let (hit, kept): (Vec<Waiter>, Vec<Waiter>) =
                    std::mem::take(&mut entry.waiters).into_iter().partition(|w| {
                        w.deadline > now && matcher::matches_from(&w.interest, content, Origin::Generated)
                    });
                entry.waiters = kept;
                if !hit.is_empty() {
                    debug!("[PIT] {} satisfies {} waiter(s)", name, hit.len());
                }
                out.satisfied.extend(hit.into_iter().map(|w| Satisfied {
                    face: w.face,
                    interest: w.interest,
                    arrived: w.arrived,
                }));

                if entry.waiters.is_empty() {
                    self.remove_entry(&key);
                    out.removed.push(key);
                } else {
                    entry.rebuild_exclusion();
                }
            }
        }
        out
    }

    /// Remove every waiter whose deadline is at or before `now`.
    ///
    /// Returns the expired waiters, and the keys of entries that became empty.
    pub fn expire(&mut self, now: Instant) -> (Vec<Expired>, Vec<PitKey>) {
        let mut expired = Vec::new();
        let mut removed = Vec::new();

        for (key, entry) in self.entries.iter_mut() {
            if entry.waiters.iter().all(|w| w.deadline > now) {
                continue;
            }
            let (gone, kept): (Vec<Waiter>, Vec<Waiter>) = std::mem::take(&mut entry.waiters)
                .into_iter()
                .partition(|w| w.deadline <= now);
            entry.waiters = kept;
            expired.extend(gone.into_iter().map(|w| Expired {
                face: w.face,
                interest: w.interest,
            }));
            if entry.waiters.is_empty() {
                removed.push(key.clone());
            } else {
                entry.rebuild_exclusion();
            }
        }

        for key in &removed {
            debug!("[PIT] Entry for {} expired", key.name);
            self.remove_entry(key);
        }
        (expired, removed)
    }

    /// Withdraw one waiter. Returns `Some(emptied)` if the waiter was found,
    /// where `emptied` tells whether its entry went away with it.
    pub fn cancel(&mut self, face: FaceId, interest: &Interest) -> Option<bool> {
        let key = PitKey::from_interest(interest);
        let entry = self.entries.get_mut(&key)?;
        let idx = entry
            .waiters
            .iter()
            .position(|w| w.same_request(face, interest))?;
        entry.waiters.remove(idx);
        if entry.waiters.is_empty() {
            self.remove_entry(&key);
            Some(true)
        } else {
            entry.rebuild_exclusion();
            Some(false)
        }
    }

    /// Withdraw every waiter of `face`. Returns the keys of entries that
    /// became empty.
    pub fn remove_face(&mut self, face: FaceId) -> Vec<PitKey> {
        let mut removed = Vec::new();
        for (key, entry) in self.entries.iter_mut() {
            let before = entry.waiters.len();
            entry.waiters.retain(|w| w.face != face);
            if entry.waiters.is_empty() {
                removed.push(key.clone());
            } else if entry.waiters.len() != before {
                entry.rebuild_exclusion();
            }
        }
        for key in &removed {
            self.remove_entry(key);
        }
        if !removed.is_empty() {
            debug!("[PIT] {} removed, {} entries dropped", face, removed.len());
        }
        removed
    }

    /// The earliest waiter deadline in the table.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries
            .values()
            .flat_map(|e| e.waiters.iter().map(|w| w.deadline))
            .min()
    }

    fn remove_entry(&mut self, key: &PitKey) {
        if let Some(entry) = self.entries.remove(key) {
            if let Some(keys) = self.by_prefix.get_mut(&entry.match_prefix) {
                keys.retain(|k| k != key);
                if keys.is_empty() {
                    self.by_prefix.remove(&entry.match_prefix);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_ccn_common::ExcludeFilter;

    const LIFETIME: Duration = Duration::from_secs(4);

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    fn interest(uri: &str, nonce: &'static [u8]) -> Interest {
        Interest::new(name(uri)).with_nonce(nonce)
    }

    fn content(uri: &str) -> ContentObject {
        ContentObject::new(name(uri), &b"data"[..])
    }

    #[test]
    fn test_aggregation_by_selectors() {
        let mut pit = Pit::new();
        let now = Instant::now();
        assert_eq!(pit.insert(FaceId(1), interest("/a", b"n1"), LIFETIME, now), PitInsert::Created);
        assert_eq!(pit.insert(FaceId(2), interest("/a", b"n2"), LIFETIME, now), PitInsert::Aggregated);

        let other = Interest::new(name("/a")).with_min_suffix(1).unwrap();
        assert_eq!(pit.insert(FaceId(3), other, LIFETIME, now), PitInsert::Created);
        assert_eq!(pit.len(), 2);
        assert_eq!(pit.waiter_count(), 3);
    }

    #[test]
    fn test_both_waiters_notified_in_order() {
        let mut pit = Pit::new();
        let now = Instant::now();
        pit.insert(FaceId(2), interest("/a", b"n1"), LIFETIME, now);
        pit.insert(FaceId(1), interest("/a", b"n2"), LIFETIME, now);

        let result = pit.satisfy(&content("/a/1"), now);
        let faces: Vec<FaceId> = result.satisfied.iter().map(|s| s.face).collect();
        assert_eq!(faces, vec![FaceId(2), FaceId(1)]);
        assert_eq!(result.removed.len(), 1);
        assert!(pit.is_empty());
    }

    #[test]
    fn test_duplicate_nonce() {
        let mut pit = Pit::new();
        let now = Instant::now();
        pit.insert(FaceId(1), interest("/a", b"same"), LIFETIME, now);
        assert_eq!(pit.insert(FaceId(2), interest("/a", b"same"), LIFETIME, now), PitInsert::Duplicate);
        assert_eq!(pit.waiter_count(), 1);
    }

    #[test]
    fn test_refresh_from_same_face() {
        let mut pit = Pit::new();
        let now = Instant::now();
        pit.insert(FaceId(1), interest("/a", b"n1"), LIFETIME, now);
        let later = now + Duration::from_secs(1);
        assert_eq!(pit.insert(FaceId(1), interest("/a", b"n2"), LIFETIME, later), PitInsert::Refreshed);
        assert_eq!(pit.waiter_count(), 1);
        assert_eq!(pit.next_deadline(), Some(later + LIFETIME));
    }

    #[test]
    fn test_widened_exclusion_keeps_unmatched_waiter() {
        let mut pit = Pit::new();
        let now = Instant::now();
        let excludes_one = Interest::new(name("/a"))
            .with_exclude(ExcludeFilter::new().with_component("1"))
            .with_nonce(&b"x"[..]);
        let excludes_two = Interest::new(name("/a"))
            .with_exclude(ExcludeFilter::new().with_component("2"))
            .with_nonce(&b"y"[..]);
        pit.insert(FaceId(1), excludes_one, LIFETIME, now);
        assert_eq!(pit.insert(FaceId(2), excludes_two, LIFETIME, now), PitInsert::Aggregated);

        // /a/1 is acceptable to face 2 only
        let result = pit.satisfy(&content("/a/1"), now);
        assert_eq!(result.satisfied.len(), 1);
        assert_eq!(result.satisfied[0].face, FaceId(2));
        assert!(result.removed.is_empty());

        // The remaining waiter still rejects /a/1 but accepts /a/2
        assert!(pit.satisfy(&content("/a/1"), now).satisfied.is_empty());
        let result = pit.satisfy(&content("/a/2"), now);
        assert_eq!(result.satisfied[0].face, FaceId(1));
        assert!(pit.is_empty());
    }

    #[test]
    fn test_unrelated_content_does_nothing() {
        let mut pit = Pit::new();
        let now = Instant::now();
        pit.insert(FaceId(1), interest("/a/b", b"n"), LIFETIME, now);
        assert!(pit.satisfy(&content("/a"), now).satisfied.is_empty());
        assert!(pit.satisfy(&content("/a/c/b"), now).satisfied.is_empty());
        assert_eq!(pit.len(), 1);
    }

    #[test]
    fn test_sibling_entry_found_by_parent_prefix() {
        let mut pit = Pit::new();
        let now = Instant::now();
        let next = Interest::new(name("/a/2"))
            .with_child_selector(ChildSelector::NextSibling)
            .unwrap();
        pit.insert(FaceId(1), next, LIFETIME, now);
        assert!(pit.satisfy(&content("/a/1"), now).satisfied.is_empty());
        assert_eq!(pit.satisfy(&content("/a/3"), now).satisfied.len(), 1);
    }

    #[test]
    fn test_expiry_exactly_once_at_deadline() {
        let mut pit = Pit::new();
        let start = Instant::now();
        pit.insert(FaceId(1), interest("/a", b"n1"), LIFETIME, start);
        pit.insert(FaceId(2), interest("/a", b"n2"), LIFETIME * 2, start);

        let (expired, removed) = pit.expire(start + LIFETIME - Duration::from_millis(1));
        assert!(expired.is_empty() && removed.is_empty());

        let (expired, removed) = pit.expire(start + LIFETIME);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].face, FaceId(1));
        assert!(removed.is_empty());

        let (expired, _) = pit.expire(start + LIFETIME + Duration::from_millis(1));
        assert!(expired.is_empty());

        let (expired, removed) = pit.expire(start + LIFETIME * 2);
        assert_eq!(expired.len(), 1);
        assert_eq!(removed.len(), 1);
        assert!(pit.is_empty());
    }

    #[test]
    fn test_expired_waiter_not_satisfied() {
        let mut pit = Pit::new();
        let start = Instant::now();
        pit.insert(FaceId(1), interest("/a", b"n1"), LIFETIME, start);
        let result = pit.satisfy(&content("/a/1"), start + LIFETIME);
        assert!(result.satisfied.is_empty());
        assert_eq!(pit.expire(start + LIFETIME).0.len(), 1);
    }

    #[test]
    fn test_cancel_leaves_other_waiters() {
        let mut pit = Pit::new();
        let now = Instant::now();
        let first = interest("/a", b"n1");
        pit.insert(FaceId(1), first.clone(), LIFETIME, now);
        pit.insert(FaceId(2), interest("/a", b"n2"), LIFETIME, now);

        assert_eq!(pit.cancel(FaceId(1), &first), Some(false));
        assert_eq!(pit.cancel(FaceId(1), &first), None);
        assert_eq!(pit.waiter_count(), 1);

        assert_eq!(pit.remove_face(FaceId(2)).len(), 1);
        assert!(pit.is_empty());
        assert!(pit.by_prefix.is_empty());
    }
}
