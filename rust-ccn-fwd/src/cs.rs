//! Content Store.
//!
//! A bounded cache of content objects keyed by full name. Entries live in
//! a `BTreeMap` ordered by name, so every name under a prefix forms one
//! contiguous range. A second map ordered by access sequence gives the
//! least recently used entry in `O(log n)`.
//!
//! An entry turns stale once its freshness period has passed. Stale entries
//! stay resident until reclaimed and are only returned to Interests that
//! accept stale answers.

use log::{debug, trace};
use rust_ccn_common::{
    matcher::{self, Origin},
    ContentObject, Interest, Name,
};
use std::{
    collections::BTreeMap,
    time::Instant,
};

#[derive(Debug)]
struct CsEntry {
    content: ContentObject,
    stale_at: Option<Instant>,
    last_access: u64,
}

impl CsEntry {
    fn is_stale(&self, now: Instant) -> bool {
        self.stale_at.is_some_and(|t| t <= now)
    }
}

/// Entries dropped by an insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CsInsert {
    /// Whether an entry with the same name was replaced
    pub replaced: bool,
    /// Entries evicted as least recently used
    pub evicted: usize,
    /// Stale entries reclaimed while making room
    pub reclaimed: usize,
}

/// The Content Store.
#[derive(Debug)]
pub struct ContentStore {
    capacity: usize,
    entries: BTreeMap<Name, CsEntry>,
    recency: BTreeMap<u64, Name>,
    next_access: u64,
}

impl ContentStore {
    /// Create a store holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: BTreeMap::new(),
            recency: BTreeMap::new(),
            next_access: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert or replace the entry for `content`'s name.
    ///
    /// When over capacity, least recently used entries are evicted until the
    /// store fits again, then every stale entry is reclaimed as well.
    pub fn insert(&mut self, content: ContentObject, now: Instant) -> CsInsert {
        let name = content.name().clone();
        let stale_at = content.freshness().map(|f| now + f);
        let access = self.touch_seq();

        let entry = CsEntry {
            content,
            stale_at,
            last_access: access,
        };
        let mut outcome = CsInsert::default();
        if let Some(old) = self.entries.insert(name.clone(), entry) {
            self.recency.remove(&old.last_access);
            outcome.replaced = true;
        }
        self.recency.insert(access, name);

        if self.entries.len() > self.capacity {
            while self.entries.len() > self.capacity {
                let Some((_, victim)) = self.recency.pop_first() else {
                    break;
                };
                trace!("[CS] Evicting {}", victim);
                self.entries.remove(&victim);
                outcome.evicted += 1;
            }
            outcome.reclaimed = self.reclaim_stale(now);
            debug!(
                "[CS] Over capacity: {} evicted, {} stale reclaimed",
                outcome.evicted, outcome.reclaimed
            );
        }
        outcome
    }

    /// Find the best answer to `interest`, marking it recently used.
    ///
    /// Returns the object and whether it came out fresh or stale. Interests
    /// whose origin policy excludes cached answers always miss.
    pub fn lookup(&mut self, interest: &Interest, now: Instant) -> Option<(ContentObject, Origin)> {
        if !matcher::origin_allowed(interest, Origin::ContentStore) {
            return None;
        }
        let accept_stale = matcher::origin_allowed(interest, Origin::StaleContentStore);
        let prefix = interest.match_prefix();

        let candidates = self
            .entries
            .range(prefix.clone()..)
            .take_while(|(name, _)| prefix.is_prefix_of(name))
            .filter(|(_, e)| accept_stale || !e.is_stale(now))
            .map(|(_, e)| &e.content);
        let best = matcher::select_best(interest, candidates)?.name().clone();

        let access = self.touch_seq();
        let entry = self.entries.get_mut(&best)?;
        self.recency.remove(&entry.last_access);
        entry.last_access = access;
        self.recency.insert(access, best);

        let origin = if entry.is_stale(now) {
            Origin::StaleContentStore
        } else {
            Origin::ContentStore
        };
        Some((entry.content.clone(), origin))
    }

    /// Remove the entry for `name`.
    pub fn remove(&mut self, name: &Name) -> Option<ContentObject> {
        let entry = self.entries.remove(name)?;
        self.recency.remove(&entry.last_access);
        Some(entry.content)
    }

    /// Remove every stale entry. Returns how many were removed.
    pub fn reclaim_stale(&mut self, now: Instant) -> usize {
        let stale: Vec<(Name, u64)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_stale(now))
            .map(|(n, e)| (n.clone(), e.last_access))
            .collect();
        for (name, access) in &stale {
            self.entries.remove(name);
            self.recency.remove(access);
        }
        if !stale.is_empty() {
            trace!("[CS] Reclaimed {} stale entries", stale.len());
        }
        stale.len()
    }

    fn touch_seq(&mut self) -> u64 {
        let seq = self.next_access;
        self.next_access += 1;
        seq
    }
}
