//! The forwarding engine.
//!
//! [`Forwarder`] ties the tables together. An arriving Interest is first
//! looked up in the Content Store; on a miss it is recorded in the PIT, and
//! the first Interest of its class is handed to the producers registered
//! for its prefix. Arriving content is cached and handed to every pending
//! waiter it satisfies.
//!
//! Consumers attach as faces. Each face receives its answers and timeouts
//! as [`FaceEvent`]s on its own bounded channel. Events are sent only after
//! the table locks have been released, and never block: a face that does
//! not drain its channel loses events.

use crate::{
    config::ForwarderConfig,
    cs::ContentStore,
    error::{Error, Result},
    pit::{Pit, PitInsert, PitKey},
    producer::{Producer, ProducerRegistry, StaticProducer},
};
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, trace, warn};
use rust_ccn_common::{
    metrics::CcnMetrics,
    types::{FaceId, ProducerId},
    ContentObject, Interest, Name,
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        Mutex, RwLock,
    },
    task::{AbortHandle, JoinHandle},
    time::MissedTickBehavior,
};

/// Events delivered to a face
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceEvent {
    /// Content answering an Interest expressed on this face
    Content(ContentObject),

    /// An Interest expressed on this face expired unanswered
    Timeout(Interest),
}

/// What happened to an arriving Interest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterestOutcome {
    /// Answered from the content store.
    Cached,

    /// A new PIT entry was created and handed to this many producers.
    Forwarded { producers: usize },

    /// Joined a pending entry.
    Aggregated,

    /// Re-expressed by the same face; the pending deadline was extended.
    Refreshed,

    /// Same nonce already pending. Dropped.
    Duplicate,

    /// Confined to the content store by scope or origin policy, and not
    /// found there.
    NotFound,
}

/// What happened to arriving content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentOutcome {
    /// Number of waiters the content was delivered to
    pub delivered: usize,
    /// Entries evicted from the content store to make room
    pub evicted: usize,
}

/// A running producer task and the dispatch that started it
struct Generation {
    seq: u64,
    handle: AbortHandle,
}

struct Inner {
    config: ForwarderConfig,
    cs: Mutex<ContentStore>,
    pit: Mutex<Pit>,
    faces: RwLock<HashMap<FaceId, mpsc::Sender<FaceEvent>>>,
    producers: RwLock<ProducerRegistry>,
    /// Outstanding producer calls by the PIT entry that started them
    generation: Mutex<HashMap<PitKey, Generation>>,
    next_generation: AtomicU64,
    next_face: AtomicU32,
    metrics: Arc<CcnMetrics>,
}

/// Handle to a forwarding engine. Clones share the same state.
#[derive(Clone)]
pub struct Forwarder {
    inner: Arc<Inner>,
}

/// Current time, on the runtime clock so paused-time tests can advance it.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

impl Forwarder {
    /// Create a forwarder with empty tables.
    pub fn new(config: ForwarderConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "[Forwarder] Starting with CS capacity {}, default Interest lifetime {}ms",
            config.cs_capacity, config.default_interest_lifetime_ms
        );
        Ok(Self {
            inner: Arc::new(Inner {
                cs: Mutex::new(ContentStore::new(config.cs_capacity)),
                pit: Mutex::new(Pit::new()),
                faces: RwLock::new(HashMap::new()),
                producers: RwLock::new(ProducerRegistry::new()),
                generation: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                next_face: AtomicU32::new(1),
                metrics: Arc::new(CcnMetrics::new()),
                config,
            }),
        })
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.inner.config
    }

    /// Get the metrics for this forwarder
    pub fn metrics(&self) -> Arc<CcnMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /* ---------------------------------------------------------------- *
     * Faces and producers
     * ---------------------------------------------------------------- */

    /// Attach a new face. Its answers and timeouts arrive on the receiver.
    pub async fn add_face(&self) -> (FaceId, mpsc::Receiver<FaceEvent>) {
        let id = FaceId(self.inner.next_face.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.inner.config.face_event_buffer);
        self.inner.faces.write().await.insert(id, tx);
        debug!("[Face {}] Added", id.0);
        (id, rx)
    }

    /// Detach a face, withdrawing all of its pending Interests.
    pub async fn remove_face(&self, face: FaceId) -> Result<()> {
        if self.inner.faces.write().await.remove(&face).is_none() {
            return Err(Error::UnknownFace(face));
        }
        let emptied = {
            let mut pit = self.inner.pit.lock().await;
            let emptied = pit.remove_face(face);
            self.inner.metrics.pit_size.set(pit.len() as u64);
            emptied
        };
        debug!("[Face {}] Removed, {} pending entries dropped", face.0, emptied.len());
        self.stop_generation(&emptied, true).await;
        Ok(())
    }

    /// Register `producer` for Interests under `prefix`.
    pub async fn register_producer(&self, prefix: Name, producer: Arc<dyn Producer>) -> ProducerId {
        self.inner.producers.write().await.register(prefix, producer)
    }

    pub async fn unregister_producer(&self, id: ProducerId) -> Result<()> {
        if self.inner.producers.write().await.unregister(id) {
            Ok(())
        } else {
            Err(Error::UnknownProducer(id))
        }
    }

    /// Register a [`StaticProducer`] at the root serving the configured
    /// static content. Returns `None` when none is configured.
    pub async fn register_static_content(&self) -> Result<Option<ProducerId>> {
        let contents = self
            .inner
            .config
            .static_content
            .iter()
            .map(|entry| entry.to_content_object())
            .collect::<Result<Vec<_>>>()?;
        if contents.is_empty() {
            return Ok(None);
        }
        info!("[Forwarder] Serving {} static content objects", contents.len());
        let producer = Arc::new(StaticProducer::new(contents));
        Ok(Some(self.register_producer(Name::new(), producer).await))
    }

    /* ---------------------------------------------------------------- *
     * Interests
     * ---------------------------------------------------------------- */

    /// Process an Interest expressed on `face`.
    pub async fn on_interest(&self, face: FaceId, interest: Interest) -> Result<InterestOutcome> {
        self.ensure_face(face).await?;
        let metrics = &self.inner.metrics;
        metrics.interests_received.increment();

        let now = now();
        let kind = interest.answer_origin_kind();
        let lifetime = self.inner.config.interest_lifetime(interest.lifetime());
        trace!("[Face {}] Interest {}", face.0, interest);

        let inserted = {
            let mut cs = self.inner.cs.lock().await;
            if kind.allows_content_store() {
                if let Some((content, origin)) = cs.lookup(&interest, now) {
                    drop(cs);
                    metrics.cs_hits.increment();
                    metrics.interests_satisfied.increment();
                    debug!(
                        "[Forwarder] {} answered from CS with {} ({:?})",
                        interest,
                        content.name(),
                        origin
                    );
                    self.deliver(vec![(face, FaceEvent::Content(content))]).await;
                    return Ok(InterestOutcome::Cached);
                }
                metrics.cs_misses.increment();
            }

            if interest.scope() == Some(0) || !kind.allows_generated() {
                debug!("[Forwarder] {} confined to the CS, no answer", interest);
                return Ok(InterestOutcome::NotFound);
            }

            // Still holding the CS lock: content arriving now waits for the
            // PIT entry and cannot slip in between lookup and insert.
            let mut pit = self.inner.pit.lock().await;
            let inserted = pit.insert(face, interest.clone(), lifetime, now);
            metrics.pit_size.set(pit.len() as u64);
            inserted
        };

        Ok(match inserted {
            PitInsert::Created => {
                metrics.pit_inserts.increment();
                let producers = self.dispatch(interest).await;
                InterestOutcome::Forwarded { producers }
            }
            PitInsert::Aggregated => {
                metrics.interests_aggregated.increment();
                InterestOutcome::Aggregated
            }
            PitInsert::Refreshed => InterestOutcome::Refreshed,
            PitInsert::Duplicate => {
                metrics.interests_duplicate.increment();
                InterestOutcome::Duplicate
            }
        })
    }

    /// Decode and process an Interest. Malformed input is rejected before
    /// any table is touched.
    pub async fn on_wire_interest(&self, face: FaceId, bytes: impl Into<Bytes>) -> Result<InterestOutcome> {
        let interest = Interest::from_bytes(bytes).map_err(|e| {
            warn!("[Face {}] Dropping malformed Interest: {}", face.0, e);
            self.inner.metrics.malformed_dropped.increment();
            e
        })?;
        self.on_interest(face, interest).await
    }

    /// Withdraw one pending Interest of `face`. Returns false if it was not
    /// pending.
    pub async fn cancel_interest(&self, face: FaceId, interest: &Interest) -> bool {
        let cancelled = {
            let mut pit = self.inner.pit.lock().await;
            let cancelled = pit.cancel(face, interest);
            self.inner.metrics.pit_size.set(pit.len() as u64);
            cancelled
        };
        match cancelled {
            Some(true) => {
                debug!("[Face {}] Cancelled the last waiter for {}", face.0, interest);
                self.stop_generation(&[PitKey::from_interest(interest)], true).await;
                true
            }
            Some(false) => true,
            None => false,
        }
    }

    /// Hand a new Interest class to the producers for its prefix.
    async fn dispatch(&self, interest: Interest) -> usize {
        let registrations = self
            .inner
            .producers
            .read()
            .await
            .lookup(&interest.match_prefix());
        if registrations.is_empty() {
            debug!("[Forwarder] No producer for {}", interest);
            return 0;
        }

        let key = PitKey::from_interest(&interest);
        // Held until the handle is stored, so no cleanup can run before the insert
        let mut generation = self.inner.generation.lock().await;
        if self.inner.pit.lock().await.get(&key).is_none() {
            debug!("[Forwarder] {} no longer pending, not dispatched", interest);
            return 0;
        }

        let count = registrations.len();
        self.inner.metrics.producer_dispatches.add(count as u64);
        debug!("[Forwarder] {} dispatched to {} producer(s)", interest, count);

        let seq = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let forwarder = self.clone();
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let mut calls: FuturesUnordered<_> = registrations
                .into_iter()
                .map(|reg| {
                    let interest = interest.clone();
                    async move {
                        let answers = reg.producer.on_interest(interest).await;
                        (reg, answers)
                    }
                })
                .collect();

            while let Some((reg, answers)) = calls.next().await {
                let answers = match answers {
                    Ok(answers) => answers,
                    Err(e) => {
                        warn!("[Forwarder] {} failed on {}: {}", reg.id, interest, e);
                        continue;
                    }
                };
                for content in answers {
                    if !reg.prefix.is_prefix_of(content.name()) {
                        warn!(
                            "[Forwarder] {} answered {} outside its prefix {}, dropped",
                            reg.id,
                            content.name(),
                            reg.prefix
                        );
                        continue;
                    }
                    forwarder.on_content(content).await;
                }
            }

            let mut generation = forwarder.inner.generation.lock().await;
            if generation.get(&task_key).is_some_and(|g| g.seq == seq) {
                generation.remove(&task_key);
            }
        });
        generation.insert(
            key,
            Generation {
                seq,
                handle: task.abort_handle(),
            },
        );
        count
    }

    /// Forget the producer calls of `keys`, aborting them if asked.
    async fn stop_generation(&self, keys: &[PitKey], abort: bool) {
        if keys.is_empty() {
            return;
        }
        let mut generation = self.inner.generation.lock().await;
        for key in keys {
            if let Some(running) = generation.remove(key) {
                if abort {
                    trace!("[Forwarder] Aborting generation for {}", key.name());
                    running.handle.abort();
                }
            }
        }
    }

    /* ---------------------------------------------------------------- *
     * Content
     * ---------------------------------------------------------------- */

    /// Process arriving content: cache it and satisfy pending Interests.
    pub async fn on_content(&self, content: ContentObject) -> ContentOutcome {
        let metrics = &self.inner.metrics;
        metrics.content_received.increment();
        let now = now();

        let (stored, satisfaction) = {
            let mut cs = self.inner.cs.lock().await;
            let stored = cs.insert(content.clone(), now);
            metrics.cs_size.set(cs.len() as u64);

            let mut pit = self.inner.pit.lock().await;
            let satisfaction = pit.satisfy(&content, now);
            metrics.pit_size.set(pit.len() as u64);
            (stored, satisfaction)
        };

        metrics.cs_inserts.increment();
        metrics.cs_evictions.add(stored.evicted as u64);
        metrics.cs_stale_reclaimed.add(stored.reclaimed as u64);

        if satisfaction.satisfied.is_empty() {
            trace!("[Forwarder] Unsolicited content {} cached", content.name());
            metrics.content_unsolicited.increment();
        }
        for s in &satisfaction.satisfied {
            metrics.interests_satisfied.increment();
            metrics
                .satisfaction_latency
                .observe(now.saturating_duration_since(s.arrived).as_millis() as u64);
        }
        self.stop_generation(&satisfaction.removed, false).await;

        let delivered = satisfaction.satisfied.len();
        self.deliver(
            satisfaction
                .satisfied
                .into_iter()
                .map(|s| (s.face, FaceEvent::Content(content.clone())))
                .collect(),
        )
        .await;

        ContentOutcome {
            delivered,
            evicted: stored.evicted,
        }
    }

    /// Decode and process content. Malformed input is rejected before any
    /// table is touched.
    pub async fn on_wire_content(&self, bytes: impl Into<Bytes>) -> Result<ContentOutcome> {
        let content = ContentObject::from_bytes(bytes).map_err(|e| {
            warn!("[Forwarder] Dropping malformed content: {}", e);
            self.inner.metrics.malformed_dropped.increment();
            e
        })?;
        Ok(self.on_content(content).await)
    }

    /* ---------------------------------------------------------------- *
     * Housekeeping
     * ---------------------------------------------------------------- */

    /// Time out every waiter whose deadline is at or before `now`.
    /// Returns the number of timeouts delivered.
    pub async fn expire_pending(&self, now: Instant) -> usize {
        let (expired, removed) = {
            let mut pit = self.inner.pit.lock().await;
            let result = pit.expire(now);
            self.inner.metrics.pit_size.set(pit.len() as u64);
            result
        };
        if expired.is_empty() {
            return 0;
        }
        debug!("[Forwarder] {} Interest(s) timed out", expired.len());
        self.inner
            .metrics
            .interests_timed_out
            .add(expired.len() as u64);
        self.stop_generation(&removed, true).await;

        let count = expired.len();
        self.deliver(
            expired
                .into_iter()
                .map(|e| (e.face, FaceEvent::Timeout(e.interest)))
                .collect(),
        )
        .await;
        count
    }

    /// Drop stale content store entries. Returns how many were dropped.
    pub async fn reclaim_stale(&self, now: Instant) -> usize {
        let mut cs = self.inner.cs.lock().await;
        let reclaimed = cs.reclaim_stale(now);
        self.inner.metrics.cs_size.set(cs.len() as u64);
        self.inner
            .metrics
            .cs_stale_reclaimed
            .add(reclaimed as u64);
        reclaimed
    }

    /// Run expiry and stale reclaim every housekeeping interval. The task
    /// ends once every handle to the forwarder is dropped.
    pub fn spawn_housekeeping(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.housekeeping_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let forwarder = Forwarder { inner };
                let now = now();
                forwarder.expire_pending(now).await;
                forwarder.reclaim_stale(now).await;
            }
            debug!("[Forwarder] Housekeeping stopped");
        })
    }

    /* ---------------------------------------------------------------- *
     * Introspection
     * ---------------------------------------------------------------- */

    /// Number of pending entries.
    pub async fn pending_entries(&self) -> usize {
        self.inner.pit.lock().await.len()
    }

    /// Number of cached content objects.
    pub async fn cached_entries(&self) -> usize {
        self.inner.cs.lock().await.len()
    }

    /// Number of producer tasks still tracked.
    pub async fn running_generations(&self) -> usize {
        self.inner.generation.lock().await.len()
    }

    pub async fn is_cached(&self, name: &Name) -> bool {
        self.inner.cs.lock().await.contains(name)
    }

    async fn ensure_face(&self, face: FaceId) -> Result<()> {
        if self.inner.faces.read().await.contains_key(&face) {
            Ok(())
        } else {
            Err(Error::UnknownFace(face))
        }
    }

    async fn deliver(&self, events: Vec<(FaceId, FaceEvent)>) {
        if events.is_empty() {
            return;
        }
        let faces = self.inner.faces.read().await;
        for (face, event) in events {
            let Some(tx) = faces.get(&face) else {
                debug!("[Face {}] Gone before delivery", face.0);
                continue;
            };
            match tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("[Face {}] Event channel full, dropping event", face.0);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("[Face {}] Receiver dropped", face.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_ccn_common::AnswerOriginKind;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    fn forwarder() -> Forwarder {
        Forwarder::new(ForwarderConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_face_rejected() {
        let fwd = forwarder();
        let result = fwd.on_interest(FaceId(99), Interest::new(name("/a"))).await;
        assert!(matches!(result, Err(Error::UnknownFace(FaceId(99)))));
        assert!(matches!(fwd.remove_face(FaceId(99)).await, Err(Error::UnknownFace(_))));
    }

    #[tokio::test]
    async fn test_cache_hit_answers_immediately() {
        let fwd = forwarder();
        let (face, mut rx) = fwd.add_face().await;
        let content = ContentObject::new(name("/a/1"), &b"x"[..]);
        fwd.on_content(content.clone()).await;

        let outcome = fwd.on_interest(face, Interest::new(name("/a"))).await.unwrap();
        assert_eq!(outcome, InterestOutcome::Cached);
        assert_eq!(rx.recv().await, Some(FaceEvent::Content(content)));
        assert_eq!(fwd.pending_entries().await, 0);
    }

    #[tokio::test]
    async fn test_scope_zero_stays_in_cache() {
        let fwd = forwarder();
        let (face, _rx) = fwd.add_face().await;
        let outcome = fwd
            .on_interest(face, Interest::new(name("/a")).with_scope(0))
            .await
            .unwrap();
        assert_eq!(outcome, InterestOutcome::NotFound);
        assert_eq!(fwd.pending_entries().await, 0);
    }

    #[tokio::test]
    async fn test_generated_only_skips_cache() {
        let fwd = forwarder();
        let (face, mut rx) = fwd.add_face().await;
        fwd.on_content(ContentObject::new(name("/a/1"), &b"x"[..])).await;

        let generated = Interest::new(name("/a"))
            .with_answer_origin_kind(AnswerOriginKind::new(AnswerOriginKind::GENERATED).unwrap());
        let outcome = fwd.on_interest(face, generated).await.unwrap();
        assert_eq!(outcome, InterestOutcome::Forwarded { producers: 0 });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_wire_input_dropped() {
        let fwd = forwarder();
        let (face, _rx) = fwd.add_face().await;
        let wire = Interest::new(name("/a/b")).to_bytes().unwrap();
        let truncated = wire.slice(..wire.len() - 1);
        let result = fwd.on_wire_interest(face, truncated).await;
        assert!(matches!(result, Err(Error::Ccn(_))));
        assert!(fwd.on_wire_content(Bytes::new()).await.is_err());
        assert_eq!(fwd.metrics().malformed_dropped.value(), 2);
        assert_eq!(fwd.pending_entries().await, 0);
        assert_eq!(fwd.cached_entries().await, 0);
    }

    #[tokio::test]
    async fn test_full_channel_drops_without_blocking() {
        let config = ForwarderConfig {
            face_event_buffer: 1,
            ..ForwarderConfig::default()
        };
        let fwd = Forwarder::new(config).unwrap();
        let (face, mut rx) = fwd.add_face().await;
        fwd.on_content(ContentObject::new(name("/a"), &b"x"[..])).await;
        fwd.on_interest(face, Interest::new(name("/a"))).await.unwrap();
        fwd.on_interest(face, Interest::new(name("/a"))).await.unwrap();
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }
}
