//! Producers answer Interests on demand.
//!
//! A producer registers against a name prefix. When a new Interest finds
//! no cached answer, the forwarder asks every producer registered at the
//! longest prefix that covers the Interest's match prefix.

use crate::error::Result;
use async_trait::async_trait;
use log::debug;
use rust_ccn_common::{
    matcher::{self, Origin},
    types::ProducerId,
    ContentObject, Interest, Name,
};
use std::{collections::HashMap, sync::Arc};

/// Something that can generate content for Interests under its prefix.
///
/// A producer may be called any number of times for the same logical
/// request, and must only answer Interests under the prefix it was
/// registered with.
#[async_trait]
pub trait Producer: Send + Sync {
    /// Generate zero or more content objects answering `interest`.
    async fn on_interest(&self, interest: Interest) -> Result<Vec<ContentObject>>;
}

/// A registered producer.
#[derive(Clone)]
pub struct Registration {
    pub id: ProducerId,
    pub prefix: Name,
    pub producer: Arc<dyn Producer>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Producers by registered prefix.
#[derive(Debug, Default)]
pub struct ProducerRegistry {
    by_prefix: HashMap<Name, Vec<Registration>>,
    next_id: u32,
}

impl ProducerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, prefix: Name, producer: Arc<dyn Producer>) -> ProducerId {
        let id = ProducerId(self.next_id);
        self.next_id += 1;
        debug!("[Producer] {} registered at {}", id, prefix);
        self.by_prefix
            .entry(prefix.clone())
            .or_default()
            .push(Registration { id, prefix, producer });
        id
    }

    /// Returns false if `id` was not registered.
    pub fn unregister(&mut self, id: ProducerId) -> bool {
        let Some(prefix) = self
            .by_prefix
            .iter()
            .find(|(_, regs)| regs.iter().any(|r| r.id == id))
            .map(|(prefix, _)| prefix.clone())
        else {
            return false;
        };
        if let Some(regs) = self.by_prefix.get_mut(&prefix) {
            regs.retain(|r| r.id != id);
            if regs.is_empty() {
                self.by_prefix.remove(&prefix);
            }
        }
        debug!("[Producer] {} unregistered from {}", id, prefix);
        true
    }

    /// The producers registered at the longest prefix of `name`.
    pub fn lookup(&self, name: &Name) -> Vec<Registration> {
        (0..=name.len())
            .rev()
            .find_map(|len| self.by_prefix.get(&name.prefix(len)))
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_prefix.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }
}

/// A producer answering from a fixed set of content objects.
#[derive(Debug, Default)]
pub struct StaticProducer {
    contents: Vec<ContentObject>,
}

impl StaticProducer {
    pub fn new(contents: Vec<ContentObject>) -> Self {
        Self { contents }
    }

    pub fn contents(&self) -> &[ContentObject] {
        &self.contents
    }
}

#[async_trait]
impl Producer for StaticProducer {
    async fn on_interest(&self, interest: Interest) -> Result<Vec<ContentObject>> {
        if !matcher::origin_allowed(&interest, Origin::Generated) {
            return Ok(Vec::new());
        }
        Ok(matcher::select_best(&interest, &self.contents)
            .cloned()
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    fn producer() -> Arc<dyn Producer> {
        Arc::new(StaticProducer::default())
    }

    #[test]
    fn test_longest_prefix_lookup() {
        let mut registry = ProducerRegistry::new();
        let root = registry.register(Name::new(), producer());
        let a = registry.register(name("/a"), producer());
        let a2 = registry.register(name("/a"), producer());
        let ab = registry.register(name("/a/b"), producer());

        let ids = |n: &str| -> Vec<ProducerId> {
            registry.lookup(&name(n)).iter().map(|r| r.id).collect()
        };
        assert_eq!(ids("/a/b/c"), vec![ab]);
        assert_eq!(ids("/a/c"), vec![a, a2]);
        assert_eq!(ids("/z"), vec![root]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_unregister() {
        let mut registry = ProducerRegistry::new();
        let id = registry.register(name("/a"), producer());
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.lookup(&name("/a")).is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_static_producer_selects_best() {
        let producer = StaticProducer::new(vec![
            ContentObject::new(name("/a/1"), &b"1"[..]),
            ContentObject::new(name("/a/2"), &b"2"[..]),
        ]);
        let answers = producer.on_interest(Interest::new(name("/a"))).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].name(), &name("/a/1"));

        let none = producer.on_interest(Interest::new(name("/b"))).await.unwrap();
        assert!(none.is_empty());
    }
}
