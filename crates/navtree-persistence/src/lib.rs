//! In-memory event-sourced repository for navtree.
//!
//! This crate provides a reference implementation of the navtree
//! [`Repository`] trait. Each Nav is stored as its ordered stream of
//! [`EventEnvelope`]s and rebuilt by replay on every fetch.
//!
//! # Features
//!
//! - Optimistic concurrency: a save whose base version is not the stored
//!   stream length fails with `ConcurrencyConflict`
//! - Publish after append: envelopes reach the [`EventBus`] only once they
//!   are in the store
//! - A global, ordered log for projections that start late
//!
//! # Usage
//!
//! ```rust,ignore
//! use navtree_core::{EventBus, Lookup};
//! use navtree_persistence::MemoryRepository;
//!
//! let bus = EventBus::new();
//! let repo = MemoryRepository::with_bus(bus.clone());
//!
//! // Catch a fresh projection up with history, then follow the bus.
//! let lookup = Lookup::new();
//! lookup.catch_up(&repo.events());
//! let errors = lookup.start(&bus, cancel)?;
//! ```

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use navtree_core::{EventBus, EventEnvelope, Nav, NavError, NavId, Repository};
use std::sync::Mutex;
use tracing::{debug, info};

/// In-memory event store and repository.
#[derive(Default)]
pub struct MemoryRepository {
    streams: DashMap<NavId, Vec<EventEnvelope>>,
    log: Mutex<Vec<EventEnvelope>>,
    bus: Option<EventBus>,
}

impl MemoryRepository {
    /// Create a repository that publishes nowhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository that publishes saved events to `bus`.
    pub fn with_bus(bus: EventBus) -> Self {
        Self {
            bus: Some(bus),
            ..Self::default()
        }
    }

    /// Every stored envelope across all Navs, in append order.
    pub fn events(&self) -> Vec<EventEnvelope> {
        self.log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// The stored stream of one Nav.
    pub fn stream(&self, id: NavId) -> Vec<EventEnvelope> {
        self.streams
            .get(&id)
            .map(|stream| stream.value().clone())
            .unwrap_or_default()
    }

    /// Number of stored Navs.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    /// Append the Nav's uncommitted events to its stream.
    async fn save(&self, nav: &mut Nav) -> Result<()> {
        if nav.uncommitted().is_empty() {
            return Ok(());
        }
        let id = nav.id();
        let base = nav.committed_version();

        let appended = {
            let mut stream = self.streams.entry(id).or_default();
            let stored = stream.len() as u64;
            if stored != base {
                return Err(NavError::ConcurrencyConflict {
                    id,
                    expected: base,
                    actual: stored,
                }
                .into());
            }

            let appended: Vec<EventEnvelope> = nav
                .take_uncommitted()
                .into_iter()
                .enumerate()
                .map(|(at, event)| EventEnvelope::new(id, base + at as u64 + 1, event))
                .collect();
            stream.extend(appended.iter().cloned());
            // Taken under the stream lock so the global log keeps per-Nav order.
            self.log
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .extend(appended.iter().cloned());
            appended
        };
        debug!(nav_id = %id, count = appended.len(), version = nav.version(), "appended events");

        if let Some(bus) = &self.bus {
            for envelope in appended {
                bus.publish(envelope);
            }
        }
        Ok(())
    }

    /// Rebuild the Nav from its stream.
    async fn fetch(&self, id: NavId) -> Result<Nav> {
        let stream = self.streams.get(&id).ok_or(NavError::NotFound { id })?;
        if stream.is_empty() {
            return Err(NavError::NotFound { id }.into());
        }
        Ok(Nav::from_events(id, stream.iter().map(|envelope| &envelope.event)))
    }

    /// Drop the Nav's stream. Its envelopes stay in the global log.
    async fn delete(&self, nav: &Nav) -> Result<()> {
        let id = nav.id();
        self.streams
            .remove(&id)
            .ok_or(NavError::NotFound { id })?;
        info!(nav_id = %id, "deleted navigation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navtree_core::{is_not_found, EventFilter, Item, NavEvent};

    fn label(id: &str) -> Item {
        Item::label_item(id, id)
    }

    async fn saved(repo: &MemoryRepository) -> Nav {
        let mut nav = Nav::new(NavId::new());
        nav.create("main", vec![label("foo")]).unwrap();
        repo.save(&mut nav).await.unwrap();
        nav
    }

    #[tokio::test]
    async fn fetch_replays_the_stream() {
        let repo = MemoryRepository::new();
        let mut nav = saved(&repo).await;
        nav.append(vec![label("bar")]).unwrap();
        nav.sort(&["bar"]).unwrap();
        repo.save(&mut nav).await.unwrap();

        let fetched = repo.fetch(nav.id()).await.unwrap();
        assert_eq!(fetched, nav);
        assert_eq!(fetched.tree().ids(), ["bar", "foo"]);
        assert_eq!(
            repo.stream(nav.id())
                .iter()
                .map(|envelope| envelope.version)
                .collect::<Vec<_>>(),
            [1, 2, 3, 4]
        );
    }

    #[tokio::test]
    async fn stale_saves_conflict() {
        let repo = MemoryRepository::new();
        let nav = saved(&repo).await;

        let mut first = repo.fetch(nav.id()).await.unwrap();
        let mut second = repo.fetch(nav.id()).await.unwrap();
        first.append(vec![label("a")]).unwrap();
        second.append(vec![label("b")]).unwrap();

        repo.save(&mut first).await.unwrap();
        let err = repo.save(&mut second).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<NavError>(),
            Some(&NavError::ConcurrencyConflict {
                id: nav.id(),
                expected: 2,
                actual: 3
            })
        );
        assert_eq!(repo.fetch(nav.id()).await.unwrap().tree().ids(), ["foo", "a"]);
    }

    #[tokio::test]
    async fn publishes_after_append() {
        let bus = EventBus::new();
        let repo = MemoryRepository::with_bus(bus.clone());
        let mut subscription = bus.subscribe(EventFilter::all());

        let nav = saved(&repo).await;

        let created = subscription.recv().await.unwrap();
        assert_eq!(created.event, NavEvent::Created { name: "main".into() });
        assert_eq!(created.version, 1);
        let added = subscription.recv().await.unwrap();
        assert_eq!(added.version, 2);
        assert_eq!(repo.events().len(), 2);
        assert_eq!(repo.stream(nav.id()).len(), 2);
    }

    #[tokio::test]
    async fn use_nav_saves_only_on_success() {
        let repo = MemoryRepository::new();
        let nav = saved(&repo).await;

        repo.use_nav(
            nav.id(),
            Box::new(|nav: &mut Nav| -> Result<()> {
                nav.append(vec![label("bar")])?;
                Ok(())
            }),
        )
        .await
        .unwrap();

        let err = repo
            .use_nav(
                nav.id(),
                Box::new(|nav: &mut Nav| -> Result<()> {
                    nav.append(vec![label("baz")])?;
                    nav.remove(&["foo"])?;
                    Ok(())
                }),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<NavError>(),
            Some(&NavError::InitialItem { path: "foo".into() })
        );
        assert_eq!(repo.fetch(nav.id()).await.unwrap().tree().ids(), ["foo", "bar"]);
    }

    #[tokio::test]
    async fn delete_and_missing() {
        let repo = MemoryRepository::new();
        let nav = saved(&repo).await;

        repo.delete(&nav).await.unwrap();
        assert!(repo.is_empty());
        assert!(is_not_found(&repo.fetch(nav.id()).await.unwrap_err()));
        assert!(is_not_found(&repo.delete(&nav).await.unwrap_err()));
    }

    #[tokio::test]
    async fn saving_nothing_is_a_no_op() {
        let repo = MemoryRepository::new();
        let mut nav = Nav::new(NavId::new());

        repo.save(&mut nav).await.unwrap();
        assert!(repo.is_empty());
    }
}
