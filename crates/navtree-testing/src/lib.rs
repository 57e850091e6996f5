//! Testing utilities for navtree.
//!
//! Fixture trees, a fetch-counting [`Repository`] wrapper for asserting
//! cache behavior, and a polling helper for the eventually consistent read
//! side.
//!
//! # Example
//!
//! ```rust,ignore
//! use navtree_testing::{eventually, init_tracing, sample_items, CountingRepository};
//!
//! init_tracing();
//! let repo = Arc::new(CountingRepository::new(MemoryRepository::with_bus(bus.clone())));
//! let id = handler.create(CreateNav::new("main").with_items(sample_items())).await?;
//! assert!(eventually(|| lookup.name("main") == Some(id)).await);
//! assert_eq!(repo.fetches(), 0);
//! ```

use anyhow::Result;
use async_trait::async_trait;
use navtree_core::{Item, Nav, NavId, Repository};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Poll interval for [`eventually`].
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Number of polls [`eventually`] makes before giving up.
pub const POLL_ATTEMPTS: usize = 200;

/// Install a test-writer subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// `foo`, then `bar` holding `baz`, which holds `foo`, `bar` and `baz`.
///
/// Paths: `foo`, `bar`, `bar.baz`, `bar.baz.foo`, `bar.baz.bar`,
/// `bar.baz.baz`.
pub fn sample_items() -> Vec<Item> {
    vec![
        Item::label_item("foo", "Foo"),
        Item::label_item("bar", "Bar").with_children([Item::label_item("baz", "Baz")
            .with_children([
                Item::static_link("foo", "Foo", "/bar/baz/foo"),
                Item::static_link("bar", "Bar", "/bar/baz/bar"),
                Item::static_link("baz", "Baz", "/bar/baz/baz"),
            ])]),
    ]
}

/// A flat level of `foo`, `bar`, `baz`, `qux`.
pub fn flat_items() -> Vec<Item> {
    ["foo", "bar", "baz", "qux"]
        .into_iter()
        .map(|id| Item::label_item(id, id))
        .collect()
}

/// A created Nav named `name` holding [`sample_items`] as initial items.
pub fn sample_nav(name: &str) -> Result<Nav> {
    let mut nav = Nav::new(NavId::new());
    nav.create(name, sample_items())?;
    Ok(nav)
}

/// Poll `condition` until it holds or the attempts run out.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..POLL_ATTEMPTS {
        if condition() {
            return true;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    condition()
}

/// Wraps a [`Repository`] and counts calls to `fetch`.
///
/// With a fetch delay, each fetch reads its snapshot from the wrapped
/// repository first and then waits, so writes can land while the caller
/// still holds the old state.
pub struct CountingRepository<R> {
    inner: R,
    fetches: AtomicUsize,
    fetch_delay: Duration,
}

impl<R: Repository> CountingRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            fetches: AtomicUsize::new(0),
            fetch_delay: Duration::ZERO,
        }
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Fetches that reached the wrapped repository.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Repository> Repository for CountingRepository<R> {
    async fn save(&self, nav: &mut Nav) -> Result<()> {
        self.inner.save(nav).await
    }

    async fn fetch(&self, id: NavId) -> Result<Nav> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let nav = self.inner.fetch(id).await;
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        nav
    }

    async fn delete(&self, nav: &Nav) -> Result<()> {
        self.inner.delete(nav).await
    }
}
