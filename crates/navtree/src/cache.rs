//! Read-through Nav cache with debounced invalidation.
//!
//! Entries are stored in their binary encoding and decoded on every hit, so
//! callers always get an independent copy. Every event for a Nav restarts
//! that Nav's debounce timer; the entry is evicted only once the timer runs
//! out, so a burst of events costs a single eviction.
//!
//! A load that overlaps an invalidation of the same Nav is returned but not
//! stored, so a snapshot taken before a mutation can never outlive the
//! eviction meant for it.
//!
//! Entries and timers are guarded by separate locks. The timer lock may be
//! held while an entry is written, never the other way round.

use crate::aggregate::{Nav, NavId};
use crate::bus::{run_subscriber, ErrorStream, EventBus};
use crate::config::NavConfig;
use crate::encoding;
use crate::error::NavError;
use crate::event::EventFilter;
use crate::repository::Repository;
use anyhow::Context;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

const COMPONENT: &str = "cache";

/// Read-through cache in front of a [`Repository`]. Cheap to clone; clones
/// share entries and timers.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<Inner>,
}

struct Inner {
    repo: Arc<dyn Repository>,
    entries: DashMap<NavId, Vec<u8>>,
    timers: Mutex<Timers>,
    generation: AtomicU64,
    debounce: Duration,
    error_buffer: usize,
    started: AtomicBool,
}

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Timers {
    pending: HashMap<NavId, Timer>,
    /// Generation of the latest invalidation per Nav.
    epochs: HashMap<NavId, u64>,
}

impl Cache {
    pub fn new(repo: Arc<dyn Repository>, config: &NavConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                repo,
                entries: DashMap::new(),
                timers: Mutex::new(Timers::default()),
                generation: AtomicU64::new(0),
                debounce: config.debounce(),
                error_buffer: config.error_buffer.max(1),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Returns a copy of the Nav, loading it through the repository on a
    /// miss.
    pub async fn fetch(&self, id: NavId) -> anyhow::Result<Nav> {
        let cached = self
            .inner
            .entries
            .get(&id)
            .map(|entry| encoding::from_bytes(entry.value()));
        match cached {
            Some(Ok(nav)) => {
                trace!(nav_id = %id, "cache hit");
                return Ok(nav);
            }
            Some(Err(err)) => {
                warn!(nav_id = %id, %err, "dropping undecodable cache entry");
                self.inner.entries.remove(&id);
            }
            None => trace!(nav_id = %id, "cache miss"),
        }

        let epoch = self.inner.epoch(id);
        let nav = self
            .inner
            .repo
            .fetch(id)
            .await
            .with_context(|| format!("fetch Nav {id}"))?;
        let bytes = encoding::to_bytes(&nav).with_context(|| format!("encode Nav {id}"))?;
        self.inner.store(id, epoch, bytes);
        Ok(nav)
    }

    pub fn contains(&self, id: NavId) -> bool {
        self.inner.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Restarts the debounce timer for `id`. Must be called inside a Tokio
    /// runtime.
    pub fn invalidate(&self, id: NavId) {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let weak = Arc::downgrade(&self.inner);
        let debounce = self.inner.debounce;

        // Holding the timer lock while spawning keeps a zero-length timer
        // from evicting before it is registered.
        let mut timers = self.inner.lock_timers();
        timers.epochs.insert(id, generation);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if let Some(inner) = Weak::upgrade(&weak) {
                inner.evict(id, generation);
            }
        });
        if let Some(previous) = timers.pending.insert(id, Timer { generation, handle }) {
            trace!(nav_id = %id, "debounce reset");
            previous.handle.abort();
        }
    }

    /// Subscribes to every Nav event on `bus` in a background task until
    /// `cancel` fires. Pending timers are aborted when the task exits.
    pub fn start(&self, bus: &EventBus, cancel: CancellationToken) -> Result<ErrorStream, NavError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(NavError::AlreadyStarted {
                component: COMPONENT,
            });
        }

        let subscription = bus.subscribe(EventFilter::all());
        let (errors, stream) = mpsc::channel(self.inner.error_buffer);
        let cache = self.clone();
        tokio::spawn(async move {
            run_subscriber(COMPONENT, subscription, cancel, errors, |envelope| {
                cache.invalidate(envelope.aggregate_id);
                None
            })
            .await;
            cache.shutdown();
        });
        Ok(stream)
    }

    /// Aborts every pending debounce timer. Cached entries stay.
    pub fn shutdown(&self) {
        let timers: Vec<Timer> = self
            .inner
            .lock_timers()
            .pending
            .drain()
            .map(|(_, timer)| timer)
            .collect();
        debug!(pending = timers.len(), "cancelling cache timers");
        for timer in timers {
            timer.handle.abort();
        }
    }
}

impl Inner {
    fn lock_timers(&self) -> MutexGuard<'_, Timers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn epoch(&self, id: NavId) -> Option<u64> {
        self.lock_timers().epochs.get(&id).copied()
    }

    /// Caches a load that started at `epoch`, unless the Nav was invalidated
    /// since or an eviction is still pending.
    fn store(&self, id: NavId, epoch: Option<u64>, bytes: Vec<u8>) {
        let timers = self.lock_timers();
        if timers.epochs.get(&id).copied() != epoch || timers.pending.contains_key(&id) {
            debug!(nav_id = %id, "not caching load that overlapped an invalidation");
            return;
        }
        self.entries.insert(id, bytes);
    }

    fn evict(&self, id: NavId, generation: u64) {
        {
            let mut timers = self.lock_timers();
            match timers.pending.get(&id) {
                Some(timer) if timer.generation == generation => {
                    timers.pending.remove(&id);
                }
                _ => return,
            }
        }
        if self.entries.remove(&id).is_some() {
            debug!(nav_id = %id, "evicted cached nav");
        }
    }
}
