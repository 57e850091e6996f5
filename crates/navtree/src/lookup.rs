//! Name → identity projection.
//!
//! The Lookup follows `Created` events and answers "which Nav is called
//! this?" for command validation. It is eventually consistent: a Nav is
//! visible only once its `Created` envelope has been dispatched and
//! projected, so two creations racing on one name can both pass validation.

use crate::aggregate::NavId;
use crate::bus::{run_subscriber, ErrorStream, EventBus};
use crate::config::NavConfig;
use crate::error::{NavError, ProjectionError, Result};
use crate::event::{names, EventEnvelope, EventFilter, NavEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const COMPONENT: &str = "lookup";

/// Name index over all Navs. Cheap to clone; clones share the index.
#[derive(Debug, Clone)]
pub struct Lookup {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    names: RwLock<HashMap<String, NavId>>,
    started: AtomicBool,
    error_buffer: usize,
}

impl Default for Lookup {
    fn default() -> Self {
        Self::new()
    }
}

impl Lookup {
    pub fn new() -> Self {
        Self::with_config(&NavConfig::default())
    }

    pub fn with_config(config: &NavConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                names: RwLock::new(HashMap::new()),
                started: AtomicBool::new(false),
                error_buffer: config.error_buffer.max(1),
            }),
        }
    }

    /// The Nav currently known under `name`.
    pub fn name(&self, name: &str) -> Option<NavId> {
        self.inner
            .names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.inner
            .names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Projects already-persisted envelopes, e.g. a store's history before
    /// the live subscription starts.
    pub fn catch_up<'a>(
        &self,
        envelopes: impl IntoIterator<Item = &'a EventEnvelope>,
    ) -> Vec<ProjectionError> {
        let filter = filter();
        envelopes
            .into_iter()
            .filter(|envelope| filter.matches(envelope))
            .filter_map(|envelope| self.project(envelope))
            .collect()
    }

    /// Starts following `bus` in a background task until `cancel` fires.
    ///
    /// The returned stream closes when the task exits.
    pub fn start(&self, bus: &EventBus, cancel: CancellationToken) -> Result<ErrorStream> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(NavError::AlreadyStarted {
                component: COMPONENT,
            });
        }

        let subscription = bus.subscribe(filter());
        let (errors, stream) = mpsc::channel(self.inner.error_buffer);
        let lookup = self.clone();
        tokio::spawn(async move {
            run_subscriber(COMPONENT, subscription, cancel, errors, |envelope| {
                lookup.project(&envelope)
            })
            .await;
        });
        Ok(stream)
    }

    fn project(&self, envelope: &EventEnvelope) -> Option<ProjectionError> {
        let NavEvent::Created { name } = &envelope.event else {
            return None;
        };
        let id = envelope.aggregate_id;

        let mut names = self
            .inner
            .names
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match names.get(name).copied() {
            Some(existing) if existing == id => None,
            Some(existing) => {
                warn!(name = %name, existing = %existing, duplicate = %id, "duplicate nav name");
                Some(ProjectionError::DuplicateName {
                    name: name.clone(),
                    existing,
                    duplicate: id,
                })
            }
            None => {
                debug!(name = %name, nav_id = %id, "indexed nav name");
                names.insert(name.clone(), id);
                None
            }
        }
    }
}

fn filter() -> EventFilter {
    EventFilter::named([names::CREATED])
}
