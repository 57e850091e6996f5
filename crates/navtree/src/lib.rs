//! # navtree
//!
//! An event-sourced navigation tree where commands validate, events decide,
//! and projections follow.
//!
//! ## Core Concepts
//!
//! navtree separates **facts** from **intent**:
//! - [`NavEvent`] = Facts (what happened to a navigation)
//! - [`Command`] = Intent (a request checked against state before anything
//!   happens)
//!
//! The key principle: **state is only ever the fold of the event log**.
//! Every mutation of a [`Nav`] goes through [`Nav::apply`], live or on replay.
//!
//! ## Architecture
//!
//! ```text
//! CommandHandler
//!     │
//!     ├─► Lookup.name() ── name taken? ──► NameTaken
//!     │
//!     ▼
//! Nav.create() / insert() / remove() / sort()
//!     │ validate, record, apply
//!     ▼
//! Repository.save() ── append ──► EventBus.publish()
//!                                     │
//!                     ┌───────────────┴───────────────┐
//!                     ▼                               ▼
//!               Lookup task                      Cache task
//!          (Created → name index)        (any event → debounced evict)
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Sibling IDs are unique** - checked at the level an insert targets
//! 2. **Initial items are permanent** - one in a removal aborts all of it
//! 3. **Paths resolve strictly** - dot-separated IDs, one level at a time
//! 4. **Validation is atomic** - a failed operation records no event
//! 5. **Replay equals live** - folding the log rebuilds the same tree
//!
//! ## Guarantees
//!
//! - **Eventually consistent read side**: the Lookup and Cache trail the log
//! - **Publish after append**: invalidation never precedes the mutation
//! - **Independent copies**: the Cache hands out decoded copies, never
//!   shared state
//!
//! ## Example
//!
//! ```ignore
//! use navtree_core::{Cache, CommandHandler, CreateNav, EventBus, Item, Lookup, Nav, NavConfig, Repository};
//! use navtree_persistence::MemoryRepository;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = NavConfig::default();
//! let bus = EventBus::from_config(&config);
//! let repo = Arc::new(MemoryRepository::with_bus(bus.clone()));
//! let cancel = CancellationToken::new();
//!
//! let lookup = Lookup::with_config(&config);
//! let lookup_errors = lookup.start(&bus, cancel.clone())?;
//! let cache = Cache::new(repo.clone(), &config);
//! let cache_errors = cache.start(&bus, cancel.clone())?;
//!
//! let handler = CommandHandler::new(repo.clone(), lookup.clone());
//! let id = handler
//!     .create(CreateNav::new("main").with_items([Item::label_item("home", "Home")]))
//!     .await?;
//!
//! repo.use_nav(id, Box::new(|nav: &mut Nav| -> anyhow::Result<()> {
//!     nav.append(vec![Item::static_link("blog", "Blog", "/blog")])?;
//!     Ok(())
//! }))
//! .await?;
//!
//! let nav = cache.fetch(id).await?;
//! ```

// Core modules
mod aggregate;
mod bus;
mod cache;
mod command;
mod command_macro;
mod config;
mod error;
mod event;
mod item;
mod lookup;
mod repository;
mod tree;

pub mod encoding;
pub mod path;

// Serde round-trip tests (test-only)
#[cfg(test)]
mod serde_tests;


// Re-export the aggregate
pub use aggregate::{Nav, NavId};

// Re-export the tree model
pub use item::{Item, ItemType, DEFAULT_LOCALE};
pub use tree::Tree;

// Re-export events
pub use event::{names, EventEnvelope, EventFilter, NavEvent, AGGREGATE_TYPE};

// Re-export error types
pub use error::{is_not_found, NavError, ProjectionError, Result};

// Re-export configuration
pub use config::NavConfig;

// Re-export bus types
pub use bus::{ErrorStream, EventBus, RecvError, Subscription};

// Re-export command types
pub use command::{Command, CommandHandler, CreateNav};

// Re-export the repository seam
pub use repository::{NavFn, Repository};

// Re-export read-side components
pub use cache::Cache;
pub use lookup::Lookup;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
