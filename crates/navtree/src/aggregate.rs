//! The Nav aggregate.
//!
//! A [`Nav`] is derived entirely from its event log. Intent operations
//! (`create`, `insert`, `remove`, `sort`, ...) validate against the current
//! materialized state, record one event and fold it in immediately, so a
//! unit of work that calls several operations before saving sees its own
//! changes. [`Nav::apply`] is the only place state changes, which keeps live
//! application and replay identical.

use crate::error::{NavError, Result};
use crate::event::NavEvent;
use crate::item::Item;
use crate::path;
use crate::tree::Tree;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identity of a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavId(Uuid);

impl NavId {
    /// A fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NavId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for NavId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for NavId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An event-sourced navigation tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nav {
    id: NavId,
    /// Number of applied events, committed or not.
    version: u64,
    name: String,
    tree: Tree,
    #[serde(skip)]
    uncommitted: Vec<NavEvent>,
}

impl PartialEq for Nav {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.version == other.version
            && self.name == other.name
            && self.tree == other.tree
    }
}

impl Eq for Nav {}

impl Nav {
    /// An uncreated Nav at `id`.
    pub fn new(id: NavId) -> Self {
        Self {
            id,
            version: 0,
            name: String::new(),
            tree: Tree::new(),
            uncommitted: Vec::new(),
        }
    }

    /// Rebuilds a Nav by folding its event log.
    pub fn from_events<'a>(id: NavId, events: impl IntoIterator<Item = &'a NavEvent>) -> Self {
        let mut nav = Self::new(id);
        for event in events {
            nav.apply(event);
        }
        nav
    }

    pub fn id(&self) -> NavId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_created(&self) -> bool {
        !self.name.is_empty()
    }

    /// Resolves an item by path.
    pub fn item(&self, path: &str) -> Result<&Item> {
        self.tree.item(path)
    }

    /// Events recorded since the last save.
    pub fn uncommitted(&self) -> &[NavEvent] {
        &self.uncommitted
    }

    /// Drains the events recorded since the last save.
    pub fn take_uncommitted(&mut self) -> Vec<NavEvent> {
        std::mem::take(&mut self.uncommitted)
    }

    /// Version of the last persisted event.
    pub fn committed_version(&self) -> u64 {
        self.version - self.uncommitted.len() as u64
    }

    /// Creates the navigation. Every item in `items`, recursively, becomes
    /// an initial item and can never be removed.
    pub fn create(&mut self, name: &str, items: Vec<Item>) -> Result<()> {
        if self.is_created() {
            return Err(NavError::AlreadyCreated { id: self.id });
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(NavError::EmptyName);
        }
        validate_items(&items)?;
        Tree::new().check_duplicates(&items)?;

        self.record(NavEvent::Created {
            name: name.to_string(),
        });

        if !items.is_empty() {
            let mut items = items;
            for item in &mut items {
                item.set_initial(true);
            }
            self.record(NavEvent::ItemsAdded {
                items,
                index: 0,
                path: String::new(),
            });
        }
        Ok(())
    }

    /// Inserts `items` into the root level at `index`.
    pub fn insert(&mut self, index: isize, items: Vec<Item>) -> Result<()> {
        self.insert_at("", index, items)
    }

    /// Inserts `items` into the subtree of the item at `path` at `index`.
    /// An index past the end appends. An empty batch records nothing, but
    /// `path` must still resolve.
    pub fn insert_at(&mut self, path: &str, index: isize, items: Vec<Item>) -> Result<()> {
        let index = usize::try_from(index)
            .map_err(|_| NavError::invalid(format!("negative index {index}")))?;
        let level = self.tree.level(path)?;
        if items.is_empty() {
            return Ok(());
        }
        validate_items(&items)?;
        level.check_duplicates(&items)?;
        let index = index.min(level.len());

        let mut items = items;
        for item in &mut items {
            item.set_initial(false);
        }
        self.record(NavEvent::ItemsAdded {
            items,
            index,
            path: path.to_string(),
        });
        Ok(())
    }

    pub fn prepend(&mut self, items: Vec<Item>) -> Result<()> {
        self.insert_at("", 0, items)
    }

    pub fn prepend_at(&mut self, path: &str, items: Vec<Item>) -> Result<()> {
        self.insert_at(path, 0, items)
    }

    pub fn append(&mut self, items: Vec<Item>) -> Result<()> {
        self.append_at("", items)
    }

    pub fn append_at(&mut self, path: &str, items: Vec<Item>) -> Result<()> {
        let len = self.tree.level(path)?.len();
        self.insert_at(path, len as isize, items)
    }

    /// Removes the items at `paths`.
    ///
    /// Paths that do not resolve are skipped. If any resolving path names an
    /// initial item, nothing is removed.
    pub fn remove<S: AsRef<str>>(&mut self, paths: &[S]) -> Result<()> {
        let mut resolved = Vec::with_capacity(paths.len());
        for path in paths.iter().map(AsRef::as_ref) {
            let Ok(item) = self.tree.item(path) else {
                debug!(nav_id = %self.id, path, "skipping unknown path");
                continue;
            };
            if item.initial {
                return Err(NavError::InitialItem {
                    path: path.to_string(),
                });
            }
            resolved.push(path.to_string());
        }

        if resolved.is_empty() {
            return Ok(());
        }
        self.record(NavEvent::ItemsRemoved { items: resolved });
        Ok(())
    }

    /// Reorders the root level. See [`Nav::sort_at`].
    pub fn sort<S: AsRef<str>>(&mut self, sorting: &[S]) -> Result<()> {
        self.sort_at("", sorting)
    }

    /// Moves the items named in `sorting` to the front of the level at
    /// `path`, in that order. Unknown IDs are ignored; a sort that changes
    /// nothing records nothing.
    pub fn sort_at<S: AsRef<str>>(&mut self, path: &str, sorting: &[S]) -> Result<()> {
        let level = self.tree.level(path)?;
        let sorting = level.sorting_for(sorting);
        if !level.would_reorder(&sorting) {
            return Ok(());
        }
        self.record(NavEvent::Sorted {
            sorting,
            path: path.to_string(),
        });
        Ok(())
    }

    /// Folds one event into the materialized state.
    pub fn apply(&mut self, event: &NavEvent) {
        match event {
            NavEvent::Created { name } => {
                self.name = name.clone();
                self.tree = Tree::new();
            }
            NavEvent::ItemsAdded { items, index, path } => match self.tree.level_mut(path) {
                Ok(level) => level.insert(*index, items.iter().cloned()),
                Err(err) => warn!(nav_id = %self.id, %err, "dropping ItemsAdded"),
            },
            NavEvent::ItemsRemoved { items } => {
                for path in items {
                    self.tree.remove_path(path);
                }
            }
            NavEvent::Sorted { sorting, path } => match self.tree.existing_level_mut(path) {
                Ok(Some(level)) => level.sort(sorting),
                Ok(None) => {}
                Err(err) => warn!(nav_id = %self.id, %err, "dropping Sorted"),
            },
        }
        self.version += 1;
    }

    fn record(&mut self, event: NavEvent) {
        debug!(nav_id = %self.id, event = event.name(), "recording event");
        self.apply(&event);
        self.uncommitted.push(event);
    }
}

/// Every ID must be addressable and unique among its incoming siblings.
fn validate_items(items: &[Item]) -> Result<()> {
    for item in items {
        if !path::is_valid_id(&item.id) {
            return Err(NavError::invalid(format!("invalid item id {:?}", item.id)));
        }
        if let Some(children) = item.children() {
            Tree::new().check_duplicates(children.items())?;
            validate_items(children.items())?;
        }
    }
    Ok(())
}
