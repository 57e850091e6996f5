//! Commands and their handler.
//!
//! A command is intent. The handler checks it against the read side where
//! the aggregate cannot (name uniqueness), lets the aggregate validate and
//! record events, and saves. Events reach the Lookup and Cache only through
//! the bus, after the save.

use crate::aggregate::{Nav, NavId};
use crate::auto_payload;
use crate::error::NavError;
use crate::item::Item;
use crate::lookup::Lookup;
use crate::repository::Repository;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

/// A request to change navigation state.
pub trait Command: Debug + Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// JSON form of the command, for logging and auditing.
    fn payload(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Create a navigation. `items` become its protected initial items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNav {
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl CreateNav {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.items.extend(items);
        self
    }
}

impl Command for CreateNav {
    fn name(&self) -> &'static str {
        "Create"
    }

    auto_payload!();
}

/// Handles navigation commands against a repository.
#[derive(Clone)]
pub struct CommandHandler {
    repo: Arc<dyn Repository>,
    lookup: Lookup,
}

impl CommandHandler {
    pub fn new(repo: Arc<dyn Repository>, lookup: Lookup) -> Self {
        Self { repo, lookup }
    }

    /// Creates a Nav under a fresh identity and returns it.
    ///
    /// Fails with [`NavError::NameTaken`] if the Lookup already knows the
    /// name. The Lookup trails the event log, so this check can miss a
    /// creation that has not been projected yet.
    pub async fn create(&self, command: CreateNav) -> Result<NavId> {
        debug!(command = command.name(), payload = ?command.payload(), "handling command");

        let name = command.name.trim();
        if self.lookup.name(name).is_some() {
            return Err(NavError::NameTaken {
                name: name.to_string(),
            }
            .into());
        }

        let mut nav = Nav::new(NavId::new());
        nav.create(name, command.items)?;
        self.repo
            .save(&mut nav)
            .await
            .context("save navigation")?;

        info!(nav_id = %nav.id(), name = nav.name(), "navigation created");
        Ok(nav.id())
    }
}
