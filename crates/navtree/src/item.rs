//! Navigation items.

use crate::tree::Tree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Locale key of the default label or path.
pub const DEFAULT_LOCALE: &str = "";

/// Kind of a navigation item.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// A heading without a target.
    Label,
    /// A link to a fixed, per-locale path.
    StaticLink,
}

/// A node of a navigation tree.
///
/// The item exclusively owns its subtree. `id` must be unique among its
/// siblings; it is the segment that addresses the item in a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ItemType,
    /// Set for items that were part of the creation payload.
    #[serde(default)]
    pub initial: bool,
    /// Locale → link path. Only meaningful for link items.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
    /// Locale → label.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub tree: Option<Tree>,
}

impl Item {
    pub fn new(id: impl Into<String>, kind: ItemType) -> Self {
        Self {
            id: id.into(),
            kind,
            initial: false,
            paths: BTreeMap::new(),
            labels: BTreeMap::new(),
            tree: None,
        }
    }

    /// A label item with a default label.
    pub fn label_item(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, ItemType::Label).with_label(DEFAULT_LOCALE, label)
    }

    /// A static link with a default label and path.
    pub fn static_link(
        id: impl Into<String>,
        label: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self::new(id, ItemType::StaticLink)
            .with_label(DEFAULT_LOCALE, label)
            .with_path(DEFAULT_LOCALE, path)
    }

    pub fn with_label(mut self, locale: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(locale.into(), label.into());
        self
    }

    pub fn with_path(mut self, locale: impl Into<String>, path: impl Into<String>) -> Self {
        self.paths.insert(locale.into(), path.into());
        self
    }

    /// Replaces the subtree with `items`.
    pub fn with_children(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.tree = Some(Tree::from_items(items));
        self
    }

    /// Label for `locale`, falling back to the default label.
    pub fn label(&self, locale: &str) -> Option<&str> {
        localized(&self.labels, locale)
    }

    /// Link path for `locale`, falling back to the default path.
    pub fn path(&self, locale: &str) -> Option<&str> {
        localized(&self.paths, locale)
    }

    pub fn children(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Sets the initial flag on this item and all of its descendants.
    pub fn set_initial(&mut self, initial: bool) {
        self.initial = initial;
        if let Some(tree) = self.tree.as_mut() {
            tree.set_initial(initial);
        }
    }
}

fn localized<'a>(values: &'a BTreeMap<String, String>, locale: &str) -> Option<&'a str> {
    values
        .get(locale)
        .or_else(|| values.get(DEFAULT_LOCALE))
        .map(String::as_str)
}
