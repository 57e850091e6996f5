//! Ordered, path-addressed item trees.
//!
//! A [`Tree`] is one level of a navigation: an ordered list of [`Item`]s,
//! each of which may own a child tree. Order is render order.
//!
//! Nothing here knows about events. The aggregate validates intent against
//! a tree, records an event, and then folds the event back in through these
//! same operations, so live application and replay share one code path.

use crate::error::{NavError, Result};
use crate::item::Item;
use crate::path;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static EMPTY: Tree = Tree { items: Vec::new() };

/// One level of a navigation tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree {
    items: Vec<Item>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// IDs at this level, in order.
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.id.as_str()).collect()
    }

    /// The item with `id` at this level.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Resolves a dot-separated path, one level at a time.
    pub fn item(&self, path: &str) -> Result<&Item> {
        let segments = path::segments(path).ok_or_else(|| not_found(path))?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(not_found(path));
        };

        let mut level = self;
        for segment in parents {
            level = level
                .get(segment)
                .and_then(Item::children)
                .ok_or_else(|| not_found(path))?;
        }
        level.get(last).ok_or_else(|| not_found(path))
    }

    /// Mutable variant of [`Tree::item`].
    pub fn item_mut(&mut self, path: &str) -> Result<&mut Item> {
        let segments = path::segments(path).ok_or_else(|| not_found(path))?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(not_found(path));
        };

        let mut level = self;
        for segment in parents {
            level = level
                .get_mut(segment)
                .and_then(|item| item.tree.as_mut())
                .ok_or_else(|| not_found(path))?;
        }
        level.get_mut(last).ok_or_else(|| not_found(path))
    }

    /// The level addressed by `path`: the root for `""`, otherwise the
    /// subtree of the item at `path` (empty if it has none yet).
    pub fn level(&self, path: &str) -> Result<&Tree> {
        if path.is_empty() {
            return Ok(self);
        }
        Ok(self.item(path)?.children().unwrap_or(&EMPTY))
    }

    /// Mutable level at `path`, creating an empty subtree if needed.
    pub fn level_mut(&mut self, path: &str) -> Result<&mut Tree> {
        if path.is_empty() {
            return Ok(self);
        }
        Ok(self.item_mut(path)?.tree.get_or_insert_with(Tree::default))
    }

    /// Mutable level at `path` without creating a missing subtree.
    pub fn existing_level_mut(&mut self, path: &str) -> Result<Option<&mut Tree>> {
        if path.is_empty() {
            return Ok(Some(self));
        }
        Ok(self.item_mut(path)?.tree.as_mut())
    }

    /// Fails with [`NavError::DuplicateItem`] if any incoming ID is already
    /// used at this level or repeats within `items`.
    pub fn check_duplicates(&self, items: &[Item]) -> Result<()> {
        let mut seen: HashSet<&str> = self.items.iter().map(|item| item.id.as_str()).collect();
        for item in items {
            if !seen.insert(item.id.as_str()) {
                return Err(NavError::DuplicateItem {
                    id: item.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Inserts `items` at `index`, clamped to the current length.
    pub fn insert(&mut self, index: usize, items: impl IntoIterator<Item = Item>) {
        let index = index.min(self.items.len());
        self.items.splice(index..index, items);
    }

    /// Removes the item with `id` at this level. Missing IDs are ignored.
    pub fn remove(&mut self, id: &str) -> Option<Item> {
        self.position(id).map(|at| self.items.remove(at))
    }

    /// Removes the item at `path` from its parent level.
    pub fn remove_path(&mut self, path: &str) -> Option<Item> {
        let (parent, id) = path::split_last(path);
        match self.existing_level_mut(parent) {
            Ok(Some(level)) => level.remove(id),
            _ => None,
        }
    }

    /// Swaps the item with `id` for `item`, keeping its position.
    pub fn replace(&mut self, id: &str, item: Item) -> Option<Item> {
        let at = self.position(id)?;
        Some(std::mem::replace(&mut self.items[at], item))
    }

    /// Normalizes a requested order: keeps the first occurrence of each ID
    /// and drops IDs that are not at this level.
    pub fn sorting_for<S: AsRef<str>>(&self, sorting: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        sorting
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| self.get(id).is_some() && seen.insert(*id))
            .map(str::to_string)
            .collect()
    }

    /// Whether [`Tree::sort`] with this (normalized) sorting changes order.
    pub fn would_reorder(&self, sorting: &[String]) -> bool {
        let rest = self
            .ids()
            .into_iter()
            .filter(|id| !sorting.iter().any(|s| s == id));
        let sorted = sorting.iter().map(String::as_str).chain(rest);
        !sorted.eq(self.ids())
    }

    /// Moves the items named in `sorting` to the front, in that order. The
    /// remaining items follow in their previous relative order.
    pub fn sort<S: AsRef<str>>(&mut self, sorting: &[S]) {
        let mut rest = std::mem::take(&mut self.items);
        let mut sorted = Vec::with_capacity(rest.len());
        for id in sorting {
            if let Some(at) = rest.iter().position(|item| item.id == id.as_ref()) {
                sorted.push(rest.remove(at));
            }
        }
        sorted.extend(rest);
        self.items = sorted;
    }

    /// Sets the initial flag on every item, recursively.
    pub fn set_initial(&mut self, initial: bool) {
        for item in &mut self.items {
            item.set_initial(initial);
        }
    }

    /// Depth-first list of the paths of every item.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out
    }

    fn collect_paths(&self, parent: &str, out: &mut Vec<String>) {
        for item in &self.items {
            let path = path::join(parent, &item.id);
            if let Some(tree) = item.children() {
                out.push(path.clone());
                tree.collect_paths(&path, out);
            } else {
                out.push(path);
            }
        }
    }
}

impl<'a> IntoIterator for &'a Tree {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn not_found(path: &str) -> NavError {
    NavError::ItemNotFound {
        path: path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(id: &str) -> Item {
        Item::label_item(id, id.to_uppercase())
    }

    /// `foo`, `bar{baz{foo,bar,baz}}`
    fn nested() -> Tree {
        Tree::from_items([
            label("foo"),
            label("bar").with_children([
                label("baz").with_children([label("foo"), label("bar"), label("baz")])
            ]),
        ])
    }

    fn flat() -> Tree {
        Tree::from_items(["foo", "bar", "baz", "qux"].map(label))
    }

    #[test]
    fn resolves_nested_paths() {
        let tree = nested();

        let item = tree.item("bar.baz.foo").unwrap();
        assert_eq!(item.id, "foo");
        assert!(item.children().is_none());
        assert_eq!(tree.item("foo").unwrap().id, "foo");
    }

    #[test]
    fn unresolvable_paths_are_not_found() {
        let tree = nested();

        for path in ["", "bar.bar", "qux", "foo.bar", "bar..baz", "bar.baz.foo.x"] {
            assert_eq!(
                tree.item(path),
                Err(NavError::ItemNotFound {
                    path: path.to_string()
                }),
                "{path}"
            );
        }
    }

    #[test]
    fn level_of_leaf_is_empty() {
        let tree = nested();

        assert_eq!(tree.level("").unwrap().len(), 2);
        assert_eq!(tree.level("bar.baz").unwrap().ids(), ["foo", "bar", "baz"]);
        assert!(tree.level("foo").unwrap().is_empty());
        assert!(tree.level("nope").is_err());
    }

    #[test]
    fn insert_clamps_to_append() {
        let mut tree = flat();
        tree.insert(99, [label("a")]);
        assert_eq!(tree.ids(), ["foo", "bar", "baz", "qux", "a"]);
    }

    #[test]
    fn insert_shifts_later_items() {
        let mut tree = flat();
        tree.insert(1, [label("a"), label("b")]);
        assert_eq!(tree.ids(), ["foo", "a", "b", "bar", "baz", "qux"]);
    }

    #[test]
    fn duplicates_are_checked_per_level() {
        let tree = nested();

        assert_eq!(
            tree.check_duplicates(&[label("new"), label("bar")]),
            Err(NavError::DuplicateItem { id: "bar".into() })
        );
        // `baz` exists only one level down, so it is free at the root.
        assert!(tree.check_duplicates(&[label("baz")]).is_ok());
        assert_eq!(
            tree.check_duplicates(&[label("x"), label("x")]),
            Err(NavError::DuplicateItem { id: "x".into() })
        );
    }

    #[test]
    fn remove_is_silent_for_missing_ids() {
        let mut tree = nested();

        assert!(tree.remove("nope").is_none());
        assert_eq!(tree.remove_path("bar.baz.bar").unwrap().id, "bar");
        assert_eq!(tree.level("bar.baz").unwrap().ids(), ["foo", "baz"]);
        assert!(tree.remove_path("bar.baz.bar").is_none());
        assert!(tree.remove_path("foo.x").is_none());
        assert_eq!(tree.remove_path("foo").unwrap().id, "foo");
        assert_eq!(tree.ids(), ["bar"]);
    }

    #[test]
    fn replace_keeps_position() {
        let mut tree = flat();
        let old = tree.replace("baz", Item::static_link("baz", "Baz", "/baz")).unwrap();

        assert_eq!(old.label(""), Some("BAZ"));
        assert_eq!(tree.ids(), ["foo", "bar", "baz", "qux"]);
        assert_eq!(tree.get("baz").unwrap().path(""), Some("/baz"));
        assert!(tree.replace("nope", label("nope")).is_none());
    }

    #[test]
    fn partial_sort_moves_named_items_first() {
        let mut tree = flat();
        let sorting = tree.sorting_for(&["foo", "baz"]);

        assert!(tree.would_reorder(&sorting));
        tree.sort(&sorting);
        assert_eq!(tree.ids(), ["foo", "baz", "bar", "qux"]);
    }

    #[test]
    fn sort_filters_unknown_and_repeated_ids() {
        let mut tree = flat();
        let sorting = tree.sorting_for(&["abc", "qux", "xyz", "bar", "qux"]);

        assert_eq!(sorting, ["qux", "bar"]);
        tree.sort(&sorting);
        assert_eq!(tree.ids(), ["qux", "bar", "foo", "baz"]);
    }

    #[test]
    fn sort_in_current_order_is_no_change() {
        let tree = flat();

        assert!(!tree.would_reorder(&tree.sorting_for(&["foo", "bar", "baz", "qux"])));
        assert!(!tree.would_reorder(&tree.sorting_for(&["foo", "bar"])));
        assert!(!tree.would_reorder(&tree.sorting_for(&["abc"])));
        assert!(tree.would_reorder(&tree.sorting_for(&["bar"])));
    }

    #[test]
    fn paths_are_depth_first() {
        assert_eq!(
            nested().paths(),
            ["foo", "bar", "bar.baz", "bar.baz.foo", "bar.baz.bar", "bar.baz.baz"]
        );
    }
}
