//! Navigation events and the envelopes they travel in.
//!
//! Events are facts: they have already been validated by the aggregate and
//! are applied without further checks, both live and on replay.

use crate::aggregate::NavId;
use crate::item::Item;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate type carried by every Nav envelope.
pub const AGGREGATE_TYPE: &str = "nav";

/// Event names, as used for subscription filtering.
pub mod names {
    pub const CREATED: &str = "Created";
    pub const ITEMS_ADDED: &str = "ItemsAdded";
    pub const ITEMS_REMOVED: &str = "ItemsRemoved";
    pub const SORTED: &str = "Sorted";
}

/// Something that happened to a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum NavEvent {
    Created {
        name: String,
    },
    /// `index` is already clamped to the target level.
    ItemsAdded {
        items: Vec<Item>,
        index: usize,
        path: String,
    },
    /// Paths of the removed items, in removal order.
    ItemsRemoved {
        items: Vec<String>,
    },
    /// Normalized sorting: unique IDs present at `path`.
    Sorted {
        sorting: Vec<String>,
        path: String,
    },
}

impl NavEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => names::CREATED,
            Self::ItemsAdded { .. } => names::ITEMS_ADDED,
            Self::ItemsRemoved { .. } => names::ITEMS_REMOVED,
            Self::Sorted { .. } => names::SORTED,
        }
    }
}

/// A persisted event with its stream position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub aggregate_id: NavId,
    pub aggregate_type: String,
    /// Position in the aggregate's stream, starting at 1.
    pub version: u64,
    pub occurred_at: DateTime<Utc>,
    pub event: NavEvent,
}

impl EventEnvelope {
    pub fn new(aggregate_id: NavId, version: u64, event: NavEvent) -> Self {
        Self {
            aggregate_id,
            aggregate_type: AGGREGATE_TYPE.to_string(),
            version,
            occurred_at: Utc::now(),
            event,
        }
    }

    pub fn name(&self) -> &'static str {
        self.event.name()
    }
}

/// Selects envelopes by aggregate type and, optionally, event name.
#[derive(Debug, Clone)]
pub struct EventFilter {
    aggregate_type: &'static str,
    names: Option<Vec<&'static str>>,
}

impl EventFilter {
    /// Every event of the Nav aggregate.
    pub fn all() -> Self {
        Self {
            aggregate_type: AGGREGATE_TYPE,
            names: None,
        }
    }

    /// Only the named Nav events.
    pub fn named(names: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            aggregate_type: AGGREGATE_TYPE,
            names: Some(names.into_iter().collect()),
        }
    }

    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        envelope.aggregate_type == self.aggregate_type
            && self
                .names
                .as_ref()
                .map_or(true, |names| names.contains(&envelope.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_by_name() {
        let id = NavId::new();
        let created = EventEnvelope::new(id, 1, NavEvent::Created { name: "main".into() });
        let sorted = EventEnvelope::new(
            id,
            2,
            NavEvent::Sorted {
                sorting: vec![],
                path: String::new(),
            },
        );
        let filter = EventFilter::named([names::CREATED]);

        assert!(filter.matches(&created));
        assert!(!filter.matches(&sorted));
        assert!(EventFilter::all().matches(&sorted));
    }

    #[test]
    fn other_aggregates_are_filtered_out() {
        let mut envelope =
            EventEnvelope::new(NavId::new(), 1, NavEvent::Created { name: "x".into() });
        envelope.aggregate_type = "page".into();

        assert!(!EventFilter::all().matches(&envelope));
    }

    #[test]
    fn events_are_tagged() {
        let json = serde_json::to_value(NavEvent::Created { name: "main".into() }).unwrap();
        assert_eq!(json["type"], "Created");
        assert_eq!(json["payload"]["name"], "main");
    }
}
