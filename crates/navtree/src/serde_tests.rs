//! Round-trip tests for the JSON and binary Nav encodings.
//!
//! A decoded Nav must be observably equal to the original: identity, name,
//! version and the whole tree, including nested subtrees and locale maps.

use crate::encoding;
use crate::{EventEnvelope, Item, ItemType, Nav, NavEvent, NavId};

// ============================================================================
// Fixtures
// ============================================================================

fn localized_nav() -> Nav {
    let mut nav = Nav::new(NavId::new());
    nav.create(
        "main",
        vec![
            Item::static_link("home", "Home", "/")
                .with_label("de", "Startseite")
                .with_path("de", "/de"),
            Item::label_item("docs", "Docs").with_children([
                Item::static_link("guide", "Guide", "/guide"),
                Item::label_item("api", "API")
                    .with_children([Item::static_link("core", "Core", "/api/core")]),
            ]),
        ],
    )
    .unwrap();
    nav.append_at("docs.api", vec![Item::new("blank", ItemType::Label)])
        .unwrap();
    nav.sort_at("docs", &["api"]).unwrap();
    nav
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn json_round_trip() {
    let nav = localized_nav();

    let json = encoding::to_json(&nav).unwrap();
    let decoded = encoding::from_json(&json).unwrap();

    assert_eq!(decoded, nav);
    assert_eq!(decoded.id(), nav.id());
    assert_eq!(decoded.item("home").unwrap().label("de"), Some("Startseite"));
    assert_eq!(decoded.item("docs.api.core").unwrap().path("fr"), Some("/api/core"));
    assert!(decoded.item("docs.api.core").unwrap().initial);
    assert!(!decoded.item("docs.api.blank").unwrap().initial);
}

#[test]
fn binary_round_trip() {
    let nav = localized_nav();

    let bytes = encoding::to_bytes(&nav).unwrap();
    let decoded = encoding::from_bytes(&bytes).unwrap();

    assert_eq!(decoded, nav);
    assert_eq!(decoded.tree().level("docs").unwrap().ids(), ["api", "guide"]);
}

#[test]
fn uncommitted_events_are_not_encoded() {
    let nav = localized_nav();
    assert!(!nav.uncommitted().is_empty());

    let from_json = encoding::from_json(&encoding::to_json(&nav).unwrap()).unwrap();
    let from_bytes = encoding::from_bytes(&encoding::to_bytes(&nav).unwrap()).unwrap();

    assert!(from_json.uncommitted().is_empty());
    assert!(from_bytes.uncommitted().is_empty());
    assert_eq!(from_json.committed_version(), nav.version());
}

#[test]
fn json_uses_tagged_fields() {
    let nav = localized_nav();
    let value: serde_json::Value = serde_json::from_str(&encoding::to_json(&nav).unwrap()).unwrap();

    assert_eq!(value["id"], nav.id().to_string());
    assert_eq!(value["name"], "main");
    assert_eq!(value["tree"][0]["id"], "home");
    assert_eq!(value["tree"][0]["type"], "static_link");
    assert_eq!(value["tree"][0]["labels"]["de"], "Startseite");
    assert_eq!(value["tree"][0]["paths"][""], "/");
}

#[test]
fn garbage_bytes_fail_to_decode() {
    assert!(matches!(
        encoding::from_bytes(&[0xff, 0x00, 0x13]),
        Err(crate::NavError::Encoding { .. })
    ));
}

#[test]
fn envelopes_round_trip_through_json() {
    let nav = localized_nav();
    let envelopes: Vec<EventEnvelope> = nav
        .uncommitted()
        .iter()
        .cloned()
        .enumerate()
        .map(|(at, event)| EventEnvelope::new(nav.id(), at as u64 + 1, event))
        .collect();

    let json = serde_json::to_string(&envelopes).unwrap();
    let decoded: Vec<EventEnvelope> = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, envelopes);

    let events: Vec<NavEvent> = decoded.into_iter().map(|envelope| envelope.event).collect();
    assert_eq!(Nav::from_events(nav.id(), &events), nav);
}
