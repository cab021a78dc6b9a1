use gemshare_types::{Error, Label, LabelTag};
use proptest::prelude::*;

// ── Construction ─────────────────────────────────────────────────

#[test]
fn zero_is_not_a_label() {
    assert!(Label::new(0).is_none());
    assert_eq!(Label::new(1), Some(Label::P1));
}

#[test]
fn index_and_number_are_offset_by_one() {
    let p2 = Label::from_index(1).unwrap();
    assert_eq!(p2, Label::P2);
    assert_eq!(p2.number(), 2);
    assert_eq!(p2.index(), 1);
}

#[test]
fn from_index_rejects_out_of_range() {
    assert!(Label::from_index(254).is_some());
    assert!(Label::from_index(255).is_none());
}

#[test]
fn first_n_yields_ordered_labels() {
    let labels: Vec<Label> = Label::first_n(3).collect();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels[0], Label::P1);
    assert_eq!(labels[2].to_string(), "P3");
}

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parses_short_and_long_forms() {
    assert_eq!("P1".parse::<Label>().unwrap(), Label::P1);
    assert_eq!("p2".parse::<Label>().unwrap(), Label::P2);
    assert_eq!("Player 2".parse::<Label>().unwrap(), Label::P2);
    assert_eq!(" player_1 ".parse::<Label>().unwrap(), Label::P1);
}

#[test]
fn rejects_garbage() {
    for bad in ["", "P", "P0", "Q1", "P1x", "Player", "P999"] {
        match bad.parse::<Label>() {
            Err(Error::InvalidLabel(s)) => assert_eq!(s, bad),
            other => panic!("expected InvalidLabel for {bad:?}, got {other:?}"),
        }
    }
}

#[test]
fn extract_finds_label_in_free_text() {
    assert_eq!(Label::extract("HUD_P2"), Some(Label::P2));
    assert_eq!(Label::extract("icon_p1_blue"), Some(Label::P1));
    assert_eq!(Label::extract("PLAYER 2"), Some(Label::P2));
    assert_eq!(Label::extract("Player Number Indicator"), None);
    assert_eq!(Label::extract(""), None);
}

#[test]
fn extract_ignores_p_zero() {
    assert_eq!(Label::extract("P0 then P1"), Some(Label::P1));
}

// ── Rendering ────────────────────────────────────────────────────

#[test]
fn tag_renders_known_and_unknown() {
    assert_eq!(LabelTag::from(Label::P1).to_string(), "[P1]");
    assert_eq!(LabelTag::UNKNOWN.to_string(), "[P?]");
    assert!(!LabelTag::default().is_known());
}

#[test]
fn serde_uses_display_form() {
    let json = serde_json::to_string(&Label::P2).unwrap();
    assert_eq!(json, "\"P2\"");
    let back: Label = serde_json::from_str("\"p1\"").unwrap();
    assert_eq!(back, Label::P1);
    assert!(serde_json::from_str::<Label>("\"nope\"").is_err());
}

proptest! {
    #[test]
    fn display_parse_roundtrip(n in 1u8..=255) {
        let label = Label::new(n).unwrap();
        prop_assert_eq!(label.to_string().parse::<Label>().unwrap(), label);
        prop_assert_eq!(Label::extract(&format!("hud/{label}/text")), Some(label));
    }
}
