mod common;

use common::{attach_health, HEALTH_CAP};
use gemshare_sync::host::mock::MemoryHost;
use gemshare_sync::{Capability, GemshareConfig, Member, MemberKind, Prober, SyncError};
use gemshare_types::{ValueType, UNKNOWN_READING};

fn prober() -> Prober {
    let config = GemshareConfig::default();
    Prober::new(&config.probe, &config.markers).unwrap()
}

// ── Level and ceiling ────────────────────────────────────────────

#[test]
fn finds_level_and_ceiling_properties() {
    let host = MemoryHost::new();
    let node = host.spawn("Player", None);
    attach_health(&host, node, 75.0, 100.0);

    let readers = prober().probe(&host, node).unwrap();
    assert_eq!(readers.level.member.member, "CurrentHealth");
    assert_eq!(readers.level.member.capability, HEALTH_CAP);
    assert_eq!(readers.read_level(&host), 75.0);
    assert_eq!(readers.read_ceiling(&host), 100.0);
}

#[test]
fn ceiling_named_member_never_becomes_level() {
    let host = MemoryHost::new();
    let node = host.spawn("Player", None);
    // MaxHP comes first but belongs to the ceiling role only.
    let max = Member::property("MaxHP", ValueType::I32);
    let hp = Member::property("HP", ValueType::I32);
    let cap = Capability::new("Game.Stats")
        .with_member(max.clone())
        .with_member(hp.clone());
    let (max_ref, hp_ref) = (cap.member_ref(&max), cap.member_ref(&hp));
    host.attach(node, cap);
    host.set_member(node, &max_ref, 5i64);
    host.set_member(node, &hp_ref, 3i64);

    let readers = prober().probe(&host, node).unwrap();
    assert_eq!(readers.level.member.member, "HP");
    assert_eq!(readers.ceiling.unwrap().member.member, "MaxHP");
}

#[test]
fn missing_ceiling_reads_as_unknown() {
    let host = MemoryHost::new();
    let node = host.spawn("Player", None);
    host.attach_member(node, "Game.Life", Member::field("life", ValueType::F64), 3.0);

    let readers = prober().probe(&host, node).unwrap();
    assert!(readers.ceiling.is_none());
    assert_eq!(readers.read_ceiling(&host), UNKNOWN_READING);
}

#[test]
fn properties_are_preferred_over_fields() {
    let host = MemoryHost::new();
    let node = host.spawn("Player", None);
    let field = Member::field("health", ValueType::F32);
    let prop = Member::property("Health", ValueType::F32);
    let cap = Capability::new("Game.Unit")
        .with_member(field.clone())
        .with_member(prop.clone());
    host.attach(node, cap);

    let readers = prober().probe(&host, node).unwrap();
    assert_eq!(readers.level.member.member, "Health");
    assert!(matches!(readers.level.kind, MemberKind::Property { .. }));
}

#[test]
fn non_numeric_and_unreadable_members_are_ignored() {
    let host = MemoryHost::new();
    let node = host.spawn("Player", None);
    let text = Member::property("HealthLabel", ValueType::Text);
    let write_only = Member {
        name: "HealthSetter".to_string(),
        kind: MemberKind::Property { readable: false },
        value_type: ValueType::F32,
    };
    let cap = Capability::new("Game.Unit")
        .with_member(text)
        .with_member(write_only);
    host.attach(node, cap);

    assert!(matches!(
        prober().probe(&host, node),
        Err(SyncError::Probe(n)) if n == node
    ));
}

// ── Capability ranking ───────────────────────────────────────────

#[test]
fn health_named_capability_wins_over_earlier_ones() {
    let host = MemoryHost::new();
    let node = host.spawn("Player", None);
    host.attach_member(node, "Game.Shield", Member::property("ShieldHP", ValueType::F32), 9.0);
    host.attach_member(node, "Game.Player.Motor", Member::property("hp", ValueType::F32), 8.0);
    attach_health(&host, node, 50.0, 60.0);

    let readers = prober().probe(&host, node).unwrap();
    assert_eq!(readers.level.member.capability, HEALTH_CAP);
}

#[test]
fn player_namespace_ranks_above_others() {
    let host = MemoryHost::new();
    let node = host.spawn("Player", None);
    host.attach_member(node, "Game.Shield", Member::property("ShieldHP", ValueType::F32), 9.0);
    host.attach_member(node, "Game.Player.Motor", Member::property("hp", ValueType::F32), 8.0);

    let readers = prober().probe(&host, node).unwrap();
    assert_eq!(readers.level.member.capability, "Game.Player.Motor");
    assert_eq!(readers.read_level(&host), 8.0);
}

// ── Method fallback ──────────────────────────────────────────────

#[test]
fn zero_arity_methods_are_a_fallback() {
    let host = MemoryHost::new();
    let node = host.spawn("Player", None);
    let get = Member::method("GetHealth", 0, ValueType::F32);
    let max = Member::method("GetMaxHealth", 0, ValueType::F32);
    let takes_arg = Member::method("CalcHealth", 1, ValueType::F32);
    let cap = Capability::new("Game.Unit")
        .with_member(takes_arg)
        .with_member(get.clone())
        .with_member(max.clone());
    let (get_ref, max_ref) = (cap.member_ref(&get), cap.member_ref(&max));
    host.attach(node, cap);
    host.set_member(node, &get_ref, 4.0);
    host.set_member(node, &max_ref, 10.0);

    let readers = prober().probe(&host, node).unwrap();
    assert_eq!(readers.level.member.member, "GetHealth");
    assert_eq!(readers.ceiling.unwrap().member.member, "GetMaxHealth");
}

#[test]
fn method_without_resource_word_is_ignored() {
    let host = MemoryHost::new();
    let node = host.spawn("Player", None);
    host.attach_member(node, "Game.Unit", Member::method("GetSpeed", 0, ValueType::F32), 1.0);

    assert!(prober().probe(&host, node).is_err());
}

// ── Fallbacks and failures ───────────────────────────────────────

#[test]
fn falls_back_to_parent_capabilities() {
    let host = MemoryHost::new();
    let parent = host.spawn("Player", None);
    let child = host.spawn("Model", Some(parent));
    attach_health(&host, parent, 10.0, 20.0);

    let readers = prober().probe(&host, child).unwrap();
    assert_eq!(readers.level.node, parent);
    assert_eq!(readers.read_level(&host), 10.0);
}

#[test]
fn dead_node_is_an_error() {
    let host = MemoryHost::new();
    let node = host.spawn("Player", None);
    host.destroy(node);

    assert!(matches!(prober().probe(&host, node), Err(SyncError::Host(_))));
}

#[test]
fn reader_on_destroyed_node_reads_unknown() {
    let host = MemoryHost::new();
    let node = host.spawn("Player", None);
    attach_health(&host, node, 10.0, 20.0);
    let readers = prober().probe(&host, node).unwrap();

    host.destroy(node);
    assert_eq!(readers.read_level(&host), UNKNOWN_READING);
    assert_eq!(readers.read_ceiling(&host), UNKNOWN_READING);
}

#[test]
fn unset_member_reads_unknown() {
    let host = MemoryHost::new();
    let node = host.spawn("Player", None);
    let cap = Capability::new("Game.Unit").with_member(Member::property("HP", ValueType::F32));
    host.attach(node, cap);

    let readers = prober().probe(&host, node).unwrap();
    assert_eq!(readers.read_level(&host), UNKNOWN_READING);
}
