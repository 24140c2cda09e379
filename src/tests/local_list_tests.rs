use std::sync::Arc;

use crate::dex::instructions::{DalvInsnList, InsnKind};
use crate::dex::opcodes;
use crate::types::{LocalItem, RegisterSpec, RegisterSpecSet, Type};
use crate::{DexErrorKind, Entry, LocalList};

fn nops(n: usize) -> Vec<InsnKind> {
    let nop = opcodes::get(0x00).unwrap();
    (0..n).map(|_| InsnKind::plain(nop, &[])).collect()
}

fn snap(specs: &[&RegisterSpec]) -> InsnKind {
    snap_of_width(4, specs)
}

fn snap_of_width(width: usize, specs: &[&RegisterSpec]) -> InsnKind {
    InsnKind::snapshot(RegisterSpecSet::from_specs(width, specs.iter().map(|s| (*s).clone())).unwrap())
}

fn v3_int() -> RegisterSpec {
    RegisterSpec::local(3, "I", "high").unwrap()
}

fn x_int() -> RegisterSpec {
    RegisterSpec::local(1, "I", "x").unwrap()
}

fn y_long() -> RegisterSpec {
    RegisterSpec::local(1, "J", "y").unwrap()
}

fn w_string() -> RegisterSpec {
    RegisterSpec::local(2, "Ljava/lang/String;", "w").unwrap()
}

// Lays out marker/code segments back to back.
fn method(parts: Vec<Vec<InsnKind>>) -> DalvInsnList {
    DalvInsnList::assemble(parts.into_iter().flatten().collect()).unwrap()
}

fn spans(list: &LocalList) -> Vec<(u16, &str, u32, u32)> {
    list.iter()
        .map(|e| (e.register(), e.name().unwrap_or("?"), e.start(), e.end()))
        .collect()
}

#[test]
fn single_snapshot_runs_to_end_of_code() {
    let insns = method(vec![vec![snap(&[&x_int()])], nops(10)]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(spans(&list), vec![(1, "x", 0, 10)]);
    let e = list.get(0).unwrap();
    assert_eq!(e.display_type(), &Type::intern("I").unwrap());
}

#[test]
fn unbinding_snapshot_ends_scope() {
    let insns = method(vec![vec![snap(&[&x_int()])], nops(5), vec![snap(&[])], nops(5)]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(spans(&list), vec![(1, "x", 0, 5)]);
}

#[test]
fn rebinding_register_splits_at_same_address() {
    let insns = method(vec![vec![snap(&[&x_int()])], nops(5), vec![snap(&[&y_long()])], nops(5)]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(spans(&list), vec![(1, "x", 0, 5), (1, "y", 5, 10)]);
    assert_eq!(list.get(1).unwrap().display_type().descriptor(), "J");
}

#[test]
fn known_null_local_is_shown_as_object() {
    let z = RegisterSpec::new(2, Type::known_null(), Some(LocalItem::named("z")));
    let insns = method(vec![vec![snap(&[&z])], nops(3)]);
    let list = LocalList::make(&insns).unwrap();
    let e = list.get(0).unwrap();
    assert_eq!(e.display_type(), &Type::object());
    assert!(e.spec_type().is_known_null());
}

#[test]
fn start_repeating_snapshot_binding_is_ignored() {
    let insns = method(vec![vec![snap(&[&x_int()]), InsnKind::LocalStart(x_int())], nops(10)]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(spans(&list), vec![(1, "x", 0, 10)]);
}

#[test]
fn no_markers_gives_shared_empty_list() {
    let list = LocalList::make(&method(vec![nops(4)])).unwrap();
    assert!(list.is_empty());
    assert!(Arc::ptr_eq(&list, &LocalList::empty()));

    let list = LocalList::make(&DalvInsnList::default()).unwrap();
    assert!(Arc::ptr_eq(&list, &LocalList::empty()));
}

#[test]
fn snapshots_without_bindings_give_shared_empty_list() {
    let insns = method(vec![vec![snap(&[])], nops(2), vec![snap(&[])]]);
    let list = LocalList::make(&insns).unwrap();
    assert!(Arc::ptr_eq(&list, &LocalList::empty()));
}

#[test]
fn start_into_unbound_register() {
    let insns = method(vec![vec![snap(&[])], nops(3), vec![InsnKind::LocalStart(x_int())], nops(3)]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(spans(&list), vec![(1, "x", 3, 6)]);
}

#[test]
fn start_replacing_binding_ends_old_scope() {
    let insns = method(vec![
        vec![snap(&[&x_int()])],
        nops(4),
        vec![InsnKind::LocalStart(y_long())],
        nops(4),
    ]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(spans(&list), vec![(1, "x", 0, 4), (1, "y", 4, 8)]);
}

#[test]
fn zero_width_scope_is_elided() {
    let insns = method(vec![vec![snap(&[&x_int()]), InsnKind::LocalStart(y_long())], nops(4)]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(spans(&list), vec![(1, "y", 0, 4)]);
}

#[test]
fn started_local_carries_into_later_snapshots() {
    let shared = Arc::new(RegisterSpecSet::new(4));
    let insns = method(vec![
        vec![InsnKind::LocalSnapshot(Arc::clone(&shared)), InsnKind::LocalStart(x_int())],
        nops(2),
        vec![snap(&[&x_int()])],
        nops(2),
        vec![snap(&[])],
        nops(2),
    ]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(spans(&list), vec![(1, "x", 0, 4)]);
    // The snapshot's own set was copied before the start was recorded.
    assert!(shared.is_empty());
}

#[test]
fn entries_follow_start_order() {
    let insns = method(vec![
        vec![snap(&[&x_int(), &w_string()])],
        nops(2),
        vec![snap(&[&w_string()])],
        nops(4),
    ]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(spans(&list), vec![(1, "x", 0, 2), (2, "w", 0, 6)]);
}

#[test]
fn snapshot_slot_order_does_not_matter() {
    let a = method(vec![vec![snap(&[&x_int(), &w_string()])], nops(3), vec![snap(&[])]]);
    let b = method(vec![vec![snap(&[&w_string(), &x_int()])], nops(3), vec![snap(&[])]]);
    let la = LocalList::make(&a).unwrap();
    let lb = LocalList::make(&b).unwrap();
    assert_eq!(la, lb);
}

#[test]
fn replay_gives_equal_but_distinct_lists() {
    let insns = method(vec![
        vec![snap(&[&x_int()])],
        nops(3),
        vec![InsnKind::LocalStart(w_string())],
        nops(3),
        vec![snap(&[&y_long(), &w_string()])],
        nops(3),
    ]);
    let first = LocalList::make(&insns).unwrap();
    let second = LocalList::make(&insns).unwrap();
    assert_eq!(*first, *second);
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn scopes_for_one_register_never_overlap() {
    let insns = method(vec![
        vec![snap(&[&x_int()])],
        nops(2),
        vec![InsnKind::LocalStart(y_long())],
        nops(2),
        vec![snap(&[&x_int(), &w_string()])],
        nops(2),
        vec![snap(&[])],
        nops(2),
        vec![snap(&[&x_int()])],
        nops(2),
    ]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(
        spans(&list),
        vec![(1, "x", 0, 2), (1, "y", 2, 4), (1, "x", 4, 6), (2, "w", 4, 6), (1, "x", 8, 10)]
    );

    let index = list.index().unwrap();
    assert_eq!(index.local_at(1, 3).and_then(Entry::name), Some("y"));
    assert_eq!(index.local_at(1, 4).and_then(Entry::name), Some("x"));
    assert_eq!(index.local_at(1, 6), None);
    assert_eq!(index.local_at(2, 5).and_then(Entry::name), Some("w"));
    let live: Vec<&str> = index.live_at(5).filter_map(Entry::name).collect();
    assert_eq!(live, vec!["x", "w"]);
}

#[test]
fn first_snapshot_fixes_tracked_width() {
    let insns = method(vec![
        vec![snap_of_width(2, &[&x_int()])],
        nops(2),
        vec![snap_of_width(4, &[&x_int(), &v3_int()])],
        nops(2),
        vec![snap_of_width(4, &[&x_int()])],
        nops(2),
    ]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(spans(&list), vec![(1, "x", 0, 6)]);
    assert!(list.iter().all(|e| e.register() != 3));
}

#[test]
fn narrower_snapshot_ends_bindings_above_its_width() {
    let insns = method(vec![
        vec![snap_of_width(4, &[&x_int(), &v3_int()])],
        nops(2),
        vec![snap_of_width(2, &[&x_int()])],
        nops(2),
    ]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(spans(&list), vec![(1, "x", 0, 4), (3, "high", 0, 2)]);
}

#[test]
fn start_before_any_snapshot_is_rejected() {
    let insns = method(vec![vec![InsnKind::LocalStart(x_int())], nops(2)]);
    let e = LocalList::make(&insns).unwrap_err();
    assert_eq!(e.kind(), DexErrorKind::IllegalState);
}

#[test]
fn start_without_local_metadata_is_rejected() {
    let anonymous = RegisterSpec::new(1, Type::intern("I").unwrap(), None);
    let insns = method(vec![vec![snap(&[]), InsnKind::LocalStart(anonymous)], nops(2)]);
    let e = LocalList::make(&insns).unwrap_err();
    assert_eq!(e.kind(), DexErrorKind::NullReference);
}

#[test]
fn start_past_tracked_registers_is_rejected() {
    let far = RegisterSpec::local(9, "I", "far").unwrap();
    let insns = method(vec![vec![snap(&[]), InsnKind::LocalStart(far)], nops(2)]);
    let e = LocalList::make(&insns).unwrap_err();
    assert_eq!(e.kind(), DexErrorKind::IllegalArgument);
}

#[test]
fn signatures_and_display() {
    let list_spec = RegisterSpec::new(
        0,
        Type::intern("Ljava/util/List;").unwrap(),
        Some(LocalItem::new(Some("names"), Some("Ljava/util/List<Ljava/lang/String;>;"))),
    );
    let insns = method(vec![vec![snap(&[&list_spec, &x_int()])], nops(2)]);
    let list = LocalList::make(&insns).unwrap();
    assert_eq!(
        list.to_string(),
        "  [0] 0000..0002 v0 names:Ljava/util/List; \"Ljava/util/List<Ljava/lang/String;>;\"\n  [1] 0000..0002 v1 x:I\n"
    );
}
