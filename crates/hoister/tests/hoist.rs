use std::collections::BTreeSet;

use hoister::package::{DependencyNode, PackageId, PackageInfo};
use hoister::{hoist, hoist_with_report, HoistError};
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn node(deps: &[PackageId]) -> DependencyNode {
    DependencyNode::with_deps(deps.iter().copied())
}

fn pkg(name: &str) -> PackageInfo {
    PackageInfo::new(name)
}

fn run(tree: &[DependencyNode], packages: &[PackageInfo]) -> Vec<BTreeSet<PackageId>> {
    init_tracing();
    hoist(tree, packages).unwrap().into_inner()
}

fn layout(expected: &[&[PackageId]]) -> Vec<BTreeSet<PackageId>> {
    expected
        .iter()
        .map(|deps| deps.iter().copied().collect())
        .collect()
}

#[test]
fn test_empty_tree() {
    assert_eq!(run(&[], &[]), layout(&[]));
}

#[test]
fn test_single_root() {
    assert_eq!(run(&[node(&[])], &[pkg("app")]), layout(&[&[]]));
}

#[test]
fn test_basic_hoisting() {
    let tree = vec![node(&[1]), node(&[2]), node(&[])];
    let packages = vec![pkg("app"), pkg("webpack"), pkg("watchpack")];
    assert_eq!(run(&tree, &packages), layout(&[&[1, 2], &[], &[]]));
}

#[test]
fn test_multi_level_climb_in_one_call() {
    // app -> a -> b -> c -> d, all distinct names
    let tree = vec![node(&[1]), node(&[2]), node(&[3]), node(&[4]), node(&[])];
    let packages = vec![pkg("app"), pkg("a"), pkg("b"), pkg("c"), pkg("d")];
    assert_eq!(
        run(&tree, &packages),
        layout(&[&[1, 2, 3, 4], &[], &[], &[], &[]])
    );
}

#[test]
fn test_same_name_at_root_blocks_hoisting() {
    let tree = vec![node(&[1, 3]), node(&[2]), node(&[]), node(&[])];
    let packages = vec![pkg("app"), pkg("webpack"), pkg("watchpack"), pkg("watchpack")];
    assert_eq!(run(&tree, &packages), layout(&[&[1, 3], &[2], &[], &[]]));
}

#[test]
fn test_versions_on_same_path_are_not_hoisted() {
    // . -> A -> B@X -> C -> B@Y; B@Y stays under C despite its weight
    let tree = vec![node(&[1]), node(&[2]), node(&[3]), node(&[4]), node(&[])];
    let packages = vec![
        pkg("."),
        pkg("A"),
        pkg("B"),
        pkg("C"),
        PackageInfo::weighted("B", 100),
    ];
    assert_eq!(
        run(&tree, &packages),
        layout(&[&[1, 2, 3], &[], &[], &[4], &[]])
    );
}

#[test]
fn test_deep_hoisting() {
    let tree = vec![
        node(&[1, 3, 4]),
        node(&[2, 4]),
        node(&[5]),
        node(&[]),
        node(&[]),
        node(&[]),
    ];
    let packages = vec![
        pkg("app"),
        pkg("webpack"),
        pkg("watchpack"),
        pkg("watchpack"),
        pkg("lodash"),
        pkg("lodash"),
    ];
    assert_eq!(
        run(&tree, &packages),
        layout(&[&[1, 3, 4], &[2, 5], &[], &[], &[], &[]])
    );
}

#[test]
fn test_cyclic_dependencies_are_tolerated() {
    let tree = vec![
        node(&[0, 1, 3, 4]),
        node(&[1, 2, 4]),
        node(&[2, 5]),
        node(&[]),
        node(&[]),
        node(&[]),
    ];
    let packages = vec![
        pkg("app"),
        pkg("webpack"),
        pkg("watchpack"),
        pkg("watchpack"),
        pkg("lodash"),
        pkg("lodash"),
    ];
    assert_eq!(
        run(&tree, &packages),
        layout(&[&[0, 1, 3, 4], &[2, 5], &[], &[], &[], &[]])
    );
}

#[test]
fn test_mutual_cycle_terminates() {
    // app -> a -> b -> a; once b sits at the root it finds a there
    let tree = vec![node(&[1]), node(&[2]), node(&[1])];
    let packages = vec![pkg("app"), pkg("a"), pkg("b")];
    let (hoisted, report) = hoist_with_report(&tree, &packages).unwrap();
    assert!(report.converged);
    assert_eq!(hoisted.reachable(), BTreeSet::from([0, 1, 2]));
    assert_eq!(hoisted.into_inner(), layout(&[&[1, 2], &[], &[]]));
}

#[test]
fn test_weight_decides_slot() {
    let tree = vec![
        node(&[1]),
        node(&[2, 3, 5]),
        node(&[4]),
        node(&[]),
        node(&[]),
        node(&[4]),
    ];
    let packages = vec![
        pkg("app"),
        pkg("webpack"),
        pkg("watchpack"),
        PackageInfo::weighted("lodash", 3),
        PackageInfo::weighted("lodash", 1),
        pkg("enhanced-resolve"),
    ];
    assert_eq!(
        run(&tree, &packages),
        layout(&[&[1, 2, 3, 5], &[], &[4], &[], &[], &[4]])
    );
}

#[test]
fn test_peer_dependencies_stay_with_their_provider() {
    // . -> A -> B -p> D@X
    //        -> C -> D@Y
    //        -> D@X
    // A and B keep sharing D@X; C and the heavier D@Y go to the root.
    let tree = vec![
        node(&[1]),
        node(&[2, 3, 4]),
        DependencyNode::new().with_peer_deps([4]),
        node(&[5]),
        node(&[]),
        node(&[]),
    ];
    let packages = vec![
        pkg("."),
        pkg("A"),
        pkg("B"),
        pkg("C"),
        pkg("D"),
        PackageInfo::weighted("D", 100),
    ];
    assert_eq!(
        run(&tree, &packages),
        layout(&[&[1, 3, 5], &[2, 4], &[], &[], &[], &[]])
    );
}

#[test]
fn test_shared_subtree_is_hoisted_once() {
    // app -> {a, b}, a -> c, b -> c, c -> d
    let tree = vec![node(&[1, 2]), node(&[3]), node(&[3]), node(&[4]), node(&[])];
    let packages = vec![pkg("app"), pkg("a"), pkg("b"), pkg("c"), pkg("d")];
    assert_eq!(
        run(&tree, &packages),
        layout(&[&[1, 2, 3, 4], &[], &[], &[], &[]])
    );
}

#[test]
fn test_dependencies_of_pinned_shared_node_still_rise() {
    // app -> {a, b, c'}, a -> c, b -> c, c -> d
    // c cannot reach the root past c', but the unique d can.
    let tree = vec![
        node(&[1, 2, 5]),
        node(&[3]),
        node(&[3]),
        node(&[4]),
        node(&[]),
        node(&[]),
    ];
    let packages = vec![
        pkg("app"),
        pkg("a"),
        pkg("b"),
        pkg("c"),
        pkg("d"),
        pkg("c"),
    ];
    assert_eq!(
        run(&tree, &packages),
        layout(&[&[1, 2, 4, 5], &[3], &[3], &[], &[], &[]])
    );
}

#[test]
fn test_hoisting_does_not_rebind_peer_dependencies() {
    // app -> {A, react, plug'}, A -> {B, plug}, B -> react@2, plug -p> react
    // react@2 must not land in A, where plug would find it instead of react.
    let tree = vec![
        node(&[1, 2, 6]),
        node(&[3, 5]),
        node(&[]),
        node(&[4]),
        node(&[]),
        DependencyNode::new().with_peer_deps([2]),
        node(&[]),
    ];
    let packages = vec![
        pkg("app"),
        pkg("A"),
        pkg("react"),
        pkg("B"),
        pkg("react"),
        pkg("plug"),
        pkg("plug"),
    ];
    let hoisted = hoist(&tree, &packages).unwrap();
    assert_eq!(hoisted.lookup(&packages, 5, "react"), Some(2));
    assert_eq!(
        hoisted.into_inner(),
        layout(&[&[1, 2, 3, 6], &[5], &[], &[4], &[], &[], &[]])
    );
}

#[test]
fn test_unreachable_packages_are_left_alone() {
    let tree = vec![node(&[1]), node(&[]), node(&[3]), node(&[])];
    let packages = vec![pkg("app"), pkg("a"), pkg("orphan"), pkg("b")];
    assert_eq!(run(&tree, &packages), layout(&[&[1], &[], &[3], &[]]));
}

#[test]
fn test_length_mismatch_is_invalid_input() {
    let err = hoist(&[node(&[])], &[]).unwrap_err();
    assert!(matches!(
        err,
        HoistError::LengthMismatch {
            tree: 1,
            packages: 0
        }
    ));
}

#[test]
fn test_render_hoisted_layout() {
    let tree = vec![node(&[1, 3]), node(&[2]), node(&[]), node(&[])];
    let packages = vec![pkg("app"), pkg("webpack"), pkg("watchpack"), pkg("watchpack")];
    let hoisted = hoist(&tree, &packages).unwrap();
    assert_eq!(
        hoisted.render(&packages),
        "app #0\n├── webpack #1\n│   └── watchpack #2\n└── watchpack #3\n"
    );
}
