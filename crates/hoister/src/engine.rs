//! Core hoisting algorithm: repeated post-order passes that lift every
//! dependency one level towards the root until a pass moves nothing.
//!
//! A dependency `C` of node `N` climbs to `N`'s parent `G`, the nearest node
//! every path from the root to `N` passes through. For a node with one
//! holder that is the holder itself. The climb happens when all of the
//! following hold:
//!
//! - no different package named like `C` sits at `G`, at `N` or on a path
//!   between them, and no such conflict was seen earlier at `G` or below it;
//! - `G` is not reachable from `C` (no cycle would be closed);
//! - no node between `G` and `N` already holds a different package named
//!   like `C`;
//! - `G` has no dependency named like `C`, or already has `C` itself, or has
//!   a strictly lighter one that can trade places with `C`;
//! - every peer dependency of `C` still resolves to the same package from `G`;
//! - siblings under `N` that peer-depend on `C` can move to `G` alongside it.
//!
//! A move that passes these checks but would change what some other package
//! resolves for a peer dependency, or would lift a package above a
//! same-named package it was originally nested in, is rolled back.

use std::collections::BTreeSet;

use hoister_util::errors::HoistError;
use tracing::{debug, trace, warn};

use crate::arena::{Arena, Checkpoint};
use crate::hoisted::HoistedTree;
use crate::package::{validate, DependencyNode, PackageId, PackageInfo, ROOT};
use crate::report::{HoistReport, LineageBlock, Takeover};

/// Hoist `tree` as far towards the root as the package names allow.
///
/// `tree[i]` and `packages[i]` describe package `i`; package 0 is the root.
/// Returns [`HoistError`] without doing any work when the two slices differ in
/// length or an edge points outside them.
pub fn hoist(tree: &[DependencyNode], packages: &[PackageInfo]) -> Result<HoistedTree, HoistError> {
    hoist_with_report(tree, packages).map(|(hoisted, _)| hoisted)
}

/// Like [`hoist`], also returning what happened along the way.
pub fn hoist_with_report(
    tree: &[DependencyNode],
    packages: &[PackageInfo],
) -> Result<(HoistedTree, HoistReport), HoistError> {
    validate(tree, packages)?;

    let mut hoister = Hoister::new(tree, packages);
    hoister.run();
    Ok(hoister.finish())
}

/// Outcome of offering one dependency a single-level climb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Climb {
    Moved,
    /// The parent already had this exact package; the deeper edge was dropped.
    Merged,
    TookOver,
    Blocked(&'static str),
}

/// How a climbing dependency lands among its new parent's dependencies.
#[derive(Debug, Clone, Copy)]
enum Placement {
    Merge,
    Move,
    Displace(PackageId),
}

struct Hoister<'a> {
    arena: Arena<'a>,
    /// `(package, ancestor)` pairs ruled out for good by a lineage conflict.
    banned: BTreeSet<(PackageId, PackageId)>,
    /// `(package, ancestor)` pairs where `ancestor` shares the package's name
    /// and sat on every path to it in the input.
    nested: Vec<(PackageId, PackageId)>,
    report: HoistReport,
}

impl<'a> Hoister<'a> {
    fn new(tree: &[DependencyNode], packages: &'a [PackageInfo]) -> Self {
        let arena = Arena::new(tree, packages);
        let idoms = arena.idoms();
        let mut nested = Vec::new();
        for package in 0..arena.len() {
            let mut up = idoms[package];
            while let Some(ancestor) = up {
                if arena.name(ancestor) == arena.name(package)
                    && !arena.held_above(&idoms, package, ancestor)
                {
                    nested.push((package, ancestor));
                }
                up = idoms[ancestor];
            }
        }

        Self {
            arena,
            banned: BTreeSet::new(),
            nested,
            report: HoistReport::new(),
        }
    }

    fn run(&mut self) {
        // Every pass leaves a valid layout behind, so stopping early is safe.
        let limit = (self.arena.len() + 1).saturating_pow(2);
        loop {
            self.report.passes += 1;
            let changes = self.pass();
            debug!(pass = self.report.passes, changes, "hoisting pass finished");
            if changes == 0 {
                self.report.converged = true;
                break;
            }
            if self.report.passes >= limit {
                warn!(
                    passes = self.report.passes,
                    "Hoisting did not settle, keeping the current layout"
                );
                break;
            }
        }
    }

    fn finish(self) -> (HoistedTree, HoistReport) {
        (HoistedTree::from(self.arena.into_deps()), self.report)
    }

    fn pass(&mut self) -> usize {
        self.post_order()
            .into_iter()
            .map(|node| self.hoist_children(node))
            .sum()
    }
    /// Nodes reachable from the root, children before parents, siblings in
    /// ascending id order. Each node appears once even when shared or part of
    /// a cycle: a node already on the stack or finished is never re-entered.
    fn post_order(&self) -> Vec<PackageId> {
        let len = self.arena.len();
        let mut order = Vec::with_capacity(len);
        if len == 0 {
            return order;
        }

        let mut visited = vec![false; len];
        visited[ROOT] = true;
        let mut stack = vec![(ROOT, self.children(ROOT))];
        while let Some((node, children)) = stack.last_mut() {
            match children.next() {
                Some(child) => {
                    if !visited[child] {
                        visited[child] = true;
                        let grandchildren = self.children(child);
                        stack.push((child, grandchildren));
                    }
                }
                None => {
                    order.push(*node);
                    stack.pop();
                }
            }
        }
        order
    }

    fn children(&self, node: PackageId) -> std::vec::IntoIter<PackageId> {
        self.arena
            .deps(node)
            .iter()
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Offer each dependency of `node` a climb to `node`'s parent.
    fn hoist_children(&mut self, node: PackageId) -> usize {
        if node == ROOT {
            return 0;
        }

        let mut changes = 0;
        for child in self.children(node) {
            // Already carried off as part of a peer unit.
            if !self.arena.deps(node).contains(&child) {
                continue;
            }
            let Some(parent) = self.arena.parent_of(node) else {
                break;
            };
            match self.climb(child, node, parent) {
                Climb::Blocked(reason) => {
                    trace!(
                        package = child,
                        from = node,
                        to = parent,
                        reason,
                        "dependency stays"
                    );
                }
                outcome => {
                    trace!(
                        package = child,
                        from = node,
                        to = parent,
                        ?outcome,
                        "dependency hoisted"
                    );
                    changes += 1;
                }
            }
        }
        changes
    }

    fn climb(&mut self, child: PackageId, node: PackageId, parent: PackageId) -> Climb {
        if self.banned.contains(&(child, parent)) {
            return Climb::Blocked("same-named package in lineage");
        }
        let between = self.arena.between(node, parent);
        if let Some(conflicting) = self.lineage_conflict(child, node, parent, &between) {
            self.ban(child, parent, conflicting);
            return Climb::Blocked("same-named package in lineage");
        }
        if self.arena.reaches(child, parent) {
            return Climb::Blocked("parent depends on the package");
        }
        if self.shadowed_between(child, &between) {
            return Climb::Blocked("same-named package between node and parent");
        }
        if !self.peers_resolve_from(child, parent) {
            return Climb::Blocked("peer dependency would not resolve");
        }
        let Some(unit) = self.peer_unit(child, node, parent, &between) else {
            return Climb::Blocked("peer dependent cannot follow");
        };

        let placement = match self.arena.slot(parent, self.arena.name(child)) {
            Some(occupant) if occupant == child => Placement::Merge,
            Some(occupant) => {
                if self.arena.weight(child) <= self.arena.weight(occupant) {
                    return Climb::Blocked("slot held by an equal or heavier package");
                }
                if !self.can_displace(occupant, node) {
                    return Climb::Blocked("slot holder cannot be displaced");
                }
                Placement::Displace(occupant)
            }
            None => Placement::Move,
        };

        let guard = self.guard();
        match placement {
            Placement::Displace(occupant) => self.arena.swap(child, occupant, node, parent),
            Placement::Merge | Placement::Move => self.arena.relocate(child, node, parent),
        }
        for &member in &unit {
            self.arena.relocate(member, node, parent);
        }
        if let Some((checkpoint, bindings)) = guard {
            if let Some(reason) = self.disturbed(&bindings) {
                self.arena.restore(checkpoint);
                return Climb::Blocked(reason);
            }
        }

        match placement {
            Placement::Merge => Climb::Merged,
            Placement::Move => Climb::Moved,
            Placement::Displace(occupant) => {
                debug!(
                    winner = child,
                    displaced = occupant,
                    at = parent,
                    name = self.arena.name(child),
                    "heavier package took over slot"
                );
                self.report.takeovers.push(Takeover {
                    at: parent,
                    winner: child,
                    displaced: occupant,
                    displaced_to: node,
                });
                Climb::TookOver
            }
        }
    }

    /// A different package named like `child` at `parent`, at `node` or
    /// between them.
    fn lineage_conflict(
        &self,
        child: PackageId,
        node: PackageId,
        parent: PackageId,
        between: &BTreeSet<PackageId>,
    ) -> Option<PackageId> {
        let name = self.arena.name(child);
        [parent, node]
            .into_iter()
            .chain(between.iter().copied())
            .find(|&ancestor| ancestor != child && self.arena.name(ancestor) == name)
    }

    /// Rule out `child` at `parent` and everything above it.
    fn ban(&mut self, child: PackageId, parent: PackageId, conflicting: PackageId) {
        debug!(
            package = child,
            ancestor = parent,
            conflicting,
            name = self.arena.name(child),
            "lineage conflict, package pinned below ancestor"
        );
        for ancestor in self.arena.ancestors(parent) {
            self.banned.insert((child, ancestor));
        }
        self.report.lineage_blocks.push(LineageBlock {
            package: child,
            ancestor: parent,
            conflicting,
        });
    }

    /// Whether a node between `node` and its parent holds a different package
    /// named like `package`, which `node` would find first after the climb.
    fn shadowed_between(&self, package: PackageId, between: &BTreeSet<PackageId>) -> bool {
        let name = self.arena.name(package);
        between
            .iter()
            .any(|&holder| self.arena.slot(holder, name).is_some_and(|held| held != package))
    }

    /// Whether every peer dependency of `package` would still resolve to the
    /// same package if it sat directly under `target`.
    fn peers_resolve_from(&self, package: PackageId, target: PackageId) -> bool {
        self.arena.peers(package).iter().all(|&peer| {
            peer == package || self.arena.resolve(target, self.arena.name(peer)) == Some(peer)
        })
    }

    /// Siblings under `node` that must move with `child` because they
    /// peer-depend on it, directly or through another such sibling. `None` when
    /// one of them cannot move to `parent`.
    fn peer_unit(
        &self,
        child: PackageId,
        node: PackageId,
        parent: PackageId,
        between: &BTreeSet<PackageId>,
    ) -> Option<Vec<PackageId>> {
        let mut unit = Vec::new();
        let mut seen = BTreeSet::from([child]);
        let mut queue = vec![child];
        while let Some(member) = queue.pop() {
            for &dependent in self.arena.peer_dependents(member) {
                if !self.arena.deps(node).contains(&dependent) || !seen.insert(dependent) {
                    continue;
                }
                if !self.can_follow(dependent, child, node, parent, between) {
                    trace!(package = child, dependent, "peer dependent pins package");
                    return None;
                }
                unit.push(dependent);
                queue.push(dependent);
            }
        }
        Some(unit)
    }

    /// Whether `follower` could climb from `node` to `parent` on its own,
    /// judged on the tree as it is now. Followers never take over slots.
    fn can_follow(
        &self,
        follower: PackageId,
        child: PackageId,
        node: PackageId,
        parent: PackageId,
        between: &BTreeSet<PackageId>,
    ) -> bool {
        let name = self.arena.name(follower);
        name != self.arena.name(child)
            && !self.arena.reaches(follower, parent)
            && !self.banned.contains(&(follower, parent))
            && self.lineage_conflict(follower, node, parent, between).is_none()
            && !self.shadowed_between(follower, between)
            && self
                .arena
                .slot(parent, name)
                .map_or(true, |occupant| occupant == follower)
            && self.peers_resolve_from(follower, parent)
    }

    /// Whether `occupant` may be pushed down under `node` by a takeover.
    fn can_displace(&self, occupant: PackageId, node: PackageId) -> bool {
        self.arena.peer_dependents(occupant).is_empty()
            && self.arena.name(node) != self.arena.name(occupant)
            && !self.arena.reaches(occupant, node)
            && self.peers_resolve_from(occupant, node)
    }

    /// State to compare against after a tentative move, when anything in
    /// the tree can be disturbed by one.
    fn guard(&self) -> Option<(Checkpoint, BTreeSet<(PackageId, PackageId)>)> {
        if self.nested.is_empty() && !self.arena.has_peers() {
            return None;
        }
        let bindings = self.arena.peer_bindings(&self.arena.idoms());
        Some((self.arena.checkpoint(), bindings))
    }

    /// Why the layout after a tentative move is not acceptable, if it is not.
    fn disturbed(&self, bindings: &BTreeSet<(PackageId, PackageId)>) -> Option<&'static str> {
        let idoms = self.arena.idoms();
        if !bindings.is_subset(&self.arena.peer_bindings(&idoms)) {
            return Some("peer dependency elsewhere would resolve differently");
        }
        self.nested
            .iter()
            .any(|&(package, ancestor)| self.arena.held_above(&idoms, package, ancestor))
            .then_some("package would rise above a same-named ancestor")
    }
}
