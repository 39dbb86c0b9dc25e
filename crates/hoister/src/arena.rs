//! Working tree the engine mutates while hoisting.
//!
//! Nodes are addressed by [`PackageId`]; edges live in index sets on both
//! ends, so moving a dependency is a re-parent of one entry rather than a
//! pointer rewrite.

use std::collections::BTreeSet;

use petgraph::algo::dominators;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::package::{DependencyNode, PackageId, PackageInfo, ROOT};

/// For each node, the nearest other node every path from the root to it
/// passes through. `None` for the root and for nodes the root cannot reach.
pub(crate) fn immediate_dominators(deps: &[BTreeSet<PackageId>]) -> Vec<Option<PackageId>> {
    if deps.is_empty() {
        return Vec::new();
    }
    let mut graph = DiGraph::<(), ()>::with_capacity(deps.len(), 0);
    let nodes: Vec<NodeIndex> = deps.iter().map(|_| graph.add_node(())).collect();
    for (from, targets) in deps.iter().enumerate() {
        for &to in targets {
            graph.add_edge(nodes[from], nodes[to], ());
        }
    }
    let dominators = dominators::simple_fast(&graph, nodes[ROOT]);
    nodes
        .iter()
        .map(|&node| dominators.immediate_dominator(node).map(NodeIndex::index))
        .collect()
}

/// Whether every path from the root to `node` passes through `dominator`.
/// A node the root reaches dominates itself.
pub(crate) fn dominates(
    idoms: &[Option<PackageId>],
    dominator: PackageId,
    mut node: PackageId,
) -> bool {
    loop {
        if node == dominator {
            return true;
        }
        match idoms[node] {
            Some(up) => node = up,
            None => return false,
        }
    }
}

pub(crate) struct Arena<'a> {
    packages: &'a [PackageInfo],
    deps: Vec<BTreeSet<PackageId>>,
    parents: Vec<BTreeSet<PackageId>>,
    peers: Vec<BTreeSet<PackageId>>,
    peer_dependents: Vec<BTreeSet<PackageId>>,
}

/// Edge state saved before a tentative move.
pub(crate) struct Checkpoint {
    deps: Vec<BTreeSet<PackageId>>,
    parents: Vec<BTreeSet<PackageId>>,
}

impl<'a> Arena<'a> {
    /// Build the arena from validated input.
    pub fn new(tree: &[DependencyNode], packages: &'a [PackageInfo]) -> Self {
        let len = tree.len();
        let mut parents = vec![BTreeSet::new(); len];
        let mut peer_dependents = vec![BTreeSet::new(); len];
        for (node, entry) in tree.iter().enumerate() {
            for &dep in &entry.deps {
                parents[dep].insert(node);
            }
            for &peer in &entry.peer_deps {
                peer_dependents[peer].insert(node);
            }
        }

        Self {
            packages,
            deps: tree.iter().map(|entry| entry.deps.clone()).collect(),
            parents,
            peers: tree.iter().map(|entry| entry.peer_deps.clone()).collect(),
            peer_dependents,
        }
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn name(&self, id: PackageId) -> &str {
        &self.packages[id].name
    }

    pub fn weight(&self, id: PackageId) -> u32 {
        self.packages[id].weight
    }

    pub fn deps(&self, id: PackageId) -> &BTreeSet<PackageId> {
        &self.deps[id]
    }

    pub fn peers(&self, id: PackageId) -> &BTreeSet<PackageId> {
        &self.peers[id]
    }

    pub fn peer_dependents(&self, id: PackageId) -> &BTreeSet<PackageId> {
        &self.peer_dependents[id]
    }

    pub fn has_peers(&self) -> bool {
        self.peers.iter().any(|peers| !peers.is_empty())
    }

    pub fn idoms(&self) -> Vec<Option<PackageId>> {
        immediate_dominators(&self.deps)
    }

    /// The node a dependency of `node` climbs to: the nearest node every
    /// path from the root to `node` passes through. For a node with a single
    /// holder that is the holder itself; self edges and back edges of cycles
    /// do not count. `None` for the root and unreachable nodes.
    pub fn parent_of(&self, node: PackageId) -> Option<PackageId> {
        self.idoms()[node]
    }

    /// `node` followed by its parent chain up to the root.
    pub fn ancestors(&self, node: PackageId) -> Vec<PackageId> {
        let idoms = self.idoms();
        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = idoms[current] {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Nodes on some path from `parent` down to `node`, both excluded. Empty
    /// unless `node` is held by several packages below `parent`.
    pub fn between(&self, node: PackageId, parent: PackageId) -> BTreeSet<PackageId> {
        let idoms = self.idoms();
        let mut seen = BTreeSet::from([node, parent]);
        let mut found = BTreeSet::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            for &holder in &self.parents[current] {
                if !seen.insert(holder)
                    || dominates(&idoms, node, holder)
                    || !dominates(&idoms, parent, holder)
                {
                    continue;
                }
                found.insert(holder);
                stack.push(holder);
            }
        }
        found
    }

    /// Whether `to` can be reached from `from` along dependency edges.
    /// A node always reaches itself.
    pub fn reaches(&self, from: PackageId, to: PackageId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = vec![false; self.len()];
        let mut stack = vec![from];
        visited[from] = true;
        while let Some(current) = stack.pop() {
            for &dep in &self.deps[current] {
                if dep == to {
                    return true;
                }
                if !visited[dep] {
                    visited[dep] = true;
                    stack.push(dep);
                }
            }
        }
        false
    }

    /// The direct dependency of `node` named `name`.
    pub fn slot(&self, node: PackageId, name: &str) -> Option<PackageId> {
        self.deps[node]
            .iter()
            .copied()
            .find(|&dep| self.name(dep) == name)
    }

    /// What a package placed directly under `node` gets when it asks for
    /// `name`: the nearest match among the dependencies of `node` and then
    /// of each of its ancestors.
    pub fn resolve(&self, node: PackageId, name: &str) -> Option<PackageId> {
        self.resolve_with(&self.idoms(), node, name)
    }

    fn resolve_with(
        &self,
        idoms: &[Option<PackageId>],
        node: PackageId,
        name: &str,
    ) -> Option<PackageId> {
        let mut current = Some(node);
        while let Some(holder) = current {
            if let Some(found) = self.slot(holder, name) {
                return Some(found);
            }
            current = idoms[holder];
        }
        None
    }

    /// Every `(dependent, peer)` pair whose peer dependency currently
    /// resolves to the intended package.
    pub fn peer_bindings(&self, idoms: &[Option<PackageId>]) -> BTreeSet<(PackageId, PackageId)> {
        let mut bindings = BTreeSet::new();
        for (dependent, peers) in self.peers.iter().enumerate() {
            let Some(parent) = idoms[dependent] else {
                continue;
            };
            for &peer in peers {
                if peer != dependent
                    && self.resolve_with(idoms, parent, self.name(peer)) == Some(peer)
                {
                    bindings.insert((dependent, peer));
                }
            }
        }
        bindings
    }

    /// Whether some holder of `package` other than `ancestor` itself sits on
    /// every path from the root to `ancestor`.
    pub fn held_above(
        &self,
        idoms: &[Option<PackageId>],
        package: PackageId,
        ancestor: PackageId,
    ) -> bool {
        self.parents[package]
            .iter()
            .any(|&holder| holder != ancestor && dominates(idoms, holder, ancestor))
    }

    /// Move `child` from `from`'s dependencies into `to`'s. When `to` already
    /// holds `child` the edge from `from` simply disappears.
    pub fn relocate(&mut self, child: PackageId, from: PackageId, to: PackageId) {
        self.deps[from].remove(&child);
        self.parents[child].remove(&from);
        self.deps[to].insert(child);
        self.parents[child].insert(to);
    }

    /// Exchange `winner` (under `lower`) with `loser` (under `upper`) in one
    /// step, so `upper` never holds both names at once.
    pub fn swap(
        &mut self,
        winner: PackageId,
        loser: PackageId,
        lower: PackageId,
        upper: PackageId,
    ) {
        self.deps[lower].remove(&winner);
        self.parents[winner].remove(&lower);
        self.deps[upper].remove(&loser);
        self.parents[loser].remove(&upper);

        self.deps[upper].insert(winner);
        self.parents[winner].insert(upper);
        self.deps[lower].insert(loser);
        self.parents[loser].insert(lower);
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            deps: self.deps.clone(),
            parents: self.parents.clone(),
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.deps = checkpoint.deps;
        self.parents = checkpoint.parents;
    }

    pub fn into_deps(self) -> Vec<BTreeSet<PackageId>> {
        self.deps
    }
}
