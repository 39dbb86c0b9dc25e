//! The hoisted layout and ways to inspect it.

use std::collections::BTreeSet;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};

use crate::arena::immediate_dominators;
use crate::package::{PackageId, PackageInfo, ROOT};

/// Direct dependencies of every package after hoisting, indexed by
/// [`PackageId`]. Same length as the input tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoistedTree {
    nodes: Vec<BTreeSet<PackageId>>,
}

impl HoistedTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct dependencies of `id`.
    ///
    /// # Panics
    ///
    /// Panics when `id` is out of range.
    pub fn deps(&self, id: PackageId) -> &BTreeSet<PackageId> {
        &self.nodes[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = (PackageId, &BTreeSet<PackageId>)> {
        self.nodes.iter().enumerate()
    }

    pub fn into_inner(self) -> Vec<BTreeSet<PackageId>> {
        self.nodes
    }

    /// The layout as a petgraph graph whose node weights are package ids.
    /// Node `i` of the graph is package `i`.
    pub fn to_graph(&self) -> DiGraph<PackageId, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), 0);
        for id in 0..self.nodes.len() {
            graph.add_node(id);
        }
        for (id, deps) in self.iter() {
            for &dep in deps {
                graph.add_edge(NodeIndex::new(id), NodeIndex::new(dep), ());
            }
        }
        graph
    }

    /// Every package reachable from the root, the root included.
    pub fn reachable(&self) -> BTreeSet<PackageId> {
        let mut reachable = BTreeSet::new();
        if self.nodes.is_empty() {
            return reachable;
        }
        let graph = self.to_graph();
        let mut dfs = Dfs::new(&graph, NodeIndex::new(ROOT));
        while let Some(idx) = dfs.next(&graph) {
            reachable.insert(graph[idx]);
        }
        reachable
    }

    /// The package `node` finds when it looks up `name` from where it sits,
    /// the way a peer dependency is found: the nearest match held by a node
    /// that every path from the root to `node` passes through.
    pub fn lookup(
        &self,
        packages: &[PackageInfo],
        node: PackageId,
        name: &str,
    ) -> Option<PackageId> {
        let idoms = immediate_dominators(&self.nodes);
        let mut current = idoms.get(node).copied().flatten();
        while let Some(holder) = current {
            let found = self.nodes[holder]
                .iter()
                .copied()
                .find(|&dep| packages.get(dep).is_some_and(|info| info.name == name));
            if found.is_some() {
                return found;
            }
            current = idoms[holder];
        }
        None
    }

    /// Print the layout as an indented tree starting at the root.
    ///
    /// A package that appears again below itself is printed once more
    /// without its dependencies.
    pub fn render(&self, packages: &[PackageInfo]) -> String {
        let mut output = String::new();
        if self.nodes.is_empty() {
            return output;
        }

        output.push_str(&format!("{}\n", label(packages, ROOT)));
        let mut active = BTreeSet::from([ROOT]);
        let deps = &self.nodes[ROOT];
        let count = deps.len();
        for (i, &dep) in deps.iter().enumerate() {
            self.render_subtree(&mut output, packages, dep, "", i == count - 1, &mut active);
        }
        output
    }

    fn render_subtree(
        &self,
        output: &mut String,
        packages: &[PackageInfo],
        id: PackageId,
        prefix: &str,
        is_last: bool,
        active: &mut BTreeSet<PackageId>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", label(packages, id)));

        if !active.insert(id) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = &self.nodes[id];
        let count = deps.len();
        for (i, &dep) in deps.iter().enumerate() {
            self.render_subtree(output, packages, dep, &child_prefix, i == count - 1, active);
        }

        active.remove(&id);
    }
}

fn label(packages: &[PackageInfo], id: PackageId) -> String {
    match packages.get(id) {
        Some(info) => format!("{} #{id}", info.name),
        None => format!("#{id}"),
    }
}

impl From<Vec<BTreeSet<PackageId>>> for HoistedTree {
    fn from(nodes: Vec<BTreeSet<PackageId>>) -> Self {
        Self { nodes }
    }
}
