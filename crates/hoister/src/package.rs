//! Package metadata and input dependency nodes.

use std::collections::BTreeSet;
use std::fmt;

use hoister_util::errors::HoistError;
use serde::{Deserialize, Serialize};

/// Index of one package instance in the tree and package arrays.
pub type PackageId = usize;

/// The workspace root. It is never relocated.
pub const ROOT: PackageId = 0;

/// Name and priority of one package instance.
///
/// Several instances may share a name (different versions of one package).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    /// Slot conflicts are won by the strictly heavier instance.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

pub(crate) fn default_weight() -> u32 {
    1
}

impl PackageInfo {
    /// A package with the default weight of 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: default_weight(),
        }
    }

    pub fn weighted(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (weight {})", self.name, self.weight)
    }
}

/// Outgoing edges of one package instance before hoisting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DependencyNode {
    /// Owned dependencies; these are the edges hoisting relocates.
    #[serde(default)]
    pub deps: BTreeSet<PackageId>,
    /// Instances this node must resolve by upward search, never owned.
    #[serde(default)]
    pub peer_deps: BTreeSet<PackageId>,
}

impl DependencyNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deps(deps: impl IntoIterator<Item = PackageId>) -> Self {
        Self {
            deps: deps.into_iter().collect(),
            peer_deps: BTreeSet::new(),
        }
    }

    /// Adds peer dependencies to this node.
    pub fn with_peer_deps(mut self, peers: impl IntoIterator<Item = PackageId>) -> Self {
        self.peer_deps.extend(peers);
        self
    }
}

/// The two kinds of edge a dependency node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Dependency,
    PeerDependency,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Dependency => "dependency",
            EdgeKind::PeerDependency => "peer dependency",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that `tree` and `packages` describe the same id space and that every
/// edge points inside it.
///
/// Nodes are checked in index order, regular dependencies before peer
/// dependencies, so the first offending edge is reported.
pub fn validate(tree: &[DependencyNode], packages: &[PackageInfo]) -> Result<(), HoistError> {
    if tree.len() != packages.len() {
        return Err(HoistError::LengthMismatch {
            tree: tree.len(),
            packages: packages.len(),
        });
    }

    let len = tree.len();
    for (node, entry) in tree.iter().enumerate() {
        let edges = entry
            .deps
            .iter()
            .map(|&target| (target, EdgeKind::Dependency))
            .chain(
                entry
                    .peer_deps
                    .iter()
                    .map(|&target| (target, EdgeKind::PeerDependency)),
            );
        for (target, kind) in edges {
            if target >= len {
                return Err(HoistError::UnknownPackage {
                    node,
                    target,
                    kind: kind.as_str(),
                    len,
                });
            }
        }
    }
    Ok(())
}
