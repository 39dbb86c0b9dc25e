//! Serialized hoisting input, for callers that keep resolved graphs as TOML
//! or JSON documents.
//!
//! ```toml
//! [[package]]
//! name = "app"
//! deps = [1]
//!
//! [[package]]
//! name = "webpack"
//! weight = 3
//! peer-deps = []
//! ```
//!
//! Entry `i` describes package `i`; the first entry is the root.

use std::collections::BTreeSet;

use hoister_util::errors::{HoistError, HoistResult};
use serde::{Deserialize, Serialize};

use crate::hoisted::HoistedTree;
use crate::package::{default_weight, DependencyNode, PackageId, PackageInfo};

/// A whole hoisting problem in one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoistInput {
    #[serde(default)]
    pub package: Vec<PackageEntry>,
}

/// One package instance together with its outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageEntry {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub deps: BTreeSet<PackageId>,
    #[serde(default)]
    pub peer_deps: BTreeSet<PackageId>,
}

impl HoistInput {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> HoistResult<Self> {
        toml::from_str(content).map_err(|e| {
            HoistError::Input {
                message: format!("Failed to parse TOML hoisting input: {e}"),
            }
            .into()
        })
    }

    /// Parse a JSON document.
    pub fn from_json_str(content: &str) -> HoistResult<Self> {
        serde_json::from_str(content).map_err(|e| {
            HoistError::Input {
                message: format!("Failed to parse JSON hoisting input: {e}"),
            }
            .into()
        })
    }

    /// Serialize the input to a pretty-printed TOML string.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Split into the tree and package arrays [`crate::hoist`] takes.
    pub fn split(&self) -> (Vec<DependencyNode>, Vec<PackageInfo>) {
        self.package
            .iter()
            .map(|entry| {
                (
                    DependencyNode {
                        deps: entry.deps.clone(),
                        peer_deps: entry.peer_deps.clone(),
                    },
                    PackageInfo::weighted(entry.name.clone(), entry.weight),
                )
            })
            .unzip()
    }

    pub fn hoist(&self) -> Result<HoistedTree, HoistError> {
        let (tree, packages) = self.split();
        crate::hoist(&tree, &packages)
    }
}
