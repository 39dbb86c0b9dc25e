//! Dependency hoisting engine.
//!
//! Takes a fully resolved dependency graph (package instances addressed by
//! index, node 0 being the workspace root) and computes the shallowest
//! position each dependency can occupy without changing what any package
//! resolves by name, breaking peer dependencies, or looping on cycles.
//!
//! ```
//! use hoister::package::{DependencyNode, PackageInfo};
//!
//! let tree = vec![
//!     DependencyNode::with_deps([1]),
//!     DependencyNode::with_deps([2]),
//!     DependencyNode::new(),
//! ];
//! let packages = vec![
//!     PackageInfo::new("app"),
//!     PackageInfo::new("webpack"),
//!     PackageInfo::new("watchpack"),
//! ];
//! let hoisted = hoister::hoist(&tree, &packages).unwrap();
//! assert_eq!(hoisted.deps(0).iter().copied().collect::<Vec<_>>(), vec![1, 2]);
//! ```

mod arena;
pub mod engine;
pub mod hoisted;
pub mod input;
pub mod package;
pub mod report;

pub use engine::{hoist, hoist_with_report};
pub use hoisted::HoistedTree;
pub use hoister_util::errors::HoistError;
