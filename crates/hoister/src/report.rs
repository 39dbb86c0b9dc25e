//! What happened during hoisting, for callers that want to warn about it.

use std::fmt;

use crate::package::PackageId;

/// A summary of one hoisting run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HoistReport {
    /// Number of full passes over the tree, including the final quiet one.
    pub passes: usize,
    /// False when the pass guard stopped the run before a quiet pass.
    pub converged: bool,
    pub takeovers: Vec<Takeover>,
    pub lineage_blocks: Vec<LineageBlock>,
}

/// A heavier package took a slot from a lighter one with the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Takeover {
    /// The node whose dependency slot changed hands.
    pub at: PackageId,
    pub winner: PackageId,
    /// Pushed down to where the winner used to be.
    pub displaced: PackageId,
    pub displaced_to: PackageId,
}

/// A package that can never rise to `ancestor` or above, because a different
/// package with the same name sits between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageBlock {
    pub package: PackageId,
    pub ancestor: PackageId,
    pub conflicting: PackageId,
}

impl HoistReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.takeovers.is_empty() && self.lineage_blocks.is_empty()
    }

    /// Number of recorded takeovers and lineage blocks.
    pub fn len(&self) -> usize {
        self.takeovers.len() + self.lineage_blocks.len()
    }
}

impl fmt::Display for HoistReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No hoisting conflicts.");
        }
        writeln!(f, "Hoisting conflicts ({}):", self.len())?;
        for t in &self.takeovers {
            writeln!(f, "  {t}")?;
        }
        for b in &self.lineage_blocks {
            writeln!(f, "  {b}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Takeover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} took the slot of #{} under #{} (#{} moved under #{})",
            self.winner, self.displaced, self.at, self.displaced, self.displaced_to
        )
    }
}

impl fmt::Display for LineageBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} cannot rise to #{} past same-named #{}",
            self.package, self.ancestor, self.conflicting
        )
    }
}
