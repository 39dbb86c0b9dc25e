use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all hoisting operations.
///
/// The hoisting algorithm itself never fails on well-formed input, so every
/// variant describes input that was rejected before any work was done.
#[derive(Debug, Error, Diagnostic)]
pub enum HoistError {
    /// The dependency tree and the package metadata disagree on the number of packages.
    #[error("Invalid input: {tree} dependency nodes but {packages} package entries")]
    #[diagnostic(help("Every package id needs exactly one dependency node and one package entry"))]
    LengthMismatch { tree: usize, packages: usize },

    /// An edge points past the end of the package arrays.
    #[error(
        "Invalid input: package {node} has a {kind} on unknown package {target} (only {len} packages)"
    )]
    #[diagnostic(help("Package ids are 0-based indices into the dependency tree"))]
    UnknownPackage {
        node: usize,
        target: usize,
        kind: &'static str,
        len: usize,
    },

    /// A serialized hoisting input could not be parsed.
    #[error("Input error: {message}")]
    #[diagnostic(help("Check the hoisting input for syntax errors"))]
    Input { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type HoistResult<T> = miette::Result<T>;
