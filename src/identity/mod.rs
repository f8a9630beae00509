//! Existence checks for identifiers held by external services.
//!
//! Every service implements [`IdentityValidator`]; the pipeline drives them
//! all the same way.
//!
//! # Structure
//!
//! - `github` - GitHub logins, batched into GraphQL queries
//! - `index` - PyPI, Conda and CRAN package lookups

mod github;
mod index;

use async_trait::async_trait;
use std::fmt;

use crate::error::ValidationError;

pub use github::{BATCH_SIZE, GitHubUserValidator};
pub use index::{
    Conda, CondaValidator, Cran, CranValidator, IndexLookup, PackageIndexValidator, Pypi,
    PypiValidator,
};

/// External system an identifier lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    GitHubUser,
    Pypi,
    Conda,
    Cran,
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKind::GitHubUser => write!(f, "GitHub users"),
            IdentityKind::Pypi => write!(f, "PyPI"),
            IdentityKind::Conda => write!(f, "Conda"),
            IdentityKind::Cran => write!(f, "CRAN"),
        }
    }
}

/// Confirms that identifiers exist in an external system.
///
/// Implementations remember confirmed identifiers for the lifetime of the
/// validator, so repeated lookups cost nothing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityValidator: Send {
    fn kind(&self) -> IdentityKind;

    /// Checks every identifier not confirmed yet.
    async fn validate(&mut self, identifiers: &[String]) -> Result<(), ValidationError>;
}
