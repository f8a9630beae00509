use async_trait::async_trait;
use log::info;
use reqwest::{StatusCode, Url};
use std::collections::HashSet;
use std::marker::PhantomData;

use super::{IdentityKind, IdentityValidator};
use crate::error::{ProbeFailure, ValidationError};
use crate::http::HttpClient;

/// How a package index names its metadata endpoint.
pub trait IndexLookup: Send + Sync {
    const KIND: IdentityKind;

    /// URL probed for `identifier`, or the local rejection of a malformed one.
    fn endpoint(base_url: &str, identifier: &str) -> Result<String, ValidationError>;
}

/// Appends `segments` to `base_url`, each percent-encoded as one path segment.
fn lookup_url(
    kind: IdentityKind,
    base_url: &str,
    identifier: &str,
    segments: &[&str],
) -> Result<String, ValidationError> {
    let invalid = |reason: String| ValidationError::IdentityCheckFailed {
        kind,
        identifiers: vec![identifier.to_string()],
        reason,
    };

    let mut url =
        Url::parse(base_url).map_err(|e| invalid(format!("invalid base URL {}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| invalid(format!("base URL cannot take a path: {}", base_url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

pub struct Pypi;

impl IndexLookup for Pypi {
    const KIND: IdentityKind = IdentityKind::Pypi;

    fn endpoint(base_url: &str, identifier: &str) -> Result<String, ValidationError> {
        lookup_url(Self::KIND, base_url, identifier, &[identifier, "json"])
    }
}

/// Conda identifiers are `channel::package`.
pub struct Conda;

impl IndexLookup for Conda {
    const KIND: IdentityKind = IdentityKind::Conda;

    fn endpoint(base_url: &str, identifier: &str) -> Result<String, ValidationError> {
        match identifier.split_once("::") {
            Some((channel, package)) if !channel.is_empty() && !package.is_empty() => {
                lookup_url(Self::KIND, base_url, identifier, &[channel, package])
            }
            _ => Err(ValidationError::MalformedIdentifier {
                kind: Self::KIND,
                identifier: identifier.to_string(),
                expected: "channel::package",
            }),
        }
    }
}

pub struct Cran;

impl IndexLookup for Cran {
    const KIND: IdentityKind = IdentityKind::Cran;

    fn endpoint(base_url: &str, identifier: &str) -> Result<String, ValidationError> {
        lookup_url(Self::KIND, base_url, identifier, &[identifier])
    }
}

/// Looks packages up on an index with a HEAD probe per identifier.
pub struct PackageIndexValidator<L> {
    client: HttpClient,
    base_url: String,
    validated: HashSet<String>,
    lookup: PhantomData<L>,
}

pub type PypiValidator = PackageIndexValidator<Pypi>;
pub type CondaValidator = PackageIndexValidator<Conda>;
pub type CranValidator = PackageIndexValidator<Cran>;

impl<L: IndexLookup> PackageIndexValidator<L> {
    pub fn new(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            validated: HashSet::new(),
            lookup: PhantomData,
        }
    }

    pub fn is_validated(&self, identifier: &str) -> bool {
        self.validated.contains(identifier)
    }

    #[tracing::instrument(skip(self))]
    async fn validate_one(&mut self, identifier: &str) -> Result<(), ValidationError> {
        if self.validated.contains(identifier) {
            return Ok(());
        }

        let url = L::endpoint(&self.base_url, identifier)?;

        let failure = match self.client.head(&url).await {
            Ok(status) if status.is_success() => None,
            Ok(StatusCode::NOT_FOUND) => {
                return Err(ValidationError::IdentityNotFound {
                    kind: L::KIND,
                    identifier: identifier.to_string(),
                });
            }
            Ok(status) => Some(ProbeFailure::Status(status)),
            Err(e) => Some(ProbeFailure::transport(&e)),
        };

        if let Some(failure) = failure {
            return Err(ValidationError::IdentityCheckFailed {
                kind: L::KIND,
                identifiers: vec![identifier.to_string()],
                reason: failure.to_string(),
            });
        }

        self.validated.insert(identifier.to_string());
        info!("Validated {} package: {}", L::KIND, identifier);
        Ok(())
    }
}

#[async_trait]
impl<L: IndexLookup + 'static> IdentityValidator for PackageIndexValidator<L> {
    fn kind(&self) -> IdentityKind {
        L::KIND
    }

    async fn validate(&mut self, identifiers: &[String]) -> Result<(), ValidationError> {
        for identifier in identifiers {
            self.validate_one(identifier).await?;
        }
        Ok(())
    }
}
