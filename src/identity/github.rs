use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{BTreeSet, HashSet};

use super::{IdentityKind, IdentityValidator};
use crate::error::{ProbeFailure, ValidationError};
use crate::http::HttpClient;

/// Maximum logins resolved by a single GraphQL query.
pub const BATCH_SIZE: usize = 100;

#[derive(Deserialize, Debug)]
struct GraphQlResponse {
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize, Debug)]
struct GraphQlError {
    message: String,
    #[serde(default)]
    path: Vec<Value>,
}

/// Outcome of a failed batch: the logins to blame and what went wrong.
struct BatchFailure {
    blamed: Vec<String>,
    messages: Vec<String>,
}

impl BatchFailure {
    fn whole(batch: &[String], message: String) -> Self {
        Self {
            blamed: batch.to_vec(),
            messages: vec![message],
        }
    }
}

/// Confirms GitHub logins through the GraphQL API, many per request.
pub struct GitHubUserValidator {
    client: HttpClient,
    api_url: String,
    token: Option<String>,
    validated: HashSet<String>,
}

impl GitHubUserValidator {
    pub fn new(client: HttpClient, api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            token,
            validated: HashSet::new(),
        }
    }

    pub fn is_validated(&self, login: &str) -> bool {
        self.validated.contains(login)
    }

    /// Builds one query with an aliased `user` lookup per login.
    fn build_query(batch: &[String]) -> Value {
        let lookups: Vec<String> = batch
            .iter()
            .enumerate()
            .map(|(i, login)| format!("user{}: user(login: {}) {{ login }}", i, json!(login)))
            .collect();
        json!({ "query": format!("query {{ {} }}", lookups.join("\n")) })
    }

    /// Maps a GraphQL error back to the login it was raised for, if its path
    /// starts with one of our `userN` aliases.
    fn blamed_login<'a>(error: &GraphQlError, batch: &'a [String]) -> Option<&'a String> {
        let alias = error.path.first()?.as_str()?;
        let index: usize = alias.strip_prefix("user")?.parse().ok()?;
        batch.get(index)
    }

    #[tracing::instrument(skip(self))]
    async fn query_batch(&self, batch: &[String]) -> Result<(), BatchFailure> {
        let body = Self::build_query(batch);

        let (status, response) = match self
            .client
            .post_json(&self.api_url, self.token.as_deref(), &body)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                return Err(BatchFailure::whole(
                    batch,
                    ProbeFailure::transport(&e).to_string(),
                ));
            }
        };

        let Some(response) = response else {
            return Err(BatchFailure::whole(
                batch,
                ProbeFailure::Status(status).to_string(),
            ));
        };

        let response: GraphQlResponse = serde_json::from_value(response).map_err(|e| {
            BatchFailure::whole(batch, format!("unexpected GraphQL response: {}", e))
        })?;

        if response.errors.is_empty() {
            return Ok(());
        }

        let mut blamed = BTreeSet::new();
        let mut whole_batch = false;
        for error in &response.errors {
            match Self::blamed_login(error, batch) {
                Some(login) => {
                    blamed.insert(login.clone());
                }
                None => whole_batch = true,
            }
        }

        let blamed = if whole_batch {
            batch.to_vec()
        } else {
            blamed.into_iter().collect()
        };

        Err(BatchFailure {
            blamed,
            messages: response.errors.into_iter().map(|e| e.message).collect(),
        })
    }
}

#[async_trait]
impl IdentityValidator for GitHubUserValidator {
    fn kind(&self) -> IdentityKind {
        IdentityKind::GitHubUser
    }

    /// Resolves every login not confirmed yet, [`BATCH_SIZE`] per query.
    ///
    /// A batch whose response carries errors confirms none of its logins. All
    /// failures of the call are folded into one error.
    async fn validate(&mut self, identifiers: &[String]) -> Result<(), ValidationError> {
        let pending: Vec<String> = identifiers
            .iter()
            .filter(|login| !self.validated.contains(*login))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if pending.is_empty() {
            return Ok(());
        }

        let mut blamed = Vec::new();
        let mut messages = Vec::new();

        for batch in pending.chunks(BATCH_SIZE) {
            debug!("Resolving {} GitHub logins", batch.len());
            match self.query_batch(batch).await {
                Ok(()) => {
                    self.validated.extend(batch.iter().cloned());
                    info!("Validated GitHub users: {:?}", batch);
                }
                Err(failure) => {
                    blamed.extend(failure.blamed);
                    messages.extend(failure.messages);
                }
            }
        }

        if messages.is_empty() {
            return Ok(());
        }

        Err(ValidationError::IdentityCheckFailed {
            kind: IdentityKind::GitHubUser,
            identifiers: blamed,
            reason: messages.join("; "),
        })
    }
}
