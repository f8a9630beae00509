//! Runtime configuration of the validators.

use std::time::Duration;

use crate::http::DEFAULT_TIMEOUT;

pub const DEFAULT_GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
pub const DEFAULT_PYPI_URL: &str = "https://pypi.org/pypi";
pub const DEFAULT_CONDA_URL: &str = "https://api.anaconda.org/package";
pub const DEFAULT_CRAN_URL: &str = "https://crandb.r-pkg.org";

/// Base URLs of the external services queried during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub github_graphql: String,
    pub pypi: String,
    pub conda: String,
    pub cran: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            github_graphql: DEFAULT_GITHUB_GRAPHQL_URL.to_string(),
            pypi: DEFAULT_PYPI_URL.to_string(),
            conda: DEFAULT_CONDA_URL.to_string(),
            cran: DEFAULT_CRAN_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Points every service at `base_url`, under `/graphql`, `/pypi`,
    /// `/conda` and `/cran`. Used for mirrors and local fakes.
    pub fn all_at(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            github_graphql: format!("{}/graphql", base_url),
            pypi: format!("{}/pypi", base_url),
            conda: format!("{}/conda", base_url),
            cran: format!("{}/cran", base_url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Bearer token for the GitHub API, if any.
    pub github_token: Option<String>,
    pub endpoints: Endpoints,
    /// Bound on each external call.
    pub timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            endpoints: Endpoints::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.github_graphql, "https://api.github.com/graphql");
        assert_eq!(endpoints.pypi, "https://pypi.org/pypi");
    }

    #[test]
    fn test_all_at_trims_trailing_slash() {
        let endpoints = Endpoints::all_at("http://127.0.0.1:1234/");
        assert_eq!(endpoints.github_graphql, "http://127.0.0.1:1234/graphql");
        assert_eq!(endpoints.cran, "http://127.0.0.1:1234/cran");
    }
}
