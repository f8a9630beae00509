//! Reachability and uniqueness of declared URLs.

use log::{debug, info};
use std::collections::HashSet;
use std::fmt;

use crate::error::{ProbeFailure, ValidationError};
use crate::http::HttpClient;

/// Which descriptor field a URL came from. Each category is deduplicated
/// on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkCategory {
    Home,
    Documentation,
    Tutorials,
}

impl LinkCategory {
    /// Descriptor field holding links of this category.
    pub fn field(&self) -> &'static str {
        match self {
            LinkCategory::Home => "project_home",
            LinkCategory::Documentation => "documentation_home",
            LinkCategory::Tutorials => "tutorials_home",
        }
    }
}

impl fmt::Display for LinkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// Tracks the links of one category confirmed during this run.
pub struct LinkChecker {
    category: LinkCategory,
    client: HttpClient,
    known_links: HashSet<String>,
}

impl LinkChecker {
    pub fn new(category: LinkCategory, client: HttpClient) -> Self {
        Self {
            category,
            client,
            known_links: HashSet::new(),
        }
    }

    pub fn is_known(&self, url: &str) -> bool {
        self.known_links.contains(url)
    }

    /// Rejects `url` if it was already registered, otherwise probes it and
    /// registers it once it answers with a success status.
    ///
    /// URLs are compared verbatim: no case folding, no trailing-slash cleanup.
    #[tracing::instrument(skip(self))]
    pub async fn check_and_register(
        &mut self,
        url: &str,
        package_id: &str,
    ) -> Result<(), ValidationError> {
        if self.known_links.contains(url) {
            return Err(ValidationError::DuplicateLink {
                category: self.category,
                url: url.to_string(),
            });
        }

        let failure = match self.client.head(url).await {
            Ok(status) if status.is_success() => None,
            Ok(status) => Some(ProbeFailure::Status(status)),
            Err(e) => Some(ProbeFailure::transport(&e)),
        };

        if let Some(failure) = failure {
            debug!("{}: {} {} failed: {}", package_id, self.category, url, failure);
            return Err(ValidationError::UnreachableLink {
                category: self.category,
                url: url.to_string(),
                failure,
            });
        }

        self.known_links.insert(url.to_string());
        info!("{}: {} {} is reachable", package_id, self.category, url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use reqwest::{Client, StatusCode};

    fn checker(category: LinkCategory) -> LinkChecker {
        LinkChecker::new(category, HttpClient::new(Client::new()))
    }

    #[tokio::test]
    async fn test_duplicate_link_is_probed_once() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/home", server.url());

        let mock = server
            .mock("HEAD", "/home")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let mut links = checker(LinkCategory::Home);
        assert!(links.check_and_register(&url, "first").await.is_ok());
        let err = links.check_and_register(&url, "second").await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(
            err,
            ValidationError::DuplicateLink {
                category: LinkCategory::Home,
                url: url.clone(),
            }
        );
        assert!(links.is_known(&url));
    }

    #[tokio::test]
    async fn test_unreachable_link_carries_status() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/gone", server.url());

        let mock = server
            .mock("HEAD", "/gone")
            .with_status(404)
            .create_async()
            .await;

        let mut links = checker(LinkCategory::Documentation);
        let err = links.check_and_register(&url, "pkg").await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(
            err,
            ValidationError::UnreachableLink {
                category: LinkCategory::Documentation,
                url: url.clone(),
                failure: ProbeFailure::Status(StatusCode::NOT_FOUND),
            }
        );
        assert!(!links.is_known(&url));
    }

    #[tokio::test]
    async fn test_failed_link_is_probed_again() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/flaky", server.url());

        let mock = server
            .mock("HEAD", "/flaky")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let mut links = checker(LinkCategory::Home);
        let first = links.check_and_register(&url, "a").await.unwrap_err();
        let second = links.check_and_register(&url, "b").await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(first.kind(), ErrorKind::UnreachableLink);
        assert_eq!(second.kind(), ErrorKind::UnreachableLink);
    }

    #[tokio::test]
    async fn test_links_are_case_sensitive() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();

        let lower = server
            .mock("HEAD", "/pkg")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let upper = server
            .mock("HEAD", "/PKG")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let mut links = checker(LinkCategory::Home);
        assert!(links.check_and_register(&format!("{}/pkg", base), "a").await.is_ok());
        assert!(links.check_and_register(&format!("{}/PKG", base), "b").await.is_ok());

        lower.assert_async().await;
        upper.assert_async().await;
    }

    #[tokio::test]
    async fn test_separate_categories_do_not_collide() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/shared", server.url());

        let mock = server
            .mock("HEAD", "/shared")
            .with_status(200)
            .expect(2)
            .create_async()
            .await;

        let mut home = checker(LinkCategory::Home);
        let mut docs = checker(LinkCategory::Documentation);
        assert!(home.check_and_register(&url, "a").await.is_ok());
        assert!(docs.check_and_register(&url, "b").await.is_ok());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transport_failure_is_unreachable() {
        let mut links = checker(LinkCategory::Tutorials);
        let err = links
            .check_and_register("not a url", "pkg")
            .await
            .unwrap_err();

        match err {
            ValidationError::UnreachableLink { failure, .. } => {
                assert!(matches!(failure, ProbeFailure::Transport(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stalled_server_times_out_as_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accepts connections and never answers.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = HttpClient::with_timeout(std::time::Duration::from_millis(200)).unwrap();
        let mut links = LinkChecker::new(LinkCategory::Home, client);
        let url = format!("http://{}/slow", addr);
        let err = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            links.check_and_register(&url, "pkg"),
        )
        .await
        .expect("stalled request was not bounded by the client timeout")
        .unwrap_err();
        server.abort();

        match err {
            ValidationError::UnreachableLink { failure, .. } => {
                assert!(matches!(failure, ProbeFailure::Transport(_)));
                assert!(failure.to_string().contains("timed out"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!links.is_known(&url));
    }
}
