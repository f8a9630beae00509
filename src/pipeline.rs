//! Validation of a whole registry in one pass.
//!
//! Every package gets every applicable check; failures are recorded in an
//! [`ErrorReport`] and never stop the run. Link and identity caches live in
//! the [`RegistryValidator`], so build a fresh one per run.

use anyhow::Result;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::ValidatorConfig;
use crate::error::ValidationError;
use crate::http::HttpClient;
use crate::identity::{
    CondaValidator, CranValidator, GitHubUserValidator, IdentityValidator, PypiValidator,
};
use crate::links::{LinkCategory, LinkChecker};
use crate::logo::check_image;
use crate::record::{InstallTarget, PackageRecord, discover};
use crate::report::ErrorReport;
use crate::schema::SchemaValidator;

/// Result of validating a registry.
#[derive(Debug)]
pub struct Validation {
    pub report: ErrorReport,
    /// Loaded records in package id order, logo paths resolved.
    pub records: Vec<PackageRecord>,
}

impl Validation {
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }
}

/// Runs every check over every package of a registry.
pub struct RegistryValidator {
    schema: SchemaValidator,
    home_links: LinkChecker,
    documentation_links: LinkChecker,
    tutorial_links: LinkChecker,
    github_users: Box<dyn IdentityValidator>,
    installers: BTreeMap<InstallTarget, Box<dyn IdentityValidator>>,
}

impl RegistryValidator {
    pub fn new(schema: SchemaValidator, config: &ValidatorConfig) -> Result<Self> {
        let client = HttpClient::with_timeout(config.timeout)?;
        let endpoints = &config.endpoints;

        let mut installers: BTreeMap<InstallTarget, Box<dyn IdentityValidator>> = BTreeMap::new();
        installers.insert(
            InstallTarget::Pypi,
            Box::new(PypiValidator::new(client.clone(), &endpoints.pypi)),
        );
        installers.insert(
            InstallTarget::Conda,
            Box::new(CondaValidator::new(client.clone(), &endpoints.conda)),
        );
        installers.insert(
            InstallTarget::Cran,
            Box::new(CranValidator::new(client.clone(), &endpoints.cran)),
        );

        Ok(Self {
            schema,
            home_links: LinkChecker::new(LinkCategory::Home, client.clone()),
            documentation_links: LinkChecker::new(LinkCategory::Documentation, client.clone()),
            tutorial_links: LinkChecker::new(LinkCategory::Tutorials, client.clone()),
            github_users: Box::new(GitHubUserValidator::new(
                client,
                &endpoints.github_graphql,
                config.github_token.clone(),
            )),
            installers,
        })
    }

    /// Replaces the validator used for `contact` logins.
    pub fn with_github_validator(mut self, validator: Box<dyn IdentityValidator>) -> Self {
        self.github_users = validator;
        self
    }

    /// Replaces the validator used for `install.<target>`.
    pub fn with_install_validator(
        mut self,
        target: InstallTarget,
        validator: Box<dyn IdentityValidator>,
    ) -> Self {
        self.installers.insert(target, validator);
        self
    }

    /// Discovers, loads and validates every package under `registry_dir`.
    ///
    /// Only an unreadable registry root is an error; everything wrong with a
    /// package ends up in the report.
    #[tracing::instrument(skip(self))]
    pub async fn validate(&mut self, registry_dir: &Path) -> Result<Validation> {
        let discovered = discover(registry_dir)?;
        info!(
            "Found {} packages in {}",
            discovered.len(),
            registry_dir.display()
        );

        let mut report = ErrorReport::new();
        let mut records = Vec::with_capacity(discovered.len());
        for package in &discovered {
            report.register(&package.id);
            match package.load() {
                Ok(record) => records.push(record),
                Err(err) => report.record(&package.id, err),
            }
        }

        Ok(self.validate_records(records, report).await)
    }

    /// Validates already loaded records, in package id order, on top of `report`.
    pub async fn validate_records(
        &mut self,
        mut records: Vec<PackageRecord>,
        mut report: ErrorReport,
    ) -> Validation {
        records.sort_by(|a, b| a.id().cmp(b.id()));

        // Every login of the run is resolved up front, in as few queries as possible.
        let logins: Vec<String> = records
            .iter()
            .flat_map(PackageRecord::contact)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let github_failure = if logins.is_empty() {
            None
        } else {
            self.github_users.validate(&logins).await.err()
        };

        for record in &mut records {
            info!("Validating {}", record.id());
            report.register(record.id());
            self.validate_record(record, github_failure.as_ref(), &mut report)
                .await;
        }

        Validation { report, records }
    }

    async fn validate_record(
        &mut self,
        record: &mut PackageRecord,
        github_failure: Option<&ValidationError>,
        report: &mut ErrorReport,
    ) {
        let id = record.id().to_string();

        for err in self.schema.validate(record.meta()) {
            report.record(&id, err);
        }

        if let Some(url) = record.project_home() {
            let result = self.home_links.check_and_register(url, &id).await;
            report.record_result(&id, result);
        }
        if let Some(url) = record.documentation_home() {
            let result = self.documentation_links.check_and_register(url, &id).await;
            report.record_result(&id, result);
        }
        if let Some(url) = record.tutorials_home() {
            let result = self.tutorial_links.check_and_register(url, &id).await;
            report.record_result(&id, result);
        }

        let contact = record.contact();
        if let Some(failure) = github_failure
            && !contact.is_empty()
            && failure.concerns_any(&contact)
        {
            report.record(&id, failure.clone());
        }

        for (target, validator) in self.installers.iter_mut() {
            let Some(identifier) = record.install(*target) else {
                continue;
            };
            debug!("{}: checking {} {}", id, validator.kind(), identifier);
            let result = validator.validate(&[identifier.to_string()]).await;
            report.record_result(&id, result);
        }

        if let Some(logo) = record.logo() {
            let path = record.dir().join(logo);
            let path = std::path::absolute(&path).unwrap_or(path);
            report.record_result(&id, check_image(&path));
            record.set_logo(path.to_string_lossy());
        }
    }
}
