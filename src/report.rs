//! Per-package accumulation of validation failures.

use log::error;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ValidationError;

/// Maps package id to the ordered failures recorded for it.
///
/// Every validated package has an entry, possibly empty. The run succeeded
/// iff every entry is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorReport {
    entries: BTreeMap<String, Vec<ValidationError>>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `package_id` has an entry, even if nothing fails for it.
    pub fn register(&mut self, package_id: &str) {
        self.entries.entry(package_id.to_string()).or_default();
    }

    /// Appends a failure to the package's list and logs it.
    pub fn record(&mut self, package_id: &str, err: ValidationError) {
        error!("{}: validation error: {}", package_id, err);
        self.entries
            .entry(package_id.to_string())
            .or_default()
            .push(err);
    }

    /// Records the error side of a check, ignoring success.
    pub fn record_result(&mut self, package_id: &str, result: Result<(), ValidationError>) {
        if let Err(err) = result {
            self.record(package_id, err);
        }
    }

    pub fn errors(&self, package_id: &str) -> Option<&[ValidationError]> {
        self.entries.get(package_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no package accumulated any failure.
    pub fn is_success(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    /// Total failures across all packages.
    pub fn error_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// All entries in package id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ValidationError])> {
        self.entries
            .iter()
            .map(|(id, errors)| (id.as_str(), errors.as_slice()))
    }

    /// Entries with at least one failure, in package id order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &[ValidationError])> {
        self.iter().filter(|(_, errors)| !errors.is_empty())
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (package_id, errors) in self.failures() {
            writeln!(f, "{}:", package_id)?;
            for err in errors {
                writeln!(f, "  - {}", err)?;
            }
        }
        Ok(())
    }
}
