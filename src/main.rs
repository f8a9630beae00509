use anyhow::{Result, bail};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use validate_registry::config::{
    DEFAULT_CONDA_URL, DEFAULT_CRAN_URL, DEFAULT_GITHUB_GRAPHQL_URL, DEFAULT_PYPI_URL, Endpoints,
    ValidatorConfig,
};
use validate_registry::output::make_output;
use validate_registry::pipeline::RegistryValidator;
use validate_registry::schema::SchemaValidator;

/// validate-registry - package registry validator
///
/// Checks every package descriptor of a registry against the schema, probes
/// its links, confirms its GitHub contacts and install identifiers, and checks
/// its logo. All problems are reported, grouped by package.
///
/// On success the records are written to OUTDIR, or printed when no OUTDIR is
/// given.
///
/// Examples:
///   validate-registry --registry-dir packages --outdir build
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Directory holding one sub-directory per package
    #[arg(
        long = "registry-dir",
        env = "REGISTRY_DIR",
        value_name = "PATH",
        default_value = "packages"
    )]
    registry_dir: PathBuf,

    /// Where to write packages.json and logos (prints to stdout when absent)
    #[arg(long, value_name = "PATH")]
    outdir: Option<PathBuf>,

    /// JSON Schema to use instead of the bundled one
    #[arg(long, value_name = "PATH")]
    schema: Option<PathBuf>,

    /// GitHub token used for the GraphQL API (also via GITHUB_TOKEN)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// GitHub GraphQL endpoint
    #[arg(long, value_name = "URL", default_value = DEFAULT_GITHUB_GRAPHQL_URL)]
    github_api_url: String,

    /// PyPI JSON API base
    #[arg(long, value_name = "URL", default_value = DEFAULT_PYPI_URL)]
    pypi_url: String,

    /// Anaconda package API base
    #[arg(long, value_name = "URL", default_value = DEFAULT_CONDA_URL)]
    conda_url: String,

    /// CRAN metadata API base
    #[arg(long, value_name = "URL", default_value = DEFAULT_CRAN_URL)]
    cran_url: String,

    /// Timeout for each external request, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,
}

impl Cli {
    fn config(&self) -> ValidatorConfig {
        ValidatorConfig {
            github_token: self.github_token.clone().filter(|t| !t.is_empty()),
            endpoints: Endpoints {
                github_graphql: self.github_api_url.clone(),
                pypi: self.pypi_url.clone(),
                conda: self.conda_url.clone(),
                cran: self.cran_url.clone(),
            },
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info,reqwest=warn,hyper=warn"),
    )
    .init();
    let cli = Cli::parse();

    if !cli.registry_dir.is_dir() {
        bail!(
            "Registry directory does not exist: {}",
            cli.registry_dir.display()
        );
    }

    let schema = match &cli.schema {
        Some(path) => SchemaValidator::from_path(path)?,
        None => SchemaValidator::bundled()?,
    };

    let mut validator = RegistryValidator::new(schema, &cli.config())?;
    let validation = validator.validate(&cli.registry_dir).await?;

    if validation.report.is_empty() {
        warn!("No packages found in {}", cli.registry_dir.display());
    }

    if !validation.is_success() {
        error!(
            "Validation failed: {} errors in {} of {} packages",
            validation.report.error_count(),
            validation.report.failures().count(),
            validation.report.len()
        );
        eprint!("{}", validation.report);
        return Ok(ExitCode::FAILURE);
    }

    info!("Validated {} packages", validation.records.len());
    make_output(
        &validation.records,
        cli.outdir.as_deref(),
        std::io::stdout().lock(),
    )?;
    Ok(ExitCode::SUCCESS)
}
