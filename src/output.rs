//! Publishable form of a validated registry.
//!
//! ```text
//! outdir
//!    - packages.json      # all records
//!    - pkg-a/icon.svg     # logos, one directory per package
//!    - pkg-b/icon.png
//! ```

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::OutputConflict;
use crate::record::PackageRecord;

/// Name of the records file inside the output directory.
pub const OUTPUT_FILE: &str = "packages.json";

/// A record ready for publishing, plus the logo to copy along with it.
struct Published {
    meta: Value,
    logo: Option<(PathBuf, PathBuf)>,
}

/// Rewrites a record's logo to `<package-id>/<file-name>`.
fn publish(record: &PackageRecord) -> Result<Published> {
    let mut published = record.clone();
    let logo = match record.logo() {
        Some(logo) => {
            let source = PathBuf::from(logo);
            let file_name = source
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("{}: logo has no file name: {}", record.id(), logo))?;
            let relative = format!("{}/{}", record.id(), file_name);
            published.set_logo(relative.clone());
            Some((source, PathBuf::from(relative)))
        }
        None => None,
    };

    Ok(Published {
        meta: published.into_meta(),
        logo,
    })
}

/// Emits the records.
///
/// Without `outdir` the records are pretty-printed as one JSON array to
/// `preview`. With it, each logo is copied to `<outdir>/<package-id>/` and the
/// records are written to `<outdir>/packages.json`. An existing `outdir` or
/// two packages sharing an asset directory is an [`OutputConflict`], raised
/// before any logo is copied.
#[tracing::instrument(skip(records, preview))]
pub fn make_output<W: Write>(
    records: &[PackageRecord],
    outdir: Option<&Path>,
    mut preview: W,
) -> Result<()> {
    let published = records.iter().map(publish).collect::<Result<Vec<_>>>()?;

    let Some(outdir) = outdir else {
        let metas: Vec<&Value> = published.iter().map(|p| &p.meta).collect();
        serde_json::to_writer_pretty(&mut preview, &metas).context("Failed to write JSON")?;
        writeln!(preview)?;
        return Ok(());
    };

    let logos: Vec<&(PathBuf, PathBuf)> =
        published.iter().filter_map(|p| p.logo.as_ref()).collect();

    let mut asset_dirs = BTreeSet::new();
    for (_, relative) in &logos {
        if let Some(dir) = relative.parent()
            && !asset_dirs.insert(dir)
        {
            return Err(OutputConflict {
                path: outdir.join(dir),
            }
            .into());
        }
    }

    if let Some(parent) = outdir.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    create_output_dir(outdir)?;
    for dir in &asset_dirs {
        create_output_dir(&outdir.join(dir))?;
    }

    for (source, relative) in logos {
        let target = outdir.join(relative);
        std::fs::copy(source, &target).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                source.display(),
                target.display()
            )
        })?;
        debug!("Copied {} to {}", source.display(), target.display());
    }

    let path = outdir.join(OUTPUT_FILE);
    let metas: Vec<&Value> = published.iter().map(|p| &p.meta).collect();
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer(std::io::BufWriter::new(file), &metas)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Wrote {} packages to {}", records.len(), path.display());
    Ok(())
}

/// Creates `dir` itself, refusing one left over from an earlier run.
fn create_output_dir(dir: &Path) -> Result<()> {
    match std::fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(OutputConflict {
            path: dir.to_path_buf(),
        }
        .into()),
        Err(e) => Err(e).with_context(|| format!("Failed to create {}", dir.display())),
    }
}
