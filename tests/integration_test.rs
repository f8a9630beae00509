use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::{Mock, Server};
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

fn write_package(root: &Path, id: &str, yaml: &str) {
    let dir = root.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("meta.yaml"), yaml).unwrap();
}

fn head(server: &mut Server, path: &str, status: usize) -> Mock {
    server.mock("HEAD", path).with_status(status).create()
}

fn command(server: &Server, registry: &Path) -> Command {
    let url = server.url();
    let mut cmd = Command::new(cargo::cargo_bin!("validate-registry"));
    cmd.env_remove("GITHUB_TOKEN")
        .env_remove("REGISTRY_DIR")
        .env("RUST_LOG", "warn")
        .arg("--registry-dir")
        .arg(registry)
        .arg("--github-api-url")
        .arg(format!("{}/graphql", url))
        .arg("--pypi-url")
        .arg(format!("{}/pypi", url))
        .arg("--conda-url")
        .arg(format!("{}/conda", url))
        .arg("--cran-url")
        .arg(format!("{}/cran", url))
        .arg("--timeout")
        .arg("5");
    cmd
}

#[test]
fn test_end_to_end_outdir() {
    let mut server = Server::new();
    let url = server.url();

    let _home = head(&mut server, "/scanpy", 200);
    let _docs = head(&mut server, "/scanpy/docs", 200);
    let _pypi = head(&mut server, "/pypi/scanpy/json", 200);
    let github = server
        .mock("POST", "/graphql")
        .match_header("authorization", "bearer t0ken")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": {"user0": {"login": "alice"}}}"#)
        .expect(1)
        .create();

    let registry = tempdir().unwrap();
    write_package(
        registry.path(),
        "scanpy",
        &format!(
            "name: Scanpy\n\
             project_home: {url}/scanpy\n\
             documentation_home: {url}/scanpy/docs\n\
             install:\n  pypi: scanpy\n\
             contact:\n  - alice\n\
             logo: icon.svg\n"
        ),
    );
    std::fs::write(registry.path().join("scanpy/icon.svg"), "<svg/>").unwrap();

    let out = tempdir().unwrap();
    let outdir = out.path().join("site");

    command(&server, registry.path())
        .env("GITHUB_TOKEN", "t0ken")
        .arg("--outdir")
        .arg(&outdir)
        .assert()
        .success();

    github.assert();
    assert!(outdir.join("scanpy/icon.svg").exists());
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(outdir.join("packages.json")).unwrap())
            .unwrap();
    assert_eq!(written[0]["name"], "Scanpy");
    assert_eq!(written[0]["logo"], "scanpy/icon.svg");
    assert_eq!(written[0]["install"]["pypi"], "scanpy");
}

#[test]
fn test_preview_prints_records() {
    let mut server = Server::new();
    let url = server.url();
    let _home = head(&mut server, "/anndata", 200);
    let _docs = head(&mut server, "/anndata/docs", 200);

    let registry = tempdir().unwrap();
    write_package(
        registry.path(),
        "anndata",
        &format!("project_home: {url}/anndata\ndocumentation_home: {url}/anndata/docs\n"),
    );

    command(&server, registry.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""project_home": ""#))
        .stdout(predicate::str::contains("/anndata/docs"));
}

#[test]
fn test_failures_are_grouped_by_package() {
    let mut server = Server::new();
    let url = server.url();
    let _good_home = head(&mut server, "/good", 200);
    let _good_docs = head(&mut server, "/good/docs", 200);
    let _bad_home = head(&mut server, "/bad", 404);
    let _bad_docs = head(&mut server, "/bad/docs", 200);
    let _cran = head(&mut server, "/cran/NotThere", 404);

    let registry = tempdir().unwrap();
    write_package(
        registry.path(),
        "good",
        &format!("project_home: {url}/good\ndocumentation_home: {url}/good/docs\n"),
    );
    write_package(
        registry.path(),
        "bad",
        &format!(
            "project_home: {url}/bad\n\
             documentation_home: {url}/bad/docs\n\
             install:\n  cran: NotThere\n\
             logo: missing.png\n"
        ),
    );

    let out = tempdir().unwrap();
    let outdir = out.path().join("site");

    command(&server, registry.path())
        .arg("--outdir")
        .arg(&outdir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad:\n"))
        .stderr(predicate::str::contains("is not reachable (error 404)"))
        .stderr(predicate::str::contains(
            "CRAN package 'NotThere' does not exist",
        ))
        .stderr(predicate::str::contains("Image does not exist"))
        .stderr(predicate::str::contains("good:\n").not());

    assert!(!outdir.exists());
}

#[test]
fn test_missing_registry_dir_fails() {
    let server = Server::new();
    let dir = tempdir().unwrap();

    command(&server, &dir.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Registry directory does not exist",
        ));
}

#[test]
fn test_existing_outdir_is_refused() {
    let mut server = Server::new();
    let url = server.url();
    let _home = head(&mut server, "/anndata", 200);
    let _docs = head(&mut server, "/anndata/docs", 200);

    let registry = tempdir().unwrap();
    write_package(
        registry.path(),
        "anndata",
        &format!("project_home: {url}/anndata\ndocumentation_home: {url}/anndata/docs\n"),
    );

    let out = tempdir().unwrap();
    std::fs::write(out.path().join("stale.txt"), "old").unwrap();

    command(&server, registry.path())
        .arg("--outdir")
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Output directory already exists"));

    assert!(!out.path().join("packages.json").exists());
}
