use std::path::Path;

#[path = "build/portfolio.rs"]
mod portfolio;
// Share the resolver with the server instead of duplicating it.
#[path = "src/catalog.rs"]
mod catalog;

const STATIC_DIR: &str = "static";
const PORTFOLIO_INDEX_PATH: &str = "static/generated/portfolio-items.json";

fn main() {
    // expose git hash for ETag
    let git_hash = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|out| {
            if out.status.success() {
                String::from_utf8(out.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=GIT_HASH={}", git_hash);

    println!("cargo:rerun-if-changed=build");
    println!("cargo:rerun-if-changed=src/catalog.rs");
    println!("cargo:rerun-if-changed={STATIC_DIR}/images");
    println!("cargo:rerun-if-changed={STATIC_DIR}/videos");

    if is_rust_analyzer() {
        return;
    }

    // Best-effort: a missing or broken media directory must not fail the build.
    let catalog = catalog::Catalog::from_root(STATIC_DIR);
    match portfolio::write_portfolio_index(&catalog, Path::new(PORTFOLIO_INDEX_PATH)) {
        Ok(count) => println!(
            "cargo:warning=generated portfolio index with {count} items at {PORTFOLIO_INDEX_PATH}"
        ),
        Err(err) => println!("cargo:warning=portfolio index not generated: {err:#}"),
    }
}

fn is_rust_analyzer() -> bool {
    std::env::var("RUST_ANALYZER").is_ok()
        || std::env::var("RUST_ANALYZER_INTERNALS_DO_NOT_USE").is_ok()
        || std::env::var("RA_RUNNING").is_ok()
}
