use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[path = "../../build/portfolio.rs"]
mod portfolio;
#[path = "../catalog.rs"]
mod catalog;

const DEFAULT_ROOT: &str = "static";
const DEFAULT_OUTPUT: &str = "static/generated/portfolio-items.json";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Write { root: PathBuf, output: PathBuf },
}

fn parse_args<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut root = PathBuf::from(DEFAULT_ROOT);
    let mut output = PathBuf::from(DEFAULT_OUTPUT);

    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            _ if arg.starts_with("--root=") => {
                root = PathBuf::from(arg.trim_start_matches("--root="));
            }
            _ if arg.starts_with("--out=") => {
                output = PathBuf::from(arg.trim_start_matches("--out="));
            }
            other => return Err(other.to_string()),
        }
    }
    Ok(Command::Write { root, output })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (root, output) = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Write { root, output }) => (root, output),
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Err(unknown) => {
            eprintln!("Unknown argument: {unknown}");
            print_help();
            std::process::exit(2);
        }
    };

    let catalog = catalog::Catalog::from_root(&root);
    tracing::info!(
        images = %catalog.images_dir().display(),
        videos = %catalog.videos_dir().display(),
        "resolving portfolio items"
    );
    match portfolio::write_portfolio_index(&catalog, &output) {
        Ok(count) => {
            tracing::info!(count, output = %output.display(), "portfolio index written");
            Ok(())
        }
        Err(err) => {
            tracing::error!("portfolio index not written: {err:#}");
            Err(err)
        }
    }
}

fn print_help() {
    println!("Usage: portfolio_index [--root=DIR] [--out=PATH]");
    println!("  pairs DIR/images/p<NN>.jpg with DIR/videos/video-<NN>.mp4 or video-<NN>.txt");
    println!("  and writes the item list as JSON for the front end");
    println!("  --root=DIR : media root (default {DEFAULT_ROOT})");
    println!("  --out=PATH : output file (default {DEFAULT_OUTPUT})");
}
