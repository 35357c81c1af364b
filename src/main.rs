use clap::Parser;
use sdistfetch::config::Config;
use sdistfetch::error::Result;
use sdistfetch::{DownloadRequest, PackageDownloader, Pip};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sdistfetch")]
#[command(about = "Download Python source distributions into a directory", long_about = None)]
struct Cli {
    /// Package specifiers, e.g. `requests==1.2.1`
    #[arg(conflicts_with = "requirement", required_unless_present = "requirement")]
    specifiers: Vec<String>,

    /// Read specifiers from a requirements file
    #[arg(short = 'r', long, value_name = "FILE")]
    requirement: Option<PathBuf>,

    /// Download directory (default: from config, else a new temporary directory)
    #[arg(short = 'd', long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// Don't prefer prebuilt binary packages
    #[arg(long, overrides_with = "allow_binary")]
    no_binary: bool,

    /// Allow prebuilt binary packages even if the config avoids them
    #[arg(long, overrides_with = "no_binary")]
    allow_binary: bool,

    /// pip executable to run
    #[arg(long, value_name = "PROGRAM")]
    pip: Option<PathBuf>,

    /// Config file (default: ~/.config/sdistfetch/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() {
    // Logs go to stderr so stdout stays a plain list of paths
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let avoid = avoid_binary(&cli, config.download.avoid_binary);

    let tool = match cli.pip {
        Some(program) => Pip::new(program),
        None => config.build_tool()?,
    };

    let dest = cli.dest.or(config.download.dest);
    let mut downloader = PackageDownloader::new(tool, dest);

    let request = match cli.requirement {
        Some(path) => DownloadRequest::manifest(path),
        None => DownloadRequest::specifiers(cli.specifiers),
    }
    .avoid_binary(avoid);

    for path in downloader.download(&request)? {
        println!("{}", path.display());
    }

    Ok(())
}

/// CLI `--no-binary` / `--allow-binary` win over the config value
const fn avoid_binary(cli: &Cli, configured: bool) -> bool {
    if cli.no_binary {
        true
    } else if cli.allow_binary {
        false
    } else {
        configured
    }
}
