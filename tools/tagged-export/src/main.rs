//! tagged-export - tagged block format tool
//!
//! Converts text scene descriptions to binary buffers, dumps buffers as a
//! block tree, and builds every model listed in a tagged.toml manifest.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use tagged_export::{convert, manifest};

#[derive(Parser)]
#[command(name = "tagged-export")]
#[command(about = "Tagged block format tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a text description to a binary buffer
    Convert {
        /// Input text description
        input: PathBuf,

        /// Output file (default: input with .tmf extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Header magic (default: 42)
        #[arg(long)]
        magic: Option<u32>,
    },

    /// Print the block tree of a binary buffer
    Dump {
        /// Input binary file
        input: PathBuf,
    },

    /// Build models from a manifest file
    Build {
        /// Path to tagged.toml manifest
        #[arg(default_value = manifest::MANIFEST_NAME)]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate manifest without building
    Check {
        /// Path to tagged.toml manifest
        #[arg(default_value = manifest::MANIFEST_NAME)]
        manifest: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            magic,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension(manifest::OUTPUT_EXT));
            tracing::info!("Converting {:?} -> {:?}", input, output);
            convert::convert_file(&input, &output, magic)?;
            tracing::info!("Done!");
        }

        Commands::Dump { input } => {
            print!("{}", convert::dump_file(&input)?);
        }

        Commands::Build {
            manifest,
            output,
            verbose,
        } => {
            if verbose {
                tracing::info!("Building models from {:?}", manifest);
            }
            let config = manifest::load_manifest(&manifest)?;
            manifest::build_all(&config, base_dir(&manifest), output.as_deref())?;
            tracing::info!("Build complete!");
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config, base_dir(&manifest))
                .with_context(|| format!("{} is invalid", manifest.display()))?;
            tracing::info!("Manifest is valid!");
        }
    }

    Ok(())
}

/// Directory manifest paths are relative to.
fn base_dir(manifest: &Path) -> &Path {
    manifest
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}
