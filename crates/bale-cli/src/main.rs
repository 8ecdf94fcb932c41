mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bale",
    about = "Bundle serverless functions and code-deploy revisions"
)]
#[command(version)]
struct Cli {
    /// Project directory containing bale.toml
    #[arg(long, short = 'C', global = true, default_value = ".")]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a tar.gz code-deploy revision bundle
    Revision {
        /// Directory the bundle is written to
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        /// Tag appended to the bundle file name
        #[arg(long, env = "BUILD_TAG")]
        build_tag: Option<String>,
    },
    /// Build a zip function package with vendored dependencies
    Function {
        /// Reuse previously provisioned dependency environments
        #[arg(long)]
        keep: bool,
        /// Path of the zip file to write
        #[arg(long, short = 'o', default_value = "bundle.zip")]
        output: PathBuf,
        /// Do not run pre-bundle scripts
        #[arg(long)]
        skip_prebundle: bool,
    },
    /// Run the configured pre-bundle scripts
    Prebundle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    // Tools run with the project as their working directory, so every path
    // derived from it must be absolute.
    let project_dir = std::fs::canonicalize(&cli.project_dir).map_err(|e| {
        anyhow::anyhow!(
            "project directory {} is not accessible: {e}",
            cli.project_dir.display()
        )
    })?;

    match cli.command {
        Commands::Revision {
            output_dir,
            build_tag,
        } => commands::revision(&project_dir, &output_dir, build_tag)?,
        Commands::Function {
            keep,
            output,
            skip_prebundle,
        } => commands::function(&project_dir, keep, &output, skip_prebundle).await?,
        Commands::Prebundle => commands::prebundle(&project_dir).await?,
    }

    Ok(())
}
