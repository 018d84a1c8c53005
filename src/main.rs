use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use prereq::config::manifest_root;
use prereq::orchestrator::extract_in_background;
use prereq::progress::DownloadBar;
use prereq::{
    compare_versions, run_setup, DownloadTarget, FetchConfig, Fetcher, ProcessEnvironment,
    SetupManifest, SetupStage, UrlSource,
};
use std::cmp::Ordering;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "prereq")]
#[command(about = "Fetch, extract, and check build prerequisites", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a file, trying each URL in order until one succeeds
    Fetch {
        /// Candidate URLs (primary first, then mirrors)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Destination file
        #[arg(short, long)]
        output: PathBuf,

        /// Expected MD5 of the download (hex)
        #[arg(long)]
        md5: Option<String>,
    },

    /// Extract a zip archive into its own directory, skipping existing files
    Extract {
        /// Archive to extract
        archive: PathBuf,

        /// Keep the archive after extraction
        #[arg(long)]
        keep_archive: bool,
    },

    /// Compare two dotted version strings; prints -1, 0 or 1
    Compare { v1: String, v2: String },

    /// Check that the tools listed in the manifest are installed
    Check {
        /// Manifest file (default: $PREREQ_MANIFEST or prereq.json)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Check tools, then fetch and extract the manifest's resources
    Setup {
        /// Manifest file (default: $PREREQ_MANIFEST or prereq.json)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Which stages to run
        #[arg(long, value_enum, default_value_t = StageArg::All)]
        stage: StageArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StageArg {
    All,
    Tools,
    Resources,
}

impl From<StageArg> for SetupStage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::All => SetupStage::All,
            StageArg::Tools => SetupStage::ToolsOnly,
            StageArg::Resources => SetupStage::ResourcesOnly,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("prereq={}", log_level))
        .init();

    if let Err(e) = run(args.command).await {
        error!("{:#}", e);
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    let env = ProcessEnvironment;

    match command {
        Command::Fetch { urls, output, md5 } => {
            let source = if urls.len() == 1 {
                UrlSource::Single(urls[0].clone())
            } else {
                UrlSource::Mirrors(urls)
            };
            let mut target = DownloadTarget::new(source, output);
            if let Some(md5) = md5 {
                target = target.with_md5(md5);
            }

            let fetcher = Fetcher::new(FetchConfig::default())?;
            let bar = DownloadBar::new(&target.display_name());
            match fetcher.fetch(&target, &bar).await {
                Ok(path) => bar.finish(format!("✅ Saved {}", path.display())),
                Err(e) => {
                    bar.abandon("❌ Download failed!");
                    return Err(e.into());
                }
            }
        }
        Command::Extract {
            archive,
            keep_archive,
        } => {
            let name = archive.display().to_string();
            let summary = extract_in_background(archive, !keep_archive, name)
                .await
                .context("extraction failed")?;
            info!(
                "Extracted {} of {} bytes ({} entries skipped)",
                summary.extracted_bytes, summary.total_bytes, summary.skipped_entries
            );
        }
        Command::Compare { v1, v2 } => {
            let result = match compare_versions(&v1, &v2)? {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            };
            println!("{}", result);
        }
        Command::Check { manifest } => {
            let path = SetupManifest::locate(manifest.as_deref(), &env);
            let loaded = SetupManifest::load(&path)
                .with_context(|| format!("reading manifest {}", path.display()))?;
            let fetcher = Fetcher::new(FetchConfig::default())?;
            let report = run_setup(
                &loaded,
                &manifest_root(&path),
                &fetcher,
                SetupStage::ToolsOnly,
                &env,
            )
            .await?;
            for (name, status) in &report.tools {
                println!("{}: {}", name, status);
            }
            if !report.is_satisfied() {
                bail!("some required tools are missing or outdated");
            }
        }
        Command::Setup { manifest, stage } => {
            let path = SetupManifest::locate(manifest.as_deref(), &env);
            let loaded = SetupManifest::load(&path)
                .with_context(|| format!("reading manifest {}", path.display()))?;
            info!("🚀 prereq setup from {}", path.display());

            let fetcher = Fetcher::new(FetchConfig::default())?;
            let report = run_setup(&loaded, &manifest_root(&path), &fetcher, stage.into(), &env)
                .await?;
            if !report.is_satisfied() {
                let missing: Vec<_> = report.unsatisfied_tools().map(|(name, _)| name).collect();
                bail!("these tools need attention: {}", missing.join(", "));
            }
            info!("✅ Setup completed successfully!");
        }
    }

    Ok(())
}
