//! Makerdir CLI - split, compress and publish product photos
//!
//! # Pipeline Commands
//!
//! ```bash
//! makerdir split                    # Spec document + org/ pool -> output tree + manifest.json
//! makerdir compress                 # Resize/recompress every SMALL folder (ICC kept)
//! makerdir upload                   # FTP upload + catalog sync
//! makerdir run                      # All three, in order
//! makerdir serve                    # Start HTTP server (port 3000)
//! ```
//!
//! # Tools
//!
//! ```bash
//! makerdir scan <DIR>               # List a folder in shot order
//! makerdir icc photo.jpg -o p.icc   # Extract an embedded ICC profile
//! makerdir config show              # Print the effective configuration
//! makerdir config init              # Write a config.json template
//! ```

use clap::{Parser, Subcommand};
use makerdir::{
    compress, default_config_path, icc, publish, publish_dry_run, run_split, scan, CompressOptions,
    CompressReport, Config, PlanOutcome, PublishReport, LOG_BROADCASTER,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "makerdir")]
#[command(about = "Split product photos by spec sheet, recompress them and publish to FTP", long_about = None)]
struct Cli {
    /// Config file (default: config.json beside the executable)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split the picture pool into per-item folders following the spec document
    Split,

    /// Resize and recompress images in place
    Compress {
        /// Folders to compress (default: every SMALL folder under the work path)
        dirs: Vec<PathBuf>,

        /// Target width (0 keeps aspect ratio)
        #[arg(long)]
        width: Option<u32>,

        /// Target height (0 keeps aspect ratio)
        #[arg(long)]
        height: Option<u32>,

        /// JPEG quality 1-100
        #[arg(short, long)]
        quality: Option<u8>,
    },

    /// Upload SMALL folders to FTP and sync the catalog API
    Upload {
        /// Upload into memory only; no FTP, no API, manifest untouched
        #[arg(long)]
        dry_run: bool,
    },

    /// Split, compress and upload
    Run,

    /// List a directory in shot order
    Scan {
        /// Directory to list
        dir: PathBuf,
    },

    /// Show or extract the ICC profile of a JPEG
    Icc {
        /// Input JPEG
        input: PathBuf,

        /// Write the profile to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets masked)
    Show,

    /// Write a template config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);

    let result = match cli.command {
        Commands::Split => cmd_split(&config_path),

        Commands::Compress {
            dirs,
            width,
            height,
            quality,
        } => cmd_compress(&config_path, &dirs, width, height, quality),

        Commands::Upload { dry_run } => cmd_upload(&config_path, dry_run).await,

        Commands::Run => cmd_run(&config_path).await,

        Commands::Scan { dir } => cmd_scan(&dir),

        Commands::Icc { input, output } => cmd_icc(&input, output.as_deref()),

        Commands::Serve { port } => cmd_serve(&config_path, port).await,

        Commands::Config { action } => cmd_config(&config_path, action),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    eprintln!("⚙️  Config: {}", path.display());
    Ok(Config::load(path)?)
}

fn cmd_split(config_path: &Path) -> CmdResult {
    let config = load_config(config_path)?;
    let outcome = split_stage(&config)?;

    match outcome.aggregate_error() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn split_stage(config: &Config) -> Result<PlanOutcome, Box<dyn std::error::Error>> {
    eprintln!("✂️  Splitting: {}", config.work_path.display());
    let outcome = run_split(config, &*LOG_BROADCASTER)?;

    eprintln!("\n📊 Split summary");
    eprintln!("   Item folders:     {}", outcome.small_dirs.len());
    eprintln!("   Manifest entries: {}", outcome.manifest.len());
    eprintln!("   Warnings:         {}", outcome.warnings.len());
    Ok(outcome)
}

fn cmd_compress(
    config_path: &Path,
    dirs: &[PathBuf],
    width: Option<u32>,
    height: Option<u32>,
    quality: Option<u8>,
) -> CmdResult {
    let config = load_config(config_path)?;

    let mut options = CompressOptions::from_config(&config);
    options.width = width.unwrap_or(options.width);
    options.height = height.unwrap_or(options.height);
    options.quality = quality.filter(|q| *q > 0).unwrap_or(options.quality);

    compress_stage(dirs, &options);
    Ok(())
}

fn compress_stage(dirs: &[PathBuf], options: &CompressOptions) -> CompressReport {
    eprintln!("🗜️  Compressing...");
    let report = compress(dirs, options, &*LOG_BROADCASTER);

    eprintln!("\n📊 Compress summary");
    eprintln!("   Compressed:    {}", report.compressed.len());
    eprintln!("   ICC preserved: {}", report.profiles_kept);
    eprintln!("   Failed:        {}", report.failures.len());
    report
}

async fn cmd_upload(config_path: &Path, dry_run: bool) -> CmdResult {
    let config = load_config(config_path)?;
    upload_stage(&config, dry_run).await?;
    Ok(())
}

async fn upload_stage(config: &Config, dry_run: bool) -> Result<PublishReport, Box<dyn std::error::Error>> {
    eprintln!("📤 Uploading{}...", if dry_run { " (dry run)" } else { "" });
    let sink = &*LOG_BROADCASTER;
    let report = if dry_run {
        publish_dry_run(config, sink).await?
    } else {
        publish(config, sink).await?
    };

    eprintln!("\n📊 Upload summary");
    eprintln!("   Remote dir:   {}", report.remote_dir);
    eprintln!("   Uploaded:     {}", report.uploaded.len());
    eprintln!("   Failed:       {}", report.failures.len());
    eprintln!("   Catalog rows: {}", report.payload_items);
    eprintln!("   Deleted:      {}", report.deleted.len());
    for path in &report.result_files {
        eprintln!("   💾 {}", path.display());
    }
    Ok(report)
}

async fn cmd_run(config_path: &Path) -> CmdResult {
    let config = load_config(config_path)?;

    let outcome = split_stage(&config)?;
    if outcome.small_dirs.is_empty() {
        return Err("split produced no item folders, nothing to compress".into());
    }

    eprintln!();
    compress_stage(&outcome.small_dirs, &CompressOptions::from_config(&config));

    eprintln!();
    upload_stage(&config, false).await?;

    eprintln!("\n✨ Done!");
    match outcome.aggregate_error() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn cmd_scan(dir: &Path) -> CmdResult {
    eprintln!("📂 Scanning: {}", dir.display());
    let names = scan::scan_dir_sorted(dir)?;

    for name in &names {
        let marker = if scan::is_image_name(name) { "🖼 " } else { "  " };
        println!("{} {}", marker, name);
    }
    eprintln!("   {} entries", names.len());
    Ok(())
}

fn cmd_icc(input: &Path, output: Option<&Path>) -> CmdResult {
    let data = fs::read(input)?;

    match icc::extract(&data)? {
        Some(profile) => {
            eprintln!(
                "🎨 ICC profile: {} bytes in {} APP2 segment(s)",
                profile.len(),
                icc::chunk_count(profile.len())
            );
            if let Some(path) = output {
                fs::write(path, &profile)?;
                eprintln!("💾 Profile written to: {}", path.display());
            }
        }
        None => eprintln!("   No ICC profile in {}", input.display()),
    }
    Ok(())
}

async fn cmd_serve(config_path: &Path, port: u16) -> CmdResult {
    let config = load_config(config_path)?;
    makerdir::server::start_server(config, port).await
}

fn cmd_config(config_path: &Path, action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Show => {
            let mut config = load_config(config_path)?;
            for secret in [&mut config.ftp_password, &mut config.api_key] {
                if !secret.is_empty() {
                    *secret = "********".to_string();
                }
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }

        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                return Err(format!("{} already exists (use --force to overwrite)", config_path.display()).into());
            }
            Config::default().save(config_path)?;
            eprintln!("✅ Config template written to: {}", config_path.display());
        }
    }
    Ok(())
}
