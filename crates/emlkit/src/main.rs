//! `emlkit` - inspect, unpack and build EML messages from the command line.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use emlkit::unpack::{UnpackOptions, unpack_raw};
use emlkit_mime::{Config, DEFAULT_CHARSET, FriendlyMessage, MessageBuilder, MimeEngine};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "emlkit", version, about = "Parse, read, unpack and build EML messages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Charset for parts that declare none
    #[arg(long, global = true, default_value = DEFAULT_CHARSET)]
    charset: String,

    /// Only recognize boundary lines that follow a blank line
    #[arg(long, global = true)]
    strict_boundaries: bool,

    /// Verbose logging and structure diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parse tree as JSON
    Parse {
        file: PathBuf,
        /// Stop after the header block
        #[arg(long)]
        headers_only: bool,
    },
    /// Print the read message as JSON
    Read { file: PathBuf },
    /// Write text, HTML and attachments into a directory
    Unpack {
        file: PathBuf,
        dir: PathBuf,
        /// List the files without writing them
        #[arg(long)]
        simulate: bool,
        /// Prefix for every written file name
        #[arg(long, default_value = "")]
        prefix: String,
        /// Also save the parse tree as JSON under this name
        #[arg(long, value_name = "NAME")]
        parsed_json: Option<PathBuf>,
        /// Also save the read message as JSON under this name
        #[arg(long, value_name = "NAME")]
        read_json: Option<PathBuf>,
    },
    /// Build a raw message from a JSON message description
    Build { json: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "emlkit=debug,emlkit_mime=debug"
    } else {
        "emlkit=info,emlkit_mime=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let headers_only = matches!(
        cli.command,
        Commands::Parse {
            headers_only: true,
            ..
        }
    );
    let config = Config::builder()
        .default_charset(cli.charset)
        .lenient_boundary_detection(!cli.strict_boundaries)
        .headers_only(headers_only)
        .verbose_diagnostics(cli.verbose)
        .build();
    let engine = MimeEngine::new(config);

    match cli.command {
        Commands::Parse { file, .. } => {
            let parsed = engine.parse_bytes(&read_file(&file)?)?;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Commands::Read { file } => {
            let message = engine.read_bytes(&read_file(&file)?)?;
            println!("{}", serde_json::to_string_pretty(&message)?);
        }
        Commands::Unpack {
            file,
            dir,
            simulate,
            prefix,
            parsed_json,
            read_json,
        } => {
            let options = UnpackOptions {
                simulate,
                prefix,
                parsed_json,
                read_json,
            };
            let report = unpack_raw(&engine, &read_file(&file)?, &dir, &options)?;
            info!(files = report.files.len(), dir = %dir.display(), "Unpacked message");
            for file in &report.files {
                println!("{}", file.display());
            }
        }
        Commands::Build { json } => {
            let text = String::from_utf8(read_file(&json)?)
                .with_context(|| format!("{} is not UTF-8", json.display()))?;
            let message: FriendlyMessage = serde_json::from_str(&text)
                .with_context(|| format!("Invalid message description in {}", json.display()))?;
            let raw = engine.build(&MessageBuilder::from_message(&message))?;
            print!("{raw}");
        }
    }

    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
