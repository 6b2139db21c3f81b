//! undbc - A tool for converting World of Warcraft DBC files
//!
//! Usage:
//!   undbc info <dbd_file> <build>          - Show table schema for a build
//!   undbc stat <dbc_file>                  - Show DBC header statistics
//!   undbc convert <dbc_file> <dbd_file> <build> --plugin <name> [-o file]
//!   undbc batch <dbc_dir> <dbd_dir> <build> --plugin <name> -o <dir> [--filter <glob>]
//!   undbc import <input> <dbd_file> <build> --plugin <name>

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use undbc::dbc::utils::{batch_convert, convert_dbc, import_records, show_info, show_stat};

#[derive(Parser)]
#[command(name = "undbc")]
#[command(version = "0.1.0")]
#[command(about = "Convert WoW DBC files to and from editable formats", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show table schema information for a build
    Info {
        /// Path to the .dbd schema file
        dbd_file: PathBuf,
        /// Client build, e.g. 1.12.1.5875
        build: String,
    },
    /// Show DBC header statistics without decoding records
    Stat {
        /// Path to the .dbc file
        dbc_file: PathBuf,
    },
    /// Convert a DBC file using a plugin
    Convert {
        /// Path to the .dbc file
        dbc_file: PathBuf,
        /// Path to the .dbd schema file
        dbd_file: PathBuf,
        /// Client build, e.g. 1.12.1.5875
        build: String,
        /// Output plugin (json, csv)
        #[arg(short, long)]
        plugin: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert every DBC file in a directory
    Batch {
        /// Directory containing .dbc files
        dbc_dir: PathBuf,
        /// Directory containing .dbd schema files
        dbd_dir: PathBuf,
        /// Client build, e.g. 1.12.1.5875
        build: String,
        /// Output plugin (json, csv)
        #[arg(short, long)]
        plugin: String,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        /// Filter pattern (e.g. Spell*.dbc)
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Validate exported data against a schema
    Import {
        /// Input file, or - for stdin
        input: PathBuf,
        /// Path to the .dbd schema file
        dbd_file: PathBuf,
        /// Client build, e.g. 1.12.1.5875
        build: String,
        /// Input plugin (json, csv)
        #[arg(short, long)]
        plugin: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { dbd_file, build } => {
            show_info(&dbd_file, &build)?;
        }
        Commands::Stat { dbc_file } => {
            show_stat(&dbc_file)?;
        }
        Commands::Convert {
            dbc_file,
            dbd_file,
            build,
            plugin,
            output,
        } => {
            convert_dbc(&dbc_file, &dbd_file, &build, &plugin, output.as_deref())?;
        }
        Commands::Batch {
            dbc_dir,
            dbd_dir,
            build,
            plugin,
            output,
            filter,
        } => {
            batch_convert(&dbc_dir, &dbd_dir, &build, &plugin, &output, filter.as_deref())?;
        }
        Commands::Import {
            input,
            dbd_file,
            build,
            plugin,
        } => {
            import_records(Some(&input), &dbd_file, &build, &plugin)?;
        }
    }

    Ok(())
}
