//! tftag cli interface

use clap::{Parser, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

/// Add tags from a central configuration to Terraform resources
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; tftag ... }
    #[clap(short = 'C', long = "directory")]
    pub directory: Vec<PathBuf>,

    /// Directory containing the Terraform files to tag
    #[clap(short = 'd', long = "dir", default_value = ".")]
    pub dir: PathBuf,

    /// Tag configuration [default: .tftag.hcl]
    #[clap(long = "config")]
    pub config: Option<PathBuf>,

    /// Show what would be tagged without writing any file
    #[clap(long = "dry-run")]
    pub dry_run: bool,

    /// Print a report of every resource block to stdout
    #[arg(short = 'F', long = "output-format")]
    pub format: Option<OutputFormat>,

    /// Log at debug level (TFTAG_LOG takes precedence)
    #[clap(long = "debug")]
    pub debug: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
