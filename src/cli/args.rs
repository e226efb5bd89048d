use crate::utils::constants::{DEFAULT_CONFIG_FILE, DEFAULT_ROW_LIMIT};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "climate-warehouse")]
#[command(about = "City temperature star-schema ETL into a Redshift-compatible warehouse")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    #[arg(short, long, help = "City temperature CSV file")]
    pub temperature: PathBuf,

    #[arg(short, long, help = "US city demographics CSV file (';' separated)")]
    pub demographics: PathBuf,

    #[arg(short, long, default_value = "output", help = "Output root for the parquet datasets")]
    pub output: PathBuf,

    #[arg(long, default_value_t = DEFAULT_ROW_LIMIT)]
    pub row_limit: usize,

    #[arg(short, long, default_value = "snappy")]
    pub compression: String,
}

#[derive(Args, Debug, Clone)]
pub struct WarehouseArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, help = "INI file with [Redshift] and [S3] sections")]
    pub config: PathBuf,

    #[arg(long, help = "Use an in-process warehouse loading from the local output root")]
    pub dry_run: bool,

    #[arg(long, help = "Run every quality check instead of stopping at the first failure")]
    pub collect_failures: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transform, write, load and check
    Run {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        warehouse: WarehouseArgs,
    },

    /// Transform and write the parquet datasets only
    Transform {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Recreate the tables and load existing parquet output
    Load {
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        #[command(flatten)]
        warehouse: WarehouseArgs,
    },

    /// Run the quality checks against the loaded tables
    Check {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        #[arg(long)]
        collect_failures: bool,
    },

    /// Display statistics and sample rows of the parquet output
    Info {
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        #[arg(short, long, default_value = "5")]
        sample: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_arguments() {
        let cli = Cli::parse_from([
            "climate-warehouse",
            "run",
            "--temperature",
            "t.csv",
            "--demographics",
            "d.csv",
            "--dry-run",
            "--row-limit",
            "50",
        ]);

        match cli.command {
            Commands::Run { source, warehouse } => {
                assert_eq!(source.row_limit, 50);
                assert_eq!(source.output, PathBuf::from("output"));
                assert!(warehouse.dry_run);
                assert!(!warehouse.collect_failures);
                assert_eq!(warehouse.config, PathBuf::from(DEFAULT_CONFIG_FILE));
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_global_verbose_after_subcommand() {
        let cli = Cli::parse_from(["climate-warehouse", "info", "-o", "out", "--verbose"]);
        assert!(cli.verbose);
    }
}
