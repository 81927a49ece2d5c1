use clap::{Args, Parser, Subcommand, ValueEnum};
use kdrisk_core::Task;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kdrisk")]
#[command(
    author,
    version,
    about = "Kawasaki disease risk prediction: coronary aneurysm and IVIG resistance"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web server
    Serve {
        #[command(flatten)]
        config: ConfigArgs,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Listen address
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Run one prediction from a JSON or YAML file of feature values
    Predict {
        #[command(flatten)]
        config: ConfigArgs,

        /// Task to predict
        #[arg(short, long, value_parser = parse_task)]
        task: Task,

        /// Input file mapping feature names to values
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the feature catalog of a task
    Fields {
        #[command(flatten)]
        config: ConfigArgs,

        /// Task whose catalog to print
        #[arg(short, long, value_parser = parse_task)]
        task: Task,
    },
}

impl Commands {
    pub fn config_args(&self) -> &ConfigArgs {
        match self {
            Self::Serve { config, .. } | Self::Predict { config, .. } | Self::Fields { config, .. } => {
                config
            }
        }
    }
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "kdrisk.yaml", env = "KDRISK_CONFIG")]
    pub config: PathBuf,

    /// Directory holding model and explainer artifacts
    #[arg(short, long, env = "KDRISK_MODELS_DIR")]
    pub models_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn parse_task(s: &str) -> Result<Task, String> {
    s.parse().map_err(|e: kdrisk_core::Error| e.to_string())
}
