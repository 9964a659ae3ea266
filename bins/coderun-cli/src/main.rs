mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "coderun-cli")]
#[command(about = "coderun CLI - Run and grade code through the configured judge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a source file, optionally grading it against test cases
    Run {
        /// Language name (python, javascript, java, go, cpp)
        #[arg(short, long)]
        language: String,

        /// Source file to execute
        #[arg(short, long)]
        file: PathBuf,

        /// Standard input for a single run
        #[arg(short, long)]
        stdin: Option<String>,

        /// JSON file with an array of {input, expected_output, description?}
        #[arg(short, long)]
        tests: Option<PathBuf>,

        /// Print the raw response as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List supported languages
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            language,
            file,
            stdin,
            tests,
            json,
        } => {
            let passed = commands::run(
                &language,
                &file,
                stdin.as_deref(),
                tests.as_deref(),
                json,
            )
            .await?;

            if !passed {
                std::process::exit(1);
            }
        }
        Commands::Languages => commands::list_languages(),
    }

    Ok(())
}
