mod index;
mod review;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Settings;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the reference index from the corpus directory
    Index,
    /// Review every upload, check completeness and write the combined report
    Review {
        /// Replace the upload directory contents with these files first
        #[arg(long, num_args = 1..)]
        stage: Vec<PathBuf>,
    },
    /// Review one document and print its issues
    ReviewFile {
        /// Path to a .docx or .pdf file
        path: PathBuf,
    },
}

pub async fn execute(settings: Settings, command: Command) -> Result<()> {
    match command {
        Command::Index => index::run(&settings).await,
        Command::Review { stage } => review::run(settings, &stage).await,
        Command::ReviewFile { path } => review::run_file(settings, &path).await,
    }
}
