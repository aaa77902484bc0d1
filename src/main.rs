mod checklist;
mod commands;
mod config;
mod docs;
mod embed;
mod error;
mod index;
mod llm;
mod pipeline;
mod render;
mod review;
mod state;

use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, Level};

use commands::Command;
use config::Settings;

/// Corporate document compliance reviewer
#[derive(Parser, Debug)]
#[command(name = "doc-reviewer", version)]
struct Cli {
    /// Reference corpus directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory holding uploaded documents
    #[arg(long, global = true)]
    uploads_dir: Option<PathBuf>,

    /// Output directory for annotated copies
    #[arg(long, global = true)]
    reviewed_dir: Option<PathBuf>,

    /// Output directory for the combined report
    #[arg(long, global = true)]
    reports_dir: Option<PathBuf>,

    /// Vector index file
    #[arg(long, global = true)]
    index_path: Option<PathBuf>,

    /// Chunk texts file
    #[arg(long, global = true)]
    texts_path: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn apply(&mut self, settings: &mut Settings) {
        if let Some(dir) = self.data_dir.take() {
            settings.data_dir = dir;
        }
        if let Some(dir) = self.uploads_dir.take() {
            settings.uploads_dir = dir;
        }
        if let Some(dir) = self.reviewed_dir.take() {
            settings.reviewed_dir = dir;
        }
        if let Some(dir) = self.reports_dir.take() {
            settings.reports_dir = dir;
        }
        if let Some(path) = self.index_path.take() {
            settings.index_path = path;
        }
        if let Some(path) = self.texts_path.take() {
            settings.texts_path = path;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    // Load env
    let _ = dotenv::dotenv();
    let mut settings = Settings::from_env()?;
    cli.apply(&mut settings);
    debug!(
        data_dir = %settings.data_dir.display(),
        uploads_dir = %settings.uploads_dir.display(),
        index_path = %settings.index_path.display(),
        "settings resolved"
    );

    commands::execute(settings, cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_directories() {
        let mut cli = Cli::parse_from([
            "doc-reviewer",
            "review",
            "--uploads-dir",
            "in",
            "--stage",
            "a.docx",
            "b.pdf",
        ]);
        let mut settings = Settings::default();
        cli.apply(&mut settings);

        assert_eq!(settings.uploads_dir, PathBuf::from("in"));
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        match cli.command {
            Command::Review { stage } => assert_eq!(stage.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_review_file_requires_path() {
        assert!(Cli::try_parse_from(["doc-reviewer", "review-file"]).is_err());
        assert!(Cli::try_parse_from(["doc-reviewer", "index", "-v"]).is_ok());
    }
}
