use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::config::Settings;
use crate::pipeline;
use crate::render;
use crate::state::ReviewContext;

pub async fn run(settings: Settings, stage: &[PathBuf]) -> Result<()> {
    let ctx = ReviewContext::load(settings)?;
    let uploads = ctx.settings.uploads_dir.clone();
    let reviewed = ctx.settings.reviewed_dir.clone();
    let report_path = ctx.settings.report_path();

    if !stage.is_empty() {
        pipeline::stage_uploads(&uploads, stage)?;
    }

    let report = pipeline::analyze_uploads_folder(&ctx, &uploads, &reviewed, &report_path).await?;
    print!("{}", render::format_report(&report)?);
    println!("Report written to {}", report_path.display());

    ctx.shutdown();
    Ok(())
}

pub async fn run_file(settings: Settings, path: &Path) -> Result<()> {
    let ctx = ReviewContext::load(settings)?;
    let reviewed = ctx.settings.reviewed_dir.clone();
    info!(file = %path.display(), "Single file review started");

    let result = pipeline::analyze_single_file(&ctx, path, &reviewed).await?;
    print!("{}", render::format_result(&result)?);

    ctx.shutdown();
    Ok(())
}
