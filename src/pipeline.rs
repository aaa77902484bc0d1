use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::checklist;
use crate::docs::types::{CombinedReport, Issue, ReviewResult};
use crate::docs::{DocumentFormat, UploadedDocument};
use crate::error::ReviewError;
use crate::llm::ReviewModel;
use crate::review;
use crate::state::ReviewContext;

const REVIEWED_PREFIX: &str = "reviewed_";

/// Paragraph an issue should be attached to.
///
/// A model-supplied index wins; otherwise the first paragraph containing
/// `document_section` (case-insensitive), falling back to the first one.
pub fn resolve_paragraph(issue: &Issue, paragraphs: &[String]) -> usize {
    if let Some(index) = issue.paragraph_index {
        return index;
    }
    let section = issue.section().to_lowercase();
    if section.is_empty() {
        return 0;
    }
    paragraphs
        .iter()
        .position(|p| p.to_lowercase().contains(&section))
        .unwrap_or(0)
}

/// Name of the annotated copy written for `path`.
pub fn reviewed_file_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{REVIEWED_PREFIX}{name}")
}

/// Classify, retrieve, analyze and annotate one uploaded document.
pub async fn analyze_single_file<M: ReviewModel>(
    ctx: &ReviewContext<M>,
    path: &Path,
    output_dir: &Path,
) -> Result<ReviewResult> {
    let mut document = UploadedDocument::load(path)?;
    let doc_type = checklist::classify(&document.raw_text);
    info!(file = %path.display(), %doc_type, paragraphs = document.paragraphs.len(), "document loaded");

    let context = ctx.retrieve(&document.raw_text, ctx.settings.top_k).await?;
    let mut issues = review::analyze(
        &ctx.model,
        &ctx.settings.jurisdiction,
        &context,
        &document.raw_text,
    )
    .await;

    let reviewed_file = match document.editable.as_mut() {
        Some(docx) => {
            for issue in &mut issues {
                let index = resolve_paragraph(issue, &document.paragraphs);
                issue.paragraph_index = Some(index);
                if let Err(e) = docx.annotate(index, issue.annotation()) {
                    warn!(file = %path.display(), index, error = %e, "annotation skipped");
                }
            }

            std::fs::create_dir_all(output_dir)
                .with_context(|| format!("Failed to create {}", output_dir.display()))?;
            let dest = output_dir.join(reviewed_file_name(path));
            docx.save(&dest)?;
            debug!(dest = %dest.display(), "annotated copy saved");
            Some(dest)
        }
        None => None,
    };

    info!(file = %path.display(), issues = issues.len(), "document reviewed");
    Ok(ReviewResult {
        file: path.to_path_buf(),
        doc_type,
        reviewed_file,
        issues,
    })
}

/// Reviewable uploads directly inside `dir`, sorted by file name.
fn collect_uploads(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && DocumentFormat::from_path(p).is_some_and(DocumentFormat::is_reviewable)
        })
        .collect();
    files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(files)
}

/// Review every upload, run the checklist and write the combined report.
pub async fn analyze_uploads_folder<M: ReviewModel>(
    ctx: &ReviewContext<M>,
    uploads_dir: &Path,
    reviewed_dir: &Path,
    report_path: &Path,
) -> Result<CombinedReport> {
    let files = collect_uploads(uploads_dir)?;
    if files.is_empty() {
        return Err(ReviewError::NoDocuments(uploads_dir.to_path_buf()).into());
    }
    info!(count = files.len(), dir = %uploads_dir.display(), "reviewing uploads");

    let mut per_file_results = Vec::with_capacity(files.len());
    for path in &files {
        per_file_results.push(analyze_single_file(ctx, path, reviewed_dir).await?);
    }

    let uploaded: Vec<_> = per_file_results.iter().map(|r| r.doc_type).collect();
    let process = checklist::detect_process(&uploaded);
    let missing_documents = checklist::missing_documents(process, &uploaded);
    let report = CombinedReport {
        process,
        documents_uploaded: per_file_results.len(),
        required_documents: checklist::required_documents(process).len(),
        missing_documents,
        per_file_results,
    };

    if let Some(parent) = report_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    std::fs::write(report_path, json)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    info!(
        %process,
        uploaded = report.documents_uploaded,
        missing = report.missing_documents.len(),
        report = %report_path.display(),
        "combined report written"
    );
    Ok(report)
}

/// Replace the contents of the upload directory with `files`.
///
/// Every input is checked before anything is removed. Inputs that already
/// sit in the upload directory are kept in place rather than copied.
pub fn stage_uploads(uploads_dir: &Path, files: &[PathBuf]) -> Result<usize> {
    std::fs::create_dir_all(uploads_dir)
        .with_context(|| format!("Failed to create {}", uploads_dir.display()))?;
    let uploads = uploads_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", uploads_dir.display()))?;

    let mut keep = Vec::new();
    let mut incoming = Vec::new();
    for file in files {
        let source = file
            .canonicalize()
            .with_context(|| format!("Cannot stage {}", file.display()))?;
        if !source.is_file() {
            anyhow::bail!("Cannot stage {}: not a regular file", file.display());
        }
        let name = source
            .file_name()
            .map(|n| n.to_os_string())
            .with_context(|| format!("Not a file path: {}", file.display()))?;
        if source.parent() == Some(uploads.as_path()) {
            keep.push(source);
        } else {
            incoming.push((source, name));
        }
    }

    for entry in std::fs::read_dir(&uploads)
        .with_context(|| format!("Failed to list {}", uploads_dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && !keep.contains(&path) {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }

    for (source, name) in &incoming {
        std::fs::copy(source, uploads.join(name))
            .with_context(|| format!("Failed to stage {}", source.display()))?;
    }
    info!(
        count = files.len(),
        kept = keep.len(),
        dir = %uploads_dir.display(),
        "uploads staged"
    );
    Ok(files.len())
}
