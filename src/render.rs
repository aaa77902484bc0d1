use std::fmt::Write;

use anyhow::Result;
use console::style;

use crate::docs::types::{CombinedReport, Issue, ReviewResult, Severity};

const RULE: &str = "────────────────────────────────────────────────────────────────";
const CELL_WIDTH: usize = 48;

/// Human-readable checklist summary followed by one issue table per file.
pub fn format_report(report: &CombinedReport) -> Result<String> {
    let mut output = String::new();

    writeln!(output)?;
    writeln!(output, "{}", style("Document Checklist").bold())?;
    writeln!(output, "{RULE}")?;
    writeln!(output, "Process:             {}", report.process)?;
    writeln!(output, "Documents uploaded:  {}", report.documents_uploaded)?;
    writeln!(output, "Required documents:  {}", report.required_documents)?;
    if report.missing_documents.is_empty() {
        writeln!(output, "{}", style("No required documents missing.").green())?;
    } else {
        writeln!(output, "{}", style("Missing documents:").red().bold())?;
        for doc_type in &report.missing_documents {
            writeln!(output, "  {} {}", style("✗").red(), doc_type)?;
        }
    }
    writeln!(output)?;

    for result in &report.per_file_results {
        write_result(&mut output, result)?;
    }
    Ok(output)
}

pub fn format_result(result: &ReviewResult) -> Result<String> {
    let mut output = String::new();
    write_result(&mut output, result)?;
    Ok(output)
}

fn write_result(output: &mut String, result: &ReviewResult) -> Result<()> {
    writeln!(output, "{RULE}")?;
    writeln!(
        output,
        "{} ({})",
        style(result.file.display()).bold(),
        result.doc_type
    )?;
    if let Some(reviewed) = &result.reviewed_file {
        writeln!(output, "Annotated copy: {}", reviewed.display())?;
    }
    writeln!(output, "{RULE}")?;

    if result.issues.is_empty() {
        writeln!(output, "{}", style("No issues found.").green())?;
        writeln!(output)?;
        return Ok(());
    }

    writeln!(
        output,
        "{:<4} {:<24} {:<32} {:<8} {:<32} {}",
        "#", "Section", "Issue", "Severity", "Suggestion", "Reference"
    )?;
    for (n, issue) in result.issues.iter().enumerate() {
        write_issue(output, n + 1, issue)?;
    }
    writeln!(output)?;
    Ok(())
}

fn write_issue(output: &mut String, n: usize, issue: &Issue) -> Result<()> {
    if let Some(error) = &issue.error {
        writeln!(output, "{:<4} {}", n, style(error).red())?;
        if let Some(raw) = issue.raw.as_deref().filter(|r| !r.trim().is_empty()) {
            writeln!(output, "     raw: {}", truncate(raw.trim(), CELL_WIDTH * 2))?;
        }
        return Ok(());
    }

    // Pad before styling so ANSI codes don't skew the column.
    let severity = issue.severity.clone().unwrap_or_default();
    let padded = format!("{:<8}", severity.to_string());
    let severity = match severity {
        Severity::High => style(padded).red().bold(),
        Severity::Medium => style(padded).yellow(),
        Severity::Low => style(padded).green(),
        _ => style(padded),
    };
    writeln!(
        output,
        "{:<4} {:<24} {:<32} {} {:<32} {}",
        n,
        truncate(issue.section(), 24),
        truncate(cell(&issue.issue), 32),
        severity,
        truncate(cell(&issue.suggestion), 32),
        truncate(cell(&issue.source_reference), CELL_WIDTH),
    )?;
    Ok(())
}

fn cell(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// Single-line cell text, cut at `width` chars with an ellipsis.
fn truncate(text: &str, width: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= width {
        return flat;
    }
    let mut cut: String = flat.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::docs::types::{DocType, Process};

    fn result(issues: Vec<Issue>) -> ReviewResult {
        ReviewResult {
            file: PathBuf::from("uploads/aoa.docx"),
            doc_type: DocType::ArticlesOfAssociation,
            reviewed_file: Some(PathBuf::from("reviewed/reviewed_aoa.docx")),
            issues,
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("multi\nline  text", 20), "multi line text");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_report_lists_missing_documents() {
        let report = CombinedReport {
            process: Process::CompanyIncorporation,
            documents_uploaded: 1,
            required_documents: 5,
            missing_documents: vec![DocType::UboDeclarationForm],
            per_file_results: vec![result(Vec::new())],
        };
        let text = console::strip_ansi_codes(&format_report(&report).unwrap()).to_string();
        assert!(text.contains("Process:             Company Incorporation"));
        assert!(text.contains("Missing documents:"));
        assert!(text.contains("UBO Declaration Form"));
        assert!(text.contains("uploads/aoa.docx (Articles of Association)"));
        assert!(text.contains("No issues found."));
    }

    #[test]
    fn test_result_table_rows() {
        let issues = vec![
            Issue {
                document_section: Some("Clause 3".to_string()),
                issue: Some("Wrong court".to_string()),
                severity: Some(Severity::High),
                suggestion: Some("Use ADGM Courts".to_string()),
                source_reference: Some("CR 2020".to_string()),
                ..Issue::default()
            },
            Issue::failed("model did not return valid JSON", "nope"),
        ];
        let text = console::strip_ansi_codes(&format_result(&result(issues)).unwrap()).to_string();
        assert!(text.contains("Annotated copy: reviewed/reviewed_aoa.docx"));
        let row = text.lines().find(|l| l.starts_with("1 ")).unwrap();
        assert!(row.contains("Clause 3") && row.contains("High") && row.contains("CR 2020"));
        assert!(text.contains("model did not return valid JSON"));
        assert!(text.contains("raw: nope"));
    }
}
