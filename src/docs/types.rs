use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Filing types a compliance batch can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    #[serde(rename = "Articles of Association")]
    ArticlesOfAssociation,
    #[serde(rename = "Memorandum of Association")]
    MemorandumOfAssociation,
    #[serde(rename = "Board Resolution")]
    BoardResolution,
    #[serde(rename = "Shareholder Resolution")]
    ShareholderResolution,
    #[serde(rename = "Incorporation Application Form")]
    IncorporationApplicationForm,
    #[serde(rename = "UBO Declaration Form")]
    UboDeclarationForm,
    #[serde(rename = "Register of Members and Directors")]
    RegisterOfMembersAndDirectors,
    #[serde(rename = "Change of Registered Address Notice")]
    ChangeOfRegisteredAddressNotice,
    #[serde(rename = "Employment Contract")]
    EmploymentContract,
    #[serde(rename = "Data Protection Policy")]
    DataProtectionPolicy,
    Unknown,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArticlesOfAssociation => "Articles of Association",
            Self::MemorandumOfAssociation => "Memorandum of Association",
            Self::BoardResolution => "Board Resolution",
            Self::ShareholderResolution => "Shareholder Resolution",
            Self::IncorporationApplicationForm => "Incorporation Application Form",
            Self::UboDeclarationForm => "UBO Declaration Form",
            Self::RegisterOfMembersAndDirectors => "Register of Members and Directors",
            Self::ChangeOfRegisteredAddressNotice => "Change of Registered Address Notice",
            Self::EmploymentContract => "Employment Contract",
            Self::DataProtectionPolicy => "Data Protection Policy",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business process a batch of filings belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Process {
    #[serde(rename = "Company Incorporation")]
    CompanyIncorporation,
    Unknown,
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompanyIncorporation => f.write_str("Company Incorporation"),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Source metadata kept next to every indexed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub source: String,
    /// blake3 hex of the source file the chunk was cut from.
    #[serde(default)]
    pub source_hash: String,
}

/// A reference excerpt returned by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceChunk {
    pub text: String,
    pub source_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextHit {
    pub chunk: ReferenceChunk,
    /// Squared L2 distance to the query embedding.
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Low,
    Medium,
    High,
    Other(String),
    #[default]
    Unspecified,
}

impl From<String> for Severity {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "" => Self::Unspecified,
            _ => Self::Other(raw),
        }
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => "Low".to_string(),
            Severity::Medium => "Medium".to_string(),
            Severity::High => "High".to_string(),
            Severity::Other(raw) => raw,
            Severity::Unspecified => String::new(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("Low"),
            Self::Medium => f.write_str("Medium"),
            Self::High => f.write_str("High"),
            Self::Other(raw) => f.write_str(raw),
            Self::Unspecified => Ok(()),
        }
    }
}

/// One compliance finding reported by the model.
///
/// Schema fields are only lifted out when they hold a string. Every other
/// key the model sent stays in `extra` verbatim.
/// `error` and `raw` are set on the synthetic record that replaces an
/// unusable model response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct Issue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for Issue {
    fn from(mut extra: Map<String, Value>) -> Self {
        // A non-integer index is dropped; the pipeline back-fills it.
        let paragraph_index = match extra.remove("paragraph_index") {
            Some(v) => v.as_u64().and_then(|n| usize::try_from(n).ok()),
            None => None,
        };
        Self {
            document_section: take_string(&mut extra, "document_section"),
            issue: take_string(&mut extra, "issue"),
            severity: take_string(&mut extra, "severity").map(Severity::from),
            suggestion: take_string(&mut extra, "suggestion"),
            source_reference: take_string(&mut extra, "source_reference"),
            paragraph_index,
            error: take_string(&mut extra, "error"),
            raw: take_string(&mut extra, "raw"),
            extra,
        }
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key)? {
        Value::String(s) => Some(s),
        other => {
            map.insert(key.to_string(), other);
            None
        }
    }
}

impl Issue {
    pub fn failed(error: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            raw: Some(raw.into()),
            ..Self::default()
        }
    }

    pub fn section(&self) -> &str {
        self.document_section.as_deref().unwrap_or("")
    }

    /// Text written into the document next to the flagged paragraph.
    pub fn annotation(&self) -> &str {
        [&self.suggestion, &self.issue, &self.error]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .find(|s| !s.trim().is_empty())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResult {
    pub file: PathBuf,
    pub doc_type: DocType,
    pub reviewed_file: Option<PathBuf>,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedReport {
    pub process: Process,
    pub documents_uploaded: usize,
    pub required_documents: usize,
    pub missing_documents: Vec<DocType>,
    pub per_file_results: Vec<ReviewResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_doc_type_serializes_as_display_name() {
        let json = serde_json::to_string(&DocType::UboDeclarationForm).unwrap();
        assert_eq!(json, "\"UBO Declaration Form\"");
        assert_eq!(DocType::UboDeclarationForm.to_string(), "UBO Declaration Form");
    }

    #[test]
    fn test_severity_case_insensitive() {
        assert_eq!(Severity::from("HIGH".to_string()), Severity::High);
        assert_eq!(Severity::from("medium".to_string()), Severity::Medium);
        assert_eq!(
            Severity::from("Critical".to_string()),
            Severity::Other("Critical".to_string())
        );
        assert_eq!(String::from(Severity::Low), "Low");
    }

    #[test]
    fn test_issue_defaults_missing_fields() {
        let issue: Issue = serde_json::from_str(r#"{"issue": "No signature block"}"#).unwrap();
        assert_eq!(issue.issue.as_deref(), Some("No signature block"));
        assert_eq!(issue.severity, None);
        assert_eq!(issue.paragraph_index, None);
        assert_eq!(
            serde_json::to_string(&issue).unwrap(),
            r#"{"issue":"No signature block"}"#
        );
    }

    #[test]
    fn test_annotation_prefers_suggestion() {
        let issue = Issue {
            issue: Some("Wrong court".to_string()),
            suggestion: Some("Refer to ADGM Courts".to_string()),
            ..Issue::default()
        };
        assert_eq!(issue.annotation(), "Refer to ADGM Courts");

        let issue = Issue {
            issue: Some("Wrong court".to_string()),
            suggestion: Some("  ".to_string()),
            ..Issue::default()
        };
        assert_eq!(issue.annotation(), "Wrong court");

        let failed = Issue::failed("model did not return valid JSON", "oops");
        assert_eq!(failed.annotation(), "model did not return valid JSON");
    }

    #[test]
    fn test_non_string_fields_kept_verbatim() {
        let json = r#"{"issue": "x", "severity": 3, "source_reference": null, "clause": "3.1", "paragraph_index": 2}"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.severity, None);
        assert_eq!(issue.source_reference, None);
        assert_eq!(issue.paragraph_index, Some(2));
        assert_eq!(issue.extra["clause"], "3.1");

        let expected: Value = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_value(&issue).unwrap(), expected);
    }
}
