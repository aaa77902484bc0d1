use crate::docs::types::{DocType, Process};

/// Keyword phrases per document type, evaluated top to bottom.
///
/// The first type with any phrase contained in the lower-cased text wins,
/// so the order here is part of the classification contract.
pub const DOC_TYPE_KEYWORDS: &[(DocType, &[&str])] = &[
    (
        DocType::ArticlesOfAssociation,
        &["articles of association", "articles of association (", "articles of assoc"],
    ),
    (
        DocType::MemorandumOfAssociation,
        &["memorandum of association", "memorandum of assoc", "moa"],
    ),
    (
        DocType::BoardResolution,
        &["board resolution", "resolution of the board", "board of directors resolution"],
    ),
    (
        DocType::ShareholderResolution,
        &["shareholder resolution", "resolution of the shareholders"],
    ),
    (
        DocType::IncorporationApplicationForm,
        &["application for incorporation", "incorporation application"],
    ),
    (
        DocType::UboDeclarationForm,
        &["ubo declaration", "ultimate beneficial owner", "ubo"],
    ),
    (
        DocType::RegisterOfMembersAndDirectors,
        &["register of members", "register of directors", "register of members and directors"],
    ),
    (
        DocType::ChangeOfRegisteredAddressNotice,
        &["change of registered address", "registered address notice"],
    ),
    (
        DocType::EmploymentContract,
        &["standard employment contract", "employment contract"],
    ),
    (
        DocType::DataProtectionPolicy,
        &["appropriate policy document", "data protection"],
    ),
];

/// Any one of these in a batch marks it as a company incorporation.
const INCORPORATION_ANCHORS: &[DocType] = &[
    DocType::ArticlesOfAssociation,
    DocType::MemorandumOfAssociation,
    DocType::IncorporationApplicationForm,
];

const INCORPORATION_REQUIRED: &[DocType] = &[
    DocType::ArticlesOfAssociation,
    DocType::MemorandumOfAssociation,
    DocType::IncorporationApplicationForm,
    DocType::UboDeclarationForm,
    DocType::RegisterOfMembersAndDirectors,
];

pub fn classify(text: &str) -> DocType {
    let lower = text.to_lowercase();
    DOC_TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(doc_type, _)| *doc_type)
        .unwrap_or(DocType::Unknown)
}

pub fn detect_process(uploaded: &[DocType]) -> Process {
    if uploaded.iter().any(|t| INCORPORATION_ANCHORS.contains(t)) {
        Process::CompanyIncorporation
    } else {
        Process::Unknown
    }
}

pub fn required_documents(process: Process) -> &'static [DocType] {
    match process {
        Process::CompanyIncorporation => INCORPORATION_REQUIRED,
        Process::Unknown => &[],
    }
}

/// Required types absent from the upload, in checklist order.
pub fn missing_documents(process: Process, uploaded: &[DocType]) -> Vec<DocType> {
    required_documents(process)
        .iter()
        .copied()
        .filter(|r| !uploaded.contains(r))
        .collect()
}
