/// Separator placed between reference excerpts in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

pub fn build_review_prompt(jurisdiction: &str, context: &str, document: &str) -> String {
    format!(
        r#"You are an expert {jurisdiction} corporate compliance reviewer.
Use the {jurisdiction} reference excerpts below to identify:
- Missing or incorrect clauses
- Wrong jurisdiction references
- Missing required sections or signatures
- Ambiguous language
- Non-compliance with {jurisdiction} templates

{jurisdiction} REFERENCE MATERIAL:
{context}

DOCUMENT TO REVIEW:
{document}

Return ONLY a JSON array of issues. Each issue is an object with the fields:
"document_section" (approximate section or quoted text), "issue", "severity" (Low/Medium/High),
"suggestion", "source_reference".
Return [] if the document has no issues."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_all_parts() {
        let prompt = build_review_prompt("ADGM", "Reg 12\n---\nReg 13", "Clause {context} 1");
        assert!(prompt.starts_with("You are an expert ADGM corporate compliance reviewer."));
        assert!(prompt.contains("ADGM REFERENCE MATERIAL:\nReg 12\n---\nReg 13\n"));
        assert!(prompt.contains("DOCUMENT TO REVIEW:\nClause {context} 1\n"));
        for field in ["document_section", "issue", "severity", "suggestion", "source_reference"] {
            assert!(prompt.contains(field));
        }
    }
}
