//! The structured summary schema and its validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const REQUIRED_KEYS: [&str; 8] = [
    "title",
    "main_objectives",
    "research_questions",
    "study_type",
    "methodology",
    "main_findings",
    "conclusions",
    "limitations",
];

pub const OPTIONAL_KEY: &str = "rationale";

/// One validated research-article summary. All fields except `rationale` are
/// required non-null strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub title: String,
    pub main_objectives: String,
    pub research_questions: String,
    pub study_type: String,
    pub methodology: String,
    pub main_findings: String,
    pub conclusions: String,
    pub limitations: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Why a recovered object failed validation. Distinct from extraction
/// failure: an object existed but did not satisfy the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub missing: Vec<String>,
    pub mistyped: Vec<String>,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing: {}", self.missing.join(", ")));
        }
        if !self.mistyped.is_empty() {
            parts.push(format!("not a string: {}", self.mistyped.join(", ")));
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl ArticleSummary {
    /// Map a recovered object onto the schema, citing every missing or
    /// mistyped required field at once.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, SchemaViolation> {
        let mut missing = Vec::new();
        let mut mistyped = Vec::new();

        let mut field = |key: &str| -> String {
            match object.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(_) => {
                    mistyped.push(key.to_string());
                    String::new()
                }
                None => {
                    missing.push(key.to_string());
                    String::new()
                }
            }
        };

        let title = field("title");
        let main_objectives = field("main_objectives");
        let research_questions = field("research_questions");
        let study_type = field("study_type");
        let methodology = field("methodology");
        let main_findings = field("main_findings");
        let conclusions = field("conclusions");
        let limitations = field("limitations");

        if !missing.is_empty() || !mistyped.is_empty() {
            return Err(SchemaViolation { missing, mistyped });
        }

        let rationale = match object.get(OPTIONAL_KEY) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };

        Ok(Self {
            title,
            main_objectives,
            research_questions,
            study_type,
            methodology,
            main_findings,
            conclusions,
            limitations,
            rationale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_object() -> Map<String, Value> {
        let Value::Object(map) = json!({
            "title": "T",
            "main_objectives": "O",
            "research_questions": "Q",
            "study_type": "review",
            "methodology": "M",
            "main_findings": "F",
            "conclusions": "C",
            "limitations": "L",
        }) else {
            unreachable!()
        };
        map
    }

    #[test]
    fn complete_object_validates_with_rationale_none() {
        let summary = ArticleSummary::from_object(&full_object()).unwrap();
        assert_eq!(summary.title, "T");
        assert_eq!(summary.study_type, "review");
        assert_eq!(summary.rationale, None);
    }

    #[test]
    fn rationale_is_optional_but_carried_when_present() {
        let mut object = full_object();
        object.insert("rationale".into(), json!("because"));
        let summary = ArticleSummary::from_object(&object).unwrap();
        assert_eq!(summary.rationale.as_deref(), Some("because"));
    }

    #[test]
    fn missing_fields_are_all_cited() {
        let mut object = full_object();
        object.remove("methodology");
        object.remove("limitations");
        let violation = ArticleSummary::from_object(&object).unwrap_err();
        assert_eq!(violation.missing, vec!["methodology", "limitations"]);
        assert!(violation.mistyped.is_empty());
    }

    #[test]
    fn non_string_field_is_a_type_violation() {
        let mut object = full_object();
        object.insert("title".into(), json!(["not", "a", "string"]));
        let violation = ArticleSummary::from_object(&object).unwrap_err();
        assert_eq!(violation.mistyped, vec!["title"]);
    }

    #[test]
    fn violation_display_names_the_fields() {
        let violation = SchemaViolation {
            missing: vec!["title".into()],
            mistyped: vec!["study_type".into()],
        };
        let text = violation.to_string();
        assert!(text.contains("missing: title"));
        assert!(text.contains("not a string: study_type"));
    }

    #[test]
    fn serialized_summary_omits_absent_rationale() {
        let summary = ArticleSummary::from_object(&full_object()).unwrap();
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("rationale"));
    }
}
