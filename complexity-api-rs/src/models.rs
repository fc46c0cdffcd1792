//! Request and result types shared by the analysis pipeline.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Maximum accepted length of submitted code, in characters.
pub const MAX_CODE_LENGTH: usize = 50_000;

/// Languages accepted by `POST /api/analyze`.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "javascript",
    "python",
    "java",
    "cpp",
    "c",
    "csharp",
    "go",
    "rust",
    "typescript",
    "php",
    "ruby",
    "swift",
    "kotlin",
];

/// Language recorded when the client does not name one.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Validated analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Trimmed, non-empty source code
    pub code: String,
    /// Lowercased language, or `unknown`
    pub language: String,
    /// Trimmed problem title, possibly empty
    pub problem_title: String,
}

// Model output is loosely typed: a null or non-string value in any nested
// text field counts as absent and gets that field's default.

fn string_or<'de, D>(deserializer: D, fallback: &str) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        _ => fallback.to_string(),
    })
}

fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    string_or(deserializer, "")
}

fn string_or_unknown<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    string_or(deserializer, UNKNOWN_VALUE)
}

fn string_or_not_explained<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    string_or(deserializer, NOT_EXPLAINED)
}

fn string_or_not_analyzed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    string_or(deserializer, NOT_ANALYZED)
}

fn string_or_not_assessed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    string_or(deserializer, NOT_ASSESSED)
}

fn optional_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}

const UNKNOWN_VALUE: &str = "Unknown";
const NOT_EXPLAINED: &str = "No explanation provided";
const NOT_ANALYZED: &str = "Not analyzed";
const NOT_ASSESSED: &str = "Not assessed";

fn unknown() -> String {
    UNKNOWN_VALUE.to_string()
}

fn not_explained() -> String {
    NOT_EXPLAINED.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeComplexity {
    #[serde(default = "unknown", deserialize_with = "string_or_unknown")]
    pub big_o: String,
    #[serde(default = "not_explained", deserialize_with = "string_or_not_explained")]
    pub explanation: String,
    #[serde(default, deserialize_with = "optional_string", skip_serializing_if = "Option::is_none")]
    pub best_case: Option<String>,
    #[serde(default, deserialize_with = "optional_string", skip_serializing_if = "Option::is_none")]
    pub average_case: Option<String>,
    #[serde(default, deserialize_with = "optional_string", skip_serializing_if = "Option::is_none")]
    pub worst_case: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceComplexity {
    #[serde(default = "unknown", deserialize_with = "string_or_unknown")]
    pub big_o: String,
    #[serde(default = "not_explained", deserialize_with = "string_or_not_explained")]
    pub explanation: String,
    #[serde(default, deserialize_with = "optional_string", skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<String>,
    #[serde(default, deserialize_with = "optional_string", skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
}

/// Overall optimization grade reported by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum OptimizationLevel {
    Poor,
    Fair,
    Good,
    Excellent,
    #[default]
    Unknown,
}

impl OptimizationLevel {
    /// Map a free-text grade onto the enum; anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "poor" => OptimizationLevel::Poor,
            "fair" => OptimizationLevel::Fair,
            "good" => OptimizationLevel::Good,
            "excellent" => OptimizationLevel::Excellent,
            _ => OptimizationLevel::Unknown,
        }
    }
}

impl From<String> for OptimizationLevel {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type", default, deserialize_with = "string_or_empty")]
    pub kind: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeApproach {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub approach: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub time_complexity: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub space_complexity: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub tradeoffs: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scalability {
    #[serde(deserialize_with = "string_or_unknown")]
    pub rating: String,
    #[serde(deserialize_with = "string_or_not_analyzed")]
    pub analysis: String,
}

impl Default for Scalability {
    fn default() -> Self {
        Self {
            rating: unknown(),
            analysis: NOT_ANALYZED.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeQuality {
    #[serde(deserialize_with = "string_or_unknown")]
    pub readability: String,
    #[serde(deserialize_with = "string_or_unknown")]
    pub maintainability: String,
    #[serde(deserialize_with = "string_or_not_assessed")]
    pub comments: String,
}

impl Default for CodeQuality {
    fn default() -> Self {
        Self {
            readability: unknown(),
            maintainability: unknown(),
            comments: NOT_ASSESSED.to_string(),
        }
    }
}

/// Fully populated analysis returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub time_complexity: TimeComplexity,
    pub space_complexity: SpaceComplexity,
    pub algorithm_type: String,
    pub data_structures: Vec<String>,
    pub optimization_level: OptimizationLevel,
    pub suggestions: Vec<Suggestion>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub alternative_approaches: Vec<AlternativeApproach>,
    pub scalability: Scalability,
    pub code_quality: CodeQuality,
}

impl AnalysisResult {
    /// Result handed back when the model output cannot be decoded.
    pub fn placeholder() -> Self {
        let unable = "Unable to analyze".to_string();
        let explanation =
            "The analysis could not be completed due to parsing issues.".to_string();

        Self {
            time_complexity: TimeComplexity {
                big_o: unable.clone(),
                explanation: explanation.clone(),
                best_case: None,
                average_case: None,
                worst_case: None,
            },
            space_complexity: SpaceComplexity {
                big_o: unable,
                explanation,
                auxiliary: None,
                total: None,
            },
            algorithm_type: "Unknown".to_string(),
            data_structures: Vec::new(),
            optimization_level: OptimizationLevel::Unknown,
            suggestions: vec![Suggestion {
                kind: "general".to_string(),
                description: "Manual review recommended - automated analysis failed".to_string(),
                impact: "Unknown".to_string(),
            }],
            strengths: Vec::new(),
            weaknesses: vec!["Automated analysis failed".to_string()],
            alternative_approaches: Vec::new(),
            scalability: Scalability {
                rating: "Unknown".to_string(),
                analysis: "Could not be analyzed".to_string(),
            },
            code_quality: CodeQuality {
                readability: "Unknown".to_string(),
                maintainability: "Unknown".to_string(),
                comments: "Could not be assessed".to_string(),
            },
        }
    }
}
