//! Response normalization
//!
//! Turns the free text returned by the model into an [`AnalysisResult`].
//! [`decode`] reports why a response could not be used; [`normalize`] never
//! fails and substitutes [`AnalysisResult::placeholder`] instead.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::AnalysisResult;

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?i:json)?\s*").expect("leading fence pattern"));
static TRAILING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*```$").expect("trailing fence pattern"));

/// Reasons a model response could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Model response was empty")]
    Empty,

    #[error("Model response is not a valid analysis object: {0}")]
    Malformed(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Remove a fence at the very start of the text and, if one was present,
/// a fence at the very end. Fences elsewhere are left alone.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(found) = LEADING_FENCE.find(trimmed) else {
        return trimmed;
    };

    let body = &trimmed[found.end()..];
    match TRAILING_FENCE.find(body) {
        Some(tail) => &body[..tail.start()],
        None => body,
    }
}

/// Decode a model response into a fully populated result.
pub fn decode(raw_text: &str) -> Result<AnalysisResult, DecodeError> {
    let body = strip_code_fence(raw_text);
    if body.is_empty() {
        return Err(DecodeError::Empty);
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(DecodeError::Malformed("expected a JSON object".to_string()));
    };

    let algorithm_type = required::<String>(&fields, "algorithmType")?;
    if algorithm_type.trim().is_empty() {
        return Err(DecodeError::MissingField("algorithmType"));
    }

    Ok(AnalysisResult {
        time_complexity: required(&fields, "timeComplexity")?,
        space_complexity: required(&fields, "spaceComplexity")?,
        algorithm_type,
        data_structures: optional(&fields, "dataStructures"),
        optimization_level: optional(&fields, "optimizationLevel"),
        suggestions: optional(&fields, "suggestions"),
        strengths: optional(&fields, "strengths"),
        weaknesses: optional(&fields, "weaknesses"),
        alternative_approaches: optional(&fields, "alternativeApproaches"),
        scalability: optional(&fields, "scalability"),
        code_quality: optional(&fields, "codeQuality"),
    })
}

fn required<T: DeserializeOwned>(
    fields: &Map<String, Value>,
    name: &'static str,
) -> Result<T, DecodeError> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(DecodeError::MissingField(name)),
        Some(value) => T::deserialize(value)
            .map_err(|e| DecodeError::Malformed(format!("{}: {}", name, e))),
    }
}

/// A missing, null or undecodable optional field takes its default;
/// the rest of the reply is kept.
fn optional<T: DeserializeOwned + Default>(fields: &Map<String, Value>, name: &str) -> T {
    match fields.get(name) {
        None | Some(Value::Null) => T::default(),
        Some(value) => T::deserialize(value).unwrap_or_else(|err| {
            tracing::debug!(field = name, error = %err, "Ignoring invalid optional field");
            T::default()
        }),
    }
}

/// Decode a model response, falling back to the placeholder result.
pub fn normalize(raw_text: &str) -> AnalysisResult {
    match decode(raw_text) {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to parse model response, returning placeholder analysis");
            AnalysisResult::placeholder()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CodeQuality, OptimizationLevel, Scalability};
    use serde_json::json;

    fn minimal_payload() -> serde_json::Value {
        json!({
            "timeComplexity": { "bigO": "O(n)", "explanation": "single pass" },
            "spaceComplexity": { "bigO": "O(1)", "explanation": "constant extra space" },
            "algorithmType": "Linear Scan"
        })
    }

    fn full_payload() -> serde_json::Value {
        json!({
            "timeComplexity": {
                "bigO": "O(n log n)",
                "explanation": "sorting dominates",
                "bestCase": "O(n log n)",
                "averageCase": "O(n log n)",
                "worstCase": "O(n^2)"
            },
            "spaceComplexity": {
                "bigO": "O(n)",
                "explanation": "copy of input",
                "auxiliary": "O(log n)",
                "total": "O(n)"
            },
            "algorithmType": "Sorting",
            "dataStructures": ["Array"],
            "optimizationLevel": "Good",
            "suggestions": [
                { "type": "performance", "description": "Use a heap", "impact": "Lower constant factors" }
            ],
            "strengths": ["Readable"],
            "weaknesses": ["Quadratic worst case"],
            "alternativeApproaches": [
                {
                    "approach": "Merge sort",
                    "timeComplexity": "O(n log n)",
                    "spaceComplexity": "O(n)",
                    "tradeoffs": "Stable but uses memory"
                }
            ],
            "scalability": { "rating": "Good", "analysis": "Handles large inputs" },
            "codeQuality": { "readability": "Good", "maintainability": "Fair", "comments": "Sparse" }
        })
    }

    #[test]
    fn test_minimal_payload_gets_defaults() {
        let result = decode(&minimal_payload().to_string()).unwrap();

        assert_eq!(result.time_complexity.big_o, "O(n)");
        assert_eq!(result.space_complexity.explanation, "constant extra space");
        assert_eq!(result.algorithm_type, "Linear Scan");
        assert!(result.data_structures.is_empty());
        assert_eq!(result.optimization_level, OptimizationLevel::Unknown);
        assert!(result.suggestions.is_empty());
        assert!(result.strengths.is_empty());
        assert!(result.weaknesses.is_empty());
        assert!(result.alternative_approaches.is_empty());
        assert_eq!(result.scalability, Scalability::default());
        assert_eq!(result.scalability.analysis, "Not analyzed");
        assert_eq!(result.code_quality, CodeQuality::default());
        assert_eq!(result.code_quality.comments, "Not assessed");
    }

    #[test]
    fn test_full_payload_kept_verbatim() {
        let payload = full_payload();
        let result = decode(&payload.to_string()).unwrap();

        assert_eq!(serde_json::to_value(&result).unwrap(), payload);
        assert_eq!(result.optimization_level, OptimizationLevel::Good);
        assert_eq!(result.time_complexity.worst_case.as_deref(), Some("O(n^2)"));
    }

    #[test]
    fn test_fenced_payloads_decode_like_plain() {
        let plain = full_payload().to_string();
        let expected = decode(&plain).unwrap();

        let labelled = format!("```json\n{}\n```", plain);
        let unlabelled = format!("```\n{}\n```", plain);
        let padded = format!("  \n```JSON {}```  \n", plain);

        assert_eq!(decode(&labelled).unwrap(), expected);
        assert_eq!(decode(&unlabelled).unwrap(), expected);
        assert_eq!(decode(&padded).unwrap(), expected);
    }

    #[test]
    fn test_strip_code_fence_only_touches_edges() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("{}"), "{}");
        // trailing fence without a leading one is left alone
        assert_eq!(strip_code_fence("{}\n```"), "{}\n```");
        // embedded fences survive
        assert_eq!(strip_code_fence("```\na ``` b\n```"), "a ``` b");
    }

    #[test]
    fn test_missing_required_fields() {
        for field in ["timeComplexity", "spaceComplexity", "algorithmType"] {
            let mut payload = minimal_payload();
            payload.as_object_mut().unwrap().remove(field);
            assert_eq!(
                decode(&payload.to_string()),
                Err(DecodeError::MissingField(field)),
                "removing {}",
                field
            );
        }

        let mut blank_type = minimal_payload();
        blank_type["algorithmType"] = json!("  ");
        assert_eq!(
            decode(&blank_type.to_string()),
            Err(DecodeError::MissingField("algorithmType"))
        );

        let mut null_time = minimal_payload();
        null_time["timeComplexity"] = serde_json::Value::Null;
        assert_eq!(
            decode(&null_time.to_string()),
            Err(DecodeError::MissingField("timeComplexity"))
        );
    }

    #[test]
    fn test_null_optional_fields_use_defaults() {
        let mut payload = minimal_payload();
        payload["dataStructures"] = serde_json::Value::Null;
        payload["scalability"] = serde_json::Value::Null;
        payload["codeQuality"] = json!({ "readability": "Excellent" });

        let result = decode(&payload.to_string()).unwrap();
        assert!(result.data_structures.is_empty());
        assert_eq!(result.scalability.rating, "Unknown");
        assert_eq!(result.code_quality.readability, "Excellent");
        assert_eq!(result.code_quality.maintainability, "Unknown");
    }

    #[test]
    fn test_bad_optional_fields_keep_rest_of_reply() {
        let mut payload = minimal_payload();
        payload["dataStructures"] = json!("Array");
        payload["optimizationLevel"] = json!(3);
        payload["strengths"] = json!({ "first": "fast" });
        payload["suggestions"] = json!([
            { "type": "performance", "description": "cache", "impact": null }
        ]);
        payload["alternativeApproaches"] = json!([{ "approach": "Hashing", "tradeoffs": null }]);

        let result = decode(&payload.to_string()).unwrap();
        assert_eq!(result.algorithm_type, "Linear Scan");
        assert!(result.data_structures.is_empty());
        assert_eq!(result.optimization_level, OptimizationLevel::Unknown);
        assert!(result.strengths.is_empty());
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.suggestions[0].description, "cache");
        assert_eq!(result.suggestions[0].impact, "");
        assert_eq!(result.alternative_approaches[0].approach, "Hashing");
        assert_eq!(result.alternative_approaches[0].tradeoffs, "");
    }

    #[test]
    fn test_partial_complexity_objects_kept() {
        let mut payload = minimal_payload();
        payload["timeComplexity"] = json!({ "bigO": "O(n)" });
        payload["spaceComplexity"] = json!({ "explanation": null, "bigO": "O(1)", "total": 1 });

        let result = decode(&payload.to_string()).unwrap();
        assert_eq!(result.time_complexity.big_o, "O(n)");
        assert_eq!(result.time_complexity.explanation, "No explanation provided");
        assert_eq!(result.space_complexity.big_o, "O(1)");
        assert_eq!(result.space_complexity.explanation, "No explanation provided");
        assert_eq!(result.space_complexity.total, None);
    }

    #[test]
    fn test_malformed_inputs() {
        assert_eq!(decode(""), Err(DecodeError::Empty));
        assert_eq!(decode("   \n "), Err(DecodeError::Empty));
        assert_eq!(decode("```json\n```"), Err(DecodeError::Empty));
        assert!(matches!(decode("not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode("[1, 2, 3]"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode("{\"timeComplexity\": "), Err(DecodeError::Malformed(_))));
        assert!(matches!(
            decode("Here is the analysis: {\"algorithmType\": \"x\"}"),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_normalize_never_fails() {
        let inputs = [
            "",
            "null",
            "42",
            "```",
            "{}",
            "{\"timeComplexity\": \"O(n)\"}",
            "\u{0}\u{1}garbage",
        ];

        for input in inputs {
            assert_eq!(normalize(input), AnalysisResult::placeholder(), "input {:?}", input);
        }

        let fenced = format!("```json\n{}\n```", minimal_payload());
        assert_eq!(normalize(&fenced).algorithm_type, "Linear Scan");
    }
}
