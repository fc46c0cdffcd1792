// complexity-api-rs/src/prompt.rs
//
// Builds the instruction text sent to the model. The JSON layout below must
// stay field-for-field in sync with `models::AnalysisResult`, since the
// normalizer decodes the reply against it.

const OUTPUT_SCHEMA: &str = r#"{
  "timeComplexity": {
    "bigO": "O(...)",
    "explanation": "Detailed explanation of time complexity analysis",
    "bestCase": "O(...)",
    "averageCase": "O(...)",
    "worstCase": "O(...)"
  },
  "spaceComplexity": {
    "bigO": "O(...)",
    "explanation": "Detailed explanation of space complexity analysis",
    "auxiliary": "O(...)",
    "total": "O(...)"
  },
  "algorithmType": "Type of algorithm (e.g., Two Pointers, Dynamic Programming, etc.)",
  "dataStructures": ["List of data structures used"],
  "optimizationLevel": "Poor/Fair/Good/Excellent",
  "suggestions": [
    {
      "type": "performance|readability|memory",
      "description": "Specific optimization suggestion",
      "impact": "Expected improvement"
    }
  ],
  "strengths": ["List of code strengths"],
  "weaknesses": ["List of potential issues"],
  "alternativeApproaches": [
    {
      "approach": "Alternative algorithm name",
      "timeComplexity": "O(...)",
      "spaceComplexity": "O(...)",
      "tradeoffs": "When to use this approach"
    }
  ],
  "scalability": {
    "rating": "Poor/Fair/Good/Excellent",
    "analysis": "How well the solution scales with input size"
  },
  "codeQuality": {
    "readability": "Poor/Fair/Good/Excellent",
    "maintainability": "Poor/Fair/Good/Excellent",
    "comments": "Assessment of code documentation"
  }
}"#;

const GUIDELINES: &[&str] = &[
    "Provide precise Big O notation",
    "Explain your reasoning clearly",
    "Consider best, average and worst case behaviour",
    "Consider all loops, recursive calls, and data structure operations",
    "Account for hidden complexities in built-in functions",
    "Be specific about optimization opportunities",
    "Consider edge cases and input constraints",
];

/// Build the complexity-analysis prompt for one request.
pub fn build_prompt(code: &str, language: &str, problem_title: &str) -> String {
    let problem = if problem_title.is_empty() {
        String::new()
    } else {
        format!(" for the problem \"{}\"", problem_title)
    };

    let mut prompt = format!(
        "You are an expert software engineer specializing in algorithm analysis and code optimization.\n\n\
         Analyze the following {language} code{problem} and provide a comprehensive complexity analysis.\n\n\
         CODE TO ANALYZE:\n```{language}\n{code}\n```\n\n\
         Please provide your analysis in the following JSON format (respond ONLY with valid JSON):\n\n\
         {OUTPUT_SCHEMA}\n\n\
         Important guidelines:"
    );

    for guideline in GUIDELINES {
        prompt.push_str("\n- ");
        prompt.push_str(guideline);
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisResult;

    #[test]
    fn test_prompt_embeds_code_in_language_block() {
        let code = "def f(n):\n    return sum(range(n))";
        let prompt = build_prompt(code, "python", "");

        assert!(prompt.contains(&format!("```python\n{}\n```", code)));
        assert!(prompt.contains("Analyze the following python code and provide"));
        assert!(!prompt.contains("for the problem"));
    }

    #[test]
    fn test_prompt_mentions_problem_title() {
        let prompt = build_prompt("x", "go", "Two Sum");
        assert!(prompt.contains("go code for the problem \"Two Sum\""));
    }

    #[test]
    fn test_prompt_lists_guidelines() {
        let prompt = build_prompt("x", "c", "");
        assert!(prompt.ends_with("- Consider edge cases and input constraints"));
        assert!(prompt.contains("- Account for hidden complexities in built-in functions"));
        assert!(prompt.contains("respond ONLY with valid JSON"));
    }

    #[test]
    fn test_schema_matches_result_shape() {
        let schema: serde_json::Value = serde_json::from_str(OUTPUT_SCHEMA).unwrap();
        let placeholder = serde_json::to_value(AnalysisResult::placeholder()).unwrap();

        let schema_keys: Vec<&String> = schema.as_object().unwrap().keys().collect();
        let result_keys: Vec<&String> = placeholder.as_object().unwrap().keys().collect();
        let mut schema_sorted = schema_keys.clone();
        let mut result_sorted = result_keys.clone();
        schema_sorted.sort();
        result_sorted.sort();
        assert_eq!(schema_sorted, result_sorted);

        // The schema example decodes as a full result
        let decoded: AnalysisResult = serde_json::from_value(schema).unwrap();
        assert_eq!(decoded.time_complexity.best_case.as_deref(), Some("O(...)"));
        assert_eq!(decoded.suggestions[0].kind, "performance|readability|memory");
    }
}
