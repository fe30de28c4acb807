//! LLM prompts for the tagging and paraphrase-generation stages.
//!
//! Prompt text lives in `const` templates; the `build_*` functions fill in
//! the per-call context (examples, answers, counts). Keeping construction
//! here means the pipeline and tagging modules never concatenate prompt
//! strings themselves.

/// Template for the paraphrase generation request.
///
/// Placeholders: `{examples}`, `{count}`, `{answer}`.
const PARAPHRASE_TEMPLATE: &str = r#"You are creating training data for a question-answering system.

{examples}CRITICAL INSTRUCTIONS:

1. **PRIMARY FOCUS**: Analyze the question patterns, structure, phrasing, and word choices in the example questions above. These examples are your primary reference for style and semantic meaning.

2. **SEMANTIC SIMILARITY**: Generate {count} NEW questions with 80-99% semantic similarity to the example questions. Each question must ask about the same core topic and would lead to the same answer, while using different words, phrasing, sentence structures, and question formats.

3. **DIVERSITY REQUIREMENTS**: Vary vocabulary, sentence structure, length, and register across the {count} questions. Mix formal and conversational phrasing. Avoid repeating the same words or templates; every question should sound like a different real person wrote it.

4. **QUALITY STANDARDS**: All questions must be natural, authentic-sounding, and distinct from one another.

5. **OUTPUT FORMAT**: Output exactly {count} questions, one per line. Number them 1-{count}. Do not include any other text.

Note: All these questions lead to the following answer (provided for context only):
{answer}

Generate {count} diverse questions now:"#;

/// Template for the tag-naming request.
///
/// Placeholders: `{queries}`, `{answer}`.
const TAG_NAMING_TEMPLATE: &str = r#"Based on the following similar queries and their answer, generate a short, descriptive tag (2-4 words) that captures the main topic or intent.

Sample Queries:
{queries}

Answer:
{answer}

Requirements:
- The tag should be 2-4 words maximum
- Use lowercase with underscores between words (e.g., "voter_registration_process")
- The tag should be descriptive and capture the main topic
- Do not include special characters except underscores
- Output ONLY the tag, nothing else

Tag:"#;

/// System prompt for the tag-naming request.
pub const TAG_NAMING_SYSTEM: &str =
    "You are a helpful assistant that generates concise, descriptive tags for categorizing questions.";

/// Maximum answer length embedded in the tag-naming prompt.
const TAG_ANSWER_PREVIEW_CHARS: usize = 500;

/// Build the user prompt asking for `count` paraphrases of the example set.
pub fn build_paraphrase_prompt(answer: &str, examples: &[String], count: usize) -> String {
    let examples_section = if examples.is_empty() {
        String::new()
    } else {
        let mut section = format!(
            "Here are {} real example questions from users asking about this topic:\n\n",
            examples.len()
        );
        for (i, example) in examples.iter().enumerate() {
            section.push_str(&format!("Example {}: {}\n", i + 1, example));
        }
        section.push('\n');
        section
    };

    PARAPHRASE_TEMPLATE
        .replace("{examples}", &examples_section)
        .replace("{count}", &count.to_string())
        .replace("{answer}", answer)
}

/// Build the user prompt asking for a short topic tag for a query group.
///
/// Embeds up to five sample queries and a truncated answer preview.
pub fn build_tag_prompt(queries: &[String], answer: &str) -> String {
    let sample: Vec<String> = queries
        .iter()
        .take(5)
        .map(|q| format!("- {}", q))
        .collect();

    let preview: String = if answer.chars().count() > TAG_ANSWER_PREVIEW_CHARS {
        let truncated: String = answer.chars().take(TAG_ANSWER_PREVIEW_CHARS).collect();
        format!("{}...", truncated)
    } else {
        answer.to_string()
    };

    TAG_NAMING_TEMPLATE
        .replace("{queries}", &sample.join("\n"))
        .replace("{answer}", &preview)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paraphrase_prompt_embeds_examples_and_count() {
        let examples = vec!["how do I vote?".to_string(), "where to vote?".to_string()];
        let prompt = build_paraphrase_prompt("Go to your polling station.", &examples, 200);

        assert!(prompt.contains("2 real example questions"));
        assert!(prompt.contains("Example 1: how do I vote?"));
        assert!(prompt.contains("Example 2: where to vote?"));
        assert!(prompt.contains("exactly 200 questions"));
        assert!(prompt.contains("Number them 1-200"));
        assert!(prompt.contains("Go to your polling station."));
    }

    #[test]
    fn test_paraphrase_prompt_without_examples_has_no_example_header() {
        let prompt = build_paraphrase_prompt("answer", &[], 50);
        assert!(!prompt.contains("real example questions"));
        assert!(prompt.contains("exactly 50 questions"));
    }

    #[test]
    fn test_tag_prompt_limits_samples_to_five() {
        let queries: Vec<String> = (0..8).map(|i| format!("query {}", i)).collect();
        let prompt = build_tag_prompt(&queries, "short answer");

        assert!(prompt.contains("- query 4"));
        assert!(!prompt.contains("- query 5"));
        assert!(prompt.contains("short answer"));
    }

    #[test]
    fn test_tag_prompt_truncates_long_answers() {
        let long_answer = "x".repeat(900);
        let prompt = build_tag_prompt(&["q".to_string()], &long_answer);
        assert!(prompt.contains(&format!("{}...", "x".repeat(500))));
        assert!(!prompt.contains(&"x".repeat(501)));
    }
}
