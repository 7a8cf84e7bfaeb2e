// Prompt constants and builders for the summary client.
// Placeholders are filled with str::replace before dispatch.

use crate::models::locale::Locale;

/// System prompt for OpenAI-compatible providers. Gemini enforces JSON
/// through its response schema instead and takes no system message here.
pub const SUMMARY_SYSTEM: &str = "You are a helpful tech assistant. You must output JSON.";

/// Bound on how much source text goes into a prompt. Longer documents are
/// summarized from their head only — an accepted lossy tradeoff that keeps
/// request cost and latency flat.
pub const MAX_SOURCE_CHARS: usize = 15_000;

const SUMMARY_TEMPLATE: &str = r#"Analyze the README content of the GitHub project named "{project_name}".
Your output MUST be a valid JSON object.
The entire JSON output, including all string values, MUST be in {language}.

Required JSON Structure:
{
  "catchyTitle": "Create a catchy title in {language}, social media style",
  "category": "Select one from: {categories}",
  "introduction": "One or two sentence lively introduction in {language}",
  "coreFeatures": ["Feature 1", "Feature 2", "Feature 3"],
  "techStack": "Main tech stack in {language}"
}

README Content:
---
{content}
---
"#;

const SCRAPED_TEMPLATE: &str = r#"Analyze the raw text and follow user instructions.
Instructions: "{instruction}"

Output strictly valid JSON in {language}:
{
  "catchyTitle": "Catchy title in {language}",
  "category": "One of: {categories}",
  "introduction": "Short intro in {language}",
  "coreFeatures": ["Point 1", "Point 2"],
  "techStack": "Domain or Tech Stack in {language}"
}

Raw text:
---
{content}
---
"#;

const TRANSLATE_TEMPLATE: &str = r#"Translate the following Markdown text into {language}.
Maintain format.

Text:
{content}
"#;

/// Builds the README summarization prompt, truncating the source text and
/// appending the optional user instruction.
pub fn summary_prompt(
    project_name: &str,
    content: &str,
    locale: Locale,
    custom_instruction: Option<&str>,
) -> String {
    let base = fill(SUMMARY_TEMPLATE, locale)
        .replace("{project_name}", project_name)
        .replace("{content}", &truncate_chars(content, MAX_SOURCE_CHARS));

    match custom_instruction {
        Some(instruction) if !instruction.trim().is_empty() => {
            format!("{base}\n\nAdditional instructions: \"{instruction}\"")
        }
        _ => base,
    }
}

/// Builds the scraped-content prompt for custom items.
pub fn scraped_prompt(raw_text: &str, instruction: &str, locale: Locale) -> String {
    fill(SCRAPED_TEMPLATE, locale)
        .replace("{instruction}", instruction)
        .replace("{content}", &truncate_chars(raw_text, MAX_SOURCE_CHARS))
}

/// Builds the translation prompt.
pub fn translate_prompt(text: &str, target: Locale) -> String {
    fill(TRANSLATE_TEMPLATE, target).replace("{content}", &truncate_chars(text, MAX_SOURCE_CHARS))
}

fn fill(template: &str, locale: Locale) -> String {
    template
        .replace("{language}", locale.language_name())
        .replace("{categories}", &locale.categories().join(", "))
}

/// Char-boundary-safe prefix truncation.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
