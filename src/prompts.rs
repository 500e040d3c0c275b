//! Instruction prompts for summarisation and image analysis.
//!
//! Every prompt lives here so it can be inspected by unit tests without a
//! model. The reply language is injected at request time from
//! [`crate::config::AppConfig::language`].

/// Role and required sections for the paper summary.
///
/// `{language}` is replaced with the configured reply language.
pub const SUMMARY_PROMPT: &str = r#"You are a world-class reviewer of materials-science and engineering research papers.
Using the full paper text provided below, write a clear summary in {language} covering the following items.
Each item MUST start on its own line with its heading in **bold** markdown.

1. **Research objective**: What problem does this study ultimately try to solve?
2. **Core methodology**: Which materials and processes were used, and which measurement and analysis methods mattered most?
3. **Key findings and conclusions**: What are the most important new facts this study established, and what is its final conclusion?"#;

/// Role line opening every image request.
pub const VISION_ROLE_PROMPT: &str =
    "You are an expert in data visualisation and materials analysis.";

/// Introduces the document text sent as context for an image.
pub const VISION_CONTEXT_PREFIX: &str =
    "This image is part of the paper below. Use it to understand the overall context:\n\n";

/// Separates the context text from the instructions.
pub const VISION_CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Instruction preceding the image. `{language}` is replaced at request time.
pub const VISION_INSTRUCTION: &str =
    "Referring to the text above where available, analyse the following image in {language}:";

/// The two questions every image analysis must answer, sent after the image.
pub const VISION_QUESTIONS: [&str; 2] = [
    "\n\n1. **Image type and content**: What is this image? (e.g. SEM micrograph, XRD pattern, process schematic) What does it show?",
    "2. **Key information and data**: What is the most important information or data this image conveys? (e.g. trends in a graph, meaning of specific peaks, microstructural features)",
];

/// Render the summary instruction for the given reply language.
pub fn summary_prompt(language: &str) -> String {
    SUMMARY_PROMPT.replace("{language}", language)
}

/// Render the image instruction for the given reply language.
pub fn vision_instruction(language: &str) -> String {
    VISION_INSTRUCTION.replace("{language}", language)
}

/// Build the context block that precedes an image.
pub fn vision_context(text: &str) -> String {
    format!("{VISION_CONTEXT_PREFIX}{text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prompt_names_three_sections() {
        let p = summary_prompt("English");
        assert!(p.contains("Research objective"));
        assert!(p.contains("Core methodology"));
        assert!(p.contains("Key findings"));
        assert!(p.contains("in English"));
        assert!(!p.contains("{language}"));
    }

    #[test]
    fn vision_instruction_substitutes_language() {
        assert!(vision_instruction("Korean").contains("in Korean"));
    }

    #[test]
    fn vision_questions_cover_type_and_data() {
        assert!(VISION_QUESTIONS[0].contains("Image type and content"));
        assert!(VISION_QUESTIONS[1].contains("Key information and data"));
    }
}
