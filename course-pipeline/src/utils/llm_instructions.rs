use serde_json::json;

use crate::types::DifficultyLevel;

pub static SUMMARIZE_SYSTEM_MESSAGE: &str = "You condense training source material. \
Keep every procedure, definition, requirement and step-by-step instruction intact and in order. \
Drop repetition, boilerplate, page furniture and navigation text. Never invent content.";

pub static SYNTHESIZE_SYSTEM_MESSAGE: &str = "You are an instructional designer who turns \
source material into a structured training course. Follow the output contract exactly and \
respond only with the requested JSON document.";

pub static SUMMARY_INSTRUCTIONS: &str = "Condense the following excerpt so it can be combined \
with the other excerpts into one training course. Preserve procedures, definitions and \
step-by-step instructions verbatim where possible; keep numbered steps numbered. \
Summaries feed the final course, so do not lose instructional detail.";

pub static BEGINNER_DIRECTIVE: &str = "Audience: beginners. Use plain language and everyday \
analogies. Explain each idea step by step, avoid jargon or define it immediately, and keep an \
encouraging, supportive tone.";

pub static MODERATE_DIRECTIVE: &str = "Audience: practitioners with some background. Use \
professional terminology and introduce each term with a short inline definition. Balance \
conceptual explanation with practical application and worked examples.";

pub static ADVANCED_DIRECTIVE: &str = "Audience: experienced specialists. Use precise technical \
terminology, ground the material in underlying theory and standards, and explore edge cases \
across multiple realistic scenarios in depth.";

pub fn difficulty_directive(level: DifficultyLevel) -> &'static str {
    match level {
        DifficultyLevel::Beginner => BEGINNER_DIRECTIVE,
        DifficultyLevel::Moderate => MODERATE_DIRECTIVE,
        DifficultyLevel::Advanced => ADVANCED_DIRECTIVE,
    }
}

pub fn structural_contract(section_char_limit: usize) -> String {
    format!(
        "OUTPUT CONTRACT\n\
         Produce a JSON object with:\n\
         - \"title\": the course title.\n\
         - \"description\": a short description of the course (two or three sentences).\n\
         - \"sections\": an ordered array of sections, each with a \"title\" and \"content\".\n\
         Every section's content must stay under {section_char_limit} characters on its own.\n\
         When a topic needs more room, split it into several consecutive sections \
         (for example \"Part 1\", \"Part 2\") instead of compressing it.\n\
         Prefer more, shorter sections over fewer, denser ones."
    )
}

pub fn get_course_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "description": { "type": "string" },
            "sections": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "content": { "type": "string" }
                    },
                    "required": ["title", "content"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["title", "description", "sections"],
        "additionalProperties": false
    })
}
