// SPDX-License-Identifier: MIT
//! Prompt shaping: what the model is asked, given what is on the page.
//!
//! Two inputs decide the shape: whether the user typed an instruction, and
//! whether the document already holds text worth continuing ("context").
//! Whitespace-only documents count as empty and blank instructions count
//! as none.

/// Which of the four prompt shapes was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// No instruction, empty document.
    FreshDefault,
    /// Instruction, empty document.
    FreshInstruction,
    /// No instruction, existing text.
    Continuation,
    /// Instruction and existing text.
    GuidedContinuation,
}

/// Model input: the user turn plus the system instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub contents: String,
    pub system_instruction: String,
}

pub const DEFAULT_STORY_PROMPT: &str = "Start a story about a futuristic digital world.";

const SYSTEM_DEFAULT: &str = "You are a creative writing assistant.";

const SYSTEM_INSTRUCTION: &str = "You are a creative AI writing assistant. \
     Generate high-quality, rich text based on the user's prompt.";

const SYSTEM_CONTINUATION: &str = "You are a creative writing assistant. \
     Continue the provided text naturally. Match the tone, style, and flow. \
     Do not repeat the input text.";

const SYSTEM_GUIDED: &str = "You are an intelligent writing assistant. \
     The user has provided a specific instruction. Continue the text adhering \
     strictly to that instruction. Maintain the existing tone and style.";

/// Build the prompt for `document_text` and an optional `instruction`.
#[must_use]
pub fn shape(document_text: &str, instruction: Option<&str>) -> Prompt {
    let instruction = instruction.filter(|i| !i.trim().is_empty());
    let has_context = !document_text.trim().is_empty();

    let (kind, contents, system) = match (instruction, has_context) {
        (None, false) => (
            PromptKind::FreshDefault,
            DEFAULT_STORY_PROMPT.to_string(),
            SYSTEM_DEFAULT,
        ),
        (Some(instruction), false) => (
            PromptKind::FreshInstruction,
            instruction.to_string(),
            SYSTEM_INSTRUCTION,
        ),
        (None, true) => (
            PromptKind::Continuation,
            document_text.to_string(),
            SYSTEM_CONTINUATION,
        ),
        (Some(instruction), true) => (
            PromptKind::GuidedContinuation,
            format!(
                "Context (the story so far):\n\"{document_text}\"\n\nUser Instruction:\n\"{instruction}\""
            ),
            SYSTEM_GUIDED,
        ),
    };

    Prompt {
        kind,
        contents,
        system_instruction: system.to_string(),
    }
}
