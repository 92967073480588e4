//! Answer styles and prompt rendering.
//!
//! [`build_prompt`] is a pure function of (style, context, question):
//! no I/O, no hidden state, byte-identical output for identical inputs.
//! The rendered prompt pins the model to the supplied context, with a
//! fixed refusal sentence for questions the context cannot answer.

use std::fmt;

/// Named answer-format preset selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStyle {
    ShortAndConcise,
    DetailedExplanation,
    ExamOriented,
    BulletPoints,
    Beginner,
}

impl AnswerStyle {
    pub const ALL: [AnswerStyle; 5] = [
        AnswerStyle::ShortAndConcise,
        AnswerStyle::DetailedExplanation,
        AnswerStyle::ExamOriented,
        AnswerStyle::BulletPoints,
        AnswerStyle::Beginner,
    ];

    /// The user-facing preset name, as stored in history records.
    pub fn name(&self) -> &'static str {
        match self {
            AnswerStyle::ShortAndConcise => "Short and concise",
            AnswerStyle::DetailedExplanation => "Detailed explanation",
            AnswerStyle::ExamOriented => "Exam-oriented with examples",
            AnswerStyle::BulletPoints => "Bullet points",
            AnswerStyle::Beginner => "Teach me like a beginner",
        }
    }

    /// The instruction line injected into the prompt for this preset.
    pub fn instruction(&self) -> &'static str {
        match self {
            AnswerStyle::ShortAndConcise => "Provide a brief, direct answer in 2-3 sentences.",
            AnswerStyle::DetailedExplanation => {
                "Provide a comprehensive explanation with all relevant details. Reorganize the \
                 information logically without preserving arbitrary labels like 'Part 1', 'Part 2', etc."
            }
            AnswerStyle::ExamOriented => {
                "Provide an educational answer with examples. Structure it clearly but use \
                 natural language, not document labels."
            }
            AnswerStyle::BulletPoints => {
                "Provide key points in bullet format. Use meaningful bullet points, not document labels."
            }
            AnswerStyle::Beginner => {
                "Explain as if teaching a beginner. Use simple language and avoid technical \
                 jargon or document numbering."
            }
        }
    }

    /// Look up a preset by its user-facing name (case-insensitive).
    pub fn from_name(name: &str) -> Option<AnswerStyle> {
        Self::ALL
            .iter()
            .find(|style| style.name().eq_ignore_ascii_case(name))
            .copied()
    }
}

impl Default for AnswerStyle {
    fn default() -> Self {
        AnswerStyle::ShortAndConcise
    }
}

impl fmt::Display for AnswerStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render the instruction prompt around the retrieved context and the
/// user question.
pub fn build_prompt(style: AnswerStyle, context: &str, question: &str) -> String {
    format!(
"You are a helpful assistant that answers questions ONLY based on the provided document content.

Answer style: {style}
Instructions: {instruction}

CRITICAL RULES:
1. ONLY use information from the Context section below
2. If the answer is not in the Context, MUST say: \"Not available in the provided document\"
3. Do NOT use any external knowledge or assumptions
4. Reorganize and rephrase the information naturally - do NOT preserve arbitrary document labels like \"Part 1\", \"Part 2\", \"Section A\", etc.
5. Be clear, structured, and factual
6. Always cite which part of the document you're referencing when relevant

Context (from the uploaded document):
{context}

User Question:
{question}

Answer (ONLY from the context above, reorganized naturally):
",
        style = style.name(),
        instruction = style.instruction(),
        context = context,
        question = question,
    )
}

/// Truncate `text` to at most `max_chars` characters, keeping the prefix.
///
/// Cuts on a character boundary, never mid code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
