//! Question-answering prompt assembly.

use crate::vector::IndexMatch;

/// The fixed template handed to the language model.
pub const PROMPT_TEMPLATE: &str = "Use the following pieces of information to answer the user's question.
If you don't know the answer, just say that you don't know, don't try to make up an answer.

Context: {context}
Question: {question}

Only return the helpful answer below and nothing else.
Helpful answer:
";

const CONTEXT_SLOT: &str = "{context}";
const QUESTION_SLOT: &str = "{question}";

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Context,
    Question,
}

/// A template with `{context}` and `{question}` slots, parsed once so that
/// slot-like text inside retrieved chunks is never substituted again.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn new(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = template;
        loop {
            let next = [
                (rest.find(CONTEXT_SLOT), CONTEXT_SLOT, Segment::Context),
                (rest.find(QUESTION_SLOT), QUESTION_SLOT, Segment::Question),
            ]
            .into_iter()
            .filter_map(|(pos, slot, seg)| pos.map(|p| (p, slot, seg)))
            .min_by_key(|(pos, _, _)| *pos);

            match next {
                Some((pos, slot, segment)) => {
                    if pos > 0 {
                        segments.push(Segment::Text(rest[..pos].to_string()));
                    }
                    segments.push(segment);
                    rest = &rest[pos + slot.len()..];
                }
                None => {
                    if !rest.is_empty() {
                        segments.push(Segment::Text(rest.to_string()));
                    }
                    break;
                }
            }
        }
        Self { segments }
    }

    pub fn render(&self, context: &str, question: &str) -> String {
        let mut prompt = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => prompt.push_str(text),
                Segment::Context => prompt.push_str(context),
                Segment::Question => prompt.push_str(question),
            }
        }
        prompt
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(PROMPT_TEMPLATE)
    }
}

/// Joins retrieved chunk texts with a blank line, best match first. No
/// truncation is applied against the model context window.
pub fn build_context(matches: &[IndexMatch]) -> String {
    matches
        .iter()
        .map(|m| m.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
