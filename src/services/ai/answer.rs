//! Grounded answer composition

use super::llm::LlmService;
use super::search::ScoredFragment;
use crate::error::AppResult;

/// The grounding prompt: the question, then one tagged line per context
/// fragment in retrieval order.
pub fn build_prompt(query: &str, contexts: &[ScoredFragment]) -> String {
    let mut lines = String::new();
    for context in contexts {
        let fragment = &context.fragment;
        lines.push_str(&format!(
            "- [{}] {} p.{}: {}\n",
            fragment.kind.as_str().to_uppercase(),
            fragment.doc_id,
            fragment.page,
            fragment.text
        ));
    }

    format!(
        "You are a strict RAG assistant. Answer ONLY from CONTEXT.\n\
         Cite like (doc_id p.page). If unsure, say you don't know.\n\n\
         QUESTION:\n{query}\n\nCONTEXT:\n{lines}"
    )
}

pub struct AnswerComposer {
    llm: LlmService,
}

impl AnswerComposer {
    pub fn new(llm: LlmService) -> Self {
        Self { llm }
    }

    pub async fn answer(&self, query: &str, contexts: &[ScoredFragment]) -> AppResult<String> {
        let prompt = build_prompt(query, contexts);
        tracing::debug!(contexts = contexts.len(), prompt_chars = prompt.len(), "Generating answer");

        let response = self.llm.generate(&prompt).await?;
        Ok(response.into_text())
    }
}
