//! Retrieval-augmented answering over a single document.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::chunking::TextChunker;
use crate::gemini::ChatModel;
use crate::pdf;
use crate::prompts::{join_context, make_local_consultation_prompt, UNKNOWN_ANSWER};
use crate::retrieval::{LexicalIndex, DEFAULT_TOP_K};
use crate::{QaError, QaResult};

/// An answer and the chunks it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    /// Start offsets of the chunks placed in the prompt
    pub source_offsets: Vec<usize>,
}

impl Answer {
    fn unknown() -> Self {
        Self {
            text: UNKNOWN_ANSWER.to_string(),
            source_offsets: Vec::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.text == UNKNOWN_ANSWER
    }
}

pub struct DocumentAssistant {
    index: LexicalIndex,
    model: Arc<dyn ChatModel>,
    top_k: usize,
}

impl DocumentAssistant {
    pub fn from_text(text: &str, chunker: &TextChunker, model: Arc<dyn ChatModel>) -> Self {
        let chunks = chunker.split(text);
        info!(chunks = chunks.len(), "document indexed");
        Self {
            index: LexicalIndex::new(chunks),
            model,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Load, chunk and index a PDF.
    pub async fn from_pdf(
        path: &Path,
        chunker: &TextChunker,
        model: Arc<dyn ChatModel>,
    ) -> QaResult<Self> {
        let text = pdf::load_text(path).await?;
        Ok(Self::from_text(&text, chunker, model))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Answer from the document only. No matching chunk means "No lo sé"
    /// without calling the model.
    #[instrument(level = "debug", skip(self))]
    pub async fn ask(&self, question: &str) -> QaResult<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QaError::EmptyQuestion);
        }

        let hits = self.index.search(question, self.top_k);
        if hits.is_empty() {
            debug!("no chunk shares a term with the question");
            return Ok(Answer::unknown());
        }

        let context = join_context(hits.iter().map(|h| h.chunk.text.as_str()));
        let prompt = make_local_consultation_prompt(&context, question);
        let reply = self.model.complete(&prompt).await?;

        let text = reply.trim();
        if text.is_empty() {
            return Ok(Answer::unknown());
        }
        Ok(Answer {
            text: text.to_string(),
            source_offsets: hits.iter().map(|h| h.chunk.start_index).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records prompts and answers with a fixed reply.
    struct EchoModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl EchoModel {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.into(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn complete(&self, prompt: &str) -> QaResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    const LEAFLET: &str = "Posología: adultos, un comprimido cada 8 horas.\n\n\
        Conservación: no conservar a temperatura superior a 30 ºC.\n\n\
        Embarazo: no tomar durante el tercer trimestre.";

    fn assistant(model: Arc<EchoModel>) -> DocumentAssistant {
        let chunker = TextChunker::new(60, 10).unwrap();
        DocumentAssistant::from_text(LEAFLET, &chunker, model)
    }

    #[tokio::test]
    async fn test_prompt_contains_only_matching_chunks() {
        let model = EchoModel::new(" Un comprimido cada 8 horas. ");
        let assistant = assistant(model.clone());

        let answer = assistant.ask("¿Cuál es la posología?").await.unwrap();
        assert_eq!(answer.text, "Un comprimido cada 8 horas.");
        assert_eq!(answer.source_offsets, vec![0]);

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Posología: adultos"));
        assert!(!prompts[0].contains("Conservación"));
        assert!(prompts[0].contains("Pregunta: ¿Cuál es la posología?"));
    }

    #[tokio::test]
    async fn test_unrelated_question_skips_model() {
        let model = EchoModel::new("París");
        let assistant = assistant(model.clone());

        let answer = assistant.ask("capital de Francia").await.unwrap();
        assert!(answer.is_unknown());
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_reply_is_unknown() {
        let assistant = assistant(EchoModel::new("  "));
        let answer = assistant.ask("embarazo").await.unwrap();
        assert_eq!(answer.text, UNKNOWN_ANSWER);
    }

    #[tokio::test]
    async fn test_empty_question() {
        let assistant = assistant(EchoModel::new("x"));
        let err = assistant.ask(" \n").await.unwrap_err();
        assert!(err.is_user_error());
    }
}
