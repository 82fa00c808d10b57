//! Lexical chunk index.
//!
//! Chunks are ranked by TF-IDF weighted term overlap with the query. Terms
//! are lowercased, folded to plain ASCII vowels and `n` and filtered against a short
//! stop-word list.

use std::collections::{HashMap, HashSet};

use crate::chunking::Chunk;

pub const DEFAULT_TOP_K: usize = 5;

/// Terms shorter than this carry no signal.
const MIN_TERM_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    "que", "los", "las", "del", "por", "con", "para", "una", "uno", "unos", "unas", "como", "mas",
    "pero", "sus", "este", "esta", "estos", "estas", "ese", "esa", "hay", "son", "puede", "debo",
    "puedo", "cual", "cuales", "cuando", "donde", "sobre", "entre", "sin", "tiene", "the", "and",
];

/// A retrieved chunk with its relevance score.
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f64,
}

/// In-memory index over one document's chunks.
#[derive(Debug)]
pub struct LexicalIndex {
    chunks: Vec<Chunk>,
    term_counts: Vec<HashMap<String, usize>>,
    document_frequency: HashMap<String, usize>,
}

impl LexicalIndex {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        let term_counts: Vec<HashMap<String, usize>> = chunks
            .iter()
            .map(|c| {
                let mut counts = HashMap::new();
                for term in terms(&c.text) {
                    *counts.entry(term).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut document_frequency = HashMap::new();
        for counts in &term_counts {
            for term in counts.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        Self {
            chunks,
            term_counts,
            document_frequency,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Up to `k` chunks sharing at least one term with `query`, best first.
    /// Equal scores keep document order.
    pub fn search(&self, query: &str, k: usize) -> Vec<ScoredChunk<'_>> {
        let query_terms: HashSet<String> = terms(query).collect();
        if query_terms.is_empty() {
            return Vec::new();
        }

        let total = self.chunks.len() as f64;
        let mut scored: Vec<ScoredChunk<'_>> = self
            .chunks
            .iter()
            .zip(&self.term_counts)
            .filter_map(|(chunk, counts)| {
                let score: f64 = query_terms
                    .iter()
                    .filter_map(|term| {
                        let tf = *counts.get(term)? as f64;
                        let df = self.document_frequency.get(term).copied().unwrap_or(1) as f64;
                        Some(tf * (1.0 + total / df).ln())
                    })
                    .sum();
                (score > 0.0).then_some(ScoredChunk { chunk, score })
            })
            .collect();

        // Stable sort keeps document order among ties.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        scored
    }
}

/// Normalized index terms of `text`.
pub fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .map(fold_term)
        .filter(|t| t.chars().count() >= MIN_TERM_LEN && !STOP_WORDS.contains(&t.as_str()))
}

fn fold_term(word: &str) -> String {
    word.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, start_index: usize) -> Chunk {
        Chunk {
            text: text.into(),
            start_index,
        }
    }

    fn index() -> LexicalIndex {
        LexicalIndex::new(vec![
            chunk("Posología: un comprimido cada 8 horas.", 0),
            chunk("Conservar por debajo de 30 ºC.", 40),
            chunk("No tomar durante el embarazo. Posología en niños: consultar.", 80),
            chunk("Contraindicaciones: úlcera péptica.", 140),
        ])
    }

    #[test]
    fn test_terms_are_folded() {
        let t: Vec<String> = terms("¿Cuál es la POSOLOGÍA para niños?").collect();
        assert_eq!(t, vec!["posologia", "ninos"]);
    }

    #[test]
    fn test_search_ranks_by_overlap() {
        let index = index();
        let hits = index.search("posologia en ninos", 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.start_index, 80);
        assert_eq!(hits[1].chunk.start_index, 0);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_search_respects_k() {
        let index = index();
        let hits = index.search("posología", 1);
        assert_eq!(hits.len(), 1);
        // tie: document order wins
        assert_eq!(hits[0].chunk.start_index, 0);
    }

    #[test]
    fn test_unrelated_query_finds_nothing() {
        let index = index();
        assert!(index.search("capital de Francia", 5).is_empty());
        assert!(index.search("   ", 5).is_empty());
        assert!(LexicalIndex::new(Vec::new()).search("posologia", 5).is_empty());
    }
}
