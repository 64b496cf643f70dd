use crate::corpus::Document;
use crate::error::{Doc2VecError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// A retained term. `code` and `point` are only filled for hierarchical softmax:
/// `code` is the root-to-leaf bit path, `point` the internal node visited at each bit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VocabWord {
    pub term: String,
    pub count: usize,
    pub code: Vec<u8>,
    pub point: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    words: Vec<VocabWord>,
    t2i: HashMap<String, usize>,
    min_count: usize,
}

impl Vocabulary {

    fn accumulate(documents: &[Document]) -> HashMap<&str, usize> {
        // how many times each token appears in the corpus
        let mut token2count: HashMap<&str, usize> = HashMap::new();
        for doc in documents {
            for tok in &doc.tokens {
                *token2count.entry(tok.as_str()).or_insert(0) += 1;
            }
        }
        token2count
    }

    /// Counts terms over `documents`, keeps those seen at least `min_count` times and
    /// indexes them by descending count (ties by term), so the same corpus always
    /// yields the same indices. With `hierarchical` a Huffman code is attached to each term.
    pub fn build(documents: &[Document], min_count: usize, hierarchical: bool) -> Result<Vocabulary> {

        let token2count = Vocabulary::accumulate(documents);
        let distinct_terms = token2count.len();

        let mut tup = token2count
            .into_iter()
            .filter(|(_, count)| *count >= min_count)
            .collect::<Vec<(&str, usize)>>();
        if tup.is_empty() {
            return Err(Doc2VecError::EmptyVocabulary { min_count, distinct_terms });
        }
        tup.sort_by(|(t1, c1), (t2, c2)| c2.cmp(c1).then_with(|| t1.cmp(t2)));

        let words: Vec<VocabWord> = tup.iter().map(|(term, count)| VocabWord {
            term: term.to_string(),
            count: *count,
            code: Vec::new(),
            point: Vec::new(),
        }).collect();
        let t2i = words.iter().enumerate().map(|(i, w)| (w.term.clone(), i)).collect();

        let mut vocab = Vocabulary { words, t2i, min_count };
        if hierarchical {
            vocab.assign_huffman_codes();
        }

        info!("using {} terms with count >= {} out of {}", vocab.len(), min_count, distinct_terms);
        Ok(vocab)
    }

    // words are sorted by descending count, so the leaves can be merged with two
    // cursors instead of a heap: one walking the leaves backwards, one the new nodes.
    fn assign_huffman_codes(&mut self) {

        let n = self.words.len();
        if n < 2 {
            // a single term needs no decision, its path stays empty
            return;
        }

        let mut count: Vec<u64> = self.words.iter().map(|w| w.count as u64).collect();
        count.resize(2 * n - 1, u64::MAX);
        let mut parent = vec![0usize; 2 * n - 1];
        let mut binary = vec![0u8; 2 * n - 1];

        let mut leaf = n as isize - 1;
        let mut node = n;
        let mut pick_min = |count: &[u64]| -> usize {
            if leaf >= 0 && count[leaf as usize] < count[node] {
                leaf -= 1;
                (leaf + 1) as usize
            } else {
                node += 1;
                node - 1
            }
        };

        for a in 0..n - 1 {
            let min1 = pick_min(&count);
            let min2 = pick_min(&count);
            count[n + a] = count[min1] + count[min2];
            parent[min1] = n + a;
            parent[min2] = n + a;
            binary[min2] = 1;
        }

        let root = 2 * n - 2;
        for (i, word) in self.words.iter_mut().enumerate() {
            let mut code = Vec::new();
            let mut point = Vec::new();
            let mut current = i;
            while current != root {
                code.push(binary[current]);
                point.push(parent[current] - n);
                current = parent[current];
            }
            code.reverse();
            point.reverse();
            word.code = code;
            word.point = point;
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn min_count(&self) -> usize {
        self.min_count
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.t2i.get(term).copied()
    }

    pub fn word(&self, index: usize) -> &VocabWord {
        &self.words[index]
    }

    pub fn words(&self) -> &[VocabWord] {
        &self.words
    }

    /// Indices of the known tokens, unknown ones are skipped.
    pub fn indices<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<usize> {
        tokens.iter().filter_map(|t| self.index_of(t.as_ref())).collect()
    }
}
