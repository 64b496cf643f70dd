use crate::corpus::Document;
use crate::error::{Doc2VecError, Result};
use crate::model::Model;
use crate::similarity::{jaccard_similarity, Similarity};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Nearest training documents for one query and the union of their tags.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub neighbors: Vec<(usize, f32)>,
    pub tags: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DiagnosticSample {
    pub document: usize,
    pub tokens: Vec<String>,
    pub actual_tags: BTreeSet<String>,
    pub predicted_tags: BTreeSet<String>,
    pub neighbors: Vec<(usize, f32)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationReport {
    /// mean Jaccard similarity over the scored documents
    pub score: f32,
    pub scored: usize,
    /// held-out documents skipped because their tag set was empty
    pub excluded: Vec<usize>,
}

pub struct Evaluator<'a> {
    model: &'a Model,
    index: Similarity,
    top_k: usize,
}

impl<'a> Evaluator<'a> {

    pub fn new(model: &'a Model) -> Evaluator<'a> {
        Evaluator {
            model,
            index: Similarity::new(model.doc_vectors()),
            top_k: model.config().top_k,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn predict<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Prediction> {
        let vec = self.model.infer_vector(tokens);
        let neighbors = self.index.find_k_most_similar(&vec, self.top_k)?;
        let tags = neighbors.iter()
            .flat_map(|(d, _)| self.model.doc_tags()[*d].iter().cloned())
            .collect();
        Ok(Prediction { neighbors, tags })
    }

    /// Scores one held-out document, failing with `EmptyTagSet` when it has no tags.
    pub fn score_document(&self, document_i: usize, document: &Document) -> Result<f32> {
        if document.tags.is_empty() {
            return Err(Doc2VecError::EmptyTagSet { document: Some(document_i) });
        }
        let prediction = self.predict(&document.tokens)?;
        jaccard_similarity(&document.tags, &prediction.tags)
    }

    /// Mean Jaccard similarity between true and retrieved tags over `held_out`.
    /// Documents without tags are left out of the mean and listed in the report.
    pub fn score_similarity(&self, held_out: &[Document]) -> Result<EvaluationReport> {

        let mut total = 0.0;
        let mut scored = 0;
        let mut excluded = Vec::new();

        for (document_i, document) in held_out.iter().enumerate() {
            match self.score_document(document_i, document) {
                Ok(sim) => {
                    total += sim;
                    scored += 1;
                },
                Err(Doc2VecError::EmptyTagSet { document }) => {
                    warn!("held-out document {:?} has no tags, excluded from the score", document);
                    excluded.push(document_i);
                },
                Err(e) => return Err(e),
            }
        }

        if scored == 0 {
            return Err(Doc2VecError::NoScorableDocuments { excluded: excluded.len() });
        }
        if !excluded.is_empty() {
            warn!("{} of {} held-out documents excluded for empty tag sets", excluded.len(), held_out.len());
        }

        let score = total / scored as f32;
        info!("Jaccard similarity score: {:.4} over {} documents", score, scored);
        Ok(EvaluationReport { score, scored, excluded })
    }

    /// Draws `n` documents from the training set and logs actual against predicted tags.
    pub fn sample_test(&self, documents: &[Document], n: usize, seed: u64) -> Result<Vec<DiagnosticSample>> {

        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut samples = Vec::with_capacity(n);
        for _ in 0..n {
            let docid = rng.gen_range(0..documents.len());
            let document = &documents[docid];
            let prediction = self.predict(&document.tokens)?;

            info!("Plots: {}", document.tokens.join(" "));
            info!("... Actual tags: {}", document.tags.iter().cloned().collect::<Vec<String>>().join(", "));
            info!("... Predicted tags: {:?}", prediction.neighbors.iter()
                .map(|(d, score)| (self.model.doc_tags()[*d].iter().cloned().collect::<Vec<String>>().join("|"), *score))
                .collect::<Vec<(String, f32)>>());

            samples.push(DiagnosticSample {
                document: docid,
                tokens: document.tokens.clone(),
                actual_tags: document.tags.clone(),
                predicted_tags: prediction.tags,
                neighbors: prediction.neighbors,
            });
        }
        Ok(samples)
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::config::{Algorithm, TrainConfig};
    use crate::train::Trainer;

    fn corpus() -> Vec<Document> {
        let mut docs = Vec::new();
        for i in 0..6 {
            docs.push(Document::new(format!("goal match striker keeper league {}", i % 2).split(' '), ["sport"]));
            docs.push(Document::new(format!("vote senate ballot election party {}", i % 2).split(' '), ["politics"]));
        }
        docs
    }

    fn model(docs: &[Document]) -> Model {
        let config = TrainConfig {
            dimensionality: 12,
            negative_samples: 3,
            min_term_count: 1,
            workers: 2,
            num_passes: 5,
            top_k: 2,
            ..TrainConfig::default()
        };
        Trainer::new(config).unwrap().build_vocab(docs).unwrap().train(docs).unwrap()
    }

    // 20 documents per topic, each 12 tokens drawn from the topic's own terms
    fn two_topic_corpus() -> Vec<Document> {
        let sport = ["goal", "match", "striker", "keeper", "league", "referee", "penalty", "stadium"];
        let politics = ["vote", "senate", "ballot", "election", "party", "minister", "debate", "policy"];
        let mut rng = StdRng::seed_from_u64(11);
        let mut docs = Vec::new();
        for _ in 0..20 {
            for (terms, tag) in [(&sport, "sport"), (&politics, "politics")] {
                let tokens: Vec<&str> = (0..12).map(|_| terms[rng.gen_range(0..terms.len())]).collect();
                docs.push(Document::new(tokens, [tag]));
            }
        }
        docs
    }

    #[test]
    fn held_out_topics_retrieve_their_own_tags() {
        let docs = two_topic_corpus();
        for algorithm in [Algorithm::Dbow, Algorithm::Dm] {
            let config = TrainConfig {
                algorithm,
                dimensionality: 16,
                negative_samples: 5,
                min_term_count: 1,
                workers: 1,
                num_passes: 30,
                infer_steps: 50,
                top_k: 3,
                ..TrainConfig::default()
            };
            let model = Trainer::new(config).unwrap().build_vocab(&docs).unwrap().train(&docs).unwrap();
            let evaluator = Evaluator::new(&model);

            let sport = evaluator.predict(&["penalty", "striker", "goal", "stadium", "keeper", "match"]).unwrap();
            assert_eq!(sport.tags, BTreeSet::from(["sport".to_string()]), "{:?}", algorithm);

            let politics = evaluator.predict(&["ballot", "senate", "policy", "debate", "vote", "party"]).unwrap();
            assert_eq!(politics.tags, BTreeSet::from(["politics".to_string()]), "{:?}", algorithm);
        }
    }

    #[test]
    fn prediction_unions_neighbor_tags() {
        let docs = corpus();
        let model = model(&docs);
        let evaluator = Evaluator::new(&model);
        let prediction = evaluator.predict(&["goal", "keeper"]).unwrap();
        assert_eq!(prediction.neighbors.len(), 2);

        let expected: BTreeSet<String> = prediction.neighbors.iter()
            .flat_map(|(d, _)| docs[*d].tags.iter().cloned())
            .collect();
        assert_eq!(prediction.tags, expected);
    }

    #[test]
    fn score_is_a_mean_in_unit_interval() {
        let docs = corpus();
        let model = model(&docs);
        let held_out = vec![
            Document::new("striker goal league".split(' '), ["sport"]),
            Document::new("ballot party vote".split(' '), ["politics"]),
        ];
        let report = Evaluator::new(&model).score_similarity(&held_out).unwrap();
        assert_eq!(report.scored, 2);
        assert!(report.excluded.is_empty());
        assert!(report.score.is_finite() && (0.0..=1.0).contains(&report.score));
    }

    #[test]
    fn empty_tag_sets_are_excluded_and_reported() {
        let docs = corpus();
        let model = model(&docs);
        let untagged: [&str; 0] = [];
        let held_out = vec![
            Document::new("striker goal".split(' '), ["sport"]),
            Document::new("ballot vote".split(' '), untagged),
        ];
        let evaluator = Evaluator::new(&model);
        assert!(matches!(
            evaluator.score_document(1, &held_out[1]),
            Err(Doc2VecError::EmptyTagSet { document: Some(1) })
        ));

        let report = evaluator.score_similarity(&held_out).unwrap();
        assert_eq!(report.scored, 1);
        assert_eq!(report.excluded, vec![1]);
    }

    #[test]
    fn all_untagged_is_an_error() {
        let docs = corpus();
        let model = model(&docs);
        let untagged: [&str; 0] = [];
        let held_out = vec![Document::new(["vote"], untagged)];
        assert!(matches!(
            Evaluator::new(&model).score_similarity(&held_out),
            Err(Doc2VecError::NoScorableDocuments { excluded: 1 })
        ));
    }

    #[test]
    fn sampling_training_documents_never_fails() {
        let docs = corpus();
        let model = model(&docs);
        let samples = Evaluator::new(&model).with_top_k(3).sample_test(&docs, 15, 7).unwrap();
        assert_eq!(samples.len(), 15);
        for sample in &samples {
            assert_eq!(sample.actual_tags, docs[sample.document].tags);
            assert_eq!(sample.neighbors.len(), 3);
            assert!(!sample.predicted_tags.is_empty());
        }
    }
}
