use crate::config::files_handling::{read_input, save_output};
use crate::config::TrainConfig;
use crate::error::{Doc2VecError, Result};
use crate::matrix::SharedMatrix;
use crate::output::OutputLayer;
use crate::train::Layers;
use crate::vocab::Vocabulary;
use ndarray::Array2;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

const CONFIG_FILE: &str = "config";
const VOCAB_FILE: &str = "vocab";
const WORDS_FILE: &str = "word_vectors";
const DOCS_FILE: &str = "doc_vectors";
const OUTPUT_FILE: &str = "output_weights";
const TAGS_FILE: &str = "documents";

/// A trained paragraph-vector model. Nothing here is mutated after training;
/// inference works on vectors it allocates itself.
pub struct Model {
    config: TrainConfig,
    vocab: Vocabulary,
    layers: Layers,
    doc_vectors: Array2<f32>,
    doc_tags: Vec<BTreeSet<String>>,
}

impl Model {

    pub(crate) fn new(
        config: TrainConfig,
        vocab: Vocabulary,
        layers: Layers,
        doc_vectors: Array2<f32>,
        doc_tags: Vec<BTreeSet<String>>,
    ) -> Model {
        Model { config, vocab, layers, doc_vectors, doc_tags }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// One row per training document, in training order.
    pub fn doc_vectors(&self) -> &Array2<f32> {
        &self.doc_vectors
    }

    pub fn doc_tags(&self) -> &[BTreeSet<String>] {
        &self.doc_tags
    }

    pub fn word_vectors(&self) -> Array2<f32> {
        self.layers.word_vectors.to_array()
    }

    pub fn output_weights(&self) -> Array2<f32> {
        self.layers.output.weights().to_array()
    }

    pub(crate) fn layers(&self) -> &Layers {
        &self.layers
    }

    /// Writes parameters, vocabulary, document tags and configuration under `output_dir`.
    pub fn save(&self, output_dir: impl AsRef<Path>) -> Result<()> {
        let output_dir = output_dir.as_ref();
        save_output(output_dir, CONFIG_FILE, &self.config)?;
        save_output(output_dir, VOCAB_FILE, &self.vocab)?;
        save_output(output_dir, WORDS_FILE, &self.word_vectors())?;
        save_output(output_dir, DOCS_FILE, &self.doc_vectors)?;
        save_output(output_dir, OUTPUT_FILE, &self.output_weights())?;
        save_output(output_dir, TAGS_FILE, &self.doc_tags)?;
        info!("saved model to {}", output_dir.display());
        Ok(())
    }

    pub fn load(input_dir: impl AsRef<Path>) -> Result<Model> {

        let input_dir = input_dir.as_ref();
        let config: TrainConfig = read_input(input_dir, CONFIG_FILE)?;
        config.validate()?;
        let vocab: Vocabulary = read_input(input_dir, VOCAB_FILE)?;
        let word_vectors: Array2<f32> = read_input(input_dir, WORDS_FILE)?;
        let doc_vectors: Array2<f32> = read_input(input_dir, DOCS_FILE)?;
        let output_weights: Array2<f32> = read_input(input_dir, OUTPUT_FILE)?;
        let doc_tags: Vec<BTreeSet<String>> = read_input(input_dir, TAGS_FILE)?;

        if word_vectors.dim() != (vocab.len(), config.dimensionality) {
            return Err(Doc2VecError::config(
                "word_vectors",
                format!("shape {:?} does not match {} terms x {}", word_vectors.dim(), vocab.len(), config.dimensionality),
            ));
        }
        if doc_vectors.dim() != (doc_tags.len(), config.dimensionality) {
            return Err(Doc2VecError::config(
                "doc_vectors",
                format!("shape {:?} does not match {} documents x {}", doc_vectors.dim(), doc_tags.len(), config.dimensionality),
            ));
        }

        let layers = Layers {
            word_vectors: SharedMatrix::from_array(word_vectors),
            output: OutputLayer::from_weights(&config, &vocab, output_weights)?,
        };
        info!("loaded model with {} terms and {} documents from {}", vocab.len(), doc_tags.len(), input_dir.display());
        Ok(Model { config, vocab, layers, doc_vectors, doc_tags })
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::config::Algorithm;
    use crate::corpus::Document;
    use crate::train::Trainer;

    fn trained(algorithm: Algorithm, hierarchical: bool) -> Model {
        let corpus = vec![
            Document::new("red green blue red".split(' '), ["colors"]),
            Document::new("one two three two".split(' '), ["numbers", "counting"]),
            Document::new("blue two red one".split(' '), ["mixed"]),
        ];
        let config = TrainConfig {
            algorithm,
            dimensionality: 6,
            negative_samples: if hierarchical { 0 } else { 2 },
            hierarchical_softmax: hierarchical,
            min_term_count: 1,
            workers: 1,
            num_passes: 2,
            ..TrainConfig::default()
        };
        Trainer::new(config).unwrap().build_vocab(&corpus).unwrap().train(&corpus).unwrap()
    }

    #[test]
    fn save_then_load_restores_everything() {
        for (algorithm, hierarchical) in [(Algorithm::Dbow, false), (Algorithm::Dm, true)] {
            let model = trained(algorithm, hierarchical);
            let dir = tempfile::tempdir().unwrap();
            model.save(dir.path()).unwrap();

            let back = Model::load(dir.path()).unwrap();
            assert_eq!(back.config(), model.config());
            assert_eq!(back.vocab(), model.vocab());
            assert_eq!(back.doc_vectors(), model.doc_vectors());
            assert_eq!(back.word_vectors(), model.word_vectors());
            assert_eq!(back.output_weights(), model.output_weights());
            assert_eq!(back.doc_tags(), model.doc_tags());
        }
    }

    #[test]
    fn load_rejects_inconsistent_artifacts() {
        let model = trained(Algorithm::Dbow, false);
        let dir = tempfile::tempdir().unwrap();
        model.save(dir.path()).unwrap();

        let truncated: Vec<BTreeSet<String>> = model.doc_tags()[..1].to_vec();
        save_output(dir.path(), TAGS_FILE, &truncated).unwrap();
        assert!(matches!(Model::load(dir.path()), Err(Doc2VecError::InvalidConfiguration { field: "doc_vectors", .. })));
    }

    #[test]
    fn load_from_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Model::load(dir.path().join("nope")).is_err());
    }
}
