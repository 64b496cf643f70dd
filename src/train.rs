use crate::config::{Algorithm, TrainConfig};
use crate::corpus::Document;
use crate::error::{Doc2VecError, Result};
use crate::matrix::SharedMatrix;
use crate::model::Model;
use crate::output::OutputLayer;
use crate::vocab::Vocabulary;
use ndarray::prelude::*;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::time::Instant;
use tracing::{debug, info};


/// Linear decay from `initial` towards `floor` in `steps` equal decrements.
/// Step `i` runs at `initial - i * (initial - floor) / steps`, so the first step
/// uses `initial` and the last one sits one decrement above `floor`.
#[derive(Clone, Copy, Debug)]
pub struct LearningRateSchedule {
    initial: f32,
    floor: f32,
    steps: usize,
}

impl LearningRateSchedule {

    pub fn new(initial: f32, floor: f32, steps: usize) -> Self {
        Self { initial, floor, steps: steps.max(1) }
    }

    pub fn step_size(&self) -> f32 {
        (self.initial - self.floor) / self.steps as f32
    }

    pub fn rate_at(&self, step: usize) -> f32 {
        (self.initial - step as f32 * self.step_size()).max(self.floor)
    }

    pub fn rates(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.steps).map(move |i| self.rate_at(i))
    }
}

/// Weights shared by training and inference. Document vectors live apart so
/// inference can work on a private vector.
pub(crate) struct Layers {
    pub word_vectors: SharedMatrix,
    pub output: OutputLayer,
}

/// Random matrix initialization, scaled down by the dimensionality.
pub(crate) fn init_vectors<R: Rng>(n_rows: usize, dim: usize, rng: &mut R) -> Array2<f32> {
    Array::random_using((n_rows, dim), Uniform::new(-0.5f32, 0.5f32), rng) / dim as f32
}

/// Per-document generator, independent of which worker picks the document up.
pub(crate) fn document_rng(seed: u64, epoch: usize, document: usize) -> StdRng {
    let mixed = seed
        ^ (epoch as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (document as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    StdRng::seed_from_u64(mixed)
}

/// Runs every SGD update one document contributes, writing into `doc_vec`.
/// With `learn` off the word vectors and the output layer are only read.
/// Returns the summed loss and the number of updates.
#[allow(clippy::too_many_arguments)]
pub(crate) fn train_document<R: Rng>(
    layers: &Layers,
    algorithm: Algorithm,
    window: usize,
    doc_vec: &mut Array1<f32>,
    words: &[usize],
    alpha: f32,
    rng: &mut R,
    learn: bool,
) -> (f32, usize) {

    let mut loss = 0.0;

    match algorithm {
        Algorithm::Dbow => {
            for &word in words {
                let (neu1e, l) = layers.output.gradient_and_update(word, &doc_vec.view(), alpha, rng, learn);
                *doc_vec += &neu1e;
                loss += l;
            }
        },
        Algorithm::Dm => {
            for (pos, &word) in words.iter().enumerate() {

                // shrink the window at random, the way word2vec does
                let reduced = rng.gen_range(0..window);
                let start = pos.saturating_sub(window - reduced);
                let context = &words[start..pos];

                let mut l1 = doc_vec.clone();
                for &c in context {
                    layers.word_vectors.add_row_into(c, &mut l1);
                }
                l1 /= (context.len() + 1) as f32;

                let (neu1e, l) = layers.output.gradient_and_update(word, &l1.view(), alpha, rng, learn);
                *doc_vec += &neu1e;
                if learn {
                    for &c in context {
                        layers.word_vectors.scaled_add(c, 1.0, &neu1e.view());
                    }
                }
                loss += l;
            }
        }
    }

    (loss, words.len())
}

/// Trainer before any corpus has been seen.
pub struct Trainer {
    config: TrainConfig,
}

/// Trainer with a vocabulary, ready to run the epochs.
pub struct PreparedTrainer {
    config: TrainConfig,
    vocab: Vocabulary,
}

impl Trainer {

    pub fn new(config: TrainConfig) -> Result<Trainer> {
        config.validate()?;
        Ok(Trainer { config })
    }

    pub fn build_vocab(self, documents: &[Document]) -> Result<PreparedTrainer> {
        let vocab = Vocabulary::build(documents, self.config.min_term_count, self.config.hierarchical_softmax)?;
        Ok(PreparedTrainer { config: self.config, vocab })
    }
}

impl PreparedTrainer {

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Runs exactly `num_passes` epochs over `documents` and returns the trained
    /// model. Row `i` of the document vectors belongs to `documents[i]`.
    pub fn train(self, documents: &[Document]) -> Result<Model> {

        if documents.is_empty() {
            return Err(Doc2VecError::config("documents", "no training documents"));
        }

        let PreparedTrainer { config, vocab } = self;
        let dim = config.dimensionality;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let layers = Layers {
            word_vectors: SharedMatrix::from_array(init_vectors(vocab.len(), dim, &mut rng)),
            output: OutputLayer::new(&config, &vocab)?,
        };
        let doc_vectors = SharedMatrix::from_array(init_vectors(documents.len(), dim, &mut rng));

        // documents are read-only from here on, resolve their terms once
        let indexed: Vec<Vec<usize>> = documents.iter().map(|doc| vocab.indices(&doc.tokens)).collect();

        let pool = ThreadPoolBuilder::new().num_threads(config.workers).build()?;
        let schedule = LearningRateSchedule::new(config.initial_lr, config.floor_lr, config.num_passes);
        let mut order = (0..documents.len()).collect::<Vec<usize>>();

        for (epoch, alpha) in schedule.rates().enumerate() {

            let timer = Instant::now();
            order.shuffle(&mut rng);

            // the parallel iterator only returns once every document is done,
            // which is the barrier between two epochs
            let (epoch_loss, updates) = pool.install(|| {
                order.par_iter().map(|&d| {
                    let mut doc_rng = document_rng(config.seed, epoch, d);
                    let mut doc_vec = doc_vectors.row(d);
                    let result = train_document(
                        &layers, config.algorithm, config.window, &mut doc_vec, &indexed[d], alpha, &mut doc_rng, true,
                    );
                    doc_vectors.set_row(d, &doc_vec.view());
                    result
                }).reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1))
            });

            info!(
                "finished epoch {} / {}, lr {:.5}, loss is {:.4}, took: {} seconds...",
                epoch + 1, config.num_passes, alpha, epoch_loss / updates.max(1) as f32, timer.elapsed().as_secs()
            );
        }

        debug!("trained {} document vectors over {} terms", documents.len(), vocab.len());

        Ok(Model::new(
            config,
            vocab,
            layers,
            doc_vectors.into_array(),
            documents.iter().map(|doc| doc.tags.clone()).collect(),
        ))
    }
}
