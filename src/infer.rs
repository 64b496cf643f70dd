use crate::model::Model;
use crate::train::{init_vectors, train_document, LearningRateSchedule};
use ndarray::{Array1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

impl Model {

    /// Document vector for unseen tokens, seeded with the training seed so the
    /// same tokens always map to the same vector.
    pub fn infer_vector<S: AsRef<str>>(&self, tokens: &[S]) -> Array1<f32> {
        self.infer_vector_seeded(tokens, self.config().seed)
    }

    /// Runs `infer_steps` passes of the training update over a fresh vector.
    /// Terms outside the vocabulary are skipped; when none is left the freshly
    /// initialized vector is returned as is. Word vectors and output weights are
    /// never written.
    pub fn infer_vector_seeded<S: AsRef<str>>(&self, tokens: &[S], seed: u64) -> Array1<f32> {

        let config = self.config();
        let words = self.vocab().indices(tokens);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut doc_vec = init_vectors(1, config.dimensionality, &mut rng).index_axis_move(Axis(0), 0);

        if words.is_empty() {
            debug!("none of {} tokens is in the vocabulary", tokens.len());
            return doc_vec;
        }

        let schedule = LearningRateSchedule::new(config.initial_lr, config.floor_lr, config.infer_steps);
        for alpha in schedule.rates() {
            train_document(self.layers(), config.algorithm, config.window, &mut doc_vec, &words, alpha, &mut rng, false);
        }
        doc_vec
    }
}
