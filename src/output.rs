use crate::config::TrainConfig;
use crate::error::{Doc2VecError, Result};
use crate::matrix::SharedMatrix;
use crate::vocab::Vocabulary;
use ndarray::{Array1, Array2, ArrayView1};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

// logits are clipped to this range before the sigmoid
const MAX_EXP: f32 = 6.0;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x.clamp(-MAX_EXP, MAX_EXP)).exp())
}

/// Output side of the model. Both variants take the hidden vector `l1` for one
/// target term and return the error to push back into the input vectors plus
/// the negative log-likelihood of the prediction.
pub enum OutputLayer {
    NegativeSampling(NegativeSamplingOutput),
    HierarchicalSoftmax(HierarchicalSoftmaxOutput),
}

pub struct NegativeSamplingOutput {
    weights: SharedMatrix,
    negative: usize,
    noise: WeightedIndex<f64>,
}

pub struct HierarchicalSoftmaxOutput {
    weights: SharedMatrix,
    codes: Vec<Vec<u8>>,
    points: Vec<Vec<usize>>,
}

impl OutputLayer {

    /// Fresh, zero-initialized output layer for the configured variant.
    pub fn new(config: &TrainConfig, vocab: &Vocabulary) -> Result<OutputLayer> {
        let rows = if config.hierarchical_softmax {
            vocab.len().saturating_sub(1)
        } else {
            vocab.len()
        };
        OutputLayer::from_weights(config, vocab, Array2::zeros((rows, config.dimensionality)))
    }

    /// Output layer over already trained weights, as read back from disk.
    pub fn from_weights(config: &TrainConfig, vocab: &Vocabulary, weights: Array2<f32>) -> Result<OutputLayer> {

        let expected_rows = if config.hierarchical_softmax { vocab.len().saturating_sub(1) } else { vocab.len() };
        if weights.nrows() != expected_rows || weights.ncols() != config.dimensionality {
            return Err(Doc2VecError::config(
                "output_weights",
                format!("shape {:?} does not match vocabulary ({} rows x {})", weights.dim(), expected_rows, config.dimensionality),
            ));
        }
        let weights = SharedMatrix::from_array(weights);

        if config.hierarchical_softmax {
            Ok(OutputLayer::HierarchicalSoftmax(HierarchicalSoftmaxOutput {
                weights,
                codes: vocab.words().iter().map(|w| w.code.clone()).collect(),
                points: vocab.words().iter().map(|w| w.point.clone()).collect(),
            }))
        } else {
            // unigram distribution raised to 3/4, as in word2vec
            let noise = WeightedIndex::new(vocab.words().iter().map(|w| (w.count as f64).powf(0.75)))
                .map_err(|e| Doc2VecError::config("negative_samples", e.to_string()))?;
            Ok(OutputLayer::NegativeSampling(NegativeSamplingOutput {
                weights,
                negative: config.negative_samples,
                noise,
            }))
        }
    }

    pub fn weights(&self) -> &SharedMatrix {
        match self {
            OutputLayer::NegativeSampling(ns) => &ns.weights,
            OutputLayer::HierarchicalSoftmax(hs) => &hs.weights,
        }
    }

    /// One gradient step for predicting `target` from `l1`. Output weights are
    /// only written when `learn` is set, inference runs with it off.
    pub fn gradient_and_update<R: Rng>(
        &self,
        target: usize,
        l1: &ArrayView1<f32>,
        alpha: f32,
        rng: &mut R,
        learn: bool,
    ) -> (Array1<f32>, f32) {
        match self {
            OutputLayer::NegativeSampling(ns) => ns.gradient_and_update(target, l1, alpha, rng, learn),
            OutputLayer::HierarchicalSoftmax(hs) => hs.gradient_and_update(target, l1, alpha, learn),
        }
    }
}

impl NegativeSamplingOutput {

    fn gradient_and_update<R: Rng>(
        &self,
        target: usize,
        l1: &ArrayView1<f32>,
        alpha: f32,
        rng: &mut R,
        learn: bool,
    ) -> (Array1<f32>, f32) {

        let mut neu1e = Array1::zeros(l1.len());
        let mut loss = 0.0;

        for d in 0..=self.negative {
            let (word, label) = if d == 0 {
                (target, 1.0)
            } else {
                let word = self.noise.sample(rng);
                if word == target {
                    continue;
                }
                (word, 0.0)
            };

            let row = self.weights.row(word);
            let f = row.dot(l1);
            let p = sigmoid(f);
            loss -= if label > 0.0 { p.ln() } else { (1.0 - p).ln() };

            let g = (label - p) * alpha;
            neu1e.scaled_add(g, &row);
            if learn {
                self.weights.scaled_add(word, g, l1);
            }
        }

        (neu1e, loss)
    }
}

impl HierarchicalSoftmaxOutput {

    fn gradient_and_update(
        &self,
        target: usize,
        l1: &ArrayView1<f32>,
        alpha: f32,
        learn: bool,
    ) -> (Array1<f32>, f32) {

        let mut neu1e = Array1::zeros(l1.len());
        let mut loss = 0.0;

        // bit 0 means "go left", trained towards sigmoid = 1
        for (bit, node) in self.codes[target].iter().zip(&self.points[target]) {
            let row = self.weights.row(*node);
            let f = row.dot(l1);
            let p = sigmoid(f);
            let label = 1.0 - *bit as f32;
            loss -= if *bit == 0 { p.ln() } else { (1.0 - p).ln() };

            let g = (label - p) * alpha;
            neu1e.scaled_add(g, &row);
            if learn {
                self.weights.scaled_add(*node, g, l1);
            }
        }

        (neu1e, loss)
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::corpus::Document;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn vocab(hierarchical: bool) -> Vocabulary {
        let docs = vec![Document::new("a b c d a b a".split(' '), ["t"])];
        Vocabulary::build(&docs, 1, hierarchical).unwrap()
    }

    fn config(hierarchical: bool) -> TrainConfig {
        TrainConfig {
            dimensionality: 2,
            negative_samples: if hierarchical { 0 } else { 3 },
            hierarchical_softmax: hierarchical,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn sigmoid_is_clipped() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert_eq!(sigmoid(100.0), sigmoid(MAX_EXP));
        assert!(sigmoid(-100.0) > 0.0);
    }

    #[test]
    fn layer_shapes_follow_variant() {
        let v = vocab(true);
        let hs = OutputLayer::new(&config(true), &v).unwrap();
        assert_eq!(hs.weights().nrows(), v.len() - 1);

        let v = vocab(false);
        let ns = OutputLayer::new(&config(false), &v).unwrap();
        assert_eq!(ns.weights().nrows(), v.len());
    }

    #[test]
    fn frozen_step_leaves_weights_untouched() {
        for hierarchical in [false, true] {
            let v = vocab(hierarchical);
            let layer = OutputLayer::new(&config(hierarchical), &v).unwrap();
            let before = layer.weights().to_array();
            let mut rng = StdRng::seed_from_u64(1);
            let l1 = array![0.3, -0.2];
            let (_, loss) = layer.gradient_and_update(0, &l1.view(), 0.1, &mut rng, false);
            assert!(loss.is_finite() && loss > 0.0);
            assert_eq!(layer.weights().to_array(), before);
        }
    }

    #[test]
    fn learning_step_lowers_loss() {
        for hierarchical in [false, true] {
            let v = vocab(hierarchical);
            let layer = OutputLayer::new(&config(hierarchical), &v).unwrap();
            let l1 = array![0.5, 0.5];
            let target = v.len() - 1;

            // hierarchical softmax has no sampling, the loss must strictly drop
            let mut rng = StdRng::seed_from_u64(3);
            let (_, first) = layer.gradient_and_update(target, &l1.view(), 0.5, &mut rng, true);
            for _ in 0..20 {
                layer.gradient_and_update(target, &l1.view(), 0.5, &mut rng, true);
            }
            if let OutputLayer::HierarchicalSoftmax(hs) = &layer {
                let (_, last) = hs.gradient_and_update(target, &l1.view(), 0.5, false);
                assert!(last < first, "{} !< {}", last, first);
            } else {
                // the positive row moved towards l1
                assert!(layer.weights().row(target).dot(&l1) > 0.0);
            }
        }
    }

    #[test]
    fn mismatched_weights_are_rejected() {
        let v = vocab(false);
        let err = OutputLayer::from_weights(&config(false), &v, Array2::zeros((1, 2)));
        assert!(matches!(err, Err(Doc2VecError::InvalidConfiguration { field: "output_weights", .. })));
    }
}
