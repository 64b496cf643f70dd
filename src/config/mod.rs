pub mod files_handling;

use crate::error::{Doc2VecError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::fs;
use std::str::FromStr;

/// Which paragraph-vector objective the trainer optimizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// distributed bag of words, the document vector alone predicts each term
    Dbow,
    /// distributed memory, document vector averaged with preceding context words
    Dm,
}

impl FromStr for Algorithm {
    type Err = Doc2VecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dbow" | "bow" | "pv-dbow" | "0" => Ok(Algorithm::Dbow),
            "dm" | "memory" | "pv-dm" | "1" => Ok(Algorithm::Dm),
            other => Err(Doc2VecError::config("algorithm", format!("unknown variant '{}'", other))),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Dbow => write!(f, "dbow"),
            Algorithm::Dm => write!(f, "dm"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub algorithm: Algorithm,
    pub dimensionality: usize,
    pub window: usize,
    pub negative_samples: usize,
    pub hierarchical_softmax: bool,
    pub min_term_count: usize,
    pub workers: usize,
    pub num_passes: usize,
    pub initial_lr: f32,
    pub floor_lr: f32,
    pub infer_steps: usize,
    pub top_k: usize,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Dbow,
            dimensionality: 150,
            window: 5,
            negative_samples: 5,
            hierarchical_softmax: false,
            min_term_count: 2,
            workers: 3,
            num_passes: 10,
            initial_lr: 0.025,
            floor_lr: 0.001,
            infer_steps: 10,
            top_k: 3,
            seed: 42,
        }
    }
}

impl TrainConfig {

    /// Checks ranges and the output layer choice before any training work begins.
    pub fn validate(&self) -> Result<()> {

        if self.dimensionality == 0 {
            return Err(Doc2VecError::config("dimensionality", "must be positive"));
        }
        if self.negative_samples > 0 && self.hierarchical_softmax {
            return Err(Doc2VecError::config(
                "hierarchical_softmax",
                format!("cannot be combined with negative_samples={}", self.negative_samples),
            ));
        }
        if self.negative_samples == 0 && !self.hierarchical_softmax {
            return Err(Doc2VecError::config(
                "negative_samples",
                "is 0 and hierarchical_softmax is off, no output layer selected",
            ));
        }
        if self.min_term_count == 0 {
            return Err(Doc2VecError::config("min_term_count", "must be at least 1"));
        }
        if self.workers == 0 {
            return Err(Doc2VecError::config("workers", "must be at least 1"));
        }
        if self.num_passes == 0 {
            return Err(Doc2VecError::config("num_passes", "must be at least 1"));
        }
        if self.infer_steps == 0 {
            return Err(Doc2VecError::config("infer_steps", "must be at least 1"));
        }
        if self.top_k == 0 {
            return Err(Doc2VecError::config("top_k", "must be at least 1"));
        }
        if self.algorithm == Algorithm::Dm && self.window == 0 {
            return Err(Doc2VecError::config("window", "must be at least 1 for the dm algorithm"));
        }
        if !(self.initial_lr > 0.0 && self.initial_lr < 1.0) {
            return Err(Doc2VecError::config("initial_lr", format!("{} is outside (0, 1)", self.initial_lr)));
        }
        if !(self.floor_lr > 0.0 && self.floor_lr < self.initial_lr) {
            return Err(Doc2VecError::config(
                "floor_lr",
                format!("{} is outside (0, initial_lr={})", self.floor_lr, self.initial_lr),
            ));
        }
        Ok(())
    }
}

impl Display for TrainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "training hyper parameters:
        algorithm: {},
        dimensionality: {},
        window: {},
        negative_samples: {},
        hierarchical_softmax: {},
        min_term_count: {},
        workers: {},
        num_passes: {},
        initial_lr: {},
        floor_lr: {},
        infer_steps: {},
        top_k: {},
        seed: {}",
        self.algorithm, self.dimensionality, self.window, self.negative_samples, self.hierarchical_softmax,
        self.min_term_count, self.workers, self.num_passes, self.initial_lr, self.floor_lr,
        self.infer_steps, self.top_k, self.seed
        )
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub corpus_file: String,
    pub output_dir: String,
    pub limit: Option<usize>,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub diagnostic_samples: usize,
    pub train: TrainConfig,
}

impl Display for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "using hyper-params:
        corpus_file: {}
        output_dir: {}
        limit: {:?}
        test_fraction: {}
        split_seed: {}
        diagnostic_samples: {},
        Using {}",
        self.corpus_file, self.output_dir, self.limit, self.test_fraction, self.split_seed,
        self.diagnostic_samples, self.train)
    }
}

pub struct Config {
    params: PipelineConfig
}

impl Config {

    pub fn get_params(&self) -> PipelineConfig {
        self.params.clone()
    }

    pub fn new(args: &[String]) -> Result<Config> {

        if args.len() != 2 {
            return Err(Doc2VecError::config("args", "input should be a path to json file only"));
        }

        let f = fs::File::open(&args[1])?;
        let json: Value = serde_json::from_reader(f)?;
        Config::from_json(&json)
    }

    /// Builds the configuration from a parsed json object, falling back to defaults
    /// for every field except the corpus and output locations.
    pub fn from_json(json: &Value) -> Result<Config> {

        let corpus_file = required_str(json, "corpus_file")?;
        let output_dir = required_str(json, "output_dir")?;

        let defaults = TrainConfig::default();
        let algorithm = match json.get("algorithm") {
            Some(Value::String(s)) => s.parse()?,
            Some(Value::Number(n)) => n.to_string().parse()?,
            Some(_) => return Err(Doc2VecError::config("algorithm", "expected a string")),
            None => defaults.algorithm
        };
        let hierarchical_softmax = match json.get("hierarchical_softmax") {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_u64() == Some(1),
            Some(_) => return Err(Doc2VecError::config("hierarchical_softmax", "expected a boolean")),
            None => defaults.hierarchical_softmax
        };
        let limit = match json.get("limit") {
            Some(Value::Null) | None => None,
            Some(_) => Some(optional_usize(json, "limit", 0)?)
        };

        let train = TrainConfig {
            algorithm,
            dimensionality: optional_usize(json, "dimensionality", defaults.dimensionality)?,
            window: optional_usize(json, "window", defaults.window)?,
            negative_samples: optional_usize(json, "negative_samples", defaults.negative_samples)?,
            hierarchical_softmax,
            min_term_count: optional_usize(json, "min_term_count", defaults.min_term_count)?,
            workers: optional_usize(json, "workers", defaults.workers)?,
            num_passes: optional_usize(json, "num_passes", defaults.num_passes)?,
            initial_lr: optional_f64(json, "initial_lr", defaults.initial_lr as f64)? as f32,
            floor_lr: optional_f64(json, "floor_lr", defaults.floor_lr as f64)? as f32,
            infer_steps: optional_usize(json, "infer_steps", defaults.infer_steps)?,
            top_k: optional_usize(json, "top_k", defaults.top_k)?,
            seed: optional_usize(json, "seed", defaults.seed as usize)? as u64,
        };

        let test_fraction = optional_f64(json, "test_fraction", 0.1)?;
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(Doc2VecError::config("test_fraction", format!("{} is outside (0, 1)", test_fraction)));
        }

        let params = PipelineConfig {
            corpus_file,
            output_dir,
            limit,
            test_fraction,
            split_seed: optional_usize(json, "split_seed", 42)? as u64,
            diagnostic_samples: optional_usize(json, "diagnostic_samples", 15)?,
            train,
        };

        params.train.validate()?;

        Ok(Self { params })
    }

}

fn required_str(json: &Value, field: &'static str) -> Result<String> {
    match json.get(field).and_then(Value::as_str) {
        Some(s) => Ok(s.to_owned()),
        None => Err(Doc2VecError::config(field, "was not supplied through json as a string")),
    }
}

fn optional_usize(json: &Value, field: &'static str, default: usize) -> Result<usize> {
    match json.get(field) {
        Some(v) => v.as_u64().map(|x| x as usize)
            .ok_or_else(|| Doc2VecError::config(field, format!("{} is not a non-negative integer", v))),
        None => Ok(default)
    }
}

fn optional_f64(json: &Value, field: &'static str, default: f64) -> Result<f64> {
    match json.get(field) {
        Some(v) => v.as_f64()
            .ok_or_else(|| Doc2VecError::config(field, format!("{} is not numeric", v))),
        None => Ok(default)
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_fields() {
        let json = json!({"corpus_file": "corpus.jsonl", "output_dir": "Output"});
        let params = Config::from_json(&json).unwrap().get_params();
        assert_eq!(params.train, TrainConfig::default());
        assert_eq!(params.limit, None);
        assert_eq!(params.diagnostic_samples, 15);
        assert!((params.test_fraction - 0.1).abs() < 1e-12);
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let json = json!({
            "corpus_file": "c.jsonl", "output_dir": "o", "algorithm": "dm",
            "dimensionality": 20, "negative_samples": 0, "hierarchical_softmax": true,
            "limit": 500, "num_passes": 4
        });
        let params = Config::from_json(&json).unwrap().get_params();
        assert_eq!(params.train.algorithm, Algorithm::Dm);
        assert_eq!(params.train.dimensionality, 20);
        assert!(params.train.hierarchical_softmax);
        assert_eq!(params.limit, Some(500));
        assert_eq!(params.train.num_passes, 4);
    }

    #[test]
    fn missing_corpus_is_reported() {
        let json = json!({"output_dir": "o"});
        match Config::from_json(&json) {
            Err(Doc2VecError::InvalidConfiguration { field, .. }) => assert_eq!(field, "corpus_file"),
            other => panic!("unexpected {:?}", other.map(|c| c.get_params())),
        }
    }

    #[test]
    fn conflicting_output_layers_are_rejected() {
        let config = TrainConfig { negative_samples: 5, hierarchical_softmax: true, ..TrainConfig::default() };
        match config.validate() {
            Err(Doc2VecError::InvalidConfiguration { field, .. }) => assert_eq!(field, "hierarchical_softmax"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_output_layer_is_rejected() {
        let config = TrainConfig { negative_samples: 0, hierarchical_softmax: false, ..TrainConfig::default() };
        assert!(matches!(config.validate(), Err(Doc2VecError::InvalidConfiguration { field: "negative_samples", .. })));
    }

    #[test]
    fn ranges_are_checked() {
        let zero_dim = TrainConfig { dimensionality: 0, ..TrainConfig::default() };
        assert!(matches!(zero_dim.validate(), Err(Doc2VecError::InvalidConfiguration { field: "dimensionality", .. })));

        let floor_above = TrainConfig { floor_lr: 0.5, ..TrainConfig::default() };
        assert!(matches!(floor_above.validate(), Err(Doc2VecError::InvalidConfiguration { field: "floor_lr", .. })));

        let no_workers = TrainConfig { workers: 0, ..TrainConfig::default() };
        assert!(matches!(no_workers.validate(), Err(Doc2VecError::InvalidConfiguration { field: "workers", .. })));
    }

    #[test]
    fn algorithm_aliases_parse() {
        assert_eq!("bow".parse::<Algorithm>().unwrap(), Algorithm::Dbow);
        assert_eq!("PV-DM".parse::<Algorithm>().unwrap(), Algorithm::Dm);
        assert!("skipgram".parse::<Algorithm>().is_err());
    }
}
