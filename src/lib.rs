mod matrix;
mod output;
mod infer;
pub mod config;
pub mod corpus;
pub mod error;
pub mod evaluate;
pub mod model;
pub mod pipeline;
pub mod similarity;
pub mod train;
pub mod vocab;

pub use config::{files_handling, Algorithm, Config, PipelineConfig, TrainConfig};
pub use corpus::{split_train_test, CorpusSource, Document, JsonLinesSource, JsonRecord, LabeledCorpus, RawRecord, SourceRecord, Split, Tokenizer};
pub use error::{Doc2VecError, Result};
pub use evaluate::{DiagnosticSample, EvaluationReport, Evaluator, Prediction};
pub use model::Model;
pub use pipeline::{BuildModel, BuildReport, Pipeline};
pub use similarity::{jaccard_similarity, Similarity};
pub use train::{LearningRateSchedule, PreparedTrainer, Trainer};
pub use vocab::{VocabWord, Vocabulary};
