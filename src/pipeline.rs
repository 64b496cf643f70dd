// imports
use crate::config::{Config, PipelineConfig};
use crate::corpus::{split_train_test, CorpusSource, JsonLinesSource, LabeledCorpus};
use crate::error::Result;
use crate::evaluate::{DiagnosticSample, EvaluationReport, Evaluator};
use crate::model::Model;
use crate::train::Trainer;

use std::env;
use std::time::Instant;
use tracing::info;

#[derive(Clone, Debug)]
pub struct BuildReport {
    pub vocab_size: usize,
    pub train_docs: usize,
    pub test_docs: usize,
    /// training documents left out for having no tags
    pub untagged_dropped: usize,
    pub evaluation: EvaluationReport,
    pub samples: Vec<DiagnosticSample>,
}

pub struct BuildModel {
    params: PipelineConfig,
}

impl BuildModel {

    pub fn new(params: PipelineConfig) -> Self {
        Self { params }
    }

    // runs the whole procedure on any corpus source -
    // -> labeled documents, split 90/10
    // -> vocabulary over the training side
    // -> training, saved to output_dir
    // -> held-out similarity score and a few diagnostic samples
    pub fn run<S: CorpusSource>(&self, source: &S) -> Result<(Model, BuildReport)> {

        let params = &self.params;
        params.train.validate()?;

        let documents = LabeledCorpus::build(source, params.limit)?;
        let mut split = split_train_test(documents, params.test_fraction, params.split_seed)?;
        let untagged_dropped = split.drop_untagged_training();
        info!("split into {} training and {} held-out documents", split.train.len(), split.test.len());

        let timer = Instant::now();
        info!("starting vocab building...");
        let prepared = Trainer::new(params.train.clone())?.build_vocab(&split.train)?;
        let vocab_size = prepared.vocab().len();

        info!("starting training part...");
        let model = prepared.train(&split.train)?;
        info!("finished training, took {} seconds ...", timer.elapsed().as_secs());

        model.save(&params.output_dir)?;

        let evaluator = Evaluator::new(&model);
        let evaluation = evaluator.score_similarity(&split.test)?;
        let samples = evaluator.sample_test(&split.train, params.diagnostic_samples, params.split_seed)?;

        let report = BuildReport {
            vocab_size,
            train_docs: split.train.len(),
            test_docs: split.test.len(),
            untagged_dropped,
            evaluation,
            samples,
        };
        Ok((model, report))
    }
}

pub struct Pipeline {}

impl Pipeline {

    // configuration from the json file named on the command line, corpus from
    // the json-lines file it points to
    pub fn run() -> Result<BuildReport> {

        info!("entering program...");
        let args: Vec<String> = env::args().collect();

        info!("building parameters...");
        let params = Config::new(&args)?.get_params();
        info!("{}", params);

        let source = JsonLinesSource::new(&params.corpus_file);
        let (_, report) = BuildModel::new(params).run(&source)?;
        Ok(report)
    }
}
