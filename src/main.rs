use doc2vec_trainer::Pipeline;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// usage: doc2vec_trainer <config.json>
// the config names the json-lines corpus and the output directory

fn main() -> ExitCode {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("doc2vec_trainer=info".parse().expect("static directive")))
        .init();

    match Pipeline::run() {
        Ok(report) => {
            info!(
                "done: {} terms, {} training / {} held-out documents, Jaccard score {:.4}",
                report.vocab_size, report.train_docs, report.test_docs, report.evaluation.score
            );
            ExitCode::SUCCESS
        },
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
