use std::{env, fs::File, io::{self, BufRead}, process::ExitCode};
use doc2vec_trainer::{Doc2VecError, Evaluator, JsonRecord, Model, Result, Tokenizer};
use tracing::error;
use tracing_subscriber::EnvFilter;


// checks a trained model by hand: every line of the input file is treated as a
// new document, its vector is inferred and the nearest training documents are
// printed with their tags.
// treated as a binary executable so it can be run independently from training
//
// example: ... Output/model Input/plots.txt 5

fn main() -> ExitCode {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("doc2vec_trainer=warn".parse().expect("static directive")))
        .init();

    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(args: &[String]) -> Result<()> {

    if args.len() < 3 || args.len() > 4 {
        return Err(Doc2VecError::InvalidConfiguration {
            field: "args",
            reason: "expected <model dir> <input file> [k]".to_string(),
        });
    }

    let k = match args.get(3) {
        Some(k) => k.parse::<usize>().map_err(|e| Doc2VecError::InvalidConfiguration {
            field: "k",
            reason: e.to_string(),
        })?,
        None => 3
    };

    let model = Model::load(&args[1])?;
    let evaluator = Evaluator::new(&model).with_top_k(k);

    let lines = io::BufReader::new(File::open(&args[2])?).lines();
    for line in lines {
        let line = line?;
        // same tokenization as string fields of the corpus
        let tokens = JsonRecord::tokenize(&line);
        if tokens.is_empty() {
            continue;
        }

        println!("searching {} most similar documents to: {}", k, line.trim());
        let prediction = evaluator.predict(&tokens)?;
        for (i, (document, score)) in prediction.neighbors.iter().enumerate() {
            let tags = model.doc_tags()[*document].iter().cloned().collect::<Vec<String>>().join(", ");
            println!("{} : document {} [{}] = {}", i, document, tags, score);
        }
        println!("predicted tags: {}", prediction.tags.into_iter().collect::<Vec<String>>().join(", "));
        println!("\n");
    }

    Ok(())
}
