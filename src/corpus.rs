// imports
use crate::error::{Doc2VecError, Result};

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;
use tracing::{debug, info, warn};


/// A labeled document, the unit the vocabulary and the trainer work on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub tokens: Vec<String>,
    pub tags: BTreeSet<String>,
}

impl Document {
    pub fn new<T: Into<String>, G: Into<String>>(tokens: impl IntoIterator<Item = T>, tags: impl IntoIterator<Item = G>) -> Self {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// What every record coming out of a corpus source has to expose.
/// `None` means the field is absent or has the wrong shape.
pub trait SourceRecord {
    fn token_sequence(&self) -> Option<Vec<String>>;
    fn tag_set(&self) -> Option<BTreeSet<String>>;
}

/// A lazily read stream of records. Read exactly once per corpus build.
pub trait CorpusSource {
    type Record: SourceRecord;
    fn iterate(&self) -> Result<Box<dyn Iterator<Item = Result<Self::Record>> + '_>>;
}

#[derive(Clone, Debug, Default)]
pub struct RawRecord {
    pub texts: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl SourceRecord for RawRecord {
    fn token_sequence(&self) -> Option<Vec<String>> {
        self.texts.clone()
    }
    fn tag_set(&self) -> Option<BTreeSet<String>> {
        self.tags.as_ref().map(|tags| tags.iter().cloned().collect())
    }
}

impl CorpusSource for Vec<RawRecord> {
    type Record = RawRecord;
    fn iterate(&self) -> Result<Box<dyn Iterator<Item = Result<RawRecord>> + '_>> {
        Ok(Box::new(self.iter().cloned().map(Ok)))
    }
}

// field names accepted for the token sequence and for the tag set
const TOKEN_FIELDS: [&str; 3] = ["texts", "words", "tokens"];
const TAG_FIELDS: [&str; 2] = ["tags", "labels"];

/// One json object of a json-lines corpus file.
#[derive(Clone, Debug)]
pub struct JsonRecord(pub Value);

impl JsonRecord {
    fn field(&self, names: &[&str]) -> Option<&Value> {
        names.iter().find_map(|name| self.0.get(*name))
    }

    fn strings(value: &Value) -> Option<Vec<String>> {
        value.as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_owned))
            .collect()
    }
}

impl SourceRecord for JsonRecord {
    fn token_sequence(&self) -> Option<Vec<String>> {
        match self.field(&TOKEN_FIELDS)? {
            Value::String(text) => Some(JsonRecord::tokenize(text)),
            other => JsonRecord::strings(other),
        }
    }

    fn tag_set(&self) -> Option<BTreeSet<String>> {
        match self.field(&TAG_FIELDS)? {
            Value::String(tag) => Some(BTreeSet::from([tag.to_owned()])),
            other => JsonRecord::strings(other).map(|tags| tags.into_iter().collect()),
        }
    }
}

// defines the behavior needed for tokenizing raw text fields
pub trait Tokenizer {
    fn tokenize(sequence: &str) -> Vec<String>;
}

impl Tokenizer for JsonRecord {
    // trimmed, lower cased, split on whitespace
    fn tokenize(sequence: &str) -> Vec<String> {
        sequence.trim().to_lowercase().split_whitespace().map(|x| x.to_string()).collect()
    }
}

/// Corpus stored as one json object per line, e.g.
/// `{"texts": ["a", "plot"], "tags": ["drama"]}`.
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusSource for JsonLinesSource {
    type Record = JsonRecord;

    fn iterate(&self) -> Result<Box<dyn Iterator<Item = Result<JsonRecord>> + '_>> {
        let lines = BufReader::new(File::open(&self.path)?).lines();
        // blank lines are not records, the index counts records only
        let records = lines
            .filter(|line| !matches!(line, Ok(line) if line.trim().is_empty()))
            .enumerate()
            .map(|(record, line)| {
                let line = line?;
                serde_json::from_str::<Value>(&line)
                    .map(JsonRecord)
                    .map_err(|source| Doc2VecError::UnparsableRecord { record, source })
            });
        Ok(Box::new(records))
    }
}

pub struct LabeledCorpus {}

impl LabeledCorpus {

    /// Materializes the source into documents, in source order, reading at most
    /// `limit` records. The first record without tokens or tags aborts the build,
    /// a record with an empty tag set is kept but reported.
    pub fn build<S: CorpusSource>(source: &S, limit: Option<usize>) -> Result<Vec<Document>> {

        let mut documents = Vec::new();
        let records = source.iterate()?.take(limit.unwrap_or(usize::MAX));
        for (record_i, record) in records.enumerate() {
            let record = record?;
            let tokens = record.token_sequence()
                .ok_or(Doc2VecError::MalformedRecord { record: record_i, field: "texts" })?;
            let tags = record.tag_set()
                .ok_or(Doc2VecError::MalformedRecord { record: record_i, field: "tags" })?;
            if tags.is_empty() {
                warn!("record {} has an empty tag set", record_i);
            }
            documents.push(Document { tokens, tags });
        }

        info!("loaded {} labeled documents", documents.len());
        Ok(documents)
    }
}

#[derive(Clone, Debug)]
pub struct Split {
    pub train: Vec<Document>,
    pub test: Vec<Document>,
}

impl Split {

    /// Removes training documents without tags, they could never contribute a
    /// tag to a retrieval. Held-out ones stay and are excluded at scoring time.
    /// Returns how many were dropped.
    pub fn drop_untagged_training(&mut self) -> usize {
        let before = self.train.len();
        self.train.retain(|doc| !doc.tags.is_empty());
        let dropped = before - self.train.len();
        if dropped > 0 {
            warn!("dropped {} training documents with empty tag sets", dropped);
        }
        dropped
    }
}

/// Seeded random partition of the corpus. The held-out side gets
/// `ceil(test_fraction * n)` documents; both sides must end up non-empty.
pub fn split_train_test(documents: Vec<Document>, test_fraction: f64, seed: u64) -> Result<Split> {

    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(Doc2VecError::config("test_fraction", format!("{} is outside (0, 1)", test_fraction)));
    }

    let n = documents.len();
    // tolerance keeps 70 * 0.1 from rounding up to 8
    let n_test = ((n as f64) * test_fraction - 1e-9).ceil().max(0.0) as usize;
    if n_test == 0 || n_test >= n {
        return Err(Doc2VecError::config(
            "split",
            format!("{} documents cannot be split into non-empty train and test sets", n),
        ));
    }

    let mut order = (0..n).collect::<Vec<usize>>();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut slots: Vec<Option<Document>> = documents.into_iter().map(Some).collect();
    let mut take = |i: &usize| slots[*i].take();
    let test: Vec<Document> = order[..n_test].iter().filter_map(&mut take).collect();
    let train: Vec<Document> = order[n_test..].iter().filter_map(&mut take).collect();

    debug!("dataset split: {} training, {} held-out", train.len(), test.len());
    Ok(Split { train, test })
}
