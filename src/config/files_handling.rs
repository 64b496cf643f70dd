use crate::config::TrainConfig;
use crate::error::{Doc2VecError, Result};
use crate::vocab::Vocabulary;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array2;
use ndarray_npy::{read_npy, write_npy, ReadNpyError};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

// every artifact of a trained model goes through these two traits, the file
// extension is decided by the implementing type, callers only pass a stem.

pub fn read_input<R: ReadFile>(input_dir: &Path, file_name: &str) -> Result<R>
where
    Doc2VecError: From<R::Error>,
{
    Ok(R::read_file(input_dir, file_name)?)
}

pub fn save_output<S: SaveFile>(output_dir: &Path, file_name: &str, item: &S) -> Result<()>
where
    Doc2VecError: From<S::Error>,
{
    fs::create_dir_all(output_dir)?;
    item.save_file(output_dir, file_name)?;
    Ok(())
}

fn with_extension(dir: &Path, file_name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", file_name, extension))
}

pub trait ReadFile: Sized {
    type Error;
    fn read_file(input_dir: &Path, file_name: &str) -> std::result::Result<Self, Self::Error>;
}

pub trait SaveFile {
    type Error;
    fn save_file(&self, output_dir: &Path, file_name: &str) -> std::result::Result<(), Self::Error>;
}

impl ReadFile for Array2<f32> {
    type Error = ReadNpyError;
    fn read_file(input_dir: &Path, file_name: &str) -> std::result::Result<Self, Self::Error> {
        read_npy(with_extension(input_dir, file_name, "npy"))
    }
}

impl SaveFile for Array2<f32> {
    type Error = Doc2VecError;
    fn save_file(&self, output_dir: &Path, file_name: &str) -> Result<()> {
        write_npy(with_extension(output_dir, file_name, "npy"), self)?;
        Ok(())
    }
}

impl ReadFile for Vocabulary {
    type Error = Doc2VecError;
    fn read_file(input_dir: &Path, file_name: &str) -> Result<Self> {
        let f = BufReader::new(File::open(with_extension(input_dir, file_name, "json"))?);
        Ok(serde_json::from_reader(f)?)
    }
}

impl SaveFile for Vocabulary {
    type Error = Doc2VecError;
    fn save_file(&self, output_dir: &Path, file_name: &str) -> Result<()> {
        let f = BufWriter::new(File::create(with_extension(output_dir, file_name, "json"))?);
        serde_json::to_writer(f, self)?;
        Ok(())
    }
}

impl ReadFile for TrainConfig {
    type Error = Doc2VecError;
    fn read_file(input_dir: &Path, file_name: &str) -> Result<Self> {
        let f = BufReader::new(File::open(with_extension(input_dir, file_name, "json"))?);
        Ok(serde_json::from_reader(f)?)
    }
}

impl SaveFile for TrainConfig {
    type Error = Doc2VecError;
    fn save_file(&self, output_dir: &Path, file_name: &str) -> Result<()> {
        let f = BufWriter::new(File::create(with_extension(output_dir, file_name, "json"))?);
        serde_json::to_writer_pretty(f, self)?;
        Ok(())
    }
}

// tag sets of the trained documents, one entry per doc_vectors row
impl ReadFile for Vec<BTreeSet<String>> {
    type Error = Doc2VecError;
    fn read_file(input_dir: &Path, file_name: &str) -> Result<Self> {
        let f = BufReader::new(File::open(with_extension(input_dir, file_name, "bin.gz"))?);
        let reader = GzDecoder::new(f);
        Ok(bincode::deserialize_from(reader)?)
    }
}

impl SaveFile for Vec<BTreeSet<String>> {
    type Error = Doc2VecError;
    fn save_file(&self, output_dir: &Path, file_name: &str) -> Result<()> {
        let f = BufWriter::new(File::create(with_extension(output_dir, file_name, "bin.gz"))?);
        let mut writer = GzEncoder::new(f, Compression::default());
        bincode::serialize_into(&mut writer, self)?;
        writer.finish()?.flush()?;
        Ok(())
    }
}
