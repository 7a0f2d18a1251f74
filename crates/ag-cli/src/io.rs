//! Sequence, label and model file I/O.
//!
//! Sequence files hold a JSON array of arrays of strings. Labelled files hold
//! `{"sequences": [...], "labels": [...]}`. A path of `-` reads stdin.

use ag_common::{Error, Result};
use ag_core::ModelSnapshot;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Sequences with parallel 0/1 labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabeledCorpus {
    pub sequences: Vec<Vec<String>>,
    pub labels: Vec<u8>,
}

impl LabeledCorpus {
    /// Check that labels pair up with sequences and are all 0 or 1.
    pub fn validate(&self) -> Result<()> {
        if self.sequences.len() != self.labels.len() {
            return Err(Error::invalid_input(format!(
                "{} sequences but {} labels",
                self.sequences.len(),
                self.labels.len()
            )));
        }
        if let Some(index) = self.labels.iter().position(|&l| l > 1) {
            return Err(Error::invalid_input(format!(
                "label {} is {}, expected 0 or 1",
                index, self.labels[index]
            )));
        }
        Ok(())
    }
}

fn read_text(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Read a sequence file.
pub fn read_sequences(path: &Path) -> Result<Vec<Vec<String>>> {
    let sequences: Vec<Vec<String>> = serde_json::from_str(&read_text(path)?)?;
    debug!(path = %path.display(), sequences = sequences.len(), "read sequences");
    Ok(sequences)
}

/// Read a labelled sequence file.
pub fn read_labeled(path: &Path) -> Result<LabeledCorpus> {
    let corpus: LabeledCorpus = serde_json::from_str(&read_text(path)?)?;
    corpus.validate()?;
    debug!(path = %path.display(), sequences = corpus.sequences.len(), "read labelled corpus");
    Ok(corpus)
}

/// Load a model snapshot written by [`save_model`].
pub fn load_model(path: &Path) -> Result<ModelSnapshot<String>> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| {
        Error::Snapshot(format!("{}: {}", path.display(), e))
    })
}

/// Write a model snapshot as JSON.
pub fn save_model(path: &Path, snapshot: &ModelSnapshot<String>) -> Result<()> {
    let json = serde_json::to_string(snapshot)?;
    std::fs::write(path, json)?;
    debug!(path = %path.display(), "model saved");
    Ok(())
}

/// Write a JSON payload to stdout followed by a newline.
pub fn write_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(json.as_bytes())?;
    out.write_all(b"\n")?;
    Ok(())
}
