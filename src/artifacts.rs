//! Artifact persistence
//!
//! JSON files are written with 4-space indentation for human inspection.
//! Binary artifacts are bincode payloads wrapped in a small envelope carrying
//! magic bytes, a format version and an FNV-1a checksum, so corrupted or
//! foreign files are rejected at load time.

use crate::error::{PipelineError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{error, info};

/// Envelope around a binary artifact payload.
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactEnvelope {
    magic: [u8; 4],
    format_version: u32,
    payload: Vec<u8>,
    checksum: u64,
}

impl ArtifactEnvelope {
    const MAGIC: [u8; 4] = *b"MLPA";
    const VERSION: u32 = 1;

    fn new(payload: Vec<u8>) -> Self {
        let checksum = fnv1a(&payload);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            payload,
            checksum,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(PipelineError::SerializationError(
                "not a pipeline artifact (bad magic bytes)".to_string(),
            ));
        }
        if fnv1a(&self.payload) != self.checksum {
            return Err(PipelineError::SerializationError(
                "checksum mismatch, artifact file is corrupted".to_string(),
            ));
        }
        Ok(())
    }
}

fn fnv1a(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Save a value as pretty-printed JSON (4-space indent).
pub fn save_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        value.serialize(&mut serializer)?;
    }
    writer.flush()?;

    info!(path = %path.display(), "saved JSON file");
    Ok(())
}

/// Load a typed value from a JSON file.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let value = serde_json::from_reader(BufReader::new(file))?;
    info!(path = %path.display(), "loaded JSON file");
    Ok(value)
}

/// Load a JSON file as an untyped value tree.
pub fn load_json_value(path: impl AsRef<Path>) -> Result<serde_json::Value> {
    load_json(path)
}

/// Save a value as a binary artifact, creating parent directories as needed.
pub fn save_bin<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    match write_envelope(path, value) {
        Ok(()) => {
            info!(path = %path.display(), "saved binary artifact");
            Ok(())
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to save binary artifact");
            Err(e)
        }
    }
}

fn write_envelope<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let payload = bincode::serialize(value)
        .map_err(|e| PipelineError::SerializationError(e.to_string()))?;
    let envelope = ArtifactEnvelope::new(payload);
    let bytes = bincode::serialize(&envelope)
        .map_err(|e| PipelineError::SerializationError(e.to_string()))?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Load a typed value from a binary artifact, verifying its checksum.
pub fn load_bin<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let envelope: ArtifactEnvelope = bincode::deserialize(&bytes)
        .map_err(|e| PipelineError::SerializationError(e.to_string()))?;
    envelope.validate()?;

    let value = bincode::deserialize(&envelope.payload)
        .map_err(|e| PipelineError::SerializationError(e.to_string()))?;
    info!(path = %path.display(), "loaded binary artifact");
    Ok(value)
}

/// Report a file's size in rounded kilobytes as `"~ {n} KB"`.
///
/// Exact half kilobytes round to even, so 2560 bytes reports `"~ 2 KB"`.
pub fn file_size(path: impl AsRef<Path>) -> Result<String> {
    let bytes = fs::metadata(path.as_ref())?.len();
    Ok(format!("~ {} KB", round_half_to_even(bytes as f64 / 1024.0)))
}

fn round_half_to_even(value: f64) -> u64 {
    let floor = value.floor();
    let fract = value - floor;
    let floor = floor as u64;
    if fract > 0.5 || (fract == 0.5 && floor % 2 == 1) {
        floor + 1
    } else {
        floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut report = BTreeMap::new();
        report.insert("linear".to_string(), 0.91_f64);
        report.insert("knn".to_string(), 0.87_f64);

        save_json(&path, &report).unwrap();
        let loaded: BTreeMap<String, f64> = load_json(&path).unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_json_uses_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value.json");

        save_json(&path, &json!({"score": 0.5})).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    \"score\""), "got: {text}");
    }

    #[test]
    fn test_load_json_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested.json");

        save_json(&path, &json!({"model": {"alpha": 0.1}})).unwrap();
        let value = load_json_value(&path).unwrap();
        assert_eq!(value["model"]["alpha"], json!(0.1));
    }

    #[test]
    fn test_bin_round_trip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models/best/model.bin");

        let weights = vec![0.5_f64, -1.25, 3.0];
        save_bin(&path, &weights).unwrap();
        assert!(path.exists());

        let loaded: Vec<f64> = load_bin(&path).unwrap();
        assert_eq!(loaded, weights);
    }

    #[test]
    fn test_load_bin_rejects_corrupted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");

        save_bin(&path, &vec![1.0_f64, 2.0]).unwrap();

        // Flip a byte in the middle of the file
        let mut bytes = fs::read(&path).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        let result: Result<Vec<f64>> = load_bin(&path);
        assert!(matches!(
            result,
            Err(PipelineError::SerializationError(_))
        ));
    }

    #[test]
    fn test_load_bin_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_an_artifact.bin");
        fs::write(&path, b"just some bytes").unwrap();

        let result: Result<Vec<f64>> = load_bin(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_file_size_rounds_to_nearest_kb() {
        let dir = tempfile::tempdir().unwrap();

        let exact = dir.path().join("exact");
        fs::write(&exact, vec![0u8; 2048]).unwrap();
        assert_eq!(file_size(&exact).unwrap(), "~ 2 KB");

        let half_up = dir.path().join("half_up");
        fs::write(&half_up, vec![0u8; 1536]).unwrap();
        assert_eq!(file_size(&half_up).unwrap(), "~ 2 KB");

        // Exact halves round to even
        let half_even = dir.path().join("half_even");
        fs::write(&half_even, vec![0u8; 2560]).unwrap();
        assert_eq!(file_size(&half_even).unwrap(), "~ 2 KB");

        let tiny = dir.path().join("tiny");
        fs::write(&tiny, vec![0u8; 100]).unwrap();
        assert_eq!(file_size(&tiny).unwrap(), "~ 0 KB");
    }
}
