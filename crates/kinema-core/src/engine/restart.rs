use super::error::EngineError;
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes an algorithm restart record to the given path, pretty-printed so
/// the payload stays human-inspectable.
pub fn write_record(path: &Path, payload: &Value) -> Result<(), EngineError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, payload)
        .map_err(|source| EngineError::Internal(format!("could not encode restart record: {source}")))?;
    writer.flush()?;
    Ok(())
}

/// Reads a restart record back.
///
/// A file that exists but cannot be decoded is a fatal error naming the
/// offending path; callers must not fall back to fresh state.
pub fn read_record(path: &Path) -> Result<Value, EngineError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|source| EngineError::Restart {
        path: path.to_path_buf(),
        source,
    })
}
