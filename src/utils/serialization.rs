use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Get the bincode configuration
fn get_config() -> impl bincode::config::Config {
    // Limit allocation to prevent memory exhaustion on corrupt data
    bincode::config::legacy().with_limit::<{ 256 * 1024 * 1024 }>() // 256MB limit
}

/// Serialize data using bincode v2.0 with serde
///
/// # Errors
///
/// Returns an error if serialization fails
pub fn serialize<T: serde::Serialize>(data: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(data, get_config()).map_err(Into::into)
}

/// Deserialize data using bincode v2.0 with serde
///
/// # Errors
///
/// Returns an error if:
/// - Deserialization fails
/// - Data is malformed or incompatible
pub fn deserialize<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (result, _bytes_read) = bincode::serde::decode_from_slice(bytes, get_config())?;
    Ok(result)
}

/// Reads and decodes a table file, returning `None` when it does not exist yet.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or decoded
pub fn read_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value = deserialize(&data).with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok(Some(value))
}

/// Encodes `data` and replaces `path` atomically.
///
/// The bytes go to a temporary file in the same directory which is then
/// renamed over the target, so readers never observe a half-written table.
///
/// # Errors
///
/// Returns an error if:
/// - The parent directory cannot be created
/// - Serialization fails
/// - The temporary file cannot be written or persisted
pub fn write_file_atomic<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let bytes = serialize(data).with_context(|| format!("Failed to encode {}", path.display()))?;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    temp.write_all(&bytes)
        .context("Failed to write table data")?;
    temp.flush().context("Failed to flush table data")?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}
