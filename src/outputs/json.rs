//! JSON output generation for the API.
//!
//! The whole [`CollectionResult`] is serialized to `{output_dir}/articles.json`,
//! replacing the previous run's file.

use crate::models::CollectionResult;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// File name of the JSON snapshot inside the output directory.
pub const JSON_FILENAME: &str = "articles.json";

/// Write `result` as pretty-printed JSON into `output_dir`.
///
/// # Arguments
///
/// * `result` - The collection to serialize
/// * `output_dir` - Directory the snapshot is written into
///
/// # Returns
///
/// The path of the written file, or an error if serialization or the write
/// fails.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn write_collection(
    result: &CollectionResult,
    output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(result)?;
    let path = Path::new(output_dir).join(JSON_FILENAME);

    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = result.articles.len(), "Wrote JSON API file");

    Ok(path)
}
