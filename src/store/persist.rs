//! Snapshot persistence.
//!
//! A snapshot is persisted as two aligned artifacts in one directory:
//!
//! - `metadata.json` — the document records in insertion order, without
//!   vectors
//! - `vectors.bin` — a small header (magic, row count, dimension) followed by
//!   the matrix data as row-major little-endian f32
//!
//! Loading validates that the two artifacts agree on the document count and
//! that the dimension matches the active embedding model before the snapshot
//! is handed to the caller; any inconsistency is an
//! [`IndexError::Corruption`] and the previously active snapshot stays in
//! place. Files are written to a temporary sibling and renamed into place so
//! a crashed save never leaves a half-written artifact under the final name.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use super::{IndexError, IndexResult, IndexSnapshot, SnapshotBuilder};
use crate::models::Document;

/// Metadata record list file name.
pub const METADATA_FILE: &str = "metadata.json";

/// Vector matrix file name.
pub const VECTORS_FILE: &str = "vectors.bin";

/// Magic bytes identifying the vector file format, version 1.
const VECTORS_MAGIC: &[u8; 4] = b"MSV1";

/// Byte length of the vector file header: magic + u64 rows + u64 dimension.
const HEADER_LEN: usize = 4 + 8 + 8;

/// Persist a snapshot into `dir`, creating the directory if needed.
pub fn save_snapshot(snapshot: &IndexSnapshot, dir: &Path) -> IndexResult<()> {
    fs::create_dir_all(dir)?;

    let metadata = serde_json::to_vec_pretty(snapshot.documents())?;
    write_atomic(&dir.join(METADATA_FILE), &metadata)?;

    let mut vectors = Vec::with_capacity(HEADER_LEN + snapshot.len() * snapshot.dimension() * 4);
    vectors.extend_from_slice(VECTORS_MAGIC);
    vectors.extend_from_slice(&(snapshot.len() as u64).to_le_bytes());
    vectors.extend_from_slice(&(snapshot.dimension() as u64).to_le_bytes());
    let data = snapshot
        .vectors
        .as_slice()
        .expect("snapshot matrix is row-major contiguous");
    vectors.extend_from_slice(bytemuck::cast_slice(data));
    write_atomic(&dir.join(VECTORS_FILE), &vectors)?;

    info!(
        documents = snapshot.len(),
        dimension = snapshot.dimension(),
        dir = %dir.display(),
        "snapshot saved"
    );
    Ok(())
}

/// Load and validate a snapshot from `dir`.
///
/// # Errors
/// Returns `IndexError::Corruption` when the artifacts disagree on the
/// document count, the dimension differs from `expected_dimension`, the
/// vector file is truncated, or the metadata contains duplicate identifiers.
pub fn load_snapshot(dir: &Path, expected_dimension: usize) -> IndexResult<IndexSnapshot> {
    let metadata_path = dir.join(METADATA_FILE);
    let vectors_path = dir.join(VECTORS_FILE);

    let documents: Vec<Document> = serde_json::from_slice(&fs::read(&metadata_path)?)?;
    let raw = fs::read(&vectors_path)?;

    if raw.len() < HEADER_LEN {
        return Err(IndexError::Corruption(format!(
            "vector file is {} bytes, smaller than the {} byte header",
            raw.len(),
            HEADER_LEN
        )));
    }
    if &raw[..4] != VECTORS_MAGIC {
        return Err(IndexError::Corruption(
            "vector file has an unrecognized header".to_string(),
        ));
    }

    let rows = u64::from_le_bytes(raw[4..12].try_into().expect("slice is 8 bytes")) as usize;
    let dimension = u64::from_le_bytes(raw[12..20].try_into().expect("slice is 8 bytes")) as usize;

    if rows != documents.len() {
        return Err(IndexError::Corruption(format!(
            "vector file holds {} rows but metadata lists {} documents",
            rows,
            documents.len()
        )));
    }
    if dimension != expected_dimension {
        return Err(IndexError::Corruption(format!(
            "vector dimension is {} but the active model expects {}",
            dimension, expected_dimension
        )));
    }

    let body = &raw[HEADER_LEN..];
    let expected_bytes = rows * dimension * 4;
    if body.len() != expected_bytes {
        return Err(IndexError::Corruption(format!(
            "vector data is {} bytes, expected {} for {} x {}",
            body.len(),
            expected_bytes,
            rows,
            dimension
        )));
    }

    let values = decode_values(body);
    let mut builder = SnapshotBuilder::new(dimension);
    for (row, document) in documents.into_iter().enumerate() {
        let vector = values[row * dimension..(row + 1) * dimension].to_vec();
        builder.push(document, vector).map_err(|e| match e {
            IndexError::DuplicateId(id) => {
                IndexError::Corruption(format!("metadata lists duplicate document id '{}'", id))
            }
            other => other,
        })?;
    }

    debug!(documents = rows, dimension, dir = %dir.display(), "snapshot loaded");
    Ok(builder.build())
}

/// Decode the f32 body of a vector file.
///
/// Copies into a fresh allocation rather than reinterpreting in place, since
/// the byte buffer read from disk carries no alignment guarantee.
fn decode_values(body: &[u8]) -> Vec<f32> {
    bytemuck::pod_collect_to_vec(body)
}

/// Write `contents` to a temporary sibling and rename it over `path`.
fn write_atomic(path: &Path, contents: &[u8]) -> IndexResult<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
