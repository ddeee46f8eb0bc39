//! On-disk format of an [`IndexSnapshot`].
//!
//! Data files are content-addressed by their BLAKE3 digest and written
//! beside the previous generation, so a crash at any point leaves either the
//! old or the new index readable. `manifest.json` is written last and swapped
//! in by rename; it is the only file a reader trusts first, and it pins the
//! checksums of everything else.
//!
//! `vectors-*.bin` starts with a 20-byte header (`LVEC`, format version u32,
//! dimension u32, count u64, all little-endian) followed by the row-major
//! `f32` payload in host byte order, which is little-endian on every target we
//! build for.

use super::{EncoderMetadata, IndexSnapshot, VectorIndex};
use crate::error::{Result, RetrieverError};
use chrono::{DateTime, Utc};
use lectern_chunk::Passage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

pub const FORMAT_VERSION: u32 = 1;
pub const MANIFEST_FILE: &str = "manifest.json";

const VECTOR_MAGIC: &[u8; 4] = b"LVEC";
const HEADER_LEN: usize = 20;
const VECTORS_PREFIX: &str = "vectors-";
const PASSAGES_PREFIX: &str = "passages-";

/// A data file referenced by the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFile {
    pub file: String,
    /// Hex-encoded BLAKE3 digest of the file contents
    pub blake3: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub dimension: usize,
    pub count: usize,
    pub encoder: EncoderMetadata,
    pub vectors: DataFile,
    pub passages: DataFile,
}

/// Write `snapshot` into `dir`, creating the directory if needed.
pub async fn save(dir: &Path, snapshot: Arc<IndexSnapshot>) -> Result<Manifest> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || write_snapshot(&dir, &snapshot)).await?
}

/// Read and verify the snapshot committed in `dir`.
pub async fn load(dir: &Path) -> Result<IndexSnapshot> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || read_snapshot(&dir)).await?
}

/// Read only the manifest, e.g. for status output.
pub async fn read_manifest(dir: &Path) -> Result<Manifest> {
    let bytes = tokio::fs::read(dir.join(MANIFEST_FILE)).await?;
    parse_manifest(&bytes)
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

fn data_file(prefix: &str, extension: &str, bytes: &[u8]) -> DataFile {
    let blake3 = digest(bytes);
    DataFile {
        file: format!("{prefix}{}.{extension}", &blake3[..16]),
        blake3,
    }
}

/// Write `bytes` to `dir/name` through a synced temp file and a rename.
fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(dir.join(name)).map_err(|e| e.error)?;
    Ok(())
}

fn encode_vectors(index: &VectorIndex) -> Result<Vec<u8>> {
    let dimension = u32::try_from(index.dimension())
        .map_err(|_| RetrieverError::config("dimension does not fit the vector header"))?;
    let payload: &[u8] = bytemuck::cast_slice(index.as_slice());

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(VECTOR_MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&dimension.to_le_bytes());
    bytes.extend_from_slice(&(index.len() as u64).to_le_bytes());
    bytes.extend_from_slice(payload);
    Ok(bytes)
}

fn write_snapshot(dir: &Path, snapshot: &IndexSnapshot) -> Result<Manifest> {
    fs::create_dir_all(dir)?;

    let vector_bytes = encode_vectors(snapshot.index())?;
    let passages: Vec<&Passage> = snapshot.entries().iter().map(|e| &e.passage).collect();
    let passage_bytes = serde_json::to_vec(&passages)?;

    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        created_at: Utc::now(),
        dimension: snapshot.dimension(),
        count: snapshot.len(),
        encoder: snapshot.encoder().clone(),
        vectors: data_file(VECTORS_PREFIX, "bin", &vector_bytes),
        passages: data_file(PASSAGES_PREFIX, "json", &passage_bytes),
    };

    write_atomic(dir, &manifest.vectors.file, &vector_bytes)?;
    write_atomic(dir, &manifest.passages.file, &passage_bytes)?;
    write_atomic(dir, MANIFEST_FILE, &serde_json::to_vec_pretty(&manifest)?)?;

    // Make the manifest rename durable before deleting the old generation.
    match fs::File::open(dir) {
        Ok(handle) => {
            if let Err(e) = handle.sync_all() {
                tracing::debug!("Could not sync index directory {}: {}", dir.display(), e);
            }
        }
        Err(e) => tracing::debug!("Could not open index directory {}: {}", dir.display(), e),
    }

    remove_stale_files(dir, &manifest);

    tracing::info!(
        "Persisted index with {} entries (dimension {}) to {}",
        manifest.count,
        manifest.dimension,
        dir.display()
    );
    Ok(manifest)
}

/// Best-effort removal of data files the committed manifest no longer names.
fn remove_stale_files(dir: &Path, manifest: &Manifest) {
    let keep: HashSet<&str> = [
        manifest.vectors.file.as_str(),
        manifest.passages.file.as_str(),
    ]
    .into_iter()
    .collect();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Could not list {} for cleanup: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let is_data_file = name.starts_with(VECTORS_PREFIX) || name.starts_with(PASSAGES_PREFIX);
        if is_data_file && !keep.contains(name) {
            if let Err(e) = fs::remove_file(entry.path()) {
                tracing::warn!("Failed to remove stale index file {}: {}", name, e);
            } else {
                tracing::debug!("Removed stale index file {}", name);
            }
        }
    }
}

fn parse_manifest(bytes: &[u8]) -> Result<Manifest> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| RetrieverError::corrupt(format!("unreadable manifest: {e}")))?;

    let version = value
        .get("format_version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| RetrieverError::corrupt("manifest has no format_version"))?;
    if version != u64::from(FORMAT_VERSION) {
        return Err(RetrieverError::UnsupportedFormat {
            found: version,
            supported: FORMAT_VERSION,
        });
    }

    serde_json::from_value(value)
        .map_err(|e| RetrieverError::corrupt(format!("invalid manifest: {e}")))
}

/// Resolve a manifest file name, refusing anything that is not a plain file name.
fn data_path(dir: &Path, file: &DataFile) -> Result<PathBuf> {
    let name = Path::new(&file.file);
    if name.file_name() != Some(name.as_os_str()) {
        return Err(RetrieverError::corrupt(format!(
            "manifest references an invalid file name: {}",
            file.file
        )));
    }
    Ok(dir.join(name))
}

fn read_verified(dir: &Path, file: &DataFile) -> Result<Vec<u8>> {
    let bytes = fs::read(data_path(dir, file)?)?;
    let actual = digest(&bytes);
    if actual != file.blake3 {
        return Err(RetrieverError::corrupt(format!(
            "checksum mismatch for {}: expected {}, found {}",
            file.file, file.blake3, actual
        )));
    }
    Ok(bytes)
}

fn decode_vectors(bytes: &[u8], manifest: &Manifest) -> Result<VectorIndex> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != VECTOR_MAGIC {
        return Err(RetrieverError::corrupt("vector file has no LVEC header"));
    }
    let read_u32 = |at: usize| {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    };
    let version = read_u32(4);
    let dimension = read_u32(8) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[12..HEADER_LEN]);
    let count = u64::from_le_bytes(count_bytes);

    if version != FORMAT_VERSION {
        return Err(RetrieverError::UnsupportedFormat {
            found: u64::from(version),
            supported: FORMAT_VERSION,
        });
    }
    if dimension != manifest.dimension || count != manifest.count as u64 {
        return Err(RetrieverError::corrupt(format!(
            "vector header ({count} x {dimension}) disagrees with manifest ({} x {})",
            manifest.count, manifest.dimension
        )));
    }

    let payload = &bytes[HEADER_LEN..];
    let values = manifest
        .count
        .checked_mul(dimension)
        .ok_or_else(|| RetrieverError::corrupt("vector count overflows"))?;
    if payload.len() != values * std::mem::size_of::<f32>() {
        return Err(RetrieverError::corrupt(format!(
            "vector payload holds {} bytes, expected {}",
            payload.len(),
            values * std::mem::size_of::<f32>()
        )));
    }

    // Copy into an f32 buffer: the byte payload carries no alignment guarantee.
    let mut vectors = vec![0f32; values];
    bytemuck::cast_slice_mut::<f32, u8>(&mut vectors).copy_from_slice(payload);
    VectorIndex::from_normalized(dimension, vectors)
}

fn read_snapshot(dir: &Path) -> Result<IndexSnapshot> {
    let manifest = parse_manifest(&fs::read(dir.join(MANIFEST_FILE))?)?;

    let index = decode_vectors(&read_verified(dir, &manifest.vectors)?, &manifest)?;
    let passages: Vec<Passage> = serde_json::from_slice(&read_verified(dir, &manifest.passages)?)
        .map_err(|e| RetrieverError::corrupt(format!("unreadable passages: {e}")))?;

    if passages.len() != manifest.count {
        return Err(RetrieverError::corrupt(format!(
            "manifest lists {} entries but the passage file holds {}",
            manifest.count,
            passages.len()
        )));
    }
    if manifest.encoder.dimension != manifest.dimension {
        return Err(RetrieverError::corrupt(format!(
            "encoder dimension {} disagrees with index dimension {}",
            manifest.encoder.dimension, manifest.dimension
        )));
    }

    tracing::info!(
        "Loaded index with {} entries (dimension {}, encoder {}) from {}",
        manifest.count,
        manifest.dimension,
        manifest.encoder.label(),
        dir.display()
    );
    IndexSnapshot::new(index, passages, manifest.encoder)
}
