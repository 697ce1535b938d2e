//! Binary format for trained models.
//!
//! ## Format Layout
//!
//! ```text
//! +------------------+
//! | Header (64 bytes)|
//! +------------------+
//! | Vocabulary Table |
//! | (variable)       |
//! +------------------+
//! | Embedding Matrix |
//! | (rows x dim f32) |
//! +------------------+
//! | String Pool      |
//! | (variable)       |
//! +------------------+
//! | Metadata         |
//! | (bincode)        |
//! +------------------+
//! ```
//!
//! ### Header (64 bytes)
//! - Magic number (4 bytes): "PEMB"
//! - Version (2 bytes)
//! - Kind (1 byte): 0 = phoneme, 1 = word
//! - Flags (1 byte): reserved
//! - Embedding dimension (4 bytes)
//! - Rows (4 bytes): vocabulary size including the unknown id
//! - Vocabulary table offset (8 bytes)
//! - Matrix offset (8 bytes)
//! - String pool offset (8 bytes)
//! - Metadata offset (8 bytes)
//! - Metadata length (8 bytes)
//! - Reserved (8 bytes)
//!
//! ### Vocabulary Table
//! - One `(string_offset: u32, string_len: u16, count: u32)` entry per known
//!   token, in id order. The unknown id has no entry.
//!
//! ### Embedding Matrix
//! - Row-major little-endian `f32`, one row per id, unknown row last.
//!
//! All integers are little-endian.

use crate::embedding::{EmbeddingMatrix, ModelKey, ModelKind, ModelMetadata, TrainedModel};
use crate::error::{PhonembedError, Result};
use crate::text::Vocabulary;
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Magic number for phonembed model files.
const MAGIC: &[u8; 4] = b"PEMB";

/// Current format version.
pub const FORMAT_VERSION: u16 = 2;

/// Header size in bytes.
const HEADER_SIZE: usize = 64;

/// Model file header.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHeader {
    /// Format version.
    pub version: u16,
    /// Model kind.
    pub kind: ModelKind,
    /// Embedding dimension.
    pub dim: u32,
    /// Matrix rows, including the unknown row.
    pub rows: u32,
    /// Offset to the vocabulary table.
    pub vocab_offset: u64,
    /// Offset to the matrix.
    pub matrix_offset: u64,
    /// Offset to the string pool.
    pub string_pool_offset: u64,
    /// Offset to the metadata block.
    pub metadata_offset: u64,
    /// Length of the metadata block.
    pub metadata_len: u64,
}

impl ModelHeader {
    /// Creates a header; offsets are filled in during write.
    pub fn new(kind: ModelKind, dim: u32, rows: u32) -> Self {
        Self {
            version: FORMAT_VERSION,
            kind,
            dim,
            rows,
            vocab_offset: HEADER_SIZE as u64,
            matrix_offset: 0,
            string_pool_offset: 0,
            metadata_offset: 0,
            metadata_len: 0,
        }
    }

    /// Writes the header to bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6] = self.kind.to_byte();
        bytes[8..12].copy_from_slice(&self.dim.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.rows.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.vocab_offset.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.matrix_offset.to_le_bytes());
        bytes[32..40].copy_from_slice(&self.string_pool_offset.to_le_bytes());
        bytes[40..48].copy_from_slice(&self.metadata_offset.to_le_bytes());
        bytes[48..56].copy_from_slice(&self.metadata_len.to_le_bytes());
        bytes
    }

    /// Reads a header from bytes.
    ///
    /// Errors are plain reasons; callers attach the file path.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        if bytes.len() < HEADER_SIZE {
            return Err("header too short".to_string());
        }
        if &bytes[0..4] != MAGIC {
            return Err("invalid magic number".to_string());
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(format!("unsupported format version {}", version));
        }
        let kind = ModelKind::from_byte(bytes[6]).ok_or_else(|| format!("invalid model kind byte {}", bytes[6]))?;

        Ok(Self {
            version,
            kind,
            dim: read_u32(bytes, 8),
            rows: read_u32(bytes, 12),
            vocab_offset: read_u64(bytes, 16),
            matrix_offset: read_u64(bytes, 24),
            string_pool_offset: read_u64(bytes, 32),
            metadata_offset: read_u64(bytes, 40),
            metadata_len: read_u64(bytes, 48),
        })
    }
}

/// Vocabulary table entry for a known token.
#[derive(Debug, Clone, Copy)]
struct VocabEntry {
    string_offset: u32,
    string_len: u16,
    count: u32,
}

impl VocabEntry {
    const SIZE: usize = 10;

    fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.string_offset.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.string_len.to_le_bytes());
        bytes[6..10].copy_from_slice(&self.count.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            string_offset: read_u32(bytes, 0),
            string_len: u16::from_le_bytes([bytes[4], bytes[5]]),
            count: read_u32(bytes, 6),
        }
    }
}

/// Binary format reader/writer for model files.
pub struct ModelFormat;

impl ModelFormat {
    /// Encodes a model into bytes.
    pub fn encode(model: &TrainedModel) -> Result<Vec<u8>> {
        let vocab = model.vocabulary();
        let matrix = model.matrix();

        let rows = u32_field(matrix.rows(), "row count")?;
        let dim = u32_field(matrix.dim(), "embedding dimension")?;
        let mut header = ModelHeader::new(model.metadata().kind, dim, rows);

        let mut table = Vec::with_capacity(vocab.known_len() * VocabEntry::SIZE);
        let mut string_pool = Vec::new();
        for (id, token) in vocab.iter() {
            let string_len = u16::try_from(token.len())
                .map_err(|_| PhonembedError::Serialization(format!("token too long: {} bytes", token.len())))?;
            let entry = VocabEntry {
                string_offset: u32_field(string_pool.len(), "string pool offset")?,
                string_len,
                count: vocab.frequency(id),
            };
            table.extend_from_slice(&entry.to_bytes());
            string_pool.extend_from_slice(token.as_bytes());
        }

        let metadata = bincode::serialize(model.metadata())?;

        header.matrix_offset = header.vocab_offset + table.len() as u64;
        header.string_pool_offset = header.matrix_offset + (matrix.as_slice().len() * 4) as u64;
        header.metadata_offset = header.string_pool_offset + string_pool.len() as u64;
        header.metadata_len = metadata.len() as u64;

        let total = header.metadata_offset as usize + metadata.len();
        let mut bytes = Vec::with_capacity(total);
        bytes.extend_from_slice(&header.to_bytes());
        bytes.extend_from_slice(&table);
        for v in matrix.as_slice() {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&string_pool);
        bytes.extend_from_slice(&metadata);

        Ok(bytes)
    }

    /// Decodes the model expected to be `key`.
    ///
    /// `path` and `key` identify the artifact in errors; a model whose
    /// metadata names another key is corrupt.
    pub fn decode(bytes: &[u8], path: &Path, key: &ModelKey) -> Result<TrainedModel> {
        Self::decode_inner(bytes, key).map_err(|reason| corrupt(path, key, reason))
    }

    fn decode_inner(bytes: &[u8], key: &ModelKey) -> std::result::Result<TrainedModel, String> {
        let header = ModelHeader::from_bytes(bytes)?;

        let rows = header.rows as usize;
        let dim = header.dim as usize;
        if rows == 0 {
            return Err("no rows (unknown row missing)".to_string());
        }
        if dim == 0 {
            return Err("zero embedding dimension".to_string());
        }

        let known = rows - 1;
        let matrix_len = rows
            .checked_mul(dim)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| format!("matrix of {} x {} overflows", rows, dim))?;
        let table = section(bytes, header.vocab_offset, (known * VocabEntry::SIZE) as u64, "vocabulary table")?;
        let matrix_bytes = section(bytes, header.matrix_offset, matrix_len as u64, "matrix")?;
        let pool_len = header
            .metadata_offset
            .checked_sub(header.string_pool_offset)
            .ok_or_else(|| "string pool offset past metadata".to_string())?;
        let pool = section(bytes, header.string_pool_offset, pool_len, "string pool")?;
        let metadata_bytes = section(bytes, header.metadata_offset, header.metadata_len, "metadata")?;

        let mut tokens = Vec::with_capacity(known);
        let mut counts = Vec::with_capacity(known);
        for raw in table.chunks_exact(VocabEntry::SIZE) {
            let entry = VocabEntry::from_bytes(raw);
            let start = entry.string_offset as usize;
            let end = start + entry.string_len as usize;
            let token_bytes = pool
                .get(start..end)
                .ok_or_else(|| format!("token at {}..{} outside string pool", start, end))?;
            let token = std::str::from_utf8(token_bytes).map_err(|e| format!("token is not UTF-8: {}", e))?;
            tokens.push(token.to_string());
            counts.push(entry.count);
        }
        let vocabulary = Vocabulary::from_parts(tokens, counts).map_err(|e| e.to_string())?;

        let data: Vec<f32> = matrix_bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let matrix = EmbeddingMatrix::from_vec(data, rows, dim).map_err(|e| e.to_string())?;

        let metadata: ModelMetadata =
            bincode::deserialize(metadata_bytes).map_err(|e| format!("metadata: {}", e))?;
        if metadata.kind != header.kind {
            return Err(format!("header kind {} but metadata kind {}", header.kind, metadata.kind));
        }
        if metadata.embedding_dim != dim {
            return Err(format!(
                "header dimension {} but metadata dimension {}",
                dim, metadata.embedding_dim
            ));
        }
        let stored = metadata.key();
        if &stored != key {
            return Err(format!("file holds {}", stored));
        }

        TrainedModel::new(metadata, vocabulary, matrix).map_err(|e| e.to_string())
    }

    /// Writes a model atomically: a temporary file in the target directory is
    /// renamed over `path` once fully written.
    pub fn write<P: AsRef<Path>>(path: P, model: &TrainedModel) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let bytes = Self::encode(model)?;
        let temp = NamedTempFile::new_in(&parent)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            writer.write_all(&bytes)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| PhonembedError::Io(e.error))?;
        Ok(())
    }

    /// Reads the model `key` into memory.
    pub fn read<P: AsRef<Path>>(path: P, key: &ModelKey) -> Result<TrainedModel> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Self::decode(&bytes, path, key)
    }

    /// Reads the model `key` through a memory map.
    pub fn read_mmap<P: AsRef<Path>>(path: P, key: &ModelKey) -> Result<TrainedModel> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(corrupt(path, key, "empty file".to_string()));
        }
        // The map only lives for the decode; every value is copied out.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::decode(&mmap, path, key)
    }
}

fn corrupt(path: &Path, key: &ModelKey, reason: String) -> PhonembedError {
    PhonembedError::ModelCorrupt {
        path: path.to_path_buf(),
        language: key.language.clone(),
        kind: key.kind,
        reason,
    }
}

/// Narrows a length or offset to the format's 32-bit fields.
fn u32_field(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| PhonembedError::Serialization(format!("{} {} exceeds u32", what, value)))
}

fn section<'a>(bytes: &'a [u8], offset: u64, len: u64, name: &str) -> std::result::Result<&'a [u8], String> {
    let start = usize::try_from(offset).map_err(|_| format!("{} offset overflow", name))?;
    let len = usize::try_from(len).map_err(|_| format!("{} length overflow", name))?;
    let end = start
        .checked_add(len)
        .ok_or_else(|| format!("{} range overflow", name))?;
    bytes
        .get(start..end)
        .ok_or_else(|| format!("{} ({}..{}) past end of file ({} bytes)", name, start, end, bytes.len()))
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::model_from_rows;
    use tempfile::tempdir;

    fn key() -> ModelKey {
        ModelKey::new("pl", ModelKind::Phoneme)
    }

    fn model() -> TrainedModel {
        model_from_rows("pl", ModelKind::Phoneme, &["k", "ɔ", "t"], vec![
            vec![0.1, -0.2, 0.3],
            vec![1e-7, 3.5, -42.0],
            vec![f32::MIN_POSITIVE, 0.0, -0.0],
            vec![0.25, 0.5, 0.75],
        ])
    }

    #[test]
    fn test_header_roundtrip() {
        let header = ModelHeader::new(ModelKind::Word, 100, 5000);
        let recovered = ModelHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(recovered, header);
    }

    #[test]
    fn test_write_and_read_bit_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pl").join("phoneme.pemb");
        let original = model();

        ModelFormat::write(&path, &original).unwrap();
        let from_read = ModelFormat::read(&path, &key()).unwrap();
        let from_mmap = ModelFormat::read_mmap(&path, &key()).unwrap();

        assert_eq!(from_read, original);
        assert_eq!(from_mmap, original);
        let bits = |m: &TrainedModel| m.matrix().as_slice().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&from_read), bits(&original));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = ModelFormat::encode(&model()).unwrap();
        bytes[0] = b'X';
        let err = ModelFormat::decode(&bytes, Path::new("x.pemb"), &key()).unwrap_err();
        assert!(matches!(err, PhonembedError::ModelCorrupt { ref reason, .. } if reason.contains("magic")));
    }

    #[test]
    fn test_truncated_file() {
        let bytes = ModelFormat::encode(&model()).unwrap();
        for cut in [10, HEADER_SIZE + 3, bytes.len() - 1] {
            let err = ModelFormat::decode(&bytes[..cut], Path::new("t.pemb"), &key()).unwrap_err();
            assert!(matches!(err, PhonembedError::ModelCorrupt { .. }), "cut at {}", cut);
        }
    }

    #[test]
    fn test_kind_mismatch_detected() {
        let mut bytes = ModelFormat::encode(&model()).unwrap();
        bytes[6] = ModelKind::Word.to_byte();
        let err = ModelFormat::decode(&bytes, Path::new("k.pemb"), &key()).unwrap_err();
        assert!(matches!(err, PhonembedError::ModelCorrupt { .. }));
    }

    #[test]
    fn test_corrupt_error_names_expected_model() {
        let bytes = ModelFormat::encode(&model()).unwrap();
        let expected = ModelKey::new("en", ModelKind::Word);
        match ModelFormat::decode(&bytes, Path::new("en/word.pemb"), &expected) {
            Err(PhonembedError::ModelCorrupt {
                path,
                language,
                kind,
                reason,
            }) => {
                assert_eq!(path, Path::new("en/word.pemb"));
                assert_eq!(language, "en");
                assert_eq!(kind, ModelKind::Word);
                assert!(reason.contains("pl/phoneme"), "{}", reason);
            }
            other => panic!("expected ModelCorrupt, got {:?}", other.map(|m| m.dim())),
        }

        let err = ModelFormat::decode(&bytes[..20], Path::new("en/word.pemb"), &expected).unwrap_err();
        assert!(err.to_string().contains("(en/word)"), "{}", err);
    }

    #[test]
    fn test_oversized_fields_rejected() {
        assert_eq!(u32_field(7, "rows").unwrap(), 7);
        assert_eq!(u32_field(u32::MAX as usize, "string pool offset").unwrap(), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert!(matches!(
            u32_field(u32::MAX as usize + 1, "string pool offset"),
            Err(PhonembedError::Serialization(ref msg)) if msg.contains("string pool offset")
        ));
    }

    #[test]
    fn test_empty_file_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.pemb");
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(ModelFormat::read_mmap(&path, &key()), Err(PhonembedError::ModelCorrupt { .. })));
        assert!(matches!(ModelFormat::read(&path, &key()), Err(PhonembedError::ModelCorrupt { .. })));
    }
}
