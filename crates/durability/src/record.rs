//! Log file and record format.
//!
//! Ring files are named `<name>_<n>.<ext>` and begin with a 32-byte header.
//!
//! # File Layout
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ File Header (32 bytes)             │
//! ├────────────────────────────────────┤
//! │ Record 1                           │
//! ├────────────────────────────────────┤
//! │ ...                                │
//! └────────────────────────────────────┘
//! ```
//!
//! # Record Layout
//!
//! ```text
//! ┌─────────────────┬──────────┬──────────────┬──────────┬───────────┬──────────┐
//! │ Length (4 bytes)│ Kind (1) │ Sequence (8) │ Xid (var)│ Names(var)│ CRC32 (4)│
//! └─────────────────┴──────────┴──────────────┴──────────┴───────────┴──────────┘
//! ```
//!
//! Length covers everything after itself. The CRC covers kind through names
//! and is written as zero when checksums are disabled.

use crc32fast::Hasher;
use thiserror::Error;
use txlog_core::Xid;

/// Magic bytes identifying a log file: "TXLG"
pub const FILE_MAGIC: [u8; 4] = *b"TXLG";

/// Current file format version
pub const FILE_FORMAT_VERSION: u32 = 1;

/// Size of the file header in bytes
pub const FILE_HEADER_SIZE: usize = 32;

/// Log file header (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Magic bytes: "TXLG"
    pub magic: [u8; 4],
    /// Format version for forward compatibility
    pub format_version: u32,
    /// Position of this file in the ring (1-based)
    pub file_number: u32,
    /// How many times the ring has wrapped onto this file
    pub generation: u32,
    /// Identity of the log instance that wrote the file
    pub log_uuid: [u8; 16],
}

impl FileHeader {
    /// Create a new file header.
    pub fn new(file_number: u32, generation: u32, log_uuid: [u8; 16]) -> Self {
        FileHeader {
            magic: FILE_MAGIC,
            format_version: FILE_FORMAT_VERSION,
            file_number,
            generation,
            log_uuid,
        }
    }

    /// Serialize header to bytes.
    pub fn to_bytes(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut bytes = [0u8; FILE_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.format_version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.file_number.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.generation.to_le_bytes());
        bytes[16..32].copy_from_slice(&self.log_uuid);
        bytes
    }

    /// Deserialize header from bytes.
    pub fn from_bytes(bytes: &[u8; FILE_HEADER_SIZE]) -> Option<Self> {
        Some(FileHeader {
            magic: bytes[0..4].try_into().ok()?,
            format_version: u32::from_le_bytes(bytes[4..8].try_into().ok()?),
            file_number: u32::from_le_bytes(bytes[8..12].try_into().ok()?),
            generation: u32::from_le_bytes(bytes[12..16].try_into().ok()?),
            log_uuid: bytes[16..32].try_into().ok()?,
        })
    }

    /// Validate magic bytes and version.
    pub fn is_valid(&self) -> bool {
        self.magic == FILE_MAGIC && self.format_version == FILE_FORMAT_VERSION
    }
}

/// Record type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum RecordKind {
    /// Intent to commit; forced before `prepare` returns
    Prepare = 1,
    /// Completion of a prepared transaction; forced lazily
    Commit = 2,
}

impl RecordKind {
    fn from_u8(tag: u8) -> Result<Self, RecordError> {
        match tag {
            1 => Ok(RecordKind::Prepare),
            2 => Ok(RecordKind::Commit),
            other => Err(RecordError::UnknownKind(other)),
        }
    }
}

/// A journaled prepare or commit.
///
/// A commit carries the sequence number of the prepare it completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Record type
    pub kind: RecordKind,
    /// Sequence number issued at prepare time
    pub sequence: u64,
    /// Transaction the record belongs to
    pub xid: Xid,
    /// Resource names enlisted in the transaction (prepare only)
    pub names: Vec<String>,
}

impl LogRecord {
    /// Create a prepare record.
    pub fn prepare(sequence: u64, xid: Xid, names: Vec<String>) -> Self {
        LogRecord {
            kind: RecordKind::Prepare,
            sequence,
            xid,
            names,
        }
    }

    /// Create a commit record for the prepare with `sequence`.
    pub fn commit(sequence: u64, xid: Xid) -> Self {
        LogRecord {
            kind: RecordKind::Commit,
            sequence,
            xid,
            names: Vec::new(),
        }
    }

    /// Append the framed record to `buf`, returning the bytes written.
    pub fn encode_into(&self, buf: &mut Vec<u8>, checksum: bool) -> Result<usize, RecordError> {
        if self.names.len() > u16::MAX as usize {
            return Err(RecordError::TooManyNames(self.names.len()));
        }

        let start = buf.len();
        // Length placeholder, patched below
        buf.extend_from_slice(&[0u8; 4]);
        let body_start = buf.len();

        buf.push(self.kind as u8);
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        if let Err(e) = self.xid.encode_into(buf) {
            buf.truncate(start);
            return Err(RecordError::InvalidXid(e.to_string()));
        }
        buf.extend_from_slice(&(self.names.len() as u16).to_le_bytes());
        for name in &self.names {
            if name.len() > u16::MAX as usize {
                buf.truncate(start);
                return Err(RecordError::NameTooLong(name.len()));
            }
            buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
            buf.extend_from_slice(name.as_bytes());
        }

        let crc = if checksum {
            compute_crc(&buf[body_start..])
        } else {
            0
        };
        buf.extend_from_slice(&crc.to_le_bytes());

        let length = (buf.len() - body_start) as u32;
        buf[start..body_start].copy_from_slice(&length.to_le_bytes());
        Ok(buf.len() - start)
    }

    /// Decode one record, returning it and the bytes consumed.
    pub fn decode(bytes: &[u8], verify_checksum: bool) -> Result<(Self, usize), RecordError> {
        let length = match bytes.get(0..4) {
            Some(b) => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize,
            None => return Err(RecordError::InsufficientData),
        };
        // kind + sequence + crc at minimum
        if length < 1 + 8 + 4 {
            return Err(RecordError::InvalidFormat);
        }
        if bytes.len() < 4 + length {
            return Err(RecordError::InsufficientData);
        }

        let body = &bytes[4..4 + length - 4];
        let crc_bytes = &bytes[4 + length - 4..4 + length];
        let stored_crc = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        if verify_checksum {
            let computed = compute_crc(body);
            if computed != stored_crc {
                return Err(RecordError::ChecksumMismatch {
                    expected: stored_crc,
                    computed,
                });
            }
        }

        let kind = RecordKind::from_u8(body[0])?;
        let sequence = u64::from_le_bytes(
            body[1..9]
                .try_into()
                .map_err(|_| RecordError::InvalidFormat)?,
        );
        let (xid, used) =
            Xid::decode(&body[9..]).map_err(|e| RecordError::InvalidXid(e.to_string()))?;
        let mut pos = 9 + used;

        let count = read_u16(body, pos)? as usize;
        pos += 2;
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            let len = read_u16(body, pos)? as usize;
            pos += 2;
            let raw = body.get(pos..pos + len).ok_or(RecordError::InvalidFormat)?;
            let name =
                String::from_utf8(raw.to_vec()).map_err(|_| RecordError::InvalidFormat)?;
            names.push(name);
            pos += len;
        }
        if pos != body.len() {
            return Err(RecordError::InvalidFormat);
        }

        Ok((
            LogRecord {
                kind,
                sequence,
                xid,
                names,
            },
            4 + length,
        ))
    }
}

fn read_u16(body: &[u8], pos: usize) -> Result<u16, RecordError> {
    body.get(pos..pos + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(RecordError::InvalidFormat)
}

fn compute_crc(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Record encoding and decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Not enough bytes for a complete record (torn tail)
    #[error("Insufficient data for record")]
    InsufficientData,

    /// Framing or field layout is inconsistent
    #[error("Invalid record format")]
    InvalidFormat,

    /// Stored CRC does not match the record body
    #[error("Checksum mismatch: stored {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// CRC stored in the record
        expected: u32,
        /// CRC computed over the body
        computed: u32,
    },

    /// Unrecognized record kind tag
    #[error("Unknown record kind: {0}")]
    UnknownKind(u8),

    /// Embedded transaction identifier is malformed
    #[error("Invalid xid: {0}")]
    InvalidXid(String),

    /// More resource names than the format can count
    #[error("Too many resource names: {0}")]
    TooManyNames(usize),

    /// A resource name longer than the format can frame
    #[error("Resource name too long: {0} bytes")]
    NameTooLong(usize),
}
