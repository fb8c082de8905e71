use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{KvError, KvResult};
use crate::key::Key;

/// One committed batch as it is journaled.
///
/// On-disk framing:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized WalRecord)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalRecord {
    pub versionstamp: u64,
    pub ops: Vec<WalOp>,
}

/// A mutation with its expiry resolved to an absolute time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalOp {
    Set {
        key: Key,
        value: Vec<u8>,
        expires_at: Option<i64>,
    },
    Delete {
        key: Key,
    },
}

/// When the log is flushed to stable storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every commit.
    EveryWrite,
    /// Flush to the OS and let the page cache decide.
    #[default]
    OsDefault,
}

const HEADER_SIZE: usize = 8;

struct WalWriter {
    writer: BufWriter<File>,
    offset: u64,
}

/// Append-only journal of committed batches.
///
/// A record whose tail was torn by a crash fails its length or CRC check and
/// ends recovery; everything before it is replayed and the log is cut back to
/// the last intact record, so later appends are never hidden behind it.
pub struct WriteAheadLog {
    path: PathBuf,
    writer: Mutex<WalWriter>,
    sync_mode: SyncMode,
}

impl WriteAheadLog {
    /// Open (or create) the log file at `path`.
    pub fn open(path: &Path, sync_mode: SyncMode) -> KvResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(WalWriter {
                writer: BufWriter::new(file),
                offset,
            }),
            sync_mode,
        })
    }

    /// Append one record. Returns the byte offset it was written at.
    pub fn append(&self, record: &WalRecord) -> KvResult<u64> {
        let frame = encode_frame(record)?;
        let mut w = self.writer.lock().map_err(|_| KvError::LockPoisoned)?;
        let at = w.offset;

        if let Err(e) = write_frame(&mut w, &frame, self.sync_mode) {
            // A partial frame would hide every later record from recovery.
            if let Err(reset) = reset_to(&mut w, at) {
                warn!(offset = at, error = %reset, "cannot cut back failed wal append");
            }
            return Err(e.into());
        }
        w.offset += frame.len() as u64;

        debug!(offset = at, len = frame.len(), "wal append");
        Ok(at)
    }

    /// Read every intact record, front to back, and truncate whatever
    /// follows the last one.
    pub fn recover(&self) -> KvResult<Vec<WalRecord>> {
        let mut bytes = Vec::new();
        BufReader::new(File::open(&self.path)?).read_to_end(&mut bytes)?;

        let mut records = Vec::new();
        let mut offset = 0usize;
        while offset + HEADER_SIZE <= bytes.len() {
            let length = u32::from_le_bytes(read4(&bytes, offset)) as usize;
            let expected_crc = u32::from_le_bytes(read4(&bytes, offset + 4));
            let start = offset + HEADER_SIZE;

            if length == 0 || start + length > bytes.len() {
                warn!(offset, length, "truncated wal record; stopping recovery");
                break;
            }
            let payload = &bytes[start..start + length];
            let actual_crc = crc32fast::hash(payload);
            if actual_crc != expected_crc {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "wal checksum mismatch; stopping recovery"
                );
                break;
            }

            let record = bincode::deserialize::<WalRecord>(payload).map_err(|e| {
                KvError::CorruptLog {
                    path: self.path.clone(),
                    reason: format!("record at offset {offset}: {e}"),
                }
            })?;
            records.push(record);
            offset = start + length;
        }

        let end = offset as u64;
        let mut w = self.writer.lock().map_err(|_| KvError::LockPoisoned)?;
        if end < bytes.len() as u64 {
            warn!(
                valid = end,
                dropped = bytes.len() as u64 - end,
                "truncating wal after last intact record"
            );
            reset_to(&mut w, end)?;
        }

        debug!(recovered = records.len(), end, "wal recovery complete");
        Ok(records)
    }

    /// Replace the log contents with `records`, atomically via rename.
    pub fn rewrite(&self, records: &[WalRecord]) -> KvResult<()> {
        let tmp = self.path.with_extension("compact");
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            for record in records {
                out.write_all(&encode_frame(record)?)?;
            }
            out.flush()?;
            out.get_ref().sync_all()?;
        }

        let mut w = self.writer.lock().map_err(|_| KvError::LockPoisoned)?;
        fs::rename(&tmp, &self.path)?;
        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        w.offset = file.metadata()?.len();
        w.writer = BufWriter::new(file);

        debug!(records = records.len(), bytes = w.offset, "wal rewritten");
        Ok(())
    }

    /// Current end-of-log offset in bytes.
    pub fn offset(&self) -> u64 {
        self.writer.lock().map(|w| w.offset).unwrap_or(0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for WriteAheadLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteAheadLog")
            .field("path", &self.path)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

fn encode_frame(record: &WalRecord) -> KvResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| KvError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len()).map_err(|_| {
        KvError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "wal record exceeds 4 GiB",
        ))
    })?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn write_frame(w: &mut WalWriter, frame: &[u8], sync_mode: SyncMode) -> io::Result<()> {
    w.writer.write_all(frame)?;
    w.writer.flush()?;
    if sync_mode == SyncMode::EveryWrite {
        w.writer.get_ref().sync_data()?;
    }
    Ok(())
}

/// Cut the file back to `len` and drop anything still buffered.
fn reset_to(w: &mut WalWriter, len: u64) -> io::Result<()> {
    let file = w.writer.get_ref().try_clone()?;
    file.set_len(len)?;
    let stale = std::mem::replace(&mut w.writer, BufWriter::new(file));
    // into_parts discards the buffer instead of flushing it on drop
    drop(stale.into_parts());
    w.offset = len;
    Ok(())
}

fn read4(bytes: &[u8], at: usize) -> [u8; 4] {
    [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]
}
