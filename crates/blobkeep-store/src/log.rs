use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SyncMode;
use crate::error::BackendError;
use crate::record::{Collection, StoredRecord};

/// Header size: 4 bytes length + 4 bytes CRC.
pub(crate) const HEADER_SIZE: u64 = 8;

/// One mutation in the log.
///
/// On-disk framing:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized LogEntry)]
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) enum LogEntry {
    CreateCollection(Collection),
    Put {
        collection: Collection,
        record: StoredRecord,
    },
    Delete {
        collection: Collection,
        key: String,
    },
    Clear,
}

/// Position of a framed entry in the segment, header included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Frame {
    pub offset: u64,
    pub len: u64,
}

/// Append-only segment file holding framed [`LogEntry`] values.
///
/// Not internally synchronized: the owner serializes access.
pub(crate) struct LogSegment {
    path: PathBuf,
    file: File,
    len: u64,
    sync_mode: SyncMode,
}

impl LogSegment {
    /// Open (or create) the segment at `path`.
    pub fn open(path: &Path, sync_mode: SyncMode) -> Result<Self, BackendError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
            sync_mode,
        })
    }

    /// Create an empty segment at `path`, replacing any file already there.
    pub fn create(path: &Path, sync_mode: SyncMode) -> Result<Self, BackendError> {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            len: 0,
            sync_mode,
        })
    }

    /// Append one entry and return its frame.
    ///
    /// A failed write is rolled back so the segment never keeps a torn frame
    /// in front of later appends.
    pub fn append(&mut self, entry: &LogEntry) -> Result<Frame, BackendError> {
        let payload = bincode::serialize(entry)?;
        let length = u32::try_from(payload.len()).map_err(|_| {
            BackendError::Serialization(format!("entry of {} bytes exceeds the frame limit", payload.len()))
        })?;
        let crc = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(HEADER_SIZE as usize + payload.len());
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&payload);

        if let Err(e) = self.write_frame(&frame) {
            if let Err(rollback) = self.file.set_len(self.len) {
                warn!(offset = self.len, error = %rollback, "failed to roll back torn log append");
            }
            return Err(e.into());
        }

        let offset = self.len;
        self.len += frame.len() as u64;
        debug!(offset, len = payload.len(), "log append");
        Ok(Frame {
            offset,
            len: frame.len() as u64,
        })
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.file.write_all(frame)?;
        match self.sync_mode {
            SyncMode::EveryWrite => self.file.sync_data(),
            SyncMode::OsDefault => self.file.flush(),
        }
    }

    /// Read and verify the entry at `frame`.
    pub fn read_at(&mut self, frame: Frame) -> Result<LogEntry, BackendError> {
        let corrupt = |reason: String| BackendError::Corrupt {
            offset: frame.offset,
            reason,
        };

        self.file.seek(SeekFrom::Start(frame.offset))?;
        let mut header = [0u8; HEADER_SIZE as usize];
        self.file.read_exact(&mut header)?;
        let (length, expected_crc) = parse_header(&header);
        if HEADER_SIZE + u64::from(length) != frame.len {
            return Err(corrupt(format!(
                "frame length {} does not match index length {}",
                HEADER_SIZE + u64::from(length),
                frame.len
            )));
        }

        let mut payload = vec![0u8; length as usize];
        self.file.read_exact(&mut payload)?;
        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            return Err(corrupt(format!(
                "CRC mismatch: expected {expected_crc:#010x}, computed {actual_crc:#010x}"
            )));
        }
        bincode::deserialize(&payload).map_err(|e| corrupt(e.to_string()))
    }

    /// Replay the segment front-to-back, handing every valid entry to `visit`.
    ///
    /// Stops at the first torn, CRC-failing or undecodable frame and returns
    /// the length of the valid prefix. Entries after a bad frame are never
    /// replayed, so the recovered state is always a prefix of the history.
    pub fn scan(&mut self, mut visit: impl FnMut(Frame, LogEntry)) -> Result<u64, BackendError> {
        let file_len = self.file.metadata()?.len();
        let mut reader = BufReader::new(&self.file);
        reader.seek(SeekFrom::Start(0))?;
        let mut offset: u64 = 0;
        let mut replayed = 0usize;

        while offset + HEADER_SIZE <= file_len {
            let mut header = [0u8; HEADER_SIZE as usize];
            reader.read_exact(&mut header)?;
            let (length, expected_crc) = parse_header(&header);

            let end = offset + HEADER_SIZE + u64::from(length);
            if length == 0 || end > file_len {
                warn!(offset, length, file_len, "torn log entry; stopping replay");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            reader.read_exact(&mut payload)?;

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "CRC mismatch; stopping replay"
                );
                break;
            }

            match bincode::deserialize::<LogEntry>(&payload) {
                Ok(entry) => visit(
                    Frame {
                        offset,
                        len: end - offset,
                    },
                    entry,
                ),
                Err(e) => {
                    warn!(offset, error = %e, "undecodable log entry; stopping replay");
                    break;
                }
            }

            replayed += 1;
            offset = end;
        }

        debug!(replayed, valid_len = offset, file_len, "log replay complete");
        Ok(offset)
    }

    /// Cut the segment back to `len` bytes.
    pub fn truncate(&mut self, len: u64) -> Result<(), BackendError> {
        self.file.set_len(len)?;
        self.file.sync_all()?;
        self.len = len;
        Ok(())
    }

    pub fn sync(&mut self) -> Result<(), BackendError> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Atomically move the segment file to `path`, replacing what is there.
    pub fn rename_to(&mut self, path: &Path) -> Result<(), BackendError> {
        fs::rename(&self.path, path)?;
        self.path = path.to_path_buf();
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_header(header: &[u8; HEADER_SIZE as usize]) -> (u32, u32) {
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    (length, crc)
}
