//! The write-ahead log instance.
//!
//! A [`Wal`] owns a data directory of numbered segment files, an
//! append-mode handle on the current segment wrapped in a buffered
//! writer, and a background flush thread. A single writer appends
//! records under the exclusive lock while readers decode segments
//! through their own read-only handles.

mod flusher;
mod repair;

use crate::config::Config;
use crate::dir::WalDir;
use crate::error::{WalError, WalResult};
use crate::record::Record;
use crate::segment::{Segment, SegmentReader};
use flusher::FlushScheduler;
use parking_lot::RwLock;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Writer-side state guarded by the instance lock.
pub(crate) struct WalInner {
    dir: WalDir,
    writer: BufWriter<File>,
    max_log_size: u64,
    last_segment_no: u32,
    last_sequence_no: i32,
}

impl WalInner {
    /// Flushes the write buffer to the operating system.
    ///
    /// This is the "sync" of the on-disk contract: it pushes user-space
    /// buffered bytes to the kernel but does not force them to stable
    /// storage.
    fn flush(&mut self) -> WalResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and then forces data to stable storage with `fdatasync`.
    fn fsync(&mut self) -> WalResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    /// Assigns the next sequence number, frames a record, and writes it
    /// through the buffer, rotating first if the current segment is full.
    fn append_record(&mut self, data: &[u8], checkpoint: bool) -> WalResult<()> {
        let seq = self.last_sequence_no + 1;
        let record = if checkpoint {
            Record::checkpoint_marker(seq)
        } else {
            Record::new(seq, data.to_vec())
        };
        let frame = record.encode_frame()?;

        // The size check runs against the flushed on-disk size; bytes
        // still in the buffer are not counted, so a segment may exceed
        // the limit by up to one buffered frame.
        let flushed = self.writer.get_ref().metadata()?.len();
        if flushed + frame.len() as u64 > self.max_log_size {
            self.rotate()?;
        }

        self.writer.write_all(&frame)?;
        self.last_sequence_no = seq;
        Ok(())
    }

    /// Flushes the current segment and switches the writer to a fresh
    /// one.
    ///
    /// If the frame write that follows fails, the new empty segment is
    /// left in place.
    fn rotate(&mut self) -> WalResult<()> {
        self.flush()?;

        let next_segment_no = self.last_segment_no + 1;
        let segment = Segment::new(&self.dir, next_segment_no);
        let file = segment.open_append()?;

        debug!(segment = next_segment_no, "rotating to new segment");

        self.writer = BufWriter::new(file);
        self.last_segment_no = next_segment_no;
        Ok(())
    }
}

/// A single-writer, append-only, crash-recoverable write-ahead log.
///
/// # Durability
///
/// [`Wal::sync`] flushes the write buffer to the operating system; it
/// does **not** fsync. Data survives a process crash after `sync`, but
/// not necessarily a power loss. Use [`Wal::fsync`] for the stronger
/// guarantee.
///
/// # Example
///
/// ```no_run
/// use seglog_core::Wal;
/// use std::path::Path;
///
/// let wal = Wal::open(Path::new("data"), 1024).unwrap();
/// wal.write(b"hello").unwrap();
/// wal.sync().unwrap();
/// assert_eq!(wal.read().unwrap(), vec![b"hello".to_vec()]);
/// ```
pub struct Wal {
    dir: WalDir,
    inner: Arc<RwLock<WalInner>>,
    flusher: FlushScheduler,
    is_open: RwLock<bool>,
}

impl Wal {
    /// Opens a WAL over the given directory with a segment size limit in
    /// kilobytes.
    ///
    /// The directory is created if missing. If segment files exist, the
    /// highest-numbered one becomes the append target and the last
    /// sequence number is recovered from its tail; a torn tail triggers
    /// one implicit [`Wal::repair`].
    pub fn open(path: &Path, max_kb: u32) -> WalResult<Self> {
        Self::open_with_config(
            path,
            Config::default().max_log_size(u64::from(max_kb) * 1024),
        )
    }

    /// Opens a WAL with explicit configuration.
    pub fn open_with_config(path: &Path, config: Config) -> WalResult<Self> {
        let dir = WalDir::open(path, config.create_if_missing)?;

        let last_segment_no = dir.max_segment()?.unwrap_or(1);
        let segment = Segment::new(&dir, last_segment_no);
        let writer = BufWriter::new(segment.open_append()?);

        let mut inner = WalInner {
            dir: dir.clone(),
            writer,
            max_log_size: config.max_log_size,
            last_segment_no,
            last_sequence_no: 0,
        };

        match SegmentReader::open(&segment)?.scan_tail() {
            Ok(Some(record)) => inner.last_sequence_no = record.seq,
            Ok(None) => {}
            Err(e) => {
                warn!(
                    segment = last_segment_no,
                    error = %e,
                    "torn tail detected at open, repairing"
                );
                repair::repair_segments(&mut inner)?;
            }
        }

        info!(
            path = %path.display(),
            segment = inner.last_segment_no,
            sequence = inner.last_sequence_no,
            "wal opened"
        );

        let inner = Arc::new(RwLock::new(inner));
        let flusher = FlushScheduler::spawn(Arc::clone(&inner), config.sync_interval)?;

        Ok(Self {
            dir,
            inner,
            flusher,
            is_open: RwLock::new(true),
        })
    }

    /// Appends an opaque payload and assigns it the next sequence
    /// number.
    pub fn write(&self, payload: &[u8]) -> WalResult<()> {
        self.ensure_open()?;
        self.inner.write().append_record(payload, false)
    }

    /// Appends a checkpoint barrier: an empty-payload record with the
    /// checkpoint flag set. It is framed, checksummed, rotated, and
    /// repaired like any other record.
    pub fn create_checkpoint(&self) -> WalResult<()> {
        self.ensure_open()?;
        self.inner.write().append_record(&[], true)
    }

    /// Flushes buffered writes to the operating system.
    ///
    /// This does not fsync; see the type-level documentation.
    pub fn sync(&self) -> WalResult<()> {
        self.ensure_open()?;
        self.inner.write().flush()
    }

    /// Flushes and then forces written data to stable storage.
    pub fn fsync(&self) -> WalResult<()> {
        self.ensure_open()?;
        self.inner.write().fsync()
    }

    /// Reads every payload in the current segment, in write order.
    pub fn read(&self) -> WalResult<Vec<Vec<u8>>> {
        self.ensure_open()?;
        let segment_no = self.inner.read().last_segment_no;
        self.read_segment_payloads(segment_no)
    }

    /// Reads every payload from segment `segment_no` through the current
    /// segment, in write order.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if `segment_no` is zero.
    pub fn read_from_segment(&self, segment_no: u32) -> WalResult<Vec<Vec<u8>>> {
        self.ensure_open()?;
        if segment_no < 1 {
            return Err(WalError::invalid_argument("segment numbers start at 1"));
        }

        let last = self.inner.read().last_segment_no;

        let mut payloads = Vec::new();
        for n in segment_no..=last {
            payloads.extend(self.read_segment_payloads(n)?);
        }
        Ok(payloads)
    }

    /// Reads every payload written strictly after the most recent
    /// checkpoint record, across all segments.
    ///
    /// Segments are scanned from the current one back to segment 1; the
    /// last record with the checkpoint flag wins. With no checkpoint
    /// anywhere, this is equivalent to `read_from_segment(1)`.
    pub fn read_from_last_checkpoint(&self) -> WalResult<Vec<Vec<u8>>> {
        self.ensure_open()?;
        let last = self.inner.read().last_segment_no;

        // Segments after the checkpoint, collected newest-first while
        // scanning backwards.
        let mut later_segments: Vec<Vec<Vec<u8>>> = Vec::new();

        for n in (1..=last).rev() {
            let records = SegmentReader::open(&Segment::new(&self.dir, n))?.read_all()?;

            if let Some(at) = records.iter().rposition(|r| r.checkpoint) {
                let mut payloads: Vec<Vec<u8>> =
                    records[at + 1..].iter().map(|r| r.data.clone()).collect();
                for segment_payloads in later_segments.into_iter().rev() {
                    payloads.extend(segment_payloads);
                }
                return Ok(payloads);
            }

            later_segments.push(records.into_iter().map(|r| r.data).collect());
        }

        let mut payloads = Vec::new();
        for segment_payloads in later_segments.into_iter().rev() {
            payloads.extend(segment_payloads);
        }
        Ok(payloads)
    }

    /// Truncates every segment to its longest valid frame prefix,
    /// dropping torn or corrupt tails.
    ///
    /// The write buffer is flushed first so buffered tail bytes take
    /// part in the walk. Repair is idempotent and never adds records.
    pub fn repair(&self) -> WalResult<()> {
        self.ensure_open()?;
        {
            let mut inner = self.inner.write();
            inner.flush()?;
            repair::repair_segments(&mut inner)?;
        }
        self.flusher.reset();
        Ok(())
    }

    /// Stops the flush thread and flushes outstanding writes.
    /// Idempotent; called automatically on drop.
    pub fn close(&self) -> WalResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }

        self.flusher.shutdown();
        self.inner.write().flush()?;

        *is_open = false;
        Ok(())
    }

    /// Returns the data directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the number of the current (highest) segment.
    #[must_use]
    pub fn last_segment(&self) -> u32 {
        self.inner.read().last_segment_no
    }

    /// Returns the highest sequence number written or recovered.
    #[must_use]
    pub fn last_sequence(&self) -> i32 {
        self.inner.read().last_sequence_no
    }

    fn read_segment_payloads(&self, segment_no: u32) -> WalResult<Vec<Vec<u8>>> {
        let records = SegmentReader::open(&Segment::new(&self.dir, segment_no))?.read_all()?;
        Ok(records.into_iter().map(|r| r.data).collect())
    }

    fn ensure_open(&self) -> WalResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(WalError::Closed)
        }
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for Wal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Wal")
            .field("path", &self.dir.path())
            .field("last_segment_no", &inner.last_segment_no)
            .field("last_sequence_no", &inner.last_sequence_no)
            .field("max_log_size", &inner.max_log_size)
            .finish_non_exhaustive()
    }
}
