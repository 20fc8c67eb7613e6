//! Frame-level segment reading.
//!
//! Three walks share the frame parser:
//!
//! - [`SegmentReader::read_all`]: strict decode of a whole segment; the
//!   first bad frame fails the read.
//! - [`SegmentReader::valid_prefix`]: longest fully-valid byte prefix,
//!   used by repair; the first bad frame ends the walk instead of failing.
//! - [`SegmentReader::scan_tail`]: seeks past interior payloads and
//!   validates only the final frame, used for open-time recovery of the
//!   last sequence number. A corrupted interior frame is not seen here;
//!   full validation is repair's job.

use crate::error::{WalError, WalResult};
use crate::record::{self, Record, LEN_PREFIX_SIZE};
use crate::segment::Segment;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

/// The result of a [`SegmentReader::valid_prefix`] walk.
#[derive(Debug)]
pub struct ValidPrefix {
    /// Byte image of every frame that fully passed, in file order.
    pub bytes: Vec<u8>,
    /// The last record in the surviving prefix.
    pub last: Option<Record>,
    /// Number of surviving records.
    pub records: usize,
    /// True if the walk ended at a clean end-of-file rather than at a
    /// torn or corrupt frame.
    pub clean: bool,
}

/// Reads framed records from one segment file.
pub struct SegmentReader {
    segment_no: u32,
    reader: BufReader<File>,
    /// Current read position in bytes.
    offset: u64,
    /// Segment size sampled at open. Readers racing an active writer may
    /// see frames beyond this; they surface as read errors.
    file_len: u64,
}

impl SegmentReader {
    /// Opens an independent read-only handle on the segment.
    pub fn open(segment: &Segment) -> WalResult<Self> {
        let file = segment.open_read()?;
        let file_len = file.metadata()?.len();
        Ok(Self {
            segment_no: segment.number(),
            reader: BufReader::new(file),
            offset: 0,
            file_len,
        })
    }

    /// Reads every record in the segment, in write order.
    ///
    /// # Errors
    ///
    /// Fails on the first frame with a short header, short payload,
    /// undecodable body, or checksum mismatch.
    pub fn read_all(&mut self) -> WalResult<Vec<Record>> {
        let mut records = Vec::new();
        while let Some((_, record)) = self.next_frame()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Walks frames from the start and accumulates the byte image of
    /// every frame that fully passes. The first failure of any kind ends
    /// the walk; it is not an error.
    pub fn valid_prefix(&mut self) -> WalResult<ValidPrefix> {
        let mut prefix = ValidPrefix {
            bytes: Vec::new(),
            last: None,
            records: 0,
            clean: false,
        };

        loop {
            match self.next_frame() {
                Ok(None) => {
                    prefix.clean = true;
                    break;
                }
                Ok(Some((body, record))) => {
                    prefix
                        .bytes
                        .extend_from_slice(&(body.len() as u32).to_le_bytes());
                    prefix.bytes.extend_from_slice(&body);
                    prefix.last = Some(record);
                    prefix.records += 1;
                }
                Err(_) => break,
            }
        }

        Ok(prefix)
    }

    /// Seeks through the segment frame by frame and returns the final
    /// record, validating only that one.
    ///
    /// Returns `Ok(None)` for an empty segment. A torn or invalid tail
    /// surfaces as an error so the caller can trigger repair.
    pub fn scan_tail(&mut self) -> WalResult<Option<Record>> {
        let mut last: Option<(u64, u32)> = None;

        loop {
            let Some(len) = self.read_len_prefix()? else {
                break;
            };
            let payload_offset = self.offset;
            last = Some((payload_offset, len));
            self.seek_to(payload_offset + u64::from(len))?;
        }

        let Some((payload_offset, len)) = last else {
            return Ok(None);
        };

        let frame_start = payload_offset - LEN_PREFIX_SIZE as u64;
        self.seek_to(payload_offset)?;
        let body = self.read_body(frame_start, len)?;
        let record = self.decode_frame(frame_start, &body)?;
        Ok(Some(record))
    }

    /// Reads the next frame: length prefix, payload, decode, checksum.
    ///
    /// Returns `Ok(None)` at a clean end-of-file.
    fn next_frame(&mut self) -> WalResult<Option<(Vec<u8>, Record)>> {
        let frame_start = self.offset;
        let Some(len) = self.read_len_prefix()? else {
            return Ok(None);
        };
        let body = self.read_body(frame_start, len)?;
        let record = self.decode_frame(frame_start, &body)?;
        Ok(Some((body, record)))
    }

    /// Reads the 4-byte little-endian frame length.
    ///
    /// Returns `Ok(None)` if the file ends exactly on a frame boundary.
    /// A partial prefix is a truncated frame.
    fn read_len_prefix(&mut self) -> WalResult<Option<u32>> {
        let mut buf = [0u8; LEN_PREFIX_SIZE];
        let filled = read_available(&mut self.reader, &mut buf)?;

        if filled == 0 {
            return Ok(None);
        }
        if filled < LEN_PREFIX_SIZE {
            return Err(WalError::truncated_frame(
                self.segment_no,
                self.offset,
                format!("short length prefix: {filled} of {LEN_PREFIX_SIZE} bytes"),
            ));
        }

        self.offset += LEN_PREFIX_SIZE as u64;
        Ok(Some(u32::from_le_bytes(buf)))
    }

    /// Reads exactly `len` payload bytes for the frame at `frame_start`.
    fn read_body(&mut self, frame_start: u64, len: u32) -> WalResult<Vec<u8>> {
        // Reject lengths that point past the segment before allocating.
        if self.offset + u64::from(len) > self.file_len {
            return Err(WalError::truncated_frame(
                self.segment_no,
                frame_start,
                format!(
                    "payload of {len} bytes extends past end of segment ({} bytes)",
                    self.file_len
                ),
            ));
        }

        let mut body = vec![0u8; len as usize];
        let filled = read_available(&mut self.reader, &mut body)?;
        if filled < body.len() {
            return Err(WalError::truncated_frame(
                self.segment_no,
                frame_start,
                format!("short payload: {filled} of {len} bytes"),
            ));
        }

        self.offset += u64::from(len);
        Ok(body)
    }

    /// Decodes a frame body and validates its checksum.
    fn decode_frame(&self, frame_start: u64, body: &[u8]) -> WalResult<Record> {
        let record = Record::decode(body).map_err(|e| {
            WalError::truncated_frame(
                self.segment_no,
                frame_start,
                format!("record decode failed: {e}"),
            )
        })?;

        let actual = record::checksum(&record.data, record.seq);
        if record.crc as u32 != actual {
            return Err(WalError::ChecksumMismatch {
                segment: self.segment_no,
                seq: record.seq,
                expected: record.crc as u32,
                actual,
            });
        }

        Ok(record)
    }

    fn seek_to(&mut self, pos: u64) -> WalResult<()> {
        self.reader.seek(SeekFrom::Start(pos))?;
        self.offset = pos;
        Ok(())
    }
}

/// Reads into `buf` until it is full or the file ends, returning the
/// number of bytes read.
fn read_available(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir::WalDir;
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use tempfile::tempdir;

    fn write_segment(dir: &WalDir, segment_no: u32, records: &[Record]) -> Segment {
        let segment = Segment::new(dir, segment_no);
        let mut file = segment.open_append().unwrap();
        for record in records {
            file.write_all(&record.encode_frame().unwrap()).unwrap();
        }
        segment
    }

    fn append_raw(segment: &Segment, bytes: &[u8]) {
        let mut file = OpenOptions::new()
            .append(true)
            .open(segment.path())
            .unwrap();
        file.write_all(bytes).unwrap();
    }

    #[test]
    fn read_all_empty_segment() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let segment = write_segment(&dir, 1, &[]);

        let records = SegmentReader::open(&segment).unwrap().read_all().unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn read_all_returns_records_in_order() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let written = vec![
            Record::new(1, b"first".to_vec()),
            Record::new(2, b"second".to_vec()),
            Record::checkpoint_marker(3),
        ];
        let segment = write_segment(&dir, 1, &written);

        let records = SegmentReader::open(&segment).unwrap().read_all().unwrap();
        assert_eq!(records, written);
    }

    #[test]
    fn read_all_fails_on_garbage_tail() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let segment = write_segment(&dir, 1, &[Record::new(1, b"ok".to_vec())]);
        append_raw(&segment, b"corrupted data");

        let result = SegmentReader::open(&segment).unwrap().read_all();
        assert!(matches!(result, Err(WalError::TruncatedFrame { .. })));
    }

    #[test]
    fn read_all_fails_on_checksum_mismatch() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let mut record = Record::new(1, b"payload".to_vec());
        record.crc ^= 1;
        let segment = write_segment(&dir, 1, &[record]);

        let result = SegmentReader::open(&segment).unwrap().read_all();
        assert!(matches!(
            result,
            Err(WalError::ChecksumMismatch { segment: 1, seq: 1, .. })
        ));
    }

    #[test]
    fn read_all_fails_on_short_payload() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let segment = write_segment(&dir, 1, &[Record::new(1, b"data".to_vec())]);

        let full = fs::read(segment.path()).unwrap();
        fs::write(segment.path(), &full[..full.len() - 3]).unwrap();

        let result = SegmentReader::open(&segment).unwrap().read_all();
        assert!(matches!(result, Err(WalError::TruncatedFrame { .. })));
    }

    #[test]
    fn valid_prefix_of_clean_segment_keeps_everything() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let written = vec![Record::new(1, b"a".to_vec()), Record::new(2, b"b".to_vec())];
        let segment = write_segment(&dir, 1, &written);
        let image = fs::read(segment.path()).unwrap();

        let prefix = SegmentReader::open(&segment)
            .unwrap()
            .valid_prefix()
            .unwrap();
        assert!(prefix.clean);
        assert_eq!(prefix.records, 2);
        assert_eq!(prefix.bytes, image);
        assert_eq!(prefix.last.unwrap().seq, 2);
    }

    #[test]
    fn valid_prefix_drops_torn_tail() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let written = vec![Record::new(1, b"a".to_vec()), Record::new(2, b"b".to_vec())];
        let segment = write_segment(&dir, 1, &written);
        let image = fs::read(segment.path()).unwrap();
        append_raw(&segment, &[0xDE, 0xAD, 0xBE]);

        let prefix = SegmentReader::open(&segment)
            .unwrap()
            .valid_prefix()
            .unwrap();
        assert!(!prefix.clean);
        assert_eq!(prefix.records, 2);
        assert_eq!(prefix.bytes, image);
    }

    #[test]
    fn valid_prefix_of_pure_garbage_is_empty() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let segment = Segment::new(&dir, 1);
        fs::write(segment.path(), b"not a wal segment at all").unwrap();

        let prefix = SegmentReader::open(&segment)
            .unwrap()
            .valid_prefix()
            .unwrap();
        assert_eq!(prefix.records, 0);
        assert!(prefix.bytes.is_empty());
        assert!(prefix.last.is_none());
    }

    #[test]
    fn scan_tail_empty_segment() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let segment = write_segment(&dir, 1, &[]);

        let tail = SegmentReader::open(&segment).unwrap().scan_tail().unwrap();
        assert!(tail.is_none());
    }

    #[test]
    fn scan_tail_returns_last_record() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let written = vec![
            Record::new(1, b"first".to_vec()),
            Record::new(2, b"middle".to_vec()),
            Record::new(3, b"last".to_vec()),
        ];
        let segment = write_segment(&dir, 1, &written);

        let tail = SegmentReader::open(&segment).unwrap().scan_tail().unwrap();
        assert_eq!(tail.unwrap(), written[2]);
    }

    #[test]
    fn scan_tail_errors_on_torn_tail() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let segment = write_segment(&dir, 1, &[Record::new(1, b"good".to_vec())]);
        append_raw(&segment, b"torn bytes at the end");

        let result = SegmentReader::open(&segment).unwrap().scan_tail();
        assert!(result.is_err());
    }

    #[test]
    fn scan_tail_skips_interior_without_validation() {
        // An interior frame with a broken checksum goes unnoticed by the
        // tail scan as long as the final frame is intact.
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let mut bad = Record::new(1, b"interior".to_vec());
        bad.crc ^= 1;
        let good = Record::new(2, b"tail".to_vec());
        let segment = write_segment(&dir, 1, &[bad, good.clone()]);

        let tail = SegmentReader::open(&segment).unwrap().scan_tail().unwrap();
        assert_eq!(tail.unwrap(), good);
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        let segment = Segment::new(&dir, 1);

        let mut bytes = u32::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"tiny");
        fs::write(segment.path(), &bytes).unwrap();

        let result = SegmentReader::open(&segment).unwrap().read_all();
        assert!(matches!(result, Err(WalError::TruncatedFrame { .. })));
    }
}
