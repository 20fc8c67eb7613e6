//! Segment repair.
//!
//! Repair truncates every segment to its longest fully-valid frame
//! prefix. Each segment is rebuilt through a temporary file and swapped
//! in with an atomic rename, so a crash mid-repair leaves either the old
//! or the new image, never a mix. The walk never extends a segment:
//! repair is idempotent and can only drop records.

use crate::error::WalResult;
use crate::segment::{Segment, SegmentReader};
use crate::wal::WalInner;
use std::io::BufWriter;
use tracing::{info, warn};

/// Repairs segments 1..=last and reinstalls the current segment as the
/// live append target.
///
/// The caller must have flushed the write buffer first so that buffered
/// tail bytes are part of the walk, and must hold the exclusive lock.
pub(crate) fn repair_segments(inner: &mut WalInner) -> WalResult<()> {
    let mut last_valid_seq = 0;
    let mut dropped_segments = 0;

    for segment_no in 1..=inner.last_segment_no {
        let segment = Segment::new(&inner.dir, segment_no);
        let prefix = SegmentReader::open(&segment)?.valid_prefix()?;

        if !prefix.clean {
            warn!(
                segment = segment_no,
                surviving = prefix.records,
                "dropping torn tail during repair"
            );
            dropped_segments += 1;
        }

        inner.dir.replace_segment(segment_no, &prefix.bytes)?;

        if let Some(record) = prefix.last {
            last_valid_seq = record.seq;
        }
    }

    // Reinstall the current segment as the append target. The renamed
    // file is reopened by path; the handle that wrote the temporary
    // image is never reused.
    let current = Segment::new(&inner.dir, inner.last_segment_no);
    inner.writer = BufWriter::new(current.open_append()?);
    inner.last_sequence_no = last_valid_seq;

    info!(
        segments = inner.last_segment_no,
        repaired = dropped_segments,
        last_sequence = last_valid_seq,
        "repair complete"
    );

    Ok(())
}
