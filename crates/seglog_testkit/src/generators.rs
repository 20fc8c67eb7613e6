//! Property-based test generators using proptest.

use proptest::prelude::*;
use seglog_core::Record;

/// Strategy for generating arbitrary record payloads.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..1024)
}

/// Strategy for generating sequence numbers the WAL could assign.
pub fn sequence_strategy() -> impl Strategy<Value = i32> {
    1..i32::MAX
}

/// Strategy for generating a stream of (payload, is_checkpoint) writes.
pub fn write_stream_strategy() -> impl Strategy<Value = Vec<(Vec<u8>, bool)>> {
    prop::collection::vec((payload_strategy(), prop::bool::weighted(0.1)), 0..32)
}

/// Builds the record a WAL write would produce for one stream entry.
#[must_use]
pub fn record_for(seq: i32, payload: &[u8], checkpoint: bool) -> Record {
    if checkpoint {
        Record::checkpoint_marker(seq)
    } else {
        Record::new(seq, payload.to_vec())
    }
}
