//! Record padding.

use crate::config::PaddingPolicy;

/// Pads `data` to `record_size` bytes according to `policy`.
///
/// `data` must be non-empty and at most `record_size` bytes; callers
/// validate both before padding.
#[must_use]
pub fn pad_record(data: &[u8], record_size: usize, policy: PaddingPolicy) -> Vec<u8> {
    let mut record = Vec::with_capacity(record_size);
    record.extend_from_slice(data);

    let fill = match policy {
        PaddingPolicy::RepeatLastByte => data.last().copied().unwrap_or(0),
        PaddingPolicy::Zero => 0,
    };
    record.resize(record_size.max(data.len()), fill);
    record
}
