//! Binary-search packer: the largest prefix of a batch whose real encoding
//! fits a byte budget.
//!
//! Each probe encodes the candidate prefix for real. The size calculator is
//! only used upstream to pre-truncate; the encoded length is what counts.

use crate::error::PackError;

/// An ordered batch that can be truncated to a prefix and encoded.
///
/// Encoded size must be non-decreasing in prefix length.
pub trait Packable: Sized {
    /// Number of candidate items.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first `n` items, with any non-item fields kept as they are.
    fn prefix(&self, n: usize) -> Self;

    /// The full encoded message.
    fn encode(&self) -> Vec<u8>;

    /// Execution ids of the included items, in order.
    fn item_ids(&self) -> Vec<String>;
}

/// Result of packing: the chosen prefix, its encoded bytes, and the ids it
/// contains.
#[derive(Debug)]
pub struct PackedBatch<B> {
    pub batch: B,
    pub encoded: Vec<u8>,
    pub ids: Vec<String>,
}

/// Finds the longest non-empty prefix of `batch` whose encoding is at most
/// `limit` bytes.
///
/// # Errors
///
/// `PackError::NoSuitableBatchSize` if not even a single item fits, or the
/// batch is empty.
pub fn pack_to_size_limit<B: Packable>(batch: &B, limit: usize) -> Result<PackedBatch<B>, PackError> {
    let mut lo = 0;
    let mut hi = batch.len();
    let mut best: Option<(B, Vec<u8>)> = None;

    while lo < hi {
        // round up so that a [0, 1] range probes 1 instead of stalling at 0
        let mid = lo + (hi - lo + 1) / 2;
        let candidate = batch.prefix(mid);
        let encoded = candidate.encode();

        if encoded.len() <= limit {
            lo = mid;
            best = Some((candidate, encoded));
        } else {
            hi = mid - 1;
        }
    }

    let (batch_out, encoded) = best.ok_or(PackError::NoSuitableBatchSize {
        candidates: batch.len(),
        limit,
    })?;
    let ids = batch_out.item_ids();

    Ok(PackedBatch {
        batch: batch_out,
        encoded,
        ids,
    })
}
