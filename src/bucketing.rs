//! Deterministic percentage buckets.
//!
//! A context id (usually user id joined with a feature name) is hashed with SHA-256,
//! the first four bytes of the digest are read as a little-endian `u32`
//! and scaled into `[0, 100]`. The same id always lands in the same bucket,
//! so increasing a rollout percentage only adds users.

use sha2::{Digest, Sha256};

/// Returns bucket of the `context_id` in percents.
pub fn context_percentage(context_id: &str) -> f64 {
    let digest = Sha256::digest(context_id.as_bytes());
    let value = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);

    value as f64 / u32::MAX as f64 * 100.0
}

/// Returns `true` if bucket of the `context_id` is less than `percentage`.
pub fn is_targeted(context_id: &str, percentage: f64) -> bool {
    context_percentage(context_id) < percentage
}

/// Returns `true` if bucket of the `context_id` is within `[from, to)`.
///
/// `to == 100` includes the upper bound, so `[0, 100]` covers every context.
pub fn is_targeted_in_range(context_id: &str, from: f64, to: f64) -> bool {
    let percentage = context_percentage(context_id);

    if to == 100.0 {
        percentage >= from
    } else {
        from <= percentage && percentage < to
    }
}
