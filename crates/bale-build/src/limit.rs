/// Largest accepted archive is one byte below this (decimal megabytes).
pub const SIZE_LIMIT_BYTES: u64 = 50_000_000;

/// Returns `true` if the archive is at or above [`SIZE_LIMIT_BYTES`].
pub fn exceeds_limit(archive: &[u8]) -> bool {
    let size = archive.len() as u64;
    tracing::debug!(size_mb = size as f64 / 1_000_000.0, "archive size");
    if size >= SIZE_LIMIT_BYTES {
        tracing::error!(
            size,
            limit = SIZE_LIMIT_BYTES,
            "archive exceeds the size limit and will not be written"
        );
        return true;
    }
    false
}
