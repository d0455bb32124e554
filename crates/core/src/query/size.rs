//! Enumerated size buckets used by the advanced search form.

/// Base unit of the bucket table (100 MiB).
pub const BUCKET_UNIT_BYTES: u64 = 104_857_600;

/// Bucket multipliers in tenths of [`BUCKET_UNIT_BYTES`], indexed from 1.
const BUCKET_TENTHS: [u64; 11] = [10, 25, 50, 100, 200, 300, 400, 800, 1600, 3200, 6400];

/// Byte threshold for a bucket index in `1..=11`.
///
/// Out-of-range indices (including `0`, the form's "any" choice) yield
/// `None` and apply no bound.
pub fn bucket_bytes(index: u8) -> Option<u64> {
    let slot = usize::from(index).checked_sub(1)?;
    BUCKET_TENTHS
        .get(slot)
        .map(|tenths| BUCKET_UNIT_BYTES * tenths / 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_buckets() {
        assert_eq!(bucket_bytes(1), Some(104_857_600));
        assert_eq!(bucket_bytes(2), Some(262_144_000));
        assert_eq!(bucket_bytes(3), Some(524_288_000));
    }

    #[test]
    fn test_last_bucket() {
        assert_eq!(bucket_bytes(11), Some(104_857_600 * 640));
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(bucket_bytes(0), None);
        assert_eq!(bucket_bytes(12), None);
    }

    #[test]
    fn test_buckets_are_increasing() {
        let sizes: Vec<u64> = (1..=11).filter_map(bucket_bytes).collect();
        assert_eq!(sizes.len(), 11);
        assert!(sizes.windows(2).all(|w| w[0] < w[1]));
    }
}
