//! Stable percentage bucketing.
use crate::AttributeValue;

/// Map a bucketing identifier to its bucket.
///
/// Integers are their own bucket. Strings are hashed with CRC-32 (IEEE polynomial) and masked
/// to 31 bits, so the same string lands in the same bucket in every process. Any other value has
/// no bucket.
///
/// ```
/// # use rollout::{bucket, AttributeValue};
/// assert_eq!(bucket(&AttributeValue::Integer(1)), Some(1));
/// assert_eq!(bucket(&"123456789".into()), Some(0x4bf4_3926));
/// assert_eq!(bucket(&AttributeValue::Boolean(true)), None);
/// ```
pub fn bucket(identifier: &AttributeValue) -> Option<i64> {
    identifier
        .as_integer()
        .or_else(|| identifier.as_str().map(|s| hash(s.as_bytes())))
}

fn hash(input: &[u8]) -> i64 {
    i64::from(crc32fast::hash(input) & 0x7fff_ffff)
}

/// Position of `bucket` within a 100-slot percentage range.
pub(crate) fn percentile(bucket: i64) -> i64 {
    bucket.rem_euclid(100)
}
