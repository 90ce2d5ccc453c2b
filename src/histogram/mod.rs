//! Atomic bucket-array histograms covering the full u64 range.
//!
//! Bucketing follows the base-2 log-linear scheme: values below
//! `2^(grouping_power + 1)` map to their own width-1 buckets, and every
//! power-of-two range above that is subdivided into `2^grouping_power`
//! equal-width sub-buckets. The index function is pure and monotonically
//! non-decreasing, so readers can reconstruct the distribution from the raw
//! bucket counts alone.
//!
//! A histogram with grouping power 4 and max value power 64 holds 976
//! buckets; tracking nanoseconds, that spans 1ns to ~584 years with <= 6.25%
//! relative bucket width.

use core::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistogramError {
    #[error("histogram grouping power must be below the max value power")]
    InvalidParameters,
}

/// Number of buckets for a `(grouping_power, max_value_power)` pair: the
/// linear region holds `2^(grouping_power + 1)` buckets and each remaining
/// octave holds `2^grouping_power`.
pub fn total_buckets(grouping_power: u8, max_value_power: u8) -> usize {
    ((max_value_power - grouping_power) as usize + 1) << grouping_power
}

pub(crate) fn validate(grouping_power: u8, max_value_power: u8) -> Result<(), HistogramError> {
    // the grouping cap keeps bucket counts and shifts well inside usize
    if grouping_power >= max_value_power || max_value_power > 64 || grouping_power > 32 {
        return Err(HistogramError::InvalidParameters);
    }

    Ok(())
}

/// Map a value to its bucket index. Pure, monotonic, and clamped to
/// `[0, total_buckets)`; values at or above `2^max_value_power` land in the
/// final bucket.
pub fn value_to_index(value: u64, grouping_power: u8, max_value_power: u8) -> usize {
    let g = grouping_power as u32;

    // the linear region: two octaves of width-1 buckets
    if value < (2u64 << g) {
        return value as usize;
    }

    let h = 63 - value.leading_zeros();

    if h >= max_value_power as u32 {
        return total_buckets(grouping_power, max_value_power) - 1;
    }

    // buckets below octave h, then the offset within the octave's
    // 2^g sub-buckets of width 2^(h-g)
    let base = ((h - g) as usize + 1) << g;
    let offset = ((value - (1u64 << h)) >> (h - g)) as usize;

    base + offset
}

/// A histogram owning one atomic bucket array. Multiple histograms (one per
/// semantic family) share the index function but hold disjoint storage.
pub struct Histogram {
    buckets: Box<[AtomicU64]>,
    grouping_power: u8,
    max_value_power: u8,
}

impl Histogram {
    pub fn new(grouping_power: u8, max_value_power: u8) -> Result<Self, HistogramError> {
        validate(grouping_power, max_value_power)?;

        let buckets = (0..total_buckets(grouping_power, max_value_power))
            .map(|_| AtomicU64::new(0))
            .collect();

        Ok(Self {
            buckets,
            grouping_power,
            max_value_power,
        })
    }

    /// Record one observation with a single relaxed increment.
    pub fn observe(&self, value: u64) {
        let index = value_to_index(value, self.grouping_power, self.max_value_power);
        self.buckets[index].fetch_add(1, Ordering::Relaxed);
    }

    pub fn grouping_power(&self) -> u8 {
        self.grouping_power
    }

    pub fn max_value_power(&self) -> u8 {
        self.max_value_power
    }

    pub fn total_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Read one bucket. Out-of-range reads return zero.
    pub fn bucket(&self, index: usize) -> u64 {
        self.buckets
            .get(index)
            .map(|bucket| bucket.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Copy out the raw bucket counts for the external reader.
    pub fn load(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .map(|bucket| bucket.load(Ordering::Relaxed))
            .collect()
    }

    /// Snapshot into a `histogram::Histogram` for percentile math on the
    /// reader side. Returns `None` only if the bucket array does not match
    /// the parameters, which would indicate reader-side corruption.
    pub fn snapshot(&self) -> Option<::histogram::Histogram> {
        ::histogram::Histogram::from_buckets(self.grouping_power, self.max_value_power, self.load())
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_buckets() {
        // the constants the kernel-side programs are sized with
        assert_eq!(total_buckets(2, 64), 252);
        assert_eq!(total_buckets(3, 64), 496);
        assert_eq!(total_buckets(4, 64), 976);
        assert_eq!(total_buckets(5, 64), 1920);
        assert_eq!(total_buckets(7, 64), 7424);
        // packet latency: grouping power 4, max value power 35
        assert_eq!(total_buckets(4, 35), 512);
    }

    #[test]
    fn test_linear_region_is_identity() {
        for value in 0..16 {
            assert_eq!(value_to_index(value, 3, 64), value as usize);
        }
    }

    #[test]
    fn test_octave_subdivision() {
        // [16, 32) is the first grouped octave at power 3: eight buckets of
        // width two starting at index 16
        assert_eq!(value_to_index(16, 3, 64), 16);
        assert_eq!(value_to_index(17, 3, 64), 16);
        assert_eq!(value_to_index(18, 3, 64), 17);
        assert_eq!(value_to_index(31, 3, 64), 23);

        // [32, 64): eight buckets of width four starting at index 24
        assert_eq!(value_to_index(32, 3, 64), 24);
        assert_eq!(value_to_index(35, 3, 64), 24);
        assert_eq!(value_to_index(36, 3, 64), 25);
        assert_eq!(value_to_index(63, 3, 64), 31);
    }

    #[test]
    fn test_monotonic_and_in_range() {
        for power in [0u8, 2, 3, 4, 7] {
            let buckets = total_buckets(power, 64);
            let mut last = 0;

            let mut value: u64 = 0;
            while value < u64::MAX / 3 {
                let index = value_to_index(value, power, 64);
                assert!(index >= last, "regressed at value {value} power {power}");
                assert!(index < buckets);
                last = index;
                value = value * 3 + 1;
            }

            assert_eq!(value_to_index(0, power, 64), 0);
            assert_eq!(value_to_index(u64::MAX, power, 64), buckets - 1);
        }
    }

    #[test]
    fn test_clamped_above_max_value_power() {
        let last = total_buckets(4, 35) - 1;

        assert_eq!(value_to_index(1u64 << 35, 4, 35), last);
        assert_eq!(value_to_index(u64::MAX, 4, 35), last);
        // just below the cap still resolves normally
        assert_eq!(value_to_index((1u64 << 35) - 1, 4, 35), last);
        assert!(value_to_index((1u64 << 34) - 1, 4, 35) < last);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Histogram::new(8, 8).is_err());
        assert!(Histogram::new(4, 65).is_err());
        assert!(Histogram::new(3, 64).is_ok());
    }

    #[test]
    fn test_observe_counts() {
        let histogram = Histogram::new(3, 64).unwrap();

        histogram.observe(0);
        histogram.observe(7);
        histogram.observe(8);
        histogram.observe(15);
        histogram.observe(16);

        assert_eq!(histogram.bucket(0), 1);
        assert_eq!(histogram.bucket(7), 1);
        assert_eq!(histogram.bucket(8), 1);
        assert_eq!(histogram.bucket(15), 1);
        assert_eq!(histogram.bucket(16), 1);
    }

    #[test]
    fn test_concurrent_observations_are_conserved() {
        let histogram = Histogram::new(4, 64).unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                let histogram = &histogram;
                s.spawn(move || {
                    for value in 0..1000u64 {
                        histogram.observe(value * 37);
                    }
                });
            }
        });

        let total: u64 = histogram.load().iter().sum();
        assert_eq!(total, 4000);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let histogram = Histogram::new(3, 64).unwrap();

        for value in [1, 100, 10_000, 1_000_000] {
            histogram.observe(value);
        }

        // from_buckets only succeeds when the bucket count matches the
        // parameters, so this also cross-checks total_buckets against the
        // histogram crate's own config math
        assert!(histogram.snapshot().is_some());
    }
}
