//! Bin classification and counting.

use crate::datatype::Datatype;
use crate::error::{Error, Result};

/// Histogram layout: `num_bins` equal-width bins over the inclusive range
/// `[min_val, max_val]`.
///
/// The bin width is `ceil((max_val - min_val + 1) / num_bins)`. Values outside
/// the range are clamped into the first or last bin rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinSpec {
    num_bins: usize,
    min_val: i64,
    max_val: i64,
    bin_width: i128,
}

impl BinSpec {
    /// Validate the layout and compute the bin width.
    ///
    /// Requires `num_bins > 0`, `max_val >= min_val`, and a range holding at
    /// least `num_bins` values.
    pub fn new(num_bins: usize, min_val: i64, max_val: i64) -> Result<Self> {
        if num_bins == 0 {
            return Err(Error::InvalidBinCount(num_bins));
        }
        if max_val < min_val {
            return Err(Error::InvalidRange {
                min: min_val,
                max: max_val,
            });
        }
        let range = i128::from(max_val) - i128::from(min_val) + 1;
        let bins = num_bins as i128;
        if range < bins {
            return Err(Error::RangeSmallerThanBins { range, num_bins });
        }
        Ok(BinSpec {
            num_bins,
            min_val,
            max_val,
            bin_width: (range + bins - 1) / bins,
        })
    }

    /// Number of bins.
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Inclusive lower bound.
    pub fn min_val(&self) -> i64 {
        self.min_val
    }

    /// Inclusive upper bound.
    pub fn max_val(&self) -> i64 {
        self.max_val
    }

    /// Width of every bin.
    pub fn bin_width(&self) -> i128 {
        self.bin_width
    }

    /// Bin a value falls into, clamped to `[0, num_bins - 1]`.
    pub fn bin_index<T: Datatype>(&self, value: T) -> usize {
        // Truncating division: values just below min_val still land in bin 0.
        let idx = (value.to_i128() - i128::from(self.min_val)) / self.bin_width;
        idx.clamp(0, self.num_bins as i128 - 1) as usize
    }
}

/// Count how many values of `shard` fall into each bin of `spec`.
///
/// # Example
///
/// ```
/// use ferropar::{count_bins, BinSpec};
///
/// let spec = BinSpec::new(4, 0, 7).unwrap();
/// assert_eq!(count_bins(&[0i32, 1, 2, 7, 9, -3], &spec), vec![3, 1, 0, 2]);
/// ```
pub fn count_bins<T: Datatype>(shard: &[T], spec: &BinSpec) -> Vec<u64> {
    let mut counts = vec![0u64; spec.num_bins];
    for &value in shard {
        counts[spec.bin_index(value)] += 1;
    }
    counts
}
