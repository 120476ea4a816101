//! Sequential building blocks of the distributed exclusive scan.

use crate::datatype::Datatype;

/// In-place work-efficient exclusive scan (Blelloch).
///
/// Up-sweep builds partial sums in a balanced tree so the last element holds
/// the total; that total is captured and returned, the last element is reset
/// to zero, and the down-sweep pushes prefixes back down the tree. Afterwards
/// `v[k]` is the sum of the original `v[..k]`.
///
/// `v.len()` must be a power of two. O(n), no allocation.
///
/// # Example
///
/// ```
/// let mut v = [1i32, 2, 3, 4];
/// let total = ferropar::blelloch_scan(&mut v);
/// assert_eq!(v, [0, 1, 3, 6]);
/// assert_eq!(total, 10);
/// ```
pub fn blelloch_scan<T: Datatype>(v: &mut [T]) -> T {
    let n = v.len();
    if n == 0 {
        return T::ZERO;
    }
    debug_assert!(n.is_power_of_two(), "scan length {n} is not a power of two");
    let levels = n.trailing_zeros();

    for d in 0..levels {
        let stride = 1usize << (d + 1);
        let half = stride / 2;
        for i in (0..n).step_by(stride) {
            v[i + stride - 1] = v[i + stride - 1].wrapping_add(v[i + half - 1]);
        }
    }

    let total = v[n - 1];
    v[n - 1] = T::ZERO;

    for d in (0..levels).rev() {
        let stride = 1usize << (d + 1);
        let half = stride / 2;
        for i in (0..n).step_by(stride) {
            let left = i + half - 1;
            let right = i + stride - 1;
            let carried = v[left];
            v[left] = v[right];
            v[right] = v[right].wrapping_add(carried);
        }
    }

    total
}

/// Add `offset` to every element of a scanned shard.
pub fn add_offset<T: Datatype>(v: &mut [T], offset: T) {
    for x in v.iter_mut() {
        *x = x.wrapping_add(offset);
    }
}

/// Sequential exclusive prefix sum of shard totals: the offset of each shard.
pub fn exclusive_offsets<T: Datatype>(totals: &[T]) -> Vec<T> {
    totals
        .iter()
        .scan(T::ZERO, |acc, &total| {
            let offset = *acc;
            *acc = acc.wrapping_add(total);
            Some(offset)
        })
        .collect()
}
