//! Order statistics shared by combination and cosmic ray cleaning.

/// Median of `data`, partially reordering it (quickselect).
///
/// Even-length input yields the mean of the two middle values.
#[inline]
pub fn median_f32_mut(data: &mut [f32]) -> f32 {
    debug_assert!(!data.is_empty());

    let len = data.len();
    let mid = len / 2;

    if len & 1 == 1 {
        let (_, median, _) = data.select_nth_unstable_by(mid, f32::total_cmp);
        *median
    } else {
        let (left_part, right_median, _) = data.select_nth_unstable_by(mid, f32::total_cmp);
        let right = *right_median;
        let left = left_part.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        (left + right) * 0.5
    }
}

/// Median of a copy of `values`; 0.0 when empty.
pub fn median_f32(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut scratch = values.to_vec();
    median_f32_mut(&mut scratch)
}
