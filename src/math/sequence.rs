//! Run-length encoding and cyclic pattern search over integer sequences

use bitvec::slice::BitSlice;

/// Lengths of consecutive equal-valued runs
pub fn run_lengths(bits: &BitSlice) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut iter = bits.iter().by_vals();
    let Some(mut current) = iter.next() else {
        return runs;
    };

    let mut length = 1;
    for bit in iter {
        if bit == current {
            length += 1;
        } else {
            runs.push(length);
            current = bit;
            length = 1;
        }
    }
    runs.push(length);
    runs
}

/// Scale run lengths so the longest run equals `longest_unit` units
///
/// Returns the rounded unit sequence and the number of samples per unit.
pub fn normalize_runs(runs: &[usize], longest_unit: usize) -> Option<(Vec<usize>, f64)> {
    let longest = runs.iter().copied().max()?;
    if longest == 0 || longest_unit == 0 {
        return None;
    }

    let per_unit = longest as f64 / longest_unit as f64;
    let units = runs
        .iter()
        .map(|&run| (run as f64 / per_unit).round() as usize)
        .collect();
    Some((units, per_unit))
}

/// Test whether `pattern` occurs contiguously inside `sequence`
///
/// Streams through `sequence` once. A mismatch resets progress, except that
/// an element equal to the pattern's first value restarts the match there.
pub fn contains_run(sequence: &[usize], pattern: &[usize]) -> bool {
    let Some(&head) = pattern.first() else {
        return false;
    };

    let mut progress = 0;
    for &value in sequence {
        if pattern.get(progress) == Some(&value) {
            progress += 1;
        } else {
            progress = usize::from(value == head);
        }
        if progress == pattern.len() {
            return true;
        }
    }
    false
}

/// Rotation of `pattern` starting at `shift`
pub fn rotated(pattern: &[usize], shift: usize) -> Vec<usize> {
    pattern
        .iter()
        .cycle()
        .skip(shift)
        .take(pattern.len())
        .copied()
        .collect()
}

/// Test whether any cyclic rotation of `pattern` occurs inside `sequence`
pub fn contains_cyclic(sequence: &[usize], pattern: &[usize]) -> bool {
    (0..pattern.len()).any(|shift| contains_run(sequence, &rotated(pattern, shift)))
}
