//! Tests for blink pattern matching and row time estimation

#[cfg(test)]
mod tests {
    use bitvec::vec::BitVec;
    use exposure_timing::decode::classifier::MillisecondTrace;
    use exposure_timing::decode::millisecond::{
        estimate_from_runs, estimate_led, estimate_row_time, expected_pattern,
    };
    use exposure_timing::decode::outliers::ScanDirection;
    use exposure_timing::io::configuration::MILLISECOND_PATTERNS;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn trace(led_index: usize, runs: &[usize]) -> MillisecondTrace {
        let mut states = BitVec::new();
        for (index, &run) in runs.iter().enumerate() {
            for _ in 0..run {
                states.push(index % 2 == 1);
            }
        }
        let rows: Vec<usize> = (0..states.len()).collect();
        MillisecondTrace {
            led_index,
            roi_mean: 0.5,
            means: rows.iter().map(|_| 0.0).collect(),
            rows,
            states,
        }
    }

    fn scaled(pattern: &[usize], rows_per_unit: usize) -> Vec<usize> {
        // one partial unit first, as a scan rarely starts on a boundary
        std::iter::once(rows_per_unit)
            .chain(pattern.iter().map(|unit| unit * rows_per_unit))
            .chain(std::iter::once(rows_per_unit))
            .collect()
    }

    // Tests patterns are looked up by LED and reversed for decreasing scans
    // Verified by skipping the reversal
    #[test]
    fn test_expected_pattern() {
        assert_eq!(
            expected_pattern(12, ScanDirection::Increasing),
            Some(vec![1, 4, 1, 2, 1, 1])
        );
        assert_eq!(
            expected_pattern(13, ScanDirection::Decreasing),
            Some(vec![3, 4, 2, 1])
        );
        assert_eq!(expected_pattern(11, ScanDirection::Increasing), None);
        assert_eq!(expected_pattern(16, ScanDirection::Increasing), None);
    }

    // Tests row time recovery for every LED at several stretch factors
    // Verified by dividing by the longest run instead of the unit size
    #[test]
    fn test_scaled_patterns_recover_row_time() {
        for pattern in MILLISECOND_PATTERNS {
            for rows_per_unit in 1..=8 {
                let runs = scaled(pattern, rows_per_unit);
                let row_time = estimate_from_runs(&runs, pattern).unwrap();
                let expected = 0.001 / rows_per_unit as f64;
                assert!(
                    (row_time - expected).abs() < 1e-12,
                    "{pattern:?} x{rows_per_unit}: {row_time}"
                );
            }
        }
    }

    // Tests a cycle starting mid-pattern still matches
    // Verified by matching only the unrotated pattern
    #[test]
    fn test_rotated_cycle_matches() {
        // LED 13 cycle starting on its 4 ms run
        let runs = [20, 15, 5, 10, 20];
        assert!(estimate_from_runs(&runs, &[1, 2, 4, 3]).is_some());
    }

    // Tests uniform runs of random length never match any pattern
    // Verified by accepting any sequence with the right unit size
    #[test]
    fn test_uniform_runs_never_match() {
        let mut rng = StdRng::seed_from_u64(20);
        for _ in 0..200 {
            let run = rng.random_range(1..60);
            let count = rng.random_range(1..24);
            let runs = vec![run; count];
            for pattern in MILLISECOND_PATTERNS {
                assert_eq!(estimate_from_runs(&runs, pattern), None, "{runs:?}");
            }
        }
    }

    // Tests a constant trace leaves the LED unmatched
    // Verified by reporting a row time for any normalised trace
    #[test]
    fn test_estimate_led_without_cycle() {
        let estimate = estimate_led(&trace(12, &[40]), &[1, 4, 1, 2, 1, 1]);
        assert_eq!(estimate.led_index, 12);
        assert_eq!(estimate.runs, [40]);
        assert_eq!(estimate.row_time, None);
    }

    // Tests LED results are averaged over the LEDs that matched
    // Verified by averaging over all four LEDs
    #[test]
    fn test_estimate_row_time_averages_matches() {
        let mut traces: Vec<MillisecondTrace> = MILLISECOND_PATTERNS
            .iter()
            .enumerate()
            .map(|(offset, pattern)| trace(12 + offset, &scaled(pattern, 5)))
            .collect();
        if let Some(broken) = traces.get_mut(1) {
            *broken = trace(13, &[7, 7, 7]);
        }

        let estimate = estimate_row_time(&traces, ScanDirection::Increasing);
        assert_eq!(estimate.leds.len(), 4);
        assert_eq!(estimate.leds.iter().filter(|led| led.row_time.is_some()).count(), 3);
        assert!((estimate.row_time.unwrap() - 0.0002).abs() < 1e-12);
    }

    // Tests decreasing scans match the reversed patterns
    // Verified by matching the forward patterns in both directions
    #[test]
    fn test_decreasing_scan_uses_reversed_patterns() {
        let traces: Vec<MillisecondTrace> = MILLISECOND_PATTERNS
            .iter()
            .enumerate()
            .map(|(offset, pattern)| {
                let reversed: Vec<usize> = pattern.iter().rev().copied().collect();
                trace(12 + offset, &scaled(&reversed, 4))
            })
            .collect();

        let falling = estimate_row_time(&traces, ScanDirection::Decreasing);
        assert!((falling.row_time.unwrap() - 0.00025).abs() < 1e-12);
    }

    // Tests no matching LED means a global shutter
    // Verified by defaulting the row time to zero
    #[test]
    fn test_no_match_means_global() {
        let traces: Vec<MillisecondTrace> = (12..16).map(|led| trace(led, &[30])).collect();
        assert_eq!(estimate_row_time(&traces, ScanDirection::Increasing).row_time, None);
        assert_eq!(estimate_row_time(&[], ScanDirection::Increasing).row_time, None);
    }
}
