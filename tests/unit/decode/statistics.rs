//! Tests for timing aggregation and the report layout

#[cfg(test)]
mod tests {
    use exposure_timing::decode::digits::{BoardStatus, DecodedValue, TimedRowTable};
    use exposure_timing::decode::outliers::ScanDirection;
    use exposure_timing::decode::statistics::{
        AggregateInput, Diagnostics, ShutterType, TimingReport, aggregate, first_last_row_time,
        reference_rows, unwrap_pixel_time,
    };

    fn value(digits: &[u8]) -> DecodedValue {
        DecodedValue::from_digits(digits, 1 - digits.len() as i32, 19)
    }

    fn rolling_table() -> TimedRowTable {
        TimedRowTable::from([
            (100, value(&[3, 0, 2, 0, 0])),
            (120, value(&[3, 0, 2])),
            (150, value(&[3, 0, 3, 0, 0])),
            (200, value(&[3, 0, 4, 0, 0])),
        ])
    }

    fn input(table: &TimedRowTable, row_time: Option<f64>, header_time: f64) -> AggregateInput<'_> {
        AggregateInput {
            table,
            direction: ScanDirection::Increasing,
            row_time,
            total_rows: 400,
            header_time,
            reference_resolution: -4,
        }
    }

    // Tests pixel times before the header's wrap move forward ten seconds
    // Verified by only handling negative values
    #[test]
    fn test_unwrap_pixel_time() {
        assert!((unwrap_pixel_time(-0.3, 5.0) - 9.7).abs() < 1e-9);
        assert!((unwrap_pixel_time(1.5, 9.0) - 11.5).abs() < 1e-9);
        assert!((unwrap_pixel_time(1.5, 5.0) - 1.5).abs() < 1e-9);
        assert!((unwrap_pixel_time(2.5, 9.0) - 2.5).abs() < 1e-9);
    }

    // Tests only finely resolved rows become references
    // Verified by comparing resolution with the wrong sign
    #[test]
    fn test_reference_rows() {
        let table = rolling_table();
        let rows: Vec<usize> = reference_rows(&table, -4)
            .into_iter()
            .map(|(row, _)| row)
            .collect();
        assert_eq!(rows, [100, 150, 200]);
        assert_eq!(reference_rows(&table, -2).len(), 4);
    }

    // Tests rolling shutter timing is anchored on the middle reference row
    // Verified by anchoring on the first reference row
    #[test]
    fn test_aggregate_rolling() {
        let table = rolling_table();
        let stats = aggregate(&input(&table, Some(0.0002), 3.0)).unwrap();

        assert_eq!(stats.shutter_type, ShutterType::Rolling);
        assert!((stats.calc_first_pixel - 3.0).abs() < 1e-9);
        assert!((stats.calc_last_pixel - 3.08).abs() < 1e-9);
        assert!((stats.full_readout_time - 0.08).abs() < 1e-9);
        assert!(stats.fits_delta.abs() < 1e-9);
        assert!((stats.first_last_per_row_time.unwrap() - 0.0002).abs() < 1e-12);
    }

    // Tests a decreasing scan extrapolates the first row later and the last row earlier
    // Verified by extrapolating with the unsigned row time
    #[test]
    fn test_aggregate_rolling_decreasing() {
        let table = TimedRowTable::from([
            (100, value(&[3, 0, 4, 0, 0])),
            (150, value(&[3, 0, 3, 0, 0])),
            (200, value(&[3, 0, 2, 0, 0])),
        ]);
        let stats = aggregate(&AggregateInput {
            direction: ScanDirection::Decreasing,
            ..input(&table, Some(0.0002), 3.06)
        })
        .unwrap();

        assert_eq!(stats.shutter_type, ShutterType::Rolling);
        assert_eq!(stats.rolling_shutter_row_time, Some(0.0002));
        assert!((stats.calc_first_pixel - 3.06).abs() < 1e-9);
        assert!((stats.calc_last_pixel - 2.98).abs() < 1e-9);
        assert!((stats.full_readout_time + 0.08).abs() < 1e-9);
        assert!(stats.fits_delta.abs() < 1e-9);
        assert!((stats.first_last_per_row_time.unwrap() + 0.0002).abs() < 1e-12);
    }

    // Tests global shutter timing takes the middle decoded row
    // Verified by taking the first row
    #[test]
    fn test_aggregate_global() {
        let table = TimedRowTable::from([
            (10, value(&[4, 5])),
            (11, value(&[4, 6])),
            (12, value(&[4, 7])),
        ]);
        let stats = aggregate(&input(&table, None, 4.5)).unwrap();

        assert_eq!(stats.shutter_type, ShutterType::Global);
        assert_eq!(stats.rolling_shutter_row_time, None);
        assert!((stats.calc_first_pixel - 4.6).abs() < 1e-9);
        assert!((stats.fits_delta - 0.1).abs() < 1e-9);
        assert!(stats.full_readout_time.abs() < 1e-12);
        assert_eq!(stats.first_last_per_row_time, None);
    }

    // Tests a decode just past the wrap compares correctly with a late header
    // Verified by removing the header wrap rule
    #[test]
    fn test_aggregate_across_wrap() {
        let table = TimedRowTable::from([(50, value(&[0, 1]))]);
        let stats = aggregate(&input(&table, None, 9.9)).unwrap();
        assert!((stats.calc_first_pixel - 10.1).abs() < 1e-9);
        assert!((stats.fits_delta - 0.2).abs() < 1e-9);
    }

    // Tests the reference row time survives a wrap between the outer rows
    // Verified by dropping the wrap correction
    #[test]
    fn test_first_last_row_time_across_wrap() {
        let first = value(&[9, 9, 9, 0, 0]);
        let last = value(&[0, 0, 1, 0, 0]);
        let rising = first_last_row_time(&[(0, &first), (100, &last)], ScanDirection::Increasing);
        assert!((rising.unwrap() - 0.0002).abs() < 1e-9);

        let falling =
            first_last_row_time(&[(0, &last), (100, &first)], ScanDirection::Decreasing);
        assert!((falling.unwrap() + 0.0002).abs() < 1e-9);

        assert_eq!(first_last_row_time(&[(0, &first)], ScanDirection::Increasing), None);
    }

    // Tests an empty table yields no statistics
    // Verified by defaulting to zero timings
    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&input(&TimedRowTable::new(), Some(0.0002), 1.0)).is_none());
    }

    // Tests the report serializes with the flat timing keys
    // Verified by removing the flatten attribute
    #[test]
    fn test_report_json_keys() {
        let table = rolling_table();
        let statistics = aggregate(&input(&table, Some(0.0002), 3.0)).unwrap();
        let report = TimingReport {
            timed_rows: table,
            statistics,
            scan_direction: ScanDirection::Increasing,
            board_status: Some(BoardStatus::GnssLost),
            diagnostics: Diagnostics::default(),
        };

        let json = serde_json::to_value(&report).unwrap();
        for key in [
            "timed_rows",
            "shutter_type",
            "rolling_shutter_row_time",
            "calc_first_pixel",
            "fits_time",
            "fits_delta",
            "calc_last_pixel",
            "full_readout_time",
            "first_last_per_row_time",
            "diagnostics",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["shutter_type"], "ROLLING");
        assert_eq!(json["scan_direction"], "increasing");
        assert_eq!(json["board_status"], "gnss_lost");
        assert_eq!(json["timed_rows"]["150"]["value"], "3.0300");
        assert_eq!(json["timed_rows"]["150"]["err"], -4);
    }
}
