//! Tests for command-line interface parsing and file processing

#[cfg(test)]
mod tests {
    use crate::support::{board_rois, render};
    use clap::Parser;
    use exposure_timing::TimingError;
    use exposure_timing::decode::digits::{BoardStatus, encode_ticks};
    use exposure_timing::io::cli::{Cli, FileProcessor, is_image_file};
    use exposure_timing::io::image::save_luma16;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    // Writes a registration, a decodable frame with sidecar and an undecodable frame
    fn workspace() -> (TempDir, PathBuf, PathBuf) {
        let root = TempDir::new().unwrap();
        let registration = root.path().join("rois.json");
        fs::write(&registration, board_rois(20, 59).to_json_string().unwrap()).unwrap();

        let images = root.path().join("images");
        save_luma16(
            &render(100, 20, 59, |_| encode_ticks(52_344)),
            &images.join("frame.png"),
        )
        .unwrap();
        fs::write(
            images.join("frame.header.json"),
            r#"{"DATE-OBS": "2024-05-01T12:00:05.2000", "EXPTIME": 0.0001}"#,
        )
        .unwrap();
        save_luma16(
            &render(100, 20, 59, |_| BoardStatus::GnssLost.bits()),
            &images.join("status.png"),
        )
        .unwrap();
        fs::write(images.join("notes.txt"), "not an image").unwrap();

        (root, registration, images)
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("exposure-timing").chain(args.iter().copied()))
    }

    fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    // Tests CLI parsing with only the required arguments
    // Verified by changing default values to ensure defaults are used
    #[test]
    fn test_cli_parse_minimal_args() {
        let cli = cli(&["frame.png", "-r", "rois.json"]);

        assert_eq!(cli.target, PathBuf::from("frame.png"));
        assert_eq!(cli.registration, PathBuf::from("rois.json"));
        assert_eq!(cli.date_obs, None);
        assert_eq!(cli.exptime, None);
        assert_eq!(cli.jobs, 0);
        assert!(cli.skip_existing());
        assert!(cli.should_show_progress());
        assert_eq!(cli.log_level(), "warn");
    }

    // Tests CLI parsing with all available arguments
    // Verified by swapping the short flags of date and exposure
    #[test]
    fn test_cli_parse_all_args() {
        let cli = cli(&[
            "shots",
            "--registration",
            "rois.json",
            "-d",
            "2024-05-01T12:00:05.2",
            "-e",
            "0.002",
            "-o",
            "reports",
            "-j",
            "4",
            "-q",
            "-n",
            "-vv",
        ]);

        assert_eq!(cli.date_obs.as_deref(), Some("2024-05-01T12:00:05.2"));
        assert_eq!(cli.exptime, Some(0.002));
        assert_eq!(cli.output, Some(PathBuf::from("reports")));
        assert_eq!(cli.jobs, 4);
        assert!(!cli.should_show_progress());
        assert!(!cli.skip_existing());
        assert_eq!(cli.log_level(), "debug");
    }

    // Tests the registration flag is required
    // Verified by giving the registration a default
    #[test]
    fn test_registration_required() {
        assert!(Cli::try_parse_from(["exposure-timing", "frame.png"]).is_err());
    }

    // Tests verbosity maps onto log levels
    // Verified by capping the level at debug
    #[test]
    fn test_log_levels() {
        assert_eq!(cli(&["a.png", "-r", "r.json", "-v"]).log_level(), "info");
        assert_eq!(cli(&["a.png", "-r", "r.json", "-vvvv"]).log_level(), "trace");
    }

    // Tests image extensions are matched case-insensitively
    // Verified by comparing extensions case-sensitively
    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("frame.png")));
        assert!(is_image_file(Path::new("FRAME.TIFF")));
        assert!(!is_image_file(Path::new("frame.ettime")));
        assert!(!is_image_file(Path::new("frame")));
    }

    // Tests a directory batch writes every decodable report before reporting its failures
    // Verified by aborting the batch on the first failure
    #[test]
    fn test_process_directory() {
        let (_root, registration, images) = workspace();
        let processor = FileProcessor::new(cli(&[
            path_str(&images),
            "-r",
            path_str(&registration),
        ]));

        assert!(matches!(
            processor.process(),
            Err(TimingError::BatchFailed {
                failed: 1,
                total: 2
            })
        ));
        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(images.join("frame.ettime")).unwrap())
                .unwrap();
        assert_eq!(report["shutter_type"], "GLOBAL");
        assert!(!images.join("status.ettime").exists());
        assert!(!images.join("notes.ettime").exists());
    }

    // Tests a batch without failures succeeds
    // Verified by counting skipped files as failures
    #[test]
    fn test_process_directory_all_decoded() {
        let (_root, registration, images) = workspace();
        fs::remove_file(images.join("status.png")).unwrap();
        let args = [path_str(&images), "-r", path_str(&registration), "-q"];

        FileProcessor::new(cli(&args)).process().unwrap();
        assert!(images.join("frame.ettime").exists());
        FileProcessor::new(cli(&args)).process().unwrap();
    }

    // Tests a single failing image propagates its error
    // Verified by logging single-image failures like batch failures
    #[test]
    fn test_single_file_error_propagates() {
        let (_root, registration, images) = workspace();
        let processor = FileProcessor::new(cli(&[
            path_str(&images.join("status.png")),
            "-r",
            path_str(&registration),
            "-d",
            "12:00:05.2",
            "-e",
            "0.0001",
            "-q",
        ]));

        assert!(matches!(
            processor.process(),
            Err(TimingError::NoTimedRows { .. })
        ));
    }

    // Tests existing reports are kept unless skipping is disabled
    // Verified by inverting the skip check
    #[test]
    fn test_skip_existing_reports() {
        let (_root, registration, images) = workspace();
        let frame = images.join("frame.png");
        let report = images.join("frame.ettime");
        fs::write(&report, "stale").unwrap();

        let args = [path_str(&frame), "-r", path_str(&registration), "-q"];
        FileProcessor::new(cli(&args)).process().unwrap();
        assert_eq!(fs::read_to_string(&report).unwrap(), "stale");

        let mut rerun: Vec<&str> = args.to_vec();
        rerun.push("-n");
        FileProcessor::new(cli(&rerun)).process().unwrap();
        assert!(fs::read_to_string(&report).unwrap().contains("timed_rows"));
    }

    // Tests non-image targets are rejected
    // Verified by accepting any existing file
    #[test]
    fn test_non_image_target() {
        let (_root, registration, images) = workspace();
        let processor = FileProcessor::new(cli(&[
            path_str(&images.join("notes.txt")),
            "-r",
            path_str(&registration),
        ]));
        assert!(matches!(
            processor.process(),
            Err(TimingError::InvalidParameter {
                parameter: "target",
                ..
            })
        ));
    }

    // Tests --output is a directory for batches and a file for one image
    // Verified by always joining the report name
    #[test]
    fn test_output_path() {
        let (root, registration, images) = workspace();
        let out = root.path().join("out");
        let frame = images.join("frame.png");

        let batch = FileProcessor::new(cli(&[
            path_str(&images),
            "-r",
            path_str(&registration),
            "-o",
            path_str(&out),
        ]));
        assert_eq!(batch.output_path(&frame), out.join("frame.ettime"));

        let single = FileProcessor::new(cli(&[
            path_str(&frame),
            "-r",
            path_str(&registration),
            "-o",
            path_str(&out.join("result.json")),
        ]));
        assert_eq!(single.output_path(&frame), out.join("result.json"));

        let default = FileProcessor::new(cli(&[path_str(&frame), "-r", path_str(&registration)]));
        assert_eq!(default.output_path(&frame), images.join("frame.ettime"));
    }

    // Tests command-line header values override the sidecar
    // Verified by letting the sidecar win
    #[test]
    fn test_resolve_header() {
        let (_root, registration, images) = workspace();
        let frame = images.join("frame.png");

        let from_sidecar =
            FileProcessor::new(cli(&[path_str(&frame), "-r", path_str(&registration)]));
        let header = from_sidecar.resolve_header(&frame).unwrap();
        assert!((header.clock_seconds() - 5.2).abs() < 1e-9);

        let overridden = FileProcessor::new(cli(&[
            path_str(&frame),
            "-r",
            path_str(&registration),
            "-e",
            "0.5",
        ]));
        let header = overridden.resolve_header(&frame).unwrap();
        assert!((header.exposure_time() - 0.5).abs() < 1e-12);
        assert_eq!(header.date_obs(), "2024-05-01T12:00:05.2000");

        let status = images.join("status.png");
        let missing = from_sidecar.resolve_header(&status);
        assert!(matches!(
            missing,
            Err(TimingError::InvalidHeader {
                keyword: "DATE-OBS",
                ..
            })
        ));
    }
}
