//! Tests for background decoding and cancellation

#[cfg(test)]
mod tests {
    use crate::support::{board_rois, render};
    use exposure_timing::TimingError;
    use exposure_timing::decode::digits::{BoardStatus, encode_ticks};
    use exposure_timing::io::header::ExposureHeader;
    use exposure_timing::io::worker::{CancelToken, DecodeJob, DecodeWorker};
    use std::thread;
    use std::time::Duration;

    fn steady_job() -> DecodeJob {
        DecodeJob::new(
            render(100, 20, 59, |_| encode_ticks(52_344)),
            board_rois(20, 59),
            ExposureHeader::new("2024-05-01T12:00:05.2000", 0.0001).unwrap(),
        )
    }

    fn status_job() -> DecodeJob {
        DecodeJob {
            image: render(100, 20, 59, |_| BoardStatus::GnssLost.bits()),
            ..steady_job()
        }
    }

    // Tests clones of a token observe the same cancellation
    // Verified by giving each clone its own flag
    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    // Tests a submitted job delivers its report through the handle
    // Verified by dropping the sender before sending
    #[test]
    fn test_submit_and_wait() {
        let worker = DecodeWorker::new(2).unwrap();
        assert_eq!(worker.threads(), 2);

        let report = worker.submit(steady_job()).wait().unwrap();
        assert_eq!(report.timed_rows.len(), 40);
    }

    // Tests polling returns the report once the worker finishes
    // Verified by reporting an empty channel as an error
    #[test]
    fn test_try_result_polls() {
        let worker = DecodeWorker::new(1).unwrap();
        let pending = worker.submit(steady_job());

        let mut report = None;
        for _ in 0..500 {
            report = pending.try_result().unwrap();
            if report.is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(report.is_some());
    }

    // Tests a failing job does not affect its neighbours in a batch
    // Verified by stopping the batch at the first error
    #[test]
    fn test_decode_batch_keeps_order() {
        let worker = DecodeWorker::new(2).unwrap();
        let jobs = [steady_job(), status_job(), steady_job()];
        let results = worker.decode_batch(&jobs, &CancelToken::new());

        assert_eq!(results.len(), 3);
        assert!(results.first().is_some_and(Result::is_ok));
        assert!(matches!(
            results.get(1),
            Some(Err(TimingError::NoTimedRows { .. }))
        ));
        assert!(results.get(2).is_some_and(Result::is_ok));
    }

    // Tests a cancelled token stops every job in a batch
    // Verified by ignoring the token in the batch path
    #[test]
    fn test_cancelled_batch() {
        let worker = DecodeWorker::new(2).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let results = worker.decode_batch(&[steady_job(), steady_job()], &cancel);
        assert!(results
            .iter()
            .all(|result| matches!(result, Err(TimingError::Cancelled { .. }))));
        assert!(matches!(
            steady_job().run(&cancel),
            Err(TimingError::Cancelled { row: 20 })
        ));
    }
}
