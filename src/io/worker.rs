//! Background decoding on a worker pool
//!
//! A decode is submitted as a job and its report arrives through a channel,
//! so callers driving a display never block on row scanning. Cancellation is
//! cooperative: the classifier polls the token between rows.

use crate::decode::engine::decode_exposure_cancellable;
use crate::decode::statistics::TimingReport;
use crate::io::configuration::DecodeConfig;
use crate::io::error::{Result, TimingError, computation_error, invalid_parameter};
use crate::io::header::ExposureHeader;
use crate::io::registration::RoiSet;
use ndarray::Array2;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use tracing::debug;

/// Shared flag asking a running decode to stop
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an untriggered token
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything one decode needs, owned so it can move to another thread
#[derive(Clone, Debug)]
pub struct DecodeJob {
    /// Single-channel image samples
    pub image: Array2<f64>,
    /// LED polygons
    pub rois: RoiSet,
    /// Header timestamps
    pub header: ExposureHeader,
    /// Engine parameters
    pub config: DecodeConfig,
}

impl DecodeJob {
    /// Bundle a job with the default engine parameters
    pub fn new(image: Array2<f64>, rois: RoiSet, header: ExposureHeader) -> Self {
        Self {
            image,
            rois,
            header,
            config: DecodeConfig::default(),
        }
    }

    /// Run the decode on the current thread
    ///
    /// # Errors
    ///
    /// Returns the decode error, or [`TimingError::Cancelled`] once `cancel`
    /// is triggered
    pub fn run(&self, cancel: &CancelToken) -> Result<TimingReport> {
        decode_exposure_cancellable(
            self.image.view(),
            &self.rois,
            &self.header,
            &self.config,
            cancel,
        )
    }
}

/// Handle to a decode running on the pool
#[derive(Debug)]
pub struct PendingDecode {
    receiver: Receiver<Result<TimingReport>>,
    cancel: CancelToken,
}

impl PendingDecode {
    /// Ask the running decode to stop at the next row
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the decode finishes
    ///
    /// # Errors
    ///
    /// Returns the decode error, or a computation error if the worker went
    /// away without answering
    pub fn wait(self) -> Result<TimingReport> {
        self.receiver
            .recv()
            .map_err(|e| computation_error("decode worker", &e))?
    }

    /// Poll without blocking, `None` while the decode is still running
    ///
    /// # Errors
    ///
    /// Returns the decode error once finished, or a computation error if the
    /// worker went away without answering
    pub fn try_result(&self) -> Result<Option<TimingReport>> {
        match self.receiver.try_recv() {
            Ok(result) => result.map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(e @ TryRecvError::Disconnected) => Err(computation_error("decode worker", &e)),
        }
    }
}

/// Thread pool running decodes off the caller's thread
pub struct DecodeWorker {
    pool: ThreadPool,
}

impl DecodeWorker {
    /// Build a pool with `threads` workers, or one per core when zero
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be started
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("decode-{index}"))
            .build()
            .map_err(|e| invalid_parameter("threads", &threads, &e))?;
        Ok(Self { pool })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue `job` and return a handle delivering its report
    pub fn submit(&self, job: DecodeJob) -> PendingDecode {
        let (sender, receiver) = mpsc::channel();
        let cancel = CancelToken::new();
        let token = cancel.clone();

        self.pool.spawn(move || {
            let result = job.run(&token);
            if let Err(TimingError::Cancelled { row }) = &result {
                debug!(row, "decode cancelled");
            }
            // The receiver may already be gone if the caller lost interest
            let _ = sender.send(result);
        });

        PendingDecode { receiver, cancel }
    }

    /// Decode independent jobs in parallel, results in input order
    pub fn decode_batch(&self, jobs: &[DecodeJob], cancel: &CancelToken) -> Vec<Result<TimingReport>> {
        self.pool
            .install(|| jobs.par_iter().map(|job| job.run(cancel)).collect())
    }
}
