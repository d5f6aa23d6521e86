//! The designated foreign thread.
//!
//! Foreign runtimes usually require that calls into them originate from a
//! single thread. [`ForeignThread`] owns one named worker thread and runs
//! every submitted job on it; callers on other threads block until the job
//! has completed and receive its result.
//!
//! ```text
//! caller thread                      lex-foreign thread
//! ─────────────                      ──────────────────
//! run(job) ──── Job (mpsc) ───────►  job()
//!    │                                 │
//!    ◄──────── reply (sync_channel) ───┘
//! ```
//!
//! A job submitted from the worker thread itself runs inline, so foreign
//! calls may nest (e.g. a deep `get_params` that recurses through foreign
//! sub-estimators) without deadlocking.
//!
//! A panic inside a job is caught on the worker, which keeps serving
//! subsequent jobs; the caller receives [`EstimatorError::ForeignThread`].

use crate::error::EstimatorError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A dedicated thread on which all foreign calls are executed.
#[derive(Debug)]
pub struct ForeignThread {
    sender: Option<Sender<Job>>,
    thread_id: ThreadId,
    handle: Option<JoinHandle<()>>,
}

impl ForeignThread {
    /// Spawn the worker thread under the given name.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::Io`] if the OS refuses to spawn the thread.
    pub fn spawn(name: &str) -> Result<Self, EstimatorError> {
        let (sender, receiver) = mpsc::channel::<Job>();

        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            // Ends when every sender has been dropped.
            for job in receiver {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    warn!("Foreign job panicked; the foreign thread keeps running");
                }
            }
        })?;

        let thread_id = handle.thread().id();
        debug!("Spawned foreign thread '{}' ({:?})", name, thread_id);

        Ok(Self {
            sender: Some(sender),
            thread_id,
            handle: Some(handle),
        })
    }

    /// Id of the designated thread.
    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Whether the calling thread is the designated thread.
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Run `job` on the designated thread and wait for its result.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::ForeignThread`] if the worker is gone or the
    /// job panicked.
    pub fn run<F, R>(&self, job: F) -> Result<R, EstimatorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            return Ok(job());
        }

        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| EstimatorError::ForeignThread("foreign thread is shut down".to_string()))?;

        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        sender
            .send(Box::new(move || {
                // The caller may have given up waiting; nothing to do then.
                let _ = reply_tx.send(job());
            }))
            .map_err(|_| EstimatorError::ForeignThread("foreign thread has stopped".to_string()))?;

        reply_rx.recv().map_err(|_| {
            EstimatorError::ForeignThread("foreign call panicked on the foreign thread".to_string())
        })
    }
}

impl Drop for ForeignThread {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.sender.take();
        if let Some(handle) = self.handle.take()
            && handle.thread().id() != thread::current().id()
        {
            let _ = handle.join();
        }
    }
}
