//! crates/transfer/src/driver.rs
//!
//! Drives one transform job from creation to completion.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use engine::{Job, StepIo, StepState};

use crate::error::{Error, JobKind};
use crate::window::BufferWindow;

/// Type-erased async source used by the file-or-reader pipelines.
pub(crate) type DynReader = Box<dyn AsyncRead + Send + Unpin>;

/// Drives exactly one engine job over an async source, yielding a lazy,
/// finite sequence of output chunks.
///
/// Each [`next_chunk`](Self::next_chunk) call loops fill / step / classify
/// until the job produced output, finished, or failed. Output produced on
/// the same step that reports done is handed back first; the job is retired
/// on the following call so no chunk is ever dropped. All resources (job,
/// source, window) are released when the driver is dropped, whether the
/// sequence was drained, abandoned mid-stream, or ended in an error.
#[derive(Debug)]
pub struct JobDriver<R, J> {
    source: R,
    job: Option<J>,
    finished: Option<J>,
    op: JobKind,
    window: BufferWindow,
    out: Box<[u8]>,
    eof: bool,
    done_pending: bool,
}

impl<R: AsyncRead + Unpin, J: Job> JobDriver<R, J> {
    /// Creates a driver over `source` with the given window capacities.
    #[must_use]
    pub fn new(
        source: R,
        job: J,
        op: JobKind,
        input_capacity: usize,
        output_capacity: usize,
    ) -> Self {
        Self {
            source,
            job: Some(job),
            finished: None,
            op,
            window: BufferWindow::with_capacity(input_capacity),
            out: vec![0u8; output_capacity].into_boxed_slice(),
            eof: false,
            done_pending: false,
        }
    }

    /// Pulls the next output chunk.
    ///
    /// Returns `None` once the sequence ended; an `Err` terminates the
    /// sequence after all resources were released. Chunks are never empty.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, Error>> {
        loop {
            self.job.as_ref()?;
            if self.done_pending {
                // The final chunk went out last call; retire the job now.
                self.retire();
                return None;
            }

            if let Err(error) = self.refill().await {
                self.fail();
                return Some(Err(error));
            }

            let job = self.job.as_mut().expect("job checked at loop entry");
            let mut io = StepIo::new(self.window.unread(), self.eof, &mut self.out);
            let state = match job.step(&mut io) {
                Ok(state) => state,
                Err(error) => {
                    let error = Error::engine(self.op, error);
                    self.fail();
                    return Some(Err(error));
                }
            };
            let consumed = io.consumed();
            let produced = io.produced();
            drop(io);
            self.window.consume(consumed);
            trace!(op = %self.op, ?state, consumed, produced, "transform step");

            if produced > 0 {
                if state == StepState::Done {
                    self.done_pending = true;
                }
                return Some(Ok(Bytes::copy_from_slice(&self.out[..produced])));
            }

            if state == StepState::Done {
                self.retire();
                return None;
            }

            if consumed == 0 && (self.eof || self.window.is_full()) {
                let error = Error::InsufficientBuffer {
                    op: self.op,
                    capacity: self.window.capacity(),
                };
                self.fail();
                return Some(Err(error));
            }
        }
    }

    /// Drains the remaining chunks into one buffer.
    pub async fn collect(mut self) -> Result<Vec<u8>, Error> {
        let mut collected = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            collected.extend_from_slice(&chunk?);
        }
        Ok(collected)
    }

    /// Returns the job after the sequence completed normally.
    ///
    /// Used by jobs whose result lives in the job itself rather than in the
    /// output stream, like signature loading.
    #[must_use]
    pub fn into_finished_job(self) -> Option<J> {
        self.finished
    }

    /// Tops the window up from the source unless end-of-data was seen.
    ///
    /// A zero-length read with no underlying error marks end-of-input; it is
    /// recorded once and never retried.
    async fn refill(&mut self) -> Result<(), Error> {
        if self.eof {
            return Ok(());
        }
        self.window.compact_if_needed();
        if self.window.tail_space() == 0 {
            return Ok(());
        }
        match self.source.read(self.window.spare_tail_mut()).await {
            Ok(0) => {
                trace!(op = %self.op, buffered = self.window.available(), "source reached end of data");
                self.eof = true;
            }
            Ok(n) => self.window.advance_write(n),
            Err(error) => return Err(Error::source_read(error)),
        }
        Ok(())
    }

    /// Normal completion: keep the job for result extraction.
    fn retire(&mut self) {
        self.done_pending = false;
        self.finished = self.job.take();
    }

    /// Failure: release the job before the error propagates.
    fn fail(&mut self) {
        self.job = None;
        self.window.reset();
    }
}
