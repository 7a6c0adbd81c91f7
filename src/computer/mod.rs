//! Runs vertex programs over a graph in bulk-synchronous supersteps.
//!
//! A run is submitted to a [`GraphComputer`] and executes on its own coordinator thread. The
//! caller gets a [`ComputerFuture`] back, which yields either a [`ComputerResult`] or the error
//! that stopped the run. Every error, including invalid configuration, is delivered through the
//! future.

use crate::computer::coordinator::Coordinator;
use crate::computer::executor::panic_message;
use crate::error::GCError;
use crate::graph::GraphProvider;
use crate::program::VertexProgram;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod coordinator;
pub mod executor;
pub mod partition;
pub mod result;


pub use crate::computer::config::ComputerConfig;
pub use crate::computer::coordinator::{CoordinatorState, RunStatistics};
pub use crate::computer::partition::PartitionStrategy;
pub use crate::computer::result::{ComputedGraph, ComputerResult};

type RunResult<P, G> = Result<ComputerResult<P, G>, GCError>;

pub struct GraphComputer<G> {
    graph: Arc<G>,
}

impl<G: GraphProvider + 'static> GraphComputer<G> {
    pub fn new(graph: Arc<G>) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &Arc<G> {
        &self.graph
    }

    /// Starts `program` on a new coordinator thread.
    pub fn submit<P: VertexProgram + 'static>(
        &self,
        program: P,
        config: ComputerConfig,
    ) -> ComputerFuture<P, G> {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let cancel = Arc::new(AtomicBool::new(false));
        let name = program.name().to_owned();
        let graph = Arc::clone(&self.graph);
        let thread_cancel = Arc::clone(&cancel);
        let thread_sender = sender.clone();
        let spawned = std::thread::Builder::new().name(format!("computer-{}", name)).spawn(
            move || {
                // Always answer the future, even if the coordinator itself panics.
                let result = catch_unwind(AssertUnwindSafe(|| {
                    let mut coordinator =
                        Coordinator::new(program, graph.as_ref(), config, thread_cancel);
                    let outcome = coordinator.run();
                    let program = coordinator.into_program();
                    outcome.map(|outcome| ComputerResult::new(program, Arc::clone(&graph), outcome))
                }))
                .unwrap_or_else(|panic| {
                    Err(GCError::Generic(format!(
                        "Coordinator thread panicked: {}",
                        panic_message(&*panic)
                    )))
                });
                if thread_sender.send(result).is_err() {
                    debug!("Computation finished after its future was dropped");
                }
            },
        );
        if let Err(e) = spawned {
            // Nothing else can have sent on a fresh channel.
            let _ = sender.send(Err(GCError::Generic(format!(
                "Could not start coordinator thread: {}",
                e
            ))));
        }
        ComputerFuture { receiver, cancel, resolved: false }
    }

    /// Submits `program` and blocks until it finishes.
    pub fn run<P: VertexProgram + 'static>(
        &self,
        program: P,
        config: ComputerConfig,
    ) -> RunResult<P, G> {
        self.submit(program, config).wait()
    }
}

/// Handle to a submitted run. Dropping it before the run has finished cancels the run.
pub struct ComputerFuture<P: VertexProgram, G> {
    receiver: Receiver<RunResult<P, G>>,
    cancel: Arc<AtomicBool>,
    resolved: bool,
}

impl<P: VertexProgram, G> ComputerFuture<P, G> {
    pub fn wait(mut self) -> RunResult<P, G> {
        self.resolved = true;
        self.receiver.recv().map_err(|_| lost_result())?
    }

    /// Waits at most `timeout`. On timeout the future is handed back so it can be waited on
    /// again or cancelled.
    pub fn wait_timeout(mut self, timeout: Duration) -> Result<RunResult<P, G>, Self> {
        let result = match self.receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => return Err(self),
            Err(RecvTimeoutError::Disconnected) => Err(lost_result()),
        };
        self.resolved = true;
        Ok(result)
    }

    /// Whether the run has ended. The coordinator thread answers every future, so this turns
    /// `true` for failed and panicked runs too.
    pub fn is_finished(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Asks the run to stop. Takes effect at the next barrier, which fails the run with
    /// [`GCError::Cancelled`] unless it halts there anyway.
    pub fn cancel(&self) {
        info!("Cancellation requested");
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

impl<P: VertexProgram, G> Drop for ComputerFuture<P, G> {
    fn drop(&mut self) {
        if !self.resolved && !self.cancel.swap(true, Ordering::SeqCst) {
            debug!("Future dropped before its run was waited on, cancelling");
        }
    }
}

fn lost_result() -> GCError {
    GCError::Generic("Coordinator thread ended without a result".to_owned())
}
