use crate::computer::coordinator::{RunOutcome, RunStatistics};
use crate::computer::executor::Partition;
use crate::computer::partition::Partitioner;
use crate::error::GCError;
use crate::graph::{GraphProvider, VertexId};
use crate::memory::Memory;
use crate::program::VertexProgram;
use itertools::Itertools;
use log::debug;
use std::sync::Arc;

/// The outcome of a successful run: the computed vertex states next to the untouched source
/// graph, and the final memory.
///
/// The vertex states are held until [`ComputerResult::close`] is called or the result is
/// dropped. After `close` every accessor fails with [`GCError::ResultAlreadyClosed`].
pub struct ComputerResult<P: VertexProgram, G> {
    program: P,
    graph: Arc<G>,
    outcome: Option<RunOutcome<P::State, P::MemoryValue>>,
}

impl<P: VertexProgram, G: GraphProvider> ComputerResult<P, G> {
    pub(crate) fn new(
        program: P,
        graph: Arc<G>,
        outcome: RunOutcome<P::State, P::MemoryValue>,
    ) -> Self {
        Self { program, graph, outcome: Some(outcome) }
    }

    /// The program as configured by `setup`, e.g. to format the computed states. Stays
    /// available after `close`.
    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn graph(&self) -> Result<ComputedGraph<'_, P::State, G>, GCError> {
        let outcome = self.outcome()?;
        Ok(ComputedGraph {
            source: self.graph.as_ref(),
            partitions: &outcome.partitions,
            partitioner: &outcome.partitioner,
        })
    }

    pub fn memory(&self) -> Result<&Memory<P::MemoryValue>, GCError> {
        Ok(&self.outcome()?.memory)
    }

    pub fn statistics(&self) -> Result<&RunStatistics, GCError> {
        Ok(&self.outcome()?.statistics)
    }

    /// Releases the computed vertex states. The source graph is not affected.
    pub fn close(&mut self) -> Result<(), GCError> {
        let outcome = self.outcome.take().ok_or(GCError::ResultAlreadyClosed)?;
        debug!(
            "Releasing result of '{}': {} partitions",
            self.program.name(),
            outcome.partitions.len()
        );
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.outcome.is_none()
    }

    fn outcome(&self) -> Result<&RunOutcome<P::State, P::MemoryValue>, GCError> {
        self.outcome.as_ref().ok_or(GCError::ResultAlreadyClosed)
    }
}

impl<P: VertexProgram, G> Drop for ComputerResult<P, G> {
    fn drop(&mut self) {
        if self.outcome.take().is_some() {
            debug!("Dropping unclosed result of '{}'", self.program.name());
        }
    }
}

impl<P: VertexProgram, G> std::fmt::Debug for ComputerResult<P, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ComputerResult")
            .field("name", &self.program.name())
            .field("closed", &self.outcome.is_none())
            .finish()
    }
}

/// Read-only view of the computed vertex states.
pub struct ComputedGraph<'a, S, G> {
    source: &'a G,
    partitions: &'a [Partition<S>],
    partitioner: &'a Partitioner,
}

impl<'a, S, G: GraphProvider> ComputedGraph<'a, S, G> {
    /// The graph the computation ran over, as it was before the run.
    pub fn source(&self) -> &'a G {
        self.source
    }

    pub fn vertex_count(&self) -> usize {
        self.partitions.iter().map(Partition::len).sum()
    }

    pub fn state(&self, vertex_id: VertexId) -> Option<&'a S> {
        let partition = self.partitioner.partition_of(vertex_id)?;
        self.partitions.get(partition)?.state(vertex_id)
    }

    /// All vertex states in ascending vertex id order.
    pub fn states(&self) -> impl Iterator<Item = (VertexId, &'a S)> + 'a {
        self.partitions.iter().map(Partition::iter).kmerge_by(|a, b| a.0 < b.0)
    }
}
