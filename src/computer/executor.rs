use crate::error::PartitionFailure;
use crate::graph::{GraphProvider, VertexId};
use crate::memory::{Memory, MemoryContributions};
use crate::messenger::Messenger;
use crate::program::{VertexContext, VertexProgram, VertexRef};
use crate::util::timer::{GcDuration, GcTimer};
use log::debug;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Compute state of the vertices of one partition. Lives outside the source graph for the whole
/// run and is handed to the result on success.
#[derive(Debug, Clone)]
pub struct Partition<S> {
    id: usize,
    vertex_ids: Vec<VertexId>,
    states: Vec<S>,
}

impl<S> Partition<S> {
    /// `vertex_ids` must be sorted and match `states` one to one.
    pub fn new(id: usize, vertex_ids: Vec<VertexId>, states: Vec<S>) -> Self {
        debug_assert_eq!(vertex_ids.len(), states.len());
        debug_assert!(vertex_ids.windows(2).all(|w| w[0] < w[1]));
        Self { id, vertex_ids, states }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn len(&self) -> usize {
        self.vertex_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_ids.is_empty()
    }

    pub fn vertex_ids(&self) -> &[VertexId] {
        &self.vertex_ids
    }

    pub fn state(&self, vertex_id: VertexId) -> Option<&S> {
        let index = self.vertex_ids.binary_search(&vertex_id).ok()?;
        self.states.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VertexId, &S)> {
        self.vertex_ids.iter().copied().zip(self.states.iter())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionStats {
    pub vertices_executed: usize,
    pub messages_sent: usize,
    pub halt_votes: usize,
    pub duration: GcDuration,
}

/// What a partition hands back to the coordinator at the barrier.
#[derive(Debug)]
pub struct PartitionReport<V> {
    pub partition: usize,
    pub contributions: MemoryContributions<V>,
    pub stats: PartitionStats,
}

impl<V> PartitionReport<V> {
    pub fn all_voted_to_halt(&self) -> bool {
        self.stats.halt_votes == self.stats.vertices_executed
    }
}

/// Runs the vertices of a partition through one superstep.
#[derive(new)]
pub struct VertexProgramExecutor<'a, P: VertexProgram> {
    program: &'a P,
    graph: &'a dyn GraphProvider,
    memory: &'a Memory<P::MemoryValue>,
}

impl<'a, P: VertexProgram> VertexProgramExecutor<'a, P> {
    pub fn execute(
        &self,
        partition: &mut Partition<P::State>,
        messenger: &mut Messenger<P::Message>,
    ) -> Result<PartitionReport<P::MemoryValue>, PartitionFailure> {
        let timer = GcTimer::now();
        let partition_id = partition.id;
        let superstep = self.memory.iteration();
        let mut contributions = MemoryContributions::default();
        let mut stats = PartitionStats::default();

        for (vertex_id, state) in partition.vertex_ids.iter().zip(partition.states.iter_mut()) {
            let vertex = VertexRef::new(*vertex_id, self.graph);
            let mut context =
                VertexContext::new(vertex, state, self.memory, &mut contributions, messenger);
            let failure = |message| {
                let vertex_id = Some(*vertex_id);
                PartitionFailure::new(Some(partition_id), superstep, vertex_id, message)
            };
            match catch_unwind(AssertUnwindSafe(|| self.program.execute(&mut context))) {
                Ok(Ok(())) => (),
                Ok(Err(e)) => return Err(failure(e.0)),
                Err(panic) => return Err(failure(panic_message(&*panic))),
            }
            stats.vertices_executed += 1;
            if context.voted_to_halt() {
                stats.halt_votes += 1;
            }
        }

        stats.messages_sent = messenger.sent_count();
        stats.duration = timer.elapsed();
        debug!(
            "Partition {} finished superstep {}: {} vertices, {} messages, {} halt votes in {}",
            partition_id,
            superstep,
            stats.vertices_executed,
            stats.messages_sent,
            stats.halt_votes,
            stats.duration.to_millis_string()
        );
        Ok(PartitionReport { partition: partition_id, contributions, stats })
    }
}

pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("Panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("Panicked: {}", message)
    } else {
        "Panicked".to_owned()
    }
}
