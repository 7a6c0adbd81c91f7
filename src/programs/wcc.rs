use crate::graph::VertexId;
use crate::memory::{combiners, MemoryKey};
use crate::program::{ProgramError, VertexContext, VertexProgram, VertexRef};
use itertools::Itertools;

const NAME: &str = "WCC";
pub const MEMORY_LABEL_UPDATES: &str = "labelUpdates";

#[derive(Clone, Debug)]
pub enum WccMessage {
    /// The sender has an edge to the receiver.
    Neighbor(VertexId),
    Component(VertexId),
}

#[derive(Clone, Debug)]
pub struct WccState {
    pub component: VertexId,
    neighbors: Vec<VertexId>,
}

/// Weakly connected components by minimum label propagation. Only out-edges are visible to a
/// vertex, so superstep 0 introduces every vertex to its out-neighbors and labels flow in both
/// directions from superstep 1 on. The component of a vertex is the smallest vertex id in it.
#[derive(Clone, Debug, Default)]
pub struct Wcc;

impl VertexProgram for Wcc {
    type State = WccState;
    type Message = WccMessage;
    type MemoryValue = usize;

    fn name(&self) -> &str {
        NAME
    }

    fn memory_keys(&self) -> Vec<MemoryKey<usize>> {
        vec![MemoryKey::new(MEMORY_LABEL_UPDATES, 0, combiners::sum).transient()]
    }

    fn initial_state(&self, vertex: &VertexRef<'_>) -> WccState {
        let neighbors = vertex
            .out_edges()
            .map(|edge| edge.dst_vertex_id)
            .filter(|v| *v != vertex.id())
            .sorted()
            .dedup()
            .collect();
        WccState { component: vertex.id(), neighbors }
    }

    fn execute(
        &self,
        context: &mut VertexContext<'_, WccState, WccMessage, usize>,
    ) -> Result<(), ProgramError> {
        let id = context.id();
        if context.superstep() == 0 {
            for neighbor in context.state().neighbors.clone() {
                context.send_message(neighbor, WccMessage::Neighbor(id))?;
            }
            context.vote_to_halt();
            return Ok(());
        }

        let mut smallest = context.state().component;
        let mut new_neighbors = Vec::new();
        for message in context.take_messages() {
            match message {
                WccMessage::Neighbor(source) => {
                    new_neighbors.push(source);
                    smallest = smallest.min(source);
                }
                WccMessage::Component(component) => smallest = smallest.min(component),
            }
        }
        let state = context.state_mut();
        if !new_neighbors.is_empty() {
            state.neighbors.extend(new_neighbors);
            state.neighbors.sort_unstable();
            state.neighbors.dedup();
        }
        let changed = smallest < state.component;
        state.component = smallest;
        if changed || context.superstep() == 1 {
            let neighbors = context.state().neighbors.clone();
            for neighbor in neighbors {
                context.send_message(neighbor, WccMessage::Component(smallest))?;
            }
        }
        if changed {
            context.memory_add(MEMORY_LABEL_UPDATES, 1)?;
        }
        context.vote_to_halt();
        Ok(())
    }

    fn format_state(&self, state: &WccState) -> String {
        state.component.to_string()
    }
}
