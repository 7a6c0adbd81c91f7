use crate::error::GCError;
use crate::graph::properties::property_value::PropertyValue;
use crate::graph::{VertexId, VertexOrEdge};
use crate::memory::{combiners, Memory, MemoryKey};
use crate::messenger::MessageCombiner;
use crate::program::{
    check_parameters, isize_parameter, string_parameter, ProgramError, ProgramParameters,
    VertexContext, VertexProgram, VertexRef,
};
use itertools::Itertools;
use std::convert::TryFrom;
use std::sync::Arc;

const NAME: &str = "SSSP";
const PARAMETER_SOURCE: &str = "source";
const PARAMETER_WEIGHT: &str = "weight";
const DEFAULT_WEIGHT: &str = "weight";
pub const MEMORY_RELAXATIONS: &str = "relaxations";

/// Single-source shortest paths over non-negative edge weights. Unreachable vertices keep an
/// infinite distance.
#[derive(Clone, Debug)]
pub struct Sssp {
    source: Option<VertexId>,
    weight: String,
}

impl Default for Sssp {
    fn default() -> Self {
        Self { source: None, weight: DEFAULT_WEIGHT.to_owned() }
    }
}

impl Sssp {
    pub fn new(source: VertexId, weight: &str) -> Self {
        Self { source: Some(source), weight: weight.to_owned() }
    }
}

impl VertexProgram for Sssp {
    type State = f64;
    type Message = f64;
    type MemoryValue = usize;

    fn name(&self) -> &str {
        NAME
    }

    fn memory_keys(&self) -> Vec<MemoryKey<usize>> {
        vec![MemoryKey::new(MEMORY_RELAXATIONS, 0, combiners::sum)]
    }

    fn message_combiner(&self) -> Option<MessageCombiner<f64>> {
        Some(Arc::new(combiners::min::<f64>))
    }

    fn required_properties(&self) -> Vec<(VertexOrEdge, String)> {
        vec![(VertexOrEdge::Edge, self.weight.clone())]
    }

    fn setup(
        &mut self,
        parameters: &ProgramParameters,
        _memory: &mut Memory<usize>,
    ) -> Result<(), GCError> {
        check_parameters(NAME, parameters, &[PARAMETER_SOURCE, PARAMETER_WEIGHT])?;
        if let Some(source) = isize_parameter(NAME, parameters, PARAMETER_SOURCE)? {
            self.source = Some(VertexId::try_from(source).map_err(|_| {
                GCError::PropertyType(NAME, PARAMETER_SOURCE, "vertex id", source.to_string())
            })?);
        }
        if self.source.is_none() {
            return Err(GCError::Property(
                NAME,
                PARAMETER_SOURCE,
                parameters.keys().cloned().collect(),
            ));
        }
        if let Some(weight) = string_parameter(NAME, parameters, PARAMETER_WEIGHT)? {
            self.weight = weight.to_owned();
        }
        Ok(())
    }

    fn initial_state(&self, _vertex: &VertexRef<'_>) -> f64 {
        f64::INFINITY
    }

    fn execute(
        &self,
        context: &mut VertexContext<'_, f64, f64, usize>,
    ) -> Result<(), ProgramError> {
        let candidate = if context.superstep() == 0 {
            Some(0.0).filter(|_| Some(context.id()) == self.source)
        } else {
            context.messages().iter().copied().fold1(f64::min)
        };
        if let Some(distance) = candidate.filter(|d| d < context.state()) {
            context.set_state(distance);
            context.memory_add(MEMORY_RELAXATIONS, 1)?;
            let vertex = *context.vertex();
            for edge in vertex.out_edges() {
                let weight = vertex
                    .edge_property(edge, &self.weight)
                    .and_then(PropertyValue::as_float)
                    .filter(|w| *w >= 0.0)
                    .ok_or_else(|| {
                        ProgramError(format!(
                            "Edge {} -> {} has no non-negative '{}'",
                            edge.src_vertex_id, edge.dst_vertex_id, self.weight
                        ))
                    })?;
                context.send_message(edge.dst_vertex_id, distance + weight)?;
            }
        }
        context.vote_to_halt();
        Ok(())
    }

    fn format_state(&self, state: &f64) -> String {
        if state.is_finite() {
            state.to_string()
        } else {
            "inf".to_owned()
        }
    }
}
