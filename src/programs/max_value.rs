use crate::error::GCError;
use crate::graph::properties::property_value::PropertyValue;
use crate::graph::VertexOrEdge;
use crate::memory::{combiners, Memory, MemoryKey};
use crate::messenger::MessageCombiner;
use crate::program::{
    check_parameters, string_parameter, ProgramError, ProgramParameters, VertexContext,
    VertexProgram, VertexRef,
};
use std::sync::Arc;

const NAME: &str = "MaxValue";
const PARAMETER_PROPERTY: &str = "property";
const DEFAULT_PROPERTY: &str = "value";
pub const MEMORY_MAX_VALUE: &str = "maxValue";

/// Floods the largest integer value of a vertex property along out-edges. Every vertex ends up
/// with the largest value that can reach it, and memory holds the global maximum.
#[derive(Clone, Debug)]
pub struct MaxValue {
    property: String,
}

impl Default for MaxValue {
    fn default() -> Self {
        Self::new(DEFAULT_PROPERTY)
    }
}

impl MaxValue {
    pub fn new(property: &str) -> Self {
        Self { property: property.to_owned() }
    }
}

impl VertexProgram for MaxValue {
    type State = isize;
    type Message = isize;
    type MemoryValue = isize;

    fn name(&self) -> &str {
        NAME
    }

    fn memory_keys(&self) -> Vec<MemoryKey<isize>> {
        vec![MemoryKey::new(MEMORY_MAX_VALUE, isize::MIN, combiners::max)]
    }

    fn message_combiner(&self) -> Option<MessageCombiner<isize>> {
        Some(Arc::new(combiners::max::<isize>))
    }

    fn required_properties(&self) -> Vec<(VertexOrEdge, String)> {
        vec![(VertexOrEdge::Vertex, self.property.clone())]
    }

    fn setup(
        &mut self,
        parameters: &ProgramParameters,
        _memory: &mut Memory<isize>,
    ) -> Result<(), GCError> {
        check_parameters(NAME, parameters, &[PARAMETER_PROPERTY])?;
        if let Some(property) = string_parameter(NAME, parameters, PARAMETER_PROPERTY)? {
            self.property = property.to_owned();
        }
        Ok(())
    }

    fn initial_state(&self, vertex: &VertexRef<'_>) -> isize {
        vertex.property(&self.property).and_then(PropertyValue::as_isize).unwrap_or(isize::MIN)
    }

    fn execute(
        &self,
        context: &mut VertexContext<'_, isize, isize, isize>,
    ) -> Result<(), ProgramError> {
        let current = *context.state();
        if context.superstep() == 0 {
            context.send_to_out_neighbors(current);
        } else if let Some(received) = context.messages().iter().copied().max() {
            if received > current {
                context.set_state(received);
                context.send_to_out_neighbors(received);
            }
        }
        let value = *context.state();
        context.memory_add(MEMORY_MAX_VALUE, value)?;
        context.vote_to_halt();
        Ok(())
    }
}
