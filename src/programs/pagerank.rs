use crate::error::GCError;
use crate::memory::{combiners, Memory, MemoryKey};
use crate::messenger::MessageCombiner;
use crate::program::{
    check_parameters, float_parameter, isize_parameter, ProgramError, ProgramParameters,
    VertexContext, VertexProgram, VertexRef,
};
use std::convert::TryFrom;
use std::sync::Arc;

const NAME: &str = "PageRank";
const PARAMETER_ITERATIONS: &str = "iterations";
const PARAMETER_DAMPING: &str = "damping";
const DEFAULT_ITERATIONS: usize = 20;
const DEFAULT_DAMPING: f64 = 0.85;
pub const MEMORY_VERTEX_COUNT: &str = "vertexCount";
pub const MEMORY_RANK_SUM: &str = "rankSum";

/// PageRank with a fixed number of iterations.
///
/// Superstep 0 counts the vertices through memory, superstep 1 assigns the uniform initial rank
/// and every later superstep is one rank update. Rank of dangling vertices is not redistributed,
/// so `rankSum` (the total rank of the last superstep) can drop below 1.
#[derive(Clone, Debug)]
pub struct PageRank {
    iterations: usize,
    damping: f64,
}

impl Default for PageRank {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS, DEFAULT_DAMPING)
    }
}

impl PageRank {
    pub fn new(iterations: usize, damping: f64) -> Self {
        Self { iterations, damping }
    }
}

impl VertexProgram for PageRank {
    type State = f64;
    type Message = f64;
    type MemoryValue = f64;

    fn name(&self) -> &str {
        NAME
    }

    fn memory_keys(&self) -> Vec<MemoryKey<f64>> {
        vec![
            MemoryKey::new(MEMORY_VERTEX_COUNT, 0.0, combiners::sum),
            MemoryKey::new(MEMORY_RANK_SUM, 0.0, combiners::sum).transient(),
        ]
    }

    fn message_combiner(&self) -> Option<MessageCombiner<f64>> {
        Some(Arc::new(combiners::sum::<f64>))
    }

    fn setup(
        &mut self,
        parameters: &ProgramParameters,
        _memory: &mut Memory<f64>,
    ) -> Result<(), GCError> {
        check_parameters(NAME, parameters, &[PARAMETER_ITERATIONS, PARAMETER_DAMPING])?;
        if let Some(iterations) = isize_parameter(NAME, parameters, PARAMETER_ITERATIONS)? {
            self.iterations = usize::try_from(iterations).ok().filter(|i| *i > 0).ok_or_else(|| {
                GCError::PropertyType(
                    NAME,
                    PARAMETER_ITERATIONS,
                    "positive Isize",
                    iterations.to_string(),
                )
            })?;
        }
        if let Some(damping) = float_parameter(NAME, parameters, PARAMETER_DAMPING)? {
            if !(0.0..=1.0).contains(&damping) {
                return Err(GCError::PropertyType(
                    NAME,
                    PARAMETER_DAMPING,
                    "Float in [0, 1]",
                    damping.to_string(),
                ));
            }
            self.damping = damping;
        }
        Ok(())
    }

    fn initial_state(&self, _vertex: &VertexRef<'_>) -> f64 {
        0.0
    }

    #[allow(clippy::cast_precision_loss)]
    fn execute(&self, context: &mut VertexContext<'_, f64, f64, f64>) -> Result<(), ProgramError> {
        if context.superstep() == 0 {
            context.memory_add(MEMORY_VERTEX_COUNT, 1.0)?;
            return Ok(());
        }
        let vertex_count = *context.memory().get(MEMORY_VERTEX_COUNT)?;
        let rank = if context.superstep() == 1 {
            1.0 / vertex_count
        } else {
            let received: f64 = context.messages().iter().sum();
            (1.0 - self.damping) / vertex_count + self.damping * received
        };
        context.set_state(rank);
        context.memory_add(MEMORY_RANK_SUM, rank)?;
        let out_degree = context.vertex().out_degree();
        if out_degree > 0 {
            context.send_to_out_neighbors(rank / out_degree as f64);
        }
        Ok(())
    }

    /// Ends after the last rank update.
    fn terminate(&self, memory: &Memory<f64>) -> bool {
        memory.iteration() > self.iterations
    }

    fn format_state(&self, state: &f64) -> String {
        format!("{:.6}", state)
    }
}
