use crate::computer::{ComputerConfig, ComputerResult, GraphComputer, RunStatistics};
use crate::error::GCError;
use crate::graph::{Graph, VertexId};
use crate::program::VertexProgram;
use crate::programs::max_value::MaxValue;
use crate::programs::pagerank::PageRank;
use crate::programs::sssp::Sssp;
use crate::programs::wcc::Wcc;
use hashbrown::HashMap;

/// Type-erased output of a finished run, ready to be logged or written out.
#[derive(Debug, Clone)]
pub struct ProgramOutput {
    pub memory: Vec<(String, String)>,
    pub states: Vec<(VertexId, String)>,
    pub statistics: RunStatistics,
}

pub trait ProgramBuilder {
    fn execute(
        &self,
        computer: &GraphComputer<Graph>,
        config: ComputerConfig,
    ) -> Result<ProgramOutput, GCError>;
}

macro_rules! create_builder {
    ($builder:ident, $name:ident) => {
        pub struct $builder;

        impl ProgramBuilder for $builder {
            fn execute(
                &self,
                computer: &GraphComputer<Graph>,
                config: ComputerConfig,
            ) -> Result<ProgramOutput, GCError> {
                collect_output(computer.run($name::default(), config)?)
            }
        }
    };
}

create_builder!(MaxValueBuilder, MaxValue);
create_builder!(PageRankBuilder, PageRank);
create_builder!(SsspBuilder, Sssp);
create_builder!(WccBuilder, Wcc);

pub fn initialize_programs(programs: &mut HashMap<String, Box<dyn ProgramBuilder>>) {
    programs.insert(String::from("max"), Box::new(MaxValueBuilder));
    programs.insert(String::from("pr"), Box::new(PageRankBuilder));
    programs.insert(String::from("sssp"), Box::new(SsspBuilder));
    programs.insert(String::from("wcc"), Box::new(WccBuilder));
}

/// Formats memory and states through the program as `setup` configured it, then closes the
/// result.
pub(crate) fn collect_output<P: VertexProgram>(
    mut result: ComputerResult<P, Graph>,
) -> Result<ProgramOutput, GCError> {
    let output = {
        let memory = result.memory()?;
        ProgramOutput {
            memory: memory
                .keys()
                .into_iter()
                .map(|key| Ok((key.to_owned(), format!("{:?}", memory.get(key)?))))
                .collect::<Result<_, GCError>>()?,
            states: result
                .graph()?
                .states()
                .map(|(v, s)| (v, result.program().format_state(s)))
                .collect(),
            statistics: result.statistics()?.clone(),
        }
    };
    result.close()?;
    Ok(output)
}
