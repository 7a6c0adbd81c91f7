use crate::computer::{ComputerConfig, GraphComputer, PartitionStrategy};
use crate::error::GCError;
use crate::graph::properties::property_value::PropertyValue;
use crate::graph::Graph;
use crate::memory::Memory;
use crate::program::{
    string_parameter, ProgramError, ProgramParameters, VertexContext, VertexProgram, VertexRef,
};
use crate::programs::builder::{collect_output, initialize_programs, ProgramBuilder};
use crate::programs::pagerank::{PageRank, MEMORY_RANK_SUM, MEMORY_VERTEX_COUNT};
use crate::programs::sssp::{Sssp, MEMORY_RELAXATIONS};
use crate::programs::wcc::{Wcc, MEMORY_LABEL_UPDATES};
use hashbrown::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

fn parallel() -> ComputerConfig {
    ComputerConfig::default()
        .with_partitions(3, PartitionStrategy::Hash)
        .with_threads(NonZeroUsize::new(2).expect("non-zero"))
}

fn weighted(edges: &[(u32, u32, f64)], vertices: usize) -> Graph {
    let mut graph = Graph::default();
    for _ in 0..vertices {
        graph.add_vertex(&[]);
    }
    for (src, dst, weight) in edges {
        graph.add_edge(*src, *dst, &[("weight", PropertyValue::Float(*weight))]).expect("edge");
    }
    graph
}

#[test]
fn pagerank_symmetric_cycle() {
    let graph = weighted(&[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 0, 1.0)], 4);
    let computer = GraphComputer::new(Arc::new(graph));
    let result = computer.run(PageRank::new(5, 0.85), parallel()).expect("terminates");

    let memory = result.memory().expect("open");
    assert_eq!(memory.iteration(), 6);
    assert_eq!(memory.get(MEMORY_VERTEX_COUNT), Ok(&4.0));
    assert!((memory.get(MEMORY_RANK_SUM).expect("key") - 1.0).abs() < 1e-9);
    for (_, rank) in result.graph().expect("open").states() {
        assert!((rank - 0.25).abs() < 1e-9);
    }
}

#[test]
fn pagerank_favours_popular_vertex() {
    let graph =
        weighted(&[(0, 3, 1.0), (1, 3, 1.0), (2, 3, 1.0), (3, 0, 1.0), (3, 1, 1.0)], 4);
    let computer = GraphComputer::new(Arc::new(graph));
    let config = parallel().with_parameter("iterations", PropertyValue::Isize(10));
    let result = computer.run(PageRank::default(), config).expect("terminates");
    let computed = result.graph().expect("open");
    let popular = *computed.state(3).expect("state");
    for vertex_id in 0..3 {
        assert!(*computed.state(vertex_id).expect("state") < popular);
    }
    assert_eq!(result.memory().expect("open").iteration(), 11);
}

#[test]
fn pagerank_parameters() {
    let computer = GraphComputer::new(Arc::new(weighted(&[], 2)));
    for (key, value) in vec![
        ("iterations", PropertyValue::Isize(0)),
        ("iterations", PropertyValue::String("ten".to_owned())),
        ("damping", PropertyValue::Float(1.5)),
    ] {
        let config = ComputerConfig::default().with_parameter(key, value);
        assert!(matches!(
            computer.run(PageRank::default(), config),
            Err(GCError::PropertyType("PageRank", _, _, _))
        ));
    }
    let config = ComputerConfig::default().with_parameter("alpha", PropertyValue::Float(0.5));
    assert!(matches!(computer.run(PageRank::default(), config), Err(GCError::Configuration(_))));
}

#[test]
fn sssp_distances() {
    let graph = weighted(
        &[(0, 1, 4.0), (0, 2, 1.0), (2, 1, 2.0), (1, 3, 1.0), (2, 3, 5.0), (4, 0, 1.0)],
        5,
    );
    let computer = GraphComputer::new(Arc::new(graph));
    let result = computer.run(Sssp::new(0, "weight"), parallel()).expect("halts");
    let distances = result.graph().expect("open").states().map(|(_, d)| *d).collect::<Vec<_>>();
    assert_eq!(distances[..4], [0.0, 3.0, 1.0, 4.0]);
    assert!(distances[4].is_infinite());
    assert!(*result.memory().expect("open").get(MEMORY_RELAXATIONS).expect("key") >= 4);

    let config = ComputerConfig::default().with_parameter("source", PropertyValue::Isize(4));
    let result = computer.run(Sssp::default(), config).expect("halts");
    assert_eq!(result.graph().expect("open").state(3), Some(&5.0));
}

#[test]
fn sssp_needs_source_and_weights() {
    let computer = GraphComputer::new(Arc::new(weighted(&[(0, 1, 1.0)], 2)));
    assert!(matches!(
        computer.run(Sssp::default(), ComputerConfig::default()),
        Err(GCError::Property("SSSP", "source", _))
    ));
    let config = ComputerConfig::default()
        .with_parameter("source", PropertyValue::Isize(0))
        .with_parameter("weight", PropertyValue::String("cost".to_owned()));
    assert!(matches!(computer.run(Sssp::default(), config), Err(GCError::Configuration(_))));

    let computer = GraphComputer::new(Arc::new(weighted(&[(0, 1, -1.0)], 2)));
    let error = computer.run(Sssp::new(0, "weight"), parallel()).expect_err("negative");
    assert_eq!(error.superstep(), Some(0));
}

#[test]
fn wcc_components() {
    // {0, 1, 2} joined only through edges pointing into 2, {3, 4} and the isolated 5.
    let graph = weighted(&[(1, 2, 1.0), (0, 2, 1.0), (4, 3, 1.0), (3, 3, 1.0)], 6);
    let computer = GraphComputer::new(Arc::new(graph));
    let result = computer.run(Wcc, parallel()).expect("halts");
    let components =
        result.graph().expect("open").states().map(|(_, s)| s.component).collect::<Vec<_>>();
    assert_eq!(components, vec![0, 0, 0, 3, 3, 5]);
    assert_eq!(result.memory().expect("open").get(MEMORY_LABEL_UPDATES), Ok(&0));
}

#[test]
fn registry_runs_by_name() {
    let mut programs: HashMap<String, Box<dyn ProgramBuilder>> = HashMap::new();
    initialize_programs(&mut programs);
    let mut names = programs.keys().cloned().collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, vec!["max", "pr", "sssp", "wcc"]);

    let mut graph = weighted(&[(0, 1, 2.0), (1, 0, 2.0)], 2);
    graph.add_vertex(&[("value", PropertyValue::Isize(7))]);
    let computer = GraphComputer::new(Arc::new(graph));

    let output = programs["max"].execute(&computer, parallel()).expect("halts");
    assert_eq!(output.memory, vec![("maxValue".to_owned(), "7".to_owned())]);
    assert_eq!(output.states.len(), 3);
    assert_eq!(output.states[2], (2, "7".to_owned()));

    let config = ComputerConfig::default().with_parameter("source", PropertyValue::Isize(1));
    let output = programs["sssp"].execute(&computer, config).expect("halts");
    assert_eq!(
        output.states,
        vec![(0, "2".to_owned()), (1, "0".to_owned()), (2, "inf".to_owned())]
    );
    assert!(output.statistics.supersteps > 0);
}

/// Degree counter whose output unit is only known after `setup`.
#[derive(Default)]
struct Degrees {
    unit: String,
}

impl VertexProgram for Degrees {
    type State = usize;
    type Message = ();
    type MemoryValue = usize;

    fn name(&self) -> &str {
        "Degrees"
    }

    fn setup(
        &mut self,
        parameters: &ProgramParameters,
        _memory: &mut Memory<usize>,
    ) -> Result<(), GCError> {
        self.unit = string_parameter("Degrees", parameters, "unit")?.unwrap_or("").to_owned();
        Ok(())
    }

    fn initial_state(&self, vertex: &VertexRef<'_>) -> usize {
        vertex.out_degree()
    }

    fn execute(
        &self,
        context: &mut VertexContext<'_, usize, (), usize>,
    ) -> Result<(), ProgramError> {
        context.vote_to_halt();
        Ok(())
    }

    fn format_state(&self, state: &usize) -> String {
        format!("{} {}", state, self.unit)
    }
}

#[test]
fn output_formatted_by_configured_program() {
    let computer = GraphComputer::new(Arc::new(weighted(&[(0, 1, 1.0), (0, 2, 1.0)], 3)));
    let config = parallel().with_parameter("unit", PropertyValue::String("edges".to_owned()));
    let result = computer.run(Degrees::default(), config).expect("halts");
    assert_eq!(result.program().unit, "edges");

    let output = collect_output(result).expect("open");
    assert_eq!(
        output.states,
        vec![(0, "2 edges".to_owned()), (1, "0 edges".to_owned()), (2, "0 edges".to_owned())]
    );
}
