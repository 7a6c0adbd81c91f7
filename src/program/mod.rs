use crate::error::GCError;
use crate::graph::properties::property_value::PropertyValue;
use crate::graph::properties::Properties;
use crate::graph::{Edge, GraphProvider, VertexId, VertexOrEdge};
use crate::memory::{Memory, MemoryContributions, MemoryKey};
use crate::messenger::{MessageCombiner, Messenger};
use hashbrown::HashMap;
use std::fmt::Debug;

pub type ProgramParameters = HashMap<String, PropertyValue>;

/// Error returned by a vertex program invocation. Fails the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramError(pub String);

impl From<String> for ProgramError {
    fn from(message: String) -> Self {
        ProgramError(message)
    }
}

impl From<&str> for ProgramError {
    fn from(message: &str) -> Self {
        ProgramError(message.to_owned())
    }
}

impl From<GCError> for ProgramError {
    fn from(error: GCError) -> Self {
        ProgramError(error.to_string())
    }
}

impl std::fmt::Display for ProgramError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A vertex-centric computation.
///
/// The same program instance is shared by all partitions of a run, so `execute` takes `&self`
/// and all per-vertex data lives in `State`. A program ends either when every vertex votes to
/// halt in the same superstep with no message in flight, or when `terminate` returns `true` at a
/// barrier.
pub trait VertexProgram: Send + Sync {
    type State: Clone + Debug + Send + Sync;
    type Message: Clone + Debug + Send + Sync;
    type MemoryValue: Clone + Debug + Send + Sync;

    fn name(&self) -> &str;

    /// Memory keys registered before setup.
    fn memory_keys(&self) -> Vec<MemoryKey<Self::MemoryValue>> {
        Vec::new()
    }

    /// Folds messages sent to the same vertex in one superstep. Must be associative and
    /// commutative.
    fn message_combiner(&self) -> Option<MessageCombiner<Self::Message>> {
        None
    }

    /// Properties the graph must carry for the program to run. Checked after `setup`.
    fn required_properties(&self) -> Vec<(VertexOrEdge, String)> {
        Vec::new()
    }

    /// Upper bound on supersteps imposed by the program itself.
    fn max_supersteps(&self) -> Option<usize> {
        None
    }

    /// Whether the program is guaranteed to halt on its own. A program that is not must be run
    /// with a superstep cap.
    fn converges_natively(&self) -> bool {
        true
    }

    /// Called once before superstep 0, after memory keys are registered. This is the only place
    /// memory values can be set directly.
    fn setup(
        &mut self,
        _parameters: &ProgramParameters,
        _memory: &mut Memory<Self::MemoryValue>,
    ) -> Result<(), GCError> {
        Ok(())
    }

    fn initial_state(&self, vertex: &VertexRef<'_>) -> Self::State;

    fn execute(
        &self,
        context: &mut VertexContext<'_, Self::State, Self::Message, Self::MemoryValue>,
    ) -> Result<(), ProgramError>;

    /// Evaluated at every barrier after memory has been merged.
    fn terminate(&self, _memory: &Memory<Self::MemoryValue>) -> bool {
        false
    }

    fn format_state(&self, state: &Self::State) -> String {
        format!("{:?}", state)
    }
}

/// Read-only view of one vertex of the source graph.
#[derive(Clone, Copy)]
pub struct VertexRef<'a> {
    id: VertexId,
    graph: &'a dyn GraphProvider,
}

impl<'a> VertexRef<'a> {
    pub fn new(id: VertexId, graph: &'a dyn GraphProvider) -> Self {
        Self { id, graph }
    }

    pub fn id(&self) -> VertexId {
        self.id
    }

    pub fn properties(&self) -> Option<&'a Properties> {
        self.graph.vertex(self.id).map(|vertex| &vertex.properties)
    }

    pub fn property(&self, key: &str) -> Option<&'a PropertyValue> {
        let key_id = self.graph.key_id(key)?;
        self.properties()?.get_property(key_id)
    }

    pub fn edge_property(&self, edge: &'a Edge, key: &str) -> Option<&'a PropertyValue> {
        edge.properties.get_property(self.graph.key_id(key)?)
    }

    pub fn out_edges(&self) -> Box<dyn Iterator<Item = &'a Edge> + 'a> {
        self.graph.out_edges(self.id)
    }

    pub fn out_degree(&self) -> usize {
        self.graph.out_edges(self.id).count()
    }

    pub fn graph_vertex_count(&self) -> usize {
        self.graph.vertex_count()
    }
}

/// Everything a vertex sees while it executes in a superstep.
pub struct VertexContext<'a, S, M, V> {
    vertex: VertexRef<'a>,
    superstep: usize,
    state: &'a mut S,
    messages: Vec<M>,
    memory: &'a Memory<V>,
    contributions: &'a mut MemoryContributions<V>,
    messenger: &'a mut Messenger<M>,
    voted_to_halt: bool,
}

impl<'a, S, M, V: Clone> VertexContext<'a, S, M, V> {
    pub(crate) fn new(
        vertex: VertexRef<'a>,
        state: &'a mut S,
        memory: &'a Memory<V>,
        contributions: &'a mut MemoryContributions<V>,
        messenger: &'a mut Messenger<M>,
    ) -> Self {
        let messages = messenger.receive_messages(vertex.id());
        Self {
            vertex,
            superstep: memory.iteration(),
            state,
            messages,
            memory,
            contributions,
            messenger,
            voted_to_halt: false,
        }
    }

    pub fn id(&self) -> VertexId {
        self.vertex.id()
    }

    pub fn vertex(&self) -> &VertexRef<'a> {
        &self.vertex
    }

    pub fn superstep(&self) -> usize {
        self.superstep
    }

    pub fn state(&self) -> &S {
        &*self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut *self.state
    }

    pub fn set_state(&mut self, state: S) {
        *self.state = state;
    }

    /// Messages sent to this vertex in the previous superstep.
    pub fn messages(&self) -> &[M] {
        &self.messages
    }

    pub fn take_messages(&mut self) -> Vec<M> {
        std::mem::take(&mut self.messages)
    }

    pub fn memory(&self) -> &Memory<V> {
        self.memory
    }

    /// Contributes `value` to memory `key`. Visible to all vertices from the next superstep on.
    pub fn memory_add(&mut self, key: &str, value: V) -> Result<(), ProgramError> {
        self.memory.add(self.contributions, key, value)?;
        Ok(())
    }

    pub fn send_message(&mut self, destination: VertexId, message: M) -> Result<(), ProgramError> {
        if !self.vertex.graph.contains_vertex(destination) {
            return Err(ProgramError(format!(
                "Vertex {} sent a message to vertex {} which is not in the graph",
                self.vertex.id(),
                destination
            )));
        }
        self.messenger.send_message(destination, message);
        Ok(())
    }

    /// Sends a copy of `message` along every out-edge.
    pub fn send_to_out_neighbors(&mut self, message: M)
    where
        M: Clone,
    {
        for edge in self.vertex.out_edges() {
            self.messenger.send_message(edge.dst_vertex_id, message.clone());
        }
    }

    /// Votes to end the computation. Only counts for the current superstep.
    pub fn vote_to_halt(&mut self) {
        self.voted_to_halt = true;
    }

    pub(crate) fn voted_to_halt(&self) -> bool {
        self.voted_to_halt
    }
}

/// Rejects parameters that `program` does not know.
pub fn check_parameters(
    program: &'static str,
    parameters: &ProgramParameters,
    known: &[&'static str],
) -> Result<(), GCError> {
    for key in parameters.keys() {
        if !known.contains(&key.as_str()) {
            return Err(GCError::Configuration(format!(
                "{} does not take parameter '{}', known parameters are {:?}",
                program, key, known
            )));
        }
    }
    Ok(())
}

pub fn isize_parameter(
    program: &'static str,
    parameters: &ProgramParameters,
    key: &'static str,
) -> Result<Option<isize>, GCError> {
    match parameters.get(key) {
        None => Ok(None),
        Some(PropertyValue::Isize(value)) => Ok(Some(*value)),
        Some(other) => {
            Err(GCError::PropertyType(program, key, "Isize", other.value_type().to_string()))
        }
    }
}

pub fn float_parameter(
    program: &'static str,
    parameters: &ProgramParameters,
    key: &'static str,
) -> Result<Option<f64>, GCError> {
    match parameters.get(key) {
        None => Ok(None),
        Some(value) => value.as_float().map(Some).ok_or_else(|| {
            GCError::PropertyType(program, key, "Float", value.value_type().to_string())
        }),
    }
}

pub fn string_parameter<'p>(
    program: &'static str,
    parameters: &'p ProgramParameters,
    key: &'static str,
) -> Result<Option<&'p str>, GCError> {
    match parameters.get(key) {
        None => Ok(None),
        Some(PropertyValue::String(value)) => Ok(Some(value)),
        Some(other) => {
            Err(GCError::PropertyType(program, key, "String", other.value_type().to_string()))
        }
    }
}
