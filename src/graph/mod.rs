use crate::error::GCError;
use crate::graph::key_store::{KeyId, KeyStore};
use crate::graph::properties::property_value::PropertyValue;
use crate::graph::properties::Properties;
use hashbrown::HashSet;
use std::convert::TryFrom;

pub mod key_store;
pub mod loader;
pub mod properties;

pub type VertexId = u32;
pub type EdgeId = u32;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum VertexOrEdge {
    Vertex,
    Edge,
}

impl std::fmt::Display for VertexOrEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                VertexOrEdge::Vertex => "vertex",
                VertexOrEdge::Edge => "edge",
            }
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, new)]
pub struct Vertex {
    pub properties: Properties,
}

#[derive(Debug, Clone, Serialize, Deserialize, new)]
pub struct Edge {
    pub properties: Properties,
    pub src_vertex_id: VertexId,
    pub dst_vertex_id: VertexId,
}

/// The read-only view of a graph store that a computation runs over.
///
/// Vertex ids are expected to be stable for the lifetime of a computation. The engine never
/// writes through this trait: per-vertex compute state lives in storage owned by the computation
/// itself, so a store can be shared between concurrent runs.
pub trait GraphProvider: Send + Sync {
    fn vertex_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    fn vertex_ids(&self) -> Box<dyn Iterator<Item = VertexId> + '_>;

    fn contains_vertex(&self, vertex_id: VertexId) -> bool;

    fn vertex(&self, vertex_id: VertexId) -> Option<&Vertex>;

    fn out_edges(&self, vertex_id: VertexId) -> Box<dyn Iterator<Item = &Edge> + '_>;

    fn key_id(&self, key: &str) -> Option<KeyId>;

    /// Whether any vertex (or edge) of the graph carries the property `key`.
    fn has_property_key(&self, kind: VertexOrEdge, key: &str) -> bool;
}

/// In-memory graph with dense vertex ids.
#[derive(Default, Debug, Clone)]
pub struct Graph {
    edges: Vec<Edge>,
    vertices: Vec<Vertex>,
    out_edges: Vec<Vec<EdgeId>>,
    key_store: KeyStore,
    vertex_keys: HashSet<KeyId>,
    edge_keys: HashSet<KeyId>,
}

impl Graph {
    pub fn key_store(&self) -> &KeyStore {
        &self.key_store
    }

    pub fn key_store_mut(&mut self) -> &mut KeyStore {
        &mut self.key_store
    }

    pub fn append_vertex(&mut self, vertex: Vertex) -> VertexId {
        let vertex_id = VertexId::try_from(self.vertices.len()).expect("Overflow");
        self.vertex_keys.extend(vertex.properties.key_ids());
        self.vertices.push(vertex);
        self.out_edges.push(Vec::new());
        vertex_id
    }

    pub fn append_edge(&mut self, edge: Edge) -> Result<EdgeId, GCError> {
        for vertex_id in &[edge.src_vertex_id, edge.dst_vertex_id] {
            if *vertex_id as usize >= self.vertices.len() {
                return Err(GCError::LoadGraph(format!(
                    "Edge endpoint {} is not a vertex of the graph",
                    vertex_id
                )));
            }
        }
        let edge_id = EdgeId::try_from(self.edges.len()).expect("Overflow");
        self.edge_keys.extend(edge.properties.key_ids());
        self.out_edges[edge.src_vertex_id as usize].push(edge_id);
        self.edges.push(edge);
        Ok(edge_id)
    }

    /// Adds a vertex whose properties are given by name.
    pub fn add_vertex(&mut self, properties: &[(&str, PropertyValue)]) -> VertexId {
        let properties = self.named_properties(properties);
        self.append_vertex(Vertex::new(properties))
    }

    /// Adds an edge whose properties are given by name.
    pub fn add_edge(
        &mut self,
        src_vertex_id: VertexId,
        dst_vertex_id: VertexId,
        properties: &[(&str, PropertyValue)],
    ) -> Result<EdgeId, GCError> {
        let properties = self.named_properties(properties);
        self.append_edge(Edge::new(properties, src_vertex_id, dst_vertex_id))
    }

    fn named_properties(&mut self, properties: &[(&str, PropertyValue)]) -> Properties {
        let mut result = Properties::default();
        for (key, value) in properties {
            result.add_new_property(self.key_store.get_key_id_or_insert(key), value.clone());
        }
        result
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex_property(&self, vertex_id: VertexId, key: &str) -> Option<&PropertyValue> {
        let key_id = self.key_store.get_key_id(key)?;
        self.vertices.get(vertex_id as usize)?.properties.get_property(key_id)
    }
}

impl GraphProvider for Graph {
    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn vertex_ids(&self) -> Box<dyn Iterator<Item = VertexId> + '_> {
        Box::new(0..VertexId::try_from(self.vertices.len()).expect("Overflow"))
    }

    fn contains_vertex(&self, vertex_id: VertexId) -> bool {
        (vertex_id as usize) < self.vertices.len()
    }

    fn vertex(&self, vertex_id: VertexId) -> Option<&Vertex> {
        self.vertices.get(vertex_id as usize)
    }

    fn out_edges(&self, vertex_id: VertexId) -> Box<dyn Iterator<Item = &Edge> + '_> {
        match self.out_edges.get(vertex_id as usize) {
            Some(edge_ids) => Box::new(edge_ids.iter().map(move |&e| &self.edges[e as usize])),
            None => Box::new(std::iter::empty()),
        }
    }

    fn key_id(&self, key: &str) -> Option<KeyId> {
        self.key_store.get_key_id(key)
    }

    fn has_property_key(&self, kind: VertexOrEdge, key: &str) -> bool {
        self.key_store.get_key_id(key).map_or(false, |key_id| match kind {
            VertexOrEdge::Vertex => self.vertex_keys.contains(&key_id),
            VertexOrEdge::Edge => self.edge_keys.contains(&key_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::properties::property_value::PropertyValue;
    use crate::graph::{Graph, GraphProvider, VertexOrEdge};

    #[test]
    fn adjacency_and_keys() {
        let mut graph = Graph::default();
        let a = graph.add_vertex(&[("value", PropertyValue::Isize(3))]);
        let b = graph.add_vertex(&[]);
        let c = graph.add_vertex(&[]);
        graph.add_edge(a, b, &[("weight", PropertyValue::Isize(2))]).expect("edge");
        graph.add_edge(a, c, &[]).expect("edge");
        graph.add_edge(c, a, &[]).expect("edge");

        assert_eq!(graph.vertex_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        let targets = graph.out_edges(a).map(|e| e.dst_vertex_id).collect::<Vec<_>>();
        assert_eq!(targets, vec![b, c]);
        assert_eq!(graph.out_edges(b).count(), 0);
        assert!(graph.has_property_key(VertexOrEdge::Vertex, "value"));
        assert!(!graph.has_property_key(VertexOrEdge::Edge, "value"));
        assert!(graph.has_property_key(VertexOrEdge::Edge, "weight"));
        assert_eq!(graph.vertex_property(a, "value"), Some(&PropertyValue::Isize(3)));
        assert_eq!(graph.vertex_property(b, "value"), None);
    }

    #[test]
    fn dangling_edge_rejected() {
        let mut graph = Graph::default();
        let a = graph.add_vertex(&[]);
        assert!(graph.add_edge(a, 5, &[]).is_err());
        assert!(!graph.contains_vertex(5));
        assert_eq!(graph.edge_count(), 0);
    }
}
