use crate::error::GCError;
use crate::graph::key_store::KeyStore;
use crate::graph::properties::property_value::PropertyValue;
use crate::graph::properties::{Properties, PropertyKeyId};
use crate::graph::{Edge, Graph, Vertex, VertexId};
use crate::util::io::get_buf_reader;
use crate::util::timer::GcTimer;
use csv::Reader;
use hashbrown::HashMap;
use log::{debug, info, warn};
use std::fs::File;
use std::io::BufReader;

const DEFAULT_TYPE_STRING: &str = "string";
const DEFAULT_SEPARATOR: u8 = b',';
pub const DEFAULT_HAS_HEADERS: bool = true;

type PropertyParser = fn(&str, &str, &str) -> Result<PropertyValue, GCError>;

/// Loads a graph from CSV files.
///
/// The vertex file's first column is the vertex name; the edge file's first two columns are the
/// source and destination names. With headers, the remaining columns are declared as
/// `name:type`, where type is one of `int`, `float`, `bool` or `string` (the default).
#[derive(new, Debug, Clone)]
pub struct GraphLoader {
    vertex_file: Option<String>,
    edge_file: String,
    separator: Option<u8>,
    comment_char: Option<u8>,
    has_headers: bool,
}

/// A loaded graph with the original vertex names, indexed by `VertexId`.
pub struct LoadedGraph {
    pub graph: Graph,
    pub vertex_names: Vec<String>,
}

impl GraphLoader {
    pub fn load(&self) -> Result<LoadedGraph, GCError> {
        let timer = GcTimer::now();
        let mut graph = Graph::default();
        let mut vertices_map = HashMap::new();
        let mut vertex_names = Vec::new();

        if let Some(vertex_file) = &self.vertex_file {
            info!("Loading vertices from file '{}'", vertex_file);
            self.load_vertices(vertex_file, &mut graph, &mut vertices_map, &mut vertex_names)?;
        }
        info!("Loading edges from file '{}'", self.edge_file);
        self.load_edges(&mut graph, &mut vertices_map, &mut vertex_names)?;

        info!(
            "{} vertices and {} edges loaded in {}",
            vertex_names.len(),
            graph.edges().len(),
            timer.elapsed().to_seconds_string()
        );
        Ok(LoadedGraph { graph, vertex_names })
    }

    fn load_vertices(
        &self,
        vertex_file: &str,
        graph: &mut Graph,
        vertices_map: &mut HashMap<String, VertexId>,
        vertex_names: &mut Vec<String>,
    ) -> Result<(), GCError> {
        let mut reader = self.get_csv_reader(vertex_file)?;

        let property_types = if self.has_headers {
            let schema_parts = reader.headers().map_err(|e| {
                GCError::LoadGraph(format!(
                    "Could not load headers from file '{}': {}",
                    vertex_file, e
                ))
            })?;
            let mut schema_iter = schema_parts.iter();

            if let Some(id_part) = schema_iter.next() {
                if id_part.contains(':') && !id_part.to_ascii_lowercase().contains(":id") {
                    return Err(GCError::LoadGraph(format!(
                        "First column should be ':id' in file '{}'",
                        vertex_file
                    )));
                }
            }
            Some(load_schema(schema_iter, vertex_file, graph.key_store_mut())?)
        } else {
            None
        };

        let mut malformed_count = 0;
        for (index, line) in reader.records().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    debug!("Malformed row '{}' in file '{}': {}", index, vertex_file, e);
                    malformed_count += 1;
                    continue;
                }
            };
            let mut line_parts = line.iter();

            let vertex_id_string = line_parts.next().ok_or_else(|| {
                GCError::LoadGraph(format!("Could not read vertex id from file '{}'", vertex_file))
            })?;
            if vertex_id_string.is_empty() {
                return Err(GCError::LoadGraph(format!(
                    "Vertex id string is empty in line '{}' in file '{}'",
                    index, vertex_file
                )));
            }
            if vertices_map.contains_key(vertex_id_string) {
                return Err(GCError::LoadGraph(format!(
                    "Duplicate vertex id '{}' found in file '{}'",
                    vertex_id_string, vertex_file
                )));
            }

            let properties = if let Some(property_types) = &property_types {
                load_property_values(line_parts, vertex_id_string, vertex_file, property_types)?
            } else {
                Properties::default()
            };
            add_new_vertex(vertex_id_string, properties, graph, vertices_map, vertex_names);
        }
        warn_malformed(malformed_count, vertex_file);
        Ok(())
    }

    fn load_edges(
        &self,
        graph: &mut Graph,
        vertices_map: &mut HashMap<String, VertexId>,
        vertex_names: &mut Vec<String>,
    ) -> Result<(), GCError> {
        let edge_file = self.edge_file.as_str();
        let only_edge_file = self.vertex_file.is_none();
        let mut reader = self.get_csv_reader(edge_file)?;

        let property_types = if self.has_headers {
            let schema_parts = reader.headers().map_err(|e| {
                GCError::LoadGraph(format!(
                    "Could not load headers from file '{}': {}",
                    edge_file, e
                ))
            })?;
            let mut schema_iter = schema_parts.iter();
            for (position, expected) in &[("First", ":start_id"), ("Second", ":end_id")] {
                if let Some(part) = schema_iter.next() {
                    if part.contains(':') && !part.to_lowercase().contains(expected) {
                        return Err(GCError::LoadGraph(format!(
                            "{} column should be '{}' in file '{}'",
                            position, expected, edge_file
                        )));
                    }
                }
            }
            Some(load_schema(schema_iter, edge_file, graph.key_store_mut())?)
        } else {
            None
        };

        let mut skipped_count = 0;
        let mut malformed_count = 0;
        for (index, line) in reader.records().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    debug!("Malformed row '{}' in file '{}': {}", index, edge_file, e);
                    malformed_count += 1;
                    continue;
                }
            };
            let mut line_parts = line.iter();
            let mut endpoints = [0; 2];
            let mut skip = false;
            for endpoint in &mut endpoints {
                let id_string = line_parts.next().ok_or_else(|| {
                    GCError::LoadGraph(format!(
                        "Could not read edge endpoint from file '{}'",
                        edge_file
                    ))
                })?;
                if let Some(vertex_id) = vertices_map.get(id_string) {
                    *endpoint = *vertex_id;
                } else if only_edge_file && !id_string.is_empty() {
                    *endpoint = add_new_vertex(
                        id_string,
                        Properties::default(),
                        graph,
                        vertices_map,
                        vertex_names,
                    );
                } else {
                    debug!(
                        "Edge endpoint '{}' not found at line '{}' in file '{}'. Skipping.",
                        id_string, index, edge_file
                    );
                    skip = true;
                    break;
                }
            }
            if skip {
                skipped_count += 1;
                continue;
            }

            let properties = if let Some(property_types) = &property_types {
                let src_name = &vertex_names[endpoints[0] as usize];
                load_property_values(line_parts, src_name, edge_file, property_types)?
            } else {
                Properties::default()
            };
            graph.append_edge(Edge::new(properties, endpoints[0], endpoints[1]))?;
        }
        if skipped_count > 0 {
            warn!("Skipped {} edges with empty or unmapped endpoints", skipped_count);
        }
        warn_malformed(malformed_count, edge_file);
        Ok(())
    }

    fn get_csv_reader(&self, file_path: &str) -> Result<Reader<BufReader<File>>, GCError> {
        Ok(csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .delimiter(self.separator.unwrap_or(DEFAULT_SEPARATOR))
            .double_quote(false)
            .comment(self.comment_char)
            .from_reader(get_buf_reader(file_path)?))
    }
}

fn warn_malformed(malformed_count: usize, file: &str) {
    if malformed_count > 0 {
        warn!("Skipped {} malformed rows in file '{}'", malformed_count, file);
    }
}

fn add_new_vertex(
    vertex_id_string: &str,
    properties: Properties,
    graph: &mut Graph,
    vertices_map: &mut HashMap<String, VertexId>,
    vertex_names: &mut Vec<String>,
) -> VertexId {
    let vertex_id = graph.append_vertex(Vertex::new(properties));
    vertices_map.insert(vertex_id_string.to_owned(), vertex_id);
    vertex_names.push(vertex_id_string.to_owned());
    vertex_id
}

fn parser_for(type_string: &str) -> Option<PropertyParser> {
    fn parse_isize(value: &str, id: &str, file: &str) -> Result<PropertyValue, GCError> {
        value.parse().map(PropertyValue::Isize).map_err(|_| {
            GCError::GraphParse(value.to_owned(), "isize", id.to_owned(), file.to_owned())
        })
    }
    fn parse_float(value: &str, id: &str, file: &str) -> Result<PropertyValue, GCError> {
        value.parse().map(PropertyValue::Float).map_err(|_| {
            GCError::GraphParse(value.to_owned(), "float", id.to_owned(), file.to_owned())
        })
    }
    fn parse_bool(value: &str, id: &str, file: &str) -> Result<PropertyValue, GCError> {
        value.parse().map(PropertyValue::Bool).map_err(|_| {
            GCError::GraphParse(value.to_owned(), "bool", id.to_owned(), file.to_owned())
        })
    }
    fn parse_string(value: &str, _id: &str, _file: &str) -> Result<PropertyValue, GCError> {
        Ok(PropertyValue::String(value.to_owned()))
    }
    match type_string {
        "int" => Some(parse_isize as PropertyParser),
        "float" => Some(parse_float as PropertyParser),
        "bool" => Some(parse_bool as PropertyParser),
        "string" => Some(parse_string as PropertyParser),
        _ => None,
    }
}

fn load_schema<'a>(
    schema_parts: impl Iterator<Item = &'a str>,
    file_path: &str,
    key_store: &mut KeyStore,
) -> Result<Vec<(PropertyKeyId, PropertyParser)>, GCError> {
    let mut property_types = Vec::new();
    for schema in schema_parts {
        let mut parts = schema.split(':');

        let column_name = parts.next().unwrap_or("");
        if column_name.is_empty() {
            return Err(GCError::LoadGraph(format!(
                "Empty column name found in file '{}'",
                file_path
            )));
        }
        let column_type_string = parts.next().unwrap_or(DEFAULT_TYPE_STRING);
        let parser = parser_for(&column_type_string.to_lowercase()).ok_or_else(|| {
            GCError::LoadGraph(format!(
                "Unrecognized column type '{}' in file '{}'",
                column_type_string, file_path,
            ))
        })?;
        property_types.push((key_store.get_key_id_or_insert(column_name), parser));
    }
    Ok(property_types)
}

fn load_property_values<'a>(
    line_parts: impl Iterator<Item = &'a str>,
    vertex_id_string: &str,
    file_path: &str,
    property_types: &[(PropertyKeyId, PropertyParser)],
) -> Result<Properties, GCError> {
    let mut properties = Properties::default();
    let mut count = 0;
    for (index, property_string) in line_parts.enumerate() {
        count += 1;
        if property_string.is_empty() {
            continue;
        }
        let (property_key_id, parser) = property_types.get(index).ok_or_else(|| {
            GCError::LoadGraph(format!(
                "No. of columns for vertex id '{}' does not match header in file '{}'",
                vertex_id_string, file_path,
            ))
        })?;
        let property_value = parser(property_string, vertex_id_string, file_path)?;
        properties.add_new_property(*property_key_id, property_value);
    }
    if property_types.len() != count {
        return Err(GCError::LoadGraph(format!(
            "Total number of columns for vertex id '{}' does not match header in file '{}'",
            vertex_id_string, file_path,
        )));
    }
    Ok(properties)
}

#[cfg(test)]
mod tests {
    use crate::graph::loader::GraphLoader;
    use crate::graph::properties::property_value::PropertyValue;
    use crate::graph::GraphProvider;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir()
            .join(format!("graphcomputer-loader-{}-{}", std::process::id(), name));
        let mut file = std::fs::File::create(&path).expect("Could not create temp file");
        file.write_all(contents.as_bytes()).expect("Could not write temp file");
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn load_vertices_and_edges() {
        let vertex_file = write_temp("v.csv", ":id,value:int,label\na,3,x\nb,6,y\nc,,z\n");
        let edge_file =
            write_temp("e.csv", ":start_id,:end_id,weight:float\na,b,1.5\nb,c,2\nc,q,1\n");
        let loaded = GraphLoader::new(Some(vertex_file), edge_file, None, None, true)
            .load()
            .expect("Load failed");
        let graph = loaded.graph;
        assert_eq!(loaded.vertex_names, vec!["a", "b", "c"]);
        assert_eq!(graph.vertex_count(), 3);
        // The edge to the unknown vertex 'q' is skipped.
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.vertex_property(1, "value"), Some(&PropertyValue::Isize(6)));
        assert_eq!(graph.vertex_property(2, "value"), None);
        let weights = graph
            .out_edges(1)
            .map(|e| e.properties.get_property(graph.key_id("weight").expect("key")).cloned())
            .collect::<Vec<_>>();
        assert_eq!(weights, vec![Some(PropertyValue::Float(2.0))]);
    }

    #[test]
    fn edges_only_without_headers() {
        let edge_file = write_temp("edges-only.csv", "1,2\n2,3\n3,1\n");
        let loaded =
            GraphLoader::new(None, edge_file, None, None, false).load().expect("Load failed");
        assert_eq!(loaded.vertex_names, vec!["1", "2", "3"]);
        assert_eq!(loaded.graph.edge_count(), 3);
    }

    #[test]
    fn bad_property_value() {
        let vertex_file = write_temp("bad-v.csv", ":id,value:int\na,xyz\n");
        let edge_file = write_temp("bad-e.csv", ":start_id,:end_id\na,a\n");
        assert!(GraphLoader::new(Some(vertex_file), edge_file, None, None, true).load().is_err());
    }

    #[test]
    fn malformed_rows_skipped() {
        let vertex_file = write_temp("ragged-v.csv", ":id,value:int\na,3\nb,4,extra\nc,5\n");
        let edge_file = write_temp("ragged-e.csv", ":start_id,:end_id\na,c\nc\nc,a\n");
        let loaded = GraphLoader::new(Some(vertex_file), edge_file, None, None, true)
            .load()
            .expect("Load failed");
        assert_eq!(loaded.vertex_names, vec!["a", "c"]);
        assert_eq!(loaded.graph.edge_count(), 2);
        assert_eq!(loaded.graph.vertex_property(1, "value"), Some(&PropertyValue::Isize(5)));
    }
}
