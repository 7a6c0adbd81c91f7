use crate::graph::VertexId;

#[derive(Debug, Clone, PartialEq)]
pub enum GCError {
    Generic(String),
    ReadFile(String, String),
    CreateFile(String, String),
    WriteFile(String, String),
    LoadGraph(String),
    GraphParse(String, &'static str, String, String),
    Configuration(String),
    Memory(String),
    ProgramExecution(PartitionFailure),
    ConvergenceTimeout(usize),
    Cancelled(usize),
    ResultAlreadyClosed,
    UnknownComputation(String),
    Property(&'static str, &'static str, Vec<String>),
    PropertyType(&'static str, &'static str, &'static str, String),
}

/// Where and why program code failed. `partition` is `None` when the failing code ran on the
/// coordinator, e.g. `setup`, `initial_state`, a memory combiner at the barrier or `terminate`.
#[derive(Debug, Clone, PartialEq, new)]
pub struct PartitionFailure {
    pub partition: Option<usize>,
    pub superstep: usize,
    pub vertex: Option<VertexId>,
    pub message: String,
}

impl GCError {
    /// The superstep a run failed at, if the failure happened after `Init`.
    pub fn superstep(&self) -> Option<usize> {
        match self {
            GCError::ProgramExecution(failure) => Some(failure.superstep),
            GCError::ConvergenceTimeout(max_supersteps) => Some(max_supersteps.saturating_sub(1)),
            GCError::Cancelled(superstep) => Some(*superstep),
            _ => None,
        }
    }

    pub fn partition(&self) -> Option<usize> {
        if let GCError::ProgramExecution(failure) = self {
            failure.partition
        } else {
            None
        }
    }
}

impl std::fmt::Display for GCError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            GCError::Generic(msg) => write!(f, "[GCError] {}", msg)?,
            GCError::ReadFile(file_path, e) => {
                write!(f, "[IOError] Could not open file '{}' for reading: {}", file_path, e)?;
            }
            GCError::CreateFile(file_path, e) => {
                write!(f, "[IOError] Could not create file '{}' for writing: {}", file_path, e)?;
            }
            GCError::WriteFile(file_path, e) => {
                write!(f, "[IOError] Could not write to '{}': {}", file_path, e)?;
            }
            GCError::LoadGraph(message) => write!(f, "[LoadGraphError] {}", message)?,
            GCError::GraphParse(property, ptype, vertex_id, file) => write!(
                f,
                "[LoadGraphError] Could not parse property value '{}' as {} \
                            for vertex id '{}' in file '{}'",
                property, ptype, vertex_id, file
            )?,
            GCError::Configuration(message) => write!(f, "[ConfigurationError] {}", message)?,
            GCError::Memory(message) => write!(f, "[MemoryError] {}", message)?,
            GCError::ProgramExecution(failure) => write!(
                f,
                "[ProgramExecutionError] {} failed in superstep {}{}: {}",
                failure
                    .partition
                    .map_or_else(|| "Coordinator".to_owned(), |p| format!("Partition {}", p)),
                failure.superstep,
                failure.vertex.map_or_else(String::new, |v| format!(" at vertex {}", v)),
                failure.message
            )?,
            GCError::ConvergenceTimeout(max_supersteps) => write!(
                f,
                "[ConvergenceTimeoutError] Computation did not halt within {} supersteps",
                max_supersteps
            )?,
            GCError::Cancelled(superstep) => {
                write!(f, "[CancelledError] Computation cancelled at barrier {}", superstep)?;
            }
            GCError::ResultAlreadyClosed => {
                write!(f, "[ResultError] Computer result has already been closed")?;
            }
            GCError::UnknownComputation(comp) => {
                write!(f, "[ConfigurationError] Unknown computation '{}'", comp)?;
            }
            GCError::Property(computation, property, properties) => write!(
                f,
                "[ConfigurationError] {} needs parameter '{}' but found '{:?}'",
                computation, property, properties
            )?,
            GCError::PropertyType(computation, property, expected, found) => write!(
                f,
                "[ConfigurationError] {} parameter '{}' should be a '{}' but found '{}'",
                computation, property, expected, found
            )?,
        }
        Ok(())
    }
}

impl std::error::Error for GCError {}

#[cfg(test)]
mod tests {
    use crate::error::{GCError, PartitionFailure};

    #[test]
    fn failure_context() {
        let failure = PartitionFailure::new(Some(2), 3, Some(7), "boom".into());
        let error = GCError::ProgramExecution(failure);
        assert_eq!(error.partition(), Some(2));
        assert_eq!(error.superstep(), Some(3));
        assert_eq!(
            error.to_string(),
            "[ProgramExecutionError] Partition 2 failed in superstep 3 at vertex 7: boom"
        );

        let failure = PartitionFailure::new(None, 4, None, "Panicked: bad combiner".into());
        let error = GCError::ProgramExecution(failure);
        assert_eq!(error.partition(), None);
        assert_eq!(error.superstep(), Some(4));
        assert_eq!(
            error.to_string(),
            "[ProgramExecutionError] Coordinator failed in superstep 4: Panicked: bad combiner"
        );

        let error = GCError::ConvergenceTimeout(50);
        assert_eq!(error.partition(), None);
        assert_eq!(error.superstep(), Some(49));
        assert_ne!(error, GCError::Cancelled(49));
    }
}
