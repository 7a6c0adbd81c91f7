use crate::error::GCError;
use crate::graph::VertexId;
use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::str::FromStr;

/// How vertices are placed on partitions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum PartitionStrategy {
    /// Fibonacci hash of the vertex id.
    Hash,
    /// Contiguous blocks of vertex ids in ascending order.
    Range,
    /// Uniformly random placement from the configured seed.
    Random,
}

impl Default for PartitionStrategy {
    fn default() -> Self {
        PartitionStrategy::Hash
    }
}

impl FromStr for PartitionStrategy {
    type Err = GCError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hash" => Ok(PartitionStrategy::Hash),
            "range" => Ok(PartitionStrategy::Range),
            "random" => Ok(PartitionStrategy::Random),
            _ => Err(GCError::Configuration(format!(
                "Unknown partition strategy '{}', expected one of hash, range, random",
                s
            ))),
        }
    }
}

impl std::fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                PartitionStrategy::Hash => "hash",
                PartitionStrategy::Range => "range",
                PartitionStrategy::Random => "random",
            }
        )
    }
}

/// Fixed assignment of every vertex of a graph to one of `partitions` partitions.
#[derive(Debug, Clone)]
pub struct Partitioner {
    partitions: usize,
    assignment: HashMap<VertexId, usize>,
}

impl Partitioner {
    pub fn new(
        strategy: PartitionStrategy,
        partitions: usize,
        seed: u64,
        vertex_ids: impl Iterator<Item = VertexId>,
    ) -> Result<Self, GCError> {
        if partitions == 0 {
            return Err(GCError::Configuration("Partition count must be at least 1".to_owned()));
        }
        let assignment = match strategy {
            PartitionStrategy::Hash => {
                vertex_ids.map(|v| (v, hash_partition(v, partitions))).collect()
            }
            PartitionStrategy::Range => {
                let mut vertex_ids = vertex_ids.collect::<Vec<_>>();
                vertex_ids.sort_unstable();
                let block = ((vertex_ids.len() + partitions - 1) / partitions).max(1);
                vertex_ids.into_iter().enumerate().map(|(i, v)| (v, i / block)).collect()
            }
            PartitionStrategy::Random => {
                let mut vertex_ids = vertex_ids.collect::<Vec<_>>();
                vertex_ids.sort_unstable();
                let mut rng = StdRng::seed_from_u64(seed);
                vertex_ids.into_iter().map(|v| (v, rng.gen_range(0..partitions))).collect()
            }
        };
        Ok(Self { partitions, assignment })
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    pub fn partition_of(&self, vertex_id: VertexId) -> Option<usize> {
        self.assignment.get(&vertex_id).copied()
    }

    pub fn vertex_count(&self) -> usize {
        self.assignment.len()
    }

    /// Vertex ids of every partition, each in ascending order.
    pub fn members(&self) -> Vec<Vec<VertexId>> {
        let mut members = vec![Vec::new(); self.partitions];
        for (vertex_id, partition) in &self.assignment {
            members[*partition].push(*vertex_id);
        }
        for partition in &mut members {
            partition.sort_unstable();
        }
        members
    }
}

fn hash_partition(vertex_id: VertexId, partitions: usize) -> usize {
    const FIBONACCI: u64 = 0x9E37_79B9_7F4A_7C15;
    let hash = u64::from(vertex_id).wrapping_mul(FIBONACCI) >> 32;
    (hash % partitions as u64) as usize
}

#[cfg(test)]
mod tests {
    use crate::computer::partition::{PartitionStrategy, Partitioner};

    #[test]
    fn every_vertex_placed_once() {
        for strategy in
            &[PartitionStrategy::Hash, PartitionStrategy::Range, PartitionStrategy::Random]
        {
            let partitioner = Partitioner::new(*strategy, 3, 7, 0..100).expect("partitioner");
            let members = partitioner.members();
            assert_eq!(members.len(), 3);
            assert_eq!(members.iter().map(Vec::len).sum::<usize>(), 100);
            for (partition, vertex_ids) in members.iter().enumerate() {
                for vertex_id in vertex_ids {
                    assert_eq!(partitioner.partition_of(*vertex_id), Some(partition));
                }
            }
            assert_eq!(partitioner.partition_of(100), None);
        }
    }

    #[test]
    fn range_blocks() {
        let partitioner =
            Partitioner::new(PartitionStrategy::Range, 2, 0, 0..5).expect("partitioner");
        assert_eq!(partitioner.members(), vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn random_is_seeded() {
        let first = Partitioner::new(PartitionStrategy::Random, 4, 42, 0..50).expect("partitioner");
        let second = Partitioner::new(PartitionStrategy::Random, 4, 42, (0..50).rev())
            .expect("partitioner");
        assert_eq!(first.members(), second.members());
    }

    #[test]
    fn parse_strategy() {
        assert_eq!("range".parse::<PartitionStrategy>(), Ok(PartitionStrategy::Range));
        assert!("round-robin".parse::<PartitionStrategy>().is_err());
        assert_eq!(PartitionStrategy::Random.to_string(), "random");
        assert!(Partitioner::new(PartitionStrategy::Hash, 0, 0, 0..3).is_err());
    }
}
