//! Side-effect storage shared by all vertices of a computation.
//!
//! Every key is declared up front with an initial value and a combiner. During a superstep
//! vertices only read the canonical values; their contributions go to a per-partition
//! [`MemoryContributions`] buffer which the coordinator merges at the barrier. The combiner of a
//! key must be associative and commutative: partitions finish in any order and contributions are
//! pre-combined locally, so any other combiner gives run-dependent results. This is not checked.

use crate::error::GCError;
use crate::util::timer::{GcDuration, GcTimer};
use hashbrown::HashMap;
use itertools::Itertools;
use std::fmt::Debug;
use std::sync::Arc;

pub mod combiners;

pub type Combiner<V> = Arc<dyn Fn(&V, &V) -> V + Send + Sync>;

/// Declaration of a memory key.
#[derive(Clone)]
pub struct MemoryKey<V> {
    name: String,
    initial: V,
    combiner: Combiner<V>,
    transient: bool,
}

impl<V> MemoryKey<V> {
    pub fn new<F>(name: &str, initial: V, combiner: F) -> Self
    where
        F: Fn(&V, &V) -> V + Send + Sync + 'static,
    {
        Self { name: name.to_owned(), initial, combiner: Arc::new(combiner), transient: false }
    }

    /// A transient key is reset to its initial value at every barrier, so it only holds the
    /// contributions of the superstep that just finished.
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> &V {
        &self.initial
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    pub fn combine(&self, left: &V, right: &V) -> V {
        (self.combiner)(left, right)
    }
}

impl<V: Debug> Debug for MemoryKey<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("MemoryKey")
            .field("name", &self.name)
            .field("initial", &self.initial)
            .field("transient", &self.transient)
            .finish()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum MemoryPhase {
    Setup,
    Running,
    Complete,
}

#[derive(Clone)]
pub struct Memory<V> {
    keys: HashMap<String, MemoryKey<V>>,
    values: HashMap<String, V>,
    iteration: usize,
    halted: bool,
    phase: MemoryPhase,
    timer: Option<GcTimer>,
    runtime: GcDuration,
}

impl<V> Default for Memory<V> {
    fn default() -> Self {
        Self {
            keys: HashMap::new(),
            values: HashMap::new(),
            iteration: 0,
            halted: false,
            phase: MemoryPhase::Setup,
            timer: None,
            runtime: GcDuration::default(),
        }
    }
}

impl<V: Clone> Memory<V> {
    /// Declares `key`. Only possible before the first superstep.
    pub fn register(&mut self, key: MemoryKey<V>) -> Result<(), GCError> {
        self.check_phase(MemoryPhase::Setup, "register")?;
        if self.keys.contains_key(key.name()) {
            return Err(GCError::Configuration(format!(
                "Memory key '{}' is declared more than once",
                key.name()
            )));
        }
        self.values.insert(key.name().to_owned(), key.initial().clone());
        self.keys.insert(key.name().to_owned(), key);
        Ok(())
    }

    /// Overwrites the value of a declared key. Only possible before the first superstep; after
    /// that, values change exclusively through combined contributions.
    pub fn set(&mut self, key: &str, value: V) -> Result<(), GCError> {
        self.check_phase(MemoryPhase::Setup, "set")?;
        let slot = self.values.get_mut(key).ok_or_else(|| undeclared(key))?;
        *slot = value;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<&V, GCError> {
        self.values.get(key).ok_or_else(|| undeclared(key))
    }

    pub fn get_or_none(&self, key: &str) -> Option<&V> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.keys.keys().map(String::as_str).sorted().collect()
    }

    /// Records `value` for `key` into a partition-local buffer. The canonical value is unchanged
    /// until the buffer is merged at the barrier.
    pub fn add(
        &self,
        contributions: &mut MemoryContributions<V>,
        key: &str,
        value: V,
    ) -> Result<(), GCError> {
        let declaration = self.keys.get(key).ok_or_else(|| undeclared(key))?;
        contributions.add(declaration, value);
        Ok(())
    }

    /// The current superstep.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Whether every vertex voted to halt in the last completed superstep.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_complete(&self) -> bool {
        self.phase == MemoryPhase::Complete
    }

    /// Wall time since the first superstep started, frozen once the run completes.
    pub fn runtime(&self) -> GcDuration {
        match (self.phase, self.timer) {
            (MemoryPhase::Running, Some(timer)) => timer.elapsed(),
            _ => self.runtime,
        }
    }

    pub(crate) fn start(&mut self) -> Result<(), GCError> {
        self.check_phase(MemoryPhase::Setup, "start")?;
        self.phase = MemoryPhase::Running;
        self.timer = Some(GcTimer::now());
        Ok(())
    }

    pub(crate) fn complete(&mut self) {
        self.runtime = self.runtime();
        self.phase = MemoryPhase::Complete;
    }

    pub(crate) fn incr_iteration(&mut self) {
        self.iteration += 1;
    }

    pub(crate) fn set_halted(&mut self, halted: bool) {
        self.halted = halted;
    }

    /// Folds all partitions' contributions of the finished superstep into the canonical values.
    pub(crate) fn merge(
        &mut self,
        contributions: impl IntoIterator<Item = MemoryContributions<V>>,
    ) -> Result<(), GCError> {
        self.check_phase(MemoryPhase::Running, "merge")?;
        for (name, key) in &self.keys {
            if key.is_transient() {
                self.values.insert(name.clone(), key.initial().clone());
            }
        }
        for buffer in contributions {
            for (name, value) in buffer.values {
                let key = self.keys.get(&name).ok_or_else(|| undeclared(&name))?;
                let current = self.values.get_mut(&name).ok_or_else(|| undeclared(&name))?;
                *current = key.combine(current, &value);
            }
        }
        Ok(())
    }

    fn check_phase(&self, expected: MemoryPhase, operation: &str) -> Result<(), GCError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(GCError::Memory(format!(
                "Cannot {} memory in phase {:?} (superstep {})",
                operation, self.phase, self.iteration
            )))
        }
    }
}

impl<V: Debug> Debug for Memory<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("iteration", &self.iteration)
            .field("halted", &self.halted)
            .field("values", &self.values)
            .finish()
    }
}

fn undeclared(key: &str) -> GCError {
    GCError::Memory(format!("Memory key '{}' has not been declared", key))
}

/// Memory contributions of one partition during one superstep, pre-combined per key.
#[derive(Debug, Clone)]
pub struct MemoryContributions<V> {
    values: HashMap<String, V>,
    count: usize,
}

impl<V> Default for MemoryContributions<V> {
    fn default() -> Self {
        Self { values: HashMap::new(), count: 0 }
    }
}

impl<V> MemoryContributions<V> {
    fn add(&mut self, key: &MemoryKey<V>, value: V) {
        self.count += 1;
        match self.values.get_mut(key.name()) {
            Some(current) => *current = key.combine(current, &value),
            None => {
                self.values.insert(key.name().to_owned(), value);
            }
        }
    }

    /// Number of `add` calls recorded.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use crate::error::GCError;
    use crate::memory::combiners;
    use crate::memory::{Memory, MemoryContributions, MemoryKey};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn running_memory() -> Memory<i64> {
        let mut memory = Memory::default();
        memory.register(MemoryKey::new("sum", 0, combiners::sum)).expect("register");
        memory.register(MemoryKey::new("max", i64::MIN, combiners::max)).expect("register");
        memory.register(MemoryKey::new("step", 0, combiners::sum).transient()).expect("register");
        memory.start().expect("start");
        memory
    }

    #[test]
    fn setup_only_writes() {
        let mut memory = Memory::default();
        memory.register(MemoryKey::new("sum", 0_i64, combiners::sum)).expect("register");
        memory.set("sum", 10).expect("set during setup");
        assert_eq!(memory.get("sum"), Ok(&10));
        assert!(memory.set("missing", 1).is_err());
        assert!(matches!(
            memory.register(MemoryKey::new("sum", 0, combiners::sum)),
            Err(GCError::Configuration(_))
        ));

        memory.start().expect("start");
        assert!(matches!(memory.set("sum", 1), Err(GCError::Memory(_))));
        assert!(memory.register(MemoryKey::new("late", 0, combiners::sum)).is_err());
        assert_eq!(memory.get("sum"), Ok(&10));
    }

    #[test]
    fn contributions_only_visible_after_merge() {
        let mut memory = running_memory();
        let mut first = MemoryContributions::default();
        let mut second = MemoryContributions::default();
        memory.add(&mut first, "sum", 3).expect("add");
        memory.add(&mut first, "sum", 4).expect("add");
        memory.add(&mut second, "sum", 5).expect("add");
        memory.add(&mut second, "max", 9).expect("add");
        assert!(memory.add(&mut second, "missing", 1).is_err());
        assert_eq!(first.count(), 2);
        assert_eq!(memory.get("sum"), Ok(&0));

        memory.merge(vec![first, second]).expect("merge");
        assert_eq!(memory.get("sum"), Ok(&12));
        assert_eq!(memory.get("max"), Ok(&9));
    }

    #[test]
    fn transient_keys_reset_every_barrier() {
        let mut memory = running_memory();
        let mut buffer = MemoryContributions::default();
        memory.add(&mut buffer, "step", 2).expect("add");
        memory.add(&mut buffer, "sum", 2).expect("add");
        memory.merge(vec![buffer]).expect("merge");
        assert_eq!(memory.get("step"), Ok(&2));

        let mut buffer = MemoryContributions::default();
        memory.add(&mut buffer, "step", 5).expect("add");
        memory.add(&mut buffer, "sum", 5).expect("add");
        memory.merge(vec![buffer]).expect("merge");
        assert_eq!(memory.get("step"), Ok(&5));
        assert_eq!(memory.get("sum"), Ok(&7));

        memory.merge(Vec::new()).expect("merge");
        assert_eq!(memory.get("step"), Ok(&0));
        assert_eq!(memory.get("sum"), Ok(&7));
    }

    #[test]
    fn merge_is_order_independent() {
        let values = (1..=40).map(|v| (v * 7919) % 113 - 50).collect::<Vec<i64>>();
        let expected_sum: i64 = values.iter().sum();
        let expected_max = *values.iter().max().expect("non-empty");

        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..10 {
            let mut shuffled = values.clone();
            shuffled.shuffle(&mut rng);
            let mut memory = running_memory();
            let buffers = shuffled
                .chunks(7)
                .map(|chunk| {
                    let mut buffer = MemoryContributions::default();
                    for value in chunk {
                        memory.add(&mut buffer, "sum", *value).expect("add");
                        memory.add(&mut buffer, "max", *value).expect("add");
                    }
                    buffer
                })
                .collect::<Vec<_>>();
            memory.merge(buffers).expect("merge");
            assert_eq!(memory.get("sum"), Ok(&expected_sum));
            assert_eq!(memory.get("max"), Ok(&expected_max));
        }
    }

    #[test]
    fn counters_and_phases() {
        let mut memory = running_memory();
        assert_eq!(memory.iteration(), 0);
        memory.incr_iteration();
        memory.incr_iteration();
        assert_eq!(memory.iteration(), 2);
        assert!(!memory.is_halted());
        memory.set_halted(true);
        assert!(memory.is_halted());
        assert!(!memory.is_complete());
        memory.complete();
        assert!(memory.is_complete());
        assert!(memory.merge(Vec::new()).is_err());
        assert_eq!(memory.keys(), vec!["max", "step", "sum"]);
    }
}
