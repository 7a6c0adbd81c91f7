use crate::computer::partition::PartitionStrategy;
use crate::error::GCError;
use crate::graph::properties::property_value::PropertyValue;
use crate::program::ProgramParameters;
use std::num::NonZeroUsize;

const OPTION_MAX_SUPERSTEPS: &str = "max_supersteps";
const OPTION_PARTITIONS: &str = "partitions";
const OPTION_PARTITION_STRATEGY: &str = "partition_strategy";
const OPTION_THREADS: &str = "threads";
const OPTION_SEED: &str = "seed";
const OPTION_PARAMETER_PREFIX: &str = "param.";

/// Settings of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputerConfig {
    /// Fails the run with a convergence timeout if it has not halted after this many
    /// supersteps. Combined with the program's own bound by taking the smaller one.
    pub max_supersteps: Option<usize>,
    pub partitions: usize,
    pub partition_strategy: PartitionStrategy,
    /// How many partitions execute at the same time.
    pub threads: NonZeroUsize,
    /// Seed for the random partition strategy.
    pub seed: u64,
    pub parameters: ProgramParameters,
}

impl Default for ComputerConfig {
    fn default() -> Self {
        Self {
            max_supersteps: None,
            partitions: 1,
            partition_strategy: PartitionStrategy::default(),
            threads: NonZeroUsize::new(1).expect("Unreachable"),
            seed: 0,
            parameters: ProgramParameters::new(),
        }
    }
}

impl ComputerConfig {
    pub fn with_max_supersteps(mut self, max_supersteps: usize) -> Self {
        self.max_supersteps = Some(max_supersteps);
        self
    }

    pub fn with_partitions(mut self, partitions: usize, strategy: PartitionStrategy) -> Self {
        self.partitions = partitions;
        self.partition_strategy = strategy;
        self
    }

    pub fn with_threads(mut self, threads: NonZeroUsize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_parameter(mut self, key: &str, value: PropertyValue) -> Self {
        self.parameters.insert(key.to_owned(), value);
        self
    }

    /// Builds a config from `key=value` style options. `param.<name>` options become program
    /// parameters with their type inferred from the text; any other unknown key is an error.
    pub fn from_options<'a>(
        options: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, GCError> {
        let mut config = Self::default();
        for (key, value) in options {
            match key {
                OPTION_MAX_SUPERSTEPS => {
                    config.max_supersteps = Some(parse_option(key, value)?);
                }
                OPTION_PARTITIONS => config.partitions = parse_option(key, value)?,
                OPTION_PARTITION_STRATEGY => config.partition_strategy = value.parse()?,
                OPTION_THREADS => config.threads = parse_option(key, value)?,
                OPTION_SEED => config.seed = parse_option(key, value)?,
                _ => match key.strip_prefix(OPTION_PARAMETER_PREFIX) {
                    Some(name) if !name.is_empty() => {
                        config.parameters.insert(name.to_owned(), PropertyValue::parse(value));
                    }
                    _ => {
                        return Err(GCError::Configuration(format!(
                            "Unknown option '{}'. Known options are {:?} and '{}<name>'",
                            key,
                            [
                                OPTION_MAX_SUPERSTEPS,
                                OPTION_PARTITIONS,
                                OPTION_PARTITION_STRATEGY,
                                OPTION_THREADS,
                                OPTION_SEED
                            ],
                            OPTION_PARAMETER_PREFIX
                        )));
                    }
                },
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GCError> {
        if self.partitions == 0 {
            return Err(GCError::Configuration("Partition count must be at least 1".to_owned()));
        }
        if self.max_supersteps == Some(0) {
            return Err(GCError::Configuration("Superstep cap must be at least 1".to_owned()));
        }
        Ok(())
    }
}

fn parse_option<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, GCError> {
    value.parse::<T>().map_err(|_| {
        GCError::Configuration(format!("Could not parse value '{}' for option '{}'", value, key))
    })
}
