use crate::computer::config::ComputerConfig;
use crate::computer::executor::{
    panic_message, Partition, PartitionReport, PartitionStats, VertexProgramExecutor,
};
use crate::computer::partition::Partitioner;
use crate::error::{GCError, PartitionFailure};
use crate::graph::GraphProvider;
use crate::memory::Memory;
use crate::messenger::{route_messages, MessageCombiner, Messenger};
use crate::program::{VertexProgram, VertexRef};
use crate::util::memory_usage::print_memory_usage;
use crate::util::timer::{GcDuration, GcTimer};
use crossbeam_utils::thread;
use itertools::Itertools;
use log::{debug, info, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CoordinatorState {
    Init,
    Running(usize),
    Barrier(usize),
    Halted,
    Failed,
}

impl CoordinatorState {
    pub fn can_transition_to(self, next: CoordinatorState) -> bool {
        match (self, next) {
            (CoordinatorState::Init, CoordinatorState::Running(superstep)) => superstep == 0,
            (CoordinatorState::Running(current), CoordinatorState::Barrier(superstep)) => {
                current == superstep
            }
            (CoordinatorState::Barrier(current), CoordinatorState::Running(superstep)) => {
                current + 1 == superstep
            }
            (CoordinatorState::Barrier(_), CoordinatorState::Halted) => true,
            (CoordinatorState::Init, CoordinatorState::Failed)
            | (CoordinatorState::Running(_), CoordinatorState::Failed)
            | (CoordinatorState::Barrier(_), CoordinatorState::Failed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    /// Number of executed supersteps.
    pub supersteps: usize,
    pub superstep_durations: Vec<GcDuration>,
    pub vertices_executed: usize,
    pub messages_sent: usize,
    pub total_time: GcDuration,
}

impl RunStatistics {
    fn record(&mut self, stats: &PartitionStats) {
        self.vertices_executed += stats.vertices_executed;
        self.messages_sent += stats.messages_sent;
    }
}

/// Everything a successful run leaves behind.
#[derive(Debug)]
pub(crate) struct RunOutcome<S, V> {
    pub memory: Memory<V>,
    pub partitions: Vec<Partition<S>>,
    pub partitioner: Partitioner,
    pub statistics: RunStatistics,
}

/// Working storage of a run between `Init` and the final barrier.
struct Run<S, M, V> {
    memory: Memory<V>,
    partitioner: Partitioner,
    partitions: Vec<Partition<S>>,
    messengers: Vec<Messenger<M>>,
    combiner: Option<MessageCombiner<M>>,
    max_supersteps: Option<usize>,
    statistics: RunStatistics,
}

type PartitionResult<V> = Result<PartitionReport<V>, PartitionFailure>;

/// Drives one program over one graph through the BSP loop.
pub(crate) struct Coordinator<'g, P: VertexProgram> {
    program: P,
    graph: &'g dyn GraphProvider,
    config: ComputerConfig,
    cancel: Arc<AtomicBool>,
    state: CoordinatorState,
}

impl<'g, P: VertexProgram> Coordinator<'g, P> {
    pub fn new(
        program: P,
        graph: &'g dyn GraphProvider,
        config: ComputerConfig,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self { program, graph, config, cancel, state: CoordinatorState::Init }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Gives back the program as `setup` left it.
    pub fn into_program(self) -> P {
        self.program
    }

    pub fn run(&mut self) -> Result<RunOutcome<P::State, P::MemoryValue>, GCError> {
        let timer = GcTimer::now();
        let result = self.run_inner();
        match &result {
            Ok(outcome) => info!(
                "'{}' halted after {} supersteps in {}",
                self.program.name(),
                outcome.statistics.supersteps,
                timer.elapsed().to_seconds_string()
            ),
            Err(e) => {
                self.transition(CoordinatorState::Failed);
                warn!(
                    "'{}' failed after {}: {}",
                    self.program.name(),
                    timer.elapsed().to_seconds_string(),
                    e
                );
            }
        }
        print_memory_usage(format_args!("'{}' finished", self.program.name()));
        result
    }

    fn run_inner(&mut self) -> Result<RunOutcome<P::State, P::MemoryValue>, GCError> {
        let timer = GcTimer::now();
        let mut run = guarded(0, || self.init())?;
        run.memory.start()?;
        loop {
            let superstep = run.memory.iteration();
            self.transition(CoordinatorState::Running(superstep));
            let superstep_timer = GcTimer::now();
            let reports = self.run_superstep(&mut run)?;

            self.transition(CoordinatorState::Barrier(superstep));
            let halted = guarded(superstep, || self.barrier(superstep, reports, &mut run))?;
            let duration = superstep_timer.elapsed();
            run.statistics.supersteps += 1;
            run.statistics.superstep_durations.push(duration);
            info!("Superstep {} done in {}", superstep, duration.to_millis_string());
            if halted {
                break;
            }
            run.memory.incr_iteration();
        }
        self.transition(CoordinatorState::Halted);
        run.memory.complete();
        run.statistics.total_time = timer.elapsed();
        Ok(RunOutcome {
            memory: run.memory,
            partitions: run.partitions,
            partitioner: run.partitioner,
            statistics: run.statistics,
        })
    }

    /// Validates the run against the graph and builds its working storage.
    fn init(&mut self) -> Result<Run<P::State, P::Message, P::MemoryValue>, GCError> {
        self.config.validate()?;
        let name = self.program.name().to_owned();
        let max_supersteps = match (self.config.max_supersteps, self.program.max_supersteps()) {
            (Some(configured), Some(own)) => Some(configured.min(own)),
            (configured, own) => configured.or(own),
        };
        match max_supersteps {
            Some(0) => {
                return Err(GCError::Configuration(format!(
                    "'{}' allows no supersteps at all",
                    name
                )));
            }
            None if !self.program.converges_natively() => {
                return Err(GCError::Configuration(format!(
                    "'{}' does not halt on its own and needs a superstep cap",
                    name
                )));
            }
            _ => (),
        }
        let mut memory = Memory::default();
        for key in self.program.memory_keys() {
            memory.register(key)?;
        }
        self.program.setup(&self.config.parameters, &mut memory)?;
        for (kind, key) in self.program.required_properties() {
            if !self.graph.has_property_key(kind, &key) {
                return Err(GCError::Configuration(format!(
                    "'{}' requires {} property '{}' which the graph does not have",
                    name, kind, key
                )));
            }
        }

        let partitioner = Partitioner::new(
            self.config.partition_strategy,
            self.config.partitions,
            self.config.seed,
            self.graph.vertex_ids(),
        )?;
        let program = &self.program;
        let graph = self.graph;
        let partitions = partitioner
            .members()
            .into_iter()
            .enumerate()
            .map(|(id, vertex_ids)| {
                let states = vertex_ids
                    .iter()
                    .map(|v| program.initial_state(&VertexRef::new(*v, graph)))
                    .collect();
                Partition::new(id, vertex_ids, states)
            })
            .collect_vec();
        let combiner = self.program.message_combiner();
        let messengers = partitions
            .iter()
            .map(|partition| Messenger::new(partition.id(), combiner.clone()))
            .collect_vec();
        info!(
            "Starting '{}' on {} vertices in {} partitions ({}), {} threads, superstep cap {}",
            name,
            partitioner.vertex_count(),
            partitioner.partitions(),
            self.config.partition_strategy,
            self.config.threads,
            max_supersteps.map_or_else(|| "none".to_owned(), |max| max.to_string())
        );

        Ok(Run {
            memory,
            partitioner,
            partitions,
            messengers,
            combiner,
            max_supersteps,
            statistics: RunStatistics::default(),
        })
    }

    /// Executes all partitions, at most `threads` of them at a time.
    fn run_superstep(
        &self,
        run: &mut Run<P::State, P::Message, P::MemoryValue>,
    ) -> Result<Vec<PartitionResult<P::MemoryValue>>, GCError> {
        let superstep = run.memory.iteration();
        let executor = VertexProgramExecutor::new(&self.program, self.graph, &run.memory);
        let executor = &executor;
        let mut reports = Vec::with_capacity(run.partitions.len());
        let work = run.partitions.iter_mut().zip(run.messengers.iter_mut());
        for chunk in &work.chunks(self.config.threads.get()) {
            thread::scope(|s| {
                let threads = chunk
                    .map(|(partition, messenger)| {
                        let id = partition.id();
                        let thread = s
                            .builder()
                            .name(format!("partition-{}", id))
                            .spawn(move |_| executor.execute(partition, messenger));
                        (id, thread)
                    })
                    .collect_vec();
                for (id, thread) in threads {
                    let failure =
                        |message| PartitionFailure::new(Some(id), superstep, None, message);
                    reports.push(match thread {
                        Ok(thread) => thread.join().unwrap_or_else(|panic| {
                            Err(failure(panic_message(&*panic)))
                        }),
                        Err(e) => Err(failure(format!("Could not start thread: {}", e))),
                    });
                }
            })
            .map_err(|_| {
                GCError::Generic(format!("Partition threads of superstep {} leaked", superstep))
            })?;
        }
        Ok(reports)
    }

    /// Merges the effects of `superstep` and decides whether the run halts here.
    fn barrier(
        &self,
        superstep: usize,
        reports: Vec<PartitionResult<P::MemoryValue>>,
        run: &mut Run<P::State, P::Message, P::MemoryValue>,
    ) -> Result<bool, GCError> {
        let mut contributions = Vec::with_capacity(reports.len());
        let mut failure: Option<PartitionFailure> = None;
        let mut all_voted_to_halt = true;
        for report in reports {
            match report {
                Ok(report) => {
                    all_voted_to_halt &= report.all_voted_to_halt();
                    run.statistics.record(&report.stats);
                    contributions.push(report.contributions);
                }
                Err(e) => {
                    if failure.as_ref().map_or(true, |first| e.partition < first.partition) {
                        failure = Some(e);
                    }
                }
            }
        }
        if let Some(failure) = failure {
            return Err(GCError::ProgramExecution(failure));
        }

        run.memory.merge(contributions)?;
        let outboxes = run.messengers.iter_mut().map(Messenger::take_outbox).collect();
        let (mailboxes, pending) =
            route_messages(outboxes, superstep, &run.partitioner, run.combiner.as_ref())?;
        for (messenger, mailbox) in run.messengers.iter_mut().zip(mailboxes) {
            messenger.deliver(superstep + 1, mailbox);
        }
        run.memory.set_halted(all_voted_to_halt);
        debug!(
            "Barrier {}: {} messages pending, all voted to halt = {}, memory = {:?}",
            superstep, pending, all_voted_to_halt, run.memory
        );

        if (all_voted_to_halt && pending == 0) || self.program.terminate(&run.memory) {
            return Ok(true);
        }
        if self.cancel.load(Ordering::SeqCst) {
            return Err(GCError::Cancelled(superstep));
        }
        if let Some(max_supersteps) = run.max_supersteps {
            if superstep + 1 >= max_supersteps {
                return Err(GCError::ConvergenceTimeout(max_supersteps));
            }
        }
        Ok(false)
    }

    fn transition(&mut self, next: CoordinatorState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "Illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Runs program code that executes on the coordinator thread (setup, initial states, memory and
/// message combiners at the barrier, `terminate`). A panic fails the run at `superstep`.
fn guarded<T>(superstep: usize, f: impl FnOnce() -> Result<T, GCError>) -> Result<T, GCError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| {
        Err(GCError::ProgramExecution(PartitionFailure::new(
            None,
            superstep,
            None,
            panic_message(&*panic),
        )))
    })
}
