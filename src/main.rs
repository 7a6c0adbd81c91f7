// Enable warnings for all clippy lints.
#![warn(
    clippy::correctness,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::pedantic,
    clippy::cargo,
    clippy::restriction
)]
// Selectively disable warnings for some lints.
#![allow(
    clippy::indexing_slicing, // Allow `vec[i]` indexing.
    clippy::module_name_repetitions,  // Allow name repetitions in module and type names.
    clippy::use_debug, // Debug formatting is useful.
    clippy::float_arithmetic, // Needed.
    clippy::integer_arithmetic, // Needed.
    clippy::integer_division, // Needed.
    clippy::multiple_crate_versions, // Beyond our control.
    clippy::missing_docs_in_private_items, // Disabled.
    clippy::missing_inline_in_public_items, // Not considered for now.
    clippy::implicit_return, // Allow.
    clippy::too_many_arguments, // Allow.
    clippy::use_self, // Too pedantic.
    clippy::shadow_same,
    clippy::result_expect_used,
    clippy::unknown_clippy_lints,
    clippy::exit,
    clippy::as_conversions
)]
// Mark some lints as errors.
#![deny(clippy::print_stdout)]

use clap::{arg_enum, value_t, App, Arg, ArgMatches};
use graphcomputer::computer::{ComputerConfig, GraphComputer};
use graphcomputer::error::GCError;
use graphcomputer::graph::loader::{GraphLoader, DEFAULT_HAS_HEADERS};
use graphcomputer::programs::builder::{initialize_programs, ProgramBuilder, ProgramOutput};
use graphcomputer::util::io::GcWriter;
use graphcomputer::util::logger::init_logger_with_level;
use graphcomputer::util::timer::GcTimer;
use hashbrown::HashMap;
use log::{info, Level};
use std::sync::Arc;

arg_enum! {
    #[derive(PartialEq, Debug)]
    pub enum LogLevel {
        Error,
        Warn,
        Info,
        Debug,
        Trace,
    }
}

fn main() -> Result<(), GCError> {
    // Parse command line arguments.
    let matches = App::new("graphcomputer")
        .arg(
            Arg::from_usage("-l, --loglevel=[LEVEL] 'Set the log level'")
                .possible_values(&LogLevel::variants())
                .case_insensitive(true),
        )
        .arg(Arg::from_usage("-p, --program=<PROGRAM> 'Vertex program to run'"))
        .arg(Arg::from_usage("-e, --edges=<FILE> 'Edge file'"))
        .arg(Arg::from_usage("-v, --vertices=[FILE] 'Vertex file'"))
        .arg(
            Arg::from_usage("-o, --option=[OPTION]... 'Computer option or program parameter'")
                .number_of_values(1),
        )
        .arg(Arg::from_usage("-s, --save-to=[FILE] 'Write the vertex states to a file'"))
        .arg(Arg::from_usage("--separator=[CHAR] 'Column separator of the input files'"))
        .arg(Arg::from_usage("--no-headers 'Input files have no header row'"))
        .get_matches();

    setup_logger(&matches)?;

    let mut programs: HashMap<String, Box<dyn ProgramBuilder>> = HashMap::new();
    initialize_programs(&mut programs);
    let program_name = matches.value_of("program").unwrap_or_default();
    let builder = programs
        .get(program_name)
        .ok_or_else(|| GCError::UnknownComputation(program_name.to_owned()))?;

    let options = matches
        .values_of("option")
        .map(|values| values.map(parse_option).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();
    let config = ComputerConfig::from_options(options)?;

    let separator = match matches.value_of("separator") {
        Some(separator) if separator.len() == 1 => Some(separator.as_bytes()[0]),
        Some(separator) => {
            return Err(GCError::Configuration(format!(
                "Separator must be a single byte, got '{}'",
                separator
            )))
        }
        None => None,
    };
    let loaded = GraphLoader::new(
        matches.value_of("vertices").map(ToOwned::to_owned),
        matches.value_of("edges").unwrap_or_default().to_owned(),
        separator,
        None,
        DEFAULT_HAS_HEADERS && !matches.is_present("no-headers"),
    )
    .load()?;

    let computer = GraphComputer::new(Arc::new(loaded.graph));
    let timer = GcTimer::now();
    info!("Running '{}' with {:?}", program_name, config);
    let output = builder.execute(&computer, config)?;
    info!("[Success][{}] '{}' finished", timer.elapsed().to_seconds_string(), program_name);
    log_output(&output);

    if let Some(file_path) = matches.value_of("save-to") {
        let mut writer = GcWriter::new(file_path.to_owned())?;
        let vertex_names = &loaded.vertex_names;
        writer.write_file_lines(output.states.iter().map(|(vertex_id, state)| {
            let name = vertex_names.get(*vertex_id as usize).map_or("?", String::as_str);
            format!("{},{}", name, state)
        }))?;
        writer.flush()?;
        info!("Vertex states written to '{}'", file_path);
    }

    Ok(())
}

fn parse_option(option: &str) -> Result<(&str, &str), GCError> {
    let mut parts = option.splitn(2, '=');
    match (parts.next(), parts.next()) {
        (Some(key), Some(value)) if !key.is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(GCError::Configuration(format!("Expected 'key=value', got '{}'", option))),
    }
}

fn log_output(output: &ProgramOutput) {
    for (key, value) in &output.memory {
        info!("[Memory] {} = {}", key, value);
    }
    let statistics = &output.statistics;
    info!(
        "{} supersteps, {} vertex executions, {} messages in {}",
        statistics.supersteps,
        statistics.vertices_executed,
        statistics.messages_sent,
        statistics.total_time.to_seconds_string()
    );
}

fn setup_logger(matches: &ArgMatches) -> Result<(), GCError> {
    // Set log level.
    let log_level = match value_t!(matches, "loglevel", LogLevel).unwrap_or(LogLevel::Info) {
        LogLevel::Error => Level::Error,
        LogLevel::Warn => Level::Warn,
        LogLevel::Info => Level::Info,
        LogLevel::Debug => Level::Debug,
        LogLevel::Trace => Level::Trace,
    };
    init_logger_with_level(log_level)
}
