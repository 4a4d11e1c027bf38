//! A small sequential unit test harness.
//!
//! Tests are registered explicitly into a [`Registry`](registry::Registry),
//! then [`main`] parses the command line, runs the selected tests one at a
//! time and reports the results on stdout (and optionally as an XML file).

#[macro_use]
mod macros;

pub mod cli;
pub mod config;
pub mod console;
pub mod context;
pub mod filter;
pub mod matcher;
pub mod prelude;
pub mod registry;
pub mod runner;
pub mod timer;
pub mod xml;

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

use log::debug;
use thiserror::Error;

use crate::cli::Invocation;
use crate::console::Logger;
use crate::registry::Registry;
use crate::runner::Runner;
use crate::timer::Clock;
use crate::xml::XmlReport;

/// Everything that stops a run before (or instead of) executing tests.
///
/// Failing tests are never reported through this type; they only show up
/// in the [`RunReport`](runner::RunReport).
#[derive(Debug, Error)]
pub enum Error {
	#[error("Out of memory.")]
	OutOfMemory,
	#[error("Unrecognized unit test '{0}'")]
	UnknownTest(String),
	#[error("Verbose level {0} is out of range (0 to 3)")]
	Verbosity(u8),
	#[error(transparent)]
	Usage(#[from] clap::Error),
	#[error("Unable to open '{}': {source}", path.display())]
	Output { path: PathBuf, source: io::Error },
	#[error("Unable to read '{}': {source}", path.display())]
	ConfigRead { path: PathBuf, source: io::Error },
	#[error("Invalid configuration in '{}': {source}", path.display())]
	ConfigParse { path: PathBuf, source: toml::de::Error },
	#[error("Failed to write test report: {0}")]
	Report(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Parses the process arguments, runs `registry` and exits the process.
///
/// Exit codes: 0 if every selected test passed, 1 if any failed, 2 on a
/// usage or configuration error.
pub fn main(registry: Registry) -> ! {
	let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
		.format_timestamp(None)
		.try_init();
	exit(run_main(std::env::args_os(), &registry))
}

/// Same as [`main`] but returns the exit code instead of exiting.
pub fn run_main<I, T>(args: I, registry: &Registry) -> i32
where
	I: IntoIterator<Item = T>,
	T: Into<OsString>,
{
	let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
	let argv0 = args
		.first()
		.map(|arg| program_name(Path::new(arg)))
		.unwrap_or_else(|| String::from("unitrun"));

	let stdout = io::stdout();
	let mut out = stdout.lock();
	let code = match execute(&argv0, args, registry, &mut out) {
		Ok(code) => code,
		Err(Error::Usage(error)) => {
			let _ = error.print();
			error.exit_code()
		}
		Err(error @ Error::UnknownTest(_)) => {
			eprintln!("{argv0}: {error}");
			eprintln!("Try '{argv0} --list' for list of unit tests.");
			2
		}
		Err(error) => {
			eprintln!("{argv0}: {error}");
			eprintln!("Try '{argv0} --help' for more information.");
			2
		}
	};
	let _ = out.flush();
	code
}

/// Runs one invocation against `registry`, writing the console report to
/// `out`. Returns the exit code for a completed run.
pub fn execute<W: Write>(
	argv0: &str,
	args: Vec<OsString>,
	registry: &Registry,
	out: &mut W,
) -> Result<i32> {
	match cli::parse(argv0, args, registry)? {
		Invocation::List => {
			console::list_tests(out, registry)?;
			Ok(0)
		}
		Invocation::Run(settings) => {
			let selection = settings.filter.select(registry)?;
			// Opened before any test runs so a bad path is reported as a
			// configuration error.
			let xml = settings
				.xml_output
				.as_deref()
				.map(XmlReport::create)
				.transpose()?;

			let mut logger = Logger::from_settings(out, &settings);
			let runner = Runner::new(Clock::new(settings.timer.unwrap_or_default()));
			let report = runner.run(registry, &selection, &mut logger)?;
			logger.finish(registry, &report)?;

			if let Some(xml) = xml {
				xml.write(argv0, registry, &report)?;
			}

			debug!("run finished: {:?}", report.stats);
			Ok(if report.stats.total_failed == 0 { 0 } else { 1 })
		}
	}
}

/// The file name of `argv0`, without directories.
pub fn program_name(argv0: &Path) -> String {
	argv0
		.file_name()
		.unwrap_or(argv0.as_os_str())
		.to_string_lossy()
		.into_owned()
}
