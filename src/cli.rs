use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser};
use log::debug;

use crate::config::Config;
use crate::console::{ColorWhen, Verbosity};
use crate::filter::FilterSpec;
use crate::registry::Registry;
use crate::timer::TimerKind;
use crate::{Error, Result};

/// The help text lists the tests when there are fewer than this many.
const HELP_LIST_LIMIT: usize = 16;

/// Run the specified unit tests; or if the option '--skip' is used, run all
/// tests in the suite but those listed. By default, if no tests are specified
/// on the command line, all unit tests in the suite are run.
#[derive(Parser, Debug)]
#[command(disable_version_flag = true)]
pub struct Cli {
	/// Unit tests to run (exact name, whole word or substring)
	#[arg(value_name = "TEST")]
	pub tests: Vec<String>,

	/// Execute all unit tests but the listed ones
	#[arg(short, long)]
	pub skip: bool,

	/// Only run tests whose name matches PATTERN ('*' matches anything)
	#[arg(long, value_name = "PATTERN")]
	pub filter: Option<String>,

	/// List unit tests in the suite and exit
	#[arg(short, long, visible_alias = "list-tests")]
	pub list: bool,

	/// Make output more verbose; repeat for more
	#[arg(short = 'v', action = clap::ArgAction::Count)]
	pub more_verbose: u8,

	/// Set the verbosity level: 0 silent, 1 one line per test, 2 failed
	/// conditions (default), 3 all conditions. Without LEVEL, same as -v
	#[arg(
		long,
		value_name = "LEVEL",
		num_args = 0..=1,
		require_equals = true,
		overrides_with = "verbose",
		value_parser = clap::value_parser!(u8).range(0..=3),
	)]
	pub verbose: Option<Option<u8>>,

	/// Same as --verbose=0
	#[arg(short, long, conflicts_with_all = ["verbose", "more_verbose"])]
	pub quiet: bool,

	/// Measure test duration
	#[arg(
		short,
		long,
		value_name = "TIMER",
		num_args = 0..=1,
		require_equals = true,
		default_missing_value = "real",
	)]
	pub time: Option<TimerKind>,

	/// Suppress printing of test results summary
	#[arg(long)]
	pub no_summary: bool,

	/// Enable XUnit output to the given file
	#[arg(
		short = 'x',
		long = "xml-output",
		visible_alias = "output",
		visible_short_alias = 'o',
		value_name = "FILE"
	)]
	pub xml_output: Option<PathBuf>,

	/// Enable colorized output
	#[arg(
		long,
		value_name = "WHEN",
		num_args = 0..=1,
		require_equals = true,
		default_missing_value = "always",
	)]
	pub color: Option<ColorWhen>,

	/// Same as --color=never
	#[arg(long, conflicts_with = "color")]
	pub no_color: bool,

	/// Only print output for failing tests
	#[arg(long)]
	pub failed_output_only: bool,

	/// Read default settings from a TOML file
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,
}

/// What the command line asked for.
#[derive(Debug)]
pub enum Invocation {
	List,
	Run(Settings),
}

/// Fully resolved run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
	pub verbosity: Verbosity,
	pub color: bool,
	/// `None` measures real time but does not print it.
	pub timer: Option<TimerKind>,
	pub summary: bool,
	pub failed_output_only: bool,
	pub xml_output: Option<PathBuf>,
	pub filter: FilterSpec,
}

impl Default for Settings {
	fn default() -> Self {
		Settings {
			verbosity: Verbosity::default(),
			color: false,
			timer: None,
			summary: true,
			failed_output_only: false,
			xml_output: None,
			filter: FilterSpec::default(),
		}
	}
}

/// Parses `args` (including the program name) for a binary running
/// `registry`.
pub fn parse(argv0: &str, args: Vec<OsString>, registry: &Registry) -> Result<Invocation> {
	let mut command = Cli::command().bin_name(argv0.to_owned());
	if !registry.is_empty() && registry.len() < HELP_LIST_LIMIT {
		let mut listing = String::from("Unit tests:");
		for name in registry.names() {
			listing.push_str("\n  ");
			listing.push_str(name);
		}
		command = command.after_help(listing);
	}

	let matches = command.try_get_matches_from(args)?;
	let cli = Cli::from_arg_matches(&matches)?;
	debug!("{cli:?}");

	if cli.list {
		return Ok(Invocation::List);
	}

	let config = match &cli.config {
		Some(path) => Config::open(path)?,
		None => Config::default(),
	};
	Ok(Invocation::Run(cli.resolve(config)?))
}

impl Cli {
	/// Merges the flags over `config`; flags win.
	pub fn resolve(self, config: Config) -> Result<Settings> {
		let defaults = Settings::default();

		let verbosity = if self.quiet {
			Verbosity::Silent
		} else {
			let base = match self.verbose {
				Some(Some(level)) => level,
				_ => config.verbose.unwrap_or(defaults.verbosity as u8),
			};
			// Every `-v`, and a bare `--verbose`, raises the level by one.
			let raise = self.more_verbose.saturating_add(u8::from(self.verbose == Some(None)));
			let level = if raise == 0 {
				base
			} else {
				base.saturating_add(raise).min(Verbosity::Verbose as u8)
			};
			Verbosity::try_from(level).map_err(|_| Error::Verbosity(level))?
		};

		let color = if self.no_color {
			ColorWhen::Never
		} else {
			self.color.or(config.color).unwrap_or_default()
		};

		let filter = FilterSpec {
			pattern: self.filter.or(config.filter),
			names: self.tests,
			skip_mode: self.skip,
		};

		Ok(Settings {
			verbosity,
			color: color.enabled(),
			timer: self.time.or(config.time),
			summary: !self.no_summary && config.summary.unwrap_or(defaults.summary),
			failed_output_only: self.failed_output_only
				|| config.failed_output_only.unwrap_or(defaults.failed_output_only),
			xml_output: self.xml_output.or(config.xml_output),
			filter,
		})
	}
}
