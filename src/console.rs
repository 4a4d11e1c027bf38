use std::io::{self, IsTerminal, Write};
use std::panic::Location;
use std::path::Path;

use owo_colors::{OwoColorize, Style};
use serde::Deserialize;
use try_from_discrim::TryFrom;

use crate::cli::Settings;
use crate::context::{Context, Event};
use crate::registry::{Registry, TestEntry};
use crate::runner::{AbortReason, Outcome, RunReport, TestRunRecord};
use crate::timer::{Secs, TimerKind};

/// Width the "Test name..." column is padded to before the result marker.
const LINE_WIDTH: usize = 48;
/// Dumps longer than this are cut.
const DUMP_MAX: usize = 1024;

#[derive(TryFrom, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[from(u8)]
pub enum Verbosity {
	/// No output at all.
	Silent = 0,
	/// One line per test, and the summary.
	Terse = 1,
	/// As `Terse`, plus failed conditions.
	#[default]
	Normal = 2,
	/// Every condition, and an extended summary.
	Verbose = 3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorWhen {
	/// Colour when stdout is a terminal.
	#[default]
	Auto,
	Always,
	Never,
}

impl ColorWhen {
	pub fn enabled(self) -> bool {
		match self {
			ColorWhen::Auto => io::stdout().is_terminal(),
			ColorWhen::Always => true,
			ColorWhen::Never => false,
		}
	}
}

fn green() -> Style {
	Style::new().bright_green().bold()
}

fn red() -> Style {
	Style::new().bright_red().bold()
}

fn yellow() -> Style {
	Style::new().yellow()
}

fn bold() -> Style {
	Style::new().bold()
}

/// Prints test progress and the end of run summary.
pub struct Logger<W: Write> {
	out: W,
	verbosity: Verbosity,
	color: bool,
	timer: Option<TimerKind>,
	summary: bool,
	failed_output_only: bool,
}

/// Prints the lines belonging to a single test.
pub struct TestLogger<'a, W: Write> {
	logger: &'a mut Logger<W>,
	entry: &'a TestEntry,
}

impl<W: Write> Logger<W> {
	pub fn new(out: W, verbosity: Verbosity) -> Logger<W> {
		Logger {
			out,
			verbosity,
			color: false,
			timer: None,
			summary: true,
			failed_output_only: false,
		}
	}

	pub fn from_settings(out: W, settings: &Settings) -> Logger<W> {
		Logger::new(out, settings.verbosity)
			.color(settings.color)
			.timer(settings.timer)
			.summary(settings.summary)
			.failed_output_only(settings.failed_output_only)
	}

	#[must_use]
	pub fn color(mut self, color: bool) -> Self {
		self.color = color;
		self
	}

	/// Show durations, measured with the given clock.
	#[must_use]
	pub fn timer(mut self, timer: Option<TimerKind>) -> Self {
		self.timer = timer;
		self
	}

	#[must_use]
	pub fn summary(mut self, summary: bool) -> Self {
		self.summary = summary;
		self
	}

	/// Only print anything for tests that fail.
	#[must_use]
	pub fn failed_output_only(mut self, failed_output_only: bool) -> Self {
		self.failed_output_only = failed_output_only;
		self
	}

	pub fn into_inner(self) -> W {
		self.out
	}

	pub fn make_test<'a>(&'a mut self, entry: &'a TestEntry) -> TestLogger<'a, W> {
		TestLogger { logger: self, entry }
	}

	/// Prints the summary of a finished run.
	pub fn finish(&mut self, registry: &Registry, report: &RunReport) -> io::Result<()> {
		if !self.summary || self.verbosity == Verbosity::Silent {
			return Ok(());
		}
		let stats = &report.stats;

		if self.verbosity >= Verbosity::Verbose {
			writeln!(self.out, "{}", self.paint("Summary:", bold()))?;
			writeln!(self.out, "  Count of all unit tests:     {:4}", stats.total_registered)?;
			writeln!(self.out, "  Count of run unit tests:     {:4}", stats.total_run)?;
			writeln!(self.out, "  Count of failed unit tests:  {:4}", stats.total_failed)?;
			writeln!(self.out, "  Count of skipped unit tests: {:4}", stats.total_skipped)?;
			writeln!(self.out, "  Count of warnings:           {:4}", stats.total_warnings)?;
		}

		if stats.total_registered == 0 {
			writeln!(
				self.out,
				"{} No unit tests were registered.",
				self.paint("WARNING:", yellow())
			)?;
		} else if stats.total_failed == 0 {
			writeln!(
				self.out,
				"{} All unit tests have passed.",
				self.paint("SUCCESS:", green())
			)?;
		} else {
			writeln!(
				self.out,
				"{} {} of {} unit tests {} failed.",
				self.paint("FAILED:", red()),
				stats.total_failed,
				stats.total_run,
				if stats.total_failed == 1 { "has" } else { "have" }
			)?;
			for name in report.failed().filter_map(|i| registry.get(i)).map(TestEntry::name) {
				writeln!(self.out, "  {} {name}", self.paint("[ FAILED ]", red()))?;
			}
		}

		if self.verbosity >= Verbosity::Verbose {
			writeln!(self.out)?;
		}
		self.out.flush()
	}

	fn paint(&self, text: &str, style: Style) -> String {
		if self.color {
			text.style(style).to_string()
		} else {
			text.to_owned()
		}
	}
}

impl<'a, W: Write> TestLogger<'a, W> {
	/// Announces the test before its body runs.
	pub fn begin(&mut self) -> io::Result<()> {
		if self.logger.failed_output_only {
			// Nothing is known to be worth printing yet.
			return Ok(());
		}
		self.header()?;
		// Keep the name visible if the test hangs or crashes the process.
		self.logger.out.flush()
	}

	pub fn finish(mut self, ctx: &Context, record: &TestRunRecord) -> io::Result<()> {
		let verbosity = self.logger.verbosity;
		let failed = record.outcome.is_failure();
		if verbosity == Verbosity::Silent || (self.logger.failed_output_only && !failed) {
			return Ok(());
		}
		if self.logger.failed_output_only {
			self.header()?;
		}

		if verbosity >= Verbosity::Verbose {
			self.events(ctx, true)?;
			self.verdict(ctx, record)?;
		} else {
			self.result_line(record)?;
			if verbosity >= Verbosity::Normal && (failed || ctx.warnings() != 0) {
				self.events(ctx, false)?;
			}
		}
		self.logger.out.flush()
	}

	fn header(&mut self) -> io::Result<()> {
		let logger = &mut *self.logger;
		match logger.verbosity {
			Verbosity::Silent => Ok(()),
			Verbosity::Verbose => {
				let head = format!("Test {}:", self.entry.name());
				writeln!(logger.out, "{}", logger.paint(&head, bold()))
			}
			_ => {
				let head = format!("Test {}... ", self.entry.name());
				let pad = LINE_WIDTH.saturating_sub(head.len());
				write!(logger.out, "{}{:pad$}", logger.paint(&head, bold()), "")
			}
		}
	}

	fn result_line(&mut self, record: &TestRunRecord) -> io::Result<()> {
		let logger = &mut *self.logger;
		if record.outcome.is_failure() {
			writeln!(logger.out, "[ {} ]", logger.paint("FAILED", red()))
		} else {
			write!(logger.out, "[ {} ]", logger.paint("OK", green()))?;
			if logger.timer.is_some() {
				write!(logger.out, "  {}", Secs(record.duration))?;
			}
			writeln!(logger.out)
		}
	}

	/// Prints what the test recorded. Unless `all` is set only failures,
	/// warnings and what is attached to failures are shown.
	fn events(&mut self, ctx: &Context, all: bool) -> io::Result<()> {
		let logger = &mut *self.logger;
		let mut case: Option<&str> = None;
		let mut case_logged = false;

		for event in ctx.events() {
			let depth = if case.is_some() { 2 } else { 1 };
			match event {
				Event::Case(name) => {
					case = name.as_deref();
					case_logged = false;
				}
				Event::Check {
					location,
					text,
					passed,
					detail,
				} => {
					if !all && *passed {
						continue;
					}
					if let (Some(name), false) = (case, case_logged) {
						let head = format!("Case {name}:");
						writeln!(logger.out, "{}{}", indent(1), logger.paint(&head, bold()))?;
						case_logged = true;
					}
					let result = if *passed {
						logger.paint("ok", Style::new().green())
					} else {
						logger.paint("failed", Style::new().red())
					};
					writeln!(
						logger.out,
						"{}{}: Check {text}... {result}",
						indent(depth),
						short_location(location)
					)?;
					if let Some(detail) = detail {
						writeln!(logger.out, "{}{detail}", indent(depth + 1))?;
					}
				}
				Event::Message {
					text,
					after_failure,
				} => {
					if all || *after_failure {
						for line in text.lines() {
							writeln!(logger.out, "{}{line}", indent(depth + 1))?;
						}
					}
				}
				Event::Dump {
					title,
					bytes,
					after_failure,
				} => {
					if all || *after_failure {
						write_dump(&mut logger.out, depth + 1, title, bytes)?;
					}
				}
				Event::Warning { location, text } => {
					writeln!(
						logger.out,
						"{}{}: {} {text}",
						indent(depth),
						short_location(location),
						logger.paint("WARNING:", yellow())
					)?;
				}
				Event::Panic { location, message } => {
					let at = location.as_deref().map(|l| format!(" at {l}")).unwrap_or_default();
					writeln!(
						logger.out,
						"{}{} Test panicked{at}: {message}",
						indent(1),
						logger.paint("ERROR:", red())
					)?;
				}
			}
		}
		Ok(())
	}

	fn verdict(&mut self, ctx: &Context, record: &TestRunRecord) -> io::Result<()> {
		let logger = &mut *self.logger;
		let failed = logger.paint("FAILED:", red());
		match &record.outcome {
			Outcome::Success | Outcome::NotRun => {
				writeln!(
					logger.out,
					"{}{} All conditions have passed.",
					indent(1),
					logger.paint("SUCCESS:", green())
				)?;
				if logger.timer.is_some() {
					writeln!(logger.out, "{}Duration: {}", indent(1), Secs(record.duration))?;
				}
			}
			Outcome::Failure => {
				let n = ctx.failures();
				writeln!(
					logger.out,
					"{}{failed} {n} condition{} {} failed.",
					indent(1),
					if n == 1 { "" } else { "s" },
					if n == 1 { "has" } else { "have" }
				)?;
			}
			Outcome::Aborted(AbortReason::Require) => {
				writeln!(logger.out, "{}{failed} Aborted.", indent(1))?;
			}
			Outcome::Aborted(AbortReason::Panic(_)) => {
				writeln!(logger.out, "{}{failed} Panicked.", indent(1))?;
			}
		}
		writeln!(logger.out)
	}
}

/// Prints every registered test name, one per line.
pub fn list_tests<W: Write>(out: &mut W, registry: &Registry) -> io::Result<()> {
	for name in registry.names() {
		writeln!(out, "{name}")?;
	}
	out.flush()
}

fn indent(depth: usize) -> String {
	" ".repeat(depth * 2)
}

fn short_location(location: &Location<'_>) -> String {
	let file = Path::new(location.file())
		.file_name()
		.map_or_else(|| location.file().into(), |name| name.to_string_lossy());
	format!("{file}:{}", location.line())
}

fn write_dump<W: Write>(out: &mut W, depth: usize, title: &str, bytes: &[u8]) -> io::Result<()> {
	let shown = &bytes[..bytes.len().min(DUMP_MAX)];
	writeln!(out, "{}{title} ({} bytes):", indent(depth), bytes.len())?;

	for (row, chunk) in shown.chunks(16).enumerate() {
		let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
		let text: String = chunk
			.iter()
			.map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
			.collect();
		writeln!(
			out,
			"{}{:08x}: {:<47}  {text}",
			indent(depth + 1),
			row * 16,
			hex.join(" ")
		)?;
	}

	if bytes.len() > shown.len() {
		writeln!(
			out,
			"{}... (and {} more bytes)",
			indent(depth + 1),
			bytes.len() - shown.len()
		)?;
	}
	Ok(())
}
