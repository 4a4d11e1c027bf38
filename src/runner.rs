use std::io::Write;
use std::time::Duration;

use log::{debug, trace};

use crate::console::Logger;
use crate::context::{catch_panic, Abort, Context};
use crate::registry::{Registry, TestEntry};
use crate::timer::{Clock, TimerKind};
use crate::Result;

/// Why a test stopped before its body returned normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
	/// A `require` failed.
	Require,
	/// The body panicked; the panic message.
	Panic(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Outcome {
	#[default]
	NotRun,
	Success,
	/// At least one check failed but the body ran to completion.
	Failure,
	Aborted(AbortReason),
}

impl Outcome {
	pub fn is_failure(&self) -> bool {
		matches!(self, Outcome::Failure | Outcome::Aborted(_))
	}

	pub fn was_run(&self) -> bool {
		*self != Outcome::NotRun
	}
}

/// The result of one registered test in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRunRecord {
	pub selected: bool,
	pub outcome: Outcome,
	pub duration: Duration,
}

/// Every registered test is either run or skipped, and only run tests can
/// fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatistics {
	pub total_registered: usize,
	pub total_run: usize,
	pub total_failed: usize,
	pub total_skipped: usize,
	pub total_warnings: usize,
}

/// Everything a finished run produced, indexed like the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
	pub records: Vec<TestRunRecord>,
	pub stats: RunStatistics,
}

impl RunReport {
	/// Registry indices of the tests that failed, in order.
	pub fn failed(&self) -> impl Iterator<Item = usize> + '_ {
		self.records
			.iter()
			.enumerate()
			.filter(|(_, record)| record.outcome.is_failure())
			.map(|(i, _)| i)
	}

	pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> + '_ {
		self.records.iter().map(|record| &record.outcome)
	}

	pub fn passed(&self) -> bool {
		self.stats.total_failed == 0
	}
}

pub type Hook = Box<dyn Fn(&TestEntry)>;

/// Runs registered tests one at a time, in registry order.
pub struct Runner {
	clock: Clock,
	before_each: Option<Hook>,
	after_each: Option<Hook>,
}

impl Default for Runner {
	fn default() -> Self {
		Runner::new(Clock::new(TimerKind::Real))
	}
}

impl Runner {
	pub fn new(clock: Clock) -> Runner {
		Runner {
			clock,
			before_each: None,
			after_each: None,
		}
	}

	/// Called right before every selected test.
	#[must_use]
	pub fn before_each(mut self, hook: impl Fn(&TestEntry) + 'static) -> Self {
		self.before_each = Some(Box::new(hook));
		self
	}

	/// Called right after every selected test, whatever its outcome.
	#[must_use]
	pub fn after_each(mut self, hook: impl Fn(&TestEntry) + 'static) -> Self {
		self.after_each = Some(Box::new(hook));
		self
	}

	/// Runs the entries of `registry` whose `selection` flag is set.
	///
	/// `selection` is indexed like the registry; missing flags count as not
	/// selected. Only a failure to write the console report is an error.
	pub fn run<W: Write>(
		&self,
		registry: &Registry,
		selection: &[bool],
		logger: &mut Logger<W>,
	) -> Result<RunReport> {
		let mut records = vec![TestRunRecord::default(); registry.len()];
		let mut stats = RunStatistics {
			total_registered: registry.len(),
			..RunStatistics::default()
		};

		for ((entry, record), selected) in registry
			.iter()
			.zip(records.iter_mut())
			.zip(selection.iter().copied().chain(std::iter::repeat(false)))
		{
			if !selected {
				trace!("skipping {}", entry.name());
				stats.total_skipped += 1;
				continue;
			}
			record.selected = true;

			let mut test_logger = logger.make_test(entry);
			test_logger.begin()?;

			let (ctx, outcome, duration) = self.run_one(entry);
			debug!("{}: {:?} in {:?}", entry.name(), outcome, duration);

			stats.total_run += 1;
			if outcome.is_failure() {
				stats.total_failed += 1;
			}
			stats.total_warnings += ctx.warnings();
			record.outcome = outcome;
			record.duration = duration;

			test_logger.finish(&ctx, record)?;
		}

		Ok(RunReport { records, stats })
	}

	fn run_one(&self, entry: &TestEntry) -> (Context, Outcome, Duration) {
		let mut ctx = Context::new(entry.name(), entry.index());

		if let Some(hook) = &self.before_each {
			hook(entry);
		}
		let (result, duration) = self
			.clock
			.measure(|| catch_panic(|| entry.invoke(&mut ctx)));
		if let Some(hook) = &self.after_each {
			hook(entry);
		}

		let outcome = match result {
			Ok(Ok(())) if !ctx.has_failed() => Outcome::Success,
			Ok(Ok(())) => Outcome::Failure,
			Ok(Err(Abort)) => Outcome::Aborted(AbortReason::Require),
			Err(panic) => {
				let message = panic.message.clone();
				ctx.record_panic(panic);
				Outcome::Aborted(AbortReason::Panic(message))
			}
		};
		(ctx, outcome, duration)
	}
}
