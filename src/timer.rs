use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;

/// Which clock measures test durations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
	/// Wall clock time.
	#[default]
	Real,
	/// Processor time consumed by the process.
	Cpu,
}

#[derive(Debug, Clone, Copy)]
pub struct Clock {
	kind: TimerKind,
}

#[derive(Debug, Clone, Copy)]
pub enum Timestamp {
	Real(Instant),
	Cpu(Duration),
}

impl Clock {
	pub fn new(kind: TimerKind) -> Clock {
		if kind == TimerKind::Cpu && cpu_time().is_none() {
			log::warn!("processor time is not available here; measuring real time");
			return Clock { kind: TimerKind::Real };
		}
		Clock { kind }
	}

	pub fn kind(&self) -> TimerKind {
		self.kind
	}

	pub fn now(&self) -> Timestamp {
		match self.kind {
			TimerKind::Real => Timestamp::Real(Instant::now()),
			TimerKind::Cpu => Timestamp::Cpu(cpu_time().unwrap_or_default()),
		}
	}

	/// Runs `f` and returns its result with the time it took.
	pub fn measure<R>(&self, f: impl FnOnce() -> R) -> (R, Duration) {
		let start = self.now();
		let result = f();
		(result, start.elapsed())
	}
}

impl Timestamp {
	pub fn elapsed(&self) -> Duration {
		match self {
			Timestamp::Real(start) => start.elapsed(),
			Timestamp::Cpu(start) => cpu_time().unwrap_or_default().saturating_sub(*start),
		}
	}
}

#[cfg(unix)]
fn cpu_time() -> Option<Duration> {
	let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
	// SAFETY: `ts` is a valid, writable timespec.
	let status = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
	if status != 0 {
		return None;
	}
	Some(Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32))
}

#[cfg(not(unix))]
fn cpu_time() -> Option<Duration> {
	None
}

/// Formats a duration the way the console reporter prints it.
pub struct Secs(pub Duration);

impl fmt::Display for Secs {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:.6} secs", self.0.as_secs_f64())
	}
}
