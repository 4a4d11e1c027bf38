use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Once;

use paste::paste;

/// Returned by a test body that was stopped by a failed `require`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abort;

/// The return type of every test body.
///
/// `Err(Abort)` stops the test early; checks that fail without aborting
/// still leave the body returning `Ok(())`.
pub type TestResult = Result<(), Abort>;

/// Something a test recorded while it ran, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	Check {
		location: &'static Location<'static>,
		text: String,
		passed: bool,
		/// Operand values of a failed comparison.
		detail: Option<String>,
	},
	/// Start of a named subdivision of the test; `None` ends the current one.
	Case(Option<String>),
	/// Extra information. `after_failure` is set when the preceding check
	/// failed.
	Message { text: String, after_failure: bool },
	Dump {
		title: String,
		bytes: Vec<u8>,
		after_failure: bool,
	},
	Warning {
		location: &'static Location<'static>,
		text: String,
	},
	/// The body panicked.
	Panic {
		location: Option<String>,
		message: String,
	},
}

/// Per-test state handed to every test body.
///
/// A fresh context is created for each test, so nothing recorded here can
/// leak into the next one.
#[derive(Debug)]
pub struct Context {
	name: String,
	index: Option<usize>,
	failures: usize,
	warnings: usize,
	last_check_failed: bool,
	events: Vec<Event>,
}

macro_rules! impl_comparisons {
	($($name:ident: $bound:ident, $op:tt;)*) => {
		paste! {
			$(
				#[track_caller]
				#[doc = "Comparison check `" $name "`, recording both values on failure."]
				pub fn [<check_ $name>]<L, R>(&mut self, left: &L, right: &R, text: &str) -> bool
				where
					L: $bound<R> + fmt::Debug + ?Sized,
					R: fmt::Debug + ?Sized,
				{
					let passed = left $op right;
					self.record_comparison(passed, text, left, right)
				}

				#[track_caller]
				#[doc = "Like [`Self::check_" $name "`], but aborts the test on failure."]
				pub fn [<require_ $name>]<L, R>(&mut self, left: &L, right: &R, text: &str) -> TestResult
				where
					L: $bound<R> + fmt::Debug + ?Sized,
					R: fmt::Debug + ?Sized,
				{
					if self.[<check_ $name>](left, right, text) {
						Ok(())
					} else {
						Err(Abort)
					}
				}
			)*
		}
	};
}

impl Context {
	pub fn new(name: impl Into<String>, index: Option<usize>) -> Context {
		Context {
			name: name.into(),
			index,
			failures: 0,
			warnings: 0,
			last_check_failed: false,
			events: Vec::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// The index of an indexed test, `None` for plain tests.
	pub fn index(&self) -> Option<usize> {
		self.index
	}

	/// Number of checks that failed so far.
	pub fn failures(&self) -> usize {
		self.failures
	}

	pub fn has_failed(&self) -> bool {
		self.failures != 0
	}

	pub fn warnings(&self) -> usize {
		self.warnings
	}

	pub fn events(&self) -> &[Event] {
		&self.events
	}

	/// Records a condition; the test keeps running whatever the result.
	#[track_caller]
	pub fn check(&mut self, passed: bool, text: impl Into<String>) -> bool {
		self.record(passed, text.into(), None)
	}

	/// Records a condition and aborts the test if it does not hold.
	///
	/// Use with `?` so the body returns immediately.
	#[track_caller]
	pub fn require(&mut self, passed: bool, text: impl Into<String>) -> TestResult {
		if self.check(passed, text) {
			Ok(())
		} else {
			Err(Abort)
		}
	}

	/// Records an unconditional failure.
	#[track_caller]
	pub fn fail(&mut self, text: impl Into<String>) {
		self.check(false, text);
	}

	impl_comparisons! {
		eq: PartialEq, ==;
		ne: PartialEq, !=;
		lt: PartialOrd, <;
		le: PartialOrd, <=;
		gt: PartialOrd, >;
		ge: PartialOrd, >=;
	}

	/// Checks that `f` panics.
	#[track_caller]
	pub fn check_panics<F: FnOnce()>(&mut self, f: F, text: impl Into<String>) -> bool {
		let text = text.into();
		match catch_panic(f) {
			Ok(()) => self.record(false, text, Some(String::from("No panic occurred."))),
			Err(_) => self.record(true, text, None),
		}
	}

	/// Names the part of the test that follows, until the next call.
	/// Failed checks are reported under this name.
	pub fn case(&mut self, name: impl Into<String>) {
		self.events.push(Event::Case(Some(name.into())));
	}

	/// Ends the current case explicitly.
	pub fn end_case(&mut self) {
		self.events.push(Event::Case(None));
	}

	/// Attaches a message to the preceding check.
	pub fn message(&mut self, text: impl Into<String>) {
		self.events.push(Event::Message {
			text: text.into(),
			after_failure: self.last_check_failed,
		});
	}

	/// Attaches a hex dump of `bytes` to the preceding check.
	pub fn dump(&mut self, title: impl Into<String>, bytes: &[u8]) {
		self.events.push(Event::Dump {
			title: title.into(),
			bytes: bytes.to_vec(),
			after_failure: self.last_check_failed,
		});
	}

	/// Emits a warning. Warnings are counted but never fail a test.
	#[track_caller]
	pub fn warn(&mut self, text: impl Into<String>) {
		self.warnings += 1;
		self.events.push(Event::Warning {
			location: Location::caller(),
			text: text.into(),
		});
	}

	pub(crate) fn record_panic(&mut self, panic: CaughtPanic) {
		self.failures += 1;
		self.last_check_failed = true;
		self.events.push(Event::Panic {
			location: panic.location,
			message: panic.message,
		});
	}

	#[track_caller]
	fn record_comparison<L, R>(&mut self, passed: bool, text: &str, left: &L, right: &R) -> bool
	where
		L: fmt::Debug + ?Sized,
		R: fmt::Debug + ?Sized,
	{
		let detail = (!passed).then(|| format!("left: {left:?}, right: {right:?}"));
		self.record(passed, text.to_owned(), detail)
	}

	#[track_caller]
	fn record(&mut self, passed: bool, text: String, detail: Option<String>) -> bool {
		if !passed {
			self.failures += 1;
		}
		self.last_check_failed = !passed;
		self.events.push(Event::Check {
			location: Location::caller(),
			text,
			passed,
			detail,
		});
		passed
	}
}

/// A panic caught at a test boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaughtPanic {
	pub location: Option<String>,
	pub message: String,
}

thread_local! {
	static CAPTURING: Cell<bool> = const { Cell::new(false) };
	static PANIC_LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// Runs `f`, turning a panic into an error instead of unwinding further.
///
/// While `f` runs the default panic message is suppressed on this thread;
/// the caught message is returned instead so the reporter can print it in
/// place.
pub(crate) fn catch_panic<R>(f: impl FnOnce() -> R) -> Result<R, CaughtPanic> {
	INSTALL_HOOK.call_once(|| {
		let previous = panic::take_hook();
		panic::set_hook(Box::new(move |info| {
			if CAPTURING.with(Cell::get) {
				let location = info.location().map(|l| format!("{}:{}", l.file(), l.line()));
				PANIC_LOCATION.with(|slot| *slot.borrow_mut() = location);
			} else {
				previous(info);
			}
		}));
	});

	let was_capturing = CAPTURING.with(|c| c.replace(true));
	let result = panic::catch_unwind(AssertUnwindSafe(f));
	CAPTURING.with(|c| c.set(was_capturing));

	result.map_err(|payload| CaughtPanic {
		location: PANIC_LOCATION.with(|slot| slot.borrow_mut().take()),
		message: panic_message(payload.as_ref()),
	})
}

/// Continues unwinding with a panic taken by [`catch_panic`], so an
/// enclosing `catch_panic` reports the same message and location.
pub(crate) fn resume_panic(panic: CaughtPanic) -> ! {
	PANIC_LOCATION.with(|slot| *slot.borrow_mut() = panic.location);
	panic::resume_unwind(Box::new(panic.message))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_owned()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		String::from("Box<dyn Any>")
	}
}
