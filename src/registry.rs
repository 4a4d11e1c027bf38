use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use log::trace;

use crate::context::{catch_panic, resume_panic, Context, TestResult};
use crate::{Error, Result};

/// A test body: runs against a fresh [`Context`].
pub type TestBody = Box<dyn Fn(&mut Context) -> TestResult>;

/// One registered test.
pub struct TestEntry {
	name: String,
	index: Option<usize>,
	body: TestBody,
}

impl TestEntry {
	pub fn new(name: impl Into<String>, index: Option<usize>, body: TestBody) -> TestEntry {
		TestEntry {
			name: name.into(),
			index,
			body,
		}
	}

	/// `suite.case`, or `suite.case/index` for indexed tests.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn index(&self) -> Option<usize> {
		self.index
	}

	pub(crate) fn invoke(&self, ctx: &mut Context) -> TestResult {
		(self.body)(ctx)
	}
}

impl fmt::Debug for TestEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TestEntry")
			.field("name", &self.name)
			.field("index", &self.index)
			.finish_non_exhaustive()
	}
}

/// Shared setup and teardown for a family of tests.
///
/// A fresh fixture is built with [`Default`] for every test. If `setup`
/// aborts or records a failed check the test body is skipped; `teardown`
/// runs in either case.
pub trait Fixture: Default + 'static {
	fn setup(&mut self, _ctx: &mut Context) -> TestResult {
		Ok(())
	}

	fn teardown(&mut self, _ctx: &mut Context) -> TestResult {
		Ok(())
	}
}

/// The ordered list of known tests.
///
/// Names are expected to be unique but this is not enforced; the run order
/// is the registration order.
#[derive(Default)]
pub struct Registry {
	entries: Vec<TestEntry>,
}

impl Registry {
	pub fn new() -> Registry {
		Registry::default()
	}

	/// Appends a test and returns its index.
	pub fn register<F>(&mut self, name: impl Into<String>, body: F) -> Result<usize>
	where
		F: Fn(&mut Context) -> TestResult + 'static,
	{
		self.push(TestEntry::new(name, None, Box::new(body)))
	}

	/// Registers every `(case, body)` pair as `suite.case`.
	pub fn register_suite(
		&mut self,
		suite: &str,
		cases: &[(&str, fn(&mut Context) -> TestResult)],
	) -> Result<Range<usize>> {
		let start = self.entries.len();
		for &(case, body) in cases {
			self.register(format!("{suite}.{case}"), body)?;
		}
		Ok(start..self.entries.len())
	}

	/// Registers `count` tests named `name/0` to `name/{count - 1}` that share
	/// one body; the body reads its index from [`Context::index`].
	pub fn register_indexed<F>(
		&mut self,
		name: &str,
		count: usize,
		body: F,
	) -> Result<Range<usize>>
	where
		F: Fn(&mut Context) -> TestResult + 'static,
	{
		let body = Rc::new(body);
		let start = self.entries.len();
		for index in 0..count {
			let body = Rc::clone(&body);
			self.push(TestEntry::new(
				format!("{name}/{index}"),
				Some(index),
				Box::new(move |ctx: &mut Context| body(ctx)),
			))?;
		}
		Ok(start..self.entries.len())
	}

	/// Registers a test that runs inside fixture `X`.
	pub fn register_fixture<X, F>(&mut self, name: impl Into<String>, body: F) -> Result<usize>
	where
		X: Fixture,
		F: Fn(&mut X, &mut Context) -> TestResult + 'static,
	{
		self.register(name, move |ctx| run_in_fixture::<X, F>(ctx, &body))
	}

	/// Indexed counterpart of [`Registry::register_fixture`].
	pub fn register_indexed_fixture<X, F>(
		&mut self,
		name: &str,
		count: usize,
		body: F,
	) -> Result<Range<usize>>
	where
		X: Fixture,
		F: Fn(&mut X, &mut Context) -> TestResult + 'static,
	{
		self.register_indexed(name, count, move |ctx| run_in_fixture::<X, F>(ctx, &body))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn get(&self, index: usize) -> Option<&TestEntry> {
		self.entries.get(index)
	}

	pub fn iter(&self) -> std::slice::Iter<'_, TestEntry> {
		self.entries.iter()
	}

	pub fn names(&self) -> impl Iterator<Item = &str> + Clone + '_ {
		self.entries.iter().map(TestEntry::name)
	}

	fn push(&mut self, entry: TestEntry) -> Result<usize> {
		self.entries.try_reserve(1).map_err(|_| Error::OutOfMemory)?;
		trace!("registered {} at {}", entry.name, self.entries.len());
		self.entries.push(entry);
		Ok(self.entries.len() - 1)
	}
}

impl<'a> IntoIterator for &'a Registry {
	type Item = &'a TestEntry;
	type IntoIter = std::slice::Iter<'a, TestEntry>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.iter()
	}
}

fn run_in_fixture<X, F>(ctx: &mut Context, body: &F) -> TestResult
where
	X: Fixture,
	F: Fn(&mut X, &mut Context) -> TestResult,
{
	let mut fixture = X::default();
	let failures = ctx.failures();

	let result = catch_panic(|| {
		let setup = fixture.setup(ctx);
		if setup.is_ok() && ctx.failures() == failures {
			body(&mut fixture, ctx)
		} else {
			trace!("{}: fixture setup failed, skipping body", ctx.name());
			setup
		}
	});
	let teardown = catch_panic(|| fixture.teardown(ctx));

	// A panic wins over any other result and keeps unwinding to the runner.
	match (result, teardown) {
		(Err(panic), _) | (Ok(_), Err(panic)) => resume_panic(panic),
		(Ok(result), Ok(teardown)) => result.and(teardown),
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use super::*;
	use crate::context::{Abort, CaughtPanic};

	fn pass(_: &mut Context) -> TestResult {
		Ok(())
	}

	fn run(registry: &Registry, index: usize) -> (TestResult, Context) {
		let entry = registry.get(index).unwrap();
		let mut ctx = Context::new(entry.name(), entry.index());
		let result = entry.invoke(&mut ctx);
		(result, ctx)
	}

	#[test]
	fn preserves_registration_order() {
		let mut registry = Registry::new();
		assert_eq!(registry.register("b.first", pass).unwrap(), 0);
		assert_eq!(registry.register("a.second", pass).unwrap(), 1);
		let range = registry
			.register_suite("suite", &[("x", pass), ("y", pass)])
			.unwrap();
		assert_eq!(range, 2..4);
		assert_eq!(
			registry.names().collect::<Vec<_>>(),
			["b.first", "a.second", "suite.x", "suite.y"]
		);
		assert_eq!(registry.len(), 4);
		assert!(registry.get(4).is_none());
	}

	#[test]
	fn duplicate_names_are_kept() {
		let mut registry = Registry::new();
		registry.register("same", pass).unwrap();
		registry.register("same", pass).unwrap();
		assert_eq!(registry.len(), 2);
	}

	#[test]
	fn indexed_tests_see_their_index() {
		let mut registry = Registry::new();
		let range = registry
			.register_indexed("suite.param", 3, |ctx| {
				let index = ctx.index().unwrap();
				ctx.check(index != 1, "index is not 1");
				Ok(())
			})
			.unwrap();
		assert_eq!(range, 0..3);
		assert_eq!(registry.get(2).unwrap().name(), "suite.param/2");
		assert_eq!(registry.get(2).unwrap().index(), Some(2));

		assert!(!run(&registry, 0).1.has_failed());
		assert!(run(&registry, 1).1.has_failed());
	}

	thread_local! {
		static TRACE: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
	}

	fn trace(step: &'static str) {
		TRACE.with(|t| t.borrow_mut().push(step));
	}

	fn take_trace() -> Vec<&'static str> {
		TRACE.with(|t| t.take())
	}

	#[derive(Default)]
	struct Counter {
		value: u32,
	}

	impl Fixture for Counter {
		fn setup(&mut self, _ctx: &mut Context) -> TestResult {
			trace("setup");
			self.value = 41;
			Ok(())
		}

		fn teardown(&mut self, _ctx: &mut Context) -> TestResult {
			trace("teardown");
			Ok(())
		}
	}

	#[derive(Default)]
	struct BrokenSetup;

	impl Fixture for BrokenSetup {
		fn setup(&mut self, ctx: &mut Context) -> TestResult {
			trace("setup");
			ctx.require(false, "resource available")
		}

		fn teardown(&mut self, _ctx: &mut Context) -> TestResult {
			trace("teardown");
			Ok(())
		}
	}

	#[test]
	fn fixture_wraps_body() {
		let mut registry = Registry::new();
		registry
			.register_fixture("counter.bump", |fixture: &mut Counter, ctx| {
				trace("body");
				fixture.value += 1;
				ctx.check(fixture.value == 42, "value is 42");
				Ok(())
			})
			.unwrap();

		let (result, ctx) = run(&registry, 0);
		assert_eq!(result, Ok(()));
		assert!(!ctx.has_failed());
		assert_eq!(take_trace(), ["setup", "body", "teardown"]);
	}

	#[test]
	fn failed_setup_skips_body_but_not_teardown() {
		let mut registry = Registry::new();
		registry
			.register_fixture("broken.case", |_: &mut BrokenSetup, _ctx| {
				trace("body");
				Ok(())
			})
			.unwrap();

		let (result, ctx) = run(&registry, 0);
		assert_eq!(result, Err(Abort));
		assert_eq!(ctx.failures(), 1);
		assert_eq!(take_trace(), ["setup", "teardown"]);
	}

	#[test]
	fn aborted_body_still_tears_down() {
		let mut registry = Registry::new();
		registry
			.register_fixture("counter.abort", |fixture: &mut Counter, ctx| {
				trace("body");
				ctx.require(fixture.value == 0, "value starts at zero")?;
				trace("after require");
				Ok(())
			})
			.unwrap();

		let (result, ctx) = run(&registry, 0);
		assert_eq!(result, Err(Abort));
		assert_eq!(ctx.failures(), 1);
		assert_eq!(take_trace(), ["setup", "body", "teardown"]);
	}

	#[derive(Default)]
	struct PanickingSetup;

	impl Fixture for PanickingSetup {
		fn setup(&mut self, _ctx: &mut Context) -> TestResult {
			trace("setup");
			panic!("no device")
		}

		fn teardown(&mut self, _ctx: &mut Context) -> TestResult {
			trace("teardown");
			Ok(())
		}
	}

	fn run_catching(registry: &Registry, index: usize) -> Result<TestResult, CaughtPanic> {
		let entry = registry.get(index).unwrap();
		let mut ctx = Context::new(entry.name(), entry.index());
		catch_panic(|| entry.invoke(&mut ctx))
	}

	#[test]
	fn panicking_body_still_tears_down() {
		let mut registry = Registry::new();
		registry
			.register_fixture("counter.panic", |_: &mut Counter, _ctx| {
				trace("body");
				panic!("boom")
			})
			.unwrap();

		let panic = run_catching(&registry, 0).unwrap_err();
		assert_eq!(panic.message, "boom");
		assert!(panic.location.unwrap().contains("registry.rs"));
		assert_eq!(take_trace(), ["setup", "body", "teardown"]);
	}

	#[test]
	fn panicking_setup_skips_body_but_not_teardown() {
		let mut registry = Registry::new();
		registry
			.register_fixture("device.open", |_: &mut PanickingSetup, _ctx| {
				trace("body");
				Ok(())
			})
			.unwrap();

		let panic = run_catching(&registry, 0).unwrap_err();
		assert_eq!(panic.message, "no device");
		assert_eq!(take_trace(), ["setup", "teardown"]);
	}

	#[test]
	fn indexed_fixtures_get_fresh_state() {
		let mut registry = Registry::new();
		registry
			.register_indexed_fixture("counter.each", 2, |fixture: &mut Counter, ctx| {
				fixture.value += ctx.index().unwrap() as u32;
				ctx.check(fixture.value >= 41, "fresh fixture");
				Ok(())
			})
			.unwrap();

		for index in 0..2 {
			assert!(!run(&registry, index).1.has_failed());
		}
		assert_eq!(take_trace().len(), 4);
	}
}
