use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use unitrun::prelude::*;
use unitrun::runner::AbortReason;

thread_local! {
	static TRACE: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn trace(step: &str) {
	TRACE.with(|log| log.borrow_mut().push(step.to_owned()));
}

fn take_trace() -> Vec<String> {
	TRACE.with(|log| log.borrow_mut().drain(..).collect())
}

#[derive(Default)]
struct Flaky {
	ready: bool,
}

impl Fixture for Flaky {
	fn setup(&mut self, ctx: &mut Context) -> TestResult {
		trace("setup");
		require!(ctx, self.ready, "fixture is ready");
		Ok(())
	}

	fn teardown(&mut self, _ctx: &mut Context) -> TestResult {
		trace("teardown");
		Ok(())
	}
}

#[derive(Default)]
struct Numbers {
	values: Vec<i32>,
}

impl Fixture for Numbers {
	fn setup(&mut self, _ctx: &mut Context) -> TestResult {
		trace("setup");
		self.values = vec![3, 1, 2];
		Ok(())
	}

	fn teardown(&mut self, _ctx: &mut Context) -> TestResult {
		trace("teardown");
		Ok(())
	}
}

fn run_all(registry: &Registry) -> RunReport {
	let mut logger = Logger::new(io::sink(), Verbosity::Silent);
	let selection = FilterSpec::default().select(registry).unwrap();
	Runner::new(Clock::new(TimerKind::Real))
		.run(registry, &selection, &mut logger)
		.unwrap()
}

#[test]
fn teardown_runs_after_failed_setup() {
	let mut registry = Registry::new();
	registry
		.register_fixture::<Flaky, _>("fixture.flaky", |_, _| {
			trace("body");
			Ok(())
		})
		.unwrap();
	let report = run_all(&registry);
	assert_eq!(take_trace(), ["setup", "teardown"]);
	assert_eq!(report.records[0].outcome, Outcome::Aborted(AbortReason::Require));
}

#[test]
fn teardown_runs_after_a_panicking_body() {
	let mut registry = Registry::new();
	registry
		.register_fixture::<Numbers, _>("fixture.panic", |numbers, _| {
			trace("body");
			if numbers.values.len() == 3 {
				panic!("boom");
			}
			Ok(())
		})
		.unwrap();
	let report = run_all(&registry);
	assert_eq!(take_trace(), ["setup", "body", "teardown"]);
	assert_eq!(
		report.records[0].outcome,
		Outcome::Aborted(AbortReason::Panic(String::from("boom")))
	);
}

#[test]
fn indexed_fixture_tests_get_a_fresh_fixture() {
	let mut registry = Registry::new();
	registry
		.register_indexed_fixture::<Numbers, _>("fixture.numbers", 2, |numbers, ctx| {
			trace("body");
			let index = ctx.index().unwrap_or_default();
			check_eq!(ctx, numbers.values.len(), 3);
			numbers.values.sort();
			check_eq!(ctx, numbers.values[index], index as i32 + 1);
			Ok(())
		})
		.unwrap();
	let report = run_all(&registry);
	assert!(report.passed(), "{report:?}");
	assert_eq!(
		take_trace(),
		["setup", "body", "teardown", "setup", "body", "teardown"]
	);
}

#[test]
fn runner_reports_without_the_command_line() {
	let mut registry = Registry::new();
	registry.register("lib.pass", |_| Ok(())).unwrap();
	registry
		.register("lib.panic", |ctx| {
			check!(ctx, true);
			let value: Option<u8> = None;
			if value.is_none() {
				panic!("no value");
			}
			Ok(())
		})
		.unwrap();
	registry
		.register("lib.expect_panic", |ctx| {
			check_panics!(ctx, Vec::<u8>::new()[3]);
			Ok(())
		})
		.unwrap();

	let seen = Rc::new(RefCell::new(Vec::new()));
	let after = Rc::clone(&seen);
	let mut logger = Logger::new(Vec::new(), Verbosity::Normal);
	let report = Runner::default()
		.after_each(move |entry| after.borrow_mut().push(entry.name().to_owned()))
		.run(&registry, &[true, true, true], &mut logger)
		.unwrap();

	assert_eq!(
		report.outcomes().cloned().collect::<Vec<_>>(),
		[
			Outcome::Success,
			Outcome::Aborted(AbortReason::Panic(String::from("no value"))),
			Outcome::Success,
		]
	);
	assert_eq!(*seen.borrow(), ["lib.pass", "lib.panic", "lib.expect_panic"]);

	let text = String::from_utf8(logger.into_inner()).unwrap();
	assert!(text.contains("ERROR: Test panicked at "), "{text}");
	assert!(text.contains(": no value\n"), "{text}");
}
