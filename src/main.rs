// A self-check of the harness: a few suites exercising each kind of test.
// Every test here is expected to pass.

use unitrun::prelude::*;

fn arithmetic_add(ctx: &mut Context) -> TestResult {
	check_eq!(ctx, 2 + 2, 4);
	check!(ctx, 7 - 10 < 0);
	Ok(())
}

fn arithmetic_overflow(ctx: &mut Context) -> TestResult {
	check_eq!(ctx, 200u8.checked_add(100), None::<u8>);
	check_eq!(ctx, 200u8.wrapping_add(100), 44);
	check_panics!(ctx, {
		let values: Vec<u8> = Vec::new();
		values[0]
	});
	Ok(())
}

fn strings_split(ctx: &mut Context) -> TestResult {
	let words: Vec<&str> = "a quick brown fox".split(' ').collect();
	require_eq!(ctx, words.len(), 4);
	ctx.case("first word");
	check_eq!(ctx, words[0], "a");
	ctx.case("last word");
	check_eq!(ctx, words[3], "fox");
	Ok(())
}

fn strings_parse(ctx: &mut Context) -> TestResult {
	for (text, expected) in [("0", 0), ("42", 42), ("-7", -7)] {
		let parsed = text.parse::<i32>();
		require!(ctx, parsed.is_ok(), "'{}' parses", text);
		check_eq!(ctx, parsed.unwrap_or_default(), expected);
	}
	check!(ctx, "4x".parse::<i32>().is_err());
	Ok(())
}

#[derive(Default)]
struct Buffer {
	data: Vec<u8>,
}

impl Fixture for Buffer {
	fn setup(&mut self, ctx: &mut Context) -> TestResult {
		self.data = (0..32).collect();
		require_eq!(ctx, self.data.len(), 32);
		Ok(())
	}

	fn teardown(&mut self, ctx: &mut Context) -> TestResult {
		self.data.clear();
		check!(ctx, self.data.is_empty());
		Ok(())
	}
}

fn buffer_reverse(buffer: &mut Buffer, ctx: &mut Context) -> TestResult {
	buffer.data.reverse();
	check_eq!(ctx, buffer.data.first(), Some(&31u8));
	ctx.dump("reversed", &buffer.data);
	Ok(())
}

fn buffer_sum(buffer: &mut Buffer, ctx: &mut Context) -> TestResult {
	let sum: u32 = buffer.data.iter().map(|&b| u32::from(b)).sum();
	check_eq!(ctx, sum, 496);
	Ok(())
}

fn registry() -> unitrun::Result<Registry> {
	let mut registry = Registry::new();
	registry.register_suite(
		"arithmetic",
		&[("add", arithmetic_add), ("overflow", arithmetic_overflow)],
	)?;
	registry.register_suite("strings", &[("split", strings_split), ("parse", strings_parse)])?;
	registry.register_fixture::<Buffer, _>("buffer.reverse", buffer_reverse)?;
	registry.register_fixture::<Buffer, _>("buffer.sum", buffer_sum)?;
	registry.register_indexed("squares", 4, |ctx| {
		let i = ctx.index().unwrap_or_default();
		check_eq!(ctx, (i * i) % 4 == 0, i % 2 == 0);
		Ok(())
	})?;
	Ok(registry)
}

fn main() {
	match registry() {
		Ok(registry) => unitrun::main(registry),
		Err(error) => {
			eprintln!("unitrun: {error}");
			std::process::exit(2);
		}
	}
}
