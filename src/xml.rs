use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::registry::Registry;
use crate::runner::{Outcome, RunReport};
use crate::{Error, Result};

/// An XUnit report file, opened up front and written once the run is over.
pub struct XmlReport {
	path: PathBuf,
	file: BufWriter<File>,
}

impl XmlReport {
	pub fn create(path: &Path) -> Result<XmlReport> {
		let file = File::create(path).map_err(|source| Error::Output {
			path: path.to_owned(),
			source,
		})?;
		Ok(XmlReport {
			path: path.to_owned(),
			file: BufWriter::new(file),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn write(mut self, suite_name: &str, registry: &Registry, report: &RunReport) -> Result<()> {
		write_report(&mut self.file, suite_name, registry, report)?;
		self.file.flush()?;
		info!("wrote XML report to {}", self.path.display());
		Ok(())
	}
}

/// Writes a single `<testsuite>` with one `<testcase>` per registered test,
/// in registry order.
pub fn write_report<W: Write>(
	out: &mut W,
	suite_name: &str,
	registry: &Registry,
	report: &RunReport,
) -> Result<()> {
	let stats = &report.stats;
	writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
	writeln!(
		out,
		"<testsuite name=\"{}\" tests=\"{}\" errors=\"{}\" failures=\"{}\" skip=\"{}\">",
		escape(suite_name),
		stats.total_registered,
		stats.total_failed,
		stats.total_failed,
		stats.total_skipped
	)?;

	for (entry, record) in registry.iter().zip(&report.records) {
		writeln!(
			out,
			"  <testcase name=\"{}\" time=\"{:.2}\">",
			escape(entry.name()),
			record.duration.as_secs_f64()
		)?;
		if record.outcome.is_failure() {
			writeln!(out, "    <failure/>")?;
		} else if record.outcome == Outcome::NotRun {
			writeln!(out, "    <skipped/>")?;
		}
		writeln!(out, "  </testcase>")?;
	}

	writeln!(out, "</testsuite>")?;
	Ok(())
}

fn escape(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for ch in text.chars() {
		match ch {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&apos;"),
			'\t' | '\n' | '\r' => escaped.push(ch),
			// Not representable in XML 1.0, not even as character references.
			ch if (ch as u32) < 0x20 => escaped.push('?'),
			_ => escaped.push(ch),
		}
	}
	escaped
}
