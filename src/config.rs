use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use crate::console::ColorWhen;
use crate::timer::TimerKind;
use crate::{Error, Result};

/// Defaults read from a TOML file with `--config`.
///
/// Every key is optional and mirrors the long option of the same name.
/// Command line flags always take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
	pub verbose: Option<u8>,
	pub color: Option<ColorWhen>,
	pub time: Option<TimerKind>,
	pub summary: Option<bool>,
	pub xml_output: Option<PathBuf>,
	pub failed_output_only: Option<bool>,
	pub filter: Option<String>,
}

impl Config {
	pub fn open(path: &Path) -> Result<Config> {
		let text = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
			path: path.to_owned(),
			source,
		})?;
		let config = Config::parse(&text).map_err(|source| Error::ConfigParse {
			path: path.to_owned(),
			source,
		})?;
		info!("loaded settings from {}", path.display());
		Ok(config)
	}

	pub fn parse(text: &str) -> Result<Config, toml::de::Error> {
		toml::from_str(text)
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_file_is_all_defaults() {
		assert_eq!(Config::parse("").unwrap(), Config::default());
	}

	#[test]
	fn every_key() {
		let config = Config::parse(
			r#"
			verbose = 3
			color = "never"
			time = "cpu"
			summary = false
			xml-output = "report.xml"
			failed-output-only = true
			filter = "net.*"
			"#,
		)
		.unwrap();
		assert_eq!(
			config,
			Config {
				verbose: Some(3),
				color: Some(ColorWhen::Never),
				time: Some(TimerKind::Cpu),
				summary: Some(false),
				xml_output: Some(PathBuf::from("report.xml")),
				failed_output_only: Some(true),
				filter: Some(String::from("net.*")),
			}
		);
	}

	#[test]
	fn unknown_keys_are_rejected() {
		assert!(Config::parse("verbosity = 2").is_err());
		assert!(Config::parse("time = \"sundial\"").is_err());
	}

	#[test]
	fn open_reports_the_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "summary = \"yes\"").unwrap();
		match Config::open(file.path()) {
			Err(Error::ConfigParse { path, .. }) => assert_eq!(path, file.path()),
			other => panic!("unexpected {other:?}"),
		}

		let missing = file.path().with_extension("missing");
		assert!(matches!(
			Config::open(&missing),
			Err(Error::ConfigRead { .. })
		));
	}

	#[test]
	fn open_reads_a_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "verbose = 1").unwrap();
		assert_eq!(Config::open(file.path()).unwrap().verbose, Some(1));
	}
}
