use std::fmt;
use std::io;

use smartstring::alias::{String as SmartString};

use super::influxdb;


#[derive(Debug)]
pub enum Error {
	/// Ambiguous or missing source/destination.
	Configuration(String),
	SourceNotFound{
		source: String,
		reason: String,
	},
	/// A column the transforms rely on is absent.
	MissingColumn(SmartString),
	InvalidValue{
		column: SmartString,
		value: String,
	},
	Csv(csv::Error),
	Io(io::Error),
	Database(influxdb::Error),
}

impl Error {
	pub fn configuration<S: Into<String>>(msg: S) -> Self {
		Self::Configuration(msg.into())
	}

	pub fn missing_column(name: &str) -> Self {
		Self::MissingColumn(name.into())
	}

	pub fn not_found<S: Into<String>, E: fmt::Display>(source: S, reason: E) -> Self {
		Self::SourceNotFound{
			source: source.into(),
			reason: reason.to_string(),
		}
	}
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Configuration(msg) => write!(f, "configuration error: {}", msg),
			Self::SourceNotFound{source, reason} => write!(f, "source not found: {}: {}", source, reason),
			Self::MissingColumn(name) => write!(f, "missing column: {}", name),
			Self::InvalidValue{column, value} => write!(f, "invalid value {:?} in column {}", value, column),
			Self::Csv(e) => fmt::Display::fmt(e, f),
			Self::Io(e) => fmt::Display::fmt(e, f),
			Self::Database(e) => write!(f, "database error: {}", e),
		}
	}
}

impl From<csv::Error> for Error {
	fn from(other: csv::Error) -> Self {
		Self::Csv(other)
	}
}

impl From<io::Error> for Error {
	fn from(other: io::Error) -> Self {
		Self::Io(other)
	}
}

impl From<influxdb::Error> for Error {
	fn from(other: influxdb::Error) -> Self {
		match other {
			influxdb::Error::DatabaseNotFound => Self::not_found("influxdb", "database not found"),
			other => Self::Database(other),
		}
	}
}

impl std::error::Error for Error {}
