use std::collections::HashSet;
use std::convert::Infallible;
use std::str::FromStr;

use log::info;

use smartstring::alias::{String as SmartString};

use chrono::NaiveDate;

use super::context::{COUNTRY_NAME, DATE};
use super::error::Error;
use super::table::{Table, Value};


/// Exclusive date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
	pub start: NaiveDate,
	pub end: NaiveDate,
}

impl DateWindow {
	pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
		Self{start, end}
	}

	#[inline(always)]
	pub fn contains(&self, date: NaiveDate) -> bool {
		self.start < date && date < self.end
	}
}


/// Upper-cased set of country names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountrySet(HashSet<SmartString>);

impl CountrySet {
	pub fn new<S: AsRef<str>, I: IntoIterator<Item = S>>(names: I) -> Self {
		let mut result = Self::default();
		for name in names {
			let name = name.as_ref().trim();
			if name.len() > 0 {
				result.0.insert(name.to_uppercase().into());
			}
		}
		result
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.0.contains(name.to_uppercase().as_str())
	}
}

impl FromStr for CountrySet {
	type Err = Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::new(s.split(',')))
	}
}


/// Keep rows inside the date window and, given a non-empty country set, of
/// one of those countries.
pub fn filter(mut table: Table, window: &DateWindow, countries: Option<&CountrySet>) -> Result<Table, Error> {
	let di = table.require_column(DATE)?;
	let countries = countries.filter(|c| !c.is_empty());
	let ci = match countries {
		Some(_) => Some(table.require_column(COUNTRY_NAME)?),
		None => None,
	};

	for row in table.rows() {
		match &row[di] {
			Value::Date(_) | Value::Null => (),
			other => return Err(Error::InvalidValue{
				column: DATE.into(),
				value: other.to_string(),
			}),
		}
	}

	let before = table.len();
	table.retain_rows(|row| {
		let in_window = row[di].as_date().map_or(false, |d| window.contains(d));
		if !in_window {
			return false
		}
		match (countries, ci) {
			(Some(set), Some(ci)) => match &row[ci] {
				Value::Null => false,
				v => set.contains(&v.to_string()),
			},
			_ => true,
		}
	});
	info!("filtered {} rows down to {} ({} < date < {})", before, table.len(), window.start, window.end);
	Ok(table)
}
