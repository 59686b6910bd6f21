use std::collections::{BTreeMap, HashMap};

use log::{debug, info};

use smartstring::alias::{String as SmartString};

use chrono::{Datelike, Duration, NaiveDate};

use super::context::{COUNTRY_NAME, DATE};
use super::error::Error;
use super::table::{Table, Value};


/// The Monday closing the week `date` falls into. Mondays map onto
/// themselves.
pub fn week_ending_monday(date: NaiveDate) -> NaiveDate {
	let offset = (7 - date.weekday().num_days_from_monday()) % 7;
	date + Duration::days(offset as i64)
}


/// An inclusive, daily range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
	start: NaiveDate,
	len: usize,
}

impl DateSpan {
	pub fn new(start: NaiveDate, last: NaiveDate) -> Self {
		let len = (last - start).num_days() + 1;
		Self{
			start,
			len: if len < 0 { 0 } else { len as usize },
		}
	}

	#[inline(always)]
	pub fn index_date(&self, i: i64) -> Option<NaiveDate> {
		if i < 0 || i as usize >= self.len {
			return None
		}
		Some(self.start + Duration::days(i))
	}

	#[inline(always)]
	pub fn start(&self) -> NaiveDate {
		self.start
	}

	#[inline(always)]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn iter(&self) -> impl Iterator<Item = NaiveDate> {
		self.start.iter_days().take(self.len)
	}

	/// Days of this span strictly before `date`.
	pub fn before(&self, date: NaiveDate) -> impl Iterator<Item = NaiveDate> {
		let n = (date - self.start).num_days().max(0) as usize;
		self.start.iter_days().take(n.min(self.len))
	}

	/// Days of this span strictly after `date`.
	pub fn after(&self, date: NaiveDate) -> impl Iterator<Item = NaiveDate> {
		let skip = ((date - self.start).num_days() + 1).max(0) as usize;
		self.start.iter_days().take(self.len).skip(skip)
	}
}


fn country_of(row: &[Value], index: usize) -> Result<SmartString, Error> {
	match &row[index] {
		Value::Str(s) => Ok(s.clone()),
		Value::Null => Err(Error::InvalidValue{
			column: COUNTRY_NAME.into(),
			value: String::new(),
		}),
		other => Ok(other.to_string().into()),
	}
}

fn date_of(row: &[Value], index: usize) -> Result<NaiveDate, Error> {
	row[index].as_date().ok_or_else(|| Error::InvalidValue{
		column: DATE.into(),
		value: row[index].to_string(),
	})
}


/// Collapse every country's rows into weekly buckets labelled by the Monday
/// closing the week, keeping the chronologically last row of each bucket
/// (ties go to the later row in table order).
///
/// The output starts with the country and date columns and is sorted by
/// country and week.
pub fn resample_weekly(mut table: Table) -> Result<Table, Error> {
	table.reorder_front(&[COUNTRY_NAME, DATE])?;
	let (columns, rows) = table.into_parts();

	let mut buckets: BTreeMap<(SmartString, NaiveDate), (NaiveDate, usize)> = BTreeMap::new();
	for (i, row) in rows.iter().enumerate() {
		let country = country_of(row, 0)?;
		let date = date_of(row, 1)?;
		let week = week_ending_monday(date);
		let slot = buckets.entry((country, week)).or_insert((date, i));
		if date >= slot.0 {
			*slot = (date, i);
		}
	}

	let mut rows: Vec<Option<Vec<Value>>> = rows.into_iter().map(Some).collect();
	let mut result = Table::new(columns);
	for ((_, week), (_, i)) in buckets {
		if let Some(mut row) = rows[i].take() {
			row[1] = Value::Date(week);
			result.push_row(row);
		}
	}
	debug!("resampled {} rows into {} weekly rows", rows.len(), result.len());
	Ok(result)
}


/// Per-country index of the rows holding each date. Where several rows share
/// a date, the first one in table order represents it.
#[derive(Debug, Clone)]
pub struct CountryIndex {
	order: Vec<SmartString>,
	dates: HashMap<SmartString, BTreeMap<NaiveDate, usize>>,
}

impl CountryIndex {
	pub fn build(table: &Table) -> Result<Self, Error> {
		let ci = table.require_column(COUNTRY_NAME)?;
		let di = table.require_column(DATE)?;
		let mut order = Vec::new();
		let mut dates: HashMap<SmartString, BTreeMap<NaiveDate, usize>> = HashMap::new();
		for (i, row) in table.rows().iter().enumerate() {
			let country = country_of(row, ci)?;
			let date = date_of(row, di)?;
			if !dates.contains_key(&country) {
				order.push(country.clone());
			}
			dates.entry(country).or_insert_with(BTreeMap::new).entry(date).or_insert(i);
		}
		Ok(Self{order, dates})
	}

	/// Countries in order of first appearance.
	pub fn countries(&self) -> &[SmartString] {
		&self.order
	}

	pub fn first(&self, country: &str) -> Option<(NaiveDate, usize)> {
		self.dates.get(country)?.iter().next().map(|(d, i)| (*d, *i))
	}

	pub fn last(&self, country: &str) -> Option<(NaiveDate, usize)> {
		self.dates.get(country)?.iter().next_back().map(|(d, i)| (*d, *i))
	}

	/// The range from the earliest to the latest date of any country.
	pub fn global_span(&self) -> Option<DateSpan> {
		let mut lo: Option<NaiveDate> = None;
		let mut hi: Option<NaiveDate> = None;
		for by_date in self.dates.values() {
			if let Some((d, _)) = by_date.iter().next() {
				lo = Some(lo.map_or(*d, |v| v.min(*d)));
			}
			if let Some((d, _)) = by_date.iter().next_back() {
				hi = Some(hi.map_or(*d, |v| v.max(*d)));
			}
		}
		Some(DateSpan::new(lo?, hi?))
	}
}


/// Extend every country to the global date range. Days before a country's
/// first observation copy that observation, days after its last observation
/// copy the last one. Synthesized rows are appended at the end of the table.
pub fn normalize_dates(mut table: Table) -> Result<Table, Error> {
	let index = CountryIndex::build(&table)?;
	let span = match index.global_span() {
		Some(s) => s,
		None => return Ok(table),
	};
	let di = table.require_column(DATE)?;

	let mut synthesized = Vec::new();
	for country in index.countries() {
		// both exist: every indexed country has at least one date
		let (first_date, first_row) = match index.first(country) {
			Some(v) => v,
			None => continue,
		};
		let (last_date, last_row) = match index.last(country) {
			Some(v) => v,
			None => continue,
		};

		let n_before = synthesized.len();
		for date in span.before(first_date) {
			let mut row = table.rows()[first_row].clone();
			row[di] = Value::Date(date);
			synthesized.push(row);
		}
		for date in span.after(last_date) {
			let mut row = table.rows()[last_row].clone();
			row[di] = Value::Date(date);
			synthesized.push(row);
		}
		if synthesized.len() > n_before {
			debug!("extended {} ({}..{}) by {} rows", country, first_date, last_date, synthesized.len() - n_before);
		}
	}

	info!(
		"normalized {} countries to {}..{} ({} synthesized rows)",
		index.countries().len(),
		span.start(),
		span.index_date(span.len() as i64 - 1).unwrap_or(span.start()),
		synthesized.len(),
	);
	table.extend_rows(synthesized);
	Ok(table)
}


#[cfg(test)]
mod tests {
	use super::*;

	use std::collections::HashSet;

	fn d(y: i32, m: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, day).unwrap()
	}

	fn daily(country: &str, first: NaiveDate, last: NaiveDate) -> Vec<Vec<Value>> {
		DateSpan::new(first, last).iter().enumerate().map(|(i, date)| {
			vec![country.into(), Value::Date(date), Value::Int(i as i64)]
		}).collect()
	}

	#[test]
	fn week_ends_on_monday() {
		// 2020-01-06 is a Monday
		assert_eq!(week_ending_monday(d(2020, 1, 6)), d(2020, 1, 6));
		assert_eq!(week_ending_monday(d(2020, 1, 7)), d(2020, 1, 13));
		assert_eq!(week_ending_monday(d(2020, 1, 1)), d(2020, 1, 6));
		assert_eq!(week_ending_monday(d(2020, 1, 5)), d(2020, 1, 6));
	}

	#[test]
	fn date_span_partitions() {
		let span = DateSpan::new(d(2020, 1, 1), d(2020, 1, 10));
		assert_eq!(span.len(), 10);
		assert_eq!(span.index_date(2), Some(d(2020, 1, 3)));
		assert_eq!(span.index_date(10), None);
		assert_eq!(span.before(d(2020, 1, 3)).collect::<Vec<_>>(), vec![d(2020, 1, 1), d(2020, 1, 2)]);
		assert_eq!(span.after(d(2020, 1, 8)).collect::<Vec<_>>(), vec![d(2020, 1, 9), d(2020, 1, 10)]);
		assert_eq!(span.before(d(2019, 12, 1)).count(), 0);
		assert_eq!(span.after(d(2020, 2, 1)).count(), 0);
		assert!(DateSpan::new(d(2020, 1, 2), d(2020, 1, 1)).is_empty());
	}

	#[test]
	fn resample_keeps_latest_row_per_week() {
		let mut rows = daily("A", d(2020, 1, 1), d(2020, 1, 14));
		// out of order input must not matter
		rows.reverse();
		let t = Table::from_rows(vec!["country_name", "date", "v"], rows);
		let t = resample_weekly(t).unwrap();
		assert_eq!(t.len(), 3);
		assert_eq!(t.rows()[0], vec!["A".into(), Value::Date(d(2020, 1, 6)), Value::Int(5)]);
		assert_eq!(t.rows()[1], vec!["A".into(), Value::Date(d(2020, 1, 13)), Value::Int(12)]);
		assert_eq!(t.rows()[2], vec!["A".into(), Value::Date(d(2020, 1, 20)), Value::Int(13)]);
	}

	#[test]
	fn resample_moves_keys_first_and_sorts_by_country() {
		let t = Table::from_rows(
			vec!["v", "date", "country_name"],
			vec![
				vec![Value::Int(1), Value::Date(d(2020, 1, 2)), "B".into()],
				vec![Value::Int(2), Value::Date(d(2020, 1, 2)), "A".into()],
				vec![Value::Int(3), Value::Date(d(2020, 1, 2)), "A".into()],
			],
		);
		let t = resample_weekly(t).unwrap();
		let names: Vec<&str> = t.columns().iter().map(|c| c.as_str()).collect();
		assert_eq!(names, vec!["country_name", "date", "v"]);
		// same date within the bucket: later row wins
		assert_eq!(t.rows()[0], vec!["A".into(), Value::Date(d(2020, 1, 6)), Value::Int(3)]);
		assert_eq!(t.rows()[1], vec!["B".into(), Value::Date(d(2020, 1, 6)), Value::Int(1)]);
	}

	#[test]
	fn resample_rejects_non_dates() {
		let t = Table::from_rows(
			vec!["country_name", "date"],
			vec![vec!["A".into(), "yesterday".into()]],
		);
		match resample_weekly(t) {
			Err(Error::InvalidValue{column, ..}) => assert_eq!(column.as_str(), "date"),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn normalize_extends_every_country_to_global_span() {
		let mut rows = daily("A", d(2020, 1, 1), d(2020, 1, 5));
		rows.extend(daily("B", d(2020, 1, 3), d(2020, 1, 5)));
		rows.extend(daily("C", d(2020, 1, 2), d(2020, 1, 3)));
		let t = Table::from_rows(vec!["country_name", "date", "v"], rows);
		let t = normalize_dates(t).unwrap();

		let span = DateSpan::new(d(2020, 1, 1), d(2020, 1, 5));
		let expected: Vec<NaiveDate> = span.iter().collect();
		for country in &["A", "B", "C"] {
			let mut dates: Vec<NaiveDate> = t.rows().iter()
				.filter(|r| r[0] == Value::from(*country))
				.map(|r| r[1].as_date().unwrap())
				.collect();
			dates.sort();
			let unique: HashSet<_> = dates.iter().collect();
			assert_eq!(unique.len(), dates.len());
			assert_eq!(dates, expected);
		}

		let b_at = |date: NaiveDate| t.rows().iter()
			.find(|r| r[0] == Value::from("B") && r[1] == Value::Date(date))
			.cloned()
			.unwrap();
		assert_eq!(b_at(d(2020, 1, 1))[2], b_at(d(2020, 1, 3))[2]);
		assert_eq!(b_at(d(2020, 1, 2))[2], b_at(d(2020, 1, 3))[2]);

		let c_at = |date: NaiveDate| t.rows().iter()
			.find(|r| r[0] == Value::from("C") && r[1] == Value::Date(date))
			.cloned()
			.unwrap();
		assert_eq!(c_at(d(2020, 1, 1))[2], Value::Int(0));
		assert_eq!(c_at(d(2020, 1, 5))[2], Value::Int(1));
	}

	#[test]
	fn normalize_prefers_first_row_on_duplicate_boundary_dates() {
		let t = Table::from_rows(
			vec!["country_name", "date", "v"],
			vec![
				vec!["A".into(), Value::Date(d(2020, 1, 1)), Value::Int(1)],
				vec!["A".into(), Value::Date(d(2020, 1, 3)), Value::Int(2)],
				vec!["B".into(), Value::Date(d(2020, 1, 2)), Value::Int(3)],
				vec!["B".into(), Value::Date(d(2020, 1, 2)), Value::Int(4)],
			],
		);
		let t = normalize_dates(t).unwrap();
		let b: Vec<&Vec<Value>> = t.rows()[4..].iter().filter(|r| r[0] == Value::from("B")).collect();
		assert_eq!(b.len(), 2);
		for row in b {
			assert_eq!(row[2], Value::Int(3));
		}
	}

	#[test]
	fn normalize_is_a_no_op_when_spans_agree() {
		let mut rows = daily("A", d(2020, 1, 1), d(2020, 1, 3));
		rows.extend(daily("B", d(2020, 1, 1), d(2020, 1, 3)));
		let t = Table::from_rows(vec!["country_name", "date", "v"], rows);
		assert_eq!(normalize_dates(t.clone()).unwrap(), t);

		let empty = Table::new(vec!["country_name", "date", "v"]);
		assert_eq!(normalize_dates(empty.clone()).unwrap(), empty);
	}
}
