use std::collections::HashMap;

use log::{debug, info};

use smartstring::alias::{String as SmartString};

use super::context::{DATE, LOCATION_KEY};
use super::error::Error;
use super::table::{Table, Value};


/// Place/entity identifiers, administrative codes and raw daily counts which
/// are removed once all sources have been joined.
pub static IDENTIFIER_COLUMNS: &[&str] = &[
	"place_id",
	"wikidata_id",
	"datacommons_id",
	"country_code",
	"subregion1_code",
	"subregion1_name",
	"subregion2_code",
	"subregion2_name",
	"locality_code",
	"locality_name",
	"iso_3166_1_alpha_2",
	"iso_3166_1_alpha_3",
	"aggregation_level",
	"location_key",
	"new_confirmed",
	"new_deceased",
];

/// Columns where a missing value means zero.
pub static ZERO_FILLED_COLUMNS: &[&str] = &[
	"cumulative_persons_fully_vaccinated",
];

pub static DEFAULT_NULL_THRESHOLD: f64 = 0.7;


static LOCATION_AND_DATE: [&str; 2] = [LOCATION_KEY, DATE];
static LOCATION_ONLY: [&str; 1] = [LOCATION_KEY];

fn join_keys(left: &Table, right: &Table) -> &'static [&'static str] {
	if left.has_column(DATE) && right.has_column(DATE) {
		&LOCATION_AND_DATE
	} else {
		&LOCATION_ONLY
	}
}

fn suffixed(name: &str, suffix: &str) -> SmartString {
	let mut result = SmartString::from(name);
	result.push_str(suffix);
	result
}


/// Full outer join of two tables. Joins on `(location_key, date)` when both
/// sides carry a date, on `location_key` alone otherwise.
pub fn outer_join(left: &Table, right: &Table) -> Result<Table, Error> {
	let keys = join_keys(left, right);
	let mut lkeys = Vec::with_capacity(keys.len());
	let mut rkeys = Vec::with_capacity(keys.len());
	for k in keys {
		lkeys.push(left.require_column(k)?);
		rkeys.push(right.require_column(k)?);
	}

	let rvalue_cols: Vec<usize> = (0..right.width()).filter(|i| !rkeys.contains(i)).collect();

	let mut columns: Vec<SmartString> = Vec::with_capacity(left.width() + rvalue_cols.len());
	for (i, name) in left.columns().iter().enumerate() {
		let overlaps = !lkeys.contains(&i) && rvalue_cols.iter().any(|j| right.columns()[*j] == *name);
		columns.push(if overlaps { suffixed(name, "_x") } else { name.clone() });
	}
	for j in rvalue_cols.iter() {
		let name = &right.columns()[*j];
		let overlaps = left.columns().iter().enumerate().any(|(i, c)| !lkeys.contains(&i) && c == name);
		columns.push(if overlaps { suffixed(name, "_y") } else { name.clone() });
	}

	let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
	for (j, row) in right.rows().iter().enumerate() {
		let k: Vec<Value> = rkeys.iter().map(|i| row[*i].clone()).collect();
		index.entry(k).or_insert_with(Vec::new).push(j);
	}

	let mut result = Table::new(columns);
	let mut matched = vec![false; right.len()];
	for lrow in left.rows() {
		let k: Vec<Value> = lkeys.iter().map(|i| lrow[*i].clone()).collect();
		match index.get(&k) {
			Some(matches) => {
				for j in matches {
					matched[*j] = true;
					let rrow = &right.rows()[*j];
					let mut row = lrow.clone();
					row.extend(rvalue_cols.iter().map(|i| rrow[*i].clone()));
					result.push_row(row);
				}
			},
			None => {
				let mut row = lrow.clone();
				row.resize(row.len() + rvalue_cols.len(), Value::Null);
				result.push_row(row);
			},
		}
	}

	for (j, rrow) in right.rows().iter().enumerate() {
		if matched[j] {
			continue
		}
		let mut row = vec![Value::Null; left.width()];
		for (lk, rk) in lkeys.iter().zip(rkeys.iter()) {
			row[*lk] = rrow[*rk].clone();
		}
		row.extend(rvalue_cols.iter().map(|i| rrow[*i].clone()));
		result.push_row(row);
	}

	debug!("joined {}x{} with {}x{} on {:?} -> {}x{}", left.len(), left.width(), right.len(), right.width(), keys, result.len(), result.width());
	Ok(result)
}

/// Fold all tables into one by repeated outer join, in the order given.
pub fn merge_all<I: IntoIterator<Item = Table>>(tables: I) -> Result<Table, Error> {
	let mut iter = tables.into_iter();
	let mut acc = match iter.next() {
		Some(t) => t,
		None => return Err(Error::configuration("no tables to merge")),
	};
	for t in iter {
		acc = outer_join(&acc, &t)?;
	}
	info!("merged table has {} rows and {} columns", acc.len(), acc.width());
	Ok(acc)
}


/// Reduce the merged table to analytically useful, complete rows:
///
/// 1. drop the identifier columns,
/// 2. fill the zero-filled columns; with `require_zero_filled` their absence
///    is an error, otherwise absent ones are skipped,
/// 3. drop columns whose non-null count is below `null_threshold` times the
///    row count,
/// 4. drop every row which still has a null.
pub fn prune(mut table: Table, null_threshold: f64, require_zero_filled: bool) -> Result<Table, Error> {
	let n = table.drop_columns(IDENTIFIER_COLUMNS);
	debug!("dropped {} identifier columns", n);

	for column in ZERO_FILLED_COLUMNS {
		if !require_zero_filled && !table.has_column(column) {
			continue
		}
		let n = table.fill_null(column, Value::Int(0))?;
		debug!("filled {} missing values of {} with zero", n, column);
	}

	let nrows = table.len();
	let min_count = (nrows as f64) * null_threshold;
	let counts: Vec<usize> = (0..table.width()).map(|i| table.non_null_count(i)).collect();
	let width_before = table.width();
	table.retain_columns(|i, name| {
		let keep = (counts[i] as f64) >= min_count;
		if !keep {
			debug!("dropping sparse column {} ({} of {} rows populated, {} required)", name, counts[i], nrows, min_count);
		}
		keep
	});

	let len_before = table.len();
	table.retain_rows(|row| row.iter().all(|v| !v.is_null()));

	info!(
		"pruned to {} columns ({} sparse dropped) and {} complete rows ({} dropped)",
		table.width(),
		width_before - table.width(),
		table.len(),
		len_before - table.len(),
	);
	Ok(table)
}
