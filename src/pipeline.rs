//! Stage orchestration: read, clean, merge, prune, filter, resample,
//! normalize, resample again, write. Every stage takes a table and returns
//! one, so each can be exercised on its own.

use std::path::PathBuf;

use log::{debug, info};

use enum_map::EnumMap;

use super::context::Dataset;
use super::error::Error;
use super::filter::{filter, CountrySet, DateWindow};
use super::ioutil::find_csv;
use super::merge::{merge_all, prune, DEFAULT_NULL_THRESHOLD};
use super::progress::{default_output, ProgressSink};
use super::source::{read_table, write_table, Database, Sink, Source};
use super::table::{clean, Table};
use super::timeseries::{normalize_dates, resample_weekly};


/// Where the raw datasets live.
#[derive(Debug, Clone)]
pub enum Input {
	/// One delimited-text file per dataset.
	Directory(PathBuf),
	/// One measurement per dataset.
	Database(Database),
}

impl Input {
	/// Exactly one of `dir` and `database` must be given.
	pub fn new(dir: Option<PathBuf>, database: Option<Database>) -> Result<Self, Error> {
		match (dir, database) {
			(Some(dir), None) => Ok(Self::Directory(dir)),
			(None, Some(db)) => Ok(Self::Database(db)),
			(Some(_), Some(_)) => Err(Error::configuration("both an input directory and an input database were given")),
			(None, None) => Err(Error::configuration("no input directory or input database was given")),
		}
	}

	pub fn source(&self, dataset: Dataset) -> Source {
		match self {
			Self::Directory(dir) => Source::File(find_csv(dir, dataset.name())),
			Self::Database(db) => Source::Database(db.table(dataset.name(), dataset.is_dated())),
		}
	}
}


#[derive(Debug, Clone)]
pub struct Options {
	pub window: DateWindow,
	pub countries: Option<CountrySet>,
	pub null_threshold: f64,
}

impl Options {
	pub fn new(window: DateWindow) -> Self {
		Self{
			window,
			countries: None,
			null_threshold: DEFAULT_NULL_THRESHOLD,
		}
	}
}


pub type Tables = EnumMap<Dataset, Option<Table>>;


/// Read and clean every dataset.
pub fn load(input: &Input) -> Result<Tables, Error> {
	let mut tables = Tables::default();
	for dataset in Dataset::ALL.iter() {
		let source = input.source(*dataset);
		info!("reading {} from {}", dataset, source.describe());
		let mut progress = default_output(format!("reading {}", dataset), None);
		let raw = read_table(&source, &mut *progress)?;
		let cleaned = clean(raw);
		debug!("{}: {} rows and {} columns after cleaning", dataset, cleaned.len(), cleaned.width());
		tables[*dataset] = Some(cleaned);
	}
	Ok(tables)
}


/// Run every transform on already loaded tables. Datasets are folded in
/// their canonical order; absent ones are skipped.
pub fn transform(mut tables: Tables, options: &Options) -> Result<Table, Error> {
	let has_vaccinations = tables[Dataset::Vaccinations].is_some();
	let ordered: Vec<Table> = Dataset::ALL.iter().filter_map(|d| tables[*d].take()).collect();
	let merged = merge_all(ordered)?;
	let pruned = prune(merged, options.null_threshold, has_vaccinations)?;
	let filtered = filter(pruned, &options.window, options.countries.as_ref())?;
	let weekly = resample_weekly(filtered)?;
	let normalized = normalize_dates(weekly)?;
	let result = resample_weekly(normalized)?;
	info!("final table has {} rows and {} columns", result.len(), result.width());
	Ok(result)
}


/// Full run: load, transform and write once at the end.
pub fn run(input: &Input, sink: &Sink, options: &Options) -> Result<Table, Error> {
	let tables = load(input)?;
	let result = transform(tables, options)?;
	let mut progress: Box<dyn ProgressSink> = match sink {
		Sink::Database(_) => default_output("writing", Some(result.len())),
		Sink::File(_) => Box::new(super::progress::Silent),
	};
	write_table(&result, sink, &mut *progress)?;
	Ok(result)
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn input_requires_exactly_one_location() {
		assert!(matches!(Input::new(None, None), Err(Error::Configuration(_))));
		assert!(matches!(Input::new(Some("data".into()), None), Ok(Input::Directory(_))));
	}

	#[test]
	fn directory_input_maps_datasets_to_files() {
		let input = Input::Directory("data".into());
		match input.source(Dataset::Epidemiology) {
			Source::File(path) => assert_eq!(path, PathBuf::from("data/epidemiology.csv")),
			other => panic!("unexpected source: {:?}", other),
		}
	}

	#[test]
	fn transform_without_tables_fails() {
		let options = Options::new(DateWindow::new(
			crate::context::default_start_date(),
			crate::context::default_end_date(),
		));
		assert!(transform(Tables::default(), &options).is_err());
	}
}
