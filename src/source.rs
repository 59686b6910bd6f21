use std::collections::BTreeMap;
use std::env;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use smartstring::alias::{String as SmartString};

use chrono::{NaiveDate, TimeZone, Utc};

use super::context::{COUNTRY_NAME, DATE};
use super::error::Error;
use super::influxdb;
use super::ioutil::{magic_create, magic_open};
use super::progress::{ProgressSink, StepMeter};
use super::table::{Table, Value};


static TARGET_POINTS_PER_CHUNK: usize = 5000;
static PROGRESS_STEP: usize = 100_000;


/// Build a database client from `INFLUXDB_URL`, `INFLUXDB_USER` and
/// `INFLUXDB_PASSWORD`.
pub fn env_client() -> Result<influxdb::Client, Error> {
	let user = env::var("INFLUXDB_USER");
	let pass = env::var("INFLUXDB_PASSWORD");
	let auth = match (user, pass) {
		(Ok(username), Ok(password)) => influxdb::Auth::HTTP{
			username,
			password
		},
		(Ok(_), Err(e)) | (Err(e), Ok(_)) => return Err(Error::configuration(format!(
			"INFLUXDB_USER and INFLUXDB_PASSWORD must be set together: {}", e,
		))),
		(Err(_), Err(_)) => influxdb::Auth::None,
	};
	Ok(influxdb::Client::new(
		env::var("INFLUXDB_URL").unwrap_or("http://127.0.0.1:8086".into()),
		auth,
	))
}


/// A database connection plus the database to use.
#[derive(Debug, Clone)]
pub struct Database {
	pub client: influxdb::Client,
	pub name: String,
}

/// One measurement of a database.
#[derive(Debug, Clone)]
pub struct DatabaseTable {
	pub database: Database,
	pub measurement: String,
	/// Keep the point timestamps as a `date` column.
	pub keep_time: bool,
}

impl Database {
	pub fn table<S: Into<String>>(&self, measurement: S, keep_time: bool) -> DatabaseTable {
		DatabaseTable{
			database: self.clone(),
			measurement: measurement.into(),
			keep_time,
		}
	}
}


fn exactly_one<T, U>(what: &str, file: Option<T>, database: Option<U>) -> Result<Result<T, U>, Error> {
	match (file, database) {
		(Some(f), None) => Ok(Ok(f)),
		(None, Some(d)) => Ok(Err(d)),
		(Some(_), Some(_)) => Err(Error::configuration(format!("both a file and a database {} were given", what))),
		(None, None) => Err(Error::configuration(format!("no {} was given", what))),
	}
}


#[derive(Debug, Clone)]
pub enum Source {
	File(PathBuf),
	Database(DatabaseTable),
}

impl Source {
	/// Exactly one of `file` and `database` must be given.
	pub fn new(file: Option<PathBuf>, database: Option<DatabaseTable>) -> Result<Self, Error> {
		Ok(match exactly_one("source", file, database)? {
			Ok(path) => Self::File(path),
			Err(table) => Self::Database(table),
		})
	}

	pub fn describe(&self) -> String {
		match self {
			Self::File(path) => path.display().to_string(),
			Self::Database(t) => format!("{}.{}", t.database.name, t.measurement),
		}
	}
}


#[derive(Debug, Clone)]
pub enum Sink {
	File(PathBuf),
	Database(DatabaseTable),
}

impl Sink {
	/// Exactly one of `file` and `database` must be given.
	pub fn new(file: Option<PathBuf>, database: Option<DatabaseTable>) -> Result<Self, Error> {
		Ok(match exactly_one("destination", file, database)? {
			Ok(path) => Self::File(path),
			Err(table) => Self::Database(table),
		})
	}

	pub fn describe(&self) -> String {
		match self {
			Self::File(path) => path.display().to_string(),
			Self::Database(t) => format!("{}.{}", t.database.name, t.measurement),
		}
	}
}


/// Load a delimited-text table with a header row.
pub fn read_csv<R: io::Read, S: ProgressSink + ?Sized>(r: R, progress: &mut S) -> Result<Table, Error> {
	let mut r = csv::Reader::from_reader(r);
	let headers: Vec<SmartString> = r.headers()?.iter().map(|h| h.trim_start_matches('\u{feff}').into()).collect();
	let mut table = Table::new(headers);
	let mut pm = StepMeter::new(progress, PROGRESS_STEP);
	let mut n = 0;
	for (i, row) in r.records().enumerate() {
		let rec = row?;
		table.push_row(rec.iter().map(Value::parse).collect());
		pm.update(i+1);
		n = i+1;
	}
	pm.finish(Some(n));
	Ok(table)
}

pub fn write_csv<W: io::Write>(table: &Table, w: W) -> Result<(), Error> {
	let mut w = csv::Writer::from_writer(w);
	w.write_record(table.columns().iter().map(|c| c.as_bytes()))?;
	for row in table.rows() {
		w.write_record(row.iter().map(|v| v.to_string()))?;
	}
	w.flush()?;
	Ok(())
}


fn json_value(v: &serde_json::Value) -> Value {
	match v {
		serde_json::Value::Null => Value::Null,
		serde_json::Value::Bool(b) => Value::Str(if *b { "true" } else { "false" }.into()),
		serde_json::Value::Number(n) => match n.as_i64() {
			Some(i) => Value::Int(i),
			None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
		},
		serde_json::Value::String(s) => Value::parse(s),
		other => Value::Str(other.to_string().into()),
	}
}

fn time_value(v: &serde_json::Value) -> Value {
	match v {
		serde_json::Value::String(s) => match s.get(..10).map(|p| NaiveDate::parse_from_str(p, "%Y-%m-%d")) {
			Some(Ok(d)) => Value::Date(d),
			_ => Value::Null,
		},
		_ => Value::Null,
	}
}

/// Turn query result series into one table. The `time` column becomes
/// `date` or is dropped.
pub fn table_from_series(series: &[influxdb::Series], keep_time: bool) -> Table {
	let mut columns: Vec<SmartString> = Vec::new();
	for s in series {
		for c in s.columns.iter() {
			let name: SmartString = if c == "time" { DATE.into() } else { c.as_str().into() };
			if c == "time" && !keep_time {
				continue
			}
			if !columns.contains(&name) {
				columns.push(name);
			}
		}
	}

	let mut table = Table::new(columns.clone());
	for s in series {
		let targets: Vec<Option<usize>> = s.columns.iter().map(|c| {
			if c == "time" {
				if keep_time { columns.iter().position(|x| x.as_str() == DATE) } else { None }
			} else {
				columns.iter().position(|x| x.as_str() == c.as_str())
			}
		}).collect();
		for values in s.values.iter() {
			let mut row = vec![Value::Null; columns.len()];
			for ((c, target), v) in s.columns.iter().zip(targets.iter()).zip(values.iter()) {
				if let Some(i) = target {
					row[*i] = if c == "time" { time_value(v) } else { json_value(v) };
				}
			}
			table.push_row(row);
		}
	}
	table
}

/// Group rows into one readout per date: `country_name` is the tag, every
/// other column a field.
pub fn readouts_from_table(table: &Table, measurement: &str) -> Result<Vec<influxdb::Readout>, Error> {
	let ci = table.require_column(COUNTRY_NAME)?;
	let di = table.require_column(DATE)?;
	let field_cols: Vec<usize> = (0..table.width()).filter(|i| *i != ci && *i != di).collect();
	let fields: Vec<SmartString> = field_cols.iter().map(|i| table.columns()[*i].clone()).collect();

	let mut by_date: BTreeMap<NaiveDate, Vec<influxdb::Sample>> = BTreeMap::new();
	for row in table.rows() {
		let date = row[di].as_date().ok_or_else(|| Error::InvalidValue{
			column: DATE.into(),
			value: row[di].to_string(),
		})?;
		let fieldv = field_cols.iter().map(|i| match &row[*i] {
			Value::Null => None,
			Value::Int(v) => Some(influxdb::FieldValue::Int(*v)),
			Value::Float(v) => Some(influxdb::FieldValue::Float(*v)),
			Value::Str(v) => Some(influxdb::FieldValue::Str(v.clone())),
			other => Some(influxdb::FieldValue::Str(other.to_string().into())),
		}).collect();
		by_date.entry(date).or_insert_with(Vec::new).push(influxdb::Sample{
			tagv: vec![row[ci].to_string().into()],
			fieldv,
		});
	}

	let mut result = Vec::with_capacity(by_date.len());
	for (date, samples) in by_date {
		let ts = match date.and_hms_opt(0, 0, 0) {
			Some(dt) => Utc.from_utc_datetime(&dt),
			None => continue,
		};
		result.push(influxdb::Readout{
			ts,
			measurement: measurement.into(),
			tags: vec![COUNTRY_NAME.into()],
			fields: fields.clone(),
			samples,
		});
	}
	Ok(result)
}


fn read_file<S: ProgressSink + ?Sized>(path: &Path, progress: &mut S) -> Result<Table, Error> {
	let r = match magic_open(path) {
		Ok(r) => r,
		Err(e) => return Err(Error::not_found(path.display().to_string(), e)),
	};
	read_csv(r, progress)
}

fn read_database(t: &DatabaseTable) -> Result<Table, Error> {
	let q = format!("SELECT * FROM \"{}\"", t.measurement.replace('"', "\\\""));
	let series = t.database.client.query(&t.database.name, &q)?.into_series();
	if series.is_empty() {
		return Err(Error::not_found(
			format!("{}.{}", t.database.name, t.measurement),
			"measurement has no data",
		))
	}
	Ok(table_from_series(&series, t.keep_time))
}

/// Load one table.
pub fn read_table<S: ProgressSink + ?Sized>(source: &Source, progress: &mut S) -> Result<Table, Error> {
	let table = match source {
		Source::File(path) => read_file(path, progress)?,
		Source::Database(t) => read_database(t)?,
	};
	debug!("read {} rows and {} columns from {}", table.len(), table.width(), source.describe());
	Ok(table)
}


fn write_database<S: ProgressSink + ?Sized>(table: &Table, t: &DatabaseTable, progress: &mut S) -> Result<(), Error> {
	let readouts = readouts_from_table(table, &t.measurement)?;
	let mut chunk: Vec<influxdb::Readout> = Vec::new();
	let mut points = 0;
	let mut written = 0;
	for readout in readouts {
		points += readout.len();
		chunk.push(readout);
		if points >= TARGET_POINTS_PER_CHUNK {
			t.database.client.post(&t.database.name, &chunk[..])?;
			written += points;
			progress.update(written);
			chunk.clear();
			points = 0;
		}
	}
	if chunk.len() > 0 {
		t.database.client.post(&t.database.name, &chunk[..])?;
		written += points;
	}
	progress.finish(Some(written));
	Ok(())
}

/// Persist the finished table.
pub fn write_table<S: ProgressSink + ?Sized>(table: &Table, sink: &Sink, progress: &mut S) -> Result<(), Error> {
	match sink {
		Sink::File(path) => {
			if let Some(parent) = path.parent() {
				if parent.as_os_str().len() > 0 {
					std::fs::create_dir_all(parent)?;
				}
			}
			let w = magic_create(path)?;
			write_csv(table, w)?;
		},
		Sink::Database(t) => write_database(table, t, progress)?,
	}
	info!("wrote {} rows and {} columns to {}", table.len(), table.width(), sink.describe());
	Ok(())
}


#[cfg(test)]
mod tests {
	use super::*;

	use crate::progress::Silent;

	fn database() -> Database {
		Database{
			client: influxdb::Client::new("http://127.0.0.1:8086".into(), influxdb::Auth::None),
			name: "covid".into(),
		}
	}

	#[test]
	fn source_and_sink_require_exactly_one_target() {
		assert!(matches!(Source::new(None, None), Err(Error::Configuration(_))));
		assert!(matches!(
			Source::new(Some("a.csv".into()), Some(database().table("epidemiology", true))),
			Err(Error::Configuration(_))
		));
		assert!(matches!(Source::new(Some("a.csv".into()), None), Ok(Source::File(_))));
		assert!(matches!(Sink::new(None, Some(database().table("COVID_DATA", true))), Ok(Sink::Database(_))));
		assert!(matches!(Sink::new(None, None), Err(Error::Configuration(_))));
	}

	#[test]
	fn missing_file_is_source_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let source = Source::File(dir.path().join("nope.csv"));
		match read_table(&source, &mut Silent) {
			Err(Error::SourceNotFound{source, ..}) => assert!(source.ends_with("nope.csv")),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn csv_roundtrip_preserves_values() {
		let data = "location_key,date,value,note\nAA,2020-01-01,1,x\nBB,2020-01-02,,\n";
		let t = read_csv(data.as_bytes(), &mut Silent).unwrap();
		assert_eq!(t.len(), 2);
		assert_eq!(t.get(0, "date"), Some(&Value::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())));
		assert_eq!(t.get(1, "value"), Some(&Value::Null));
		let mut buf = Vec::new();
		write_csv(&t, &mut buf).unwrap();
		assert_eq!(String::from_utf8(buf).unwrap(), data);
	}

	#[test]
	fn series_become_tables() {
		let body = br#"{"results":[{"statement_id":0,"series":[{"name":"epidemiology","columns":["time","location_key","cumulative_confirmed"],"values":[["2020-01-01T00:00:00Z","AA",1],["2020-01-02T00:00:00Z","AA",2.5]]}]}]}"#;
		let series = influxdb::QueryResponse::decode(&body[..]).unwrap().into_series();

		let t = table_from_series(&series, true);
		let names: Vec<&str> = t.columns().iter().map(|c| c.as_str()).collect();
		assert_eq!(names, vec!["date", "location_key", "cumulative_confirmed"]);
		assert_eq!(t.rows()[1], vec![
			Value::Date(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()),
			"AA".into(),
			Value::Float(2.5),
		]);

		let t = table_from_series(&series, false);
		assert!(!t.has_column("date"));
		assert_eq!(t.width(), 2);
	}

	#[test]
	fn time_values_need_a_leading_date() {
		let d = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
		assert_eq!(time_value(&serde_json::Value::from("2020-01-02T00:00:00Z")), Value::Date(d));
		// byte 10 falls inside the multi-byte character
		assert_eq!(time_value(&serde_json::Value::from("2020-01-0\u{20ac}")), Value::Null);
		assert_eq!(time_value(&serde_json::Value::from("2020")), Value::Null);
		assert_eq!(time_value(&serde_json::Value::Null), Value::Null);
	}

	#[test]
	fn readouts_group_rows_by_date() {
		let d = |day| Value::Date(NaiveDate::from_ymd_opt(2020, 1, day).unwrap());
		let t = Table::from_rows(
			vec!["country_name", "date", "cases"],
			vec![
				vec!["A".into(), d(13), Value::Int(2)],
				vec!["A".into(), d(6), Value::Int(1)],
				vec!["B".into(), d(6), Value::Null],
			],
		);
		let readouts = readouts_from_table(&t, "COVID_DATA").unwrap();
		assert_eq!(readouts.len(), 2);
		assert_eq!(readouts[0].len(), 2);
		assert_eq!(readouts[0].fields, vec![SmartString::from("cases")]);
		let mut buf = Vec::new();
		for r in readouts.iter() {
			r.write(&mut buf).unwrap();
		}
		assert_eq!(
			String::from_utf8(buf).unwrap(),
			"COVID_DATA,country_name=A cases=1i 1578268800\nCOVID_DATA,country_name=A cases=2i 1578873600\n",
		);
	}
}
