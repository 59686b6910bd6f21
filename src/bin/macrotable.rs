use std::path::PathBuf;

use chrono::NaiveDate;

use clap::Parser;

use log::info;

use macrotable::{
	env_client, run, CountrySet, Database, DateWindow, Input, Options, Sink,
	DEFAULT_NULL_THRESHOLD, OUTPUT_FILE_NAME, DEFAULT_MEASUREMENT,
};


#[derive(Parser, Debug)]
#[command(author, version, about = "Merge the per-country COVID datasets into one weekly macro table")]
struct Args {
	/// Directory holding one CSV file per dataset
	dir: Option<PathBuf>,

	/// Read the datasets from this InfluxDB database instead
	#[arg(long, value_name = "DB")]
	input_db: Option<String>,

	/// Directory to write macrotable.csv into [default: ./]
	#[arg(short, long, value_name = "DIR")]
	output: Option<PathBuf>,

	/// Write the result to this InfluxDB database instead
	#[arg(long, value_name = "DB")]
	output_db: Option<String>,

	/// Measurement name for --output-db
	#[arg(long, default_value = DEFAULT_MEASUREMENT)]
	measurement: String,

	/// Exclusive lower bound on dates
	#[arg(long, default_value = "2020-01-02")]
	start: NaiveDate,

	/// Exclusive upper bound on dates
	#[arg(long, default_value = "2022-08-22")]
	end: NaiveDate,

	/// Comma separated list of country names to keep
	#[arg(long)]
	countries: Option<CountrySet>,

	/// Minimum share of non-null values a column needs to be kept
	#[arg(long, default_value_t = DEFAULT_NULL_THRESHOLD)]
	null_threshold: f64,
}


fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let args = Args::parse();

	let needs_client = args.input_db.is_some() || args.output_db.is_some();
	let client = if needs_client {
		Some(env_client()?)
	} else {
		None
	};
	let database = |name: Option<String>| -> Option<Database> {
		match (name, client.as_ref()) {
			(Some(name), Some(client)) => Some(Database{client: client.clone(), name}),
			_ => None,
		}
	};

	let input = Input::new(args.dir, database(args.input_db))?;

	let output_dir = match (args.output, args.output_db.is_some()) {
		(Some(dir), _) => Some(dir),
		(None, false) => Some(PathBuf::from("./")),
		(None, true) => None,
	};
	let measurement = args.measurement;
	let output_table = database(args.output_db).map(|db| db.table(measurement, true));
	let sink = Sink::new(output_dir.map(|dir| dir.join(OUTPUT_FILE_NAME)), output_table)?;

	let mut options = Options::new(DateWindow::new(args.start, args.end));
	options.countries = args.countries;
	options.null_threshold = args.null_threshold;

	let result = run(&input, &sink, &options)?;
	info!("done: {} rows written to {}", result.len(), sink.describe());
	Ok(())
}
