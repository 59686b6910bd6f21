use std::fmt;

use enum_map::{Enum};

use chrono::NaiveDate;

use serde::{Serialize, Deserialize};


pub const COUNTRY_NAME: &str = "country_name";
pub const DATE: &str = "date";
pub const LOCATION_KEY: &str = "location_key";

pub static DEFAULT_MEASUREMENT: &'static str = "COVID_DATA";
pub static OUTPUT_FILE_NAME: &'static str = "macrotable.csv";


pub fn default_start_date() -> NaiveDate {
	NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()
}

pub fn default_end_date() -> NaiveDate {
	NaiveDate::from_ymd_opt(2022, 8, 22).unwrap()
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
	Demographics,
	Epidemiology,
	Health,
	Hospitalizations,
	Index,
	Vaccinations,
}

impl Dataset {
	/// All datasets, in the order they are folded into the merged table.
	pub const ALL: [Dataset; 6] = [
		Self::Demographics,
		Self::Epidemiology,
		Self::Health,
		Self::Hospitalizations,
		Self::Index,
		Self::Vaccinations,
	];

	pub fn name(&self) -> &'static str {
		match self {
			Self::Demographics => "demographics",
			Self::Epidemiology => "epidemiology",
			Self::Health => "health",
			Self::Hospitalizations => "hospitalizations",
			Self::Index => "index",
			Self::Vaccinations => "vaccinations",
		}
	}

	/// Whether the dataset carries one row per location and day.
	pub fn is_dated(&self) -> bool {
		match self {
			Self::Epidemiology | Self::Hospitalizations | Self::Vaccinations => true,
			Self::Demographics | Self::Health | Self::Index => false,
		}
	}
}

impl fmt::Display for Dataset {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_time_indexed_datasets_are_dated() {
		let dated: Vec<_> = Dataset::ALL.iter().filter(|d| d.is_dated()).collect();
		assert_eq!(dated, vec![&Dataset::Epidemiology, &Dataset::Hospitalizations, &Dataset::Vaccinations]);
	}
}
