use serde::Deserialize;

use super::Error;


#[derive(Debug, Clone, Deserialize)]
pub struct Series {
	pub name: String,
	#[serde(default)]
	pub columns: Vec<String>,
	#[serde(default)]
	pub values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
struct StatementResult {
	#[serde(default)]
	series: Vec<Series>,
	#[serde(default)]
	error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
	#[serde(default)]
	results: Vec<StatementResult>,
	#[serde(default)]
	error: Option<String>,
}

impl QueryResponse {
	pub fn decode(body: &[u8]) -> Result<Self, Error> {
		let resp: Self = serde_json::from_slice(body)?;
		if let Some(msg) = resp.error.as_ref() {
			return Err(Error::Query(msg.clone()))
		}
		for result in resp.results.iter() {
			match result.error.as_ref() {
				Some(msg) if msg.starts_with("database not found") => return Err(Error::DatabaseNotFound),
				Some(msg) => return Err(Error::Query(msg.clone())),
				None => (),
			}
		}
		Ok(resp)
	}

	/// All series of all statements, in response order.
	pub fn into_series(self) -> Vec<Series> {
		self.results.into_iter().flat_map(|r| r.series.into_iter()).collect()
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_series() {
		let body = br#"{"results":[{"statement_id":0,"series":[{"name":"epidemiology","columns":["time","location_key","cumulative_confirmed"],"values":[["2020-01-01T00:00:00Z","AA",1],["2020-01-02T00:00:00Z","AA",null]]}]}]}"#;
		let series = QueryResponse::decode(&body[..]).unwrap().into_series();
		assert_eq!(series.len(), 1);
		assert_eq!(series[0].name, "epidemiology");
		assert_eq!(series[0].columns, vec!["time", "location_key", "cumulative_confirmed"]);
		assert_eq!(series[0].values.len(), 2);
		assert!(series[0].values[1][2].is_null());
	}

	#[test]
	fn empty_result_has_no_series() {
		let body = br#"{"results":[{"statement_id":0}]}"#;
		assert!(QueryResponse::decode(&body[..]).unwrap().into_series().is_empty());
	}

	#[test]
	fn statement_errors_are_surfaced() {
		let body = br#"{"results":[{"statement_id":0,"error":"database not found: covid"}]}"#;
		match QueryResponse::decode(&body[..]) {
			Err(Error::DatabaseNotFound) => (),
			other => panic!("unexpected result: {:?}", other),
		}
		let body = br#"{"results":[{"statement_id":0,"error":"error parsing query"}]}"#;
		match QueryResponse::decode(&body[..]) {
			Err(Error::Query(msg)) => assert_eq!(msg, "error parsing query"),
			other => panic!("unexpected result: {:?}", other),
		}
	}
}
