use std::fmt;

use log::trace;

use reqwest;
use base64;
use bytes::{BytesMut, BufMut};

mod query;
mod readout;

pub use query::{QueryResponse, Series};
pub use readout::{FieldValue, Readout, Sample, PRECISION};


#[derive(Debug, Clone)]
pub enum Auth {
	None,
	HTTP{username: String, password: String},
}

impl Auth {
	pub fn apply(&self, req: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
		match self {
			Self::None => req,
			Self::HTTP{username, password} => req.header("Authorization", format!("Basic {}", base64::encode(format!(
				"{}:{}", username, password,
			)))),
		}
	}
}


#[derive(Debug)]
pub enum Error {
	Request(reqwest::Error),
	PermissionError,
	DataError,
	DatabaseNotFound,
	UnexpectedSuccessStatus,
	Query(String),
	Decode(serde_json::Error),
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Request(e) => fmt::Display::fmt(e, f),
			Self::PermissionError => write!(f, "permission denied"),
			Self::DataError => write!(f, "malformed data"),
			Self::DatabaseNotFound => write!(f, "database not found"),
			Self::UnexpectedSuccessStatus => write!(f, "unexpected success status"),
			Self::Query(msg) => write!(f, "query failed: {}", msg),
			Self::Decode(e) => write!(f, "malformed response: {}", e),
		}
	}
}

impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		Self::Request(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Decode(err)
	}
}

impl std::error::Error for Error {}


fn map_status(e: reqwest::Error) -> Error {
	match e.status() {
		Some(reqwest::StatusCode::FORBIDDEN) | Some(reqwest::StatusCode::UNAUTHORIZED) => Error::PermissionError,
		Some(reqwest::StatusCode::BAD_REQUEST) | Some(reqwest::StatusCode::PAYLOAD_TOO_LARGE) => Error::DataError,
		Some(reqwest::StatusCode::NOT_FOUND) => Error::DatabaseNotFound,
		_ => Error::Request(e),
	}
}


#[derive(Debug, Clone)]
pub struct Client {
	client: reqwest::blocking::Client,
	write_url: String,
	query_url: String,
	auth: Auth,
}

impl Client {
	pub fn new(api_url: String, auth: Auth) -> Self {
		let api_url = api_url.trim_end_matches('/');
		Self{
			client: reqwest::blocking::Client::new(),
			write_url: format!("{}/write", api_url),
			query_url: format!("{}/query", api_url),
			auth,
		}
	}

	pub fn post(
			&self,
			database: &'_ str,
			readouts: &[Readout],
			) -> Result<(), Error>
	{
		let req = self.client.post(self.write_url.clone());
		let req = self.auth.apply(req);
		let req = req.query(&[
			("db", database),
			("precision", PRECISION),
		]);

		let body = BytesMut::new();
		let mut body_writer = body.writer();
		trace!("serializing {} readouts", readouts.len());
		for readout in readouts {
			// BytesMut is infallible
			readout.write(&mut body_writer).map_err(|_| Error::DataError)?;
		}

		let body = body_writer.into_inner();
		let req = req.body(body.freeze());
		let resp = req.send()?;
		match resp.error_for_status_ref() {
			Ok(resp) => match resp.status() {
				reqwest::StatusCode::NO_CONTENT => Ok(()),
				_ => Err(Error::UnexpectedSuccessStatus),
			},
			Err(e) => Err(map_status(e)),
		}
	}

	/// Run an InfluxQL query and decode the JSON response.
	pub fn query(
			&self,
			database: &'_ str,
			q: &'_ str,
			) -> Result<QueryResponse, Error>
	{
		let req = self.client.get(self.query_url.clone());
		let req = self.auth.apply(req);
		let req = req.query(&[
			("db", database),
			("q", q),
		]);
		trace!("querying {}: {}", database, q);
		let resp = req.send()?;
		let resp = match resp.error_for_status() {
			Ok(resp) => resp,
			Err(e) => return Err(map_status(e)),
		};
		let body = resp.bytes()?;
		trace!("received {} bytes", body.len());
		QueryResponse::decode(&body[..])
	}
}
