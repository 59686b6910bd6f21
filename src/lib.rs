pub mod influxdb;
mod ioutil;
mod context;
mod error;
mod table;
mod merge;
mod filter;
mod timeseries;
mod progress;
mod source;
mod pipeline;

pub use ioutil::{magic_open, magic_create, find_csv};
pub use context::*;
pub use error::Error;
pub use table::*;
pub use merge::*;
pub use filter::*;
pub use timeseries::*;
pub use progress::*;
pub use source::*;
pub use pipeline::*;
