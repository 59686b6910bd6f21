use std::io;
use std::io::{Read, Write};
use std::fs;
use std::path::{Path, PathBuf};

use flate2;


fn is_gzip(path: &Path) -> bool {
	match path.extension() {
		Some(x) => x == "gz",
		None => false,
	}
}

pub fn magic_open<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Read>> {
	let path = path.as_ref();
	if is_gzip(path) {
		Ok(Box::new(flate2::read::GzDecoder::new(fs::File::open(path)?)))
	} else {
		Ok(Box::new(fs::File::open(path)?))
	}
}

pub fn magic_create<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Write>> {
	let path = path.as_ref();
	let f = io::BufWriter::new(fs::File::create(path)?);
	if is_gzip(path) {
		Ok(Box::new(flate2::write::GzEncoder::new(f, flate2::Compression::default())))
	} else {
		Ok(Box::new(f))
	}
}

/// Locate `<dir>/<stem>.csv`, falling back to `<dir>/<stem>.csv.gz`. The
/// plain name is returned if neither exists.
pub fn find_csv<P: AsRef<Path>>(dir: P, stem: &str) -> PathBuf {
	let dir = dir.as_ref();
	let plain = dir.join(format!("{}.csv", stem));
	if plain.exists() {
		return plain
	}
	let gz = dir.join(format!("{}.csv.gz", stem));
	if gz.exists() {
		return gz
	}
	plain
}
