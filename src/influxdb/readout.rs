use std::io;

use smartstring::alias::{String as SmartString};

use chrono::{DateTime, Utc};


fn write_escaped<W: io::Write>(w: &mut W, s: &str, pat: &[char]) -> io::Result<()> {
	let mut prev = 0;
	for (idx, substr) in s.match_indices(pat) {
		w.write_all(&s.as_bytes()[prev..idx])?;
		w.write_all(&b"\\"[..])?;
		w.write_all(&substr.as_bytes()[..])?;
		prev = idx + substr.len();
	}
	if prev != s.len() {
		w.write_all(&s.as_bytes()[prev..])?;
	}
	Ok(())
}

fn write_name<W: io::Write>(w: &mut W, s: &str) -> io::Result<()> {
	write_escaped(w, s, &['\\', ',', ' ', '\t', '\n', '\r', '='])
}

fn write_measurement<W: io::Write>(w: &mut W, s: &str) -> io::Result<()> {
	write_escaped(w, s, &['\\', ',', ' ', '\t', '\n', '\r'])
}

fn write_str<W: io::Write>(w: &mut W, s: &str) -> io::Result<()> {
	w.write_all(&b"\""[..])?;
	write_escaped(w, s, &['\\', '"'])?;
	w.write_all(&b"\""[..])?;
	Ok(())
}

/// Timestamps are always written with second precision.
pub static PRECISION: &'static str = "s";

fn write_timestamp<W: io::Write>(w: &mut W, ts: &DateTime<Utc>) -> io::Result<()> {
	write!(w, "{}", ts.timestamp())
}


#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	Float(f64),
	Int(i64),
	Str(SmartString),
}

impl FieldValue {
	fn write<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
		match self {
			Self::Float(v) => write!(w, "{:?}", v),
			Self::Int(v) => write!(w, "{}i", v),
			Self::Str(v) => write_str(w, v),
		}
	}
}


/// One point: tag values and (possibly absent) field values, matching the
/// tag and field names of the enclosing readout.
#[derive(Debug, Clone)]
pub struct Sample {
	pub tagv: Vec<SmartString>,
	pub fieldv: Vec<Option<FieldValue>>,
}

/// All samples sharing one timestamp.
#[derive(Debug, Clone)]
pub struct Readout {
	pub ts: DateTime<Utc>,
	pub measurement: SmartString,
	pub tags: Vec<SmartString>,
	pub fields: Vec<SmartString>,
	pub samples: Vec<Sample>,
}

impl Readout {
	/// Serialize to line protocol. Absent fields are left out; a sample
	/// without any field is skipped entirely.
	pub fn write<W: io::Write>(&self, dest: &mut W) -> io::Result<()> {
		for sample in self.samples.iter() {
			if sample.fieldv.iter().all(|v| v.is_none()) {
				continue
			}
			write_measurement(dest, &self.measurement)?;
			for (k, v) in self.tags.iter().zip(sample.tagv.iter()) {
				dest.write_all(b",")?;
				write_name(dest, k)?;
				dest.write_all(b"=")?;
				write_name(dest, v)?;
			}
			let mut first = true;
			for (k, v) in self.fields.iter().zip(sample.fieldv.iter()) {
				let v = match v {
					Some(v) => v,
					None => continue,
				};
				dest.write_all(if first { b" " } else { b"," })?;
				write_name(dest, k)?;
				dest.write_all(b"=")?;
				v.write(dest)?;
				first = false;
			}
			dest.write_all(&b" "[..])?;
			write_timestamp(dest, &self.ts)?;
			dest.write_all(&b"\n"[..])?;
		}
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.samples.len()
	}
}
