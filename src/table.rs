use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use smartstring::alias::{String as SmartString};

use chrono::NaiveDate;

use super::error::Error;


static NULL_TOKENS: &[&str] = &[
	"", "NA", "N/A", "NaN", "nan", "NULL", "null", "None", "#N/A", "<NA>",
];


#[derive(Debug, Clone)]
pub enum Value {
	Null,
	Int(i64),
	Float(f64),
	Date(NaiveDate),
	Str(SmartString),
}

impl Value {
	/// Interpret one delimited-text cell.
	pub fn parse(s: &str) -> Self {
		let s = s.trim();
		if NULL_TOKENS.contains(&s) {
			return Self::Null
		}
		if let Ok(v) = s.parse::<i64>() {
			return Self::Int(v)
		}
		if let Ok(v) = s.parse::<f64>() {
			return Self::Float(v)
		}
		if let Ok(v) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
			return Self::Date(v)
		}
		Self::Str(s.into())
	}

	#[inline(always)]
	pub fn is_null(&self) -> bool {
		match self {
			Self::Null => true,
			_ => false,
		}
	}

	pub fn as_date(&self) -> Option<NaiveDate> {
		match self {
			Self::Date(d) => Some(*d),
			_ => None,
		}
	}

	// -0.0 and 0.0 must hash identically
	fn float_bits(v: f64) -> u64 {
		if v == 0.0 {
			0
		} else {
			v.to_bits()
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Int(a), Self::Int(b)) => a == b,
			(Self::Float(a), Self::Float(b)) => Self::float_bits(*a) == Self::float_bits(*b),
			(Self::Date(a), Self::Date(b)) => a == b,
			(Self::Str(a), Self::Str(b)) => a == b,
			_ => false,
		}
	}
}

impl Eq for Value {}

impl Hash for Value {
	fn hash<H: Hasher>(&self, state: &mut H) {
		match self {
			Self::Null => 0u8.hash(state),
			Self::Int(v) => {
				1u8.hash(state);
				v.hash(state);
			},
			Self::Float(v) => {
				2u8.hash(state);
				Self::float_bits(*v).hash(state);
			},
			Self::Date(v) => {
				3u8.hash(state);
				v.hash(state);
			},
			Self::Str(v) => {
				4u8.hash(state);
				v.hash(state);
			},
		}
	}
}

impl fmt::Display for Value {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Null => Ok(()),
			Self::Int(v) => write!(f, "{}", v),
			Self::Float(v) => write!(f, "{:?}", v),
			Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
			Self::Str(v) => f.write_str(v),
		}
	}
}

impl From<&str> for Value {
	fn from(other: &str) -> Self {
		Self::Str(other.into())
	}
}

impl From<i64> for Value {
	fn from(other: i64) -> Self {
		Self::Int(other)
	}
}

impl From<f64> for Value {
	fn from(other: f64) -> Self {
		Self::Float(other)
	}
}

impl From<NaiveDate> for Value {
	fn from(other: NaiveDate) -> Self {
		Self::Date(other)
	}
}


/// Row-major table with named columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
	columns: Vec<SmartString>,
	rows: Vec<Vec<Value>>,
}

impl Table {
	pub fn new<S: Into<SmartString>, I: IntoIterator<Item = S>>(columns: I) -> Self {
		Self{
			columns: columns.into_iter().map(|c| c.into()).collect(),
			rows: Vec::new(),
		}
	}

	pub fn from_rows<S: Into<SmartString>, I: IntoIterator<Item = S>>(columns: I, rows: Vec<Vec<Value>>) -> Self {
		let mut result = Self::new(columns);
		for row in rows {
			result.push_row(row);
		}
		result
	}

	#[inline(always)]
	pub fn columns(&self) -> &[SmartString] {
		&self.columns
	}

	#[inline(always)]
	pub fn rows(&self) -> &[Vec<Value>] {
		&self.rows
	}

	#[inline(always)]
	pub fn len(&self) -> usize {
		self.rows.len()
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	#[inline(always)]
	pub fn width(&self) -> usize {
		self.columns.len()
	}

	pub fn into_parts(self) -> (Vec<SmartString>, Vec<Vec<Value>>) {
		(self.columns, self.rows)
	}

	pub fn push_row(&mut self, row: Vec<Value>) {
		assert_eq!(row.len(), self.columns.len());
		self.rows.push(row);
	}

	pub fn extend_rows<I: IntoIterator<Item = Vec<Value>>>(&mut self, rows: I) {
		for row in rows {
			self.push_row(row);
		}
	}

	pub fn column_index(&self, name: &str) -> Option<usize> {
		self.columns.iter().position(|c| c.as_str() == name)
	}

	pub fn has_column(&self, name: &str) -> bool {
		self.column_index(name).is_some()
	}

	pub fn require_column(&self, name: &str) -> Result<usize, Error> {
		self.column_index(name).ok_or_else(|| Error::missing_column(name))
	}

	pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
		let i = self.column_index(column)?;
		self.rows.get(row).map(|r| &r[i])
	}

	pub fn column_values<'x>(&'x self, index: usize) -> impl Iterator<Item = &'x Value> + 'x {
		self.rows.iter().map(move |r| &r[index])
	}

	pub fn non_null_count(&self, index: usize) -> usize {
		self.column_values(index).filter(|v| !v.is_null()).count()
	}

	/// Keep the columns for which `f(index, name)` holds, preserving order.
	pub fn retain_columns<F: FnMut(usize, &str) -> bool>(&mut self, mut f: F) {
		let keep: Vec<bool> = self.columns.iter().enumerate().map(|(i, c)| f(i, c.as_str())).collect();
		if keep.iter().all(|k| *k) {
			return
		}
		let mut keep_iter = keep.iter();
		self.columns.retain(|_| *keep_iter.next().unwrap());
		for row in self.rows.iter_mut() {
			let mut keep_iter = keep.iter();
			row.retain(|_| *keep_iter.next().unwrap());
		}
	}

	pub fn retain_rows<F: FnMut(&[Value]) -> bool>(&mut self, mut f: F) {
		self.rows.retain(|r| f(&r[..]));
	}

	/// Drop every listed column present in the table. Returns how many were
	/// dropped.
	pub fn drop_columns(&mut self, names: &[&str]) -> usize {
		let before = self.columns.len();
		self.retain_columns(|_, c| !names.contains(&c));
		before - self.columns.len()
	}

	pub fn fill_null(&mut self, column: &str, value: Value) -> Result<usize, Error> {
		let index = self.require_column(column)?;
		let mut n = 0;
		for row in self.rows.iter_mut() {
			if row[index].is_null() {
				row[index] = value.clone();
				n += 1;
			}
		}
		Ok(n)
	}

	/// Move the named columns to the front, in the given order.
	pub fn reorder_front(&mut self, names: &[&str]) -> Result<(), Error> {
		let mut order = Vec::with_capacity(self.columns.len());
		for name in names {
			order.push(self.require_column(name)?);
		}
		for i in 0..self.columns.len() {
			if !order.contains(&i) {
				order.push(i);
			}
		}
		if order.iter().enumerate().all(|(i, j)| i == *j) {
			return Ok(())
		}
		self.columns = order.iter().map(|i| self.columns[*i].clone()).collect();
		for row in self.rows.iter_mut() {
			let mut old = std::mem::replace(row, Vec::with_capacity(order.len()));
			for i in order.iter() {
				row.push(std::mem::replace(&mut old[*i], Value::Null));
			}
		}
		Ok(())
	}
}


/// Drop columns which hold no value at all, then collapse exact duplicate
/// rows onto their first occurrence.
pub fn clean(mut table: Table) -> Table {
	let populated: Vec<bool> = (0..table.width()).map(|i| table.non_null_count(i) > 0).collect();
	table.retain_columns(|i, _| populated[i]);

	let mut seen: HashSet<Vec<Value>> = HashSet::with_capacity(table.len());
	let rows = std::mem::replace(&mut table.rows, Vec::new());
	for row in rows {
		if seen.contains(&row) {
			continue
		}
		seen.insert(row.clone());
		table.rows.push(row);
	}
	table
}
