//! Typed registry values and their wire encoding.
//!
//! Every stored value is a raw type code plus a byte payload; this module
//! maps that pair onto strongly-typed Rust values. The payload layouts are
//! fixed and must stay bit-exact:
//!
//! - `String` (code 1): UTF-8 bytes followed by a single NUL
//! - `Binary` (code 3): raw bytes, length-preserving
//! - `U32` (code 4): 4-byte little-endian
//! - `MultiString` (code 7): each element as UTF-8 bytes plus NUL,
//!   concatenated, then one extra NUL as the end marker. An empty list is
//!   a single NUL; lists containing empty strings round-trip because the
//!   payload length disambiguates them from the marker.
//! - `U64` (code 11): 8-byte little-endian
//!
//! Any other code is carried as [`ValueType::Other`] and only reachable
//! through the raw accessors on `RegistryKey`.

use std::fmt;

/// Type tag of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
	/// NUL-terminated UTF-8 text
	String,
	/// 32-bit unsigned little-endian integer
	U32,
	/// 64-bit unsigned little-endian integer
	U64,
	/// Opaque bytes
	Binary,
	/// Sequence of NUL-terminated strings with a trailing end marker
	MultiString,
	/// A type code this crate has no typed accessor for
	Other(u32),
}

impl ValueType {
	/// Map a raw store type code onto a tag
	pub fn from_raw(code: u32) -> Self {
		match code {
			1 => ValueType::String,
			3 => ValueType::Binary,
			4 => ValueType::U32,
			7 => ValueType::MultiString,
			11 => ValueType::U64,
			other => ValueType::Other(other),
		}
	}

	/// The raw store type code for this tag
	pub fn raw(self) -> u32 {
		match self {
			ValueType::String => 1,
			ValueType::Binary => 3,
			ValueType::U32 => 4,
			ValueType::MultiString => 7,
			ValueType::U64 => 11,
			ValueType::Other(code) => code,
		}
	}
}

impl fmt::Display for ValueType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ValueType::String => write!(f, "string"),
			ValueType::U32 => write!(f, "u32"),
			ValueType::U64 => write!(f, "u64"),
			ValueType::Binary => write!(f, "binary"),
			ValueType::MultiString => write!(f, "multi-string"),
			ValueType::Other(code) => write!(f, "other({})", code),
		}
	}
}

/// A decoded registry value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
	String(String),
	U32(u32),
	U64(u64),
	Binary(Vec<u8>),
	MultiString(Vec<String>),
}

impl Value {
	/// The type tag this value is stored under
	pub fn value_type(&self) -> ValueType {
		match self {
			Value::String(_) => ValueType::String,
			Value::U32(_) => ValueType::U32,
			Value::U64(_) => ValueType::U64,
			Value::Binary(_) => ValueType::Binary,
			Value::MultiString(_) => ValueType::MultiString,
		}
	}

	/// Text payloads cannot contain NUL; it is the string terminator on
	/// the wire
	pub(crate) fn has_embedded_nul(&self) -> bool {
		match self {
			Value::String(s) => s.contains('\0'),
			Value::MultiString(items) => items.iter().any(|s| s.contains('\0')),
			_ => false,
		}
	}

	/// Marshal into the wire payload
	pub(crate) fn encode(&self) -> Vec<u8> {
		match self {
			Value::String(s) => {
				let mut data = Vec::with_capacity(s.len() + 1);
				data.extend_from_slice(s.as_bytes());
				data.push(0);
				data
			}
			Value::U32(n) => n.to_le_bytes().to_vec(),
			Value::U64(n) => n.to_le_bytes().to_vec(),
			Value::Binary(bytes) => bytes.clone(),
			Value::MultiString(items) => {
				let mut data = Vec::new();
				for item in items {
					data.extend_from_slice(item.as_bytes());
					data.push(0);
				}
				data.push(0);
				data
			}
		}
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl From<u32> for Value {
	fn from(n: u32) -> Self {
		Value::U32(n)
	}
}

impl From<u64> for Value {
	fn from(n: u64) -> Self {
		Value::U64(n)
	}
}

impl From<&[u8]> for Value {
	fn from(bytes: &[u8]) -> Self {
		Value::Binary(bytes.to_vec())
	}
}

impl From<Vec<u8>> for Value {
	fn from(bytes: Vec<u8>) -> Self {
		Value::Binary(bytes)
	}
}

impl From<Vec<String>> for Value {
	fn from(items: Vec<String>) -> Self {
		Value::MultiString(items)
	}
}

impl From<&[&str]> for Value {
	fn from(items: &[&str]) -> Self {
		Value::MultiString(items.iter().map(|s| s.to_string()).collect())
	}
}

/// Decode a NUL-terminated string payload.
///
/// A single trailing NUL is stripped when present; raw writers may omit it.
pub(crate) fn decode_string(data: &[u8]) -> Option<String> {
	let body = match data.split_last() {
		Some((0, body)) => body,
		_ => data,
	};
	if body.contains(&0) {
		return None;
	}
	String::from_utf8(body.to_vec()).ok()
}

pub(crate) fn decode_u32(data: &[u8]) -> Option<u32> {
	Some(u32::from_le_bytes(data.try_into().ok()?))
}

pub(crate) fn decode_u64(data: &[u8]) -> Option<u64> {
	Some(u64::from_le_bytes(data.try_into().ok()?))
}

/// Decode a multi-string payload; `None` when the end marker or an element
/// terminator is missing
pub(crate) fn decode_multi_string(data: &[u8]) -> Option<Vec<String>> {
	let (last, body) = data.split_last()?;
	if *last != 0 {
		return None;
	}
	if body.is_empty() {
		return Some(Vec::new());
	}
	let (last, items) = body.split_last()?;
	if *last != 0 {
		return None;
	}
	items
		.split(|b| *b == 0)
		.map(|chunk| String::from_utf8(chunk.to_vec()).ok())
		.collect()
}

// vim: ts=4
