//! An open registry key and its typed value operations.

use crate::error::{Error, Result};
use crate::hive::{Hive, RawHandle, Status};
use crate::storage::KEY_SEP;
use crate::value::{self, Value, ValueType};

/// One open, live handle to a registry key.
///
/// The handle exclusively owns its slot in the hive's handle table; it is
/// move-only and the slot is released when the value drops, on every exit
/// path. The access mode is fixed when the key is created or opened and
/// write-class operations on a read-only handle fail with
/// [`Error::AccessDenied`].
#[derive(Debug)]
pub struct RegistryKey<'h> {
	hive: &'h Hive,
	handle: RawHandle,
	path: String,
	writable: bool,
}

impl<'h> RegistryKey<'h> {
	pub(crate) fn new(hive: &'h Hive, handle: RawHandle, path: String, writable: bool) -> Self {
		Self { hive, handle, path, writable }
	}

	/// Display path of this key, root name included
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Whether the handle was opened with write access
	pub fn is_writable(&self) -> bool {
		self.writable
	}

	fn value_context(&self, name: &str) -> String {
		format!("{}{}{}", self.path, KEY_SEP, name)
	}

	/// Store a typed value under `name`, marshalling it into the wire
	/// payload for its type
	pub fn set_value(&self, name: &str, value: &Value) -> Result<()> {
		if value.has_embedded_nul() {
			return Err(Error::Operation {
				op: "set_value",
				path: self.value_context(name),
				status: Status::InvalidParameter.code(),
			});
		}

		let payload = value.encode();
		self.hive
			.set_value(self.handle, name, value.value_type().raw(), &payload)
			.map_err(|status| status.into_error("set_value", self.value_context(name)))
	}

	/// Convenience form of [`set_value`](Self::set_value) accepting anything
	/// convertible into a [`Value`]
	pub fn write_value(&self, name: &str, value: impl Into<Value>) -> Result<()> {
		self.set_value(name, &value.into())
	}

	/// Store a value bypassing the typed marshalling: a raw type code and
	/// an opaque payload
	pub fn write_raw_value(&self, name: &str, code: u32, payload: &[u8]) -> Result<()> {
		self.hive
			.set_value(self.handle, name, code, payload)
			.map_err(|status| status.into_error("write_raw_value", self.value_context(name)))
	}

	/// Fetch a value's stored type tag and undecoded payload
	pub fn read_raw_value(&self, name: &str) -> Result<(ValueType, Vec<u8>)> {
		let (code, payload) = self
			.hive
			.query_value(self.handle, name)
			.map_err(|status| status.into_error("read_raw_value", self.value_context(name)))?;
		Ok((ValueType::from_raw(code), payload))
	}

	/// Fetch a value's payload after checking its stored tag against the
	/// accessor's expectation
	fn read_typed(&self, op: &'static str, name: &str, expected: ValueType) -> Result<Vec<u8>> {
		let (code, payload) = self
			.hive
			.query_value(self.handle, name)
			.map_err(|status| status.into_error(op, self.value_context(name)))?;

		let found = ValueType::from_raw(code);
		if found != expected {
			return Err(Error::TypeMismatch { name: name.to_string(), expected, found });
		}

		Ok(payload)
	}

	fn malformed(&self, op: &'static str, name: &str) -> Error {
		Error::Operation {
			op,
			path: self.value_context(name),
			status: Status::MalformedData.code(),
		}
	}

	/// Read a string value
	pub fn read_string(&self, name: &str) -> Result<String> {
		let payload = self.read_typed("read_string", name, ValueType::String)?;
		value::decode_string(&payload).ok_or_else(|| self.malformed("read_string", name))
	}

	/// Read a 32-bit integer value
	pub fn read_u32(&self, name: &str) -> Result<u32> {
		let payload = self.read_typed("read_u32", name, ValueType::U32)?;
		value::decode_u32(&payload).ok_or_else(|| self.malformed("read_u32", name))
	}

	/// Read a 64-bit integer value
	pub fn read_u64(&self, name: &str) -> Result<u64> {
		let payload = self.read_typed("read_u64", name, ValueType::U64)?;
		value::decode_u64(&payload).ok_or_else(|| self.malformed("read_u64", name))
	}

	/// Read a binary value; the byte sequence is returned exactly as stored
	pub fn read_binary(&self, name: &str) -> Result<Vec<u8>> {
		self.read_typed("read_binary", name, ValueType::Binary)
	}

	/// Read a multi-string value
	pub fn read_multi_string(&self, name: &str) -> Result<Vec<String>> {
		let payload = self.read_typed("read_multi_string", name, ValueType::MultiString)?;
		value::decode_multi_string(&payload)
			.ok_or_else(|| self.malformed("read_multi_string", name))
	}

	/// Remove a named value
	pub fn delete_value(&self, name: &str) -> Result<()> {
		self.hive
			.delete_value(self.handle, name)
			.map_err(|status| status.into_error("delete_value", self.value_context(name)))
	}

	/// Enumerate the display names of this key's immediate children.
	///
	/// The iterator is lazy and non-restartable; dropping it (or breaking
	/// out of a `for` loop) stops the enumeration early. Order is
	/// implementation-defined.
	pub fn subkeys(&self) -> Subkeys<'_, 'h> {
		Subkeys { key: self, index: 0, done: false }
	}

	/// Enumerate this key's values as (display name, type tag) pairs, with
	/// the same laziness and early-termination contract as
	/// [`subkeys`](Self::subkeys). Payloads are fetched separately through
	/// the typed readers.
	pub fn values(&self) -> Values<'_, 'h> {
		Values { key: self, index: 0, done: false }
	}
}

impl Drop for RegistryKey<'_> {
	fn drop(&mut self) {
		self.hive.close_key(self.handle);
	}
}

/// Lazy subkey-name enumeration, driven by the hive's indexed protocol
pub struct Subkeys<'a, 'h> {
	key: &'a RegistryKey<'h>,
	index: u32,
	done: bool,
}

impl Iterator for Subkeys<'_, '_> {
	type Item = Result<String>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}
		match self.key.hive.enum_key(self.key.handle, self.index) {
			Ok(name) => {
				self.index += 1;
				Some(Ok(name))
			}
			Err(Status::NoMoreEntries) => {
				self.done = true;
				None
			}
			Err(status) => {
				self.done = true;
				Some(Err(status.into_error("enum_subkeys", self.key.path.clone())))
			}
		}
	}
}

/// Lazy value enumeration yielding (display name, type tag)
pub struct Values<'a, 'h> {
	key: &'a RegistryKey<'h>,
	index: u32,
	done: bool,
}

impl Iterator for Values<'_, '_> {
	type Item = Result<(String, ValueType)>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}
		match self.key.hive.enum_value(self.key.handle, self.index) {
			Ok((name, code)) => {
				self.index += 1;
				Some(Ok((name, ValueType::from_raw(code))))
			}
			Err(Status::NoMoreEntries) => {
				self.done = true;
				None
			}
			Err(status) => {
				self.done = true;
				Some(Err(status.into_error("enum_values", self.key.path.clone())))
			}
		}
	}
}

// vim: ts=4
