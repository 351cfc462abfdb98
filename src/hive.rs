//! The hive engine: an opened store file and its raw operation surface.
//!
//! The raw surface is deliberately narrow and untyped — integer handles,
//! numeric status codes, byte payloads, index-based enumeration. The typed
//! layer in `key`/`registry` is the only consumer and does all marshalling
//! and error shaping on top of it.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use redb::{ReadableDatabase, ReadableTable};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::storage::{
	self, KEY_SEP, MAX_KEY_PATH, TABLE_KEYS, TABLE_VALUES, VALUE_SEP,
};
use crate::{RegistryView, RootKey};

/// Raw status codes reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub(crate) enum Status {
	InvalidHandle = -1,
	InvalidParameter = -2,
	KeyNotFound = -3,
	ValueNotFound = -4,
	AccessDenied = -5,
	KeyHasSubkeys = -6,
	NoMoreEntries = -7,
	PathTooLong = -8,
	MalformedData = -9,
	StoreFailure = -10,
}

impl Status {
	pub(crate) fn code(self) -> i32 {
		self as i32
	}

	/// Shape a raw status into the caller-facing error, attaching the
	/// operation and the path or value context it failed on
	pub(crate) fn into_error(self, op: &'static str, context: String) -> Error {
		match self {
			Status::KeyNotFound => Error::KeyNotFound(context),
			Status::ValueNotFound => Error::ValueNotFound(context),
			Status::AccessDenied => Error::AccessDenied(context),
			Status::PathTooLong => Error::InvalidPath(context),
			other => Error::Operation { op, path: context, status: other.code() },
		}
	}
}

bitflags::bitflags! {
	/// Access rights attached to an open handle
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub(crate) struct Access: u32 {
		const QUERY_VALUE = 0x0001;
		const SET_VALUE = 0x0002;
		const CREATE_SUB_KEY = 0x0004;
		const ENUMERATE_SUB_KEYS = 0x0008;

		const READ = Self::QUERY_VALUE.bits() | Self::ENUMERATE_SUB_KEYS.bits();
		const WRITE = Self::SET_VALUE.bits() | Self::CREATE_SUB_KEY.bits();
		const ALL = Self::READ.bits() | Self::WRITE.bits();
	}
}

/// Opaque id of an entry in the hive's handle table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawHandle(u32);

/// State recorded for one open key handle
#[derive(Clone)]
struct OpenKey {
	canonical: String,
	access: Access,
}

/// Hive configuration
#[derive(Debug, Clone)]
pub struct HiveOptions {
	/// Maintain parallel 64-bit and 32-bit namespaces. When disabled every
	/// view selector resolves to the single native namespace.
	pub view_redirection: bool,

	/// Namespace that [`RegistryView::Default`] resolves to
	pub native_64bit: bool,

	/// Deny every mutating operation. Keys can only be opened for reading;
	/// creation, deletion, moves and write-access handles fail with an
	/// access-denied status.
	pub read_only: bool,
}

impl Default for HiveOptions {
	fn default() -> Self {
		Self { view_redirection: true, native_64bit: true, read_only: false }
	}
}

/// An opened hive file.
///
/// All registry operations are parameterized by a `&Hive`. The hive is
/// `Send + Sync`; individual key handles are not synchronized and must be
/// serialized by their owner.
pub struct Hive {
	db: redb::Database,
	options: HiveOptions,
	handles: Mutex<HashMap<u32, OpenKey>>,
	next_handle: AtomicU32,
}

impl fmt::Debug for Hive {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hive").field("options", &self.options).finish_non_exhaustive()
	}
}

/// Log-and-degrade mapping for redb failures; the raw surface only ever
/// reports a status code
fn store_failure<E: fmt::Display>(err: E) -> Status {
	warn!("store failure: {}", err);
	Status::StoreFailure
}

impl Hive {
	/// Open or create a hive file with default options
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		Self::open_with(path, HiveOptions::default())
	}

	/// Open or create a hive file
	pub fn open_with(path: impl AsRef<Path>, options: HiveOptions) -> Result<Self> {
		let path = path.as_ref();

		let open_error = |status: Status| Error::Operation {
			op: "open_hive",
			path: path.display().to_string(),
			status: status.code(),
		};

		let db = if path.exists() {
			redb::Database::open(path)
		} else {
			redb::Database::create(path)
		}
		.map_err(|err| open_error(store_failure(err)))?;

		let hive = Self {
			db,
			options,
			handles: Mutex::new(HashMap::new()),
			next_handle: AtomicU32::new(1),
		};

		// A read-only hive never writes, root seeding included; it relies on
		// the rows a previous writable open left behind
		if !hive.options.read_only {
			hive.seed_roots().map_err(open_error)?;
		}
		debug!("opened hive at {:?}", path);

		Ok(hive)
	}

	/// Make sure every (namespace, root) pair has its key row, so opening a
	/// root with an empty path always succeeds
	fn seed_roots(&self) -> std::result::Result<(), Status> {
		let tx = self.db.begin_write().map_err(store_failure)?;
		{
			let mut keys = tx.open_table(TABLE_KEYS).map_err(store_failure)?;
			let _ = tx.open_table(TABLE_VALUES).map_err(store_failure)?;

			for ns in ["64", "32"] {
				for root in RootKey::ALL {
					let canonical = format!("{}{}{}", ns, KEY_SEP, root.prefix());
					if keys.get(canonical.as_str()).map_err(store_failure)?.is_none() {
						keys.insert(canonical.as_str(), root.as_str()).map_err(store_failure)?;
					}
				}
			}
		}
		tx.commit().map_err(store_failure)?;

		Ok(())
	}

	/// Resolve a view selector to a namespace prefix
	pub(crate) fn namespace(&self, view: RegistryView) -> &'static str {
		let native = if self.options.native_64bit { "64" } else { "32" };
		if !self.options.view_redirection {
			return native;
		}
		match view {
			RegistryView::Default => native,
			RegistryView::Force64 => "64",
			RegistryView::Force32 => "32",
		}
	}

	fn alloc_handle(&self, canonical: String, access: Access) -> RawHandle {
		let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
		self.handles.lock().insert(id, OpenKey { canonical, access });
		RawHandle(id)
	}

	/// Look up a handle and verify it grants the required rights
	fn handle_state(
		&self,
		handle: RawHandle,
		required: Access,
	) -> std::result::Result<OpenKey, Status> {
		let handles = self.handles.lock();
		let state = handles.get(&handle.0).ok_or(Status::InvalidHandle)?;
		if !state.access.contains(required) {
			return Err(Status::AccessDenied);
		}
		Ok(state.clone())
	}

	/// Release a handle. Idempotent; unknown ids are ignored.
	pub(crate) fn close_key(&self, handle: RawHandle) {
		self.handles.lock().remove(&handle.0);
	}

	/// Create-or-open a key, creating intermediate segments as needed.
	/// The returned handle has full access; a read-only hive denies the
	/// operation.
	pub(crate) fn create_key(
		&self,
		ns_root: &str,
		segments: &[&str],
	) -> std::result::Result<RawHandle, Status> {
		if self.options.read_only {
			return Err(Status::AccessDenied);
		}

		let full = storage::canonical_key(ns_root, segments);
		if full.chars().count() > MAX_KEY_PATH {
			return Err(Status::PathTooLong);
		}

		let tx = self.db.begin_write().map_err(store_failure)?;
		{
			let mut keys = tx.open_table(TABLE_KEYS).map_err(store_failure)?;

			let mut canonical = ns_root.to_string();
			for segment in segments {
				canonical.push(KEY_SEP);
				for ch in segment.chars() {
					canonical.push(ch.to_ascii_lowercase());
				}
				if keys.get(canonical.as_str()).map_err(store_failure)?.is_none() {
					keys.insert(canonical.as_str(), *segment).map_err(store_failure)?;
				}
			}
		}
		tx.commit().map_err(store_failure)?;

		debug!("created key {}", full);
		Ok(self.alloc_handle(full, Access::ALL))
	}

	/// Open an existing key; never creates. Write-class access is denied on
	/// a read-only hive.
	pub(crate) fn open_key(
		&self,
		canonical: &str,
		access: Access,
	) -> std::result::Result<RawHandle, Status> {
		if self.options.read_only && access.intersects(Access::WRITE) {
			return Err(Status::AccessDenied);
		}

		let tx = self.db.begin_read().map_err(store_failure)?;
		let keys = tx.open_table(TABLE_KEYS).map_err(store_failure)?;
		if keys.get(canonical).map_err(store_failure)?.is_none() {
			return Err(Status::KeyNotFound);
		}

		Ok(self.alloc_handle(canonical.to_string(), access))
	}

	/// Delete a single key. Fails with `KeyHasSubkeys` when children exist;
	/// the key's own values are removed with it.
	pub(crate) fn delete_key(&self, canonical: &str) -> std::result::Result<(), Status> {
		if self.options.read_only {
			return Err(Status::AccessDenied);
		}

		let tx = self.db.begin_write().map_err(store_failure)?;
		{
			let mut keys = tx.open_table(TABLE_KEYS).map_err(store_failure)?;

			if keys.get(canonical).map_err(store_failure)?.is_none() {
				return Err(Status::KeyNotFound);
			}

			let child_prefix = format!("{}{}", canonical, KEY_SEP);
			let mut range = keys.range(child_prefix.as_str()..).map_err(store_failure)?;
			if let Some(item) = range.next() {
				let (row, _) = item.map_err(store_failure)?;
				if row.value().starts_with(&child_prefix) {
					return Err(Status::KeyHasSubkeys);
				}
			}
			drop(range);

			keys.remove(canonical).map_err(store_failure)?;

			let mut values = tx.open_table(TABLE_VALUES).map_err(store_failure)?;
			for row in collect_value_rows(&values, canonical)? {
				values.remove(row.as_str()).map_err(store_failure)?;
			}
		}
		tx.commit().map_err(store_failure)?;

		debug!("deleted key {}", canonical);
		Ok(())
	}

	/// Store a value as a raw (type code, payload) pair
	pub(crate) fn set_value(
		&self,
		handle: RawHandle,
		name: &str,
		code: u32,
		payload: &[u8],
	) -> std::result::Result<(), Status> {
		if !storage::valid_name(name) {
			return Err(Status::InvalidParameter);
		}
		let state = self.handle_state(handle, Access::SET_VALUE)?;

		let tx = self.db.begin_write().map_err(store_failure)?;
		{
			let keys = tx.open_table(TABLE_KEYS).map_err(store_failure)?;
			if keys.get(state.canonical.as_str()).map_err(store_failure)?.is_none() {
				// The key was deleted out from under this handle
				return Err(Status::KeyNotFound);
			}

			let mut values = tx.open_table(TABLE_VALUES).map_err(store_failure)?;
			let row = storage::value_row_key(&state.canonical, name);
			values.insert(row.as_str(), (code, name, payload)).map_err(store_failure)?;
		}
		tx.commit().map_err(store_failure)?;

		Ok(())
	}

	/// Fetch a value as a raw (type code, payload) pair
	pub(crate) fn query_value(
		&self,
		handle: RawHandle,
		name: &str,
	) -> std::result::Result<(u32, Vec<u8>), Status> {
		let state = self.handle_state(handle, Access::QUERY_VALUE)?;

		let tx = self.db.begin_read().map_err(store_failure)?;
		let values = tx.open_table(TABLE_VALUES).map_err(store_failure)?;
		let row = storage::value_row_key(&state.canonical, name);
		match values.get(row.as_str()).map_err(store_failure)? {
			Some(guard) => {
				let (code, _, payload) = guard.value();
				Ok((code, payload.to_vec()))
			}
			None => Err(Status::ValueNotFound),
		}
	}

	/// Remove a named value
	pub(crate) fn delete_value(
		&self,
		handle: RawHandle,
		name: &str,
	) -> std::result::Result<(), Status> {
		let state = self.handle_state(handle, Access::SET_VALUE)?;

		let tx = self.db.begin_write().map_err(store_failure)?;
		let removed = {
			let mut values = tx.open_table(TABLE_VALUES).map_err(store_failure)?;
			let row = storage::value_row_key(&state.canonical, name);
			values.remove(row.as_str()).map_err(store_failure)?.is_some()
		};
		tx.commit().map_err(store_failure)?;

		if removed { Ok(()) } else { Err(Status::ValueNotFound) }
	}

	/// Indexed subkey enumeration: display name of the child at `index`,
	/// `NoMoreEntries` once exhausted
	pub(crate) fn enum_key(
		&self,
		handle: RawHandle,
		index: u32,
	) -> std::result::Result<String, Status> {
		let state = self.handle_state(handle, Access::ENUMERATE_SUB_KEYS)?;

		let tx = self.db.begin_read().map_err(store_failure)?;
		let keys = tx.open_table(TABLE_KEYS).map_err(store_failure)?;

		let prefix = format!("{}{}", state.canonical, KEY_SEP);
		let mut seen = 0u32;
		for item in keys.range(prefix.as_str()..).map_err(store_failure)? {
			let (row, display) = item.map_err(store_failure)?;
			let row = row.value();
			if !row.starts_with(&prefix) {
				break;
			}
			if storage::is_direct_child(&row[prefix.len()..]) {
				if seen == index {
					return Ok(display.value().to_string());
				}
				seen += 1;
			}
		}

		Err(Status::NoMoreEntries)
	}

	/// Indexed value enumeration: (display name, type code) of the value at
	/// `index`, `NoMoreEntries` once exhausted
	pub(crate) fn enum_value(
		&self,
		handle: RawHandle,
		index: u32,
	) -> std::result::Result<(String, u32), Status> {
		let state = self.handle_state(handle, Access::QUERY_VALUE)?;

		let tx = self.db.begin_read().map_err(store_failure)?;
		let values = tx.open_table(TABLE_VALUES).map_err(store_failure)?;

		let prefix = format!("{}{}", state.canonical, VALUE_SEP);
		let mut seen = 0u32;
		for item in values.range(prefix.as_str()..).map_err(store_failure)? {
			let (row, entry) = item.map_err(store_failure)?;
			if !row.value().starts_with(&prefix) {
				break;
			}
			if seen == index {
				let (code, display, _) = entry.value();
				return Ok((display.to_string(), code));
			}
			seen += 1;
		}

		Err(Status::NoMoreEntries)
	}

	/// Copy a whole subtree to a new location, creating or merging into the
	/// destination.
	///
	/// Each key is committed together with its values, one store transaction
	/// per key, parents before children. A failure partway through leaves the
	/// destination holding the keys committed so far; the source is never
	/// touched.
	pub(crate) fn copy_tree(
		&self,
		src: &str,
		dst: &str,
		dst_display: &str,
	) -> std::result::Result<(), Status> {
		if self.options.read_only {
			return Err(Status::AccessDenied);
		}

		let (subtree, values) = self.collect_subtree(src)?;

		for (suffix, display) in &subtree {
			let target = format!("{}{}", dst, suffix);
			if target.chars().count() > MAX_KEY_PATH {
				return Err(Status::PathTooLong);
			}
			let display = if suffix.is_empty() { dst_display } else { display.as_str() };

			let tx = self.db.begin_write().map_err(store_failure)?;
			{
				let mut keys = tx.open_table(TABLE_KEYS).map_err(store_failure)?;
				keys.insert(target.as_str(), display).map_err(store_failure)?;

				let mut table = tx.open_table(TABLE_VALUES).map_err(store_failure)?;
				for (value_suffix, code, name, payload) in &values {
					let owner = match value_suffix.split_once(VALUE_SEP) {
						Some((owner, _)) => owner,
						None => continue,
					};
					if owner == suffix {
						let row = format!("{}{}", dst, value_suffix);
						table
							.insert(row.as_str(), (*code, name.as_str(), payload.as_slice()))
							.map_err(store_failure)?;
					}
				}
			}
			tx.commit().map_err(store_failure)?;
		}

		debug!("copied tree {} -> {}", src, dst);
		Ok(())
	}

	/// Remove a key and its whole subtree in a single store transaction:
	/// the source either disappears completely or stays intact
	pub(crate) fn delete_tree(&self, canonical: &str) -> std::result::Result<(), Status> {
		if self.options.read_only {
			return Err(Status::AccessDenied);
		}

		let (subtree, values) = self.collect_subtree(canonical)?;

		let tx = self.db.begin_write().map_err(store_failure)?;
		{
			let mut keys = tx.open_table(TABLE_KEYS).map_err(store_failure)?;
			for (suffix, _) in &subtree {
				let row = format!("{}{}", canonical, suffix);
				keys.remove(row.as_str()).map_err(store_failure)?;
			}

			let mut table = tx.open_table(TABLE_VALUES).map_err(store_failure)?;
			for (value_suffix, ..) in &values {
				let row = format!("{}{}", canonical, value_suffix);
				table.remove(row.as_str()).map_err(store_failure)?;
			}
		}
		tx.commit().map_err(store_failure)?;

		debug!("deleted tree {}", canonical);
		Ok(())
	}

	/// Snapshot a subtree: key rows as (suffix, display) with parents first,
	/// and value rows as (row suffix, code, display name, payload). The root
	/// key itself appears with an empty suffix.
	#[allow(clippy::type_complexity)]
	fn collect_subtree(
		&self,
		src: &str,
	) -> std::result::Result<(Vec<(String, String)>, Vec<(String, u32, String, Vec<u8>)>), Status>
	{
		let tx = self.db.begin_read().map_err(store_failure)?;
		let keys = tx.open_table(TABLE_KEYS).map_err(store_failure)?;

		let mut subtree = Vec::new();
		match keys.get(src).map_err(store_failure)? {
			Some(display) => subtree.push((String::new(), display.value().to_string())),
			None => return Err(Status::KeyNotFound),
		}

		let child_prefix = format!("{}{}", src, KEY_SEP);
		for item in keys.range(child_prefix.as_str()..).map_err(store_failure)? {
			let (row, display) = item.map_err(store_failure)?;
			let row = row.value();
			if !row.starts_with(&child_prefix) {
				break;
			}
			subtree.push((row[src.len()..].to_string(), display.value().to_string()));
		}

		let values_table = tx.open_table(TABLE_VALUES).map_err(store_failure)?;
		let mut values = Vec::new();

		// The source key's own value rows and its descendants' value rows
		// form two separate contiguous ranges (0x1F sorts below the key
		// separator), so they are gathered with two scans.
		for prefix in [format!("{}{}", src, VALUE_SEP), child_prefix] {
			for item in values_table.range(prefix.as_str()..).map_err(store_failure)? {
				let (row, entry) = item.map_err(store_failure)?;
				let row = row.value();
				if !row.starts_with(&prefix) {
					break;
				}
				let (code, name, payload) = entry.value();
				values.push((
					row[src.len()..].to_string(),
					code,
					name.to_string(),
					payload.to_vec(),
				));
			}
		}

		Ok((subtree, values))
	}
}

/// Collect the value-row keys belonging to exactly one key
fn collect_value_rows<T>(values: &T, canonical: &str) -> std::result::Result<Vec<String>, Status>
where
	T: ReadableTable<&'static str, (u32, &'static str, &'static [u8])>,
{
	let prefix = format!("{}{}", canonical, VALUE_SEP);
	let mut rows = Vec::new();
	for item in values.range(prefix.as_str()..).map_err(store_failure)? {
		let (row, _) = item.map_err(store_failure)?;
		let row = row.value();
		if !row.starts_with(&prefix) {
			break;
		}
		rows.push(row.to_string());
	}
	Ok(rows)
}

// vim: ts=4
