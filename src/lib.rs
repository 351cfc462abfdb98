//! Typed, hierarchical, registry-style configuration store.
//!
//! Keys form a case-insensitive tree under a small set of well-known roots;
//! each key holds named, typed values (strings, 32/64-bit integers, binary
//! blobs, string arrays). The crate splits into two layers:
//!
//! - the **hive engine** ([`Hive`]): the persistent store, backed by redb,
//!   exposing an internal raw surface of integer handles, numeric status
//!   codes and untyped byte payloads;
//! - the **typed layer** ([`registry`] and [`RegistryKey`]): key lifecycle,
//!   value marshalling, enumeration, and error shaping on top of the raw
//!   surface.
//!
//! # Views
//!
//! A hive opened with view redirection keeps two parallel namespaces, one
//! per addressing width. Every operation takes a [`RegistryView`] selecting
//! the namespace: `Default` resolves to the hive's native width, `Force64` /
//! `Force32` pick one explicitly. Without redirection all three selectors
//! alias the single native namespace.
//!
//! # Storage Layout
//!
//! Two redb tables, keyed by canonical (lowercased, namespace-prefixed)
//! paths:
//! - `keys`: `64\hkcu\software\acme` -> display name of the last segment
//! - `values`: canonical path + `0x1F` + canonical value name ->
//!   (type code, display name, payload)
//!
//! # Example
//!
//! ```no_run
//! use regstore::{registry, Hive, RegistryView, RootKey};
//!
//! # fn main() -> regstore::Result<()> {
//! let hive = Hive::open("app.redb")?;
//!
//! let key = registry::create_key(
//! 	&hive,
//! 	RootKey::CurrentUser,
//! 	"Software\\Acme",
//! 	RegistryView::Default,
//! )?;
//! key.write_value("Version", 3u32)?;
//! assert_eq!(key.read_u32("Version")?, 3);
//!
//! for entry in key.values() {
//! 	let (name, value_type) = entry?;
//! 	println!("{} ({})", name, value_type);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

use std::fmt;

mod error;
mod hive;
mod key;
pub mod registry;
mod storage;
mod value;

pub use error::{Error, Result};
pub use hive::{Hive, HiveOptions};
pub use key::{RegistryKey, Subkeys, Values};
pub use value::{Value, ValueType};

/// Well-known root namespaces of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKey {
	ClassesRoot,
	CurrentUser,
	LocalMachine,
	Users,
	CurrentConfig,
}

impl RootKey {
	pub(crate) const ALL: [RootKey; 5] = [
		RootKey::ClassesRoot,
		RootKey::CurrentUser,
		RootKey::LocalMachine,
		RootKey::Users,
		RootKey::CurrentConfig,
	];

	/// Canonical storage prefix of this root
	pub(crate) fn prefix(self) -> &'static str {
		match self {
			RootKey::ClassesRoot => "hkcr",
			RootKey::CurrentUser => "hkcu",
			RootKey::LocalMachine => "hklm",
			RootKey::Users => "hku",
			RootKey::CurrentConfig => "hkcc",
		}
	}

	/// Display name of this root
	pub fn as_str(self) -> &'static str {
		match self {
			RootKey::ClassesRoot => "HKEY_CLASSES_ROOT",
			RootKey::CurrentUser => "HKEY_CURRENT_USER",
			RootKey::LocalMachine => "HKEY_LOCAL_MACHINE",
			RootKey::Users => "HKEY_USERS",
			RootKey::CurrentConfig => "HKEY_CURRENT_CONFIG",
		}
	}
}

impl fmt::Display for RootKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Which parallel namespace an operation targets.
///
/// Supplied per call and never stored; on a hive without view redirection
/// every selector behaves like `Default`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistryView {
	/// The hive's native addressing width
	#[default]
	Default,
	/// The 64-bit namespace, regardless of native width
	Force64,
	/// The 32-bit namespace, regardless of native width
	Force32,
}

// vim: ts=4
