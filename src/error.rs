use std::fmt;

use crate::value::ValueType;

/// Registry access errors
#[derive(Debug)]
pub enum Error {
	/// The addressed key path does not exist
	KeyNotFound(String),

	/// The key path is malformed or not acceptable for the operation
	InvalidPath(String),

	/// The operation is not permitted on this handle or path
	AccessDenied(String),

	/// The named value does not exist under the key
	ValueNotFound(String),

	/// The stored value type differs from the requested accessor
	TypeMismatch { name: String, expected: ValueType, found: ValueType },

	/// A store operation failed; carries the raw status code for diagnostics
	Operation { op: &'static str, path: String, status: i32 },
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::KeyNotFound(path) => write!(f, "key not found: {}", path),
			Error::InvalidPath(path) => write!(f, "invalid key path: {}", path),
			Error::AccessDenied(what) => write!(f, "access denied: {}", what),
			Error::ValueNotFound(name) => write!(f, "value not found: {}", name),
			Error::TypeMismatch { name, expected, found } => {
				write!(f, "value {} has type {}, expected {}", name, found, expected)
			}
			Error::Operation { op, path, status } => {
				write!(f, "{} failed on {} (status {})", op, path, status)
			}
		}
	}
}

impl std::error::Error for Error {}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

// vim: ts=4
