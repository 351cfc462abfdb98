//! Factory operations for registry keys.
//!
//! Stateless free functions: they manufacture [`RegistryKey`] handles or act
//! on key paths directly, parameterized by the hive, a root, a path, and a
//! view selector.

use crate::error::{Error, Result};
use crate::hive::{Access, Hive};
use crate::key::RegistryKey;
use crate::storage::{self, KEY_SEP};
use crate::{RegistryView, RootKey};

/// Human-readable form of a (root, path) pair, used in errors
fn display_path(root: RootKey, path: &str) -> String {
	if path.is_empty() {
		root.as_str().to_string()
	} else {
		format!("{}{}{}", root.as_str(), KEY_SEP, path)
	}
}

/// Split a caller path and resolve the namespace-qualified root prefix
fn resolve<'a>(
	hive: &Hive,
	root: RootKey,
	path: &'a str,
	view: RegistryView,
) -> Result<(String, Vec<&'a str>)> {
	let segments =
		storage::parse_path(path).ok_or_else(|| Error::InvalidPath(display_path(root, path)))?;
	let ns_root = format!("{}{}{}", hive.namespace(view), KEY_SEP, root.prefix());
	Ok((ns_root, segments))
}

/// Create-or-open a key with read-write access, creating intermediate path
/// segments as needed. Idempotent: an existing key is simply opened.
///
/// Fails with [`Error::AccessDenied`] on a hive opened read-only.
pub fn create_key<'h>(
	hive: &'h Hive,
	root: RootKey,
	path: &str,
	view: RegistryView,
) -> Result<RegistryKey<'h>> {
	let (ns_root, segments) = resolve(hive, root, path, view)?;
	let handle = hive
		.create_key(&ns_root, &segments)
		.map_err(|status| status.into_error("create_key", display_path(root, path)))?;

	Ok(RegistryKey::new(hive, handle, display_path(root, path), true))
}

/// Open an existing key; never creates. Access is read-only unless
/// `write_access` is set, and cannot be upgraded later. Requesting write
/// access on a hive opened read-only fails with [`Error::AccessDenied`].
pub fn open_key<'h>(
	hive: &'h Hive,
	root: RootKey,
	path: &str,
	write_access: bool,
	view: RegistryView,
) -> Result<RegistryKey<'h>> {
	let (ns_root, segments) = resolve(hive, root, path, view)?;
	let canonical = storage::canonical_key(&ns_root, &segments);
	let access = if write_access { Access::ALL } else { Access::READ };

	let handle = hive
		.open_key(&canonical, access)
		.map_err(|status| status.into_error("open_key", display_path(root, path)))?;

	Ok(RegistryKey::new(hive, handle, display_path(root, path), write_access))
}

/// Delete a key and its values.
///
/// Non-recursive: a key that still has subkeys fails deterministically
/// (callers wanting recursion enumerate and delete children first).
/// Root namespaces themselves cannot be deleted, and a read-only hive
/// denies the operation. A missing key reports [`Error::KeyNotFound`],
/// which cleanup call sites may choose to ignore.
pub fn delete_key(hive: &Hive, root: RootKey, path: &str, view: RegistryView) -> Result<()> {
	let (ns_root, segments) = resolve(hive, root, path, view)?;
	if segments.is_empty() {
		return Err(Error::InvalidPath(display_path(root, path)));
	}

	let canonical = storage::canonical_key(&ns_root, &segments);
	hive.delete_key(&canonical)
		.map_err(|status| status.into_error("delete_key", display_path(root, path)))
}

/// Relocate a whole subtree: copy the key, its values and all descendants to
/// the destination, then remove the source.
///
/// The two phases are not atomic as a whole. The copy commits key-by-key, so
/// a failure partway leaves the destination holding a partial copy while the
/// source is unmodified; the subsequent source removal is a single store
/// transaction and either completes or leaves the source intact. The view
/// selector applies to both sides. Moving a root, or moving a key into its
/// own subtree, is rejected; a read-only hive denies the operation.
pub fn move_key(
	hive: &Hive,
	source_root: RootKey,
	source_path: &str,
	dest_root: RootKey,
	dest_path: &str,
	view: RegistryView,
) -> Result<()> {
	let (src_ns, src_segments) = resolve(hive, source_root, source_path, view)?;
	let (dst_ns, dst_segments) = resolve(hive, dest_root, dest_path, view)?;

	if src_segments.is_empty() {
		return Err(Error::InvalidPath(display_path(source_root, source_path)));
	}
	let Some((dst_name, dst_parent)) = dst_segments.split_last() else {
		return Err(Error::InvalidPath(display_path(dest_root, dest_path)));
	};

	let src = storage::canonical_key(&src_ns, &src_segments);
	let dst = storage::canonical_key(&dst_ns, &dst_segments);
	if dst == src || storage::descendant_suffix(&dst, &src).is_some() {
		return Err(Error::InvalidPath(display_path(dest_root, dest_path)));
	}

	// Verify the source before touching the destination side at all
	let probe = hive
		.open_key(&src, Access::READ)
		.map_err(|status| status.into_error("move_key", display_path(source_root, source_path)))?;
	hive.close_key(probe);

	// Destination ancestors come into being the same way create_key makes
	// intermediate segments
	let parent = hive
		.create_key(&dst_ns, dst_parent)
		.map_err(|status| status.into_error("move_key", display_path(dest_root, dest_path)))?;
	hive.close_key(parent);

	hive.copy_tree(&src, &dst, dst_name)
		.map_err(|status| status.into_error("move_key", display_path(dest_root, dest_path)))?;

	hive.delete_tree(&src)
		.map_err(|status| status.into_error("move_key", display_path(source_root, source_path)))
}

// vim: ts=4
