//! Storage layout and canonical-path helpers.
//!
//! Keys and values live in two redb tables keyed by *canonical paths*:
//! lowercased, namespace-prefixed strings such as `64\hkcu\software\acme`.
//! The original segment casing is kept as the row payload so enumeration can
//! report display names while lookups stay case-insensitive.

use redb::TableDefinition;

/// Key table: canonical path -> display name of the last segment
pub(crate) const TABLE_KEYS: TableDefinition<&str, &str> = TableDefinition::new("keys");

/// Value table: canonical path + `VALUE_SEP` + canonical value name ->
/// (raw type code, display name, payload)
pub(crate) const TABLE_VALUES: TableDefinition<&str, (u32, &str, &[u8])> =
	TableDefinition::new("values");

/// Separator between key path segments
pub(crate) const KEY_SEP: char = '\\';

/// Separator between a canonical key path and a value name in `TABLE_VALUES`.
/// 0x1F sorts below every character allowed in names, so one key's value rows
/// form a contiguous range.
pub(crate) const VALUE_SEP: char = '\u{1f}';

/// Upper bound on a canonical key path, in characters
pub(crate) const MAX_KEY_PATH: usize = 512;

/// Upper bound on a single key segment or value name, in characters
pub(crate) const MAX_NAME: usize = 255;

/// Split a caller-supplied key path into its segments.
///
/// An empty path addresses the root itself and yields no segments. Returns
/// `None` when any segment is empty (doubled or leading/trailing separators)
/// or fails [`valid_name`].
pub(crate) fn parse_path(path: &str) -> Option<Vec<&str>> {
	if path.is_empty() {
		return Some(Vec::new());
	}

	let mut segments = Vec::new();
	for segment in path.split(KEY_SEP) {
		if segment.is_empty() || !valid_name(segment) {
			return None;
		}
		segments.push(segment);
	}

	Some(segments)
}

/// Check a key segment or value name against the engine's naming rules
pub(crate) fn valid_name(name: &str) -> bool {
	name.chars().count() <= MAX_NAME && !name.contains(['\0', VALUE_SEP])
}

/// Build the canonical storage path for a key under a namespace root
/// (e.g. `64\hkcu`)
pub(crate) fn canonical_key(ns_root: &str, segments: &[&str]) -> String {
	let mut key = String::with_capacity(ns_root.len() + segments.len() * 8);
	key.push_str(ns_root);
	for segment in segments {
		key.push(KEY_SEP);
		for ch in segment.chars() {
			key.push(ch.to_ascii_lowercase());
		}
	}
	key
}

/// Build the row key addressing a named value under a canonical key path
pub(crate) fn value_row_key(canonical: &str, name: &str) -> String {
	let mut key = String::with_capacity(canonical.len() + 1 + name.len());
	key.push_str(canonical);
	key.push(VALUE_SEP);
	for ch in name.chars() {
		key.push(ch.to_ascii_lowercase());
	}
	key
}

/// Return the path of `full` relative to `parent`, if `full` lies below it
pub(crate) fn descendant_suffix<'a>(full: &'a str, parent: &str) -> Option<&'a str> {
	let rest = full.strip_prefix(parent)?;
	let rest = rest.strip_prefix(KEY_SEP)?;
	if rest.is_empty() { None } else { Some(rest) }
}

/// Whether a suffix returned by [`descendant_suffix`] names a direct child
pub(crate) fn is_direct_child(suffix: &str) -> bool {
	!suffix.contains(KEY_SEP)
}


// vim: ts=4
