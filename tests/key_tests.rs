//! Key lifecycle, enumeration, view, and access-mode tests

use std::collections::HashSet;

use regstore::{registry, Error, Hive, HiveOptions, RegistryView, RootKey};
use tempfile::TempDir;

/// Helper to create a temporary hive for testing
fn create_test_hive() -> (Hive, TempDir) {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let hive = Hive::open(temp_dir.path().join("test.redb")).expect("Failed to open hive");
	(hive, temp_dir)
}

#[test]
fn test_open_key_requires_existing_path() {
	let (hive, _temp) = create_test_hive();

	let err = registry::open_key(
		&hive,
		RootKey::CurrentUser,
		"Software\\Never\\Created",
		false,
		RegistryView::Default,
	)
	.unwrap_err();
	assert!(matches!(err, Error::KeyNotFound(_)), "expected KeyNotFound, got {:?}", err);

	registry::create_key(
		&hive,
		RootKey::CurrentUser,
		"Software\\Never\\Created",
		RegistryView::Default,
	)
	.unwrap();

	// Read-only access
	registry::open_key(
		&hive,
		RootKey::CurrentUser,
		"Software\\Never\\Created",
		false,
		RegistryView::Default,
	)
	.unwrap();

	// Read-write access
	registry::open_key(
		&hive,
		RootKey::CurrentUser,
		"Software\\Never\\Created",
		true,
		RegistryView::Default,
	)
	.unwrap();
}

#[test]
fn test_create_key_creates_intermediate_segments() {
	let (hive, _temp) = create_test_hive();

	registry::create_key(&hive, RootKey::CurrentUser, "One\\Two\\Three", RegistryView::Default)
		.unwrap();

	registry::open_key(&hive, RootKey::CurrentUser, "One", false, RegistryView::Default).unwrap();
	registry::open_key(&hive, RootKey::CurrentUser, "One\\Two", false, RegistryView::Default)
		.unwrap();
}

#[test]
fn test_create_key_is_idempotent() {
	let (hive, _temp) = create_test_hive();

	let key =
		registry::create_key(&hive, RootKey::CurrentUser, "Idem", RegistryView::Default).unwrap();
	key.write_value("Marker", 7u32).unwrap();
	drop(key);

	// Creating again opens the same key; its values survive
	let key =
		registry::create_key(&hive, RootKey::CurrentUser, "Idem", RegistryView::Default).unwrap();
	assert_eq!(key.read_u32("Marker").unwrap(), 7);
}

#[test]
fn test_key_paths_are_case_insensitive() {
	let (hive, _temp) = create_test_hive();

	registry::create_key(&hive, RootKey::CurrentUser, "Software\\AcMe", RegistryView::Default)
		.unwrap();

	registry::open_key(&hive, RootKey::CurrentUser, "SOFTWARE\\acme", false, RegistryView::Default)
		.unwrap();

	// Display case of the first creation is what enumeration reports
	let parent =
		registry::open_key(&hive, RootKey::CurrentUser, "Software", false, RegistryView::Default)
			.unwrap();
	let names: Vec<String> = parent.subkeys().collect::<Result<_, _>>().unwrap();
	assert_eq!(names, vec!["AcMe".to_string()]);
}

#[test]
fn test_malformed_paths_are_rejected() {
	let (hive, _temp) = create_test_hive();

	for path in ["\\Leading", "Trailing\\", "Doubled\\\\Segment"] {
		let err = registry::create_key(&hive, RootKey::CurrentUser, path, RegistryView::Default)
			.unwrap_err();
		assert!(matches!(err, Error::InvalidPath(_)), "path {:?} gave {:?}", path, err);
	}
}

#[test]
fn test_empty_path_addresses_the_root() {
	let (hive, _temp) = create_test_hive();

	let root =
		registry::open_key(&hive, RootKey::LocalMachine, "", false, RegistryView::Default).unwrap();
	assert_eq!(root.path(), "HKEY_LOCAL_MACHINE");
}

#[test]
fn test_delete_key() {
	let (hive, _temp) = create_test_hive();

	registry::create_key(&hive, RootKey::CurrentUser, "Doomed", RegistryView::Default).unwrap();
	registry::delete_key(&hive, RootKey::CurrentUser, "Doomed", RegistryView::Default).unwrap();

	let err =
		registry::open_key(&hive, RootKey::CurrentUser, "Doomed", false, RegistryView::Default)
			.unwrap_err();
	assert!(matches!(err, Error::KeyNotFound(_)));

	// Deleting again reports the missing key; cleanup callers may ignore it
	let err = registry::delete_key(&hive, RootKey::CurrentUser, "Doomed", RegistryView::Default)
		.unwrap_err();
	assert!(matches!(err, Error::KeyNotFound(_)));
}

#[test]
fn test_delete_key_with_subkeys_fails() {
	let (hive, _temp) = create_test_hive();

	registry::create_key(&hive, RootKey::CurrentUser, "Parent\\Child", RegistryView::Default)
		.unwrap();

	let err = registry::delete_key(&hive, RootKey::CurrentUser, "Parent", RegistryView::Default)
		.unwrap_err();
	assert!(
		matches!(err, Error::Operation { .. }),
		"deleting a key with children must fail deterministically, got {:?}",
		err
	);

	// Bottom-up deletion works
	registry::delete_key(&hive, RootKey::CurrentUser, "Parent\\Child", RegistryView::Default)
		.unwrap();
	registry::delete_key(&hive, RootKey::CurrentUser, "Parent", RegistryView::Default).unwrap();
}

#[test]
fn test_delete_root_is_rejected() {
	let (hive, _temp) = create_test_hive();

	let err =
		registry::delete_key(&hive, RootKey::CurrentUser, "", RegistryView::Default).unwrap_err();
	assert!(matches!(err, Error::InvalidPath(_)));
}

#[test]
fn test_enumerate_subkeys() {
	let (hive, _temp) = create_test_hive();

	let subkeys: HashSet<String> =
		["one", "two", "three"].iter().map(|s| s.to_string()).collect();

	for subkey in &subkeys {
		// Create subkeys to have something to enumerate
		registry::create_key(
			&hive,
			RootKey::CurrentUser,
			&format!("Enum\\{}", subkey),
			RegistryView::Default,
		)
		.unwrap();
	}

	let key =
		registry::open_key(&hive, RootKey::CurrentUser, "Enum", false, RegistryView::Default)
			.unwrap();

	let found: HashSet<String> =
		key.subkeys().collect::<Result<_, _>>().expect("enumeration failed");
	assert_eq!(found, subkeys, "set of found keys should match set of created keys");
}

#[test]
fn test_enumeration_stops_early() {
	let (hive, _temp) = create_test_hive();

	for name in ["one", "two", "three"] {
		registry::create_key(
			&hive,
			RootKey::CurrentUser,
			&format!("Early\\{}", name),
			RegistryView::Default,
		)
		.unwrap();
	}

	let key =
		registry::open_key(&hive, RootKey::CurrentUser, "Early", false, RegistryView::Default)
			.unwrap();

	let mut seen = 0;
	for name in key.subkeys() {
		name.unwrap();
		seen += 1;
		break;
	}
	assert_eq!(seen, 1, "abandoning the iterator must stop the enumeration");
}

#[test]
fn test_enumerate_empty_key() {
	let (hive, _temp) = create_test_hive();

	let key = registry::create_key(&hive, RootKey::CurrentUser, "Leaf", RegistryView::Default)
		.unwrap();

	assert!(key.subkeys().next().is_none(), "no children expected");
	assert!(key.values().next().is_none(), "no values expected");
}

#[test]
fn test_read_only_handle_denies_writes() {
	let (hive, _temp) = create_test_hive();

	{
		let key = registry::create_key(&hive, RootKey::CurrentUser, "Ro", RegistryView::Default)
			.unwrap();
		key.write_value("Present", 1u32).unwrap();
	}

	let key =
		registry::open_key(&hive, RootKey::CurrentUser, "Ro", false, RegistryView::Default)
			.unwrap();
	assert!(!key.is_writable());

	// Reads are fine
	assert_eq!(key.read_u32("Present").unwrap(), 1);

	let err = key.write_value("Denied", 2u32).unwrap_err();
	assert!(matches!(err, Error::AccessDenied(_)), "got {:?}", err);

	let err = key.delete_value("Present").unwrap_err();
	assert!(matches!(err, Error::AccessDenied(_)), "got {:?}", err);
}

#[test]
fn test_views_are_disjoint_namespaces() {
	let (hive, _temp) = create_test_hive();

	let key =
		registry::create_key(&hive, RootKey::LocalMachine, "Viewed", RegistryView::Force32)
			.unwrap();
	key.write_value("Width", 32u32).unwrap();
	drop(key);

	// The 64-bit (native) namespace has no such key
	for view in [RegistryView::Default, RegistryView::Force64] {
		let err =
			registry::open_key(&hive, RootKey::LocalMachine, "Viewed", false, view).unwrap_err();
		assert!(matches!(err, Error::KeyNotFound(_)), "view {:?} gave {:?}", view, err);
	}

	let key =
		registry::open_key(&hive, RootKey::LocalMachine, "Viewed", false, RegistryView::Force32)
			.unwrap();
	assert_eq!(key.read_u32("Width").unwrap(), 32);
}

#[test]
fn test_views_alias_without_redirection() {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let options = HiveOptions { view_redirection: false, native_64bit: true, read_only: false };
	let hive = Hive::open_with(temp_dir.path().join("flat.redb"), options)
		.expect("Failed to open hive");

	registry::create_key(&hive, RootKey::LocalMachine, "Flat", RegistryView::Force32).unwrap();

	// Every selector resolves to the same single namespace
	for view in [RegistryView::Default, RegistryView::Force64, RegistryView::Force32] {
		registry::open_key(&hive, RootKey::LocalMachine, "Flat", false, view)
			.unwrap_or_else(|err| panic!("view {:?} gave {:?}", view, err));
	}
}

#[test]
fn test_read_only_hive_denies_mutation() {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let path = temp_dir.path().join("frozen.redb");

	{
		let hive = Hive::open(&path).expect("Failed to open hive");
		let key =
			registry::create_key(&hive, RootKey::CurrentUser, "Frozen", RegistryView::Default)
				.unwrap();
		key.write_value("Kept", 1u32).unwrap();
	}

	let options = HiveOptions { view_redirection: true, native_64bit: true, read_only: true };
	let hive = Hive::open_with(&path, options).expect("Failed to reopen hive");

	// Read-only opens and reads still work
	let key =
		registry::open_key(&hive, RootKey::CurrentUser, "Frozen", false, RegistryView::Default)
			.unwrap();
	assert_eq!(key.read_u32("Kept").unwrap(), 1);
	drop(key);

	let err = registry::create_key(&hive, RootKey::CurrentUser, "Frozen", RegistryView::Default)
		.unwrap_err();
	assert!(matches!(err, Error::AccessDenied(_)), "create_key gave {:?}", err);

	let err =
		registry::open_key(&hive, RootKey::CurrentUser, "Frozen", true, RegistryView::Default)
			.unwrap_err();
	assert!(matches!(err, Error::AccessDenied(_)), "open_key gave {:?}", err);

	let err = registry::delete_key(&hive, RootKey::CurrentUser, "Frozen", RegistryView::Default)
		.unwrap_err();
	assert!(matches!(err, Error::AccessDenied(_)), "delete_key gave {:?}", err);

	let err = registry::move_key(
		&hive,
		RootKey::CurrentUser,
		"Frozen",
		RootKey::CurrentUser,
		"Thawed",
		RegistryView::Default,
	)
	.unwrap_err();
	assert!(matches!(err, Error::AccessDenied(_)), "move_key gave {:?}", err);
}

#[test]
fn test_data_survives_reopen() {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let path = temp_dir.path().join("persist.redb");

	{
		let hive = Hive::open(&path).expect("Failed to open hive");
		let key = registry::create_key(
			&hive,
			RootKey::CurrentUser,
			"Persist\\Me",
			RegistryView::Default,
		)
		.unwrap();
		key.write_value("Kept", "still here").unwrap();
	}

	let hive = Hive::open(&path).expect("Failed to reopen hive");
	let key =
		registry::open_key(&hive, RootKey::CurrentUser, "Persist\\Me", false, RegistryView::Default)
			.unwrap();
	assert_eq!(key.read_string("Kept").unwrap(), "still here");
}

// vim: ts=4
