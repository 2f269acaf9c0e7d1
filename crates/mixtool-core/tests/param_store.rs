//! Parameter store integration tests — round-trip, fallback, and merge
//! behavior against a real temp directory.

use mixtool_core::params::{ParamStore, Parameters};

fn store_in(dir: &tempfile::TempDir) -> ParamStore {
    ParamStore::new(dir.path().join("params.json"))
}

#[test]
fn load_after_save_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let mut params = Parameters::default();
    params.set_volume(1.8);
    params.set_bass(6.0);
    params.set_speed(1.35);
    params.dark_mode = false;
    params.pos_x = 42;
    params.pos_y = 7;

    store.save(&params);
    assert_eq!(store.load(), params);
}

#[test]
fn absent_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert_eq!(store.load(), Parameters::default());
}

#[test]
fn corrupted_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    std::fs::write(&path, "{not json at all").unwrap();
    let store = ParamStore::new(path);
    assert_eq!(store.load(), Parameters::default());
}

#[test]
fn partial_file_merges_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    std::fs::write(&path, r#"{"volume": 2.0, "darkMode": false}"#).unwrap();
    let store = ParamStore::new(path);

    let loaded = store.load();
    assert_eq!(loaded.volume, 2.0);
    assert!(!loaded.dark_mode);
    // Everything the file omits comes from the defaults.
    assert_eq!(loaded.bass, 0.0);
    assert_eq!(loaded.speed, 1.0);
    assert!(!loaded.nightcore);
    assert_eq!(loaded.pos_x, Parameters::default().pos_x);
}

#[test]
fn unknown_keys_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    std::fs::write(
        &path,
        r#"{"speed": 1.5, "reverb": 0.3, "futureField": {"a": 1}}"#,
    )
    .unwrap();
    let store = ParamStore::new(path);

    let loaded = store.load();
    assert_eq!(loaded.speed, 1.5);
    assert_eq!(loaded.volume, 1.0);
}

#[test]
fn save_overwrites_unconditionally() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let mut first = Parameters::default();
    first.set_bass(15.0);
    store.save(&first);

    let second = Parameters::default();
    store.save(&second);

    assert_eq!(store.load(), second);
}

#[test]
fn save_into_missing_directory_creates_it() {
    let dir = tempfile::tempdir().unwrap();
    let store = ParamStore::new(dir.path().join("deep").join("params.json"));
    let params = Parameters::default();
    store.save(&params);
    assert_eq!(store.load(), params);
}
