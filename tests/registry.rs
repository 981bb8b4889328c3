use std::fs;
use std::path::Path;
use std::sync::Arc;

use dragon_registry::loader::{CachedLoader, FileLoader};
use dragon_registry::{Config, Delegator, ErrorMode, Lookup, Table, Value, Writable};
use tempfile::TempDir;

fn write(root: &Path, file: &str, contents: &str) {
    let path = root.join(file);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Root, `production` and `production/host1` layers plus a `host2` tree
/// usable as a second, independent registry root.
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "db.toml",
        r#"
        unknown = "${dbx.unknown}"

        [auth]
        user = "www"
        host = "localhost"
        port = 3306
        "#,
    );
    write(root, "system.toml", "[logger]\nlevel = \"warning\"\n");
    write(
        root,
        "logger.toml",
        r#"
        [system]
        channel = "systemLogger"
        level = "critical"

        [watchdog]
        channel = "watchDog"
        level = "${system.logger.level}"
        "#,
    );
    write(
        root,
        "production/db.toml",
        "[auth]\nhost = \"dbhost\"\nport = 3506\n",
    );
    write(root, "production/logger.toml", "[prod1]\nchannel = \"Prod1\"\n");
    write(
        root,
        "production/host1/db.toml",
        "[auth]\nuser = \"bingo\"\npass = \"nopass\"\n",
    );
    write(root, "production/host2/dbx.toml", "unknown = \"dbx\"\n");
    dir
}

fn file_config(root: &Path, environment: &str) -> Config {
    Config::builder()
        .with_loader(FileLoader::new(root, environment, "toml").unwrap())
        .with_error_mode(ErrorMode::Raise)
        .build()
}

#[test]
fn reads_root_layer() {
    let dir = fixture();
    let config = file_config(dir.path(), "");

    assert_eq!(config.get("db.auth.user").unwrap(), Some(Value::from("www")));
    assert_eq!(config.get("db.auth.host").unwrap(), Some(Value::from("localhost")));
    assert_eq!(config.get("db.auth.port").unwrap(), Some(Value::Integer(3306)));
    assert_eq!(
        config.get("logger.watchdog.level").unwrap(),
        Some(Value::from("warning"))
    );
}

#[test]
fn production_overrides_root() {
    let dir = fixture();
    let config = file_config(dir.path(), "production");

    assert_eq!(config.get("db.auth.user").unwrap(), Some(Value::from("www")));
    assert_eq!(config.get("db.auth.host").unwrap(), Some(Value::from("dbhost")));
    assert_eq!(config.get("db.auth.port").unwrap(), Some(Value::Integer(3506)));
    assert_eq!(
        config.get("logger.prod1.channel").unwrap(),
        Some(Value::from("Prod1"))
    );
}

#[test]
fn deepest_environment_wins() {
    let dir = fixture();
    let config = file_config(dir.path(), "production/host1");

    assert_eq!(config.get("db.auth.user").unwrap(), Some(Value::from("bingo")));
    assert_eq!(config.get("db.auth.pass").unwrap(), Some(Value::from("nopass")));
    assert_eq!(config.get("db.auth.host").unwrap(), Some(Value::from("dbhost")));
    assert_eq!(config.get("db.auth.port").unwrap(), Some(Value::Integer(3506)));
}

#[test]
fn builder_environment_is_passed_to_loader() {
    let dir = fixture();
    let config = Config::builder()
        .with_loader(FileLoader::new(dir.path(), "", "toml").unwrap())
        .with_environment("production")
        .build();

    assert_eq!(config.get("db.auth.port").unwrap(), Some(Value::Integer(3506)));
}

#[test]
fn unset_key_returns_default() {
    let dir = fixture();
    let config = file_config(dir.path(), "");

    assert!(!config.has("db.auth.socket"));
    assert_eq!(
        config.get_or("db.auth.socket", Value::from("/tmp/db.sock")).unwrap(),
        Value::from("/tmp/db.sock")
    );
    assert!(!config.has("nothing.here"));
}

#[test]
fn write_then_read() {
    let dir = fixture();
    let config = file_config(dir.path(), "");
    config.set_writable(true);

    config.get_or("db.auth.user", Value::from("d1")).unwrap();
    config.set("db.auth.user", Value::from("admin")).unwrap();
    assert_eq!(
        config.get_or("db.auth.user", Value::from("d2")).unwrap(),
        Value::from("admin")
    );
}

#[test]
fn repeated_reads_are_identical() {
    let dir = fixture();
    let config = file_config(dir.path(), "");

    let first = config.get("logger").unwrap();
    let second = config.get("logger").unwrap();
    assert_eq!(first, second);
}

#[test]
fn reference_round_trip() {
    let data: Table =
        serde_json::from_str(r#"{"a": "${b}", "b": "x", "c": "pre-${d}-post", "d": 5}"#).unwrap();
    let config = Config::builder().with_data(data).build();

    assert_eq!(config.get("a").unwrap(), Some(Value::from("x")));
    assert_eq!(config.get("c").unwrap(), Some(Value::from("pre-5-post")));
}

#[test]
fn cycle_under_ignore_terminates() {
    let data: Table = serde_json::from_str(r#"{"a": "${b}", "b": "${a}"}"#).unwrap();
    let config = Config::builder()
        .with_data(data)
        .with_error_mode(ErrorMode::Ignore)
        .build();

    assert_eq!(config.get("a").unwrap(), Some(Value::from("${a}")));
}

#[test]
fn delegator_resolves_only_attached_member() {
    let dir = fixture();
    let config1 = Arc::new(file_config(dir.path(), ""));
    config1.set_error_mode(ErrorMode::Ignore);

    let delegator = Arc::new(Delegator::new());
    delegator.attach(config1).unwrap();

    assert_eq!(
        delegator.get("db.unknown").unwrap(),
        Some(Value::from("${dbx.unknown}"))
    );
}

#[test]
fn delegator_resolves_across_members() {
    let dir = fixture();
    let config1 = Arc::new(file_config(dir.path(), ""));
    let config2 = Arc::new(file_config(&dir.path().join("production/host2"), ""));

    let delegator = Arc::new(Delegator::new());
    delegator.attach(config1.clone()).unwrap();
    delegator.attach(config2).unwrap();

    assert_eq!(delegator.get("db.unknown").unwrap(), Some(Value::from("dbx")));
    assert_eq!(config1.get("db.unknown").unwrap(), Some(Value::from("dbx")));
}

#[test]
fn cached_snapshot_round_trip() {
    let dir = fixture();
    let config = file_config(dir.path(), "production");
    // `db.unknown` has no target here and is stored verbatim.
    config.set_error_mode(ErrorMode::Ignore);

    let Some(Value::Table(all)) = config.get("").unwrap() else {
        panic!("root should be a table");
    };
    let cache = dir.path().join("config.cache.json");
    CachedLoader::store(&cache, &all).unwrap();

    let cached = Config::builder()
        .with_loader(CachedLoader::new(&cache))
        .with_error_mode(ErrorMode::Raise)
        .build();
    assert_eq!(cached.get("db.auth.host").unwrap(), Some(Value::from("dbhost")));
    assert_eq!(
        cached.get("logger.watchdog.level").unwrap(),
        Some(Value::from("warning"))
    );
}
