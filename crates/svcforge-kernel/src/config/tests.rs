//! Tests for selection file loading.

use super::*;
use crate::capability::CapabilityRegistry;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_detect_format() {
    assert_eq!(detect_format(Path::new("svcforge.yaml")).unwrap(), FileFormat::Yaml);
    assert_eq!(detect_format(Path::new("svcforge.yml")).unwrap(), FileFormat::Yaml);
    assert_eq!(detect_format(Path::new("svcforge.toml")).unwrap(), FileFormat::Toml);
    assert_eq!(detect_format(Path::new("svcforge.json")).unwrap(), FileFormat::Json);
    assert!(detect_format(Path::new("svcforge.txt")).is_err());
    assert!(detect_format(Path::new("svcforge")).is_err());
}

#[test]
fn test_substitute_env_vars() {
    unsafe { std::env::set_var("SVCFORGE_TEST_DB_HOST", "db.internal") };

    assert_eq!(
        substitute_env_vars("host: ${SVCFORGE_TEST_DB_HOST}"),
        "host: db.internal"
    );
    assert_eq!(
        substitute_env_vars("host: $SVCFORGE_TEST_DB_HOST"),
        "host: db.internal"
    );
    // Unset variables are kept as placeholders.
    assert_eq!(
        substitute_env_vars("password: ${SVCFORGE_TEST_UNSET_VAR}"),
        "password: ${SVCFORGE_TEST_UNSET_VAR}"
    );

    unsafe { std::env::remove_var("SVCFORGE_TEST_DB_HOST") };
}

#[test]
fn test_yaml_tables_and_shorthand() {
    let yaml = r#"
service:
  name: orders
  type: grpc
database:
  enabled: true
  provider: postgresql
  providers:
    postgresql:
      host: localhost
      port: 5432
cache: false
auth: jwt
scheduler: true
"#;

    let file = SelectionFile::from_str(yaml, FileFormat::Yaml).unwrap();
    assert_eq!(file.service_name.as_deref(), Some("orders"));
    assert_eq!(file.service_type.as_deref(), Some("grpc"));

    let database = &file.capabilities["database"];
    assert!(database.enabled);
    assert_eq!(database.provider.as_deref(), Some("postgresql"));
    assert_eq!(database.options["host"], "localhost");
    assert_eq!(database.options["port"], "5432");

    assert!(!file.capabilities["cache"].enabled);
    assert_eq!(file.capabilities["auth"].provider.as_deref(), Some("jwt"));
    assert!(file.capabilities["scheduler"].enabled);
    assert_eq!(file.capabilities["scheduler"].provider, None);
}

#[test]
fn test_single_provider_block_selects_provider() {
    let yaml = r#"
cache:
  providers:
    memcached:
      servers: "a:11211"
"#;
    let file = SelectionFile::from_str(yaml, FileFormat::Yaml).unwrap();
    let cache = &file.capabilities["cache"];
    assert!(cache.enabled);
    assert_eq!(cache.provider.as_deref(), Some("memcached"));
    assert_eq!(cache.options["servers"], "a:11211");
}

#[test]
fn test_rejects_array_entries() {
    let yaml = "database:\n  - postgresql\n";
    let err = SelectionFile::from_str(yaml, FileFormat::Yaml).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEntry { ref key, .. } if key == "database"));
}

#[test]
fn test_load_toml_and_apply() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("svcforge.toml");
    fs::write(
        &path,
        r#"
[service]
name = "ledger"
type = "event"

[database]
provider = "postgres"

[event]
enabled = true

[event.options]
stream_prefix = "ledger"
"#,
    )
    .unwrap();

    let file = SelectionFile::load(&path).unwrap();
    let registry = CapabilityRegistry::standard();
    let builder = CompositionBuilder::new(&registry, file.service_name.clone().unwrap());
    let model = file.apply(builder).build().unwrap();

    assert_eq!(model.service_type().as_str(), "event");
    assert_eq!(model.provider("database"), Some("postgresql"));
    assert_eq!(model.provider("event"), Some("eventstore"));
    assert_eq!(
        model.selection("event").unwrap().option("stream_prefix"),
        Some("ledger")
    );
}

#[test]
fn test_flags_override_file() {
    let file = SelectionFile::from_str("cache: redis\n", FileFormat::Yaml).unwrap();
    let registry = CapabilityRegistry::standard();
    let builder = file.apply(CompositionBuilder::new(&registry, "orders"));
    let model = builder.disable("cache").build().unwrap();
    assert!(!model.is_enabled("cache"));
}
