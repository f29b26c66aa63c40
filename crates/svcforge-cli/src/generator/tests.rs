use super::*;
use svcforge_kernel::CompositionBuilder;
use tempfile::TempDir;

fn registry() -> CapabilityRegistry {
    CapabilityRegistry::standard()
}

fn scenario_model(registry: &CapabilityRegistry) -> CompositionModel {
    CompositionBuilder::new(registry, "orders")
        .service_type_str("rest")
        .select("database", "postgres")
        .select("cache", "")
        .select("auth", "jwt")
        .build()
        .unwrap()
}

/// Every file under `dir` with its content, sorted by relative path.
fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<(String, Vec<u8>)>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let rel = path.strip_prefix(base).unwrap().to_string_lossy().replace('\\', "/");
                out.push((rel, fs::read(&path).unwrap()));
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}

fn config_yaml(root: &Path) -> serde_yaml::Value {
    let content = fs::read_to_string(root.join("configs/config.yaml")).unwrap();
    serde_yaml::from_str(&content).unwrap()
}

#[test]
fn scenario_config_has_database_section_and_no_cache() {
    let registry = registry();
    let model = scenario_model(&registry);
    let out = TempDir::new().unwrap();

    let report = Generator::new(&registry)
        .generate(&model, out.path(), false)
        .unwrap();

    let config = config_yaml(&report.root);
    let postgres = &config["database"]["providers"]["postgresql"];
    assert!(postgres.as_mapping().is_some_and(|m| !m.is_empty()));
    assert_eq!(postgres["port"].as_u64(), Some(5432));
    assert_eq!(config["database"]["provider"], "postgresql");
    assert!(config.get("cache").is_none());
    assert_eq!(config["auth"]["provider"], "jwt");
    assert_eq!(config["service"]["name"], "orders");
    assert_eq!(config["service"]["type"], "rest");
}

#[test]
fn generated_config_round_trips_through_the_selection_loader() {
    let registry = registry();
    let model = scenario_model(&registry);
    let out = TempDir::new().unwrap();
    let report = Generator::new(&registry)
        .generate(&model, out.path(), false)
        .unwrap();

    let file = svcforge_kernel::config::SelectionFile::load(&report.root.join("configs/config.yaml"))
        .unwrap();
    let reloaded = file
        .apply(CompositionBuilder::new(&registry, "orders"))
        .build()
        .unwrap();

    for (name, selection) in model.enabled() {
        assert_eq!(reloaded.provider(name), Some(selection.provider.as_str()), "{name}");
    }
    assert!(!reloaded.is_enabled("cache"));
    assert_eq!(
        reloaded.selection("database").unwrap().option("host"),
        Some("localhost")
    );
}

#[test]
fn option_values_survive_generate_and_reload() {
    let registry = registry();
    let model = CompositionBuilder::new(&registry, "orders")
        .select("database", "postgres")
        .option("database", "password", "0123")
        .option("database", "ratio", "1e3")
        .option("database", "weight", "2.50")
        .option("database", "replicas", "3")
        .option("database", "note", "a: b # c")
        .select("auth", "jwt")
        .option("auth", "header", "X-Api-Key")
        .build()
        .unwrap();
    let out = TempDir::new().unwrap();
    let report = Generator::new(&registry)
        .generate(&model, out.path(), false)
        .unwrap();

    let file = svcforge_kernel::config::SelectionFile::load(&report.root.join("configs/config.yaml"))
        .unwrap();
    let reloaded = file
        .apply(CompositionBuilder::new(&registry, "orders"))
        .build()
        .unwrap();

    for (name, selection) in model.selections() {
        assert_eq!(reloaded.is_enabled(name), selection.enabled, "{name}");
        if !selection.enabled {
            continue;
        }
        assert_eq!(reloaded.provider(name), Some(selection.provider.as_str()), "{name}");
        let again = reloaded.selection(name).unwrap();
        for (key, value) in &selection.options {
            assert_eq!(again.option(key), Some(value.as_str()), "{name}.{key}");
        }
    }
}

#[test]
fn string_options_render_as_escaped_rust_literals() {
    let registry = registry();
    let model = CompositionBuilder::new(&registry, "orders")
        .select("database", "postgres")
        .enable("event", None)
        .option("event", "stream_prefix", r#"orders"; panic!("x"); //"#)
        .select("auth", "jwt")
        .option("auth", "header", r"X-Key\")
        .build()
        .unwrap();

    let rendered = Generator::new(&registry).render(&model).unwrap();
    let file = |path: &str| {
        rendered
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, content)| content.clone())
            .unwrap()
    };

    let events = file("internal/services/events.rs");
    assert!(events.contains(r#"pub const STREAM_PREFIX: &str = "orders\"; panic!(\"x\"); //";"#));
    let auth = file("internal/middleware/auth.rs");
    assert!(auth.contains(r#"pub const HEADER: &str = "X-Key\\\\";"#));
}

#[test]
fn malformed_option_key_never_reaches_the_generator() {
    let registry = registry();
    let err = CompositionBuilder::new(&registry, "orders")
        .select("database", "postgres")
        .option("database", "bad key: x\n  evil", "1")
        .build()
        .unwrap_err();
    assert!(matches!(
        err.issues(),
        [svcforge_kernel::ValidationIssue::InvalidOption { capability, .. }] if capability == "database"
    ));
}

#[test]
fn layout_and_conditional_files() {
    let registry = registry();
    let model = scenario_model(&registry);
    let out = TempDir::new().unwrap();
    let report = Generator::new(&registry)
        .generate(&model, out.path(), false)
        .unwrap();

    for dir in SKELETON_DIRS {
        assert!(report.root.join(dir).is_dir(), "missing {dir}");
    }
    assert!(report.files.contains(&"internal/repositories/mod.rs".to_string()));
    assert!(report.files.contains(&"internal/middleware/auth.rs".to_string()));
    assert!(!report.files.contains(&"internal/services/events.rs".to_string()));
    assert!(report.root.join(MANIFEST_PATH).is_file());

    let cargo = fs::read_to_string(report.root.join("Cargo.toml")).unwrap();
    assert!(cargo.contains("name = \"orders\""));
    assert!(cargo.contains("sqlx"));
    assert!(!cargo.contains("redis"));
}

#[test]
fn generation_is_deterministic() {
    let registry = registry();
    let model = scenario_model(&registry);
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let generator = Generator::new(&registry);

    let a = generator.generate(&model, first.path(), false).unwrap();
    let b = generator.generate(&model, second.path(), false).unwrap();

    assert_eq!(a.files, b.files);
    assert_eq!(snapshot(&a.root), snapshot(&b.root));
}

#[test]
fn existing_project_without_force_is_a_conflict() {
    let registry = registry();
    let model = scenario_model(&registry);
    let out = TempDir::new().unwrap();
    let root = out.path().join("orders");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("notes.txt"), "mine").unwrap();

    let err = Generator::new(&registry)
        .generate(&model, out.path(), false)
        .unwrap_err();

    assert!(matches!(err, CliError::DestinationConflict { ref path } if *path == root));
    assert_eq!(snapshot(&root), vec![("notes.txt".to_string(), b"mine".to_vec())]);
    // No lock left behind either.
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 1);
}

#[test]
fn empty_existing_directory_is_accepted() {
    let registry = registry();
    let model = scenario_model(&registry);
    let out = TempDir::new().unwrap();
    fs::create_dir_all(out.path().join("orders")).unwrap();

    Generator::new(&registry)
        .generate(&model, out.path(), false)
        .unwrap();
}

#[test]
fn forced_regeneration_removes_stale_files_only() {
    let registry = registry();
    let out = TempDir::new().unwrap();
    let generator = Generator::new(&registry);

    let first = generator
        .generate(&scenario_model(&registry), out.path(), false)
        .unwrap();
    fs::write(first.root.join("docs/NOTES.md"), "keep me").unwrap();

    let without_database = CompositionBuilder::new(&registry, "orders")
        .select("auth", "jwt")
        .build()
        .unwrap();
    let second = generator
        .generate(&without_database, out.path(), true)
        .unwrap();

    assert_eq!(second.removed, vec!["internal/repositories/mod.rs"]);
    assert!(!second.root.join("internal/repositories/mod.rs").exists());
    assert!(second.root.join("internal/repositories").is_dir());
    assert!(second.root.join("docs/NOTES.md").exists());

    let config = config_yaml(&second.root);
    assert!(config.get("database").is_none());
    let raw = fs::read_to_string(second.root.join("configs/config.yaml")).unwrap();
    assert!(!raw.contains("database"));
}

#[test]
fn render_error_writes_nothing() {
    let registry = registry();
    let model = scenario_model(&registry);
    let out = TempDir::new().unwrap();
    let mut templates = STANDARD.to_vec();
    templates.push(TemplateSpec::always(
        "docs/BROKEN.md",
        "{{ option(name=\"database\") }}",
    ));

    let err = Generator::with_templates(&registry, templates)
        .generate(&model, out.path(), false)
        .unwrap_err();

    assert!(matches!(err, CliError::TemplateRender { ref template, .. } if template == "docs/BROKEN.md"));
    assert!(!out.path().join("orders").exists());
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn held_lock_rejects_a_concurrent_pass() {
    let registry = registry();
    let model = scenario_model(&registry);
    let out = TempDir::new().unwrap();
    let _held = GenerationLock::acquire(out.path(), "orders").unwrap();

    let err = Generator::new(&registry)
        .generate(&model, out.path(), false)
        .unwrap_err();
    assert!(matches!(err, CliError::Locked { .. }));
    assert!(!out.path().join("orders").exists());
}

#[test]
fn every_capability_renders() {
    let registry = registry();
    let mut builder = CompositionBuilder::new(&registry, "everything");
    for capability in registry.optional() {
        builder = builder.enable(&capability.name, None);
    }
    let model = builder.build().unwrap();

    let rendered = Generator::new(&registry).render(&model).unwrap();
    assert_eq!(rendered.len(), STANDARD.len());

    let config = rendered
        .iter()
        .find(|(path, _)| *path == "configs/config.yaml")
        .map(|(_, content)| content)
        .unwrap();
    let parsed: serde_yaml::Value = serde_yaml::from_str(config).unwrap();
    for capability in registry.all() {
        assert!(parsed.get(capability.name.as_str()).is_some(), "{}", capability.name);
    }
}

#[test]
fn manifest_uses_path_dependencies_on_the_runtime() {
    let registry = registry();
    let model = scenario_model(&registry);

    let rendered = Generator::new(&registry)
        .with_runtime_path("/srv/svcforge/crates/")
        .render(&model)
        .unwrap();
    let manifest = rendered
        .iter()
        .find(|(path, _)| *path == "Cargo.toml")
        .map(|(_, content)| content)
        .unwrap();

    assert!(manifest.contains("[dependencies]\nsvcforge-kernel = { path = \"/srv/svcforge/crates/svcforge-kernel\" }\n"));
    assert!(manifest.contains("svcforge-runtime = { path = \"/srv/svcforge/crates/svcforge-runtime\" }"));
}
