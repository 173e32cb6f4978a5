//! End-to-end runs through config resolution, registration and emission.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use schemagen::{
    register_entities, CancelFlag, EmitError, Emitter, EntityDescription, EntityRegistry,
    FormatError, Formatter, Fragment, GenConfig, Helpers, RunConfig, TemplateKind,
    TemplateNaming, TemplateSet, TemplateSource,
};
use serde_json::json;
use tempfile::TempDir;

const TABLE: &str = "{% for kind in templates %}{% for dot in dots[kind] %}{{ render_sub(kind, dot) }}{% endfor %}{% endfor %}";

fn run_config(dir: &Path, adjust: impl FnOnce(&mut GenConfig)) -> RunConfig {
    let mut config = GenConfig {
        loader_type: "test".to_string(),
        package: Some("models".to_string()),
        skip_format: true,
        skip_boilerplate: true,
        ..GenConfig::default()
    };
    adjust(&mut config);
    config.resolve(dir).unwrap()
}

const AGGREGATE: &str = "{% for gen in generated %}{{ gen.content }}{% endfor %}{% for entity in entities %}[{{ entity.name }}]{{ entity.buffer }}{% endfor %}";

fn templates(config: &RunConfig, table: &str) -> Arc<TemplateSet> {
    templates_with_aggregate(config, table, AGGREGATE)
}

fn templates_with_aggregate(config: &RunConfig, table: &str, aggregate: &str) -> Arc<TemplateSet> {
    let naming = TemplateNaming::new(&config.loader_type, "go");
    let helpers = Helpers::new(config.package.clone(), naming.clone(), config.single_file);
    let source = TemplateSource::empty(None)
        .with_bundled_entry("test.type.go.tpl", "type {{ name }}\n")
        .with_bundled_entry("xo_table.go.tpl", table)
        .with_bundled_entry("xo_db.go.tpl", "package {{ package }} // {{ config.loader_type }}\n")
        .with_bundled_entry("xo_single_file.go.tpl", aggregate);
    Arc::new(TemplateSet::new(source, naming, helpers))
}

fn entity(name: &str) -> EntityDescription {
    EntityDescription {
        name: name.to_string(),
        fragments: vec![Fragment {
            kind: TemplateKind::Type,
            context: json!({ "name": name }),
        }],
    }
}

fn registry(config: &RunConfig, names: &[&str]) -> EntityRegistry {
    let mut registry = EntityRegistry::new(templates(config, TABLE));
    let entities: Vec<_> = names.iter().map(|name| entity(name)).collect();
    register_entities(&mut registry, &entities).unwrap();
    registry
}

/// Records every path it is asked to format.
#[derive(Clone, Default)]
struct RecordingFormatter {
    seen: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl Formatter for RecordingFormatter {
    fn format(&self, path: &Path) -> Result<(), FormatError> {
        self.seen
            .lock()
            .unwrap()
            .push(path.file_name().unwrap().to_string_lossy().into_owned());
        if self.fail {
            return Err(FormatError::Failed {
                command: "fake".to_string(),
                path: path.to_path_buf(),
                status: "exit status: 2".to_string(),
                output: "1:1: expected 'package'".to_string(),
            });
        }
        Ok(())
    }
}

#[test]
fn per_entity_mode_writes_one_file_per_entity() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |_| {});
    let mut registry = registry(&config, &["users", "OrderItem"]);

    let report = Emitter::new(config).run(&mut registry).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("users.xo.go")).unwrap(),
        "type users\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("order_item.xo.go")).unwrap(),
        "type OrderItem\n"
    );
    assert_eq!(report.written.len(), 2);
    assert!(report.formatted.is_empty());
}

#[test]
fn existing_file_is_skipped_without_overwrite() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("users.xo.go"), "hand written").unwrap();
    let config = run_config(dir.path(), |_| {});
    let mut registry = registry(&config, &["users", "orders"]);

    let report = Emitter::new(config).run(&mut registry).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("users.xo.go")).unwrap(),
        "hand written"
    );
    assert_eq!(report.skipped, vec![dir.path().join("users.xo.go")]);
    assert!(dir.path().join("orders.xo.go").exists());
}

#[test]
fn overwrite_replaces_existing_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("users.xo.go"), "a much longer stale body").unwrap();
    let config = run_config(dir.path(), |c| c.overwrite = true);
    let mut registry = registry(&config, &["users"]);

    Emitter::new(config).run(&mut registry).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("users.xo.go")).unwrap(),
        "type users\n"
    );
}

#[test]
fn append_extends_existing_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("users.xo.go"), "// existing\n").unwrap();
    let config = run_config(dir.path(), |c| c.append = true);
    let mut registry = registry(&config, &["users"]);

    Emitter::new(config).run(&mut registry).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("users.xo.go")).unwrap(),
        "// existing\ntype users\n"
    );
}

#[test]
fn single_file_mode_keeps_registration_order() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |c| {
        c.single_file = true;
        c.filename = Some("all.go".to_string());
    });
    let mut registry = registry(&config, &["users", "orders"]);

    let report = Emitter::new(config).run(&mut registry).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("all.go")).unwrap(),
        "[users]type users\n[orders]type orders\n"
    );
    assert_eq!(report.written, vec![dir.path().join("all.go")]);
    assert!(!dir.path().join("users.xo.go").exists());
}

#[test]
fn single_file_mode_includes_only_registered_entities() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |c| {
        c.single_file = true;
        c.filename = Some("all.go".to_string());
    });
    let mut registry = registry(&config, &["orders"]);

    Emitter::new(config).run(&mut registry).unwrap();

    let out = fs::read_to_string(dir.path().join("all.go")).unwrap();
    assert_eq!(out, "[orders]type orders\n");
    assert!(!out.contains("users"));
}

#[test]
fn existing_aggregate_target_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("all.go"), "stale").unwrap();
    let config = run_config(dir.path(), |c| {
        c.single_file = true;
        c.filename = Some("all.go".to_string());
    });
    let mut registry = registry(&config, &["users"]);

    let err = Emitter::new(config).run(&mut registry).unwrap_err();

    assert!(matches!(err, EmitError::Write { ref path, .. } if path == &dir.path().join("all.go")));
    assert_eq!(fs::read_to_string(dir.path().join("all.go")).unwrap(), "stale");
}

#[test]
fn overwrite_replaces_existing_aggregate_target() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("all.go"), "stale").unwrap();
    let config = run_config(dir.path(), |c| {
        c.single_file = true;
        c.overwrite = true;
        c.filename = Some("all.go".to_string());
    });
    let mut registry = registry(&config, &["users"]);

    Emitter::new(config).run(&mut registry).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("all.go")).unwrap(),
        "[users]type users\n"
    );
}

#[test]
fn aggregate_render_failure_names_the_output() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |c| {
        c.single_file = true;
        c.filename = Some("all.go".to_string());
    });
    let mut registry =
        EntityRegistry::new(templates_with_aggregate(&config, TABLE, "{{ broken_field }}"));
    register_entities(&mut registry, &[entity("users")]).unwrap();

    let err = Emitter::new(config).run(&mut registry).unwrap_err();
    assert!(
        matches!(err, EmitError::Aggregate { ref path, .. } if path == &dir.path().join("all.go"))
    );
}

#[test]
fn entities_sharing_a_target_path_fail_before_writing() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |_| {});
    let mut registry = registry(&config, &["users", "OrderItem", "order_item"]);

    let err = Emitter::new(config).run(&mut registry).unwrap_err();

    match err {
        EmitError::PathCollision { path, first, second } => {
            assert_eq!(path, dir.path().join("order_item.xo.go"));
            assert_eq!(first, "OrderItem");
            assert_eq!(second, "order_item");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("users.xo.go").exists());
    assert!(!dir.path().join("order_item.xo.go").exists());
}

#[test]
fn entity_named_like_the_boilerplate_collides_with_it() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |c| c.skip_boilerplate = false);
    let mut registry = registry(&config, &["xo_db"]);

    let err = Emitter::new(config).run(&mut registry).unwrap_err();

    assert!(matches!(err, EmitError::PathCollision { ref first, .. } if first == "xo_db"));
    assert!(!dir.path().join("xo_db.xo.go").exists());
}

#[test]
fn entity_named_like_the_boilerplate_is_fine_when_boilerplate_is_skipped() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |_| {});
    let mut registry = registry(&config, &["xo_db"]);

    Emitter::new(config).run(&mut registry).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("xo_db.xo.go")).unwrap(),
        "type xo_db\n"
    );
}

#[test]
fn boilerplate_is_written_once_in_per_entity_mode() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |c| c.skip_boilerplate = false);
    let mut registry = registry(&config, &["users"]);

    let report = Emitter::new(config).run(&mut registry).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("xo_db.xo.go")).unwrap(),
        "package models // test\n"
    );
    assert_eq!(report.written.len(), 2);
}

#[test]
fn boilerplate_leads_the_aggregate_file() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |c| {
        c.skip_boilerplate = false;
        c.single_file = true;
        c.filename = Some("all.go".to_string());
    });
    let mut registry = registry(&config, &["users"]);

    Emitter::new(config).run(&mut registry).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("all.go")).unwrap(),
        "package models // test\n[users]type users\n"
    );
    assert!(!dir.path().join("xo_db.xo.go").exists());
}

#[test]
fn every_written_file_is_formatted() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |c| c.skip_format = false);
    let mut registry = registry(&config, &["users", "orders"]);
    let formatter = RecordingFormatter::default();

    let report = Emitter::new(config)
        .with_formatter(formatter.clone())
        .run(&mut registry)
        .unwrap();

    assert_eq!(
        *formatter.seen.lock().unwrap(),
        vec!["users.xo.go".to_string(), "orders.xo.go".to_string()]
    );
    assert_eq!(report.formatted.len(), 2);
}

#[test]
fn skip_format_wins_over_injected_formatter() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |_| {});
    let mut registry = registry(&config, &["users"]);
    let formatter = RecordingFormatter::default();

    Emitter::new(config)
        .with_formatter(formatter.clone())
        .run(&mut registry)
        .unwrap();

    assert!(formatter.seen.lock().unwrap().is_empty());
}

#[test]
fn formatter_failure_aborts_the_run() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |c| c.skip_format = false);
    let mut registry = registry(&config, &["users", "orders"]);
    let formatter = RecordingFormatter {
        fail: true,
        ..RecordingFormatter::default()
    };

    let err = Emitter::new(config)
        .with_formatter(formatter.clone())
        .run(&mut registry)
        .unwrap_err();

    assert!(matches!(err, EmitError::Format(FormatError::Failed { .. })));
    assert!(err.to_string().contains("expected 'package'"));
    assert_eq!(formatter.seen.lock().unwrap().len(), 1);
    assert!(!dir.path().join("orders.xo.go").exists());
}

#[test]
fn cancelled_run_stops_before_next_entity() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |_| {});
    let mut registry = registry(&config, &["users", "orders"]);
    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = Emitter::new(config)
        .with_cancel(cancel)
        .run(&mut registry)
        .unwrap_err();

    assert!(matches!(err, EmitError::Cancelled { completed: 0, total: 2 }));
    assert!(!dir.path().join("users.xo.go").exists());
}

#[test]
fn directory_at_target_path_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("users.xo.go")).unwrap();
    let config = run_config(dir.path(), |c| c.overwrite = true);
    let mut registry = registry(&config, &["users"]);

    let err = Emitter::new(config).run(&mut registry).unwrap_err();
    assert!(matches!(err, EmitError::Write { .. }));
}

#[test]
fn render_failure_names_the_entity() {
    let dir = TempDir::new().unwrap();
    let config = run_config(dir.path(), |_| {});
    let mut registry = EntityRegistry::new(templates(&config, "{{ missing_field }}"));
    register_entities(&mut registry, &[entity("users")]).unwrap();

    let err = Emitter::new(config).run(&mut registry).unwrap_err();
    assert!(matches!(err, EmitError::Entity { ref entity, .. } if entity == "users"));
}

#[test]
fn bundled_templates_render_a_postgres_entity() {
    let dir = TempDir::new().unwrap();
    let config = GenConfig {
        package: Some("models".to_string()),
        skip_format: true,
        ..GenConfig::default()
    }
    .resolve(dir.path())
    .unwrap();
    let mut registry = EntityRegistry::new(Arc::new(config.template_set()));
    register_entities(
        &mut registry,
        &[EntityDescription {
            name: "users".to_string(),
            fragments: vec![Fragment {
                kind: TemplateKind::Type,
                context: json!({
                    "name": "users",
                    "table": "users",
                    "fields": [{ "name": "user_id", "type": "int64" }],
                }),
            }],
        }],
    )
    .unwrap();

    Emitter::new(config).run(&mut registry).unwrap();

    let out = fs::read_to_string(dir.path().join("users.xo.go")).unwrap();
    assert!(out.contains("package models"));
    assert!(out.contains("type Users struct {"));
    assert!(out.contains("UserId int64 `json:\"user_id\"`"));
    assert!(dir.path().join("xo_db.xo.go").exists());
}
