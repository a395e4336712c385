use std::fs;

use fs2::FileExt;
use serde_json::json;
use yedit_core::persist::{self, ContentType, FormatMode};
use yedit_core::{Content, Error, Yedit, YeditOptions};

fn options(path: &std::path::Path, content_type: ContentType) -> YeditOptions {
    YeditOptions {
        filename: Some(path.to_path_buf()),
        content_type,
        ..YeditOptions::default()
    }
}

#[test]
fn yaml_write_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("config.yml");
    fs::write(&p, "kind: Config\nitems:\n- name: a\n  port: 80\n").unwrap();

    let mut y = Yedit::new(options(&p, ContentType::Yaml)).unwrap();
    y.put("items[0].port", json!(8080)).unwrap();
    y.append("items", json!({"name": "b", "port": 81})).unwrap();
    y.put("meta.labels.env", json!("prod")).unwrap();
    y.write().unwrap();

    let reloaded = Yedit::open(&p, ContentType::Yaml).unwrap();
    assert_eq!(reloaded.document(), y.document());
    assert_eq!(reloaded.get("items[1].name"), Some(&json!("b")));
    let text = fs::read_to_string(&p).unwrap();
    assert!(text.starts_with("kind: Config\n"), "{text}");
}

#[test]
fn json_write_uses_four_space_indent() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("data.json");
    fs::write(&p, r#"{"b": 1, "a": {"c": [1, 2]}}"#).unwrap();

    let mut y = Yedit::new(options(&p, ContentType::Json)).unwrap();
    y.put("a.d", json!(true)).unwrap();
    y.write().unwrap();

    let text = fs::read_to_string(&p).unwrap();
    assert!(text.contains("\n    \"b\": 1"), "{text}");
    // source key order is kept in preserve mode
    assert!(text.find("\"b\"").unwrap() < text.find("\"a\"").unwrap());

    let reloaded = Yedit::open(&p, ContentType::Json).unwrap();
    assert_eq!(reloaded.document(), &json!({"b": 1, "a": {"c": [1, 2], "d": true}}));
}

#[test]
fn plain_mode_sorts_keys_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("sorted.yml");
    fs::write(&p, "z: 1\na: 2\n").unwrap();
    let y = Yedit::new(YeditOptions {
        format: FormatMode::Plain,
        ..options(&p, ContentType::Yaml)
    })
    .unwrap();
    y.write().unwrap();
    assert_eq!(fs::read_to_string(&p).unwrap(), "a: 2\nz: 1\n");
}

#[test]
fn write_without_filename_fails() {
    let y = Yedit::from_document(json!({"a": 1}));
    assert!(matches!(y.write(), Err(Error::NoFilename)));
}

#[test]
fn malformed_source_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("broken.json");
    fs::write(&p, "{\"a\": [1, 2").unwrap();
    assert!(matches!(
        Yedit::open(&p, ContentType::Json),
        Err(Error::Parse { content_type: "json", .. })
    ));

    let p = dir.path().join("broken.yml");
    fs::write(&p, "a: [1, 2\n").unwrap();
    assert!(matches!(
        Yedit::open(&p, ContentType::Yaml),
        Err(Error::Parse { content_type: "yaml", .. })
    ));
}

#[test]
fn missing_or_blank_source_defaults_to_empty_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.yml");
    let y = Yedit::open(&missing, ContentType::Yaml).unwrap();
    assert!(!y.loaded());
    assert_eq!(y.document(), &json!({}));
    assert_eq!(persist::load(&missing, ContentType::Yaml).unwrap(), None);

    let blank = dir.path().join("blank.yml");
    fs::write(&blank, "\n  \n").unwrap();
    assert_eq!(persist::load(&blank, ContentType::Yaml).unwrap(), None);
}

#[test]
fn seed_text_takes_priority_over_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("seeded.yml");
    fs::write(&p, "from: file\n").unwrap();
    let y = Yedit::new(YeditOptions {
        content: Some(Content::Text("from: seed\n".into())),
        ..options(&p, ContentType::Yaml)
    })
    .unwrap();
    assert_eq!(y.get("from"), Some(&json!("seed")));
}

#[test]
fn backup_copies_previous_contents() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("app.yml");
    fs::write(&p, "version: 1\n").unwrap();

    let mut y = Yedit::new(YeditOptions {
        backup: true,
        ..options(&p, ContentType::Yaml)
    })
    .unwrap();
    y.put("version", json!(2)).unwrap();
    y.write().unwrap();

    let backups: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("app.yml.") && !n.ends_with(".edit"))
        .collect();
    assert_eq!(backups.len(), 1, "{backups:?}");
    // app.yml.YYYYmmddTHHMMSS
    assert_eq!(backups[0].len(), "app.yml.".len() + 15);
    let saved = fs::read_to_string(dir.path().join(&backups[0])).unwrap();
    assert_eq!(saved, "version: 1\n");
    assert_eq!(fs::read_to_string(&p).unwrap(), "version: 2\n");
}

#[test]
fn backup_skipped_when_no_file_yet() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("fresh.yml");
    assert_eq!(persist::backup(&p).unwrap(), None);
}

#[test]
fn successful_write_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("out.yml");
    persist::write(Some(&p), &json!({"a": 1}), ContentType::Yaml, FormatMode::Preserve, false)
        .unwrap();
    assert_eq!(fs::read_to_string(&p).unwrap(), "a: 1\n");
    assert!(!persist::temp_path(&p).exists());
}

#[test]
fn interrupted_write_keeps_target_intact() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("target.yml");
    fs::write(&p, "state: old\n").unwrap();
    // A writer that died after filling the temp file but before the rename.
    fs::write(persist::temp_path(&p), "state: ne").unwrap();

    let y = Yedit::open(&p, ContentType::Yaml).unwrap();
    assert_eq!(y.get("state"), Some(&json!("old")));

    persist::write_atomic(&p, "state: new\n").unwrap();
    assert_eq!(fs::read_to_string(&p).unwrap(), "state: new\n");
    assert!(!persist::temp_path(&p).exists());
}

#[test]
fn concurrent_writer_holding_the_lock_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("busy.yml");
    fs::write(&p, "owner: me\n").unwrap();

    let tmp = persist::temp_path(&p);
    let held = fs::File::create(&tmp).unwrap();
    held.try_lock_exclusive().unwrap();

    let err = persist::write_atomic(&p, "owner: you\n").unwrap_err();
    assert!(matches!(err, Error::Locked { .. }), "{err}");
    assert_eq!(fs::read_to_string(&p).unwrap(), "owner: me\n");
    // the other writer's temp file is not ours to remove
    assert!(tmp.exists());
    FileExt::unlock(&held).unwrap();
}

#[test]
fn failed_rename_cleans_up_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("is_a_dir");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("keep"), "x").unwrap();

    assert!(persist::write_atomic(&target, "a: 1\n").is_err());
    assert!(!persist::temp_path(&target).exists());
    assert!(target.join("keep").exists());
}
