use std::fs;

use serde_json::json;
use yedit_core::{ContentType, Error, Request, State, run};

fn request(src: &std::path::Path, state: State) -> Request {
    Request {
        src: Some(src.to_path_buf()),
        state,
        ..Request::default()
    }
}

#[test]
fn list_returns_value_at_key() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("c.yml");
    fs::write(&p, "a:\n  b: [1, 2]\n").unwrap();

    let mut req = request(&p, State::List);
    req.key = "a.b[1]".into();
    let resp = run(&req).unwrap();
    assert!(!resp.changed);
    assert_eq!(resp.result, json!(2));
    assert_eq!(resp.state, State::List);

    req.key = "a.nope".into();
    assert_eq!(run(&req).unwrap().result, json!(null));

    req.key.clear();
    assert_eq!(run(&req).unwrap().result, json!({"a": {"b": [1, 2]}}));
}

#[test]
fn list_and_absent_require_a_readable_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("missing.yml");
    for state in [State::List, State::Absent] {
        let err = run(&request(&p, state)).unwrap_err();
        assert!(matches!(err, Error::Load(ref m) if m.starts_with("Error opening file")), "{err}");
    }
}

#[test]
fn present_value_is_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("app.yml");

    let mut req = request(&p, State::Present);
    req.key = "server.port".into();
    req.value = Some(json!("8080"));

    let resp = run(&req).unwrap();
    assert!(resp.changed);
    assert_eq!(
        resp.result,
        json!([{"key": "server.port", "edit": {"server": {"port": 8080}}}])
    );
    assert_eq!(fs::read_to_string(&p).unwrap(), "server:\n  port: 8080\n");

    let again = run(&req).unwrap();
    assert!(!again.changed);
    assert_eq!(again.result, json!([]));
}

#[test]
fn present_update_and_append_flags() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("list.yml");
    fs::write(&p, "hosts:\n- a\n- b\n").unwrap();

    let mut req = request(&p, State::Present);
    req.key = "hosts".into();
    req.value = Some(json!("c"));
    req.update = true;
    req.curr_value = Some(json!("b"));
    assert!(run(&req).unwrap().changed);

    let mut req = request(&p, State::Present);
    req.key = "hosts".into();
    req.value = Some(json!("d"));
    req.append = true;
    assert!(run(&req).unwrap().changed);

    assert_eq!(fs::read_to_string(&p).unwrap(), "hosts:\n- a\n- c\n- d\n");
}

#[test]
fn present_with_edit_list() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("edits.json");
    fs::write(&p, "{}").unwrap();

    let req: Request = serde_json::from_value(json!({
        "src": p,
        "content_type": "json",
        "edits": [
            {"key": "a", "value": 1},
            {"key": "flags", "value": "on", "value_type": "bool"},
            {"key": "names", "value": "x", "action": "append"}
        ]
    }))
    .unwrap();
    assert_eq!(req.content_type, ContentType::Json);
    let resp = run(&req).unwrap();
    assert!(resp.changed);
    assert_eq!(resp.result.as_array().map(Vec::len), Some(3));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&p).unwrap()).unwrap();
    assert_eq!(written, json!({"a": 1, "flags": true, "names": ["x"]}));
}

#[test]
fn present_without_edits_rewrites_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("fmt.json");
    fs::write(&p, r#"{"a":[1,2]}"#).unwrap();

    let mut req = request(&p, State::Present);
    req.content_type = ContentType::Json;
    let resp = run(&req).unwrap();
    assert!(resp.changed);
    assert_eq!(resp.result, json!({"a": [1, 2]}));
    assert_eq!(
        fs::read_to_string(&p).unwrap(),
        "{\n    \"a\": [\n        1,\n        2\n    ]\n}\n"
    );
}

#[test]
fn present_with_identical_inline_content_is_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("same.yml");
    fs::write(&p, "a: 1\n").unwrap();

    let mut req = request(&p, State::Present);
    req.content = Some(json!("a: 1"));
    let resp = run(&req).unwrap();
    assert!(!resp.changed);
    assert_eq!(resp.result, json!({"a": 1}));
}

#[test]
fn inline_content_without_src_stays_in_memory() {
    let req = Request {
        content: Some(json!({"a": {"b": 1}})),
        key: "a.c".into(),
        value: Some(json!("2")),
        ..Request::default()
    };
    let resp = run(&req).unwrap();
    assert!(resp.changed);
    assert_eq!(
        resp.result,
        json!([{"key": "a.c", "edit": {"a": {"b": 1, "c": 2}}}])
    );

    let req = Request {
        content: Some(json!({"a": 1})),
        ..Request::default()
    };
    let resp = run(&req).unwrap();
    assert!(!resp.changed);
    assert_eq!(resp.result, json!({"a": 1}));
}

#[test]
fn absent_deletes_and_pops() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("rm.yml");
    fs::write(&p, "a: 1\nb:\n- x\n- y\n").unwrap();

    let mut req = request(&p, State::Absent);
    req.key = "a".into();
    let resp = run(&req).unwrap();
    assert!(resp.changed);
    assert_eq!(resp.result, json!({"b": ["x", "y"]}));
    assert!(!run(&req).unwrap().changed);

    let mut req = request(&p, State::Absent);
    req.key = "b".into();
    req.update = true;
    req.value = Some(json!("x"));
    assert!(run(&req).unwrap().changed);

    assert_eq!(fs::read_to_string(&p).unwrap(), "b:\n- y\n");
}

#[test]
fn custom_separator_and_backup() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("sep.yml");
    fs::write(&p, "a.b:\n  c: 1\n").unwrap();

    let req: Request = serde_json::from_value(json!({
        "src": p,
        "separator": "#",
        "key": "a.b#c",
        "value": "2",
        "backup": true
    }))
    .unwrap();
    assert!(run(&req).unwrap().changed);
    assert_eq!(fs::read_to_string(&p).unwrap(), "a.b:\n  c: 2\n");

    let backups = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("sep.yml.2"))
        .count();
    assert_eq!(backups, 1);
}

#[test]
fn absent_pop_without_value_leaves_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("keep.yml");
    let original = "a:\n  'null': 1\n  b: 2\n";
    fs::write(&p, original).unwrap();

    let mut req = request(&p, State::Absent);
    req.key = "a".into();
    req.update = true;
    let resp = run(&req).unwrap();
    assert!(!resp.changed);
    assert_eq!(resp.result, json!({"a": {"null": 1, "b": 2}}));
    assert_eq!(fs::read_to_string(&p).unwrap(), original);
}

#[test]
fn inline_content_stands_in_for_a_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("missing.yml");

    let mut req = request(&p, State::List);
    req.content = Some(json!({"a": {"b": 3}}));
    req.key = "a.b".into();
    assert_eq!(run(&req).unwrap().result, json!(3));

    let mut req = request(&p, State::Absent);
    req.content = Some(json!("a: 1\nb: 2\n"));
    req.key = "a".into();
    let resp = run(&req).unwrap();
    assert!(resp.changed);
    assert_eq!(resp.result, json!({"b": 2}));
    assert_eq!(fs::read_to_string(&p).unwrap(), "b: 2\n");
}
