//! Reference tests: aliasing, keyed indirection, alias replacement and cycles

use livemodel::{
    Result,
    model::{Model, PathBuf, Reference, Value},
};
use serde_json::json;

use crate::helpers::*;

#[test]
fn test_set_and_get_references() -> Result<()> {
    let mut model = server_model();
    model.init(Value::object([
        (
            "info",
            Value::object([
                (
                    "users",
                    Value::array([
                        Value::object([
                            ("name", Value::from("user1")),
                            ("color", model.reference("info.favoriteColors").into()),
                        ]),
                        Value::object([("name", "ben"), ("color", "purple")]),
                    ]),
                ),
                ("favoriteColors", Value::array(["aqua", "orange"])),
            ]),
        ),
        ("userIndex", 1.into()),
        ("user", model.reference_keyed("info.users", "userIndex").into()),
    ]));

    assert_eq!(model.get("user.name")?, Some(Value::from("ben")));
    model.set("user.color", "green")?;
    assert_eq!(model.get("info.users.1.color")?, Some(Value::from("green")));

    // Changing the key moves the alias
    model.set("userIndex", 0)?;
    assert_eq!(model.get("user.color.0")?, Some(Value::from("aqua")));

    // Writes below a reference land on the referenced object, writes at a
    // reference replace only the alias
    model.set("user.color.1", "pink")?;
    model.set("user.color", "red")?;
    assert_eq!(model.get("user.color")?, Some(Value::from("red")));
    assert_eq!(
        model.get("info.favoriteColors")?,
        Some(doc(json!(["aqua", "pink"])))
    );
    Ok(())
}

#[test]
fn test_reference_is_transparent_for_reads() -> Result<()> {
    let mut model = Model::new();
    model.init(Value::object([
        ("a", doc(json!({ "b": { "c": 1 } }))),
        ("r", model.reference("a.b").into()),
    ]));

    assert_eq!(model.get("r")?, model.get("a.b")?);
    assert_eq!(model.get("r.c")?, Some(Value::Int(1)));

    let resolution = model.resolve("r.c")?;
    assert_eq!(resolution.real_path, PathBuf::parse("a.b.c"));
    Ok(())
}

#[test]
fn test_writes_through_reference_are_visible_at_target() -> Result<()> {
    let mut model = Model::new();
    model.init(Value::object([
        ("a", doc(json!({ "b": { "c": 1 } }))),
        ("r", model.reference("a.b").into()),
    ]));

    model.set("r.c", 2)?;
    assert_eq!(model.get("a.b.c")?, Some(Value::Int(2)));

    model.set("a.b.d", "new")?;
    assert_eq!(model.get("r.d")?, Some(Value::from("new")));
    Ok(())
}

#[test]
fn test_replaced_alias_is_independent() -> Result<()> {
    let mut model = Model::new();
    model.init(Value::object([
        ("target", doc(json!({ "v": 1 }))),
        ("alias", model.reference("target").into()),
    ]));

    model.set("alias", doc(json!({ "v": 100 })))?;
    model.set("alias.v", 200)?;
    model.set("target.v", 2)?;

    assert_eq!(model.get("alias.v")?, Some(Value::Int(200)));
    assert_eq!(model.get("target.v")?, Some(Value::Int(2)));
    Ok(())
}

#[test]
fn test_keyed_reference_follows_key() -> Result<()> {
    let mut model = Model::new();
    let data = users_doc(&model, 1);
    model.init(data);

    assert_eq!(model.get("user.name")?, Some(Value::from("ben")));
    for (index, name) in [(0, "user1"), (1, "ben"), (0, "user1")] {
        model.set("userIndex", index)?;
        assert_eq!(model.get("user.name")?, Some(Value::from(name)));
        assert_eq!(
            model.resolve("user.name")?.real_path,
            PathBuf::parse(&format!("info.users.{index}.name"))
        );
    }
    Ok(())
}

#[test]
fn test_text_keys_select_object_members() -> Result<()> {
    let mut model = Model::new();
    model.init(Value::object([
        ("themes", doc(json!({ "dark": { "bg": "black" }, "light": { "bg": "white" } }))),
        ("theme", "dark".into()),
        ("current", model.reference_keyed("themes", "theme").into()),
    ]));

    assert_eq!(model.get("current.bg")?, Some(Value::from("black")));
    model.set("theme", "light")?;
    assert_eq!(model.get("current.bg")?, Some(Value::from("white")));
    Ok(())
}

#[test]
fn test_snapshots_contain_no_markers() -> Result<()> {
    let mut model = Model::new();
    let data = users_doc(&model, 0);
    model.init(data);

    let snapshot = model.get("")?.unwrap();
    assert!(!snapshot.contains_marker());
    assert_eq!(
        model.to_json()?["user"],
        json!({ "name": "user1", "colors": ["aqua", "orange"] })
    );
    Ok(())
}

#[test]
fn test_reference_cycle_is_reported() {
    let mut model = Model::new();
    model.init(Value::object([
        ("a", Value::from(model.reference("b"))),
        ("b", Value::from(model.reference("a"))),
    ]));

    let err = model.get("a").unwrap_err();
    assert!(err.is_cycle_error());
    assert!(model.get("b.x").unwrap_err().is_cycle_error());
    assert!(model.set("a.x", 1).unwrap_err().is_cycle_error());
}

#[test]
fn test_alias_may_be_passed_twice() -> Result<()> {
    let mut model = Model::new();
    model.init(Value::object([
        ("a", Value::object([("x", Value::from(model.reference("b.y"))), ("y", Value::Int(5))])),
        ("b", model.reference("a").into()),
    ]));

    assert_eq!(model.get("b.x")?, Some(Value::Int(5)));
    assert_eq!(model.get("b")?, model.get("a")?);
    assert_eq!(model.get("b")?, Some(doc(json!({ "x": 5, "y": 5 }))));
    Ok(())
}

#[test]
fn test_self_referencing_key_is_a_cycle() {
    let mut model = Model::new();
    model.init(Value::object([
        ("list", Value::array([1, 2])),
        ("pick", model.reference_keyed("list", "pick").into()),
    ]));
    assert!(model.get("pick").unwrap_err().is_cycle_error());
}

#[test]
fn test_write_at_alias_location_does_not_follow() -> Result<()> {
    let mut model = Model::new();
    model.init(Value::object([("a", model.reference("a"))]));

    // Reading a self-alias fails, but replacing it is fine
    assert!(model.get("a").unwrap_err().is_cycle_error());
    model.set("a", 1)?;
    assert_eq!(model.get("a")?, Some(Value::Int(1)));
    assert!(model.resolve("a")?.dependencies.is_empty());
    Ok(())
}

#[test]
fn test_markers_survive_json_roundtrip() -> Result<()> {
    let mut model = Model::new();
    let data = users_doc(&model, 1);
    let json = serde_json::to_string(&data).unwrap();
    let back: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(back, data);

    model.init(back);
    assert_eq!(model.get("user.name")?, Some(Value::from("ben")));
    Ok(())
}

#[test]
fn test_reference_constructors_match() {
    let model = Model::new();
    assert_eq!(model.reference("a.b"), Reference::new("a.b"));
    assert_eq!(
        model.reference_keyed("a", "k").key(),
        Some(&PathBuf::parse("k"))
    );
}
