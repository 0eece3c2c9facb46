//! Event binding tests: adapter delivery, unbinding and dependency tracking

use livemodel::{
    Result,
    model::{
        Delivery, HandlerSpec, Model, MutationKind, Property, Value,
        events::{APPEND_HTML, EventDispatcher},
    },
};
use serde_json::json;

use crate::helpers::*;

#[test]
fn test_successful_event_on_set() -> Result<()> {
    let (mut model, recorder) = linked_model();
    model.init(doc(json!({ "picHeight": 14 })));
    model.events_mut().bind("picHeight", ("test", "attr", "height"));

    model.set("picHeight", 11)?;
    model.set("picHeight", 11)?;

    let calls = recorder.calls();
    assert_eq!(calls.len(), 2);
    for call in calls {
        assert_eq!(
            call,
            Call {
                id: "test".to_string(),
                method: "attr".to_string(),
                property: Some(Property::Name("height".to_string())),
                view_func: None,
                value: Value::Int(11),
            }
        );
    }
    Ok(())
}

#[test]
fn test_unsuccessful_event_unbinds() -> Result<()> {
    let (mut model, recorder) = linked_model_with(Recorder::gone());
    model.init(doc(json!({ "picHeight": 14 })));
    model.events_mut().bind("picHeight", ("test", "attr", "height"));

    model.set("picHeight", 11)?;
    assert_eq!(model.events().bindings_for("picHeight"), 0);
    model.set("picHeight", 11)?;

    assert_eq!(recorder.count(), 1);
    assert!(model.events().is_empty());
    Ok(())
}

#[test]
fn test_event_on_reference_set() -> Result<()> {
    let (mut model, recorder) = linked_model();
    let data = users_doc(&model, 0);
    model.init(data);
    model.events_mut().bind(
        "user.colors.1",
        HandlerSpec::new("test", "prop").property(["style", "color"]),
    );

    // Write through two references onto info.favoriteColors.1
    model.set("user.colors.1", "violet")?;
    // Re-point the keyed reference: the binding now sees info.users.1.colors.1
    model.set("userIndex", 1)?;

    let values: Vec<Value> = recorder.calls().into_iter().map(|c| c.value).collect();
    assert_eq!(values, vec![Value::from("violet"), Value::from("white")]);
    for call in recorder.calls() {
        assert_eq!(call.id, "test");
        assert_eq!(call.method, "prop");
        assert_eq!(
            call.property,
            Some(Property::Path(vec!["style".to_string(), "color".to_string()]))
        );
        assert_eq!(call.view_func, None);
    }
    Ok(())
}

#[test]
fn test_push_delivers_append() -> Result<()> {
    let (mut model, recorder) = linked_model();
    model.init(doc(json!({ "stuff": { "items": ["item1", [8, 3, "q"], "item3"] } })));
    model
        .events_mut()
        .bind("stuff.items", HandlerSpec::new("list", "html").view_func("stuff"));

    model.push("stuff.items", "hey")?;

    assert_eq!(
        recorder.calls(),
        vec![Call {
            id: "list".to_string(),
            method: APPEND_HTML.to_string(),
            property: None,
            view_func: Some("stuff".to_string()),
            value: Value::from("hey"),
        }]
    );
    assert_eq!(
        model.get("stuff.items")?,
        Some(doc(json!(["item1", [8, 3, "q"], "item3", "hey"])))
    );
    Ok(())
}

#[test]
fn test_unrelated_paths_do_not_fire() -> Result<()> {
    let (mut model, recorder) = linked_model();
    model.init(doc(json!({ "a": 1, "b": 2, "ab": 3 })));
    model.events_mut().bind("a", ("x", "text"));

    model.set("b", 5)?;
    model.set("ab", 5)?;
    assert_eq!(recorder.count(), 0);

    model.set("a", 5)?;
    assert_eq!(recorder.count(), 1);
    Ok(())
}

#[test]
fn test_replacing_ancestor_fires_descendant_bindings() -> Result<()> {
    let (mut model, recorder) = linked_model();
    model.init(doc(json!({ "page": { "title": "old" } })));
    model.events_mut().bind("page.title", ("title", "text"));

    model.set("page", doc(json!({ "title": "new" })))?;
    assert_eq!(recorder.last().map(|c| c.value), Some(Value::from("new")));

    // A replaced subtree without the bound leaf delivers null
    model.set("page", doc(json!({})))?;
    assert_eq!(recorder.last().map(|c| c.value), Some(Value::Null));
    Ok(())
}

#[test]
fn test_writes_to_descendants_do_not_fire_ancestor_bindings() -> Result<()> {
    let (mut model, recorder) = linked_model();
    model.init(doc(json!({ "page": { "title": "old" } })));
    model.events_mut().bind("page", ("page", "html"));

    model.set("page.title", "new")?;
    assert_eq!(recorder.count(), 0);
    Ok(())
}

#[test]
fn test_binding_through_reference_fires_on_target_write() -> Result<()> {
    let (mut model, recorder) = linked_model();
    model.init(Value::object([
        ("target", doc(json!({ "v": 1 }))),
        ("alias", model.reference("target").into()),
    ]));
    model.events_mut().bind("alias.v", ("v", "text"));

    model.set("target.v", 2)?;
    assert_eq!(recorder.count(), 1);

    // Replacing the alias itself re-points the binding
    model.set("alias", doc(json!({ "v": 9 })))?;
    assert_eq!(recorder.count(), 2);
    assert_eq!(recorder.last().map(|c| c.value), Some(Value::Int(9)));

    // The old target no longer matters
    model.set("target.v", 3)?;
    assert_eq!(recorder.count(), 2);
    Ok(())
}

#[test]
fn test_replacing_holder_of_key_fires_keyed_binding() -> Result<()> {
    let (mut model, recorder) = linked_model();
    model.init(Value::object([
        ("users", doc(json!([{ "name": "a" }, { "name": "b" }]))),
        ("sel", doc(json!({ "i": 0 }))),
        ("user", model.reference_keyed("users", "sel.i").into()),
    ]));
    model.events_mut().bind("user.name", ("name", "text"));

    model.set("sel", doc(json!({ "i": 1 })))?;
    assert_eq!(recorder.count(), 1);
    assert_eq!(recorder.last().map(|c| c.value), Some(Value::from("b")));
    Ok(())
}

#[test]
fn test_replacing_holder_of_alias_fires_binding_through_it() -> Result<()> {
    let (mut model, recorder) = linked_model();
    model.init(Value::object([
        ("a", doc(json!({ "v": 1 }))),
        ("t", doc(json!({ "v": 2 }))),
        ("holder", Value::object([("alias", Value::from(model.reference("a")))])),
    ]));
    model.events_mut().bind("holder.alias.v", ("v", "text"));

    let holder = Value::object([("alias", Value::from(model.reference("t")))]);
    model.set("holder", holder)?;
    assert_eq!(recorder.count(), 1);
    assert_eq!(recorder.last().map(|c| c.value), Some(Value::Int(2)));

    // The old target is no longer read
    model.set("a.v", 3)?;
    assert_eq!(recorder.count(), 1);
    Ok(())
}

#[test]
fn test_function_bindings_fire_on_argument_change() -> Result<()> {
    let (mut model, recorder) = linked_model();
    model.init(Value::object([
        ("a", Value::Int(1)),
        ("b", Value::Int(2)),
        ("sum", model.func("add").into()),
    ]));
    model.make_func("add", ["a", "b"], |args| {
        Value::Int(args.iter().filter_map(Value::as_int).sum())
    });
    model.events_mut().bind("sum", ("total", "text"));

    model.set("b", 10)?;
    assert_eq!(recorder.last().map(|c| c.value), Some(Value::Int(11)));
    Ok(())
}

#[test]
fn test_push_to_ancestor_of_binding_fires_with_current_value() -> Result<()> {
    let (mut model, recorder) = linked_model();
    model.init(doc(json!({ "list": ["a"] })));
    model.events_mut().bind("list.1", ("second", "text"));

    // Push does not replace the subtree, so only exact matches and
    // dependencies fire
    model.push("list", "b")?;
    assert_eq!(recorder.count(), 0);

    model.set("list.1", "B")?;
    assert_eq!(recorder.last().map(|c| c.value), Some(Value::from("B")));
    Ok(())
}

#[test]
fn test_several_bindings_on_one_path() -> Result<()> {
    let (mut model, recorder) = linked_model();
    model.init(doc(json!({ "n": 0 })));
    let first = model.events_mut().bind("n", ("one", "text"));
    model.events_mut().bind("n", ("two", "text"));
    assert_eq!(model.events().bindings_for("n"), 2);

    model.set("n", 1)?;
    assert_eq!(recorder.count(), 2);

    assert!(model.events_mut().unbind(first));
    assert!(!model.events_mut().unbind(first));
    recorder.clear();
    model.set("n", 2)?;
    assert_eq!(recorder.calls().len(), 1);
    assert_eq!(recorder.calls()[0].id, "two");

    assert_eq!(model.events_mut().unbind_path("n"), 1);
    assert!(model.events().is_empty());
    Ok(())
}

#[test]
fn test_unresolvable_binding_is_skipped() -> Result<()> {
    let (mut model, recorder) = linked_model();
    model.init(doc(json!({ "a": 1, "n": 0 })));
    model.events_mut().bind("a.deeper", ("bad", "text"));
    model.events_mut().bind("n", ("good", "text"));

    model.set("n", 1)?;
    assert_eq!(recorder.count(), 1);
    // Skipped, not unbound
    assert_eq!(model.events().bindings_for("a.deeper"), 1);
    Ok(())
}

#[test]
fn test_server_does_not_deliver() -> Result<()> {
    let recorder = Recorder::new();
    let mut model = server_model();
    model.link(recorder.clone());
    assert!(!model.is_linked());

    model.init(doc(json!({ "n": 0 })));
    model.events_mut().bind("n", ("n", "text"));
    model.set("n", 1)?;
    assert_eq!(recorder.count(), 0);
    assert_eq!(model.events().len(), 1);
    Ok(())
}

#[test]
fn test_init_does_not_notify() {
    let (mut model, recorder) = linked_model();
    model.events_mut().bind("n", ("n", "text"));
    model.init(doc(json!({ "n": 5 })));
    assert_eq!(recorder.count(), 0);
}

#[test]
fn test_closure_adapter() -> Result<()> {
    let mut model = Model::new();
    let mut seen = 0;
    model.link(
        move |_id: &str, _method: &str, _prop: Option<&Property>, _view: Option<&str>, value: &Value| {
            seen += 1;
            Delivery::from(value != &Value::Null && seen < 2)
        },
    );
    model.init(doc(json!({ "n": 0 })));
    model.events_mut().bind("n", ("n", "text"));

    model.set("n", 1)?;
    assert_eq!(model.events().len(), 1);
    model.set("n", 2)?;
    assert!(model.events().is_empty());

    assert!(model.unlink().is_some());
    assert!(!model.is_linked());
    Ok(())
}

#[test]
fn test_dispatcher_standalone() {
    let mut events = EventDispatcher::new();
    events.bind("a.b", ("x", "text"));
    events.bind("c", ("y", "text"));
    assert_eq!(events.patterns().collect::<Vec<_>>(), vec!["a.b", "c"]);
    assert_eq!(events.len(), 2);

    let mut recorder = Recorder::new();
    let calls = events.notify(
        &"a.b".into(),
        MutationKind::Set,
        &Value::Int(1),
        |pattern| {
            Ok(livemodel::model::BindingView {
                real_path: pattern.clone(),
                dependencies: Default::default(),
                value: Some(Value::Int(1)),
            })
        },
        &mut recorder,
    );
    assert_eq!(calls, 1);
    assert_eq!(recorder.calls()[0].id, "x");
}
