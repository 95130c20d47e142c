//! End-to-end dispatch tests through the public API.
//!
//! Covers:
//! - Default vs. specific handler selection
//! - Empty values treated as absent
//! - Reference and token-list binding into handler output
//! - Bundle titles
//! - Error kinds surfaced to the caller

use anyhow::Context;
use helios_dispatch::{
    BoundParameters, DispatchError, Dispatcher, ErrorKind, HandlerError, HandlerRegistry,
    HandlerSignature, ParamType, ParameterSpec, RawParameterSet,
};
use serde_json::{Value, json};

/// Patient search with an optional `_id`; names the patient after the id.
fn find_patient(params: &BoundParameters) -> Result<Vec<Value>, HandlerError> {
    let mut patient = json!({
        "resourceType": "Patient",
        "id": "1",
        "identifier": [{"system": "system", "value": "identifier123"}]
    });
    if let Some(id) = params.string("_id") {
        patient["name"] = json!([{"family": format!("id{}", id.value())}]);
    }
    Ok(vec![patient])
}

/// Observation search by subject and coded name.
fn search_observation(params: &BoundParameters) -> Result<Value, HandlerError> {
    let subject = params.reference("subject").ok_or("subject not bound")?;
    let names = params.token_list("name").ok_or("name not bound")?;

    let coding: Vec<Value> = names
        .iter()
        .map(|token| match token.system() {
            Some(system) => json!({"system": system, "code": token.code()}),
            None => json!({"code": token.code()}),
        })
        .collect();

    Ok(json!({
        "resourceType": "Observation",
        "id": "1",
        "subject": {"reference": subject.to_string()},
        "name": {"coding": coding}
    }))
}

fn create_dispatcher() -> anyhow::Result<Dispatcher> {
    let mut registry = HandlerRegistry::new();
    registry.register_search(
        "Patient",
        HandlerSignature::new(vec![ParameterSpec::optional("_id", ParamType::String)])?,
        find_patient,
    );
    registry.register_search(
        "Observation",
        HandlerSignature::new(vec![
            ParameterSpec::required("subject", ParamType::Reference),
            ParameterSpec::required("name", ParamType::TokenOrList),
        ])?,
        search_observation,
    );
    Ok(Dispatcher::new(registry))
}

#[test]
fn test_empty_id_is_treated_as_absent() -> anyhow::Result<()> {
    let dispatcher = create_dispatcher()?;
    let raw = RawParameterSet::from_pairs(vec![("_id", "")]);

    let bundle = dispatcher.dispatch("Patient", &raw)?;

    assert_eq!(bundle.len(), 1);
    let patient = bundle.entries()[0].resource();
    assert!(patient.get("name").is_none());
    assert_eq!(bundle.entries()[0].title(), "Patient/1");

    Ok(())
}

#[test]
fn test_id_search_derives_name_and_title() -> anyhow::Result<()> {
    let dispatcher = create_dispatcher()?;
    let raw = RawParameterSet::from_pairs(vec![("_id", "aaa")]);

    let bundle = dispatcher.dispatch("Patient", &raw)?;

    assert_eq!(bundle.len(), 1);
    let entry = &bundle.entries()[0];
    assert_eq!(entry.resource()["name"][0]["family"], "idaaa");
    assert_eq!(entry.title(), "IDAAA (identifier123)");

    Ok(())
}

#[test]
fn test_observation_subject_and_name_list() -> anyhow::Result<()> {
    let dispatcher = create_dispatcher()?;
    let raw = RawParameterSet::from_pairs(vec![
        ("subject", "Patient/100"),
        ("name", "3141-9,8302-2,8287-5,39156-5"),
    ]);

    let bundle = dispatcher.dispatch("Observation", &raw)?;

    assert_eq!(bundle.len(), 1);
    let observation = bundle.entries()[0].resource();
    assert_eq!(observation["subject"]["reference"], "Patient/100");

    let codes: Vec<&str> = observation["name"]["coding"]
        .as_array()
        .context("coding is not an array")?
        .iter()
        .filter_map(|c| c["code"].as_str())
        .collect();
    assert_eq!(codes, vec!["3141-9", "8302-2", "8287-5", "39156-5"]);
    assert_eq!(bundle.entries()[0].title(), "3141-9");

    Ok(())
}

#[test]
fn test_reference_modifier_matches_typed_reference() -> anyhow::Result<()> {
    let dispatcher = create_dispatcher()?;
    let with_modifier = RawParameterSet::from_pairs(vec![
        ("subject:Patient", "100"),
        ("name", "3141-9"),
    ]);
    let typed = RawParameterSet::from_pairs(vec![("subject", "Patient/100"), ("name", "3141-9")]);

    let a = dispatcher.dispatch("Observation", &with_modifier)?;
    let b = dispatcher.dispatch("Observation", &typed)?;
    assert_eq!(a, b);

    Ok(())
}

#[test]
fn test_repeated_name_keys_concatenate() -> anyhow::Result<()> {
    let dispatcher = create_dispatcher()?;
    let split = RawParameterSet::from_pairs(vec![
        ("subject", "Patient/100"),
        ("name", "3141-9,8302-2"),
        ("name", "8287-5"),
    ]);
    let joined = RawParameterSet::from_pairs(vec![
        ("subject", "Patient/100"),
        ("name", "3141-9,8302-2,8287-5"),
    ]);

    assert_eq!(
        dispatcher.dispatch("Observation", &split)?,
        dispatcher.dispatch("Observation", &joined)?
    );

    Ok(())
}

#[test]
fn test_empty_required_value_excludes_handler() -> anyhow::Result<()> {
    let dispatcher = create_dispatcher()?;
    let raw = RawParameterSet::from_pairs(vec![("subject", "Patient/100"), ("name", "")]);

    // With `name` empty, the only Observation handler is not a candidate.
    let err = dispatcher.dispatch("Observation", &raw).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoMatchingHandler);

    Ok(())
}

#[test]
fn test_malformed_token_list() -> anyhow::Result<()> {
    let dispatcher = create_dispatcher()?;
    let raw = RawParameterSet::from_pairs(vec![("subject", "Patient/100"), ("name", "a,,b")]);

    let err = dispatcher.dispatch("Observation", &raw).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedParameterValue);
    assert!(err.to_string().contains("name"));

    Ok(())
}

#[test]
fn test_unknown_resource_type() -> anyhow::Result<()> {
    let dispatcher = create_dispatcher()?;

    let err = dispatcher
        .dispatch("Encounter", &RawParameterSet::new())
        .unwrap_err();

    match err {
        DispatchError::NoMatchingHandler { resource_type, supplied } => {
            assert_eq!(resource_type, "Encounter");
            assert!(supplied.is_empty());
        }
        other => panic!("unexpected error: {}", other),
    }

    Ok(())
}

#[test]
fn test_dispatch_is_deterministic() -> anyhow::Result<()> {
    let dispatcher = create_dispatcher()?;
    let raw = RawParameterSet::from_pairs(vec![("_id", "aaa"), ("_format", "json")]);

    let first = dispatcher.dispatch("Patient", &raw)?;
    for _ in 0..20 {
        assert_eq!(dispatcher.dispatch("Patient", &raw)?, first);
    }

    Ok(())
}

#[test]
fn test_concurrent_dispatch() -> anyhow::Result<()> {
    let dispatcher = create_dispatcher()?;

    std::thread::scope(|scope| {
        for i in 0..8 {
            let dispatcher = &dispatcher;
            scope.spawn(move || {
                let id = format!("p{}", i);
                let raw = RawParameterSet::from_pairs(vec![("_id", id.as_str())]);
                let bundle = dispatcher.dispatch("Patient", &raw).unwrap();
                assert_eq!(
                    bundle.entries()[0].resource()["name"][0]["family"],
                    format!("id{}", id)
                );
            });
        }
    });

    Ok(())
}
