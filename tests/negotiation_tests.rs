#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::dispatch::{get, get_json, json_body, request, send, start_with};
use http::{Method, StatusCode};
use resthost::description::{ContractDescriptor, OperationDescriptor, ParamKind};
use resthost::dispatcher::ServiceDispatcher;
use resthost::negotiate::{DynamicRecord, MessageFormat};
use resthost::sample::{sample_contract, Sample, SampleService, SampleStore};
use resthost::{Reply, RestService, ServiceError};
use std::sync::Arc;

fn seeded() -> (RestService, Arc<ServiceDispatcher>, Arc<SampleStore>) {
    let store = Arc::new(SampleStore::new());
    store.put("widgets", Sample { name: "w1".into(), value: 42 });
    let service = RestService::singleton("sample", SampleService::with_store(Arc::clone(&store)));
    let (service, dispatcher) = start_with(service, sample_contract());
    (service, dispatcher, store)
}

struct Codec;

fn codec_contract() -> ContractDescriptor {
    ContractDescriptor::new("Codec")
        .operation(
            OperationDescriptor::new(Method::POST, "/upload")
                .named("Upload")
                .param("data", ParamKind::Stream)
                .handler(|_: &Codec, call| Ok(call.args.stream("data").map_or(0, <[u8]>::len) as u64)),
        )
        .operation(
            OperationDescriptor::new(Method::POST, "/form")
                .named("Form")
                .param("form", ParamKind::Form)
                .handler(|_: &Codec, call| {
                    call.args
                        .form("form")
                        .and_then(|f| f.get("name"))
                        .map(str::to_string)
                        .ok_or_else(|| ServiceError::bad_request("name is required"))
                }),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/always-json")
                .named("AlwaysJson")
                .with_format(MessageFormat::Json)
                .handler(|_: &Codec, _| Ok(Reply::document(Sample { name: "fixed".into(), value: 1 }))),
        )
        .operation(
            OperationDescriptor::new(Method::GET, "/records")
                .named("Records")
                .handler(|_: &Codec, _| {
                    Ok(vec![
                        DynamicRecord::new().field("id", 1).field("label", "one"),
                        DynamicRecord::new().field("id", 2).field("label", None::<String>),
                    ])
                }),
        )
}

fn codec() -> (RestService, Arc<ServiceDispatcher>) {
    start_with(RestService::singleton("codec", Codec), codec_contract())
}

#[test]
fn test_accept_json_selects_json() {
    let (_service, dispatcher, _store) = seeded();
    let resp = get_json(&dispatcher, "/widgets/w1");
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("content-type"), Some("application/json"));
    assert_eq!(json_body(&resp), serde_json::json!({"name": "w1", "value": 42}));
}

#[test]
fn test_no_accept_falls_back_to_xml() {
    let (_service, dispatcher, _store) = seeded();
    let resp = get(&dispatcher, "/widgets/w1");
    assert_eq!(resp.header("content-type"), Some("application/xml"));
    let body = resp.body_str();
    assert!(body.starts_with("<Sample>"), "{body}");
    assert!(body.contains("<name>w1</name>"), "{body}");
    assert!(body.contains("<value>42</value>"), "{body}");
}

#[test]
fn test_text_xml_accept_selects_xml() {
    let (_service, dispatcher, _store) = seeded();
    let resp = send(&dispatcher, request(Method::GET, "/widgets/w1").with_header("Accept", "text/xml, application/json"));
    assert_eq!(resp.header("content-type"), Some("application/xml"));
}

#[test]
fn test_json_suffix_selects_json_without_accept() {
    let (_service, dispatcher, _store) = seeded();
    let resp = get(&dispatcher, "/widgets.json");
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("content-type"), Some("application/json"));
    assert_eq!(resp.body_str(), "[]");
}

#[test]
fn test_list_renders_one_element_per_item_in_xml() {
    let (_service, dispatcher, store) = seeded();
    store.put("widgets", Sample { name: "w2".into(), value: 7 });
    let body = get(&dispatcher, "/widgets").body_str().to_string();
    assert!(body.starts_with("<ArrayOfSample>"), "{body}");
    assert_eq!(body.matches("<Sample>").count(), 2, "{body}");
}

#[test]
fn test_xml_body_is_decoded() {
    let (_service, dispatcher, store) = seeded();
    let resp = send(
        &dispatcher,
        request(Method::POST, "/gadgets")
            .with_header("Content-Type", "application/xml; charset=utf-8")
            .with_body("<Sample><name>g1</name><value>3</value></Sample>"),
    );
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(store.get("gadgets", "g1").map(|s| s.value), Some(3));
}

#[test]
fn test_malformed_json_body_is_bad_request() {
    let (_service, dispatcher, _store) = seeded();
    let resp = send(
        &dispatcher,
        request(Method::POST, "/gadgets")
            .with_header("Content-Type", "application/json")
            .with_body("{\"name\":"),
    );
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.body_str().contains("Decode"), "{}", resp.body_str());
}

#[test]
fn test_unsupported_content_type_is_bad_request() {
    let (_service, dispatcher, store) = seeded();
    let resp = send(
        &dispatcher,
        request(Method::POST, "/gadgets")
            .with_header("Content-Type", "text/csv")
            .with_body("name,value"),
    );
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(store.list("gadgets").len(), 0);
}

#[test]
fn test_missing_body_reaches_the_handler_unbound() {
    let (_service, dispatcher, _store) = seeded();
    let resp = send(&dispatcher, request(Method::POST, "/gadgets"));
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.body_str().contains("body is required"), "{}", resp.body_str());
}

#[test]
fn test_octet_stream_binds_raw_bytes() {
    let (_service, dispatcher) = codec();
    let resp = send(
        &dispatcher,
        request(Method::POST, "/upload")
            .with_header("Content-Type", "application/octet-stream")
            .with_body(vec![0u8; 5]),
    );
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body_str(), "5");
}

#[test]
fn test_form_body_binds_fields() {
    let (_service, dispatcher) = codec();
    let resp = send(
        &dispatcher,
        request(Method::POST, "/form")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body("name=Jane+Doe&age=40"),
    );
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body_str(), "Jane Doe");
}

#[test]
fn test_operation_format_overrides_accept() {
    let (_service, dispatcher) = codec();
    let resp = send(&dispatcher, request(Method::GET, "/always-json").with_header("Accept", "application/xml"));
    assert_eq!(resp.header("content-type"), Some("application/json"));
    assert_eq!(json_body(&resp)["name"], "fixed");
}

#[test]
fn test_dynamic_records_in_both_formats() {
    let (_service, dispatcher) = codec();

    let resp = get_json(&dispatcher, "/records");
    assert_eq!(
        json_body(&resp),
        serde_json::json!([{"id": 1, "label": "one"}, {"id": 2, "label": null}])
    );

    let xml = get(&dispatcher, "/records").body_str().to_string();
    assert!(xml.starts_with(r#"<ArrayOfDynamic xmlns="http://tempuri.org">"#), "{xml}");
    assert!(xml.contains("<item><id>1</id><label>one</label></item>"), "{xml}");
    assert!(xml.contains("<item><id>2</id><label/></item>"), "{xml}");
}

#[test]
fn test_stats_record() {
    let (_service, dispatcher, _store) = seeded();
    let resp = get_json(&dispatcher, "/stats");
    let body = json_body(&resp);
    assert_eq!(body["types"], 1);
    assert_eq!(body["objects"], 1);
    assert_eq!(body["calls"], 1);

    let xml = get(&dispatcher, "/stats").body_str().to_string();
    assert!(xml.contains("<objects>1</objects>"), "{xml}");
}
