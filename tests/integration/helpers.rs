//! Fixtures shared by the API tests

#![allow(dead_code)]

use serde_json::{Value, json};
use terminga::{
    ClientConfig, IcingaClient, Item, ItemKind,
    config::Auth,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const USERNAME: &str = "root";
pub const PASSWORD: &str = "icinga";

/// Host entry of a `results` array, counters encoded as floats like Icinga does
pub fn host_result(name: &str, state: f64) -> Value {
    json!({
        "name": name,
        "type": "Host",
        "attrs": {
            "display_name": name,
            "state": state,
            "state_type": 1.0,
            "acknowledgement": 0.0,
            "downtime_depth": 0.0,
            "last_check_result": {
                "output": format!("PING {}", if state == 0.0 { "OK" } else { "CRITICAL" })
            }
        },
        "joins": {},
        "meta": {}
    })
}

pub fn service_result(host: &str, service: &str, state: f64) -> Value {
    json!({
        "name": format!("{host}!{service}"),
        "type": "Service",
        "attrs": {
            "host_name": host,
            "display_name": service,
            "state": state,
            "state_type": 1.0,
            "acknowledgement": 0.0,
            "downtime_depth": 0.0,
            "last_check_result": null
        },
        "joins": {},
        "meta": {}
    })
}

pub fn results(entries: Vec<Value>) -> Value {
    json!({ "results": entries })
}

pub fn host_item(name: &str) -> Item {
    Item::from_result(ItemKind::Host, &host_result(name, 0.0)).unwrap()
}

pub fn service_item(host: &str, service: &str) -> Item {
    Item::from_result(ItemKind::Service, &service_result(host, service, 0.0)).unwrap()
}

pub fn test_config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(
        server.uri(),
        Some(Auth::Basic {
            username: USERNAME.to_string(),
            password: Some(PASSWORD.to_string()),
        }),
    )
}

pub fn test_client(server: &MockServer) -> IcingaClient {
    IcingaClient::new(test_config(server)).unwrap()
}

/// Accept every POST to the given action that asks for JSON
pub async fn mount_action(server: &MockServer, action: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/api/v1/actions/{action}")))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(vec![])))
        .mount(server)
        .await;
}

pub async fn mount_objects(server: &MockServer, kind: &str, entries: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/objects/{kind}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(entries)))
        .mount(server)
        .await;
}

/// JSON bodies of all requests the server received for `action`, in order
pub async fn action_bodies(server: &MockServer, action: &str) -> Vec<Value> {
    let requests: Vec<Request> = server.received_requests().await.unwrap_or_default();
    let expected_path = format!("/api/v1/actions/{action}");

    requests
        .iter()
        .filter(|request| request.url.path() == expected_path)
        .map(|request| request.body_json::<Value>().unwrap())
        .collect()
}

/// Query pairs of all GET requests for `objects/<kind>`
pub async fn object_queries(server: &MockServer, kind: &str) -> Vec<Vec<(String, String)>> {
    let requests: Vec<Request> = server.received_requests().await.unwrap_or_default();
    let expected_path = format!("/api/v1/objects/{kind}");

    requests
        .iter()
        .filter(|request| request.url.path() == expected_path)
        .map(|request| {
            request
                .url
                .query_pairs()
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect()
        })
        .collect()
}

/// Parenthesized operands of an OR-joined batch filter
pub fn filter_operands(filter: &str) -> Vec<String> {
    filter.split(" || ").map(str::to_string).collect()
}
