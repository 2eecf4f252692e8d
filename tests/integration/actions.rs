//! Chunked action dispatch: recheck, acknowledge, downtime

use pretty_assertions::assert_eq;
use serde_json::json;
use terminga::{CurrentState, IcingaClient, Item, client::CHUNK_SIZE, config::Auth};
use wiremock::MockServer;
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::*;

fn services(count: usize) -> Vec<Item> {
    (0..count)
        .map(|i| service_item(&format!("host{i:02}"), "ping"))
        .collect()
}

#[tokio::test]
async fn test_queue_check_chunks_45_items_into_three_requests() {
    let server = MockServer::start().await;
    mount_action(&server, "reschedule-check").await;

    let items = services(45);
    test_client(&server).queue_check(&items).await.unwrap();

    let bodies = action_bodies(&server, "reschedule-check").await;
    assert_eq!(bodies.len(), 3);

    let mut offset = 0;
    for (body, expected_size) in bodies.iter().zip([CHUNK_SIZE, CHUNK_SIZE, 5]) {
        assert_eq!(body["type"], "Service");
        assert_eq!(body["force"], true);

        let operands = filter_operands(body["filter"].as_str().unwrap());
        assert_eq!(operands.len(), expected_size);

        for (operand, item) in operands.iter().zip(&items[offset..offset + expected_size]) {
            assert_eq!(operand, &format!("({})", item.filter_expression()));
        }
        offset += expected_size;
    }
    assert_eq!(offset, 45);
}

#[tokio::test]
async fn test_hosts_dispatched_before_services() {
    let server = MockServer::start().await;
    mount_action(&server, "reschedule-check").await;

    let items = vec![service_item("web1", "HTTP"), host_item("web1"), host_item("db1")];
    test_client(&server).queue_check(&items).await.unwrap();

    let bodies = action_bodies(&server, "reschedule-check").await;
    assert_eq!(
        bodies,
        vec![
            json!({
                "type": "Host",
                "filter": r#"(match("web1", host.name)) || (match("db1", host.name))"#,
                "force": true
            }),
            json!({
                "type": "Service",
                "filter": r#"(match("web1", host.name) && match("HTTP", service.name))"#,
                "force": true
            }),
        ]
    );
}

#[tokio::test]
async fn test_empty_selection_sends_nothing() {
    let server = MockServer::start().await;
    mount_action(&server, "reschedule-check").await;

    test_client(&server).queue_check(&[]).await.unwrap();

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_set_ack_payload() {
    let server = MockServer::start().await;
    mount_action(&server, "acknowledge-problem").await;

    let client = test_client(&server);
    client
        .set_ack(&[service_item("web1", "HTTP")], "looking into it", Some(1_700_000_000))
        .await
        .unwrap();
    client
        .set_ack(&[host_item("web1")], "known", None)
        .await
        .unwrap();

    let bodies = action_bodies(&server, "acknowledge-problem").await;
    assert_eq!(
        bodies,
        vec![
            json!({
                "type": "Service",
                "filter": r#"(match("web1", host.name) && match("HTTP", service.name))"#,
                "author": USERNAME,
                "comment": "looking into it",
                "sticky": true,
                "expiry": 1_700_000_000
            }),
            json!({
                "type": "Host",
                "filter": r#"(match("web1", host.name))"#,
                "author": USERNAME,
                "comment": "known",
                "sticky": true
            }),
        ]
    );
}

#[tokio::test]
async fn test_set_ack_for_host_expands_to_all_objects_on_host() {
    let server = MockServer::start().await;
    mount_action(&server, "acknowledge-problem").await;

    let full_state = CurrentState {
        hosts: vec![host_item("db1"), host_item("web1")],
        services: vec![
            service_item("db1", "disk"),
            service_item("db1", "load"),
            service_item("web1", "HTTP"),
        ],
    };

    test_client(&server)
        .set_ack_for_host(&[service_item("db1", "load")], &full_state, "db maintenance", None)
        .await
        .unwrap();

    let bodies = action_bodies(&server, "acknowledge-problem").await;
    assert_eq!(bodies.len(), 2);

    assert_eq!(bodies[0]["type"], "Host");
    assert_eq!(bodies[0]["filter"], r#"(match("db1", host.name))"#);

    assert_eq!(bodies[1]["type"], "Service");
    assert_eq!(
        bodies[1]["filter"],
        r#"(match("db1", host.name) && match("disk", service.name)) || (match("db1", host.name) && match("load", service.name))"#
    );
}

#[tokio::test]
async fn test_set_downtime_payload() {
    let server = MockServer::start().await;
    mount_action(&server, "schedule-downtime").await;

    let mut config = test_config(&server);
    config.author = Some("oncall".to_string());

    IcingaClient::new(config)
        .unwrap()
        .set_downtime(&[service_item("web1", "HTTP")], "deploy", 1_000, 8_200)
        .await
        .unwrap();

    let bodies = action_bodies(&server, "schedule-downtime").await;
    assert_eq!(
        bodies,
        vec![json!({
            "type": "Service",
            "filter": r#"(match("web1", host.name) && match("HTTP", service.name))"#,
            "author": "oncall",
            "comment": "deploy",
            "start_time": 1_000,
            "end_time": 8_200,
            "child_options": "DowntimeTriggeredChildren"
        })]
    );
}

#[tokio::test]
async fn test_set_downtime_for_host_targets_host_objects_only() {
    let server = MockServer::start().await;
    mount_action(&server, "schedule-downtime").await;

    let selection = [
        service_item("web1", "HTTP"),
        service_item("db1", "disk"),
        service_item("web1", "SSH"),
    ];

    test_client(&server)
        .set_downtime_for_host(&selection, "reboot", 100, 200)
        .await
        .unwrap();

    let bodies = action_bodies(&server, "schedule-downtime").await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["type"], "Host");
    assert_eq!(
        bodies[0]["filter"],
        r#"(match("db1", host.name)) || (match("web1", host.name))"#
    );
    assert_eq!(bodies[0]["child_options"], "DowntimeTriggeredChildren");
}

#[tokio::test]
async fn test_token_auth_sent_as_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/actions/reschedule-check"))
        .and(bearer_token("s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.auth = Some(Auth::Token {
        token: "s3cret".to_string(),
    });

    IcingaClient::new(config)
        .unwrap()
        .queue_check(&[host_item("web1")])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_names_are_escaped_in_filters() {
    let server = MockServer::start().await;
    mount_action(&server, "reschedule-check").await;

    test_client(&server)
        .queue_check(&[service_item("web1", r#"disk "C:\""#)])
        .await
        .unwrap();

    let bodies = action_bodies(&server, "reschedule-check").await;
    assert_eq!(
        bodies[0]["filter"],
        r#"(match("web1", host.name) && match("disk \"C:\\\"", service.name))"#
    );
}
