//! Integration tests for the train ticket tool over HTTP
//!
//! The listing endpoint is mocked with wiremock; the tool is driven through
//! the registry and the dispatcher the same way the agent drives it.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use sdk::tool::Tool;
use sdk::types::ToolInput;
use wayfarer_engine::agent::{Action, ActionDispatcher};
use wayfarer_engine::config::ToolsConfig;
use wayfarer_engine::tools::{HttpTicketSource, TicketQueryTool, ToolRegistry};

fn listing(train: &str, departure: &str) -> Value {
    json!({
        "train_number": train,
        "origin": "Beijing South",
        "destination": "Shanghai Hongqiao",
        "departure_time": departure,
        "arrival_time": "12:28",
        "duration": "04:28",
        "second_class_seat": "available"
    })
}

async fn mount_listings(server: &MockServer, listings: Value) {
    Mock::given(method("GET"))
        .and(path("/api/tickets"))
        .and(query_param("origin", "Beijing"))
        .and(query_param("destination", "Shanghai"))
        .and(query_param("date", "2024-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listings))
        .mount(server)
        .await;
}

fn query_args(extra: Value) -> Map<String, Value> {
    let mut args = json!({
        "origin": "Beijing",
        "destination": "Shanghai",
        "date": "2024-06-01"
    });
    if let (Some(base), Some(extra)) = (args.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    args.as_object().cloned().unwrap()
}

fn dispatcher_for(source: Arc<HttpTicketSource>) -> ActionDispatcher {
    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(TicketQueryTool::new(source, 10))];
    let registry = ToolRegistry::new(tools).unwrap();
    ActionDispatcher::new(Arc::new(registry), Duration::from_secs(5))
}

#[tokio::test]
async fn test_http_source_filters_by_window() {
    let server = MockServer::start().await;
    mount_listings(
        &server,
        json!([
            listing("G1", "07:00"),
            listing("G3", "08:00"),
            listing("G5", "09:30"),
            listing("G7", "not a time")
        ]),
    )
    .await;

    let source = Arc::new(HttpTicketSource::new(format!("{}/api/tickets", server.uri())));
    let tool = TicketQueryTool::new(source, 10);

    let input = ToolInput::from_params(query_args(json!({
        "departure_time_start": "07:30",
        "departure_time_end": "10:00"
    })));
    let output = tool.invoke(input).await.unwrap().into_text();
    let body: Value = serde_json::from_str(&output).unwrap();

    assert_eq!(body["message"], "query succeeded");
    let trains: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["train_number"].as_str())
        .collect();
    assert_eq!(trains, ["G3", "G5"]);

    // fields the source left out read as "-"
    assert_eq!(body["results"][0]["business_seat"], "-");
}

#[tokio::test]
async fn test_results_are_capped() {
    let server = MockServer::start().await;
    let listings: Vec<Value> = (0..25)
        .map(|i| listing(&format!("G{}", i), "10:00"))
        .collect();
    mount_listings(&server, Value::Array(listings)).await;

    let mut config = ToolsConfig::default();
    config.ticket_query.enabled = true;
    config.ticket_query.endpoint = format!("{}/api/tickets", server.uri());
    let registry = ToolRegistry::from_config(&config).unwrap();

    let dispatcher = ActionDispatcher::new(Arc::new(registry), Duration::from_secs(5));
    let action = Action::new("query_train_tickets", query_args(json!({})));
    let observation = dispatcher.execute(Some(&action)).await;

    let body: Value = serde_json::from_str(&observation).unwrap();
    assert_eq!(body["results"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_source_failure_becomes_observation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tickets"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let source = Arc::new(HttpTicketSource::new(format!("{}/api/tickets", server.uri())));
    let dispatcher = dispatcher_for(source);

    let action = Action::new("query_train_tickets", query_args(json!({})));
    let observation = dispatcher.execute(Some(&action)).await;

    assert!(observation.starts_with("Execution error:"));
    assert!(observation.contains("kind: HttpError"));
    assert!(observation.contains("maintenance"));
}

#[tokio::test]
async fn test_bad_date_never_reaches_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let source = Arc::new(HttpTicketSource::new(format!("{}/api/tickets", server.uri())));
    let dispatcher = dispatcher_for(source);

    let action = Action::new(
        "query_train_tickets",
        query_args(json!({ "date": "June 1st" })),
    );
    let observation = dispatcher.execute(Some(&action)).await;

    assert!(observation.starts_with("Argument validation error:"));
    assert!(observation.contains("YYYY-MM-DD"));
}
