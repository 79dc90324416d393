//! End-to-end tests against a mock Open-Meteo server.
//!
//! These drive the real HTTP fetcher, gateway, tools and message handler;
//! only the upstream API is replaced by wiremock.

use std::sync::Arc;

use meteo_server::gateway::{CURRENT_WEATHER_FIELDS, DAILY_FORECAST_FIELDS};
use meteo_server::transport::MessageHandler;
use meteo_server::{
    weather_registry, GatewayConfig, HttpFetcher, McpMessageHandler, WeatherGateway,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn config_for(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        forecast_base_url: format!("{}/v1", server.uri()),
        geocoding_base_url: format!("{}/geo/v1", server.uri()),
        ..GatewayConfig::default()
    }
}

fn gateway_for(server: &MockServer) -> WeatherGateway {
    let config = config_for(server);
    let fetcher = Arc::new(HttpFetcher::new(&config).unwrap());
    WeatherGateway::new(fetcher, &config)
}

fn handler_for(server: &MockServer) -> McpMessageHandler {
    let registry = weather_registry(Arc::new(gateway_for(server))).unwrap();
    McpMessageHandler::new(Arc::new(registry))
}

fn parse(s: &str) -> Value {
    serde_json::from_str(s).unwrap()
}

/// Sample current-weather response, trimmed
fn sample_current() -> Value {
    json!({
        "latitude": 40.710335,
        "longitude": -73.99307,
        "generationtime_ms": 0.05,
        "utc_offset_seconds": 0,
        "timezone": "GMT",
        "current_units": {"time": "iso8601", "temperature_2m": "°C"},
        "current": {"time": "2024-01-15T12:00", "temperature_2m": 20.5, "is_day": 1}
    })
}

#[tokio::test]
async fn test_current_weather_passes_payload_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "40.7128"))
        .and(query_param("longitude", "-74.006"))
        .and(query_param("current", CURRENT_WEATHER_FIELDS.join(",")))
        .and(header("user-agent", "weather-app/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_current()))
        .expect(1)
        .mount(&server)
        .await;

    let out = gateway_for(&server)
        .get_current_weather(40.7128, -74.0060, &CancellationToken::new())
        .await;
    assert_eq!(parse(&out), sample_current());
}

#[tokio::test]
async fn test_payload_keeps_upstream_key_order() {
    let server = MockServer::start().await;
    let body = r#"{"latitude":40.7,"longitude":-74.0,"current":{"time":"t","temperature_2m":20.5}}"#;
    Mock::given(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let out = gateway_for(&server)
        .get_current_weather(40.7, -74.0, &CancellationToken::new())
        .await;
    let expected = "{\n  \"latitude\": 40.7,\n  \"longitude\": -74.0,\n  \"current\": {\n    \"time\": \"t\",\n    \"temperature_2m\": 20.5\n  }\n}";
    assert_eq!(out, expected);
}

#[tokio::test]
async fn test_empty_object_body_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let out = gateway_for(&server)
        .get_current_weather(40.7128, -74.006, &CancellationToken::new())
        .await;
    assert_eq!(
        parse(&out),
        json!({"error": "Unable to fetch current weather data for this location."})
    );
}

#[tokio::test]
async fn test_forecast_clamps_days_upstream() {
    let server = MockServer::start().await;
    for sent in ["16", "1", "5"] {
        Mock::given(path("/v1/forecast"))
            .and(query_param("daily", DAILY_FORECAST_FIELDS.join(",")))
            .and(query_param("forecast_days", sent))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"daily": {"forecast_days": sent}})),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let gw = gateway_for(&server);
    let cancel = CancellationToken::new();
    for (days, sent) in [(20, "16"), (0, "1"), (5, "5")] {
        let out = gw.get_forecast(40.7128, -74.006, days, &cancel).await;
        assert_eq!(parse(&out), json!({"daily": {"forecast_days": sent}}));
    }
}

#[tokio::test]
async fn test_location_query_parameters() {
    let server = MockServer::start().await;
    let payload = json!({"results": [{"name": "New York", "latitude": 40.7128}]});
    Mock::given(path("/geo/v1/search"))
        .and(query_param("name", "New York"))
        .and(query_param("count", "5"))
        .and(query_param("language", "en"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let out = gateway_for(&server)
        .get_location("New York", &CancellationToken::new())
        .await;
    assert_eq!(parse(&out), payload);
}

#[tokio::test]
async fn test_upstream_failure_becomes_envelope() {
    let server = MockServer::start().await;
    Mock::given(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(path("/geo/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let gw = gateway_for(&server);
    let cancel = CancellationToken::new();
    assert_eq!(
        parse(&gw.get_current_weather(1.0, 2.0, &cancel).await),
        json!({"error": "Unable to fetch current weather data for this location."})
    );
    assert_eq!(
        parse(&gw.get_forecast(1.0, 2.0, 3, &cancel).await),
        json!({"error": "Unable to fetch forecast data for this location."})
    );
    assert_eq!(
        parse(&gw.get_location("Paris", &cancel).await),
        json!({"error": "Unable to search for locations."})
    );
}

#[tokio::test]
async fn test_validation_never_reaches_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let gw = gateway_for(&server);
    let cancel = CancellationToken::new();
    gw.get_current_weather(91.0, 0.0, &cancel).await;
    gw.get_forecast(0.0, -200.0, 7, &cancel).await;
    gw.get_location("   ", &cancel).await;
}

#[tokio::test]
async fn test_tools_call_over_json_rpc() {
    let server = MockServer::start().await;
    let payload = json!({"results": [{"name": "New York", "latitude": 40.7128}]});
    Mock::given(path("/geo/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
        .mount(&server)
        .await;

    let handler = handler_for(&server);
    let request = json!({
        "jsonrpc": "2.0",
        "id": 11,
        "method": "tools/call",
        "params": {"name": "get_location", "arguments": {"name": "New York"}}
    });
    let response = parse(&handler.handle_message(request.to_string(), "it".into()).await.unwrap());

    assert_eq!(response["id"], json!(11));
    assert_eq!(response["result"]["isError"], json!(false));
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    assert_eq!(parse(text), payload);
}

#[tokio::test]
async fn test_tools_list_names_all_three_tools() {
    let server = MockServer::start().await;
    let handler = handler_for(&server);
    let request = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});
    let response = parse(&handler.handle_message(request.to_string(), "it".into()).await.unwrap());

    let tools = response["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["get_current_weather", "get_forecast", "get_location"]);

    let forecast = &tools[1];
    assert_eq!(forecast["inputSchema"]["required"], json!(["latitude", "longitude"]));
    assert_eq!(forecast["inputSchema"]["properties"]["days"]["default"], json!(7));
    assert_eq!(forecast["annotations"]["readOnlyHint"], json!(true));
}

#[tokio::test]
async fn test_invalid_coordinates_are_ordinary_results() {
    let server = MockServer::start().await;
    let handler = handler_for(&server);
    let request = json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tools/call",
        "params": {"name": "get_forecast", "arguments": {"latitude": 91.0, "longitude": 0.0, "days": 3}}
    });
    let response = parse(&handler.handle_message(request.to_string(), "it".into()).await.unwrap());

    assert_eq!(response["result"]["isError"], json!(false));
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    assert_eq!(parse(text), json!({"error": "Latitude must be between -90 and 90"}));
}
