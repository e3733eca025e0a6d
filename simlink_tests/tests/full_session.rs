// End-to-end tests for the simulation link.
//
// Each test starts a real MockSimServer on an ephemeral port, connects a
// real SimClient, and drives full command flows over TCP: init → tick →
// water/fertilize, chatty servers, server errors, simulated crashes with
// reconnect. These exercise the same code paths as the live game — the
// only test-specific code is the mock's toy agronomy.

use std::time::Duration;

use furrow_protocol::types::InitContext;
use furrow_simlink::{LinkConfig, LinkError, SimClient};
use simlink_tests::{MockConfig, MockSimServer};

fn client_for(server: &MockSimServer) -> SimClient {
    SimClient::new(LinkConfig {
        host: "127.0.0.1".into(),
        port: server.port(),
        io_timeout: Duration::from_secs(5),
        greeting_timeout: Duration::from_millis(300),
    })
}

fn spring_wheat() -> InitContext {
    InitContext {
        date: "2024-05-01".into(),
        crop: "wheat".into(),
        ..InitContext::default()
    }
}

/// The reference scenario: init on 2024-05-01, then one tick lands on
/// 2024-05-02 with the exact metrics the server computed.
#[test]
fn init_then_tick_reports_exact_metrics() {
    let server = MockSimServer::start(MockConfig::default());
    let mut client = client_for(&server);
    client.set_context(spring_wheat());

    let init = client.initialize(true).unwrap();
    assert_eq!(init.message.as_deref(), Some("initialized"));
    assert_eq!(init.day, "2024-05-01");
    assert!(client.is_initialized());

    let result = client.advance_tick(1).unwrap();
    assert_eq!(result.tick, 1);
    assert_eq!(result.day, "2024-05-02");
    let metrics = result.metrics.unwrap();
    assert_eq!(metrics.soil_moisture, 0.32);
    assert_eq!(metrics.soil_n, 0.05);
    assert_eq!(metrics.yield_rate, 0.0);
    assert_eq!(client.tick_counter(), 1);
}

#[test]
fn water_and_fertilize_each_advance_one_day() {
    let server = MockSimServer::start(MockConfig::default());
    let mut client = client_for(&server);
    client.set_context(spring_wheat());
    client.initialize(true).unwrap();

    let watered = client.water(2.0, 0.75).unwrap();
    assert_eq!(watered.message.as_deref(), Some("water applied"));
    assert_eq!(watered.tick, 1);
    assert_eq!(watered.day, "2024-05-02");

    let fed = client.fertilize(40.0, 0.7).unwrap();
    assert_eq!(fed.message.as_deref(), Some("fertilizer applied"));
    assert_eq!(fed.tick, 2);
    assert_eq!(fed.day, "2024-05-03");
    assert!(fed.metrics.unwrap().soil_moisture > watered.metrics.unwrap().soil_moisture);
}

/// Commands work without an explicit initialize call: the first one runs
/// the init itself.
#[test]
fn first_command_initializes_implicitly() {
    let server = MockSimServer::start(MockConfig::default());
    let mut client = client_for(&server);
    client.set_context(spring_wheat());

    let result = client.advance_tick(3).unwrap();
    assert_eq!(result.tick, 3);
    assert_eq!(result.day, "2024-05-04");
    assert!(client.is_initialized());
}

/// A server that interleaves progress notes with every reply still
/// correlates correctly.
#[test]
fn chatty_server_replies_are_correlated() {
    let server = MockSimServer::start(MockConfig {
        chatter: 2,
        ..MockConfig::default()
    });
    let mut client = client_for(&server);
    client.set_context(spring_wheat());
    client.initialize(true).unwrap();

    for expected_tick in 1..=5 {
        let result = client.advance_tick(1).unwrap();
        assert_eq!(result.tick, expected_tick);
    }
}

#[test]
fn run_reports_finished_at_maturity() {
    let server = MockSimServer::start(MockConfig {
        run_length: 3,
        ..MockConfig::default()
    });
    let mut client = client_for(&server);
    client.set_context(spring_wheat());
    client.initialize(true).unwrap();

    let result = client.advance_tick(2).unwrap();
    assert!(!result.finished);
    let result = client.advance_tick(1).unwrap();
    assert!(result.finished);
    // The engine surfaces `finished` but keeps the session usable.
    assert!(client.is_connected());
    assert!(client.is_initialized());
}

#[test]
fn server_error_surfaces_without_breaking_the_session() {
    let server = MockSimServer::start(MockConfig::default());
    let mut client = client_for(&server);
    client.set_context(InitContext {
        date: "2024-05-01".into(),
        crop: "kudzu".into(),
        ..InitContext::default()
    });

    match client.initialize(true) {
        Err(LinkError::Server(reason)) => assert!(reason.contains("kudzu")),
        other => panic!("expected Server error, got {other:?}"),
    }
    assert!(client.is_connected());
    assert!(!client.is_initialized());

    // Same connection, corrected context: the session recovers.
    client.set_context(spring_wheat());
    let init = client.initialize(true).unwrap();
    assert_eq!(init.day, "2024-05-01");
}

/// Simulated server crash: the failed command invalidates the connection,
/// and the next command reconnects and re-initializes before proceeding.
#[test]
fn reconnects_and_reinitializes_after_server_drop() {
    let server = MockSimServer::start(MockConfig {
        drop_after: Some(1),
        ..MockConfig::default()
    });
    let mut client = client_for(&server);
    client.set_context(spring_wheat());

    client.initialize(true).unwrap();
    assert!(client.is_initialized());

    // The server hung up after the init; this tick fails.
    assert!(client.advance_tick(1).is_err());
    assert!(!client.is_connected());
    assert!(!client.is_initialized());

    // Next command gets a fresh connection and a fresh session. The mock
    // drops each connection after one request, so the implicit init lands
    // and the tick itself hits the hangup again — drive it in two calls.
    let init = client.initialize(true).unwrap();
    assert_eq!(init.day, "2024-05-01");
    assert!(client.is_initialized());
}

#[test]
fn status_works_before_and_after_init() {
    let server = MockSimServer::start(MockConfig::default());
    let mut client = client_for(&server);
    client.set_context(spring_wheat());

    let status = client.status().unwrap();
    assert_eq!(status.message.as_deref(), Some("uninitialized"));
    assert!(!client.is_initialized());

    client.initialize(true).unwrap();
    client.advance_tick(2).unwrap();

    let status = client.status().unwrap();
    assert_eq!(status.message.as_deref(), Some("initialized"));
    assert_eq!(status.tick, 2);
}

#[test]
fn weather_payload_round_trips() {
    let server = MockSimServer::start(MockConfig::default());
    let mut client = client_for(&server);
    client.set_context(spring_wheat());
    client.initialize(true).unwrap();

    let result = client.advance_tick(1).unwrap();
    let weather = result.weather.unwrap();
    assert_eq!(weather.forecast, vec!["rainy"]); // odd tick
    assert!(weather.current_summary.unwrap().contains("2024-05-02"));
    let raw: serde_json::Value =
        serde_json::from_str(&weather.current_json.unwrap()).unwrap();
    assert_eq!(raw["RAIN"], 0.0);
}
