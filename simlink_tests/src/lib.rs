// Test-only simulation server for end-to-end link tests.
//
// `MockSimServer` mirrors the real crop simulation server's wire behavior:
// a greeting line on accept, then one JSON reply line per request, with the
// same action vocabulary and reply shapes. The agronomy is a deterministic
// toy (linear soil curves, calendar arithmetic) — the point is exercising
// the client's protocol engine over real TCP, not growing realistic wheat.
//
// Knobs for failure-path tests:
// - `chatter`: informational lines emitted before every reply, so tests can
//   prove the correlator skips them.
// - `drop_after`: hang up after N requests on a connection, simulating a
//   server crash mid-session.
// - `run_length`: ticks until the simulated run reports `finished`.
//
// The accept loop handles one connection at a time (the protocol is one
// client, one in-flight request) and keeps accepting, so reconnect tests
// get a fresh session on the same port — matching the real server, which
// keeps per-connection sessions only.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{Days, NaiveDate};
use furrow_protocol::framing::{FrameReader, write_frame};
use serde_json::{Value, json};

const KNOWN_CROPS: [&str; 4] = ["wheat", "barley", "maize", "potato"];

/// Behavior knobs for a mock server instance.
#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Informational lines sent before each reply.
    pub chatter: u32,
    /// Close the connection after this many requests (per connection).
    pub drop_after: Option<u32>,
    /// Ticks until the run reports `finished == true`.
    pub run_length: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            chatter: 0,
            drop_after: None,
            run_length: 120,
        }
    }
}

/// A scripted simulation server on an ephemeral localhost port.
pub struct MockSimServer {
    port: u16,
    keep_running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MockSimServer {
    pub fn start(config: MockConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("local addr").port();
        listener
            .set_nonblocking(true)
            .expect("nonblocking listener");

        let keep_running = Arc::new(AtomicBool::new(true));
        let flag = keep_running.clone();
        let thread = thread::spawn(move || {
            while flag.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let _ = stream.set_nonblocking(false);
                        handle_connection(stream, &config);
                    }
                    Err(_) => thread::sleep(Duration::from_millis(10)),
                }
            }
        });

        Self {
            port,
            keep_running,
            thread: Some(thread),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for MockSimServer {
    fn drop(&mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Per-connection session state, mirroring the real server's.
struct SessionState {
    initialized: bool,
    tick: u64,
    day: NaiveDate,
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig) {
    // Bounded reads so a wedged test cannot hang the accept loop forever.
    let _ = stream.set_read_timeout(Some(Duration::from_secs(10)));
    if send_line(&mut stream, &json!({"ok": true, "message": "ready"})).is_err() {
        return;
    }

    let mut session = SessionState {
        initialized: false,
        tick: 0,
        day: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
    };
    let mut reader = match stream.try_clone() {
        Ok(clone) => FrameReader::new(clone),
        Err(_) => return,
    };

    let mut handled: u32 = 0;
    loop {
        let frame = match reader.read_frame() {
            Ok(Some(frame)) => frame,
            _ => return, // client hung up, or a wedged read timed out
        };
        for _ in 0..config.chatter {
            let note = json!({"ok": true, "message": "crunching soil water balance"});
            if send_line(&mut stream, &note).is_err() {
                return;
            }
        }
        let reply = match serde_json::from_slice::<Value>(&frame) {
            Ok(request) => dispatch(&mut session, &request, config),
            Err(err) => json!({"ok": false, "error": format!("bad request: {err}")}),
        };
        if send_line(&mut stream, &reply).is_err() {
            return;
        }
        handled += 1;
        if config.drop_after == Some(handled) {
            return; // simulated server crash
        }
    }
}

fn send_line(stream: &mut TcpStream, value: &Value) -> std::io::Result<()> {
    let bytes = serde_json::to_vec(value)?;
    write_frame(stream, &bytes)
}

fn dispatch(session: &mut SessionState, request: &Value, config: &MockConfig) -> Value {
    match request["action"].as_str() {
        Some("init") => handle_init(session, request),
        Some("tick") => {
            let steps = request["steps"].as_u64().unwrap_or(1).max(1);
            advance(session, steps, "tick executed", config)
        }
        Some("water") => {
            if request.get("amount_cm").and_then(Value::as_f64).is_none() {
                return json!({"ok": false, "error": "water action requires 'amount_cm'"});
            }
            advance(session, 1, "water applied", config)
        }
        Some("fertilize") => {
            if request.get("amount_kg_ha").and_then(Value::as_f64).is_none() {
                return json!({"ok": false, "error": "fertilize action requires 'amount_kg_ha'"});
            }
            advance(session, 1, "fertilizer applied", config)
        }
        Some("status") => {
            let message = if session.initialized {
                "initialized"
            } else {
                "uninitialized"
            };
            json!({"ok": true, "result": {
                "message": message,
                "tick": session.tick,
                "day": session.day.to_string(),
                "metrics": metrics_for(session.tick),
            }})
        }
        Some(other) => json!({"ok": false, "error": format!("unsupported action: {other}")}),
        None => json!({"ok": false, "error": "missing 'action' field in request"}),
    }
}

fn handle_init(session: &mut SessionState, request: &Value) -> Value {
    let crop = request["crop"].as_str().unwrap_or("wheat");
    if !KNOWN_CROPS.contains(&crop) {
        return json!({"ok": false, "error": format!("crop '{crop}' not found")});
    }
    let date = request["date"].as_str().unwrap_or("");
    let Ok(sowing) = date.parse::<NaiveDate>() else {
        return json!({"ok": false, "error": format!("unsupported date format: {date}")});
    };

    session.initialized = true;
    session.tick = 0;
    session.day = sowing;
    json!({"ok": true, "result": {
        "message": "initialized",
        "tick": 0,
        "day": sowing.to_string(),
        "finished": false,
    }})
}

fn advance(session: &mut SessionState, steps: u64, message: &str, config: &MockConfig) -> Value {
    if !session.initialized {
        return json!({"ok": false, "error": "initialize the simulation before sending actions"});
    }
    session.tick += steps;
    session.day = session
        .day
        .checked_add_days(Days::new(steps))
        .unwrap_or(session.day);
    let finished = session.tick >= config.run_length;

    json!({"ok": true, "result": {
        "message": message,
        "tick": session.tick,
        "steps": steps,
        "day": session.day.to_string(),
        "metrics": metrics_for(session.tick),
        "weather": {
            "current_summary": format!("DAY={}, RAIN=0.00", session.day),
            "current_json": "{\"RAIN\": 0.0}",
            "forecast": if session.tick % 2 == 0 { ["sunny"] } else { ["rainy"] },
        },
        "finished": finished,
    }})
}

/// Deterministic toy agronomy: linear soil curves, yield after day 20.
/// Computed in integer hundredths so values like 0.32 are exact in JSON.
fn metrics_for(tick: u64) -> Value {
    let yield_rate = if tick > 19 { (tick - 19) as f64 / 10.0 } else { 0.0 };
    json!({
        "soil_moisture": (30 + 2 * tick) as f64 / 100.0,
        "soil_n": (4 + tick) as f64 / 100.0,
        "yield_rate": yield_rate,
    })
}
