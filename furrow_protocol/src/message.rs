// Protocol messages for client-server communication.
//
// `Request` is the full client vocabulary, tagged by an `action` field so
// the server can dispatch without knowing the Rust enum. Every farming
// command embeds a flattened copy of the `InitContext` — the server keeps
// no context between requests beyond the live simulation itself.
//
// `ResponseEnvelope` is what every server line parses into. The server
// interleaves out-of-band status lines (greeting, progress notes) with the
// authoritative reply to a command; `is_informational` is how the client's
// correlator tells them apart. Decoding is tolerant: unknown fields are
// ignored and missing optional fields default, so either side can extend
// the protocol without breaking the other.

use serde::{Deserialize, Serialize};

use crate::types::{InitContext, Metrics, WeatherPayload};

/// A client request, tagged on the wire by `action`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Request {
    /// Start (or restart) a simulation run from the given context.
    Init {
        #[serde(flatten)]
        context: InitContext,
    },
    /// Advance the simulation by `steps` days.
    Tick {
        steps: u32,
        #[serde(flatten)]
        context: InitContext,
    },
    /// Irrigate, then advance one day.
    Water {
        amount_cm: f64,
        efficiency: f64,
        #[serde(flatten)]
        context: InitContext,
    },
    /// Apply nitrogen fertilizer, then advance one day.
    Fertilize {
        amount_kg_ha: f64,
        nh4_fraction: f64,
        #[serde(flatten)]
        context: InitContext,
    },
    /// Query current session state without advancing the simulation.
    Status,
}

impl Request {
    /// The wire `action` value, for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Request::Init { .. } => "init",
            Request::Tick { .. } => "tick",
            Request::Water { .. } => "water",
            Request::Fertilize { .. } => "fertilize",
            Request::Status => "status",
        }
    }
}

/// One server line. Exactly one of three shapes:
/// - command result: `ok == true` and `result` present;
/// - terminal error: `ok == false` and `error` non-empty;
/// - informational: no `result`, no `error`, non-empty `message`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TickResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResponseEnvelope {
    /// An out-of-band status line (including the connect greeting) — not a
    /// valid answer to a pending request.
    pub fn is_informational(&self) -> bool {
        self.result.is_none()
            && self.error.as_deref().unwrap_or("").is_empty()
            && !self.message.as_deref().unwrap_or("").is_empty()
    }
}

/// The payload of a successful command reply. All fields are tolerant of
/// absence: an init reply carries little more than a message and a day,
/// while a tick reply carries the full metrics and weather.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickResult {
    #[serde(default)]
    pub message: Option<String>,
    /// Total ticks executed this session, as counted by the server.
    #[serde(default)]
    pub tick: u64,
    /// Days actually simulated by this command.
    #[serde(default)]
    pub steps: u32,
    /// Simulated calendar day, ISO 8601.
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub metrics: Option<Metrics>,
    #[serde(default)]
    pub weather: Option<WeatherPayload>,
    /// Terminal signal: the simulation run reached maturity or was killed.
    /// Surfaced to the caller; the connection stays open.
    #[serde(default)]
    pub finished: bool,
}
