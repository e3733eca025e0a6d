// Simulation client: session state, request/response correlation, and the
// farming command operations.
//
// `SimClient` is the one component with real protocol state. It owns the
// connection exclusively, tracks whether the remote session is initialized,
// caches the last successful `InitContext`, and exposes the synchronous
// entry points the game loop calls: `initialize`, `advance_tick`, `water`,
// `fertilize`, `status`.
//
// Every command is self-healing: it ensures the connection is up, runs one
// implicit init when the session is uninitialized, and fails the whole
// operation if that init fails. The caller never has to sequence
// connect/init/act itself.
//
// The correlator (`send_and_await`) exists because the server interleaves
// out-of-band status lines with the authoritative reply to a command. It
// reads frames in a bounded loop, skipping informational frames and frames
// that fail to parse, until a genuine result or terminal error arrives —
// and gives up after `MAX_READ_ATTEMPTS` rather than blocking forever on a
// server that never answers.
//
// Strictly one in-flight request at a time; the read loop assumes no
// interleaved writer. The surrounding game loop decides *when* to call
// these — this engine only decides *how*.

use chrono::Utc;
use furrow_protocol::message::{Request, ResponseEnvelope, TickResult};
use furrow_protocol::types::InitContext;
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::connection::Connection;
use crate::error::{LinkError, Result};

/// Read-attempt bound per request. Exhausting it means "no valid response",
/// not a dead connection — the socket stays open.
pub const MAX_READ_ATTEMPTS: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InitState {
    Uninitialized,
    Initialized,
}

/// The client-side session: socket handle, initialization state, cached
/// context, and tick counter. Constructed once per game run and passed
/// explicitly to whoever drives the game loop — no global singleton.
pub struct SimClient {
    config: LinkConfig,
    conn: Option<Connection>,
    init: InitState,
    /// Desired context for the next explicit or implicit init.
    context: InitContext,
    /// Context actually confirmed by the server, copied into later requests.
    /// Immutable once set for a given initialization.
    last_context: Option<InitContext>,
    tick_counter: u64,
}

impl SimClient {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            conn: None,
            init: InitState::Uninitialized,
            context: InitContext::default(),
            last_context: None,
            tick_counter: 0,
        }
    }

    /// Record the desired setup for the next initialization. Does not talk
    /// to the server; call `initialize` (or any command, which will init
    /// implicitly) to apply it.
    pub fn set_context(&mut self, context: InitContext) {
        self.context = context;
    }

    pub fn context(&self) -> &InitContext {
        &self.context
    }

    /// The context confirmed by the last successful init, if any.
    pub fn last_context(&self) -> Option<&InitContext> {
        self.last_context.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn is_initialized(&self) -> bool {
        self.init == InitState::Initialized
    }

    /// Total ticks executed this session, per the server's last reply.
    pub fn tick_counter(&self) -> u64 {
        self.tick_counter
    }

    /// Idempotent connect. Cheap when already connected. A successful
    /// (re)connect resets the init state and tick counter — the remote
    /// session context is lost whenever the socket is replaced.
    pub fn ensure_connected(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        match Connection::establish(&self.config) {
            Ok(conn) => {
                self.conn = Some(conn);
                self.init = InitState::Uninitialized;
                self.tick_counter = 0;
                Ok(())
            }
            Err(err) => {
                warn!(addr = %self.config.addr(), %err, "connect failed");
                Err(err)
            }
        }
    }

    /// Start (or restart) the simulation run from the current context.
    ///
    /// When the session is already initialized and `force_reset` is false,
    /// no request is sent and a placeholder result echoing the current tick
    /// counter is returned.
    pub fn initialize(&mut self, force_reset: bool) -> Result<TickResult> {
        self.ensure_connected()?;
        if self.init == InitState::Initialized && !force_reset {
            return Ok(TickResult {
                message: Some("already initialized".into()),
                tick: self.tick_counter,
                ..TickResult::default()
            });
        }
        self.run_init()
    }

    /// Advance the simulation by `steps` days (at least one).
    pub fn advance_tick(&mut self, steps: u32) -> Result<TickResult> {
        self.ensure_connected()?;
        self.ensure_initialized()?;
        let request = Request::Tick {
            steps: steps.max(1),
            context: self.request_context(),
        };
        let envelope = self.send_and_await(&request)?;
        self.finish(envelope, "tick")
    }

    /// Irrigate with `amount_cm` of water (clamped to ≥ 0) at the given
    /// application efficiency (clamped to [0, 1]), then advance one day.
    pub fn water(&mut self, amount_cm: f64, efficiency: f64) -> Result<TickResult> {
        self.ensure_connected()?;
        self.ensure_initialized()?;
        let request = Request::Water {
            amount_cm: amount_cm.max(0.0),
            efficiency: efficiency.clamp(0.0, 1.0),
            context: self.request_context(),
        };
        let envelope = self.send_and_await(&request)?;
        self.finish(envelope, "water")
    }

    /// Apply `amount_kg_ha` of nitrogen (clamped to ≥ 0) with the given
    /// ammonium fraction (clamped to [0, 1]), then advance one day.
    pub fn fertilize(&mut self, amount_kg_ha: f64, nh4_fraction: f64) -> Result<TickResult> {
        self.ensure_connected()?;
        self.ensure_initialized()?;
        let request = Request::Fertilize {
            amount_kg_ha: amount_kg_ha.max(0.0),
            nh4_fraction: nh4_fraction.clamp(0.0, 1.0),
            context: self.request_context(),
        };
        let envelope = self.send_and_await(&request)?;
        self.finish(envelope, "fertilize")
    }

    /// Query current session state without advancing the simulation. Needs
    /// a connection but not an initialized session; never mutates state.
    pub fn status(&mut self) -> Result<TickResult> {
        self.ensure_connected()?;
        let envelope = self.send_and_await(&Request::Status)?;
        accept(envelope, "status")
    }

    /// Run one init exchange and, on success, flip to `Initialized` and
    /// cache the confirmed context.
    fn run_init(&mut self) -> Result<TickResult> {
        let context = self.context.normalized(&today_utc());
        let request = Request::Init {
            context: context.clone(),
        };
        let envelope = self.send_and_await(&request)?;
        let result = accept(envelope, "init")?;
        self.init = InitState::Initialized;
        self.last_context = Some(context);
        self.tick_counter = result.tick;
        info!(
            date = %self.last_context.as_ref().map(|c| c.date.as_str()).unwrap_or(""),
            tick = result.tick,
            "simulation initialized"
        );
        Ok(result)
    }

    fn ensure_initialized(&mut self) -> Result<()> {
        if self.init == InitState::Initialized {
            return Ok(());
        }
        self.run_init().map(|_| ())
    }

    /// The context to embed in a non-init request: a copy of the confirmed
    /// one, never a reference into caller-mutable state.
    fn request_context(&self) -> InitContext {
        match &self.last_context {
            Some(ctx) => ctx.clone(),
            None => self.context.normalized(&today_utc()),
        }
    }

    /// Write one request, then read frames until a genuine result or
    /// terminal error arrives. See the module header for why informational
    /// frames must be skipped and why the loop is bounded.
    fn send_and_await(&mut self, request: &Request) -> Result<ResponseEnvelope> {
        let action = request.action();
        let sent = match self.conn.as_mut() {
            Some(conn) => conn.send(request),
            None => return Err(LinkError::Connection("not connected".into())),
        };
        if let Err(err) = sent {
            warn!(action, %err, "write failed; dropping connection");
            self.drop_connection();
            return Err(err);
        }

        for attempt in 1..=MAX_READ_ATTEMPTS {
            let received = match self.conn.as_mut() {
                Some(conn) => conn.recv_frame(),
                None => return Err(LinkError::Connection("not connected".into())),
            };
            let frame = match received {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    warn!(action, attempt, "server closed the connection mid-read");
                    self.drop_connection();
                    return Err(LinkError::Connection(
                        "connection closed before a reply arrived".into(),
                    ));
                }
                Err(err) => {
                    warn!(action, attempt, %err, "read failed; dropping connection");
                    self.drop_connection();
                    return Err(err);
                }
            };

            let envelope: ResponseEnvelope = match serde_json::from_slice(&frame) {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(action, attempt, %err, "skipping malformed frame");
                    continue;
                }
            };
            if envelope.is_informational() {
                debug!(
                    action,
                    attempt,
                    message = envelope.message.as_deref().unwrap_or(""),
                    "skipping informational frame"
                );
                continue;
            }
            return Ok(envelope);
        }

        warn!(action, attempts = MAX_READ_ATTEMPTS, "no valid response within attempt bound");
        Err(LinkError::ExhaustedRetries {
            action,
            attempts: MAX_READ_ATTEMPTS,
        })
    }

    /// Accept a reply for a tick-like command and advance the tick counter.
    fn finish(&mut self, envelope: ResponseEnvelope, action: &'static str) -> Result<TickResult> {
        let result = accept(envelope, action)?;
        self.tick_counter = result.tick;
        if result.finished {
            info!(action, tick = result.tick, day = %result.day, "simulation run finished");
        }
        Ok(result)
    }

    /// A broken socket is never salvaged: drop it and force re-init on the
    /// next command.
    fn drop_connection(&mut self) {
        self.conn = None;
        self.init = InitState::Uninitialized;
    }
}

/// Interpret a correlated envelope: a result on `ok`, a server error
/// otherwise. Session state is the caller's business.
fn accept(envelope: ResponseEnvelope, action: &'static str) -> Result<TickResult> {
    if envelope.ok {
        envelope.result.ok_or_else(|| {
            LinkError::Protocol(format!("'{action}' reply carried ok=true but no result"))
        })
    } else {
        let reason = envelope
            .error
            .unwrap_or_else(|| "unspecified server error".into());
        warn!(action, error = %reason, "server rejected command");
        Err(LinkError::Server(reason))
    }
}

fn today_utc() -> String {
    Utc::now().date_naive().to_string()
}
