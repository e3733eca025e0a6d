// furrow_simlink — the simulation client protocol engine.
//
// The Furrow game's agronomic outcomes (soil moisture, nitrogen, yield) are
// computed by an external simulation server and streamed back over a
// line-delimited JSON protocol (see `furrow_protocol`). This crate owns
// that link: connection lifecycle, session initialization state, reply
// correlation, and the four farming commands the game loop drives.
//
// Module overview:
// - `config.rs`:     `LinkConfig` — host, port, and timeout knobs.
// - `error.rs`:      `LinkError` — connection / protocol / server /
//                    exhausted-retries taxonomy. Nothing here is fatal.
// - `connection.rs`: `Connection` — one live socket plus the optional
//                    greeting read on establish.
// - `client.rs`:     `SimClient` — session state machine, correlator, and
//                    the public command operations.
//
// Design decisions:
// - **Blocking, single-threaded.** The caller's thread issues one command
//   at a time and blocks until the reply, a timeout, or a close. No async
//   runtime, no reader thread: the strictly request/reply protocol never
//   needs one.
// - **Self-healing commands.** Every command ensures connection and
//   initialization itself, so the game loop never sequences
//   connect/init/act.
// - **Explicit session handle.** `SimClient` is constructed and passed by
//   whoever drives the game loop; there is no process-wide singleton.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;

pub use client::{MAX_READ_ATTEMPTS, SimClient};
pub use config::LinkConfig;
pub use error::{LinkError, Result};
