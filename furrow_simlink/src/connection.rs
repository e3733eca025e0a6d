// One live TCP connection to the simulation server.
//
// `Connection::establish` performs the TCP connect, applies the configured
// I/O timeouts, and attempts one greeting read under a short bounded
// timeout. The server sends an unsolicited `{"ok":true,"message":"ready"}`
// line on accept, but a server that skips it is tolerated — the greeting is
// a courtesy, not a handshake.
//
// The write half is a `BufWriter` over the stream; the read half is a
// `FrameReader` over a cloned handle. Both halves share one socket, so a
// timeout or broken pipe on either side means the whole connection is
// suspect — the owning `SimClient` drops it and reconnects on the next
// command rather than trying to salvage it.

use std::io::BufWriter;
use std::net::TcpStream;
use std::time::Duration;

use furrow_protocol::framing::{FrameReader, write_frame};
use furrow_protocol::message::{Request, ResponseEnvelope};
use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};

pub struct Connection {
    writer: BufWriter<TcpStream>,
    reader: FrameReader<TcpStream>,
}

impl Connection {
    /// Connect, apply timeouts, and try to read the greeting line.
    pub fn establish(config: &LinkConfig) -> Result<Self> {
        let addr = config.addr();
        let stream = TcpStream::connect(&addr)
            .map_err(|e| LinkError::Connection(format!("connect to {addr}: {e}")))?;

        let io_timeout = config.io_timeout_opt();
        stream
            .set_read_timeout(io_timeout)
            .map_err(|e| LinkError::Connection(format!("set read timeout: {e}")))?;
        stream
            .set_write_timeout(io_timeout)
            .map_err(|e| LinkError::Connection(format!("set write timeout: {e}")))?;

        let reader_stream = stream
            .try_clone()
            .map_err(|e| LinkError::Connection(format!("clone stream: {e}")))?;

        let mut conn = Self {
            writer: BufWriter::new(stream),
            reader: FrameReader::new(reader_stream),
        };
        conn.read_greeting(config.greeting_timeout, io_timeout);
        info!(%addr, "connected to simulation server");
        Ok(conn)
    }

    /// Attempt one greeting frame under `greeting_timeout`, then restore the
    /// configured I/O timeout. A missing or malformed greeting is logged and
    /// tolerated.
    fn read_greeting(&mut self, greeting_timeout: Duration, io_timeout: Option<Duration>) {
        let timeout = if greeting_timeout.is_zero() {
            Some(Duration::from_millis(500))
        } else {
            Some(greeting_timeout)
        };
        if self.reader.get_ref().set_read_timeout(timeout).is_err() {
            return;
        }

        match self.reader.read_frame() {
            Ok(Some(frame)) => match serde_json::from_slice::<ResponseEnvelope>(&frame) {
                Ok(envelope) => {
                    debug!(message = envelope.message.as_deref().unwrap_or(""), "server greeting");
                }
                Err(err) => {
                    debug!(%err, "greeting line did not parse; ignoring");
                }
            },
            Ok(None) => {
                debug!("server closed before sending a greeting");
            }
            Err(err) => {
                // Usually a read timeout: the server sent no greeting.
                debug!(%err, "no greeting within timeout");
            }
        }

        let _ = self.reader.get_ref().set_read_timeout(io_timeout);
    }

    /// Serialize a request and write it as one frame. A failure here means
    /// the socket is no longer trustworthy; the caller must drop this
    /// connection.
    pub fn send(&mut self, request: &Request) -> Result<()> {
        let json = serde_json::to_vec(request)
            .map_err(|e| LinkError::Protocol(format!("serialize '{}': {e}", request.action())))?;
        write_frame(&mut self.writer, &json)
            .map_err(|e| LinkError::Connection(format!("write '{}': {e}", request.action())))
    }

    /// Read one raw frame. `Ok(None)` means the server closed the stream.
    pub fn recv_frame(&mut self) -> Result<Option<Vec<u8>>> {
        self.reader
            .read_frame()
            .map_err(|e| LinkError::Connection(format!("read: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    use furrow_protocol::types::InitContext;

    use super::*;

    fn test_config(port: u16) -> LinkConfig {
        LinkConfig {
            host: "127.0.0.1".into(),
            port,
            io_timeout: Duration::from_secs(5),
            greeting_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn establish_reads_greeting_and_sends_requests() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream
                .write_all(b"{\"ok\": true, \"message\": \"ready\"}\n")
                .unwrap();
            // Capture the first request line for the assertions below.
            let mut reader = FrameReader::new(stream.try_clone().unwrap());
            let frame = reader.read_frame().unwrap().unwrap();
            String::from_utf8(frame).unwrap()
        });

        let mut conn = Connection::establish(&test_config(port)).unwrap();
        conn.send(&Request::Init {
            context: InitContext::default(),
        })
        .unwrap();

        let received = server.join().unwrap();
        let value: serde_json::Value = serde_json::from_str(&received).unwrap();
        assert_eq!(value["action"], "init");
    }

    #[test]
    fn missing_greeting_is_tolerated() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        // Server that accepts but stays silent.
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(400));
            drop(stream);
        });

        let conn = Connection::establish(&test_config(port));
        assert!(conn.is_ok());
        server.join().unwrap();
    }

    #[test]
    fn connect_failure_is_a_connection_error() {
        // A port nothing listens on. Bind-then-drop reserves one reliably.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        match Connection::establish(&test_config(port)) {
            Err(LinkError::Connection(msg)) => assert!(msg.contains("connect")),
            Err(other) => panic!("expected Connection error, got {other:?}"),
            Ok(_) => panic!("expected Connection error, got a connection"),
        }
    }

    #[test]
    fn recv_frame_none_on_server_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream
                .write_all(b"{\"ok\": true, \"message\": \"ready\"}\n")
                .unwrap();
            drop(stream);
        });

        let mut conn = Connection::establish(&test_config(port)).unwrap();
        server.join().unwrap();
        assert!(conn.recv_frame().unwrap().is_none());
    }
}
