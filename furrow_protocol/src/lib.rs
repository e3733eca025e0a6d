// furrow_protocol — wire protocol for the Furrow simulation server link.
//
// This crate defines the message types and framing the game client uses to
// talk to the external crop simulation server over TCP. It has no dependency
// on the client engine or any game crate, so tools and tests can speak the
// protocol directly.
//
// Module overview:
// - `types.rs`:   `InitContext` (session setup with defaulting), `Metrics`,
//                 `WeatherPayload`, preset tables and location defaults.
// - `message.rs`: `Request` (action-tagged command enum), `ResponseEnvelope`,
//                 `TickResult`.
// - `framing.rs`: newline-delimited framing over any `Read`/`Write` stream:
//                 one JSON object per line, tail retained across reads.
//
// Design decisions:
// - **Line-delimited JSON.** Matches the server's wire format exactly: one
//   UTF-8 JSON object per `\n`-terminated line, no length prefixes.
// - **Tolerant decoding.** Unknown fields are ignored and optional fields
//   default, so either side can extend messages without breaking the other.
// - **No async runtime.** Uses `std::io::Read`/`Write`, compatible with
//   blocking TCP streams and in-memory cursors alike.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{FrameDecoder, FrameReader, MAX_FRAME_SIZE, write_frame};
pub use message::{Request, ResponseEnvelope, TickResult};
pub use types::{InitContext, Metrics, WeatherPayload};

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// Encode a request to a frame, read it back, decode. Per the wire
    /// contract the recovered frame must be byte-identical to the
    /// serialized request.
    fn request_roundtrip(request: &Request) {
        let json = serde_json::to_vec(request).unwrap();
        let mut wire = Vec::new();
        write_frame(&mut wire, &json).unwrap();

        let mut reader = FrameReader::new(Cursor::new(&wire));
        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(frame, json);

        let recovered: Request = serde_json::from_slice(&frame).unwrap();
        assert_eq!(&recovered, request);
    }

    #[test]
    fn roundtrip_init() {
        request_roundtrip(&Request::Init {
            context: InitContext {
                date: "2024-05-01".into(),
                fertilizer_type: "medium".into(),
                irrigation_type: "drip".into(),
                crop: "wheat".into(),
                lat: 49.104,
                lon: -122.66,
                elev: 36.0,
            },
        });
    }

    #[test]
    fn roundtrip_tick() {
        request_roundtrip(&Request::Tick {
            steps: 7,
            context: InitContext::default(),
        });
    }

    #[test]
    fn roundtrip_water() {
        request_roundtrip(&Request::Water {
            amount_cm: 2.5,
            efficiency: 0.75,
            context: InitContext::default(),
        });
    }

    #[test]
    fn roundtrip_fertilize() {
        request_roundtrip(&Request::Fertilize {
            amount_kg_ha: 40.0,
            nh4_fraction: 0.7,
            context: InitContext::default(),
        });
    }

    #[test]
    fn roundtrip_status() {
        request_roundtrip(&Request::Status);
    }

    #[test]
    fn envelope_roundtrip_through_frame() {
        let envelope = ResponseEnvelope {
            ok: true,
            result: Some(TickResult {
                tick: 12,
                steps: 1,
                day: "2024-05-13".into(),
                metrics: Some(Metrics {
                    soil_moisture: 0.28,
                    soil_n: 0.04,
                    yield_rate: 0.6,
                }),
                ..TickResult::default()
            }),
            error: None,
            message: None,
        };
        let json = serde_json::to_vec(&envelope).unwrap();
        let mut wire = Vec::new();
        write_frame(&mut wire, &json).unwrap();

        let mut reader = FrameReader::new(Cursor::new(&wire));
        let frame = reader.read_frame().unwrap().unwrap();
        let recovered: ResponseEnvelope = serde_json::from_slice(&frame).unwrap();
        assert_eq!(recovered, envelope);
    }
}
