// Core value types shared by requests and responses.
//
// `InitContext` is the per-session farming setup (sowing date, crop,
// fertilizer/irrigation choices, location). The client caches it after a
// successful init and embeds a copy into every later request so the server
// can operate statelessly per request. `Metrics` and `WeatherPayload` are
// the agronomic outputs the server streams back with each tick result.
//
// Wire field names are fixed by the server (`fertilizer`, `irrigation`,
// `lat`/`lon`/`elev`, snake_case metrics keys) — serde renames bridge the
// gap where the Rust names differ.

use serde::{Deserialize, Serialize};

/// Default farm location: the reference server's Fraser Valley test site.
pub const DEFAULT_LAT: f64 = 49.104;
pub const DEFAULT_LON: f64 = -122.66;
pub const DEFAULT_ELEV: f64 = 36.0;

/// Default TCP port the simulation server listens on.
pub const DEFAULT_PORT: u16 = 5005;

pub const DEFAULT_CROP: &str = "wheat";

/// Fertilizer preset names the server resolves to kg N/ha amounts.
pub const FERTILIZER_PRESETS: [&str; 4] = ["none", "low", "medium", "high"];

/// Irrigation preset names the server resolves to cm/day amounts.
pub const IRRIGATION_PRESETS: [&str; 4] = ["none", "drip", "sprinkler", "flood"];

/// Session initialization context: what to grow, where, and how.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitContext {
    /// Sowing date, ISO 8601 (`YYYY-MM-DD`). Blank means "today, UTC" —
    /// the client substitutes the default before sending.
    #[serde(default)]
    pub date: String,
    /// Fertilizer preset name or a numeric amount as text.
    #[serde(rename = "fertilizer", default)]
    pub fertilizer_type: String,
    /// Irrigation preset name or a numeric amount as text.
    #[serde(rename = "irrigation", default)]
    pub irrigation_type: String,
    #[serde(default)]
    pub crop: String,
    #[serde(default = "default_lat")]
    pub lat: f64,
    #[serde(default = "default_lon")]
    pub lon: f64,
    #[serde(default = "default_elev")]
    pub elev: f64,
}

fn default_lat() -> f64 {
    DEFAULT_LAT
}

fn default_lon() -> f64 {
    DEFAULT_LON
}

fn default_elev() -> f64 {
    DEFAULT_ELEV
}

impl Default for InitContext {
    fn default() -> Self {
        Self {
            date: String::new(),
            fertilizer_type: "none".into(),
            irrigation_type: "none".into(),
            crop: DEFAULT_CROP.into(),
            lat: DEFAULT_LAT,
            lon: DEFAULT_LON,
            elev: DEFAULT_ELEV,
        }
    }
}

impl InitContext {
    /// Return a copy with blank or whitespace-only fields replaced by their
    /// defaults. `fallback_date` is used when `date` is blank; the caller
    /// supplies it (normally the current UTC date) so this crate stays free
    /// of clock dependencies.
    pub fn normalized(&self, fallback_date: &str) -> InitContext {
        let or_default = |value: &str, fallback: &str| -> String {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                fallback.into()
            } else {
                trimmed.into()
            }
        };
        InitContext {
            date: or_default(&self.date, fallback_date),
            fertilizer_type: or_default(&self.fertilizer_type, "none"),
            irrigation_type: or_default(&self.irrigation_type, "none"),
            crop: or_default(&self.crop, DEFAULT_CROP),
            lat: self.lat,
            lon: self.lon,
            elev: self.elev,
        }
    }
}

/// Agronomic outputs for one simulated day. Soil moisture and nitrogen are
/// fractional; yield rate is a normalized rate. Range validation is the
/// server's responsibility — the client passes values through untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub soil_moisture: f64,
    #[serde(default)]
    pub soil_n: f64,
    #[serde(default)]
    pub yield_rate: f64,
}

/// Weather attached to a tick result: a human-readable summary, the raw
/// record as a JSON string, and an ordered list of forecast tags
/// ("rainy", "sunny", ...).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherPayload {
    #[serde(default)]
    pub current_summary: Option<String>,
    #[serde(default)]
    pub current_json: Option<String>,
    #[serde(default)]
    pub forecast: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_substitutes_defaults_for_blank_fields() {
        let ctx = InitContext {
            date: "   ".into(),
            fertilizer_type: String::new(),
            irrigation_type: "\t".into(),
            crop: "".into(),
            ..InitContext::default()
        };
        let norm = ctx.normalized("2024-05-01");
        assert_eq!(norm.date, "2024-05-01");
        assert_eq!(norm.fertilizer_type, "none");
        assert_eq!(norm.irrigation_type, "none");
        assert_eq!(norm.crop, "wheat");
        assert_eq!(norm.lat, DEFAULT_LAT);
    }

    #[test]
    fn normalized_preserves_explicit_fields() {
        let ctx = InitContext {
            date: " 2024-03-15 ".into(),
            fertilizer_type: "high".into(),
            irrigation_type: "drip".into(),
            crop: "barley".into(),
            lat: 52.0,
            lon: 5.6,
            elev: 7.0,
        };
        let norm = ctx.normalized("2099-01-01");
        assert_eq!(norm.date, "2024-03-15"); // trimmed, not replaced
        assert_eq!(norm.fertilizer_type, "high");
        assert_eq!(norm.irrigation_type, "drip");
        assert_eq!(norm.crop, "barley");
        assert_eq!(norm.lat, 52.0);
    }

    #[test]
    fn context_uses_wire_field_names() {
        let json = serde_json::to_value(InitContext::default()).unwrap();
        assert!(json.get("fertilizer").is_some());
        assert!(json.get("irrigation").is_some());
        assert!(json.get("fertilizer_type").is_none());
        assert_eq!(json["lat"], serde_json::json!(DEFAULT_LAT));
    }

    #[test]
    fn metrics_tolerate_missing_fields() {
        let metrics: Metrics = serde_json::from_str(r#"{"soil_moisture":0.32}"#).unwrap();
        assert_eq!(metrics.soil_moisture, 0.32);
        assert_eq!(metrics.soil_n, 0.0);
        assert_eq!(metrics.yield_rate, 0.0);
    }
}
