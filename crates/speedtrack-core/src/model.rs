use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One completed speed test, as persisted and charted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    /// Mbps
    pub download: f64,
    /// Mbps
    pub upload: f64,
    /// ms
    pub ping: f64,
    /// ms
    pub jitter: f64,
    /// dB, absent when the gateway could not be read
    #[serde(default)]
    pub sinr4g: Option<f64>,
    #[serde(default)]
    pub sinr5g: Option<f64>,
}

impl Measurement {
    pub fn new(timestamp: DateTime<Utc>, sample: SpeedSample, signal: SignalReading) -> Self {
        Self {
            timestamp,
            download: sample.download,
            upload: sample.upload,
            ping: sample.ping,
            jitter: sample.jitter,
            sinr4g: signal.sinr4g,
            sinr5g: signal.sinr5g,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.download, self.upload, self.ping, self.jitter]
            .iter()
            .all(|v| v.is_finite())
    }

    pub fn timestamp_string(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

/// Throughput and latency figures read off the speed-test page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSample {
    pub download: f64,
    pub upload: f64,
    pub ping: f64,
    pub jitter: f64,
}

/// Cellular signal quality from the local gateway. Both fields absent means
/// "not measured", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalReading {
    pub sinr4g: Option<f64>,
    pub sinr5g: Option<f64>,
}

impl SignalReading {
    pub fn is_empty(&self) -> bool {
        self.sinr4g.is_none() && self.sinr5g.is_none()
    }
}

/// `2024-01-01T00:00:00.000Z`
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(s.trim())
        .map_err(|e| anyhow::anyhow!("invalid timestamp '{}': {}", s, e))?;
    Ok(parsed.with_timezone(&Utc))
}

mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}
