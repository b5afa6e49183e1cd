use crate::config::SignalSettings;
use crate::model::SignalReading;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Source of cellular signal quality. Best-effort: callers treat any error as
/// "no reading".
#[async_trait]
pub trait SignalReader: Send + Sync {
    async fn read(&self) -> anyhow::Result<SignalReading>;
    fn source_name(&self) -> &'static str;
}

pub fn from_settings(settings: &SignalSettings) -> anyhow::Result<Arc<dyn SignalReader>> {
    if !settings.enabled {
        return Ok(Arc::new(NoSignal));
    }
    Ok(Arc::new(GatewaySignalReader::new(settings)?))
}

/// Reads SINR values from a gateway's JSON status endpoint.
pub struct GatewaySignalReader {
    pub url: String,
    pub sinr4g_pointer: String,
    pub sinr5g_pointer: String,
    pub client: reqwest::Client,
}

impl GatewaySignalReader {
    pub fn new(settings: &SignalSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            url: settings.url.clone(),
            sinr4g_pointer: settings.sinr4g_pointer.clone(),
            sinr5g_pointer: settings.sinr5g_pointer.clone(),
            client,
        })
    }
}

#[async_trait]
impl SignalReader for GatewaySignalReader {
    async fn read(&self) -> anyhow::Result<SignalReading> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("gateway status endpoint returned {}", resp.status());
        }
        let body: serde_json::Value = resp.json().await?;
        Ok(extract_signal(
            &body,
            &self.sinr4g_pointer,
            &self.sinr5g_pointer,
        ))
    }

    fn source_name(&self) -> &'static str {
        "gateway"
    }
}

pub struct NoSignal;

#[async_trait]
impl SignalReader for NoSignal {
    async fn read(&self) -> anyhow::Result<SignalReading> {
        Ok(SignalReading::default())
    }

    fn source_name(&self) -> &'static str {
        "none"
    }
}

pub fn extract_signal(body: &serde_json::Value, ptr_4g: &str, ptr_5g: &str) -> SignalReading {
    SignalReading {
        sinr4g: number_at(body, ptr_4g),
        sinr5g: number_at(body, ptr_5g),
    }
}

// Some firmwares report numbers as strings.
fn number_at(body: &serde_json::Value, pointer: &str) -> Option<f64> {
    let v = body.pointer(pointer)?;
    let n = match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}
