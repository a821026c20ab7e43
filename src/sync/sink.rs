use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::DeliveryError;
use crate::config::{Config, SinkFields, SinkFormat};
use crate::models::WellnessEntry;

/// Remote ingestion endpoint that accepts one entry per call.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    async fn deliver(&self, entry: &WellnessEntry) -> Result<(), DeliveryError>;
}

/// Posts entries to an HTTP endpoint as JSON or as a form body.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    format: SinkFormat,
    fields: SinkFields,
}

impl HttpSink {
    pub fn new(
        url: impl Into<String>,
        format: SinkFormat,
        fields: SinkFields,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            format,
            fields,
        })
    }

    fn form_pairs(&self, entry: &WellnessEntry) -> Vec<(String, String)> {
        let rating = |v: Option<i32>| v.map(|v| v.to_string()).unwrap_or_default();
        vec![
            (self.fields.mood.clone(), entry.mood.label().to_string()),
            (self.fields.energy.clone(), rating(entry.energy)),
            (self.fields.sleep.clone(), rating(entry.sleep)),
            (self.fields.stress.clone(), rating(entry.stress)),
            (self.fields.notes.clone(), entry.notes.clone().unwrap_or_default()),
            (self.fields.timestamp.clone(), entry.created_at.to_rfc3339()),
        ]
    }
}

#[async_trait]
impl RemoteSink for HttpSink {
    async fn deliver(&self, entry: &WellnessEntry) -> Result<(), DeliveryError> {
        let request = self.client.post(&self.url);
        let request = match self.format {
            SinkFormat::Json => request.json(&json!({
                "id": entry.id,
                "mood": entry.mood,
                "energy": entry.energy,
                "sleep": entry.sleep,
                "stress": entry.stress,
                "notes": entry.notes,
                "timestamp": entry.created_at.to_rfc3339(),
            })),
            SinkFormat::Form => request.form(&self.form_pairs(entry)),
        };

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(entry_id = entry.id, "Entry delivered to remote sink");
        Ok(())
    }
}

/// Used when no sink is configured: every entry stays queued.
pub struct DisabledSink;

#[async_trait]
impl RemoteSink for DisabledSink {
    async fn deliver(&self, _entry: &WellnessEntry) -> Result<(), DeliveryError> {
        Err(DeliveryError::Disabled)
    }
}

pub fn sink_from_config(config: &Config) -> Result<Box<dyn RemoteSink>, DeliveryError> {
    match &config.sink_url {
        Some(url) => {
            tracing::info!(url = %url, format = ?config.sink_format, "Remote sink configured");
            Ok(Box::new(HttpSink::new(
                url.clone(),
                config.sink_format,
                config.sink_fields.clone(),
                Duration::from_secs(config.sink_timeout_secs),
            )?))
        }
        None => {
            tracing::warn!("SINK_URL not set; entries will stay queued locally");
            Ok(Box::new(DisabledSink))
        }
    }
}
