use std::sync::Arc;

use energy_client::domain::format_timestamp;
use serde::Serialize;
use time::OffsetDateTime;

pub const ANOMALY_SUBJECT: &str = "Anomaly Detected";

#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    #[error("notification transport error: {0}")]
    Transport(String),
    #[error("notification endpoint answered {0}")]
    Rejected(u16),
}

/// Pub/sub style alert channel.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<(), NotifyError>;
}

/// Formats and publishes anomaly alerts to a fixed topic.
#[derive(Clone)]
pub struct AnomalyNotifier {
    notifier: Arc<dyn Notifier>,
    topic: String,
}

impl AnomalyNotifier {
    pub fn new(notifier: Arc<dyn Notifier>, topic: impl Into<String>) -> Self {
        Self {
            notifier,
            topic: topic.into(),
        }
    }

    pub async fn notify_anomaly(&self, site_id: &str, timestamp: OffsetDateTime) -> Result<(), NotifyError> {
        let message = anomaly_message(site_id, timestamp);
        self.notifier
            .publish(&self.topic, ANOMALY_SUBJECT, &message)
            .await
    }
}

pub fn anomaly_message(site_id: &str, timestamp: OffsetDateTime) -> String {
    format!(
        "Anomaly detected in site: {site_id} at {}",
        format_timestamp(timestamp)
    )
}

/// Writes alerts to the log only.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<(), NotifyError> {
        tracing::warn!(topic, subject, message, "anomaly alert");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    topic: &'a str,
    subject: &'a str,
    message: &'a str,
}

/// POSTs `{topic, subject, message}` as JSON. Any non-2xx answer is a failure.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { topic, subject, message })
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use time::macros::datetime;

    #[derive(Default)]
    struct Captured {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait::async_trait]
    impl Notifier for Captured {
        async fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((topic.to_string(), subject.to_string(), message.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn notify_anomaly_publishes_site_and_timestamp() {
        let captured = Arc::new(Captured::default());
        let notifier = AnomalyNotifier::new(captured.clone(), "energy-anomalies");

        notifier
            .notify_anomaly("site7", datetime!(2025-02-17 04:10:43 UTC))
            .await
            .unwrap();

        let sent = captured.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (topic, subject, message) = &sent[0];
        assert_eq!(topic, "energy-anomalies");
        assert_eq!(subject, ANOMALY_SUBJECT);
        assert_eq!(message, "Anomaly detected in site: site7 at 2025-02-17T04:10:43Z");
    }

    #[tokio::test]
    async fn webhook_to_closed_port_is_transport_error() {
        let notifier = WebhookNotifier::new(
            "http://127.0.0.1:9/alerts",
            std::time::Duration::from_millis(500),
        )
        .unwrap();

        let res = notifier.publish("t", "s", "m").await;
        assert!(matches!(res, Err(NotifyError::Transport(_))));
    }

    #[tokio::test]
    async fn webhook_non_success_status_is_rejected() {
        use axum::{http::StatusCode, routing::post, Router};

        let app = Router::new().route("/alerts", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service()).await;
        });

        let notifier = WebhookNotifier::new(
            format!("http://{addr}/alerts"),
            std::time::Duration::from_secs(5),
        )
        .unwrap();

        let res = notifier.publish("t", ANOMALY_SUBJECT, "m").await;
        assert!(matches!(res, Err(NotifyError::Rejected(503))));
    }
}
