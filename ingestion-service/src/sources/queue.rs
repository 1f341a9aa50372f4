use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::PipelineError;

/// One message of a queue delivery. The body wraps an object-created
/// notification from the blob store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    #[serde(rename = "messageId")]
    pub message_id: String,
    /// Real deliveries carry the notification as a JSON string; an inline
    /// object is accepted too.
    pub body: Value,
}

impl QueueMessage {
    pub fn new(message_id: impl Into<String>, body: impl Into<Value>) -> Self {
        Self {
            message_id: message_id.into(),
            body: body.into(),
        }
    }
}

/// Location of a raw event blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub bucket: String,
    pub key: String,
}

impl std::fmt::Display for BlobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

#[derive(Deserialize)]
struct Notification {
    #[serde(rename = "Records", default)]
    records: Vec<NotificationRecord>,
    #[serde(rename = "Event")]
    event: Option<String>,
}

#[derive(Deserialize)]
struct NotificationRecord {
    s3: ObjectEntity,
}

#[derive(Deserialize)]
struct ObjectEntity {
    bucket: BucketEntity,
    object: ObjectKey,
}

#[derive(Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Deserialize)]
struct ObjectKey {
    key: String,
}

const TEST_EVENT: &str = "s3:TestEvent";

/// Extract the blob references carried by a message body.
///
/// A bucket test notification yields no references. Any other body without
/// records is rejected.
pub fn parse_blob_refs(body: &Value) -> Result<Vec<BlobRef>, PipelineError> {
    let notification: Notification = match body {
        Value::String(raw) => serde_json::from_str(raw),
        other => serde_json::from_value(other.clone()),
    }
    .map_err(|e| PipelineError::InvalidMessage(e.to_string()))?;

    if notification.event.as_deref() == Some(TEST_EVENT) {
        return Ok(Vec::new());
    }

    if notification.records.is_empty() {
        return Err(PipelineError::InvalidMessage(
            "notification carries no records".to_string(),
        ));
    }

    Ok(notification
        .records
        .into_iter()
        .map(|r| BlobRef {
            bucket: r.s3.bucket.name,
            key: r.s3.object.key,
        })
        .collect())
}

/// Build the notification body the blob store emits when `blob` is created.
pub fn object_created_body(blob: &BlobRef) -> Value {
    serde_json::json!({
        "Records": [{
            "eventSource": "aws:s3",
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": { "name": blob.bucket },
                "object": { "key": blob.key },
            }
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_encoded_notification() {
        let body = Value::String(
            r#"{"Records":[{"eventVersion":"2.1","eventSource":"aws:s3","s3":{"s3SchemaVersion":"1.0","bucket":{"name":"energydata2025","arn":"arn:aws:s3:::energydata2025"},"object":{"key":"site1/20250216T213043Z.json","size":142}}}]}"#
                .to_string(),
        );

        let refs = parse_blob_refs(&body).unwrap();
        assert_eq!(
            refs,
            vec![BlobRef {
                bucket: "energydata2025".to_string(),
                key: "site1/20250216T213043Z.json".to_string(),
            }]
        );
    }

    #[test]
    fn parses_inline_notification_with_several_records() {
        let a = BlobRef { bucket: "b".to_string(), key: "site1/a.json".to_string() };
        let b = BlobRef { bucket: "b".to_string(), key: "site2/b.json".to_string() };
        let mut body = object_created_body(&a);
        let second = object_created_body(&b)["Records"][0].clone();
        body["Records"].as_array_mut().unwrap().push(second);

        assert_eq!(parse_blob_refs(&body).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_event_yields_nothing() {
        let body = serde_json::json!({"Service": "Amazon S3", "Event": "s3:TestEvent", "Bucket": "b"});
        assert!(parse_blob_refs(&body).unwrap().is_empty());
    }

    #[test]
    fn rejects_garbage_and_empty_records() {
        let garbage = Value::String("not json".to_string());
        assert!(matches!(parse_blob_refs(&garbage), Err(PipelineError::InvalidMessage(_))));

        let empty = serde_json::json!({"Records": []});
        assert!(matches!(parse_blob_refs(&empty), Err(PipelineError::InvalidMessage(_))));

        let missing_key = serde_json::json!({"Records": [{"s3": {"bucket": {"name": "b"}, "object": {}}}]});
        assert!(matches!(parse_blob_refs(&missing_key), Err(PipelineError::InvalidMessage(_))));
    }
}
