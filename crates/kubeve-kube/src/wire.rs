//! JSON shapes of the core/v1 Event API and their conversion into
//! [`kubeve_core::Event`].
//!
//! Items are decoded one at a time so a single malformed record is skipped
//! instead of failing the whole list or watch.

use chrono::{DateTime, Utc};
use kubeve_core::{Event, EventType, ResourceRef};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::TransportError;
use crate::source::EventListing;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ObjectMeta {
    namespace: Option<String>,
    creation_timestamp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ObjectReference {
    kind: Option<String>,
    name: Option<String>,
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    #[serde(default)]
    metadata: ObjectMeta,
    involved_object: ObjectReference,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    event_type: Option<String>,
    #[serde(default)]
    last_timestamp: Option<String>,
    #[serde(default)]
    event_time: Option<String>,
    #[serde(default)]
    first_timestamp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ListMeta {
    resource_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireEventList {
    #[serde(default)]
    metadata: ListMeta,
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WatchLine {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    object: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireStatus {
    message: Option<String>,
    code: Option<i64>,
}

fn parse_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

impl WireEvent {
    /// Most meaningful instant: last seen, then event time, then first seen,
    /// then object creation.
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        [
            self.last_timestamp.as_deref(),
            self.event_time.as_deref(),
            self.first_timestamp.as_deref(),
            self.metadata.creation_timestamp.as_deref(),
        ]
        .into_iter()
        .find_map(parse_time)
    }

    fn into_event(self) -> Result<Event, String> {
        let timestamp = self.timestamp();
        let kind = self.involved_object.kind.unwrap_or_default();
        let name = self.involved_object.name.unwrap_or_default();
        if kind.trim().is_empty() || name.trim().is_empty() {
            return Err("involvedObject has no kind/name".to_string());
        }
        let namespace = self
            .metadata
            .namespace
            .filter(|ns| !ns.is_empty())
            .or(self.involved_object.namespace)
            .unwrap_or_default();
        Ok(Event {
            timestamp,
            resource: ResourceRef::new(kind, name),
            event_type: EventType::parse(self.event_type.as_deref().unwrap_or_default()),
            reason: self.reason.unwrap_or_default(),
            namespace,
            message: self.message.unwrap_or_default(),
        })
    }
}

/// Converts one raw event object.
pub fn decode_event(value: Value) -> Result<Event, TransportError> {
    let wire: WireEvent =
        serde_json::from_value(value).map_err(|err| TransportError::decode("event", err))?;
    wire.into_event()
        .map_err(|message| TransportError::decode("event", message))
}

/// Decodes an EventList body. Malformed items are skipped.
pub fn decode_event_list(body: &[u8]) -> Result<EventListing, TransportError> {
    let list: WireEventList =
        serde_json::from_slice(body).map_err(|err| TransportError::decode("event list", err))?;
    let mut events = Vec::with_capacity(list.items.len());
    for item in list.items {
        match decode_event(item) {
            Ok(event) => events.push(event),
            Err(err) => debug!(error = %err, "skipping malformed event in listing"),
        }
    }
    Ok(EventListing {
        events,
        resume_token: list.metadata.resource_version.unwrap_or_default(),
    })
}

/// One decoded line of a watch response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchFrame {
    Event(Event),
    /// Deletions, bookmarks and undecodable records.
    Skip,
    /// Server-side error status; ends the watch.
    Rejected(TransportError),
}

/// Decodes one newline-delimited watch frame.
pub fn decode_watch_line(line: &str) -> Result<WatchFrame, TransportError> {
    let frame: WatchLine =
        serde_json::from_str(line).map_err(|err| TransportError::decode("watch frame", err))?;
    match frame.kind.as_str() {
        "ADDED" | "MODIFIED" => match decode_event(frame.object) {
            Ok(event) => Ok(WatchFrame::Event(event)),
            Err(err) => {
                debug!(error = %err, "skipping malformed watched event");
                Ok(WatchFrame::Skip)
            }
        },
        "ERROR" => {
            let status: WireStatus = serde_json::from_value(frame.object).unwrap_or_default();
            Ok(WatchFrame::Rejected(TransportError::WatchRejected {
                code: status.code,
                message: status
                    .message
                    .unwrap_or_else(|| "watch ended with an error".to_string()),
            }))
        }
        _ => Ok(WatchFrame::Skip),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kubeve_core::EventType;
    use serde_json::json;

    use super::{decode_event, decode_event_list, decode_watch_line, WatchFrame};
    use crate::error::TransportError;

    fn raw_event() -> serde_json::Value {
        json!({
            "metadata": {"name": "web-1.17a", "namespace": "default", "creationTimestamp": "2024-05-01T12:00:00Z"},
            "involvedObject": {"kind": "Pod", "name": "web-1", "namespace": "default"},
            "reason": "BackOff",
            "message": "Back-off restarting failed container",
            "type": "Warning",
            "lastTimestamp": "2024-05-01T12:30:00Z"
        })
    }

    #[test]
    fn decodes_core_fields() {
        let event = decode_event(raw_event()).unwrap();
        assert_eq!(event.resource.to_string(), "Pod/web-1");
        assert_eq!(event.event_type, EventType::Warning);
        assert_eq!(event.reason, "BackOff");
        assert_eq!(event.namespace, "default");
        assert_eq!(event.timestamp_text(), "2024-05-01T12:30:00Z");
    }

    #[test]
    fn timestamp_falls_back_through_fields() {
        let mut value = raw_event();
        value["lastTimestamp"] = serde_json::Value::Null;
        value["eventTime"] = json!("2024-05-01T12:10:00.123456Z");
        let event = decode_event(value.clone()).unwrap();
        assert_eq!(event.timestamp_text(), "2024-05-01T12:10:00Z");

        value["eventTime"] = serde_json::Value::Null;
        let event = decode_event(value).unwrap();
        assert_eq!(event.timestamp_text(), "2024-05-01T12:00:00Z");
    }

    #[test]
    fn list_skips_malformed_items_and_keeps_token() {
        let body = json!({
            "metadata": {"resourceVersion": "4711"},
            "items": [raw_event(), {"involvedObject": {"kind": "Pod"}}, 17]
        });
        let listing = decode_event_list(body.to_string().as_bytes()).unwrap();
        assert_eq!(listing.resume_token, "4711");
        assert_eq!(listing.events.len(), 1);
    }

    #[test]
    fn list_body_that_is_not_json_fails() {
        let err = decode_event_list(b"<html>").unwrap_err();
        assert!(matches!(err, TransportError::Decode { .. }));
    }

    #[test]
    fn watch_frames() {
        let added = json!({"type": "ADDED", "object": raw_event()}).to_string();
        assert!(matches!(decode_watch_line(&added).unwrap(), WatchFrame::Event(_)));

        let deleted = json!({"type": "DELETED", "object": raw_event()}).to_string();
        assert_eq!(decode_watch_line(&deleted).unwrap(), WatchFrame::Skip);

        let broken = json!({"type": "MODIFIED", "object": {"reason": 1}}).to_string();
        assert_eq!(decode_watch_line(&broken).unwrap(), WatchFrame::Skip);

        let gone = json!({"type": "ERROR", "object": {"kind": "Status", "code": 410, "message": "too old resource version"}}).to_string();
        assert_eq!(
            decode_watch_line(&gone).unwrap(),
            WatchFrame::Rejected(TransportError::WatchRejected {
                code: Some(410),
                message: "too old resource version".into()
            })
        );

        assert!(decode_watch_line("not json").is_err());
    }
}
