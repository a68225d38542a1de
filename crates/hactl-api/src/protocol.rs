// Wire types for the Home Assistant WebSocket API.
//
// Three frame shapes travel over a session: handshake control frames,
// command/response envelopes correlated by `id`, and unsolicited event
// envelopes. Frames are discriminated by their `type` field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

// ── Frame type tags ──────────────────────────────────────────────────

pub const AUTH_REQUIRED: &str = "auth_required";
pub const AUTH_OK: &str = "auth_ok";
pub const AUTH_INVALID: &str = "auth_invalid";
pub const AUTH: &str = "auth";
pub const RESULT: &str = "result";
pub const EVENT: &str = "event";

// ── Handshake ────────────────────────────────────────────────────────

/// A handshake control frame, reduced to what the client inspects.
#[derive(Debug, Clone, Deserialize)]
pub struct HandshakeFrame {
    #[serde(rename = "type")]
    pub frame_type: String,

    /// Sent with `auth_required` and `auth_ok`.
    #[serde(default)]
    pub ha_version: Option<String>,

    /// Sent with `auth_invalid`.
    #[serde(default)]
    pub message: Option<String>,
}

/// The client's reply to `auth_required`.
#[derive(Serialize)]
pub(crate) struct AuthFrame<'a> {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub access_token: &'a str,
}

// ── Command / response ───────────────────────────────────────────────

/// Build a command envelope: `{id, type, ...params}`.
///
/// `params` must be a JSON object (or `null` for no parameters); its keys
/// are merged next to `id` and `type`, which always win.
pub(crate) fn command_envelope(id: u64, command: &str, params: Value) -> Result<Value, Error> {
    let mut envelope = match params {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(Error::Protocol {
                message: format!("command parameters must be a JSON object, got {other}"),
            });
        }
    };
    envelope.insert("id".into(), Value::from(id));
    envelope.insert("type".into(), Value::from(command));
    Ok(Value::Object(envelope))
}

/// Error payload of a failed command: `{"code": "...", "message": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A decoded reply: `{id, type: "result", success, result | error}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub id: Option<u64>,

    #[serde(rename = "type", default)]
    pub frame_type: Option<String>,

    #[serde(default)]
    pub success: Option<bool>,

    #[serde(default)]
    pub result: Value,

    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

impl ResponseEnvelope {
    /// Unwrap the `result` payload, turning `success: false` into
    /// [`Error::Api`] with the server message verbatim.
    pub fn into_result(self) -> Result<Value, Error> {
        match self.success {
            Some(true) => Ok(self.result),
            Some(false) => {
                let body = self.error.unwrap_or_default();
                Err(Error::Api {
                    code: body.code,
                    message: body.message.unwrap_or_else(|| "unknown error".into()),
                })
            }
            None => Err(Error::Protocol {
                message: format!(
                    "reply to command {} is not a result frame (type {:?})",
                    self.id.map_or_else(|| "?".into(), |id| id.to_string()),
                    self.frame_type.as_deref().unwrap_or("<missing>"),
                ),
            }),
        }
    }
}

// ── Events ───────────────────────────────────────────────────────────

/// An event pushed by the server after `subscribe_events`.
///
/// Uses `#[serde(flatten)]` to keep every field beyond the core set
/// (`context`, integration-specific keys), so nothing is dropped when the
/// event is re-emitted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HassEvent {
    /// Event type, e.g. `"state_changed"`, `"call_service"`.
    pub event_type: String,

    /// Event payload. For `state_changed` this carries `entity_id`,
    /// `old_state` and `new_state`.
    #[serde(default)]
    pub data: Value,

    /// `"LOCAL"` or `"REMOTE"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_fired: Option<DateTime<Utc>>,

    /// All remaining fields the server sends.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HassEvent {
    /// The entity this event is about, when the payload names one.
    pub fn entity_id(&self) -> Option<&str> {
        self.data.get("entity_id").and_then(Value::as_str)
    }

    /// For `state_changed`: the `(old, new)` state strings.
    pub fn state_transition(&self) -> Option<(Option<&str>, Option<&str>)> {
        if self.event_type != "state_changed" {
            return None;
        }
        let state_of = |key: &str| {
            self.data
                .get(key)
                .and_then(|s| s.get("state"))
                .and_then(Value::as_str)
        };
        Some((state_of("old_state"), state_of("new_state")))
    }
}

/// Raw event envelope: `{id?, type: "event", event: {...}}`.
#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    id: Option<u64>,
    event: HassEvent,
}

// ── Incoming frame discrimination ────────────────────────────────────

/// Any frame received after the handshake, classified by its `type`.
#[derive(Debug, Clone)]
pub enum IncomingFrame {
    /// An unsolicited event; `subscription` is the id of the subscribe
    /// command that produced it.
    Event {
        subscription: Option<u64>,
        event: HassEvent,
    },
    /// A command reply.
    Result(ResponseEnvelope),
    /// Anything else (`pong`, future frame types). Carries the type tag.
    Other(String),
}

impl IncomingFrame {
    /// Parse a text frame.
    ///
    /// Fails with [`Error::Deserialization`] for invalid JSON or an event
    /// whose body does not decode, and [`Error::Protocol`] for a frame
    /// without a string `type`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::deserialization(&e, text))?;

        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            return Err(Error::Protocol {
                message: "frame has no 'type' field".into(),
            });
        };

        match kind {
            EVENT => {
                let envelope: EventEnvelope =
                    serde_json::from_value(value).map_err(|e| Error::deserialization(&e, text))?;
                Ok(Self::Event {
                    subscription: envelope.id,
                    event: envelope.event,
                })
            }
            RESULT => serde_json::from_value(value)
                .map(Self::Result)
                .map_err(|e| Error::deserialization(&e, text)),
            other => Ok(Self::Other(other.to_owned())),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_envelope_merges_params() {
        let env = command_envelope(7, "subscribe_events", json!({"event_type": "state_changed"}))
            .unwrap();
        assert_eq!(
            env,
            json!({"id": 7, "type": "subscribe_events", "event_type": "state_changed"})
        );
    }

    #[test]
    fn command_envelope_id_and_type_cannot_be_overridden() {
        let env = command_envelope(3, "ping", json!({"id": 99, "type": "evil"})).unwrap();
        assert_eq!(env["id"], 3);
        assert_eq!(env["type"], "ping");
    }

    #[test]
    fn command_envelope_rejects_non_object_params() {
        let err = command_envelope(1, "ping", json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn failed_reply_carries_server_message() {
        let reply: ResponseEnvelope = serde_json::from_value(json!({
            "id": 4,
            "type": "result",
            "success": false,
            "error": {"code": "unknown_command", "message": "Unknown command."}
        }))
        .unwrap();

        match reply.into_result() {
            Err(Error::Api { code, message }) => {
                assert_eq!(code.as_deref(), Some("unknown_command"));
                assert_eq!(message, "Unknown command.");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn reply_without_success_is_a_protocol_error() {
        let reply: ResponseEnvelope =
            serde_json::from_value(json!({"id": 1, "type": "pong"})).unwrap();
        assert!(matches!(reply.into_result(), Err(Error::Protocol { .. })));
    }

    #[test]
    fn parse_state_changed_event() {
        let text = json!({
            "id": 1,
            "type": "event",
            "event": {
                "event_type": "state_changed",
                "data": {
                    "entity_id": "light.kitchen",
                    "old_state": {"state": "off"},
                    "new_state": {"state": "on"}
                },
                "origin": "LOCAL",
                "time_fired": "2026-02-10T12:00:00.123456+00:00",
                "context": {"id": "01HXYZ"}
            }
        })
        .to_string();

        let IncomingFrame::Event {
            subscription,
            event,
        } = IncomingFrame::parse(&text).unwrap()
        else {
            panic!("expected event frame");
        };
        assert_eq!(subscription, Some(1));
        assert_eq!(event.event_type, "state_changed");
        assert_eq!(event.entity_id(), Some("light.kitchen"));
        assert_eq!(event.state_transition(), Some((Some("off"), Some("on"))));
        assert!(event.time_fired.is_some());
        assert_eq!(event.extra["context"]["id"], "01HXYZ");
    }

    #[test]
    fn parse_unknown_frame_type() {
        let frame = IncomingFrame::parse(r#"{"id": 2, "type": "pong"}"#).unwrap();
        assert!(matches!(frame, IncomingFrame::Other(kind) if kind == "pong"));
    }

    #[test]
    fn parse_rejects_garbage_and_untyped_frames() {
        assert!(matches!(
            IncomingFrame::parse("not json at all"),
            Err(Error::Deserialization { .. })
        ));
        assert!(matches!(
            IncomingFrame::parse(r#"{"id": 2}"#),
            Err(Error::Protocol { .. })
        ));
        assert!(matches!(
            IncomingFrame::parse(r#"{"type": "event", "event": {"data": {}}}"#),
            Err(Error::Deserialization { .. })
        ));
    }
}
