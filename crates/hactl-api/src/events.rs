//! Event subscription and read loop.
//!
//! [`Session::subscribe`] consumes the session: once subscribed, the
//! connection belongs to the read loop and can no longer carry commands.
//! [`Subscription::next_event`] yields events that pass the
//! [`EventFilter`]; malformed frames are logged and skipped so one bad
//! frame never ends the stream.
//!
//! Cancellation goes through a [`CancellationToken`]: when it fires, the
//! loop stops waiting, closes the transport and reports end-of-stream.
//!
//! ```rust,ignore
//! let cancel = CancellationToken::new();
//! let filter = EventFilter::new().with_event_type("state_changed").with_domain("light");
//! let mut sub = session.subscribe(filter, cancel.clone()).await?;
//! while let Some(event) = sub.next_event().await {
//!     println!("{}", event.event_type);
//! }
//! ```

use futures_core::Stream;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::Error;
use crate::protocol::{HassEvent, IncomingFrame};
use crate::session::Session;

const SUBSCRIBE_EVENTS: &str = "subscribe_events";

// ── EventFilter ──────────────────────────────────────────────────────

/// Client-side event predicate.
///
/// Both criteria are optional; an empty filter passes everything.
/// The event type is also sent to the server with the subscription, so
/// the server pre-filters and the client check is a backstop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    event_type: Option<String>,
    domain: Option<String>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only pass events whose `event_type` equals `event_type` exactly.
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into()).filter(|t: &String| !t.is_empty());
        self
    }

    /// Only pass events whose `data.entity_id` is in `domain`
    /// (`light` matches `light.kitchen`).
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        let domain: String = domain.into();
        let domain = domain.trim_end_matches('.').to_owned();
        self.domain = Some(domain).filter(|d| !d.is_empty());
        self
    }

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Whether `event` passes both criteria. An event that names no
    /// entity never passes a domain filter.
    pub fn matches(&self, event: &HassEvent) -> bool {
        if let Some(ref wanted) = self.event_type {
            if event.event_type != *wanted {
                return false;
            }
        }
        if let Some(ref domain) = self.domain {
            let Some(entity_id) = event.entity_id() else {
                return false;
            };
            return entity_id
                .strip_prefix(domain.as_str())
                .is_some_and(|rest| rest.starts_with('.'));
        }
        true
    }
}

// ── Subscribe ────────────────────────────────────────────────────────

impl Session {
    /// Subscribe to events and hand the connection to the read loop.
    ///
    /// The acknowledgement is a regular command reply, consumed here;
    /// a rejected subscription is [`Error::Api`]. The session is closed on
    /// every failure path.
    pub async fn subscribe(
        mut self,
        filter: EventFilter,
        cancel: CancellationToken,
    ) -> Result<Subscription, Error> {
        let mut params = Map::new();
        if let Some(event_type) = filter.event_type() {
            params.insert("event_type".into(), Value::from(event_type));
        }

        let subscription_id = self.next_id();
        match self.call(SUBSCRIBE_EVENTS, Value::Object(params)).await {
            Ok(_) => {
                info!(
                    id = subscription_id,
                    event_type = filter.event_type().unwrap_or("*"),
                    "subscribed to events"
                );
                Ok(Subscription {
                    session: self,
                    subscription_id,
                    filter,
                    cancel,
                    finished: false,
                })
            }
            Err(e) => {
                self.close().await;
                Err(e)
            }
        }
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// An active event subscription. Owns the connection exclusively.
#[derive(Debug)]
pub struct Subscription {
    session: Session,
    subscription_id: u64,
    filter: EventFilter,
    cancel: CancellationToken,
    finished: bool,
}

impl Subscription {
    /// Id of the `subscribe_events` command backing this subscription.
    pub fn id(&self) -> u64 {
        self.subscription_id
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Wait for the next event that passes the filter.
    ///
    /// Returns `None` once the stream has ended: the server closed the
    /// connection, a read failed, or the cancellation token fired. None of
    /// these is reported as an error. After `None`, every further call
    /// returns `None` without touching the connection.
    pub async fn next_event(&mut self) -> Option<HassEvent> {
        if self.finished {
            return None;
        }

        loop {
            let frame = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                frame = self.session.read_frame() => Some(frame),
            };

            let Some(frame) = frame else {
                debug!("event stream cancelled, closing connection");
                self.finish().await;
                return None;
            };

            match frame {
                Ok(text) => {
                    if let Some(event) = self.accept(&text) {
                        return Some(event);
                    }
                }
                Err(Error::WebSocketClosed { code, reason }) => {
                    info!(code, reason = %reason, "event stream closed by server");
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    warn!(error = %e, "event stream read failed");
                    self.finish().await;
                    return None;
                }
            }
        }
    }

    /// Classify one text frame; `Some` only for events passing the filter.
    fn accept(&self, text: &str) -> Option<HassEvent> {
        match IncomingFrame::parse(text) {
            Ok(IncomingFrame::Event { event, .. }) => {
                if self.filter.matches(&event) {
                    Some(event)
                } else {
                    trace!(event_type = %event.event_type, "event filtered out");
                    None
                }
            }
            Ok(IncomingFrame::Result(reply)) => {
                trace!(id = ?reply.id, "ignoring result frame on subscribed connection");
                None
            }
            Ok(IncomingFrame::Other(kind)) => {
                trace!(kind, "ignoring non-event frame");
                None
            }
            Err(e) => {
                debug!(error = %e, "skipping malformed frame");
                None
            }
        }
    }

    async fn finish(&mut self) {
        self.finished = true;
        self.session.shutdown().await;
    }

    /// Adapt the read loop into a [`Stream`] of events.
    pub fn into_stream(mut self) -> impl Stream<Item = HassEvent> {
        async_stream::stream! {
            while let Some(event) = self.next_event().await {
                yield event;
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, data: Value) -> HassEvent {
        serde_json::from_value(json!({ "event_type": event_type, "data": data })).unwrap()
    }

    #[test]
    fn empty_filter_passes_everything() {
        let filter = EventFilter::new();
        assert!(filter.matches(&event("call_service", json!({}))));
        assert!(filter.matches(&event("state_changed", json!({"entity_id": "light.a"}))));
    }

    #[test]
    fn event_type_is_an_exact_match() {
        let filter = EventFilter::new().with_event_type("state_changed");
        assert!(filter.matches(&event("state_changed", json!({}))));
        assert!(!filter.matches(&event("state_changed_extra", json!({}))));
        assert!(!filter.matches(&event("call_service", json!({}))));
    }

    #[test]
    fn domain_matches_entity_prefix_with_dot() {
        let filter = EventFilter::new().with_domain("light");
        assert!(filter.matches(&event("state_changed", json!({"entity_id": "light.kitchen"}))));
        assert!(!filter.matches(&event("state_changed", json!({"entity_id": "lightning.x"}))));
        assert!(!filter.matches(&event("state_changed", json!({"entity_id": "switch.light"}))));
    }

    #[test]
    fn domain_filter_rejects_events_without_entity() {
        let filter = EventFilter::new().with_domain("light");
        assert!(!filter.matches(&event("homeassistant_started", json!({}))));
        assert!(!filter.matches(&event("state_changed", json!({"entity_id": 42}))));
    }

    #[test]
    fn combined_criteria_must_both_hold() {
        let filter = EventFilter::new()
            .with_event_type("state_changed")
            .with_domain("binary_sensor.");
        assert_eq!(filter.domain(), Some("binary_sensor"));
        assert!(filter.matches(&event(
            "state_changed",
            json!({"entity_id": "binary_sensor.motion"})
        )));
        assert!(!filter.matches(&event(
            "call_service",
            json!({"entity_id": "binary_sensor.motion"})
        )));
    }

    #[test]
    fn empty_criteria_are_ignored() {
        let filter = EventFilter::new().with_event_type("").with_domain("");
        assert_eq!(filter, EventFilter::new());
    }
}
