//! Relay subscription streaming
//!
//! One outbound query runs as a small state machine over a caller-supplied
//! transport:
//!
//! ```text
//! Connecting → Subscribed → Streaming → Closed
//! ```
//!
//! `Connecting` sends the `REQ`; the first event moves `Subscribed` to
//! `Streaming`; `Closed` is terminal and reached by end-of-results
//! (`EOSE`), the requested limit, an explicit [`Subscription::close`], a
//! receive timeout, or the connection dropping. Events are converted and
//! yielded one at a time as they arrive - the subscription is an
//! [Iterator], lazy, single-pass and non-restartable. A connection that
//! dies mid-stream just ends the sequence: whatever arrived is the result,
//! partial results are valid results.
//!
//! The transport is synchronous and owned by the caller, which keeps this
//! the only place in the crate that waits on I/O. Retrying a dropped
//! relay connection is the caller's business, not ours.

use std::time::Duration;

use activity_model::Object;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::event::Event;
use super::parser::event_to_object;
use crate::error::ConvertError;
use crate::warnings::{Report, Warning};

/// Subscription filter, serialized into the `REQ` frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filter {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub kinds: Vec<u32>,
    /// Events referencing these event ids (`#e` in the wire filter).
    #[serde(rename = "#e", skip_serializing_if = "Vec::is_empty", default)]
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Default result cap when the filter doesn't set one.
pub const DEFAULT_LIMIT: usize = 20;

/// The caller-supplied socket. Implementations wrap whatever connection the
/// client layer holds; the tests use an in-memory script of frames.
pub trait RelayTransport {
    /// Send one text frame.
    fn send(&mut self, frame: &str) -> Result<(), ConvertError>;

    /// Receive the next text frame, waiting up to `timeout`.
    ///
    /// `Ok(None)` means the connection closed or the wait timed out; both
    /// end the subscription cleanly.
    fn recv(&mut self, timeout: Duration) -> Result<Option<String>, ConvertError>;
}

/// States of one outbound query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Connecting,
    Subscribed,
    Streaming,
    Closed,
}

/// A single running query against one relay connection.
///
/// Iterate it to receive canonical objects as their events arrive.
pub struct Subscription<'a, T: RelayTransport> {
    transport: &'a mut T,
    subscription_id: String,
    filter: Filter,
    timeout: Duration,
    state: SubscriptionState,
    limit: usize,
    received: usize,
    warnings: Vec<Warning>,
}

impl<'a, T: RelayTransport> Subscription<'a, T> {
    pub fn new(transport: &'a mut T, filter: Filter, timeout: Duration) -> Self {
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT);
        // derived from the filter so identical queries are identical on the
        // wire; no clocks or randomness in here
        let digest = Sha256::digest(
            serde_json::to_string(&filter)
                .unwrap_or_default()
                .as_bytes(),
        );
        let subscription_id: String = digest
            .iter()
            .take(8)
            .map(|b| format!("{b:02x}"))
            .collect();

        Subscription {
            transport,
            subscription_id,
            filter,
            timeout,
            state: SubscriptionState::Connecting,
            limit,
            received: 0,
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Warnings accumulated so far (invalid events, odd frames).
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Unsubscribe: send `CLOSE` and stop. Idempotent.
    pub fn close(&mut self) {
        if self.state == SubscriptionState::Closed {
            return;
        }
        let frame = json!(["CLOSE", self.subscription_id]).to_string();
        // the connection may already be gone; closed is closed
        let _ = self.transport.send(&frame);
        self.state = SubscriptionState::Closed;
    }

    fn subscribe(&mut self) -> bool {
        let frame = json!(["REQ", self.subscription_id, self.filter]).to_string();
        match self.transport.send(&frame) {
            Ok(()) => {
                self.state = SubscriptionState::Subscribed;
                true
            }
            Err(e) => {
                self.warn("REQ", format!("send failed: {e}"));
                self.state = SubscriptionState::Closed;
                false
            }
        }
    }

    fn warn(&mut self, field: &str, message: String) {
        tracing::warn!(field, "{message}");
        self.warnings.push(Warning::new("nostr", field, message));
    }

    fn next_object(&mut self) -> Option<Object> {
        if self.state == SubscriptionState::Closed {
            return None;
        }
        if self.state == SubscriptionState::Connecting && !self.subscribe() {
            return None;
        }
        if self.received >= self.limit {
            self.close();
            return None;
        }

        loop {
            let frame = match self.transport.recv(self.timeout) {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    // timeout or disconnect: partial results are valid
                    self.state = SubscriptionState::Closed;
                    return None;
                }
                Err(e) => {
                    self.warn("recv", e.to_string());
                    self.state = SubscriptionState::Closed;
                    return None;
                }
            };

            let message: Value = match serde_json::from_str(&frame) {
                Ok(message) => message,
                Err(e) => {
                    self.warn("frame", format!("not JSON: {e}"));
                    continue;
                }
            };
            let kind = message.get(0).and_then(Value::as_str).unwrap_or_default();
            let for_us = message.get(1).and_then(Value::as_str)
                == Some(self.subscription_id.as_str());

            match kind {
                "EVENT" if for_us => {
                    let event: Event = match serde_json::from_value(
                        message.get(2).cloned().unwrap_or(Value::Null),
                    ) {
                        Ok(event) => event,
                        Err(e) => {
                            self.warn("event", format!("malformed event: {e}"));
                            continue;
                        }
                    };
                    if event.id.is_some() && !event.id_is_valid() {
                        self.warn(
                            "event.id",
                            format!("id mismatch for event {:?}, dropped", event.id),
                        );
                        continue;
                    }

                    let mut report = Report::new("nostr");
                    let converted = event_to_object(&event, &mut report);
                    self.warnings.extend(report.finish(()).warnings);
                    let Some(obj) = converted else {
                        continue;
                    };

                    self.state = SubscriptionState::Streaming;
                    self.received += 1;
                    return Some(obj);
                }
                "EOSE" if for_us => {
                    self.close();
                    return None;
                }
                "CLOSED" if for_us => {
                    self.state = SubscriptionState::Closed;
                    return None;
                }
                "NOTICE" => {
                    let notice = message.get(1).and_then(Value::as_str).unwrap_or_default();
                    tracing::debug!(notice, "relay notice");
                }
                _ => {
                    tracing::debug!(frame = %frame, "ignoring frame");
                }
            }
        }
    }
}

impl<T: RelayTransport> Iterator for Subscription<'_, T> {
    type Item = Object;

    fn next(&mut self) -> Option<Object> {
        self.next_object()
    }
}

#[cfg(test)]
mod tests {
    use super::super::event::{event_id, Event, KIND_NOTE};
    use super::*;
    use std::collections::VecDeque;

    /// Scripted in-memory transport: pops queued frames, records sends.
    struct FakeRelay {
        inbound: VecDeque<Option<String>>,
        sent: Vec<String>,
    }

    impl FakeRelay {
        fn new(frames: Vec<Option<String>>) -> Self {
            FakeRelay {
                inbound: frames.into(),
                sent: Vec::new(),
            }
        }
    }

    impl RelayTransport for FakeRelay {
        fn send(&mut self, frame: &str) -> Result<(), ConvertError> {
            self.sent.push(frame.to_string());
            Ok(())
        }

        fn recv(&mut self, _timeout: Duration) -> Result<Option<String>, ConvertError> {
            Ok(self.inbound.pop_front().unwrap_or(None))
        }
    }

    fn note(content: &str) -> Event {
        let mut event = Event {
            pubkey: "a".repeat(64),
            created_at: 1700000000,
            kind: KIND_NOTE,
            content: content.to_string(),
            ..Event::default()
        };
        event.id = Some(event_id(&event));
        event
    }

    fn sub_id(filter: &Filter) -> String {
        // mirror of the deterministic derivation in Subscription::new
        use sha2::{Digest, Sha256};
        Sha256::digest(serde_json::to_string(filter).unwrap().as_bytes())
            .iter()
            .take(8)
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    fn event_frame(filter: &Filter, event: &Event) -> Option<String> {
        Some(serde_json::json!(["EVENT", sub_id(filter), event]).to_string())
    }

    #[test]
    fn test_streams_events_until_eose() {
        let filter = Filter::default();
        let mut relay = FakeRelay::new(vec![
            event_frame(&filter, &note("one")),
            event_frame(&filter, &note("two")),
            Some(serde_json::json!(["EOSE", sub_id(&filter)]).to_string()),
        ]);

        let mut sub = Subscription::new(&mut relay, filter, Duration::from_secs(1));
        assert_eq!(sub.state(), SubscriptionState::Connecting);

        let first = sub.next().unwrap();
        assert_eq!(first.content.as_deref(), Some("one"));
        assert_eq!(sub.state(), SubscriptionState::Streaming);

        let second = sub.next().unwrap();
        assert_eq!(second.content.as_deref(), Some("two"));

        assert!(sub.next().is_none());
        assert_eq!(sub.state(), SubscriptionState::Closed);
        // exhausted subscriptions stay exhausted
        assert!(sub.next().is_none());

        assert!(relay.sent[0].starts_with("[\"REQ\""));
        assert!(relay.sent.last().unwrap().starts_with("[\"CLOSE\""));
    }

    #[test]
    fn test_disconnect_mid_stream_yields_partial_results() {
        let filter = Filter::default();
        let mut relay = FakeRelay::new(vec![
            event_frame(&filter, &note("only")),
            None, // connection drops before EOSE
        ]);

        let mut sub = Subscription::new(&mut relay, filter, Duration::from_secs(1));
        let collected: Vec<_> = sub.by_ref().collect();
        assert_eq!(collected.len(), 1);
        assert_eq!(sub.state(), SubscriptionState::Closed);
    }

    #[test]
    fn test_limit_closes_subscription() {
        let filter = Filter {
            limit: Some(1),
            ..Filter::default()
        };
        let mut relay = FakeRelay::new(vec![
            event_frame(&filter, &note("one")),
            event_frame(&filter, &note("two")),
        ]);

        let mut sub = Subscription::new(&mut relay, filter, Duration::from_secs(1));
        assert!(sub.next().is_some());
        assert!(sub.next().is_none());
        assert_eq!(sub.state(), SubscriptionState::Closed);
        assert!(relay.sent.iter().any(|f| f.starts_with("[\"CLOSE\"")));
    }

    #[test]
    fn test_invalid_event_id_dropped_with_warning() {
        let filter = Filter::default();
        let mut bad = note("tampered");
        bad.content = "changed after signing".to_string();
        let mut relay = FakeRelay::new(vec![
            event_frame(&filter, &bad),
            Some(serde_json::json!(["EOSE", sub_id(&filter)]).to_string()),
        ]);

        let mut sub = Subscription::new(&mut relay, filter, Duration::from_secs(1));
        assert!(sub.next().is_none());
        assert!(!sub.warnings().is_empty());
    }

    #[test]
    fn test_frames_for_other_subscriptions_ignored() {
        let filter = Filter::default();
        let mut relay = FakeRelay::new(vec![
            Some(serde_json::json!(["EVENT", "someone-else", note("not ours")]).to_string()),
            event_frame(&filter, &note("ours")),
            Some(serde_json::json!(["EOSE", sub_id(&filter)]).to_string()),
        ]);

        let sub = Subscription::new(&mut relay, filter, Duration::from_secs(1));
        let collected: Vec<_> = sub.collect();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].content.as_deref(), Some("ours"));
    }

    #[test]
    fn test_explicit_close_is_terminal() {
        let filter = Filter::default();
        let mut relay = FakeRelay::new(vec![event_frame(&filter, &note("never read"))]);

        let mut sub = Subscription::new(&mut relay, filter, Duration::from_secs(1));
        sub.close();
        assert_eq!(sub.state(), SubscriptionState::Closed);
        assert!(sub.next().is_none());
    }
}
