use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("zchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("zchat.client.request_errors");
pub(crate) static CLIENT_AUTH_RECOVERIES: Counter = Counter::new("zchat.client.auth_recoveries");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("zchat.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("zchat.stream.events");
pub(crate) static STREAM_DECODE_ERRORS: Counter = Counter::new("zchat.stream.decode_errors");
pub(crate) static STREAM_DROPPED_THINKING: Counter =
    Counter::new("zchat.stream.dropped_thinking");
pub(crate) static STREAM_BYTES: Counter = Counter::new("zchat.stream.bytes");

pub(crate) static SESSION_TURNS: Counter = Counter::new("zchat.session.turns");
pub(crate) static SESSION_TURN_ERRORS: Counter = Counter::new("zchat.session.turn_errors");
pub(crate) static SESSION_BUSY: Counter = Counter::new("zchat.session.busy");
pub(crate) static SESSION_INTERRUPTS: Counter = Counter::new("zchat.session.interrupts");
pub(crate) static SESSION_TURN_DURATION: Moments =
    Moments::new("zchat.session.turn_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_AUTH_RECOVERIES);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_DECODE_ERRORS);
    collector.register_counter(&STREAM_DROPPED_THINKING);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TURN_ERRORS);
    collector.register_counter(&SESSION_BUSY);
    collector.register_counter(&SESSION_INTERRUPTS);
    collector.register_moments(&SESSION_TURN_DURATION);
}
