//! # Simulator message framing
//!
//! Messages use socket.io style event framing. A message starts with `4` (message) followed by
//! `2` (event), then a JSON array of the event name and its data:
//!
//! ```text
//! 42["telemetry",{"cte":"0.7598","speed":"35.1","steering_angle":"-1.2"}]
//! 42["steer",{"steering_angle":-0.14,"throttle":0.3}]
//! 42["manual",{}]
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde_json::{json, Value};
use thiserror::Error;

use super::{DriveDems, Telemetry};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Prefix of a socket.io event message.
pub const EVENT_PREFIX: &str = "42";

/// Name of the inbound telemetry event.
pub const TELEMETRY_EVENT: &str = "telemetry";

/// Name of the outbound steering event.
pub const STEER_EVENT: &str = "steer";

/// Name of the outbound event handing control back to the user.
pub const MANUAL_EVENT: &str = "manual";

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A telemetry sample to run the controllers on.
    Telemetry(Telemetry),

    /// The message is an event without data, the simulator is in manual mode.
    Manual,

    /// An event other than telemetry, which the controllers do not handle.
    Other(String),

    /// The message is not an event message (e.g. a socket.io ping) and carries nothing to act on.
    Ignored,
}

/// Errors in decoding an inbound message.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("The event payload is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("The event payload is not an array with a string event name")]
    InvalidEvent,

    #[error("The telemetry event has no data object")]
    MissingData,

    #[error("The telemetry data is missing or has malformed fields: {0}")]
    MalformedTelemetry(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Decode an inbound message.
pub fn parse_message(msg: &str) -> Result<SimEvent, FramingError> {
    if msg.len() <= EVENT_PREFIX.len() || !msg.starts_with(EVENT_PREFIX) {
        return Ok(SimEvent::Ignored);
    }

    let payload = match event_payload(msg) {
        Some(p) => p,
        None => return Ok(SimEvent::Manual),
    };

    let value: Value = serde_json::from_str(payload).map_err(FramingError::InvalidJson)?;

    let event = value
        .get(0)
        .and_then(Value::as_str)
        .ok_or(FramingError::InvalidEvent)?;

    if event != TELEMETRY_EVENT {
        return Ok(SimEvent::Other(event.to_string()));
    }

    let data = match value.get(1) {
        Some(d) if d.is_object() => d.clone(),
        _ => return Err(FramingError::MissingData),
    };

    serde_json::from_value(data)
        .map(SimEvent::Telemetry)
        .map_err(FramingError::MalformedTelemetry)
}

/// Encode drive demands as a steer event.
pub fn steer_message(dems: &DriveDems) -> String {
    format!(
        "{}{}",
        EVENT_PREFIX,
        json!([
            STEER_EVENT,
            {
                "steering_angle": dems.steering,
                "throttle": dems.throttle
            }
        ])
    )
}

/// Encode a manual event, which tells the simulator to keep its own control.
pub fn manual_message() -> String {
    format!("{}{}", EVENT_PREFIX, json!([MANUAL_EVENT, {}]))
}

/// Decode a steer event sent back by the drive executable.
///
/// Returns `None` for any other message, including manual events.
pub fn parse_reply(msg: &str) -> Option<DriveDems> {
    if !msg.starts_with(EVENT_PREFIX) {
        return None;
    }

    let value: Value = serde_json::from_str(event_payload(msg)?).ok()?;

    if value.get(0)?.as_str()? != STEER_EVENT {
        return None;
    }

    serde_json::from_value(value.get(1)?.clone()).ok()
}

/// Encode a telemetry sample, as the simulator would.
pub fn telemetry_message(telemetry: &Telemetry) -> String {
    let mut data = json!({
        "cte": telemetry.cte.to_string(),
        "speed": telemetry.speed.to_string(),
    });

    if let Some(angle) = telemetry.steering_angle {
        data["steering_angle"] = Value::String(angle.to_string());
    }

    format!("{}{}", EVENT_PREFIX, json!([TELEMETRY_EVENT, data]))
}

/// Get the JSON array from an event message.
///
/// Returns `None` if the message has no data: it contains `null` or has no complete `[...]`.
fn event_payload(msg: &str) -> Option<&str> {
    if msg.contains("null") {
        return None;
    }

    let start = msg.find('[')?;
    let end = msg.rfind(']')?;

    if end < start {
        return None;
    }

    Some(&msg[start..=end])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_telemetry() {
        let msg = r#"42["telemetry",{"cte":"0.7598","speed":"35.12","steering_angle":"-1.2"}]"#;

        assert_eq!(
            parse_message(msg).unwrap(),
            SimEvent::Telemetry(Telemetry {
                cte: 0.7598,
                speed: 35.12,
                steering_angle: Some(-1.2)
            })
        );
    }

    #[test]
    fn test_parse_numeric_telemetry() {
        let msg = r#"42["telemetry",{"cte":-0.5,"speed":10}]"#;

        assert_eq!(
            parse_message(msg).unwrap(),
            SimEvent::Telemetry(Telemetry {
                cte: -0.5,
                speed: 10.0,
                steering_angle: None
            })
        );
    }

    #[test]
    fn test_parse_no_data() {
        assert_eq!(parse_message(r#"42["telemetry",null]"#).unwrap(), SimEvent::Manual);
        assert_eq!(parse_message("42nothing").unwrap(), SimEvent::Manual);
        assert_eq!(parse_message("42]oops[").unwrap(), SimEvent::Manual);
    }

    #[test]
    fn test_parse_other_messages() {
        assert_eq!(parse_message("2").unwrap(), SimEvent::Ignored);
        assert_eq!(parse_message("42").unwrap(), SimEvent::Ignored);
        assert_eq!(parse_message(r#"3["telemetry"]"#).unwrap(), SimEvent::Ignored);
        assert_eq!(
            parse_message(r#"42["reset",{}]"#).unwrap(),
            SimEvent::Other("reset".into())
        );
    }

    #[test]
    fn test_parse_malformed() {
        match parse_message(r#"42["telemetry",{"speed":"12.0"}]"#) {
            Err(FramingError::MalformedTelemetry(_)) => (),
            r => panic!("Expected MalformedTelemetry, got {:?}", r),
        }
        match parse_message(r#"42["telemetry",{"cte":"abc","speed":"12.0"}]"#) {
            Err(FramingError::MalformedTelemetry(_)) => (),
            r => panic!("Expected MalformedTelemetry, got {:?}", r),
        }
        match parse_message(r#"42["telemetry"]"#) {
            Err(FramingError::MissingData) => (),
            r => panic!("Expected MissingData, got {:?}", r),
        }
        match parse_message(r#"42[1,{}]"#) {
            Err(FramingError::InvalidEvent) => (),
            r => panic!("Expected InvalidEvent, got {:?}", r),
        }
        match parse_message(r#"42[{,]"#) {
            Err(FramingError::InvalidJson(_)) => (),
            r => panic!("Expected InvalidJson, got {:?}", r),
        }
    }

    #[test]
    fn test_outbound_messages() {
        let dems = DriveDems {
            steering: -0.25,
            throttle: 0.5,
        };

        assert_eq!(
            steer_message(&dems),
            r#"42["steer",{"steering_angle":-0.25,"throttle":0.5}]"#
        );
        assert_eq!(manual_message(), r#"42["manual",{}]"#);

        assert_eq!(parse_reply(&steer_message(&dems)), Some(dems));
        assert_eq!(parse_reply(&manual_message()), None);
    }

    #[test]
    fn test_telemetry_message_is_parsed_back() {
        let telem = Telemetry {
            cte: 1.5,
            speed: 30.25,
            steering_angle: None,
        };

        assert_eq!(
            parse_message(&telemetry_message(&telem)).unwrap(),
            SimEvent::Telemetry(telem)
        );
    }
}
