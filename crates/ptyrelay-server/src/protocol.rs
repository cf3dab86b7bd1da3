//! Session wire protocol: JSON text frames between browser and server.
//!
//! Inbound frames carry a `type` of `input`, `resize` or `session`; every
//! other shape is rejected with a [`ProtocolError`] whose text becomes the
//! payload of an error status frame.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_SESSION_STARTED: &str = "Session started";
pub const STATUS_ALREADY_RUNNING: &str = "Session already running";
pub const STATUS_SESSION_STOPPED: &str = "Session stopped";
pub const STATUS_NO_SESSION: &str = "No active session";
pub const STATUS_CLI_EXITED: &str = "CLI process exited";
pub const STATUS_START_FAILED: &str = "Failed to start CLI process";

// =============================================================================
// INBOUND
// =============================================================================

/// Messages received from the browser.
///
/// Dimensions are optional on the wire; the handler fills in the
/// configured defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Input { payload: String },
    Resize { cols: Option<u16>, rows: Option<u16> },
    Session(SessionAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Start { cols: Option<u16>, rows: Option<u16> },
    Stop,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid JSON message")]
    InvalidJson,

    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Unknown session action: {0}")]
    UnknownAction(String),

    #[error("Invalid {kind} message: {reason}")]
    InvalidFields { kind: &'static str, reason: String },
}

#[derive(Deserialize)]
struct InputFields {
    #[serde(default)]
    payload: String,
}

#[derive(Deserialize)]
struct SizeFields {
    #[serde(default)]
    cols: Option<u16>,
    #[serde(default)]
    rows: Option<u16>,
}

#[derive(Deserialize)]
struct SessionFields {
    #[serde(default)]
    action: Value,
    #[serde(default)]
    cols: Option<u16>,
    #[serde(default)]
    rows: Option<u16>,
}

impl ClientMessage {
    /// Decode one text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(|_| ProtocolError::InvalidJson)?;
        if !value.is_object() {
            return Err(ProtocolError::InvalidJson);
        }

        let kind = value.get("type").cloned().unwrap_or(Value::Null);
        match kind.as_str() {
            Some("input") => {
                let fields: InputFields = decode_fields("input", value)?;
                Ok(ClientMessage::Input {
                    payload: fields.payload,
                })
            }
            Some("resize") => {
                let fields: SizeFields = decode_fields("resize", value)?;
                Ok(ClientMessage::Resize {
                    cols: fields.cols,
                    rows: fields.rows,
                })
            }
            Some("session") => {
                let fields: SessionFields = decode_fields("session", value)?;
                let action = match fields.action.as_str() {
                    Some("start") => SessionAction::Start {
                        cols: fields.cols,
                        rows: fields.rows,
                    },
                    Some("stop") => SessionAction::Stop,
                    _ => return Err(ProtocolError::UnknownAction(display_value(&fields.action))),
                };
                Ok(ClientMessage::Session(action))
            }
            _ => Err(ProtocolError::UnknownType(display_value(&kind))),
        }
    }
}

fn decode_fields<T: DeserializeOwned>(kind: &'static str, value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidFields {
        kind,
        reason: e.to_string(),
    })
}

/// Strings verbatim, anything else as JSON text (`null` when absent).
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Session state reported in status frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Running,
    Stopped,
    Error,
}

/// Messages sent to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Output { payload: String },
    Status { payload: String, state: SessionState },
}

impl ServerMessage {
    pub fn output(payload: impl Into<String>) -> Self {
        ServerMessage::Output {
            payload: payload.into(),
        }
    }

    pub fn status(payload: impl Into<String>, state: SessionState) -> Self {
        ServerMessage::Status {
            payload: payload.into(),
            state,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_input() {
        let msg = ClientMessage::parse(r#"{"type":"input","payload":"ls\n"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Input {
                payload: "ls\n".into()
            }
        );
    }

    #[test]
    fn parse_input_without_payload_is_empty() {
        let msg = ClientMessage::parse(r#"{"type":"input"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Input { payload: "".into() });
    }

    #[test]
    fn parse_resize_with_and_without_dimensions() {
        let msg = ClientMessage::parse(r#"{"type":"resize","cols":100,"rows":30}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Resize {
                cols: Some(100),
                rows: Some(30)
            }
        );

        let msg = ClientMessage::parse(r#"{"type":"resize"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Resize {
                cols: None,
                rows: None
            }
        );
    }

    #[test]
    fn parse_session_start_and_stop() {
        let msg = ClientMessage::parse(r#"{"type":"session","action":"start"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Session(SessionAction::Start {
                cols: None,
                rows: None
            })
        );

        let msg =
            ClientMessage::parse(r#"{"type":"session","action":"start","cols":80,"rows":24}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Session(SessionAction::Start {
                cols: Some(80),
                rows: Some(24)
            })
        );

        let msg = ClientMessage::parse(r#"{"type":"session","action":"stop"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Session(SessionAction::Stop));
    }

    #[test]
    fn malformed_text_is_invalid_json() {
        assert_eq!(
            ClientMessage::parse("not-json"),
            Err(ProtocolError::InvalidJson)
        );
        assert_eq!(
            ProtocolError::InvalidJson.to_string(),
            "Invalid JSON message"
        );
    }

    #[test]
    fn non_object_json_is_invalid() {
        assert_eq!(ClientMessage::parse("42"), Err(ProtocolError::InvalidJson));
        assert_eq!(
            ClientMessage::parse(r#"["input"]"#),
            Err(ProtocolError::InvalidJson)
        );
    }

    #[test]
    fn unknown_type_names_the_type_verbatim() {
        let err = ClientMessage::parse(r#"{"type":"foo"}"#).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownType("foo".into()));
        assert!(err.to_string().contains("foo"));
    }

    #[test]
    fn missing_type_is_unknown() {
        let err = ClientMessage::parse(r#"{"payload":"x"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Unknown message type: null");
    }

    #[test]
    fn unknown_session_action() {
        let err = ClientMessage::parse(r#"{"type":"session","action":"pause"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Unknown session action: pause");

        let err = ClientMessage::parse(r#"{"type":"session"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Unknown session action: null");
    }

    #[test]
    fn wrongly_typed_fields_are_rejected() {
        let err = ClientMessage::parse(r#"{"type":"resize","cols":"wide"}"#).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidFields { kind: "resize", .. }
        ));

        let err = ClientMessage::parse(r#"{"type":"resize","cols":-1}"#).unwrap_err();
        assert!(err.to_string().starts_with("Invalid resize message"));

        let err = ClientMessage::parse(r#"{"type":"input","payload":7}"#).unwrap_err();
        assert!(err.to_string().starts_with("Invalid input message"));
    }

    #[test]
    fn status_frame_json_shape() {
        let json = ServerMessage::status(STATUS_SESSION_STARTED, SessionState::Running)
            .to_json()
            .unwrap();
        assert_eq!(
            json,
            r#"{"type":"status","payload":"Session started","state":"running"}"#
        );

        let json = ServerMessage::status("Invalid JSON message", SessionState::Error)
            .to_json()
            .unwrap();
        assert_eq!(
            json,
            r#"{"type":"status","payload":"Invalid JSON message","state":"error"}"#
        );
    }

    #[test]
    fn output_frame_json_shape() {
        let json = ServerMessage::output("\u{1b}[32mok\r\n").to_json().unwrap();
        assert_eq!(json, r#"{"type":"output","payload":"\u001b[32mok\r\n"}"#);
    }
}
