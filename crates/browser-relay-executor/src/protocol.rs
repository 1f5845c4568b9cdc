//! Wire protocol exchanged with the remote executor.

use browser_relay_core::RequestId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound call envelope: `{"id": …, "type": …, "payload": …}`.
///
/// The relay never interprets the action name or payload; both are
/// opaque and belong to the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Correlation id echoed back in the matching reply.
    pub id: RequestId,
    /// Action name, e.g. `click` or `navigate`.
    #[serde(rename = "type")]
    pub action: String,
    /// Opaque action arguments.
    pub payload: Value,
}

impl ActionRequest {
    /// Build an envelope for one call.
    #[must_use]
    pub fn new(id: RequestId, action: impl Into<String>, payload: Value) -> Self {
        Self {
            id,
            action: action.into(),
            payload,
        }
    }
}

/// Body of an `action_response` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponsePayload {
    /// Correlation id of the call this reply answers.
    pub request_id: RequestId,
    /// Whether the action succeeded executor-side.
    pub success: bool,
    /// Result data for successful actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error description for failed actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Message from the executor to the relay.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutorMessage {
    /// Reply to an [`ActionRequest`], keyed by `payload.requestId`.
    ActionResponse { payload: ActionResponsePayload },
    /// Unsolicited status pushed by the executor (page loaded, etc.).
    StatusUpdate {
        #[serde(default)]
        payload: Value,
    },
    /// Any other message type; tolerated and ignored.
    #[serde(other)]
    Unknown,
}

/// Informational notice from the relay to the executor.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayNotice {
    /// Connection-established greeting.
    ServerConnected { payload: ConnectionStatus },
}

/// Payload of [`RelayNotice::ServerConnected`].
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub status: String,
}

impl RelayNotice {
    /// The greeting sent to a newly attached executor.
    #[must_use]
    pub fn server_connected() -> Self {
        Self::ServerConnected {
            payload: ConnectionStatus {
                status: "connected".to_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_request_uses_wire_field_names() {
        let id = RequestId::new_v4();
        let request = ActionRequest::new(id, "click", serde_json::json!({"element": "#btn"}));
        let json: Value = serde_json::to_value(&request).unwrap();

        assert_eq!(json["id"], Value::String(id.to_string()));
        assert_eq!(json["type"], "click");
        assert_eq!(json["payload"]["element"], "#btn");
    }

    #[test]
    fn action_response_parses_camel_case_payload() {
        let id = RequestId::new_v4();
        let raw = format!(
            r#"{{"type":"action_response","payload":{{"requestId":"{id}","success":true,"data":"ok"}}}}"#
        );

        let msg: ExecutorMessage = serde_json::from_str(&raw).unwrap();
        let ExecutorMessage::ActionResponse { payload } = msg else {
            panic!("wrong message type");
        };
        assert_eq!(payload.request_id, id);
        assert!(payload.success);
        assert_eq!(payload.data, Some(Value::String("ok".to_owned())));
        assert_eq!(payload.error, None);
    }

    #[test]
    fn unknown_message_types_are_tolerated() {
        let msg: ExecutorMessage =
            serde_json::from_str(r#"{"type":"heartbeat","payload":{}}"#).unwrap();
        assert!(matches!(msg, ExecutorMessage::Unknown));
    }

    #[test]
    fn action_response_without_request_id_fails_validation() {
        let raw = r#"{"type":"action_response","payload":{"success":true}}"#;
        assert!(serde_json::from_str::<ExecutorMessage>(raw).is_err());
    }

    #[test]
    fn server_connected_notice_matches_the_wire_shape() {
        let json = serde_json::to_string(&RelayNotice::server_connected()).unwrap();
        assert_eq!(
            json,
            r#"{"type":"server_connected","payload":{"status":"connected"}}"#
        );
    }
}
