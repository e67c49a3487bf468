//! Defines the WebSocket message protocol between the browser client and the API server.

use serde::{Deserialize, Serialize};
use thereis_core::SessionSnapshot;

/// Messages sent from the client (browser) to the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts a new round. Valid at the start, after an error, and after game over.
    Start,
    /// The player's judgment of the current sentence.
    SubmitAnswer { choice: bool },
    /// Moves on from the shown result.
    Advance,
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The session state after a transition, and on connect.
    State { snapshot: SessionSnapshot },
    /// The last client message was not valid in the current phase or could not be parsed.
    Rejected { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "submit_answer", "choice": false}"#).unwrap();
        assert_eq!(msg, ClientMessage::SubmitAnswer { choice: false });

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "start"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Start);

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "restart"}"#).is_err());
    }

    #[test]
    fn test_rejected_message_format() {
        let msg = ServerMessage::Rejected {
            message: "nope".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({"type": "rejected", "message": "nope"})
        );
    }
}
