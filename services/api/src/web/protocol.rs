//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the
//! API server for the quiz review chat panel.

use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Initializes a chat session over one quiz attempt. This must be the
    /// first message sent on the connection.
    Init { user_id: String, quiz_id: String },

    /// A question typed into the chat input. Blank or mid-stream submissions
    /// are dropped silently; the client sees no reply for them.
    Chat { text: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms successful session initialization.
    SessionInitialized { quiz_id: String },

    /// Reports a fatal error to the client, which should display an error message.
    Error { message: String },

    /// Signals that a submission was accepted and a reply is being generated.
    /// The UI can show its "Thinking..." indicator.
    AnswerStarted,

    /// One text increment of the assistant's reply, in delivery order.
    AnswerDelta { text: String },

    /// Signals that the reply finished streaming successfully.
    AnswerEnded,

    /// Signals that the reply was abandoned; `message` carries the apology
    /// text that replaced the assistant's partial reply.
    AnswerFailed { message: String },
}
