//! Server → client messages.
//!
//! The authority sends JSON objects discriminated by a `type` field:
//!
//! | `type`          | `state`  | other fields                        |
//! |-----------------|----------|-------------------------------------|
//! | `initial_state` | required |                                     |
//! | `state_update`  | required |                                     |
//! | `action_result` | required | optional `success` or `error` text  |
//! | `error`         | optional | required `error` text               |
//!
//! Decoding is two-staged: the raw text is parsed into a generic JSON object
//! first so that the discriminant and each field can be reported precisely,
//! then the snapshot is decoded into its typed shape.

use serde_json::{Map, Value, json};

use crate::{
    Snapshot,
    errors::{ProtocolError, Result},
};

/// Discriminant of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    /// First snapshot after a state request.
    InitialState,
    /// Push-driven snapshot.
    StateUpdate,
    /// Snapshot echoed after a command.
    ActionResult,
    /// Authority-reported fault.
    Error,
}

impl InboundKind {
    /// Wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitialState => "initial_state",
            Self::StateUpdate => "state_update",
            Self::ActionResult => "action_result",
            Self::Error => "error",
        }
    }

    /// Parse a wire name. `None` for unknown kinds.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "initial_state" => Some(Self::InitialState),
            "state_update" => Some(Self::StateUpdate),
            "action_result" => Some(Self::ActionResult),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Result text the authority attaches to an `action_result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The command was applied.
    Success(String),
    /// The command was refused; the attached state is still authoritative.
    Failure(String),
}

/// A decoded server → client message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Snapshot answering the client's state request.
    InitialState {
        /// Replacement snapshot.
        state: Snapshot,
    },
    /// Snapshot pushed by the authority.
    StateUpdate {
        /// Replacement snapshot.
        state: Snapshot,
    },
    /// Snapshot echoed after a command, with the command's outcome if given.
    ActionResult {
        /// Replacement snapshot.
        state: Snapshot,
        /// Outcome text. `None` if the authority sent none.
        outcome: Option<ActionOutcome>,
    },
    /// Authority-reported fault, optionally with updated truth.
    Error {
        /// Human-readable message.
        message: String,
        /// Replacement snapshot. `None` if the authority sent none.
        state: Option<Snapshot>,
    },
}

impl Inbound {
    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if the text is not JSON
    /// - `ProtocolError::NotAnObject` if the JSON is not an object
    /// - `ProtocolError::MissingField`/`InvalidField` for absent or mistyped
    ///   fields
    /// - `ProtocolError::UnknownType` for discriminants outside the schema
    /// - `ProtocolError::InvalidSnapshot` if `state` lacks the snapshot shape
    pub fn decode(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let kind = match fields.get("type") {
            Some(Value::String(name)) => InboundKind::from_wire(name)
                .ok_or_else(|| ProtocolError::UnknownType(name.clone()))?,
            Some(Value::Null) | None => return Err(ProtocolError::MissingField("type")),
            Some(_) => {
                return Err(ProtocolError::InvalidField { field: "type", expected: "string" });
            },
        };

        match kind {
            InboundKind::InitialState => {
                Ok(Self::InitialState { state: required_state(&mut fields)? })
            },
            InboundKind::StateUpdate => {
                Ok(Self::StateUpdate { state: required_state(&mut fields)? })
            },
            InboundKind::ActionResult => {
                let state = required_state(&mut fields)?;
                let failure = optional_string(&mut fields, "error")?;
                let success = optional_string(&mut fields, "success")?;
                let outcome = match (failure, success) {
                    (Some(message), _) => Some(ActionOutcome::Failure(message)),
                    (None, Some(message)) => Some(ActionOutcome::Success(message)),
                    (None, None) => None,
                };
                Ok(Self::ActionResult { state, outcome })
            },
            InboundKind::Error => {
                let message = optional_string(&mut fields, "error")?
                    .ok_or(ProtocolError::MissingField("error"))?;
                let state = optional_state(&mut fields)?;
                Ok(Self::Error { message, state })
            },
        }
    }

    /// Encode as a text frame. Used by authorities and test fixtures.
    pub fn encode(&self) -> Result<String> {
        let value = match self {
            Self::InitialState { state } | Self::StateUpdate { state } => {
                json!({ "type": self.kind().as_str(), "state": state })
            },
            Self::ActionResult { state, outcome } => {
                let mut value = json!({ "type": self.kind().as_str(), "state": state });
                if let (Some(outcome), Value::Object(fields)) = (outcome, &mut value) {
                    let (key, text) = match outcome {
                        ActionOutcome::Success(text) => ("success", text),
                        ActionOutcome::Failure(text) => ("error", text),
                    };
                    fields.insert(key.to_string(), Value::from(text.as_str()));
                }
                value
            },
            Self::Error { message, state } => match state {
                Some(state) => json!({ "type": "error", "error": message, "state": state }),
                None => json!({ "type": "error", "error": message }),
            },
        };
        Ok(serde_json::to_string(&value)?)
    }

    /// Discriminant of this message.
    pub fn kind(&self) -> InboundKind {
        match self {
            Self::InitialState { .. } => InboundKind::InitialState,
            Self::StateUpdate { .. } => InboundKind::StateUpdate,
            Self::ActionResult { .. } => InboundKind::ActionResult,
            Self::Error { .. } => InboundKind::Error,
        }
    }

    /// Snapshot carried by this message, if any.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Self::InitialState { state }
            | Self::StateUpdate { state }
            | Self::ActionResult { state, .. } => Some(state),
            Self::Error { state, .. } => state.as_ref(),
        }
    }
}

fn required_state(fields: &mut Map<String, Value>) -> Result<Snapshot> {
    optional_state(fields)?.ok_or(ProtocolError::MissingField("state"))
}

fn optional_state(fields: &mut Map<String, Value>) -> Result<Option<Snapshot>> {
    match fields.remove("state") {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Object(_)) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ProtocolError::InvalidSnapshot(e.to_string())),
        Some(_) => Err(ProtocolError::InvalidField { field: "state", expected: "object" }),
    }
}

fn optional_string(fields: &mut Map<String, Value>, field: &'static str) -> Result<Option<String>> {
    match fields.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(_) => Err(ProtocolError::InvalidField { field, expected: "string" }),
    }
}
