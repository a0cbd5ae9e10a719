//! Hub message protocol.
//!
//! Every frame is one UTF-8 JSON object with a mandatory `type` field:
//! - Client → Hub: `ping`, `driver_location`, `order_created`
//! - Hub → Client: `pong`, `driver_location`, `new_order`, `error`
//!
//! Inbound frames are decoded exactly once into [`InboundMessage`]. Fields
//! other than `type` are opaque and travel verbatim in a [`Payload`].

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::foundation::{OrderId, Timestamp};

/// Opaque JSON fields carried by a message, minus its `type` tag.
pub type Payload = serde_json::Map<String, Value>;

/// Name of the discriminator field on every frame.
pub const TYPE_FIELD: &str = "type";

/// Text of the error reply for unrecognized message types.
pub const UNKNOWN_TYPE_MESSAGE: &str = "unknown type";

/// Keys under which an order identifier may appear, in lookup order.
const ORDER_ID_FIELDS: [&str; 2] = ["orderId", "order_id"];

// ============================================
// Client → Hub Messages
// ============================================

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Heartbeat request.
    Ping,

    /// Live position of the driver serving an order.
    DriverLocation(DriverLocation),

    /// A customer announcing a freshly placed order.
    OrderCreated(OrderPayload),

    /// Anything else: missing or non-string `type`, non-object JSON, or a
    /// tag the hub does not accept from clients.
    Unknown { type_tag: Option<String> },
}

/// Errors decoding an inbound frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    #[error("{0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl InboundMessage {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::InvalidJson` only when the text does not parse.
    /// Well-formed JSON that is not a recognized message decodes to
    /// `InboundMessage::Unknown`.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    /// Decodes one binary frame holding UTF-8 JSON.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::InvalidJson` when the bytes are not valid
    /// UTF-8 JSON.
    pub fn decode_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Ok(Self::from_value(value))
    }

    /// Classifies an already-parsed JSON value.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::Unknown { type_tag: None };
        };

        let type_tag = match fields.remove(TYPE_FIELD) {
            Some(Value::String(tag)) => tag,
            _ => return Self::Unknown { type_tag: None },
        };

        match type_tag.as_str() {
            "ping" => Self::Ping,
            "driver_location" => Self::DriverLocation(DriverLocation::from_fields(fields)),
            "order_created" => Self::OrderCreated(OrderPayload::from_fields(fields)),
            _ => Self::Unknown {
                type_tag: Some(type_tag),
            },
        }
    }

    /// Wire tag of the message, for logging.
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Ping => "ping",
            Self::DriverLocation(_) => "driver_location",
            Self::OrderCreated(_) => "order_created",
            Self::Unknown {
                type_tag: Some(tag),
            } => tag,
            Self::Unknown { type_tag: None } => "<none>",
        }
    }
}

/// Body of a `driver_location` frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverLocation {
    /// Target order; `None` makes the frame a no-op.
    pub order_id: Option<OrderId>,
    /// All fields (including `orderId`, `lat`, `lng`), forwarded as-is.
    pub payload: Payload,
}

impl DriverLocation {
    fn from_fields(payload: Payload) -> Self {
        let order_id = payload.get("orderId").and_then(OrderId::from_json);
        Self { order_id, payload }
    }
}

/// Fields of an order, as relayed to drivers.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPayload {
    /// Identifier found under `orderId` or `order_id`, if any.
    pub order_id: Option<OrderId>,
    /// All order fields, forwarded as-is.
    pub fields: Payload,
}

/// Errors validating an order document submitted to the admin endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderPayloadError {
    #[error("order body must be a JSON object")]
    NotAnObject,

    #[error("order body must include orderId or order_id")]
    MissingOrderId,
}

impl OrderPayload {
    /// Wraps order fields; a stray `type` key is discarded so the
    /// re-tagged frame carries exactly one discriminator.
    pub fn from_fields(mut fields: Payload) -> Self {
        fields.remove(TYPE_FIELD);
        let order_id = ORDER_ID_FIELDS
            .iter()
            .find_map(|key| fields.get(*key).and_then(OrderId::from_json));
        Self { order_id, fields }
    }

    /// Validates an order document posted by the order store.
    ///
    /// # Errors
    ///
    /// - `NotAnObject` if the body is not a JSON object
    /// - `MissingOrderId` if neither `orderId` nor `order_id` is usable
    pub fn from_document(value: Value) -> Result<Self, OrderPayloadError> {
        let Value::Object(fields) = value else {
            return Err(OrderPayloadError::NotAnObject);
        };
        let payload = Self::from_fields(fields);
        if payload.order_id.is_none() {
            return Err(OrderPayloadError::MissingOrderId);
        }
        Ok(payload)
    }
}

// ============================================
// Hub → Client Messages
// ============================================

/// All frames the hub sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Heartbeat response; `at` is Unix milliseconds.
    Pong { at: i64 },

    /// Relayed driver position.
    DriverLocation(Payload),

    /// New order announcement for drivers.
    NewOrder(Payload),

    /// Problem with the sender's last frame.
    Error { message: String },
}

impl OutboundMessage {
    /// Builds the heartbeat reply.
    pub fn pong(at: Timestamp) -> Self {
        Self::Pong {
            at: at.as_unix_millis(),
        }
    }

    /// Builds an error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Wire tag, for logging.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Pong { .. } => "pong",
            Self::DriverLocation(_) => "driver_location",
            Self::NewOrder(_) => "new_order",
            Self::Error { .. } => "error",
        }
    }

    /// Serializes to a JSON text frame.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("OutboundMessage serialization should not fail")
    }
}

impl From<DriverLocation> for OutboundMessage {
    fn from(location: DriverLocation) -> Self {
        Self::DriverLocation(location.payload)
    }
}

impl From<OrderPayload> for OutboundMessage {
    fn from(order: OrderPayload) -> Self {
        Self::NewOrder(order.fields)
    }
}
