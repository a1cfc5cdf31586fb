use crate::priority::Priority;
use crate::uri::Uri;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of message the attributes describe.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum MessageType {
    /// Not set.
    #[default]
    Unspecified,
    /// Published to a topic.
    Publish,
    /// Request to invoke a method.
    Request,
    /// Response to a request.
    Response,
    /// Notification sent to a single sink.
    Notification,
}

/// Metadata describing a message, transported next to (never inside) its payload.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Attributes {
    /// Unique, time-ordered identifier of the message.
    pub id: Uuid,

    /// Kind of message.
    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Priority of the message.
    pub priority: Priority,

    /// Time-to-live in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// Destination of the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink: Option<Uri>,

    /// Access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Identifier of the request a response answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reqid: Option<Uuid>,

    /// Communication status reported by the responder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commstatus: Option<i32>,
}

impl Attributes {
    /// Starts building request attributes with a freshly generated identifier.
    #[must_use]
    pub fn request(priority: Priority) -> AttributesBuilder {
        AttributesBuilder::new(Uuid::now_v7(), MessageType::Request, priority)
    }

    /// Starts building response attributes answering the request `reqid`.
    #[must_use]
    pub fn response(reqid: Uuid, priority: Priority) -> AttributesBuilder {
        AttributesBuilder::new(Uuid::now_v7(), MessageType::Response, priority).reqid(reqid)
    }
}

/// Builder for [`Attributes`].
#[derive(Clone, Debug)]
pub struct AttributesBuilder {
    attributes: Attributes,
}

impl AttributesBuilder {
    /// Creates a builder with the mandatory fields set.
    #[must_use]
    pub fn new(id: Uuid, message_type: MessageType, priority: Priority) -> Self {
        Self {
            attributes: Attributes {
                id,
                message_type,
                priority,
                ..Attributes::default()
            },
        }
    }

    /// Overrides the priority.
    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.attributes.priority = priority;
        self
    }

    /// Sets the time-to-live in milliseconds.
    #[must_use]
    pub fn ttl(mut self, ttl: u32) -> Self {
        self.attributes.ttl = Some(ttl);
        self
    }

    /// Sets the destination.
    #[must_use]
    pub fn sink(mut self, sink: Uri) -> Self {
        self.attributes.sink = Some(sink);
        self
    }

    /// Sets the access token.
    #[must_use]
    pub fn token<K>(mut self, token: K) -> Self
    where
        K: Into<String>,
    {
        self.attributes.token = Some(token.into());
        self
    }

    /// Sets the identifier of the request being answered.
    #[must_use]
    pub fn reqid(mut self, reqid: Uuid) -> Self {
        self.attributes.reqid = Some(reqid);
        self
    }

    /// Sets the communication status.
    #[must_use]
    pub fn commstatus(mut self, commstatus: i32) -> Self {
        self.attributes.commstatus = Some(commstatus);
        self
    }

    /// Finishes the attributes.
    #[must_use]
    pub fn build(self) -> Attributes {
        self.attributes
    }
}
