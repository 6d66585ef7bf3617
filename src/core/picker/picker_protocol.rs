// Wire protocol between this page and the hosted picker.
//
// Window level (popup -> opener, via postMessage):
//   { type: "initialize", channelId }           + a MessagePort
//
// Port level (over the MessageChannel):
//   picker -> opener   { type: "notification", ... }
//                      { type: "command", id, data: { command, ... } }
//   opener -> picker   { type: "activate" }
//                      { type: "acknowledge", id }
//                      { type: "result", id, data: { result, ... } }
//
// Message ids are echoed back verbatim, so they stay as raw JSON values.

use crate::core::folders::FolderDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// WINDOW LEVEL
// ============================================================================

#[derive(Debug, Deserialize)]
struct WindowEnvelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(rename = "channelId", default)]
    channel_id: Option<String>,
}

/// Channel id of an `initialize` handshake, if `data` is one.
pub fn handshake_channel_id(data: &Value) -> Option<String> {
    let envelope = WindowEnvelope::deserialize(data).ok()?;
    match envelope.kind.as_deref() {
        Some("initialize") => envelope.channel_id,
        _ => None,
    }
}

// ============================================================================
// PORT LEVEL: INBOUND
// ============================================================================

#[derive(Debug, Deserialize)]
struct PortEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Value,
    #[serde(default)]
    data: Value,
}

/// A message the picker sent over the port.
#[derive(Debug, Clone, PartialEq)]
pub enum PortInbound {
    Notification,
    Command { id: Value, command: PickerCommand },
    /// Any message type we do not handle.
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickerCommand {
    Authenticate,
    Pick { items: Vec<Value> },
    Close,
    Unsupported(String),
}

impl PickerCommand {
    /// Every `command` message maps to some command so it can be acknowledged.
    /// A missing or non-string name is unsupported; unusable `items` are empty.
    fn from_data(data: &Value) -> Self {
        match data.get("command") {
            Some(Value::String(name)) => match name.as_str() {
                "authenticate" => PickerCommand::Authenticate,
                "pick" => PickerCommand::Pick {
                    items: data
                        .get("items")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default(),
                },
                "close" => PickerCommand::Close,
                other => PickerCommand::Unsupported(other.to_string()),
            },
            Some(Value::Null) | None => PickerCommand::Unsupported(String::new()),
            Some(other) => PickerCommand::Unsupported(other.to_string()),
        }
    }
}

impl PortInbound {
    pub fn parse(value: &Value) -> Result<Self, serde_json::Error> {
        let envelope = PortEnvelope::deserialize(value)?;

        match envelope.kind.as_str() {
            "notification" => Ok(PortInbound::Notification),
            "command" => Ok(PortInbound::Command {
                id: envelope.id,
                command: PickerCommand::from_data(&envelope.data),
            }),
            other => Ok(PortInbound::Other(other.to_string())),
        }
    }
}

/// An item in a `pick` command. The picker has used both camelCase and
/// snake_case spellings over time, so both are accepted. Fields are read
/// leniently: ids may arrive as numbers and odd types are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickedItem {
    pub id: Option<String>,
    pub name: Option<String>,
    pub drive_id: Option<String>,
    pub parent_path: Option<String>,
    pub site_url: Option<String>,
    pub web_url: Option<String>,
}

/// First non-empty string (or number) among `keys`.
fn text_field(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl PickedItem {
    /// First selection of a `pick` command. Only a missing, `null` or
    /// non-object first entry counts as no selection.
    pub fn first_of(items: &[Value]) -> Option<Self> {
        let first = items.first().filter(|item| item.is_object())?;

        let parent = ["parentReference", "parent"]
            .iter()
            .find_map(|key| first.get(*key).filter(|p| p.is_object()))
            .cloned()
            .unwrap_or(Value::Null);
        let site_url = parent
            .get("sharepointIds")
            .and_then(|ids| text_field(ids, &["siteUrl"]));

        Some(PickedItem {
            id: text_field(first, &["id", "item_id"]),
            name: text_field(first, &["name"]),
            drive_id: text_field(&parent, &["driveId", "drive_id"]),
            parent_path: text_field(&parent, &["path"]),
            site_url,
            web_url: text_field(first, &["webUrl", "web_url"]),
        })
    }

    pub fn into_descriptor(self) -> FolderDescriptor {
        FolderDescriptor {
            drive_id: self.drive_id.unwrap_or_default(),
            item_id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            path: self.parent_path.or(self.site_url),
            web_url: self.web_url,
        }
    }
}

// ============================================================================
// PORT LEVEL: OUTBOUND
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PortOutbound {
    Activate,
    Acknowledge { id: Value },
    Result { id: Value, data: ResultData },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum ResultData {
    Success,
    Token { token: String },
    Error { error: ResultError },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultError {
    pub code: String,
    pub message: String,
    /// Tells the picker this failure is normal and needs no error UI.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_expected: bool,
}

impl PortOutbound {
    pub fn error(id: Value, code: &str, message: impl Into<String>, is_expected: bool) -> Self {
        PortOutbound::Result {
            id,
            data: ResultData::Error {
                error: ResultError {
                    code: code.to_string(),
                    message: message.into(),
                    is_expected,
                },
            },
        }
    }

    pub fn to_value(&self) -> Value {
        // Plain enums with string keys always serialize.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
