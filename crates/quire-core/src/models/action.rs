//! Action model
//!
//! An action is the unit of replication: one local mutation, described by a
//! type and a payload whose shape is versioned per type. Every payload shape
//! this build understands is a variant of [`ActionPayload`], so the reducer,
//! rewinder, and schema migrator all match over a closed set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::util::generate_uuid;

/// Kind of mutation an action describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AddNote,
    RemoveNote,
    EditNote,
    AddBook,
    RemoveBook,
}

impl ActionType {
    /// All action types, in log order of introduction
    pub const ALL: [Self; 5] = [
        Self::AddNote,
        Self::RemoveNote,
        Self::EditNote,
        Self::AddBook,
        Self::RemoveBook,
    ];

    /// Persisted name of the action type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddNote => "add_note",
            Self::RemoveNote => "remove_note",
            Self::EditNote => "edit_note",
            Self::AddBook => "add_book",
            Self::RemoveBook => "remove_book",
        }
    }

    /// Schema version newly recorded actions of this type are written with
    #[must_use]
    pub const fn current_schema(self) -> i64 {
        match self {
            Self::AddNote | Self::EditNote => 3,
            Self::RemoveNote | Self::AddBook | Self::RemoveBook => 2,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action_type| action_type.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown action type '{s}'")))
    }
}

/// A logged action as persisted and exchanged with the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub uuid: String,
    pub schema: i64,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub data: Value,
    pub timestamp: i64,
}

impl Action {
    /// Build a new action from a payload, stamped with a fresh identifier
    pub fn new(payload: &ActionPayload, timestamp: i64) -> Result<Self> {
        Ok(Self {
            uuid: generate_uuid(),
            schema: payload.schema(),
            action_type: payload.action_type(),
            data: payload.to_value()?,
            timestamp,
        })
    }

    /// Decode the payload according to this action's declared schema
    pub fn payload(&self) -> Result<ActionPayload> {
        ActionPayload::decode(self.action_type, self.schema, &self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBookDataV1 {
    pub book_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBookDataV2 {
    pub book_name: String,
    pub book_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveBookDataV1 {
    pub book_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveBookDataV2 {
    pub book_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNoteDataV2 {
    pub note_uuid: String,
    pub book_name: String,
    pub content: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNoteDataV3 {
    pub note_uuid: String,
    pub book_uuid: String,
    pub content: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveNoteDataV1 {
    pub note_uuid: String,
    pub book_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveNoteDataV2 {
    pub note_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditNoteDataV1 {
    pub note_uuid: String,
    pub from_book: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditNoteDataV2 {
    pub note_uuid: String,
    pub from_book: String,
    #[serde(default)]
    pub to_book: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
}

/// Sparse patch of a note; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditNoteDataV3 {
    pub note_uuid: String,
    #[serde(default)]
    pub book_uuid: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
}

/// Every `(type, schema)` payload shape this build can decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPayload {
    AddBookV1(AddBookDataV1),
    AddBookV2(AddBookDataV2),
    RemoveBookV1(RemoveBookDataV1),
    RemoveBookV2(RemoveBookDataV2),
    AddNoteV2(AddNoteDataV2),
    AddNoteV3(AddNoteDataV3),
    RemoveNoteV1(RemoveNoteDataV1),
    RemoveNoteV2(RemoveNoteDataV2),
    EditNoteV1(EditNoteDataV1),
    EditNoteV2(EditNoteDataV2),
    EditNoteV3(EditNoteDataV3),
}

impl ActionPayload {
    /// Decode raw payload data for the given type and schema.
    ///
    /// Fails with [`Error::UnsupportedSchema`] for any pair without a variant.
    pub fn decode(action_type: ActionType, schema: i64, data: &Value) -> Result<Self> {
        let data = data.clone();
        let payload = match (action_type, schema) {
            (ActionType::AddBook, 1) => Self::AddBookV1(serde_json::from_value(data)?),
            (ActionType::AddBook, 2) => Self::AddBookV2(serde_json::from_value(data)?),
            (ActionType::RemoveBook, 1) => Self::RemoveBookV1(serde_json::from_value(data)?),
            (ActionType::RemoveBook, 2) => Self::RemoveBookV2(serde_json::from_value(data)?),
            (ActionType::AddNote, 2) => Self::AddNoteV2(serde_json::from_value(data)?),
            (ActionType::AddNote, 3) => Self::AddNoteV3(serde_json::from_value(data)?),
            (ActionType::RemoveNote, 1) => Self::RemoveNoteV1(serde_json::from_value(data)?),
            (ActionType::RemoveNote, 2) => Self::RemoveNoteV2(serde_json::from_value(data)?),
            (ActionType::EditNote, 1) => Self::EditNoteV1(serde_json::from_value(data)?),
            (ActionType::EditNote, 2) => Self::EditNoteV2(serde_json::from_value(data)?),
            (ActionType::EditNote, 3) => Self::EditNoteV3(serde_json::from_value(data)?),
            (action_type, schema) => {
                return Err(Error::UnsupportedSchema {
                    action_type,
                    schema,
                })
            }
        };
        Ok(payload)
    }

    #[must_use]
    pub const fn action_type(&self) -> ActionType {
        match self {
            Self::AddBookV1(_) | Self::AddBookV2(_) => ActionType::AddBook,
            Self::RemoveBookV1(_) | Self::RemoveBookV2(_) => ActionType::RemoveBook,
            Self::AddNoteV2(_) | Self::AddNoteV3(_) => ActionType::AddNote,
            Self::RemoveNoteV1(_) | Self::RemoveNoteV2(_) => ActionType::RemoveNote,
            Self::EditNoteV1(_) | Self::EditNoteV2(_) | Self::EditNoteV3(_) => {
                ActionType::EditNote
            }
        }
    }

    #[must_use]
    pub const fn schema(&self) -> i64 {
        match self {
            Self::AddBookV1(_)
            | Self::RemoveBookV1(_)
            | Self::RemoveNoteV1(_)
            | Self::EditNoteV1(_) => 1,
            Self::AddBookV2(_)
            | Self::RemoveBookV2(_)
            | Self::AddNoteV2(_)
            | Self::RemoveNoteV2(_)
            | Self::EditNoteV2(_) => 2,
            Self::AddNoteV3(_) | Self::EditNoteV3(_) => 3,
        }
    }

    /// Whether this payload is already at its type's current schema
    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.schema() == self.action_type().current_schema()
    }

    /// Note this payload targets, if any
    #[must_use]
    pub fn note_uuid(&self) -> Option<&str> {
        match self {
            Self::AddNoteV2(AddNoteDataV2 { note_uuid, .. })
            | Self::AddNoteV3(AddNoteDataV3 { note_uuid, .. })
            | Self::RemoveNoteV1(RemoveNoteDataV1 { note_uuid, .. })
            | Self::RemoveNoteV2(RemoveNoteDataV2 { note_uuid })
            | Self::EditNoteV1(EditNoteDataV1 { note_uuid, .. })
            | Self::EditNoteV2(EditNoteDataV2 { note_uuid, .. })
            | Self::EditNoteV3(EditNoteDataV3 { note_uuid, .. }) => Some(note_uuid),
            Self::AddBookV1(_)
            | Self::AddBookV2(_)
            | Self::RemoveBookV1(_)
            | Self::RemoveBookV2(_) => None,
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        let value = match self {
            Self::AddBookV1(data) => serde_json::to_value(data)?,
            Self::AddBookV2(data) => serde_json::to_value(data)?,
            Self::RemoveBookV1(data) => serde_json::to_value(data)?,
            Self::RemoveBookV2(data) => serde_json::to_value(data)?,
            Self::AddNoteV2(data) => serde_json::to_value(data)?,
            Self::AddNoteV3(data) => serde_json::to_value(data)?,
            Self::RemoveNoteV1(data) => serde_json::to_value(data)?,
            Self::RemoveNoteV2(data) => serde_json::to_value(data)?,
            Self::EditNoteV1(data) => serde_json::to_value(data)?,
            Self::EditNoteV2(data) => serde_json::to_value(data)?,
            Self::EditNoteV3(data) => serde_json::to_value(data)?,
        };
        Ok(value)
    }
}
