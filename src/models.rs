use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Authentication Schemas ---

/// Token
///
/// Response of the authentication endpoint (`POST /login/access-token`).
/// The `access_token` is an opaque bearer string; this client never inspects
/// or decodes it, it only stores and forwards it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Token {
    pub access_token: String,
    /// Always "bearer" for this API; kept for wire compatibility.
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// UserPublic
///
/// The authenticated user's profile as returned by `GET /users/me`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserPublic {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub full_name: Option<String>,
}

/// UserUpdateMe
///
/// Partial update payload for the current user's profile (`PATCH /users/me`).
/// `None` fields are omitted from the JSON body so the server only touches
/// the provided columns.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserUpdateMe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// UpdatePassword
///
/// Payload for `PATCH /users/me/password`. The current password is verified
/// server-side; neither value is persisted or logged by this client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePassword {
    pub current_password: String,
    pub new_password: String,
}

// --- Item Schemas ---

/// Item
///
/// A single item record as returned by the resource API.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    // FK to the owning user.
    pub owner_id: Uuid,
}

/// ItemCreate
///
/// Input payload for submitting a new item (`POST /items/`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ItemCreate {
    pub title: String,
    pub description: Option<String>,
}

/// ItemUpdate
///
/// Partial update payload for an existing item (`PUT /items/{id}`).
/// All fields are `Option<T>` with `skip_serializing_if` so only provided
/// fields appear in the request body.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// ItemsPage
///
/// Response of the item list endpoint (`GET /items/`): the page of records
/// plus the server-side total count.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ItemsPage {
    pub data: Vec<Item>,
    pub count: i64,
}

// --- Generic Response Schemas ---

/// Message
///
/// Plain acknowledgement body used by delete and password endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Message {
    pub message: String,
}

/// ValidationItem
///
/// One entry of a server validation failure (`{"detail": [...]}` on 422
/// responses). `loc` is a mixed path of strings and indices, e.g.
/// `["body", "title"]`; the last string segment names the offending field.
///
/// 'type' is a reserved keyword in Rust, so we rename it for internal use.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationItem {
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
    #[serde(rename = "type", default)]
    pub violation_type: String,
}

impl ValidationItem {
    /// Field name for form display: the last string segment of `loc` that is
    /// not a container marker ("body", "query", "path").
    pub fn field_name(&self) -> Option<String> {
        self.loc
            .iter()
            .rev()
            .find_map(|segment| segment.as_str())
            .filter(|name| !matches!(*name, "body" | "query" | "path"))
            .map(|name| name.to_string())
    }
}
