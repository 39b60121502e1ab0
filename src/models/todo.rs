use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Represents a todo entity as stored in the database and returned by the API.
///
/// Serialized field names follow the wire contract:
/// `{ _id, title, completed, dueDate, user, createdAt }`.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Todo {
    /// Unique identifier for the todo (UUID v4).
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// The title of the todo.
    pub title: String,
    /// Whether the todo has been completed.
    pub completed: bool,
    /// Optional due date for the todo.
    #[serde(rename = "dueDate")]
    pub due_date: Option<DateTime<Utc>>,
    /// Identifier of the user who owns the todo. Set at creation, never reassigned.
    #[serde(rename = "user")]
    pub user_id: Uuid,
    /// Timestamp of when the todo was created. Server-assigned, immutable.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Input structure for creating a todo.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TodoInput {
    /// The title of the todo.
    /// Must be between 1 and 200 characters and not whitespace-only.
    #[validate(length(min = 1, max = 200), custom = "validate_title_not_blank")]
    pub title: String,

    /// Initial completion state. Defaults to false when omitted.
    pub completed: Option<bool>,

    /// Optional due date for the todo.
    #[serde(rename = "dueDate")]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update for a todo. Fields left unset are unchanged.
///
/// Only `title`, `completed`, and `dueDate` are patchable; owner and
/// identifier are immutable.
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct TodoPatch {
    #[validate(length(min = 1, max = 200), custom = "validate_title_not_blank")]
    pub title: Option<String>,

    pub completed: Option<bool>,

    /// `None` means the field was absent (keep the current date);
    /// `Some(None)` means an explicit JSON `null` (clear the date).
    #[serde(
        rename = "dueDate",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Wraps a present field in `Some`, so an explicit `null` deserializes to
/// `Some(None)` while an absent field falls back to the `default` of `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Rejects titles that are empty after trimming.
fn validate_title_not_blank(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::new("blank_title"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_input_validation() {
        let valid_input = TodoInput {
            title: "Water the plants".to_string(),
            completed: None,
            due_date: Some(Utc::now()),
        };
        assert!(valid_input.validate().is_ok());

        let empty_title = TodoInput {
            title: "".to_string(),
            completed: None,
            due_date: None,
        };
        assert!(empty_title.validate().is_err());

        // Whitespace-only titles must also fail, not just empty ones.
        let blank_title = TodoInput {
            title: "   \t ".to_string(),
            completed: None,
            due_date: None,
        };
        assert!(blank_title.validate().is_err());

        let long_title = TodoInput {
            title: "a".repeat(201),
            completed: None,
            due_date: None,
        };
        assert!(long_title.validate().is_err());
    }

    #[test]
    fn test_todo_patch_validation() {
        // An empty patch is a no-op, not an error.
        let empty_patch = TodoPatch::default();
        assert!(empty_patch.validate().is_ok());

        let blank_title_patch = TodoPatch {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank_title_patch.validate().is_err());

        let completed_only = TodoPatch {
            completed: Some(true),
            ..Default::default()
        };
        assert!(completed_only.validate().is_ok());
    }

    #[test]
    fn test_patch_null_due_date_differs_from_absent() {
        let clear: TodoPatch = serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        assert_eq!(clear.due_date, Some(None));

        let keep: TodoPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(keep.due_date, None);

        let set: TodoPatch = serde_json::from_str(r#"{"dueDate": "2026-09-01T18:00:00Z"}"#).unwrap();
        assert!(matches!(set.due_date, Some(Some(_))));
    }

    #[test]
    fn test_todo_wire_shape() {
        let todo = Todo {
            id: Uuid::new_v4(),
            title: "Pay rent".to_string(),
            completed: false,
            due_date: None,
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&todo).unwrap();
        assert!(json.get("_id").is_some());
        assert!(json.get("user").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json["dueDate"].is_null());
        assert!(json.get("user_id").is_none());
    }
}
