use serde::{Deserialize, Deserializer, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo_types::{iso_date, TodoPriority, TodoStatus};

#[derive(Debug, Default, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TodoPriority>,
    #[serde(default, with = "iso_date::option")]
    pub due_date: Option<Date>,
}

/// Outer `Option` is "was the key sent at all", inner is the JSON value
/// (`null` → `None`).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub status: Option<Option<TodoStatus>>,
    #[serde(default, deserialize_with = "present")]
    pub priority: Option<Option<TodoPriority>>,
    #[serde(default, deserialize_with = "present_date")]
    pub due_date: Option<Option<Date>>,
}

fn present<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

fn present_date<'de, D>(de: D) -> Result<Option<Option<Date>>, D::Error>
where
    D: Deserializer<'de>,
{
    iso_date::option::deserialize(de).map(Some)
}

/// `?status=&priority=`; empty values count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedTodoResponse {
    pub message: &'static str,
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn update_request_distinguishes_absent_from_null() {
        let req: UpdateTodoRequest =
            serde_json::from_str(r#"{"description": null, "status": "completed"}"#).unwrap();
        assert_eq!(req.title, None);
        assert_eq!(req.description, Some(None));
        assert_eq!(req.status, Some(Some(TodoStatus::Completed)));
        assert_eq!(req.priority, None);
        assert_eq!(req.due_date, None);
    }

    #[test]
    fn update_request_parses_due_date() {
        let req: UpdateTodoRequest =
            serde_json::from_str(r#"{"due_date": "2026-11-01"}"#).unwrap();
        assert_eq!(req.due_date, Some(Some(date!(2026 - 11 - 01))));

        let req: UpdateTodoRequest = serde_json::from_str(r#"{"due_date": null}"#).unwrap();
        assert_eq!(req.due_date, Some(None));
    }

    #[test]
    fn create_request_defaults() {
        let req: CreateTodoRequest = serde_json::from_str(r#"{"title": "Buy milk"}"#).unwrap();
        assert_eq!(req.title.as_deref(), Some("Buy milk"));
        assert!(req.description.is_none());
        assert!(req.priority.is_none());
        assert!(req.due_date.is_none());
    }

    #[test]
    fn create_request_rejects_unknown_priority() {
        let res = serde_json::from_str::<CreateTodoRequest>(r#"{"title": "x", "priority": "urgent"}"#);
        assert!(res.is_err());
    }
}
