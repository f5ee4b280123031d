use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{CreateTodoRequest, ListQuery, UpdateTodoRequest},
    repo::TodoStore,
    repo_types::{NewTodo, Todo, TodoFilter, TodoPatch, TodoPriority, TodoStatus},
};
use crate::error::{AppError, AppResult};

pub const TODO_NOT_FOUND: &str = "Todo not found";

fn non_blank(title: Option<String>) -> Option<String> {
    title.filter(|t| !t.trim().is_empty())
}

pub async fn create(
    todos: &dyn TodoStore,
    caller: Uuid,
    req: CreateTodoRequest,
) -> AppResult<Todo> {
    let Some(title) = non_blank(req.title) else {
        return Err(AppError::Validation("Title is required".into()));
    };
    let new_todo = NewTodo {
        title,
        description: req.description,
        priority: req.priority.unwrap_or_default(),
        due_date: req.due_date,
    };
    let todo = todos.create(caller, new_todo).await?;
    info!(user_id = %caller, todo_id = %todo.id, "todo created");
    Ok(todo)
}

pub fn parse_filter(query: ListQuery) -> AppResult<TodoFilter> {
    let status = query
        .status
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<TodoStatus>())
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let priority = query
        .priority
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<TodoPriority>())
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(TodoFilter { status, priority })
}

pub async fn list(todos: &dyn TodoStore, caller: Uuid, query: ListQuery) -> AppResult<Vec<Todo>> {
    let filter = parse_filter(query)?;
    Ok(todos.list(caller, filter).await?)
}

pub async fn get(todos: &dyn TodoStore, caller: Uuid, id: Uuid) -> AppResult<Todo> {
    todos
        .get(caller, id)
        .await?
        .ok_or(AppError::NotFound(TODO_NOT_FOUND))
}

pub fn into_patch(req: UpdateTodoRequest) -> AppResult<TodoPatch> {
    let title = match req.title {
        None => None,
        Some(t) => Some(
            non_blank(t).ok_or_else(|| AppError::Validation("Title cannot be empty".into()))?,
        ),
    };
    let status = match req.status {
        None => None,
        Some(s) => Some(s.ok_or_else(|| AppError::Validation("Status cannot be null".into()))?),
    };
    let priority = match req.priority {
        None => None,
        Some(p) => {
            Some(p.ok_or_else(|| AppError::Validation("Priority cannot be null".into()))?)
        }
    };
    Ok(TodoPatch {
        title,
        description: req.description,
        status,
        priority,
        due_date: req.due_date,
    })
}

pub async fn update(
    todos: &dyn TodoStore,
    caller: Uuid,
    id: Uuid,
    req: UpdateTodoRequest,
) -> AppResult<Todo> {
    let patch = into_patch(req)?;
    let Some(todo) = todos.update(caller, id, &patch).await? else {
        warn!(user_id = %caller, todo_id = %id, "update of missing or foreign todo");
        return Err(AppError::NotFound(TODO_NOT_FOUND));
    };
    Ok(todo)
}

pub async fn delete(todos: &dyn TodoStore, caller: Uuid, id: Uuid) -> AppResult<Uuid> {
    if !todos.delete(caller, id).await? {
        warn!(user_id = %caller, todo_id = %id, "delete of missing or foreign todo");
        return Err(AppError::NotFound(TODO_NOT_FOUND));
    }
    info!(user_id = %caller, todo_id = %id, "todo deleted");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todos::repo::MemoryTodoStore;
    use time::macros::date;

    fn titled(title: &str) -> CreateTodoRequest {
        CreateTodoRequest {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    fn list_all() -> ListQuery {
        ListQuery::default()
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let store = MemoryTodoStore::default();
        let ann = Uuid::new_v4();
        let todo = create(&store, ann, titled("Buy milk")).await.unwrap();
        assert_eq!(todo.title, "Buy milk");
        assert_eq!(todo.status, TodoStatus::Pending);
        assert_eq!(todo.priority, TodoPriority::Medium);
        assert_eq!(todo.user_id, ann);
    }

    #[tokio::test]
    async fn create_requires_title() {
        let store = MemoryTodoStore::default();
        for req in [CreateTodoRequest::default(), titled(""), titled("   ")] {
            let err = create(&store, Uuid::new_v4(), req).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = MemoryTodoStore::default();
        let ann = Uuid::new_v4();
        let req = CreateTodoRequest {
            title: Some("File taxes".into()),
            description: Some("before the deadline".into()),
            priority: Some(TodoPriority::High),
            due_date: Some(date!(2026 - 12 - 31)),
        };
        let created = create(&store, ann, req).await.unwrap();
        let fetched = get(&store, ann, created.id).await.unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.description.as_deref(), Some("before the deadline"));
        assert_eq!(fetched.priority, TodoPriority::High);
        assert_eq!(fetched.due_date, Some(date!(2026 - 12 - 31)));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_filtered() {
        let store = MemoryTodoStore::default();
        let ann = Uuid::new_v4();
        let first = create(&store, ann, titled("first")).await.unwrap();
        let second = create(
            &store,
            ann,
            CreateTodoRequest {
                priority: Some(TodoPriority::High),
                ..titled("second")
            },
        )
        .await
        .unwrap();

        let all = list(&store, ann, list_all()).await.unwrap();
        let ids: Vec<Uuid> = all.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let high = list(
            &store,
            ann,
            ListQuery {
                priority: Some("high".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].id, second.id);

        let done = list(
            &store,
            ann,
            ListQuery {
                status: Some("completed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(done.is_empty());
    }

    #[test]
    fn filter_rejects_unknown_values_and_ignores_empty() {
        let err = parse_filter(ListQuery {
            status: Some("done".into()),
            priority: None,
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let filter = parse_filter(ListQuery {
            status: Some(String::new()),
            priority: Some(String::new()),
        })
        .unwrap();
        assert!(filter.status.is_none());
        assert!(filter.priority.is_none());
    }

    #[tokio::test]
    async fn other_users_cannot_see_or_touch_a_todo() {
        let store = MemoryTodoStore::default();
        let ann = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let todo = create(&store, ann, titled("Ann's task")).await.unwrap();

        assert!(list(&store, bob, list_all()).await.unwrap().is_empty());
        let filtered = ListQuery {
            status: Some("pending".into()),
            priority: Some("medium".into()),
        };
        assert!(list(&store, bob, filtered).await.unwrap().is_empty());

        let err = get(&store, bob, todo.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let hijack = UpdateTodoRequest {
            title: Some(Some("Hacked".into())),
            ..Default::default()
        };
        let err = update(&store, bob, todo.id, hijack).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = delete(&store, bob, todo.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let untouched = get(&store, ann, todo.id).await.unwrap();
        assert_eq!(untouched, todo);
    }

    #[tokio::test]
    async fn foreign_and_missing_ids_fail_identically() {
        let store = MemoryTodoStore::default();
        let ann = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let todo = create(&store, ann, titled("Ann's task")).await.unwrap();

        let foreign = get(&store, bob, todo.id).await.unwrap_err();
        let missing = get(&store, bob, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(foreign.to_string(), missing.to_string());
        assert_eq!(foreign.status(), missing.status());
    }

    #[tokio::test]
    async fn single_field_update_leaves_the_rest() {
        let store = MemoryTodoStore::default();
        let ann = Uuid::new_v4();
        let before = create(
            &store,
            ann,
            CreateTodoRequest {
                description: Some("semi-skimmed".into()),
                due_date: Some(date!(2026 - 10 - 19)),
                ..titled("Buy milk")
            },
        )
        .await
        .unwrap();

        let req = UpdateTodoRequest {
            status: Some(Some(TodoStatus::Completed)),
            ..Default::default()
        };
        let after = update(&store, ann, before.id, req).await.unwrap();
        assert_eq!(after.status, TodoStatus::Completed);
        assert_eq!(after.title, before.title);
        assert_eq!(after.description, before.description);
        assert_eq!(after.priority, before.priority);
        assert_eq!(after.due_date, before.due_date);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn update_can_clear_description() {
        let store = MemoryTodoStore::default();
        let ann = Uuid::new_v4();
        let todo = create(
            &store,
            ann,
            CreateTodoRequest {
                description: Some("old".into()),
                ..titled("Buy milk")
            },
        )
        .await
        .unwrap();
        let req = UpdateTodoRequest {
            description: Some(None),
            ..Default::default()
        };
        let after = update(&store, ann, todo.id, req).await.unwrap();
        assert_eq!(after.description, None);
        assert_eq!(after.title, "Buy milk");
    }

    #[test]
    fn patch_validation() {
        let blank = UpdateTodoRequest {
            title: Some(Some(" ".into())),
            ..Default::default()
        };
        assert!(matches!(into_patch(blank), Err(AppError::Validation(_))));

        let null_title = UpdateTodoRequest {
            title: Some(None),
            ..Default::default()
        };
        assert!(matches!(into_patch(null_title), Err(AppError::Validation(_))));

        let null_status = UpdateTodoRequest {
            status: Some(None),
            ..Default::default()
        };
        assert!(matches!(into_patch(null_status), Err(AppError::Validation(_))));

        let empty = into_patch(UpdateTodoRequest::default()).unwrap();
        assert_eq!(empty, TodoPatch::default());
    }

    #[tokio::test]
    async fn delete_is_permanent() {
        let store = MemoryTodoStore::default();
        let ann = Uuid::new_v4();
        let todo = create(&store, ann, titled("Buy milk")).await.unwrap();

        assert_eq!(delete(&store, ann, todo.id).await.unwrap(), todo.id);
        assert!(matches!(
            get(&store, ann, todo.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            delete(&store, ann, todo.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert_eq!(store.len(), 0);
    }
}
