use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use crate::db::{Database, invalid_column};
use crate::models::{NewTask, Task, TaskPatch, TaskScope, TaskStatus};

const SELECT_COLUMNS: &str = "t.id, t.task, t.completed, t.status, t.project_id, t.user_id, t.created_at";

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let status_str: String = row.get("status")?;
    let status: TaskStatus = status_str.parse().map_err(|e| invalid_column(3, e))?;

    Ok(Task {
        id: row.get("id")?,
        task: row.get("task")?,
        completed: row.get("completed")?,
        status,
        project_id: row.get("project_id")?,
        user_id: row.get("user_id")?,
        created_at: row.get("created_at")?,
    })
}

pub fn create_task(db: &Database, user_id: &str, input: NewTask) -> Result<Task> {
    db.conn()
        .execute(
            "INSERT INTO todos (task, completed, project_id, user_id) VALUES (?1, 0, ?2, ?3)",
            params![input.task, input.project_id, user_id],
        )
        .context("failed to insert task (check that project_id is valid)")?;

    let id = db.conn().last_insert_rowid();
    get_task(db, id)?.context("task not found after insert")
}

pub fn get_task(db: &Database, id: i64) -> Result<Option<Task>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM todos t WHERE t.id = ?1");
    db.conn()
        .prepare(&sql)?
        .query_row([id], row_to_task)
        .optional()
        .context("failed to query task")
}

/// Lists the tasks of a scope in insertion order.
pub fn list_tasks(db: &Database, user_id: &str, scope: &TaskScope) -> Result<Vec<Task>> {
    let base = format!("SELECT {SELECT_COLUMNS} FROM todos t");
    let tail = "ORDER BY t.id ASC";

    let (sql, param) = match scope {
        TaskScope::Project(pid) => (format!("{base} WHERE t.project_id = ?1 {tail}"), pid.as_str()),
        TaskScope::Personal => (
            format!("{base} WHERE t.project_id IS NULL AND t.user_id = ?1 {tail}"),
            user_id,
        ),
    };

    let mut stmt = db.conn().prepare(&sql)?;
    let rows = stmt.query_map([param], row_to_task)?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to list tasks")
}

/// Whether `user_id` may read and write the task: personal tasks belong to
/// their author, project tasks to anyone who can see the project.
pub fn is_accessible(db: &Database, user_id: &str, task_id: i64) -> Result<bool> {
    let count: i64 = db
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM todos t LEFT JOIN projects p ON p.id = t.project_id \
             WHERE t.id = ?2 AND ( \
                 (t.project_id IS NULL AND t.user_id = ?1) \
                 OR p.owner_id = ?1 \
                 OR EXISTS (SELECT 1 FROM team_members m WHERE m.project_id = t.project_id AND m.user_id = ?1))",
            params![user_id, task_id],
            |row| row.get(0),
        )
        .context("failed to check task access")?;
    Ok(count > 0)
}

pub fn update_task(db: &Database, id: i64, patch: TaskPatch) -> Result<Task> {
    if patch.is_empty() {
        return get_task(db, id)?.with_context(|| format!("task not found: {id}"));
    }

    let mut set_clauses: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    let mut bind = |column: &str, value: Box<dyn rusqlite::types::ToSql>| {
        params.push(value);
        set_clauses.push(format!("\"{column}\" = ?{}", params.len()));
    };

    if let Some(task) = patch.task {
        bind("task", Box::new(task));
    }
    if let Some(completed) = patch.completed {
        bind("completed", Box::new(completed));
    }
    if let Some(status) = patch.status {
        bind("status", Box::new(status.as_str().to_string()));
    }

    params.push(Box::new(id));

    let sql = format!(
        "UPDATE todos SET {} WHERE id = ?{}",
        set_clauses.join(", "),
        params.len(),
    );

    let rows_affected = db
        .conn()
        .execute(&sql, params_from_iter(params.iter()))
        .context("failed to update task")?;

    if rows_affected == 0 {
        anyhow::bail!("task not found: {id}");
    }

    get_task(db, id)?.context("task not found after update")
}

pub fn delete_task(db: &Database, id: i64) -> Result<bool> {
    let rows_affected = db
        .conn()
        .execute("DELETE FROM todos WHERE id = ?1", [id])
        .context("failed to delete task")?;

    Ok(rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::project::create_project;
    use crate::db::tests::{insert_user, open_temp_db};
    use crate::models::CreateProjectInput;

    fn create_test_project(db: &Database, owner_id: &str) -> String {
        create_project(
            db,
            CreateProjectInput {
                name: "Test Project".to_string(),
                owner_id: owner_id.to_string(),
            },
        )
        .unwrap()
        .id
    }

    fn new_task(text: &str, project_id: Option<&str>) -> NewTask {
        NewTask {
            task: text.to_string(),
            project_id: project_id.map(String::from),
        }
    }

    #[test]
    fn test_create_defaults() {
        let (db, _dir) = open_temp_db();
        let user = insert_user(&db, "a@example.com");
        let pid = create_test_project(&db, &user);

        let task = create_task(&db, &user, new_task("Buy milk", Some(&pid))).unwrap();

        assert!(task.id > 0);
        assert_eq!(task.task, "Buy milk");
        assert!(!task.completed);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.project_id.as_deref(), Some(pid.as_str()));
        assert_eq!(task.user_id, user);
    }

    #[test]
    fn test_create_with_invalid_project_fails() {
        let (db, _dir) = open_temp_db();
        let user = insert_user(&db, "a@example.com");
        let result = create_task(&db, &user, new_task("Orphan", Some("nonexistent")));
        assert!(result.is_err());
    }

    #[test]
    fn test_list_insertion_order_and_scope() {
        let (db, _dir) = open_temp_db();
        let user = insert_user(&db, "a@example.com");
        let p1 = create_test_project(&db, &user);
        let p2 = create_test_project(&db, &user);

        for text in ["first", "second", "third"] {
            create_task(&db, &user, new_task(text, Some(&p1))).unwrap();
        }
        create_task(&db, &user, new_task("elsewhere", Some(&p2))).unwrap();
        create_task(&db, &user, new_task("personal", None)).unwrap();

        let texts: Vec<String> = list_tasks(&db, &user, &TaskScope::Project(p1))
            .unwrap()
            .into_iter()
            .map(|t| t.task)
            .collect();
        assert_eq!(texts, ["first", "second", "third"]);

        let personal = list_tasks(&db, &user, &TaskScope::Personal).unwrap();
        assert_eq!(personal.len(), 1);
        assert_eq!(personal[0].task, "personal");
    }

    #[test]
    fn test_personal_scope_is_per_user() {
        let (db, _dir) = open_temp_db();
        let a = insert_user(&db, "a@example.com");
        let b = insert_user(&db, "b@example.com");
        create_task(&db, &a, new_task("mine", None)).unwrap();

        assert!(list_tasks(&db, &b, &TaskScope::Personal).unwrap().is_empty());
    }

    #[test]
    fn test_update_single_field() {
        let (db, _dir) = open_temp_db();
        let user = insert_user(&db, "a@example.com");
        let task = create_task(&db, &user, new_task("Original", None)).unwrap();

        let updated = update_task(
            &db,
            task.id,
            TaskPatch {
                status: Some(TaskStatus::Done),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.task, "Original");
        assert!(!updated.completed);
    }

    #[test]
    fn test_update_nonexistent_errors() {
        let (db, _dir) = open_temp_db();
        let result = update_task(
            &db,
            999,
            TaskPatch {
                completed: Some(true),
                ..Default::default()
            },
        );
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("task not found"));
    }

    #[test]
    fn test_access_rules() {
        let (db, _dir) = open_temp_db();
        let owner = insert_user(&db, "owner@example.com");
        let stranger = insert_user(&db, "stranger@example.com");
        let pid = create_test_project(&db, &owner);

        let shared = create_task(&db, &owner, new_task("project", Some(&pid))).unwrap();
        let personal = create_task(&db, &owner, new_task("personal", None)).unwrap();

        assert!(is_accessible(&db, &owner, shared.id).unwrap());
        assert!(is_accessible(&db, &owner, personal.id).unwrap());
        assert!(!is_accessible(&db, &stranger, shared.id).unwrap());
        assert!(!is_accessible(&db, &stranger, personal.id).unwrap());
        assert!(!is_accessible(&db, &owner, 999).unwrap());
    }

    #[test]
    fn test_delete() {
        let (db, _dir) = open_temp_db();
        let user = insert_user(&db, "a@example.com");
        let task = create_task(&db, &user, new_task("Gone", None)).unwrap();

        assert!(delete_task(&db, task.id).unwrap());
        assert!(get_task(&db, task.id).unwrap().is_none());
        assert!(!delete_task(&db, task.id).unwrap());
    }
}
