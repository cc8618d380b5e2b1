use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, Row};

use crate::db::Database;
use crate::models::{CreateProjectInput, Project};

const SELECT_COLUMNS: &str = "p.id, p.name, p.owner_id, p.created_at";

/// Row policy shared by every project-scoped query: the user owns the project
/// or holds a membership in it. Expects the user id bound as `?1`.
const VISIBLE_TO_USER: &str = "(p.owner_id = ?1 OR EXISTS (\
    SELECT 1 FROM team_members m WHERE m.project_id = p.id AND m.user_id = ?1))";

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        owner_id: row.get("owner_id")?,
        created_at: row.get("created_at")?,
    })
}

pub fn create_project(db: &Database, input: CreateProjectInput) -> Result<Project> {
    let id = ulid::Ulid::new().to_string();
    db.conn()
        .execute(
            "INSERT INTO projects (id, name, owner_id) VALUES (?1, ?2, ?3)",
            [&id, &input.name, &input.owner_id],
        )
        .context("failed to insert project (check that owner_id is valid)")?;

    get_project(db, &id)?.context("project not found after insert")
}

pub fn get_project(db: &Database, id: &str) -> Result<Option<Project>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM projects p WHERE p.id = ?1");
    let project = db
        .conn()
        .prepare(&sql)?
        .query_row([id], row_to_project)
        .optional()
        .context("failed to query project")?;

    Ok(project)
}

/// Fetches a project only if `user_id` may see it.
pub fn get_visible_project(db: &Database, user_id: &str, id: &str) -> Result<Option<Project>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM projects p WHERE {VISIBLE_TO_USER} AND p.id = ?2");
    db.conn()
        .prepare(&sql)?
        .query_row([user_id, id], row_to_project)
        .optional()
        .context("failed to query project")
}

/// Lists projects owned by or shared with `user_id`, newest first.
pub fn list_visible_projects(db: &Database, user_id: &str) -> Result<Vec<Project>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM projects p WHERE {VISIBLE_TO_USER} \
         ORDER BY p.created_at DESC, p.rowid DESC"
    );

    let mut stmt = db.conn().prepare(&sql)?;
    let rows = stmt.query_map([user_id], row_to_project)?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to list projects")
}

pub fn is_visible(db: &Database, user_id: &str, project_id: &str) -> Result<bool> {
    Ok(get_visible_project(db, user_id, project_id)?.is_some())
}

pub fn rename_project(db: &Database, id: &str, name: &str) -> Result<Project> {
    let rows_affected = db
        .conn()
        .execute("UPDATE projects SET name = ?1 WHERE id = ?2", [name, id])
        .context("failed to update project")?;

    if rows_affected == 0 {
        anyhow::bail!("project not found: {id}");
    }

    get_project(db, id)?.context("project not found after update")
}

/// Deletes a project; tasks and memberships go with it via `ON DELETE CASCADE`.
pub fn delete_project(db: &Database, id: &str) -> Result<bool> {
    let rows_affected = db
        .conn()
        .execute("DELETE FROM projects WHERE id = ?1", [id])
        .context("failed to delete project")?;

    Ok(rows_affected > 0)
}
