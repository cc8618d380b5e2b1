use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, Row};

use crate::db::Database;
use crate::models::{NewTeamMember, TeamMember};

const SELECT_COLUMNS: &str = "id, project_id, user_id, name, email, added_by, created_at";

fn row_to_member(row: &Row) -> rusqlite::Result<TeamMember> {
    Ok(TeamMember {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        added_by: row.get("added_by")?,
        created_at: row.get("created_at")?,
    })
}

pub fn add_member(db: &Database, input: NewTeamMember) -> Result<TeamMember> {
    let id = ulid::Ulid::new().to_string();
    db.conn()
        .execute(
            "INSERT INTO team_members (id, project_id, user_id, name, email, added_by) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            [
                &id,
                &input.project_id,
                &input.user_id,
                &input.name,
                &input.email,
                &input.added_by,
            ],
        )
        .context("failed to insert team member")?;

    get_member(db, &id)?.context("team member not found after insert")
}

pub fn get_member(db: &Database, id: &str) -> Result<Option<TeamMember>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM team_members WHERE id = ?1");
    db.conn()
        .prepare(&sql)?
        .query_row([id], row_to_member)
        .optional()
        .context("failed to query team member")
}

/// Members of a project in the order they were added.
pub fn list_members(db: &Database, project_id: &str) -> Result<Vec<TeamMember>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM team_members WHERE project_id = ?1 ORDER BY created_at, rowid"
    );
    let mut stmt = db.conn().prepare(&sql)?;
    let rows = stmt.query_map([project_id], row_to_member)?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to list team members")
}

pub fn is_member(db: &Database, project_id: &str, user_id: &str) -> Result<bool> {
    let count: i64 = db
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM team_members WHERE project_id = ?1 AND user_id = ?2",
            [project_id, user_id],
            |row| row.get(0),
        )
        .context("failed to check team membership")?;
    Ok(count > 0)
}

pub fn remove_member(db: &Database, id: &str) -> Result<bool> {
    let rows_affected = db
        .conn()
        .execute("DELETE FROM team_members WHERE id = ?1", [id])
        .context("failed to delete team member")?;

    Ok(rows_affected > 0)
}
