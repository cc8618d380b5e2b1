use chrono::{Duration, Utc};

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::password::{
    generate_token, hash_password, is_valid_email, validate_password, verify_password,
};
use crate::backend::Backend;
use crate::db::{self, Database};
use crate::models::{
    CreateProjectInput, NewTask, NewTeamMember, Profile, Project, Session, Task, TaskPatch,
    TaskScope, TeamMember, User,
};

const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// SQLite-backed collaborator. Holds at most one session, like a browser SDK
/// instance; the row policies a hosted service would enforce are applied here.
pub struct Client {
    db: Database,
    session: Option<Session>,
    session_ttl: Duration,
}

impl Client {
    pub fn new(db: Database, session_ttl: Duration) -> Self {
        Self {
            db,
            session: None,
            session_ttl,
        }
    }

    /// Adopts a previously issued access token. Returns `false` and stays
    /// signed out when the token is unknown, revoked or expired.
    pub fn restore_session(&mut self, token: &str) -> anyhow::Result<bool> {
        let session = db::user::get_session(&self.db, token)?
            .filter(|s| !s.is_expired_at(Utc::now()));
        let restored = session.is_some();
        self.session = session;
        Ok(restored)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }

    #[cfg(test)]
    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// The signed-in user, re-checked against the session table so a sign-out
    /// elsewhere takes effect.
    fn current_user(&self) -> BackendResult<User> {
        let Some(held) = &self.session else {
            return Err(BackendError::NotAuthenticated);
        };
        let now = Utc::now();
        match db::user::get_session(&self.db, &held.access_token)? {
            Some(stored) if !stored.is_expired_at(now) => Ok(stored.user),
            _ => Err(BackendError::NotAuthenticated),
        }
    }

    fn require_visible_project(&self, user: &User, project_id: &str) -> BackendResult<()> {
        if db::project::is_visible(&self.db, &user.id, project_id)? {
            Ok(())
        } else {
            Err(BackendError::Forbidden(format!(
                "project {project_id} is not shared with {}",
                user.email
            )))
        }
    }
}

fn non_empty(value: &str, field: &str) -> BackendResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BackendError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

impl Backend for Client {
    async fn sign_up(&mut self, email: &str, password: &str) -> BackendResult<User> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(BackendError::InvalidInput(
                "Please enter a valid email address".to_string(),
            ));
        }
        validate_password(password)?;

        if db::user::find_credentials(&self.db, email)?.is_some() {
            return Err(BackendError::UserExists(email.to_lowercase()));
        }

        let hash = hash_password(password)?;
        let user = db::user::register_user(&self.db, email, &hash)?;

        tracing::info!(user_id = %user.id, email = %user.email, "user signed up");
        Ok(user)
    }

    async fn sign_in_with_password(&mut self, email: &str, password: &str) -> BackendResult<Session> {
        let Some(creds) = db::user::find_credentials(&self.db, email)? else {
            tracing::debug!(email, "sign-in for unknown email");
            return Err(BackendError::InvalidCredentials);
        };
        if !verify_password(password, &creds.password_hash)? {
            tracing::debug!(user_id = %creds.user.id, "sign-in with wrong password");
            return Err(BackendError::InvalidCredentials);
        }

        let token = generate_token();
        let expires_at = Utc::now() + self.session_ttl;
        db::user::create_session(&self.db, &token, &creds.user.id, expires_at)?;

        let session = Session {
            access_token: token,
            user: creds.user,
            expires_at,
        };
        tracing::info!(user_id = %session.user.id, %expires_at, "signed in");
        self.session = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&mut self) -> BackendResult<()> {
        if let Some(session) = self.session.take() {
            db::user::delete_session(&self.db, &session.access_token)?;
            tracing::info!(user_id = %session.user.id, "signed out");
        }
        Ok(())
    }

    async fn get_session(&self) -> BackendResult<Option<Session>> {
        match self.current_user() {
            Ok(_) => Ok(self.session.clone()),
            Err(BackendError::NotAuthenticated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_user(&self) -> BackendResult<User> {
        self.current_user()
    }

    async fn reset_password_for_email(&self, email: &str) -> BackendResult<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(BackendError::InvalidInput(
                "Please enter your email to reset password.".to_string(),
            ));
        }

        let Some(creds) = db::user::find_credentials(&self.db, email)? else {
            tracing::debug!(email, "password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        db::user::create_password_reset(&self.db, &token, &creds.user.id, expires_at)?;

        // Stand-in for the mail transport: the reset link goes to the log.
        tracing::info!(
            target: "taskboard::mail",
            to = %creds.user.email,
            %token,
            %expires_at,
            "password reset email dispatched"
        );
        Ok(())
    }

    async fn update_password_with_token(&self, token: &str, new_password: &str) -> BackendResult<()> {
        validate_password(new_password)?;
        let Some(user_id) = db::user::take_password_reset(&self.db, token, Utc::now())? else {
            return Err(BackendError::InvalidInput(
                "reset token is invalid or has expired".to_string(),
            ));
        };

        let hash = hash_password(new_password)?;
        db::user::update_password_hash(&self.db, &user_id, &hash)?;
        tracing::info!(%user_id, "password updated");
        Ok(())
    }

    async fn select_projects(&self) -> BackendResult<Vec<Project>> {
        let user = self.current_user()?;
        let projects = db::project::list_visible_projects(&self.db, &user.id)?;
        tracing::debug!(user_id = %user.id, count = projects.len(), "selected projects");
        Ok(projects)
    }

    async fn get_project(&self, id: &str) -> BackendResult<Project> {
        let user = self.current_user()?;
        db::project::get_visible_project(&self.db, &user.id, id)?
            .ok_or_else(|| BackendError::NotFound(format!("project {id}")))
    }

    async fn insert_project(&self, name: &str) -> BackendResult<Project> {
        let user = self.current_user()?;
        let name = non_empty(name, "project name")?;
        let project = db::project::create_project(
            &self.db,
            CreateProjectInput {
                name,
                owner_id: user.id,
            },
        )?;
        tracing::info!(project_id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    async fn rename_project(&self, id: &str, name: &str) -> BackendResult<Project> {
        let user = self.current_user()?;
        let name = non_empty(name, "project name")?;
        if !db::project::is_visible(&self.db, &user.id, id)? {
            return Err(BackendError::NotFound(format!("project {id}")));
        }
        let project = db::project::rename_project(&self.db, id, &name)?;
        tracing::info!(project_id = %id, name = %project.name, "project renamed");
        Ok(project)
    }

    async fn delete_project(&self, id: &str) -> BackendResult<()> {
        let user = self.current_user()?;
        let Some(project) = db::project::get_visible_project(&self.db, &user.id, id)? else {
            tracing::debug!(project_id = %id, "delete of missing or hidden project ignored");
            return Ok(());
        };
        if project.owner_id != user.id {
            return Err(BackendError::Forbidden(
                "only the project owner can delete it".to_string(),
            ));
        }
        db::project::delete_project(&self.db, id)?;
        tracing::info!(project_id = %id, "project deleted");
        Ok(())
    }

    async fn select_tasks(&self, scope: &TaskScope) -> BackendResult<Vec<Task>> {
        let user = self.current_user()?;
        if let TaskScope::Project(pid) = scope
            && !db::project::is_visible(&self.db, &user.id, pid)?
        {
            tracing::debug!(project_id = %pid, "tasks of hidden project filtered out");
            return Ok(Vec::new());
        }
        let tasks = db::task::list_tasks(&self.db, &user.id, scope)?;
        tracing::debug!(?scope, count = tasks.len(), "selected tasks");
        Ok(tasks)
    }

    async fn insert_task(&self, task: NewTask) -> BackendResult<Task> {
        let user = self.current_user()?;
        let text = non_empty(&task.task, "task")?;
        if let Some(pid) = &task.project_id {
            self.require_visible_project(&user, pid)?;
        }
        let created = db::task::create_task(
            &self.db,
            &user.id,
            NewTask {
                task: text,
                project_id: task.project_id,
            },
        )?;
        tracing::info!(task_id = created.id, project_id = ?created.project_id, "task inserted");
        Ok(created)
    }

    async fn update_task(&self, id: i64, patch: TaskPatch) -> BackendResult<Task> {
        let user = self.current_user()?;
        let patch = TaskPatch {
            task: patch.task.map(|t| non_empty(&t, "task")).transpose()?,
            ..patch
        };
        if !db::task::is_accessible(&self.db, &user.id, id)? {
            return Err(BackendError::NotFound(format!("task {id}")));
        }
        let updated = db::task::update_task(&self.db, id, patch)?;
        tracing::info!(task_id = id, status = %updated.status, completed = updated.completed, "task updated");
        Ok(updated)
    }

    async fn delete_task(&self, id: i64) -> BackendResult<()> {
        let user = self.current_user()?;
        if !db::task::is_accessible(&self.db, &user.id, id)? {
            tracing::debug!(task_id = id, "delete of missing or hidden task ignored");
            return Ok(());
        }
        db::task::delete_task(&self.db, id)?;
        tracing::info!(task_id = id, "task deleted");
        Ok(())
    }

    async fn select_members(&self, project_id: &str) -> BackendResult<Vec<TeamMember>> {
        let user = self.current_user()?;
        if !db::project::is_visible(&self.db, &user.id, project_id)? {
            return Ok(Vec::new());
        }
        Ok(db::member::list_members(&self.db, project_id)?)
    }

    async fn find_profile_by_email(&self, email: &str) -> BackendResult<Option<Profile>> {
        self.current_user()?;
        Ok(db::user::find_profile_by_email(&self.db, email)?)
    }

    async fn insert_member(&self, member: NewTeamMember) -> BackendResult<TeamMember> {
        let user = self.current_user()?;
        if member.added_by != user.id {
            return Err(BackendError::Forbidden(
                "added_by must be the signed-in user".to_string(),
            ));
        }
        self.require_visible_project(&user, &member.project_id)?;
        if db::member::is_member(&self.db, &member.project_id, &member.user_id)? {
            return Err(BackendError::Conflict(format!(
                "{} is already a member of this project",
                member.email
            )));
        }
        let created = db::member::add_member(&self.db, member)?;
        tracing::info!(
            project_id = %created.project_id,
            member = %created.email,
            "team member added"
        );
        Ok(created)
    }

    async fn delete_member(&self, id: &str) -> BackendResult<()> {
        let user = self.current_user()?;
        let Some(member) = db::member::get_member(&self.db, id)? else {
            return Ok(());
        };
        if !db::project::is_visible(&self.db, &user.id, &member.project_id)? {
            return Ok(());
        }
        db::member::remove_member(&self.db, id)?;
        tracing::info!(project_id = %member.project_id, member = %member.email, "team member removed");
        Ok(())
    }
}
