//! Test collaborator: wraps a real [`Client`] over a temp database, records
//! every write it is asked to perform and can be told to fail chosen calls.

use std::cell::RefCell;
use std::collections::HashSet;

use chrono::Duration;
use tempfile::TempDir;

use crate::backend::{Backend, BackendError, BackendResult, Client};
use crate::db::Database;
use crate::models::{
    NewTask, NewTeamMember, Profile, Project, Session, Task, TaskPatch, TaskScope, TeamMember,
    User,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    InsertProject(String),
    RenameProject(String, String),
    DeleteProject(String),
    InsertTask(String),
    UpdateTask(i64, TaskPatch),
    DeleteTask(i64),
    InsertMember(String),
    DeleteMember(String),
}

pub(crate) struct Recording {
    inner: Client,
    calls: RefCell<Vec<Call>>,
    failing: RefCell<HashSet<&'static str>>,
}

impl Recording {
    pub(crate) fn writes(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub(crate) fn clear_writes(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Makes every later call of `op` fail after being recorded.
    pub(crate) fn fail(&self, op: &'static str) {
        self.failing.borrow_mut().insert(op);
    }

    pub(crate) fn database(&self) -> &Database {
        self.inner.database()
    }

    fn record(&self, op: &'static str, call: Call) -> BackendResult<()> {
        self.calls.borrow_mut().push(call);
        if self.failing.borrow().contains(op) {
            return Err(BackendError::Storage(anyhow::anyhow!("{op} unavailable")));
        }
        Ok(())
    }
}

pub(crate) fn test_backend() -> (Recording, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("test.db")).unwrap();
    db.migrate().unwrap();
    let backend = Recording {
        inner: Client::new(db, Duration::hours(1)),
        calls: RefCell::new(Vec::new()),
        failing: RefCell::new(HashSet::new()),
    };
    (backend, dir)
}

/// Signs `email` in, registering it first when needed.
pub(crate) async fn sign_in_as(backend: &mut Recording, email: &str) -> User {
    if crate::db::user::find_credentials(backend.database(), email)
        .unwrap()
        .is_none()
    {
        backend.sign_up(email, "secret123").await.unwrap();
    }
    backend
        .sign_in_with_password(email, "secret123")
        .await
        .unwrap()
        .user
}

impl Backend for Recording {
    async fn sign_up(&mut self, email: &str, password: &str) -> BackendResult<User> {
        self.inner.sign_up(email, password).await
    }

    async fn sign_in_with_password(&mut self, email: &str, password: &str) -> BackendResult<Session> {
        self.inner.sign_in_with_password(email, password).await
    }

    async fn sign_out(&mut self) -> BackendResult<()> {
        self.inner.sign_out().await
    }

    async fn get_session(&self) -> BackendResult<Option<Session>> {
        self.inner.get_session().await
    }

    async fn get_user(&self) -> BackendResult<User> {
        self.inner.get_user().await
    }

    async fn reset_password_for_email(&self, email: &str) -> BackendResult<()> {
        self.inner.reset_password_for_email(email).await
    }

    async fn update_password_with_token(&self, token: &str, new_password: &str) -> BackendResult<()> {
        self.inner.update_password_with_token(token, new_password).await
    }

    async fn select_projects(&self) -> BackendResult<Vec<Project>> {
        self.inner.select_projects().await
    }

    async fn get_project(&self, id: &str) -> BackendResult<Project> {
        self.inner.get_project(id).await
    }

    async fn insert_project(&self, name: &str) -> BackendResult<Project> {
        self.record("insert_project", Call::InsertProject(name.to_string()))?;
        self.inner.insert_project(name).await
    }

    async fn rename_project(&self, id: &str, name: &str) -> BackendResult<Project> {
        self.record(
            "rename_project",
            Call::RenameProject(id.to_string(), name.to_string()),
        )?;
        self.inner.rename_project(id, name).await
    }

    async fn delete_project(&self, id: &str) -> BackendResult<()> {
        self.record("delete_project", Call::DeleteProject(id.to_string()))?;
        self.inner.delete_project(id).await
    }

    async fn select_tasks(&self, scope: &TaskScope) -> BackendResult<Vec<Task>> {
        self.inner.select_tasks(scope).await
    }

    async fn insert_task(&self, task: NewTask) -> BackendResult<Task> {
        self.record("insert_task", Call::InsertTask(task.task.clone()))?;
        self.inner.insert_task(task).await
    }

    async fn update_task(&self, id: i64, patch: TaskPatch) -> BackendResult<Task> {
        self.record("update_task", Call::UpdateTask(id, patch.clone()))?;
        self.inner.update_task(id, patch).await
    }

    async fn delete_task(&self, id: i64) -> BackendResult<()> {
        self.record("delete_task", Call::DeleteTask(id))?;
        self.inner.delete_task(id).await
    }

    async fn select_members(&self, project_id: &str) -> BackendResult<Vec<TeamMember>> {
        self.inner.select_members(project_id).await
    }

    async fn find_profile_by_email(&self, email: &str) -> BackendResult<Option<Profile>> {
        self.inner.find_profile_by_email(email).await
    }

    async fn insert_member(&self, member: NewTeamMember) -> BackendResult<TeamMember> {
        self.record("insert_member", Call::InsertMember(member.email.clone()))?;
        self.inner.insert_member(member).await
    }

    async fn delete_member(&self, id: &str) -> BackendResult<()> {
        self.record("delete_member", Call::DeleteMember(id.to_string()))?;
        self.inner.delete_member(id).await
    }
}
