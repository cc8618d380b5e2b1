//! The backend collaborator: authentication plus table-scoped reads and
//! writes guarded by row policies. Views only ever talk to [`Backend`];
//! [`Client`] is the SQLite-backed implementation.

mod client;
pub mod error;
pub mod password;

pub use client::Client;
pub use error::{BackendError, BackendResult};

use crate::models::{
    NewTask, NewTeamMember, Profile, Project, Session, Task, TaskPatch, TaskScope, TeamMember,
    User,
};

/// Every call is one request/response round trip. Calls that need a signed-in
/// user fail with [`BackendError::NotAuthenticated`] otherwise. Reads are
/// filtered by row policy, so rows the user may not see simply do not appear.
#[allow(async_fn_in_trait)]
pub trait Backend {
    // ── auth ──────────────────────────────────────────────────────────

    /// Registers a user and writes their profile. Does not sign in.
    async fn sign_up(&mut self, email: &str, password: &str) -> BackendResult<User>;
    async fn sign_in_with_password(&mut self, email: &str, password: &str) -> BackendResult<Session>;
    async fn sign_out(&mut self) -> BackendResult<()>;
    /// The current session, if one is held and still valid.
    async fn get_session(&self) -> BackendResult<Option<Session>>;
    async fn get_user(&self) -> BackendResult<User>;
    /// Issues a reset token for the address. Unknown addresses succeed silently.
    async fn reset_password_for_email(&self, email: &str) -> BackendResult<()>;
    async fn update_password_with_token(&self, token: &str, new_password: &str) -> BackendResult<()>;

    // ── projects ──────────────────────────────────────────────────────

    /// Projects owned by or shared with the user, newest first.
    async fn select_projects(&self) -> BackendResult<Vec<Project>>;
    async fn get_project(&self, id: &str) -> BackendResult<Project>;
    async fn insert_project(&self, name: &str) -> BackendResult<Project>;
    async fn rename_project(&self, id: &str, name: &str) -> BackendResult<Project>;
    /// Owner only. Tasks and memberships are removed with the project.
    async fn delete_project(&self, id: &str) -> BackendResult<()>;

    // ── tasks ─────────────────────────────────────────────────────────

    /// Tasks of the scope in insertion order.
    async fn select_tasks(&self, scope: &TaskScope) -> BackendResult<Vec<Task>>;
    async fn insert_task(&self, task: NewTask) -> BackendResult<Task>;
    async fn update_task(&self, id: i64, patch: TaskPatch) -> BackendResult<Task>;
    /// Deleting a row that does not exist (or is not visible) is a no-op.
    async fn delete_task(&self, id: i64) -> BackendResult<()>;

    // ── team ──────────────────────────────────────────────────────────

    async fn select_members(&self, project_id: &str) -> BackendResult<Vec<TeamMember>>;
    async fn find_profile_by_email(&self, email: &str) -> BackendResult<Option<Profile>>;
    async fn insert_member(&self, member: NewTeamMember) -> BackendResult<TeamMember>;
    async fn delete_member(&self, id: &str) -> BackendResult<()>;
}
