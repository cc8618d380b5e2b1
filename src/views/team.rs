use crate::backend::{Backend, BackendError};
use crate::models::{NewTeamMember, Project, TeamMember};
use crate::views::report;

/// Why an invitation was turned down before (or by) the store.
#[derive(Debug, thiserror::Error)]
pub enum InviteRejected {
    #[error("Name and Email are required.")]
    MissingFields,
    #[error("Not authenticated.")]
    NotAuthenticated,
    #[error("You do not have permission to manage this team.")]
    NotAllowed,
    #[error("No user found with that email")]
    UnknownEmail,
    #[error("This user is already the project owner.")]
    AlreadyOwner,
    #[error("Member already exists in this project.")]
    Duplicate,
    #[error("Error adding member: {0}")]
    Backend(BackendError),
}

/// Members of one project plus the viewer's right to change them.
#[derive(Debug, Default)]
pub struct TeamPanel {
    project: Option<Project>,
    members: Vec<TeamMember>,
    can_manage: bool,
    notice: Option<String>,
}

impl TeamPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn members(&self) -> &[TeamMember] {
        &self.members
    }

    /// Owner or existing member. A client-side check only; the store's row
    /// policies still apply.
    pub fn can_manage(&self) -> bool {
        self.can_manage
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub async fn load<B: Backend>(&mut self, backend: &B, project_id: &str) {
        self.project = None;
        self.members.clear();
        self.can_manage = false;

        let viewer = match backend.get_user().await {
            Ok(user) => user,
            Err(e) => {
                report(&mut self.notice, "loading team", &e);
                return;
            }
        };
        let project = match backend.get_project(project_id).await {
            Ok(project) => project,
            Err(BackendError::NotFound(_)) => {
                tracing::warn!(project_id, "team view for unknown project");
                self.notice = Some("Project not found".to_string());
                return;
            }
            Err(e) => {
                report(&mut self.notice, "loading project", &e);
                return;
            }
        };
        match backend.select_members(project_id).await {
            Ok(members) => self.members = members,
            Err(e) => report(&mut self.notice, "fetching members", &e),
        }

        self.can_manage =
            project.owner_id == viewer.id || self.members.iter().any(|m| m.user_id == viewer.id);
        self.project = Some(project);
    }

    /// Invites a registered user by email. A rejection is also kept as the
    /// panel's notice.
    pub async fn add_member<B: Backend>(
        &mut self,
        backend: &B,
        name: &str,
        email: &str,
    ) -> Result<(), InviteRejected> {
        let result = self.try_add_member(backend, name.trim(), email.trim()).await;
        if let Err(e) = &result {
            tracing::warn!("invitation rejected: {e}");
            self.notice = Some(e.to_string());
        }
        result
    }

    async fn try_add_member<B: Backend>(
        &mut self,
        backend: &B,
        name: &str,
        email: &str,
    ) -> Result<(), InviteRejected> {
        if name.is_empty() || email.is_empty() {
            return Err(InviteRejected::MissingFields);
        }
        let viewer = match backend.get_user().await {
            Ok(user) => user,
            Err(BackendError::NotAuthenticated) => return Err(InviteRejected::NotAuthenticated),
            Err(e) => return Err(InviteRejected::Backend(e)),
        };
        let Some(project) = &self.project else {
            return Err(InviteRejected::NotAllowed);
        };
        if !self.can_manage {
            return Err(InviteRejected::NotAllowed);
        }

        let profile = backend
            .find_profile_by_email(email)
            .await
            .map_err(InviteRejected::Backend)?
            .ok_or(InviteRejected::UnknownEmail)?;
        if profile.id == viewer.id || profile.id == project.owner_id {
            return Err(InviteRejected::AlreadyOwner);
        }
        if self.members.iter().any(|m| m.user_id == profile.id) {
            return Err(InviteRejected::Duplicate);
        }

        let member = backend
            .insert_member(NewTeamMember {
                project_id: project.id.clone(),
                user_id: profile.id,
                name: name.to_string(),
                email: profile.email,
                added_by: viewer.id,
            })
            .await
            .map_err(|e| match e {
                BackendError::Conflict(_) => InviteRejected::Duplicate,
                other => InviteRejected::Backend(other),
            })?;
        self.members.push(member);
        Ok(())
    }

    pub async fn remove_member<B: Backend>(&mut self, backend: &B, member_id: &str) {
        if !self.can_manage {
            self.notice = Some(InviteRejected::NotAllowed.to_string());
            return;
        }
        match backend.delete_member(member_id).await {
            Ok(()) => self.members.retain(|m| m.id != member_id),
            Err(e) => report(&mut self.notice, "removing member", &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::testing::{Call, Recording, sign_in_as, test_backend};
    use tempfile::TempDir;

    /// Registers bob and carol, then leaves ada signed in as the owner of
    /// one project with the panel loaded.
    async fn owner_panel() -> (Recording, TempDir, TeamPanel, Project) {
        let (mut backend, dir) = test_backend();
        sign_in_as(&mut backend, "bob@example.com").await;
        sign_in_as(&mut backend, "carol@example.com").await;
        sign_in_as(&mut backend, "ada@example.com").await;
        let project = backend.insert_project("Launch").await.unwrap();
        backend.clear_writes();

        let mut panel = TeamPanel::new();
        panel.load(&backend, &project.id).await;
        (backend, dir, panel, project)
    }

    #[tokio::test]
    async fn test_owner_can_manage_and_invite() {
        let (backend, _dir, mut panel, _) = owner_panel().await;
        assert!(panel.can_manage());

        panel.add_member(&backend, " Bob ", "BOB@example.com").await.unwrap();
        assert_eq!(panel.members().len(), 1);
        assert_eq!(panel.members()[0].name, "Bob");
        assert_eq!(panel.members()[0].email, "bob@example.com");
        assert_eq!(backend.writes(), vec![Call::InsertMember("bob@example.com".to_string())]);
    }

    #[tokio::test]
    async fn test_rejections_issue_no_insert() {
        let (backend, _dir, mut panel, _) = owner_panel().await;
        panel.add_member(&backend, "Bob", "bob@example.com").await.unwrap();
        backend.clear_writes();

        assert!(matches!(
            panel.add_member(&backend, "", "bob@example.com").await,
            Err(InviteRejected::MissingFields)
        ));
        assert!(matches!(
            panel.add_member(&backend, "Nobody", "nobody@example.com").await,
            Err(InviteRejected::UnknownEmail)
        ));
        assert!(matches!(
            panel.add_member(&backend, "Me", "ada@example.com").await,
            Err(InviteRejected::AlreadyOwner)
        ));
        assert!(matches!(
            panel.add_member(&backend, "Bob again", "bob@example.com").await,
            Err(InviteRejected::Duplicate)
        ));
        assert_eq!(panel.notice(), Some("Member already exists in this project."));
        assert!(backend.writes().is_empty());
        assert_eq!(panel.members().len(), 1);
    }

    #[tokio::test]
    async fn test_outsider_cannot_manage() {
        let (mut backend, _dir, _, project) = owner_panel().await;
        sign_in_as(&mut backend, "carol@example.com").await;

        let mut panel = TeamPanel::new();
        panel.load(&backend, &project.id).await;
        assert!(!panel.can_manage());
        assert_eq!(panel.notice(), Some("Project not found"));

        assert!(matches!(
            panel.add_member(&backend, "Bob", "bob@example.com").await,
            Err(InviteRejected::NotAllowed)
        ));
        assert!(backend.writes().is_empty());
    }

    #[tokio::test]
    async fn test_member_can_manage() {
        let (mut backend, _dir, mut panel, project) = owner_panel().await;
        panel.add_member(&backend, "Bob", "bob@example.com").await.unwrap();

        sign_in_as(&mut backend, "bob@example.com").await;
        let mut panel = TeamPanel::new();
        panel.load(&backend, &project.id).await;
        assert!(panel.can_manage());

        panel.add_member(&backend, "Carol", "carol@example.com").await.unwrap();
        assert_eq!(panel.members().len(), 2);
        assert!(matches!(
            panel.add_member(&backend, "Ada", "ada@example.com").await,
            Err(InviteRejected::AlreadyOwner)
        ));
    }

    #[tokio::test]
    async fn test_add_requires_session() {
        let (mut backend, _dir, mut panel, _) = owner_panel().await;
        backend.sign_out().await.unwrap();
        assert!(matches!(
            panel.add_member(&backend, "Bob", "bob@example.com").await,
            Err(InviteRejected::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_remove_member() {
        let (backend, _dir, mut panel, project) = owner_panel().await;
        panel.add_member(&backend, "Bob", "bob@example.com").await.unwrap();
        let member_id = panel.members()[0].id.clone();

        panel.remove_member(&backend, &member_id).await;
        assert!(panel.members().is_empty());
        assert!(backend.select_members(&project.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_gated_by_can_manage() {
        let (mut backend, _dir, mut owner, project) = owner_panel().await;
        owner.add_member(&backend, "Bob", "bob@example.com").await.unwrap();
        let member_id = owner.members()[0].id.clone();
        backend.clear_writes();

        sign_in_as(&mut backend, "carol@example.com").await;
        let mut outsider = TeamPanel::new();
        outsider.load(&backend, &project.id).await;
        outsider.remove_member(&backend, &member_id).await;

        assert!(backend.writes().is_empty());
        assert!(outsider.notice().is_some());
    }
}
