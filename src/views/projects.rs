use crate::backend::Backend;
use crate::models::Project;
use crate::views::report;

/// Projects owned by or shared with the signed-in user, newest first.
#[derive(Debug, Default)]
pub struct ProjectList {
    projects: Vec<Project>,
    notice: Option<String>,
}

impl ProjectList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub async fn load<B: Backend>(&mut self, backend: &B) {
        match backend.select_projects().await {
            Ok(projects) => self.projects = projects,
            Err(e) => report(&mut self.notice, "fetching projects", &e),
        }
    }

    pub async fn create<B: Backend>(&mut self, backend: &B, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        match backend.insert_project(name).await {
            Ok(project) => self.projects.insert(0, project),
            Err(e) => report(&mut self.notice, "creating project", &e),
        }
    }

    /// The shown name changes only once the store confirms.
    pub async fn rename<B: Backend>(&mut self, backend: &B, id: &str, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        match backend.rename_project(id, name).await {
            Ok(renamed) => {
                if let Some(p) = self.projects.iter_mut().find(|p| p.id == id) {
                    p.name = renamed.name;
                }
            }
            Err(e) => report(&mut self.notice, "updating project", &e),
        }
    }

    pub async fn delete<B: Backend>(&mut self, backend: &B, id: &str) {
        match backend.delete_project(id).await {
            Ok(()) => self.projects.retain(|p| p.id != id),
            Err(e) => report(&mut self.notice, "deleting project", &e),
        }
    }

    pub async fn sign_out<B: Backend>(&mut self, backend: &mut B) {
        match backend.sign_out().await {
            Ok(()) => self.projects.clear(),
            Err(e) => report(&mut self.notice, "signing out", &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{NewTask, NewTeamMember, TaskScope};
    use crate::views::testing::{Call, sign_in_as, test_backend};

    #[tokio::test]
    async fn test_create_prepends_newest() {
        let (mut backend, _dir) = test_backend();
        sign_in_as(&mut backend, "ada@example.com").await;
        let mut list = ProjectList::new();
        list.load(&backend).await;

        list.create(&backend, "First").await;
        list.create(&backend, "  Second ").await;
        list.create(&backend, "   ").await;

        let names: Vec<_> = list.projects().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Second", "First"]);

        let mut fresh = ProjectList::new();
        fresh.load(&backend).await;
        let names: Vec<_> = fresh.projects().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Second", "First"]);
    }

    #[tokio::test]
    async fn test_rename_applies_after_confirmation() {
        let (mut backend, _dir) = test_backend();
        sign_in_as(&mut backend, "ada@example.com").await;
        let mut list = ProjectList::new();
        list.create(&backend, "Draft").await;
        let id = list.projects()[0].id.clone();

        backend.fail("rename_project");
        list.rename(&backend, &id, "Final").await;
        assert_eq!(list.projects()[0].name, "Draft");
        assert!(list.take_notice().is_some());

        let (mut backend, _dir) = test_backend();
        sign_in_as(&mut backend, "ada@example.com").await;
        let mut list = ProjectList::new();
        list.create(&backend, "Draft").await;
        let id = list.projects()[0].id.clone();
        backend.clear_writes();

        list.rename(&backend, &id, " Final ").await;
        assert_eq!(list.projects()[0].name, "Final");
        assert_eq!(
            backend.writes(),
            vec![Call::RenameProject(id, "Final".to_string())]
        );
    }

    #[tokio::test]
    async fn test_delete_cascades_tasks() {
        let (mut backend, _dir) = test_backend();
        sign_in_as(&mut backend, "ada@example.com").await;
        let mut list = ProjectList::new();
        list.create(&backend, "Doomed").await;
        let id = list.projects()[0].id.clone();
        let task = backend
            .insert_task(NewTask {
                task: "x".to_string(),
                project_id: Some(id.clone()),
            })
            .await
            .unwrap();

        list.delete(&backend, &id).await;
        assert!(list.projects().is_empty());
        assert!(db::task::get_task(backend.database(), task.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_member_sees_neither_project_nor_tasks() {
        let (mut backend, _dir) = test_backend();
        let bob = sign_in_as(&mut backend, "bob@example.com").await;
        sign_in_as(&mut backend, "eve@example.com").await;
        let owner = sign_in_as(&mut backend, "ada@example.com").await;

        let shared = backend.insert_project("Shared").await.unwrap();
        backend.insert_project("Private").await.unwrap();
        backend
            .insert_task(NewTask {
                task: "secret".to_string(),
                project_id: Some(shared.id.clone()),
            })
            .await
            .unwrap();
        backend
            .insert_member(NewTeamMember {
                project_id: shared.id.clone(),
                user_id: bob.id,
                name: "Bob".to_string(),
                email: bob.email,
                added_by: owner.id,
            })
            .await
            .unwrap();

        sign_in_as(&mut backend, "bob@example.com").await;
        let mut list = ProjectList::new();
        list.load(&backend).await;
        let names: Vec<_> = list.projects().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Shared"]);

        sign_in_as(&mut backend, "eve@example.com").await;
        list.load(&backend).await;
        assert!(list.projects().is_empty());
        let tasks = backend
            .select_tasks(&TaskScope::Project(shared.id))
            .await
            .unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_clears_list() {
        let (mut backend, _dir) = test_backend();
        sign_in_as(&mut backend, "ada@example.com").await;
        let mut list = ProjectList::new();
        list.create(&backend, "Mine").await;

        list.sign_out(&mut backend).await;
        assert!(list.projects().is_empty());

        list.load(&backend).await;
        assert!(list.projects().is_empty());
        assert!(list.notice().unwrap().contains("not authenticated"));
    }
}
