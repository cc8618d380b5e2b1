use super::TaskStatus;

/// A task row as stored. `id` is store-issued and ascends in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: i64,
    pub task: String,
    pub completed: bool,
    pub status: TaskStatus,
    pub project_id: Option<String>,
    pub user_id: String,
    pub created_at: String,
}

/// Which collection of tasks a view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskScope {
    Project(String),
    /// The signed-in user's tasks that belong to no project.
    Personal,
}

impl TaskScope {
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::Project(id) => Some(id),
            Self::Personal => None,
        }
    }
}

pub struct NewTask {
    pub task: String,
    pub project_id: Option<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskPatch {
    pub task: Option<String>,
    pub completed: Option<bool>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.task.is_none() && self.completed.is_none() && self.status.is_none()
    }
}
