use crate::backend::{Backend, BackendResult};
use crate::models::{NewTask, Task, TaskPatch, TaskScope, TaskStatus};
use crate::views::report;

/// Identity of a row in the list. Placeholders carry a client-side id until
/// the store confirms the insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowId {
    Temp(u64),
    Stored(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub id: RowId,
    pub task: String,
    pub completed: bool,
    pub status: TaskStatus,
    pub editing: bool,
}

impl From<Task> for TaskRow {
    fn from(task: Task) -> Self {
        Self {
            id: RowId::Stored(task.id),
            task: task.task,
            completed: task.completed,
            status: task.status,
            editing: false,
        }
    }
}

/// An insert that has been staged locally but not yet settled.
#[derive(Debug)]
pub struct PendingAdd {
    generation: u64,
    temp: RowId,
    text: String,
    project_id: Option<String>,
}

impl PendingAdd {
    /// Sends the insert. Does not touch the view, so the view may change
    /// (or close) while the request is in flight.
    pub async fn send<B: Backend>(&self, backend: &B) -> BackendResult<Task> {
        backend
            .insert_task(NewTask {
                task: self.text.clone(),
                project_id: self.project_id.clone(),
            })
            .await
    }
}

#[derive(Debug, Default)]
pub struct TaskList {
    scope: Option<TaskScope>,
    rows: Vec<TaskRow>,
    next_temp: u64,
    generation: u64,
    notice: Option<String>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(&self) -> Option<&TaskScope> {
        self.scope.as_ref()
    }

    pub fn rows(&self) -> &[TaskRow] {
        &self.rows
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    fn position(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id == id)
    }

    /// Replaces the rows with the scope's tasks in insertion order.
    pub async fn load<B: Backend>(&mut self, backend: &B, scope: TaskScope) {
        if self.scope.as_ref() != Some(&scope) {
            self.generation += 1;
            self.rows.clear();
        }
        self.scope = Some(scope.clone());

        match backend.select_tasks(&scope).await {
            Ok(tasks) => {
                self.rows = tasks.into_iter().map(TaskRow::from).collect();
                tracing::debug!(?scope, count = self.rows.len(), "task list loaded");
            }
            Err(e) => report(&mut self.notice, "fetching tasks", &e),
        }
    }

    /// Drops the rows; continuations started before this are discarded.
    pub fn close(&mut self) {
        self.generation += 1;
        self.scope = None;
        self.rows.clear();
    }

    /// Appends a placeholder row for `text` and returns the insert to send.
    /// Blank text stages nothing.
    pub fn stage_add(&mut self, text: &str) -> Option<PendingAdd> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let Some(scope) = &self.scope else {
            self.notice = Some("No task list is open.".to_string());
            return None;
        };

        self.next_temp += 1;
        let temp = RowId::Temp(self.next_temp);
        self.rows.push(TaskRow {
            id: temp,
            task: text.to_string(),
            completed: false,
            status: TaskStatus::Todo,
            editing: false,
        });

        Some(PendingAdd {
            generation: self.generation,
            temp,
            text: text.to_string(),
            project_id: scope.project_id().map(str::to_string),
        })
    }

    /// Swaps the placeholder for the stored row, or removes it when the
    /// insert failed.
    pub fn settle_add(&mut self, pending: PendingAdd, result: BackendResult<Task>) {
        if pending.generation != self.generation {
            tracing::debug!(
                text = %pending.text,
                started = pending.generation,
                current = self.generation,
                "dropping stale insert result"
            );
            return;
        }

        let slot = self.position(pending.temp);
        match (result, slot) {
            (Ok(task), Some(idx)) => self.rows[idx] = TaskRow::from(task),
            // A same-scope reload may already have fetched the stored row.
            (Ok(task), None) => {
                if self.position(RowId::Stored(task.id)).is_none() {
                    self.rows.push(TaskRow::from(task));
                }
            }
            (Err(e), slot) => {
                if let Some(idx) = slot {
                    self.rows.remove(idx);
                }
                report(&mut self.notice, "adding task", &e);
            }
        }
    }

    pub async fn add<B: Backend>(&mut self, backend: &B, text: &str) {
        if let Some(pending) = self.stage_add(text) {
            let result = pending.send(backend).await;
            self.settle_add(pending, result);
        }
    }

    pub async fn toggle<B: Backend>(&mut self, backend: &B, id: RowId) {
        let (RowId::Stored(task_id), Some(idx)) = (id, self.position(id)) else {
            return;
        };
        let patch = TaskPatch {
            completed: Some(!self.rows[idx].completed),
            ..Default::default()
        };
        match backend.update_task(task_id, patch).await {
            Ok(task) => {
                if let Some(idx) = self.position(id) {
                    self.rows[idx].completed = task.completed;
                }
            }
            Err(e) => report(&mut self.notice, "updating task", &e),
        }
    }

    /// Local only: flips the row in or out of editing mode.
    pub fn begin_edit(&mut self, id: RowId) {
        if let Some(idx) = self.position(id) {
            self.rows[idx].editing = !self.rows[idx].editing;
        }
    }

    pub async fn edit<B: Backend>(&mut self, backend: &B, id: RowId, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let RowId::Stored(task_id) = id else { return };
        if self.position(id).is_none() {
            return;
        }

        let patch = TaskPatch {
            task: Some(text.to_string()),
            ..Default::default()
        };
        match backend.update_task(task_id, patch).await {
            Ok(task) => {
                if let Some(idx) = self.position(id) {
                    let row = &mut self.rows[idx];
                    row.task = task.task;
                    row.editing = false;
                }
            }
            Err(e) => report(&mut self.notice, "editing task", &e),
        }
    }

    pub async fn delete<B: Backend>(&mut self, backend: &B, id: RowId) {
        let RowId::Stored(task_id) = id else { return };
        if self.position(id).is_none() {
            return;
        }
        match backend.delete_task(task_id).await {
            Ok(()) => self.rows.retain(|r| r.id != id),
            Err(e) => report(&mut self.notice, "deleting task", &e),
        }
    }
}
