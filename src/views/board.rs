use crate::backend::Backend;
use crate::models::{Task, TaskPatch, TaskScope, TaskStatus};
use crate::views::report;

/// A card position: lane plus index within the lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanePos {
    pub lane: TaskStatus,
    pub index: usize,
}

impl LanePos {
    pub fn new(lane: TaskStatus, index: usize) -> Self {
        Self { lane, index }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// No destination, same position, or nothing at the source.
    Ignored,
    /// Same-lane reorder. Order is not persisted.
    Reordered,
    /// Status change acknowledged by the store.
    Moved(Task),
    /// Status write failed; the previous layout is back.
    RolledBack,
}

/// Tasks of one scope grouped into the three status lanes.
#[derive(Debug, Default)]
pub struct Board {
    scope: Option<TaskScope>,
    lanes: [Vec<Task>; 3],
    notice: Option<String>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(&self) -> Option<&TaskScope> {
        self.scope.as_ref()
    }

    pub fn lane(&self, status: TaskStatus) -> &[Task] {
        &self.lanes[status.index()]
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// Where the card for `task_id` currently sits.
    pub fn find(&self, task_id: i64) -> Option<LanePos> {
        self.lanes.iter().enumerate().find_map(|(lane, cards)| {
            let index = cards.iter().position(|t| t.id == task_id)?;
            Some(LanePos::new(TaskStatus::from_index(lane)?, index))
        })
    }

    pub async fn load<B: Backend>(&mut self, backend: &B, scope: TaskScope) {
        match backend.select_tasks(&scope).await {
            Ok(tasks) => {
                let mut lanes: [Vec<Task>; 3] = Default::default();
                for task in tasks {
                    lanes[task.status.index()].push(task);
                }
                self.lanes = lanes;
                tracing::debug!(?scope, "board loaded");
            }
            Err(e) => {
                self.lanes = Default::default();
                report(&mut self.notice, "fetching tasks", &e);
            }
        }
        self.scope = Some(scope);
    }

    /// Moves a card. The lanes change immediately; a lane change then sends a
    /// single `status` update and restores the old layout if it fails.
    pub async fn move_task<B: Backend>(
        &mut self,
        backend: &B,
        source: LanePos,
        destination: Option<LanePos>,
    ) -> MoveOutcome {
        let Some(destination) = destination else {
            return MoveOutcome::Ignored;
        };
        if source == destination || source.index >= self.lane(source.lane).len() {
            return MoveOutcome::Ignored;
        }

        let snapshot = self.lanes.clone();
        let mut card = self.lanes[source.lane.index()].remove(source.index);
        let changed_lane = card.status != destination.lane;
        card.status = destination.lane;
        let task_id = card.id;

        let dst = &mut self.lanes[destination.lane.index()];
        let index = destination.index.min(dst.len());
        dst.insert(index, card);

        if !changed_lane {
            return MoveOutcome::Reordered;
        }

        let patch = TaskPatch {
            status: Some(destination.lane),
            ..Default::default()
        };
        match backend.update_task(task_id, patch).await {
            Ok(task) => {
                if let Some(pos) = self.find(task_id) {
                    self.lanes[pos.lane.index()][pos.index] = task.clone();
                }
                tracing::info!(task_id, to = %destination.lane, "card moved");
                MoveOutcome::Moved(task)
            }
            Err(e) => {
                self.lanes = snapshot;
                report(&mut self.notice, "updating task status", &e);
                MoveOutcome::RolledBack
            }
        }
    }
}
