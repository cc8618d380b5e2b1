//! View state for the screens a user works with. Each view owns its rows and
//! a `notice` (the last failure, shown as an alert) and mutates them only
//! through [`Backend`](crate::backend::Backend) round trips.

pub mod board;
pub mod gate;
pub mod projects;
pub mod task_list;
pub mod team;

#[cfg(test)]
pub(crate) mod testing;

pub use board::{Board, LanePos, MoveOutcome};
pub use gate::{Access, AuthGate, LOGIN};
pub use projects::ProjectList;
pub use task_list::{PendingAdd, RowId, TaskList, TaskRow};
pub use team::{InviteRejected, TeamPanel};

use crate::backend::BackendError;

/// Logs a failed collaborator call and keeps it as the view's notice.
fn report(notice: &mut Option<String>, action: &str, err: &BackendError) {
    tracing::error!("error {action}: {err}");
    *notice = Some(format!("Error {action}: {err}"));
}
