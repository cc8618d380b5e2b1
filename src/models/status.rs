use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Workflow status of a task. Each value is also a board lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Lanes in board order.
    pub const ALL: [TaskStatus; 3] = [Self::Todo, Self::InProgress, Self::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "inprogress",
            Self::Done => "done",
        }
    }

    /// Column heading shown on the board.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Position of the lane on the board, left to right.
    pub fn index(&self) -> usize {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Done => 2,
        }
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "inprogress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => anyhow::bail!("invalid task status: {other}"),
        }
    }
}
