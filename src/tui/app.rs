use std::io::Stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::backend::Backend;
use crate::models::{Project, TaskScope, TaskStatus};
use crate::tui::ui;
use crate::views::{Board, LanePos, MoveOutcome, ProjectList, RowId, TaskList, TaskRow, TeamPanel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Projects,
    Tasks,
    Board,
    Team,
}

/// What the text prompt is collecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    NewProject,
    RenameProject(String),
    NewTask,
    EditTask(RowId),
    InviteName,
    InviteEmail { name: String },
}

impl Prompt {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NewProject => "New project",
            Self::RenameProject(_) => "Rename project",
            Self::NewTask => "New task",
            Self::EditTask(_) => "Edit task",
            Self::InviteName => "Member name",
            Self::InviteEmail { .. } => "Member email",
        }
    }
}

/// Footer message: the last failure or confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

impl Status {
    pub fn text(&self) -> &str {
        match self {
            Self::Info(s) | Self::Error(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing(Prompt),
    HelpOverlay,
}

pub struct App<'a, B: Backend> {
    backend: &'a mut B,
    pub running: bool,
    pub user_email: String,
    pub screen: Screen,
    pub mode: InputMode,
    pub input: String,
    pub status: Option<Status>,

    pub projects: ProjectList,
    pub selected_project_idx: usize,

    pub tasks: TaskList,
    pub selected_task_idx: usize,

    pub board: Board,
    pub cursor: LanePos,
    /// Card picked up for a keyboard drag.
    pub carrying: Option<LanePos>,

    pub team: TeamPanel,
    pub selected_member_idx: usize,
}

impl<'a, B: Backend> App<'a, B> {
    pub async fn new(backend: &'a mut B, user_email: String) -> Self {
        let mut app = Self {
            backend,
            running: true,
            user_email,
            screen: Screen::Projects,
            mode: InputMode::Normal,
            input: String::new(),
            status: None,
            projects: ProjectList::new(),
            selected_project_idx: 0,
            tasks: TaskList::new(),
            selected_task_idx: 0,
            board: Board::new(),
            cursor: LanePos::new(TaskStatus::Todo, 0),
            carrying: None,
            team: TeamPanel::new(),
            selected_member_idx: 0,
        };
        app.refresh_projects().await;
        app
    }

    pub async fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        while self.running {
            terminal.draw(|frame| ui::draw(frame, self))?;

            if event::poll(Duration::from_millis(100))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key).await;
            }
        }
        Ok(())
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.projects.projects().get(self.selected_project_idx)
    }

    pub fn selected_task(&self) -> Option<&TaskRow> {
        self.tasks.rows().get(self.selected_task_idx)
    }

    /// Heading for the task and board screens.
    pub fn scope_title(&self) -> String {
        let scope = match self.screen {
            Screen::Board => self.board.scope(),
            _ => self.tasks.scope(),
        };
        match scope {
            Some(TaskScope::Project(id)) => self
                .projects
                .projects()
                .iter()
                .find(|p| &p.id == id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "Project".to_string()),
            Some(TaskScope::Personal) | None => "Personal".to_string(),
        }
    }

    fn collect_notices(&mut self) {
        let notice = self
            .projects
            .take_notice()
            .or_else(|| self.tasks.take_notice())
            .or_else(|| self.board.take_notice())
            .or_else(|| self.team.take_notice());
        if let Some(notice) = notice {
            self.status = Some(Status::Error(notice));
        }
    }

    async fn refresh_projects(&mut self) {
        self.projects.load(&*self.backend).await;
        self.selected_project_idx = self
            .selected_project_idx
            .min(self.projects.projects().len().saturating_sub(1));
        self.collect_notices();
    }

    async fn open_tasks(&mut self, scope: TaskScope) {
        self.tasks.load(&*self.backend, scope).await;
        self.selected_task_idx = 0;
        self.screen = Screen::Tasks;
        self.collect_notices();
    }

    async fn open_board(&mut self, scope: TaskScope) {
        self.board.load(&*self.backend, scope).await;
        self.cursor = LanePos::new(TaskStatus::Todo, 0);
        self.carrying = None;
        self.screen = Screen::Board;
        self.collect_notices();
    }

    async fn open_team(&mut self, project_id: String) {
        self.team.load(&*self.backend, &project_id).await;
        self.selected_member_idx = 0;
        self.screen = Screen::Team;
        self.collect_notices();
    }

    fn selected_scope(&self) -> Option<TaskScope> {
        self.selected_project()
            .map(|p| TaskScope::Project(p.id.clone()))
    }

    fn back_to_projects(&mut self) {
        self.tasks.close();
        self.carrying = None;
        self.screen = Screen::Projects;
    }

    fn begin_prompt(&mut self, prompt: Prompt, initial: &str) {
        self.input = initial.to_string();
        self.mode = InputMode::Editing(prompt);
    }

    pub async fn handle_key(&mut self, key: KeyEvent) {
        match self.mode.clone() {
            InputMode::Normal => match self.screen {
                Screen::Projects => self.handle_projects_key(key).await,
                Screen::Tasks => self.handle_tasks_key(key).await,
                Screen::Board => self.handle_board_key(key).await,
                Screen::Team => self.handle_team_key(key).await,
            },
            InputMode::Editing(prompt) => self.handle_input_key(key, prompt).await,
            InputMode::HelpOverlay => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
                    self.mode = InputMode::Normal;
                }
            }
        }
    }

    async fn handle_projects_key(&mut self, key: KeyEvent) {
        let len = self.projects.projects().len();
        match key.code {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Char('?') => self.mode = InputMode::HelpOverlay,
            KeyCode::Char('j') | KeyCode::Down if len > 0 => {
                self.selected_project_idx = (self.selected_project_idx + 1) % len;
            }
            KeyCode::Char('k') | KeyCode::Up if len > 0 => {
                self.selected_project_idx = (self.selected_project_idx + len - 1) % len;
            }
            KeyCode::Char('n') => self.begin_prompt(Prompt::NewProject, ""),
            KeyCode::Char('r') => {
                if let Some(p) = self.selected_project() {
                    let (id, name) = (p.id.clone(), p.name.clone());
                    self.begin_prompt(Prompt::RenameProject(id), &name);
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_project().map(|p| p.id.clone()) {
                    self.projects.delete(&*self.backend, &id).await;
                    self.selected_project_idx =
                        self.selected_project_idx.min(self.projects.projects().len().saturating_sub(1));
                    self.collect_notices();
                }
            }
            KeyCode::Enter => {
                if let Some(scope) = self.selected_scope() {
                    self.open_tasks(scope).await;
                }
            }
            KeyCode::Char('b') => {
                if let Some(scope) = self.selected_scope() {
                    self.open_board(scope).await;
                }
            }
            KeyCode::Char('t') => {
                if let Some(id) = self.selected_project().map(|p| p.id.clone()) {
                    self.open_team(id).await;
                }
            }
            KeyCode::Char('P') => self.open_tasks(TaskScope::Personal).await,
            KeyCode::Char('B') => self.open_board(TaskScope::Personal).await,
            KeyCode::Char('g') => self.refresh_projects().await,
            KeyCode::Char('o') => {
                self.projects.sign_out(&mut *self.backend).await;
                self.collect_notices();
                self.running = false;
            }
            _ => {}
        }
    }

    async fn handle_tasks_key(&mut self, key: KeyEvent) {
        let len = self.tasks.rows().len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.back_to_projects(),
            KeyCode::Char('?') => self.mode = InputMode::HelpOverlay,
            KeyCode::Char('j') | KeyCode::Down if len > 0 => {
                self.selected_task_idx = (self.selected_task_idx + 1) % len;
            }
            KeyCode::Char('k') | KeyCode::Up if len > 0 => {
                self.selected_task_idx = (self.selected_task_idx + len - 1) % len;
            }
            KeyCode::Char('a') => self.begin_prompt(Prompt::NewTask, ""),
            KeyCode::Char(' ') => {
                if let Some(id) = self.selected_task().map(|r| r.id) {
                    self.tasks.toggle(&*self.backend, id).await;
                    self.collect_notices();
                }
            }
            KeyCode::Char('e') => {
                if let Some((id, text)) = self.selected_task().map(|r| (r.id, r.task.clone())) {
                    self.tasks.begin_edit(id);
                    self.begin_prompt(Prompt::EditTask(id), &text);
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_task().map(|r| r.id) {
                    self.tasks.delete(&*self.backend, id).await;
                    self.selected_task_idx =
                        self.selected_task_idx.min(self.tasks.rows().len().saturating_sub(1));
                    self.collect_notices();
                }
            }
            KeyCode::Char('b') => {
                if let Some(scope) = self.tasks.scope().cloned() {
                    self.tasks.close();
                    self.open_board(scope).await;
                }
            }
            _ => {}
        }
    }

    async fn handle_board_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc if self.carrying.is_some() => self.carrying = None,
            KeyCode::Esc | KeyCode::Char('q') => self.back_to_projects(),
            KeyCode::Char('?') => self.mode = InputMode::HelpOverlay,
            KeyCode::Char('h') | KeyCode::Left => self.move_cursor_lane(-1),
            KeyCode::Char('l') | KeyCode::Right => self.move_cursor_lane(1),
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor_card(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor_card(-1),
            KeyCode::Char(' ') | KeyCode::Enter => self.pick_or_drop().await,
            KeyCode::Char('t') => {
                if let Some(scope) = self.board.scope().cloned() {
                    self.open_tasks(scope).await;
                }
            }
            _ => {}
        }
    }

    /// Lane length the cursor may reach. While carrying, one past the end
    /// is a valid drop slot.
    fn cursor_limit(&self, lane: TaskStatus) -> usize {
        let len = self.board.lane(lane).len();
        match self.carrying {
            Some(src) if src.lane != lane => len,
            _ => len.saturating_sub(1),
        }
    }

    fn move_cursor_lane(&mut self, delta: isize) {
        let idx = self.cursor.lane.index() as isize + delta;
        if let Some(lane) = usize::try_from(idx).ok().and_then(TaskStatus::from_index) {
            let index = self.cursor.index.min(self.cursor_limit(lane));
            self.cursor = LanePos::new(lane, index);
        }
    }

    fn move_cursor_card(&mut self, delta: isize) {
        let limit = self.cursor_limit(self.cursor.lane) as isize;
        let index = (self.cursor.index as isize + delta).clamp(0, limit.max(0));
        self.cursor.index = index as usize;
    }

    async fn pick_or_drop(&mut self) {
        match self.carrying.take() {
            None => {
                if self.cursor.index < self.board.lane(self.cursor.lane).len() {
                    self.carrying = Some(self.cursor);
                }
            }
            Some(source) => {
                let outcome = self
                    .board
                    .move_task(&*self.backend, source, Some(self.cursor))
                    .await;
                if let MoveOutcome::Moved(task) = &outcome {
                    self.status = Some(Status::Info(format!(
                        "Moved \"{}\" to {}",
                        task.task,
                        task.status.title()
                    )));
                }
                let len = self.board.lane(self.cursor.lane).len();
                self.cursor.index = self.cursor.index.min(len.saturating_sub(1));
                self.collect_notices();
            }
        }
    }

    async fn handle_team_key(&mut self, key: KeyEvent) {
        let len = self.team.members().len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.back_to_projects(),
            KeyCode::Char('?') => self.mode = InputMode::HelpOverlay,
            KeyCode::Char('j') | KeyCode::Down if len > 0 => {
                self.selected_member_idx = (self.selected_member_idx + 1) % len;
            }
            KeyCode::Char('k') | KeyCode::Up if len > 0 => {
                self.selected_member_idx = (self.selected_member_idx + len - 1) % len;
            }
            KeyCode::Char('a') if self.team.can_manage() => {
                self.begin_prompt(Prompt::InviteName, "");
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.team.members().get(self.selected_member_idx).map(|m| m.id.clone()) {
                    self.team.remove_member(&*self.backend, &id).await;
                    self.selected_member_idx =
                        self.selected_member_idx.min(self.team.members().len().saturating_sub(1));
                    self.collect_notices();
                }
            }
            _ => {}
        }
    }

    async fn handle_input_key(&mut self, key: KeyEvent, prompt: Prompt) {
        match key.code {
            KeyCode::Esc => {
                if let Prompt::EditTask(id) = prompt {
                    self.tasks.begin_edit(id);
                }
                self.input.clear();
                self.mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::Enter => {
                let text = std::mem::take(&mut self.input);
                self.mode = InputMode::Normal;
                self.submit(prompt, text).await;
                self.collect_notices();
            }
            _ => {}
        }
    }

    async fn submit(&mut self, prompt: Prompt, text: String) {
        match prompt {
            Prompt::NewProject => {
                self.projects.create(&*self.backend, &text).await;
                self.selected_project_idx = 0;
            }
            Prompt::RenameProject(id) => self.projects.rename(&*self.backend, &id, &text).await,
            Prompt::NewTask => {
                self.tasks.add(&*self.backend, &text).await;
                self.selected_task_idx = self.tasks.rows().len().saturating_sub(1);
            }
            Prompt::EditTask(id) => {
                self.tasks.edit(&*self.backend, id, &text).await;
                if self.tasks.rows().iter().any(|r| r.id == id && r.editing) {
                    self.tasks.begin_edit(id);
                }
            }
            Prompt::InviteName => {
                if text.trim().is_empty() {
                    self.status = Some(Status::Error("Name and Email are required.".to_string()));
                } else {
                    self.begin_prompt(Prompt::InviteEmail { name: text }, "");
                }
            }
            Prompt::InviteEmail { name } => {
                if self.team.add_member(&*self.backend, &name, &text).await.is_ok() {
                    self.status = Some(Status::Info(format!("Added {name}")));
                }
            }
        }
    }
}
