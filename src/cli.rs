use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use crate::backend::{Backend, Client};
use crate::db::Database;
use crate::models::{TaskScope, TaskStatus};
use crate::settings::{self, Settings};
use crate::views::{Access, AuthGate, Board, LanePos, MoveOutcome, ProjectList, RowId, TaskList, TeamPanel};

#[derive(Parser)]
#[command(name = "taskboard", version, about = "To-do lists and kanban boards, alone or as a team")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new account
    Signup {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in and remember the session
    Login {
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// End the current session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Send a password reset token to an email address
    ResetPassword { email: String },
    /// Set a new password using a reset token
    SetPassword {
        token: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Manage projects
    Projects {
        #[command(subcommand)]
        action: Option<ProjectAction>,
    },
    /// Manage the tasks of a project (or personal tasks)
    Tasks {
        #[command(flatten)]
        scope: ScopeArg,
        #[command(subcommand)]
        action: Option<TaskAction>,
    },
    /// Show or move cards on the status board
    Board {
        #[command(flatten)]
        scope: ScopeArg,
        #[command(subcommand)]
        action: Option<BoardAction>,
    },
    /// Manage the members of a project
    Team {
        #[arg(long)]
        project: String,
        #[command(subcommand)]
        action: Option<TeamAction>,
    },
    /// Launch the terminal UI
    Tui,
}

#[derive(Args)]
pub struct ScopeArg {
    /// Project id; personal tasks when omitted
    #[arg(long)]
    pub project: Option<String>,
}

impl ScopeArg {
    fn scope(&self) -> TaskScope {
        match &self.project {
            Some(id) => TaskScope::Project(id.clone()),
            None => TaskScope::Personal,
        }
    }
}

#[derive(Subcommand)]
pub enum ProjectAction {
    List,
    Create { name: String },
    Rename { id: String, name: String },
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum TaskAction {
    List,
    Add { text: String },
    Toggle { id: i64 },
    Edit { id: i64, text: String },
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum BoardAction {
    Show,
    /// Move a task to another lane (todo, inprogress, done)
    Move {
        id: i64,
        status: TaskStatus,
        /// Position in the destination lane; end of lane when omitted
        #[arg(long)]
        index: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum TeamAction {
    List,
    Add { name: String, email: String },
    Remove { member_id: String },
}

/// Everything a command needs: the config home and a client with the
/// persisted session restored.
pub struct Workspace {
    pub home: PathBuf,
    pub client: Client,
}

impl Workspace {
    pub fn open(home: PathBuf, settings: &Settings) -> Result<Self> {
        let db = Database::open(&settings.database_path(&home))?;
        db.migrate()?;
        let mut client = Client::new(db, settings.session_ttl());
        if let Some(token) = settings::load_session(&home)
            && !client.restore_session(&token)?
        {
            tracing::debug!("stored session is no longer valid");
            settings::clear_session(&home)?;
        }
        Ok(Self { home, client })
    }

    /// Fails with a login hint unless a session is live.
    async fn require_session(&self) -> Result<()> {
        match AuthGate::check(&self.client).await {
            Access::Granted(_) => Ok(()),
            Access::Redirect(_) => bail!("not signed in; run `taskboard login <email>`"),
        }
    }
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Turns a view notice into a command failure.
fn check(notice: Option<String>) -> Result<()> {
    match notice {
        Some(msg) => bail!(msg),
        None => Ok(()),
    }
}

pub async fn run(command: Commands, ctx: &mut Workspace) -> Result<()> {
    match command {
        Commands::Signup { email, password } => {
            let password = password_or_prompt(password)?;
            let user = ctx.client.sign_up(&email, &password).await?;
            println!("Registered {}. Sign in with `taskboard login {}`.", user.email, user.email);
        }
        Commands::Login { email, password } => {
            let password = password_or_prompt(password)?;
            let session = ctx.client.sign_in_with_password(&email, &password).await?;
            settings::save_session(&ctx.home, &session.access_token)?;
            println!("Signed in as {}", session.user.email);
        }
        Commands::Logout => {
            let mut projects = ProjectList::new();
            projects.sign_out(&mut ctx.client).await;
            settings::clear_session(&ctx.home)?;
            check(projects.take_notice())?;
            println!("Signed out");
        }
        Commands::Whoami => match AuthGate::check(&ctx.client).await {
            Access::Granted(session) => {
                println!("{} ({})", session.user.email, session.user.id);
                println!("session expires {}", session.expires_at.to_rfc3339());
            }
            Access::Redirect(_) => println!("Not signed in"),
        },
        Commands::ResetPassword { email } => {
            ctx.client.reset_password_for_email(&email).await?;
            println!("If {email} is registered, a reset token is on its way.");
        }
        Commands::SetPassword { token, password } => {
            let password = password_or_prompt(password)?;
            ctx.client.update_password_with_token(&token, &password).await?;
            println!("Password updated");
        }
        Commands::Projects { action } => {
            ctx.require_session().await?;
            run_projects(action.unwrap_or(ProjectAction::List), &ctx.client).await?;
        }
        Commands::Tasks { scope, action } => {
            ctx.require_session().await?;
            run_tasks(scope.scope(), action.unwrap_or(TaskAction::List), &ctx.client).await?;
        }
        Commands::Board { scope, action } => {
            ctx.require_session().await?;
            run_board(scope.scope(), action.unwrap_or(BoardAction::Show), &ctx.client).await?;
        }
        Commands::Team { project, action } => {
            ctx.require_session().await?;
            run_team(&project, action.unwrap_or(TeamAction::List), &ctx.client).await?;
        }
        Commands::Tui => crate::tui::run(&mut ctx.client).await?,
    }
    Ok(())
}

async fn run_projects<B: Backend>(action: ProjectAction, backend: &B) -> Result<()> {
    let mut list = ProjectList::new();
    match action {
        ProjectAction::List => {
            list.load(backend).await;
            check(list.take_notice())?;
            if list.projects().is_empty() {
                println!("No projects yet");
            }
            for p in list.projects() {
                println!("{}  {:<30} created {}", p.id, p.name, p.created_date());
            }
        }
        ProjectAction::Create { name } => {
            list.create(backend, &name).await;
            check(list.take_notice())?;
            if let Some(p) = list.projects().first() {
                println!("Created {} ({})", p.name, p.id);
            }
        }
        ProjectAction::Rename { id, name } => {
            list.load(backend).await;
            list.rename(backend, &id, &name).await;
            check(list.take_notice())?;
            println!("Renamed {id}");
        }
        ProjectAction::Delete { id } => {
            list.delete(backend, &id).await;
            check(list.take_notice())?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}

async fn run_tasks<B: Backend>(scope: TaskScope, action: TaskAction, backend: &B) -> Result<()> {
    let mut list = TaskList::new();
    list.load(backend, scope).await;
    check(list.take_notice())?;

    let before = list.rows().len();
    match action {
        TaskAction::List => {}
        TaskAction::Add { text } => list.add(backend, &text).await,
        TaskAction::Toggle { id } => list.toggle(backend, RowId::Stored(id)).await,
        TaskAction::Edit { id, text } => list.edit(backend, RowId::Stored(id), &text).await,
        TaskAction::Delete { id } => {
            list.delete(backend, RowId::Stored(id)).await;
            if list.rows().len() == before {
                println!("No task {id} in this list");
            }
        }
    }
    check(list.take_notice())?;

    if list.rows().is_empty() {
        println!("No tasks");
    }
    for row in list.rows() {
        let id = match row.id {
            RowId::Stored(id) => id.to_string(),
            RowId::Temp(_) => "-".to_string(),
        };
        let mark = if row.completed { "x" } else { " " };
        println!("{id:>5} [{mark}] {:<11} {}", row.status.as_str(), row.task);
    }
    Ok(())
}

async fn run_board<B: Backend>(scope: TaskScope, action: BoardAction, backend: &B) -> Result<()> {
    let mut board = Board::new();
    board.load(backend, scope).await;
    check(board.take_notice())?;

    if let BoardAction::Move { id, status, index } = action {
        let Some(source) = board.find(id) else {
            bail!("task {id} is not on this board");
        };
        let index = index.unwrap_or(board.lane(status).len());
        match board.move_task(backend, source, Some(LanePos::new(status, index))).await {
            MoveOutcome::Moved(task) => println!("Moved {} to {}", task.id, task.status.title()),
            MoveOutcome::Reordered | MoveOutcome::Ignored => {}
            MoveOutcome::RolledBack => check(board.take_notice())?,
        }
    }

    for status in TaskStatus::ALL {
        let cards = board.lane(status);
        println!("== {} ({})", status.title(), cards.len());
        for task in cards {
            println!("  {:>5}  {}", task.id, task.task);
        }
    }
    Ok(())
}

async fn run_team<B: Backend>(project_id: &str, action: TeamAction, backend: &B) -> Result<()> {
    let mut panel = TeamPanel::new();
    panel.load(backend, project_id).await;
    check(panel.take_notice())?;

    match action {
        TeamAction::List => {}
        TeamAction::Add { name, email } => {
            panel.add_member(backend, &name, &email).await?;
        }
        TeamAction::Remove { member_id } => {
            panel.remove_member(backend, &member_id).await;
            check(panel.take_notice())?;
        }
    }

    if let Some(project) = panel.project() {
        let role = if panel.can_manage() { "can manage" } else { "view only" };
        println!("{} ({role})", project.name);
    }
    for m in panel.members() {
        println!("  {}  {:<20} {}", m.id, m.name, m.email);
    }
    Ok(())
}
