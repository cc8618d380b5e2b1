mod app;
mod theme;
mod ui;

pub use app::App;

use std::io::stdout;
use std::panic;

use anyhow::{Result, bail};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::backend::Backend;
use crate::views::{Access, AuthGate};

/// Drop guard that restores terminal state when dropped.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), LeaveAlternateScreen);
    }
}

pub async fn run<B: Backend>(backend: &mut B) -> Result<()> {
    let session = match AuthGate::check(&*backend).await {
        Access::Granted(session) => session,
        Access::Redirect(_) => bail!("not signed in; run `taskboard login <email>` first"),
    };

    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    let _guard = TerminalGuard;

    // Install panic hook that restores terminal before printing the panic
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));

    let term_backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(term_backend)?;

    let mut app = App::new(backend, session.user.email).await;
    let result = app.run(&mut terminal).await;

    // Restore the original panic hook before returning
    let _ = panic::take_hook();

    result
}
