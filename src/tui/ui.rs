use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph};

use crate::backend::Backend;
use crate::models::TaskStatus;
use crate::tui::app::{App, InputMode, Screen, Status};
use crate::tui::theme;

pub fn draw<B: Backend>(frame: &mut Frame, app: &App<'_, B>) {
    let bg_block = Block::default().style(Style::default().bg(theme::BG));
    frame.render_widget(bg_block, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    match app.screen {
        Screen::Projects => draw_projects(frame, app, chunks[1]),
        Screen::Tasks => draw_tasks(frame, app, chunks[1]),
        Screen::Board => draw_board(frame, app, chunks[1]),
        Screen::Team => draw_team(frame, app, chunks[1]),
    }
    draw_footer(frame, app, chunks[2]);

    if app.mode == InputMode::HelpOverlay {
        draw_help(frame);
    }
}

fn panel<'a>(title: &'a str, focused: bool) -> Block<'a> {
    let title_fg = if focused { theme::NEON_CYAN } else { theme::BORDER_DIM };
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(focused))
        .title(Span::styled(
            title,
            Style::default().fg(title_fg).add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(theme::BG))
}

fn marker(selected: bool) -> (Span<'static>, Color) {
    if selected {
        (
            Span::styled(
                "▸ ",
                Style::default()
                    .fg(theme::NEON_CYAN)
                    .add_modifier(Modifier::BOLD),
            ),
            theme::TEXT_BRIGHT,
        )
    } else {
        (Span::styled("  ", Style::default()), theme::TEXT_DIM)
    }
}

fn draw_header<B: Backend>(frame: &mut Frame, app: &App<'_, B>, area: Rect) {
    let location = match app.screen {
        Screen::Projects => "Projects".to_string(),
        Screen::Tasks => format!("Tasks · {}", app.scope_title()),
        Screen::Board => format!("Board · {}", app.scope_title()),
        Screen::Team => format!(
            "Team · {}",
            app.team.project().map(|p| p.name.as_str()).unwrap_or("?")
        ),
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("  {} ", theme::HEADER_ART),
            Style::default()
                .fg(theme::NEON_CYAN)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("│ ", Style::default().fg(theme::BORDER_DIM)),
        Span::styled(location, Style::default().fg(theme::NEON_MAGENTA)),
        Span::styled("  │ ", Style::default().fg(theme::BORDER_DIM)),
        Span::styled(app.user_email.as_str(), Style::default().fg(theme::TEXT_DIM)),
    ]))
    .block(panel("", false));
    frame.render_widget(header, area);
}

fn draw_projects<B: Backend>(frame: &mut Frame, app: &App<'_, B>, area: Rect) {
    let items: Vec<ListItem> = app
        .projects
        .projects()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let (mark, fg) = marker(i == app.selected_project_idx);
            ListItem::new(Line::from(vec![
                mark,
                Span::styled(p.name.clone(), Style::default().fg(fg)),
                Span::styled(
                    format!("  {}", p.created_date()),
                    Style::default().fg(theme::BORDER_DIM),
                ),
            ]))
        })
        .collect();

    let list = if items.is_empty() {
        List::new(vec![ListItem::new(Span::styled(
            "  No projects yet. Press n to create one.",
            Style::default().fg(theme::TEXT_DIM),
        ))])
    } else {
        List::new(items)
    };
    frame.render_widget(list.block(panel(" Projects ", true)), area);
}

fn draw_tasks<B: Backend>(frame: &mut Frame, app: &App<'_, B>, area: Rect) {
    let items: Vec<ListItem> = app
        .tasks
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let (mark, fg) = marker(i == app.selected_task_idx);
            let mut text_style = Style::default().fg(fg);
            if row.completed {
                text_style = text_style.add_modifier(Modifier::CROSSED_OUT);
            }
            if row.editing {
                text_style = text_style.add_modifier(Modifier::UNDERLINED);
            }
            ListItem::new(Line::from(vec![
                mark,
                Span::styled(
                    format!("{} ", theme::checkbox(row.completed)),
                    Style::default().fg(theme::NEON_CYAN),
                ),
                Span::styled(
                    format!("{} ", theme::status_symbol(row.status)),
                    theme::status_style(row.status),
                ),
                Span::styled(row.task.clone(), text_style),
            ]))
        })
        .collect();
    frame.render_widget(List::new(items).block(panel(" Tasks ", true)), area);
}

fn draw_board<B: Backend>(frame: &mut Frame, app: &App<'_, B>, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    for (col, status) in columns.iter().zip(TaskStatus::ALL) {
        let focused = app.cursor.lane == status;
        let mut items: Vec<ListItem> = app
            .board
            .lane(status)
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let here = focused && i == app.cursor.index;
                let carried = app
                    .carrying
                    .is_some_and(|c| c.lane == status && c.index == i);
                let (mark, fg) = marker(here);
                let style = if carried {
                    theme::carried_style()
                } else {
                    Style::default().fg(fg)
                };
                ListItem::new(Line::from(vec![
                    mark,
                    Span::styled(
                        format!("{} ", theme::status_symbol(status)),
                        theme::status_style(status),
                    ),
                    Span::styled(task.task.clone(), style),
                ]))
            })
            .collect();

        // Drop slot past the last card.
        if focused && app.carrying.is_some() && app.cursor.index >= items.len() {
            items.push(ListItem::new(Span::styled("▸ ┄┄ drop here ┄┄", theme::carried_style())));
        }

        let title = format!(" {} ({}) ", status.title(), app.board.lane(status).len());
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme::panel_border(focused))
            .title(Span::styled(title, theme::status_style(status)))
            .style(Style::default().bg(theme::BG));
        frame.render_widget(List::new(items).block(block), *col);
    }
}

fn draw_team<B: Backend>(frame: &mut Frame, app: &App<'_, B>, area: Rect) {
    let mut items: Vec<ListItem> = app
        .team
        .members()
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let (mark, fg) = marker(i == app.selected_member_idx);
            ListItem::new(Line::from(vec![
                mark,
                Span::styled(m.name.clone(), Style::default().fg(fg)),
                Span::styled(format!("  <{}>", m.email), Style::default().fg(theme::TEXT_DIM)),
            ]))
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new(Span::styled(
            "  No team members yet.",
            Style::default().fg(theme::TEXT_DIM),
        )));
    }
    let title = if app.team.can_manage() {
        " Team (manage) "
    } else {
        " Team (view only) "
    };
    frame.render_widget(List::new(items).block(panel(title, true)), area);
}

fn draw_footer<B: Backend>(frame: &mut Frame, app: &App<'_, B>, area: Rect) {
    let line = match &app.mode {
        InputMode::Editing(prompt) => Line::from(vec![
            Span::styled(
                format!("  {}: ", prompt.label()),
                Style::default().fg(theme::NEON_MAGENTA),
            ),
            Span::styled(app.input.as_str(), Style::default().fg(theme::TEXT_BRIGHT)),
            Span::styled("█", Style::default().fg(theme::NEON_CYAN)),
        ]),
        _ => match &app.status {
            Some(status) => Line::from(Span::styled(
                format!("  {}", status.text()),
                theme::notice_style(matches!(status, Status::Error(_))),
            )),
            None => Line::from(Span::styled(
                format!("  {}", key_hints(app.screen)),
                Style::default().fg(theme::TEXT_DIM),
            )),
        },
    };
    let footer = Paragraph::new(line).block(panel(" Help ", false));
    frame.render_widget(footer, area);
}

fn key_hints(screen: Screen) -> &'static str {
    match screen {
        Screen::Projects => "enter: tasks  b: board  t: team  n: new  r: rename  d: delete  P/B: personal  o: sign out  ?: help  q: quit",
        Screen::Tasks => "a: add  space: toggle  e: edit  d: delete  b: board  esc: back",
        Screen::Board => "h/l: lane  j/k: card  space: pick up / drop  t: list  esc: back",
        Screen::Team => "a: invite  d: remove  esc: back",
    }
}

fn draw_help(frame: &mut Frame) {
    let area = centered(frame.area(), 60, 14);
    let lines: Vec<Line> = [
        ("Projects", key_hints(Screen::Projects)),
        ("Tasks", key_hints(Screen::Tasks)),
        ("Board", key_hints(Screen::Board)),
        ("Team", key_hints(Screen::Team)),
    ]
    .into_iter()
    .flat_map(|(name, hints)| {
        [
            Line::from(Span::styled(
                name,
                Style::default()
                    .fg(theme::NEON_CYAN)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(hints, Style::default().fg(theme::TEXT_DIM))),
        ]
    })
    .collect();

    frame.render_widget(Clear, area);
    let help = Paragraph::new(lines)
        .wrap(ratatui::widgets::Wrap { trim: true })
        .block(panel(" Keys ", true));
    frame.render_widget(help, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_fits_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = centered(area, 60, 14);
        assert_eq!(rect, Rect::new(20, 13, 60, 14));

        let small = Rect::new(0, 0, 30, 10);
        assert_eq!(centered(small, 60, 14), small);
    }
}
