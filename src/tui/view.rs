//! ratatui 渲染：左右底三面板加编辑器，几何计算独立成纯函数供鼠标命中。

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::kernel::chat::{AgentKind, AgentStatus};
use crate::kernel::diff::{word_diff, DiffKind};
use crate::kernel::editor::SuggestionStatus;
use crate::kernel::layout::{BottomTab, LeftPanelTab, PanelId, PanelLayout, RightPanelTab};
use crate::kernel::learning::LEARNING_PATH;
use crate::kernel::problems::ProblemSeverity;
use crate::kernel::terminal::MessageKind;
use crate::kernel::{AppState, Theme};

use super::app::{Focus, PromptKind, UiState};

pub struct Palette {
    pub fg: Color,
    pub dim: Color,
    pub accent: Color,
    pub error: Color,
    pub warning: Color,
    pub ok: Color,
    pub bar_bg: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                fg: Color::White,
                dim: Color::DarkGray,
                accent: Color::Cyan,
                error: Color::Red,
                warning: Color::Yellow,
                ok: Color::Green,
                bar_bg: Color::Indexed(236),
            },
            Theme::Light => Self {
                fg: Color::Black,
                dim: Color::Gray,
                accent: Color::Blue,
                error: Color::LightRed,
                warning: Color::Indexed(130),
                ok: Color::Indexed(28),
                bar_bg: Color::Indexed(252),
            },
        }
    }
}

pub struct Regions {
    pub sidebar: Rect,
    pub editor: Rect,
    pub right: Option<Rect>,
    pub bottom: Option<Rect>,
    pub status: Rect,
}

/// 渲染与鼠标命中共用同一套几何，避免两边算不一致。
pub fn regions(layout: &PanelLayout, area: Rect) -> Regions {
    let bottom_h = if layout.bottom_visible {
        layout.bottom_panel.size().min(area.height.saturating_sub(4))
    } else {
        0
    };
    let rows = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(bottom_h),
        Constraint::Length(1),
    ])
    .split(area);

    let right_w = if layout.right_tab.is_some() {
        layout.right_panel.size().min(rows[0].width.saturating_sub(50))
    } else {
        0
    };
    let cols = Layout::horizontal([
        Constraint::Length(layout.sidebar.size()),
        Constraint::Min(0),
        Constraint::Length(right_w),
    ])
    .split(rows[0]);

    Regions {
        sidebar: cols[0],
        editor: cols[1],
        right: (right_w > 0).then_some(cols[2]),
        bottom: (bottom_h > 0).then_some(rows[1]),
        status: rows[2],
    }
}

/// 指针落在哪条面板分界线上。
pub fn border_hit(layout: &PanelLayout, area: Rect, x: u16, y: u16) -> Option<PanelId> {
    let r = regions(layout, area);
    if let Some(bottom) = r.bottom {
        if y == bottom.y && x >= bottom.x && x < bottom.x + bottom.width {
            return Some(PanelId::BottomPanel);
        }
    }
    if y >= r.sidebar.y && y < r.sidebar.y + r.sidebar.height {
        if x == r.sidebar.x + r.sidebar.width.saturating_sub(1) {
            return Some(PanelId::Sidebar);
        }
        if let Some(right) = r.right {
            if x == right.x {
                return Some(PanelId::RightPanel);
            }
        }
    }
    None
}

pub fn render(frame: &mut Frame<'_>, state: &AppState, ui: &UiState) {
    let palette = Palette::for_theme(state.theme);
    let r = regions(&state.layout, frame.area());

    render_sidebar(frame, r.sidebar, state, ui, &palette);
    render_editor(frame, r.editor, state, ui, &palette);
    if let Some(area) = r.right {
        render_right(frame, area, state, ui, &palette);
    }
    if let Some(area) = r.bottom {
        render_bottom(frame, area, state, ui, &palette);
    }
    render_status(frame, r.status, state, &palette);

    if let Some(prompt) = &ui.prompt {
        render_prompt(frame, frame.area(), prompt, &palette);
    }
    if let Some(modal) = &state.modal {
        render_modal(frame, frame.area(), &modal.title, &modal.body, &palette);
    }
}

fn focus_style(focused: bool, palette: &Palette) -> Style {
    if focused {
        Style::default().fg(palette.accent)
    } else {
        Style::default().fg(palette.dim)
    }
}

fn render_sidebar(frame: &mut Frame<'_>, area: Rect, state: &AppState, ui: &UiState, p: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(state.layout.left_tab.label())
        .border_style(focus_style(ui.focus == Focus::Sidebar, p));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match state.layout.left_tab {
        LeftPanelTab::Workspace => {
            let rows = state.workspace.rows();
            let mut lines = Vec::with_capacity(rows.len());
            for (i, row) in rows.iter().enumerate() {
                let marker = if row.is_folder {
                    if row.is_expanded {
                        "v "
                    } else {
                        "> "
                    }
                } else {
                    "  "
                };
                let mut style = Style::default().fg(p.fg);
                if Some(row.id) == state.workspace.selected() {
                    style = style.add_modifier(Modifier::BOLD);
                }
                if i == ui.sidebar_index && ui.focus == Focus::Sidebar {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                lines.push(Line::styled(
                    format!("{}{}{}", "  ".repeat(row.depth as usize), marker, row.name),
                    style,
                ));
            }
            let scroll = scroll_for(ui.sidebar_index, lines.len(), inner.height);
            frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), inner);
        }
        LeftPanelTab::Learning => {
            let mut lines = Vec::new();
            let mut flat = 0usize;
            for plan in LEARNING_PATH {
                lines.push(Line::styled(
                    format!("Day {}: {}", plan.day, plan.title),
                    Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
                ));
                for topic in plan.topics {
                    let mut style = Style::default().fg(p.fg);
                    if flat == ui.learning_index && ui.focus == Focus::Sidebar {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    lines.push(Line::styled(format!("  {}", topic.name), style));
                    flat += 1;
                }
            }
            let cursor_row = learning_cursor_row(ui.learning_index);
            let scroll = scroll_for(cursor_row, lines.len(), inner.height);
            frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), inner);
        }
        LeftPanelTab::Notes => {
            let mut text = state.notes.clone();
            if ui.focus == Focus::Sidebar {
                text.push('_');
            }
            frame.render_widget(
                Paragraph::new(text)
                    .style(Style::default().fg(p.fg))
                    .wrap(Wrap { trim: false }),
                inner,
            );
        }
    }
}

/// 学习面板里话题的可视行号（每个 Day 标题占一行）。
fn learning_cursor_row(flat_index: usize) -> usize {
    let mut row = 0usize;
    let mut flat = 0usize;
    for plan in LEARNING_PATH {
        row += 1;
        for _ in plan.topics {
            if flat == flat_index {
                return row;
            }
            row += 1;
            flat += 1;
        }
    }
    row
}

fn scroll_for(cursor: usize, total: usize, height: u16) -> u16 {
    let height = height.max(1) as usize;
    if cursor < height || total <= height {
        0
    } else {
        (cursor + 1 - height).min(total - height) as u16
    }
}

fn render_editor(frame: &mut Frame<'_>, area: Rect, state: &AppState, ui: &UiState, p: &Palette) {
    let mut tab_spans = Vec::new();
    for id in state.editor.open_files() {
        let name = state.workspace.name(*id).unwrap_or("?");
        let style = if state.editor.active() == Some(*id) {
            Style::default().fg(p.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(p.dim)
        };
        tab_spans.push(Span::styled(format!(" {name} "), style));
        tab_spans.push(Span::styled("|", Style::default().fg(p.dim)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(tab_spans))
        .border_style(focus_style(ui.focus == Focus::Editor, p));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(file) = state.editor.active() else {
        frame.render_widget(
            Paragraph::new("No file open. Pick one in the workspace panel.")
                .style(Style::default().fg(p.dim)),
            inner,
        );
        return;
    };
    let content = state.workspace.file_content(file).unwrap_or("");

    let cursor = ui.cursor.min(content.len());
    let (cursor_line, _) = line_col(content, cursor);
    let mut lines = Vec::new();
    let mut offset = 0usize;
    for (i, raw) in content.split('\n').enumerate() {
        let line_no = (i + 1) as u32;
        let problem = state.problems.problem_on_line(line_no);
        let marker = match problem.map(|pr| pr.severity) {
            Some(ProblemSeverity::Error) => Span::styled("●", Style::default().fg(p.error)),
            Some(ProblemSeverity::Warning) => Span::styled("●", Style::default().fg(p.warning)),
            None => Span::raw(" "),
        };
        let mut spans = vec![
            Span::styled(format!("{line_no:>4} "), Style::default().fg(p.dim)),
            marker,
            Span::raw(" "),
        ];
        if i == cursor_line && ui.focus == Focus::Editor {
            spans.extend(spans_with_cursor(raw, cursor - offset, p));
        } else {
            spans.push(Span::styled(raw.to_string(), Style::default().fg(p.fg)));
        }
        lines.push(Line::from(spans));
        offset += raw.len() + 1;
    }
    let scroll = scroll_for(cursor_line, lines.len(), inner.height);
    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), inner);

    if let Some(suggestion) = &state.editor.inline.suggestion {
        let body = match &suggestion.status {
            SuggestionStatus::Loading => Text::styled("thinking...", Style::default().fg(p.dim)),
            SuggestionStatus::Ready { new_code } => {
                diff_text(&suggestion.old_code, new_code, p)
            }
        };
        let title = if matches!(suggestion.status, SuggestionStatus::Ready { .. }) {
            "Suggestion  [Tab] accept  [Esc] reject"
        } else {
            "Suggestion"
        };
        render_overlay(frame, area, title, body, p);
    }
}

fn spans_with_cursor<'a>(raw: &'a str, col: usize, p: &Palette) -> Vec<Span<'a>> {
    let col = col.min(raw.len());
    let (before, rest) = raw.split_at(col);
    let mut chars = rest.chars();
    let under = chars.next();
    let after = chars.as_str();
    let mut spans = vec![Span::styled(before, Style::default().fg(p.fg))];
    match under {
        Some(ch) => spans.push(Span::styled(
            ch.to_string(),
            Style::default().fg(p.fg).add_modifier(Modifier::REVERSED),
        )),
        None => spans.push(Span::styled(
            " ",
            Style::default().add_modifier(Modifier::REVERSED),
        )),
    }
    spans.push(Span::styled(after, Style::default().fg(p.fg)));
    spans
}

fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = &text[..offset];
    let line = before.matches('\n').count();
    let col = offset - before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    (line, col)
}

fn diff_text<'a>(old: &str, new: &str, p: &Palette) -> Text<'a> {
    let mut lines = vec![Line::default()];
    for run in word_diff(old, new) {
        let style = match run.kind {
            DiffKind::Equal => Style::default().fg(p.fg),
            DiffKind::Added => Style::default().fg(p.ok),
            DiffKind::Removed => Style::default()
                .fg(p.error)
                .add_modifier(Modifier::CROSSED_OUT),
        };
        let mut parts = run.text.split('\n');
        if let Some(first) = parts.next() {
            if let Some(last) = lines.last_mut() {
                last.spans.push(Span::styled(first.to_string(), style));
            }
        }
        for part in parts {
            lines.push(Line::from(Span::styled(part.to_string(), style)));
        }
    }
    Text::from(lines)
}

fn render_overlay(frame: &mut Frame<'_>, host: Rect, title: &str, body: Text<'_>, p: &Palette) {
    let height = (body.height() as u16 + 2).min(host.height.saturating_sub(2)).max(3);
    let width = host.width.saturating_sub(8).max(20);
    let area = Rect {
        x: host.x + (host.width.saturating_sub(width)) / 2,
        y: host.y + 1,
        width,
        height,
    };
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .border_style(Style::default().fg(p.accent));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(body).wrap(Wrap { trim: false }), inner);
}

fn render_right(frame: &mut Frame<'_>, area: Rect, state: &AppState, ui: &UiState, p: &Palette) {
    match state.layout.right_tab {
        Some(RightPanelTab::Webview) => {
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Web Preview")
                .border_style(Style::default().fg(p.dim));
            let inner = block.inner(area);
            frame.render_widget(block, area);
            let body = if state.last_web_output.is_empty() {
                Text::styled("Run a file that emits HTML to see it here.", Style::default().fg(p.dim))
            } else {
                Text::styled(state.last_web_output.clone(), Style::default().fg(p.fg))
            };
            frame.render_widget(Paragraph::new(body).wrap(Wrap { trim: false }), inner);
        }
        Some(RightPanelTab::Agent) => render_chat(frame, area, state, ui, p),
        None => {}
    }
}

fn render_chat(frame: &mut Frame<'_>, area: Rect, state: &AppState, ui: &UiState, p: &Palette) {
    let title = format!("AI: {}", state.chat.agent.label());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(focus_style(ui.focus == Focus::Chat, p));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).split(inner);

    let mut lines = Vec::new();
    for message in &state.chat.messages {
        let (who, style) = match message.role {
            crate::kernel::chat::Role::User => ("you", Style::default().fg(p.accent)),
            crate::kernel::chat::Role::Model => ("ai", Style::default().fg(p.ok)),
        };
        lines.push(Line::styled(
            format!("[{who}]"),
            style.add_modifier(Modifier::BOLD),
        ));
        if let Some(image) = &message.image_url {
            lines.push(Line::styled(image.clone(), Style::default().fg(p.dim)));
        }
        for raw in message.content.split('\n') {
            lines.push(Line::styled(raw.to_string(), Style::default().fg(p.fg)));
        }
        if let Some(response) = &message.agent_response {
            for action in &response.actions {
                lines.push(Line::styled(
                    format!("  {:?} {}", action.kind, action.path),
                    Style::default().fg(p.warning),
                ));
            }
            if let Some(status) = message.agent_status {
                let hint = match status {
                    AgentStatus::Pending => "  [Pending]  ^A apply / ^X reject".to_string(),
                    _ => format!("  [{status:?}]"),
                };
                lines.push(Line::styled(hint, Style::default().fg(p.dim)));
            }
        }
        lines.push(Line::default());
    }
    if state.chat.sending {
        lines.push(Line::styled("...", Style::default().fg(p.dim)));
    }
    let total = lines.len();
    let scroll = total.saturating_sub(rows[0].height as usize) as u16;
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).scroll((scroll, 0)),
        rows[0],
    );

    let agents: Vec<String> = AgentKind::ALL.iter().map(|a| a.label().to_string()).collect();
    let hint = format!("> {}_   [F8] {}", ui.chat_input, agents.join("/"));
    frame.render_widget(
        Paragraph::new(hint).style(Style::default().fg(p.fg)),
        rows[1],
    );
}

fn render_bottom(frame: &mut Frame<'_>, area: Rect, state: &AppState, ui: &UiState, p: &Palette) {
    let mut title_spans = vec![Span::styled(
        format!(" Problems({}) ", state.problems.items().len()),
        if state.layout.bottom_tab == BottomTab::Problems {
            Style::default().fg(p.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(p.dim)
        },
    )];
    for session in &state.terminals.sessions {
        let style = if state.layout.bottom_tab == BottomTab::Terminal(session.id) {
            Style::default().fg(p.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(p.dim)
        };
        title_spans.push(Span::styled(format!(" {} ", session.name), style));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(title_spans))
        .border_style(focus_style(ui.focus == Focus::Bottom, p));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match state.layout.bottom_tab {
        BottomTab::Problems => {
            if state.problems.items().is_empty() {
                let text = if state.problems.lint_in_flight {
                    "checking..."
                } else {
                    "No problems detected."
                };
                frame.render_widget(
                    Paragraph::new(text).style(Style::default().fg(p.dim)),
                    inner,
                );
                return;
            }
            let mut lines = Vec::new();
            for (i, problem) in state.problems.items().iter().enumerate() {
                let color = match problem.severity {
                    ProblemSeverity::Error => p.error,
                    ProblemSeverity::Warning => p.warning,
                };
                let mut style = Style::default().fg(color);
                if i == state.problems.selected() && ui.focus == Focus::Bottom {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                let fixing = if state.editor.fixes.is_fixing_line(problem.line) {
                    "  (fixing...)"
                } else {
                    ""
                };
                lines.push(Line::styled(
                    format!(
                        "{:>4}  {}  {}{}",
                        problem.line,
                        problem.severity.label(),
                        problem.message,
                        fixing
                    ),
                    style,
                ));
            }
            let scroll = scroll_for(state.problems.selected(), lines.len(), inner.height);
            frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), inner);
        }
        BottomTab::Terminal(id) => {
            let Some(session) = state.terminals.session(id) else {
                return;
            };
            let rows = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).split(inner);
            let mut lines = Vec::new();
            for message in &session.history {
                let (prefix, color) = match message.kind {
                    MessageKind::Command => ("$ ", p.accent),
                    MessageKind::Output => ("", p.fg),
                    MessageKind::Error => ("", p.error),
                    MessageKind::System => ("", p.dim),
                    MessageKind::PhpOutput => ("", p.ok),
                };
                for (i, raw) in message.text.split('\n').enumerate() {
                    let lead = if i == 0 {
                        format!("{} {prefix}", message.timestamp)
                    } else {
                        " ".repeat(message.timestamp.len() + 1 + prefix.len())
                    };
                    lines.push(Line::from(vec![
                        Span::styled(lead, Style::default().fg(p.dim)),
                        Span::styled(raw.to_string(), Style::default().fg(color)),
                    ]));
                }
            }
            let total = lines.len();
            let scroll = total.saturating_sub(rows[0].height as usize) as u16;
            frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), rows[0]);

            let input = if state.executing {
                "running...".to_string()
            } else {
                format!("$ {}_", session.input)
            };
            frame.render_widget(
                Paragraph::new(input).style(Style::default().fg(p.fg)),
                rows[1],
            );
        }
    }
}

fn render_status(frame: &mut Frame<'_>, area: Rect, state: &AppState, p: &Palette) {
    let mut spans = vec![Span::styled(
        format!(" {} ", state.active_file_name()),
        Style::default().fg(p.fg).add_modifier(Modifier::BOLD),
    )];
    if state.executing {
        spans.push(Span::styled(" running ", Style::default().fg(p.warning)));
    }
    if state.problems.lint_in_flight {
        spans.push(Span::styled(" lint ", Style::default().fg(p.dim)));
    }
    let errors = state.problems.error_count();
    if errors > 0 {
        spans.push(Span::styled(
            format!(" {errors} error(s) "),
            Style::default().fg(p.error),
        ));
    }
    spans.push(Span::styled(
        "  ^R run  ^E export  ^B panel  ^K AI  ^Q quit",
        Style::default().fg(p.dim),
    ));
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(p.bar_bg)),
        area,
    );
}

fn render_prompt(frame: &mut Frame<'_>, host: Rect, prompt: &super::app::PromptInput, p: &Palette) {
    let title = match prompt.kind {
        PromptKind::CreateFile { .. } => "New file name",
        PromptKind::CreateFolder { .. } => "New folder name",
        PromptKind::Rename { .. } => "Rename to",
        PromptKind::Inline => "Ask AI (Enter to send, Esc to cancel)",
    };
    let body = Text::styled(format!("{}_", prompt.buffer), Style::default().fg(p.fg));
    render_overlay(frame, host, title, body, p);
}

fn render_modal(frame: &mut Frame<'_>, host: Rect, title: &str, body: &str, p: &Palette) {
    let width = (host.width * 2 / 3).max(30).min(host.width);
    let height = (body.lines().count() as u16 + 4).min(host.height);
    let area = Rect {
        x: host.x + (host.width.saturating_sub(width)) / 2,
        y: host.y + (host.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .border_style(Style::default().fg(p.warning));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let mut text = Text::styled(body.to_string(), Style::default().fg(p.fg));
    text.push_line(Line::styled("(Esc to close)", Style::default().fg(p.dim)));
    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }), inner);
}
