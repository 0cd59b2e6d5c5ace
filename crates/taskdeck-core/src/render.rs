use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use taskdeck_shared::{TaskDto, TaskPriority, TaskStatus};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::controller::VisibleTasks;

const STAR: &str = "\u{2605}";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, visible))]
    pub fn print_visible(&self, visible: &VisibleTasks<'_>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_visible(&mut out, visible)
    }

    pub fn write_visible<W: Write>(
        &self,
        mut out: W,
        visible: &VisibleTasks<'_>,
    ) -> anyhow::Result<()> {
        match visible {
            VisibleTasks::Loading => {
                writeln!(out, "Loading...")?;
            }
            VisibleTasks::Ready(tasks) if tasks.is_empty() => {
                writeln!(out, "No tasks.")?;
            }
            VisibleTasks::Ready(tasks) => {
                self.write_task_table(&mut out, tasks)?;
            }
        }
        Ok(())
    }

    pub fn write_task_table<W: Write>(&self, out: W, tasks: &[&TaskDto]) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Title".to_string(),
            "Priority".to_string(),
            "Status".to_string(),
            "Due".to_string(),
            STAR.to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = task
                .id
                .map(|value| value.to_string())
                .unwrap_or_else(|| "-".to_string());
            let priority = self.paint(task.priority.as_wire(), priority_color(task.priority));
            let status = self.paint(&task.status.badge(), status_color(task.status));
            let due = task.due_date.clone().unwrap_or_default();
            let star = if task.starred {
                self.paint(STAR, Some("33"))
            } else {
                String::new()
            };

            rows.push(vec![
                self.paint(&id, Some("33")),
                task.title.clone(),
                priority,
                status,
                due,
                star,
            ]);
        }

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&self, task: &TaskDto) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_task_info(&mut out, task)
    }

    pub fn write_task_info<W: Write>(&self, mut out: W, task: &TaskDto) -> anyhow::Result<()> {
        writeln!(
            out,
            "id           {}",
            task.id
                .map(|value| value.to_string())
                .unwrap_or_else(|| "-".to_string())
        )?;
        writeln!(out, "title        {}", task.title)?;
        writeln!(out, "description  {}", task.description)?;
        writeln!(
            out,
            "due          {}",
            task.due_date.as_deref().unwrap_or("-")
        )?;
        writeln!(out, "priority     {}", task.priority.label())?;
        writeln!(out, "status       {}", task.status.label())?;
        writeln!(out, "starred      {}", if task.starred { "yes" } else { "no" })?;
        Ok(())
    }

    fn paint(&self, text: &str, code: Option<&str>) -> String {
        match code {
            Some(code) if self.color => format!("\x1b[{code}m{text}\x1b[0m"),
            _ => text.to_string(),
        }
    }
}

fn priority_color(priority: TaskPriority) -> Option<&'static str> {
    match priority {
        TaskPriority::High => Some("31"),
        TaskPriority::Medium => Some("33"),
        TaskPriority::Low => Some("32"),
    }
}

fn status_color(status: TaskStatus) -> Option<&'static str> {
    match status {
        TaskStatus::Completed => Some("32"),
        TaskStatus::InProgress => Some("34"),
        TaskStatus::Pending => None,
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| visible_width(h)).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(cell));
        }
    }

    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    for line in std::iter::once(&headers)
        .chain(std::iter::once(&rule))
        .chain(rows.iter())
    {
        let mut text = String::new();
        for (cell, width) in line.iter().zip(&widths) {
            text.push_str(cell);
            text.push_str(&" ".repeat(width.saturating_sub(visible_width(cell))));
            text.push(' ');
        }
        writeln!(writer, "{}", text.trim_end())?;
    }

    Ok(())
}

/// Display width ignoring ANSI colour sequences.
fn visible_width(cell: &str) -> usize {
    let mut plain = String::with_capacity(cell.len());
    let mut in_escape = false;
    for ch in cell.chars() {
        match (in_escape, ch) {
            (true, 'm') => in_escape = false,
            (true, _) => {}
            (false, '\x1b') => in_escape = true,
            (false, other) => plain.push(other),
        }
    }
    UnicodeWidthStr::width(plain.as_str())
}
