//! Task CLI commands

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use super::output::{format_duration, format_timestamp, Output};
use super::query::FilterArgs;
use crate::domain::{NewTask, Priority, SortField, SortOrder, Task, TaskId, TaskPatch, TaskStatus};
use crate::state::Session;
use crate::storage::Project;

/// Arguments for `deck add`
pub struct AddArgs {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub due: Option<DateTime<Utc>>,
}

/// Arguments for `deck edit`
pub struct EditArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub due: Option<DateTime<Utc>>,
    pub clear_due: bool,
}

impl EditArgs {
    fn into_patch(self) -> TaskPatch {
        let mut patch = TaskPatch::new();
        if let Some(title) = self.title {
            patch = patch.title(title);
        }
        if let Some(description) = self.description {
            patch = patch.description(description);
        }
        if let Some(priority) = self.priority {
            patch = patch.priority(priority);
        }
        if !self.tags.is_empty() {
            patch = patch.tags(self.tags);
        }
        if let Some(due) = self.due {
            patch = patch.due(due);
        } else if self.clear_due {
            patch = patch.clear_due();
        }
        patch
    }
}

fn open_session() -> Result<(Project, Session)> {
    let project = Project::open_current()?;
    tracing::debug!(root = %project.root().display(), "opened project");

    let session = project.session()?;
    Ok((project, session))
}

pub fn add(output: &Output, args: AddArgs) -> Result<()> {
    let (project, mut session) = open_session()?;

    let mut fields = NewTask::new(args.title);
    if let Some(description) = args.description {
        fields = fields.description(description);
    }
    if let Some(priority) = args.priority {
        fields = fields.priority(priority);
    }
    for tag in args.tags {
        fields = fields.tag(tag);
    }
    if let Some(due) = args.due {
        fields = fields.due(due);
    }

    let task = session.add(fields)?;
    project.persist(&mut session)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Created task: {} - {}", task.id(), task.title()));
    }

    Ok(())
}

pub fn list(
    output: &Output,
    filter: FilterArgs,
    sort: Option<SortField>,
    desc: bool,
) -> Result<()> {
    let (_project, mut session) = open_session()?;

    let base = session.state().query().clone();
    let order = if desc { SortOrder::Desc } else { base.sort_order };
    let field = sort.unwrap_or(base.sort_field);
    let query = filter.apply_to(base).sort_by(field, order);
    session.set_query(query);

    let tasks = session.filtered_view();
    tracing::debug!(matched = tasks.len(), total = session.state().len(), "listed tasks");

    if output.is_json() {
        output.data(&tasks);
    } else if tasks.is_empty() {
        if session.state().query().is_match_all() {
            println!("No tasks");
        } else {
            println!("No tasks match the filters");
        }
    } else {
        println!(
            "{:<10} {:<12} {:<8} {:<17} TITLE",
            "ID", "STATUS", "PRIORITY", "DUE"
        );
        println!("{}", "-".repeat(72));

        for task in &tasks {
            let due = task
                .due_date()
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<10} {:<12} {:<8} {:<17} {}",
                task.id(),
                task.status(),
                task.priority(),
                due,
                task.title()
            );
        }
    }

    Ok(())
}

pub fn show(output: &Output, id_str: &str) -> Result<()> {
    let (_project, session) = open_session()?;

    let id: TaskId = id_str.parse()?;
    let task = session
        .state()
        .get(&id)
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;

    let ctx = session.context();
    let overdue = task.is_overdue(ctx.now);
    let due_soon = task.is_due_soon(ctx.now, ctx.due_soon_horizon);

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task,
            "overdue": overdue,
            "dueSoon": due_soon,
        }));
    } else {
        println!("Task: {}", task.id());
        println!("Title: {}", task.title());
        println!("Status: {}", task.status());
        println!("Priority: {}", task.priority());
        println!("Created: {}", format_timestamp(task.created_at()));

        if let Some(due) = task.due_date() {
            let marker = if overdue {
                " (OVERDUE)"
            } else if due_soon {
                " (due soon)"
            } else {
                ""
            };
            println!("Due: {}{}", format_timestamp(due), marker);
        }

        if let Some(duration) = task.completion_duration() {
            println!("Completed in: {}", format_duration(duration));
        }

        if !task.tags().is_empty() {
            let tags: Vec<&str> = task.tags().iter().map(String::as_str).collect();
            println!("Tags: {}", tags.join(", "));
        }

        if !task.description().is_empty() {
            println!("\nDescription:");
            println!("{}", task.description());
        }
    }

    Ok(())
}

pub fn start(output: &Output, id_str: &str) -> Result<()> {
    transition(output, id_str, TaskStatus::InProgress, "Started")
}

pub fn complete(output: &Output, id_str: &str) -> Result<()> {
    transition(output, id_str, TaskStatus::Completed, "Completed")
}

pub fn cancel(output: &Output, id_str: &str) -> Result<()> {
    transition(output, id_str, TaskStatus::Cancelled, "Cancelled")
}

fn transition(output: &Output, id_str: &str, status: TaskStatus, verb: &str) -> Result<()> {
    let (project, mut session) = open_session()?;

    let id: TaskId = id_str.parse()?;
    let task = session.transition(&id, status)?;
    project.persist(&mut session)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("{} task: {}", verb, task.id()));
    }

    Ok(())
}

pub fn edit(output: &Output, id_str: &str, args: EditArgs) -> Result<()> {
    let patch = args.into_patch();
    if patch.is_empty() {
        bail!("Nothing to change. Pass at least one field to edit.");
    }

    let (project, mut session) = open_session()?;

    let id: TaskId = id_str.parse()?;
    let task = session.patch(&id, patch)?;
    project.persist(&mut session)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Updated task: {} - {}", task.id(), task.title()));
    }

    Ok(())
}

pub fn remove(output: &Output, id_str: &str) -> Result<()> {
    let (project, mut session) = open_session()?;

    let id: TaskId = id_str.parse()?;
    let task: Task = session
        .remove(&id)
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;
    project.persist(&mut session)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Removed task: {} - {}", task.id(), task.title()));
    }

    Ok(())
}
