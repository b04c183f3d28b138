//! Query commands and shared filter arguments

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;

use super::output::{format_duration, Output};
use crate::domain::{Priority, Query, Statistics, TaskStatus};
use crate::storage::Project;

/// Filters shared by `list` and `stats`
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// pending, inProgress, completed or cancelled
    #[arg(long)]
    pub status: Option<TaskStatus>,

    /// low, medium, high or urgent
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Only tasks carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Case-insensitive text in title or description
    #[arg(long)]
    pub search: Option<String>,

    /// Only open tasks past their due date
    #[arg(long)]
    pub overdue: bool,

    /// Only open tasks due within the configured horizon
    #[arg(long)]
    pub due_soon: bool,

    /// Created on or after (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub created_after: Option<DateTime<Utc>>,

    /// Created on or before (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub created_before: Option<DateTime<Utc>>,
}

impl FilterArgs {
    /// Layers the filters over `base`, keeping its sort
    pub fn apply_to(self, base: Query) -> Query {
        let mut query = base.created_between(self.created_after, self.created_before);

        if let Some(status) = self.status {
            query = query.status(status);
        }
        if let Some(priority) = self.priority {
            query = query.priority(priority);
        }
        if let Some(tag) = self.tag {
            query = query.tag(tag);
        }
        if let Some(text) = self.search {
            query = query.search(text);
        }
        if self.overdue {
            query = query.overdue_only();
        }
        if self.due_soon {
            query = query.due_soon_only();
        }

        query
    }
}

/// Parses an RFC 3339 timestamp or a `YYYY-MM-DD` date at midnight UTC
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date '{}' (expected RFC 3339 or YYYY-MM-DD)", s))
}

/// Show statistics for all tasks and for the filtered view
pub fn stats(output: &Output, filter: FilterArgs) -> Result<()> {
    let project = Project::open_current()?;
    tracing::debug!(root = %project.root().display(), "opened project");

    let mut session = project.session()?;
    let query = filter.apply_to(session.state().query().clone());
    session.set_query(query);

    let all = session.statistics();
    let filtered = session.filtered_statistics();

    if output.is_json() {
        output.data(&serde_json::json!({
            "all": all,
            "filtered": filtered,
            "query": session.state().query(),
        }));
    } else {
        println!("Task Statistics");
        println!("{}", "=".repeat(40));
        print_statistics(&all);

        if !session.state().query().is_match_all() {
            println!();
            println!("Filtered ({} of {})", filtered.total, all.total);
            println!("{}", "-".repeat(40));
            print_statistics(&filtered);
        }
    }

    Ok(())
}

fn print_statistics(stats: &Statistics) {
    println!("Tasks: {} total", stats.total);
    println!("  [ ] Pending:     {}", stats.pending);
    println!("  [~] In Progress: {}", stats.in_progress);
    println!("  [x] Completed:   {}", stats.completed);
    println!("  [-] Cancelled:   {}", stats.cancelled);
    println!();
    println!("  Overdue:         {}", stats.overdue_count);
    println!("  Due soon:        {}", stats.due_soon_count);
    println!("  High priority:   {}", stats.high_priority_count);
    println!();
    println!("Completion rate: {:.1}%", stats.completion_rate * 100.0);
    match stats.average_completion_duration {
        Some(avg) => println!("Average time to complete: {}", format_duration(avg)),
        None => println!("Average time to complete: n/a"),
    }
}
