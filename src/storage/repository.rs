//! Persistence contract between the session and a storage backend
//!
//! Loads and saves run as tracked operations, so failures surface through
//! the session's `error_message` as well as the returned error.

use anyhow::Result;

use crate::domain::Task;
use crate::state::Session;

/// A backend that can load and save an ordered task collection
pub trait TaskRepository {
    fn load(&self) -> Result<Vec<Task>>;

    fn save(&self, tasks: &[Task]) -> Result<()>;
}

/// Loads `repo` into `session` as a `load` operation
pub fn load_into(session: &mut Session, repo: &impl TaskRepository) -> Result<()> {
    let ticket = session.begin("load");

    match repo.load() {
        Ok(tasks) => {
            session.succeed(&ticket, Some(tasks));
            Ok(())
        }
        Err(e) => {
            session.fail(&ticket, format!("{:#}", e));
            Err(e)
        }
    }
}

/// Saves the session's tasks to `repo` as a `save` operation
pub fn save_from(session: &mut Session, repo: &impl TaskRepository) -> Result<()> {
    let ticket = session.begin("save");

    match repo.save(session.state().tasks()) {
        Ok(()) => {
            session.succeed(&ticket, None);
            Ok(())
        }
        Err(e) => {
            session.fail(&ticket, format!("{:#}", e));
            Err(e)
        }
    }
}
