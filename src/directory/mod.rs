//! Project directory
//!
//! Resolves a project to the users subscribed to it. The relay only reads
//! from the directory; every lookup is a point-in-time snapshot and the
//! publisher does not cache results between calls.

pub mod table;

use serde::{Deserialize, Serialize};

use crate::ids::{ProjectId, UserId};

pub use table::StaticDirectory;

/// Subscriber lookup for a project
pub trait ProjectDirectory: Send + Sync {
    /// Ordered subscriber list for `project_id`, or `None` if the project is unknown
    fn lookup(&self, project_id: ProjectId) -> Option<Vec<UserId>>;
}

/// A project and the users subscribed to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,

    /// Display name, not used for routing
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub subscribers: Vec<UserId>,
}

impl Project {
    pub fn new(id: impl Into<ProjectId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subscribers: Vec::new(),
        }
    }

    /// Add a subscriber, ignoring duplicates
    pub fn subscriber(mut self, user_id: impl Into<UserId>) -> Self {
        let user_id = user_id.into();
        if !self.subscribers.contains(&user_id) {
            self.subscribers.push(user_id);
        }
        self
    }
}

/// Error loading a directory table
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("failed to read project file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed project file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("project {0} is defined more than once")]
    DuplicateProject(ProjectId),
}
