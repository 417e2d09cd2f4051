//! In-memory project table

use std::collections::HashMap;
use std::path::Path;

use super::{DirectoryError, Project, ProjectDirectory};
use crate::ids::{ProjectId, UserId};

/// Fixed project table held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    projects: HashMap<ProjectId, Project>,
}

impl StaticDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// The two demo projects the relay ships with
    pub fn builtin() -> Self {
        let projects = [
            Project::new(1, "fastandfearuos").subscriber(1).subscriber(2),
            Project::new(2, "tokyodrift").subscriber(3).subscriber(4),
        ];

        let mut directory = Self::new();
        for project in projects {
            directory.projects.insert(project.id, project);
        }
        directory
    }

    /// Build a directory from a list of projects
    ///
    /// Subscriber lists are de-duplicated, keeping the first occurrence.
    pub fn from_projects<I>(projects: I) -> Result<Self, DirectoryError>
    where
        I: IntoIterator<Item = Project>,
    {
        let mut directory = Self::new();
        for project in projects {
            if directory.projects.contains_key(&project.id) {
                return Err(DirectoryError::DuplicateProject(project.id));
            }
            directory.projects.insert(project.id, dedup(project));
        }
        Ok(directory)
    }

    /// Parse a JSON array of projects
    pub fn from_json_str(json: &str) -> Result<Self, DirectoryError> {
        let projects: Vec<Project> =
            serde_json::from_str(json).map_err(|source| DirectoryError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;
        Self::from_projects(projects)
    }

    /// Load a JSON array of projects from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let json = std::fs::read_to_string(path).map_err(|source| DirectoryError::Read {
            path: display.clone(),
            source,
        })?;
        let projects: Vec<Project> =
            serde_json::from_str(&json).map_err(|source| DirectoryError::Parse {
                path: display,
                source,
            })?;
        Self::from_projects(projects)
    }

    /// Get a project by ID
    pub fn project(&self, project_id: ProjectId) -> Option<&Project> {
        self.projects.get(&project_id)
    }

    /// Number of projects
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

impl ProjectDirectory for StaticDirectory {
    fn lookup(&self, project_id: ProjectId) -> Option<Vec<UserId>> {
        self.projects
            .get(&project_id)
            .map(|project| project.subscribers.clone())
    }
}

fn dedup(mut project: Project) -> Project {
    let mut seen = Vec::with_capacity(project.subscribers.len());
    project.subscribers.retain(|id| {
        if seen.contains(id) {
            false
        } else {
            seen.push(*id);
            true
        }
    });
    project
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let directory = StaticDirectory::builtin();

        assert_eq!(directory.len(), 2);
        assert_eq!(
            directory.lookup(ProjectId(1)),
            Some(vec![UserId(1), UserId(2)])
        );
        assert_eq!(
            directory.lookup(ProjectId(2)),
            Some(vec![UserId(3), UserId(4)])
        );
        assert_eq!(directory.project(ProjectId(2)).unwrap().name, "tokyodrift");
    }

    #[test]
    fn test_unknown_project() {
        let directory = StaticDirectory::builtin();
        assert_eq!(directory.lookup(ProjectId(99)), None);
    }

    #[test]
    fn test_subscribers_deduplicated_in_order() {
        let project = Project {
            id: ProjectId(5),
            name: "dupes".into(),
            subscribers: vec![UserId(3), UserId(1), UserId(3), UserId(2), UserId(1)],
        };
        let directory = StaticDirectory::from_projects([project]).unwrap();

        assert_eq!(
            directory.lookup(ProjectId(5)),
            Some(vec![UserId(3), UserId(1), UserId(2)])
        );
    }

    #[test]
    fn test_duplicate_project_rejected() {
        let result = StaticDirectory::from_projects([Project::new(1, "a"), Project::new(1, "b")]);
        assert!(matches!(
            result,
            Err(DirectoryError::DuplicateProject(ProjectId(1)))
        ));
    }

    #[test]
    fn test_from_json() {
        let directory = StaticDirectory::from_json_str(
            r#"[
                {"id": 10, "name": "alpha", "subscribers": [1, 2, 3]},
                {"id": 11, "subscribers": []}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            directory.lookup(ProjectId(10)),
            Some(vec![UserId(1), UserId(2), UserId(3)])
        );
        assert_eq!(directory.lookup(ProjectId(11)), Some(vec![]));
        assert_eq!(directory.project(ProjectId(11)).unwrap().name, "");
    }

    #[test]
    fn test_from_json_malformed() {
        let result = StaticDirectory::from_json_str(r#"{"id": 1}"#);
        assert!(matches!(result, Err(DirectoryError::Parse { .. })));
    }

    #[test]
    fn test_from_json_file_missing() {
        let result = StaticDirectory::from_json_file("/nonexistent/projects.json");
        assert!(matches!(result, Err(DirectoryError::Read { .. })));
    }
}
