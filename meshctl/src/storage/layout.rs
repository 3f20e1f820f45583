//! Project layout

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Well-known paths inside a storefront project carrying an API Mesh.
///
/// The mesh working directory defaults to the project root; projects that
/// keep the mesh in a subdirectory override it.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Project root directory
    pub project_dir: PathBuf,

    /// Directory holding mesh.json and its sources
    pub mesh_dir: PathBuf,
}

impl ProjectLayout {
    /// Create a layout rooted at the given project directory
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let mesh_dir = project_dir.clone();
        Self {
            project_dir,
            mesh_dir,
        }
    }

    /// Override the mesh working directory
    pub fn with_mesh_dir(mut self, mesh_dir: impl Into<PathBuf>) -> Self {
        self.mesh_dir = mesh_dir.into();
        self
    }

    /// Get the mesh configuration file
    pub fn mesh_config_file(&self) -> File {
        File::new(self.mesh_dir.join("mesh.json"))
    }

    /// Get the directory of resolver sources referenced by mesh.json
    pub fn resolvers_dir(&self) -> Dir {
        Dir::new(self.mesh_dir.join("resolvers"))
    }

    /// Get the directory of additional GraphQL schema files
    pub fn schemas_dir(&self) -> Dir {
        Dir::new(self.mesh_dir.join("schemas"))
    }

    /// Get the environment file holding commerce endpoints and store codes
    pub fn env_file(&self) -> File {
        File::new(self.project_dir.join(".env"))
    }

    /// Get the metadata directory for meshctl state
    pub fn meta_dir(&self) -> Dir {
        Dir::new(self.project_dir.join(".meshctl"))
    }

    /// Get the record of the last verified deployment
    pub fn record_file(&self) -> File {
        File::new(self.project_dir.join(".meshctl").join("deploy.json"))
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.project_dir.join(".meshctl").join("settings.json"))
    }

    /// Get the logs directory
    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.project_dir.join(".meshctl").join("logs"))
    }
}
