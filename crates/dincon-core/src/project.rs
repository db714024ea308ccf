//! Per-project files: the `.dincon.json` manifest and `.dincon_plan.json` plan

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::error::{DinconError, Result};
use crate::io::{atomic_write, atomic_write_new, read_optional};
use crate::plan::Plan;

pub const MANIFEST_FILE: &str = ".dincon.json";
pub const PLAN_FILE: &str = ".dincon_plan.json";

/// Record written once by `init`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub title: String,
    pub description: String,
}

/// A project directory holding the manifest and plan files
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn plan_path(&self) -> PathBuf {
        self.root.join(PLAN_FILE)
    }

    pub fn has_manifest(&self) -> bool {
        self.manifest_path().exists()
    }

    /// Write the manifest. Never replaces an existing one.
    pub fn create_manifest(&self, manifest: &ProjectManifest) -> Result<PathBuf> {
        let path = self.manifest_path();
        let json = serde_json::to_string_pretty(manifest)?;
        match atomic_write_new(&path, json.as_bytes()) {
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(DinconError::ManifestExists(MANIFEST_FILE.to_string()));
            }
            other => other?,
        }

        info!(path = %path.display(), title = %manifest.title, "Created project manifest");
        Ok(path)
    }

    pub fn load_manifest(&self) -> Result<Option<ProjectManifest>> {
        match read_optional(&self.manifest_path())? {
            Some(content) => Ok(Some(serde_json::from_str(&content)?)),
            None => Ok(None),
        }
    }

    /// Replace any previous plan
    pub fn save_plan(&self, plan: &Plan) -> Result<PathBuf> {
        let path = self.plan_path();
        atomic_write(&path, plan.to_json_pretty()?.as_bytes())?;

        info!(path = %path.display(), steps = plan.len(), "Saved plan");
        Ok(path)
    }

    pub fn load_plan(&self) -> Result<Plan> {
        let path = self.plan_path();
        let content = read_optional(&path)?.ok_or(DinconError::PlanNotFound)?;

        serde_json::from_str(&content).map_err(|source| DinconError::PlanMalformed {
            path: path.display().to_string(),
            source,
        })
    }
}
