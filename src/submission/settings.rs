// Settings snapshot and the template & override store

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::errors::{Result, SubmitError};
use super::traits::TemplateSource;

/// Workflow toggles, read once when a workflow starts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Two-phase workflow: query formats before submitting
    pub format_selection: bool,
    /// Append the user's custom args to every request
    pub enable_custom_args: bool,
    /// Send the filename template as rename target
    pub file_renaming: bool,
    /// Allow choosing a server download directory
    pub path_overriding: bool,
}

/// Named argument template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTemplate {
    pub name: String,
    pub content: String,
}

/// Persisted template values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateStore {
    pub download_template: String,
    pub filename_template: String,
    pub custom_args: String,
    pub saved_templates: Vec<SavedTemplate>,
}

impl TemplateStore {
    /// Add a named template, replacing one with the same name
    pub fn save_template(&mut self, name: impl Into<String>, content: impl Into<String>) {
        let name = name.into();
        let content = content.into();
        match self.saved_templates.iter_mut().find(|t| t.name == name) {
            Some(existing) => existing.content = content,
            None => self.saved_templates.push(SavedTemplate { name, content }),
        }
    }

    pub fn remove_template(&mut self, name: &str) -> bool {
        let before = self.saved_templates.len();
        self.saved_templates.retain(|t| t.name != name);
        self.saved_templates.len() != before
    }

    /// Replace the custom args with a saved template's content
    pub fn apply_template(&mut self, name: &str) -> bool {
        match self.saved_templates.iter().find(|t| t.name == name) {
            Some(template) => {
                self.custom_args = template.content.clone();
                true
            }
            None => false,
        }
    }
}

impl TemplateSource for TemplateStore {
    fn download_template(&self) -> String {
        self.download_template.clone()
    }

    fn filename_template(&self) -> String {
        self.filename_template.clone()
    }

    fn custom_args(&self) -> String {
        self.custom_args.clone()
    }
}

/// Shared store that can be edited while a batch is running
impl TemplateSource for RwLock<TemplateStore> {
    fn download_template(&self) -> String {
        self.read()
            .unwrap_or_else(|e| e.into_inner())
            .download_template
            .clone()
    }

    fn filename_template(&self) -> String {
        self.read()
            .unwrap_or_else(|e| e.into_inner())
            .filename_template
            .clone()
    }

    fn custom_args(&self) -> String {
        self.read()
            .unwrap_or_else(|e| e.into_inner())
            .custom_args
            .clone()
    }
}

/// Everything persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub settings: Settings,
    pub templates: TemplateStore,
}

impl AppConfig {
    /// `<config dir>/webui-batch/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("webui-batch")
            .join("config.json")
    }

    /// Load from disk; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path).map_err(|e| config_error(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| config_error(path, e))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| config_error(path, e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| config_error(path, e))?;
        std::fs::write(path, format!("{json}\n")).map_err(|e| config_error(path, e))?;
        Ok(())
    }
}

fn config_error(path: &Path, err: impl std::fmt::Display) -> SubmitError {
    SubmitError::Config {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
