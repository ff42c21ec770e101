//! Protected directory denylist

use compaction::{DirectoryDecision, DirectoryPolicy};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::PolicyConfig;

/// Directory names that are never descended into (compared lowercased)
const PROTECTED_NAMES: &[&str] = &[
    "windows",
    "$recycle.bin",
    "system volume information",
    "recovery",
    "$windows.~bt",
    "$windows.~ws",
    ".git",
];

/// Prefix matched against lowercased names, covers "Program Files (x86)"
const PROGRAM_FILES_PREFIX: &str = "program files";

#[cfg(unix)]
const PROTECTED_PATHS: &[&str] = &["/proc", "/sys", "/dev", "/run"];

#[cfg(not(unix))]
const PROTECTED_PATHS: &[&str] = &[];

/// Denies system and version-control directories plus configured ones
pub struct SystemDirectoryPolicy {
    names: HashSet<String>,
    paths: Vec<PathBuf>,
}

impl SystemDirectoryPolicy {
    pub fn new(config: &PolicyConfig) -> Self {
        let names = PROTECTED_NAMES
            .iter()
            .map(|name| (*name).to_string())
            .chain(config.exclude_names.iter().map(|name| name.to_lowercase()))
            .collect();
        let paths = PROTECTED_PATHS
            .iter()
            .map(PathBuf::from)
            .chain(config.exclude_paths.iter().cloned())
            .collect();

        Self { names, paths }
    }
}

impl DirectoryPolicy for SystemDirectoryPolicy {
    fn evaluate(&self, directory: &Path) -> DirectoryDecision {
        if let Some(path) = self.paths.iter().find(|p| directory.starts_with(p)) {
            return DirectoryDecision::deny(format!("Protected path {}", path.display()));
        }

        let Some(name) = directory.file_name() else {
            return DirectoryDecision::allow();
        };
        let name = name.to_string_lossy().to_lowercase();

        if name.starts_with(PROGRAM_FILES_PREFIX) || self.names.contains(&name) {
            DirectoryDecision::deny("Excluded system directory")
        } else {
            DirectoryDecision::allow()
        }
    }
}
