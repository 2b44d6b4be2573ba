use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{ConfigError, Result};

/// Values read from `.env` and then `.env.<NODE_ENV>`, the latter overriding
/// the former. Neither overrides a variable already set in the process.
#[derive(Debug, Clone, Default)]
pub struct EnvFiles {
    values: HashMap<String, String>,
    loaded: Vec<PathBuf>,
}

impl EnvFiles {
    /// Reads the files under `dir`. `node_env` is the process value of
    /// `NODE_ENV`; when unset, the base file may supply it.
    pub fn read(dir: impl AsRef<Path>, node_env: Option<&str>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files = Self::default();

        files.merge(&dir.join(".env"))?;

        let node_env = node_env
            .map(str::to_string)
            .or_else(|| files.get("NODE_ENV").map(str::to_string))
            .filter(|name| !name.is_empty());

        if let Some(name) = node_env {
            files.merge(&dir.join(format!(".env.{name}")))?;
        }

        Ok(files)
    }

    fn merge(&mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Ok(());
        }

        let entries = dotenvy::from_path_iter(path).map_err(|err| env_file_error(path, err))?;
        for entry in entries {
            let (key, value) = entry.map_err(|err| env_file_error(path, err))?;
            self.values.insert(key, value);
        }

        self.loaded.push(path.to_path_buf());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn loaded(&self) -> &[PathBuf] {
        &self.loaded
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Exports file values that the process environment does not already
    /// define. Returns how many variables were set.
    pub fn apply(&self) -> usize {
        let mut applied = 0;
        for (key, value) in &self.values {
            if std::env::var_os(key).is_none() {
                std::env::set_var(key, value);
                applied += 1;
            }
        }
        applied
    }
}

fn env_file_error(path: &Path, err: dotenvy::Error) -> ConfigError {
    ConfigError::EnvFile {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Reads `.env` files from `dir` and exports them into the process
/// environment. Call before anything else reads configuration.
pub fn load_env_files(dir: impl AsRef<Path>) -> Result<EnvFiles> {
    let node_env = std::env::var("NODE_ENV").ok();
    let files = EnvFiles::read(dir, node_env.as_deref())?;
    files.apply();
    Ok(files)
}
