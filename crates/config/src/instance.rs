// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! Loaded, thread-safe view over the configuration file.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::ConfigError;
use crate::regex_list::RegexList;
use crate::values::{SystemsDefault, Values, SCAN_MODE_HOLD, SCHEMA_VERSION};

pub const CFG_FILE: &str = "config.toml";
pub const CFG_ENV: &str = "ZAPAROO_CFG";
pub const APP_ENV: &str = "ZAPAROO_APP";

/// Thread-safe, reloadable configuration instance.
///
/// Mutations go through [`Instance::update`], which replaces the whole
/// `Values` under the write lock and re-derives the cached regex allow-lists
/// in the same critical section, so readers never observe a `Values`/allow-list
/// pair that didn't come from the same version.
pub struct Instance {
    cfg_path: PathBuf,
    app_path: Option<PathBuf>,
    inner: RwLock<Loaded>,
}

struct Loaded {
    values: Values,
    allow_execute: RegexList,
    allow_run: RegexList,
    allow_file: RegexList,
}

impl Loaded {
    fn from_values(values: Values) -> Self {
        let allow_execute = RegexList::compile(&values.zapscript.allow_execute);
        let allow_run = RegexList::compile(&values.service.allow_run);
        let allow_file = RegexList::compile(&values.launchers.allow_file);
        Self {
            values,
            allow_execute,
            allow_run,
            allow_file,
        }
    }
}

impl Instance {
    /// Load (or create) the config file under `config_dir`, unless
    /// `ZAPAROO_CFG` names an explicit path.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let cfg_path = match std::env::var(CFG_ENV) {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => config_dir.join(CFG_FILE),
        };
        let app_path = std::env::var(APP_ENV).ok().map(PathBuf::from);

        let values = if cfg_path.exists() {
            let content = std::fs::read_to_string(&cfg_path)?;
            let values: Values = toml::from_str(&content)?;
            if values.config_schema != SCHEMA_VERSION {
                return Err(ConfigError::SchemaMismatch {
                    found: values.config_schema,
                    expected: SCHEMA_VERSION,
                });
            }
            values
        } else {
            tracing::info!(path = %cfg_path.display(), "writing new default config");
            let values = Values::default();
            write_config(&cfg_path, &values)?;
            values
        };

        Ok(Self {
            cfg_path,
            app_path,
            inner: RwLock::new(Loaded::from_values(values)),
        })
    }

    pub fn cfg_path(&self) -> &Path {
        &self.cfg_path
    }

    pub fn app_path(&self) -> Option<&Path> {
        self.app_path.as_deref()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let guard = self.inner.read();
        write_config(&self.cfg_path, &guard.values)
    }

    /// Reload from disk, replacing the in-memory values and allow-lists.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(&self.cfg_path)?;
        let values: Values = toml::from_str(&content)?;
        if values.config_schema != SCHEMA_VERSION {
            return Err(ConfigError::SchemaMismatch {
                found: values.config_schema,
                expected: SCHEMA_VERSION,
            });
        }
        *self.inner.write() = Loaded::from_values(values);
        Ok(())
    }

    /// Apply `f` to a mutable copy of the values, then re-derive allow-lists
    /// and persist to disk.
    pub fn update(&self, f: impl FnOnce(&mut Values)) -> Result<(), ConfigError> {
        let mut guard = self.inner.write();
        let mut values = guard.values.clone();
        f(&mut values);
        write_config(&self.cfg_path, &values)?;
        *guard = Loaded::from_values(values);
        Ok(())
    }

    pub fn values(&self) -> Values {
        self.inner.read().values.clone()
    }

    pub fn hold_mode_enabled(&self) -> bool {
        self.inner.read().values.readers.scan.mode == SCAN_MODE_HOLD
    }

    pub fn auto_detect(&self) -> bool {
        self.inner.read().values.readers.auto_detect
    }

    pub fn exit_delay_secs(&self) -> f32 {
        self.inner.read().values.readers.scan.exit_delay
    }

    pub fn ignore_system(&self) -> Vec<String> {
        self.inner.read().values.readers.scan.ignore_system.clone()
    }

    pub fn readers_connect(&self) -> Vec<(String, String)> {
        self.inner
            .read()
            .values
            .readers
            .connect
            .iter()
            .map(|c| (c.driver.clone(), c.path.clone()))
            .collect()
    }

    pub fn api_port(&self) -> u16 {
        self.inner.read().values.service.api_port
    }

    pub fn device_id(&self) -> String {
        self.inner.read().values.service.device_id.clone()
    }

    pub fn debug_logging(&self) -> bool {
        self.inner.read().values.debug_logging
    }

    pub fn audio_feedback(&self) -> bool {
        self.inner.read().values.audio.scan_feedback
    }

    pub fn is_execute_allowed(&self, cmdline: &str) -> bool {
        self.inner.read().allow_execute.is_allowed(cmdline)
    }

    pub fn is_run_allowed(&self, text: &str) -> bool {
        self.inner.read().allow_run.is_allowed(text)
    }

    pub fn is_file_allowed(&self, path: &str) -> bool {
        self.inner.read().allow_file.is_allowed(path)
    }

    pub fn index_roots(&self) -> Vec<String> {
        self.inner.read().values.launchers.index_root.clone()
    }

    pub fn mapping_entries(&self) -> Vec<crate::values::MappingsEntry> {
        self.inner.read().values.mappings.entry.clone()
    }

    pub fn systems_default(&self) -> Vec<SystemsDefault> {
        self.inner.read().values.systems.default.clone()
    }

    pub fn lookup_system_defaults(&self, system_id: &str) -> Option<SystemsDefault> {
        self.inner
            .read()
            .values
            .systems
            .default
            .iter()
            .find(|d| d.system.eq_ignore_ascii_case(system_id))
            .cloned()
    }
}

fn write_config(path: &Path, values: &Values) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(values)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
