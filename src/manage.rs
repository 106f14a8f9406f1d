//! Plain in-memory edits on [`NuGetConfig`], for callers that rewrite the
//! whole document with [`crate::serialize::to_xml`] instead of editing
//! surgically.

use crate::error::{ConfigError, Result};
use crate::model::{KeyValue, NuGetConfig, PackageSource, SourceCredential};

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::validation(format!("{what} must not be empty")));
    }
    Ok(())
}

impl NuGetConfig {
    /// Insert a source, or replace the one with the same key in place.
    /// Returns `true` when the source is new.
    pub fn add_or_update_source(&mut self, source: PackageSource) -> Result<bool> {
        require("source key", &source.key)?;
        require("source value", &source.value)?;

        match self.package_sources.iter_mut().find(|s| s.key == source.key) {
            Some(existing) => {
                *existing = source;
                Ok(false)
            }
            None => {
                self.package_sources.push(source);
                Ok(true)
            }
        }
    }

    /// Remove a source together with its credentials and disabled marker
    pub fn remove_source(&mut self, key: &str) -> Result<PackageSource> {
        let at = self
            .package_sources
            .iter()
            .position(|s| s.key == key)
            .ok_or_else(|| ConfigError::not_found(format!("package source `{key}`")))?;

        self.credentials.remove(key);
        self.disabled_sources.retain(|d| d.key != key);
        if self.active_source.as_ref().is_some_and(|a| a.key == key) {
            self.active_source = None;
        }
        Ok(self.package_sources.remove(at))
    }

    pub fn is_source_disabled(&self, key: &str) -> bool {
        self.disabled_sources
            .iter()
            .any(|d| d.key == key && d.value.eq_ignore_ascii_case("true"))
    }

    pub fn disable_source(&mut self, key: &str) -> Result<()> {
        if !self.has_source(key) {
            return Err(ConfigError::not_found(format!("package source `{key}`")));
        }
        match self.disabled_sources.iter_mut().find(|d| d.key == key) {
            Some(entry) => entry.value = "true".to_string(),
            None => self.disabled_sources.push(KeyValue::new(key, "true")),
        }
        Ok(())
    }

    /// Returns `true` if the source was disabled before
    pub fn enable_source(&mut self, key: &str) -> bool {
        let was_disabled = self.is_source_disabled(key);
        self.disabled_sources.retain(|d| d.key != key);
        was_disabled
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.key == key)
            .map(|o| o.value.as_str())
    }

    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        require("option key", key)?;
        match self.options.iter_mut().find(|o| o.key == key) {
            Some(option) => option.value = value.to_string(),
            None => self.options.push(KeyValue::new(key, value)),
        }
        Ok(())
    }

    pub fn remove_option(&mut self, key: &str) -> bool {
        let before = self.options.len();
        self.options.retain(|o| o.key != key);
        self.options.len() != before
    }

    pub fn set_credential(&mut self, source: &str, credential: SourceCredential) -> Result<()> {
        require("credential source", source)?;
        self.credentials.insert(source, credential);
        Ok(())
    }

    pub fn remove_credential(&mut self, source: &str) -> bool {
        self.credentials.remove(source).is_some()
    }

    pub fn set_active_source(&mut self, key: &str, value: &str) -> Result<()> {
        require("active source key", key)?;
        self.active_source = Some(KeyValue::new(key, value));
        Ok(())
    }
}
