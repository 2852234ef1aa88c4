// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order, later entries override earlier ones:
//! `/etc/millwright/millwright.toml`, `~/.config/millwright/millwright.toml`,
//! `./millwright.toml`, then `MILLWRIGHT_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MillwrightConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/millwright/millwright.toml";

/// Configuration file name looked up in the working and user config directories.
pub const LOCAL_CONFIG_FILE: &str = "millwright.toml";

/// Sections addressable through `MILLWRIGHT_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: [&str; 6] = [
    "agent",
    "provider",
    "factory",
    "memory",
    "analytics",
    "gateway",
];

/// `~/.config/millwright/millwright.toml`, when a user config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("millwright").join(LOCAL_CONFIG_FILE))
}

/// Loads configuration from the standard file hierarchy plus environment.
pub fn load_config() -> Result<MillwrightConfig, figment::Error> {
    build_figment().extract()
}

/// Loads configuration from an inline TOML document only.
///
/// No files or environment variables are consulted.
pub fn load_config_from_str(toml_content: &str) -> Result<MillwrightConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MillwrightConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Loads configuration from one explicit file, still honoring environment overrides.
pub fn load_config_from_path(path: &Path) -> Result<MillwrightConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MillwrightConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full hierarchy as an unextracted Figment, for callers that want metadata.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(MillwrightConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Maps `MILLWRIGHT_FACTORY_DATA_START` to `factory.data_start`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that contain underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("MILLWRIGHT_").map(|key| {
        let key = key.as_str();
        ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key.to_string())
            .into()
    })
}
