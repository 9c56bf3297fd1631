//! Static message templates.
//!
//! Each template file holds a single top-level `welcome` object. Built-in
//! copies are compiled into the binary; a template directory can override
//! either file.

use std::path::Path;

use serde::Deserialize;

use super::model::OnboardingMessage;
use crate::error::ConfigError;

pub const ONBOARDING_FILE: &str = "onboarding.json";
pub const SATELLITE_FILE: &str = "satellite.json";

const BUILTIN_ONBOARDING: &str = include_str!("../../templates/onboarding.json");
const BUILTIN_SATELLITE: &str = include_str!("../../templates/satellite.json");

#[derive(Deserialize)]
struct TemplateFile {
    welcome: OnboardingMessage,
}

/// The two messages the bot knows how to send.
#[derive(Debug, Clone)]
pub struct Templates {
    /// Checklist template merged with per-user state.
    pub welcome: OnboardingMessage,
    /// Fixed reply to `/satellite`.
    pub satellite: OnboardingMessage,
}

impl Templates {
    /// The compiled-in templates.
    pub fn builtin() -> Result<Self, ConfigError> {
        Ok(Self {
            welcome: parse(ONBOARDING_FILE, BUILTIN_ONBOARDING)?,
            satellite: parse(SATELLITE_FILE, BUILTIN_SATELLITE)?,
        })
    }

    /// Built-in templates, with any file present in `dir` taking precedence.
    pub fn load(dir: Option<&Path>) -> Result<Self, ConfigError> {
        let mut templates = Self::builtin()?;
        let Some(dir) = dir else {
            return Ok(templates);
        };

        if let Some(welcome) = read_override(dir, ONBOARDING_FILE)? {
            templates.welcome = welcome;
        }
        if let Some(satellite) = read_override(dir, SATELLITE_FILE)? {
            templates.satellite = satellite;
        }
        Ok(templates)
    }
}

fn read_override(dir: &Path, name: &str) -> Result<Option<OnboardingMessage>, ConfigError> {
    let path = dir.join(name);
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    tracing::info!(path = %path.display(), "Loaded template override");
    parse(name, &raw).map(Some)
}

fn parse(name: &str, raw: &str) -> Result<OnboardingMessage, ConfigError> {
    serde_json::from_str::<TemplateFile>(raw)
        .map(|file| file.welcome)
        .map_err(|e| ConfigError::Template {
            name: name.to_string(),
            reason: e.to_string(),
        })
}
