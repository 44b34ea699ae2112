use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseProfile {
    pub key: String,
    pub name: String,
    pub default_beta: f64,
    pub default_gamma: f64,
    pub color: String,
}

impl DiseaseProfile {
    fn new(key: &str, name: &str, default_beta: f64, default_gamma: f64, color: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            default_beta,
            default_gamma,
            color: color.to_string(),
        }
    }

    pub fn r0(&self) -> f64 {
        self.default_beta / self.default_gamma
    }

    fn validate(&self) -> SimResult<()> {
        let reason = if self.key.trim().is_empty() {
            Some("key must not be empty".to_string())
        } else if !(self.default_beta.is_finite() && self.default_beta > 0.0) {
            Some(format!("default_beta must be positive, got {}", self.default_beta))
        } else if !(self.default_gamma.is_finite() && self.default_gamma > 0.0) {
            Some(format!(
                "default_gamma must be positive, got {}",
                self.default_gamma
            ))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(SimError::InvalidProfile {
                key: self.key.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

#[derive(Deserialize)]
struct Catalog {
    #[serde(default)]
    disease: Vec<DiseaseProfile>,
}

/// Read-only catalog of disease profiles, kept in insertion order.
#[derive(Debug, Clone)]
pub struct DiseaseRegistry {
    profiles: Vec<DiseaseProfile>,
}

impl DiseaseRegistry {
    pub fn new(profiles: Vec<DiseaseProfile>) -> SimResult<Self> {
        {
            let mut seen = HashSet::new();
            for profile in &profiles {
                profile.validate()?;
                if !seen.insert(profile.key.as_str()) {
                    return Err(SimError::InvalidProfile {
                        key: profile.key.clone(),
                        reason: "duplicate key".to_string(),
                    });
                }
            }
        }
        Ok(Self { profiles })
    }

    /// The built-in five-disease table.
    pub fn reference() -> Self {
        Self {
            profiles: vec![
                DiseaseProfile::new("covid19", "COVID-19", 0.3, 1.0 / 14.0, "blue"),
                DiseaseProfile::new("tuberculosis", "Tuberculosis", 0.2, 1.0 / 180.0, "red"),
                DiseaseProfile::new("ebola", "Ebola", 0.4, 1.0 / 21.0, "green"),
                DiseaseProfile::new("mpox", "Mpox", 0.2, 1.0 / 21.0, "purple"),
                DiseaseProfile::new("influenza", "Influenza", 0.4, 1.0 / 7.0, "orange"),
            ],
        }
    }

    /// Process-wide reference registry, built on first use.
    pub fn global() -> &'static DiseaseRegistry {
        static GLOBAL: OnceLock<DiseaseRegistry> = OnceLock::new();
        GLOBAL.get_or_init(DiseaseRegistry::reference)
    }

    pub fn from_toml_str(raw: &str) -> SimResult<Self> {
        let catalog: Catalog = toml::from_str(raw)?;
        Self::new(catalog.disease)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn lookup(&self, key: &str) -> SimResult<&DiseaseProfile> {
        self.profiles
            .iter()
            .find(|p| p.key == key)
            .ok_or_else(|| SimError::UnknownDisease {
                key: key.to_string(),
            })
    }

    pub fn list_all(&self) -> &[DiseaseProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for DiseaseRegistry {
    fn default() -> Self {
        Self::reference()
    }
}
