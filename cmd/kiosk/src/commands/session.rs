//! Session file format.
//!
//! ```yaml
//! steps:
//!   - enroll:
//!       id: e-001
//!       name: Ada
//!       signature: { hash: "0f00ff..." }
//!   - check_in:
//!       image: captures/ada-0801.jpg
//!   - recognize:
//!       signature: { embedding: [0.12, -0.4, ...] }
//!   - remove: e-001
//!   - list
//! ```
//!
//! Image paths are relative to the session file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use kiosk_signature::Signature;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Enroll(EnrollStep),
    CheckIn(Probe),
    Recognize(Probe),
    Remove(String),
    List,
}

impl Step {
    pub fn op(&self) -> &'static str {
        match self {
            Step::Enroll(_) => "enroll",
            Step::CheckIn(_) => "check_in",
            Step::Recognize(_) => "recognize",
            Step::Remove(_) => "remove",
            Step::List => "list",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrollStep {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    #[serde(default)]
    pub signature: Option<Signature>,

    #[serde(default)]
    pub image: Option<PathBuf>,
}

impl EnrollStep {
    pub fn probe(&self) -> Probe {
        Probe {
            signature: self.signature.clone(),
            image: self.image.clone(),
        }
    }
}

/// Where a signature comes from: given inline, or generated from an image.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Probe {
    #[serde(default)]
    pub signature: Option<Signature>,

    #[serde(default)]
    pub image: Option<PathBuf>,
}

pub enum Input {
    Signature(Signature),
    Image(Vec<u8>),
}

impl Probe {
    /// Resolves the probe, reading images relative to `base`.
    pub fn input(&self, base: &Path) -> anyhow::Result<Input> {
        match (&self.signature, &self.image) {
            (Some(sig), None) => Ok(Input::Signature(sig.clone())),
            (None, Some(path)) => {
                let path = base.join(path);
                let data = std::fs::read(&path)
                    .map_err(|e| anyhow::anyhow!("read {}: {e}", path.display()))?;
                Ok(Input::Image(data))
            }
            (Some(_), Some(_)) => anyhow::bail!("step has both signature and image"),
            (None, None) => anyhow::bail!("step needs a signature or an image"),
        }
    }
}

impl Session {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read {}: {e}", path.display()))?;
        Ok(serde_yaml::from_str(&content)?)
    }
}
