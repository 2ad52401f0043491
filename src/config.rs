//! Workspace configuration, read from `rapotd.toml` next to the database.
//! Every key is optional.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "rapotd.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub school: SchoolConfig,
    pub documents: DocumentConfig,
    pub verify: VerifyConfig,
    pub payments: PaymentConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchoolConfig {
    pub name: String,
    pub city: String,
}

impl Default for SchoolConfig {
    fn default() -> Self {
        SchoolConfig {
            name: "Learning Center".to_string(),
            city: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub scale: f32,
    pub export_dir: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        DocumentConfig {
            scale: 2.0,
            export_dir: "exports".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub base_url: Option<String>,
}

impl VerifyConfig {
    pub fn link_for(&self, report_id: &str) -> Option<String> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}?id={}", base.trim_end_matches('?'), report_id))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub max_receipt_bytes: usize,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        PaymentConfig {
            max_receipt_bytes: 2 * 1024 * 1024,
        }
    }
}

pub fn parse_config(raw: &str) -> anyhow::Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(raw).context("invalid rapotd.toml")?;
    if !(cfg.documents.scale > 0.0 && cfg.documents.scale <= 4.0) {
        anyhow::bail!("documents.scale must be in (0, 4]");
    }
    Ok(cfg)
}

/// Missing file means defaults.
pub fn load_workspace_config(workspace: &Path) -> anyhow::Result<AppConfig> {
    let path = workspace.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Ok(AppConfig::default());
    }
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
    parse_config(&raw)
}
