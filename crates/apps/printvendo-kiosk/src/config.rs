//! CLI configuration loaded from TOML.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Expand environment variables in a string.
/// Supports `${VAR_NAME}` syntax.
fn expand_env_vars(input: &str) -> String {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .to_string()
}

/// Top-level kiosk configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KioskConfig {
    /// This kiosk's identity.
    pub machine: MachineSection,
    /// Mailbox store connection.
    pub drive: DriveSection,
    /// Completion service connection.
    pub completion: CompletionSection,
    /// Pricing overrides.
    pub pricing: PricingSection,
}

/// Kiosk identity section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MachineSection {
    /// Machine id; may be overridden with `--machine`.
    pub id: String,
}

/// Mailbox store section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveSection {
    /// Folder holding all machine folders.
    pub root_folder_id: String,
    /// OAuth bearer token; `${ENV_VAR}` syntax is expanded.
    pub access_token: String,
    /// Metadata API base override.
    pub api_base: Option<String>,
    /// Upload API base override.
    pub upload_base: Option<String>,
}

impl Default for DriveSection {
    fn default() -> Self {
        Self {
            root_folder_id: String::new(),
            access_token: "${PRINTVENDO_DRIVE_TOKEN}".to_string(),
            api_base: None,
            upload_base: None,
        }
    }
}

/// Completion service section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSection {
    /// API key; `${ENV_VAR}` syntax is expanded.
    pub api_key: String,
    /// Endpoint base override.
    pub base_url: Option<String>,
    /// Model name.
    pub model: String,
}

impl Default for CompletionSection {
    fn default() -> Self {
        Self {
            api_key: "${PRINTVENDO_COMPLETION_KEY}".to_string(),
            base_url: None,
            model: "gpt-3.5-turbo".to_string(),
        }
    }
}

/// Pricing overrides section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSection {
    /// Markup multiplier.
    pub markup: f64,
    /// USD conversion rate.
    pub fx_rate: f64,
}

impl Default for PricingSection {
    fn default() -> Self {
        Self {
            markup: printvendo_types::constants::COST_MARKUP,
            fx_rate: printvendo_types::constants::USD_TO_LOCAL_RATE,
        }
    }
}

impl KioskConfig {
    /// Load a config file, expanding `${ENV_VAR}` references.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config {}: {e}", path.display()))?;
        let expanded = expand_env_vars(&raw);
        let config: Self = toml::from_str(&expanded)
            .map_err(|e| anyhow::anyhow!("cannot parse config {}: {e}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_parse_from_empty() {
        let config: KioskConfig = toml::from_str("").unwrap();
        assert_eq!(config.completion.model, "gpt-3.5-turbo");
        assert_eq!(config.pricing.markup, 20.0);
    }

    #[test]
    fn test_load_expands_env_vars() {
        std::env::set_var("PRINTVENDO_TEST_TOKEN", "sekrit");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[machine]\nid = \"kiosk-07\"\n\n[drive]\nroot_folder_id = \"root123\"\naccess_token = \"${{PRINTVENDO_TEST_TOKEN}}\"\n"
        )
        .unwrap();

        let config = KioskConfig::load(file.path()).unwrap();
        assert_eq!(config.machine.id, "kiosk-07");
        assert_eq!(config.drive.access_token, "sekrit");
    }

    #[test]
    fn test_unset_env_var_is_left_verbatim() {
        let expanded = expand_env_vars("${PRINTVENDO_DEFINITELY_UNSET_VAR}");
        assert_eq!(expanded, "${PRINTVENDO_DEFINITELY_UNSET_VAR}");
    }
}
