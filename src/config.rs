//! Configuration documents consumed by the translator.
//!
//! Two documents are supported, both YAML (JSON is accepted as well, being a
//! YAML subset):
//!
//! - [`TemplateConfig`]: identity substitutions applied by the templating
//!   transform.
//! - [`CompatibilityOverrides`]: supplementary minimum-version entries merged
//!   over the built-in compatibility database.
//!
//! # Examples
//!
//! ```ignore
//! use ptx::config::TemplateConfig;
//!
//! let config = TemplateConfig::from_file("template.yaml")?;
//!
//! let yaml = r#"
//! workloadName: "{{ .Release.Name }}"
//! namespace: "{{ .Release.Namespace }}"
//! templateHash: "{{ .Values.templateHash }}"
//! ips:
//!   10.0.0.5: "{{ .Values.serviceIP }}"
//! ports:
//!   "8080": "{{ .Values.servicePort }}"
//! "#;
//! let config = TemplateConfig::from_yaml_str(yaml)?;
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Identity substitutions for re-templating a profile.
///
/// Immutable for the duration of one transform run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    /// Replaces the recorded workload name.
    #[serde(default)]
    pub workload_name: String,

    /// Replaces the recorded namespace.
    #[serde(default)]
    pub namespace: String,

    /// Replaces the recorded pod-template hash.
    #[serde(default)]
    pub template_hash: String,

    /// Literal IP address to placeholder.
    #[serde(default)]
    pub ips: BTreeMap<String, String>,

    /// Literal port number to placeholder.
    ///
    /// Keys must be decimal digits.
    #[serde(default)]
    pub ports: BTreeMap<String, String>,
}

/// Supplementary compatibility database entries.
///
/// Entries here replace built-in entries with the same name.
///
/// ```yaml
/// syscalls:
///   landlock_create_ruleset: "5.13"
/// capabilities:
///   CAP_BPF: "5.8"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityOverrides {
    #[serde(default)]
    pub syscalls: BTreeMap<String, String>,

    #[serde(default)]
    pub capabilities: BTreeMap<String, String>,
}

impl TemplateConfig {
    pub fn new(
        workload_name: impl Into<String>,
        namespace: impl Into<String>,
        template_hash: impl Into<String>,
    ) -> Self {
        Self {
            workload_name: workload_name.into(),
            namespace: namespace.into(),
            template_hash: template_hash.into(),
            ips: BTreeMap::new(),
            ports: BTreeMap::new(),
        }
    }

    /// Adds an IP substitution.
    pub fn with_ip(mut self, ip: impl Into<String>, placeholder: impl Into<String>) -> Self {
        self.ips.insert(ip.into(), placeholder.into());
        self
    }

    /// Adds a port substitution.
    pub fn with_port(mut self, port: impl Into<String>, placeholder: impl Into<String>) -> Self {
        self.ports.insert(port.into(), placeholder.into());
        self
    }

    /// Loads a template configuration from a YAML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The content does not match the expected schema
    /// - Validation fails
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template config: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid template config: {}", path.display()))
    }

    /// Parses and validates a template configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: TemplateConfig =
            serde_yaml::from_str(yaml).context("Failed to parse template configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Renders the configuration as pretty JSON, for diagnostics.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize template configuration")
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Any value contains a null byte
    /// - An IP or port key is empty
    /// - A port key is not a decimal number
    pub fn validate(&self) -> Result<()> {
        validate_value("workloadName", &self.workload_name)?;
        validate_value("namespace", &self.namespace)?;
        validate_value("templateHash", &self.template_hash)?;

        for (ip, placeholder) in &self.ips {
            validate_key(ip).with_context(|| format!("Invalid IP key: {:?}", ip))?;
            validate_value("ips", placeholder)?;
        }

        for (port, placeholder) in &self.ports {
            validate_key(port).with_context(|| format!("Invalid port key: {:?}", port))?;
            if !port.bytes().all(|b| b.is_ascii_digit()) {
                return Err(anyhow!("Port key must be numeric: {}", port));
            }
            validate_value("ports", placeholder)?;
        }

        if self.workload_name.is_empty() && self.template_hash.is_empty() {
            tracing::warn!("Template config sets neither workloadName nor templateHash");
        }

        Ok(())
    }

    /// Merges another configuration into this one.
    ///
    /// Non-empty scalar fields of `other` replace this configuration's
    /// values. IP and port maps are unioned, `other` winning on collisions.
    pub fn merge(&mut self, other: TemplateConfig) -> Result<()> {
        if !other.workload_name.is_empty() {
            self.workload_name = other.workload_name;
        }
        if !other.namespace.is_empty() {
            self.namespace = other.namespace;
        }
        if !other.template_hash.is_empty() {
            self.template_hash = other.template_hash;
        }
        self.ips.extend(other.ips);
        self.ports.extend(other.ports);

        self.validate()
    }
}

impl CompatibilityOverrides {
    /// Loads supplementary entries from a YAML or JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).with_context(|| {
            format!("Failed to read compatibility database: {}", path.display())
        })?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid compatibility database: {}", path.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let overrides: CompatibilityOverrides =
            serde_yaml::from_str(yaml).context("Failed to parse compatibility database")?;

        overrides.validate()?;

        Ok(overrides)
    }

    /// Rejects empty names. Unparseable versions are accepted here and
    /// reported by the filter when used.
    pub fn validate(&self) -> Result<()> {
        for name in self.syscalls.keys().chain(self.capabilities.keys()) {
            validate_key(name).with_context(|| format!("Invalid entry name: {:?}", name))?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.syscalls.is_empty() && self.capabilities.is_empty()
    }
}

fn validate_value(field: &str, value: &str) -> Result<()> {
    if value.contains('\0') {
        return Err(anyhow!("{} contains null bytes", field));
    }
    Ok(())
}

fn validate_key(key: &str) -> Result<()> {
    if key.contains('\0') {
        return Err(anyhow!("Key contains null bytes"));
    }

    if key.trim().is_empty() {
        return Err(anyhow!("Key cannot be empty"));
    }

    Ok(())
}
