//! Translation pipeline: parse, transform, serialize.
//!
//! The [`Translator`] owns the format registry and the compatibility filter
//! and exposes the three pipeline stages separately so callers can compose
//! them, plus [`Translator::translate`] which runs them in order.
//!
//! # Pipeline
//!
//! 1. **Parse**: the input format adapter builds an [`ApplicationProfile`]
//! 2. **Transform** (optional): templating, then kernel filtering
//! 3. **Serialize**: the output format adapter renders the profile
//!
//! Nothing is returned until every stage has succeeded, so callers that
//! persist the result never write partial output.
//!
//! # Example
//!
//! ```
//! use ptx::compat::CompatibilityDatabase;
//! use ptx::translator::{TranslateOptions, Translator};
//!
//! # fn main() -> anyhow::Result<()> {
//! let translator = Translator::new(CompatibilityDatabase::builtin());
//!
//! let raw = b"apiVersion: v1\nkind: ApplicationProfile\nmetadata:\n  name: demo\nspec:\n  containers:\n  - name: app\n    syscalls: [read, clone3]\n";
//! let options = TranslateOptions {
//!     target_kernel: Some("5.0".to_string()),
//!     ..TranslateOptions::default()
//! };
//!
//! let output = translator.translate(raw, &options)?;
//! assert!(!String::from_utf8(output)?.contains("clone3"));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::compat::{CompatWarning, CompatibilityDatabase, CompatibilityFilter, KernelVersion};
use crate::config::TemplateConfig;
use crate::error::ProfileError;
use crate::format::{FormatRegistry, Operation, ProfileFormat};
use crate::profile::ApplicationProfile;
use crate::template::Templater;

/// Everything one translation run needs besides the input bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Input format tag (case-insensitive).
    pub input_format: String,

    /// Output format tag (case-insensitive).
    pub output_format: String,

    /// Identity substitutions; templating is skipped when `None`.
    pub template: Option<TemplateConfig>,

    /// Kernel the profile was recorded on. Only used for diagnostics.
    pub source_kernel: Option<String>,

    /// Kernel the profile will be replayed on; filtering is skipped when
    /// `None`.
    pub target_kernel: Option<String>,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            input_format: ProfileFormat::Kubescape.to_string(),
            output_format: ProfileFormat::Kubescape.to_string(),
            template: None,
            source_kernel: None,
            target_kernel: None,
        }
    }
}

/// Parses, transforms and serializes application profiles.
///
/// Holds no per-run state; one instance can serve any number of runs.
#[derive(Debug)]
pub struct Translator {
    registry: FormatRegistry,
    filter: CompatibilityFilter,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(CompatibilityDatabase::builtin())
    }
}

impl Translator {
    /// Creates a translator with every built-in format adapter.
    pub fn new(database: CompatibilityDatabase) -> Self {
        Self::with_registry(FormatRegistry::with_builtin(), database)
    }

    /// Creates a translator with a custom adapter registry.
    pub fn with_registry(registry: FormatRegistry, database: CompatibilityDatabase) -> Self {
        Self {
            registry,
            filter: CompatibilityFilter::new(Arc::new(database)),
        }
    }

    /// Parses `raw` with the adapter registered for `format`.
    ///
    /// # Errors
    ///
    /// [`ProfileError::Input`] or [`ProfileError::UnsupportedFormat`].
    pub fn parse(&self, format: &str, raw: &[u8]) -> Result<ApplicationProfile, ProfileError> {
        tracing::info!("Parsing {} profile ({} bytes)", format, raw.len());
        self.registry.parse(format, raw)
    }

    /// Applies the optional transform stages.
    ///
    /// With a template, the profile is templated and, if `target_kernel` is
    /// given, filtered as the template's last step. Without one, only the
    /// kernel filter runs. Compatibility anomalies never fail the run; they
    /// are returned next to the profile.
    pub fn transform(
        &self,
        mut profile: ApplicationProfile,
        template: Option<&TemplateConfig>,
        target_kernel: Option<&str>,
    ) -> (ApplicationProfile, Vec<CompatWarning>) {
        let warnings = match (template, target_kernel) {
            (Some(config), Some(kernel)) => Templater::new(config)
                .with_kernel_filter(&self.filter, kernel)
                .apply_with_warnings(&mut profile),
            (Some(config), None) => Templater::new(config).apply_with_warnings(&mut profile),
            (None, Some(kernel)) => self.filter.apply_to_profile(&mut profile, kernel),
            (None, None) => {
                tracing::debug!("No transform requested");
                Vec::new()
            }
        };
        (profile, warnings)
    }

    /// Serializes `profile` with the adapter registered for `format`.
    ///
    /// # Errors
    ///
    /// [`ProfileError::Serialize`] or [`ProfileError::UnsupportedFormat`].
    pub fn serialize(
        &self,
        format: &str,
        profile: ApplicationProfile,
    ) -> Result<Vec<u8>, ProfileError> {
        tracing::info!("Serializing profile '{}' as {}", profile.metadata.name, format);
        self.registry.serialize(format, &profile)
    }

    /// Runs the whole pipeline on `raw`.
    ///
    /// The output adapter is resolved before any work is done, so an
    /// unsupported output format fails fast.
    pub fn translate(
        &self,
        raw: &[u8],
        options: &TranslateOptions,
    ) -> Result<Vec<u8>, ProfileError> {
        self.registry
            .resolve(&options.output_format, Operation::Serialize)?;

        if let (Some(source), Some(target)) = (&options.source_kernel, &options.target_kernel) {
            warn_on_downgrade(source, target);
        }

        let profile = self.parse(&options.input_format, raw)?;
        let (profile, warnings) = self.transform(
            profile,
            options.template.as_ref(),
            options.target_kernel.as_deref(),
        );
        if !warnings.is_empty() {
            tracing::info!(
                "Translation continued past {} compatibility warning(s)",
                warnings.len()
            );
        }
        self.serialize(&options.output_format, profile)
    }
}

/// Logs when the target kernel is older than the source kernel, since
/// that is when filtering can drop behavior.
fn warn_on_downgrade(source: &str, target: &str) {
    match (KernelVersion::parse(source), KernelVersion::parse(target)) {
        (Ok(source), Ok(target)) if target < source => {
            tracing::warn!(
                "Target kernel {} is older than source kernel {}; syscalls introduced in between will be removed",
                target,
                source
            );
        }
        (Err(e), _) => {
            tracing::warn!("Ignoring source kernel: {}", e);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &[u8] = br#"
apiVersion: spdx.softwarecomposition.kubescape.io/v1beta1
kind: ApplicationProfile
metadata:
  name: myapp-abc123
  namespace: dev
  labels:
    kubescape.io/workload-name: myapp
    kubescape.io/instance-template-hash: abc123
spec:
  containers:
    - name: app
      endpoints:
        - direction: outbound
          endpoint: "10.0.0.5:8080"
      syscalls: [setns, clone3, read]
status:
  opaque: [1, 2, 3]
"#;

    fn translator() -> Translator {
        Translator::default()
    }

    #[test]
    fn test_parse_and_serialize_without_transform() {
        let translator = translator();
        let profile = translator.parse("kubescape", PROFILE).unwrap();
        let (untouched, warnings) = translator.transform(profile.clone(), None, None);
        assert_eq!(untouched, profile);
        assert!(warnings.is_empty());

        let bytes = translator.serialize("kubescape", untouched).unwrap();
        let reparsed = translator.parse("kubescape", &bytes).unwrap();
        assert_eq!(reparsed, profile);
    }

    #[test]
    fn test_transform_filter_only() {
        let translator = translator();
        let profile = translator.parse("kubescape", PROFILE).unwrap();
        let (profile, _) = translator.transform(profile, None, Some("5.0"));

        assert_eq!(profile.spec.containers[0].syscalls, vec!["read", "setns"]);
        assert_eq!(profile.metadata.name, "myapp-abc123");
    }

    #[test]
    fn test_transform_template_and_filter() {
        let translator = translator();
        let config = TemplateConfig::new("svc", "prod", "xyz789")
            .with_ip("10.0.0.5", "{{.ServiceIP}}")
            .with_port("8080", "{{.ServicePort}}");

        let profile = translator.parse("kubescape", PROFILE).unwrap();
        let (profile, _) = translator.transform(profile, Some(&config), Some("5.0"));

        assert_eq!(profile.metadata.name, "svc-xyz789");
        assert_eq!(
            profile.spec.containers[0].endpoints[0].endpoint,
            "{{.ServiceIP}}:{{.ServicePort}}"
        );
        assert_eq!(profile.spec.containers[0].syscalls, vec!["read", "setns"]);
    }

    #[test]
    fn test_transform_template_without_kernel_keeps_syscalls() {
        let translator = translator();
        let config = TemplateConfig::new("svc", "prod", "xyz789");
        let profile = translator.parse("kubescape", PROFILE).unwrap();
        let (profile, _) = translator.transform(profile, Some(&config), None);
        assert_eq!(
            profile.spec.containers[0].syscalls,
            vec!["setns", "clone3", "read"]
        );
    }

    #[test]
    fn test_invalid_kernel_keeps_profile() {
        let translator = translator();
        let profile = translator.parse("kubescape", PROFILE).unwrap();
        let (filtered, warnings) =
            translator.transform(profile.clone(), None, Some("invalid-version"));
        assert_eq!(filtered, profile);
        assert_eq!(
            warnings,
            vec![CompatWarning::InvalidTargetVersion {
                version: "invalid-version".to_string(),
            }]
        );
    }

    #[test]
    fn test_translate_to_seccomp() {
        let options = TranslateOptions {
            output_format: "seccomp".to_string(),
            target_kernel: Some("5.0".to_string()),
            ..TranslateOptions::default()
        };
        let output = translator().translate(PROFILE, &options).unwrap();
        let document: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(
            document["syscalls"][0]["names"],
            serde_json::json!(["read", "setns"])
        );
    }

    #[test]
    fn test_translate_unsupported_output_fails_before_work() {
        let options = TranslateOptions {
            output_format: "neuvector".to_string(),
            ..TranslateOptions::default()
        };
        // Malformed input proves the output format is checked first.
        let err = translator().translate(b"::::", &options).unwrap_err();
        assert_eq!(err.to_string(), "neuvector output not implemented");
    }

    #[test]
    fn test_translate_unsupported_input() {
        let options = TranslateOptions {
            input_format: "apparmor".to_string(),
            ..TranslateOptions::default()
        };
        let err = translator().translate(PROFILE, &options).unwrap_err();
        assert!(err.is_unsupported_format());
        assert_eq!(err.to_string(), "apparmor parsing not implemented");
    }

    #[test]
    fn test_translate_malformed_input() {
        let err = translator()
            .translate(b"kind: [", &TranslateOptions::default())
            .unwrap_err();
        assert!(matches!(err, ProfileError::Input { .. }));
    }

    #[test]
    fn test_status_passes_through() {
        let output = translator()
            .translate(PROFILE, &TranslateOptions::default())
            .unwrap();
        let value: serde_yaml::Value = serde_yaml::from_slice(&output).unwrap();
        assert_eq!(
            value["status"]["opaque"],
            serde_yaml::from_str::<serde_yaml::Value>("[1, 2, 3]").unwrap()
        );
    }

    #[test]
    fn test_custom_database() {
        let database = CompatibilityDatabase::from_tables([("read", "9.0")], Vec::new());
        let translator = Translator::new(database);
        let profile = translator.parse("kubescape", PROFILE).unwrap();
        let (profile, _) = translator.transform(profile, None, Some("6.1"));
        assert_eq!(profile.spec.containers[0].syscalls, vec!["clone3", "setns"]);
    }
}
