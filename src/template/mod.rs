//! Identity templating: rewrites instance-bound strings of a profile so it
//! can be replayed against a different workload, namespace or address.
//!
//! The source identity is read from the profile itself: the workload name
//! and template hash from the [`WORKLOAD_NAME_LABEL`] and
//! [`TEMPLATE_HASH_LABEL`] labels, the namespace from metadata.
//!
//! # Replacement order
//!
//! Substitution is plain substring replacement and therefore order
//! sensitive. The order is fixed: workload name, then template hash, then
//! namespace. In `metadata.name` only the first occurrence of each token is
//! replaced, after the previous replacement has been applied. If the new
//! workload name itself contains the old template hash, the hash
//! replacement hits the new name first.
//!
//! Empty source tokens (missing labels) are skipped.
//!
//! # Example
//!
//! ```
//! use ptx::config::TemplateConfig;
//! use ptx::template::Templater;
//! # use ptx::format::{FormatAdapter, KubescapeAdapter};
//!
//! # fn main() -> anyhow::Result<()> {
//! # let yaml = "apiVersion: v1\nkind: ApplicationProfile\nmetadata:\n  name: myapp-abc123\n  namespace: dev\n  labels:\n    kubescape.io/workload-name: myapp\n    kubescape.io/instance-template-hash: abc123\n";
//! # let mut profile = KubescapeAdapter.parse(yaml.as_bytes())?;
//! let config = TemplateConfig::new("svc", "prod", "xyz789");
//! Templater::new(&config).apply(&mut profile);
//!
//! assert_eq!(profile.metadata.name, "svc-xyz789");
//! assert_eq!(profile.metadata.namespace, "prod");
//! # Ok(())
//! # }
//! ```
//!
//! [`WORKLOAD_NAME_LABEL`]: crate::profile::WORKLOAD_NAME_LABEL
//! [`TEMPLATE_HASH_LABEL`]: crate::profile::TEMPLATE_HASH_LABEL

use std::collections::BTreeMap;

use crate::compat::{CompatWarning, CompatibilityFilter};
use crate::config::TemplateConfig;
use crate::profile::{ApplicationProfile, Endpoint};
use crate::utils::substitute::{replace_all, replace_first, IpSubstitution, PortSubstitution};

/// Identity tokens recorded in the source profile.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceIdentity {
    workload_name: String,
    template_hash: String,
    namespace: String,
}

impl SourceIdentity {
    fn of(profile: &ApplicationProfile) -> Self {
        Self {
            workload_name: profile.workload_name().to_string(),
            template_hash: profile.template_hash().to_string(),
            namespace: profile.metadata.namespace.clone(),
        }
    }
}

/// Applies a [`TemplateConfig`] to profiles.
#[derive(Debug, Clone)]
pub struct Templater<'a> {
    config: &'a TemplateConfig,
    ips: Vec<IpSubstitution>,
    ports: Vec<PortSubstitution>,
    kernel_filter: Option<(&'a CompatibilityFilter, &'a str)>,
}

impl<'a> Templater<'a> {
    /// Prepares a templater for `config`.
    ///
    /// IP and port entries that cannot be prepared are logged and skipped.
    pub fn new(config: &'a TemplateConfig) -> Self {
        let ips = config
            .ips
            .iter()
            .filter_map(|(ip, placeholder)| match IpSubstitution::new(ip, placeholder) {
                Ok(substitution) => Some(substitution),
                Err(e) => {
                    tracing::warn!("Skipping IP substitution for '{}': {:#}", ip, e);
                    None
                }
            })
            .collect();

        let ports = config
            .ports
            .iter()
            .filter_map(|(port, placeholder)| match PortSubstitution::new(port, placeholder) {
                Ok(substitution) => Some(substitution),
                Err(e) => {
                    tracing::warn!("Skipping port substitution for '{}': {:#}", port, e);
                    None
                }
            })
            .collect();

        Self {
            config,
            ips,
            ports,
            kernel_filter: None,
        }
    }

    /// Also filters syscalls and capabilities for `target_kernel` as the last
    /// templating step.
    pub fn with_kernel_filter(mut self, filter: &'a CompatibilityFilter, target_kernel: &'a str) -> Self {
        self.kernel_filter = Some((filter, target_kernel));
        self
    }

    /// Rewrites `profile` in place and returns it for chaining.
    ///
    /// Never changes the number of containers, endpoints, annotations or
    /// labels, nor `apiVersion`/`kind`. Kernel filter diagnostics are only
    /// logged; use [`Templater::apply_with_warnings`] to collect them.
    pub fn apply<'p>(&self, profile: &'p mut ApplicationProfile) -> &'p mut ApplicationProfile {
        self.apply_with_warnings(profile);
        profile
    }

    /// Rewrites `profile` in place and returns the kernel filter
    /// diagnostics, empty when no kernel filter is set.
    pub fn apply_with_warnings(&self, profile: &mut ApplicationProfile) -> Vec<CompatWarning> {
        let source = SourceIdentity::of(profile);
        tracing::info!(
            "Templating profile '{}' (workload '{}', hash '{}', namespace '{}')",
            profile.metadata.name,
            source.workload_name,
            source.template_hash,
            source.namespace
        );

        self.rewrite_metadata(profile, &source);

        let mut endpoints = 0;
        for container in profile.all_containers_mut() {
            for endpoint in &mut container.endpoints {
                self.rewrite_endpoint(endpoint);
                endpoints += 1;
            }
        }
        tracing::debug!("Rewrote {} endpoint(s)", endpoints);

        match self.kernel_filter {
            Some((filter, target_kernel)) => filter.apply_to_profile(profile, target_kernel),
            None => Vec::new(),
        }
    }

    fn rewrite_metadata(&self, profile: &mut ApplicationProfile, source: &SourceIdentity) {
        let metadata = &mut profile.metadata;

        let name = replace_first(
            &metadata.name,
            &source.workload_name,
            &self.config.workload_name,
        );
        metadata.name = replace_first(&name, &source.template_hash, &self.config.template_hash);

        metadata.namespace = self.config.namespace.clone();

        self.rewrite_values(&mut metadata.annotations, source);
        self.rewrite_values(&mut metadata.labels, source);
    }

    fn rewrite_values(&self, values: &mut BTreeMap<String, String>, source: &SourceIdentity) {
        for value in values.values_mut() {
            let rewritten = replace_all(value, &source.workload_name, &self.config.workload_name);
            let rewritten =
                replace_all(&rewritten, &source.template_hash, &self.config.template_hash);
            *value = replace_all(&rewritten, &source.namespace, &self.config.namespace);
        }
    }

    fn rewrite_endpoint(&self, endpoint: &mut Endpoint) {
        for ip in &self.ips {
            endpoint.endpoint = ip.apply(&endpoint.endpoint);
            for host in endpoint.host_headers_mut() {
                *host = ip.apply(host);
            }
        }

        for port in &self.ports {
            endpoint.endpoint = port.apply(&endpoint.endpoint);
            for host in endpoint.host_headers_mut() {
                *host = port.apply(host);
            }
        }
    }
}

/// Applies `config` to `profile` without kernel filtering.
pub fn apply_template<'p>(
    profile: &'p mut ApplicationProfile,
    config: &TemplateConfig,
) -> &'p mut ApplicationProfile {
    Templater::new(config).apply(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FormatAdapter, KubescapeAdapter};
    use crate::profile::{ContainerProfile, HOST_HEADER};

    const SAMPLE: &str = r#"
apiVersion: spdx.softwarecomposition.kubescape.io/v1beta1
kind: ApplicationProfile
metadata:
  name: replicaset-myapp-abc123
  namespace: shop
  annotations:
    kubescape.io/instance-id: apiVersion-apps/v1/namespace-shop/kind-ReplicaSet/name-myapp-abc123
    kubescape.io/status: completed
  labels:
    kubescape.io/instance-template-hash: abc123
    kubescape.io/workload-name: myapp
    kubescape.io/workload-namespace: shop
spec:
  containers:
    - name: myapp
      endpoints:
        - direction: outbound
          endpoint: "10.0.0.5:8080"
          headers:
            Host: ["10.0.0.5:8080"]
        - direction: inbound
          endpoint: ":8080/orders/18080"
      syscalls: [clone3, read, setns]
  initContainers:
    - name: migrate
      endpoints:
        - direction: outbound
          endpoint: "10.0.0.5:5432"
"#;

    fn sample() -> ApplicationProfile {
        KubescapeAdapter.parse(SAMPLE.as_bytes()).unwrap()
    }

    fn config() -> TemplateConfig {
        TemplateConfig::new("svc", "prod", "xyz789")
            .with_ip("10.0.0.5", "{{.ServiceIP}}")
            .with_port("8080", "{{.ServicePort}}")
    }

    #[test]
    fn test_name_replaces_workload_then_hash() {
        let mut profile = sample();
        profile.metadata.name = "myapp-abc123".to_string();
        apply_template(&mut profile, &config());
        assert_eq!(profile.metadata.name, "svc-xyz789");
    }

    #[test]
    fn test_name_replaces_first_occurrence_only() {
        let mut profile = sample();
        profile.metadata.name = "myapp-myapp-abc123-abc123".to_string();
        apply_template(&mut profile, &config());
        assert_eq!(profile.metadata.name, "svc-myapp-xyz789-abc123");
    }

    #[test]
    fn test_hash_replacement_sees_new_workload_name() {
        let mut profile = sample();
        profile.metadata.name = "myapp-abc123".to_string();
        let config = TemplateConfig::new("abc123svc", "prod", "h");
        apply_template(&mut profile, &config);
        assert_eq!(profile.metadata.name, "hsvc-abc123");
    }

    #[test]
    fn test_namespace_is_assigned() {
        let mut profile = sample();
        apply_template(&mut profile, &config());
        assert_eq!(profile.metadata.namespace, "prod");
    }

    #[test]
    fn test_annotations_and_labels_replace_all_tokens() {
        let mut profile = sample();
        apply_template(&mut profile, &config());

        let annotations = &profile.metadata.annotations;
        assert_eq!(
            annotations["kubescape.io/instance-id"],
            "apiVersion-apps/v1/namespace-prod/kind-ReplicaSet/name-svc-xyz789"
        );
        assert_eq!(annotations["kubescape.io/status"], "completed");

        let labels = &profile.metadata.labels;
        assert_eq!(labels["kubescape.io/workload-name"], "svc");
        assert_eq!(labels["kubescape.io/instance-template-hash"], "xyz789");
        assert_eq!(labels["kubescape.io/workload-namespace"], "prod");
    }

    #[test]
    fn test_endpoint_ip_and_port_substitution() {
        let mut profile = sample();
        apply_template(&mut profile, &config());

        let endpoint = &profile.spec.containers[0].endpoints[0];
        assert_eq!(endpoint.endpoint, "{{.ServiceIP}}:{{.ServicePort}}");
        assert_eq!(
            endpoint.headers[HOST_HEADER],
            vec!["{{.ServiceIP}}:{{.ServicePort}}"]
        );
    }

    #[test]
    fn test_prefix_related_ips_do_not_collide() {
        let mut profile = sample();
        let endpoint = &mut profile.spec.containers[0].endpoints[0];
        endpoint.endpoint = "10.0.0.50:80".to_string();
        endpoint.headers.insert(
            HOST_HEADER.to_string(),
            vec!["10.0.0.50:80".to_string(), "10.0.0.5:80".to_string()],
        );

        let config = TemplateConfig::new("svc", "prod", "xyz789")
            .with_ip("10.0.0.5", "IP_A")
            .with_ip("10.0.0.50", "IP_B");
        apply_template(&mut profile, &config);

        let endpoint = &profile.spec.containers[0].endpoints[0];
        assert_eq!(endpoint.endpoint, "IP_B:80");
        assert_eq!(endpoint.headers[HOST_HEADER], vec!["IP_B:80", "IP_A:80"]);
    }

    #[test]
    fn test_port_substitution_is_colon_anchored() {
        let mut profile = sample();
        apply_template(&mut profile, &config());

        let endpoint = &profile.spec.containers[0].endpoints[1];
        assert_eq!(endpoint.endpoint, ":{{.ServicePort}}/orders/18080");
    }

    #[test]
    fn test_init_container_endpoints_are_templated() {
        let mut profile = sample();
        apply_template(&mut profile, &config());
        assert_eq!(
            profile.spec.init_containers[0].endpoints[0].endpoint,
            "{{.ServiceIP}}:5432"
        );
    }

    #[test]
    fn test_cardinality_and_schema_tags_preserved() {
        let original = sample();
        let mut profile = original.clone();
        apply_template(&mut profile, &config());

        assert_eq!(profile.api_version, original.api_version);
        assert_eq!(profile.kind, original.kind);
        assert_eq!(profile.spec.containers.len(), original.spec.containers.len());
        assert_eq!(
            profile.spec.init_containers.len(),
            original.spec.init_containers.len()
        );
        for (after, before) in profile.all_containers().zip(original.all_containers()) {
            assert_eq!(after.endpoints.len(), before.endpoints.len());
            assert_eq!(after.execs.len(), before.execs.len());
            assert_eq!(after.opens.len(), before.opens.len());
        }
        assert_eq!(
            profile.metadata.annotations.len(),
            original.metadata.annotations.len()
        );
        assert_eq!(profile.metadata.labels.len(), original.metadata.labels.len());
    }

    #[test]
    fn test_missing_labels_do_not_splice_tokens() {
        let mut profile = sample();
        profile.metadata.labels.clear();
        profile.metadata.name = "standalone".to_string();

        apply_template(&mut profile, &config());
        assert_eq!(profile.metadata.name, "standalone");
    }

    #[test]
    fn test_without_kernel_filter_syscalls_untouched() {
        let mut profile = sample();
        apply_template(&mut profile, &config());
        assert_eq!(
            profile.spec.containers[0].syscalls,
            vec!["clone3", "read", "setns"]
        );
    }

    #[test]
    fn test_with_kernel_filter_runs_last() {
        let filter = CompatibilityFilter::default();
        let config = config();
        let mut profile = sample();

        let warnings = Templater::new(&config)
            .with_kernel_filter(&filter, "5.0")
            .apply_with_warnings(&mut profile);

        assert!(warnings.is_empty());
        assert_eq!(profile.spec.containers[0].syscalls, vec!["read", "setns"]);
        assert_eq!(profile.metadata.namespace, "prod");
    }

    #[test]
    fn test_kernel_filter_warnings_are_returned() {
        let filter = CompatibilityFilter::default();
        let config = config();
        let mut profile = sample();

        let warnings = Templater::new(&config)
            .with_kernel_filter(&filter, "not-a-kernel")
            .apply_with_warnings(&mut profile);

        assert_eq!(warnings.len(), 1);
        assert_eq!(profile.metadata.namespace, "prod");
    }

    #[test]
    fn test_apply_returns_same_profile_for_chaining() {
        let config = config();
        let templater = Templater::new(&config);
        let mut profile = sample();
        let name = templater.apply(&mut profile).metadata.name.clone();
        assert_eq!(name, profile.metadata.name);
    }

    #[test]
    fn test_empty_profile_is_fine() {
        let mut profile = sample();
        profile.spec.containers = vec![ContainerProfile::default()];
        profile.spec.init_containers.clear();
        apply_template(&mut profile, &config());
        assert_eq!(profile.spec.containers.len(), 1);
    }
}
