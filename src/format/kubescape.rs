//! Kubescape `ApplicationProfile` YAML, the reference format.
//!
//! Parsing is a structural deserialization into the canonical model and
//! serializing is its inverse. No semantic transformation happens here.

use super::{FormatAdapter, ProfileFormat};
use crate::error::ProfileError;
use crate::profile::ApplicationProfile;

/// Adapter for Kubescape application profiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct KubescapeAdapter;

impl FormatAdapter for KubescapeAdapter {
    fn format(&self) -> ProfileFormat {
        ProfileFormat::Kubescape
    }

    fn parse(&self, raw: &[u8]) -> Result<ApplicationProfile, ProfileError> {
        let text = std::str::from_utf8(raw).map_err(|e| ProfileError::input(self.format(), e))?;

        if text.trim().is_empty() {
            return Err(ProfileError::input(self.format(), "document is empty"));
        }

        let profile: ApplicationProfile =
            serde_yaml::from_str(text).map_err(|e| ProfileError::input(self.format(), e))?;

        tracing::debug!(
            "Parsed profile '{}' with {} container(s) and {} init container(s)",
            profile.metadata.name,
            profile.spec.containers.len(),
            profile.spec.init_containers.len()
        );

        Ok(profile)
    }

    fn serialize(&self, profile: &ApplicationProfile) -> Result<Vec<u8>, ProfileError> {
        serde_yaml::to_string(profile)
            .map(String::into_bytes)
            .map_err(|e| ProfileError::serialize(self.format(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"apiVersion: spdx.softwarecomposition.kubescape.io/v1beta1
kind: ApplicationProfile
metadata:
  name: replicaset-myapp-abc123
  namespace: shop
  annotations:
    kubescape.io/completion: complete
    kubescape.io/status: completed
  labels:
    kubescape.io/instance-template-hash: abc123
    kubescape.io/workload-name: myapp
    kubescape.io/workload-namespace: shop
  resourceVersion: "42"
spec:
  architectures:
  - amd64
  containers:
  - name: myapp
    imageTag: registry.local/myapp:1.4.2
    capabilities:
    - NET_BIND_SERVICE
    endpoints:
    - direction: inbound
      endpoint: ":8080/api/v1/orders"
      headers:
        Host:
        - "10.0.0.5:8080"
      internal: false
      methods:
      - GET
      - POST
    execs:
    - path: /usr/local/bin/myapp
      args:
      - /usr/local/bin/myapp
      - --serve
    opens:
    - path: /etc/myapp/config.yaml
      flags:
      - O_RDONLY
    syscalls:
    - accept4
    - clone3
    - read
status:
  phase: ready
"#;

    #[test]
    fn test_parse_reference_profile() {
        let profile = KubescapeAdapter.parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(profile.kind, "ApplicationProfile");
        assert_eq!(profile.metadata.namespace, "shop");
        assert_eq!(profile.workload_name(), "myapp");

        let container = &profile.spec.containers[0];
        assert_eq!(container.image_tag, "registry.local/myapp:1.4.2");
        assert_eq!(container.endpoints[0].headers["Host"], vec!["10.0.0.5:8080"]);
        assert_eq!(container.execs[0].args.len(), 2);
        assert_eq!(container.opens[0].flags, vec!["O_RDONLY"]);
        assert_eq!(container.syscalls, vec!["accept4", "clone3", "read"]);
    }

    #[test]
    fn test_round_trip_is_semantically_equal() {
        let profile = KubescapeAdapter.parse(SAMPLE.as_bytes()).unwrap();
        let bytes = KubescapeAdapter.serialize(&profile).unwrap();

        let original: serde_yaml::Value = serde_yaml::from_str(SAMPLE).unwrap();
        let rendered: serde_yaml::Value = serde_yaml::from_slice(&bytes).unwrap();
        assert_eq!(original, rendered);
    }

    #[test]
    fn test_round_trip_of_serialized_output_is_stable() {
        let profile = KubescapeAdapter.parse(SAMPLE.as_bytes()).unwrap();
        let first = KubescapeAdapter.serialize(&profile).unwrap();
        let second = KubescapeAdapter
            .serialize(&KubescapeAdapter.parse(&first).unwrap())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_document_is_input_error() {
        let err = KubescapeAdapter.parse(b"  \n").unwrap_err();
        assert!(matches!(err, ProfileError::Input { .. }));
    }

    #[test]
    fn test_malformed_document_is_input_error() {
        let err = KubescapeAdapter.parse(b"kind: [unterminated").unwrap_err();
        assert!(matches!(err, ProfileError::Input { .. }));
        assert!(err.to_string().starts_with("malformed kubescape profile"));
    }

    #[test]
    fn test_non_utf8_is_input_error() {
        let err = KubescapeAdapter.parse(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ProfileError::Input { .. }));
    }
}
