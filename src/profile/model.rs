use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Label carrying the name of the workload the profile was recorded from.
pub const WORKLOAD_NAME_LABEL: &str = "kubescape.io/workload-name";

/// Label carrying the pod-template hash of the recorded workload instance.
pub const TEMPLATE_HASH_LABEL: &str = "kubescape.io/instance-template-hash";

/// HTTP header whose values are rewritten alongside endpoint strings.
pub const HOST_HEADER: &str = "Host";

/// Root record of one workload's observed runtime behavior.
///
/// `api_version`, `kind` and `status` are passed through untouched by every
/// transform stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationProfile {
    /// Schema tag, opaque.
    pub api_version: String,

    /// Resource kind, opaque.
    pub kind: String,

    /// Identity of the recorded workload instance.
    pub metadata: Metadata,

    /// Per-container behavior.
    #[serde(default)]
    pub spec: ApplicationProfileSpec,

    /// Opaque status block, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
}

/// Object metadata of an [`ApplicationProfile`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Labels, including the identity markers [`WORKLOAD_NAME_LABEL`] and
    /// [`TEMPLATE_HASH_LABEL`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Fields the model does not name (`creationTimestamp`, `uid`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The `spec` block of an [`ApplicationProfile`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationProfileSpec {
    /// Supported CPU architectures. Informational only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub architectures: Vec<String>,

    /// Regular containers, in pod order. Order maps to container index.
    #[serde(default)]
    pub containers: Vec<ContainerProfile>,

    /// Init containers, in pod order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_containers: Vec<ContainerProfile>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Behavioral fingerprint of a single container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerProfile {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub image_tag: String,

    /// Linux capability names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Endpoint>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execs: Vec<Exec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opens: Vec<Open>,

    /// Observed syscall names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub syscalls: Vec<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One observed network interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default)]
    pub direction: String,

    /// `host:port` or URI.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub internal: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

/// An executed binary with its arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exec {
    pub path: String,

    #[serde(default)]
    pub args: Vec<String>,
}

/// An opened file with its open flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Open {
    pub path: String,

    #[serde(default)]
    pub flags: Vec<String>,
}

impl ApplicationProfile {
    /// Value of the [`WORKLOAD_NAME_LABEL`] label, or `""` when absent.
    pub fn workload_name(&self) -> &str {
        self.metadata.label(WORKLOAD_NAME_LABEL)
    }

    /// Value of the [`TEMPLATE_HASH_LABEL`] label, or `""` when absent.
    pub fn template_hash(&self) -> &str {
        self.metadata.label(TEMPLATE_HASH_LABEL)
    }

    /// Iterates containers followed by init containers.
    pub fn all_containers(&self) -> impl Iterator<Item = &ContainerProfile> {
        self.spec
            .containers
            .iter()
            .chain(self.spec.init_containers.iter())
    }

    /// Mutable variant of [`ApplicationProfile::all_containers`].
    pub fn all_containers_mut(&mut self) -> impl Iterator<Item = &mut ContainerProfile> {
        self.spec
            .containers
            .iter_mut()
            .chain(self.spec.init_containers.iter_mut())
    }
}

impl Metadata {
    fn label(&self, key: &str) -> &str {
        self.labels.get(key).map(String::as_str).unwrap_or_default()
    }
}

impl Endpoint {
    /// Values of the HTTP `Host` header, matched case-insensitively.
    pub fn host_headers_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.headers
            .iter_mut()
            .filter(|(name, _)| name.eq_ignore_ascii_case(HOST_HEADER))
            .flat_map(|(_, values)| values.iter_mut())
    }
}
