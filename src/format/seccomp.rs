//! OCI runtime seccomp profile output.
//!
//! Emits an allow-list profile: every syscall observed in any container or
//! init container is allowed, everything else fails with `EPERM`. Reading
//! seccomp profiles back is not supported because a seccomp profile does not
//! carry per-container behavior.

use serde::Serialize;
use std::collections::BTreeSet;

use super::{FormatAdapter, Operation, ProfileFormat};
use crate::error::ProfileError;
use crate::profile::ApplicationProfile;

const DEFAULT_ACTION: &str = "SCMP_ACT_ERRNO";
const ALLOW_ACTION: &str = "SCMP_ACT_ALLOW";
const EPERM: u32 = 1;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeccompProfile {
    default_action: &'static str,
    default_errno_ret: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    architectures: Vec<&'static str>,
    syscalls: Vec<SyscallRule>,
}

#[derive(Debug, Serialize)]
struct SyscallRule {
    names: Vec<String>,
    action: &'static str,
}

/// Adapter producing OCI seccomp JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeccompAdapter;

impl FormatAdapter for SeccompAdapter {
    fn format(&self) -> ProfileFormat {
        ProfileFormat::Seccomp
    }

    fn supports(&self, operation: Operation) -> bool {
        operation == Operation::Serialize
    }

    fn parse(&self, _raw: &[u8]) -> Result<ApplicationProfile, ProfileError> {
        Err(ProfileError::unsupported(
            self.format().as_str(),
            Operation::Parse,
        ))
    }

    fn serialize(&self, profile: &ApplicationProfile) -> Result<Vec<u8>, ProfileError> {
        let names: BTreeSet<&str> = profile
            .all_containers()
            .flat_map(|container| container.syscalls.iter().map(String::as_str))
            .collect();

        let architectures = profile
            .spec
            .architectures
            .iter()
            .filter_map(|arch| {
                let mapped = seccomp_arch(arch);
                if mapped.is_none() {
                    tracing::warn!("Skipping unknown architecture '{}' in seccomp output", arch);
                }
                mapped
            })
            .collect();

        let syscalls = if names.is_empty() {
            Vec::new()
        } else {
            vec![SyscallRule {
                names: names.into_iter().map(str::to_string).collect(),
                action: ALLOW_ACTION,
            }]
        };

        let document = SeccompProfile {
            default_action: DEFAULT_ACTION,
            default_errno_ret: EPERM,
            architectures,
            syscalls,
        };

        let mut bytes = serde_json::to_vec_pretty(&document)
            .map_err(|e| ProfileError::serialize(self.format(), e))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Maps a Kubernetes/Go architecture name to its libseccomp constant.
fn seccomp_arch(arch: &str) -> Option<&'static str> {
    match arch {
        "amd64" | "x86_64" => Some("SCMP_ARCH_X86_64"),
        "386" | "x86" => Some("SCMP_ARCH_X86"),
        "arm64" | "aarch64" => Some("SCMP_ARCH_AARCH64"),
        "arm" => Some("SCMP_ARCH_ARM"),
        "ppc64le" => Some("SCMP_ARCH_PPC64LE"),
        "s390x" => Some("SCMP_ARCH_S390X"),
        "riscv64" => Some("SCMP_ARCH_RISCV64"),
        _ => None,
    }
}
