//! Canonical, format-independent application profile model.
//!
//! An [`ApplicationProfile`] records one workload's observed runtime
//! behavior: syscalls, capabilities, network endpoints, executed binaries and
//! opened files, per container. Format adapters parse into this model and
//! serialize out of it; the templating transform and the compatibility
//! filter mutate it in place between those two steps.
//!
//! Field names follow the Kubescape `ApplicationProfile` custom resource,
//! which is the serialization contract for the reference format.

mod model;

pub use model::{
    ApplicationProfile, ApplicationProfileSpec, ContainerProfile, Endpoint, Exec, Metadata, Open,
    HOST_HEADER, TEMPLATE_HASH_LABEL, WORKLOAD_NAME_LABEL,
};
