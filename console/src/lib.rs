//! Request-scoped service layers for a mesh observability console.
//!
//! A [`ProcessContext`] owns everything with process lifetime: the identity
//! client provider, the privileged resource cache, and the lazily built
//! metrics/tracing clients. Each inbound request exchanges its caller token
//! for a fresh [`Layer`] wiring together the domain services under that
//! caller's identity, while reads that tolerate the shared snapshot are
//! routed through the cache under the service identity.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod clients;
pub mod config;
pub mod context;
pub mod layer;
pub mod services;

#[cfg(test)]
mod tests;

pub use self::clients::{ClientProvider, ClusterClients, KubeClientProvider};
pub use self::config::{AccessibleNamespaces, Config};
pub use self::context::ProcessContext;
pub use self::layer::{Backends, Layer};
pub use meshview_core as core;
pub use meshview_k8s_api as k8s;
pub use meshview_k8s_cache as cache;
