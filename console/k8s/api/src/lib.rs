#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod client;
pub mod filters;
pub mod mesh;
pub mod networking;
pub mod security;

pub use self::client::{ClientError, ControlPlane, KubeControlPlane};
pub use k8s_openapi::api::{
    self,
    apps::v1::Deployment,
    authentication::v1::{TokenReview, TokenReviewSpec, TokenReviewStatus},
    core::v1::{ConfigMap, Namespace, Pod, Service},
};
pub use kube::api::{ObjectMeta, ResourceExt};
