#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod client;
mod store;

pub use self::client::CachingClient;
pub use self::store::{CacheInitError, CacheScope, ResourceCache, ResourceKind};
