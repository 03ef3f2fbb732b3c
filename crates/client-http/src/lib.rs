//! HTTP side of the Bondly client: the reqwest [`HttpApi`] and the
//! command/event runtime that drives any [`client_core::DatingApi`].

mod api;
mod runtime;

pub use api::{HttpApi, parse_base_url};
pub use runtime::{RuntimeConfig, RuntimeHandle, spawn_runtime};
