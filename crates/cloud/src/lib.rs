//! # Spectra Cloud
//!
//! Earth Engine REST client and the yearly index pipeline built on it.
//!
//! Graphs are described with typed handles ([`ee`]), flattened into the
//! REST wire format ([`graph`]) and evaluated through a
//! [`ComputeService`]; [`EeSession`] is the blocking implementation
//! backed by a service-account credential.

pub mod auth;
pub mod config;
pub mod driver;
pub mod ee;
pub mod ee_client;
pub mod error;
pub mod graph;
pub mod http;
pub mod indices;
pub mod session;

pub use config::EeConfig;
pub use driver::{compute_indices, evaluate, expressions, plan, ResultMapping};
pub use ee::Deferred;
pub use error::{CloudError, Result};
pub use graph::{Expression, ValueNode};
pub use indices::{build_index_bundle, DeferredBundle};
pub use session::{ComputeService, EeSession};
