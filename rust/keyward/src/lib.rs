#![warn(missing_docs)]

//! This crate maps the project/target credential lifecycle of a multi-tenant
//! pipeline orchestrator onto an AppRole-style secret backend.
//!
//! A [CredentialProvider] is built per request from the caller's
//! [Authorization] and a backend client scoped to that caller. Mutating and
//! enumerating operations are reserved to the admin caller and are refused
//! before the backend is contacted; absence is reported as
//! [CredentialError::NotFound] and kept apart from backend failures.
//!
//! ```rust
//! use keyward::{Authorization, CredentialProvider, MemoryBackend, Settings, Target};
//!
//! # async fn example() -> Result<(), keyward::CredentialError> {
//! let admin = Authorization::Admin { token: "s.admin".into() };
//! let provider = CredentialProvider::new(admin, MemoryBackend::default(), Settings::default());
//!
//! provider.create_target("acme", &Target::new("prod", Default::default())).await?;
//! assert_eq!(provider.list_targets("acme").await?, vec!["prod".to_string()]);
//! # Ok(())
//! # }
//! ```

mod authorization;
pub use authorization::*;

mod backend;
pub use backend::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

mod factory;
pub use factory::*;

pub mod naming;
pub use naming::Naming;

pub mod policy;

mod provider;
pub use provider::*;

mod types;
pub use types::*;
