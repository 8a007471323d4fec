#![warn(missing_docs)]

//! A HashiCorp Vault backend for [keyward].
//!
//! [VaultBackend] speaks Vault's HTTP API, and [VaultClientFactory] builds
//! one per caller: admin callers present their token, scoped callers are
//! logged in through AppRole first.
//!
//! ```no_run
//! use keyward::{Authorization, Settings, connect};
//! use keyward_vault::{VaultClientFactory, VaultConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! let factory = VaultClientFactory::new(VaultConfig::from_env()?, settings.naming.clone());
//!
//! let authorization = Authorization::from_header("vault:admin:s.root")?;
//! let provider = connect(&factory, authorization, &[], settings).await?;
//! let token = provider.create_project("acme").await?;
//! println!("role id {}", token.role_id);
//! # Ok(())
//! # }
//! ```

mod client;
pub use client::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

mod factory;
pub use factory::*;
