//! Microsoft account credential exchange for Nixcraft
//!
//! This crate turns a Microsoft login into a Minecraft access token and keeps
//! it fresh on disk, where the launcher and the skin tooling pick it up.
//!
//! # Authentication Flow
//!
//! 1. OAuth2 authorization code exchange with Microsoft
//! 2. Xbox Live authentication
//! 3. XSTS authorization
//! 4. Minecraft Services login
//! 5. Profile retrieval
//!
//! A refresh swaps step 1 for a refresh-token grant and re-runs steps 2-5;
//! none of the intermediate tokens are reused across runs.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use nc_auth::{parse_redirect, AuthConfig, FileTokenStore, Orchestrator, ProviderClient, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AuthConfig::official()?;
//!     let store = Arc::new(FileTokenStore::from_config(&config));
//!     let orchestrator = Orchestrator::new(ProviderClient::new(config)?, store.clone());
//!
//!     // After the user authorizes and pastes the redirect URL...
//!     let grant = parse_redirect("https://login.live.com/oauth20_desktop.srf?code=...")?;
//!     let credential = orchestrator.login(grant).await?;
//!     println!("Logged in as: {}", credential.username);
//!
//!     // Later, from any tool
//!     let session = Session::new(store);
//!     let credential = session.ensure_valid(&orchestrator).await?;
//!     println!("Token valid until {}", credential.expires_at);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Token Storage
//!
//! Records are kept as separate owner-only files under the data directory;
//! `access_token` holds the raw bearer string for tools that cannot parse JSON.
//!
//! ```
//! use nc_auth::{MemoryTokenStore, ProviderTokenPair, TokenStoreExt};
//!
//! # async fn example() -> nc_auth::Result<()> {
//! let store = MemoryTokenStore::new();
//! let tokens = ProviderTokenPair::new("token".to_string(), Some("refresh".to_string()), Some(3600));
//! store.save_provider_tokens(&tokens).await?;
//!
//! let loaded = store.load_provider_tokens().await?.expect("saved above");
//! assert_eq!(loaded.refresh_token, tokens.refresh_token);
//! # Ok(())
//! # }
//! # tokio_test::block_on(example()).unwrap();
//! ```

pub mod chain;
pub mod client;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod file_store;
pub mod grant;
pub mod models;
pub mod orchestrator;
pub mod session;
pub mod store;

// Re-export main types
pub use chain::{ChainStage, ChainState};
pub use client::ProviderClient;
pub use config::{AuthConfig, Endpoints, HttpTimeouts};
pub use credentials::{DelegateToken, ProviderTokenPair, SecurityToken, ServiceCredential, ServiceToken};
pub use errors::{Hop, NcAuthError, Result, XstsError};
pub use file_store::FileTokenStore;
pub use grant::{authorize_url, parse_redirect, AuthorizationGrant, FixedGrant, GrantCapturer};
pub use models::{McProfile, McSkin};
pub use orchestrator::Orchestrator;
pub use session::{Session, Status, Validity};
pub use store::{MemoryTokenStore, RecordKind, TokenStore, TokenStoreExt};
