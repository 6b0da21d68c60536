//! The downstream half of the exchange chain.
//!
//! Once a Microsoft access token is available, the same four hops run on
//! every login and every refresh:
//!
//! ```text
//! ProviderTokenObtained -> DelegateObtained -> SecurityTokenObtained
//!     -> ServiceAuthenticated -> Complete
//! ```
//!
//! None of the intermediate tokens outlive a run.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::client::ProviderClient;
use crate::credentials::{DelegateToken, SecurityToken, ServiceCredential, ServiceToken};
use crate::errors::Result;

/// Named position in the exchange chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStage {
    Unauthenticated,
    ProviderTokenObtained,
    DelegateObtained,
    SecurityTokenObtained,
    ServiceAuthenticated,
    Complete,
}

impl fmt::Display for ChainStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Chain state carrying the token produced by the last completed hop
pub enum ChainState {
    ProviderTokenObtained {
        provider_access_token: String,
    },
    DelegateObtained {
        delegate: DelegateToken,
    },
    SecurityTokenObtained {
        security: SecurityToken,
        user_hash: String,
    },
    ServiceAuthenticated {
        service: ServiceToken,
        issued_at: DateTime<Utc>,
    },
    Complete(ServiceCredential),
}

impl ChainState {
    pub fn start(provider_access_token: impl Into<String>) -> Self {
        Self::ProviderTokenObtained {
            provider_access_token: provider_access_token.into(),
        }
    }

    pub fn stage(&self) -> ChainStage {
        match self {
            Self::ProviderTokenObtained { .. } => ChainStage::ProviderTokenObtained,
            Self::DelegateObtained { .. } => ChainStage::DelegateObtained,
            Self::SecurityTokenObtained { .. } => ChainStage::SecurityTokenObtained,
            Self::ServiceAuthenticated { .. } => ChainStage::ServiceAuthenticated,
            Self::Complete(_) => ChainStage::Complete,
        }
    }

    /// Run the next hop. `Complete` is terminal and returned unchanged.
    pub async fn advance(self, client: &ProviderClient) -> Result<Self> {
        let next = match self {
            Self::ProviderTokenObtained {
                provider_access_token,
            } => Self::DelegateObtained {
                delegate: client.authenticate_delegate(&provider_access_token).await?,
            },
            Self::DelegateObtained { delegate } => Self::SecurityTokenObtained {
                security: client.authorize_security_token(&delegate).await?,
                user_hash: delegate.user_hash,
            },
            Self::SecurityTokenObtained {
                security,
                user_hash,
            } => Self::ServiceAuthenticated {
                service: client.authenticate_service(&security, &user_hash).await?,
                issued_at: Utc::now(),
            },
            Self::ServiceAuthenticated { service, issued_at } => {
                let profile = client.fetch_profile(&service.access_token).await?;
                Self::Complete(ServiceCredential::from_parts(service, profile, issued_at))
            }
            complete @ Self::Complete(_) => complete,
        };
        Ok(next)
    }
}

/// Drive the chain from a Microsoft access token to a service credential,
/// stopping at the first failing hop.
#[instrument(skip_all)]
pub async fn run_downstream(
    client: &ProviderClient,
    provider_access_token: &str,
) -> Result<ServiceCredential> {
    let mut state = ChainState::start(provider_access_token);
    loop {
        state = match state {
            ChainState::Complete(credential) => return Ok(credential),
            state => {
                let from = state.stage();
                let next = state.advance(client).await?;
                debug!("{} -> {}", from, next.stage());
                next
            }
        };
    }
}
