//! Command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use nc_auth::{
    AuthConfig, FileTokenStore, NcAuthError, Orchestrator, ProviderClient, RecordKind, Session,
    Validity,
};

use crate::capture::PastedRedirect;
use crate::cli::Commands;

/// Everything the handlers need, resolved once from the command line
pub struct Context {
    config: AuthConfig,
    store: Arc<FileTokenStore>,
}

impl Context {
    pub fn new(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = match data_dir {
            Some(dir) => AuthConfig::official_in(dir)?,
            None => AuthConfig::official()?,
        };
        let store = Arc::new(FileTokenStore::from_config(&config));
        Ok(Self { config, store })
    }

    fn session(&self) -> Session {
        Session::new(self.store.clone())
    }

    fn orchestrator(&self) -> anyhow::Result<Orchestrator> {
        let client = ProviderClient::new(self.config.clone())
            .context("Failed to build HTTP client")?;
        Ok(Orchestrator::new(client, self.store.clone()))
    }

    fn token_path(&self) -> PathBuf {
        self.store.record_path(RecordKind::BearerArtifact)
    }
}

pub async fn execute(command: Commands, ctx: &Context) -> anyhow::Result<()> {
    match command {
        Commands::Login => login(ctx).await,
        Commands::Refresh => refresh(ctx).await,
        Commands::Status => status(ctx).await,
        Commands::Logout => logout(ctx).await,
        Commands::TokenPath => {
            let path = ctx
                .session()
                .bearer_token_path()
                .context("Token store has no on-disk location")?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

async fn login(ctx: &Context) -> anyhow::Result<()> {
    let orchestrator = ctx.orchestrator()?;
    let credential = orchestrator.login_interactive(&PastedRedirect).await?;

    println!(
        "\n✓ Logged in as {} (UUID: {})",
        credential.username, credential.account_id
    );
    println!("  Tokens saved to {}", ctx.store.storage_dir().display());
    println!("\n  Use this in your nixcraft config:");
    println!("    accessTokenPath = \"{}\";", ctx.token_path().display());
    Ok(())
}

async fn refresh(ctx: &Context) -> anyhow::Result<()> {
    let orchestrator = ctx.orchestrator()?;
    println!("Refreshing Microsoft token...");
    let credential = orchestrator.refresh().await?;

    println!("✓ Tokens refreshed for {}", credential.username);
    Ok(())
}

async fn status(ctx: &Context) -> anyhow::Result<()> {
    let status = match ctx.session().status().await {
        Ok(status) => status,
        Err(NcAuthError::NotAuthenticated) => {
            println!("Not logged in. Run 'nixcraft-auth login' to authenticate.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let validity = match status.validity {
        Validity::Expired => "Expired (run 'nixcraft-auth refresh')".to_string(),
        valid => valid.to_string(),
    };

    println!("Username: {}", status.username);
    println!("UUID: {}", status.account_id);
    println!("Token: {}", validity);
    println!("Data dir: {}", ctx.store.storage_dir().display());
    Ok(())
}

async fn logout(ctx: &Context) -> anyhow::Result<()> {
    let removed = ctx.session().logout().await?;
    if removed > 0 {
        println!("✓ Removed {} auth file(s)", removed);
    } else {
        println!("No auth files to remove");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nc_auth::{ServiceCredential, TokenStore, TokenStoreExt};
    use tempfile::TempDir;

    #[tokio::test]
    async fn logout_then_status_reports_nothing() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(Some(temp.path().to_path_buf())).unwrap();

        let credential = ServiceCredential {
            access_token: "MC1".to_string(),
            expires_at: chrono_now_plus_hour(),
            username: "Steve".to_string(),
            account_id: "uuid1".to_string(),
            owned_skin_refs: vec![],
        };
        ctx.store.commit_service_credential(&credential).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(ctx.token_path()).unwrap(),
            "MC1"
        );

        execute(Commands::Logout, &ctx).await.unwrap();
        assert!(ctx.store.load(RecordKind::BearerArtifact).await.unwrap().is_none());
        execute(Commands::Status, &ctx).await.unwrap();
    }

    #[test]
    fn token_path_lives_in_data_dir() {
        let ctx = Context::new(Some(PathBuf::from("/tmp/nixcraft-auth"))).unwrap();
        assert_eq!(ctx.token_path(), PathBuf::from("/tmp/nixcraft-auth/access_token"));
    }

    fn chrono_now_plus_hour() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now() + chrono::Duration::hours(1)
    }
}
