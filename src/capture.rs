//! Manual redirect capture: the user logs in in a browser and pastes the
//! address they were redirected to.

use std::io::Write;
use std::process::Stdio;

use nc_auth::{AuthorizationGrant, GrantCapturer, NcAuthError, parse_redirect};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;
use url::Url;

#[derive(Debug, Default)]
pub struct PastedRedirect;

#[async_trait::async_trait]
impl GrantCapturer for PastedRedirect {
    async fn capture(&self, authorize_url: &Url) -> nc_auth::Result<AuthorizationGrant> {
        println!("Opening browser for Microsoft login...");
        println!("\nIf browser doesn't open, visit:\n{}\n", authorize_url);
        open_browser(authorize_url);

        println!("After logging in, you'll be redirected to a page that may show an error.");
        println!("Copy the ENTIRE URL from your browser's address bar and paste it here.\n");
        print!("Paste the redirect URL: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        if read == 0 {
            return Err(NcAuthError::MalformedGrant("no input received".to_string()));
        }

        parse_redirect(&line)
    }
}

/// Best-effort; the URL is always printed as well. The opener is not awaited,
/// the runtime reaps it once it exits.
fn open_browser(url: &Url) {
    let (program, args): (&str, &[&str]) = if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(target_os = "windows") {
        ("cmd", &["/C", "start", ""])
    } else {
        ("xdg-open", &[])
    };

    match launch(program, args, url) {
        Ok(child) => debug!("Launched {} (pid {:?})", program, child.id()),
        Err(e) => debug!("Could not launch {}: {}", program, e),
    }
}

fn launch(program: &str, args: &[&str], url: &Url) -> std::io::Result<Child> {
    Command::new(program)
        .args(args)
        .arg(url.as_str())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn launched_opener_runs_detached() {
        let url = Url::parse("https://login.live.com/oauth20_authorize.srf").unwrap();
        let mut child = launch("true", &[], &url).unwrap();
        assert!(child.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn missing_opener_is_an_error() {
        let url = Url::parse("https://login.live.com/oauth20_authorize.srf").unwrap();
        assert!(launch("nixcraft-no-such-opener", &[], &url).is_err());
    }
}
