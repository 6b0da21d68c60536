//! User-facing error messages.

use nc_auth::NcAuthError;

const LOGIN_HINT: &str = "You may need to run 'nixcraft-auth login' again.";

/// Map an [`NcAuthError`] to a message with actionable guidance.
pub fn format_error_help(err: &NcAuthError) -> String {
    match err {
        NcAuthError::ReauthenticationRequired => format!("Refresh failed: {err}"),
        NcAuthError::RefreshTokenInvalid { .. } => {
            format!("Refresh failed: {err}\n{LOGIN_HINT}")
        }
        NcAuthError::NotAuthenticated => {
            "No refresh token found. Please run 'nixcraft-auth login' first.".to_string()
        }
        NcAuthError::MalformedGrant(_) => format!("{err}"),
        NcAuthError::UpstreamRejected { hop, status, body } => {
            let mut message = format!("Authentication failed: {hop} returned HTTP {status}");
            if let Some(reason) = err.xsts_reason() {
                message.push_str(&format!("\n{reason}"));
            }
            if !body.is_empty() {
                message.push_str(&format!("\nResponse: {body}"));
            }
            message
        }
        NcAuthError::Network(e) if e.is_timeout() => {
            format!("Authentication failed: request timed out ({e})")
        }
        NcAuthError::Network(e) => format!("Authentication failed: {e}"),
        other => format!("{other}"),
    }
}

/// Like [`format_error_help`], but every failed refresh points to `login`.
pub fn format_refresh_help(err: &NcAuthError) -> String {
    let message = format_error_help(err);
    if message.contains("nixcraft-auth login") {
        message
    } else {
        format!("{message}\n{LOGIN_HINT}")
    }
}
