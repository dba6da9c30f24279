//! Subscription management link.
//!
//! Billing itself lives with the payment provider; this service only builds the link to the
//! provider's customer portal.

use crate::error::{ConfigError, ConfigResult};
use reqwest::Url;

/// Builds the customer portal URL, pre-filling `email` when one is known.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidInput`] if `portal_url` is not an absolute URL.
pub fn portal_redirect_url(portal_url: &str, email: Option<&str>) -> ConfigResult<String> {
    let mut url = Url::parse(portal_url).map_err(|e| {
        ConfigError::InvalidInput(format!("invalid billing portal URL '{portal_url}': {e}"))
    })?;

    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
        url.query_pairs_mut().append_pair("prefilled_email", email);
    }
    Ok(url.into())
}
