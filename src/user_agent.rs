//! Default User-Agent for outbound requests.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/pump";

/// Default User-Agent (identifies the tool). Caller-supplied `User-Agent`
/// headers take precedence.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("pump/{version} (+{PROJECT_UA_URL})")
}
