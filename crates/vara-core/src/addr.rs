// ── Station addressing ──
//
// A VARA endpoint is identified by nothing more than a call sign. Local
// and remote addresses are the same type wrapping different calls.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::CoreError;

/// Network name reported by [`Addr::network`] and used as URL scheme.
pub const NETWORK: &str = "vara";

const MAX_CALLSIGN_LEN: usize = 10;

/// Call-sign address of one end of a VARA link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr {
    call: String,
}

impl Addr {
    /// Build an address, normalizing the call sign to upper case.
    pub fn new(call: &str) -> Result<Self, CoreError> {
        Ok(Self {
            call: normalize_callsign(call)?,
        })
    }

    /// Extract the target station from a `vara:///CALL` (or `vara://CALL`) URL.
    pub fn from_url(url: &Url) -> Result<Self, CoreError> {
        if url.scheme() != NETWORK {
            return Err(CoreError::InvalidAddress {
                addr: url.to_string(),
                reason: format!("scheme must be '{NETWORK}'"),
            });
        }

        let path = url.path().trim_matches('/');
        let call = if path.is_empty() {
            url.host_str().unwrap_or_default()
        } else {
            path
        };
        if call.is_empty() {
            return Err(CoreError::InvalidAddress {
                addr: url.to_string(),
                reason: "no target call sign".into(),
            });
        }
        Self::new(call)
    }

    /// Address of a remote station as reported by the modem. Not
    /// validated: the peer's call sign is whatever it announced.
    pub(crate) fn peer(call: &str) -> Self {
        let call = call.trim().to_ascii_uppercase();
        Self {
            call: if call.is_empty() { "UNKNOWN".into() } else { call },
        }
    }

    pub fn call(&self) -> &str {
        &self.call
    }

    pub fn network(&self) -> &'static str {
        NETWORK
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.call)
    }
}

impl FromStr for Addr {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Trim and upper-case a call sign, rejecting anything the modem would choke on.
pub fn normalize_callsign(call: &str) -> Result<String, CoreError> {
    let call = call.trim().to_ascii_uppercase();
    let invalid = |reason: &str| CoreError::InvalidCallsign {
        call: call.clone(),
        reason: reason.into(),
    };

    if call.is_empty() {
        return Err(invalid("empty"));
    }
    if call.len() > MAX_CALLSIGN_LEN {
        return Err(invalid("longer than 10 characters"));
    }
    if !call.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid("only letters, digits and '-' are allowed"));
    }
    Ok(call)
}

// ── Tests ────────────────────────────────────────────────────────────
