//! Escalation ladder.
//!
//! # States
//! The escalation counter counts consecutive attempts that look like blocking.
//!
//! # Transitions
//! ```text
//! clean JSON 200/202      → 0
//! 200/202 but not JSON    → max(count + 1, 10)   (proxy or captcha page in the way)
//! 403 / anything else     → count + 1
//! ```
//!
//! # Remediation by counter value
//! ```text
//! 1   (403 only)  rotate user agent
//! 2   (403 only)  fresh session
//! 4   (403 only)  drop datadome cookie, fresh session
//! 10..=99         rotate proxy (clear it if none found)
//! 100             clear proxy
//! > 100           notify, cool down, clear proxy, counter → 0
//! ```

use crate::session::{ApiResponse, TransportError};

/// First counter value at which proxies are rotated.
pub const PROXY_TIER: u32 = 10;

/// Counter value at which proxies are abandoned.
pub const PROXY_GIVE_UP: u32 = 100;

/// Classification of one dispatched attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 200/202 with a JSON body.
    Success,
    /// 200/202 with something other than JSON.
    Interference,
    /// 403 Forbidden.
    Forbidden,
    /// Any other status or a transport error.
    Failure,
}

impl Outcome {
    pub fn classify(result: &Result<ApiResponse, TransportError>) -> Self {
        match result {
            Ok(response) if response.is_ok_or_accepted() && response.is_json() => Outcome::Success,
            Ok(response) if response.is_ok_or_accepted() => Outcome::Interference,
            Ok(response) if response.status == 403 => Outcome::Forbidden,
            _ => Outcome::Failure,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Interference => "interference",
            Outcome::Forbidden => "forbidden",
            Outcome::Failure => "failure",
        }
    }
}

/// Counter value after an attempt with `outcome`.
pub fn next_count(count: u32, outcome: Outcome) -> u32 {
    match outcome {
        Outcome::Success => 0,
        Outcome::Interference => count.saturating_add(1).max(PROXY_TIER),
        Outcome::Forbidden | Outcome::Failure => count.saturating_add(1),
    }
}

/// Action taken before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    None,
    RotateUserAgent,
    ResetSession,
    DropCookie,
    RotateProxy,
    ClearProxy,
    CoolDown,
}

impl Remediation {
    /// Remediation for the counter value reached after an attempt with `outcome`.
    pub fn for_count(count: u32, outcome: Outcome) -> Self {
        let forbidden = outcome == Outcome::Forbidden;
        match count {
            c if c > PROXY_GIVE_UP => Remediation::CoolDown,
            PROXY_GIVE_UP => Remediation::ClearProxy,
            c if c >= PROXY_TIER => Remediation::RotateProxy,
            1 if forbidden => Remediation::RotateUserAgent,
            2 if forbidden => Remediation::ResetSession,
            4 if forbidden => Remediation::DropCookie,
            _ => Remediation::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Remediation::None => "none",
            Remediation::RotateUserAgent => "rotate_user_agent",
            Remediation::ResetSession => "reset_session",
            Remediation::DropCookie => "drop_cookie",
            Remediation::RotateProxy => "rotate_proxy",
            Remediation::ClearProxy => "clear_proxy",
            Remediation::CoolDown => "cool_down",
        }
    }
}
