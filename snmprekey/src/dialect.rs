//! Device-family command and persistence conventions.
//!
//! The two supported families run the same change sequence but differ in
//! three places: whether an explicit `enable` escalation is required,
//! which command persists configuration, and whether persisting drops the
//! configuration context (forcing a re-entry before further statements).
//!
//! # Prompt Examples
//!
//! ```text
//! router>                            # exec mode
//! router#                            # privileged mode
//! router(config)#                    # configuration mode
//! RP/0/RP0/CPU0:router#              # IOS XR privileged mode
//! ```

use std::fmt;

use regex::bytes::Regex;

/// A device family's command and persistence convention.
///
/// Distinct from the transport protocol: both families are reached over
/// the same SSH/PTY channel, they just speak different CLI conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Classic IOS: explicit `enable` escalation, persists via
    /// `write memory` from the privileged prompt. Persisting mid-sequence
    /// leaves configuration mode, so further statements need a re-entry.
    Ios,

    /// IOS XR: lands privileged after login, persists via `commit`
    /// issued inside configuration mode, no re-entry needed.
    IosXr,
}

impl Dialect {
    /// Resolve an inventory token to a dialect.
    ///
    /// Returns `None` for unrecognized tokens; callers must treat that
    /// as a configuration error, never fall back to a default family.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "cisco_ios" => Some(Dialect::Ios),
            "cisco_xr" => Some(Dialect::IosXr),
            _ => None,
        }
    }

    /// The inventory token for this dialect.
    pub fn token(&self) -> &'static str {
        match self {
            Dialect::Ios => "cisco_ios",
            Dialect::IosXr => "cisco_xr",
        }
    }

    /// Whether the login shell needs an explicit `enable` escalation
    /// before configuration work.
    pub fn requires_escalation(&self) -> bool {
        matches!(self, Dialect::Ios)
    }

    /// The command that commits in-memory configuration to durable state.
    pub fn persist_command(&self) -> &'static str {
        match self {
            Dialect::Ios => "write memory",
            Dialect::IosXr => "commit",
        }
    }

    /// Whether [`persist_command`](Self::persist_command) is issued inside
    /// configuration mode. When `false`, the session must leave
    /// configuration mode first and the persist runs at the privileged
    /// prompt.
    pub fn persists_in_config_mode(&self) -> bool {
        matches!(self, Dialect::IosXr)
    }

    /// Whether a mid-sequence persist drops the configuration context,
    /// requiring a fresh `configure terminal` before further statements.
    pub fn reenters_config_after_persist(&self) -> bool {
        matches!(self, Dialect::Ios)
    }

    /// Prompt patterns for this dialect.
    ///
    /// Both families use the IOS prompt grammar; XR prompts carry a
    /// `RP/x/y/CPU0:` prefix which the shared character class covers.
    pub fn prompt_set(&self) -> PromptSet {
        PromptSet::new()
    }

    /// Output substrings that mark a rejected command.
    pub fn failure_markers(&self) -> &'static [&'static str] {
        match self {
            Dialect::Ios => &[
                "% Ambiguous command",
                "% Incomplete command",
                "% Invalid input detected",
                "% Bad secrets",
            ],
            Dialect::IosXr => &[
                "% Ambiguous command",
                "% Incomplete command",
                "% Invalid input detected",
                "% Failed to commit",
            ],
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

const EXEC_PATTERN: &str = r"(?mi)^[\w.\-@()/: ]{1,63}>\s?$";
const PRIVILEGED_PATTERN: &str = r"(?mi)^[\w.\-@()/: ]{1,63}#\s?$";
const CONFIG_PATTERN: &str = r"(?mi)^[\w.\-@()/: ]{1,63}\(config[\w.\-@/:+]{0,63}\)#\s?$";
const PASSWORD_PATTERN: &str = r"(?mi)^password:\s?$";

/// Compiled prompt patterns used by the SSH gateway to delimit command
/// output.
///
/// Uses `(?mi)` flags for multiline (`^` matches line start) and
/// case-insensitive matching.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// Any mode prompt (exec, privileged, or configuration).
    pub any: Regex,

    /// Privileged prompt. The raw pattern also matches configuration
    /// prompts (`#` at the end); use [`PromptSet::is_privileged`] to
    /// disambiguate.
    pub privileged: Regex,

    /// Configuration mode prompt, including sub-modes.
    pub config: Regex,

    /// Escalation password challenge.
    pub password: Regex,

    /// Password challenge or any prompt; what escalation waits on.
    pub escalation: Regex,
}

impl PromptSet {
    fn new() -> Self {
        let any = format!("(?:{EXEC_PATTERN})|(?:{PRIVILEGED_PATTERN})");
        let escalation = format!("(?:{PASSWORD_PATTERN})|(?:{any})");
        Self {
            any: Regex::new(&any).unwrap(),
            privileged: Regex::new(PRIVILEGED_PATTERN).unwrap(),
            config: Regex::new(CONFIG_PATTERN).unwrap(),
            password: Regex::new(PASSWORD_PATTERN).unwrap(),
            escalation: Regex::new(&escalation).unwrap(),
        }
    }

    /// Whether a prompt line shows the privileged (non-configuration)
    /// mode.
    pub fn is_privileged(&self, prompt: &str) -> bool {
        !prompt.contains("(config") && self.privileged.is_match(prompt.as_bytes())
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        assert_eq!(Dialect::from_token("cisco_ios"), Some(Dialect::Ios));
        assert_eq!(Dialect::from_token("cisco_xr"), Some(Dialect::IosXr));
        assert_eq!(Dialect::Ios.token(), "cisco_ios");
        assert_eq!(Dialect::IosXr.token(), "cisco_xr");
    }

    #[test]
    fn test_unknown_token_is_not_defaulted() {
        assert_eq!(Dialect::from_token("cisco_nxos"), None);
        assert_eq!(Dialect::from_token(""), None);
        assert_eq!(Dialect::from_token("CISCO_IOS"), None);
    }

    #[test]
    fn test_ios_policy() {
        let dialect = Dialect::Ios;
        assert!(dialect.requires_escalation());
        assert_eq!(dialect.persist_command(), "write memory");
        assert!(!dialect.persists_in_config_mode());
        assert!(dialect.reenters_config_after_persist());
    }

    #[test]
    fn test_xr_policy() {
        let dialect = Dialect::IosXr;
        assert!(!dialect.requires_escalation());
        assert_eq!(dialect.persist_command(), "commit");
        assert!(dialect.persists_in_config_mode());
        assert!(!dialect.reenters_config_after_persist());
    }

    #[test]
    fn test_any_prompt_match() {
        let prompts = Dialect::Ios.prompt_set();

        assert!(prompts.any.is_match(b"router>"));
        assert!(prompts.any.is_match(b"router# "));
        assert!(prompts.any.is_match(b"router(config)#"));
        assert!(prompts.any.is_match(b"RP/0/RP0/CPU0:router#"));

        assert!(!prompts.any.is_match(b"building configuration..."));
        assert!(!prompts.any.is_match(b"Password:"));
    }

    #[test]
    fn test_config_prompt_match() {
        let prompts = Dialect::IosXr.prompt_set();

        assert!(prompts.config.is_match(b"router(config)#"));
        assert!(prompts.config.is_match(b"router(config-if)#"));
        assert!(prompts.config.is_match(b"RP/0/RP0/CPU0:router(config)#"));

        assert!(!prompts.config.is_match(b"router#"));
        assert!(!prompts.config.is_match(b"router>"));
    }

    #[test]
    fn test_privileged_disambiguation() {
        let prompts = Dialect::Ios.prompt_set();

        assert!(prompts.is_privileged("router#"));
        assert!(prompts.is_privileged("router# "));
        assert!(!prompts.is_privileged("router(config)#"));
        assert!(!prompts.is_privileged("router>"));
    }

    #[test]
    fn test_password_challenge_match() {
        let prompts = Dialect::Ios.prompt_set();

        assert!(prompts.password.is_match(b"Password:"));
        assert!(prompts.password.is_match(b"password: "));
        assert!(!prompts.password.is_match(b"router#"));
    }

    #[test]
    fn test_failure_markers_per_family() {
        assert!(
            Dialect::Ios
                .failure_markers()
                .contains(&"% Invalid input detected")
        );
        assert!(Dialect::IosXr.failure_markers().contains(&"% Failed to commit"));
        assert!(!Dialect::Ios.failure_markers().contains(&"% Failed to commit"));
    }
}
