use anyhow::{anyhow, Result};

/// A runtime handler as seen by one inventory query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    pub id: String,
    pub display_name: Option<String>,
    pub available: bool,
    pub usage: u64,
}

impl Handler {
    pub fn new(id: impl Into<String>, available: bool, usage: u64) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            available,
            usage,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn is_used(&self) -> bool {
        self.usage > 0
    }
}

/// Returns true when `id` is `<prefix><version token>`, the version token
/// starting with a digit (`plesk-php82-fpm`, `plesk-php74-fastcgi`).
pub fn is_family_handler(prefix: &str, id: &str) -> bool {
    validate_handler_id(prefix, id).is_ok()
}

pub fn validate_handler_id(prefix: &str, id: &str) -> Result<()> {
    let Some(version_token) = id.strip_prefix(prefix) else {
        return Err(anyhow!(
            "handler '{id}' does not belong to the managed family '{prefix}'"
        ));
    };
    if !version_token
        .as_bytes()
        .first()
        .is_some_and(|byte| byte.is_ascii_digit())
    {
        return Err(anyhow!(
            "handler '{id}' must carry a version token after '{prefix}'"
        ));
    }
    let valid = id.bytes().all(|byte| {
        byte.is_ascii_lowercase()
            || byte.is_ascii_digit()
            || byte == b'-'
            || byte == b'_'
            || byte == b'.'
    });
    if !valid || id.len() > 64 {
        return Err(anyhow!(
            "handler '{id}' must use lowercase ascii letters, digits, '-', '_' or '.'"
        ));
    }
    Ok(())
}
