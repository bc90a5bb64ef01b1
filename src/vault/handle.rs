//! Secret handles: the `(alias, block, attribute)` address of a secret.

use std::fmt;
use std::str::FromStr;

use crate::errors::VaultError;

/// Prefix marking a configuration value as a vault reference.
pub const VAULT_PREFIX: &str = "VAULT::";

/// Separator between handle fields.
pub const DELIMITER: &str = "::";

/// The address of one stored secret.
///
/// All three parts are non-empty and never contain `::` or a leading or
/// trailing `:`, so the rendered `VAULT::alias::block::attribute` form
/// always parses back to the same handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretHandle {
    alias: String,
    block: String,
    attribute: String,
}

impl SecretHandle {
    pub fn new(alias: &str, block: &str, attribute: &str) -> Result<Self, VaultError> {
        validate_part("alias", alias)?;
        validate_part("block", block)?;
        validate_part("attribute", attribute)?;

        Ok(Self {
            alias: alias.to_string(),
            block: block.to_string(),
            attribute: attribute.to_string(),
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn block(&self) -> &str {
        &self.block
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Parse `VAULT::alias::block::attribute`. The prefix is required.
    pub fn parse_reference(value: &str) -> Result<Self, VaultError> {
        let fields = value.strip_prefix(VAULT_PREFIX).ok_or_else(|| {
            VaultError::InvalidHandle(format!("reference must start with {VAULT_PREFIX}"))
        })?;
        Self::parse_fields(fields)
    }

    /// Parse `alias::block::attribute` with exactly three fields.
    pub fn parse_fields(fields: &str) -> Result<Self, VaultError> {
        let parts: Vec<&str> = fields.split(DELIMITER).collect();
        match parts.as_slice() {
            [alias, block, attribute] => Self::new(alias, block, attribute),
            _ => Err(VaultError::InvalidHandle(format!(
                "expected alias{DELIMITER}block{DELIMITER}attribute, got {} field(s)",
                parts.len()
            ))),
        }
    }

    /// The keystore entry name for this handle.
    ///
    /// Each part is prefixed with its byte length, so two different
    /// handles can never produce the same name.
    pub fn entry_name(&self) -> String {
        format!(
            "{}:{}/{}:{}/{}:{}",
            self.alias.len(),
            self.alias,
            self.block.len(),
            self.block,
            self.attribute.len(),
            self.attribute
        )
    }

    /// Reverse of [`entry_name`](Self::entry_name).
    pub fn from_entry_name(name: &str) -> Option<Self> {
        let (alias, rest) = take_length_prefixed(name)?;
        let rest = rest.strip_prefix('/')?;
        let (block, rest) = take_length_prefixed(rest)?;
        let rest = rest.strip_prefix('/')?;
        let (attribute, rest) = take_length_prefixed(rest)?;
        if !rest.is_empty() {
            return None;
        }
        Self::new(alias, block, attribute).ok()
    }
}

impl fmt::Display for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{VAULT_PREFIX}{}{DELIMITER}{}{DELIMITER}{}",
            self.alias, self.block, self.attribute
        )
    }
}

impl FromStr for SecretHandle {
    type Err = VaultError;

    /// Accepts both `VAULT::a::b::c` and the bare `a::b::c`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(VAULT_PREFIX) {
            Some(fields) => Self::parse_fields(fields),
            None => Self::parse_fields(s),
        }
    }
}

fn validate_part(what: &str, value: &str) -> Result<(), VaultError> {
    if value.is_empty() {
        return Err(VaultError::InvalidHandle(format!("{what} cannot be empty")));
    }
    if value.contains(DELIMITER) || value.starts_with(':') || value.ends_with(':') {
        return Err(VaultError::InvalidHandle(format!(
            "{what} '{value}' cannot contain '{DELIMITER}' or start/end with ':'"
        )));
    }
    Ok(())
}

/// Split `"<len>:<bytes>..."` into the value and the remainder.
fn take_length_prefixed(input: &str) -> Option<(&str, &str)> {
    let (len, rest) = input.split_once(':')?;
    let len: usize = len.parse().ok()?;
    let value = rest.get(..len)?;
    Some((value, &rest[len..]))
}
