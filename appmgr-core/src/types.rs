//! Domain types for application identity.
//!
//! Names are validated once, at construction. Everything downstream (address
//! derivation, registry keys, signal payloads) can rely on an [`AppName`] being
//! non-empty, bounded, and safe to splice into a bus interface name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// Maximum length of an application name, in characters.
pub const NAME_SIZE: usize = 256;

/// Separator between application name and instance id in an instance name.
pub const INSTANCE_SEPARATOR: char = ':';

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A validated base application name such as `clock` or `browser`.
///
/// Accepted names match `[A-Za-z_][A-Za-z0-9_]*`, are at most [`NAME_SIZE`]
/// characters, and do not end in a digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppName(String);

impl AppName {
    pub fn new(name: &str) -> Result<Self, AddressError> {
        validate_app_name(name)?;
        Ok(Self(name.to_owned()))
    }

    /// Derive the base name from a registration name: its first dot-separated
    /// segment (`"clock.desktop"` → `clock`). The whole name is length-checked.
    pub fn from_registration(name: &str) -> Result<Self, AddressError> {
        if name.is_empty() {
            return Err(AddressError::EmptyName);
        }
        let len = name.chars().count();
        if len > NAME_SIZE {
            return Err(AddressError::NameTooLong {
                len,
                max: NAME_SIZE,
            });
        }
        let base = name.split('.').next().unwrap_or_default();
        Self::new(base)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for AppName {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        validate_app_name(&s)?;
        Ok(Self(s))
    }
}

impl From<AppName> for String {
    fn from(name: AppName) -> Self {
        name.0
    }
}

impl FromStr for AppName {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The externally visible identity of a running instance: `app` for
/// single-instance applications, `app:N` for multi-instance ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceName {
    app: AppName,
    instance_id: Option<u32>,
}

impl InstanceName {
    pub fn single(app: AppName) -> Self {
        Self {
            app,
            instance_id: None,
        }
    }

    pub fn multiple(app: AppName, instance_id: u32) -> Self {
        Self {
            app,
            instance_id: Some(instance_id),
        }
    }

    /// Parse `app` or `app:N`.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        match input.split_once(INSTANCE_SEPARATOR) {
            None => Ok(Self::single(AppName::new(input)?)),
            Some((app, id)) => {
                let app = AppName::new(app)?;
                let instance_id = id
                    .parse::<u32>()
                    .ok()
                    .filter(|_| id.bytes().all(|b| b.is_ascii_digit()))
                    .ok_or_else(|| AddressError::InvalidInstanceId {
                        input: input.to_owned(),
                    })?;
                Ok(Self::multiple(app, instance_id))
            }
        }
    }

    pub fn app(&self) -> &AppName {
        &self.app
    }

    pub fn instance_id(&self) -> Option<u32> {
        self.instance_id
    }

    pub fn instance_type(&self) -> InstanceType {
        match self.instance_id {
            Some(_) => InstanceType::Multiple,
            None => InstanceType::Single,
        }
    }
}

impl fmt::Display for InstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance_id {
            Some(id) => write!(f, "{}{INSTANCE_SEPARATOR}{id}", self.app),
            None => self.app.fmt(f),
        }
    }
}

impl FromStr for InstanceName {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Scheduling priority; lower values run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority(pub u32);

impl Priority {
    pub const CRITICAL: Priority = Priority(0);
    pub const NORMAL: Priority = Priority(10);
    pub const LOW: Priority = Priority(100);
    pub const NICE: Priority = Priority(1000);
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Whether an application runs as one process or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    #[default]
    Single,
    Multiple,
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceType::Single => write!(f, "single"),
            InstanceType::Multiple => write!(f, "multiple"),
        }
    }
}

/// Direction carried by a `rotate` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Clockwise,
    Anticlockwise,
}

impl Rotation {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Rotation::Clockwise),
            1 => Some(Rotation::Anticlockwise),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Rotation::Clockwise => 0,
            Rotation::Anticlockwise => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_app_name(name: &str) -> Result<(), AddressError> {
    if name.is_empty() {
        return Err(AddressError::EmptyName);
    }
    let len = name.chars().count();
    if len > NAME_SIZE {
        return Err(AddressError::NameTooLong {
            len,
            max: NAME_SIZE,
        });
    }
    for (idx, ch) in name.chars().enumerate() {
        let allowed = ch == '_' || ch.is_ascii_alphabetic() || (idx > 0 && ch.is_ascii_digit());
        if !allowed {
            return Err(AddressError::InvalidCharacter {
                name: name.to_owned(),
                ch,
            });
        }
    }
    if name.ends_with(|c: char| c.is_ascii_digit()) {
        return Err(AddressError::TrailingDigit {
            name: name.to_owned(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
