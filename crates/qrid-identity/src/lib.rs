#![warn(missing_docs)]
//! # qrid-identity
//!
//! ## Purpose
//! Reads the device identifier from the platform configuration store.
//!
//! ## Responsibilities
//! - Define a backend-agnostic [`IdentifierSource`] trait.
//! - Read the identifier from the Windows registry on Windows.
//! - Read the identifier from an environment variable elsewhere.
//! - Provide a fixed in-memory source for tests and demos.
//!
//! ## Data flow
//! The session controller calls [`IdentifierSource::read_identifier`] exactly
//! once per run; the resulting [`Identifier`] goes straight to the encoder.
//!
//! ## Error model
//! Every failure is an [`IdentityError`]. Callers treat all of them as fatal;
//! there is no retry.
//!
//! ## Security and privacy notes
//! Sources never log or cache the value they read.

use qrid_core::Identifier;
use thiserror::Error;

/// Registry key holding the identifier, relative to `HKEY_LOCAL_MACHINE`.
pub const DEFAULT_REGISTRY_KEY: &str = r"Software\BioSecQRID";
/// Registry value name holding the identifier.
pub const DEFAULT_REGISTRY_VALUE: &str = "PlainText";
/// Environment variable used as the identifier store off Windows.
pub const DEFAULT_ENV_VAR: &str = "QRID_DEVICE_ID";

/// Trait implemented by identifier stores.
pub trait IdentifierSource: Send + Sync {
    /// Reads the identifier. Performs one read and has no other side effects.
    ///
    /// # Errors
    /// Returns [`IdentityError`] when the value is missing, unreadable, or
    /// empty.
    fn read_identifier(&self) -> Result<Identifier, IdentityError>;

    /// Short human-readable location for logs (never the value itself).
    fn describe(&self) -> String;
}

/// Where to look for the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySettings {
    /// Registry key path under `HKEY_LOCAL_MACHINE`.
    pub registry_key: String,
    /// Registry value name.
    pub registry_value: String,
    /// Environment variable name for [`EnvSource`].
    pub env_var: String,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            registry_key: DEFAULT_REGISTRY_KEY.to_string(),
            registry_value: DEFAULT_REGISTRY_VALUE.to_string(),
            env_var: DEFAULT_ENV_VAR.to_string(),
        }
    }
}

/// Selects the platform store: registry on Windows, environment elsewhere.
pub fn default_source(settings: &IdentitySettings) -> Box<dyn IdentifierSource> {
    #[cfg(windows)]
    {
        Box::new(RegistrySource::new(
            settings.registry_key.clone(),
            settings.registry_value.clone(),
        ))
    }

    #[cfg(not(windows))]
    {
        Box::new(EnvSource::new(settings.env_var.clone()))
    }
}

/// Reads a `REG_SZ` value under `HKEY_LOCAL_MACHINE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySource {
    key: String,
    value: String,
}

impl RegistrySource {
    /// Creates a registry source for `key` / `value`.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl IdentifierSource for RegistrySource {
    fn read_identifier(&self) -> Result<Identifier, IdentityError> {
        #[cfg(windows)]
        {
            let raw = registry::read_string_value(&self.key, &self.value)?;
            Identifier::new(raw).map_err(|_| IdentityError::Empty {
                location: self.describe(),
            })
        }

        #[cfg(not(windows))]
        {
            Err(IdentityError::Unsupported(
                "registry identifier source is only available on Windows".to_string(),
            ))
        }
    }

    fn describe(&self) -> String {
        format!(r"HKLM\{}\{}", self.key, self.value)
    }
}

/// Reads the identifier from an environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSource {
    var: String,
}

impl EnvSource {
    /// Creates a source reading `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl IdentifierSource for EnvSource {
    fn read_identifier(&self) -> Result<Identifier, IdentityError> {
        let raw = match std::env::var(&self.var) {
            Ok(raw) => raw,
            Err(std::env::VarError::NotPresent) => {
                return Err(IdentityError::NotFound {
                    location: self.describe(),
                });
            }
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(IdentityError::Backend(format!(
                    "{} is not valid unicode",
                    self.describe()
                )));
            }
        };

        Identifier::new(raw).map_err(|_| IdentityError::Empty {
            location: self.describe(),
        })
    }

    fn describe(&self) -> String {
        format!("env:{}", self.var)
    }
}

/// Deterministic in-memory source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSource {
    value: Option<String>,
}

impl FixedSource {
    /// Source that always returns `value`.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }

    /// Source that always reports a missing value.
    pub fn missing() -> Self {
        Self { value: None }
    }
}

impl IdentifierSource for FixedSource {
    fn read_identifier(&self) -> Result<Identifier, IdentityError> {
        let raw = self.value.clone().ok_or_else(|| IdentityError::NotFound {
            location: self.describe(),
        })?;
        Identifier::new(raw).map_err(|_| IdentityError::Empty {
            location: self.describe(),
        })
    }

    fn describe(&self) -> String {
        "fixed".to_string()
    }
}

/// Identifier store error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// Key or value does not exist.
    #[error("identifier not found at {location}")]
    NotFound {
        /// Store location that was queried.
        location: String,
    },
    /// Store refused read access.
    #[error("access denied reading identifier at {location}")]
    AccessDenied {
        /// Store location that was queried.
        location: String,
    },
    /// Value exists but is empty.
    #[error("identifier at {location} is empty")]
    Empty {
        /// Store location that was queried.
        location: String,
    },
    /// Store returned an unexpected failure.
    #[error("identifier store failure: {0}")]
    Backend(String),
    /// Source is not available on this platform.
    #[error("identifier source unsupported: {0}")]
    Unsupported(String),
}

#[cfg(windows)]
mod registry {
    //! `RegGetValueW` wrapper.

    use std::ptr::null_mut;

    use windows_sys::Win32::Foundation::{
        ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_SUCCESS,
    };
    use windows_sys::Win32::System::Registry::{HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ, RegGetValueW};

    use super::IdentityError;

    const MAX_ATTEMPTS: usize = 3;

    pub(super) fn read_string_value(key: &str, value: &str) -> Result<String, IdentityError> {
        let location = format!(r"HKLM\{key}\{value}");
        let key_wide = to_wide(key);
        let value_wide = to_wide(value);

        let mut size_bytes: u32 = 0;
        let status = unsafe {
            // Safety:
            // - Key/value strings are NUL-terminated UTF-16 buffers alive for the call.
            // - Null data pointer asks only for the required size.
            RegGetValueW(
                HKEY_LOCAL_MACHINE,
                key_wide.as_ptr(),
                value_wide.as_ptr(),
                RRF_RT_REG_SZ,
                null_mut(),
                null_mut(),
                &mut size_bytes,
            )
        };
        check_status(status, &location)?;

        // The value can grow between the size query and the read.
        for _ in 0..MAX_ATTEMPTS {
            let mut buffer = vec![0_u16; (size_bytes as usize).div_ceil(2).max(1)];
            let mut written_bytes = (buffer.len() * 2) as u32;
            let status = unsafe {
                // Safety:
                // - `buffer` holds `written_bytes` bytes and outlives the call.
                RegGetValueW(
                    HKEY_LOCAL_MACHINE,
                    key_wide.as_ptr(),
                    value_wide.as_ptr(),
                    RRF_RT_REG_SZ,
                    null_mut(),
                    buffer.as_mut_ptr().cast(),
                    &mut written_bytes,
                )
            };

            if status == ERROR_MORE_DATA {
                size_bytes = written_bytes;
                continue;
            }
            check_status(status, &location)?;

            let units = (written_bytes as usize / 2).min(buffer.len());
            let text = &buffer[..units];
            let end = text.iter().position(|unit| *unit == 0).unwrap_or(text.len());
            return Ok(String::from_utf16_lossy(&text[..end]));
        }

        Err(IdentityError::Backend(format!(
            "{location} kept growing while being read"
        )))
    }

    fn check_status(status: u32, location: &str) -> Result<(), IdentityError> {
        match status {
            ERROR_SUCCESS => Ok(()),
            ERROR_FILE_NOT_FOUND => Err(IdentityError::NotFound {
                location: location.to_string(),
            }),
            ERROR_ACCESS_DENIED => Err(IdentityError::AccessDenied {
                location: location.to_string(),
            }),
            other => Err(IdentityError::Backend(format!(
                "RegGetValueW failed for {location} with code {other}"
            ))),
        }
    }

    fn to_wide(value: &str) -> Vec<u16> {
        value.encode_utf16().chain(std::iter::once(0)).collect()
    }
}
