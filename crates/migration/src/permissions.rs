//! Conversion between the two permission encodings.
//!
//! Sentry stores a flat map of permission keys to integers:
//!
//! - `-1` explicitly denies the permission,
//! - `0` leaves it unset (inherit from groups),
//! - `1` allows it.
//!
//! Sentinel stores booleans. Going forward, [`LegacyPermission::Deny`] and
//! [`LegacyPermission::Unset`] both collapse to `false`; going back, `false`
//! always becomes `0`. An explicit deny therefore does not survive a round
//! trip: `decode(encode(m)) == m` holds only when `m` has no `-1` entries.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::ConversionError;

/// Permissions in the Sentry encoding.
pub type LegacyPermissions = BTreeMap<String, i64>;

/// Permissions in the Sentinel encoding.
pub type Permissions = BTreeMap<String, bool>;

/// Tri-state value of a single Sentry permission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegacyPermission {
    Deny,
    Unset,
    Allow,
}

impl LegacyPermission {
    /// Any value other than `-1` and `0` grants the permission.
    #[must_use]
    pub const fn from_legacy(value: i64) -> Self {
        match value {
            -1 => Self::Deny,
            0 => Self::Unset,
            _ => Self::Allow,
        }
    }

    #[must_use]
    pub const fn legacy(self) -> i64 {
        match self {
            Self::Deny => -1,
            Self::Unset => 0,
            Self::Allow => 1,
        }
    }

    /// Sentinel has no way to express an explicit deny.
    #[must_use]
    pub const fn collapse(self) -> bool {
        match self {
            Self::Deny | Self::Unset => false,
            Self::Allow => true,
        }
    }

    #[must_use]
    pub const fn from_granted(granted: bool) -> Self {
        if granted { Self::Allow } else { Self::Unset }
    }
}

/// Convert Sentry permissions into Sentinel permissions.
#[must_use]
pub fn encode(legacy: &LegacyPermissions) -> Permissions {
    legacy
        .iter()
        .map(|(key, value)| {
            (
                key.clone(),
                LegacyPermission::from_legacy(*value).collapse(),
            )
        })
        .collect()
}

/// Convert Sentinel permissions back into Sentry permissions.
#[must_use]
pub fn decode(permissions: &Permissions) -> LegacyPermissions {
    permissions
        .iter()
        .map(|(key, granted)| {
            (
                key.clone(),
                LegacyPermission::from_granted(*granted).legacy(),
            )
        })
        .collect()
}

/// Parse a stored Sentry `permissions` column.
///
/// `NULL`, blank text, `[]` and `{}` all mean "no permissions". Values may be
/// JSON integers, numeric strings or booleans.
pub fn parse_legacy(raw: Option<&str>) -> Result<LegacyPermissions, ConversionError> {
    let Some(value) = parse_json(raw)? else {
        return Ok(LegacyPermissions::new());
    };

    let mut out = LegacyPermissions::new();
    for (key, value) in value {
        let number = match &value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        };
        let number = number.ok_or_else(|| {
            ConversionError::InvalidPermissions(format!("key '{key}' has value {value}"))
        })?;
        out.insert(key, number);
    }
    Ok(out)
}

/// Parse a stored Sentinel `permissions` column.
pub fn parse(raw: Option<&str>) -> Result<Permissions, ConversionError> {
    let Some(value) = parse_json(raw)? else {
        return Ok(Permissions::new());
    };

    let mut out = Permissions::new();
    for (key, value) in value {
        let granted = match &value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            _ => None,
        };
        let granted = granted.ok_or_else(|| {
            ConversionError::InvalidPermissions(format!("key '{key}' has value {value}"))
        })?;
        out.insert(key, granted);
    }
    Ok(out)
}

/// Serialize a permission map for storage. Empty maps are stored as `NULL`.
pub fn to_column<V: serde::Serialize>(
    permissions: &BTreeMap<String, V>,
) -> Result<Option<String>, ConversionError> {
    if permissions.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(permissions)
        .map(Some)
        .map_err(|err| ConversionError::InvalidPermissions(err.to_string()))
}

fn parse_json(raw: Option<&str>) -> Result<Option<serde_json::Map<String, Value>>, ConversionError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };

    let value: Value = serde_json::from_str(raw)
        .map_err(|err| ConversionError::InvalidPermissions(format!("{raw}: {err}")))?;

    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        Value::Array(items) if items.is_empty() => Ok(None),
        other => Err(ConversionError::InvalidPermissions(format!(
            "expected an object, got {other}"
        ))),
    }
}
