//! Boolean permission maps, stored as a JSON object in `permissions`
//! columns. An empty map is stored as NULL.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ResultSentinel, SentinelError};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeMap<String, bool>);

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `permission`.
    pub fn add(&mut self, permission: &str) -> &mut Self {
        self.0.insert(permission.to_string(), true);
        self
    }

    /// Set `permission` explicitly, granting or denying it.
    pub fn update(&mut self, permission: &str, value: bool) -> &mut Self {
        self.0.insert(permission.to_string(), value);
        self
    }

    pub fn remove(&mut self, permission: &str) -> &mut Self {
        self.0.remove(permission);
        self
    }

    /// The explicit value for `permission`, if one is set.
    pub fn get(&self, permission: &str) -> Option<bool> {
        self.0.get(permission).copied()
    }

    /// Whether `permission` is explicitly granted.
    pub fn has(&self, permission: &str) -> bool {
        self.get(permission).unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(key, value)| (key.as_str(), *value))
    }

    pub(crate) fn from_column(value: Option<&str>) -> ResultSentinel<Self> {
        match value.map(str::trim) {
            None | Some("") | Some("[]") => Ok(Self::default()),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|err| SentinelError::InvalidPermissions(format!("{raw}: {err}"))),
        }
    }

    pub(crate) fn to_column(&self) -> ResultSentinel<Option<String>> {
        if self.is_empty() {
            return Ok(None);
        }
        serde_json::to_string(self)
            .map(Some)
            .map_err(|err| SentinelError::InvalidPermissions(err.to_string()))
    }
}

impl<const N: usize> From<[(&str, bool); N]> for Permissions {
    fn from(entries: [(&str, bool); N]) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_update_remove() {
        let mut permissions = Permissions::new();
        permissions.add("blog.edit").update("blog.delete", false);

        assert!(permissions.has("blog.edit"));
        assert!(!permissions.has("blog.delete"));
        assert_eq!(permissions.get("blog.delete"), Some(false));
        assert_eq!(permissions.get("blog.publish"), None);

        permissions.remove("blog.edit");
        assert_eq!(permissions.get("blog.edit"), None);
    }

    #[test]
    fn empty_maps_are_stored_as_null() {
        assert_eq!(Permissions::new().to_column().unwrap(), None);
        assert_eq!(Permissions::from_column(None).unwrap(), Permissions::new());
        assert_eq!(
            Permissions::from_column(Some("[]")).unwrap(),
            Permissions::new()
        );
    }

    #[test]
    fn column_value_is_a_json_object() {
        let permissions = Permissions::from([("admin", true), ("blog", false)]);
        let stored = permissions.to_column().unwrap().unwrap();

        assert_eq!(stored, r#"{"admin":true,"blog":false}"#);
        assert_eq!(Permissions::from_column(Some(&stored)).unwrap(), permissions);
    }

    #[test]
    fn legacy_integers_are_rejected() {
        assert!(matches!(
            Permissions::from_column(Some(r#"{"admin":1}"#)),
            Err(SentinelError::InvalidPermissions(_))
        ));
    }
}
