use crate::error::SecretError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format version written into freshly created boxes.
pub const BOX_FORMAT_VERSION: &str = "1";
/// Version label given to new secrets when none is supplied.
pub const DEFAULT_SECRET_VERSION: &str = "1.0.0";

pub(crate) fn now() -> String {
    Local::now().to_rfc3339()
}

/// The decrypted contents of a box file.
///
/// Empty fields are left out of the serialized form, so every field has a
/// default and a payload with nothing but a name decodes fine.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretBox {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    owner: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    last_updated: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    secrets: Vec<Secret>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    login: String,
    #[serde(default, alias = "pwd", skip_serializing_if = "String::is_empty")]
    password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    notes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    last_updated: String,
    #[serde(default, alias = "others", skip_serializing_if = "BTreeMap::is_empty")]
    items: BTreeMap<String, String>,
}

impl Secret {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: DEFAULT_SECRET_VERSION.to_string(),
            last_updated: now(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn last_updated(&self) -> &str {
        &self.last_updated
    }

    pub fn items(&self) -> &BTreeMap<String, String> {
        &self.items
    }

    pub fn item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    pub fn set_version(&mut self, version: &str) {
        self.version = version.to_string();
        self.touch();
    }

    pub fn set_login(&mut self, login: &str) {
        self.login = login.to_string();
        self.touch();
    }

    pub fn set_password(&mut self, password: &str) {
        self.password = password.to_string();
        self.touch();
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
        self.touch();
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.notes = notes.to_string();
        self.touch();
    }

    /// Adds a new item; an existing key is an error.
    pub fn add_item(&mut self, key: &str, value: &str) -> Result<(), SecretError> {
        if self.items.contains_key(key) {
            return Err(SecretError::ItemAlreadyExists {
                secret: self.name.clone(),
                item: key.to_string(),
            });
        }
        self.items.insert(key.to_string(), value.to_string());
        self.touch();
        Ok(())
    }

    /// Inserts or replaces an item.
    pub fn set_item(&mut self, key: &str, value: &str) {
        self.items.insert(key.to_string(), value.to_string());
        self.touch();
    }

    pub fn remove_item(&mut self, key: &str) -> Result<(), SecretError> {
        if self.items.remove(key).is_none() {
            return Err(SecretError::ItemNotFound {
                secret: self.name.clone(),
                item: key.to_string(),
            });
        }
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.last_updated = now();
    }
}

impl SecretBox {
    pub fn new(name: &str, owner: &str) -> Self {
        SecretBox {
            name: name.to_string(),
            owner: owner.to_string(),
            version: BOX_FORMAT_VERSION.to_string(),
            last_updated: now(),
            secrets: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn last_updated(&self) -> &str {
        &self.last_updated
    }

    /// Secrets in insertion order.
    pub fn secrets(&self) -> &[Secret] {
        &self.secrets
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Exact, case-sensitive lookup.
    pub fn find(&self, name: &str) -> Option<&Secret> {
        self.secrets.iter().find(|s| s.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Secret> {
        self.secrets.iter_mut().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Appends a secret. Names must be non-empty and unique.
    pub fn add_secret(&mut self, secret: Secret) -> Result<(), SecretError> {
        if secret.name.is_empty() {
            return Err(SecretError::EmptySecretName);
        }
        if self.contains(&secret.name) {
            return Err(SecretError::DuplicateSecretName(secret.name));
        }
        self.secrets.push(secret);
        self.touch();
        Ok(())
    }

    /// Removes the named secret, keeping the order of the rest.
    ///
    /// Returns `false` and leaves the box untouched when nothing matches.
    pub fn remove_secret(&mut self, name: &str) -> bool {
        match self.secrets.iter().position(|s| s.name == name) {
            Some(index) => {
                self.secrets.remove(index);
                self.touch();
                true
            }
            None => false,
        }
    }

    pub fn rename_secret(&mut self, from: &str, to: &str) -> Result<(), SecretError> {
        if to.is_empty() {
            return Err(SecretError::EmptySecretName);
        }
        if from != to && self.contains(to) {
            return Err(SecretError::DuplicateSecretName(to.to_string()));
        }
        let secret = self
            .find_mut(from)
            .ok_or_else(|| SecretError::SecretNotFound(from.to_string()))?;
        secret.name = to.to_string();
        secret.touch();
        self.touch();
        Ok(())
    }

    /// Refresh the box timestamp after an in-place edit of a secret.
    pub fn touch(&mut self) {
        self.last_updated = now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(b: &SecretBox) -> Vec<&str> {
        b.secrets().iter().map(Secret::name).collect()
    }

    #[test]
    fn create_new_box_works() {
        let b = SecretBox::new("test", "me");
        assert_eq!(b.name(), "test");
        assert_eq!(b.owner(), "me");
        assert_eq!(b.version(), BOX_FORMAT_VERSION);
        assert!(b.is_empty());
        assert_ne!(b.last_updated(), "");
    }

    #[test]
    fn new_secret_has_default_version() {
        let s = Secret::new("email");
        assert_eq!(s.version(), "1.0.0");
        assert_ne!(s.last_updated(), "");
    }

    #[test]
    fn add_secret_works() {
        let mut b = SecretBox::new("test", "me");
        b.add_secret(Secret::new("A")).unwrap();
        assert!(b.contains("A"));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn add_duplicate_secret_fails() {
        let mut b = SecretBox::new("test", "me");
        b.add_secret(Secret::new("A")).unwrap();
        match b.add_secret(Secret::new("A")) {
            Err(SecretError::DuplicateSecretName(k)) => assert_eq!(k, "A"),
            other => panic!("expected DuplicateSecretName, got: {other:?}"),
        }
    }

    #[test]
    fn add_secret_with_empty_name_fails() {
        let mut b = SecretBox::new("test", "me");
        assert_eq!(
            b.add_secret(Secret::new("")),
            Err(SecretError::EmptySecretName)
        );
    }

    #[test]
    fn secrets_keep_insertion_order() {
        let mut b = SecretBox::new("test", "me");
        for name in ["zeta", "alpha", "mid"] {
            b.add_secret(Secret::new(name)).unwrap();
        }
        assert_eq!(names(&b), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn remove_secret_preserves_order() {
        let mut b = SecretBox::new("test", "me");
        for name in ["secret1", "secret2", "secret3"] {
            b.add_secret(Secret::new(name)).unwrap();
        }
        assert!(b.remove_secret("secret2"));
        assert_eq!(names(&b), ["secret1", "secret3"]);
    }

    #[test]
    fn remove_missing_secret_leaves_box_unchanged() {
        let mut b = SecretBox::new("test", "me");
        b.add_secret(Secret::new("MySecret")).unwrap();
        let before = b.clone();

        assert!(!b.remove_secret("mysecret"));
        assert!(!b.remove_secret("other"));
        assert_eq!(b, before);
    }

    #[test]
    fn remove_from_empty_box() {
        let mut b = SecretBox::new("test", "me");
        assert!(!b.remove_secret("anything"));
    }

    #[test]
    fn find_is_case_sensitive() {
        let mut b = SecretBox::new("test", "me");
        b.add_secret(Secret::new("MySecret")).unwrap();
        assert!(b.find("MySecret").is_some());
        assert!(b.find("mysecret").is_none());
    }

    #[test]
    fn rename_to_existing_name_fails() {
        let mut b = SecretBox::new("test", "me");
        b.add_secret(Secret::new("a")).unwrap();
        b.add_secret(Secret::new("b")).unwrap();

        assert_eq!(
            b.rename_secret("a", "b"),
            Err(SecretError::DuplicateSecretName("b".into()))
        );
        b.rename_secret("a", "c").unwrap();
        assert_eq!(names(&b), ["c", "b"]);
    }

    #[test]
    fn rename_missing_secret_fails() {
        let mut b = SecretBox::new("test", "me");
        assert_eq!(
            b.rename_secret("nope", "x"),
            Err(SecretError::SecretNotFound("nope".into()))
        );
    }

    #[test]
    fn items_add_set_remove() {
        let mut s = Secret::new("card");
        s.add_item("cc", "1234").unwrap();
        assert_eq!(s.item("cc"), Some("1234"));

        assert!(matches!(
            s.add_item("cc", "5678"),
            Err(SecretError::ItemAlreadyExists { .. })
        ));

        s.set_item("cc", "5678");
        assert_eq!(s.item("cc"), Some("5678"));

        s.remove_item("cc").unwrap();
        assert_eq!(s.item("cc"), None);
        assert!(matches!(
            s.remove_item("cc"),
            Err(SecretError::ItemNotFound { .. })
        ));
    }
}
