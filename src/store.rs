//! # Content Store Module
//!
//! Persistent catalog of content records, global settings and the
//! administrator set, backed by a single JSON document. The document is kept
//! fully in memory and rewritten in full after every mutation.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::{DEFAULT_CHANNEL_ID, DEFAULT_CHANNEL_URL, DEFAULT_WELCOME_TEXT};
use crate::errors::StoreError;

/// A photo reference and its description, stored under a numeric code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub photo_id: String,
    pub description: String,
}

/// Global bot settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub channel_id: String,
    pub channel_url: String,
    pub welcome_text: String,
    pub welcome_photo: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
            channel_url: DEFAULT_CHANNEL_URL.to_string(),
            welcome_text: DEFAULT_WELCOME_TEXT.to_string(),
            welcome_photo: None,
        }
    }
}

/// Names of the individual settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    ChannelId,
    ChannelUrl,
    WelcomeText,
    WelcomePhoto,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        SettingKey::ChannelId,
        SettingKey::ChannelUrl,
        SettingKey::WelcomeText,
        SettingKey::WelcomePhoto,
    ];

    /// Field name in the persisted document
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::ChannelId => "channel_id",
            SettingKey::ChannelUrl => "channel_url",
            SettingKey::WelcomeText => "welcome_text",
            SettingKey::WelcomePhoto => "welcome_photo",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A new value for one setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingUpdate {
    ChannelId(String),
    ChannelUrl(String),
    WelcomeText(String),
    /// `None` removes the welcome photo
    WelcomePhoto(Option<String>),
}

impl SettingUpdate {
    pub fn key(&self) -> SettingKey {
        match self {
            SettingUpdate::ChannelId(_) => SettingKey::ChannelId,
            SettingUpdate::ChannelUrl(_) => SettingKey::ChannelUrl,
            SettingUpdate::WelcomeText(_) => SettingKey::WelcomeText,
            SettingUpdate::WelcomePhoto(_) => SettingKey::WelcomePhoto,
        }
    }

    fn apply(self, settings: &mut Settings) {
        match self {
            SettingUpdate::ChannelId(value) => settings.channel_id = value,
            SettingUpdate::ChannelUrl(value) => settings.channel_url = value,
            SettingUpdate::WelcomeText(value) => settings.welcome_text = value,
            SettingUpdate::WelcomePhoto(value) => settings.welcome_photo = value,
        }
    }
}

/// Content records in insertion order.
///
/// Persisted as a JSON object; entry order in the file is preserved on load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<(String, ContentRecord)>,
}

impl Catalog {
    fn position(&self, code: &str) -> Option<usize> {
        self.entries.iter().position(|(existing, _)| existing == code)
    }

    pub fn get(&self, code: &str) -> Option<&ContentRecord> {
        self.position(code).map(|index| &self.entries[index].1)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.position(code).is_some()
    }

    /// Insert or replace; a replaced entry keeps its original position
    fn insert(&mut self, code: String, record: ContentRecord) {
        match self.position(&code) {
            Some(index) => self.entries[index].1 = record,
            None => self.entries.push((code, record)),
        }
    }

    fn remove(&mut self, code: &str) -> Option<ContentRecord> {
        self.position(code)
            .map(|index| self.entries.remove(index).1)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(code, _)| code.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (code, record) in &self.entries {
            map.serialize_entry(code, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CatalogVisitor)
    }
}

struct CatalogVisitor;

impl<'de> Visitor<'de> for CatalogVisitor {
    type Value = Catalog;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map of content codes to content records")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Catalog, A::Error> {
        let mut catalog = Catalog::default();
        while let Some((code, record)) = access.next_entry::<String, ContentRecord>()? {
            catalog.insert(code, record);
        }
        Ok(catalog)
    }
}

/// The whole persisted document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub admins: BTreeSet<u64>,
    #[serde(default)]
    pub content: Catalog,
}

/// JSON-backed store shared by all handlers.
///
/// Every mutation holds the internal lock across modify and rewrite, so
/// concurrent writers cannot overwrite each other's changes.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    document: Mutex<Document>,
}

impl Store {
    /// Load the store from `path`, creating a default document if the file is missing.
    ///
    /// `seed_admins` are merged into the admin set; the file is rewritten only
    /// when that changes the set.
    pub fn load(path: impl Into<PathBuf>, seed_admins: &[u64]) -> Result<Self, StoreError> {
        let path = path.into();

        let document = match fs::read_to_string(&path) {
            Ok(raw) => {
                let mut document: Document = serde_json::from_str(&raw)?;
                let known = document.admins.len();
                document.admins.extend(seed_admins.iter().copied());
                if document.admins.len() != known {
                    info!(path = %path.display(), added = document.admins.len() - known, "Merged configured admins into store");
                    write_document(&path, &document)?;
                }
                document
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "Store file not found, creating default document");
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let document = Document {
                    admins: seed_admins.iter().copied().collect(),
                    ..Document::default()
                };
                write_document(&path, &document)?;
                document
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rewrite the backing file with `next`, then make it the live document
    fn commit(&self, current: &mut MutexGuard<'_, Document>, next: Document) -> Result<(), StoreError> {
        write_document(&self.path, &next)?;
        **current = next;
        Ok(())
    }

    pub fn is_admin(&self, user_id: u64) -> bool {
        self.lock().admins.contains(&user_id)
    }

    pub fn admin_count(&self) -> usize {
        self.lock().admins.len()
    }

    /// Insert a new record; fails if the code is already present
    pub fn add_content(&self, code: &str, photo_id: &str, description: &str) -> Result<(), StoreError> {
        let mut current = self.lock();
        if current.content.contains(code) {
            return Err(StoreError::AlreadyExists(code.to_string()));
        }

        let mut next = current.clone();
        next.content.insert(
            code.to_string(),
            ContentRecord {
                photo_id: photo_id.to_string(),
                description: description.to_string(),
            },
        );
        self.commit(&mut current, next)?;

        info!(code = %code, "Content added");
        Ok(())
    }

    pub fn get_content(&self, code: &str) -> Option<ContentRecord> {
        self.lock().content.get(code).cloned()
    }

    /// Remove a record, returning whether it existed
    pub fn delete_content(&self, code: &str) -> Result<bool, StoreError> {
        let mut current = self.lock();
        if !current.content.contains(code) {
            debug!(code = %code, "Delete requested for unknown code");
            return Ok(false);
        }

        let mut next = current.clone();
        next.content.remove(code);
        self.commit(&mut current, next)?;

        info!(code = %code, "Content deleted");
        Ok(true)
    }

    /// All codes in insertion order
    pub fn list_codes(&self) -> Vec<String> {
        self.lock().content.codes().map(str::to_string).collect()
    }

    pub fn content_count(&self) -> usize {
        self.lock().content.len()
    }

    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    pub fn get_setting(&self, key: SettingKey) -> Option<String> {
        let document = self.lock();
        let settings = &document.settings;
        match key {
            SettingKey::ChannelId => Some(settings.channel_id.clone()),
            SettingKey::ChannelUrl => Some(settings.channel_url.clone()),
            SettingKey::WelcomeText => Some(settings.welcome_text.clone()),
            SettingKey::WelcomePhoto => settings.welcome_photo.clone(),
        }
    }

    pub fn update_setting(&self, update: SettingUpdate) -> Result<(), StoreError> {
        let key = update.key();
        let mut current = self.lock();
        let mut next = current.clone();
        update.apply(&mut next.settings);
        self.commit(&mut current, next)?;

        info!(setting = %key, "Setting updated");
        Ok(())
    }

    /// Copy of the live document
    pub fn snapshot(&self) -> Document {
        self.lock().clone()
    }
}

/// Serialize the document and atomically replace the file at `path`
fn write_document(path: &Path, document: &Document) -> Result<(), StoreError> {
    let encoded = serde_json::to_string_pretty(document)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(encoded.as_bytes())?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), bytes = encoded.len(), "Store document written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(photo: &str, description: &str) -> ContentRecord {
        ContentRecord {
            photo_id: photo.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_catalog_keeps_insertion_order() {
        let mut catalog = Catalog::default();
        catalog.insert("30".to_string(), record("a", "first"));
        catalog.insert("10".to_string(), record("b", "second"));
        catalog.insert("20".to_string(), record("c", "third"));

        let codes: Vec<&str> = catalog.codes().collect();
        assert_eq!(codes, vec!["30", "10", "20"]);

        catalog.remove("10");
        let codes: Vec<&str> = catalog.codes().collect();
        assert_eq!(codes, vec!["30", "20"]);
    }

    #[test]
    fn test_catalog_json_order_preserved() {
        let raw = r#"{"9": {"photo_id": "p9", "description": "nine"},
                      "1": {"photo_id": "p1", "description": "one"}}"#;
        let catalog: Catalog = serde_json::from_str(raw).unwrap();
        let codes: Vec<&str> = catalog.codes().collect();
        assert_eq!(codes, vec!["9", "1"]);

        let encoded = serde_json::to_string(&catalog).unwrap();
        assert!(encoded.find("\"9\"").unwrap() < encoded.find("\"1\"").unwrap());
    }

    #[test]
    fn test_document_layout() {
        let document = Document::default();
        let value = serde_json::to_value(&document).unwrap();

        assert!(value["settings"]["welcome_photo"].is_null());
        assert_eq!(value["settings"]["channel_id"], DEFAULT_CHANNEL_ID);
        assert!(value["admins"].as_array().unwrap().is_empty());
        assert!(value["content"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_setting_keys_match_document_fields() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        for key in SettingKey::ALL {
            assert!(value.get(key.as_str()).is_some(), "missing field {key}");
        }
    }
}
