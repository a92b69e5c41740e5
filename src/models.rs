// Wire shapes returned by the service and the entries built from them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;

/// Outer JSON object every task endpoint answers with.
///
/// `zt` is the status sentinel (1 = success), `info` is either a message or,
/// for the share-link task, a nested object, and `text` carries the payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub zt: Value,
    #[serde(default)]
    pub info: Value,
    #[serde(default)]
    pub text: Value,
}

impl Envelope {
    pub fn is_ok(&self) -> bool {
        status_code(&self.zt) == Some(1)
    }

    /// The service's failure message, or a generic one.
    pub fn message(&self) -> String {
        match &self.info {
            Value::String(s) if !s.is_empty() => s.clone(),
            _ => "unknown error".to_string(),
        }
    }

    pub fn payload(&self) -> Payload {
        Payload::from(&self.text)
    }
}

/// Only a JSON number counts as the sentinel; `"1"` is a failure.
pub(crate) fn status_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// The `text` field decoded by shape.
///
/// The service returns a list of entries, an empty string, an empty list, or
/// (for an empty folder listing) a single object with a `folderid` marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    List(Vec<Value>),
    Marker(Map<String, Value>),
    Scalar(Value),
}

impl From<&Value> for Payload {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Payload::Empty,
            Value::String(s) if s.is_empty() => Payload::Empty,
            Value::Array(items) if items.is_empty() => Payload::Empty,
            Value::Array(items) => Payload::List(items.clone()),
            Value::Object(map) => Payload::Marker(map.clone()),
            other => Payload::Scalar(other.clone()),
        }
    }
}

impl Payload {
    /// Deserialize each list element; any other shape yields no entries.
    pub fn entries<T: DeserializeOwned>(self) -> serde_json::Result<Vec<T>> {
        match self {
            Payload::List(items) => items.into_iter().map(serde_json::from_value).collect(),
            _ => Ok(Vec::new()),
        }
    }

    /// A scalar id such as the one returned when creating a folder.
    pub fn as_id(&self) -> Option<String> {
        match self {
            Payload::Scalar(value) => lenient_value(value.clone()),
            _ => None,
        }
    }
}

fn lenient_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Strings or numbers become `Some(String)`; empty strings, nulls and other
/// shapes become `None`.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(lenient_value))
}

#[derive(Debug, Default, Deserialize)]
struct RawFile {
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    name_all: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    size: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    folder_id: Option<String>,
}

/// A file as listed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawFile")]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    pub name_all: String,
    /// Human readable, formatted by the server (e.g. `"1.2 M"`).
    pub size: String,
    pub time: String,
    pub folder_id: String,
}

impl From<RawFile> for FileEntry {
    fn from(raw: RawFile) -> Self {
        Self {
            id: raw.id.unwrap_or_default(),
            name: raw.name.unwrap_or_default(),
            name_all: raw.name_all.unwrap_or_default(),
            size: raw.size.unwrap_or_else(|| "0".to_string()),
            time: raw.time.unwrap_or_default(),
            folder_id: raw.folder_id.unwrap_or_else(|| "0".to_string()),
        }
    }
}

impl FileEntry {
    pub fn display_name(&self) -> &str {
        if self.name_all.is_empty() {
            &self.name
        } else {
            &self.name_all
        }
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.size)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawFolder {
    #[serde(default, deserialize_with = "lenient_string")]
    fol_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    folderid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    folder_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    size: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    folder_des: Option<String>,
}

/// A folder as listed by the service.
///
/// The id is taken from `fol_id`, then `folderid`, then `folder_id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawFolder")]
pub struct FolderEntry {
    pub folder_id: String,
    pub name: String,
    pub size: String,
    pub time: String,
    pub description: String,
}

impl From<RawFolder> for FolderEntry {
    fn from(raw: RawFolder) -> Self {
        Self {
            folder_id: raw
                .fol_id
                .or(raw.folderid)
                .or(raw.folder_id)
                .unwrap_or_default(),
            name: raw.name.unwrap_or_default(),
            size: raw.size.unwrap_or_else(|| "0".to_string()),
            time: raw.time.unwrap_or_default(),
            description: raw.folder_des.unwrap_or_default(),
        }
    }
}

impl fmt::Display for FolderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[dir] {} (ID: {})", self.name, self.folder_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn folder_id_prefers_fol_id_then_folderid() {
        let all: FolderEntry = serde_json::from_value(json!({
            "name": "docs", "fol_id": "11", "folderid": "22", "folder_id": "33"
        }))
        .unwrap();
        assert_eq!(all.folder_id, "11");

        let legacy: FolderEntry = serde_json::from_value(json!({
            "name": "docs", "folderid": 22, "folder_id": "33"
        }))
        .unwrap();
        assert_eq!(legacy.folder_id, "22");

        let plain: FolderEntry = serde_json::from_value(json!({
            "name": "docs", "fol_id": "", "folder_id": "33", "folder_des": "notes"
        }))
        .unwrap();
        assert_eq!(plain.folder_id, "33");
        assert_eq!(plain.description, "notes");
        assert_eq!(plain.size, "0");
    }

    #[test]
    fn file_entry_defaults_and_numbers() {
        let file: FileEntry = serde_json::from_value(json!({
            "id": 12345, "name": "a.zip", "size": "1.2 M", "time": "昨天"
        }))
        .unwrap();
        assert_eq!(file.id, "12345");
        assert_eq!(file.folder_id, "0");
        assert_eq!(file.display_name(), "a.zip");
        assert_eq!(file.to_string(), "a.zip (1.2 M)");
    }

    #[test]
    fn payload_classifies_text_shapes() {
        assert_eq!(Payload::from(&json!("")), Payload::Empty);
        assert_eq!(Payload::from(&json!([])), Payload::Empty);
        assert_eq!(Payload::from(&Value::Null), Payload::Empty);
        assert!(matches!(Payload::from(&json!([{"id": 1}])), Payload::List(v) if v.len() == 1));
        assert!(matches!(Payload::from(&json!({"folderid": "0"})), Payload::Marker(_)));
        assert_eq!(Payload::from(&json!(987)).as_id().as_deref(), Some("987"));
        assert_eq!(Payload::from(&json!("x1")).as_id().as_deref(), Some("x1"));
    }

    #[test]
    fn envelope_status_and_message() {
        let env: Envelope = serde_json::from_value(json!({"zt": 1, "info": "ok"})).unwrap();
        assert!(env.is_ok());

        let env: Envelope = serde_json::from_value(json!({"zt": "1", "info": "ok"})).unwrap();
        assert!(!env.is_ok());

        let env: Envelope = serde_json::from_value(json!({"zt": 0, "info": ""})).unwrap();
        assert!(!env.is_ok());
        assert_eq!(env.message(), "unknown error");

        let env: Envelope = serde_json::from_value(json!({"zt": 2, "info": "no permission"})).unwrap();
        assert_eq!(env.message(), "no permission");
    }

    #[test]
    fn non_list_payload_has_no_entries() {
        let marker = Payload::from(&json!({"folderid": "5"}));
        assert!(marker.entries::<FolderEntry>().unwrap().is_empty());
    }
}
