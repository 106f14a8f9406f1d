//! Logical configuration produced by the parser.

use serde::{Deserialize, Serialize};

/// A `packageSources/add` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSource {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
}

impl PackageSource {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            protocol_version: None,
        }
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = Some(version.into());
        self
    }
}

/// A plain `add key=".." value=".."` entry (`config`, `disabledPackageSources`,
/// `activePackageSource`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Credentials stored for a single package source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_text_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_authentication_types: Option<String>,
}

/// Credential keys as they appear in `add key=".."`, in canonical order
pub const CREDENTIAL_KEYS: [&str; 4] = [
    "Username",
    "Password",
    "ClearTextPassword",
    "ValidAuthenticationTypes",
];

impl SourceCredential {
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            "Username" => self.username.as_deref(),
            "Password" => self.password.as_deref(),
            "ClearTextPassword" => self.clear_text_password.as_deref(),
            "ValidAuthenticationTypes" => self.valid_authentication_types.as_deref(),
            _ => None,
        }
    }

    /// Set a field by its document key. Returns `false` for unknown keys.
    pub fn set_field(&mut self, key: &str, value: String) -> bool {
        let slot = match key {
            "Username" => &mut self.username,
            "Password" => &mut self.password,
            "ClearTextPassword" => &mut self.clear_text_password,
            "ValidAuthenticationTypes" => &mut self.valid_authentication_types,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Present fields as `(key, value)` pairs in canonical order
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        CREDENTIAL_KEYS
            .iter()
            .filter_map(|key| self.field(key).map(|value| (*key, value)))
    }
}

/// Source name -> credentials, kept in document order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialMap {
    entries: Vec<(String, SourceCredential)>,
}

impl CredentialMap {
    pub fn get(&self, source: &str) -> Option<&SourceCredential> {
        self.entries
            .iter()
            .find(|(name, _)| name == source)
            .map(|(_, credential)| credential)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.get(source).is_some()
    }

    /// Insert or replace, keeping the original slot on replace
    pub fn insert(&mut self, source: impl Into<String>, credential: SourceCredential) {
        let source = source.into();
        match self.entries.iter_mut().find(|(name, _)| *name == source) {
            Some((_, slot)) => *slot = credential,
            None => self.entries.push((source, credential)),
        }
    }

    pub fn remove(&mut self, source: &str) -> Option<SourceCredential> {
        let at = self.entries.iter().position(|(name, _)| name == source)?;
        Some(self.entries.remove(at).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceCredential)> {
        self.entries.iter().map(|(name, c)| (name.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The logical content of a `NuGet.Config` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NuGetConfig {
    pub package_sources: Vec<PackageSource>,
    /// `<clear />` was present inside `packageSources`
    #[serde(default)]
    pub clear_sources: bool,
    #[serde(default)]
    pub credentials: CredentialMap,
    /// Entries of the `config` section
    #[serde(default)]
    pub options: Vec<KeyValue>,
    #[serde(default)]
    pub disabled_sources: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_source: Option<KeyValue>,
}

impl NuGetConfig {
    pub fn source(&self, key: &str) -> Option<&PackageSource> {
        self.package_sources.iter().find(|s| s.key == key)
    }

    pub fn has_source(&self, key: &str) -> bool {
        self.source(key).is_some()
    }
}

/// Encode a source name as an XML local name (`My Feed` -> `My_x0020_Feed`)
pub fn encode_local_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    let mut first = true;
    while let Some(c) = chars.next() {
        let allowed = if first {
            c.is_alphabetic() || c == '_'
        } else {
            c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
        };
        // a literal "_x" must be escaped or it would decode as an escape
        let starts_escape = c == '_' && chars.peek() == Some(&'x');
        if allowed && !starts_escape {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("_x{:04X}_", unit));
            }
        }
        first = false;
    }
    out
}

/// Inverse of [`encode_local_name`]. Malformed escapes are kept literally.
pub fn decode_local_name(name: &str) -> String {
    let mut units: Vec<u16> = Vec::with_capacity(name.len());
    let mut rest = name;
    while !rest.is_empty() {
        if let Some(unit) = parse_escape(rest) {
            units.push(unit);
            rest = &rest[7..];
        } else if let Some(c) = rest.chars().next() {
            let mut buf = [0u16; 2];
            units.extend_from_slice(c.encode_utf16(&mut buf));
            rest = &rest[c.len_utf8()..];
        }
    }
    String::from_utf16_lossy(&units)
}

fn parse_escape(s: &str) -> Option<u16> {
    let bytes = s.as_bytes();
    if bytes.len() < 7 || !s.starts_with("_x") || bytes[6] != b'_' {
        return None;
    }
    let hex = s.get(2..6)?;
    u16::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_space() {
        assert_eq!(encode_local_name("My Feed"), "My_x0020_Feed");
        assert_eq!(decode_local_name("My_x0020_Feed"), "My Feed");
    }

    #[test]
    fn test_local_name_plain_passthrough() {
        assert_eq!(encode_local_name("nuget.org"), "nuget.org");
        assert_eq!(decode_local_name("nuget.org"), "nuget.org");
        assert_eq!(decode_local_name("a_xZZ"), "a_xZZ");
    }

    #[test]
    fn test_local_name_leading_digit_and_literal_escape() {
        let encoded = encode_local_name("1feed_x");
        assert_eq!(encoded, "_x0031_feed_x005F_x");
        assert_eq!(decode_local_name(&encoded), "1feed_x");
    }

    #[test]
    fn test_credential_fields_in_canonical_order() {
        let mut credential = SourceCredential::default();
        assert!(credential.set_field("ClearTextPassword", "secret".into()));
        assert!(credential.set_field("Username", "me".into()));
        assert!(!credential.set_field("Bogus", "x".into()));

        let fields: Vec<_> = credential.fields().collect();
        assert_eq!(fields, vec![("Username", "me"), ("ClearTextPassword", "secret")]);
    }

    #[test]
    fn test_credential_map_keeps_slot_on_replace() {
        let mut map = CredentialMap::default();
        map.insert("a", SourceCredential::default());
        map.insert("b", SourceCredential::default());
        let replacement = SourceCredential {
            username: Some("u".into()),
            ..Default::default()
        };
        map.insert("a", replacement.clone());

        let names: Vec<_> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&replacement));
        assert!(map.remove("b").is_some());
        assert_eq!(map.len(), 1);
    }
}
