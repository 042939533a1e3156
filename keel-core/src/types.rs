//! Domain types for the keel project manifest.
//!
//! All maps are `BTreeMap` so that serialized output and iteration order are
//! deterministic. All types are serializable/deserializable via serde + serde_yaml.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A human-chosen local name mapped to a remote identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Alias(pub String);

impl Alias {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Alias {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Alias {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// An identifier assigned by the remote registry (test, workflow or app id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct RemoteId(pub String);

impl RemoteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blank ids (empty or whitespace) are treated as "no link".
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// First `n` characters, for compact display.
    pub fn short(&self, n: usize) -> &str {
        match self.0.char_indices().nth(n) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RemoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Target device platform of a test or application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    /// Parse a platform string, case- and whitespace-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" => Some(Platform::Ios),
            "android" => Some(Platform::Android),
            _ => None,
        }
    }

    /// Infer the platform a build-platform key refers to (`ios-dev` → iOS).
    ///
    /// `ios` is checked first, matching keys such as `ios-android-bridge`.
    pub fn infer_from_key(key: &str) -> Option<Self> {
        let k = key.to_ascii_lowercase();
        if k.contains("ios") {
            Some(Platform::Ios)
        } else if k.contains("android") {
            Some(Platform::Android)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Project identification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProjectInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

/// A platform-specific build entry (`build.platforms.<key>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BuildPlatform {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub output: String,
    /// Registry application that stores builds for this platform.
    #[serde(default, skip_serializing_if = "RemoteId::is_empty")]
    pub app_id: RemoteId,
}

/// Build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BuildConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platforms: BTreeMap<String, BuildPlatform>,
}

/// One hot reload provider (`hotreload.providers.<name>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    /// Target platform (`ios`, `android`) → key into `build.platforms`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platform_keys: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_client_build_id: Option<String>,
    /// Provider settings keel does not interpret; preserved on rewrite.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Hot reload configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HotReloadConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl HotReloadConfig {
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.providers.is_empty()
    }
}

/// Root of `.keel/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectManifest {
    pub project: ProjectInfo,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tests: BTreeMap<Alias, RemoteId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub workflows: BTreeMap<Alias, RemoteId>,
    #[serde(default, skip_serializing_if = "HotReloadConfig::is_empty")]
    pub hotreload: HotReloadConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl ProjectManifest {
    /// A fresh manifest for a project named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            project: ProjectInfo {
                id: None,
                name: name.into(),
            },
            ..Self::default()
        }
    }

    /// Stamp `last_synced_at` with the current time.
    pub fn mark_synced(&mut self) {
        self.last_synced_at = Some(Utc::now());
    }
}

/// Group aliases by the remote id they point to, keeping only ids that more
/// than one alias resolves to. Aliases inside each group are sorted, so the
/// first entry is the canonical one.
pub fn duplicate_aliases(map: &BTreeMap<Alias, RemoteId>) -> BTreeMap<RemoteId, Vec<Alias>> {
    let mut by_id: BTreeMap<RemoteId, Vec<Alias>> = BTreeMap::new();
    for (alias, id) in map {
        if id.is_empty() {
            continue;
        }
        by_id.entry(id.clone()).or_default().push(alias.clone());
    }
    by_id.retain(|_, aliases| aliases.len() > 1);
    for aliases in by_id.values_mut() {
        aliases.sort();
    }
    by_id
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
