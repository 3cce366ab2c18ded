//! Records exchanged with a build core.
//!
//! These are the raw, core-shaped payloads. The compiler crate normalizes
//! them into richer handles before handing them to hook listeners.

use serde::{Deserialize, Serialize};

/// A module as reported by the build core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeModule {
    /// Unique identifier within one compilation.
    pub identifier: String,
    /// Human readable name, usually a context-relative path.
    pub readable_identifier: String,
    /// Absolute resource path, if the module is backed by a file.
    pub resource: Option<String>,
    /// Module type, e.g. `javascript/auto`.
    pub module_type: String,
    /// Size of the original source in bytes.
    pub size: f64,
}

/// A chunk as reported by the build core.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeChunk {
    pub id: Option<String>,
    pub name: Option<String>,
    pub files: Vec<String>,
    pub runtime: Vec<String>,
    pub hash: Option<String>,
}

/// An entrypoint: a named group of chunks loaded together.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeEntrypoint {
    pub name: String,
    /// Chunk ids in load order.
    pub chunks: Vec<String>,
    /// Files of every chunk in this entrypoint.
    pub files: Vec<String>,
}

/// Information about the module that issued a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInfo {
    pub issuer: String,
}

/// Resolve data sent by the core before a request is resolved.
///
/// The core expects the (possibly rewritten) data to be echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResolveData {
    pub request: String,
    pub context: String,
    pub issuer: Option<String>,
}

/// Data the core uses to create a module once a request is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateData {
    pub request: String,
    pub user_request: String,
    pub resource: String,
}

/// Resolve data sent by the core after a request was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAfterResolveData {
    pub request: String,
    pub context: String,
    pub issuer: Option<String>,
    pub file_dependencies: Vec<String>,
    pub context_dependencies: Vec<String>,
    pub missing_dependencies: Vec<String>,
    pub create_data: Option<CreateData>,
}

/// Resolve data for a context module (`require.context` style requests).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContextResolveData {
    pub context: String,
    pub request: String,
    pub recursive: bool,
    pub reg_exp: Option<String>,
}
