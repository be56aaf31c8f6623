// src/files.rs

//! File identities
//!
//! Every file in a trove carries two identities:
//! - **pathId**: permanent token for a file slot within a source trove's
//!   lineage. It survives content changes and must be reused on rebuilds.
//! - **fileId**: hash of the file's contents and metadata. Equal contents
//!   with equal metadata always give the same fileId.

use crate::error::{Error, Result};
use crate::flavor::Flavor;
use crate::version::Version;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

fn decode_hex<const N: usize>(kind: &str, s: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(s)
        .map_err(|e| Error::ParseError(format!("invalid {} '{}': {}", kind, s, e)))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        Error::ParseError(format!(
            "invalid {} length: expected {} bytes, got {}",
            kind,
            N,
            b.len()
        ))
    })
}

/// Whether `path` lies at or below the directory `prefix`
pub fn path_under(path: &str, prefix: &str) -> bool {
    if prefix.ends_with('/') {
        return path.starts_with(prefix);
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Parent directory of `path`, `/` for top-level entries
pub fn dirname(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((dir, _)) => dir,
    }
}

/// Permanent identity of a file slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathId([u8; 16]);

impl PathId {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Mint a fresh pathId for `path` when `source_name` first builds it at
    /// `version`
    ///
    /// Distinct paths never collide, neither within one cook nor across
    /// source troves cooked at the same version, and the same inputs always
    /// give the same id.
    pub fn mint(source_name: &str, path: &str, version: &Version) -> Self {
        let digest = Md5::digest(format!("{} {} {}", source_name, path, version).as_bytes());
        Self(digest.into())
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        decode_hex("pathId", s).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for PathId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::from_hex(&s)
    }
}

impl From<PathId> for String {
    fn from(id: PathId) -> Self {
        id.to_hex()
    }
}

/// Content-derived identity of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId([u8; 32]);

impl FileId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        decode_hex("fileId", s).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for FileId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::from_hex(&s)
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.to_hex()
    }
}

/// File metadata that feeds into the fileId
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// SHA-256 of the file contents
    pub contents: [u8; 32],
    pub mode: u32,
    pub owner: String,
    pub group: String,
    pub flavor: Flavor,
}

impl FileInfo {
    /// A root-owned regular file with mode 0644
    pub fn regular(contents: &[u8]) -> Self {
        Self {
            contents: Sha256::digest(contents).into(),
            mode: 0o100644,
            owner: "root".to_string(),
            group: "root".to_string(),
            flavor: Flavor::empty(),
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>, group: impl Into<String>) -> Self {
        self.owner = owner.into();
        self.group = group.into();
        self
    }

    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Compute the fileId
    pub fn file_id(&self) -> FileId {
        let mut hasher = Sha256::new();
        hasher.update(self.contents);
        hasher.update(format!("{:o}\0{}\0{}\0", self.mode, self.owner, self.group));
        hasher.update(self.flavor.to_string());
        FileId(hasher.finalize().into())
    }
}

/// One output path of a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFile {
    pub path: String,
    pub info: FileInfo,
    path_id: Option<PathId>,
}

impl BuildFile {
    pub fn new(path: impl Into<String>, info: FileInfo) -> Self {
        Self {
            path: path.into(),
            info,
            path_id: None,
        }
    }

    pub fn file_id(&self) -> FileId {
        self.info.file_id()
    }

    /// Assigned pathId, once resolved
    pub fn path_id(&self) -> Option<PathId> {
        self.path_id
    }

    pub fn set_path_id(&mut self, id: PathId) {
        self.path_id = Some(id);
    }
}
