// src/trove/metadata.rs

//! Descriptive trove metadata carried forward across rebuilds

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// A copyable metadata item
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
    Serialize, Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum MetadataItem {
    ShortDesc,
    LongDesc,
    Url,
    Licenses,
    Categories,
}

/// Metadata attached to a trove
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroveMetadata {
    pub short_desc: Option<String>,
    pub long_desc: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub licenses: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl TroveMetadata {
    pub fn is_empty(&self) -> bool {
        self.short_desc.is_none()
            && self.long_desc.is_none()
            && self.url.is_none()
            && self.licenses.is_empty()
            && self.categories.is_empty()
    }

    /// Whether `item` carries a value
    pub fn is_set(&self, item: MetadataItem) -> bool {
        match item {
            MetadataItem::ShortDesc => self.short_desc.is_some(),
            MetadataItem::LongDesc => self.long_desc.is_some(),
            MetadataItem::Url => self.url.is_some(),
            MetadataItem::Licenses => !self.licenses.is_empty(),
            MetadataItem::Categories => !self.categories.is_empty(),
        }
    }

    /// Overwrite `item` with the value held by `from`
    pub fn copy_item(&mut self, from: &TroveMetadata, item: MetadataItem) {
        match item {
            MetadataItem::ShortDesc => self.short_desc = from.short_desc.clone(),
            MetadataItem::LongDesc => self.long_desc = from.long_desc.clone(),
            MetadataItem::Url => self.url = from.url.clone(),
            MetadataItem::Licenses => self.licenses = from.licenses.clone(),
            MetadataItem::Categories => self.categories = from.categories.clone(),
        }
    }
}
