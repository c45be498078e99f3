//! Section Model

use super::{Placeable, Position, Size};
use serde::{Deserialize, Serialize};

/// Section entity (区域：大厅、露台、吧台区等)
///
/// Tables and bars are kept in separate ordered lists; their positions are
/// relative to the section's top-left corner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub size: Size,
    #[serde(default)]
    pub tables: Vec<Placeable>,
    #[serde(default)]
    pub bars: Vec<Placeable>,
}

impl Section {
    pub fn new(name: impl Into<String>, position: Position, size: Size) -> Self {
        Self {
            id: crate::util::new_id(),
            name: name.into(),
            position,
            size,
            tables: Vec::new(),
            bars: Vec::new(),
        }
    }

    /// Tables first, then bars
    pub fn placeables(&self) -> impl Iterator<Item = &Placeable> {
        self.tables.iter().chain(self.bars.iter())
    }

    pub fn find_placeable(&self, placeable_id: &str) -> Option<&Placeable> {
        self.placeables().find(|p| p.id == placeable_id)
    }
}
