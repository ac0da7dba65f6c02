//! Terrain types found on tile feature positions.

use serde::{Deserialize, Serialize};

/// What occupies a feature position of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainType {
    /// Castle walls and the area they enclose
    Fortification,
    /// Roads
    Path,
    /// Monastery in the middle of a tile
    Cloister,
    /// Open farmland
    Field,
    /// No scoring feature (road junction centre)
    Other,
}

impl TerrainType {
    /// Terrain kinds whose patterns are tracked while tiles are placed.
    ///
    /// Fields are only resolved when the round ends.
    pub fn is_tracked(&self) -> bool {
        matches!(
            self,
            TerrainType::Fortification | TerrainType::Path | TerrainType::Cloister
        )
    }

    /// Whether a meeple may stand on this terrain
    pub fn can_hold_meeple(&self) -> bool {
        !matches!(self, TerrainType::Other)
    }

    /// Name of a meeple standing on this terrain
    pub fn meeple_role(&self) -> &'static str {
        match self {
            TerrainType::Fortification => "knight",
            TerrainType::Path => "thief",
            TerrainType::Cloister => "monk",
            TerrainType::Field => "farmer",
            TerrainType::Other => "none",
        }
    }
}

impl std::fmt::Display for TerrainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TerrainType::Fortification => "fortification",
            TerrainType::Path => "path",
            TerrainType::Cloister => "cloister",
            TerrainType::Field => "field",
            TerrainType::Other => "other",
        };
        f.write_str(name)
    }
}
