use std::ops::Deref;

use crate::{kdtree::MinMaxKdTree, tile::Tile};

/// A [`Tile`] paired with the [`MinMaxKdTree`] built over its cells.
///
/// The tree is built once when the tile enters the cache rather than once
/// per query; it owns no reference back to the tile (it copies the corner
/// elevations it needs during [`build`](MinMaxKdTree::build)), so there is
/// no cyclic back-reference between the two (§9 design note).
pub struct IndexedTile {
    tile: Tile,
    tree: MinMaxKdTree,
}

impl IndexedTile {
    /// Builds the kd-tree over `tile` and bundles the two together.
    pub fn new(tile: Tile) -> Self {
        let tree = MinMaxKdTree::build(&tile);
        Self { tile, tree }
    }

    /// The underlying tile.
    pub fn tile(&self) -> &Tile {
        &self.tile
    }

    /// The tile's kd-tree.
    pub fn tree(&self) -> &MinMaxKdTree {
        &self.tree
    }
}

impl Deref for IndexedTile {
    type Target = Tile;

    fn deref(&self) -> &Tile {
        &self.tile
    }
}
