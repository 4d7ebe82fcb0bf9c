use std::ops::Range;

use crate::tile::Tile;

/// One node of a [`MinMaxKdTree`]: the elevation bounds of a rectangular
/// run of cells, plus its children if any.
struct Node {
    min: f64,
    max: f64,
    rows: Range<usize>,
    cols: Range<usize>,
    children: Option<(usize, usize)>,
}

/// Duvenhage's implicit min/max binary tree over a tile's cell grid.
///
/// Each leaf is a single cell (a quadrilateral bounded by four elevation
/// samples); each internal node stores the min/max elevation of the cells
/// below it, letting a ray walk prune whole sub-rectangles that the ray's
/// altitude never reaches (§4.1, §4.3).
///
/// Splits alternate between the latitude and longitude axes by depth,
/// latitude first, falling back to whichever axis still has more than one
/// row/column left when the preferred axis has been exhausted.
pub struct MinMaxKdTree {
    nodes: Vec<Node>,
    root: usize,
}

impl MinMaxKdTree {
    /// Builds the tree over `tile`'s `(rows-1) x (cols-1)` cell grid.
    pub fn build(tile: &Tile) -> Self {
        let mut nodes = Vec::with_capacity(2 * (tile.rows() - 1) * (tile.cols() - 1));
        let root = Self::build_node(tile, 0..tile.rows() - 1, 0..tile.cols() - 1, 0, &mut nodes);
        Self { nodes, root }
    }

    fn build_node(
        tile: &Tile,
        rows: Range<usize>,
        cols: Range<usize>,
        depth: usize,
        nodes: &mut Vec<Node>,
    ) -> usize {
        if rows.len() == 1 && cols.len() == 1 {
            let (i, j) = (rows.start, cols.start);
            let corners = [tile.get(i, j), tile.get(i + 1, j), tile.get(i, j + 1), tile.get(i + 1, j + 1)];
            let min = corners.iter().copied().fold(f64::INFINITY, f64::min);
            let max = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            nodes.push(Node { min, max, rows, cols, children: None });
            return nodes.len() - 1;
        }

        let split_lat = if depth % 2 == 0 { rows.len() > 1 } else { rows.len() > 1 && cols.len() <= 1 };

        let (left, right) = if split_lat {
            let mid = rows.start + rows.len() / 2;
            (
                Self::build_node(tile, rows.start..mid, cols.clone(), depth + 1, nodes),
                Self::build_node(tile, mid..rows.end, cols.clone(), depth + 1, nodes),
            )
        } else {
            let mid = cols.start + cols.len() / 2;
            (
                Self::build_node(tile, rows.clone(), cols.start..mid, depth + 1, nodes),
                Self::build_node(tile, rows.clone(), mid..cols.end, depth + 1, nodes),
            )
        };

        let min = nodes[left].min.min(nodes[right].min);
        let max = nodes[left].max.max(nodes[right].max);
        nodes.push(Node { min, max, rows, cols, children: Some((left, right)) });
        nodes.len() - 1
    }

    /// Minimum and maximum elevation over the cells in
    /// `rows x cols`, visiting only tree nodes overlapping the query.
    pub fn min_max_of_range(&self, rows: Range<usize>, cols: Range<usize>) -> Option<(f64, f64)> {
        self.recurse(self.root, &rows, &cols)
    }

    fn recurse(&self, idx: usize, q_rows: &Range<usize>, q_cols: &Range<usize>) -> Option<(f64, f64)> {
        let node = &self.nodes[idx];
        if node.rows.end <= q_rows.start || q_rows.end <= node.rows.start {
            return None;
        }
        if node.cols.end <= q_cols.start || q_cols.end <= node.cols.start {
            return None;
        }
        let fully_contained = q_rows.start <= node.rows.start
            && node.rows.end <= q_rows.end
            && q_cols.start <= node.cols.start
            && node.cols.end <= q_cols.end;
        if fully_contained {
            return Some((node.min, node.max));
        }
        match node.children {
            None => Some((node.min, node.max)),
            Some((l, r)) => {
                let a = self.recurse(l, q_rows, q_cols);
                let b = self.recurse(r, q_rows, q_cols);
                match (a, b) {
                    (Some((amin, amax)), Some((bmin, bmax))) => Some((amin.min(bmin), amax.max(bmax))),
                    (Some(x), None) | (None, Some(x)) => Some(x),
                    (None, None) => None,
                }
            }
        }
    }

    /// Locates the leaf covering cell `(i, j)`, returning its node id, its
    /// parent's node id, and its sibling's node id (root has neither).
    pub fn leaf_cell_containing(&self, i: usize, j: usize) -> Option<(usize, Option<usize>, Option<usize>)> {
        let root = &self.nodes[self.root];
        if !root.rows.contains(&i) || !root.cols.contains(&j) {
            return None;
        }
        let mut idx = self.root;
        let mut parent = None;
        let mut sibling = None;
        loop {
            let node = &self.nodes[idx];
            let Some((l, r)) = node.children else {
                return Some((idx, parent, sibling));
            };
            let left = &self.nodes[l];
            if left.rows.contains(&i) && left.cols.contains(&j) {
                parent = Some(idx);
                sibling = Some(r);
                idx = l;
            } else {
                parent = Some(idx);
                sibling = Some(l);
                idx = r;
            }
        }
    }

    /// Minimum and maximum elevation stored at node `idx`.
    pub fn node_min_max(&self, idx: usize) -> (f64, f64) {
        let node = &self.nodes[idx];
        (node.min, node.max)
    }

    /// Root node id.
    pub fn root(&self) -> usize {
        self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CellStore;

    fn ramp_tile() -> Tile {
        // 4x4 grid, elevation increasing by row then column.
        let mut samples = Vec::with_capacity(16);
        for i in 0..4 {
            for j in 0..4 {
                samples.push((i * 4 + j) as f64);
            }
        }
        Tile::new(0.0, 0.0, 1.0, 1.0, 4, 4, CellStore::new(samples.into_boxed_slice()))
    }

    #[test]
    fn root_min_max_spans_whole_tile() {
        let tile = ramp_tile();
        let tree = MinMaxKdTree::build(&tile);
        let (min, max) = tree.node_min_max(tree.root());
        assert_eq!(min, 0.0);
        assert_eq!(max, 15.0);
    }

    #[test]
    fn range_query_matches_leaf_values() {
        let tile = ramp_tile();
        let tree = MinMaxKdTree::build(&tile);
        let (min, max) = tree.min_max_of_range(0..1, 0..1).unwrap();
        assert_eq!((min, max), (0.0, 5.0)); // corners 0,4,1,5
    }

    #[test]
    fn leaf_cell_containing_round_trips() {
        let tile = ramp_tile();
        let tree = MinMaxKdTree::build(&tile);
        let (leaf, parent, sibling) = tree.leaf_cell_containing(1, 2).unwrap();
        assert!(parent.is_some());
        assert!(sibling.is_some());
        assert_ne!(leaf, parent.unwrap());
    }

    #[test]
    fn out_of_range_cell_returns_none() {
        let tile = ramp_tile();
        let tree = MinMaxKdTree::build(&tile);
        assert!(tree.leaf_cell_containing(10, 10).is_none());
    }
}
