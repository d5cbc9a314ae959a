//! Blockmap: a uniform grid of linedef lists for spatial queries.
//!
//! Cells are 128 map units square. Sight, movement and projectile collision
//! only test the linedefs listed in the cells they touch.

use crate::error::WadError;
use crate::fixed::{FRACBITS, FRACUNIT, Fixed};
use crate::geometry::{BoundingBox, box_on_line_side};
use crate::map::LineDef;
use crate::wad_types::le;

/// Shift from fixed-point map coordinates to block coordinates.
pub const MAPBLOCKSHIFT: i32 = FRACBITS + 7;
/// Block edge in map units.
pub const MAPBLOCKUNITS: i32 = 128;
pub const MAPBLOCKSIZE: Fixed = MAPBLOCKUNITS * FRACUNIT;

const LIST_END: u16 = 0xFFFF;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blockmap {
    pub origin_x: Fixed,
    pub origin_y: Fixed,
    /// Columns.
    pub width: i32,
    /// Rows.
    pub height: i32,
    /// Row-major linedef lists.
    cells: Vec<Vec<usize>>,
}

impl Blockmap {
    /// Decode a BLOCKMAP lump.
    ///
    /// Each cell's list starts with a 0 word and ends with `0xFFFF`. Indices
    /// at or past `num_lines` are dropped.
    pub fn from_lump(data: &[u8], num_lines: usize) -> Result<Self, WadError> {
        let bad = || WadError::BadLumpSize {
            name: "BLOCKMAP".to_string(),
            len: data.len(),
        };
        if data.len() < 8 {
            return Err(bad());
        }
        let origin_x = i32::from(le::i16_at(data, 0)) << FRACBITS;
        let origin_y = i32::from(le::i16_at(data, 2)) << FRACBITS;
        let width = i32::from(le::i16_at(data, 4));
        let height = i32::from(le::i16_at(data, 6));
        if width <= 0 || height <= 0 {
            return Err(bad());
        }
        let count = (width * height) as usize;
        if data.len() < 8 + count * 2 {
            return Err(bad());
        }

        let words = data.len() / 2;
        let mut cells = Vec::with_capacity(count);
        for i in 0..count {
            let mut word = usize::from(le::u16_at(data, 8 + i * 2));
            let mut list = Vec::new();
            if word < words && le::u16_at(data, word * 2) == 0 {
                word += 1;
            }
            while word < words {
                let value = le::u16_at(data, word * 2);
                if value == LIST_END {
                    break;
                }
                let line = usize::from(value);
                if line < num_lines {
                    list.push(line);
                }
                word += 1;
            }
            cells.push(list);
        }

        Ok(Self {
            origin_x,
            origin_y,
            width,
            height,
            cells,
        })
    }

    /// Build a blockmap from linedef geometry.
    ///
    /// The origin sits 8 units outside the lowest vertex; a line is listed in
    /// every cell whose box it passes through.
    pub fn build(lines: &[LineDef]) -> Self {
        let mut bounds = BoundingBox::EMPTY;
        for line in lines {
            bounds.add_point(line.x1, line.y1);
            bounds.add_point(line.x2, line.y2);
        }
        if lines.is_empty() {
            return Self::default();
        }

        let origin_x = bounds.left - 8 * FRACUNIT;
        let origin_y = bounds.bottom - 8 * FRACUNIT;
        let width = block_coord(bounds.right, origin_x) + 1;
        let height = block_coord(bounds.top, origin_y) + 1;
        let mut map = Self {
            origin_x,
            origin_y,
            width,
            height,
            cells: vec![Vec::new(); (width * height) as usize],
        };

        for (index, line) in lines.iter().enumerate() {
            let (x0, x1) = (
                block_coord(line.bbox.left, origin_x),
                block_coord(line.bbox.right, origin_x),
            );
            let (y0, y1) = (
                block_coord(line.bbox.bottom, origin_y),
                block_coord(line.bbox.top, origin_y),
            );
            for by in y0..=y1 {
                for bx in x0..=x1 {
                    let cell_box = map.cell_box(bx, by);
                    let straight = line.dx == 0 || line.dy == 0;
                    if straight
                        || box_on_line_side(&cell_box, line.x1, line.y1, line.x2, line.y2)
                            .is_none()
                    {
                        map.cells[(by * width + bx) as usize].push(index);
                    }
                }
            }
        }

        tracing::debug!(width, height, lines = lines.len(), "blockmap built");
        map
    }

    /// Block column containing `x` (may be out of range).
    #[inline]
    pub fn column(&self, x: Fixed) -> i32 {
        block_coord(x, self.origin_x)
    }

    /// Block row containing `y` (may be out of range).
    #[inline]
    pub fn row(&self, y: Fixed) -> i32 {
        block_coord(y, self.origin_y)
    }

    #[inline]
    pub fn in_bounds(&self, bx: i32, by: i32) -> bool {
        bx >= 0 && by >= 0 && bx < self.width && by < self.height
    }

    /// Linedefs listed in a cell, `None` outside the grid.
    pub fn cell(&self, bx: i32, by: i32) -> Option<&[usize]> {
        if !self.in_bounds(bx, by) {
            return None;
        }
        self.cells
            .get((by * self.width + bx) as usize)
            .map(Vec::as_slice)
    }

    /// Map-space box of one cell.
    pub fn cell_box(&self, bx: i32, by: i32) -> BoundingBox {
        let left = self.origin_x.saturating_add(bx.saturating_mul(MAPBLOCKSIZE));
        let bottom = self.origin_y.saturating_add(by.saturating_mul(MAPBLOCKSIZE));
        BoundingBox {
            top: bottom.saturating_add(MAPBLOCKSIZE),
            bottom,
            left,
            right: left.saturating_add(MAPBLOCKSIZE),
        }
    }

    /// Inclusive block ranges `(x0, x1, y0, y1)` covering a box, unclamped.
    pub fn block_range(&self, bbox: &BoundingBox) -> (i32, i32, i32, i32) {
        (
            self.column(bbox.left),
            self.column(bbox.right),
            self.row(bbox.bottom),
            self.row(bbox.top),
        )
    }
}

#[inline]
fn block_coord(v: Fixed, origin: Fixed) -> i32 {
    ((i64::from(v) - i64::from(origin)) >> MAPBLOCKSHIFT) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapBuilder;

    fn lump(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn decodes_lists_and_skips_leading_zero() {
        // origin (-8, -8), 2x1 cells, offsets at words 6 and 9.
        let data = lump(&[
            (-8i16) as u16,
            (-8i16) as u16,
            2,
            1,
            6,
            9,
            0,
            3,
            LIST_END,
            0,
            LIST_END,
        ]);
        let bm = Blockmap::from_lump(&data, 4).unwrap();
        assert_eq!(bm.origin_x, -8 * FRACUNIT);
        assert_eq!((bm.width, bm.height), (2, 1));
        assert_eq!(bm.cell(0, 0), Some(&[3][..]));
        assert_eq!(bm.cell(1, 0), Some(&[][..]));
        assert_eq!(bm.cell(2, 0), None);
        assert_eq!(bm.cell(0, -1), None);
    }

    #[test]
    fn drops_out_of_range_lines() {
        let data = lump(&[0, 0, 1, 1, 5, 0, 1, 99, LIST_END]);
        let bm = Blockmap::from_lump(&data, 2).unwrap();
        assert_eq!(bm.cell(0, 0), Some(&[1][..]));
    }

    #[test]
    fn rejects_truncated_lump() {
        assert!(Blockmap::from_lump(&[0; 6], 0).is_err());
        let data = lump(&[0, 0, 4, 4, 8]);
        assert!(matches!(
            Blockmap::from_lump(&data, 0),
            Err(WadError::BadLumpSize { .. })
        ));
    }

    #[test]
    fn block_coords_floor_negative_offsets() {
        let bm = Blockmap {
            origin_x: 0,
            origin_y: 0,
            width: 1,
            height: 1,
            cells: vec![Vec::new()],
        };
        assert_eq!(bm.column(-1), -1);
        assert_eq!(bm.column(127 * FRACUNIT), 0);
        assert_eq!(bm.column(128 * FRACUNIT), 1);
    }

    #[test]
    fn build_lists_room_walls_in_edge_cells() {
        let map = MapBuilder::new().room(0, 0, 256, 256, 0, 128, 160).build();
        let bm = &map.blockmap;
        assert_eq!(bm.origin_x, -8 * FRACUNIT);
        assert_eq!((bm.width, bm.height), (3, 3));
        // Bottom-left cell holds the south and west walls.
        let cell = bm.cell(0, 0).unwrap();
        assert_eq!(cell.len(), 2);
        // The middle cell touches no wall.
        assert!(bm.cell(1, 1).unwrap().is_empty());
    }

    #[test]
    fn build_diagonal_line_only_in_crossed_cells() {
        let map = MapBuilder::new().line(0, 0, 512, 512).build();
        let bm = &map.blockmap;
        let listed = (0..bm.height)
            .flat_map(|by| (0..bm.width).map(move |bx| (bx, by)))
            .filter(|&(bx, by)| bm.cell(bx, by).is_some_and(|c| !c.is_empty()))
            .count();
        let total = (bm.width * bm.height) as usize;
        assert!(listed < total);
        assert!(bm.cell(0, 0).unwrap().contains(&0));
    }
}
