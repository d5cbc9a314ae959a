//! Line of sight through the blockmap.
//!
//! The sight line is stepped cell by cell with Bresenham; each one-sided
//! linedef listed in a visited cell is tested for an exact segment crossing.
//! Two-sided lines never block. Cells outside the blockmap hold no lines,
//! so a sight line may pass beyond the map edge.

use crate::ai::AiTarget;
use crate::fixed::Fixed;
use crate::geometry::segments_intersect;
use crate::map::MapData;

/// Whether `to` is visible from `from`.
pub fn check_sight(map: &MapData, from: &AiTarget, to: &AiTarget) -> bool {
    line_of_sight(map, from.x, from.y, to.x, to.y)
}

/// Whether the segment between two points crosses no one-sided line.
pub fn line_of_sight(map: &MapData, x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> bool {
    let bm = &map.blockmap;
    let (mut bx, mut by) = (bm.column(x1), bm.row(y1));
    let (ex, ey) = (bm.column(x2), bm.row(y2));

    let dx = (ex - bx).abs();
    let dy = -(ey - by).abs();
    let sx = if bx < ex { 1 } else { -1 };
    let sy = if by < ey { 1 } else { -1 };
    let mut err = dx + dy;

    let mut checked = vec![false; map.lines.len()];
    let mut cell_clear = |cx: i32, cy: i32| -> bool {
        check_blockmap_cell(map, cx, cy, x1, y1, x2, y2, &mut checked)
    };

    loop {
        if !cell_clear(bx, by) {
            return false;
        }
        if bx == ex && by == ey {
            return true;
        }
        let e2 = 2 * err;
        let step_x = e2 >= dy;
        let step_y = e2 <= dx;
        if step_x && step_y {
            // Diagonal step: the line may clip either neighbour first.
            if !cell_clear(bx + sx, by) || !cell_clear(bx, by + sy) {
                return false;
            }
        }
        if step_x {
            err += dy;
            bx += sx;
        }
        if step_y {
            err += dx;
            by += sy;
        }
    }
}

/// `true` when no one-sided line in the cell crosses the sight segment.
/// Out-of-range cells are unblocked.
#[allow(clippy::too_many_arguments)]
fn check_blockmap_cell(
    map: &MapData,
    bx: i32,
    by: i32,
    x1: Fixed,
    y1: Fixed,
    x2: Fixed,
    y2: Fixed,
    checked: &mut [bool],
) -> bool {
    let Some(cell) = map.blockmap.cell(bx, by) else {
        return true;
    };
    for &index in cell {
        if std::mem::replace(&mut checked[index], true) {
            continue;
        }
        let line = &map.lines[index];
        if line.is_two_sided() {
            continue;
        }
        if segments_intersect(x1, y1, x2, y2, line.x1, line.y1, line.x2, line.y2) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MapBuilder;
    use crate::fixed::FRACUNIT;

    const U: Fixed = FRACUNIT;

    #[test]
    fn open_room_is_visible() {
        let map = MapBuilder::demo();
        assert!(line_of_sight(&map, -200 * U, -200 * U, 200 * U, 200 * U));
    }

    #[test]
    fn sight_passes_through_portals() {
        let map = MapBuilder::demo();
        // Hall into the east corridor and into the north room.
        assert!(line_of_sight(&map, 0, 0, 400 * U, 0));
        assert!(line_of_sight(&map, 0, 0, 0, 400 * U));
    }

    #[test]
    fn solid_wall_blocks() {
        let map = MapBuilder::demo();
        // From the corridor to the north room crosses the hall's corner walls.
        assert!(!line_of_sight(&map, 400 * U, 0, 0, 400 * U));
    }

    #[test]
    fn same_point_is_visible() {
        let map = MapBuilder::demo();
        assert!(line_of_sight(&map, 10 * U, 10 * U, 10 * U, 10 * U));
    }

    #[test]
    fn wall_in_single_cell_blocks() {
        let mut b = MapBuilder::new();
        b.line(0, -32, 0, 32);
        let map = b.build();
        assert!(!line_of_sight(&map, -16 * U, 0, 16 * U, 0));
        assert!(line_of_sight(&map, -16 * U, 64 * U, 16 * U, 64 * U));
    }

    #[test]
    fn beyond_map_edge_is_unblocked() {
        let mut b = MapBuilder::new();
        b.line(0, 0, 0, 64);
        let map = b.build();
        assert!(line_of_sight(&map, -1000 * U, 500 * U, 1000 * U, 500 * U));
    }
}
