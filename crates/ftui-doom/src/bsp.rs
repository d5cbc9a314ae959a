//! BSP tree traversal for front-to-back rendering.
//!
//! Visits subsectors nearest-first relative to the viewer. The far side of
//! each node is entered only when its bounding box passes the caller's
//! visibility test.

use crate::angle::{ANG180, Angle, point_to_angle};
use crate::fixed::Fixed;
use crate::geometry::BoundingBox;
use crate::map::{MapData, NodeChild};
use crate::projection::RenderTables;

/// Callback for processing a subsector during BSP traversal.
/// Return `true` to continue, `false` to early-exit.
pub type SubSectorVisitor<'a> = &'a mut dyn FnMut(usize) -> bool;

/// Receiver for a front-to-back walk.
pub trait BspVisitor {
    /// Whether the far child bounded by `bbox` is worth entering.
    fn check_bbox(&mut self, _bbox: &BoundingBox) -> bool {
        true
    }

    /// Handle one subsector; `false` stops the walk.
    fn visit_subsector(&mut self, subsector: usize) -> bool;
}

struct Closures<'v, 'f> {
    visible: &'v mut dyn FnMut(&BoundingBox) -> bool,
    visitor: SubSectorVisitor<'f>,
}

impl BspVisitor for Closures<'_, '_> {
    fn check_bbox(&mut self, bbox: &BoundingBox) -> bool {
        (self.visible)(bbox)
    }

    fn visit_subsector(&mut self, subsector: usize) -> bool {
        (self.visitor)(subsector)
    }
}

/// Traverse the whole BSP tree front-to-back from the given viewpoint.
pub fn bsp_traverse(map: &MapData, view_x: Fixed, view_y: Fixed, visitor: SubSectorVisitor<'_>) {
    bsp_traverse_culled(map, view_x, view_y, &mut |_| true, visitor);
}

/// Front-to-back traversal that skips far children whose bounding box
/// `visible` rejects.
pub fn bsp_traverse_culled(
    map: &MapData,
    view_x: Fixed,
    view_y: Fixed,
    visible: &mut dyn FnMut(&BoundingBox) -> bool,
    visitor: SubSectorVisitor<'_>,
) {
    bsp_walk(map, view_x, view_y, &mut Closures { visible, visitor });
}

/// Front-to-back walk driving a [`BspVisitor`].
pub fn bsp_walk(map: &MapData, view_x: Fixed, view_y: Fixed, visitor: &mut dyn BspVisitor) {
    if map.nodes.is_empty() {
        // Degenerate: single subsector map
        if !map.subsectors.is_empty() {
            visitor.visit_subsector(0);
        }
        return;
    }
    let root = NodeChild::Node(map.nodes.len() - 1);
    // A well-formed tree is never deeper than its node count.
    visit_child(map, root, view_x, view_y, map.nodes.len(), visitor);
}

fn visit_child(
    map: &MapData,
    child: NodeChild,
    view_x: Fixed,
    view_y: Fixed,
    depth: usize,
    visitor: &mut dyn BspVisitor,
) -> bool {
    match child {
        NodeChild::SubSector(ss) => ss >= map.subsectors.len() || visitor.visit_subsector(ss),
        NodeChild::Node(index) => {
            let Some(node) = map.nodes.get(index) else {
                return true;
            };
            if depth == 0 {
                tracing::warn!(node = index, "BSP recursion limit reached");
                return true;
            }
            let side = node.point_side(view_x, view_y);
            let near = node.children[side];
            let far = node.children[side ^ 1];
            if !visit_child(map, near, view_x, view_y, depth - 1, visitor) {
                return false;
            }
            if !visitor.check_bbox(&node.bbox[side ^ 1]) {
                return true;
            }
            visit_child(map, far, view_x, view_y, depth - 1, visitor)
        }
    }
}

/// Where a bounding box falls on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxSpan {
    /// The viewer is inside the box or on its silhouette edge.
    Surrounds,
    /// First and last screen columns the box may cover, inclusive.
    Columns(i32, i32),
    /// Entirely outside the field of view.
    Hidden,
}

/// Corner pairs giving a box's silhouette, by the viewer's position
/// relative to the box (3×3 grid, row-major from top-left). Entries index
/// `[top, bottom, left, right]` as `(x1, y1, x2, y2)`.
const SILHOUETTE: [[usize; 4]; 9] = [
    [3, 0, 2, 1],
    [3, 0, 2, 0],
    [3, 1, 2, 0],
    [2, 0, 2, 1],
    [0, 0, 0, 0],
    [3, 1, 3, 0],
    [2, 0, 3, 1],
    [2, 1, 3, 1],
    [2, 1, 3, 0],
];

/// Project a bounding box to the screen columns it spans.
pub fn bbox_span(
    tables: &RenderTables,
    view_x: Fixed,
    view_y: Fixed,
    view_angle: Angle,
    bbox: &BoundingBox,
) -> BoxSpan {
    let col = if view_x <= bbox.left {
        0
    } else if view_x < bbox.right {
        1
    } else {
        2
    };
    let row = if view_y >= bbox.top {
        0
    } else if view_y > bbox.bottom {
        1
    } else {
        2
    };
    let pos = row * 3 + col;
    if pos == 4 {
        return BoxSpan::Surrounds;
    }
    let coords = [bbox.top, bbox.bottom, bbox.left, bbox.right];
    let [x1, y1, x2, y2] = SILHOUETTE[pos].map(|i| coords[i]);

    let mut angle1 = point_to_angle(view_x, view_y, x1, y1).wrapping_sub(view_angle);
    let mut angle2 = point_to_angle(view_x, view_y, x2, y2).wrapping_sub(view_angle);
    let span = angle1.wrapping_sub(angle2);
    if span >= ANG180 {
        return BoxSpan::Surrounds;
    }

    let clip = tables.clip_angle;
    let tspan = angle1.wrapping_add(clip);
    if tspan > clip.wrapping_mul(2) {
        if tspan - clip.wrapping_mul(2) >= span {
            return BoxSpan::Hidden;
        }
        angle1 = clip;
    }
    let tspan = clip.wrapping_sub(angle2);
    if tspan > clip.wrapping_mul(2) {
        if tspan - clip.wrapping_mul(2) >= span {
            return BoxSpan::Hidden;
        }
        angle2 = clip.wrapping_neg();
    }

    let sx1 = tables.angle_to_x(angle1);
    let sx2 = tables.angle_to_x(angle2);
    if sx1 == sx2 {
        return BoxSpan::Hidden;
    }
    BoxSpan::Columns(sx1, sx2 - 1)
}

/// Whether any part of the box can be on screen.
#[inline]
pub fn bbox_visible(
    tables: &RenderTables,
    view_x: Fixed,
    view_y: Fixed,
    view_angle: Angle,
    bbox: &BoundingBox,
) -> bool {
    bbox_span(tables, view_x, view_y, view_angle, bbox) != BoxSpan::Hidden
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::{ANG90, ANG270};
    use crate::builder::MapBuilder;
    use crate::fixed::FRACUNIT;
    use crate::map::{Node, SubSector};

    const U: Fixed = FRACUNIT;

    fn subsectors(n: usize) -> Vec<SubSector> {
        (0..n)
            .map(|_| SubSector {
                first_seg: 0,
                num_segs: 0,
                sector: 0,
            })
            .collect()
    }

    fn node(x: i32, y: i32, dx: i32, dy: i32, front: NodeChild, back: NodeChild) -> Node {
        Node {
            x: x * U,
            y: y * U,
            dx: dx * U,
            dy: dy * U,
            bbox: [BoundingBox::EMPTY; 2],
            children: [front, back],
        }
    }

    fn two_subsector_map(x: i32, y: i32, dx: i32, dy: i32) -> MapData {
        MapData {
            subsectors: subsectors(2),
            nodes: vec![node(
                x,
                y,
                dx,
                dy,
                NodeChild::SubSector(0),
                NodeChild::SubSector(1),
            )],
            ..MapData::default()
        }
    }

    fn order(map: &MapData, x: i32, y: i32) -> Vec<usize> {
        let mut visited = vec![];
        bsp_traverse(map, x * U, y * U, &mut |ss| {
            visited.push(ss);
            true
        });
        visited
    }

    #[test]
    fn bsp_traverse_empty_map() {
        assert!(order(&MapData::default(), 0, 0).is_empty());
    }

    #[test]
    fn bsp_traverse_single_subsector() {
        let map = MapData {
            subsectors: subsectors(1),
            ..MapData::default()
        };
        assert_eq!(order(&map, 0, 0), vec![0]);
    }

    #[test]
    fn bsp_traverse_front_side_first() {
        // Partition along +y: +x is the front (right) side.
        let map = two_subsector_map(0, 0, 0, 1);
        assert_eq!(order(&map, 5, 0), vec![0, 1]);
        assert_eq!(order(&map, -5, 0), vec![1, 0]);
    }

    #[test]
    fn bsp_traverse_horizontal_partition() {
        // Partition along +x: below is the front side.
        let map = two_subsector_map(0, 0, 1, 0);
        assert_eq!(order(&map, 0, -5), vec![0, 1]);
        assert_eq!(order(&map, 0, 5), vec![1, 0]);
    }

    #[test]
    fn bsp_traverse_offset_partition_origin() {
        let map = two_subsector_map(10, 10, 0, 1);
        assert_eq!(order(&map, 15, 0), vec![0, 1]);
        assert_eq!(order(&map, 5, 0), vec![1, 0]);
    }

    #[test]
    fn bsp_traverse_viewer_on_partition_line() {
        let map = two_subsector_map(0, 0, 0, 1);
        assert_eq!(order(&map, 0, 50), vec![1, 0]);
    }

    #[test]
    fn bsp_traverse_early_exit() {
        let map = two_subsector_map(0, 0, 0, 1);
        let mut visited = vec![];
        bsp_traverse(&map, 5 * U, 0, &mut |ss| {
            visited.push(ss);
            false
        });
        assert_eq!(visited, vec![0]);
    }

    #[test]
    fn bsp_traverse_four_subsectors_balanced() {
        // Root splits on x = 0; each half splits on y = 0.
        let map = MapData {
            subsectors: subsectors(4),
            nodes: vec![
                node(0, 0, 1, 0, NodeChild::SubSector(0), NodeChild::SubSector(1)),
                node(0, 0, 1, 0, NodeChild::SubSector(2), NodeChild::SubSector(3)),
                node(0, 0, 0, 1, NodeChild::Node(0), NodeChild::Node(1)),
            ],
            ..MapData::default()
        };
        assert_eq!(order(&map, 5, -5), vec![0, 1, 2, 3]);
        assert_eq!(order(&map, -5, 5), vec![3, 2, 1, 0]);
    }

    #[test]
    fn culled_far_side_is_skipped() {
        let map = two_subsector_map(0, 0, 0, 1);
        let mut visited = vec![];
        bsp_traverse_culled(&map, 5 * U, 0, &mut |_| false, &mut |ss| {
            visited.push(ss);
            true
        });
        assert_eq!(visited, vec![0]);
    }

    #[test]
    fn demo_map_visits_every_subsector_once_viewer_first() {
        let map = MapBuilder::demo();
        let mut visited = vec![];
        bsp_traverse(&map, 10 * U, 10 * U, &mut |ss| {
            visited.push(ss);
            true
        });
        assert_eq!(visited.first().copied(), map.point_in_subsector(10 * U, 10 * U));
        let mut sorted = visited.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), map.subsectors.len());
        assert_eq!(visited.len(), map.subsectors.len());
    }

    fn boxed(left: i32, bottom: i32, right: i32, top: i32) -> BoundingBox {
        BoundingBox {
            top: top * U,
            bottom: bottom * U,
            left: left * U,
            right: right * U,
        }
    }

    #[test]
    fn viewer_inside_box_surrounds() {
        let t = RenderTables::new(320, 200);
        assert_eq!(
            bbox_span(&t, 0, 0, 0, &boxed(-10, -10, 10, 10)),
            BoxSpan::Surrounds
        );
    }

    #[test]
    fn box_ahead_covers_centre() {
        let t = RenderTables::new(320, 200);
        let BoxSpan::Columns(x1, x2) = bbox_span(&t, 0, 0, 0, &boxed(100, -10, 120, 10)) else {
            panic!("box ahead should be visible");
        };
        assert!(x1 < 160 && x2 >= 160, "{x1}..{x2}");
    }

    #[test]
    fn box_behind_is_hidden() {
        let t = RenderTables::new(320, 200);
        let b = boxed(-120, -10, -100, 10);
        assert_eq!(bbox_span(&t, 0, 0, 0, &b), BoxSpan::Hidden);
        assert!(!bbox_visible(&t, 0, 0, 0, &b));
        // Turn around and it is in view.
        assert!(bbox_visible(&t, 0, 0, ANG180, &b));
    }

    #[test]
    fn box_to_the_side_is_hidden_until_turned_to() {
        let t = RenderTables::new(320, 200);
        let b = boxed(-10, 100, 10, 120);
        assert!(!bbox_visible(&t, 0, 0, 0, &b));
        assert!(bbox_visible(&t, 0, 0, ANG90, &b));
        assert!(!bbox_visible(&t, 0, 0, ANG270, &b));
    }

    #[test]
    fn box_straddling_fov_edge_is_clipped() {
        let t = RenderTables::new(320, 200);
        // Spans from straight ahead to well past the left edge.
        let BoxSpan::Columns(x1, x2) = bbox_span(&t, 0, 0, 0, &boxed(50, -5, 60, 200)) else {
            panic!("should be visible");
        };
        assert_eq!(x1, 0);
        assert!(x2 >= 150);
    }
}
