//! Programmatic map construction.
//!
//! [`MapBuilder`] assembles sectors and linedefs in whole map units, then
//! derives segs, a BSP tree and a blockmap so the result behaves exactly
//! like a map loaded from a WAD. Used for the built-in demo level and tests.

use std::collections::HashMap;

use crate::angle::point_to_angle;
use crate::blockmap::Blockmap;
use crate::fixed::{FRACUNIT, Fixed, int_to_fixed};
use crate::geometry::{BoundingBox, dot, point_distance, side_value};
use crate::map::{
    LineDef, LineFlags, MapData, MapThing, Node, NodeChild, Sector, Seg, SideDef, SubSector,
    Vertex, degrees_to_angle,
};
use crate::wad_types::{THING_PLAYER1, ThingFlags};

/// Splits deeper than this emit a subsector as-is.
const MAX_BSP_DEPTH: usize = 64;

pub const DEFAULT_FLOOR_FLAT: &str = "FLOOR4_8";
pub const DEFAULT_CEILING_FLAT: &str = "CEIL3_5";
const DEFAULT_WALL: &str = "STARTAN3";

#[derive(Debug, Clone)]
pub struct MapBuilder {
    name: String,
    vertexes: Vec<Vertex>,
    vertex_index: HashMap<(Fixed, Fixed), usize>,
    sides: Vec<SideDef>,
    sectors: Vec<Sector>,
    lines: Vec<LineDef>,
    things: Vec<MapThing>,
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MapBuilder {
    pub fn new() -> Self {
        Self {
            name: "BUILT".to_string(),
            vertexes: Vec::new(),
            vertex_index: HashMap::new(),
            sides: Vec::new(),
            sectors: Vec::new(),
            lines: Vec::new(),
            things: Vec::new(),
        }
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_ascii_uppercase();
        self
    }

    /// Add a sector with default flats; returns its index.
    pub fn sector(&mut self, floor: i32, ceiling: i32, light: i32) -> usize {
        self.sectors.push(Sector {
            floor_height: int_to_fixed(floor),
            ceiling_height: int_to_fixed(ceiling),
            floor_flat: DEFAULT_FLOOR_FLAT.to_string(),
            ceiling_flat: DEFAULT_CEILING_FLAT.to_string(),
            light_level: light.clamp(0, 255),
            special: 0,
            tag: 0,
        });
        self.sectors.len() - 1
    }

    /// Replace a sector's flats.
    pub fn flats(&mut self, sector: usize, floor: &str, ceiling: &str) -> &mut Self {
        if let Some(s) = self.sectors.get_mut(sector) {
            s.floor_flat = floor.to_ascii_uppercase();
            s.ceiling_flat = ceiling.to_ascii_uppercase();
        }
        self
    }

    /// One-sided blocking wall; `sector` lies on its right.
    pub fn wall(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, sector: usize) -> &mut Self {
        let front = self.side(sector, "-", DEFAULT_WALL);
        self.push_line(x1, y1, x2, y2, LineFlags::BLOCKING, [Some(front), None]);
        self
    }

    /// Two-sided line with `front` on the right and `back` on the left.
    pub fn portal(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        front: usize,
        back: usize,
    ) -> &mut Self {
        let f = self.side(front, DEFAULT_WALL, "-");
        let b = self.side(back, DEFAULT_WALL, "-");
        self.push_line(x1, y1, x2, y2, LineFlags::TWO_SIDED, [Some(f), Some(b)]);
        self
    }

    /// One-sided wall in sector 0, creating a default sector when needed.
    pub fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> &mut Self {
        if self.sectors.is_empty() {
            self.sector(0, 128, 160);
        }
        self.wall(x1, y1, x2, y2, 0)
    }

    /// Closed rectangular sector with its corner at `(x, y)`.
    #[allow(clippy::too_many_arguments)]
    pub fn room(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        floor: i32,
        ceiling: i32,
        light: i32,
    ) -> &mut Self {
        let s = self.sector(floor, ceiling, light);
        // Clockwise, so the interior is on every wall's right.
        self.wall(x, y, x, y + h, s)
            .wall(x, y + h, x + w, y + h, s)
            .wall(x + w, y + h, x + w, y, s)
            .wall(x + w, y, x, y, s)
    }

    /// Place a thing present on every skill.
    pub fn thing(&mut self, x: i32, y: i32, degrees: u16, kind: u16) -> &mut Self {
        self.things.push(MapThing {
            x: int_to_fixed(x),
            y: int_to_fixed(y),
            angle: degrees_to_angle(degrees),
            kind,
            flags: ThingFlags::EASY | ThingFlags::NORMAL | ThingFlags::HARD,
        });
        self
    }

    fn side(&mut self, sector: usize, upper_lower: &str, mid: &str) -> usize {
        self.sides.push(SideDef {
            x_offset: 0,
            y_offset: 0,
            top_texture: upper_lower.to_string(),
            bottom_texture: upper_lower.to_string(),
            mid_texture: mid.to_string(),
            sector,
        });
        self.sides.len() - 1
    }

    fn vertex(&mut self, x: i32, y: i32) -> usize {
        let key = (int_to_fixed(x), int_to_fixed(y));
        if let Some(&i) = self.vertex_index.get(&key) {
            return i;
        }
        self.vertexes.push(Vertex { x: key.0, y: key.1 });
        self.vertex_index.insert(key, self.vertexes.len() - 1);
        self.vertexes.len() - 1
    }

    fn push_line(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        flags: LineFlags,
        sides: [Option<usize>; 2],
    ) {
        let v1 = self.vertex(x1, y1);
        let v2 = self.vertex(x2, y2);
        let line = LineDef::new(
            v1,
            v2,
            self.vertexes[v1],
            self.vertexes[v2],
            flags,
            sides,
            &self.sides,
        );
        self.lines.push(line);
    }

    /// Derive segs, BSP and blockmap and produce the map.
    pub fn build(&self) -> MapData {
        let mut initial = Vec::with_capacity(self.lines.len() * 2);
        for (index, line) in self.lines.iter().enumerate() {
            let Some(front) = line.front_sector else {
                continue;
            };
            initial.push(make_seg(
                line.x1,
                line.y1,
                line.x2,
                line.y2,
                index,
                0,
                front,
                line.back_sector,
            ));
            if let Some(back) = line.back_sector {
                initial.push(make_seg(
                    line.x2,
                    line.y2,
                    line.x1,
                    line.y1,
                    index,
                    1,
                    back,
                    Some(front),
                ));
            }
        }

        let mut bsp = BspOutput::default();
        if !initial.is_empty() {
            bsp.partition(initial, 0);
        }

        let map = MapData {
            name: self.name.clone(),
            vertexes: self.vertexes.clone(),
            lines: self.lines.clone(),
            sides: self.sides.clone(),
            sectors: self.sectors.clone(),
            segs: bsp.segs,
            subsectors: bsp.subsectors,
            nodes: bsp.nodes,
            things: self.things.clone(),
            blockmap: Blockmap::build(&self.lines),
        };
        tracing::debug!(
            map = %map.name,
            nodes = map.nodes.len(),
            subsectors = map.subsectors.len(),
            "map built"
        );
        map
    }

    /// The built-in level: a main hall with an east corridor and a raised,
    /// sky-lit north room, a player start and three monsters.
    pub fn demo() -> MapData {
        let mut b = Self::new();
        b.name("DEMO");
        let hall = b.sector(0, 128, 200);
        let corridor = b.sector(0, 112, 160);
        let north = b.sector(16, 160, 220);
        b.flats(north, DEFAULT_FLOOR_FLAT, crate::constants::SKY_FLAT_NAME);

        b.wall(-256, -256, -256, 256, hall)
            .wall(-256, 256, -64, 256, hall)
            .portal(-64, 256, 64, 256, hall, north)
            .wall(64, 256, 256, 256, hall)
            .wall(256, 256, 256, 64, hall)
            .portal(256, 64, 256, -64, hall, corridor)
            .wall(256, -64, 256, -256, hall)
            .wall(256, -256, -256, -256, hall);

        b.wall(256, 64, 512, 64, corridor)
            .wall(512, 64, 512, -64, corridor)
            .wall(512, -64, 256, -64, corridor);

        b.wall(-64, 256, -64, 512, north)
            .wall(-64, 512, 64, 512, north)
            .wall(64, 512, 64, 256, north);

        b.thing(0, 0, 0, THING_PLAYER1)
            .thing(400, 0, 180, 3004)
            .thing(0, 400, 270, 3001)
            .thing(-160, 160, 315, 3002);
        b.build()
    }
}

#[allow(clippy::too_many_arguments)]
fn make_seg(
    x1: Fixed,
    y1: Fixed,
    x2: Fixed,
    y2: Fixed,
    linedef: usize,
    side: usize,
    front_sector: usize,
    back_sector: Option<usize>,
) -> Seg {
    Seg {
        x1,
        y1,
        x2,
        y2,
        angle: point_to_angle(x1, y1, x2, y2),
        linedef,
        side,
        offset: 0,
        front_sector,
        back_sector,
    }
}

/// Which side of `s` a point lies on: positive on the seg's right (front).
#[inline]
fn side_of(s: &Seg, px: Fixed, py: Fixed) -> i64 {
    side_value(px, py, s.x1, s.y1, s.x2, s.y2)
}

#[inline]
fn same_direction(a: &Seg, b: &Seg) -> bool {
    dot(
        a.x2.wrapping_sub(a.x1),
        a.y2.wrapping_sub(a.y1),
        b.x2.wrapping_sub(b.x1),
        b.y2.wrapping_sub(b.y1),
    ) > 0
}

/// Whether `t` has any part behind `s`, or runs against it on its line.
fn behind(s: &Seg, t: &Seg) -> bool {
    let a = side_of(s, t.x1, t.y1);
    let b = side_of(s, t.x2, t.y2);
    a < 0 || b < 0 || (a == 0 && b == 0 && !same_direction(s, t))
}

#[derive(Debug, Default)]
struct BspOutput {
    segs: Vec<Seg>,
    subsectors: Vec<SubSector>,
    nodes: Vec<Node>,
}

impl BspOutput {
    fn partition(&mut self, segs: Vec<Seg>, depth: usize) -> NodeChild {
        let splitter = segs
            .iter()
            .position(|s| segs.iter().any(|t| behind(s, t)));
        let Some(splitter) = splitter.filter(|_| depth < MAX_BSP_DEPTH) else {
            return self.subsector(segs);
        };

        let s = segs[splitter].clone();
        let mut front = Vec::new();
        let mut back = Vec::new();
        for t in segs {
            let a = side_of(&s, t.x1, t.y1);
            let b = side_of(&s, t.x2, t.y2);
            if a == 0 && b == 0 {
                if same_direction(&s, &t) {
                    front.push(t);
                } else {
                    back.push(t);
                }
            } else if a >= 0 && b >= 0 {
                front.push(t);
            } else if a <= 0 && b <= 0 {
                back.push(t);
            } else {
                let (first, second) = split_seg(&s, &t);
                if a > 0 {
                    front.push(first);
                    back.push(second);
                } else {
                    back.push(first);
                    front.push(second);
                }
            }
        }

        let bbox = [seg_bounds(&front), seg_bounds(&back)];
        let children = [self.partition(front, depth + 1), self.partition(back, depth + 1)];
        self.nodes.push(Node {
            x: s.x1,
            y: s.y1,
            dx: s.x2.wrapping_sub(s.x1),
            dy: s.y2.wrapping_sub(s.y1),
            bbox,
            children,
        });
        NodeChild::Node(self.nodes.len() - 1)
    }

    fn subsector(&mut self, segs: Vec<Seg>) -> NodeChild {
        let sector = segs.first().map_or(0, |s| s.front_sector);
        self.subsectors.push(SubSector {
            first_seg: self.segs.len(),
            num_segs: segs.len(),
            sector,
        });
        self.segs.extend(segs);
        NodeChild::SubSector(self.subsectors.len() - 1)
    }
}

/// Cut `t` where it crosses the carrier line of `s`.
fn split_seg(s: &Seg, t: &Seg) -> (Seg, Seg) {
    let sdx = f64::from(s.x2) - f64::from(s.x1);
    let sdy = f64::from(s.y2) - f64::from(s.y1);
    let ca = (f64::from(t.x1) - f64::from(s.x1)) * sdy - (f64::from(t.y1) - f64::from(s.y1)) * sdx;
    let cb = (f64::from(t.x2) - f64::from(s.x1)) * sdy - (f64::from(t.y2) - f64::from(s.y1)) * sdx;
    let frac = ca / (ca - cb);
    let px = (f64::from(t.x1) + frac * (f64::from(t.x2) - f64::from(t.x1))).round() as Fixed;
    let py = (f64::from(t.y1) + frac * (f64::from(t.y2) - f64::from(t.y1))).round() as Fixed;

    let mut first = t.clone();
    first.x2 = px;
    first.y2 = py;
    let mut second = t.clone();
    second.x1 = px;
    second.y1 = py;
    second.offset = t.offset.saturating_add(point_distance(t.x1, t.y1, px, py));
    (first, second)
}

fn seg_bounds(segs: &[Seg]) -> BoundingBox {
    let mut bbox = BoundingBox::EMPTY;
    for s in segs {
        bbox.add_point(s.x1, s.y1);
        bbox.add_point(s.x2, s.y2);
    }
    if segs.is_empty() {
        BoundingBox::around(0, 0, FRACUNIT)
    } else {
        bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FRACUNIT;

    const U: Fixed = FRACUNIT;

    #[test]
    fn convex_room_is_one_subsector() {
        let map = MapBuilder::new().room(0, 0, 128, 128, 0, 96, 160).build();
        assert_eq!(map.lines.len(), 4);
        assert_eq!(map.vertexes.len(), 4);
        assert_eq!(map.subsectors.len(), 1);
        assert!(map.nodes.is_empty());
        assert_eq!(map.sector_index_at(64 * U, 64 * U), Some(0));
    }

    #[test]
    fn room_walls_face_inward() {
        let map = MapBuilder::new().room(0, 0, 128, 128, 0, 96, 160).build();
        for line in &map.lines {
            assert_eq!(line.point_side(64 * U, 64 * U), 0);
        }
    }

    #[test]
    fn demo_sectors_resolve_by_bsp() {
        let map = MapBuilder::demo();
        assert_eq!(map.name, "DEMO");
        assert!(!map.nodes.is_empty());
        assert_eq!(map.sector_index_at(0, 0), Some(0));
        assert_eq!(map.sector_index_at(400 * U, 0), Some(1));
        assert_eq!(map.sector_index_at(0, 400 * U), Some(2));
        assert_eq!(map.sector_at(0, 400 * U).unwrap().ceiling_flat, "F_SKY1");
    }

    #[test]
    fn demo_subsectors_are_single_sector() {
        let map = MapBuilder::demo();
        for ss in &map.subsectors {
            let segs = &map.segs[ss.first_seg..ss.first_seg + ss.num_segs];
            assert!(!segs.is_empty());
            assert!(segs.iter().all(|s| s.front_sector == ss.sector));
        }
    }

    #[test]
    fn demo_has_player_and_monsters() {
        let map = MapBuilder::demo();
        let start = map.player_start().unwrap();
        assert_eq!((start.x, start.y), (0, 0));
        assert_eq!(map.things.len(), 4);
    }

    #[test]
    fn portal_segs_run_both_ways() {
        let map = MapBuilder::demo();
        let portal = map.lines.iter().position(|l| l.is_two_sided()).unwrap();
        let sides: Vec<usize> = map
            .segs
            .iter()
            .filter(|s| s.linedef == portal)
            .map(|s| s.side)
            .collect();
        assert!(sides.contains(&0) && sides.contains(&1));
    }

    #[test]
    fn crossing_seg_is_split() {
        let s = make_seg(0, -10 * U, 0, 10 * U, 0, 0, 0, None);
        let t = make_seg(-4 * U, 0, 6 * U, 0, 1, 0, 0, None);
        let (a, b) = split_seg(&s, &t);
        assert_eq!((a.x2, a.y2), (0, 0));
        assert_eq!((b.x1, b.y1), (0, 0));
        assert_eq!(b.offset, 4 * U);
    }

    #[test]
    fn vertexes_are_shared() {
        let mut b = MapBuilder::new();
        b.line(0, 0, 64, 0).line(64, 0, 64, 64);
        let map = b.build();
        assert_eq!(map.vertexes.len(), 3);
        assert_eq!(map.lines[1].v1, map.lines[0].v2);
    }
}
