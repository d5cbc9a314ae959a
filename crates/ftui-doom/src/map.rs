//! Level geometry in fixed point.
//!
//! [`MapData`] is immutable once loaded. Sight, movement, hitscan,
//! projectiles and the renderer all borrow it.

use bitflags::bitflags;

use crate::angle::Angle;
use crate::blockmap::Blockmap;
use crate::error::{DoomError, WadError};
use crate::fixed::{FRACBITS, Fixed};
use crate::geometry::{BoundingBox, point_on_side};
use crate::wad::WadFile;
use crate::wad_types::{
    MapLump, NF_SUBSECTOR, NO_SIDEDEF, RawLineDef, RawNode, RawSector, RawSeg, RawSideDef,
    RawSubSector, RawThing, RawVertex, THING_PLAYER1, ThingFlags, lump_name, parse_records,
};

pub use crate::builder::MapBuilder;

bitflags! {
    /// Linedef flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LineFlags: u16 {
        /// Blocks players and monsters.
        const BLOCKING = 1;
        /// Blocks monsters only.
        const BLOCK_MONSTERS = 2;
        /// Has a back side.
        const TWO_SIDED = 4;
        const DONT_PEG_TOP = 8;
        const DONT_PEG_BOTTOM = 16;
        const SECRET = 32;
        const SOUND_BLOCK = 64;
        const DONT_DRAW = 128;
        const MAPPED = 256;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vertex {
    pub x: Fixed,
    pub y: Fixed,
}

/// Orientation class of a linedef, used to shortcut box tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeType {
    Horizontal,
    Vertical,
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDef {
    pub v1: usize,
    pub v2: usize,
    pub x1: Fixed,
    pub y1: Fixed,
    pub x2: Fixed,
    pub y2: Fixed,
    pub dx: Fixed,
    pub dy: Fixed,
    pub flags: LineFlags,
    pub special: u16,
    pub tag: u16,
    /// Front and back sidedefs.
    pub sides: [Option<usize>; 2],
    pub front_sector: Option<usize>,
    pub back_sector: Option<usize>,
    pub bbox: BoundingBox,
    pub slope: SlopeType,
}

impl LineDef {
    /// Build a linedef between two vertexes, resolving sector references
    /// through the sidedefs.
    pub fn new(
        v1: usize,
        v2: usize,
        a: Vertex,
        b: Vertex,
        flags: LineFlags,
        sides: [Option<usize>; 2],
        sidedefs: &[SideDef],
    ) -> Self {
        let dx = b.x.wrapping_sub(a.x);
        let dy = b.y.wrapping_sub(a.y);
        let slope = if dx == 0 {
            SlopeType::Vertical
        } else if dy == 0 {
            SlopeType::Horizontal
        } else if (dx > 0) == (dy > 0) {
            SlopeType::Positive
        } else {
            SlopeType::Negative
        };
        let sector_of = |side: Option<usize>| side.and_then(|s| sidedefs.get(s)).map(|s| s.sector);
        Self {
            v1,
            v2,
            x1: a.x,
            y1: a.y,
            x2: b.x,
            y2: b.y,
            dx,
            dy,
            flags,
            special: 0,
            tag: 0,
            sides,
            front_sector: sector_of(sides[0]),
            back_sector: sector_of(sides[1]),
            bbox: BoundingBox::from_segment(a.x, a.y, b.x, b.y),
            slope,
        }
    }

    /// A line with sectors on both sides.
    #[inline]
    pub fn is_two_sided(&self) -> bool {
        self.front_sector.is_some() && self.back_sector.is_some()
    }

    /// Side of the line a point is on (0 = front/right, 1 = back).
    #[inline]
    pub fn point_side(&self, x: Fixed, y: Fixed) -> usize {
        point_on_side(x, y, self.x1, self.y1, self.dx, self.dy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideDef {
    pub x_offset: Fixed,
    pub y_offset: Fixed,
    pub top_texture: String,
    pub bottom_texture: String,
    pub mid_texture: String,
    pub sector: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    pub floor_height: Fixed,
    pub ceiling_height: Fixed,
    pub floor_flat: String,
    pub ceiling_flat: String,
    /// 0-255.
    pub light_level: i32,
    pub special: u16,
    pub tag: u16,
}

/// Vertical gap through a two-sided line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opening {
    pub top: Fixed,
    pub bottom: Fixed,
    pub range: Fixed,
    pub low_floor: Fixed,
}

/// Part of a linedef bounding one subsector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seg {
    pub x1: Fixed,
    pub y1: Fixed,
    pub x2: Fixed,
    pub y2: Fixed,
    pub angle: Angle,
    pub linedef: usize,
    /// Which side of the linedef this seg runs along.
    pub side: usize,
    /// Distance along the linedef to the seg start.
    pub offset: Fixed,
    pub front_sector: usize,
    pub back_sector: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubSector {
    pub first_seg: usize,
    pub num_segs: usize,
    pub sector: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChild {
    Node(usize),
    SubSector(usize),
}

impl NodeChild {
    fn from_raw(raw: u16) -> Self {
        if raw & NF_SUBSECTOR != 0 {
            Self::SubSector(usize::from(raw & !NF_SUBSECTOR))
        } else {
            Self::Node(usize::from(raw))
        }
    }
}

/// BSP node. Index 0 of `bbox`/`children` is the front (right) side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub x: Fixed,
    pub y: Fixed,
    pub dx: Fixed,
    pub dy: Fixed,
    pub bbox: [BoundingBox; 2],
    pub children: [NodeChild; 2],
}

impl Node {
    #[inline]
    pub fn point_side(&self, x: Fixed, y: Fixed) -> usize {
        point_on_side(x, y, self.x, self.y, self.dx, self.dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapThing {
    pub x: Fixed,
    pub y: Fixed,
    pub angle: Angle,
    /// Editor number.
    pub kind: u16,
    pub flags: ThingFlags,
}

/// A loaded level.
#[derive(Debug, Clone, Default)]
pub struct MapData {
    pub name: String,
    pub vertexes: Vec<Vertex>,
    pub lines: Vec<LineDef>,
    pub sides: Vec<SideDef>,
    pub sectors: Vec<Sector>,
    pub segs: Vec<Seg>,
    pub subsectors: Vec<SubSector>,
    pub nodes: Vec<Node>,
    pub things: Vec<MapThing>,
    pub blockmap: Blockmap,
}

#[inline]
fn units(v: i16) -> Fixed {
    i32::from(v) << FRACBITS
}

/// Thing angle in degrees to BAM.
pub fn degrees_to_angle(degrees: u16) -> Angle {
    ((u64::from(degrees % 360) << 32) / 360) as Angle
}

fn bad_lump(name: &str, len: usize) -> DoomError {
    DoomError::Wad(WadError::BadLumpSize {
        name: name.to_string(),
        len,
    })
}

impl MapData {
    /// Load map `name` (e.g. `"E1M1"`) from a WAD.
    ///
    /// A missing or malformed BLOCKMAP is rebuilt from the linedefs.
    pub fn from_wad(wad: &WadFile, name: &str) -> crate::Result<Self> {
        if wad.find_lump(name).is_none() {
            return Err(DoomError::MapNotFound(name.to_string()));
        }
        let lump = |l: MapLump| wad.map_lump(name, l);

        let vertexes: Vec<Vertex> = parse_records::<RawVertex>(lump(MapLump::Vertexes)?)
            .into_iter()
            .map(|v| Vertex {
                x: units(v.x),
                y: units(v.y),
            })
            .collect();

        let sectors: Vec<Sector> = parse_records::<RawSector>(lump(MapLump::Sectors)?)
            .into_iter()
            .map(|s| Sector {
                floor_height: units(s.floor_height),
                ceiling_height: units(s.ceiling_height),
                floor_flat: lump_name(&s.floor_texture),
                ceiling_flat: lump_name(&s.ceiling_texture),
                light_level: i32::from(s.light_level).clamp(0, 255),
                special: s.special,
                tag: s.tag,
            })
            .collect();

        let side_data = lump(MapLump::SideDefs)?;
        let sides = parse_records::<RawSideDef>(side_data)
            .into_iter()
            .map(|s| {
                let sector = usize::from(s.sector);
                if sector >= sectors.len() {
                    return Err(bad_lump("SIDEDEFS", side_data.len()));
                }
                Ok(SideDef {
                    x_offset: units(s.x_offset),
                    y_offset: units(s.y_offset),
                    top_texture: lump_name(&s.upper_texture),
                    bottom_texture: lump_name(&s.lower_texture),
                    mid_texture: lump_name(&s.middle_texture),
                    sector,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let line_data = lump(MapLump::LineDefs)?;
        let lines = parse_records::<RawLineDef>(line_data)
            .into_iter()
            .map(|l| {
                let (v1, v2) = (usize::from(l.v1), usize::from(l.v2));
                let (Some(&a), Some(&b)) = (vertexes.get(v1), vertexes.get(v2)) else {
                    return Err(bad_lump("LINEDEFS", line_data.len()));
                };
                let side = |raw: u16| {
                    (raw != NO_SIDEDEF && usize::from(raw) < sides.len()).then_some(usize::from(raw))
                };
                let mut line = LineDef::new(
                    v1,
                    v2,
                    a,
                    b,
                    LineFlags::from_bits_retain(l.flags),
                    [side(l.right_sidedef), side(l.left_sidedef)],
                    &sides,
                );
                line.special = l.special;
                line.tag = l.tag;
                Ok(line)
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let seg_data = lump(MapLump::Segs)?;
        let segs = parse_records::<RawSeg>(seg_data)
            .into_iter()
            .map(|s| {
                let line = lines
                    .get(usize::from(s.linedef))
                    .ok_or_else(|| bad_lump("SEGS", seg_data.len()))?;
                let (Some(&a), Some(&b)) = (
                    vertexes.get(usize::from(s.v1)),
                    vertexes.get(usize::from(s.v2)),
                ) else {
                    return Err(bad_lump("SEGS", seg_data.len()));
                };
                let side = usize::from(s.direction != 0);
                let sector_of = |i: usize| line.sides[i].map(|sd| sides[sd].sector);
                let front_sector =
                    sector_of(side).ok_or_else(|| bad_lump("SEGS", seg_data.len()))?;
                let back_sector = if line.is_two_sided() {
                    sector_of(side ^ 1)
                } else {
                    None
                };
                Ok(Seg {
                    x1: a.x,
                    y1: a.y,
                    x2: b.x,
                    y2: b.y,
                    angle: u32::from(s.angle as u16) << 16,
                    linedef: usize::from(s.linedef),
                    side,
                    offset: units(s.offset),
                    front_sector,
                    back_sector,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let ss_data = lump(MapLump::SubSectors)?;
        let subsectors = parse_records::<RawSubSector>(ss_data)
            .into_iter()
            .map(|ss| {
                let first_seg = usize::from(ss.first_seg);
                let num_segs = usize::from(ss.num_segs);
                let sector = segs
                    .get(first_seg)
                    .filter(|_| first_seg + num_segs <= segs.len())
                    .map(|seg| seg.front_sector)
                    .ok_or_else(|| bad_lump("SSECTORS", ss_data.len()))?;
                Ok(SubSector {
                    first_seg,
                    num_segs,
                    sector,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let node_data = lump(MapLump::Nodes)?;
        let raw_nodes = parse_records::<RawNode>(node_data);
        let node_count = raw_nodes.len();
        let nodes = raw_nodes
            .into_iter()
            .map(|n| {
                let children = [
                    NodeChild::from_raw(n.right_child),
                    NodeChild::from_raw(n.left_child),
                ];
                let valid = children.iter().all(|c| match *c {
                    NodeChild::Node(i) => i < node_count,
                    NodeChild::SubSector(i) => i < subsectors.len(),
                });
                if !valid {
                    return Err(bad_lump("NODES", node_data.len()));
                }
                let bbox = |b: [i16; 4]| BoundingBox {
                    top: units(b[0]),
                    bottom: units(b[1]),
                    left: units(b[2]),
                    right: units(b[3]),
                };
                Ok(Node {
                    x: units(n.x),
                    y: units(n.y),
                    dx: units(n.dx),
                    dy: units(n.dy),
                    bbox: [bbox(n.bbox_right), bbox(n.bbox_left)],
                    children,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let things = parse_records::<RawThing>(lump(MapLump::Things)?)
            .into_iter()
            .map(|t| MapThing {
                x: units(t.x),
                y: units(t.y),
                angle: degrees_to_angle(t.angle),
                kind: t.thing_type,
                flags: t.flags,
            })
            .collect();

        let blockmap = match lump(MapLump::Blockmap)
            .and_then(|data| Blockmap::from_lump(data, lines.len()))
        {
            Ok(bm) => bm,
            Err(err) => {
                tracing::warn!(map = name, %err, "rebuilding blockmap");
                Blockmap::build(&lines)
            }
        };

        let map = Self {
            name: name.to_ascii_uppercase(),
            vertexes,
            lines,
            sides,
            sectors,
            segs,
            subsectors,
            nodes,
            things,
            blockmap,
        };
        tracing::debug!(
            map = %map.name,
            lines = map.lines.len(),
            sectors = map.sectors.len(),
            things = map.things.len(),
            "map loaded"
        );
        Ok(map)
    }

    /// Subsector containing a point, by BSP descent.
    ///
    /// A map with subsectors but no nodes is a single subsector.
    pub fn point_in_subsector(&self, x: Fixed, y: Fixed) -> Option<usize> {
        if self.nodes.is_empty() {
            return (!self.subsectors.is_empty()).then_some(0);
        }
        let mut index = self.nodes.len() - 1;
        // Each step descends one level; a well-formed tree is never deeper
        // than its node count.
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(index)?;
            match node.children[node.point_side(x, y)] {
                NodeChild::SubSector(ss) => return (ss < self.subsectors.len()).then_some(ss),
                NodeChild::Node(next) => index = next,
            }
        }
        None
    }

    pub fn sector_index_at(&self, x: Fixed, y: Fixed) -> Option<usize> {
        let ss = self.point_in_subsector(x, y)?;
        let sector = self.subsectors[ss].sector;
        (sector < self.sectors.len()).then_some(sector)
    }

    /// Sector containing a point, `None` on a soft miss.
    pub fn sector_at(&self, x: Fixed, y: Fixed) -> Option<&Sector> {
        self.sector_index_at(x, y).map(|i| &self.sectors[i])
    }

    /// Vertical opening through a two-sided line.
    pub fn line_opening(&self, line: &LineDef) -> Option<Opening> {
        let front = self.sectors.get(line.front_sector?)?;
        let back = self.sectors.get(line.back_sector?)?;
        let top = front.ceiling_height.min(back.ceiling_height);
        let bottom = front.floor_height.max(back.floor_height);
        Some(Opening {
            top,
            bottom,
            range: top.saturating_sub(bottom),
            low_floor: front.floor_height.min(back.floor_height),
        })
    }

    /// First player-1 start.
    pub fn player_start(&self) -> Option<&MapThing> {
        self.things.iter().find(|t| t.kind == THING_PLAYER1)
    }

    /// Sidedef on `side` of a line.
    pub fn side_of(&self, line: &LineDef, side: usize) -> Option<&SideDef> {
        line.sides.get(side).copied().flatten().and_then(|s| self.sides.get(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FRACUNIT;
    use crate::wad::WadBuilder;

    const U: Fixed = FRACUNIT;

    fn words(vals: &[i16]) -> Vec<u8> {
        vals.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn name8(name: &str) -> [u8; 8] {
        let mut raw = [0u8; 8];
        for (d, s) in raw.iter_mut().zip(name.bytes()) {
            *d = s;
        }
        raw
    }

    /// One square sector, four one-sided walls, one subsector, no nodes.
    fn square_wad(with_blockmap: bool) -> WadFile {
        let vertexes = words(&[0, 0, 0, 128, 128, 128, 128, 0]);
        let mut linedefs = Vec::new();
        for (a, b) in [(0u16, 1u16), (1, 2), (2, 3), (3, 0)] {
            for v in [a, b, 1, 0, 0, 0, NO_SIDEDEF] {
                linedefs.extend_from_slice(&v.to_le_bytes());
            }
        }
        let mut sidedefs = words(&[0, 0]);
        sidedefs.extend_from_slice(&name8("-"));
        sidedefs.extend_from_slice(&name8("-"));
        sidedefs.extend_from_slice(&name8("STARTAN3"));
        sidedefs.extend_from_slice(&0u16.to_le_bytes());
        let mut sectors = words(&[0, 96]);
        sectors.extend_from_slice(&name8("FLOOR4_8"));
        sectors.extend_from_slice(&name8("CEIL3_5"));
        sectors.extend_from_slice(&words(&[192, 0, 0]));
        let mut segs = Vec::new();
        for i in 0..4i16 {
            segs.extend_from_slice(&words(&[i, (i + 1) % 4, 0, i, 0, 0]));
        }
        let ssectors = words(&[4, 0]);
        let things = words(&[64, 64, 90, 1, 7]);

        let mut b = WadBuilder::new()
            .marker("MAP01")
            .lump("THINGS", things)
            .lump("LINEDEFS", linedefs)
            .lump("SIDEDEFS", sidedefs)
            .lump("VERTEXES", vertexes)
            .lump("SEGS", segs)
            .lump("SSECTORS", ssectors)
            .lump("NODES", Vec::new())
            .lump("SECTORS", sectors)
            .lump("REJECT", Vec::new());
        if with_blockmap {
            b = b.lump("BLOCKMAP", words(&[-8, -8, 1, 1, 5, 0, 0, 1, 2, 3, -1]));
        } else {
            b = b.lump("BLOCKMAP", Vec::new());
        }
        b.into_wad().unwrap()
    }

    #[test]
    fn loads_geometry_in_fixed_point() {
        let map = MapData::from_wad(&square_wad(true), "map01").unwrap();
        assert_eq!(map.name, "MAP01");
        assert_eq!(map.vertexes[2], Vertex { x: 128 * U, y: 128 * U });
        assert_eq!(map.lines.len(), 4);
        assert_eq!(map.lines[0].slope, SlopeType::Vertical);
        assert_eq!(map.lines[1].slope, SlopeType::Horizontal);
        assert_eq!(map.lines[0].front_sector, Some(0));
        assert!(!map.lines[0].is_two_sided());
        assert_eq!(map.sectors[0].ceiling_height, 96 * U);
        assert_eq!(map.sectors[0].floor_flat, "FLOOR4_8");
        assert_eq!(map.sectors[0].light_level, 192);
        assert_eq!(map.sides[0].mid_texture, "STARTAN3");
        assert_eq!(map.subsectors[0].num_segs, 4);
        assert_eq!(map.blockmap.cell(0, 0), Some(&[0, 1, 2, 3][..]));
    }

    #[test]
    fn thing_angle_converts_to_bam() {
        let map = MapData::from_wad(&square_wad(true), "MAP01").unwrap();
        let start = map.player_start().unwrap();
        assert_eq!(start.angle, crate::angle::ANG90);
        assert_eq!((start.x, start.y), (64 * U, 64 * U));
        assert!(start.flags.contains(ThingFlags::EASY | ThingFlags::HARD));
    }

    #[test]
    fn missing_blockmap_is_rebuilt() {
        let map = MapData::from_wad(&square_wad(false), "MAP01").unwrap();
        assert!(map.blockmap.width > 0);
        assert!(!map.blockmap.cell(0, 0).unwrap().is_empty());
    }

    #[test]
    fn unknown_map_is_reported() {
        assert!(matches!(
            MapData::from_wad(&square_wad(true), "E9M9"),
            Err(DoomError::MapNotFound(name)) if name == "E9M9"
        ));
    }

    #[test]
    fn nodeless_map_is_one_subsector() {
        let map = MapData::from_wad(&square_wad(true), "MAP01").unwrap();
        assert_eq!(map.point_in_subsector(10 * U, 10 * U), Some(0));
        assert_eq!(map.sector_at(10 * U, 10 * U).map(|s| s.light_level), Some(192));
    }

    #[test]
    fn empty_map_has_no_sector() {
        let map = MapData::default();
        assert_eq!(map.point_in_subsector(0, 0), None);
        assert!(map.sector_at(0, 0).is_none());
    }

    #[test]
    fn degrees_to_bam() {
        assert_eq!(degrees_to_angle(0), 0);
        assert_eq!(degrees_to_angle(180), crate::angle::ANG180);
        assert_eq!(degrees_to_angle(360), 0);
    }

    #[test]
    fn opening_through_two_sided_line() {
        let map = MapBuilder::demo();
        let portal = map
            .lines
            .iter()
            .find(|l| l.is_two_sided() && l.back_sector == Some(2))
            .unwrap();
        let opening = map.line_opening(portal).unwrap();
        assert_eq!(opening.top, 128 * U);
        assert_eq!(opening.bottom, 16 * U);
        assert_eq!(opening.range, 112 * U);
        assert_eq!(opening.low_floor, 0);
    }
}
