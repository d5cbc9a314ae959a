//! Raw little-endian records from the WAD format.
//!
//! Map lumps are flat arrays of fixed-size records. Each record type knows
//! its size and how to decode itself; [`parse_records`] splits a lump into
//! records and ignores a trailing partial record.

use bitflags::bitflags;

/// Bytes in the WAD header (`IWAD`/`PWAD`, lump count, directory offset).
pub const HEADER_SIZE: usize = 12;
/// Bytes per directory entry.
pub const DIR_ENTRY_SIZE: usize = 16;

/// Bit flag marking a node child as a subsector index.
pub const NF_SUBSECTOR: u16 = 0x8000;
/// Sidedef index meaning "no side".
pub const NO_SIDEDEF: u16 = 0xFFFF;

/// Player 1 start thing type.
pub const THING_PLAYER1: u16 = 1;

bitflags! {
    /// Thing placement flags from the THINGS lump.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ThingFlags: u16 {
        /// Present on skills 1-2.
        const EASY = 1;
        /// Present on skill 3.
        const NORMAL = 2;
        /// Present on skills 4-5.
        const HARD = 4;
        /// Deaf monster: only wakes when it sees the player in front.
        const AMBUSH = 8;
        /// Multiplayer only.
        const MULTI = 16;
    }
}

/// Lumps that follow a map marker, in directory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum MapLump {
    Things = 1,
    LineDefs = 2,
    SideDefs = 3,
    Vertexes = 4,
    Segs = 5,
    SubSectors = 6,
    Nodes = 7,
    Sectors = 8,
    Reject = 9,
    Blockmap = 10,
}

impl MapLump {
    /// Directory name of the lump.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Things => "THINGS",
            Self::LineDefs => "LINEDEFS",
            Self::SideDefs => "SIDEDEFS",
            Self::Vertexes => "VERTEXES",
            Self::Segs => "SEGS",
            Self::SubSectors => "SSECTORS",
            Self::Nodes => "NODES",
            Self::Sectors => "SECTORS",
            Self::Reject => "REJECT",
            Self::Blockmap => "BLOCKMAP",
        }
    }

    /// Offset from the map marker lump.
    pub const fn offset(self) -> usize {
        self as usize
    }
}

/// Little-endian readers. Callers pass slices already sized to the record.
pub mod le {
    #[inline]
    pub fn i16_at(data: &[u8], offset: usize) -> i16 {
        i16::from_le_bytes([data[offset], data[offset + 1]])
    }

    #[inline]
    pub fn u16_at(data: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([data[offset], data[offset + 1]])
    }

    /// Bounds-checked `i32`, for header fields read from untrusted input.
    #[inline]
    pub fn i32_at(data: &[u8], offset: usize) -> Option<i32> {
        let bytes = data.get(offset..offset + 4)?;
        Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    #[inline]
    pub fn name_at(data: &[u8], offset: usize) -> [u8; 8] {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&data[offset..offset + 8]);
        buf
    }
}

/// Convert an 8-byte lump name to an uppercase string, stopping at NUL.
pub fn lump_name(name: &[u8; 8]) -> String {
    let end = name.iter().position(|&b| b == 0).unwrap_or(8);
    String::from_utf8_lossy(&name[..end]).to_ascii_uppercase()
}

/// A fixed-size record in a map lump.
pub trait RawRecord: Sized {
    const SIZE: usize;

    /// Decode from exactly `SIZE` bytes.
    fn decode(bytes: &[u8]) -> Self;
}

/// Decode every whole record in `data`.
pub fn parse_records<T: RawRecord>(data: &[u8]) -> Vec<T> {
    data.chunks_exact(T::SIZE).map(T::decode).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawVertex {
    pub x: i16,
    pub y: i16,
}

impl RawRecord for RawVertex {
    const SIZE: usize = 4;

    fn decode(b: &[u8]) -> Self {
        Self {
            x: le::i16_at(b, 0),
            y: le::i16_at(b, 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLineDef {
    pub v1: u16,
    pub v2: u16,
    pub flags: u16,
    pub special: u16,
    pub tag: u16,
    /// Front sidedef.
    pub right_sidedef: u16,
    /// Back sidedef, [`NO_SIDEDEF`] when one-sided.
    pub left_sidedef: u16,
}

impl RawRecord for RawLineDef {
    const SIZE: usize = 14;

    fn decode(b: &[u8]) -> Self {
        Self {
            v1: le::u16_at(b, 0),
            v2: le::u16_at(b, 2),
            flags: le::u16_at(b, 4),
            special: le::u16_at(b, 6),
            tag: le::u16_at(b, 8),
            right_sidedef: le::u16_at(b, 10),
            left_sidedef: le::u16_at(b, 12),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSideDef {
    pub x_offset: i16,
    pub y_offset: i16,
    pub upper_texture: [u8; 8],
    pub lower_texture: [u8; 8],
    pub middle_texture: [u8; 8],
    pub sector: u16,
}

impl RawRecord for RawSideDef {
    const SIZE: usize = 30;

    fn decode(b: &[u8]) -> Self {
        Self {
            x_offset: le::i16_at(b, 0),
            y_offset: le::i16_at(b, 2),
            upper_texture: le::name_at(b, 4),
            lower_texture: le::name_at(b, 12),
            middle_texture: le::name_at(b, 20),
            sector: le::u16_at(b, 28),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSector {
    pub floor_height: i16,
    pub ceiling_height: i16,
    pub floor_texture: [u8; 8],
    pub ceiling_texture: [u8; 8],
    pub light_level: u16,
    pub special: u16,
    pub tag: u16,
}

impl RawRecord for RawSector {
    const SIZE: usize = 26;

    fn decode(b: &[u8]) -> Self {
        Self {
            floor_height: le::i16_at(b, 0),
            ceiling_height: le::i16_at(b, 2),
            floor_texture: le::name_at(b, 4),
            ceiling_texture: le::name_at(b, 12),
            light_level: le::u16_at(b, 20),
            special: le::u16_at(b, 22),
            tag: le::u16_at(b, 24),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSeg {
    pub v1: u16,
    pub v2: u16,
    /// BAM angle >> 16.
    pub angle: i16,
    pub linedef: u16,
    /// 0 = same direction as the linedef, 1 = opposite.
    pub direction: u16,
    pub offset: i16,
}

impl RawRecord for RawSeg {
    const SIZE: usize = 12;

    fn decode(b: &[u8]) -> Self {
        Self {
            v1: le::u16_at(b, 0),
            v2: le::u16_at(b, 2),
            angle: le::i16_at(b, 4),
            linedef: le::u16_at(b, 6),
            direction: le::u16_at(b, 8),
            offset: le::i16_at(b, 10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSubSector {
    pub num_segs: u16,
    pub first_seg: u16,
}

impl RawRecord for RawSubSector {
    const SIZE: usize = 4;

    fn decode(b: &[u8]) -> Self {
        Self {
            num_segs: le::u16_at(b, 0),
            first_seg: le::u16_at(b, 2),
        }
    }
}

/// BSP node. Bounding boxes are `[top, bottom, left, right]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNode {
    pub x: i16,
    pub y: i16,
    pub dx: i16,
    pub dy: i16,
    pub bbox_right: [i16; 4],
    pub bbox_left: [i16; 4],
    pub right_child: u16,
    pub left_child: u16,
}

impl RawRecord for RawNode {
    const SIZE: usize = 28;

    fn decode(b: &[u8]) -> Self {
        let bbox = |base: usize| std::array::from_fn(|i| le::i16_at(b, base + i * 2));
        Self {
            x: le::i16_at(b, 0),
            y: le::i16_at(b, 2),
            dx: le::i16_at(b, 4),
            dy: le::i16_at(b, 6),
            bbox_right: bbox(8),
            bbox_left: bbox(16),
            right_child: le::u16_at(b, 24),
            left_child: le::u16_at(b, 26),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawThing {
    pub x: i16,
    pub y: i16,
    /// Degrees, counter-clockwise from east.
    pub angle: u16,
    pub thing_type: u16,
    pub flags: ThingFlags,
}

impl RawRecord for RawThing {
    const SIZE: usize = 10;

    fn decode(b: &[u8]) -> Self {
        Self {
            x: le::i16_at(b, 0),
            y: le::i16_at(b, 2),
            angle: le::u16_at(b, 4),
            thing_type: le::u16_at(b, 6),
            flags: ThingFlags::from_bits_retain(le::u16_at(b, 8)),
        }
    }
}
