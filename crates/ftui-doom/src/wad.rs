//! WAD lump directory.
//!
//! Parses the header and directory once, validates every lump range, and
//! hands out borrowed lump slices by index, by name, or by marker range.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{DoomError, WadError};
use crate::wad_types::{DIR_ENTRY_SIZE, HEADER_SIZE, MapLump, le, lump_name};

/// One directory entry with a validated byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub filepos: usize,
    pub size: usize,
    pub name: String,
}

/// A lump borrowed from the WAD.
#[derive(Debug, Clone, Copy)]
pub struct LumpRef<'a> {
    pub index: usize,
    pub name: &'a str,
    pub data: &'a [u8],
}

/// A parsed WAD file.
#[derive(Debug, Clone)]
pub struct WadFile {
    data: Vec<u8>,
    pub directory: Vec<DirEntry>,
    /// Name to the last directory index carrying it (later lumps override).
    name_index: HashMap<String, usize>,
}

impl WadFile {
    /// Parse a WAD image from raw bytes.
    pub fn parse(data: Vec<u8>) -> Result<Self, WadError> {
        if data.len() < HEADER_SIZE {
            return Err(WadError::TooSmall { len: data.len() });
        }
        if &data[..4] != b"IWAD" && &data[..4] != b"PWAD" {
            return Err(WadError::BadHeader);
        }
        let num_lumps = le::i32_at(&data, 4).ok_or(WadError::BadHeader)?;
        let dir_offset = le::i32_at(&data, 8).ok_or(WadError::BadHeader)?;
        let bad_dir = WadError::BadDirectory {
            lumps: num_lumps.max(0) as usize,
            offset: dir_offset.max(0) as usize,
        };
        let (Ok(lumps), Ok(offset)) = (usize::try_from(num_lumps), usize::try_from(dir_offset))
        else {
            return Err(bad_dir);
        };
        let dir_end = lumps
            .checked_mul(DIR_ENTRY_SIZE)
            .and_then(|len| len.checked_add(offset));
        if dir_end.is_none_or(|end| end > data.len()) {
            return Err(bad_dir);
        }

        let mut directory = Vec::with_capacity(lumps);
        let mut name_index = HashMap::with_capacity(lumps);
        for i in 0..lumps {
            let off = offset + i * DIR_ENTRY_SIZE;
            let filepos = le::i32_at(&data, off).unwrap_or(-1);
            let size = le::i32_at(&data, off + 4).unwrap_or(-1);
            let (Ok(filepos), Ok(size)) = (usize::try_from(filepos), usize::try_from(size)) else {
                return Err(bad_dir);
            };
            if filepos.checked_add(size).is_none_or(|end| end > data.len()) {
                return Err(bad_dir);
            }
            let name = lump_name(&le::name_at(&data, off + 8));
            name_index.insert(name.clone(), i);
            directory.push(DirEntry {
                filepos,
                size,
                name,
            });
        }

        tracing::debug!(lumps, "wad directory parsed");
        Ok(Self {
            data,
            directory,
            name_index,
        })
    }

    /// Read and parse a WAD from disk.
    pub fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| DoomError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(data)?)
    }

    pub fn len(&self) -> usize {
        self.directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    /// Directory index of a lump, case-insensitive. The last match wins.
    pub fn find_lump(&self, name: &str) -> Option<usize> {
        self.name_index.get(&name.to_ascii_uppercase()).copied()
    }

    /// First lump named `name` strictly after `start`.
    pub fn find_lump_after(&self, name: &str, start: usize) -> Option<usize> {
        let upper = name.to_ascii_uppercase();
        self.directory
            .iter()
            .enumerate()
            .skip(start + 1)
            .find_map(|(i, e)| (e.name == upper).then_some(i))
    }

    /// Lump bytes by directory index.
    pub fn lump(&self, index: usize) -> Option<&[u8]> {
        let entry = self.directory.get(index)?;
        self.data.get(entry.filepos..entry.filepos + entry.size)
    }

    pub fn lump_by_name(&self, name: &str) -> Result<&[u8], WadError> {
        self.find_lump(name)
            .and_then(|i| self.lump(i))
            .ok_or_else(|| WadError::LumpNotFound(name.to_string()))
    }

    /// Non-empty lumps between two markers (exclusive).
    ///
    /// Zero-length lumps inside the range are nested markers such as
    /// `F1_START` and are skipped.
    pub fn lumps_between(&self, start: &str, end: &str) -> Result<Vec<LumpRef<'_>>, WadError> {
        let first = self
            .directory
            .iter()
            .position(|e| e.name == start)
            .ok_or_else(|| WadError::LumpNotFound(start.to_string()))?;
        let last = self
            .find_lump_after(end, first)
            .ok_or_else(|| WadError::LumpNotFound(end.to_string()))?;
        Ok((first + 1..last)
            .filter_map(|index| {
                let entry = &self.directory[index];
                let data = self.lump(index)?;
                (!data.is_empty()).then_some(LumpRef {
                    index,
                    name: &entry.name,
                    data,
                })
            })
            .collect())
    }

    /// A lump that belongs to the map starting at marker `map`.
    pub fn map_lump(&self, map: &str, lump: MapLump) -> Result<&[u8], WadError> {
        let marker = self
            .find_lump(map)
            .ok_or_else(|| WadError::LumpNotFound(map.to_string()))?;
        let index = marker + lump.offset();
        match self.directory.get(index) {
            Some(entry) if entry.name == lump.name() => {
                self.lump(index).ok_or_else(|| WadError::BadLumpSize {
                    name: entry.name.clone(),
                    len: entry.size,
                })
            }
            _ => Err(WadError::LumpNotFound(format!("{map}/{}", lump.name()))),
        }
    }
}

/// Assembles a WAD image in memory.
#[derive(Debug, Default, Clone)]
pub struct WadBuilder {
    lumps: Vec<(String, Vec<u8>)>,
}

impl WadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lump. Names longer than 8 bytes are truncated.
    pub fn lump(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.lumps.push((name.to_string(), data.into()));
        self
    }

    /// Append a zero-length marker lump.
    pub fn marker(self, name: &str) -> Self {
        self.lump(name, Vec::new())
    }

    /// Serialize as a PWAD: header, lump data, then the directory.
    pub fn build(&self) -> Vec<u8> {
        let body: usize = self.lumps.iter().map(|(_, d)| d.len()).sum();
        let dir_offset = HEADER_SIZE + body;
        let mut out = Vec::with_capacity(dir_offset + self.lumps.len() * DIR_ENTRY_SIZE);
        out.extend_from_slice(b"PWAD");
        out.extend_from_slice(&(self.lumps.len() as i32).to_le_bytes());
        out.extend_from_slice(&(dir_offset as i32).to_le_bytes());
        for (_, data) in &self.lumps {
            out.extend_from_slice(data);
        }
        let mut pos = HEADER_SIZE;
        for (name, data) in &self.lumps {
            out.extend_from_slice(&(pos as i32).to_le_bytes());
            out.extend_from_slice(&(data.len() as i32).to_le_bytes());
            let mut raw = [0u8; 8];
            for (dst, src) in raw.iter_mut().zip(name.bytes()) {
                *dst = src;
            }
            out.extend_from_slice(&raw);
            pos += data.len();
        }
        out
    }

    pub fn into_wad(self) -> Result<WadFile, WadError> {
        WadFile::parse(self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_wad() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"IWAD");
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&12i32.to_le_bytes());
        data
    }

    #[test]
    fn parse_empty_wad() {
        let wad = WadFile::parse(empty_wad()).unwrap();
        assert!(wad.is_empty());
    }

    #[test]
    fn reject_too_small() {
        assert_eq!(
            WadFile::parse(vec![0; 4]).unwrap_err(),
            WadError::TooSmall { len: 4 }
        );
    }

    #[test]
    fn reject_bad_header() {
        let mut data = empty_wad();
        data[0] = b'X';
        assert_eq!(WadFile::parse(data).unwrap_err(), WadError::BadHeader);
    }

    #[test]
    fn reject_directory_past_end() {
        let mut data = empty_wad();
        data[4] = 3;
        assert!(matches!(
            WadFile::parse(data),
            Err(WadError::BadDirectory { lumps: 3, .. })
        ));
    }

    #[test]
    fn reject_lump_past_end() {
        let mut data = WadBuilder::new().lump("A", vec![1, 2, 3]).build();
        // size field of the only entry
        let size_at = data.len() - 12;
        data[size_at] = 200;
        assert!(matches!(
            WadFile::parse(data),
            Err(WadError::BadDirectory { .. })
        ));
    }

    #[test]
    fn lookup_by_name_and_index() {
        let wad = WadBuilder::new()
            .lump("TESTLUMP", vec![0xDE, 0xAD, 0xBE, 0xEF])
            .into_wad()
            .unwrap();
        assert_eq!(wad.directory[0].name, "TESTLUMP");
        assert_eq!(wad.lump(0), Some(&[0xDE, 0xAD, 0xBE, 0xEF][..]));
        assert_eq!(wad.find_lump("testlump"), Some(0));
        assert_eq!(wad.lump(5), None);
        assert_eq!(
            wad.lump_by_name("MISSING").unwrap_err(),
            WadError::LumpNotFound("MISSING".into())
        );
    }

    #[test]
    fn later_lumps_override_earlier() {
        let wad = WadBuilder::new()
            .lump("PLAYPAL", vec![1])
            .lump("PLAYPAL", vec![2])
            .into_wad()
            .unwrap();
        assert_eq!(wad.lump_by_name("PLAYPAL").unwrap(), &[2]);
    }

    #[test]
    fn lumps_between_skips_nested_markers() {
        let wad = WadBuilder::new()
            .lump("JUNK", vec![9])
            .marker("F_START")
            .marker("F1_START")
            .lump("FLOOR1", vec![1; 4])
            .lump("FLOOR2", vec![2; 4])
            .marker("F1_END")
            .marker("F_END")
            .lump("AFTER", vec![3])
            .into_wad()
            .unwrap();
        let lumps = wad.lumps_between("F_START", "F_END").unwrap();
        let names: Vec<_> = lumps.iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["FLOOR1", "FLOOR2"]);
        assert_eq!(lumps[1].data, &[2; 4]);
    }

    #[test]
    fn lumps_between_requires_both_markers() {
        let wad = WadBuilder::new().marker("S_START").into_wad().unwrap();
        assert_eq!(
            wad.lumps_between("S_START", "S_END").unwrap_err(),
            WadError::LumpNotFound("S_END".into())
        );
    }

    #[test]
    fn map_lump_checks_order() {
        let wad = WadBuilder::new()
            .marker("E1M1")
            .lump("THINGS", vec![0; 10])
            .lump("LINEDEFS", vec![0; 14])
            .into_wad()
            .unwrap();
        assert_eq!(wad.map_lump("E1M1", MapLump::Things).unwrap().len(), 10);
        assert_eq!(wad.map_lump("E1M1", MapLump::LineDefs).unwrap().len(), 14);
        assert!(wad.map_lump("E1M1", MapLump::Sectors).is_err());
        assert!(wad.map_lump("E1M2", MapLump::Things).is_err());
    }
}
