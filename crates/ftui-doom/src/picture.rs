//! Column/post picture format used by patches and sprites.
//!
//! Layout (little-endian): `width:u16 height:u16 left:i16 top:i16`, then
//! `width` u32 column offsets from the start of the lump. Each column is a
//! run of posts `top_delta:u8 length:u8 pad:u8 pixels[length] pad:u8`
//! terminated by `top_delta == 0xFF`. A `top_delta` not greater than the
//! previous post's top is relative to it, which lets tall patches address
//! rows past 254.

use crate::error::AssetError;
use crate::wad_types::le;

/// Largest accepted width or height.
pub const MAX_PICTURE_DIM: u16 = 4096;
/// Marks an empty pixel in [`render_picture_to_flat`] output.
pub const TRANSPARENT: u8 = 0xFF;

const HEADER_LEN: usize = 8;
const END_OF_COLUMN: u8 = 0xFF;

/// A vertical run of opaque pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// First row, absolute.
    pub top_delta: usize,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub width: usize,
    pub height: usize,
    pub left_offset: i16,
    pub top_offset: i16,
    pub columns: Vec<Vec<Post>>,
}

impl Picture {
    /// Palette index at `(x, y)`, `None` when transparent or outside.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        self.columns.get(x)?.iter().find_map(|post| {
            y.checked_sub(post.top_delta)
                .and_then(|i| post.pixels.get(i).copied())
        })
    }

    /// Encode back into lump bytes. Fails (`None`) for posts longer than
    /// 255 pixels or tops that cannot be reached with absolute or relative
    /// deltas.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        let width = u16::try_from(self.width).ok()?;
        let height = u16::try_from(self.height).ok()?;
        let mut out = Vec::new();
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&self.left_offset.to_le_bytes());
        out.extend_from_slice(&self.top_offset.to_le_bytes());
        let table_at = out.len();
        out.resize(table_at + 4 * self.width, 0);

        for (x, column) in self.columns.iter().enumerate() {
            let offset = u32::try_from(out.len()).ok()?;
            out[table_at + 4 * x..table_at + 4 * x + 4].copy_from_slice(&offset.to_le_bytes());
            let mut prev_top: Option<usize> = None;
            for post in column {
                let raw = match prev_top {
                    Some(prev) if post.top_delta >= END_OF_COLUMN as usize => {
                        let rel = post.top_delta.checked_sub(prev)?;
                        (rel <= prev && rel < END_OF_COLUMN as usize).then_some(rel)?
                    }
                    Some(prev) if post.top_delta <= prev => return None,
                    _ if post.top_delta >= END_OF_COLUMN as usize => return None,
                    _ => post.top_delta,
                };
                let len = u8::try_from(post.pixels.len()).ok()?;
                out.push(raw as u8);
                out.push(len);
                out.push(0);
                out.extend_from_slice(&post.pixels);
                out.push(0);
                prev_top = Some(post.top_delta);
            }
            out.push(END_OF_COLUMN);
        }
        Some(out)
    }
}

/// Decode a picture lump.
pub fn parse_picture(bytes: &[u8]) -> Result<Picture, AssetError> {
    if bytes.len() < HEADER_LEN {
        return Err(AssetError::PictureHeader { len: bytes.len() });
    }
    let width = le::u16_at(bytes, 0);
    let height = le::u16_at(bytes, 2);
    if width == 0 || height == 0 || width > MAX_PICTURE_DIM || height > MAX_PICTURE_DIM {
        return Err(AssetError::PictureDimensions { width, height });
    }

    let columns = (0..usize::from(width))
        .map(|x| {
            let offset = le::i32_at(bytes, HEADER_LEN + 4 * x)
                .map(|o| o as u32 as usize)
                .ok_or(AssetError::PictureColumn { column: x })?;
            parse_column(bytes, offset).ok_or(AssetError::PictureColumn { column: x })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Picture {
        width: usize::from(width),
        height: usize::from(height),
        left_offset: le::i16_at(bytes, 4),
        top_offset: le::i16_at(bytes, 6),
        columns,
    })
}

fn parse_column(bytes: &[u8], mut pos: usize) -> Option<Vec<Post>> {
    let mut posts = Vec::new();
    let mut prev_top: Option<usize> = None;
    loop {
        let raw = *bytes.get(pos)?;
        if raw == END_OF_COLUMN {
            return Some(posts);
        }
        let raw = usize::from(raw);
        let top = match prev_top {
            Some(prev) if raw <= prev => prev + raw,
            _ => raw,
        };
        let len = usize::from(*bytes.get(pos + 1)?);
        let start = pos + 3;
        let pixels = bytes.get(start..start + len)?.to_vec();
        posts.push(Post {
            top_delta: top,
            pixels,
        });
        prev_top = Some(top);
        pos = start + len + 1;
    }
}

/// Expand into a row-major `width * height` buffer with [`TRANSPARENT`]
/// where no post covers a pixel. Post pixels past the bottom are dropped.
pub fn render_picture_to_flat(picture: &Picture) -> Vec<u8> {
    let (w, h) = (picture.width, picture.height);
    let mut out = vec![TRANSPARENT; w * h];
    for (x, column) in picture.columns.iter().enumerate().take(w) {
        for post in column {
            for (i, &pixel) in post.pixels.iter().enumerate() {
                let y = post.top_delta + i;
                if y >= h {
                    break;
                }
                out[y * w + x] = pixel;
            }
        }
    }
    out
}
