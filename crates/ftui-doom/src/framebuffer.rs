//! RGBA framebuffer for the Doom renderer.
//!
//! Every drawing routine writes through [`PixelSink`], the handle the host
//! terminal layer hands to the engine. [`DoomFramebuffer`] is the in-crate
//! implementation; a host can blit its `pixels` to any surface.

/// Packed `0xRRGGBBAA` colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba(pub u32);

impl Rgba {
    pub const TRANSPARENT: Self = Self(0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 255, 0);

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | a as u32)
    }

    /// Opaque colour.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn a(self) -> u8 {
        self.0 as u8
    }
}

/// Host framebuffer handle: a bounded grid of pixels.
pub trait PixelSink {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Write a pixel the caller has already bounds-checked.
    fn put_pixel(&mut self, x: u32, y: u32, color: Rgba);

    /// Write a pixel, ignoring out-of-bounds coordinates.
    #[inline]
    fn set_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        if x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height() {
            self.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// RGBA framebuffer for intermediate rendering.
#[derive(Debug, Clone)]
pub struct DoomFramebuffer {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA pixels.
    pub pixels: Vec<Rgba>,
}

impl DoomFramebuffer {
    /// Create a new framebuffer with the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width * height) as usize;
        Self {
            width,
            height,
            pixels: vec![Rgba::BLACK; size],
        }
    }

    /// Clear the framebuffer to black.
    pub fn clear(&mut self) {
        self.pixels.fill(Rgba::BLACK);
    }

    /// Get a pixel at (x, y), black when out of bounds.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize]
        } else {
            Rgba::BLACK
        }
    }

    /// Fill rows `y_top..y_bottom` of column `x` with one colour.
    #[inline]
    pub fn draw_column(&mut self, x: u32, y_top: u32, y_bottom: u32, color: Rgba) {
        if x >= self.width {
            return;
        }
        let top = y_top.min(self.height);
        let bottom = y_bottom.min(self.height);
        for y in top..bottom {
            self.pixels[(y * self.width + x) as usize] = color;
        }
    }

    /// Fill an axis-aligned rectangle, clipped to the buffer.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba) {
        let x0 = x.max(0) as u32;
        let x1 = (x.saturating_add(w)).clamp(0, self.width as i32) as u32;
        for col in x0..x1 {
            self.draw_column(col, y.max(0) as u32, y.saturating_add(h).max(0) as u32, color);
        }
    }

    /// Resize the framebuffer, clearing contents.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize((width * height) as usize, Rgba::BLACK);
    }
}

impl PixelSink for DoomFramebuffer {
    #[inline]
    fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn put_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        self.pixels[(y * self.width + x) as usize] = color;
    }
}
