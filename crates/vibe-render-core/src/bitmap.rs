use std::fmt;

/// Pixel storage formats a port can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelKind {
    /// Palette indices, one `u16` per pixel.
    Indexed,
    /// Direct color, one `u32` per pixel in 0x00RRGGBB order.
    Rgb,
}

impl fmt::Display for PixelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelKind::Indexed => f.write_str("indexed"),
            PixelKind::Rgb => f.write_str("rgb"),
        }
    }
}

/// A pixel type that can back a [`Buffer`].
pub trait Pixel: Copy + Default + PartialEq + fmt::Debug + 'static {
    const KIND: PixelKind;

    /// Converts a constant binding value, or `None` if it does not fit.
    fn from_constant(value: u32) -> Option<Self>;

    fn bitmap(buffer: &Buffer) -> Option<&Bitmap<Self>>;
    fn bitmap_mut(buffer: &mut Buffer) -> Option<&mut Bitmap<Self>>;
}

impl Pixel for u16 {
    const KIND: PixelKind = PixelKind::Indexed;

    fn from_constant(value: u32) -> Option<Self> {
        u16::try_from(value).ok()
    }

    fn bitmap(buffer: &Buffer) -> Option<&Bitmap<Self>> {
        buffer.as_indexed()
    }

    fn bitmap_mut(buffer: &mut Buffer) -> Option<&mut Bitmap<Self>> {
        buffer.as_indexed_mut()
    }
}

impl Pixel for u32 {
    const KIND: PixelKind = PixelKind::Rgb;

    fn from_constant(value: u32) -> Option<Self> {
        Some(value & 0x00FF_FFFF)
    }

    fn bitmap(buffer: &Buffer) -> Option<&Bitmap<Self>> {
        buffer.as_rgb()
    }

    fn bitmap_mut(buffer: &mut Buffer) -> Option<&mut Bitmap<Self>> {
        buffer.as_rgb_mut()
    }
}

/// Half-open clip rectangle: columns `left..right`, rows `top..bottom`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rect {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            right: left.saturating_add(width),
            bottom: top.saturating_add(height),
        }
    }

    /// Rectangle covering a whole `width` x `height` frame.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.left..self.right).contains(&x) && (self.top..self.bottom).contains(&y)
    }

    /// Overlap of two rectangles. Disjoint rectangles yield `Rect::default()`,
    /// so iterating the rows or columns of the result never leaves either one.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);
        if left >= right || top >= bottom {
            return Rect::default();
        }
        Rect {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// Row-major pixel storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bitmap<P> {
    width: u32,
    height: u32,
    pixels: Vec<P>,
}

impl<P: Pixel> Bitmap<P> {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![P::default(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::full(self.width, self.height)
    }

    /// Reallocates to the new size. Previous contents are discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels
            .resize(width as usize * height as usize, P::default());
    }

    pub fn fill(&mut self, value: P) {
        self.pixels.fill(value);
    }

    /// Fills the part of `rect` that lies inside the bitmap.
    pub fn fill_rect(&mut self, rect: &Rect, value: P) {
        let rect = rect.intersect(&self.bounds());
        if rect.is_empty() {
            return;
        }
        for y in rect.top..rect.bottom {
            self.row_mut(y)[rect.left as usize..rect.right as usize].fill(value);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> P {
        self.pixels[self.offset(x, y)]
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut P {
        let offset = self.offset(x, y);
        &mut self.pixels[offset]
    }

    pub fn row(&self, y: u32) -> &[P] {
        let start = self.offset(0, y);
        &self.pixels[start..start + self.width as usize]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [P] {
        let start = self.offset(0, y);
        let width = self.width as usize;
        &mut self.pixels[start..start + width]
    }

    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    /// Copies `rect` from `src` into the same position of `self`, clipped to
    /// both bitmaps.
    pub fn copy_rect_from(&mut self, src: &Bitmap<P>, rect: &Rect) {
        let rect = rect.intersect(&self.bounds()).intersect(&src.bounds());
        if rect.is_empty() {
            return;
        }
        let (left, right) = (rect.left as usize, rect.right as usize);
        for y in rect.top..rect.bottom {
            self.row_mut(y)[left..right].copy_from_slice(&src.row(y)[left..right]);
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        y as usize * self.width as usize + x as usize
    }
}

/// Storage backing one produced output, or one constant-bound input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Buffer {
    Indexed(Bitmap<u16>),
    Rgb(Bitmap<u32>),
}

impl Buffer {
    /// Zero-sized buffer of the given kind.
    pub fn empty(kind: PixelKind) -> Self {
        match kind {
            PixelKind::Indexed => Buffer::Indexed(Bitmap::default()),
            PixelKind::Rgb => Buffer::Rgb(Bitmap::default()),
        }
    }

    pub fn kind(&self) -> PixelKind {
        match self {
            Buffer::Indexed(_) => PixelKind::Indexed,
            Buffer::Rgb(_) => PixelKind::Rgb,
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Buffer::Indexed(b) => b.width(),
            Buffer::Rgb(b) => b.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Buffer::Indexed(b) => b.height(),
            Buffer::Rgb(b) => b.height(),
        }
    }

    pub fn as_indexed(&self) -> Option<&Bitmap<u16>> {
        match self {
            Buffer::Indexed(b) => Some(b),
            Buffer::Rgb(_) => None,
        }
    }

    pub fn as_indexed_mut(&mut self) -> Option<&mut Bitmap<u16>> {
        match self {
            Buffer::Indexed(b) => Some(b),
            Buffer::Rgb(_) => None,
        }
    }

    pub fn as_rgb(&self) -> Option<&Bitmap<u32>> {
        match self {
            Buffer::Rgb(b) => Some(b),
            Buffer::Indexed(_) => None,
        }
    }

    pub fn as_rgb_mut(&mut self) -> Option<&mut Bitmap<u32>> {
        match self {
            Buffer::Rgb(b) => Some(b),
            Buffer::Indexed(_) => None,
        }
    }

    /// Resizes and fills every pixel with `fill`, already validated for this
    /// buffer's kind. Indexed buffers keep the low 16 bits.
    pub fn resize_and_fill(&mut self, width: u32, height: u32, fill: u32) {
        match self {
            Buffer::Indexed(b) => {
                b.resize(width, height);
                b.fill(fill as u16);
            }
            Buffer::Rgb(b) => {
                b.resize(width, height);
                b.fill(fill & 0x00FF_FFFF);
            }
        }
    }
}
