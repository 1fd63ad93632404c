use core::ops::{Add, Mul, Sub};

/// 8-bit RGBA color with a cached packed representation.
///
/// Invariant:
/// - `packed == a << 24 | b << 16 | g << 8 | r`, i.e. the little-endian byte
///   order `[r, g, b, a]` that vertex buffers read as a normalized `u8x4`.
///
/// Channels are private so every mutation goes through a setter that keeps the
/// packed value in sync.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
    packed: u32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a, packed: pack(r, g, b, a) }
    }

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Creates a color from `[0, 1]` float channels (clamped, rounded).
    #[inline]
    pub fn from_f32(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::rgba(unit_to_u8(r), unit_to_u8(g), unit_to_u8(b), unit_to_u8(a))
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            3 => {
                let nib = |i: usize| {
                    let v = u8::from_str_radix(digits.get(i..i + 1)?, 16).ok()?;
                    Some(v * 17)
                };
                Some(Self::rgb(nib(0)?, nib(1)?, nib(2)?))
            }
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Unpacks a value produced by [`Color::packed`].
    #[inline]
    pub const fn from_packed(packed: u32) -> Self {
        Self::rgba(
            (packed & 0xff) as u8,
            ((packed >> 8) & 0xff) as u8,
            ((packed >> 16) & 0xff) as u8,
            (packed >> 24) as u8,
        )
    }

    #[inline]
    pub const fn r(self) -> u8 {
        self.r
    }

    #[inline]
    pub const fn g(self) -> u8 {
        self.g
    }

    #[inline]
    pub const fn b(self) -> u8 {
        self.b
    }

    #[inline]
    pub const fn a(self) -> u8 {
        self.a
    }

    #[inline]
    pub const fn packed(self) -> u32 {
        self.packed
    }

    #[inline]
    pub fn set_r(&mut self, r: u8) {
        self.r = r;
        self.repack();
    }

    #[inline]
    pub fn set_g(&mut self, g: u8) {
        self.g = g;
        self.repack();
    }

    #[inline]
    pub fn set_b(&mut self, b: u8) {
        self.b = b;
        self.repack();
    }

    #[inline]
    pub fn set_a(&mut self, a: u8) {
        self.a = a;
        self.repack();
    }

    #[inline]
    pub fn with_alpha(mut self, a: u8) -> Self {
        self.set_a(a);
        self
    }

    /// Linear interpolation per channel, `t` clamped to `[0, 1]`.
    pub fn lerp(self, to: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
        Color::rgba(mix(self.r, to.r), mix(self.g, to.g), mix(self.b, to.b), mix(self.a, to.a))
    }

    #[inline]
    fn repack(&mut self) {
        self.packed = pack(self.r, self.g, self.b, self.a);
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

#[inline]
const fn pack(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (a as u32) << 24 | (b as u32) << 16 | (g as u32) << 8 | r as u32
}

#[inline]
fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Saturating per-channel sum.
impl Add for Color {
    type Output = Color;
    fn add(self, rhs: Color) -> Color {
        Color::rgba(
            self.r.saturating_add(rhs.r),
            self.g.saturating_add(rhs.g),
            self.b.saturating_add(rhs.b),
            self.a.saturating_add(rhs.a),
        )
    }
}

/// Saturating per-channel difference.
impl Sub for Color {
    type Output = Color;
    fn sub(self, rhs: Color) -> Color {
        Color::rgba(
            self.r.saturating_sub(rhs.r),
            self.g.saturating_sub(rhs.g),
            self.b.saturating_sub(rhs.b),
            self.a.saturating_sub(rhs.a),
        )
    }
}

/// Modulation (tint): channels multiplied as normalized values.
impl Mul for Color {
    type Output = Color;
    fn mul(self, rhs: Color) -> Color {
        let m = |x: u8, y: u8| ((x as u16 * y as u16 + 127) / 255) as u8;
        Color::rgba(m(self.r, rhs.r), m(self.g, rhs.g), m(self.b, rhs.b), m(self.a, rhs.a))
    }
}
