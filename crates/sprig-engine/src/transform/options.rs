use std::fmt;
use std::rc::Rc;

use crate::coords::Vec2;

use super::{TransformError, TransformStack};

/// Callback run against the stack around a primitive's own transform.
pub type TransformHook = Rc<dyn Fn(&mut TransformStack)>;

/// Anchor point of a primitive, subtracted from its vertex offset.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Origin {
    /// Fraction of the primitive's size: `(0.5, 0.5)` centers it.
    Fraction(Vec2),
    /// Absolute offset in local pixels.
    Point(Vec2),
}

impl Origin {
    pub const CENTER: Origin = Origin::Fraction(Vec2::new(0.5, 0.5));

    #[inline]
    pub fn resolve(self, size: Vec2) -> Vec2 {
        match self {
            Origin::Fraction(f) => f.mul_elem(size),
            Origin::Point(p) => p,
        }
    }
}

/// Placement of one primitive.
///
/// Applied in order: push (unless `skip_push`), `before` hook, translate to
/// `position`, rotate, scale (flips negate the scale), then the returned vertex
/// offset is `offset - origin`.
#[derive(Clone)]
pub struct TransformOptions {
    pub position: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
    pub flip_x: bool,
    pub flip_y: bool,
    pub offset: Vec2,
    pub origin: Option<Origin>,
    /// Draw into the current top instead of a pushed copy.
    pub skip_push: bool,
    /// Leave the pushed entry on the stack for following siblings.
    pub skip_pop: bool,
    pub before: Option<TransformHook>,
    pub after: Option<TransformHook>,
}

impl TransformOptions {
    pub fn at(x: f32, y: f32) -> Self {
        Self { position: Vec2::new(x, y), ..Self::default() }
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, sx: f32, sy: f32) -> Self {
        self.scale = Vec2::new(sx, sy);
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_offset(mut self, x: f32, y: f32) -> Self {
        self.offset = Vec2::new(x, y);
        self
    }

    pub fn flipped(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = flip_x;
        self.flip_y = flip_y;
        self
    }

    pub fn before(mut self, hook: impl Fn(&mut TransformStack) + 'static) -> Self {
        self.before = Some(Rc::new(hook));
        self
    }

    pub fn after(mut self, hook: impl Fn(&mut TransformStack) + 'static) -> Self {
        self.after = Some(Rc::new(hook));
        self
    }
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            position: Vec2::zero(),
            rotation: 0.0,
            scale: Vec2::splat(1.0),
            flip_x: false,
            flip_y: false,
            offset: Vec2::zero(),
            origin: None,
            skip_push: false,
            skip_pop: false,
            before: None,
            after: None,
        }
    }
}

impl fmt::Debug for TransformOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformOptions")
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .field("scale", &self.scale)
            .field("flip_x", &self.flip_x)
            .field("flip_y", &self.flip_y)
            .field("offset", &self.offset)
            .field("origin", &self.origin)
            .field("skip_push", &self.skip_push)
            .field("skip_pop", &self.skip_pop)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

/// Applies `options` to the stack and returns the local offset for the
/// primitive's vertices, whose unrotated box is `[0, size]`.
///
/// Must be paired with [`apply_transform_after`].
pub fn apply_transform(stack: &mut TransformStack, options: &TransformOptions, size: Vec2) -> Vec2 {
    if !options.skip_push {
        stack.push();
    }
    if let Some(hook) = &options.before {
        hook(stack);
    }

    let p = options.position;
    if p != Vec2::zero() {
        stack.translate(p.x, p.y);
    }
    stack.rotate(options.rotation);

    let sx = if options.flip_x { -options.scale.x } else { options.scale.x };
    let sy = if options.flip_y { -options.scale.y } else { options.scale.y };
    if sx != 1.0 || sy != 1.0 {
        stack.scale(sx, sy);
    }

    let origin = options.origin.map_or(Vec2::zero(), |o| o.resolve(size));
    options.offset - origin
}

/// Runs the `after` hook and pops the entry pushed by [`apply_transform`].
pub fn apply_transform_after(
    stack: &mut TransformStack,
    options: &TransformOptions,
) -> Result<(), TransformError> {
    if let Some(hook) = &options.after {
        hook(stack);
    }
    if !options.skip_pop {
        stack.pop()?;
    }
    Ok(())
}
