use thiserror::Error;

use crate::coords::Vec2;

use super::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("transform stack underflow: pop without a matching push")]
    Underflow,
}

/// Copy-on-push stack of [`Transform`]s.
///
/// The base entry is never popped; `push` duplicates the top so children
/// inherit the parent transform and mutate their own copy. All mutating
/// operations act on the top in place.
///
/// Capacity is retained across [`reset`](Self::reset), so frames with a
/// stable nesting depth do not allocate.
#[derive(Debug, Clone)]
pub struct TransformStack {
    stack: Vec<Transform>,
}

impl TransformStack {
    pub fn new() -> Self {
        let mut stack = Vec::with_capacity(16);
        stack.push(Transform::IDENTITY);
        Self { stack }
    }

    /// Number of entries, including the base.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn top(&self) -> &Transform {
        // base entry always present
        &self.stack[self.stack.len() - 1]
    }

    #[inline]
    pub fn top_mut(&mut self) -> &mut Transform {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Drops every pushed entry and resets the base to identity.
    pub fn reset(&mut self) {
        self.stack.truncate(1);
        self.stack[0] = Transform::IDENTITY;
    }

    #[inline]
    pub fn push(&mut self) {
        let top = *self.top();
        self.stack.push(top);
    }

    pub fn pop(&mut self) -> Result<(), TransformError> {
        if self.stack.len() <= 1 {
            return Err(TransformError::Underflow);
        }
        self.stack.pop();
        Ok(())
    }

    #[inline]
    pub fn translate(&mut self, x: f32, y: f32) {
        self.top_mut().translate(x, y);
    }

    #[inline]
    pub fn rotate(&mut self, angle: f32) {
        self.top_mut().rotate(angle);
    }

    #[inline]
    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.top_mut().scale(sx, sy);
    }

    /// Right-multiplies the top by `m`.
    #[inline]
    pub fn multiply(&mut self, m: &Transform) {
        let top = self.top().multiply(m);
        *self.top_mut() = top;
    }

    #[inline]
    pub fn apply(&self, p: Vec2) -> Vec2 {
        self.top().apply(p)
    }

    #[inline]
    pub fn inverse(&self) -> Transform {
        self.top().inverse()
    }

    #[inline]
    pub fn global_position(&self) -> Vec2 {
        self.top().position()
    }

    #[inline]
    pub fn global_rotation(&self) -> f32 {
        self.top().rotation()
    }

    #[inline]
    pub fn global_scale(&self) -> Vec2 {
        self.top().scale_factors()
    }

    #[inline]
    pub fn set_global_position(&mut self, p: Vec2) {
        self.top_mut().set_position(p);
    }

    #[inline]
    pub fn set_global_rotation(&mut self, angle: f32) {
        self.top_mut().set_rotation(angle);
    }

    #[inline]
    pub fn set_global_scale(&mut self, scale: Vec2) {
        self.top_mut().set_scale(scale);
    }
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_translate_pop_restores_exactly() {
        let mut s = TransformStack::new();
        s.translate(3.0, 4.0);
        s.rotate(0.25);
        let before = *s.top();

        s.push();
        s.translate(10.0, -2.0);
        s.scale(2.0, 2.0);
        s.pop().unwrap();

        assert_eq!(*s.top(), before);
    }

    #[test]
    fn children_inherit_parent() {
        let mut s = TransformStack::new();
        s.translate(10.0, 0.0);
        s.push();
        s.translate(0.0, 5.0);
        assert_eq!(s.apply(Vec2::zero()), Vec2::new(10.0, 5.0));
        assert_eq!(s.depth(), 2);
    }

    #[test]
    fn pop_at_base_is_an_error() {
        let mut s = TransformStack::new();
        assert_eq!(s.pop(), Err(TransformError::Underflow));
        s.push();
        assert!(s.pop().is_ok());
        assert!(s.pop().is_err());
        assert_eq!(s.depth(), 1);
    }

    #[test]
    fn reset_returns_to_identity() {
        let mut s = TransformStack::new();
        s.translate(1.0, 1.0);
        s.push();
        s.push();
        s.reset();
        assert_eq!(s.depth(), 1);
        assert_eq!(*s.top(), Transform::IDENTITY);
    }

    #[test]
    fn global_setters_keep_position() {
        let mut s = TransformStack::new();
        s.translate(7.0, 8.0);
        s.rotate(1.2);
        s.set_global_rotation(0.0);
        assert!(s.global_rotation().abs() < 1e-6);
        assert_eq!(s.global_position(), Vec2::new(7.0, 8.0));
        assert!((s.global_scale() - Vec2::new(1.0, 1.0)).length() < 1e-5);
    }
}
