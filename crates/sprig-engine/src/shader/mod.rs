//! Shader programs, uniform values and the built-in templates.
//!
//! Programs resolve attribute and uniform locations by scanning their own
//! sources, so the renderer can address any uniform a custom snippet declares
//! without extra registration.

mod program;
pub mod template;
mod uniform;

use std::rc::Rc;

pub use program::{parse_declarations, Declaration, ShaderError, ShaderProgram};
pub use template::{ShaderSnippet, ShaderSource};
pub use uniform::{UniformBag, UniformValue};

/// Primitive family a shader is built for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderKind {
    /// Textured quads batched through the sprite region.
    Sprite,
    /// Untextured shapes drawn through the graphic region.
    Graphic,
}

/// Program built from a template plus user snippets.
///
/// Cheap to clone; two handles are the same shader when they share the
/// program.
#[derive(Debug, Clone)]
pub struct CustomShader {
    kind: ShaderKind,
    program: Rc<ShaderProgram>,
}

impl CustomShader {
    pub(crate) fn new(kind: ShaderKind, program: ShaderProgram) -> Self {
        Self { kind, program: Rc::new(program) }
    }

    #[inline]
    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    #[inline]
    pub fn program(&self) -> &Rc<ShaderProgram> {
        &self.program
    }

    /// The program, if this is the last handle to it.
    pub(crate) fn into_program(self) -> Option<ShaderProgram> {
        Rc::try_unwrap(self.program).ok()
    }
}

impl PartialEq for CustomShader {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.program, &other.program)
    }
}
