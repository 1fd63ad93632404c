//! Built-in shader sources and custom-snippet injection.
//!
//! Placeholders:
//! - `%VERTEX_DECLARATIONS%` / `%FRAGMENT_DECLARATIONS%`: top-level code
//!   (uniforms, varyings, helper functions)
//! - `%VERTEX_BODY%`: runs in `main` before the clip-space transform; the
//!   mutable local `position` holds the pixel position
//! - `%FRAGMENT_BODY%`: runs in `main` once `color` is computed, before it is
//!   written to `gl_FragColor`
//! - `%TEXTURE_NUM%` / `%GET_COLOR%` (sprite only): sampler array size and the
//!   branch chain that picks a sampler by the per-vertex texture id
//!
//! Sampler arrays cannot be indexed by a varying in GLSL ES 1.00, hence the
//! generated `if` chain.

const SPRITE_VERTEX: &str = "\
precision highp float;
attribute vec2 aPosition;
attribute vec2 aTexCoord;
attribute float aTextureId;
attribute vec4 aColor;
uniform vec2 uResolution;
varying vec2 vTexCoord;
varying float vTextureId;
varying vec4 vColor;
%VERTEX_DECLARATIONS%
void main() {
    vec2 position = aPosition;
    vTexCoord = aTexCoord;
    vTextureId = aTextureId;
    vColor = aColor;
%VERTEX_BODY%
    vec2 clip = position / uResolution * 2.0 - 1.0;
    gl_Position = vec4(clip.x, -clip.y, 0.0, 1.0);
}
";

const SPRITE_FRAGMENT: &str = "\
precision mediump float;
uniform sampler2D uTextures[%TEXTURE_NUM%];
varying vec2 vTexCoord;
varying float vTextureId;
varying vec4 vColor;
%FRAGMENT_DECLARATIONS%
vec4 getColor(vec2 uv) {
%GET_COLOR%
}
void main() {
    vec4 color = getColor(vTexCoord) * vColor;
%FRAGMENT_BODY%
    gl_FragColor = color;
}
";

const GRAPHIC_VERTEX: &str = "\
precision highp float;
attribute vec2 aPosition;
attribute vec4 aColor;
uniform vec2 uResolution;
varying vec4 vColor;
%VERTEX_DECLARATIONS%
void main() {
    vec2 position = aPosition;
    vColor = aColor;
%VERTEX_BODY%
    vec2 clip = position / uResolution * 2.0 - 1.0;
    gl_Position = vec4(clip.x, -clip.y, 0.0, 1.0);
}
";

const GRAPHIC_FRAGMENT: &str = "\
precision mediump float;
varying vec4 vColor;
%FRAGMENT_DECLARATIONS%
void main() {
    vec4 color = vColor;
%FRAGMENT_BODY%
    gl_FragColor = color;
}
";

/// User code for one shader stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSnippet {
    pub declarations: String,
    pub body: String,
}

impl ShaderSnippet {
    pub fn new(declarations: impl Into<String>, body: impl Into<String>) -> Self {
        Self { declarations: declarations.into(), body: body.into() }
    }
}

/// A bare string is a body with no declarations.
impl From<&str> for ShaderSnippet {
    fn from(body: &str) -> Self {
        Self { declarations: String::new(), body: body.to_owned() }
    }
}

/// Complete vertex + fragment source pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

/// Sprite shader sampling `texture_units` textures (at least one).
pub fn sprite_source(texture_units: u32, vertex: &ShaderSnippet, fragment: &ShaderSnippet) -> ShaderSource {
    let units = texture_units.max(1);
    let vertex_src = inject(SPRITE_VERTEX, vertex, Stage::Vertex);
    let fragment_src = inject(SPRITE_FRAGMENT, fragment, Stage::Fragment)
        .replace("%TEXTURE_NUM%", &units.to_string())
        .replace("%GET_COLOR%", &get_color_chain(units));
    ShaderSource { vertex: vertex_src, fragment: fragment_src }
}

/// Untextured per-vertex-color shader.
pub fn graphic_source(vertex: &ShaderSnippet, fragment: &ShaderSnippet) -> ShaderSource {
    ShaderSource {
        vertex: inject(GRAPHIC_VERTEX, vertex, Stage::Vertex),
        fragment: inject(GRAPHIC_FRAGMENT, fragment, Stage::Fragment),
    }
}

/// Branch chain returning `texture2D(uTextures[k], uv)` for `vTextureId ≈ k`.
pub fn get_color_chain(texture_units: u32) -> String {
    let last = texture_units.max(1) - 1;
    let mut out = String::new();
    for k in 0..last {
        let keyword = if k == 0 { "if" } else { "else if" };
        out.push_str(&format!(
            "    {keyword} (vTextureId < {k}.5) {{ return texture2D(uTextures[{k}], uv); }}\n"
        ));
    }
    out.push_str(&format!("    return texture2D(uTextures[{last}], uv);"));
    out
}

#[derive(Copy, Clone)]
enum Stage {
    Vertex,
    Fragment,
}

fn inject(template: &str, snippet: &ShaderSnippet, stage: Stage) -> String {
    let (decl, body) = match stage {
        Stage::Vertex => ("%VERTEX_DECLARATIONS%", "%VERTEX_BODY%"),
        Stage::Fragment => ("%FRAGMENT_DECLARATIONS%", "%FRAGMENT_BODY%"),
    };
    template
        .replace(decl, &snippet.declarations)
        .replace(body, &snippet.body)
}
