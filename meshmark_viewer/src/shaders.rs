//! WGSL sources for the viewer's pipelines. Everything draws in mesh-local
//! space through a single premultiplied clip-from-local matrix, so the same
//! shaders serve the main, helper, and PIP passes.

/// Lambert-shaded mesh surface.
pub const MESH_SHADER_SOURCE: &str = r#"
struct PassUniforms {
    clip_from_local: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> pass_uniforms: PassUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    output.clip_position = pass_uniforms.clip_from_local * vec4<f32>(input.position, 1.0);
    output.normal = input.normal;
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let light_direction = normalize(vec3<f32>(0.4, 0.8, 0.6));
    let normal = normalize(input.normal);
    let diffuse = max(dot(normal, light_direction), 0.0);
    let base = vec3<f32>(0.72, 0.70, 0.66);
    let shaded = base * (0.25 + 0.75 * diffuse);
    return vec4<f32>(shaded, 1.0);
}
"#;

/// Solid-color connectivity lines for the helper passes.
pub const LINE_SHADER_SOURCE: &str = r#"
struct PassUniforms {
    clip_from_local: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> pass_uniforms: PassUniforms;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return pass_uniforms.clip_from_local * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.35, 0.82, 0.55, 1.0);
}
"#;

/// Instanced landmark markers: each instance projects its local-space
/// centre, then the quad corners are offset in clip space so markers keep a
/// constant on-screen size. The fragment stage rounds the quad into a dot.
pub const MARKER_SHADER_SOURCE: &str = r#"
struct PassUniforms {
    clip_from_local: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> pass_uniforms: PassUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) corner: vec2<f32>,
    @location(1) color: vec3<f32>,
};

@vertex
fn vs_main(
    @location(0) corner: vec2<f32>,
    @location(1) centre: vec3<f32>,
    @location(2) size: f32,
    @location(3) color: vec3<f32>,
) -> VertexOutput {
    var output: VertexOutput;
    var clip = pass_uniforms.clip_from_local * vec4<f32>(centre, 1.0);
    clip.x = clip.x + corner.x * size * clip.w;
    clip.y = clip.y + corner.y * size * clip.w;
    output.clip_position = clip;
    output.corner = corner;
    output.color = color;
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    if (dot(input.corner, input.corner) > 0.25) {
        discard;
    }
    return vec4<f32>(input.color, 1.0);
}
"#;

/// Fullscreen-triangle blit of the 2D overlay texture, alpha blended over
/// the finished 3D frame.
pub const OVERLAY_SHADER_SOURCE: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    var output: VertexOutput;
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    output.clip_position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    output.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return output;
}

@group(0) @binding(0)
var overlay_texture: texture_2d<f32>;
@group(0) @binding(1)
var overlay_sampler: sampler;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(overlay_texture, overlay_sampler, input.uv);
}
"#;
