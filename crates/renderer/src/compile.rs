use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    compile_glsl(
        device,
        "fullscreen triangle vertex",
        VERTEX_SHADER_GLSL,
        ShaderStage::Vertex,
    )
}

/// Compiles the liquid chrome field.
pub(crate) fn compile_chrome_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    compile_glsl(
        device,
        "liquid chrome fragment",
        CHROME_FRAGMENT_GLSL,
        ShaderStage::Fragment,
    )
}

/// Compiles the story overlay (backdrop, letter-boxed image, progress bar).
pub(crate) fn compile_overlay_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    compile_glsl(
        device,
        "story overlay fragment",
        OVERLAY_FRAGMENT_GLSL,
        ShaderStage::Fragment,
    )
}

fn compile_glsl(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    stage: ShaderStage,
) -> wgpu::ShaderModule {
    tracing::debug!(label, "compiling shader");
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    })
}

/// Minimal full-screen triangle vertex shader. `v_uv` has a bottom-left origin.
pub(crate) const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Procedural chrome field, supersampled on a 3x3 grid.
///
/// The uniform block layout must match `ChromeUniforms` in `gpu/uniforms.rs`.
/// `field.rs` evaluates the same function on the CPU.
pub(crate) const CHROME_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform ChromeBlock {
    vec4 resolution;      // xy: device pixels, z: aspect
    vec4 base_color;
    vec4 highlight_color;
    vec4 wave;            // x: amplitude, y: frequency x, z: frequency y, w: time
    vec4 pointer;         // xy: normalised pointer, z: 1 when interactive
} ubo;

float hash21(vec2 p) {
    p = fract(p * vec2(127.1, 311.7));
    p = p + dot(p, p + 34.5);
    return fract(p.x * p.y);
}

vec3 render_image(vec2 uv_coord) {
    vec2 res = ubo.resolution.xy;
    float time = ubo.wave.w;
    vec2 mouse = ubo.pointer.xy;
    vec2 frag_coord = uv_coord * res;
    vec2 uv = (2.0 * frag_coord - res) / min(res.x, res.y);

    for (int i = 1; i < 10; i++) {
        float fi = float(i);
        float amp = ubo.wave.x / (fi * 0.8);
        uv.x += amp * cos(fi * ubo.wave.y * uv.y + time * 0.9 + mouse.x * 3.14159);
        uv.y += amp * cos(fi * ubo.wave.z * uv.x + time * 0.9 + mouse.y * 3.14159);
    }

    vec2 diff = uv_coord - mouse;
    float dist = length(diff);
    float falloff = ubo.pointer.z > 0.5 ? exp(-dist * 16.0) : 0.0;
    float ripple = sin(10.0 * dist - time * 2.0) * 0.018;
    uv += (diff / (dist + 0.0001)) * ripple * falloff;

    float tone = 0.35 + 0.65 * sin(time * 0.28 - uv.x * 1.6 - uv.y * 1.1 + hash21(uv_coord) * 2.0);
    vec3 base = ubo.base_color.rgb * mix(0.75, 1.05, tone);

    float len = length(uv);
    float radial = 1.0 - smoothstep(0.0, 0.97, len * 0.45);
    float fres = pow(clamp(1.0 - len * 0.55, 0.0, 1.0), 2.6);
    float gloss = pow(clamp(1.0 - len * 0.42, 0.0, 1.0), 10.0);
    vec3 highlight = ubo.highlight_color.rgb
        * (0.045 * fres + 0.09 * radial * tone + 0.18 * gloss * falloff);

    vec3 color = base * 0.88 + highlight;
    color = pow(clamp(color, 0.0, 1.0), vec3(0.95));
    return clamp(color, 0.0, 1.0);
}

void main() {
    float step_size = 1.0 / min(ubo.resolution.x, ubo.resolution.y);
    vec3 accum = vec3(0.0);
    for (int i = -1; i <= 1; i++) {
        for (int j = -1; j <= 1; j++) {
            accum += render_image(v_uv + vec2(float(i), float(j)) * step_size);
        }
    }
    out_color = vec4(accum / 9.0, 1.0);
}
";

/// Story layer. Works in top-left device pixel space via `gl_FragCoord`.
///
/// The uniform block layout must match `OverlayUniforms` in `gpu/uniforms.rs`.
pub(crate) const OVERLAY_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform OverlayBlock {
    vec4 viewport;    // xy: device pixels
    vec4 image_rect;  // x, y, width, height in device pixels
    vec4 progress;    // x: segment count, y: active index, z: active fraction, w: backdrop alpha
    vec4 bar;         // x: top, y: height, z: gap, w: side margin
} ubo;

layout(set = 1, binding = 0) uniform texture2D story_texture;
layout(set = 1, binding = 1) uniform sampler story_sampler;

vec4 over(vec4 dst, vec3 rgb, float alpha) {
    return vec4(mix(dst.rgb, rgb, alpha), dst.a + alpha * (1.0 - dst.a));
}

void main() {
    vec2 p = gl_FragCoord.xy;
    vec4 color = vec4(0.0, 0.0, 0.0, ubo.progress.w);

    vec2 local = (p - ubo.image_rect.xy) / max(ubo.image_rect.zw, vec2(1.0));
    vec4 texel = textureLod(sampler2D(story_texture, story_sampler), clamp(local, 0.0, 1.0), 0.0);
    bool inside = all(greaterThanEqual(local, vec2(0.0))) && all(lessThan(local, vec2(1.0)));
    if (inside) {
        color = vec4(texel.rgb, 1.0);
    }

    float count = ubo.progress.x;
    if (count >= 1.0) {
        float usable = max(ubo.viewport.x - 2.0 * ubo.bar.w - ubo.bar.z * (count - 1.0), 0.0);
        float segment = usable / count;
        float stride = segment + ubo.bar.z;
        float x = p.x - ubo.bar.w;
        float y = p.y - ubo.bar.x;
        if (segment > 0.0 && x >= 0.0 && y >= 0.0 && y < ubo.bar.y) {
            float index = floor(x / stride);
            float within = x - index * stride;
            if (index < count && within < segment) {
                float fill = index < ubo.progress.y ? 1.0 : (index == ubo.progress.y ? ubo.progress.z : 0.0);
                float lit = within < segment * fill ? 1.0 : 0.0;
                color = over(color, vec3(1.0), mix(0.35, 1.0, lit));
            }
        }
    }

    out_color = color;
}
";
