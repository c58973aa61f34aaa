//! CPU evaluation of the liquid chrome field.
//!
//! Mirrors `CHROME_FRAGMENT_GLSL` term for term so still exports match what
//! the window shows at the same simulated time.

use image::{Rgba, RgbaImage};

use crate::background::FrameInputs;

// Truncated on purpose; the GPU shader uses the same literal.
#[allow(clippy::approx_constant)]
const PI_APPROX: f32 = 3.14159;

fn fract(x: f32) -> f32 {
    x - x.floor()
}

fn length(v: [f32; 2]) -> f32 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Cheap per-pixel noise in `[0, 1)`.
pub fn hash21(p: [f32; 2]) -> f32 {
    let mut p = [fract(p[0] * 127.1), fract(p[1] * 311.7)];
    let d = p[0] * (p[0] + 34.5) + p[1] * (p[1] + 34.5);
    p = [p[0] + d, p[1] + d];
    fract(p[0] * p[1])
}

/// Single field sample at `uv_coord` (bottom-left origin, `[0, 1]²`).
pub fn render_image(uv_coord: [f32; 2], inputs: &FrameInputs) -> [f32; 3] {
    let params = &inputs.params;
    let res = [inputs.viewport.width as f32, inputs.viewport.height as f32];
    let time = inputs.time;
    let mouse = [inputs.pointer.x, inputs.pointer.y];
    let min_res = res[0].min(res[1]);

    let mut uv = [
        (2.0 * uv_coord[0] * res[0] - res[0]) / min_res,
        (2.0 * uv_coord[1] * res[1] - res[1]) / min_res,
    ];

    for i in 1..10 {
        let fi = i as f32;
        let amp = params.amplitude / (fi * 0.8);
        uv[0] += amp * (fi * params.frequency_x * uv[1] + time * 0.9 + mouse[0] * PI_APPROX).cos();
        uv[1] += amp * (fi * params.frequency_y * uv[0] + time * 0.9 + mouse[1] * PI_APPROX).cos();
    }

    let diff = [uv_coord[0] - mouse[0], uv_coord[1] - mouse[1]];
    let dist = length(diff);
    let falloff = if params.interactive {
        (-dist * 16.0).exp()
    } else {
        0.0
    };
    let ripple = (10.0 * dist - time * 2.0).sin() * 0.018;
    let push = ripple * falloff / (dist + 0.0001);
    uv[0] += diff[0] * push;
    uv[1] += diff[1] * push;

    let tone = 0.35
        + 0.65 * (time * 0.28 - uv[0] * 1.6 - uv[1] * 1.1 + hash21(uv_coord) * 2.0).sin();
    let base_scale = mix(0.75, 1.05, tone);

    let len = length(uv);
    let radial = 1.0 - smoothstep(0.0, 0.97, len * 0.45);
    let fres = (1.0 - len * 0.55).clamp(0.0, 1.0).powf(2.6);
    let gloss = (1.0 - len * 0.42).clamp(0.0, 1.0).powf(10.0);
    let highlight_scale = 0.045 * fres + 0.09 * radial * tone + 0.18 * gloss * falloff;

    let mut color = [0.0; 3];
    for (channel, out) in color.iter_mut().enumerate() {
        let value = params.base_color[channel] * base_scale * 0.88
            + params.highlight_color[channel] * highlight_scale;
        *out = value.clamp(0.0, 1.0).powf(0.95).clamp(0.0, 1.0);
    }
    color
}

/// Final pixel colour: mean of a 3x3 grid of samples one pixel apart.
pub fn shade(uv_coord: [f32; 2], inputs: &FrameInputs) -> [f32; 3] {
    let step = 1.0 / (inputs.viewport.width.min(inputs.viewport.height) as f32);
    let mut accum = [0.0; 3];
    for i in -1..=1 {
        for j in -1..=1 {
            let sample = render_image(
                [uv_coord[0] + i as f32 * step, uv_coord[1] + j as f32 * step],
                inputs,
            );
            for (acc, value) in accum.iter_mut().zip(sample) {
                *acc += value;
            }
        }
    }
    accum.map(|value| value / 9.0)
}

/// Renders a full frame into an image whose first row is the top of the viewport.
pub fn render_rgba(inputs: &FrameInputs) -> RgbaImage {
    let (width, height) = (inputs.viewport.width, inputs.viewport.height);
    RgbaImage::from_fn(width, height, |col, row| {
        let uv = [
            (col as f32 + 0.5) / width as f32,
            1.0 - (row as f32 + 0.5) / height as f32,
        ];
        let [r, g, b] = shade(uv, inputs);
        Rgba([to_u8(r), to_u8(g), to_u8(b), 255])
    })
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChromeParams, PointerPosition, ViewportSize};

    fn inputs(interactive: bool) -> FrameInputs {
        FrameInputs {
            time: 1.0,
            viewport: ViewportSize::new(64, 48),
            pointer: PointerPosition::new(0.5, 0.5),
            params: ChromeParams {
                interactive,
                ..ChromeParams::default()
            },
        }
    }

    #[test]
    fn hash_stays_in_unit_interval() {
        for i in 0..100 {
            let p = [i as f32 * 0.013, 1.0 - i as f32 * 0.007];
            let h = hash21(p);
            assert!((0.0..1.0).contains(&h), "hash21({p:?}) = {h}");
        }
    }

    #[test]
    fn output_is_clamped_and_dark_for_default_palette() {
        let image = render_rgba(&inputs(true));
        assert_eq!(image.dimensions(), (64, 48));
        let mut total = 0u64;
        for pixel in image.pixels() {
            assert_eq!(pixel[3], 255);
            total += u64::from(pixel[0]);
        }
        let mean = total as f64 / (64.0 * 48.0);
        assert!(mean < 128.0, "mean red channel {mean}");
    }

    #[test]
    fn pointer_highlight_requires_interactivity() {
        let on = shade([0.5, 0.5], &inputs(true));
        let off = shade([0.5, 0.5], &inputs(false));
        let delta: f32 = on.iter().zip(off).map(|(a, b)| (a - b).abs()).sum();
        assert!(delta > 0.0);
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = render_rgba(&inputs(true));
        let b = render_rgba(&inputs(true));
        assert_eq!(a, b);
    }

    #[test]
    fn base_colour_lifts_every_channel() {
        let mut black = inputs(false);
        black.params.base_color = [0.0, 0.0, 0.0];
        let mut white = inputs(false);
        white.params.base_color = [1.0, 1.0, 1.0];
        let dark = shade([0.3, 0.7], &black);
        let light = shade([0.3, 0.7], &white);
        for channel in 0..3 {
            assert!(light[channel] > dark[channel]);
        }
    }
}
