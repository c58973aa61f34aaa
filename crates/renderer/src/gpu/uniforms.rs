use bytemuck::{Pod, Zeroable};

use crate::background::FrameInputs;
use crate::overlay::{letterbox, OverlaySnapshot};
use crate::types::ViewportSize;

/// Opacity of the dimmed backdrop behind an open story.
pub(crate) const BACKDROP_ALPHA: f32 = 0.8;

/// std140 mirror of `ChromeBlock` in the chrome fragment shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct ChromeUniforms {
    pub resolution: [f32; 4],
    pub base_color: [f32; 4],
    pub highlight_color: [f32; 4],
    pub wave: [f32; 4],
    pub pointer: [f32; 4],
}

impl ChromeUniforms {
    pub fn from_inputs(inputs: &FrameInputs) -> Self {
        let params = &inputs.params;
        let [br, bg, bb] = params.base_color;
        let [hr, hg, hb] = params.highlight_color;
        Self {
            resolution: [
                inputs.viewport.width as f32,
                inputs.viewport.height as f32,
                inputs.viewport.aspect(),
                0.0,
            ],
            base_color: [br, bg, bb, 1.0],
            highlight_color: [hr, hg, hb, 1.0],
            wave: [
                params.amplitude,
                params.frequency_x,
                params.frequency_y,
                inputs.time,
            ],
            pointer: [
                inputs.pointer.x,
                inputs.pointer.y,
                if params.interactive { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

/// std140 mirror of `OverlayBlock` in the overlay fragment shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct OverlayUniforms {
    pub viewport: [f32; 4],
    pub image_rect: [f32; 4],
    pub progress: [f32; 4],
    pub bar: [f32; 4],
}

impl OverlayUniforms {
    /// `pixel_scale` converts the bar's logical layout into device pixels.
    pub fn new(
        snapshot: &OverlaySnapshot,
        viewport: ViewportSize,
        image_size: (u32, u32),
        pixel_scale: f32,
    ) -> Self {
        let rect = letterbox(image_size, viewport);
        let bar = snapshot.bar.scaled(pixel_scale);
        Self {
            viewport: [viewport.width as f32, viewport.height as f32, 0.0, 0.0],
            image_rect: [rect.x, rect.y, rect.width, rect.height],
            progress: [
                snapshot.segments.len() as f32,
                snapshot.story_index as f32,
                snapshot.active_fraction(),
                BACKDROP_ALPHA,
            ],
            bar: [bar.top, bar.height, bar.gap, bar.side],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::ProgressBarLayout;
    use crate::types::{ChromeParams, PointerPosition};
    use siteconfig::DisplayMode;
    use stories::SegmentState;

    #[test]
    fn uniform_blocks_are_std140_sized() {
        assert_eq!(std::mem::size_of::<ChromeUniforms>(), 80);
        assert_eq!(std::mem::size_of::<OverlayUniforms>(), 64);
    }

    #[test]
    fn chrome_uniforms_pack_inputs() {
        let inputs = FrameInputs {
            time: 2.5,
            viewport: ViewportSize::new(200, 100),
            pointer: PointerPosition::new(0.25, 0.75),
            params: ChromeParams {
                interactive: false,
                ..ChromeParams::default()
            },
        };
        let uniforms = ChromeUniforms::from_inputs(&inputs);
        assert_eq!(uniforms.resolution, [200.0, 100.0, 2.0, 0.0]);
        assert_eq!(uniforms.wave, [0.16, 3.2, 3.6, 2.5]);
        assert_eq!(uniforms.pointer, [0.25, 0.75, 0.0, 0.0]);
    }

    #[test]
    fn overlay_uniforms_scale_bar_and_letterbox_image() {
        let snapshot = OverlaySnapshot {
            story_index: 1,
            segments: vec![
                SegmentState::Completed,
                SegmentState::Active(0.5),
                SegmentState::Pending,
            ],
            bar: ProgressBarLayout::for_mode(DisplayMode::Desktop),
        };
        let uniforms =
            OverlayUniforms::new(&snapshot, ViewportSize::new(2000, 1000), (500, 1000), 2.0);
        assert_eq!(uniforms.image_rect, [750.0, 0.0, 500.0, 1000.0]);
        assert_eq!(uniforms.progress, [3.0, 1.0, 0.5, BACKDROP_ALPHA]);
        assert_eq!(uniforms.bar, [32.0, 6.0, 12.0, 48.0]);
    }
}
