use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use stories::Story;
use tracing::debug;
use winit::window::Window;

use crate::background::{Frame, FrameError, FrameSink};
use crate::runtime::FrameStats;
use crate::types::{Antialiasing, ColorSpaceMode, ViewportSize};

use super::context::GpuContext;
use super::pipeline::Pipelines;
use super::textures::StoryTextures;
use super::uniforms::{ChromeUniforms, OverlayUniforms};

impl From<wgpu::SurfaceError> for FrameError {
    fn from(value: wgpu::SurfaceError) -> Self {
        match value {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => FrameError::Lost,
            wgpu::SurfaceError::Timeout => FrameError::Timeout,
            wgpu::SurfaceError::OutOfMemory => FrameError::OutOfMemory,
            other => FrameError::Other(other.to_string()),
        }
    }
}

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: ViewportSize,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformSlot {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str, size: usize) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }
}

/// Window surface that draws the background and story overlay.
pub(crate) struct GpuState {
    context: GpuContext,
    pipelines: Pipelines,
    chrome: UniformSlot,
    overlay: UniformSlot,
    textures: StoryTextures,
    stories: Vec<Story>,
    multisample_target: Option<MultisampleTarget>,
    pixel_scale: f32,
    stats: FrameStats,
}

impl GpuState {
    pub(crate) fn new(
        window: Arc<Window>,
        initial_size: ViewportSize,
        antialiasing: Antialiasing,
        color_space: ColorSpaceMode,
        stories: Vec<Story>,
    ) -> Result<Self> {
        let context = GpuContext::new(window, initial_size, antialiasing, color_space)?;
        let textures = StoryTextures::new(
            &context.device,
            stories.len(),
            context.surface_format.is_srgb(),
            context.limits.max_texture_dimension_2d,
        );
        let pipelines = Pipelines::new(
            &context.device,
            context.surface_format,
            context.sample_count,
            &textures.layout,
        );
        let chrome = UniformSlot::new(
            &context.device,
            &pipelines.uniform_layout,
            "chrome uniforms",
            std::mem::size_of::<ChromeUniforms>(),
        );
        let overlay = UniformSlot::new(
            &context.device,
            &pipelines.uniform_layout,
            "overlay uniforms",
            std::mem::size_of::<OverlayUniforms>(),
        );
        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });

        Ok(Self {
            context,
            pipelines,
            chrome,
            overlay,
            textures,
            stories,
            multisample_target,
            pixel_scale: 1.0,
            stats: FrameStats::new(Instant::now()),
        })
    }

    /// Device pixels per logical pixel, used to place the progress bar.
    pub(crate) fn set_pixel_scale(&mut self, scale: f32) {
        self.pixel_scale = scale;
    }
}

impl FrameSink for GpuState {
    fn resize(&mut self, size: ViewportSize) {
        if size == self.context.size {
            self.context.reconfigure();
            return;
        }
        if !self.context.resize(size) {
            return;
        }
        if self.context.sample_count > 1 {
            self.multisample_target = Some(MultisampleTarget::new(
                &self.context.device,
                self.context.surface_format,
                size,
                self.context.sample_count,
            ));
        }
    }

    fn present(&mut self, frame: &Frame<'_>) -> Result<(), FrameError> {
        let surface_texture = self.context.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let chrome_uniforms = ChromeUniforms::from_inputs(&frame.inputs);
        self.context.queue.write_buffer(
            &self.chrome.buffer,
            0,
            bytemuck::bytes_of(&chrome_uniforms),
        );

        let story_texture = match frame.overlay {
            Some(snapshot) => match self.stories.get(snapshot.story_index) {
                Some(story) => self
                    .textures
                    .get_or_load(
                        &self.context.device,
                        &self.context.queue,
                        snapshot.story_index,
                        story,
                    )
                    .map(|texture| (snapshot, texture)),
                None => None,
            },
            None => None,
        };
        if let Some((snapshot, texture)) = story_texture {
            let uniforms = OverlayUniforms::new(
                snapshot,
                frame.inputs.viewport,
                texture.size,
                self.pixel_scale,
            );
            self.context
                .queue
                .write_buffer(&self.overlay.buffer, 0, bytemuck::bytes_of(&uniforms));
        }

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });
        {
            let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
                Some(msaa) => (&msaa.view, Some(&view)),
                None => (&view, None),
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            pass.set_pipeline(&self.pipelines.chrome);
            pass.set_bind_group(0, &self.chrome.bind_group, &[]);
            pass.draw(0..3, 0..1);

            if let Some((_, texture)) = story_texture {
                pass.set_pipeline(&self.pipelines.overlay);
                pass.set_bind_group(0, &self.overlay.bind_group, &[]);
                pass.set_bind_group(1, &texture.bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        }

        self.context.queue.submit(Some(encoder.finish()));
        surface_texture.present();

        if let Some(fps) = self.stats.record(Instant::now()) {
            debug!(
                fps = fps.round(),
                time = frame.inputs.time,
                overlay = frame.overlay.is_some(),
                "render stats"
            );
        }
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        self.multisample_target = None;
        self.context.wait_idle()
    }
}
