use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::RgbaImage;
use siteconfig::MediaKind;
use stories::Story;
use wgpu::util::{DeviceExt, TextureDataOrder};

/// Neutral grey shown in place of media that cannot be decoded.
const PLACEHOLDER_RGBA: [u8; 4] = [58, 58, 62, 255];
const POSTER_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Candidate files for a story's still image, in lookup order.
///
/// Video stories show a poster frame: the source itself when it decodes as an
/// image, otherwise a sibling with the same stem and an image extension.
pub(crate) fn still_candidates(story: &Story) -> Vec<PathBuf> {
    let mut candidates = vec![story.source.clone()];
    if story.kind == MediaKind::Video {
        candidates.extend(
            POSTER_EXTENSIONS
                .iter()
                .map(|ext| story.source.with_extension(ext))
                .filter(|path| path != &story.source),
        );
    }
    candidates
}

fn decode(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode story media at {}", path.display()))?;
    Ok(image.to_rgba8())
}

pub(crate) fn placeholder_image() -> RgbaImage {
    RgbaImage::from_pixel(2, 2, image::Rgba(PLACEHOLDER_RGBA))
}

/// Decodes the story's still image, degrading to the placeholder on failure.
pub(crate) fn load_story_image(story: &Story) -> RgbaImage {
    let mut last_error = None;
    for candidate in still_candidates(story) {
        match decode(&candidate) {
            Ok(image) => return image,
            Err(err) => last_error = Some(err),
        }
    }
    if let Some(err) = last_error {
        tracing::warn!(
            story = %story.id,
            path = %story.source.display(),
            error = %err,
            "failed to load story media; using placeholder"
        );
    }
    placeholder_image()
}

/// Downscales `image` so neither side exceeds `max_dimension`, keeping its aspect ratio.
pub(crate) fn fit_within(image: RgbaImage, max_dimension: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let max_dimension = max_dimension.max(1);
    if width <= max_dimension && height <= max_dimension {
        return image;
    }
    let scale = f64::from(max_dimension) / f64::from(width.max(height));
    let target = |side: u32| ((f64::from(side) * scale).round() as u32).clamp(1, max_dimension);
    let (new_width, new_height) = (target(width), target(height));
    tracing::warn!(
        width,
        height,
        max_dimension,
        new_width,
        new_height,
        "story image exceeds GPU texture limits; downscaling"
    );
    image::imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}

pub(crate) struct StoryTexture {
    _texture: wgpu::Texture,
    pub bind_group: wgpu::BindGroup,
    pub size: (u32, u32),
}

/// Lazily uploaded story images, one slot per story.
pub(crate) struct StoryTextures {
    pub layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    format: wgpu::TextureFormat,
    max_dimension: u32,
    slots: Vec<Option<StoryTexture>>,
}

impl StoryTextures {
    pub fn new(
        device: &wgpu::Device,
        story_count: usize,
        srgb: bool,
        max_dimension: u32,
    ) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("story texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("story sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        Self {
            layout,
            sampler,
            format,
            max_dimension,
            slots: (0..story_count).map(|_| None).collect(),
        }
    }

    /// Texture for story `index`, decoding and uploading it on first use.
    pub fn get_or_load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        index: usize,
        story: &Story,
    ) -> Option<&StoryTexture> {
        let slot = self.slots.get_mut(index)?;
        if slot.is_none() {
            let image = fit_within(load_story_image(story), self.max_dimension);
            *slot = Some(upload(
                device,
                queue,
                &self.layout,
                &self.sampler,
                self.format,
                index,
                &image,
            ));
            tracing::debug!(index, story = %story.id, "story texture uploaded");
        }
        slot.as_ref()
    }
}

fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    format: wgpu::TextureFormat,
    index: usize,
    image: &RgbaImage,
) -> StoryTexture {
    let (width, height) = image.dimensions();
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(&format!("story texture #{index}")),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        image.as_raw(),
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("story bind group #{index}")),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    StoryTexture {
        _texture: texture,
        bind_group,
        size: (width, height),
    }
}
