use wgpu::util::DeviceExt;

use crate::data_structures::{
    instance::InstanceRaw,
    mesh::{ModelVertex, Vertex},
    texture::Texture,
};

/**
 * Physically-inspired glass material, pinned to the showcase look of the
 * vase: fully transmissive, glossy clearcoat, slight green tint.
 *
 * Optional maps are always bound. When a slot has no real image the bind
 * group carries a 1x1 placeholder and the matching uniform flag or
 * intensity is zeroed, so a single pipeline covers every map combination.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    base_color: [f32; 4],
    clearcoat: f32,
    clearcoat_roughness: f32,
    roughness: f32,
    ior: f32,
    reflectivity: f32,
    transmission: f32,
    thickness: f32,
    env_intensity: f32,
    use_color_map: f32,
    _pad: [f32; 3],
}

impl MaterialUniform {
    /// The vase preset. `has_map` and `has_env` describe which texture
    /// slots hold real images rather than placeholders.
    pub fn vase(has_map: bool, has_env: bool) -> Self {
        Self {
            base_color: [0.0, 1.0, 0.0, 1.0],
            clearcoat: 1.0,
            clearcoat_roughness: 0.0,
            roughness: 0.05,
            ior: 1.5,
            reflectivity: 0.5,
            transmission: 1.0,
            thickness: 0.2,
            env_intensity: if has_env { 1.0 } else { 0.0 },
            use_color_map: if has_map { 1.0 } else { 0.0 },
            _pad: [0.0; 3],
        }
    }
}

/// Bind group layout for the physical material: the uniform block plus the
/// color map and environment map with their samplers.
pub fn physical_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            texture_entry(1),
            sampler_entry(2),
            texture_entry(3),
            sampler_entry(4),
        ],
        label: Some("physical_material_layout"),
    })
}

pub fn mk_material_bind_group(
    device: &wgpu::Device,
    uniform: MaterialUniform,
    color_map: &Texture,
    env_map: &Texture,
) -> wgpu::BindGroup {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Material Buffer"),
        contents: bytemuck::cast_slice(&[uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &physical_layout(device),
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&color_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&color_map.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&env_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(&env_map.sampler),
            },
        ],
        label: Some("physical_material_bind_group"),
    })
}

/// Alpha-blended pipeline for transmissive meshes. Draw these after the
/// opaque passes so the room shows through the glass.
pub fn mk_physical_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Physical Pipeline Layout"),
        bind_group_layouts: &[
            &physical_layout(device),
            camera_bind_group_layout,
            light_bind_group_layout,
        ],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Physical Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("physical.wgsl").into()),
    };

    crate::pipelines::basic::mk_render_pipeline(
        device,
        &render_pipeline_layout,
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(wgpu::Face::Back),
        Some(Texture::DEPTH_FORMAT),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_the_shader_block_size() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 64);
    }

    #[test]
    fn map_flags_follow_slot_presence() {
        let both = MaterialUniform::vase(true, true);
        assert_eq!(both.use_color_map, 1.0);
        assert_eq!(both.env_intensity, 1.0);

        let bare = MaterialUniform::vase(false, false);
        assert_eq!(bare.use_color_map, 0.0);
        assert_eq!(bare.env_intensity, 0.0);
        assert_eq!(bare.base_color, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(bare.transmission, 1.0);
    }
}
