//! Render pipeline for planet surface meshes.
//!
//! Consumes [`PlanetVertex`] geometry with a camera uniform at group 0 and
//! shades with a fixed-direction Lambert term, which is all a vertex-colored
//! planet needs.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use tellus_mesh::{PlanetVertex, VertexLayout};

use crate::streaming::{DrawRange, StreamIndexBuffer, StreamVertexBuffer};

/// Camera uniform: combined model-view-projection matrix.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Pipeline drawing planet meshes out of the streaming buffers.
pub struct PlanetPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub camera_bind_group_layout: wgpu::BindGroupLayout,
}

impl PlanetPipeline {
    /// Create the pipeline for a surface format, with an optional reverse-Z
    /// depth attachment.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("planet-shader"),
            source: wgpu::ShaderSource::Wgsl(PLANET_SHADER_SOURCE.into()),
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("planet-camera-bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(64), // mat4x4<f32>
                    },
                    count: None,
                }],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("planet-pipeline-layout"),
            bind_group_layouts: &[&camera_bind_group_layout],
            immediate_size: 0,
        });

        let depth_stencil = depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::GreaterEqual, // reverse-Z
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("planet-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[PlanetVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Displaced terrain can locally invert winding; draw both sides.
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        Self {
            pipeline,
            camera_bind_group_layout,
        }
    }
}

/// Bind the shared stream buffers and draw every range.
///
/// Ranges are the flattened draw descriptors exported by shipped meshes;
/// one indexed draw is issued per range.
pub fn draw_planet<'a>(
    render_pass: &mut wgpu::RenderPass<'a>,
    pipeline: &PlanetPipeline,
    camera_bind_group: &'a wgpu::BindGroup,
    vertex_buffer: &'a StreamVertexBuffer<PlanetVertex>,
    index_buffer: &'a StreamIndexBuffer,
    ranges: &[DrawRange],
) {
    render_pass.set_pipeline(&pipeline.pipeline);
    render_pass.set_bind_group(0, camera_bind_group, &[]);
    vertex_buffer.bind(render_pass);
    index_buffer.bind(render_pass);
    for range in ranges {
        let first = range.first_index();
        render_pass.draw_indexed(first..first + range.index_count, 0, 0..1);
    }
}

/// WGSL source for the planet shader.
pub const PLANET_SHADER_SOURCE: &str = r#"
struct CameraUniform {
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> camera: CameraUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) color: vec3<f32>,
};

const SUN_DIRECTION: vec3<f32> = vec3<f32>(0.57735, 0.57735, 0.57735);
const AMBIENT: f32 = 0.25;

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(in.position, 1.0);
    out.normal = in.normal;
    out.color = in.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var lit = AMBIENT;
    if (length(in.normal) > 0.0) {
        let n_dot_l = max(dot(normalize(in.normal), SUN_DIRECTION), 0.0);
        lit = AMBIENT + (1.0 - AMBIENT) * n_dot_l;
    }
    return vec4<f32>(in.color * lit, 1.0);
}
"#;
