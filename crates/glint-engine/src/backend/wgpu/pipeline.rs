use crate::device::{ProgramId, Topology};
use crate::shader::{AttributeInfo, ProgramDesc};

pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Size of one `mat4x4<f32>` uniform.
pub(super) const MAT4_SIZE: u64 = 64;

/// GPU objects of a linked program. Pipelines are built lazily per draw shape.
pub(super) struct ProgramRecord {
    pub vertex: wgpu::ShaderModule,
    pub vertex_entry: String,
    pub fragment: wgpu::ShaderModule,
    pub fragment_entry: String,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub attributes: Vec<AttributeInfo>,
    pub uniform_bindings: Vec<u32>,
}

impl ProgramRecord {
    pub fn new(device: &wgpu::Device, desc: &ProgramDesc<'_>) -> Self {
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glint vertex stage"),
            source: wgpu::ShaderSource::Wgsl(desc.vertex_source.into()),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glint fragment stage"),
            source: wgpu::ShaderSource::Wgsl(desc.fragment_source.into()),
        });

        let entries: Vec<wgpu::BindGroupLayoutEntry> = desc
            .uniforms
            .iter()
            .map(|u| wgpu::BindGroupLayoutEntry {
                binding: u.binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(MAT4_SIZE),
                },
                count: None,
            })
            .collect();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glint program bgl"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glint program pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        Self {
            vertex,
            vertex_entry: desc.vertex_entry.to_owned(),
            fragment,
            fragment_entry: desc.fragment_entry.to_owned(),
            bind_group_layout,
            pipeline_layout,
            attributes: desc.attributes.to_vec(),
            uniform_bindings: desc.uniforms.iter().map(|u| u.binding).collect(),
        }
    }
}

/// Everything a render pipeline depends on besides the surface format.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub(super) struct PipelineKey {
    pub program: ProgramId,
    pub topology: Topology,
    /// `(location, components)` per vertex buffer, in `set_vertex_buffer` order.
    pub attributes: Vec<(u32, u32)>,
    pub indexed: bool,
}

pub(super) fn vertex_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

pub(super) fn build_pipeline(
    device: &wgpu::Device,
    program: &ProgramRecord,
    key: &PipelineKey,
    color_format: wgpu::TextureFormat,
    depth_test: bool,
) -> wgpu::RenderPipeline {
    // One buffer per attribute, tightly packed.
    let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
        .attributes
        .iter()
        .map(|&(location, components)| {
            [wgpu::VertexAttribute {
                format: vertex_format(components),
                offset: 0,
                shader_location: location,
            }]
        })
        .collect();

    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = key
        .attributes
        .iter()
        .zip(&attributes)
        .map(|(&(_, components), attrs)| wgpu::VertexBufferLayout {
            array_stride: u64::from(components) * std::mem::size_of::<f32>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: attrs,
        })
        .collect();

    let (topology, strip_index_format) = match key.topology {
        Topology::TriangleList => (wgpu::PrimitiveTopology::TriangleList, None),
        Topology::TriangleStrip => (
            wgpu::PrimitiveTopology::TriangleStrip,
            key.indexed.then_some(wgpu::IndexFormat::Uint16),
        ),
    };

    log::debug!(
        "building pipeline for program {:?} ({:?}, {} attributes, indexed {})",
        key.program,
        key.topology,
        key.attributes.len(),
        key.indexed
    );

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("glint pipeline"),
        layout: Some(&program.pipeline_layout),

        vertex: wgpu::VertexState {
            module: &program.vertex,
            entry_point: Some(program.vertex_entry.as_str()),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: &program.fragment,
            entry_point: Some(program.fragment_entry.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: depth_test.then(|| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),

        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_counts_map_to_float_formats() {
        assert_eq!(vertex_format(1), wgpu::VertexFormat::Float32);
        assert_eq!(vertex_format(3), wgpu::VertexFormat::Float32x3);
        assert_eq!(vertex_format(4), wgpu::VertexFormat::Float32x4);
    }

    #[test]
    fn pipeline_keys_differ_by_draw_shape() {
        let base = PipelineKey {
            program: ProgramId(1),
            topology: Topology::TriangleList,
            attributes: vec![(0, 3), (1, 4)],
            indexed: false,
        };
        let strip = PipelineKey {
            topology: Topology::TriangleStrip,
            ..base.clone()
        };
        let indexed = PipelineKey {
            indexed: true,
            ..base.clone()
        };
        assert_ne!(base, strip);
        assert_ne!(base, indexed);
        assert_eq!(base, base.clone());
    }
}
