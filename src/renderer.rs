//! GPU rendering of the cube's blocks.
//!
//! Every block is one instance of the same unit mesh; per-instance data
//! carries the block's model matrix and its six face colors. A full-viewport
//! quad clears the widget area before the blocks are drawn.

use iced::widget::shader::wgpu::{self, CommandEncoder, Device, Queue, TextureFormat, TextureView};
use iced::{Rectangle, Size};
use nalgebra::{Matrix4, Vector4};
use wgpu::util::DeviceExt;

use crate::RenderMode;
use crate::block::Face;
use crate::camera::{CameraUniform, OrbitCamera, Projection};
use crate::cube::{BLOCK_VERTICES, BlockInstance, Vertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Per-instance data uploaded for each block.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct InstanceRaw {
    /// Translation · rotation · scale.
    model: [[f32; 4]; 4],
    /// RGBA per face, in `Face` order.
    colors: [[f32; 4]; 6],
}

impl From<&BlockInstance> for InstanceRaw {
    fn from(instance: &BlockInstance) -> Self {
        let model = Matrix4::new_translation(&instance.position)
            * instance.orientation.to_homogeneous()
            * Matrix4::new_scaling(instance.scale);
        let colors = Face::ALL.map(|face| Vector4::<f32>::from(instance.faces.color(face)).into());
        Self {
            model: model.into(),
            colors,
        }
    }
}

impl InstanceRaw {
    fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 10] = wgpu::vertex_attr_array![
            3 => Float32x4,
            4 => Float32x4,
            5 => Float32x4,
            6 => Float32x4,
            7 => Float32x4,
            8 => Float32x4,
            9 => Float32x4,
            10 => Float32x4,
            11 => Float32x4,
            12 => Float32x4,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

impl Vertex {
    fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Uint32,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

impl From<RenderMode> for u32 {
    fn from(mode: RenderMode) -> Self {
        match mode {
            RenderMode::Standard => 0,
            RenderMode::Normals => 1,
            RenderMode::Depth => 2,
        }
    }
}

/// GPU resources for drawing the cube inside the shader widget.
#[derive(Debug)]
pub(crate) struct Renderer {
    /// Physical-pixel area of the target the widget occupies.
    viewport: Rectangle<f32>,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    /// Instances the buffer can hold before it has to grow.
    instance_capacity: usize,
    num_instances: u32,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    clear_pipeline: wgpu::RenderPipeline,
    clear_vertex_buffer: wgpu::Buffer,
    clear_index_buffer: wgpu::Buffer,
}

impl Renderer {
    pub(crate) fn new(
        device: &Device,
        format: TextureFormat,
        target_size: Size<u32>,
        instance_capacity: usize,
    ) -> Self {
        let camera_uniform = CameraUniform::new();

        let (depth_texture, depth_view) = create_depth_texture(device, target_size);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    // The fragment stage reads the render mode.
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("Camera Bind Group Layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("Camera Bind Group"),
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Block Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&camera_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex::layout(), InstanceRaw::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Block Vertex Buffer"),
            contents: bytemuck::cast_slice(&BLOCK_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let instance_buffer = create_instance_buffer(device, instance_capacity);

        // Full-viewport quad in NDC.
        let clear_vertices: &[[f32; 2]] = &[[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
        let clear_indices: &[u16] = &[0, 1, 2, 0, 2, 3];

        let clear_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Clear Vertex Buffer"),
            contents: bytemuck::cast_slice(clear_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let clear_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Clear Index Buffer"),
            contents: bytemuck::cast_slice(clear_indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let clear_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Clear Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("clear.wgsl").into()),
        });

        let clear_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Clear Pipeline Layout"),
                bind_group_layouts: &[],
                push_constant_ranges: &[],
            });

        let clear_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Clear Pipeline"),
            layout: Some(&clear_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &clear_shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &clear_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        Self {
            viewport: Rectangle::with_size(Size::new(
                target_size.width as f32,
                target_size.height as f32,
            )),
            render_pipeline,
            vertex_buffer,
            instance_buffer,
            instance_capacity,
            num_instances: 0,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            depth_texture,
            depth_view,
            clear_pipeline,
            clear_vertex_buffer,
            clear_index_buffer,
        }
    }

    /// Tracks the widget's area and recreates the depth buffer when the
    /// target changes size.
    ///
    /// `bounds` is in logical pixels; it is scaled and clipped to the target.
    pub(crate) fn resize(
        &mut self,
        device: &Device,
        bounds: Rectangle<f32>,
        scale_factor: f32,
        target_size: Size<u32>,
    ) {
        let target_width = target_size.width as f32;
        let target_height = target_size.height as f32;
        let x = (bounds.x * scale_factor).clamp(0.0, target_width);
        let y = (bounds.y * scale_factor).clamp(0.0, target_height);
        self.viewport = Rectangle {
            x,
            y,
            width: (bounds.width * scale_factor).min(target_width - x),
            height: (bounds.height * scale_factor).min(target_height - y),
        };

        let current = self.depth_texture.size();
        if target_size.width > 0
            && target_size.height > 0
            && (current.width != target_size.width || current.height != target_size.height)
        {
            let (texture, view) = create_depth_texture(device, target_size);
            self.depth_texture = texture;
            self.depth_view = view;
        }
    }

    pub(crate) fn set_render_mode(&mut self, mode: RenderMode) {
        self.camera_uniform.render_mode = mode.into();
    }

    pub(crate) fn update_camera(
        &mut self,
        queue: &Queue,
        camera: &OrbitCamera,
        projection: &Projection,
    ) {
        self.camera_uniform.update_view_proj(camera, projection);
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
    }

    /// Uploads this frame's instances, growing the buffer when needed.
    pub(crate) fn update_instances(
        &mut self,
        device: &Device,
        queue: &Queue,
        instances: &[InstanceRaw],
    ) {
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buffer = create_instance_buffer(device, self.instance_capacity);
        }
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(instances));
        self.num_instances = instances.len() as u32;
    }

    pub(crate) fn render(&self, encoder: &mut CommandEncoder, target: &TextureView) {
        if self.viewport.width <= 0.0 || self.viewport.height <= 0.0 {
            return;
        }

        // Clear only the widget's area; the rest of the target belongs to
        // the surrounding UI.
        {
            let mut clear_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.set_viewport(&mut clear_pass);
            clear_pass.set_pipeline(&self.clear_pipeline);
            clear_pass.set_vertex_buffer(0, self.clear_vertex_buffer.slice(..));
            clear_pass
                .set_index_buffer(self.clear_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            clear_pass.draw_indexed(0..6, 0, 0..1);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Block Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.set_viewport(&mut render_pass);
            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            render_pass.draw(0..BLOCK_VERTICES.len() as u32, 0..self.num_instances);
        }
    }

    fn set_viewport(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_viewport(
            self.viewport.x,
            self.viewport.y,
            self.viewport.width,
            self.viewport.height,
            0.0,
            1.0,
        );
    }
}

fn create_depth_texture(device: &Device, size: Size<u32>) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn create_instance_buffer(device: &Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity.max(1) * std::mem::size_of::<InstanceRaw>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockFaces, Color};
    use crate::cube::GridCoord;
    use nalgebra::{Point3, Rotation3, Vector3};

    #[test]
    fn instance_model_scales_rotates_then_translates() {
        let instance = BlockInstance {
            position: Vector3::new(2.0, 0.0, -2.0),
            orientation: Rotation3::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_2),
            scale: 0.5,
            faces: BlockFaces::for_cell(GridCoord::new(2, 1, 0), 3),
        };
        let raw = InstanceRaw::from(&instance);
        let model = Matrix4::from(raw.model);

        // Mesh corner +X lands at +Y after the quarter turn, then shifts.
        let corner = model.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((corner - Point3::new(2.0, 0.5, -2.0)).norm() < 1e-5);

        let red: [f32; 4] = Vector4::from(Color::Red).into();
        let black: [f32; 4] = Vector4::from(Color::Black).into();
        assert_eq!(raw.colors[Face::PosX as usize], red);
        assert_eq!(raw.colors[Face::PosY as usize], black);
    }

    #[test]
    fn render_mode_codes_match_the_shader() {
        assert_eq!(u32::from(RenderMode::Standard), 0);
        assert_eq!(u32::from(RenderMode::Normals), 1);
        assert_eq!(u32::from(RenderMode::Depth), 2);
    }
}
