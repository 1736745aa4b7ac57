//! SDF-based WebGPU render pipeline
//!
//! Renders the entire scene in fragment shader using signed distance fields.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::rgb_from_hex;
use crate::sim::{BubbleStyle, GameState};

/// Maximum number of bubbles drawn per frame
pub const MAX_BUBBLES: usize = 128;

/// Bubble body opacity
const BODY_ALPHA: f32 = 0.8;

/// Renderer setup failures
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

// ============================================================================
// GPU DATA STRUCTURES (must match shader)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct Globals {
    resolution: [f32; 2], // offset 0, physical pixels
    time: f32,            // offset 8, seconds
    scale: f32,           // offset 12, device pixel ratio
    bubble_count: u32,    // offset 16
    _pad: [u32; 3],       // pad to 32 bytes
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct BubbleData {
    pos: [f32; 2],   // offset 0, CSS pixels
    radius: f32,     // offset 8
    shimmer: f32,    // offset 12
    color: [f32; 4], // offset 16, rgb + body alpha
    kind: u32,       // offset 32, 0 = solid, 1 = rainbow
    _pad: [u32; 3],  // pad to 48 bytes (uniform array stride)
}

const BUBBLE_KIND_SOLID: u32 = 0;
const BUBBLE_KIND_RAINBOW: u32 = 1;

impl BubbleData {
    fn from_bubble(bubble: &crate::sim::Bubble) -> Self {
        let (rgb, kind) = match bubble.category.style() {
            BubbleStyle::Solid { rgb } => (rgb_from_hex(rgb), BUBBLE_KIND_SOLID),
            BubbleStyle::Rainbow => ([1.0, 1.0, 1.0], BUBBLE_KIND_RAINBOW),
        };
        Self {
            pos: [bubble.pos.x, bubble.pos.y],
            radius: bubble.radius,
            shimmer: bubble.shimmer,
            color: [rgb[0], rgb[1], rgb[2], BODY_ALPHA],
            kind,
            _pad: [0; 3],
        }
    }
}

/// Pack the visible scene into shader-ready data. Bubbles keep collection
/// order so later ones are painted on top. Past `MAX_BUBBLES` the oldest
/// are left out, keeping whatever a click would hit visible.
pub(crate) fn pack_scene(
    state: &GameState,
    resolution: (u32, u32),
    scale: f32,
    time_s: f32,
) -> (Globals, Vec<BubbleData>) {
    let mut bubbles = vec![BubbleData::zeroed(); MAX_BUBBLES];
    let count = state.bubbles.len().min(MAX_BUBBLES);
    let skip = state.bubbles.len() - count;
    for (slot, bubble) in bubbles.iter_mut().zip(state.bubbles.iter().skip(skip)) {
        *slot = BubbleData::from_bubble(bubble);
    }

    let globals = Globals {
        resolution: [resolution.0 as f32, resolution.1 as f32],
        time: time_s,
        scale: if scale.is_finite() && scale > 0.0 { scale } else { 1.0 },
        bubble_count: count as u32,
        _pad: [0; 3],
    };
    (globals, bubbles)
}

// ============================================================================
// SDF RENDER STATE
// ============================================================================

pub struct SdfRenderState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub pipeline: wgpu::RenderPipeline,

    // Uniform buffers
    globals_buffer: wgpu::Buffer,
    bubbles_buffer: wgpu::Buffer,

    bind_group: wgpu::BindGroup,

    pub size: (u32, u32),
    /// Device pixel ratio (physical pixels per game pixel)
    scale: f32,
    start_time: f64,
}

impl SdfRenderState {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
        scale: f32,
    ) -> Result<Self, RendererError> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("sdf-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(adapter);
        log::info!("Surface formats: {:?}", surface_caps.formats);

        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RendererError::NoSurfaceFormat)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        log::info!("Using surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        log::info!("Surface config: {}x{} @ {}x", width, height, scale);
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sdf_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sdf_shader.wgsl").into()),
        });

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("globals"),
            contents: bytemuck::bytes_of(&Globals {
                resolution: [width as f32, height as f32],
                time: 0.0,
                scale,
                bubble_count: 0,
                _pad: [0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // Uniform rather than storage so the WebGL2 fallback works too
        let bubbles_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bubbles"),
            size: (std::mem::size_of::<BubbleData>() * MAX_BUBBLES) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sdf_bind_group_layout"),
            entries: &[uniform_entry(0), uniform_entry(1)],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sdf_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bubbles_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sdf_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sdf_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[], // No vertex buffers - fullscreen triangle
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            globals_buffer,
            bubbles_buffer,
            bind_group,
            size: (width, height),
            scale,
            start_time: 0.0,
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32, scale: f32) {
        if new_width > 0 && new_height > 0 {
            self.size = (new_width, new_height);
            self.scale = scale;
            self.config.width = new_width;
            self.config.height = new_height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn set_start_time(&mut self, time: f64) {
        self.start_time = time;
    }

    /// Upload the bubbles and draw one frame. `time` is the rAF timestamp (ms).
    pub fn render(&mut self, state: &GameState, time: f64) -> Result<(), wgpu::SurfaceError> {
        let elapsed = ((time - self.start_time) / 1000.0) as f32;
        let (globals, bubbles) = pack_scene(state, self.size, self.scale, elapsed);

        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        self.queue
            .write_buffer(&self.bubbles_buffer, 0, bytemuck::cast_slice(&bubbles));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sdf_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sdf_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Fullscreen triangle
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Arena, Bubble, Category};
    use crate::tuning::Tuning;
    use glam::Vec2;

    fn state_with(bubbles: Vec<Bubble>) -> GameState {
        let mut state = GameState::new(1, Tuning::default(), Arena::new(800.0, 600.0)).unwrap();
        state.bubbles = bubbles;
        state
    }

    #[test]
    fn test_gpu_struct_layout() {
        assert_eq!(std::mem::size_of::<Globals>(), 32);
        assert_eq!(std::mem::size_of::<BubbleData>(), 48);
        assert!(std::mem::size_of::<BubbleData>() * MAX_BUBBLES <= 16384);
    }

    #[test]
    fn test_pack_keeps_draw_order_and_styles() {
        let state = state_with(vec![
            Bubble::new(1, Vec2::new(10.0, 20.0), 30.0, 1.0, Category::Red),
            Bubble::new(2, Vec2::new(50.0, 60.0), 25.0, 1.0, Category::Rainbow),
        ]);
        let (globals, bubbles) = pack_scene(&state, (1600, 1200), 2.0, 1.5);

        assert_eq!(globals.bubble_count, 2);
        assert_eq!(globals.scale, 2.0);
        assert_eq!(globals.resolution, [1600.0, 1200.0]);
        assert_eq!(bubbles.len(), MAX_BUBBLES);

        assert_eq!(bubbles[0].pos, [10.0, 20.0]);
        assert_eq!(bubbles[0].kind, BUBBLE_KIND_SOLID);
        assert_eq!(bubbles[0].color[0], 1.0);
        assert_eq!(bubbles[0].color[3], BODY_ALPHA);
        assert_eq!(bubbles[1].kind, BUBBLE_KIND_RAINBOW);
        assert_eq!(bubbles[2], BubbleData::zeroed());
    }

    #[test]
    fn test_pack_caps_bubble_count() {
        let many = (0..(MAX_BUBBLES as u32 + 20))
            .map(|i| Bubble::new(i + 1, Vec2::new(i as f32, 0.0), 30.0, 1.0, Category::Teal))
            .collect();
        let (globals, bubbles) = pack_scene(&state_with(many), (800, 600), f32::NAN, 0.0);
        assert_eq!(globals.bubble_count as usize, MAX_BUBBLES);
        assert_eq!(globals.scale, 1.0);
        // Newest bubbles win the slots
        assert_eq!(bubbles[0].pos[0], 20.0);
        assert_eq!(bubbles[MAX_BUBBLES - 1].pos[0], (MAX_BUBBLES + 19) as f32);
    }
}
