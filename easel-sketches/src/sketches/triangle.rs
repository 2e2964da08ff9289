use easel::prelude::*;
use easel::wgpu;

const SHADER: &str = r#"
struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VsOut {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(0.0, 0.7),
        vec2<f32>(-0.7, -0.6),
        vec2<f32>(0.7, -0.6),
    );
    var colors = array<vec3<f32>, 3>(
        vec3<f32>(1.0, 0.2, 0.2),
        vec3<f32>(0.2, 1.0, 0.2),
        vec3<f32>(0.2, 0.2, 1.0),
    );

    var out: VsOut;
    out.position = vec4<f32>(positions[index], 0.0, 1.0);
    out.color = colors[index];
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color, 1.0);
}
"#;

/// A shaded triangle over a slowly cycling background. Exits after
/// `frames` frames when given a limit.
pub struct Triangle {
    pipeline: Option<wgpu::RenderPipeline>,
    limit: Option<u64>,
    drawn: u64,
}

impl Triangle {
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            pipeline: None,
            limit,
            drawn: 0,
        }
    }

    fn background(&self) -> wgpu::Color {
        let t = (self.drawn % 600) as f64 / 600.0;
        let wave = (t * std::f64::consts::TAU).sin() * 0.5 + 0.5;
        wgpu::Color {
            r: 0.05 + 0.1 * wave,
            g: 0.05,
            b: 0.1 + 0.15 * (1.0 - wave),
            a: 1.0,
        }
    }
}

impl Renderer for Triangle {
    fn bind_to_context(
        &mut self,
        gpu: &GpuContext,
        target: &TargetInfo,
    ) -> Result<(), String> {
        let device = gpu.device.as_ref();
        let shader = create_shader_module(device, SHADER, "triangle")?;
        let layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("triangle-layout"),
                bind_group_layouts: &[],
                push_constant_ranges: &[],
            });

        let depth_stencil =
            target.depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            });

        let pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("triangle-pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil,
                multisample: wgpu::MultisampleState {
                    count: target.sample_count,
                    ..Default::default()
                },
                multiview: None,
                cache: None,
            });

        log::info!(
            "triangle bound to {:?} at {}x{} ({} samples)",
            target.format,
            target.physical[0],
            target.physical[1],
            target.sample_count
        );
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn draw_frame(&mut self, frame: &mut Frame) -> Result<(), String> {
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or_else(|| "triangle drawn before binding".to_string())?;

        let background = self.background();
        {
            let mut pass = frame.begin_pass(Some(background));
            pass.set_pipeline(pipeline);
            pass.draw(0..3, 0..1);
        }

        self.drawn += 1;
        Ok(())
    }

    fn exit_requested(&self) -> bool {
        self.limit.is_some_and(|limit| self.drawn >= limit)
    }
}
