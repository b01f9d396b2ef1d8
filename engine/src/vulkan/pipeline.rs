use log::*;
use std::slice;
use vulkanalia::bytecode::Bytecode;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};
use vulkanalia::Device;

use super::constants;
use super::error::InitError;
use super::shader::ShaderStage;

/// A shader stage as it was used to build the layout. The module itself is
/// gone by the time the descriptor exists.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShaderStageDescriptor {
    pub stage: ShaderStage,
    pub entry_point: &'static [u8],
    pub code_size: usize,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InputAssemblyState {
    pub topology: vk::PrimitiveTopology,
    pub primitive_restart_enable: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RasterizationState {
    pub depth_clamp_enable: bool,
    pub rasterizer_discard_enable: bool,
    pub polygon_mode: vk::PolygonMode,
    pub line_width: f32,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub depth_bias_enable: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MultisampleState {
    pub sample_shading_enable: bool,
    pub rasterization_samples: vk::SampleCountFlags,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColorBlendState {
    pub logic_op_enable: bool,
    pub logic_op: vk::LogicOp,
    pub blend_constants: [f32; 4],
}

/// Fixed-function state, shader stages and layout for the triangle pipeline.
///
/// Nothing in here changes after assembly. Viewport and scissor are dynamic:
/// the values stored here are only the initial full-extent rectangles, the
/// count of each is fixed at one.
#[derive(Clone, Debug)]
pub struct PipelineDescriptor {
    stages: [ShaderStageDescriptor; 2],
    vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    input_assembly: InputAssemblyState,
    viewport: vk::Viewport,
    scissor: vk::Rect2D,
    rasterization: RasterizationState,
    multisample: MultisampleState,
    color_blend_attachment: vk::PipelineColorBlendAttachmentState,
    color_blend: ColorBlendState,
    dynamic_states: Vec<vk::DynamicState>,
    layout: vk::PipelineLayout,
}

impl PipelineDescriptor {
    fn new(stages: [ShaderStageDescriptor; 2], extent: vk::Extent2D, layout: vk::PipelineLayout) -> Self {
        let viewport = vk::Viewport::builder()
            .x(0.0)
            .y(0.0)
            .width(extent.width as f32)
            .height(extent.height as f32)
            .min_depth(0.0)
            .max_depth(1.0)
            .build();

        let scissor = vk::Rect2D::builder()
            .offset(vk::Offset2D { x: 0, y: 0 })
            .extent(extent)
            .build();

        // Blending off: the attachment writes the source color unchanged.
        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::all())
            .blend_enable(false)
            .src_color_blend_factor(vk::BlendFactor::ONE)
            .dst_color_blend_factor(vk::BlendFactor::ZERO)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD)
            .build();

        Self {
            stages,
            vertex_bindings: vec![],
            vertex_attributes: vec![],
            input_assembly: InputAssemblyState {
                topology: vk::PrimitiveTopology::TRIANGLE_LIST,
                primitive_restart_enable: false,
            },
            viewport,
            scissor,
            rasterization: RasterizationState {
                depth_clamp_enable: false,
                rasterizer_discard_enable: false,
                polygon_mode: vk::PolygonMode::FILL,
                line_width: 1.0,
                cull_mode: vk::CullModeFlags::BACK,
                front_face: vk::FrontFace::CLOCKWISE,
                depth_bias_enable: false,
            },
            multisample: MultisampleState {
                sample_shading_enable: false,
                rasterization_samples: vk::SampleCountFlags::_1,
            },
            color_blend_attachment,
            color_blend: ColorBlendState {
                logic_op_enable: false,
                logic_op: vk::LogicOp::COPY,
                blend_constants: [0.0, 0.0, 0.0, 0.0],
            },
            dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
            layout,
        }
    }

    pub fn stages(&self) -> &[ShaderStageDescriptor] {
        &self.stages
    }

    pub fn vertex_bindings(&self) -> &[vk::VertexInputBindingDescription] {
        &self.vertex_bindings
    }

    pub fn vertex_attributes(&self) -> &[vk::VertexInputAttributeDescription] {
        &self.vertex_attributes
    }

    pub fn input_assembly(&self) -> &InputAssemblyState {
        &self.input_assembly
    }

    pub fn viewport(&self) -> &vk::Viewport {
        &self.viewport
    }

    pub fn scissor(&self) -> &vk::Rect2D {
        &self.scissor
    }

    pub fn rasterization(&self) -> &RasterizationState {
        &self.rasterization
    }

    pub fn multisample(&self) -> &MultisampleState {
        &self.multisample
    }

    pub fn color_blend_attachment(&self) -> &vk::PipelineColorBlendAttachmentState {
        &self.color_blend_attachment
    }

    pub fn color_blend(&self) -> &ColorBlendState {
        &self.color_blend
    }

    pub fn dynamic_states(&self) -> &[vk::DynamicState] {
        &self.dynamic_states
    }

    pub fn is_dynamic(&self, state: vk::DynamicState) -> bool {
        self.dynamic_states.contains(&state)
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    // Create infos for the graphics pipeline, once a render pass exists.

    pub fn vertex_input_info(&self) -> vk::PipelineVertexInputStateCreateInfoBuilder<'_> {
        vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&self.vertex_bindings)
            .vertex_attribute_descriptions(&self.vertex_attributes)
    }

    pub fn input_assembly_info(&self) -> vk::PipelineInputAssemblyStateCreateInfoBuilder {
        vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(self.input_assembly.topology)
            .primitive_restart_enable(self.input_assembly.primitive_restart_enable)
    }

    pub fn viewport_info(&self) -> vk::PipelineViewportStateCreateInfoBuilder<'_> {
        vk::PipelineViewportStateCreateInfo::builder()
            .viewports(slice::from_ref(&self.viewport))
            .scissors(slice::from_ref(&self.scissor))
    }

    pub fn rasterization_info(&self) -> vk::PipelineRasterizationStateCreateInfoBuilder<'static> {
        let state = &self.rasterization;
        vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(state.depth_clamp_enable)
            .rasterizer_discard_enable(state.rasterizer_discard_enable)
            .polygon_mode(state.polygon_mode)
            .line_width(state.line_width)
            .cull_mode(state.cull_mode)
            .front_face(state.front_face)
            .depth_bias_enable(state.depth_bias_enable)
    }

    pub fn multisample_info(&self) -> vk::PipelineMultisampleStateCreateInfoBuilder<'static> {
        vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(self.multisample.sample_shading_enable)
            .rasterization_samples(self.multisample.rasterization_samples)
    }

    pub fn color_blend_info(&self) -> vk::PipelineColorBlendStateCreateInfoBuilder<'_> {
        vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(self.color_blend.logic_op_enable)
            .logic_op(self.color_blend.logic_op)
            .attachments(slice::from_ref(&self.color_blend_attachment))
            .blend_constants(self.color_blend.blend_constants)
    }

    pub fn dynamic_state_info(&self) -> vk::PipelineDynamicStateCreateInfoBuilder<'_> {
        vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&self.dynamic_states)
    }
}

#[derive(Debug)]
pub struct VulkanPipeline;

impl VulkanPipeline {
    /// Builds the pipeline descriptor and its layout.
    ///
    /// The shader modules only live for the duration of this call. The
    /// returned layout is owned by the caller.
    pub unsafe fn assemble(
        device: &Device,
        vertex_bytecode: &[u8],
        fragment_bytecode: &[u8],
        extent: vk::Extent2D,
    ) -> Result<PipelineDescriptor, InitError> {
        let vertex_shader_module =
            VulkanPipeline::create_shader_module(device, ShaderStage::Vertex, vertex_bytecode)?;
        let fragment_shader_module =
            match VulkanPipeline::create_shader_module(device, ShaderStage::Fragment, fragment_bytecode) {
                Ok(module) => module,
                Err(error) => {
                    device.destroy_shader_module(vertex_shader_module, None);
                    return Err(error);
                }
            };

        let vert_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_shader_module)
            .name(constants::SHADER_ENTRY_POINT);

        let frag_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(fragment_shader_module)
            .name(constants::SHADER_ENTRY_POINT);

        debug!(
            "Shader stages ready: {:?} ({} bytes), {:?} ({} bytes).",
            vert_stage.stage,
            vertex_bytecode.len(),
            frag_stage.stage,
            fragment_bytecode.len(),
        );

        // layout
        let layout_info = vk::PipelineLayoutCreateInfo::builder();
        let layout = device.create_pipeline_layout(&layout_info, None);

        // destroy shader modules
        device.destroy_shader_module(vertex_shader_module, None);
        device.destroy_shader_module(fragment_shader_module, None);

        let layout = layout.map_err(InitError::PipelineLayoutCreationFailed)?;

        let stages = [
            ShaderStageDescriptor {
                stage: ShaderStage::Vertex,
                entry_point: constants::SHADER_ENTRY_POINT,
                code_size: vertex_bytecode.len(),
            },
            ShaderStageDescriptor {
                stage: ShaderStage::Fragment,
                entry_point: constants::SHADER_ENTRY_POINT,
                code_size: fragment_bytecode.len(),
            },
        ];

        Ok(PipelineDescriptor::new(stages, extent, layout))
    }

    unsafe fn create_shader_module(
        device: &Device,
        stage: ShaderStage,
        bytecode: &[u8],
    ) -> Result<vk::ShaderModule, InitError> {
        let bytecode = validate_bytecode(stage, bytecode)?;
        let info = vk::ShaderModuleCreateInfo::builder()
            .code_size(bytecode.code_size())
            .code(bytecode.code());

        device
            .create_shader_module(&info, None)
            .map_err(|code| InitError::ShaderModuleCreationFailed {
                stage,
                reason: code.to_string(),
            })
    }
}

/// Rejects blobs that cannot be SPIR-V at all; the driver judges the rest.
fn validate_bytecode(stage: ShaderStage, bytecode: &[u8]) -> Result<Bytecode, InitError> {
    if bytecode.is_empty() {
        return Err(InitError::ShaderModuleCreationFailed {
            stage,
            reason: "bytecode is empty".to_string(),
        });
    }

    Bytecode::new(bytecode).map_err(|error| InitError::ShaderModuleCreationFailed {
        stage,
        reason: format!("malformed bytecode ({:?})", error),
    })
}
