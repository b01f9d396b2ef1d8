use winit::window::Window;

use crate::config::EngineConfig;
use crate::vulkan::{InitError, ShaderDirectory, VulkanRenderer};

#[derive(Debug)]
pub struct Renderer {
    pub vk_renderer: VulkanRenderer,
}

impl Renderer {
    /// Brings Vulkan up to a pipeline that is ready for a render pass.
    pub unsafe fn create(window: &Window, config: &EngineConfig) -> Result<Self, InitError> {
        let shaders = ShaderDirectory::new(&config.shader_dir);
        let vk_renderer = VulkanRenderer::new(window, &shaders, config)?;

        Ok(Self { vk_renderer })
    }

    /// Destroys our Vulkan app.
    pub unsafe fn destroy(&mut self) {
        self.vk_renderer.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.vk_renderer.is_destroyed()
    }
}
