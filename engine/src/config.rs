use std::path::PathBuf;

use vulkanalia::vk;

use crate::vulkan::constants;

/// Everything the initialization sequence needs to know up front.
///
/// Passed by value into [`crate::Engine::new`]; nothing here is read from
/// process-wide state.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub application_name: String,
    pub application_version: (u32, u32, u32),
    pub engine_name: String,
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub required_layers: Vec<vk::ExtensionName>,
    pub required_device_extensions: Vec<vk::ExtensionName>,
    pub diagnostics_enabled: bool,
    pub preferred_surface_format: vk::Format,
    pub preferred_color_space: vk::ColorSpaceKHR,
    pub shader_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            application_name: "Prism".to_string(),
            application_version: (1, 0, 0),
            engine_name: "Prism Engine".to_string(),
            window_title: "Prism".to_string(),
            window_width: 800,
            window_height: 600,
            required_layers: vec![constants::VALIDATION_LAYER],
            required_device_extensions: vec![vk::KHR_SWAPCHAIN_EXTENSION.name],
            diagnostics_enabled: cfg!(debug_assertions),
            preferred_surface_format: vk::Format::B8G8R8A8_SRGB,
            preferred_color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            shader_dir: PathBuf::from("shaders"),
        }
    }
}

impl EngineConfig {
    /// Layers actually enabled on the instance. Layers only matter for
    /// diagnostics, so none are requested when diagnostics are off.
    pub fn enabled_layers(&self) -> &[vk::ExtensionName] {
        if self.diagnostics_enabled {
            &self.required_layers
        } else {
            &[]
        }
    }
}
