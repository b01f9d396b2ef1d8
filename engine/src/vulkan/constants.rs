use vulkanalia::vk;

pub const VALIDATION_LAYER: vk::ExtensionName =
    vk::ExtensionName::from_bytes(b"VK_LAYER_KHRONOS_validation");

/// Instance extensions and creation flag demanded by the portability platform.
pub const PORTABILITY_REQUIRED: bool = cfg!(target_os = "macos");

/// Reported as `currentExtent` when the surface lets the swapchain pick its size.
pub const UNDEFINED_EXTENT: u32 = u32::MAX;

pub const SHADER_ENTRY_POINT: &[u8] = b"main\0";
