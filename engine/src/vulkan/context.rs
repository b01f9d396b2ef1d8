use vulkanalia::vk;

use super::device::SelectedDevice;
use super::swapchain::{SwapchainConfig, VulkanSwapchain};

/// The Vulkan handles and negotiated properties produced by initialization.
#[derive(Debug)]
pub struct VulkanContext {
    pub surface: vk::SurfaceKHR,
    pub selected_device: SelectedDevice,
    pub swapchain_config: SwapchainConfig,
    pub swapchain: VulkanSwapchain,
    pub swapchain_image_views: Vec<vk::ImageView>,
}
