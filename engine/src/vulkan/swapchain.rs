use log::*;
use vulkanalia::vk::{self, Handle, HasBuilder, KhrSurfaceExtension, KhrSwapchainExtension};
use vulkanalia::{Device, Instance, VkResult};

use super::constants;
use super::device::QueueFamilies;
use super::error::InitError;

/// What a `(device, surface)` pair supports right now. Queried fresh whenever
/// it is needed.
#[derive(Clone, Debug)]
pub struct SurfaceCapabilitiesSnapshot {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceCapabilitiesSnapshot {
    pub unsafe fn get(
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Self> {
        Ok(Self {
            capabilities: instance
                .get_physical_device_surface_capabilities_khr(physical_device, surface)?,
            formats: instance.get_physical_device_surface_formats_khr(physical_device, surface)?,
            present_modes: instance
                .get_physical_device_surface_present_modes_khr(physical_device, surface)?,
        })
    }
}

/// The negotiated swapchain parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapchainConfig {
    pub image_count: u32,
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub sharing_mode: vk::SharingMode,
    /// Only populated for concurrent sharing.
    pub queue_family_indices: Vec<u32>,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

/// Resolves a concrete swapchain configuration from what the surface supports.
///
/// `framebuffer_size` is only consulted when the surface leaves the extent up
/// to the application.
pub fn negotiate(
    snapshot: &SurfaceCapabilitiesSnapshot,
    preferred_format: vk::Format,
    preferred_color_space: vk::ColorSpaceKHR,
    framebuffer_size: impl FnOnce() -> (u32, u32),
    queue_families: QueueFamilies,
) -> SwapchainConfig {
    let surface_format = choose_surface_format(&snapshot.formats, preferred_format, preferred_color_space);
    let (sharing_mode, queue_family_indices) = choose_sharing_mode(queue_families);

    SwapchainConfig {
        image_count: choose_image_count(&snapshot.capabilities),
        format: surface_format.format,
        color_space: surface_format.color_space,
        extent: choose_extent(&snapshot.capabilities, framebuffer_size),
        present_mode: choose_present_mode(&snapshot.present_modes),
        sharing_mode,
        queue_family_indices,
        pre_transform: snapshot.capabilities.current_transform,
    }
}

/// The exact preferred pair if offered, otherwise whatever the surface lists
/// first. `formats` must not be empty; device selection guarantees that.
pub fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    preferred_format: vk::Format,
    preferred_color_space: vk::ColorSpaceKHR,
) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .cloned()
        .find(|f| f.format == preferred_format && f.color_space == preferred_color_space)
        .unwrap_or_else(|| formats[0])
}

/// Mailbox when available. FIFO is always supported, so it is the fallback.
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    present_modes
        .iter()
        .cloned()
        .find(|m| *m == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    framebuffer_size: impl FnOnce() -> (u32, u32),
) -> vk::Extent2D {
    if capabilities.current_extent.width != constants::UNDEFINED_EXTENT
        || capabilities.current_extent.height != constants::UNDEFINED_EXTENT
    {
        capabilities.current_extent
    } else {
        let (width, height) = framebuffer_size();
        vk::Extent2D {
            width: width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// One more than the minimum so acquiring never waits on the driver, capped
/// by the maximum. A maximum of zero means there is none.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count.saturating_add(1);
    if capabilities.max_image_count != 0 && count > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        count
    }
}

pub fn choose_sharing_mode(queue_families: QueueFamilies) -> (vk::SharingMode, Vec<u32>) {
    if queue_families.is_same_family() {
        (vk::SharingMode::EXCLUSIVE, vec![])
    } else {
        (
            vk::SharingMode::CONCURRENT,
            vec![queue_families.graphics, queue_families.present],
        )
    }
}

#[derive(Debug)]
pub struct VulkanSwapchain {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
}

impl VulkanSwapchain {
    pub unsafe fn create(
        device: &Device,
        surface: vk::SurfaceKHR,
        config: &SwapchainConfig,
    ) -> Result<VulkanSwapchain, InitError> {
        info!(
            "Creating swapchain: {} images, {:?}/{:?}, {}x{}, {:?}, {:?}.",
            config.image_count,
            config.format,
            config.color_space,
            config.extent.width,
            config.extent.height,
            config.present_mode,
            config.sharing_mode,
        );

        let info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(config.image_count)
            .image_format(config.format)
            .image_color_space(config.color_space)
            .image_extent(config.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(config.sharing_mode)
            .queue_family_indices(&config.queue_family_indices)
            .pre_transform(config.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(config.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let swapchain = device
            .create_swapchain_khr(&info, None)
            .map_err(InitError::SwapchainCreationFailed)?;

        let images = match device.get_swapchain_images_khr(swapchain) {
            Ok(images) => images,
            Err(code) => {
                device.destroy_swapchain_khr(swapchain, None);
                return Err(InitError::QueryFailed {
                    query: "swapchain images",
                    code,
                });
            }
        };

        Ok(VulkanSwapchain { swapchain, images })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    fn capabilities(min: u32, max: u32, current: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D { width: current.0, height: current.1 },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        }
    }

    const SRGB: vk::ColorSpaceKHR = vk::ColorSpaceKHR::SRGB_NONLINEAR;
    const SAME_FAMILY: QueueFamilies = QueueFamilies { graphics: 0, present: 0 };

    #[test]
    fn preferred_format_is_found_anywhere_in_the_list() {
        let preferred = format(vk::Format::B8G8R8A8_SRGB, SRGB);
        let mut formats = vec![
            format(vk::Format::R8G8B8A8_UNORM, SRGB),
            format(vk::Format::B8G8R8A8_UNORM, SRGB),
            format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
        ];
        for position in 0..=formats.len() {
            let mut list = formats.clone();
            list.insert(position, preferred);
            assert_eq!(choose_surface_format(&list, vk::Format::B8G8R8A8_SRGB, SRGB), preferred);
        }

        formats.truncate(1);
        assert_eq!(
            choose_surface_format(&formats, vk::Format::B8G8R8A8_SRGB, SRGB),
            formats[0]
        );
    }

    #[test]
    fn format_match_requires_both_format_and_color_space() {
        let formats = vec![
            format(vk::Format::R8G8B8A8_UNORM, SRGB),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
        ];
        assert_eq!(
            choose_surface_format(&formats, vk::Format::B8G8R8A8_SRGB, SRGB),
            formats[0]
        );
    }

    #[test]
    fn mailbox_is_preferred() {
        let modes = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
        ];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn fifo_is_the_fallback() {
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO_RELAXED]),
            vk::PresentModeKHR::FIFO
        );
        assert_eq!(choose_present_mode(&[vk::PresentModeKHR::FIFO]), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn surface_dictated_extent_ignores_framebuffer() {
        let caps = capabilities(2, 0, (1280, 720));
        let extent = choose_extent(&caps, || (10_000, 3));
        assert_eq!((extent.width, extent.height), (1280, 720));
    }

    #[test]
    fn undefined_extent_clamps_framebuffer_per_component() {
        let caps = capabilities(2, 0, (u32::MAX, u32::MAX));

        let extent = choose_extent(&caps, || (800, 600));
        assert_eq!((extent.width, extent.height), (800, 600));

        let extent = choose_extent(&caps, || (10_000, 0));
        assert_eq!((extent.width, extent.height), (4096, 1));
    }

    #[test]
    fn framebuffer_is_not_queried_when_extent_is_fixed() {
        let caps = capabilities(2, 0, (640, 480));
        let mut queried = false;
        choose_extent(&caps, || {
            queried = true;
            (0, 0)
        });
        assert!(!queried);
    }

    #[test]
    fn image_count_is_one_above_minimum_within_ceiling() {
        for min in 1..6 {
            assert_eq!(choose_image_count(&capabilities(min, 0, (1, 1))), min + 1);
        }
        assert_eq!(choose_image_count(&capabilities(2, 8, (1, 1))), 3);
        assert_eq!(choose_image_count(&capabilities(3, 3, (1, 1))), 3);
        assert_eq!(choose_image_count(&capabilities(2, 3, (1, 1))), 3);
    }

    #[test]
    fn image_count_does_not_overflow_at_the_limit() {
        let max = u32::MAX;
        assert_eq!(choose_image_count(&capabilities(max, max, (1, 1))), max);
        assert_eq!(choose_image_count(&capabilities(max, 0, (1, 1))), max);
    }

    #[test]
    fn distinct_families_share_concurrently() {
        let (mode, indices) = choose_sharing_mode(QueueFamilies { graphics: 0, present: 1 });
        assert_eq!(mode, vk::SharingMode::CONCURRENT);
        assert_eq!(indices, vec![0, 1]);

        let (mode, indices) = choose_sharing_mode(SAME_FAMILY);
        assert_eq!(mode, vk::SharingMode::EXCLUSIVE);
        assert!(indices.is_empty());
    }

    #[test]
    fn negotiates_windowed_surface() {
        let snapshot = SurfaceCapabilitiesSnapshot {
            capabilities: capabilities(2, 0, (u32::MAX, u32::MAX)),
            formats: vec![
                format(vk::Format::R8G8B8_UNORM, SRGB),
                format(vk::Format::B8G8R8_SRGB, SRGB),
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };

        let config = negotiate(&snapshot, vk::Format::B8G8R8_SRGB, SRGB, || (800, 600), SAME_FAMILY);

        assert_eq!(
            config,
            SwapchainConfig {
                image_count: 3,
                format: vk::Format::B8G8R8_SRGB,
                color_space: SRGB,
                extent: vk::Extent2D { width: 800, height: 600 },
                present_mode: vk::PresentModeKHR::FIFO,
                sharing_mode: vk::SharingMode::EXCLUSIVE,
                queue_family_indices: vec![],
                pre_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            }
        );
    }
}
