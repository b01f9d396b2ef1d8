use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};
use vulkanalia::Device;

use super::error::InitError;
use super::lifecycle::ResourceLifecycle;

/// Creates one color view per swapchain image, tracking each as it is made.
///
/// The first failure aborts; views created before it stay tracked in
/// `lifecycle` and are released with everything else.
pub unsafe fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
    lifecycle: &mut ResourceLifecycle,
) -> Result<Vec<vk::ImageView>, InitError> {
    let mut views = Vec::with_capacity(images.len());

    for (index, image) in images.iter().enumerate() {
        let view = create_image_view(device, *image, format)
            .map_err(|code| InitError::ImageViewCreationFailed { index, code })?;

        let vk_device = device.clone();
        lifecycle.track(format!("swapchain image view {}", index), move || unsafe {
            vk_device.destroy_image_view(view, None)
        })?;

        views.push(view);
    }

    Ok(views)
}

unsafe fn create_image_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView, vk::ErrorCode> {
    let components = vk::ComponentMapping::builder()
        .r(vk::ComponentSwizzle::IDENTITY)
        .g(vk::ComponentSwizzle::IDENTITY)
        .b(vk::ComponentSwizzle::IDENTITY)
        .a(vk::ComponentSwizzle::IDENTITY);

    let subresource_range = vk::ImageSubresourceRange::builder()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1);

    let info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::_2D)
        .format(format)
        .components(components)
        .subresource_range(subresource_range);

    device.create_image_view(&info, None)
}
