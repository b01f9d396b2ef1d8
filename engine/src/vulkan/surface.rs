use vulkanalia::prelude::v1_0::*;
use vulkanalia::window as vk_window;
use winit::window::Window;

/// The windowing side of initialization: whatever owns the OS window hands the
/// core its surface, the instance extensions that surface needs, and the
/// current framebuffer size in pixels.
pub trait PresentationTarget {
    fn required_instance_extensions(&self) -> &'static [&'static vk::ExtensionName];

    /// # Safety
    ///
    /// `instance` must outlive the returned surface.
    unsafe fn create_surface(&self, instance: &Instance) -> VkResult<vk::SurfaceKHR>;

    fn framebuffer_size(&self) -> (u32, u32);
}

impl PresentationTarget for Window {
    fn required_instance_extensions(&self) -> &'static [&'static vk::ExtensionName] {
        vk_window::get_required_instance_extensions(self)
    }

    unsafe fn create_surface(&self, instance: &Instance) -> VkResult<vk::SurfaceKHR> {
        vk_window::create_surface(instance, self, self)
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}
