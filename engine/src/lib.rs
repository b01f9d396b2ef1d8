use anyhow::{Context, Result};
use log::*;
use renderer::Renderer;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

pub mod config;
mod renderer;
pub mod vulkan;

pub use config::EngineConfig;
pub use vulkan::InitError;

/// The window, its event loop and the Vulkan state built for it.
///
/// Inside `run` the renderer is destroyed from the event loop, on close or at
/// the latest when the loop exits, so it never outlives the window it presents
/// to. Before `run`, field order drops the renderer first.
#[derive(Debug)]
pub struct Engine {
    renderer: Renderer,
    window: Window,
    event_loop: EventLoop<()>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Engine> {
        // Window
        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(config.window_title.as_str())
            .with_inner_size(LogicalSize::new(config.window_width, config.window_height))
            .with_resizable(false)
            .build(&event_loop)?;

        let renderer = unsafe { Renderer::create(&window, &config) }
            .context("Vulkan initialization failed")?;

        Ok(Engine {
            renderer,
            window,
            event_loop,
        })
    }

    pub fn run(mut self) -> Result<()> {
        self.event_loop.run(move |event, elwt| match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                info!("Close requested for `{:?}`.", self.window.id());
                elwt.exit();
                unsafe {
                    self.renderer.destroy();
                }
            }
            Event::LoopExiting if !self.renderer.is_destroyed() => unsafe {
                self.renderer.destroy();
            },
            _ => {}
        })?;

        Ok(())
    }
}
