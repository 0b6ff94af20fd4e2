//! GPU plumbing: device/surface context, streaming mesh buffers, camera,
//! and the planet render pipeline.

mod camera;
mod context;
mod depth;
mod pipeline;
mod streaming;

pub use camera::Camera;
pub use context::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use depth::DepthBuffer;
pub use pipeline::{CameraUniform, PLANET_SHADER_SOURCE, PlanetPipeline, draw_planet};
pub use streaming::{DrawRange, StreamBufferError, StreamIndexBuffer, StreamVertexBuffer};
