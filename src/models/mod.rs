pub mod gemini;
pub mod image;
pub mod proxy;
pub mod volcengine;

pub use image::*;
pub use proxy::*;
pub use volcengine::GeneratedImage;
