pub mod render;
pub mod scene;

pub use render::{blit_centered, load_font, render_text_pixmap, FrameStats, Layout, SkiaRenderer};
pub use scene::{RedrawGate, Scene};
