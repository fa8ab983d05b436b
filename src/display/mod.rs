//! Live terminal display of execution events.
//!
//! - [`DisplayConfig`]: mode, persistence, timing and output target
//! - [`Surface`]: where frames go ([`TermSurface`] for terminals and pipes,
//!   [`BufferSurface`] for capture)
//! - [`LiveDisplay`]: lifecycle driver and background consumption loop

mod config;
mod driver;
mod surface;

pub use config::{DisplayConfig, DisplayMode, OutputTarget, MIN_INTERVAL};
pub use driver::LiveDisplay;
pub use surface::{BufferSurface, Surface, TermSurface};
