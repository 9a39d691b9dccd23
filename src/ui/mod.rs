//! Terminal User Interface module.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and signal handling
//! - `keys` - Byte stream to key decoding
//! - `input` - Key dispatch for reading and editing modes
//! - `display` - Display engine owning screen content and navigation
//! - `viewport` - Cursor/window arithmetic and the position stack
//! - `reflow` - Word wrapping of styled text into the grid
//! - `compositor` - Frame painting
//! - `edit` - Single-line edit buffer for typed feed URLs
//! - `status` - Bottom bar messages and their timers
//! - `tasks` - Background reloads
//! - `events` - Background task event processing

pub mod ansi;
pub mod compositor;
pub mod display;
pub mod edit;
mod events;
mod input;
pub mod keys;
mod loop_runner;
pub mod reflow;
pub mod status;
pub mod tasks;
pub mod viewport;

// Re-export the public API
pub use display::{DisplayEngine, EngineOptions, Motion};
pub use events::handle_app_event;
pub use input::handle_key;
pub use keys::{ByteSource, Key, KeyDecoder, ReadSource};
pub use loop_runner::{run, Action};
pub use status::Tone;
pub use viewport::Screen;
