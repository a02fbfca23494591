//! UI rendering components.

pub mod input;
mod layout;
pub mod logs;
pub mod output;

pub use layout::render;
