//! Image processing through the ImageMagick or GraphicsMagick command-line tools.
//!
//! The [`toolkit::Toolkit`] reads a source image with `identify`, collects
//! operations in an [`arguments::ExecArguments`] list and writes the result
//! with `convert`. Extensions hook into that workflow through
//! [`events::EventSubscriber`].

#![forbid(unsafe_code)]

pub mod arguments;
pub mod error;
pub mod events;
pub mod exec;
pub mod help;
pub mod identify;
pub mod logging;
pub mod platform;
pub mod settings;
pub mod toolkit;
