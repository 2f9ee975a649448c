//! PEMU Core Library
//!
//! Leaf types shared by the engine driver and its front ends:
//! - dotted [`Version`]s and the [`SupportedRange`] of engine versions
//! - [`DiagnosticRecord`] parsing of engine error lines
//! - [`Settings`], the [`OutputChannel`] and status-button rules

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod output;
pub mod status;
pub mod telemetry;
pub mod version;

pub use config::{RevealStrategy, Settings};
pub use diagnostic::{DiagnosticRecord, Position, UNKNOWN_FILE};
pub use error::{PemuError, Result};
pub use output::{BufferSink, OutputChannel, OutputSink, WriterSink};
pub use status::{default_buttons, visible_buttons, EditorSnapshot, StatusButton, VisibilityRule};
pub use telemetry::init_tracing;
pub use version::{compare, Compatibility, SupportedRange, Version, VersionError};
