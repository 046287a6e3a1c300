//! Clip-to-GIF conversion.
//!
//! This module turns a [`ConversionRequest`] into an ordered engine argument
//! list and runs it through the staged-file protocol:
//!
//! - Parameter validation (trim window, frame rate, quality tier)
//! - Instruction assembly for the two-pass palette GIF encode
//! - Execution against the single engine instance
//!
//! # Instruction layout
//!
//! ```text
//! -ss <start> -t <duration>
//! -i input.mp4
//! -vf fps=<fps>,scale=<width>:-1:flags=lanczos,split[a][b];[a]palettegen[p];[b][p]paletteuse
//! -f gif
//! output.gif
//! ```

mod builder;
mod instructions;
mod request;

pub use builder::{ConversionRequestBuilder, ConversionResult, INPUT_NAME, OUTPUT_NAME};
pub use instructions::{plan, Directive, FilterChain, Instructions};
pub use request::{ConversionParams, ConversionRequest, ParamOverrides, SourcePayload};
