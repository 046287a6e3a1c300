//! Gifsmith-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across gifsmith:
//!
//! - **Quality presets**: The closed set of [`QualityTier`]s and their fixed
//!   [`QualityProfile`] table
//! - **Media types**: Functions to map file extensions to media types and to
//!   recognize video payloads
//! - **Units**: Human-readable byte formatting for progress messages
//! - **Error Handling**: The unified error type and result alias
//!
//! # Examples
//!
//! ```
//! use gifsmith_common::{QualityTier, Error, Result};
//! use gifsmith_common::paths::is_video_media_type;
//!
//! let tier: QualityTier = "high".parse().unwrap();
//! assert_eq!(tier.profile().target_width, 640);
//!
//! assert!(is_video_media_type("video/mp4"));
//!
//! fn example() -> Result<()> {
//!     Err(Error::invalid_parameter("duration must be greater than zero"))
//! }
//! ```

pub mod error;
pub mod paths;
pub mod quality;
pub mod units;

pub use error::{Error, Result};
pub use quality::{QualityProfile, QualityTier};
