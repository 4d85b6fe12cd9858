// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for configuration settings.
//!
//! This module is the single source of truth for the values used when a
//! setting is absent from `settings.toml`.

// ==========================================================================
// Sanitizer Defaults
// ==========================================================================

/// Fully decode uploads before stripping them, so corrupt pixel data is
/// rejected instead of being rewritten.
pub const DEFAULT_VERIFY_DECODE: bool = true;

/// Re-embed the ICC colour profile after stripping metadata.
pub const DEFAULT_PRESERVE_ICC_PROFILE: bool = true;
