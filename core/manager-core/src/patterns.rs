//! Compiled regex patterns for normalizing shell output and resolving
//! build descriptor placeholders.
//!
//! These patterns are compiled once on first use.

use once_cell::sync::Lazy;
use regex::Regex;

// ═══════════════════════════════════════════════════════════════════════════════
// Shell Output
// ═══════════════════════════════════════════════════════════════════════════════

/// ANSI escape sequences: CSI sequences (`ESC [ ... final`) and two-byte escapes.
pub static RE_ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1B(?:\[[0-?]*[ -/]*[@-~]|[@-Z\\-_])").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Build Descriptors
// ═══════════════════════════════════════════════════════════════════════════════

/// `${property.name}` placeholders in descriptor values.
pub static RE_PROPERTY_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());
