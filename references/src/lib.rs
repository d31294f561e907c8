//! # Mention References
//!
//! This crate holds the data model shared by every part of the mention
//! system and the pure text scanning that finds `@`-tokens in chat input.
//!
//! ## Features
//!
//! - **References**: Resolved files, folders and links with display metadata
//! - **Shared Handles**: Link references that are patched after enrichment
//! - **Token Scanning**: `@file:`, `@folder:`, `@link:` and bare `@text`
//! - **Completion Tokens**: The partial token under the composer's cursor
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Mention References                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  find_matches ──► Match ──► (resolvers) ──► Reference          │
//! │       │                                        │                │
//! │       ▼                                        ▼                │
//! │  partial_token                   SharedReference / format      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod matcher;
pub mod reference;

pub use error::{ReferenceError, Result};
pub use matcher::{Match, PartialToken, find_matches, looks_like_link, partial_token};
pub use reference::{
    Reference, ReferenceKind, ReferenceMetadata, ResourceLocator, SharedReference,
};

/// Render a reference back into composer text, e.g. `@file:/repo/src/main.rs`.
pub fn format_reference(reference: &Reference) -> String {
    format!("@{}:{}", reference.kind, reference.value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_reference_round_trips_through_matcher() {
        let references = [
            Reference::new(ReferenceKind::File, "/repo/src/main.rs", "main.rs"),
            Reference::new(ReferenceKind::Folder, "/repo/src", "src"),
            Reference::new(ReferenceKind::Link, "https://example.com/", "example.com"),
        ];

        for reference in references {
            let formatted = format_reference(&reference);
            let matches: Vec<Match> = find_matches(&formatted).collect();

            assert_eq!(matches.len(), 1, "formatted: {formatted}");
            assert_eq!(matches[0].declared_kind, Some(reference.kind));
            assert_eq!(matches[0].raw_value, reference.value());
        }
    }

    #[test]
    fn test_format_reference_shape() {
        let reference = Reference::new(ReferenceKind::Folder, "/repo/docs", "docs");
        assert_eq!(format_reference(&reference), "@folder:/repo/docs");
    }
}
