//! URL handling: normalization and crawl scope policy
//!
//! Normalization turns every discovered link into a canonical form before it
//! touches the frontier's visited-set, so two spellings of the same page are
//! one node. The scope policy decides which hosts a crawl may follow links
//! into.

mod normalize;
mod scope;

pub use normalize::normalize_url;
pub use scope::{DomainScope, ScopePolicy};
