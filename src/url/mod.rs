//! URL helpers
//!
//! Domain partitioning for the scheduler and wildcard domain matching for
//! link filtering. The scheduler never normalizes URLs; two spellings of the
//! same page are two distinct URLs.

mod domain;
mod matcher;

pub use domain::{domain_key, domain_key_of, extract_host};
pub use matcher::{matches_any, matches_wildcard};
