//! ufconvert Core Library
//!
//! Transforms an exported user flow policy set into a custom-policy set that
//! can be imported into another tenant: first-party identifiers are
//! tokenized, unreferenced objects can be swept out, policy ids and tenants
//! are normalized, and oversized policies are split into base fragments.

pub mod convert;
pub mod dom;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod prune;
pub mod query;
pub mod schema;
pub mod split;
pub mod sweep;
pub mod tokenize;
