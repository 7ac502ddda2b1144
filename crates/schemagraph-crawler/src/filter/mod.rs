//! Include/exclude filtering of crawled objects
//!
//! The same policy bounds what the crawler requests from the metadata source
//! and what the builder retains, so both stay consistent.

mod rules;


pub use rules::{
    FilterConfig, IncludeAll, InclusionFilter, InclusionPolicy, KindRules, NamePattern, ObjectKind,
};
