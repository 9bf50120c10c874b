//! Zero handling before log-ratio transforms.

pub mod pseudocount;

pub use pseudocount::add_pseudocount;
