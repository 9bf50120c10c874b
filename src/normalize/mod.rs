//! Compositional normalization.
//!
//! - **TSS**: total sum scaling to relative abundances
//! - **CLR**: centered log-ratio on pseudocounted relative abundances, with
//!   its inverse

pub mod clr;
pub mod tss;

pub use clr::{clr_inverse, norm_clr, norm_clr_with_pseudocount, TransformedMatrix};
pub use tss::{norm_tss, relative_abundance, TssMatrix};
