//! Coefficient inference for fitted models.


pub use wald::{test_wald, test_wald_cox, wald_t, wald_z, WaldResult, Z_975};
