//! Data structures for cohort sweeps.

mod count_matrix;
mod design_matrix;
mod formula;
mod frame;
mod metadata;
mod result;
mod taxonomy;
mod tree;

pub use count_matrix::CountMatrix;
pub use design_matrix::{DesignMatrix, INTERCEPT};
pub use formula::Formula;
pub use frame::{AnalysisFrame, Column, ColumnData, ColumnOrigin};
pub(crate) use frame::format_number;
pub use metadata::{Metadata, Variable, VariableType, SAMPLE_ID_COLUMN};
pub use result::{AnalysisRow, ResultTable, HEADER};
pub use taxonomy::TaxonomyMap;
pub use tree::{PhyloTree, TreeNode};
