//! Data structures for the expression pipeline

mod classes;
mod count_matrix;
pub mod gene_id;

pub use classes::ClassTable;
pub use count_matrix::CountMatrix;
pub use gene_id::{gene_symbol, is_unannotated, GeneId};
