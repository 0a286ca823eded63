//! Small ordered-container utilities shared by the DAG, history, and
//! aggregation executor.

#![forbid(unsafe_code)]

mod flat_multivec;
mod sorted_vec;

pub use flat_multivec::FlatMultivec;
pub use sorted_vec::SortedVec;
