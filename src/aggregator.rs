//! The aggregator contract: a reducer over a finite column view within one
//! emitted window.

#![forbid(unsafe_code)]

/// Reduces `n` rows across a set of bound columns into a fixed-size output.
///
/// `cols[i]` points at the first element of the `i`-th bound column's
/// *window*, i.e. already offset to the window's start; the aggregator may
/// read `cols[i][0..n]`. Raw pointers are used here (rather than `&[&[V]]`
/// as in [`crate::Operator::on_data`]) because the aggregation executor's
/// column buffers are independent `Vec<V>`s, not sub-ranges of one
/// contiguous buffer, so there is no single lifetime a slice-of-slices could
/// borrow from that would also let the executor mutate other groups'
/// buffers in between calls.
///
/// # Safety
/// Implementations must only read `cols[i][0..n]` for each `i <
/// num_inputs()`, and only for the duration of the call.
pub trait Aggregator<V> {
    /// Number of columns this aggregator reads.
    fn num_inputs(&self) -> usize;

    /// Number of scalar outputs this aggregator produces.
    fn num_outputs(&self) -> usize;

    /// Reduces `n` rows of the bound columns into `out` (length
    /// `num_outputs()`).
    fn on_data(&mut self, n: usize, cols: &[*const V], out: &mut [V]);

    /// Resets any internal state to its freshly constructed value.
    fn reset(&mut self);
}
