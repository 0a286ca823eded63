//! The aggregation executor: column buffers + a window policy + aggregator
//! fan-out, independent of the streaming [`crate::Engine`].

use crate::aggregator::Aggregator;
use crate::error::AggExecError;
use crate::tick::Tick;
use crate::util::FlatMultivec;
use crate::window::{Window, WindowSpec};

/// Identifies one independent group (e.g. one symbol) within an
/// [`AggExecutor`]. Groups never share column buffers or window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

impl GroupId {
    /// Wraps a raw group index.
    pub const fn new(raw: usize) -> Self {
        GroupId(raw)
    }

    /// The group's raw index.
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

/// Construction-time specification for an [`AggExecutor`].
pub struct AggExecSpec<T, V, W> {
    /// Number of input columns every group's rows carry.
    pub num_columns: usize,
    /// Number of independent groups to allocate.
    pub num_groups: usize,
    /// The aggregators to run over each window, in output order.
    pub aggregators: Vec<Box<dyn Aggregator<V>>>,
    /// Per-aggregator bound column indices, one row per entry in
    /// `aggregators`.
    pub column_bindings: FlatMultivec<usize>,
    /// Window policy instance cloned once per group.
    pub window_template: W,
    _tick: std::marker::PhantomData<T>,
}

impl<T, V, W> AggExecSpec<T, V, W> {
    /// Builds a spec. `column_bindings` must have exactly one row per entry
    /// in `aggregators`.
    pub fn new(
        num_columns: usize,
        num_groups: usize,
        aggregators: Vec<Box<dyn Aggregator<V>>>,
        column_bindings: FlatMultivec<usize>,
        window_template: W,
    ) -> Self {
        Self {
            num_columns,
            num_groups,
            aggregators,
            column_bindings,
            window_template,
            _tick: std::marker::PhantomData,
        }
    }
}

struct GroupState<T, V, W> {
    columns: Vec<Vec<V>>,
    window: W,
    accumulator: Vec<V>,
    last_emitted: Option<WindowSpec<T>>,
}

/// Drives one or more groups' worth of column buffers through a shared
/// window policy template and a shared aggregator set.
pub struct AggExecutor<T, V, W> {
    num_columns: usize,
    aggregators: Vec<Box<dyn Aggregator<V>>>,
    column_bindings: FlatMultivec<usize>,
    output_offsets: Vec<usize>,
    total_outputs: usize,
    groups: Vec<GroupState<T, V, W>>,
}

impl<T: Tick, V: Copy + Default, W: Window<T, V>> AggExecutor<T, V, W> {
    /// Validates `spec` and allocates per-group state.
    pub fn new(spec: AggExecSpec<T, V, W>) -> Result<Self, AggExecError> {
        if spec.num_groups == 0 {
            return Err(AggExecError::ZeroGroups);
        }
        let mut output_offsets = Vec::with_capacity(spec.aggregators.len());
        let mut total_outputs = 0usize;
        for (j, agg) in spec.aggregators.iter().enumerate() {
            let bound = spec.column_bindings.row(j);
            if bound.len() != agg.num_inputs() {
                return Err(AggExecError::ArityMismatch {
                    aggregator: j,
                    expected: agg.num_inputs(),
                    got: bound.len(),
                });
            }
            for &col in bound {
                if col >= spec.num_columns {
                    return Err(AggExecError::ColumnOutOfRange {
                        aggregator: j,
                        col,
                        num_columns: spec.num_columns,
                    });
                }
            }
            output_offsets.push(total_outputs);
            total_outputs += agg.num_outputs();
        }

        let groups = (0..spec.num_groups)
            .map(|_| GroupState {
                columns: vec![Vec::new(); spec.num_columns],
                window: spec.window_template.clone(),
                accumulator: vec![V::default(); total_outputs],
                last_emitted: None,
            })
            .collect();

        Ok(Self {
            num_columns: spec.num_columns,
            aggregators: spec.aggregators,
            column_bindings: spec.column_bindings,
            output_offsets,
            total_outputs,
            groups,
        })
    }

    fn emit_current_window(&mut self, group: GroupId, spec: WindowSpec<T>) {
        let g = &mut self.groups[group.as_usize()];
        let col_len = g.columns[0].len();
        let w_start = col_len - spec.size as usize;

        for (j, agg) in self.aggregators.iter_mut().enumerate() {
            let bound = self.column_bindings.row(j);
            let ptrs: Vec<*const V> = bound
                .iter()
                .map(|&c| unsafe { g.columns[c].as_ptr().add(w_start) })
                .collect();
            let offset = self.output_offsets[j];
            let width = agg.num_outputs();
            agg.on_data(spec.size as usize, &ptrs, &mut g.accumulator[offset..offset + width]);
        }

        g.last_emitted = Some(spec);
        if spec.evict > 0 {
            let evict = spec.evict as usize;
            for col in g.columns.iter_mut() {
                col.drain(0..evict);
            }
        }
    }

    /// Feeds one row to `group`'s column buffers and window policy.
    /// Returns the emission timestamp if a window fired.
    pub fn on_data(&mut self, tick: T, row: &[V], group: GroupId) -> Option<T> {
        debug_assert_eq!(row.len(), self.num_columns, "row width mismatch");
        let ready = {
            let g = &mut self.groups[group.as_usize()];
            for (c, &v) in row.iter().enumerate() {
                g.columns[c].push(v);
            }
            g.window.process(tick, row)
        };
        if !ready {
            return None;
        }
        let spec = self.groups[group.as_usize()].window.emit();
        self.emit_current_window(group, spec);
        Some(spec.timestamp)
    }

    /// Forces emission of whatever is currently buffered for `group`.
    /// Returns the emission timestamp if anything was produced.
    pub fn flush(&mut self, group: GroupId) -> Option<T> {
        let ready = self.groups[group.as_usize()].window.flush();
        if !ready {
            return None;
        }
        let spec = self.groups[group.as_usize()].window.emit();
        self.emit_current_window(group, spec);
        Some(spec.timestamp)
    }

    /// Copies `group`'s current accumulator into `out` (length
    /// `total_outputs()`), returning the tick of the last emission, if any.
    pub fn value(&self, out: &mut [V], group: GroupId) -> Option<T> {
        let g = &self.groups[group.as_usize()];
        out.copy_from_slice(&g.accumulator);
        g.last_emitted.map(|s| s.timestamp)
    }

    /// Total number of scalar outputs across all aggregators.
    pub fn total_outputs(&self) -> usize {
        self.total_outputs
    }

    /// Resets every group's column buffers, window, and accumulator, and
    /// every aggregator's internal state.
    pub fn reset(&mut self) {
        for agg in self.aggregators.iter_mut() {
            agg.reset();
        }
        for g in self.groups.iter_mut() {
            for col in g.columns.iter_mut() {
                col.clear();
            }
            g.window.reset();
            g.accumulator.iter_mut().for_each(|v| *v = V::default());
            g.last_emitted = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct CounterWindow {
        n: u64,
        count: u64,
        last_tick: Option<u64>,
    }

    impl CounterWindow {
        fn new(n: u64) -> Self {
            Self { n, count: 0, last_tick: None }
        }
    }

    impl Window<u64, f64> for CounterWindow {
        fn process(&mut self, tick: u64, _row: &[f64]) -> bool {
            self.count += 1;
            self.last_tick = Some(tick);
            self.count == self.n
        }

        fn flush(&mut self) -> bool {
            if self.count == 0 {
                false
            } else {
                true
            }
        }

        fn emit(&self) -> WindowSpec<u64> {
            WindowSpec {
                timestamp: self.last_tick.unwrap_or(0),
                size: self.count,
                evict: self.count,
            }
        }

        fn reset(&mut self) {
            self.count = 0;
            self.last_tick = None;
        }
    }

    struct SumAgg;

    impl Aggregator<f64> for SumAgg {
        fn num_inputs(&self) -> usize {
            1
        }
        fn num_outputs(&self) -> usize {
            1
        }
        fn on_data(&mut self, n: usize, cols: &[*const V], out: &mut [f64]) {
            let mut total = 0.0;
            for i in 0..n {
                total += unsafe { *cols[0].add(i) };
            }
            out[0] = total;
        }
        fn reset(&mut self) {}
    }

    type V = f64;

    fn make_executor() -> AggExecutor<u64, f64, CounterWindow> {
        let mut bindings = FlatMultivec::new();
        bindings.push_row([0usize]);
        let spec = AggExecSpec::new(1, 1, vec![Box::new(SumAgg)], bindings, CounterWindow::new(3));
        AggExecutor::new(spec).unwrap()
    }

    #[test]
    fn counter_window_sum_scenario_b() {
        let mut exec = make_executor();
        let group = GroupId::new(0);
        let mut emissions = Vec::new();
        for (t, v) in (1u64..=7).zip(1..=7) {
            if let Some(_ts) = exec.on_data(t, &[v as f64], group) {
                let mut out = vec![0.0];
                exec.value(&mut out, group);
                emissions.push(out[0]);
            }
        }
        assert_eq!(emissions, vec![6.0, 15.0]);

        let ts = exec.flush(group);
        assert!(ts.is_some());
        let mut out = vec![0.0];
        exec.value(&mut out, group);
        assert_eq!(out[0], 7.0);
    }

    #[test]
    fn rejects_bad_column_binding() {
        let mut bindings = FlatMultivec::new();
        bindings.push_row([5usize]);
        let spec = AggExecSpec::new(1, 1, vec![Box::new(SumAgg)], bindings, CounterWindow::new(3));
        let err = AggExecutor::new(spec).unwrap_err();
        assert_eq!(
            err,
            AggExecError::ColumnOutOfRange { aggregator: 0, col: 5, num_columns: 1 }
        );
    }

    #[test]
    fn flush_with_no_buffered_rows_emits_nothing() {
        let mut exec = make_executor();
        assert_eq!(exec.flush(GroupId::new(0)), None);
    }

    #[test]
    fn rejects_zero_groups() {
        let bindings = FlatMultivec::new();
        let spec: AggExecSpec<u64, f64, CounterWindow> =
            AggExecSpec::new(0, 0, vec![], bindings, CounterWindow::new(1));
        let err = AggExecutor::new(spec).unwrap_err();
        assert_eq!(err, AggExecError::ZeroGroups);
    }
}
