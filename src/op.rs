//! The operator contract: a per-step transformation node in the DAG.

#![forbid(unsafe_code)]

/// A streaming operator. Implementations are supplied by integrators; the
/// core only ships [`PassthroughOperator`], used internally as the root
/// input node.
///
/// `on_data` and `value` are kept separate (rather than one method that
/// returns the output directly) so the engine can write outputs straight
/// into the shared step buffer without an intermediate allocation.
pub trait Operator<T, V> {
    /// Number of predecessor nodes this operator reads from.
    fn num_depends(&self) -> usize;

    /// Number of scalar columns each input slice (per predecessor) is
    /// expected to carry.
    fn num_inputs(&self) -> usize;

    /// Number of scalar columns this operator writes to its output slice.
    fn num_outputs(&self) -> usize;

    /// Consumes one timestamped tuple of predecessor output slices.
    /// `inputs[i]` is predecessor `i`'s output slice for the current tick.
    fn on_data(&mut self, tick: T, inputs: &[&[V]]);

    /// Writes the operator's current output into `out`, whose length equals
    /// `num_outputs()`.
    fn value(&self, out: &mut [V]);

    /// Called for rolling (non-cumulative) operators when a historical row
    /// ages out of their window. `removed` has the same shape as the
    /// `inputs` originally passed to `on_data` for that row. Default: no-op,
    /// i.e. the operator is cumulative.
    #[allow(unused_variables)]
    fn inverse(&mut self, tick: T, removed: &[&[V]]) {}

    /// Whether this operator ever needs `inverse` called. The engine uses
    /// this to decide whether to track a watermark for it at all; an
    /// operator that overrides `inverse` but not this method will simply
    /// never be asked to evict.
    fn is_rolling(&self) -> bool {
        false
    }

    /// For rolling operators, the tick below which history rows have now
    /// expired, given that `on_data` was just called for `tick`. Returning
    /// `Some(wm)` tells the engine to call `inverse` for every retained
    /// historical row with a tick `<= wm` that has not already been
    /// inverted, in ascending tick order, and that it is then safe to trim
    /// history up to `wm` once every rolling operator has reported past it.
    /// Non-rolling (cumulative) operators never need to override this.
    #[allow(unused_variables)]
    fn watermark(&self, tick: T) -> Option<T> {
        None
    }

    /// Resets the operator to its freshly constructed state.
    fn reset(&mut self);
}

/// The root input node: copies the external row through unchanged.
///
/// Always node `0` in an [`crate::EngineBuilder`]-constructed engine, with
/// zero predecessors and `num_outputs() == num_inputs()`.
#[derive(Debug, Clone)]
pub struct PassthroughOperator {
    arity: usize,
}

impl PassthroughOperator {
    /// Creates a passthrough of the given row width.
    pub fn new(arity: usize) -> Self {
        Self { arity }
    }
}

impl<T, V: Copy> Operator<T, V> for PassthroughOperator {
    fn num_depends(&self) -> usize {
        0
    }

    fn num_inputs(&self) -> usize {
        self.arity
    }

    fn num_outputs(&self) -> usize {
        self.arity
    }

    fn on_data(&mut self, _tick: T, _inputs: &[&[V]]) {
        // The engine writes the external row directly into this node's
        // output slice; there is nothing for the operator itself to do.
    }

    fn value(&self, _out: &mut [V]) {
        // Same reasoning as on_data: the engine owns the write.
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EngineBuilder;
    use crate::dag::NodeId;
    use crate::history::RingHistory;

    #[test]
    fn passthrough_reports_its_own_arity() {
        let op: PassthroughOperator = PassthroughOperator::new(3);
        assert_eq!(Operator::<u64, f64>::num_depends(&op), 0);
        assert_eq!(Operator::<u64, f64>::num_inputs(&op), 3);
        assert_eq!(Operator::<u64, f64>::num_outputs(&op), 3);
        assert!(!Operator::<u64, f64>::is_rolling(&op));
    }

    /// A bucketed OHLC bar operator: accumulates open/high/low/close/count
    /// for the tick bucket `tick / window`, and reports the *previously
    /// completed* bucket's bar via `value` from the tick a new bucket
    /// starts. A row at a bucket boundary belongs to the new bucket, not the
    /// one it closes out, so finalization happens on bucket change rather
    /// than on a fixed trailing-row-count trigger.
    #[derive(Clone)]
    struct Ohlc {
        window: u64,
        bucket: Option<u64>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        count: u64,
        out: [f64; 5],
    }

    impl Ohlc {
        fn new(window: u64) -> Self {
            Self {
                window,
                bucket: None,
                open: 0.0,
                high: 0.0,
                low: 0.0,
                close: 0.0,
                count: 0,
                out: [0.0; 5],
            }
        }

        fn finalize_into_output(&mut self) {
            self.out = [self.open, self.high, self.low, self.close, self.count as f64];
        }

        fn start_bucket(&mut self, idx: u64, price: f64) {
            self.bucket = Some(idx);
            self.open = price;
            self.high = price;
            self.low = price;
            self.close = price;
            self.count = 1;
        }

        /// Force-finalizes whatever bucket is currently in progress, as if
        /// the input stream had ended. There is no `flush` in the
        /// [`Operator`] contract (that concept belongs to
        /// [`crate::window::Window`]); this is a test-only stand-in for
        /// "the caller decided no more rows are coming".
        fn force_finalize(&mut self) {
            if self.count > 0 {
                self.finalize_into_output();
            }
        }
    }

    impl Operator<u64, f64> for Ohlc {
        fn num_depends(&self) -> usize {
            1
        }
        fn num_inputs(&self) -> usize {
            1
        }
        fn num_outputs(&self) -> usize {
            5
        }
        fn on_data(&mut self, tick: u64, inputs: &[&[f64]]) {
            let price = inputs[0][0];
            let idx = tick / self.window;
            match self.bucket {
                None => self.start_bucket(idx, price),
                Some(cur) if idx == cur => {
                    self.high = self.high.max(price);
                    self.low = self.low.min(price);
                    self.close = price;
                    self.count += 1;
                }
                Some(_) => {
                    self.finalize_into_output();
                    self.start_bucket(idx, price);
                }
            }
        }
        fn value(&self, out: &mut [f64]) {
            out.copy_from_slice(&self.out);
        }
        fn reset(&mut self) {
            let window = self.window;
            *self = Ohlc::new(window);
        }
    }

    #[test]
    fn ohlc_tumbling_scenario_a() {
        let mut builder: EngineBuilder<u64, f64> = EngineBuilder::new(1);
        let root = NodeId::new(0);
        builder.add_op(Box::new(Ohlc::new(3)), &[root]).unwrap();
        let mut engine: crate::engine::Engine<u64, f64, RingHistory<u64, f64>> =
            builder.build(4).unwrap();

        let prices = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let mut bars_at = Vec::new();
        let mut last_out = [0.0; 5];
        for (i, &p) in prices.iter().enumerate() {
            let t = (i + 1) as u64;
            engine.step(t, &[p]).unwrap();
            let out = engine.node_output(NodeId::new(1));
            if out != last_out.as_slice() {
                bars_at.push((t, out.to_vec()));
                last_out.copy_from_slice(out);
            }
        }

        // at tick 3: window [0,3) = {1.0, 2.0}
        assert_eq!(bars_at[0], (3, vec![1.0, 2.0, 1.0, 2.0, 2.0]));
        // at tick 6: window [3,6) = {3.0, 4.0, 5.0}
        assert_eq!(bars_at[1], (6, vec![3.0, 5.0, 3.0, 5.0, 3.0]));
    }

    #[test]
    fn ohlc_tumbling_scenario_d_boundary_and_flush() {
        let mut ohlc = Ohlc::new(10);
        let rows: [(u64, f64); 4] = [(5, 100.0), (7, 110.0), (8, 90.0), (10, 105.0)];
        let mut out = [0.0; 5];
        for (t, p) in rows {
            Operator::on_data(&mut ohlc, t, &[&[p]]);
            Operator::value(&ohlc, &mut out);
        }
        // tick 10 starts a new bucket, which finalizes window [0,10) = {100, 110, 90}.
        assert_eq!(out, [100.0, 110.0, 90.0, 90.0, 3.0]);

        // the new bucket is mid-flight, seeded with 105.0; force-finalizing
        // simulates the stream ending right there.
        ohlc.force_finalize();
        Operator::value(&ohlc, &mut out);
        assert_eq!(out, [105.0, 105.0, 105.0, 105.0, 1.0]);
    }

    /// A simple moving average over the trailing `window` ticks, rolling via
    /// `inverse` the same way a bounded rolling sum would.
    #[derive(Clone)]
    struct SimpleMovingAverage {
        window: u64,
        total: f64,
        seen: u64,
        in_window: u64,
    }

    impl SimpleMovingAverage {
        fn new(window: u64) -> Self {
            Self { window, total: 0.0, seen: 0, in_window: 0 }
        }
    }

    impl Operator<u64, f64> for SimpleMovingAverage {
        fn num_depends(&self) -> usize {
            1
        }
        fn num_inputs(&self) -> usize {
            1
        }
        fn num_outputs(&self) -> usize {
            1
        }
        fn on_data(&mut self, _tick: u64, inputs: &[&[f64]]) {
            self.total += inputs[0][0];
            self.seen += 1;
            self.in_window = self.in_window.saturating_add(1).min(self.window);
        }
        fn value(&self, out: &mut [f64]) {
            out[0] = if self.in_window == 0 {
                0.0
            } else {
                self.total / self.in_window as f64
            };
        }
        fn inverse(&mut self, _tick: u64, removed: &[&[f64]]) {
            self.total -= removed[0][0];
            self.in_window -= 1;
        }
        fn is_rolling(&self) -> bool {
            true
        }
        fn watermark(&self, tick: u64) -> Option<u64> {
            (self.seen > self.window).then(|| tick.saturating_sub(self.window))
        }
        fn reset(&mut self) {
            self.total = 0.0;
            self.seen = 0;
            self.in_window = 0;
        }
    }

    #[test]
    fn reset_then_replay_matches_fresh_operator() {
        // Property #7: resetting an operator and replaying the same input
        // stream must match a freshly constructed operator of the same
        // configuration. Exercised directly against the operator, not
        // through an `Engine` (which has no public API for resetting a
        // single node in isolation).
        let stream: [(u64, f64); 4] = [(1, 10.0), (2, 20.0), (3, 30.0), (4, 5.0)];

        let mut warmed = SimpleMovingAverage::new(3);
        for (t, v) in stream {
            Operator::on_data(&mut warmed, t, &[&[v]]);
        }
        Operator::reset(&mut warmed);
        for (t, v) in stream {
            Operator::on_data(&mut warmed, t, &[&[v]]);
        }
        let mut warmed_out = [0.0];
        Operator::value(&warmed, &mut warmed_out);

        let mut fresh = SimpleMovingAverage::new(3);
        for (t, v) in stream {
            Operator::on_data(&mut fresh, t, &[&[v]]);
        }
        let mut fresh_out = [0.0];
        Operator::value(&fresh, &mut fresh_out);

        assert_eq!(warmed_out, fresh_out);
    }
}
