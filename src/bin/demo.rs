//! Minimal demonstration binary for the streaming operator DAG engine.
//!
//! Wires a toy two-operator engine (a rolling sum and a simple moving
//! average over the same root input) plus a counter-window aggregation
//! executor, steps both through synthetic price data, and logs every step
//! via `tracing`. This is the one place in the repository allowed to log:
//! the library crate itself never does.

#![forbid(unsafe_code)]

use std::env;

use opflow_rs::{
    AggExecSpec, AggExecutor, Aggregator, Engine, EngineBuilder, GroupId, NodeId, Operator,
    RingHistory, Window, WindowSpec,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn parse_u64(s: &str) -> Option<u64> {
    s.parse::<u64>().ok()
}

/// A rolling sum over the last `window` ticks, matching scenario C's
/// cumulative-sum shape but bounded: rows older than `window` ticks are
/// subtracted back out via `inverse`.
#[derive(Clone)]
struct RollingSum {
    window: u64,
    total: f64,
    seen: u64,
}

impl RollingSum {
    fn new(window: u64) -> Self {
        Self { window, total: 0.0, seen: 0 }
    }
}

impl Operator<u64, f64> for RollingSum {
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
    }
    fn value(&self, out: &mut [f64]) {
        out[0] = self.total;
    }
    fn inverse(&mut self, _tick: u64, removed: &[&[f64]]) {
        self.total -= removed[0][0];
    }
    fn is_rolling(&self) -> bool {
        true
    }
    fn watermark(&self, tick: u64) -> Option<u64> {
        if self.seen > self.window {
            Some(tick.saturating_sub(self.window))
        } else {
            None
        }
    }
    fn reset(&mut self) {
        self.total = 0.0;
        self.seen = 0;
    }
}

/// A tumbling-by-tick-count window: emits every `n` ticks.
#[derive(Clone)]
struct CounterWindow {
    n: u64,
    count: u64,
    last_tick: u64,
}

impl CounterWindow {
    fn new(n: u64) -> Self {
        Self { n, count: 0, last_tick: 0 }
    }
}

impl Window<u64, f64> for CounterWindow {
    fn process(&mut self, tick: u64, _row: &[f64]) -> bool {
        self.count += 1;
        self.last_tick = tick;
        self.count == self.n
    }
    fn flush(&mut self) -> bool {
        self.count > 0
    }
    fn emit(&self) -> WindowSpec<u64> {
        WindowSpec { timestamp: self.last_tick, size: self.count, evict: self.count }
    }
    fn reset(&mut self) {
        self.count = 0;
        self.last_tick = 0;
    }
}

/// A simple moving average over the trailing `window` ticks, built the same
/// way as [`RollingSum`] but reporting the mean of the retained rows rather
/// than their running total.
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
        out[0] = if self.in_window == 0 { 0.0 } else { self.total / self.in_window as f64 };
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

struct SumAggregator;

impl Aggregator<f64> for SumAggregator {
    fn num_inputs(&self) -> usize {
        1
    }
    fn num_outputs(&self) -> usize {
        1
    }
    fn on_data(&mut self, n: usize, cols: &[*const f64], out: &mut [f64]) {
        let mut total = 0.0;
        for i in 0..n {
            // SAFETY: the executor guarantees cols[0][0..n] is valid for
            // the duration of this call.
            total += unsafe { *cols[0].add(i) };
        }
        out[0] = total;
    }
    fn reset(&mut self) {}
}

fn build_engine(window: u64) -> anyhow::Result<Engine<u64, f64, RingHistory<u64, f64>>> {
    let mut builder: EngineBuilder<u64, f64> = EngineBuilder::new(1);
    let root = NodeId::new(0);
    builder.add_op(Box::new(RollingSum::new(window)), &[root])?;
    builder.add_op(Box::new(SimpleMovingAverage::new(window)), &[root])?;
    Ok(builder.build(16)?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let mut window = parse_flag(&args, "--window")
        .and_then(|s| parse_u64(&s))
        .unwrap_or(3);
    let mut steps = parse_flag(&args, "--steps")
        .and_then(|s| parse_u64(&s))
        .unwrap_or(10);

    if let Some(path) = parse_flag(&args, "--config") {
        let text = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("read config {path}: {e}"))?;
        let cfg: serde_json::Value = serde_json::from_str(&text)?;
        if let Some(w) = cfg.get("window").and_then(|v| v.as_u64()) {
            window = w;
        }
        if let Some(s) = cfg.get("steps").and_then(|v| v.as_u64()) {
            steps = s;
        }
    }

    info!(window, steps, "starting demo engine");

    let mut engine = build_engine(window)?;
    let mut bindings = opflow_rs::FlatMultivec::new();
    bindings.push_row([0usize]);
    let spec = AggExecSpec::new(1, 1, vec![Box::new(SumAggregator)], bindings, CounterWindow::new(window));
    let mut agg = AggExecutor::new(spec)?;
    let group = GroupId::new(0);

    for t in 1..=steps {
        let price = 100.0 + t as f64;
        match engine.step(t, &[price]) {
            Ok(()) => {
                info!(
                    tick = t,
                    rolling_sum = engine.node_output(NodeId::new(1))[0],
                    moving_average = engine.node_output(NodeId::new(2))[0],
                    "step ok"
                );
            }
            Err(e) => {
                warn!(tick = t, error = %e, "step rejected");
            }
        }

        if let Some(ts) = agg.on_data(t, &[price], group) {
            let mut out = [0.0];
            agg.value(&mut out, group);
            info!(tick = ts, window_sum = out[0], "aggregation window emitted");
        }
    }

    if let Some(ts) = agg.flush(group) {
        let mut out = [0.0];
        agg.value(&mut out, group);
        info!(tick = ts, window_sum = out[0], "final aggregation flush");
    }

    if let Err(e) = engine.step(steps, &[0.0]) {
        error!(error = %e, "demonstrating a rejected non-monotonic step");
    }

    Ok(())
}
