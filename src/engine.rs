//! The streaming execution engine: drives per-tick evaluation of a frozen
//! operator DAG.

#![forbid(unsafe_code)]

use crate::dag::{Dag, NodeId};
use crate::error::StepError;
use crate::history::History;
use crate::op::Operator;
use crate::tick::Tick;

/// A frozen, steppable operator DAG.
///
/// Constructed via [`crate::EngineBuilder::build`]; never mutated
/// structurally afterwards (per the crate's non-goal of dynamic topology
/// changes once data has started flowing).
pub struct Engine<T, V, H> {
    dag: Dag,
    operators: Vec<Box<dyn Operator<T, V>>>,
    offsets: Vec<usize>,
    rolling: Vec<bool>,
    last_watermark: Vec<Option<T>>,
    total_width: usize,
    input_arity: usize,
    history: H,
    current: Vec<V>,
    num_steps: u64,
    last_tick: Option<T>,
}

impl<T: Tick + std::fmt::Debug, V: Copy + Default, H: History<T, V>> Engine<T, V, H> {
    pub(crate) fn from_parts(
        dag: Dag,
        operators: Vec<Box<dyn Operator<T, V>>>,
        offsets: Vec<usize>,
        rolling: Vec<bool>,
        total_width: usize,
        input_arity: usize,
        history: H,
    ) -> Self {
        let n = operators.len();
        Self {
            dag,
            operators,
            offsets,
            rolling,
            last_watermark: vec![None; n],
            total_width,
            input_arity,
            history,
            current: vec![V::default(); total_width],
            num_steps: 0,
            last_tick: None,
        }
    }

    /// Number of nodes in the graph, including the root input.
    pub fn num_nodes(&self) -> usize {
        self.operators.len()
    }

    /// Number of `step` calls that have succeeded so far.
    pub fn num_steps(&self) -> u64 {
        self.num_steps
    }

    /// The current step's full output vector.
    pub fn latest_output(&self) -> &[V] {
        &self.current
    }

    /// The current step's output slice belonging to node `id`.
    pub fn node_output(&self, id: NodeId) -> &[V] {
        let offset = self.offsets[id.as_usize()];
        let width = self.operators[id.as_usize()].num_outputs();
        &self.current[offset..offset + width]
    }

    /// Ticks of every step currently retained in history, oldest first.
    /// Intended for diagnostics, not the hot path.
    pub fn step_ticks(&self) -> Vec<T> {
        (0..self.history.len())
            .filter_map(|k| self.history.index(k).map(|(t, _)| t))
            .collect()
    }

    /// Drops all retained history without resetting operator state.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Checks the engine's own layout invariants. Intended for tests and
    /// debugging, not the hot path.
    pub fn validate_state(&self) -> bool {
        let mut expected_offset = 0usize;
        for (i, op) in self.operators.iter().enumerate() {
            if self.offsets[i] != expected_offset {
                return false;
            }
            expected_offset += op.num_outputs();
        }
        expected_offset == self.total_width && self.current.len() == self.total_width
    }

    fn node_slice<'a>(out: &'a [V], offset: usize, width: usize) -> &'a [V] {
        &out[offset..offset + width]
    }

    fn gather_inputs<'a>(&self, id: NodeId, out: &'a [V], scratch: &mut Vec<&'a [V]>) {
        scratch.clear();
        for &pred in self.dag.predecessors(id) {
            let offset = self.offsets[pred.as_usize()];
            let width = self.operators[pred.as_usize()].num_outputs();
            scratch.push(Self::node_slice(out, offset, width));
        }
    }

    /// Evaluates one incoming row.
    ///
    /// `row.len()` must equal the root input's arity, and `tick` must be
    /// strictly greater than the previous call's tick. Violating either
    /// leaves the engine's externally observable state unchanged and
    /// returns the corresponding [`StepError`].
    pub fn step(&mut self, tick: T, row: &[V]) -> Result<(), StepError> {
        if row.len() != self.input_arity {
            return Err(StepError::InputArityMismatch {
                expected: self.input_arity,
                got: row.len(),
            });
        }
        if let Some(prev) = self.last_tick {
            if tick <= prev {
                return Err(StepError::NonMonotonicTick {
                    prev: format!("{prev:?}"),
                    got: format!("{tick:?}"),
                });
            }
        }

        let mut out = vec![V::default(); self.total_width];
        out[self.offsets[0]..self.offsets[0] + self.input_arity].copy_from_slice(row);

        let mut scratch: Vec<&[V]> = Vec::new();
        for i in 1..self.operators.len() {
            let id = NodeId::from(i);
            self.gather_inputs(id, &out, &mut scratch);
            self.operators[i].on_data(tick, &scratch);

            let offset = self.offsets[i];
            let width = self.operators[i].num_outputs();
            let (_, tail) = out.split_at_mut(offset);
            self.operators[i].value(&mut tail[..width]);
        }

        for i in 1..self.operators.len() {
            if !self.rolling[i] {
                continue;
            }
            let Some(new_wm) = self.operators[i].watermark(tick) else {
                continue;
            };
            let prev_wm = self.last_watermark[i];
            let preds: Vec<NodeId> = self.dag.predecessors(NodeId::from(i)).to_vec();
            for k in 0..self.history.len() {
                let Some((hist_tick, hist_row)) = self.history.index(k) else {
                    break;
                };
                if let Some(prev) = prev_wm {
                    if hist_tick <= prev {
                        continue;
                    }
                }
                if hist_tick > new_wm {
                    break;
                }
                let removed: Vec<&[V]> = preds
                    .iter()
                    .map(|&pred| {
                        let offset = self.offsets[pred.as_usize()];
                        let width = self.operators[pred.as_usize()].num_outputs();
                        Self::node_slice(hist_row, offset, width)
                    })
                    .collect();
                self.operators[i].inverse(hist_tick, &removed);
            }
            self.last_watermark[i] = Some(new_wm);
        }

        self.history
            .push(tick, &out)
            .expect("history allocation should not fail under normal operation");
        self.current = out;
        self.num_steps += 1;
        self.last_tick = Some(tick);

        let mut min_watermark: Option<T> = None;
        for wm in self.last_watermark.iter().flatten() {
            min_watermark = Some(match min_watermark {
                None => *wm,
                Some(cur) if *wm < cur => *wm,
                Some(cur) => cur,
            });
        }
        if let Some(min_wm) = min_watermark {
            while let Some((front_tick, _)) = self.history.front() {
                if front_tick <= min_wm {
                    self.history.pop_front();
                } else {
                    break;
                }
            }
        }

        Ok(())
    }
}
