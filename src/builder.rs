//! Validates operator additions and freezes the per-node output layout.

#![forbid(unsafe_code)]

use crate::dag::{Dag, NodeId};
use crate::engine::Engine;
use crate::error::BuildError;
use crate::history::History;
use crate::op::{Operator, PassthroughOperator};

/// A history implementation constructible from a row width and an initial
/// capacity. Split out from [`History`] because the two shipped
/// implementations ([`crate::RingHistory`], [`crate::DequeHistory`]) have
/// different internal bounds on `T`/`V`, but the same constructor shape.
pub trait HistoryNew<T, V>: History<T, V> {
    /// Builds a history for rows of `width` elements with room for at least
    /// `initial_capacity` rows.
    fn with_width_capacity(width: usize, initial_capacity: usize) -> Self;
}

impl<T: Copy, V: Copy + Default> HistoryNew<T, V> for crate::history::RingHistory<T, V> {
    fn with_width_capacity(width: usize, initial_capacity: usize) -> Self {
        Self::new(width, initial_capacity)
    }
}

impl<T: Copy, V: Copy> HistoryNew<T, V> for crate::history::DequeHistory<T, V> {
    fn with_width_capacity(width: usize, initial_capacity: usize) -> Self {
        Self::new(width, initial_capacity)
    }
}

/// Builds an [`Engine`] node by node, validating each addition before it
/// touches any state (a rejected `add_op` leaves the builder exactly as it
/// was).
pub struct EngineBuilder<T, V> {
    dag: Dag,
    operators: Vec<Box<dyn Operator<T, V>>>,
    offsets: Vec<usize>,
    rolling: Vec<bool>,
    total_width: usize,
    input_arity: usize,
}

impl<T, V: Copy + Default + 'static> EngineBuilder<T, V>
where
    T: crate::tick::Tick + std::fmt::Debug + 'static,
{
    /// Starts a new builder whose root input node accepts rows of
    /// `input_arity` columns.
    pub fn new(input_arity: usize) -> Self {
        let mut dag = Dag::new();
        // The root input is always node 0, with no predecessors.
        dag.add(&[]).expect("first node never fails validation");
        Self {
            dag,
            operators: vec![Box::new(PassthroughOperator::new(input_arity))],
            offsets: vec![0],
            rolling: vec![false],
            total_width: input_arity,
            input_arity,
        }
    }

    /// Number of nodes added so far, including the root input.
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Whether only the root input has been added.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Adds an operator depending on `predecessor_ids`, returning its id.
    ///
    /// Fails without mutating the builder if any predecessor id is not
    /// already present, or if `predecessor_ids.len()` does not match
    /// `op.num_depends()`.
    pub fn add_op(
        &mut self,
        op: Box<dyn Operator<T, V>>,
        predecessor_ids: &[NodeId],
    ) -> Result<NodeId, BuildError> {
        if predecessor_ids.len() != op.num_depends() {
            return Err(BuildError::ArityMismatch {
                expected: op.num_depends(),
                got: predecessor_ids.len(),
            });
        }
        let id = self.dag.add(predecessor_ids).map_err(|e| match e {
            crate::error::DagError::InvalidDependency { bad, next_id } => {
                BuildError::InvalidDependency { bad, next_id }
            }
        })?;
        self.offsets.push(self.total_width);
        self.rolling.push(op.is_rolling());
        self.total_width += op.num_outputs();
        self.operators.push(op);
        Ok(id)
    }

    /// Consumes the builder, producing a frozen [`Engine`].
    ///
    /// Fails if no operator beyond the root input was ever added.
    pub fn build<H: HistoryNew<T, V>>(self, initial_history_capacity: usize) -> Result<Engine<T, V, H>, BuildError> {
        if self.is_empty() {
            return Err(BuildError::EmptyBuild);
        }
        let history = H::with_width_capacity(self.total_width, initial_history_capacity);
        Ok(Engine::from_parts(
            self.dag,
            self.operators,
            self.offsets,
            self.rolling,
            self.total_width,
            self.input_arity,
            history,
        ))
    }
}
