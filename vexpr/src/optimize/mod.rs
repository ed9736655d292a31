//! Constant folding
//!
//! Rewrites a tree bottom-up, replacing subtrees whose value is known ahead
//! of evaluation by literals. Operator nodes fold when all of their children
//! are literals. Variables and calls fold only when the supplied context
//! declares them constant; without a context they are never touched.
//!
//! Traversals repeat until one completes without a rewrite, bounded by
//! [`TreeOptimizer::set_max_iterations`].

use crate::ast::Node;
use crate::context::{Context, EmptyContext};
use crate::error::Result;
use crate::interp::{Value, ValueType};
use log::trace;
use std::collections::HashMap;

/// Stack growth parameters for deeply nested trees
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Statistics from optimization runs
#[derive(Debug, Default, Clone)]
pub struct OptimizationStats {
    /// Number of traversals run
    pub iterations: usize,
    /// Folds per node kind
    pub fold_counts: HashMap<String, usize>,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fold(&mut self, kind: &str) {
        *self.fold_counts.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn folds(&self, kind: &str) -> usize {
        self.fold_counts.get(kind).copied().unwrap_or(0)
    }

    pub fn total_folds(&self) -> usize {
        self.fold_counts.values().sum()
    }

    pub fn merge(&mut self, other: &OptimizationStats) {
        self.iterations += other.iterations;
        for (kind, count) in &other.fold_counts {
            *self.fold_counts.entry(kind.clone()).or_insert(0) += count;
        }
    }
}

/// Fixed-point constant folder
pub struct TreeOptimizer<'ctx> {
    ctx: Option<&'ctx dyn Context>,
    max_iterations: usize,
    stats: OptimizationStats,
}

impl<'ctx> TreeOptimizer<'ctx> {
    /// Optimizer that folds literal arithmetic only
    pub fn new() -> Self {
        Self {
            ctx: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            stats: OptimizationStats::new(),
        }
    }

    /// Optimizer that also folds variables and calls `ctx` declares constant
    pub fn with_context(ctx: &'ctx dyn Context) -> Self {
        Self {
            ctx: Some(ctx),
            ..Self::new()
        }
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.max_iterations = max_iterations.max(1);
    }

    pub fn stats(&self) -> &OptimizationStats {
        &self.stats
    }

    /// Optimize one tree until no rewrite occurs
    pub fn optimize(&mut self, node: &Node) -> Result<Node> {
        let mut node = node.clone();
        let mut iteration = 0;
        loop {
            iteration += 1;
            let (next, changed) = self.rewrite(node)?;
            node = next;
            if !changed || iteration >= self.max_iterations {
                break;
            }
        }
        self.stats.iterations += iteration;
        Ok(node)
    }

    /// Optimize a statement list until a full traversal rewrites nothing
    pub fn optimize_all(&mut self, nodes: &[Node]) -> Result<Vec<Node>> {
        let mut nodes = nodes.to_vec();
        let mut iteration = 0;
        loop {
            iteration += 1;
            let mut changed = false;
            nodes = nodes
                .into_iter()
                .map(|node| {
                    let (node, node_changed) = self.rewrite(node)?;
                    changed |= node_changed;
                    Ok(node)
                })
                .collect::<Result<Vec<_>>>()?;
            if !changed || iteration >= self.max_iterations {
                break;
            }
        }
        self.stats.iterations += iteration;
        Ok(nodes)
    }

    fn rewrite(&mut self, node: Node) -> Result<(Node, bool)> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.rewrite_inner(node))
    }

    fn rewrite_inner(&mut self, node: Node) -> Result<(Node, bool)> {
        match node {
            Node::Literal(_) | Node::Empty => Ok((node, false)),

            Node::Variable(ref name) => match self.ctx {
                Some(ctx) if ctx.is_constant_variable(name)? => Ok(self.fold(node, "variable", false)),
                _ => Ok((node, false)),
            },

            Node::Assignment { name, value } => {
                let (value, changed) = self.rewrite(*value)?;
                Ok((Node::assignment(name, value), changed))
            }

            Node::Unary { op, operand } => {
                let (operand, changed) = self.rewrite(*operand)?;
                let literal = operand.is_literal();
                let node = Node::unary(op, operand);
                Ok(self.fold_if(literal, node, "unary", changed))
            }

            Node::Binary { op, left, right } => {
                let (left, left_changed) = self.rewrite(*left)?;
                let (right, right_changed) = self.rewrite(*right)?;
                let literal = left.is_literal() && right.is_literal();
                let node = Node::binary(op, left, right);
                Ok(self.fold_if(literal, node, "binary", left_changed || right_changed))
            }

            Node::Ternary {
                op,
                cond,
                then_branch,
                else_branch,
            } => {
                let (cond, c1) = self.rewrite(*cond)?;
                let (then_branch, c2) = self.rewrite(*then_branch)?;
                let (else_branch, c3) = self.rewrite(*else_branch)?;
                let literal =
                    cond.is_literal() && then_branch.is_literal() && else_branch.is_literal();
                let node = Node::ternary(op, cond, then_branch, else_branch);
                Ok(self.fold_if(literal, node, "ternary", c1 || c2 || c3))
            }

            Node::Array(elements) => {
                let (elements, changed) = self.rewrite_list(elements)?;
                let literal = elements.iter().all(Node::is_literal);
                Ok(self.fold_if(literal, Node::Array(elements), "array", changed))
            }

            Node::Call { name, args } => {
                let (args, changed) = self.rewrite_list(args)?;
                let arg_types: Option<Vec<ValueType>> = args
                    .iter()
                    .map(|arg| arg.as_literal().map(Value::value_type))
                    .collect();
                let constant = match (self.ctx, arg_types) {
                    (Some(ctx), Some(types)) => ctx.is_constant_call(&name, &types)?,
                    _ => false,
                };
                let node = Node::Call { name, args };
                Ok(self.fold_if(constant, node, "call", changed))
            }
        }
    }

    fn rewrite_list(&mut self, nodes: Vec<Node>) -> Result<(Vec<Node>, bool)> {
        let mut changed = false;
        let nodes = nodes
            .into_iter()
            .map(|node| {
                let (node, node_changed) = self.rewrite(node)?;
                changed |= node_changed;
                Ok(node)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((nodes, changed))
    }

    fn fold_if(&mut self, foldable: bool, node: Node, kind: &str, changed: bool) -> (Node, bool) {
        if foldable {
            self.fold(node, kind, changed)
        } else {
            (node, changed)
        }
    }

    /// Replace `node` by its value; a node that fails to evaluate is kept
    fn fold(&mut self, node: Node, kind: &str, changed: bool) -> (Node, bool) {
        let ctx: &dyn Context = self.ctx.unwrap_or(&EmptyContext);
        match node.eval(ctx) {
            Ok(value) => {
                trace!("folded {kind} into {value}");
                self.stats.record_fold(kind);
                (Node::Literal(value), true)
            }
            Err(err) => {
                trace!("kept {kind}: {err}");
                (node, changed)
            }
        }
    }
}

impl Default for TreeOptimizer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Optimize one tree with default settings
pub fn optimize(node: &Node, ctx: Option<&dyn Context>) -> Result<Node> {
    match ctx {
        Some(ctx) => TreeOptimizer::with_context(ctx).optimize(node),
        None => TreeOptimizer::new().optimize(node),
    }
}

/// Optimize a statement list with default settings
pub fn optimize_all(nodes: &[Node], ctx: Option<&dyn Context>) -> Result<Vec<Node>> {
    match ctx {
        Some(ctx) => TreeOptimizer::with_context(ctx).optimize_all(nodes),
        None => TreeOptimizer::new().optimize_all(nodes),
    }
}
