use super::node::Node;
use crate::LOG_TOLERANCE;
use crate::Probability;
use crate::Symbol;
use crate::error::Error;
use crate::error::Result;
use rand::Rng;
use std::collections::VecDeque;

/// how the tree restores itself after the transient updates made by
/// `predict` and `sample`: walking the updates back symbol by symbol,
/// or cloning the whole tree up front and swapping it back in. the
/// clone trades memory for time and is the right choice when many
/// symbols are in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Recall {
    #[default]
    Revert,
    Snapshot,
}

/// an opaque saved predictor state. restoring it makes the tree
/// indistinguishable from the moment the snapshot was taken.
#[derive(Debug, Clone)]
pub struct Snapshot(ContextTree);

/// the agent's model of its interaction history: a context tree of
/// maximum depth D mixing every Markov model of order 0..=D over the
/// binary alphabet. the tree owns its root and the history queue;
/// nodes materialise lazily on the first update that walks them, so
/// memory grows with observed contexts rather than with 2^D.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextTree {
    depth: usize,
    root: Node,
    history: VecDeque<Symbol>,
    recall: Recall,
}

impl ContextTree {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            root: Node::default(),
            history: VecDeque::new(),
            recall: Recall::default(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
    pub fn recall(&self) -> Recall {
        self.recall
    }
    pub fn set_recall(&mut self, recall: Recall) {
        self.recall = recall;
    }
    /// number of live nodes in the tree
    pub fn size(&self) -> usize {
        self.root.size()
    }
    /// log weighted probability of the whole seen history, at the root
    pub fn log_block_probability(&self) -> f64 {
        self.root.log_pw()
    }
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// drop the tree and the history, back to the newborn state
    pub fn clear(&mut self) {
        self.root = Node::default();
        self.history.clear();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.clone())
    }
    pub fn restore(&mut self, snapshot: &Snapshot) {
        *self = snapshot.0.clone();
    }

    /// account for the given symbols, in order. symbols arriving
    /// before the history can fill a full context only extend the
    /// history; once D symbols are buffered every new symbol updates
    /// the D+1 nodes on its context path, deepest first, since each
    /// node's weighted probability depends on its updated children.
    pub fn update(&mut self, symbols: &[Symbol]) -> Result<()> {
        for &symbol in symbols {
            if self.history.len() < self.depth {
                self.history.push_back(symbol);
                continue;
            }
            let context = self.context();
            Self::update_walk(&mut self.root, &context, symbol)?;
            self.history.push_back(symbol);
        }
        Ok(())
    }

    /// extend the history without touching any counts. used for the
    /// agent's own actions, which the model conditions on but does
    /// not predict, and for percepts once learning has frozen.
    pub fn update_history(&mut self, symbols: &[Symbol]) {
        self.history.extend(symbols.iter().copied());
    }

    /// walk back the last `count` symbols, undoing their updates
    /// newest first. reverting past the point where a full context
    /// remains would leave counts the surviving history cannot
    /// justify, so the tree is cleared and the history prefix kept.
    pub fn revert(&mut self, count: usize) -> Result<()> {
        if count > self.history.len() {
            return Err(Error::InsufficientHistory {
                requested: count,
                available: self.history.len(),
            });
        }
        for _ in 0..count {
            let symbol = self.history.pop_back().expect("bounds checked above");
            if self.history.len() < self.depth {
                self.root = Node::default();
                continue;
            }
            let context = self.context();
            Self::revert_walk(&mut self.root, &context, symbol)?;
        }
        Ok(())
    }

    /// shrink the history without touching any counts, mirroring
    /// `update_history`
    pub fn revert_history(&mut self, count: usize) -> Result<()> {
        if count > self.history.len() {
            return Err(Error::InsufficientHistory {
                requested: count,
                available: self.history.len(),
            });
        }
        self.history.truncate(self.history.len() - count);
        Ok(())
    }

    /// conditional probability of observing `symbols` next, given the
    /// seen history: exp(log P(h ++ s) - log P(h)), both terms read at
    /// the root around a transient update. a history still shorter
    /// than D is first padded to depth with uniformly random symbols,
    /// an approximation that keeps every subsequent count placeable.
    pub fn predict(&mut self, symbols: &[Symbol], rng: &mut impl Rng) -> Result<Probability> {
        while self.history.len() < self.depth {
            self.update(&[rng.random::<bool>()])?;
        }
        let before = self.root.log_pw();
        let after = match self.recall {
            Recall::Revert => {
                self.update(symbols)?;
                let after = self.root.log_pw();
                self.revert(symbols.len())?;
                after
            }
            Recall::Snapshot => {
                let snapshot = self.snapshot();
                self.update(symbols)?;
                let after = self.root.log_pw();
                self.restore(&snapshot);
                after
            }
        };
        Ok((after - before).exp())
    }

    /// draw `count` symbols from the model's conditional distribution
    /// and keep them: each symbol thresholds predict(1) against a
    /// uniform draw, then updates the tree so later symbols condition
    /// on earlier ones.
    pub fn sample_and_update(&mut self, count: usize, rng: &mut impl Rng) -> Result<Vec<Symbol>> {
        let mut symbols = Vec::with_capacity(count);
        for _ in 0..count {
            let one = self.predict(&[true], rng)?;
            let symbol = one >= rng.random::<f64>();
            self.update(&[symbol])?;
            symbols.push(symbol);
        }
        Ok(symbols)
    }

    /// draw `count` symbols from the model's conditional distribution
    /// without keeping them. the joint probability of the returned
    /// sequence equals the model's conditional probability of it.
    pub fn sample(&mut self, count: usize, rng: &mut impl Rng) -> Result<Vec<Symbol>> {
        match self.recall {
            Recall::Revert => {
                let symbols = self.sample_and_update(count, rng)?;
                self.revert(count)?;
                Ok(symbols)
            }
            Recall::Snapshot => {
                let snapshot = self.snapshot();
                let symbols = self.sample_and_update(count, rng)?;
                self.restore(&snapshot);
                Ok(symbols)
            }
        }
    }

    /// the context path bits: the last D history symbols, most recent
    /// first, which is the descent order from the root
    fn context(&self) -> Vec<Symbol> {
        self.history
            .iter()
            .rev()
            .take(self.depth)
            .copied()
            .collect::<Vec<Symbol>>()
    }

    /// descend along the context, growing nodes as needed, and update
    /// on the unwind so children are current before their parents
    fn update_walk(node: &mut Node, context: &[Symbol], symbol: Symbol) -> Result<()> {
        if let Some((&bit, rest)) = context.split_first() {
            Self::update_walk(node.child_or_grow(bit), rest, symbol)?;
        }
        node.update(symbol);
        Self::check(node)
    }

    /// mirror of `update_walk`: revert on the unwind, children before
    /// parents, letting each parent prune subtrees left empty
    fn revert_walk(node: &mut Node, context: &[Symbol], symbol: Symbol) -> Result<()> {
        if let Some((&bit, rest)) = context.split_first() {
            if let Some(child) = node.child_mut(bit) {
                Self::revert_walk(child, rest, symbol)?;
            }
        }
        node.revert(symbol);
        Self::check(node)
    }

    /// a cached log probability above zero means a broken invariant;
    /// fail loudly rather than clamp
    fn check(node: &Node) -> Result<()> {
        let worst = node.log_pw().max(node.log_kt());
        if worst > LOG_TOLERANCE {
            Err(Error::NumericInstability(worst))
        } else {
            Ok(())
        }
    }
}
