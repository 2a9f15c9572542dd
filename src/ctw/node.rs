use crate::LN_HALF;
use crate::Symbol;

/// one node of the context tree. each node owns the statistics of
/// the history subsequence seen in its context: how many zeros and
/// ones followed it, the cached log KT block probability of that
/// subsequence, and the cached log weighted probability mixing the
/// KT estimate with the children's.
///
/// the weighted block probability at node n is
///
///   P_w^n = Pr_kt(a, b)                      if n is a leaf
///   P_w^n = 1/2 Pr_kt(a, b) + 1/2 P_w^n0 P_w^n1   otherwise
///
/// where Pr_kt is the Krichevsky-Trofimov estimator with the add-1/2
/// rule. both caches live in log space; the mix is computed by
/// logsumexp with the exponent argument kept non-positive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    counts: [u32; 2],
    log_kt: f64,
    log_pw: f64,
    children: [Option<Box<Node>>; 2],
}

impl Node {
    pub fn count(&self, symbol: Symbol) -> u32 {
        self.counts[symbol as usize]
    }
    pub fn visits(&self) -> u64 {
        self.counts[0] as u64 + self.counts[1] as u64
    }
    pub fn log_kt(&self) -> f64 {
        self.log_kt
    }
    pub fn log_pw(&self) -> f64 {
        self.log_pw
    }
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }
    pub fn child(&self, symbol: Symbol) -> Option<&Node> {
        self.children[symbol as usize].as_deref()
    }
    pub fn child_mut(&mut self, symbol: Symbol) -> Option<&mut Node> {
        self.children[symbol as usize].as_deref_mut()
    }
    /// descend toward the given symbol, materialising the child on first visit
    pub fn child_or_grow(&mut self, symbol: Symbol) -> &mut Node {
        self.children[symbol as usize].get_or_insert_default()
    }
    /// number of live nodes in this subtree, this node included
    pub fn size(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(|child| child.size())
            .sum::<usize>()
    }

    /// log conditional KT probability of observing `symbol` next:
    /// log((count[symbol] + 1/2) / (count[0] + count[1] + 1))
    pub fn log_kt_multiplier(&self, symbol: Symbol) -> f64 {
        ((self.count(symbol) as f64 + 0.5) / (self.visits() as f64 + 1.0)).ln()
    }

    /// account for one observed symbol. the multiplier must be taken
    /// from the counts before the increment.
    pub fn update(&mut self, symbol: Symbol) {
        self.log_kt += self.log_kt_multiplier(symbol);
        self.counts[symbol as usize] += 1;
        self.update_log_pw();
    }

    /// undo the most recent update of `symbol` at this node, exactly
    /// mirroring `update`: the multiplier is taken from the counts
    /// after the decrement. children whose subtrees no longer hold
    /// any observations are dropped, so a long simulate-then-revert
    /// session cannot leave dead structure behind.
    pub fn revert(&mut self, symbol: Symbol) {
        self.counts[symbol as usize] = self.counts[symbol as usize].saturating_sub(1);
        self.log_kt -= self.log_kt_multiplier(symbol);
        for child in self.children.iter_mut() {
            if child.as_ref().is_some_and(|c| c.visits() == 0) {
                *child = None;
            }
        }
        self.update_log_pw();
    }

    /// recompute the cached weighted probability from the (already
    /// current) KT cache and children. the larger of the two mixture
    /// terms anchors the logsumexp so the exponent never overflows.
    fn update_log_pw(&mut self) {
        if self.is_leaf() {
            self.log_pw = self.log_kt;
        } else {
            let joint = self
                .children
                .iter()
                .flatten()
                .map(|child| child.log_pw)
                .sum::<f64>();
            let (max, min) = if self.log_kt >= joint {
                (self.log_kt, joint)
            } else {
                (joint, self.log_kt)
            };
            self.log_pw = LN_HALF + max + (min - max).exp().ln_1p();
        }
    }
}
