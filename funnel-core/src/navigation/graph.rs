//! Allowed-transition graph over funnel steps
//!
//! Both directions are stored the same way: for each destination step, the
//! set of steps it may be entered from. Forward edges move the user ahead in
//! the funnel; backward edges let them return to the step they came from.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

use super::step::FunnelStep;
use crate::error::RouteGraphError;

type Predecessors = BTreeMap<FunnelStep, BTreeSet<FunnelStep>>;

/// Validated directed graph of legal funnel transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteGraph {
    forward: Predecessors,
    backward: Predecessors,
}

impl Default for RouteGraph {
    /// The onboarding funnel: every step in [`FunnelStep::ALL`] as a chain
    fn default() -> Self {
        let (forward, backward) = chain(&FunnelStep::ALL);
        Self { forward, backward }
    }
}

impl RouteGraph {
    pub fn builder() -> RouteGraphBuilder {
        RouteGraphBuilder::default()
    }

    /// A linear funnel through `steps` with back navigation along each edge
    pub fn linear(steps: &[FunnelStep]) -> Result<Self, RouteGraphError> {
        let (forward, backward) = chain(steps);
        let graph = Self { forward, backward };
        graph.validate()?;
        Ok(graph)
    }

    /// True if `to` may be entered from `from` moving ahead
    pub fn allows_forward(&self, from: FunnelStep, to: FunnelStep) -> bool {
        self.forward.get(&to).is_some_and(|from_set| from_set.contains(&from))
    }

    /// True if `to` may be entered from `from` moving back
    pub fn allows_backward(&self, from: FunnelStep, to: FunnelStep) -> bool {
        self.backward.get(&to).is_some_and(|from_set| from_set.contains(&from))
    }

    /// Steps that can legally be entered next from `from`, forward first
    pub fn successors(&self, from: FunnelStep) -> Vec<FunnelStep> {
        let ahead = self
            .forward
            .iter()
            .filter(|(_, preds)| preds.contains(&from))
            .map(|(to, _)| *to);
        let back = self
            .backward
            .iter()
            .filter(|(_, preds)| preds.contains(&from))
            .map(|(to, _)| *to);
        ahead.chain(back).collect()
    }

    /// Check referential consistency
    ///
    /// No step may precede itself, every backward edge must retrace a
    /// forward edge, and every step named in the graph must be reachable
    /// from the entry step by moving forward.
    pub fn validate(&self) -> Result<(), RouteGraphError> {
        if self
            .forward
            .get(&FunnelStep::Entry)
            .is_some_and(|preds| !preds.is_empty())
        {
            return Err(RouteGraphError::GuardedEntry);
        }

        for (to, preds) in self.forward.iter().chain(self.backward.iter()) {
            if preds.contains(to) {
                return Err(RouteGraphError::SelfLoop(*to));
            }
        }

        for (to, preds) in &self.backward {
            for from in preds {
                if !self.allows_forward(*to, *from) {
                    return Err(RouteGraphError::UnmirroredBackward {
                        from: *from,
                        to: *to,
                    });
                }
            }
        }

        let reachable = self.reachable_from_entry();
        let named = self
            .forward
            .iter()
            .flat_map(|(to, preds)| std::iter::once(to).chain(preds.iter()));
        for step in named {
            if !reachable.contains(step) {
                return Err(RouteGraphError::Unreachable(*step));
            }
        }

        Ok(())
    }

    fn reachable_from_entry(&self) -> BTreeSet<FunnelStep> {
        let mut seen = BTreeSet::from([FunnelStep::Entry]);
        let mut queue = VecDeque::from([FunnelStep::Entry]);

        while let Some(from) = queue.pop_front() {
            for (to, preds) in &self.forward {
                if preds.contains(&from) && seen.insert(*to) {
                    queue.push_back(*to);
                }
            }
        }
        seen
    }
}

/// Incremental construction of a [`RouteGraph`]
#[derive(Debug, Default)]
pub struct RouteGraphBuilder {
    forward: Predecessors,
    backward: Predecessors,
}

impl RouteGraphBuilder {
    /// Allow entering `to` from any of `from` when moving ahead
    pub fn forward(mut self, to: FunnelStep, from: impl IntoIterator<Item = FunnelStep>) -> Self {
        self.forward.entry(to).or_default().extend(from);
        self
    }

    /// Allow returning to `to` from any of `from`
    pub fn backward(mut self, to: FunnelStep, from: impl IntoIterator<Item = FunnelStep>) -> Self {
        self.backward.entry(to).or_default().extend(from);
        self
    }

    pub fn build(self) -> Result<RouteGraph, RouteGraphError> {
        let graph = RouteGraph {
            forward: self.forward,
            backward: self.backward,
        };
        graph.validate()?;
        Ok(graph)
    }
}

fn chain(steps: &[FunnelStep]) -> (Predecessors, Predecessors) {
    let mut forward = Predecessors::new();
    let mut backward = Predecessors::new();
    for pair in steps.windows(2) {
        let (earlier, later) = (pair[0], pair[1]);
        forward.entry(later).or_default().insert(earlier);
        backward.entry(earlier).or_default().insert(later);
    }
    (forward, backward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::step::FunnelStep::*;

    #[test]
    fn default_graph_is_valid() {
        assert!(RouteGraph::default().validate().is_ok());
    }

    #[test]
    fn default_graph_is_a_chain() {
        let graph = RouteGraph::default();
        assert!(graph.allows_forward(Entry, Welcome));
        assert!(graph.allows_forward(Summary, Payment));
        assert!(!graph.allows_forward(Entry, Quiz));
        assert!(graph.allows_backward(Quiz, Goal));
        assert!(!graph.allows_backward(Goal, Quiz));
    }

    #[test]
    fn successors_lists_forward_then_back() {
        let graph = RouteGraph::default();
        assert_eq!(graph.successors(Quiz), vec![Branding, Goal]);
        assert_eq!(graph.successors(Payment), vec![Summary]);
    }

    #[test]
    fn self_loop_is_rejected() {
        let err = RouteGraph::builder()
            .forward(Goal, [Entry, Goal])
            .build()
            .unwrap_err();
        assert_eq!(err, RouteGraphError::SelfLoop(Goal));
    }

    #[test]
    fn backward_edge_must_mirror_forward() {
        let err = RouteGraph::builder()
            .forward(Goal, [Entry])
            .forward(Quiz, [Goal])
            .backward(Entry, [Quiz])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            RouteGraphError::UnmirroredBackward {
                from: Quiz,
                to: Entry
            }
        );
    }

    #[test]
    fn orphaned_step_is_unreachable() {
        let err = RouteGraph::builder()
            .forward(Goal, [Entry])
            .forward(Payment, [Summary])
            .build()
            .unwrap_err();
        assert!(matches!(err, RouteGraphError::Unreachable(Payment | Summary)));
    }

    #[test]
    fn entry_cannot_have_predecessors() {
        let err = RouteGraph::builder()
            .forward(Entry, [Welcome])
            .build()
            .unwrap_err();
        assert_eq!(err, RouteGraphError::GuardedEntry);
    }

    #[test]
    fn linear_subset_funnel() {
        let graph = RouteGraph::linear(&[Entry, Goal, Quiz, Summary, Payment]).unwrap();
        assert!(graph.allows_forward(Entry, Goal));
        assert!(!graph.allows_forward(Entry, Welcome));
        assert!(graph.allows_backward(Payment, Summary));
    }
}
