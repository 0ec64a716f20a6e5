//! Per-node evaluation profiling.
//!
//! Nodes are timed as evaluation finishes (post-order); reversing the event
//! list on take yields the pre-order trace hosts expect.

use std::time::Instant;

use crate::query::ast::{AstNode, LogicalOp, MatchKind};

/// One profiled node visit.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileEvent {
    /// Node description, e.g. `Term{red}` or `Logical{n=2,o=and}`.
    pub description: String,
    /// Wall-clock evaluation time, monotonic.
    pub micros: u64,
    /// Node depth; the root is 0.
    pub depth: usize,
    /// Number of ids the node produced (upper bound).
    pub result_size: usize,
}

/// The pre-order trace of one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryProfile {
    pub events: Vec<ProfileEvent>,
}

/// Records node visits during evaluation.
#[derive(Debug, Default)]
pub(crate) struct ProfileBuilder {
    depth: usize,
    events: Vec<ProfileEvent>,
}

impl ProfileBuilder {
    pub(crate) fn start(&mut self) -> Instant {
        self.depth += 1;
        Instant::now()
    }

    pub(crate) fn finish(&mut self, start: Instant, node: &AstNode, result_size: usize) {
        debug_assert!(self.depth >= 1);
        self.events.push(ProfileEvent {
            description: describe(node),
            micros: start.elapsed().as_micros() as u64,
            depth: self.depth - 1,
            result_size,
        });
        self.depth -= 1;
    }

    pub(crate) fn take(mut self) -> QueryProfile {
        self.events.reverse();
        QueryProfile {
            events: self.events,
        }
    }
}

fn describe(node: &AstNode) -> String {
    match node {
        AstNode::Empty => String::new(),
        AstNode::Star => "Star{}".to_string(),
        AstNode::StarField => "StarField{}".to_string(),
        AstNode::Affix(affix) => {
            let name = match affix.kind {
                MatchKind::Term => "Term",
                MatchKind::Prefix => "Prefix",
                MatchKind::Suffix => "Suffix",
                MatchKind::Infix => "Infix",
            };
            format!("{name}{{{}}}", affix.affix)
        }
        AstNode::Range(range) => format!("Range{{{}<>{}}}", range.lo, range.hi),
        AstNode::Negate(_) => "Negate{}".to_string(),
        AstNode::Logical { op, nodes } => {
            let op = match op {
                LogicalOp::And => "and",
                LogicalOp::Or => "or",
            };
            format!("Logical{{n={},o={op}}}", nodes.len())
        }
        AstNode::Tags(tags) => {
            let joined: Vec<&str> = tags.iter().map(|t| t.affix.as_str()).collect();
            format!("Tags{{{}}}", joined.join(","))
        }
        AstNode::Field { field, .. } => format!("Field{{{field}}}"),
        AstNode::Knn(knn) => format!("KNN{{l={}}}", knn.limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::{AffixNode, RangeNode};

    #[test]
    fn descriptions_follow_the_grammar() {
        assert_eq!(describe(&AstNode::Star), "Star{}");
        assert_eq!(describe(&AstNode::StarField), "StarField{}");
        assert_eq!(
            describe(&AstNode::Affix(AffixNode::term("red"))),
            "Term{red}"
        );
        assert_eq!(
            describe(&AstNode::Affix(AffixNode::new(MatchKind::Prefix, "re"))),
            "Prefix{re}"
        );
        assert_eq!(
            describe(&AstNode::Range(RangeNode { lo: 10.0, hi: 20.5 })),
            "Range{10<>20.5}"
        );
        assert_eq!(
            describe(&AstNode::logical(
                LogicalOp::And,
                vec![AstNode::Empty, AstNode::Empty]
            )),
            "Logical{n=2,o=and}"
        );
        assert_eq!(
            describe(&AstNode::Tags(vec![
                AffixNode::term("red"),
                AffixNode::new(MatchKind::Prefix, "bl"),
            ])),
            "Tags{red,bl}"
        );
        assert_eq!(
            describe(&AstNode::field("title", AstNode::Empty)),
            "Field{title}"
        );
    }

    #[test]
    fn take_reverses_finish_order_into_preorder() {
        let mut builder = ProfileBuilder::default();

        let outer = builder.start();
        let inner = builder.start();
        builder.finish(inner, &AstNode::Affix(AffixNode::term("leaf")), 1);
        builder.finish(outer, &AstNode::logical(LogicalOp::Or, vec![]), 2);

        let profile = builder.take();
        assert_eq!(profile.events.len(), 2);
        assert_eq!(profile.events[0].description, "Logical{n=0,o=or}");
        assert_eq!(profile.events[0].depth, 0);
        assert_eq!(profile.events[1].description, "Term{leaf}");
        assert_eq!(profile.events[1].depth, 1);
    }
}
