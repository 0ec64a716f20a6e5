//! Query string parser.
//!
//! Parses the secondary-index query language into an [`AstNode`] tree:
//!
//! - `*` matches all documents; `@field:*` matches documents with a value
//!   in `field`
//! - `red`, `@title:red`, `@title:(red | blue)` are term matches
//! - `re*`, `*ed`, `*re*` are prefix, suffix and infix matches
//! - `@price:[10 20]` is an inclusive numeric range (`-inf`/`+inf` bounds)
//! - `-expr` negates; juxtaposition means AND; `|` means OR
//! - `@color:{red | bl*}` matches tag sets
//! - `* =>[KNN 10 @vec $q EF_RUNTIME 80 AS dist]` runs k-NN over the
//!   pre-filter on its left
//!
//! `$name` references resolve against [`QueryParams`] at parse time: text
//! parameters in term and bound positions, vector parameters in the KNN
//! clause.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::error::{Result, SorrelError};
use crate::query::ast::{AffixNode, AstNode, KnnNode, LogicalOp, MatchKind, QueryParams, RangeNode};

#[derive(Parser)]
#[grammar = "query/grammar.pest"]
struct QueryGrammar;

/// Parse a query string into a syntax tree.
///
/// An all-whitespace query parses to [`AstNode::Empty`].
pub fn parse_query(input: &str, params: Option<&QueryParams>) -> Result<AstNode> {
    let mut pairs = QueryGrammar::parse(Rule::query, input)
        .map_err(|e| SorrelError::parse(e.to_string()))?;
    let query = pairs.next().expect("grammar yields one query pair");

    let mut expr: Option<AstNode> = None;
    let mut knn: Option<KnnNode> = None;
    for pair in query.into_inner() {
        match pair.as_rule() {
            Rule::expr => expr = Some(build_expr(pair, params)?),
            Rule::knn_clause => knn = Some(build_knn(pair, params)?),
            Rule::EOI => {}
            rule => unreachable!("unexpected rule under query: {rule:?}"),
        }
    }

    match knn {
        Some(mut knn) => {
            knn.filter = Box::new(expr.unwrap_or(AstNode::Star));
            Ok(AstNode::Knn(knn))
        }
        None => Ok(expr.unwrap_or(AstNode::Empty)),
    }
}

fn collapse(mut nodes: Vec<AstNode>, op: LogicalOp) -> AstNode {
    if nodes.len() == 1 {
        nodes.pop().unwrap()
    } else {
        AstNode::logical(op, nodes)
    }
}

fn build_expr(pair: Pair<'_, Rule>, params: Option<&QueryParams>) -> Result<AstNode> {
    let mut nodes = Vec::new();
    for and_pair in pair.into_inner() {
        nodes.push(build_and(and_pair, params)?);
    }
    Ok(collapse(nodes, LogicalOp::Or))
}

fn build_and(pair: Pair<'_, Rule>, params: Option<&QueryParams>) -> Result<AstNode> {
    let mut nodes = Vec::new();
    for unary in pair.into_inner() {
        nodes.push(build_unary(unary, params)?);
    }
    Ok(collapse(nodes, LogicalOp::And))
}

fn build_unary(pair: Pair<'_, Rule>, params: Option<&QueryParams>) -> Result<AstNode> {
    let inner = pair.into_inner().next().expect("unary has one child");
    match inner.as_rule() {
        Rule::negation => {
            let primary = inner.into_inner().next().expect("negation has one child");
            Ok(AstNode::negate(build_primary(primary, params)?))
        }
        Rule::primary => build_primary(inner, params),
        rule => unreachable!("unexpected rule under unary: {rule:?}"),
    }
}

fn build_primary(pair: Pair<'_, Rule>, params: Option<&QueryParams>) -> Result<AstNode> {
    let inner = pair.into_inner().next().expect("primary has one child");
    match inner.as_rule() {
        Rule::star => Ok(AstNode::Star),
        Rule::group => {
            let expr = inner.into_inner().next().expect("group wraps an expr");
            build_expr(expr, params)
        }
        Rule::term_like => Ok(AstNode::Affix(build_term_like(inner, params)?)),
        Rule::field_scope => build_field_scope(inner, params),
        rule => unreachable!("unexpected rule under primary: {rule:?}"),
    }
}

fn build_field_scope(pair: Pair<'_, Rule>, params: Option<&QueryParams>) -> Result<AstNode> {
    let mut inner = pair.into_inner();
    let field = inner.next().expect("field scope names a field").as_str();
    let value = inner.next().expect("field scope has a value");
    let value = value.into_inner().next().expect("field value has one child");

    let node = match value.as_rule() {
        Rule::star => AstNode::StarField,
        Rule::range => AstNode::Range(build_range(value, params)?),
        Rule::tag_set => {
            let mut tags = Vec::new();
            for elem in value.into_inner() {
                let affix = elem.into_inner().next().expect("tag element is an affix");
                tags.push(classify_affix(affix.as_str()));
            }
            AstNode::Tags(tags)
        }
        Rule::group => {
            let expr = value.into_inner().next().expect("group wraps an expr");
            build_expr(expr, params)?
        }
        Rule::term_like => AstNode::Affix(build_term_like(value, params)?),
        rule => unreachable!("unexpected rule under field value: {rule:?}"),
    };
    Ok(AstNode::field(field, node))
}

fn build_term_like(pair: Pair<'_, Rule>, params: Option<&QueryParams>) -> Result<AffixNode> {
    let inner = pair.into_inner().next().expect("term has one child");
    match inner.as_rule() {
        Rule::affix => Ok(classify_affix(inner.as_str())),
        Rule::param_ref => {
            let value = resolve_text_param(inner.as_str(), params)?;
            Ok(AffixNode::term(value))
        }
        rule => unreachable!("unexpected rule under term: {rule:?}"),
    }
}

fn classify_affix(raw: &str) -> AffixNode {
    let leading = raw.starts_with('*');
    let trailing = raw.ends_with('*');
    match (leading, trailing) {
        (true, true) => AffixNode::new(MatchKind::Infix, &raw[1..raw.len() - 1]),
        (true, false) => AffixNode::new(MatchKind::Suffix, &raw[1..]),
        (false, true) => AffixNode::new(MatchKind::Prefix, &raw[..raw.len() - 1]),
        (false, false) => AffixNode::term(raw),
    }
}

fn build_range(pair: Pair<'_, Rule>, params: Option<&QueryParams>) -> Result<RangeNode> {
    let mut bounds = pair.into_inner();
    let lo = build_bound(bounds.next().expect("range has a low bound"), params)?;
    let hi = build_bound(bounds.next().expect("range has a high bound"), params)?;
    Ok(RangeNode { lo, hi })
}

fn build_bound(pair: Pair<'_, Rule>, params: Option<&QueryParams>) -> Result<f64> {
    let inner = pair.into_inner().next().expect("bound has one child");
    let text = match inner.as_rule() {
        Rule::param_ref => resolve_text_param(inner.as_str(), params)?.to_string(),
        Rule::infinity | Rule::signed_number => inner.as_str().to_string(),
        rule => unreachable!("unexpected rule under bound: {rule:?}"),
    };
    text.parse::<f64>()
        .map_err(|_| SorrelError::parse(format!("invalid range bound '{text}'")))
}

fn build_knn(pair: Pair<'_, Rule>, params: Option<&QueryParams>) -> Result<KnnNode> {
    let mut inner = pair.into_inner();
    let limit = inner
        .next()
        .expect("knn clause has a limit")
        .as_str()
        .parse::<usize>()
        .map_err(|e| SorrelError::parse(format!("invalid knn limit: {e}")))?;
    let field = inner.next().expect("knn clause names a field").as_str();
    let vec_ref = inner.next().expect("knn clause has a vector parameter");
    let vec = resolve_vector_param(vec_ref.as_str(), params)?;

    let mut ef_runtime = None;
    let mut score_alias = String::new();
    for option in inner {
        match option.as_rule() {
            Rule::ef_runtime => {
                let value = option.into_inner().next().expect("ef_runtime has a value");
                ef_runtime = Some(value.as_str().parse::<usize>().map_err(|e| {
                    SorrelError::parse(format!("invalid ef_runtime value: {e}"))
                })?);
            }
            Rule::alias => {
                let name = option.into_inner().next().expect("alias has a name");
                score_alias = name.as_str().to_string();
            }
            rule => unreachable!("unexpected rule under knn clause: {rule:?}"),
        }
    }

    Ok(KnnNode {
        limit,
        field: field.to_string(),
        vec,
        ef_runtime,
        score_alias,
        filter: Box::new(AstNode::Star),
    })
}

fn resolve_text_param<'p>(raw: &str, params: Option<&'p QueryParams>) -> Result<&'p str> {
    let name = &raw[1..];
    params
        .and_then(|p| p.text(name))
        .ok_or_else(|| SorrelError::parse(format!("unknown parameter: ${name}")))
}

fn resolve_vector_param(raw: &str, params: Option<&QueryParams>) -> Result<Vec<f32>> {
    let name = &raw[1..];
    params
        .and_then(|p| p.vector(name))
        .map(<[f32]>::to_vec)
        .ok_or_else(|| SorrelError::parse(format!("unknown vector parameter: ${name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> AstNode {
        parse_query(input, None).unwrap()
    }

    #[test]
    fn empty_and_star_queries() {
        assert_eq!(parse(""), AstNode::Empty);
        assert_eq!(parse("   "), AstNode::Empty);
        assert_eq!(parse("*"), AstNode::Star);
    }

    #[test]
    fn bare_and_scoped_terms() {
        assert_eq!(parse("red"), AstNode::Affix(AffixNode::term("red")));
        assert_eq!(
            parse("@title:red"),
            AstNode::field("title", AstNode::Affix(AffixNode::term("red")))
        );
        assert_eq!(parse("@title:*"), AstNode::field("title", AstNode::StarField));
    }

    #[test]
    fn affix_classification() {
        assert_eq!(
            parse("re*"),
            AstNode::Affix(AffixNode::new(MatchKind::Prefix, "re"))
        );
        assert_eq!(
            parse("*ed"),
            AstNode::Affix(AffixNode::new(MatchKind::Suffix, "ed"))
        );
        assert_eq!(
            parse("*re*"),
            AstNode::Affix(AffixNode::new(MatchKind::Infix, "re"))
        );
    }

    #[test]
    fn implicit_and_binds_tighter_than_or() {
        let node = parse("a b|c");
        let AstNode::Logical { op, nodes } = node else {
            panic!("expected a logical node");
        };
        assert_eq!(op, LogicalOp::Or);
        assert_eq!(nodes.len(), 2);
        assert!(matches!(&nodes[0], AstNode::Logical { op: LogicalOp::And, nodes } if nodes.len() == 2));
        assert_eq!(nodes[1], AstNode::Affix(AffixNode::term("c")));
    }

    #[test]
    fn negation_and_groups() {
        assert_eq!(
            parse("-red"),
            AstNode::negate(AstNode::Affix(AffixNode::term("red")))
        );
        assert_eq!(
            parse("@title:(red | blue)"),
            AstNode::field(
                "title",
                AstNode::logical(
                    LogicalOp::Or,
                    vec![
                        AstNode::Affix(AffixNode::term("red")),
                        AstNode::Affix(AffixNode::term("blue")),
                    ]
                )
            )
        );
    }

    #[test]
    fn numeric_ranges() {
        assert_eq!(
            parse("@price:[10 20.5]"),
            AstNode::field("price", AstNode::Range(RangeNode { lo: 10.0, hi: 20.5 }))
        );
        assert_eq!(
            parse("@price:[-inf +inf]"),
            AstNode::field(
                "price",
                AstNode::Range(RangeNode {
                    lo: f64::NEG_INFINITY,
                    hi: f64::INFINITY,
                })
            )
        );
    }

    #[test]
    fn tag_sets() {
        assert_eq!(
            parse("@color:{red | bl*}"),
            AstNode::field(
                "color",
                AstNode::Tags(vec![
                    AffixNode::term("red"),
                    AffixNode::new(MatchKind::Prefix, "bl"),
                ])
            )
        );
    }

    #[test]
    fn knn_clause_with_options() {
        let params = QueryParams::new().with_vector("vec", vec![0.5, 0.5]);
        let node = parse_query("* =>[KNN 10 @v $vec EF_RUNTIME 80 AS dist]", Some(&params)).unwrap();
        let AstNode::Knn(knn) = node else {
            panic!("expected a knn node");
        };
        assert_eq!(knn.limit, 10);
        assert_eq!(knn.field, "v");
        assert_eq!(knn.vec, [0.5, 0.5]);
        assert_eq!(knn.ef_runtime, Some(80));
        assert_eq!(knn.score_alias, "dist");
        assert_eq!(*knn.filter, AstNode::Star);
    }

    #[test]
    fn knn_with_filter_expression() {
        let params = QueryParams::new().with_vector("q", vec![1.0]);
        let node = parse_query("@title:red =>[KNN 3 @v $q]", Some(&params)).unwrap();
        let AstNode::Knn(knn) = node else {
            panic!("expected a knn node");
        };
        assert_eq!(
            *knn.filter,
            AstNode::field("title", AstNode::Affix(AffixNode::term("red")))
        );
        assert_eq!(knn.score_alias, "");
        assert_eq!(knn.ef_runtime, None);
    }

    #[test]
    fn text_params_substitute_into_terms_and_bounds() {
        let params = QueryParams::new()
            .with_text("needle", "shoes")
            .with_text("max", "30");
        assert_eq!(
            parse_query("@title:$needle", Some(&params)).unwrap(),
            AstNode::field("title", AstNode::Affix(AffixNode::term("shoes")))
        );
        assert_eq!(
            parse_query("@price:[0 $max]", Some(&params)).unwrap(),
            AstNode::field("price", AstNode::Range(RangeNode { lo: 0.0, hi: 30.0 }))
        );
    }

    #[test]
    fn unknown_parameters_are_errors() {
        assert!(parse_query("$missing", None).is_err());
        assert!(parse_query("* =>[KNN 2 @v $missing]", None).is_err());
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(parse_query("@broken:[10", None).is_err());
        assert!(parse_query("(unclosed", None).is_err());
        assert!(parse_query("@f:{}", None).is_err());
    }
}
