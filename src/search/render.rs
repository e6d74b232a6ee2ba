//! SPARQL rendering of composed queries
//!
//! Attributes are rendered as terms of the collection type's namespace
//! (`oa:Annotation` → `PREFIX : <http://www.w3.org/ns/oa#>`). The data
//! query and the count query share the same `WHERE` filter text; sort
//! patterns only ever appear in the data query.

use crate::core::field::FieldValue;
use crate::core::query::Direction;
use crate::core::scope::Scope;
use crate::search::compose::{CountQuery, DataQuery};
use crate::search::order::{OrderTerm, ValueExpr};
use crate::search::predicate::{Leaf, Operator, Predicate};
use indexmap::IndexSet;
use std::fmt::Write;

const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

impl DataQuery {
    /// Render as a SPARQL `SELECT`, one row per record
    ///
    /// Sort patterns on the record's own attributes stay inside the GRAPH
    /// group; label lookups through a reference may cross graphs.
    pub fn to_sparql(&self) -> String {
        let mut own = IndexSet::new();
        let mut linked = IndexSet::new();
        for term in self.order() {
            for expr in &term.key.chain {
                let Some(pattern) = sort_pattern(expr, self.predicate(), self.language()) else {
                    continue;
                };
                match expr {
                    ValueExpr::Attribute(_) => own.insert(pattern),
                    _ => linked.insert(pattern),
                };
            }
        }

        let mut out = prologue(self.scope());
        out.push_str("SELECT ?uri WHERE {\n");
        out.push_str(&filter_block(self.scope(), self.predicate(), &own));
        for pattern in linked {
            let _ = writeln!(out, "  {}", pattern);
        }
        out.push_str("}\nGROUP BY ?uri\n");

        let keys: Vec<String> = self
            .order()
            .iter()
            .filter_map(|term| order_key(term, self.predicate(), self.language()))
            .collect();
        if !keys.is_empty() {
            let _ = writeln!(out, "ORDER BY {}", keys.join(" "));
        }

        let window = self.window();
        if let Some(limit) = window.limit() {
            let _ = writeln!(out, "LIMIT {}", limit);
            if window.offset() > 0 {
                let _ = writeln!(out, "OFFSET {}", window.offset());
            }
        }
        out
    }
}

impl CountQuery {
    /// Render as a SPARQL distinct-record count
    pub fn to_sparql(&self) -> String {
        let mut out = prologue(self.scope());
        out.push_str("SELECT (COUNT(DISTINCT ?uri) AS ?count) WHERE {\n");
        out.push_str(&filter_block(self.scope(), self.predicate(), &IndexSet::new()));
        out.push_str("}\n");
        out
    }
}

fn prologue(scope: &Scope) -> String {
    format!("PREFIX : <{}>\n", namespace_of(scope.rdf_type().as_str()))
}

fn namespace_of(iri: &str) -> &str {
    match iri.rfind(['#', '/']) {
        Some(pos) => &iri[..=pos],
        None => iri,
    }
}

/// The graph pattern and filters, identical for both queries
///
/// `inner` patterns are appended inside the GRAPH group, after the filters.
fn filter_block(scope: &Scope, predicate: &Predicate, inner: &IndexSet<String>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  GRAPH <{}> {{", scope.graph());
    let _ = writeln!(out, "    ?uri a <{}> .", scope.rdf_type());

    let mut bound = IndexSet::new();
    for leaf in predicate.leaves() {
        match leaf.operator {
            Operator::Exists => {
                let _ = writeln!(out, "    FILTER EXISTS {{ ?uri :{} [] }}", leaf.attribute);
            }
            Operator::NotExists => {
                let _ = writeln!(out, "    FILTER NOT EXISTS {{ ?uri :{} [] }}", leaf.attribute);
            }
            _ => {
                if bound.insert(leaf.attribute.as_str()) {
                    let _ = writeln!(out, "    ?uri :{0} ?{0} .", leaf.attribute);
                }
                let _ = writeln!(out, "    FILTER({})", condition(&leaf.attribute, leaf));
            }
        }
    }

    for node in predicate.scopes() {
        let var = scope_var(&node.relationship);
        let _ = writeln!(out, "    {{");
        let _ = writeln!(out, "      ?uri :{} ?{} .", node.relationship, var);
        for leaf in &node.leaves {
            let _ = writeln!(out, "      FILTER({})", condition(&var, leaf));
        }
        let _ = writeln!(out, "    }}");
    }

    for pattern in inner {
        let _ = writeln!(out, "    {}", pattern);
    }
    out.push_str("  }\n");
    out
}

/// Variable bound by the scoping node of `relationship`
fn scope_var(relationship: &str) -> String {
    format!("{}_value", relationship)
}

/// Variable holding the value of one sort expression
///
/// An attribute that already has a scoping node sorts on the node's
/// variable, so only values the filter kept take part in the ordering.
fn sort_var(expr: &ValueExpr, predicate: &Predicate) -> String {
    match expr {
        ValueExpr::Identifier => "uri".to_string(),
        ValueExpr::Attribute(attribute) if predicate.scope_node(attribute).is_some() => {
            scope_var(attribute)
        }
        other => format!("sort_{}", other.var_name()),
    }
}

fn condition(var: &str, leaf: &Leaf) -> String {
    let value = leaf.value.as_ref().map(literal).unwrap_or_default();
    match leaf.operator {
        Operator::Equals => format!("?{} = {}", var, value),
        Operator::RegexContainsCi => format!("REGEX(STR(?{}), {}, \"i\")", var, value),
        Operator::GreaterOrEqual => format!("?{} >= {}", var, value),
        Operator::LessOrEqual => format!("?{} <= {}", var, value),
        Operator::LangMatches => format!(
            "LANG(?{0}) = \"\" || LANGMATCHES(LANG(?{0}), {1})",
            var, value
        ),
        Operator::Exists => format!("BOUND(?{})", var),
        Operator::NotExists => format!("!BOUND(?{})", var),
    }
}

/// The optional pattern binding one sort expression
///
/// A localized label without a request language binds nothing, and an
/// attribute with a scoping node is already bound by the filter.
fn sort_pattern(expr: &ValueExpr, predicate: &Predicate, language: Option<&str>) -> Option<String> {
    match expr {
        ValueExpr::Identifier => None,
        ValueExpr::Attribute(attribute) if predicate.scope_node(attribute).is_some() => None,
        ValueExpr::Attribute(attribute) => Some(format!(
            "OPTIONAL {{ ?uri :{} ?{} }}",
            attribute,
            sort_var(expr, predicate)
        )),
        ValueExpr::LocalizedLabel { via, label } => language.map(|lang| {
            format!(
                "OPTIONAL {{ ?uri :{via} ?sort_{via}_ref . ?sort_{via}_ref :{label} ?sort_{var} FILTER(LANGMATCHES(LANG(?sort_{var}), {lang})) }}",
                via = via,
                label = label,
                var = expr.var_name(),
                lang = literal(&FieldValue::text(lang)),
            )
        }),
        ValueExpr::DefaultLabel { via, label } => Some(format!(
            "OPTIONAL {{ ?uri :{via} ?sort_{via}_ref . ?sort_{via}_ref :{label} ?sort_{var} FILTER(LANG(?sort_{var}) = \"\") }}",
            via = via,
            label = label,
            var = expr.var_name(),
        )),
    }
}

/// `None` when no expression of the chain can bind under `language`
fn order_key(term: &OrderTerm, predicate: &Predicate, language: Option<&str>) -> Option<String> {
    let direction = match term.direction {
        Direction::Asc => "ASC",
        Direction::Desc => "DESC",
    };
    if term.is_identifier() {
        return Some(format!("{}(?uri)", direction));
    }

    let fold = |var: String| {
        if term.key.case_insensitive {
            format!("LCASE(?{})", var)
        } else {
            format!("?{}", var)
        }
    };
    let candidates: Vec<String> = term
        .key
        .chain
        .iter()
        .filter(|expr| !matches!(expr, ValueExpr::LocalizedLabel { .. }) || language.is_some())
        .map(|expr| match expr {
            ValueExpr::Identifier => "?uri".to_string(),
            other => fold(sort_var(other, predicate)),
        })
        .collect();

    let key = match candidates.as_slice() {
        [] => return None,
        [single] => single.clone(),
        many => format!("COALESCE({})", many.join(", ")),
    };
    Some(format!("{}(MIN({}))", direction, key))
}

/// SPARQL literal or IRI reference for a value
fn literal(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => quoted(s),
        FieldValue::LangText { value, lang } => match lang {
            Some(lang) => format!("{}@{}", quoted(value), lang),
            None => quoted(value),
        },
        FieldValue::Iri(iri) => format!("<{}>", iri),
        FieldValue::DateTime(dt) => format!("{}^^<{}>", quoted(&dt.to_rfc3339()), XSD_DATETIME),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Boolean(b) => b.to_string(),
    }
}

fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::annotation::AnnotationCollection;
    use crate::collections::motivation::MotivationCollection;
    use crate::config::EngineConfig;
    use crate::core::query::{Criteria, OrderBy};
    use crate::search::compose::{PageWindow, QueryPair};
    use crate::search::order::OrderingResolver;
    use crate::search::predicate::build_predicate;

    fn pair(criteria: &[(&str, &str)], order: &[OrderBy], language: Option<&str>) -> QueryPair {
        let scope = EngineConfig::default_config().scope("annotations").unwrap();
        let criteria: Criteria = criteria
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect();
        let predicate =
            build_predicate::<AnnotationCollection>(&scope, &criteria, language).unwrap();
        let order = OrderingResolver::for_collection::<AnnotationCollection>()
            .resolve(order)
            .unwrap();
        QueryPair::compose(
            &scope,
            predicate,
            order,
            PageWindow::new(2, Some(10), 20, 1000).unwrap(),
        )
        .with_language(language)
    }

    #[test]
    fn test_count_filter_is_part_of_data_query() {
        let pair = pair(
            &[("target", "test:so1"), ("author", "test:user1")],
            &[OrderBy::asc("motivation")],
            Some("fr"),
        );
        let data = pair.data().to_sparql();
        let count = pair.count().to_sparql();

        // Everything up to the GRAPH closer; the data query may add sort
        // patterns before it
        let count_filters = count
            .split_once("WHERE {\n")
            .and_then(|(_, body)| body.strip_suffix("  }\n}\n"))
            .unwrap();
        assert!(data.contains(count_filters));
        assert!(count.contains("COUNT(DISTINCT ?uri)"));
        assert!(!count.contains("ORDER BY"));
        assert!(!count.contains("OPTIONAL"));
        assert!(!count.contains("LIMIT"));
    }

    #[test]
    fn test_relationship_filters_in_one_group() {
        let pair = pair(&[("target", "test:so1")], &[], None);
        let data = pair.data().to_sparql();
        assert_eq!(data.matches("?uri :targets ?targets_value .").count(), 1);
        assert!(data.contains("FILTER(?targets_value = <"));
    }

    #[test]
    fn test_order_fallback_and_window() {
        let pair = pair(&[], &[OrderBy::desc("motivation")], Some("fr"));
        let data = pair.data().to_sparql();
        assert!(data.contains(
            "ORDER BY DESC(MIN(COALESCE(LCASE(?sort_motivation_name), LCASE(?sort_motivation_default_name)))) ASC(?uri)"
        ));
        assert!(data.contains("LANGMATCHES(LANG(?sort_motivation_name), \"fr\")"));
        assert!(data.contains("LIMIT 10\nOFFSET 20"));
    }

    #[test]
    fn test_localized_label_skipped_without_language() {
        let pair = pair(&[], &[OrderBy::asc("motivation")], None);
        let data = pair.data().to_sparql();
        assert!(!data.contains("?sort_motivation_name "));
        assert!(data.contains("ASC(MIN(LCASE(?sort_motivation_default_name)))"));
    }

    #[test]
    fn test_own_attribute_sort_stays_in_graph() {
        let pair = pair(&[], &[OrderBy::desc("created")], None);
        let data = pair.data().to_sparql();
        assert!(data.contains("    OPTIONAL { ?uri :created ?sort_created }\n  }\n}"));
        assert!(data.contains("DESC(MIN(?sort_created))"));
    }

    #[test]
    fn test_scoped_attribute_sorts_on_filtered_variable() {
        let scope = EngineConfig::default_config().scope("motivations").unwrap();
        let predicate =
            build_predicate::<MotivationCollection>(&scope, &Criteria::new(), Some("fr")).unwrap();
        let order = OrderingResolver::for_collection::<MotivationCollection>()
            .resolve(&[OrderBy::asc("name")])
            .unwrap();
        let data = QueryPair::compose(&scope, predicate, order, PageWindow::all())
            .with_language(Some("fr"))
            .data()
            .to_sparql();

        assert!(data.contains("LANGMATCHES(LANG(?name_value), \"fr\")"));
        assert!(data.contains("ORDER BY ASC(MIN(LCASE(?name_value)))"));
        assert!(!data.contains("?sort_name"));
        assert!(!data.contains("OPTIONAL"));
    }

    #[test]
    fn test_literals_are_escaped() {
        assert_eq!(quoted("a \"b\" \\ c"), "\"a \\\"b\\\" \\\\ c\"");
        assert_eq!(
            literal(&FieldValue::label("décrire", Some("fr"))),
            "\"décrire\"@fr"
        );
    }
}
