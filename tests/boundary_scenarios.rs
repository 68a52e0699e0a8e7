//! End-to-end pipeline tests for the literal boundary scenarios and the
//! cross-cutting invariants they're drawn from: every statement must still
//! parse, rewrite and validate the same way no matter how many times it's
//! run, a subquery's scope must never leak into its caller, and UNION
//! branches must agree on shape before they're allowed to combine.

use assert_matches::assert_matches;
use cypher_frontend::{run, Error};

fn err(text: &str) -> Error {
    run(text).expect_err("expected a diagnostic").error
}

#[test]
fn empty_query_is_rejected() {
    assert_matches!(err(""), Error::EmptyQuery);
}

#[test]
fn multiple_statements_are_rejected() {
    assert_matches!(err("RETURN 1; RETURN 2"), Error::MultipleStatements);
}

#[test]
fn create_cannot_redeclare_a_matched_node() {
    assert_matches!(err("MATCH (a) CREATE (a)"), Error::Redeclare(_, name, _) if name == "a");
}

#[test]
fn create_may_anchor_a_matched_node_to_a_new_relationship() {
    run("MATCH (a) CREATE (a)-[:R]->(:B) RETURN a").expect("anchoring an existing node is ordinary graph extension");
}

#[test]
fn non_returning_subquery_rejects_non_trivial_imports() {
    assert_matches!(err("WITH 1 AS a CALL {WITH a+1 AS b RETURN b} RETURN b"), Error::CallSubqueryInvalidReferences);
}

#[test]
fn all_shortest_paths_rejects_a_minimum_length_above_one() {
    assert_matches!(
        err("MATCH (a),(b),p = allShortestPaths((a)-[*2..]->(b)) RETURN p"),
        Error::AllShortestPathMinimalLength
    );
}

#[test]
fn create_siblings_cannot_see_each_others_new_bindings() {
    assert_matches!(err("CREATE (a {v:1}),(b {v:a.v+1})"), Error::NotDefined(name) if name == "a");
}

#[test]
fn union_all_branches_with_matching_columns_are_accepted() {
    run("MATCH (a) RETURN a UNION ALL MATCH (a) RETURN a").expect("UNION ALL with agreeing columns is legal");
}

#[test]
fn union_and_union_all_cannot_mix_in_one_query() {
    assert_matches!(
        err("MATCH (a) RETURN a UNION MATCH (a) RETURN a UNION ALL MATCH (a) RETURN a"),
        Error::UnionCombination
    );
}

#[test]
fn unwind_alias_cannot_be_reused_as_a_match_node() {
    assert_matches!(err("UNWIND [1,2] AS n MATCH (n) RETURN n"), Error::VariableAlreadyDeclared(name) if name == "n");
}

// --- Cross-cutting invariants ---

const IDEMPOTENCE_QUERIES: &[&str] = &[
    "MATCH (a)-[:R]->(b) RETURN a, b",
    "MATCH (a) WHERE a.x > 1 WITH a, count(*) AS c RETURN a, c ORDER BY c DESC LIMIT 10",
    "CREATE (a:Person {name: 'x'})-[:KNOWS]->(b:Person) RETURN a, b",
    "MATCH (a) OPTIONAL MATCH (a)-->(b) WITH a, b CALL {WITH a RETURN a.x AS y} RETURN a, b, y",
    "UNWIND range(1, 3) AS i MATCH (a) WHERE a.id = i RETURN a",
];

#[test]
fn running_the_pipeline_twice_agrees() {
    for q in IDEMPOTENCE_QUERIES {
        let first = run(q).map(|ast| ast.body().clauses.len());
        let second = run(q).map(|ast| ast.body().clauses.len());
        match (first, second) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "clause count diverged across runs of {q:?}"),
            (Err(a), Err(b)) => assert_eq!(a.error.to_string(), b.error.to_string(), "error diverged across runs of {q:?}"),
            _ => panic!("accept/reject diverged across runs of {q:?}"),
        }
    }
}

#[test]
fn refcount_soundness_shallow_copies_outlive_the_master() {
    let master = run("MATCH (a) RETURN a").expect("valid query");
    let copy = master.shallow_copy();
    drop(master);
    assert_eq!(copy.body().clauses.len(), 1);
}

#[test]
fn subquery_scope_does_not_leak_into_the_caller() {
    // `b` is only ever bound inside the subquery; referencing it outside
    // must fail exactly as if the subquery had never run.
    assert_matches!(err("CALL {WITH 1 AS b RETURN b} RETURN b"), Error::NotDefined(name) if name == "b");
}

#[test]
fn foreach_scope_does_not_leak_into_the_caller() {
    assert_matches!(
        err("MATCH (a) FOREACH (x IN [1,2] | SET a.seen = x) RETURN x"),
        Error::NotDefined(name) if name == "x"
    );
}

#[test]
fn union_requires_every_branch_to_return_the_same_columns() {
    assert_matches!(
        err("MATCH (a) RETURN a UNION MATCH (a) RETURN a AS b"),
        Error::UnionMismatchedReturns
    );
}

#[test]
fn union_accepts_more_than_two_branches() {
    run("MATCH (a) RETURN a UNION MATCH (a) RETURN a UNION MATCH (a) RETURN a")
        .expect("a three-branch UNION with agreeing columns is legal");
}

#[test]
fn call_after_an_update_requires_a_with_boundary() {
    assert_matches!(err("CREATE (a) CALL db.labels() YIELD label RETURN label"), Error::MissingWith(_));
}

#[test]
fn call_subquery_after_an_update_requires_a_with_boundary() {
    // Non-returning, so it survives rewriting as a `CallSubquery` clause
    // instead of being inlined away before validation ever sees it.
    assert_matches!(err("CREATE (a) CALL {MATCH (b) SET b.x = 1} RETURN a"), Error::MissingWith(_));
}

#[test]
fn non_returning_subquery_with_star_import_sees_the_whole_outer_scope() {
    run("MATCH (a) WITH a, a.x AS y CALL {WITH * MATCH (a)-->(c) SET c.seen = y} RETURN a, y")
        .expect("WITH * imports every outer-scope name into the subquery, including `y`");
}

#[test]
fn build_return_column_names_reflects_the_final_return() {
    let ast = run("MATCH (a) WITH a RETURN a AS person, a.age AS age").expect("valid query");
    assert_eq!(ast.build_return_column_names(), vec!["person".to_string(), "age".to_string()]);
}

#[test]
fn build_call_column_names_collects_every_yield_alias() {
    let ast = run("CALL db.labels() YIELD label AS l RETURN l").expect("valid query");
    assert_eq!(ast.build_call_column_names(), vec!["l".to_string()]);
}

#[test]
fn collect_aliases_includes_generated_names_for_anonymous_nodes() {
    let ast = run("MATCH (a)-->() RETURN a").expect("valid query");
    let aliases = ast.collect_aliases();
    assert!(aliases.contains(&"a".to_string()));
    assert!(aliases.iter().any(|name| name.starts_with('@')), "expected a generated alias, got {aliases:?}");
}

#[test]
fn anonymous_nodes_get_distinct_generated_aliases() {
    let ast = run("MATCH (a)-->() , ()-->(b) RETURN a, b").expect("anonymous pattern elements are legal");
    let names: Vec<&str> = ast
        .body()
        .clauses
        .iter()
        .flat_map(|c| match &c.data {
            cypher_frontend::ast::ClauseData::Match(m) => m.patterns.iter().flat_map(|p| p.nodes.iter()).filter_map(|n| n.variable.as_deref()).collect::<Vec<_>>(),
            _ => Vec::new(),
        })
        .collect();
    let anon: Vec<&&str> = names.iter().filter(|n| n.starts_with('@')).collect();
    assert_eq!(anon.len(), 2, "expected one generated alias per anonymous node, got {names:?}");
    assert_ne!(anon[0], anon[1], "generated aliases must be distinct");
}
