//! DOT export of a validated query's clause graph, gated behind the `dot`
//! feature and the `dot-writer` dependency.

use std::io::{self, Write};

use dot_writer::{Attributes, DotWriter};

use crate::ast::{Clause, ClauseData, Query};

/// Writes `query`'s clause sequence as a DOT digraph: one node per clause,
/// one edge clause `i` → clause `i+1`, labeled with the clause kind.
pub fn export_dot<W: Write>(query: &Query, out: &mut W) -> io::Result<()> {
    let mut buf = Vec::new();
    {
        let mut writer = DotWriter::from(&mut buf);
        writer.set_pretty_print(true);
        let mut digraph = writer.digraph();
        for (i, clause) in query.clauses.iter().enumerate() {
            let id = node_id(i);
            digraph.node_named(&id).set_label(&clause_label(clause));
        }
        for i in 0..query.clauses.len().saturating_sub(1) {
            digraph.edge(node_id(i), node_id(i + 1));
        }
    }
    out.write_all(&buf)
}

fn node_id(i: usize) -> String {
    format!("clause_{i}")
}

fn clause_label(clause: &Clause) -> String {
    match &clause.data {
        ClauseData::Match(m) if m.optional => "OPTIONAL MATCH".to_string(),
        ClauseData::Match(_) => "MATCH".to_string(),
        ClauseData::Create(_) => "CREATE".to_string(),
        ClauseData::Merge(_) => "MERGE".to_string(),
        ClauseData::Set(_) => "SET".to_string(),
        ClauseData::Remove(_) => "REMOVE".to_string(),
        ClauseData::Delete(d) if d.detach => "DETACH DELETE".to_string(),
        ClauseData::Delete(_) => "DELETE".to_string(),
        ClauseData::With(_) => "WITH".to_string(),
        ClauseData::Return(_) => "RETURN".to_string(),
        ClauseData::Unwind(_) => "UNWIND".to_string(),
        ClauseData::Foreach(_) => "FOREACH".to_string(),
        ClauseData::Call(c) => format!("CALL {}", c.name),
        ClauseData::CallSubquery(_) => "CALL {...}".to_string(),
        ClauseData::Union(u) if u.all => "UNION ALL".to_string(),
        ClauseData::Union(_) => "UNION".to_string(),
        ClauseData::Unsupported(u) => format!("? {}", u.name),
    }
}
