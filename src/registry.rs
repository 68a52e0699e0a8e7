//! Procedure and arithmetic-function registries. The front-end only
//! consumes their shape — resolving what a procedure or function actually
//! *does* is outside this crate's job — so these are small trait objects
//! the validator queries, plus a built-in registry covering the common
//! Cypher-ish standard library.

use fnv::FnvHashMap;

/// Either a fixed argument count or "accepts any number".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

#[derive(Debug, Clone)]
pub struct ProcedureSignature {
    pub argc: Arity,
    pub is_read_only: bool,
    pub outputs: Vec<String>,
}

impl ProcedureSignature {
    pub fn contains_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|o| o == name)
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn output_name(&self, i: usize) -> Option<&str> {
        self.outputs.get(i).map(String::as_str)
    }
}

pub trait ProcedureRegistry {
    fn lookup(&self, name: &str) -> Option<&ProcedureSignature>;
}

pub trait ArithmeticFunctionRegistry {
    fn exists(&self, name: &str) -> bool;
    fn is_aggregate(&self, name: &str) -> bool;
}

/// A small, built-in registry covering the usual procedure/function
/// vocabulary, grounded on the procedure tables in `other_examples/`'s
/// GQL/Cypher-adjacent parsers. Production deployments are expected to
/// supply their own registry wired to the real storage engine.
pub struct BuiltinProcedureRegistry {
    procedures: FnvHashMap<&'static str, ProcedureSignature>,
}

impl BuiltinProcedureRegistry {
    pub fn new() -> Self {
        let mut procedures = FnvHashMap::default();
        procedures.insert(
            "db.labels",
            ProcedureSignature { argc: Arity::Fixed(0), is_read_only: true, outputs: vec!["label".into()] },
        );
        procedures.insert(
            "db.relationshipTypes",
            ProcedureSignature { argc: Arity::Fixed(0), is_read_only: true, outputs: vec!["relationshipType".into()] },
        );
        procedures.insert(
            "db.propertyKeys",
            ProcedureSignature { argc: Arity::Fixed(0), is_read_only: true, outputs: vec!["propertyKey".into()] },
        );
        procedures.insert(
            "db.schema.visualization",
            ProcedureSignature {
                argc: Arity::Fixed(0),
                is_read_only: true,
                outputs: vec!["nodes".into(), "relationships".into()],
            },
        );
        procedures.insert(
            "apoc.create.node",
            ProcedureSignature { argc: Arity::Fixed(2), is_read_only: false, outputs: vec!["node".into()] },
        );
        procedures.insert(
            "apoc.periodic.iterate",
            ProcedureSignature { argc: Arity::Variadic, is_read_only: false, outputs: vec!["batches".into(), "total".into()] },
        );
        BuiltinProcedureRegistry { procedures }
    }
}

impl Default for BuiltinProcedureRegistry {
    fn default() -> Self {
        BuiltinProcedureRegistry::new()
    }
}

impl ProcedureRegistry for BuiltinProcedureRegistry {
    fn lookup(&self, name: &str) -> Option<&ProcedureSignature> {
        self.procedures.get(name)
    }
}

const AGGREGATE_FUNCTIONS: &[&str] = &["count", "sum", "avg", "min", "max", "collect", "stdev", "stdevp", "percentilecont", "percentiledisc"];

const SCALAR_AND_LIST_FUNCTIONS: &[&str] = &[
    "id", "labels", "type", "properties", "keys", "coalesce", "head", "last", "size", "length", "exists",
    "startnode", "endnode", "nodes", "relationships", "range", "reverse", "tail", "abs", "ceil", "floor",
    "rand", "round", "sign", "sqrt", "toboolean", "tofloat", "tointeger", "tostring", "trim", "ltrim", "rtrim",
    "lower", "upper", "left", "right", "replace", "split", "substring", "point", "distance",
];

/// Whether `name` is one of the built-in aggregate functions, independent of
/// any registry instance. Used by [`crate::handle::Ast::is_eager`], which
/// needs to recognize aggregation without holding a `dyn
/// ArithmeticFunctionRegistry` (the handle outlives the validation pass that
/// had one).
pub fn is_builtin_aggregate_name(name: &str) -> bool {
    AGGREGATE_FUNCTIONS.contains(&name.to_ascii_lowercase().as_str())
}

pub struct BuiltinFunctionRegistry;

impl ArithmeticFunctionRegistry for BuiltinFunctionRegistry {
    fn exists(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        AGGREGATE_FUNCTIONS.contains(&lower.as_str()) || SCALAR_AND_LIST_FUNCTIONS.contains(&lower.as_str())
    }

    fn is_aggregate(&self, name: &str) -> bool {
        AGGREGATE_FUNCTIONS.contains(&name.to_ascii_lowercase().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_is_positional_and_bounds_checked() {
        let sig = ProcedureSignature { argc: Arity::Fixed(0), is_read_only: true, outputs: vec!["nodes".into(), "relationships".into()] };
        assert_eq!(sig.output_name(0), Some("nodes"));
        assert_eq!(sig.output_name(1), Some("relationships"));
        assert_eq!(sig.output_name(2), None);
    }

    #[test]
    fn builtin_registry_resolves_known_procedures() {
        let registry = BuiltinProcedureRegistry::new();
        let sig = registry.lookup("db.schema.visualization").expect("registered");
        assert_eq!(sig.output_count(), 2);
        assert_eq!(sig.output_name(0), Some("nodes"));
        assert!(registry.lookup("not.a.procedure").is_none());
    }
}
