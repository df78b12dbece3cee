//! yini-eval — the tree-walking evaluator and document object model.
//!
//! Consumes a `yini_parse::Document` AST and produces the DOM described in
//! `spec.md` §3/§4.D/§4.E: typed sections with resolved entries, an
//! inheritance-merged and reference-resolved value graph, and schema
//! validation.

mod config;
mod dom;
mod evaluator;
mod value;

pub use config::{EvalConfig, DEFAULT_ENV_ALLOW_LIST};
pub use dom::{DeclaredType, Document, DynamicHistory, NullPolicy, Section, SchemaRule};
pub use evaluator::evaluate;
pub use value::{Color, Coord, Value};

/// Parses and evaluates `source` in one call, the common entry point for
/// callers that don't need the intermediate AST.
pub fn evaluate_source(source: &str, config: &EvalConfig) -> yini_util::Result<Document> {
    let ast = yini_parse::parse_document(source)?;
    evaluate(&ast, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yini_util::ErrorKind;

    fn eval(source: &str) -> yini_util::Result<Document> {
        evaluate_source(source, &EvalConfig::safe())
    }

    #[test]
    fn evaluates_simple_section() {
        let doc = eval("[Server]\nport = 8080\nhost = \"localhost\"\n").unwrap();
        assert_eq!(doc.lookup("Server", "port"), Some(Value::Integer(8080)));
        assert_eq!(
            doc.lookup("Server", "host"),
            Some(Value::Str("localhost".to_string()))
        );
    }

    #[test]
    fn inheritance_merge_prefers_child_then_later_parent() {
        let doc = eval(
            "[P1]\na = 1\nb = 1\n[P2]\nb = 2\nc = 2\n[Child : P1, P2]\na = 99\n",
        )
        .unwrap();
        assert_eq!(doc.lookup("Child", "a"), Some(Value::Integer(99)));
        assert_eq!(doc.lookup("Child", "b"), Some(Value::Integer(2)));
        assert_eq!(doc.lookup("Child", "c"), Some(Value::Integer(2)));
    }

    #[test]
    fn unknown_parent_fails() {
        let err = eval("[Child : Ghost]\nx = 1\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownParent("Ghost".to_string()));
    }

    #[test]
    fn circular_inheritance_fails() {
        let err = eval("[A : B]\nx = 1\n[B : A]\ny = 2\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::CircularInheritance { .. }));
    }

    #[test]
    fn resolves_define_reference() {
        let doc = eval("[#define]\nbase = \"/srv\"\n[S]\npath = @base\n").unwrap();
        assert_eq!(doc.lookup("S", "path"), Some(Value::Str("/srv".to_string())));
    }

    #[test]
    fn resolves_dom_reference() {
        let doc = eval("[A]\nv = 42\n[B]\nw = @{A.v}\n").unwrap();
        assert_eq!(doc.lookup("B", "w"), Some(Value::Integer(42)));
    }

    #[test]
    fn unresolved_reference_fails() {
        let err = eval("[S]\nv = @missing\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnresolvedReference("missing".to_string()));
    }

    #[test]
    fn circular_reference_fails() {
        let err = eval("[A]\nx = @{B.y}\n[B]\ny = @{A.x}\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::CircularReference { .. }));
    }

    #[test]
    fn env_var_outside_allow_list_fails_in_safe_mode() {
        let err = eval("[S]\nv = ${NOT_ALLOWED}\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::EnvNotAllowed("NOT_ALLOWED".to_string()));
    }

    #[test]
    fn env_var_allowed_when_unrestricted() {
        std::env::set_var("YINI_TEST_ENV_VAR_UNRESTRICTED", "value");
        let doc = evaluate_source(
            "[S]\nv = ${YINI_TEST_ENV_VAR_UNRESTRICTED}\n",
            &EvalConfig::unrestricted(),
        )
        .unwrap();
        assert_eq!(doc.lookup("S", "v"), Some(Value::Str("value".to_string())));
        std::env::remove_var("YINI_TEST_ENV_VAR_UNRESTRICTED");
    }

    #[test]
    fn constructor_values_evaluate() {
        let doc = eval("[S]\nc = Color(10, 20, 30)\nd = Coord(1.5, 2.5)\n").unwrap();
        assert_eq!(
            doc.lookup("S", "c"),
            Some(Value::Color(Color::rgb(10, 20, 30)))
        );
        assert_eq!(doc.lookup("S", "d"), Some(Value::Coord(Coord::xy(1.5, 2.5))));
    }

    #[test]
    fn dyna_wraps_inner_value() {
        let doc = eval("[S]\nv = Dyna(7)\n").unwrap();
        assert_eq!(doc.lookup("S", "v"), Some(Value::Dynamic(Box::new(Value::Integer(7)))));
    }

    #[test]
    fn schema_fills_missing_default() {
        let doc = eval(
            "[#schema]\nS.port = !, int, default=8080, on_empty=default\n[S]\nother = 1\n",
        )
        .unwrap();
        assert_eq!(doc.lookup("S", "port"), Some(Value::Integer(8080)));
    }

    #[test]
    fn schema_missing_required_without_default_fails() {
        let err = eval("[#schema]\nS.port = !, int\n[S]\nother = 1\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MissingRequired { .. }));
    }

    #[test]
    fn schema_type_mismatch_fails() {
        let err = eval("[#schema]\nS.port = !, int\n[S]\nport = \"notanumber\"\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn schema_range_check_fails() {
        let err = eval("[#schema]\nS.port = !, int, min=1, max=100\n[S]\nport = 9000\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::OutOfRange { .. }));
    }
}
