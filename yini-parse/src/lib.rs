//! yini-parse — recursive-descent parser producing the YINI AST.
//!
//! Consumes the token stream from `yini-lex` and produces a [`Document`]
//! (`spec.md` §4.C): `[#define]`, `[#include]`, `[#schema]`, and ordinary
//! `[Name : Parent, ...]` sections, with value expressions folded to
//! literals wherever the grammar allows parse-time arithmetic.

pub mod ast;
mod parser;

pub use ast::{
    Document, Expr, Requirement, SchemaFieldAst, SchemaSectionAst, SectionAst, TopLevelUnit,
};
pub use parser::{parse_document, Parser};

#[cfg(test)]
mod tests {
    use super::*;
    use yini_util::ErrorKind;

    #[test]
    fn parses_simple_section() {
        let doc = parse_document("[Server]\nport = 8080\nhost = \"localhost\"\n").unwrap();
        assert_eq!(doc.units.len(), 1);
        match &doc.units[0] {
            TopLevelUnit::Section(s) => {
                assert_eq!(s.name, "Server");
                assert_eq!(s.entries, vec![
                    ("port".to_string(), Expr::Integer(8080)),
                    ("host".to_string(), Expr::Str("localhost".to_string())),
                ]);
            }
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn parses_inheritance_list() {
        let doc = parse_document("[Child : Base1, Base2]\nx = 1\n").unwrap();
        match &doc.units[0] {
            TopLevelUnit::Section(s) => {
                assert_eq!(s.parents, vec!["Base1".to_string(), "Base2".to_string()]);
            }
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_section_names_are_rejected() {
        let err = parse_document("[A]\nx = 1\n[A]\ny = 2\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateSectionName("A".to_string()));
    }

    #[test]
    fn folds_integer_arithmetic_at_parse_time() {
        let doc = parse_document("[S]\nv = 1 + 2 * 3\n").unwrap();
        match &doc.units[0] {
            TopLevelUnit::Section(s) => assert_eq!(s.entries[0].1, Expr::Integer(7)),
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn integer_overflow_in_expression_fails() {
        let err = parse_document("[S]\nv = 9223372036854775807 + 1\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArithmeticOverflow);
    }

    #[test]
    fn divide_by_zero_fails() {
        let err = parse_document("[S]\nv = 1 / 0\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivideByZero);
    }

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        let doc = parse_document("[S]\nv = 1 + 2.5\n").unwrap();
        match &doc.units[0] {
            TopLevelUnit::Section(s) => assert_eq!(s.entries[0].1, Expr::Float(3.5)),
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn parses_array_tuple_and_map() {
        let doc = parse_document("[S]\na = [1, 2, 3]\nt = (1, 2)\ng = (1)\nm = {x: 1, y: 2}\n").unwrap();
        match &doc.units[0] {
            TopLevelUnit::Section(s) => {
                assert_eq!(
                    s.entries[0].1,
                    Expr::Array(vec![Expr::Integer(1), Expr::Integer(2), Expr::Integer(3)])
                );
                assert_eq!(
                    s.entries[1].1,
                    Expr::Tuple(vec![Expr::Integer(1), Expr::Integer(2)])
                );
                assert_eq!(s.entries[2].1, Expr::Grouping(Box::new(Expr::Integer(1))));
                assert_eq!(
                    s.entries[3].1,
                    Expr::Map(vec![
                        ("x".to_string(), Expr::Integer(1)),
                        ("y".to_string(), Expr::Integer(2)),
                    ])
                );
            }
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn trailing_comma_forces_single_element_tuple() {
        let doc = parse_document("[S]\nt = (1,)\n").unwrap();
        match &doc.units[0] {
            TopLevelUnit::Section(s) => {
                assert_eq!(s.entries[0].1, Expr::Tuple(vec![Expr::Integer(1)]));
            }
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn parses_constructor_calls() {
        let doc = parse_document("[S]\nc = Color(255, 0, 0)\nd = Dyna(1)\n").unwrap();
        match &doc.units[0] {
            TopLevelUnit::Section(s) => {
                assert_eq!(
                    s.entries[0].1,
                    Expr::Constructor {
                        name: "Color".to_string(),
                        args: vec![Expr::Integer(255), Expr::Integer(0), Expr::Integer(0)],
                    }
                );
                assert_eq!(
                    s.entries[1].1,
                    Expr::Constructor {
                        name: "Dyna".to_string(),
                        args: vec![Expr::Integer(1)],
                    }
                );
            }
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn unknown_constructor_call_fails() {
        let err = parse_document("[S]\nc = Frobnicate(1)\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownCallee("Frobnicate".to_string()));
    }

    #[test]
    fn parses_references_and_env_vars() {
        let doc = parse_document("[S]\na = @base\nb = @{Other.key}\nc = ${YINI_LOCALE}\n").unwrap();
        match &doc.units[0] {
            TopLevelUnit::Section(s) => {
                assert_eq!(s.entries[0].1, Expr::DefineRef("base".to_string()));
                assert_eq!(s.entries[1].1, Expr::DomRef("Other.key".to_string()));
                assert_eq!(s.entries[2].1, Expr::EnvVar("YINI_LOCALE".to_string()));
            }
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn parses_quick_registration() {
        let doc = parse_document("[S]\n+= 1\n+= 2\n").unwrap();
        match &doc.units[0] {
            TopLevelUnit::Section(s) => {
                assert_eq!(s.registrations, vec![Expr::Integer(1), Expr::Integer(2)]);
            }
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn parses_define_and_include() {
        let doc = parse_document(
            "[#define]\nbase = \"/etc/app\"\n[#include]\n+= \"a.yini\"\n+= \"b.yini\"\n",
        )
        .unwrap();
        match &doc.units[0] {
            TopLevelUnit::Define(entries) => {
                assert_eq!(entries[0].0, "base");
            }
            other => panic!("expected define, got {other:?}"),
        }
        match &doc.units[1] {
            TopLevelUnit::Include(includes) => {
                assert_eq!(includes.len(), 2);
            }
            other => panic!("expected include, got {other:?}"),
        }
    }

    #[test]
    fn parses_schema_section() {
        let doc = parse_document(
            "[#schema]\nServer.port = !, int, min=1, max=65535\nServer.host = ?, string, default=\"localhost\"\n",
        )
        .unwrap();
        match &doc.units[0] {
            TopLevelUnit::Schema(sections) => {
                assert_eq!(sections.len(), 1);
                assert_eq!(sections[0].section, "Server");
                assert_eq!(sections[0].fields.len(), 2);
                assert_eq!(sections[0].fields[0].key, "port");
                assert_eq!(sections[0].fields[0].requirement, Requirement::Required);
                assert_eq!(sections[0].fields[0].type_name, "int");
                assert_eq!(sections[0].fields[0].min, Some(Expr::Integer(1)));
            }
            other => panic!("expected schema, got {other:?}"),
        }
    }

    #[test]
    fn parses_array_of_t_schema_type() {
        let doc = parse_document("[#schema]\nS.tags = ?, array[string]\n").unwrap();
        match &doc.units[0] {
            TopLevelUnit::Schema(sections) => {
                assert_eq!(sections[0].fields[0].type_name, "array");
                assert_eq!(sections[0].fields[0].element_type, Some("string".to_string()));
            }
            other => panic!("expected schema, got {other:?}"),
        }
    }

    #[test]
    fn hex_color_literal_is_parsed() {
        let doc = parse_document("[S]\nc = #ff00aa\n").unwrap();
        match &doc.units[0] {
            TopLevelUnit::Section(s) => assert_eq!(s.entries[0].1, Expr::Color("ff00aa".to_string())),
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn bare_identifier_is_a_value() {
        let doc = parse_document("[S]\nmode = production\n").unwrap();
        match &doc.units[0] {
            TopLevelUnit::Section(s) => assert_eq!(s.entries[0].1, Expr::Ident("production".to_string())),
            other => panic!("expected section, got {other:?}"),
        }
    }
}
