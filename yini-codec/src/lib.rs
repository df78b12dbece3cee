//! yini-codec — DOM serializers: canonical text, structured JSON-like
//! trees, and the compact binary cache (`spec.md` §4.F/§4.G/§4.H).

mod binary;
mod structured;
mod text;

pub use binary::{decode, encode, load_binary, save_binary, CacheReader};
pub use structured::{from_structured, to_structured};
pub use text::{render_value, serialize};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write as _;
    use yini_eval::{EvalConfig, Value};

    #[test]
    fn serialize_then_parse_round_trips_values() {
        let source = "[#define]\nbase = \"/srv\"\n\n[Server]\nport = 8080\nhost = \"localhost\"\ncolor = Color(255, 0, 0)\ntags = [\"a\", \"b\"]\n";
        let doc = yini_eval::evaluate_source(source, &EvalConfig::safe()).unwrap();
        let text = serialize(&doc);
        let reparsed = yini_eval::evaluate_source(&text, &EvalConfig::safe()).unwrap();
        assert_eq!(doc.lookup("Server", "port"), reparsed.lookup("Server", "port"));
        assert_eq!(doc.lookup("Server", "host"), reparsed.lookup("Server", "host"));
        assert_eq!(doc.lookup("Server", "color"), reparsed.lookup("Server", "color"));
        assert_eq!(doc.lookup("Server", "tags"), reparsed.lookup("Server", "tags"));
    }

    #[test]
    fn structured_round_trips_every_variant() {
        let samples = vec![
            Value::Nil,
            Value::Integer(-7),
            Value::Float(3.5),
            Value::Bool(true),
            Value::Str("hello".to_string()),
            Value::Array(vec![Value::Integer(1), Value::Integer(2)]),
            Value::List(vec![Value::Str("x".to_string())]),
            Value::Tuple(vec![Value::Integer(1), Value::Integer(2)]),
            Value::Set(vec![Value::Bool(false)]),
            Value::Color(yini_eval::Color::rgba(1, 2, 3, 4)),
            Value::Coord(yini_eval::Coord::xyz(1.0, 2.0, 3.0)),
            Value::Path("/etc/yini".to_string()),
            Value::Dynamic(Box::new(Value::Integer(9))),
            Value::Reference("Section.key".to_string()),
            Value::Env("YINI_DEBUG".to_string()),
        ];
        for value in samples {
            let json = to_structured(&value);
            let back = from_structured(&json).unwrap();
            assert_eq!(value, back);
        }
    }

    #[test]
    fn binary_cache_round_trips_a_document() {
        let source = "[#define]\nname = \"db\"\n\n[Base]\nretries = 3\n\n[Server : Base]\nport = 5432\nhost = \"localhost\"\nratio = 0.5\nenabled = true\ntags = [\"a\", \"b\", \"c\"]\nscores = [1, 2, 3]\nweights = [1.0, 2.5]\nflags = [true, false]\ncolor = Color(10, 20, 30, 40)\npos = Coord(1.0, 2.0, 3.0)\nnested = [1, \"mixed\"]\n";
        let doc = yini_eval::evaluate_source(source, &EvalConfig::safe()).unwrap();
        let bytes = encode(&doc).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.lookup("Server", "port"), Some(Value::Integer(5432)));
        assert_eq!(decoded.lookup("Server", "host"), doc.lookup("Server", "host"));
        assert_eq!(decoded.lookup("Server", "ratio"), doc.lookup("Server", "ratio"));
        assert_eq!(decoded.lookup("Server", "enabled"), doc.lookup("Server", "enabled"));
        assert_eq!(decoded.lookup("Server", "tags"), doc.lookup("Server", "tags"));
        assert_eq!(decoded.lookup("Server", "scores"), doc.lookup("Server", "scores"));
        assert_eq!(decoded.lookup("Server", "weights"), doc.lookup("Server", "weights"));
        assert_eq!(decoded.lookup("Server", "flags"), doc.lookup("Server", "flags"));
        assert_eq!(decoded.lookup("Server", "color"), doc.lookup("Server", "color"));
        assert_eq!(decoded.lookup("Server", "pos"), doc.lookup("Server", "pos"));
        assert_eq!(decoded.lookup("Server", "nested"), doc.lookup("Server", "nested"));
    }

    #[test]
    fn binary_cache_file_round_trips_via_mmap() {
        let source = "[S]\nport = 99\nname = \"x\"\n";
        let doc = yini_eval::evaluate_source(source, &EvalConfig::safe()).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let bytes = encode(&doc).unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let loaded = load_binary(file.path()).unwrap();
        assert_eq!(loaded.lookup("S", "port"), Some(Value::Integer(99)));

        let reader = CacheReader::open(file.path()).unwrap();
        assert_eq!(reader.get("S.port").unwrap(), Some(Value::Integer(99)));
        assert_eq!(reader.get("S.name").unwrap(), Some(Value::Str("x".to_string())));
        assert_eq!(reader.get("S.missing").unwrap(), None);
    }

    #[test]
    fn binary_cache_rejects_bad_magic() {
        let mut bytes = vec![0u8; 64];
        bytes[0..4].copy_from_slice(b"NOPE");
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err.kind, yini_util::ErrorKind::CorruptCache(_)));
    }

    #[test]
    fn binary_cache_rejects_future_version() {
        let doc = yini_eval::evaluate_source("[S]\nv = 1\n", &EvalConfig::safe()).unwrap();
        let mut bytes = encode(&doc).unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err.kind, yini_util::ErrorKind::UnsupportedCacheVersion(99)));
    }

    fn arb_leaf_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Nil),
            any::<i64>().prop_map(Value::Integer),
            (-1e9f64..1e9).prop_map(Value::Float),
            any::<bool>().prop_map(Value::Bool),
            "[a-zA-Z0-9_]{0,12}".prop_map(Value::Str),
        ]
    }

    proptest! {
        #[test]
        fn structured_round_trip_is_lossless_for_leaves(value in arb_leaf_value()) {
            let json = to_structured(&value);
            let back = from_structured(&json).unwrap();
            prop_assert_eq!(value, back);
        }
    }
}
