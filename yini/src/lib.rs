//! yini — the consumer-facing library surface over the YINI pipeline
//! (`spec.md` §6 "Consumer-facing API").
//!
//! Wraps lex → parse → evaluate behind a single [`YiniDocument`] handle and
//! the codec/write-back crates behind inherent methods, so callers never
//! touch `yini-lex`/`yini-parse` directly. Every fallible call appends to a
//! caller-owned [`DiagnosticSink`] rather than panicking or aborting.

use std::path::Path;

pub use yini_eval::{Color, Coord, DeclaredType, EvalConfig, NullPolicy, Value, DEFAULT_ENV_ALLOW_LIST};
pub use yini_util::{Diagnostic, DiagnosticSink, ErrorKind, Severity};

use yini_eval::Document;
use yini_util::PositionedError;

/// Aggregates every knob a caller can hand the facade in one place, so
/// `parse_with_options` has room to grow cache/serializer settings without
/// breaking its signature — currently just the evaluator's config.
#[derive(Clone, Debug, Default)]
pub struct Options {
    pub eval: EvalConfig,
}

impl Options {
    pub fn safe() -> Self {
        Self { eval: EvalConfig::safe() }
    }

    pub fn unrestricted() -> Self {
        Self { eval: EvalConfig::unrestricted() }
    }
}

/// An opaque handle over an evaluated document. The DOM itself uses
/// interior locking (`yini_eval::Document`), so a shared `&YiniDocument`
/// already supports concurrent readers per `spec.md` §5.
pub struct YiniDocument {
    doc: Document,
}

impl YiniDocument {
    /// Parses and evaluates `source` under the default (safe-mode) config,
    /// appending a diagnostic to `diagnostics` on failure. The pipeline is
    /// fail-fast (§7), so at most one error is ever appended per call.
    pub fn parse(source: &str, diagnostics: &mut DiagnosticSink) -> Option<Self> {
        Self::parse_with_options(source, &Options::safe(), diagnostics)
    }

    pub fn parse_with_config(
        source: &str,
        config: &EvalConfig,
        diagnostics: &mut DiagnosticSink,
    ) -> Option<Self> {
        Self::parse_with_options(source, &Options { eval: config.clone() }, diagnostics)
    }

    pub fn parse_with_options(
        source: &str,
        options: &Options,
        diagnostics: &mut DiagnosticSink,
    ) -> Option<Self> {
        let span = tracing::info_span!("yini_parse_and_evaluate", bytes = source.len());
        let _guard = span.enter();
        match yini_eval::evaluate_source(source, &options.eval) {
            Ok(doc) => Some(Self { doc }),
            Err(err) => {
                tracing::warn!(error = %err, "parse/evaluate failed");
                diagnostics.push_error(err);
                None
            }
        }
    }

    pub fn lookup(&self, section: &str, key: &str) -> Option<Value> {
        self.doc.lookup(section, key)
    }

    pub fn section_names(&self) -> Vec<String> {
        self.doc.section_names()
    }

    pub fn set_string(&self, section: &str, key: &str, v: impl Into<String>) {
        self.doc.set_string(section, key, v);
    }

    pub fn set_int(&self, section: &str, key: &str, v: i64) {
        self.doc.set_int(section, key, v);
    }

    pub fn set_float(&self, section: &str, key: &str, v: f64) {
        self.doc.set_float(section, key, v);
    }

    pub fn set_bool(&self, section: &str, key: &str, v: bool) {
        self.doc.set_bool(section, key, v);
    }

    /// Records a new value for a `dynamic(...)`-wrapped entry, for later
    /// inclusion by [`Self::merge_into_source`].
    pub fn update_dynamic(&self, key: impl Into<String>, value: Value) {
        self.doc.update_dynamic(key, value);
    }

    /// Renders the document back to canonical YINI text (`spec.md` §4.F).
    pub fn to_text(&self) -> String {
        yini_codec::serialize(&self.doc)
    }

    /// Writes the document to `path` as a binary cache (`spec.md` §4.H).
    pub fn save_binary(&self, path: &Path) -> Result<(), Diagnostic> {
        yini_codec::save_binary(&self.doc, path).map_err(as_diagnostic)
    }

    /// Loads a binary cache previously written by [`Self::save_binary`].
    /// Cache read failures are recoverable: per §7, callers may fall back
    /// to parsing the text source instead of treating this as fatal.
    pub fn load_binary(path: &Path) -> Result<Self, Diagnostic> {
        yini_codec::load_binary(path).map(|doc| Self { doc }).map_err(as_diagnostic)
    }

    /// Rewrites `original_path` into `new_path`, replacing only the lines
    /// whose entries carry dynamic-update history (`spec.md` §4.I).
    pub fn merge_into_source(&self, original_path: &Path, new_path: &Path) -> Result<(), Diagnostic> {
        yini_dynamic::merge_updates_into_source(&self.doc, original_path, new_path).map_err(as_diagnostic)
    }
}

fn as_diagnostic(err: PositionedError) -> Diagnostic {
    Diagnostic::from_error(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_success_yields_no_diagnostics() {
        let mut diagnostics = DiagnosticSink::new();
        let doc = YiniDocument::parse("[S]\nv = 1\n", &mut diagnostics);
        assert!(doc.is_some());
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn parse_failure_reports_one_diagnostic_and_no_document() {
        let mut diagnostics = DiagnosticSink::new();
        let doc = YiniDocument::parse("[S\nv = 1\n", &mut diagnostics);
        assert!(doc.is_none());
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.iter().count(), 1);
    }

    #[test]
    fn lookup_and_setters_round_trip() {
        let mut diagnostics = DiagnosticSink::new();
        let doc = YiniDocument::parse("[S]\nv = 1\n", &mut diagnostics).unwrap();
        doc.set_int("S", "v", 42);
        assert_eq!(doc.lookup("S", "v"), Some(Value::Integer(42)));
        doc.set_string("S", "name", "demo");
        assert_eq!(doc.lookup("S", "name"), Some(Value::Str("demo".to_string())));
    }

    #[test]
    fn binary_cache_round_trips_through_files() {
        let mut diagnostics = DiagnosticSink::new();
        let doc = YiniDocument::parse("[S]\nv = 1\nname = \"x\"\n", &mut diagnostics).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.ybin");
        doc.save_binary(&path).unwrap();
        let loaded = YiniDocument::load_binary(&path).unwrap();
        assert_eq!(loaded.lookup("S", "v"), Some(Value::Integer(1)));
        assert_eq!(loaded.lookup("S", "name"), Some(Value::Str("x".to_string())));
    }

    #[test]
    fn merge_into_source_rewrites_only_dynamic_entries() {
        let mut diagnostics = DiagnosticSink::new();
        let source = "[S]\nv = 1\nname = \"x\"\n";
        let doc = YiniDocument::parse(source, &mut diagnostics).unwrap();
        doc.update_dynamic("S.v", Value::Integer(77));

        let dir = tempfile::tempdir().unwrap();
        let src_path = dir.path().join("in.yini");
        std::fs::write(&src_path, source).unwrap();
        let out_path = dir.path().join("out.yini");
        doc.merge_into_source(&src_path, &out_path).unwrap();

        assert_eq!(
            std::fs::read_to_string(&out_path).unwrap(),
            "[S]\nv = 77\nname = \"x\"\n"
        );
    }

    #[test]
    fn cache_read_failure_is_a_diagnostic_not_a_panic() {
        let err = YiniDocument::load_binary(Path::new("/nonexistent/cache.ybin")).unwrap_err();
        assert!(matches!(err.error.as_ref().map(|e| &e.kind), Some(ErrorKind::CannotOpenSource(_))));
    }
}
