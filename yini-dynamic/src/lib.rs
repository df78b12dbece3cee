//! yini-dynamic — dynamic-value update history and line-preserving
//! source write-back (`spec.md` §4.I).
//!
//! The history itself lives on `yini_eval::Document` (`update_dynamic`,
//! `dynamic_history_for`); this crate re-exports that surface and adds
//! `merge_updates_into_source`, which rewrites only the tracked lines of
//! an original source file, leaving everything else byte-for-byte intact.

pub use yini_eval::DynamicHistory;

use std::fs;
use std::path::Path;
use yini_eval::Document;
use yini_util::{ErrorKind, PositionedError, Result};

fn cannot_open_source(path: &Path, source: std::io::Error) -> PositionedError {
    PositionedError::without_position(ErrorKind::CannotOpenSource(format!(
        "{}: {source}",
        path.display()
    )))
}

fn cannot_open_target(path: &Path, source: std::io::Error) -> PositionedError {
    PositionedError::without_position(ErrorKind::CannotOpenTarget(format!(
        "{}: {source}",
        path.display()
    )))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Recognizes the section-header line shape `[Name]` or `[Name : Parents]`
/// (including the directive headers `[#define]`/`[#include]`/`[#schema]`),
/// returning the bare section/directive name.
fn section_header_name(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('[')?;
    let end = inner.find(']')?;
    let body = &inner[..end];
    let name = body.split(':').next().unwrap_or(body).trim();
    Some(name.to_string())
}

/// If `line`'s first non-whitespace content is `identifier =` (not `==`),
/// returns the identifier and the byte offset of the `=` within `line`.
fn split_entry_line(line: &str) -> Option<(&str, usize)> {
    let trimmed = line.trim_start();
    let leading_ws = line.len() - trimmed.len();
    let ident_len: usize = trimmed
        .chars()
        .take_while(|&c| is_ident_char(c))
        .map(char::len_utf8)
        .sum();
    if ident_len == 0 {
        return None;
    }
    let key = &trimmed[..ident_len];
    let after_ident = &trimmed[ident_len..];
    let after_ws_len = after_ident.len() - after_ident.trim_start().len();
    let after_ws = after_ident.trim_start();
    if !after_ws.starts_with('=') || after_ws.starts_with("==") {
        return None;
    }
    Some((key, leading_ws + ident_len + after_ws_len))
}

fn split_line_ending(raw: &str) -> (&str, &str) {
    if let Some(stripped) = raw.strip_suffix("\r\n") {
        (stripped, "\r\n")
    } else if let Some(stripped) = raw.strip_suffix('\n') {
        (stripped, "\n")
    } else {
        (raw, "")
    }
}

/// Rewrites `source_path` into `out_path` line by line:
///
/// 1. A section header updates the "current section."
/// 2. A `identifier = value` line whose `"section.key"` has non-empty
///    dynamic history is rewritten with the head of that history in place
///    of its old value; the original text up to the `=` is preserved
///    byte-for-byte.
/// 3. Everything else (comments, blank lines, untracked entries) passes
///    through unchanged.
pub fn merge_updates_into_source(doc: &Document, source_path: &Path, out_path: &Path) -> Result<()> {
    let source = fs::read_to_string(source_path).map_err(|e| cannot_open_source(source_path, e))?;

    let mut current_section = String::new();
    let mut out = String::with_capacity(source.len());

    for raw_line in source.split_inclusive('\n') {
        let (line, ending) = split_line_ending(raw_line);

        if let Some(name) = section_header_name(line) {
            current_section = name;
            out.push_str(raw_line);
            continue;
        }

        if let Some((key, eq_offset)) = split_entry_line(line) {
            let full_key = format!("{current_section}.{key}");
            if let Some(head) = doc
                .dynamic_history_for(&full_key)
                .and_then(|history| history.head().cloned())
            {
                out.push_str(&line[..eq_offset]);
                out.push_str("= ");
                out.push_str(&yini_codec::render_value(&head));
                out.push_str(ending);
                continue;
            }
        }

        out.push_str(raw_line);
    }

    fs::write(out_path, out).map_err(|e| cannot_open_target(out_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use yini_eval::{EvalConfig, Value};

    fn write_source(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn rewrites_only_tracked_entries() {
        let source = "// comment\n[Server]\nport = 8080\nhost = \"localhost\"\n\n[Other]\nport = 1\n";
        let src_file = write_source(source);
        let doc = yini_eval::evaluate_source(source, &EvalConfig::safe()).unwrap();
        doc.update_dynamic("Server.port", Value::Integer(9090));

        let out_dir = tempfile::tempdir().unwrap();
        let out_path = out_dir.path().join("out.yini");
        merge_updates_into_source(&doc, src_file.path(), &out_path).unwrap();

        let rewritten = fs::read_to_string(&out_path).unwrap();
        assert_eq!(
            rewritten,
            "// comment\n[Server]\nport = 9090\nhost = \"localhost\"\n\n[Other]\nport = 1\n"
        );
    }

    #[test]
    fn untracked_document_passes_through_verbatim() {
        let source = "[A]\n  x = 1\n// trailing comment\n\n[B]\ny = 2\n";
        let src_file = write_source(source);
        let doc = yini_eval::evaluate_source(source, &EvalConfig::safe()).unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let out_path = out_dir.path().join("out.yini");
        merge_updates_into_source(&doc, src_file.path(), &out_path).unwrap();

        assert_eq!(fs::read_to_string(&out_path).unwrap(), source);
    }

    #[test]
    fn history_head_wins_over_older_updates() {
        let source = "[S]\nv = 1\n";
        let src_file = write_source(source);
        let doc = yini_eval::evaluate_source(source, &EvalConfig::safe()).unwrap();
        doc.update_dynamic("S.v", Value::Integer(2));
        doc.update_dynamic("S.v", Value::Integer(3));

        let out_dir = tempfile::tempdir().unwrap();
        let out_path = out_dir.path().join("out.yini");
        merge_updates_into_source(&doc, src_file.path(), &out_path).unwrap();

        assert_eq!(fs::read_to_string(&out_path).unwrap(), "[S]\nv = 3\n");
    }

    #[test]
    fn preserves_indentation_around_rewritten_value() {
        let source = "[S]\n    v   =   1\n";
        let src_file = write_source(source);
        let doc = yini_eval::evaluate_source(source, &EvalConfig::safe()).unwrap();
        doc.update_dynamic("S.v", Value::Str("next".to_string()));

        let out_dir = tempfile::tempdir().unwrap();
        let out_path = out_dir.path().join("out.yini");
        merge_updates_into_source(&doc, src_file.path(), &out_path).unwrap();

        assert_eq!(fs::read_to_string(&out_path).unwrap(), "[S]\n    v   = \"next\"\n");
    }

    #[test]
    fn missing_source_file_is_an_io_error() {
        let doc = Document::new();
        let out_dir = tempfile::tempdir().unwrap();
        let err = merge_updates_into_source(
            &doc,
            Path::new("/nonexistent/path/does/not/exist.yini"),
            &out_dir.path().join("out.yini"),
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::CannotOpenSource(_)));
    }
}
