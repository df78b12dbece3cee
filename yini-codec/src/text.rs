//! DOM → canonical YINI text (`spec.md` §4.F).
//!
//! Deterministic ordering: `[#define]` first (keys sorted), then
//! `[#include]`, then user sections in declaration order; within a
//! section, entries (insertion order) precede `+=` lines.

use std::fmt::Write as _;
use yini_eval::{Color, Coord, Document, Value};

pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();

    if !doc.defines.is_empty() {
        out.push_str("[#define]\n");
        let mut keys: Vec<&String> = doc.defines.keys().collect();
        keys.sort();
        for key in keys {
            let _ = writeln!(out, "{key} = {}", render(&doc.defines[key]));
        }
        out.push('\n');
    }

    if !doc.includes.is_empty() {
        out.push_str("[#include]\n");
        for include in &doc.includes {
            let _ = writeln!(out, "+= {include:?}");
        }
        out.push('\n');
    }

    doc.with_sections(|sections| {
        for section in sections {
            if section.inherited_names.is_empty() {
                let _ = writeln!(out, "[{}]", section.name);
            } else {
                let _ = writeln!(out, "[{} : {}]", section.name, section.inherited_names.join(", "));
            }
            for (key, value) in &section.entries {
                let _ = writeln!(out, "{key} = {}", render(value));
            }
            for value in &section.registration_list {
                let _ = writeln!(out, "+= {}", render(value));
            }
            out.push('\n');
        }
    });

    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

/// Renders a single value the same way [`serialize`] would, for callers
/// (e.g. write-back) that need one value's textual form in isolation.
pub fn render_value(value: &Value) -> String {
    render(value)
}

fn render(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Integer(v) => v.to_string(),
        Value::Float(v) => render_float(*v),
        Value::Bool(v) => v.to_string(),
        Value::Str(v) => format!("{v:?}"),
        Value::Array(items) => render_seq("[", "]", items),
        Value::List(items) => render_constructor("List", items),
        Value::Tuple(items) if items.len() == 1 => format!("({},)", render(&items[0])),
        Value::Tuple(items) => render_seq("(", ")", items),
        Value::Set(items) => render_constructor("Set", items),
        Value::Map(entries) => {
            let mut keys: Vec<&String> = entries.keys().collect();
            keys.sort();
            let rendered: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{k}: {}", render(&entries[k])))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
        Value::Color(c) => render_color(c),
        Value::Coord(c) => render_coord(c),
        Value::Path(p) => format!("Path({p:?})"),
        Value::Dynamic(inner) => format!("Dyna({})", render(inner)),
        Value::Reference(name) => {
            if name.contains('.') {
                format!("@{{{name}}}")
            } else {
                format!("@{name}")
            }
        }
        Value::Env(name) => format!("${{{name}}}"),
    }
}

/// Renders a float so it always re-lexes as a float token rather than an
/// integer one: the lexer's float literal requires a `.` followed by a
/// digit, but `f64`'s `Display` drops the fractional part entirely for
/// whole values (`2.0` -> `"2"`), which would silently turn a float back
/// into an integer on reparse.
fn render_float(v: f64) -> String {
    let rendered = v.to_string();
    if rendered.contains('.') {
        rendered
    } else {
        format!("{rendered}.0")
    }
}

fn render_seq(open: &str, close: &str, items: &[Value]) -> String {
    let rendered: Vec<String> = items.iter().map(render).collect();
    format!("{open}{}{close}", rendered.join(", "))
}

fn render_constructor(name: &str, items: &[Value]) -> String {
    let rendered: Vec<String> = items.iter().map(render).collect();
    format!("{name}({})", rendered.join(", "))
}

fn render_color(c: &Color) -> String {
    match c.a {
        Some(a) => format!("Color({}, {}, {}, {})", c.r, c.g, c.b, a),
        None => format!("Color({}, {}, {})", c.r, c.g, c.b),
    }
}

fn render_coord(c: &Coord) -> String {
    if c.is_3d {
        format!("Coord({}, {}, {})", c.x, c.y, c.z)
    } else {
        format!("Coord({}, {})", c.x, c.y)
    }
}
