//! The tagged `Value` enumeration shared by every downstream consumer
//! (`spec.md` §3 "Value").

use indexmap::IndexMap;
use std::fmt;

/// An RGB color with an optional alpha channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: Option<u8>,
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: None }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a: Some(a) }
    }

    /// Parses the six raw hex digits from a `#rrggbb` lexical literal.
    pub fn from_hex_digits(hex: &str) -> Option<Self> {
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::rgb(r, g, b))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.a {
            Some(a) => write!(f, "Color({}, {}, {}, {})", self.r, self.g, self.b, a),
            None => write!(f, "Color({}, {}, {})", self.r, self.g, self.b),
        }
    }
}

/// A 2D or 3D coordinate. `is_3d` tracks whether `z` was given explicitly
/// so the serializers can tell `Coord(x, y)` from `Coord(x, y, 0)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub is_3d: bool,
}

impl Coord {
    pub fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0, is_3d: false }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, is_3d: true }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_3d {
            write!(f, "Coord({}, {}, {})", self.x, self.y, self.z)
        } else {
            write!(f, "Coord({}, {})", self.x, self.y)
        }
    }
}

/// The tagged value enumeration. Equality is structural throughout; floats
/// compare bit-for-bit via `PartialEq` on `f64`, which is adequate here
/// since values reaching this type were either literal text or produced by
/// deterministic arithmetic, never by independent floating computations
/// that ought to be compared with tolerance.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Integer(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Array(Vec<Value>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    Map(IndexMap<String, Value>),
    Color(Color),
    Coord(Coord),
    Path(String),
    Dynamic(Box<Value>),
    Reference(String),
    Env(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Color(_) => "color",
            Value::Coord(_) => "coord",
            Value::Path(_) => "path",
            Value::Dynamic(_) => "dynamic",
            Value::Reference(_) => "reference",
            Value::Env(_) => "env",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64_or(&self, default: i64) -> i64 {
        self.as_i64().unwrap_or(default)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) | Value::Path(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn try_as_color(&self) -> Option<&Color> {
        match self {
            Value::Color(c) => Some(c),
            _ => None,
        }
    }

    pub fn try_as_coord(&self) -> Option<&Coord> {
        match self {
            Value::Coord(c) => Some(c),
            _ => None,
        }
    }

    /// The innermost non-dynamic, non-reference value, following `Dynamic`
    /// wrappers. References/env values that survived to this point
    /// indicate an evaluator bug (they should always be fully resolved by
    /// the time callers see a document), so they are returned unwrapped.
    pub fn peel_dynamic(&self) -> &Value {
        match self {
            Value::Dynamic(inner) => inner.peel_dynamic(),
            other => other,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Value::Dynamic(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::Array(items) => write_seq(f, "[", "]", items),
            Value::List(items) => write_constructor_seq(f, "List", items),
            Value::Tuple(items) => write_seq(f, "(", ")", items),
            Value::Set(items) => write_constructor_seq(f, "Set", items),
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Color(c) => write!(f, "{c}"),
            Value::Coord(c) => write!(f, "{c}"),
            Value::Path(p) => write!(f, "Path({p:?})"),
            Value::Dynamic(inner) => write!(f, "Dyna({inner})"),
            Value::Reference(name) => write!(f, "@{name}"),
            Value::Env(name) => write!(f, "${{{name}}}"),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, close: &str, items: &[Value]) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{v}")?;
    }
    write!(f, "{close}")
}

fn write_constructor_seq(f: &mut fmt::Formatter<'_>, name: &str, items: &[Value]) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{v}")?;
    }
    write!(f, ")")
}
