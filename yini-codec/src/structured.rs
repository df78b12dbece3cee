//! DOM ↔ structured tree, for external tools and as the basis for cache
//! companion files (`spec.md` §4.G).
//!
//! Domain and wrapper types encode as `{"__type__": "<Tag>", "value": …}`;
//! primitives and arrays/maps map directly onto JSON's own shapes.

use indexmap::IndexMap;
use serde_json::{json, Value as Json};
use yini_eval::{Color, Coord, Value};
use yini_util::{ErrorKind, PositionedError, Result};

pub fn to_structured(value: &Value) -> Json {
    match value {
        Value::Nil => Json::Null,
        Value::Integer(v) => json!(v),
        Value::Float(v) => json!(v),
        Value::Bool(v) => json!(v),
        Value::Str(v) => json!(v),
        Value::Array(items) => Json::Array(items.iter().map(to_structured).collect()),
        Value::List(items) => tagged("List", Json::Array(items.iter().map(to_structured).collect())),
        Value::Tuple(items) => tagged("Tuple", Json::Array(items.iter().map(to_structured).collect())),
        Value::Set(items) => tagged("Set", Json::Array(items.iter().map(to_structured).collect())),
        Value::Map(entries) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in entries {
                obj.insert(k.clone(), to_structured(v));
            }
            tagged("Map", Json::Object(obj))
        }
        Value::Color(c) => tagged("Color", color_json(c)),
        Value::Coord(c) => tagged("Coord", coord_json(c)),
        Value::Path(p) => tagged("Path", json!(p)),
        Value::Dynamic(inner) => tagged("Dyna", to_structured(inner)),
        Value::Reference(name) => tagged("Reference", json!(name)),
        Value::Env(name) => tagged("Env", json!(name)),
    }
}

fn tagged(tag: &str, value: Json) -> Json {
    json!({ "__type__": tag, "value": value })
}

fn color_json(c: &Color) -> Json {
    match c.a {
        Some(a) => json!({ "r": c.r, "g": c.g, "b": c.b, "a": a }),
        None => json!({ "r": c.r, "g": c.g, "b": c.b }),
    }
}

fn coord_json(c: &Coord) -> Json {
    json!({ "x": c.x, "y": c.y, "z": c.z, "is_3d": c.is_3d })
}

pub fn from_structured(json: &Json) -> Result<Value> {
    match json {
        Json::Null => Ok(Value::Nil),
        Json::Bool(v) => Ok(Value::Bool(*v)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else {
                Ok(Value::Float(n.as_f64().unwrap_or(0.0)))
            }
        }
        Json::String(s) => Ok(Value::Str(s.clone())),
        Json::Array(items) => Ok(Value::Array(
            items.iter().map(from_structured).collect::<Result<Vec<_>>>()?,
        )),
        Json::Object(obj) => {
            if let (Some(Json::String(tag)), Some(inner)) = (obj.get("__type__"), obj.get("value")) {
                return from_tagged(tag, inner);
            }
            let mut map = IndexMap::new();
            for (k, v) in obj {
                map.insert(k.clone(), from_structured(v)?);
            }
            Ok(Value::Map(map))
        }
    }
}

fn from_tagged(tag: &str, inner: &Json) -> Result<Value> {
    match tag {
        "List" => Ok(Value::List(from_array(inner)?)),
        "Tuple" => Ok(Value::Tuple(from_array(inner)?)),
        "Set" => Ok(Value::Set(from_array(inner)?)),
        "Map" => match inner {
            Json::Object(obj) => {
                let mut map = IndexMap::new();
                for (k, v) in obj {
                    map.insert(k.clone(), from_structured(v)?);
                }
                Ok(Value::Map(map))
            }
            other => Err(corrupt(format!("Map envelope value must be an object, got {other}"))),
        },
        "Color" => from_color(inner),
        "Coord" => from_coord(inner),
        "Path" => inner
            .as_str()
            .map(|s| Value::Path(s.to_string()))
            .ok_or_else(|| corrupt("Path envelope value must be a string".to_string())),
        "Dyna" => Ok(Value::Dynamic(Box::new(from_structured(inner)?))),
        "Reference" => inner
            .as_str()
            .map(|s| Value::Reference(s.to_string()))
            .ok_or_else(|| corrupt("Reference envelope value must be a string".to_string())),
        "Env" => inner
            .as_str()
            .map(|s| Value::Env(s.to_string()))
            .ok_or_else(|| corrupt("Env envelope value must be a string".to_string())),
        other => Err(corrupt(format!("unknown structured tag {other:?}"))),
    }
}

fn from_array(inner: &Json) -> Result<Vec<Value>> {
    match inner {
        Json::Array(items) => items.iter().map(from_structured).collect(),
        other => Err(corrupt(format!("expected a JSON array, got {other}"))),
    }
}

fn from_color(inner: &Json) -> Result<Value> {
    let obj = inner
        .as_object()
        .ok_or_else(|| corrupt("Color envelope value must be an object".to_string()))?;
    let byte = |key: &str| -> Result<u8> {
        obj.get(key)
            .and_then(Json::as_u64)
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| corrupt(format!("Color.{key} must be an integer in 0..=255")))
    };
    let r = byte("r")?;
    let g = byte("g")?;
    let b = byte("b")?;
    let a = match obj.get("a") {
        Some(v) => Some(v.as_u64().and_then(|v| u8::try_from(v).ok()).ok_or_else(|| {
            corrupt("Color.a must be an integer in 0..=255".to_string())
        })?),
        None => None,
    };
    Ok(Value::Color(Color { r, g, b, a }))
}

fn from_coord(inner: &Json) -> Result<Value> {
    let obj = inner
        .as_object()
        .ok_or_else(|| corrupt("Coord envelope value must be an object".to_string()))?;
    let num = |key: &str| -> Result<f64> {
        obj.get(key)
            .and_then(Json::as_f64)
            .ok_or_else(|| corrupt(format!("Coord.{key} must be numeric")))
    };
    let x = num("x")?;
    let y = num("y")?;
    let z = obj.get("z").and_then(Json::as_f64).unwrap_or(0.0);
    let is_3d = obj.get("is_3d").and_then(Json::as_bool).unwrap_or(false);
    Ok(Value::Coord(Coord { x, y, z, is_3d }))
}

// The error taxonomy has no dedicated "malformed structured tree" kind;
// `CorruptCache` is the closest fit since the structured form doubles as
// the cache's companion representation (§4.G).
fn corrupt(reason: String) -> PositionedError {
    PositionedError::without_position(ErrorKind::CorruptCache(reason))
}
