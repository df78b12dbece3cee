//! Document object model: sections, defines, includes, schema, dynamic
//! history (`spec.md` §3, §4.E).

use crate::value::Value;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::VecDeque;
use yini_util::limits::MAX_DYNAMIC_HISTORY;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NullPolicy {
    Ignore,
    Default,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SchemaRule {
    pub required: bool,
    pub declared_type: Option<DeclaredType>,
    pub null_policy: NullPolicy,
    pub default_value: Option<Value>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// The declared type of a schema-checked key; `ArrayOf` owns its element
/// type name rather than borrowing, since schema rules are long-lived.
#[derive(Clone, Debug, PartialEq)]
pub enum DeclaredType {
    Int,
    Float,
    Bool,
    String,
    Array,
    ArrayOf(String),
}

impl DeclaredType {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            DeclaredType::Int => value.is_numeric(),
            DeclaredType::Float => value.is_numeric(),
            DeclaredType::Bool => matches!(value, Value::Bool(_)),
            DeclaredType::String => matches!(value, Value::Str(_) | Value::Path(_)),
            DeclaredType::Array => matches!(value, Value::Array(_)),
            DeclaredType::ArrayOf(elem) => match value {
                Value::Array(items) => items.iter().all(|v| element_type_accepts(elem, v)),
                _ => false,
            },
        }
    }

    pub fn name(&self) -> String {
        match self {
            DeclaredType::Int => "int".to_string(),
            DeclaredType::Float => "float".to_string(),
            DeclaredType::Bool => "bool".to_string(),
            DeclaredType::String => "string".to_string(),
            DeclaredType::Array => "array".to_string(),
            DeclaredType::ArrayOf(elem) => format!("array[{elem}]"),
        }
    }
}

fn element_type_accepts(elem: &str, value: &Value) -> bool {
    match elem {
        "int" => value.is_numeric(),
        "float" => value.is_numeric(),
        "bool" => matches!(value, Value::Bool(_)),
        "string" => matches!(value, Value::Str(_) | Value::Path(_)),
        _ => true,
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Section {
    pub name: String,
    pub inherited_names: Vec<String>,
    pub entries: IndexMap<String, Value>,
    pub registration_list: Vec<Value>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inherited_names: Vec::new(),
            entries: IndexMap::new(),
            registration_list: Vec::new(),
        }
    }
}

/// A bounded history of dynamic-value updates, most recent first.
/// `spec.md` §4.I: `updateDynamic` prepends and truncates to
/// `MAX_DYNAMIC_HISTORY`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DynamicHistory(VecDeque<Value>);

impl DynamicHistory {
    pub fn push(&mut self, value: Value) {
        self.0.push_front(value);
        self.0.truncate(MAX_DYNAMIC_HISTORY);
    }

    pub fn head(&self) -> Option<&Value> {
        self.0.front()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }
}

/// The document object model produced by evaluation.
///
/// Mutation APIs (`set_*`, `add_section`, `merge`) are serialized through
/// an internal lock per §4.E's thread-safety contract: readers of an
/// unshared `Document` pay no synchronization cost, but any caller that
/// shares a handle across threads sees either the pre- or post-mutation
/// state, never a torn write.
#[derive(Debug, Default)]
pub struct Document {
    sections: RwLock<Vec<Section>>,
    pub defines: IndexMap<String, Value>,
    pub includes: Vec<String>,
    pub schema: IndexMap<String, IndexMap<String, SchemaRule>>,
    dynamic_history: RwLock<IndexMap<String, DynamicHistory>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document from the evaluator's final pass output. Defines,
    /// includes, and schema are established once during evaluation and
    /// are not part of the mutation contract §4.E describes for sections.
    pub fn from_parts(
        sections: Vec<Section>,
        defines: IndexMap<String, Value>,
        includes: Vec<String>,
        schema: IndexMap<String, IndexMap<String, SchemaRule>>,
    ) -> Self {
        Self {
            sections: RwLock::new(sections),
            defines,
            includes,
            schema,
            dynamic_history: RwLock::new(IndexMap::new()),
        }
    }

    pub fn section_names(&self) -> Vec<String> {
        self.sections.read().iter().map(|s| s.name.clone()).collect()
    }

    pub fn section_count(&self) -> usize {
        self.sections.read().len()
    }

    pub fn find_section(&self, name: &str) -> Option<Section> {
        self.sections.read().iter().find(|s| s.name == name).cloned()
    }

    pub fn lookup(&self, section: &str, key: &str) -> Option<Value> {
        self.sections
            .read()
            .iter()
            .find(|s| s.name == section)
            .and_then(|s| s.entries.get(key).cloned())
    }

    pub fn with_sections<R>(&self, f: impl FnOnce(&[Section]) -> R) -> R {
        f(&self.sections.read())
    }

    pub fn push_section(&self, section: Section) {
        self.sections.write().push(section);
    }

    pub fn replace_section(&self, name: &str, section: Section) {
        let mut sections = self.sections.write();
        if let Some(slot) = sections.iter_mut().find(|s| s.name == name) {
            *slot = section;
        } else {
            sections.push(section);
        }
    }

    /// `set_string/int/float/bool(section, key, v)` from §4.E, folded into
    /// one typed setter since `Value` already distinguishes the variants.
    pub fn set_value(&self, section: &str, key: &str, value: Value) {
        let mut sections = self.sections.write();
        match sections.iter_mut().find(|s| s.name == section) {
            Some(existing) => {
                existing.entries.insert(key.to_string(), value);
            }
            None => {
                let mut s = Section::new(section);
                s.entries.insert(key.to_string(), value);
                sections.push(s);
            }
        }
    }

    pub fn set_string(&self, section: &str, key: &str, v: impl Into<String>) {
        self.set_value(section, key, Value::Str(v.into()));
    }

    pub fn set_int(&self, section: &str, key: &str, v: i64) {
        self.set_value(section, key, Value::Integer(v));
    }

    pub fn set_float(&self, section: &str, key: &str, v: f64) {
        self.set_value(section, key, Value::Float(v));
    }

    pub fn set_bool(&self, section: &str, key: &str, v: bool) {
        self.set_value(section, key, Value::Bool(v));
    }

    /// Merges `other` into `self`: `other`'s keys overwrite matching keys,
    /// registration lists extend, and sections present only in `other` are
    /// appended — `spec.md` §4.E / §4.I.
    pub fn merge(&self, other: &Document) {
        let other_sections = other.sections.read();
        let mut sections = self.sections.write();
        for incoming in other_sections.iter() {
            match sections.iter_mut().find(|s| s.name == incoming.name) {
                Some(existing) => {
                    for (k, v) in incoming.entries.iter() {
                        existing.entries.insert(k.clone(), v.clone());
                    }
                    existing
                        .registration_list
                        .extend(incoming.registration_list.iter().cloned());
                }
                None => sections.push(incoming.clone()),
            }
        }
        drop(sections);
        drop(other_sections);

        let mut history = self.dynamic_history.write();
        for (k, v) in other.dynamic_history.read().iter() {
            history.entry(k.clone()).or_default().0.extend(v.0.iter().cloned());
        }
    }

    pub fn update_dynamic(&self, key: impl Into<String>, new_value: Value) {
        self.dynamic_history.write().entry(key.into()).or_default().push(new_value);
    }

    pub fn dynamic_history_for(&self, key: &str) -> Option<DynamicHistory> {
        self.dynamic_history.read().get(key).cloned()
    }

    pub fn dynamic_keys(&self) -> Vec<String> {
        self.dynamic_history.read().keys().cloned().collect()
    }

    pub fn with_dynamic_history<R>(&self, f: impl FnOnce(&IndexMap<String, DynamicHistory>) -> R) -> R {
        f(&self.dynamic_history.read())
    }
}
