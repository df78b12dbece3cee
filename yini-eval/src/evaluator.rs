//! The four-pass tree-walking evaluator (`spec.md` §4.D).
//!
//! 1. Declaration — record section names/parents, schema bodies, defines.
//! 2. Expression evaluation — fold AST expressions into `Value`s.
//! 3. Resolution & merging — inheritance merge, then reference/env
//!    resolution.
//! 4. Schema validation.

use crate::config::EvalConfig;
use crate::dom::{DeclaredType, Document, NullPolicy, Section, SchemaRule};
use crate::value::{Color, Coord, Value};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;
use yini_parse::{Expr, SchemaFieldAst, TopLevelUnit};
use yini_util::limits::MAX_RECURSION_DEPTH;
use yini_util::{ErrorKind, PositionedError, Result};

fn err(kind: ErrorKind) -> PositionedError {
    PositionedError::without_position(kind)
}

pub fn evaluate(ast: &yini_parse::Document, config: &EvalConfig) -> Result<Document> {
    let mut defines_ast: Vec<(String, Expr)> = Vec::new();
    let mut includes_ast: Vec<Expr> = Vec::new();
    let mut schema_ast: Vec<yini_parse::SchemaSectionAst> = Vec::new();
    let mut sections: Vec<Section> = Vec::new();
    let mut entries_ast: Vec<Vec<(String, Expr)>> = Vec::new();
    let mut registrations_ast: Vec<Vec<Expr>> = Vec::new();

    for unit in &ast.units {
        match unit {
            TopLevelUnit::Define(entries) => defines_ast.extend(entries.iter().cloned()),
            TopLevelUnit::Include(includes) => includes_ast.extend(includes.iter().cloned()),
            TopLevelUnit::Schema(schema_sections) => schema_ast.extend(schema_sections.iter().cloned()),
            TopLevelUnit::Section(section) => {
                let mut s = Section::new(section.name.clone());
                s.inherited_names = section.parents.clone();
                sections.push(s);
                entries_ast.push(section.entries.clone());
                registrations_ast.push(section.registrations.clone());
            }
        }
    }
    debug!(sections = sections.len(), "declared sections");

    // Pass 2: expression evaluation.
    let mut defines = IndexMap::new();
    for (key, expr) in &defines_ast {
        defines.insert(key.clone(), eval_expr(expr)?);
    }

    let mut includes = Vec::new();
    for expr in &includes_ast {
        let value = eval_expr(expr)?;
        match value.as_str() {
            Some(s) => includes.push(s.to_string()),
            None => {
                return Err(err(ErrorKind::InvalidCallArguments {
                    callee: "#include".to_string(),
                    reason: "include entries must be string literals".to_string(),
                }))
            }
        }
    }

    for (i, section) in sections.iter_mut().enumerate() {
        for (key, expr) in &entries_ast[i] {
            section.entries.insert(key.clone(), eval_expr(expr)?);
        }
        for expr in &registrations_ast[i] {
            section.registration_list.push(eval_expr(expr)?);
        }
    }

    let schema = build_schema(&schema_ast)?;

    // Pass 3a: inheritance merge.
    merge_inheritance(&mut sections)?;

    // Pass 3b: reference & environment resolution.
    let mut resolver = Resolver::new(sections, defines, config);
    resolver.resolve_all()?;
    let (mut sections, defines) = resolver.into_parts();

    // Pass 4: schema validation.
    validate_schema(&mut sections, &schema)?;

    Ok(Document::from_parts(sections, defines, includes, schema))
}

// ---- expression evaluation -------------------------------------------------

fn eval_expr(expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Integer(v) => Ok(Value::Integer(*v)),
        Expr::Float(v) => Ok(Value::Float(*v)),
        Expr::Bool(v) => Ok(Value::Bool(*v)),
        Expr::Str(v) => Ok(Value::Str(v.clone())),
        Expr::Color(hex) => Color::from_hex_digits(hex)
            .map(Value::Color)
            .ok_or_else(|| err(ErrorKind::InvalidCallArguments {
                callee: "#rrggbb".to_string(),
                reason: format!("{hex:?} is not six hex digits"),
            })),
        Expr::Ident(name) => Ok(Value::Str(name.clone())),
        Expr::DefineRef(name) => Ok(Value::Reference(name.clone())),
        Expr::DomRef(path) => Ok(Value::Reference(path.clone())),
        Expr::EnvVar(name) => Ok(Value::Env(name.clone())),
        Expr::Grouping(inner) => eval_expr(inner),
        Expr::Tuple(items) => Ok(Value::Tuple(eval_all(items)?)),
        Expr::Array(items) => Ok(Value::Array(eval_all(items)?)),
        Expr::Map(entries) => {
            let mut map = IndexMap::new();
            for (k, v) in entries {
                map.insert(k.clone(), eval_expr(v)?);
            }
            Ok(Value::Map(map))
        }
        Expr::Constructor { name, args } => eval_constructor(name, args),
    }
}

fn eval_all(items: &[Expr]) -> Result<Vec<Value>> {
    items.iter().map(eval_expr).collect()
}

fn invalid(callee: &str, reason: impl Into<String>) -> PositionedError {
    err(ErrorKind::InvalidCallArguments {
        callee: callee.to_string(),
        reason: reason.into(),
    })
}

fn eval_constructor(name: &str, args: &[Expr]) -> Result<Value> {
    let lowered = name.to_ascii_lowercase();
    match lowered.as_str() {
        "color" => {
            let values = eval_all(args)?;
            let byte = |v: &Value| -> Option<u8> {
                v.as_i64().and_then(|n| u8::try_from(n).ok())
            };
            match values.as_slice() {
                [r, g, b] => {
                    let (r, g, b) = (byte(r), byte(g), byte(b));
                    match (r, g, b) {
                        (Some(r), Some(g), Some(b)) => Ok(Value::Color(Color::rgb(r, g, b))),
                        _ => Err(invalid("Color", "components must be integers in 0..=255")),
                    }
                }
                [r, g, b, a] => {
                    let (r, g, b, a) = (byte(r), byte(g), byte(b), byte(a));
                    match (r, g, b, a) {
                        (Some(r), Some(g), Some(b), Some(a)) => Ok(Value::Color(Color::rgba(r, g, b, a))),
                        _ => Err(invalid("Color", "components must be integers in 0..=255")),
                    }
                }
                _ => Err(invalid("Color", "expected 3 or 4 arguments")),
            }
        }
        "coord" => {
            let values = eval_all(args)?;
            match values.as_slice() {
                [x, y] => match (x.as_f64(), y.as_f64()) {
                    (Some(x), Some(y)) => Ok(Value::Coord(Coord::xy(x, y))),
                    _ => Err(invalid("Coord", "components must be numeric")),
                },
                [x, y, z] => match (x.as_f64(), y.as_f64(), z.as_f64()) {
                    (Some(x), Some(y), Some(z)) => Ok(Value::Coord(Coord::xyz(x, y, z))),
                    _ => Err(invalid("Coord", "components must be numeric")),
                },
                _ => Err(invalid("Coord", "expected 2 or 3 arguments")),
            }
        }
        "path" => {
            let values = eval_all(args)?;
            match values.as_slice() {
                [v] => v
                    .as_str()
                    .map(|s| Value::Path(s.to_string()))
                    .ok_or_else(|| invalid("Path", "argument must be a string")),
                _ => Err(invalid("Path", "expected exactly 1 argument")),
            }
        }
        "list" => Ok(Value::List(eval_all(args)?)),
        "array" => Ok(Value::Array(eval_all(args)?)),
        "set" => {
            let values = eval_all(args)?;
            let mut unique = Vec::new();
            for v in values {
                if !unique.contains(&v) {
                    unique.push(v);
                }
            }
            Ok(Value::Set(unique))
        }
        "map" => match args {
            [Expr::Map(_)] => eval_expr(&args[0]),
            _ => Err(invalid("Map", "expected a single {key: value, ...} literal")),
        },
        "dyna" => match args {
            [inner] => Ok(Value::Dynamic(Box::new(eval_expr(inner)?))),
            _ => Err(invalid("Dyna", "expected exactly 1 argument")),
        },
        other => Err(err(ErrorKind::UnknownCallee(other.to_string()))),
    }
}

// ---- inheritance merge -------------------------------------------------

fn merge_inheritance(sections: &mut Vec<Section>) -> Result<()> {
    let name_to_index: IndexMap<String, usize> = sections
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.clone(), i))
        .collect();
    let mut done = vec![false; sections.len()];

    for i in 0..sections.len() {
        let mut stack = Vec::new();
        merge_one(sections, &name_to_index, &mut done, i, &mut stack)?;
    }
    Ok(())
}

fn merge_one(
    sections: &mut Vec<Section>,
    name_to_index: &IndexMap<String, usize>,
    done: &mut Vec<bool>,
    index: usize,
    stack: &mut Vec<String>,
) -> Result<()> {
    if done[index] {
        return Ok(());
    }
    let name = sections[index].name.clone();
    if stack.contains(&name) {
        let mut path = stack.clone();
        path.push(name);
        return Err(err(ErrorKind::CircularInheritance { path }));
    }
    stack.push(name.clone());

    let parents = sections[index].inherited_names.clone();
    let mut merged = IndexMap::new();
    for parent_name in &parents {
        let parent_index = *name_to_index
            .get(parent_name)
            .ok_or_else(|| err(ErrorKind::UnknownParent(parent_name.clone())))?;
        merge_one(sections, name_to_index, done, parent_index, stack)?;
        for (k, v) in sections[parent_index].entries.iter() {
            merged.insert(k.clone(), v.clone());
        }
    }
    for (k, v) in sections[index].entries.iter() {
        merged.insert(k.clone(), v.clone());
    }
    sections[index].entries = merged;
    done[index] = true;
    stack.pop();
    Ok(())
}

// ---- reference & environment resolution -------------------------------------------------

struct Resolver<'a> {
    sections: Vec<Section>,
    name_to_index: IndexMap<String, usize>,
    defines: IndexMap<String, Value>,
    config: &'a EvalConfig,
    stack: Vec<String>,
    in_progress: HashSet<String>,
    done: HashSet<String>,
}

impl<'a> Resolver<'a> {
    fn new(sections: Vec<Section>, defines: IndexMap<String, Value>, config: &'a EvalConfig) -> Self {
        let name_to_index = sections
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        Self {
            sections,
            name_to_index,
            defines,
            config,
            stack: Vec::new(),
            in_progress: HashSet::new(),
            done: HashSet::new(),
        }
    }

    fn into_parts(self) -> (Vec<Section>, IndexMap<String, Value>) {
        (self.sections, self.defines)
    }

    fn resolve_all(&mut self) -> Result<()> {
        let section_names: Vec<String> = self.sections.iter().map(|s| s.name.clone()).collect();
        for name in &section_names {
            let keys: Vec<String> = self.sections[self.name_to_index[name]]
                .entries
                .keys()
                .cloned()
                .collect();
            for key in keys {
                self.ensure_section_entry(name, &key)?;
            }
        }
        let define_names: Vec<String> = self.defines.keys().cloned().collect();
        for name in &define_names {
            self.ensure_define(name)?;
        }
        Ok(())
    }

    fn ensure_section_entry(&mut self, section: &str, key: &str) -> Result<Value> {
        let token = format!("{section}.{key}");
        if self.done.contains(&token) {
            return Ok(self.sections[self.name_to_index[section]].entries[key].clone());
        }
        self.enter(&token)?;
        let raw = self.sections[self.name_to_index[section]].entries[key].clone();
        let resolved = self.resolve_value(raw)?;
        self.sections[self.name_to_index[section]]
            .entries
            .insert(key.to_string(), resolved.clone());
        self.leave(&token);
        Ok(resolved)
    }

    fn ensure_define(&mut self, name: &str) -> Result<Value> {
        let token = format!("@{name}");
        if self.done.contains(&token) {
            return Ok(self.defines[name].clone());
        }
        self.enter(&token)?;
        let raw = self.defines[name].clone();
        let resolved = self.resolve_value(raw)?;
        self.defines.insert(name.to_string(), resolved.clone());
        self.leave(&token);
        Ok(resolved)
    }

    fn enter(&mut self, token: &str) -> Result<()> {
        if self.in_progress.contains(token) {
            let mut path = self.stack.clone();
            path.push(token.to_string());
            return Err(err(ErrorKind::CircularReference { path }));
        }
        if self.stack.len() >= MAX_RECURSION_DEPTH {
            return Err(err(ErrorKind::NestingTooDeep { max: MAX_RECURSION_DEPTH }));
        }
        self.stack.push(token.to_string());
        self.in_progress.insert(token.to_string());
        Ok(())
    }

    fn leave(&mut self, token: &str) {
        self.stack.pop();
        self.in_progress.remove(token);
        self.done.insert(token.to_string());
    }

    fn resolve_value(&mut self, value: Value) -> Result<Value> {
        match value {
            Value::Reference(name) => {
                if let Some(dot) = name.find('.') {
                    let section = name[..dot].to_string();
                    let key = name[dot + 1..].to_string();
                    let known = self.name_to_index.contains_key(&section)
                        && self.sections[self.name_to_index[&section]]
                            .entries
                            .contains_key(&key);
                    if !known {
                        return Err(err(ErrorKind::UnresolvedReference(name)));
                    }
                    self.ensure_section_entry(&section, &key)
                } else if self.defines.contains_key(&name) {
                    self.ensure_define(&name)
                } else {
                    Err(err(ErrorKind::UnresolvedReference(name)))
                }
            }
            Value::Env(name) => {
                if !self.config.is_env_allowed(&name) {
                    return Err(err(ErrorKind::EnvNotAllowed(name)));
                }
                Ok(Value::Str(std::env::var(&name).unwrap_or_default()))
            }
            Value::Array(items) => Ok(Value::Array(self.resolve_each(items)?)),
            Value::List(items) => Ok(Value::List(self.resolve_each(items)?)),
            Value::Tuple(items) => Ok(Value::Tuple(self.resolve_each(items)?)),
            Value::Set(items) => Ok(Value::Set(self.resolve_each(items)?)),
            Value::Map(entries) => {
                let mut resolved = IndexMap::new();
                for (k, v) in entries {
                    resolved.insert(k, self.resolve_value(v)?);
                }
                Ok(Value::Map(resolved))
            }
            Value::Dynamic(inner) => Ok(Value::Dynamic(Box::new(self.resolve_value(*inner)?))),
            other => Ok(other),
        }
    }

    fn resolve_each(&mut self, items: Vec<Value>) -> Result<Vec<Value>> {
        items.into_iter().map(|v| self.resolve_value(v)).collect()
    }
}

// ---- schema -------------------------------------------------

fn build_schema(
    schema_ast: &[yini_parse::SchemaSectionAst],
) -> Result<IndexMap<String, IndexMap<String, SchemaRule>>> {
    let mut schema = IndexMap::new();
    for section in schema_ast {
        let mut fields = IndexMap::new();
        for field in &section.fields {
            fields.insert(field.key.clone(), build_rule(field)?);
        }
        schema.insert(section.section.clone(), fields);
    }
    Ok(schema)
}

fn build_rule(field: &SchemaFieldAst) -> Result<SchemaRule> {
    let declared_type = Some(declared_type_from_name(&field.type_name, field.element_type.as_deref())?);
    let default_value = field.default.as_ref().map(eval_expr).transpose()?;
    let min = field.min.as_ref().map(eval_expr).transpose()?.and_then(|v| v.as_f64());
    let max = field.max.as_ref().map(eval_expr).transpose()?.and_then(|v| v.as_f64());
    let null_policy = match field.on_empty.as_deref() {
        Some("ignore") | None => NullPolicy::Ignore,
        Some("default") => NullPolicy::Default,
        Some("error") => NullPolicy::Error,
        Some(other) => {
            return Err(err(ErrorKind::InvalidCallArguments {
                callee: "schema on_empty".to_string(),
                reason: format!("unknown policy {other:?}"),
            }))
        }
    };
    Ok(SchemaRule {
        required: field.requirement == yini_parse::Requirement::Required,
        declared_type,
        null_policy,
        default_value,
        min,
        max,
    })
}

fn declared_type_from_name(name: &str, element: Option<&str>) -> Result<DeclaredType> {
    match name {
        "int" => Ok(DeclaredType::Int),
        "float" => Ok(DeclaredType::Float),
        "bool" => Ok(DeclaredType::Bool),
        "string" => Ok(DeclaredType::String),
        "array" => match element {
            Some(e) => Ok(DeclaredType::ArrayOf(e.to_string())),
            None => Ok(DeclaredType::Array),
        },
        other => Err(err(ErrorKind::InvalidCallArguments {
            callee: "schema type".to_string(),
            reason: format!("unknown type {other:?}"),
        })),
    }
}

fn validate_schema(
    sections: &mut [Section],
    schema: &IndexMap<String, IndexMap<String, SchemaRule>>,
) -> Result<()> {
    for (section_name, fields) in schema {
        for (key, rule) in fields {
            let section_index = sections.iter().position(|s| &s.name == section_name);
            let has_entry = section_index
                .map(|i| sections[i].entries.contains_key(key))
                .unwrap_or(false);

            if !has_entry {
                if rule.required {
                    match (rule.null_policy, &rule.default_value) {
                        (NullPolicy::Default, Some(default)) => {
                            let index = section_index.ok_or_else(|| {
                                err(ErrorKind::MissingRequired {
                                    section: section_name.clone(),
                                    key: key.clone(),
                                })
                            })?;
                            sections[index].entries.insert(key.clone(), default.clone());
                        }
                        _ => {
                            return Err(err(ErrorKind::MissingRequired {
                                section: section_name.clone(),
                                key: key.clone(),
                            }))
                        }
                    }
                }
                continue;
            }

            let index = section_index.unwrap();
            let value = sections[index].entries[key].clone();
            if let Some(declared) = &rule.declared_type {
                if !declared.accepts(&value) {
                    return Err(err(ErrorKind::TypeMismatch {
                        section: section_name.clone(),
                        key: key.clone(),
                        expected: declared.name(),
                        found: value.type_name().to_string(),
                    }));
                }
            }
            if let Some(n) = value.as_f64() {
                if let Some(min) = rule.min {
                    if n < min {
                        return Err(err(ErrorKind::OutOfRange {
                            section: section_name.clone(),
                            key: key.clone(),
                            reason: format!("{n} is below minimum {min}"),
                        }));
                    }
                }
                if let Some(max) = rule.max {
                    if n > max {
                        return Err(err(ErrorKind::OutOfRange {
                            section: section_name.clone(),
                            key: key.clone(),
                            reason: format!("{n} is above maximum {max}"),
                        }));
                    }
                }
            }
        }
    }
    Ok(())
}
