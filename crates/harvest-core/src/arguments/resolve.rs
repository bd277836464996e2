//! Resolvers por tipo de argumento y regla de ligado a slots.
//!
//! El orden de emisión es: argumentos del esquema (orden del esquema) y luego
//! los argumentos del template que el esquema no declara (orden del
//! template). Ejecutables sin esquema pasan el template tal cual por la
//! misma regla de slots.
use indexmap::IndexMap;
use serde_json::Value;

use super::{ArgumentKind, ArgumentSchema, SlotSide};
use crate::errors::Diagnostic;
use crate::model::{ArgumentValue, FileBinding, ResolvedArgument};

/// Vista de los bindings de un task durante la resolución.
pub struct ArgumentContext<'a> {
    pub task: &'a str,
    pub inputs: &'a IndexMap<String, FileBinding>,
    pub outputs: &'a IndexMap<String, FileBinding>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub arguments: Vec<ResolvedArgument>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Valor crudo producido por un resolver antes de aplicar la regla de slots.
struct Raw {
    text: String,
    quote: bool,
}

impl Raw {
    fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(),
               quote: false }
    }
}

/// Texto de un valor JSON tal como se pasaría en la línea de comandos.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Si `raw` coincide con un slot de input (o, en su defecto, de output) el
/// argumento es el archivo ligado; si no, es literal.
pub fn bind_slot(raw: &str, ctx: &ArgumentContext<'_>) -> Option<ArgumentValue> {
    if let Some(b) = ctx.inputs.get(raw) {
        return Some(ArgumentValue::File(b.file.clone()));
    }
    ctx.outputs.get(raw).map(|b| ArgumentValue::File(b.file.clone()))
}

fn finish(raw: Raw, ctx: &ArgumentContext<'_>) -> ArgumentValue {
    match bind_slot(&raw.text, ctx) {
        Some(file) => file,
        None if raw.quote => ArgumentValue::Literal(format!("\"{}\"", raw.text)),
        None => ArgumentValue::Literal(raw.text),
    }
}

fn resolve_derived(ctx: &ArgumentContext<'_>,
                   side: SlotSide,
                   index: usize,
                   fixed: Option<&str>,
                   template: Option<&Value>)
                   -> Option<Raw> {
    let slots = match side {
        SlotSide::Inputs => ctx.inputs,
        SlotSide::Outputs => ctx.outputs,
    };
    match slots.get_index(index) {
        Some((slot, _)) => Some(Raw::plain(fixed.unwrap_or(slot))),
        None => template.map(|v| Raw::plain(render_value(v))),
    }
}

fn resolve_overwrite(value: &str, required: bool, template: Option<&Value>) -> Option<Raw> {
    if required || template.is_some() {
        Some(Raw::plain(value))
    } else {
        None
    }
}

fn resolve_scalar(template: Option<&Value>) -> Option<Raw> {
    template.map(|v| Raw::plain(render_value(v)))
}

fn resolve_string(complex: bool, template: Option<&Value>) -> Option<Raw> {
    template.map(|v| Raw { quote: complex && v.is_string(),
                           text: render_value(v) })
}

fn resolve_list(join: Option<&str>, template: Option<&Value>) -> Option<Raw> {
    let v = template?;
    match (v, join) {
        (Value::Array(items), Some(sep)) => {
            let parts: Vec<String> = items.iter().map(render_value).collect();
            Some(Raw::plain(parts.join(sep)))
        }
        (other, _) => Some(Raw::plain(render_value(other))),
    }
}

fn resolve_exists(template: Option<&Value>) -> Option<Raw> {
    template.map(|_| Raw::plain(""))
}

fn resolve_one(ctx: &ArgumentContext<'_>, schema: &ArgumentSchema, template: Option<&Value>) -> Option<Raw> {
    match &schema.kind {
        ArgumentKind::Derived { key, index, value } => resolve_derived(ctx, *key, *index, value.as_deref(), template),
        ArgumentKind::Overwrite { value } => resolve_overwrite(value, schema.required, template),
        ArgumentKind::Numeric | ArgumentKind::DictVal => resolve_scalar(template),
        ArgumentKind::StringVal { complex } => resolve_string(*complex, template),
        ArgumentKind::ListVal { join } => resolve_list(join.as_deref(), template),
        ArgumentKind::Exists => resolve_exists(template),
    }
}

/// Resuelve los argumentos de un task. Nunca falla: los problemas quedan en
/// `Resolution::diagnostics`.
pub fn resolve_arguments(ctx: &ArgumentContext<'_>,
                         schema: Option<&IndexMap<String, ArgumentSchema>>,
                         template: &IndexMap<String, Value>)
                         -> Resolution {
    let mut out = Resolution::default();
    let Some(schema) = schema else {
        for (flag, v) in template {
            out.arguments.push(ResolvedArgument { flag: flag.clone(),
                                                  value: finish(Raw::plain(render_value(v)), ctx) });
        }
        return out;
    };

    for (flag, arg) in schema {
        let given = template.get(flag);
        if let Some(v) = given {
            if !arg.kind.accepts(v) {
                out.diagnostics.push(Diagnostic::error(ctx.task,
                                                       format!("argument '{flag}' given value '{}', should be of type '{}'",
                                                               render_value(v),
                                                               arg.kind.label())));
            }
        }
        match resolve_one(ctx, arg, given) {
            Some(raw) => {
                let empty = raw.text.is_empty();
                let checks_empty = !matches!(arg.kind, ArgumentKind::Overwrite { .. } | ArgumentKind::Exists);
                if arg.required && empty && checks_empty {
                    out.diagnostics
                       .push(Diagnostic::error(ctx.task, format!("empty required argument '{flag}'")));
                }
                out.arguments.push(ResolvedArgument { flag: flag.clone(),
                                                      value: finish(raw, ctx) });
            }
            None if arg.required => {
                out.diagnostics.push(Diagnostic::error(ctx.task,
                                                       format!("requires argument '{flag}', no such argument found")));
            }
            None => {}
        }
    }

    for (flag, v) in template {
        if schema.contains_key(flag) {
            continue;
        }
        out.diagnostics
           .push(Diagnostic::warning(ctx.task, format!("argument '{flag}' is not declared by the executable")));
        out.arguments.push(ResolvedArgument { flag: flag.clone(),
                                              value: finish(Raw::plain(render_value(v)), ctx) });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Severity;
    use serde_json::json;

    fn bindings() -> (IndexMap<String, FileBinding>, IndexMap<String, FileBinding>) {
        let mut inputs = IndexMap::new();
        inputs.insert("base".to_string(), FileBinding::new("e/1/d/rgb/x/7_base.jpg", false));
        inputs.insert("roi".to_string(), FileBinding::new("roi.json", false));
        let mut outputs = IndexMap::new();
        outputs.insert("gray".to_string(), FileBinding::new("e/1/d/rgb/x/7_gray.png", false));
        (inputs, outputs)
    }

    fn schema(entries: Vec<(&str, ArgumentSchema)>) -> IndexMap<String, ArgumentSchema> {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn template(v: Value) -> IndexMap<String, Value> {
        v.as_object()
         .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
         .unwrap_or_default()
    }

    #[test]
    fn derived_arguments_bind_to_slot_files() {
        let (inputs, outputs) = bindings();
        let ctx = ArgumentContext { task: "t",
                                    inputs: &inputs,
                                    outputs: &outputs };
        let s = schema(vec![("--input",
                             ArgumentSchema::required(ArgumentKind::Derived { key: SlotSide::Inputs,
                                                                              index: 0,
                                                                              value: None })),
                            ("--output",
                             ArgumentSchema::required(ArgumentKind::Derived { key: SlotSide::Outputs,
                                                                              index: 0,
                                                                              value: None }))]);
        let r = resolve_arguments(&ctx, Some(&s), &IndexMap::new());
        assert!(r.diagnostics.is_empty());
        assert_eq!(r.arguments[0].value, ArgumentValue::File("e/1/d/rgb/x/7_base.jpg".into()));
        assert_eq!(r.arguments[1].value, ArgumentValue::File("e/1/d/rgb/x/7_gray.png".into()));
    }

    #[test]
    fn overwrite_ignores_template_and_complex_strings_are_quoted() {
        let (inputs, outputs) = bindings();
        let ctx = ArgumentContext { task: "t",
                                    inputs: &inputs,
                                    outputs: &outputs };
        let s = schema(vec![("--outputdir", ArgumentSchema::new(ArgumentKind::Overwrite { value: ".".into() })),
                            ("--writeblank",
                             ArgumentSchema::required(ArgumentKind::Overwrite { value: String::new() })),
                            ("--logic", ArgumentSchema::required(ArgumentKind::StringVal { complex: true }))]);
        let t = template(json!({"--outputdir": "/tmp", "--logic": "(((r - g) > 5) and (b < 100))"}));
        let r = resolve_arguments(&ctx, Some(&s), &t);
        assert!(r.diagnostics.is_empty());
        assert_eq!(r.arguments.len(), 3);
        assert_eq!(r.arguments[0].value, ArgumentValue::Literal(".".into()));
        assert_eq!(r.arguments[1].value, ArgumentValue::Literal(String::new()));
        assert_eq!(r.arguments[2].value,
                   ArgumentValue::Literal("\"(((r - g) > 5) and (b < 100))\"".into()));
    }

    #[test]
    fn missing_required_argument_is_a_diagnostic_not_a_failure() {
        let (inputs, outputs) = bindings();
        let ctx = ArgumentContext { task: "t",
                                    inputs: &inputs,
                                    outputs: &outputs };
        let s = schema(vec![("--thresh", ArgumentSchema::required(ArgumentKind::Numeric)),
                            ("--max", ArgumentSchema::new(ArgumentKind::Numeric))]);
        let r = resolve_arguments(&ctx, Some(&s), &IndexMap::new());
        assert!(r.arguments.is_empty());
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].severity, Severity::Error);
        assert!(r.diagnostics[0].message.contains("--thresh"));
    }

    #[test]
    fn list_join_and_unknown_arguments_pass_through() {
        let (inputs, outputs) = bindings();
        let ctx = ArgumentContext { task: "t",
                                    inputs: &inputs,
                                    outputs: &outputs };
        let s = schema(vec![("--bands", ArgumentSchema::new(ArgumentKind::ListVal { join: Some(",".into()) }))]);
        let t = template(json!({"--bands": ["r", "g", 3], "--roi": "roi"}));
        let r = resolve_arguments(&ctx, Some(&s), &t);
        assert_eq!(r.arguments[0].value, ArgumentValue::Literal("r,g,3".into()));
        assert_eq!(r.arguments[1].flag, "--roi");
        assert_eq!(r.arguments[1].value, ArgumentValue::File("roi.json".into()));
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn schemaless_executables_use_slot_rule_only() {
        let (inputs, outputs) = bindings();
        let ctx = ArgumentContext { task: "t",
                                    inputs: &inputs,
                                    outputs: &outputs };
        let t = template(json!({"--db": "gray", "--createdb": "", "--chunks": 4}));
        let r = resolve_arguments(&ctx, None, &t);
        assert!(r.diagnostics.is_empty());
        let by_flag = |f: &str| r.arguments.iter().find(|a| a.flag == f).map(|a| a.value.clone());
        assert_eq!(by_flag("--db"), Some(ArgumentValue::File("e/1/d/rgb/x/7_gray.png".into())));
        assert_eq!(by_flag("--createdb"), Some(ArgumentValue::Literal(String::new())));
        assert_eq!(by_flag("--chunks"), Some(ArgumentValue::Literal("4".into())));
    }
}
