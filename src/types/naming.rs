//! Script names and documentation strings.

use scriptbridge_core::{FunctionEntry, NumericKind, PropertyDescriptor, PropertyKind};
use scriptbridge_registry::ReflectionRegistry;

/// Metadata key overriding the script name of a type or member.
pub const SCRIPT_NAME_KEY: &str = "ScriptName";

/// Convert a native identifier to snake_case.
///
/// An underscore is inserted before an uppercase letter that follows a
/// lowercase letter or digit, or that starts a new word after an acronym
/// (`MaxHP` → `max_hp`, `HTTPServer` → `http_server`).
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_lower) {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Script name of a property: `ScriptName` metadata, else snake_case with
/// the `b` prefix of boolean names dropped.
pub fn script_name_of(property: &PropertyDescriptor) -> String {
    if let Some(name) = property.metadata(SCRIPT_NAME_KEY) {
        return name.to_string();
    }
    let name = property.name.as_str();
    let mut chars = name.chars();
    let stripped = match (chars.next(), chars.next()) {
        (Some('b'), Some(second)) if property.kind == PropertyKind::Bool && second.is_ascii_uppercase() => &name[1..],
        _ => name,
    };
    to_snake_case(stripped)
}

/// Script name of a function.
pub fn function_script_name(function: &FunctionEntry) -> String {
    function
        .metadata(SCRIPT_NAME_KEY)
        .map(str::to_string)
        .unwrap_or_else(|| to_snake_case(&function.name))
}

/// Script-facing type name of a kind, for documentation.
pub fn script_type_name(kind: &PropertyKind, registry: &ReflectionRegistry) -> String {
    match kind {
        PropertyKind::Bool => "bool".to_string(),
        PropertyKind::Numeric(NumericKind::F32 | NumericKind::F64) => "float".to_string(),
        PropertyKind::Numeric(_) => "int".to_string(),
        PropertyKind::Str => "str".to_string(),
        PropertyKind::Name => "Name".to_string(),
        PropertyKind::Text => "Text".to_string(),
        PropertyKind::Object { class } => registry.type_name(*class),
        PropertyKind::Interface { interface } => registry.type_name(*interface),
        PropertyKind::Class { meta_class } => format!("type({})", registry.type_name(*meta_class)),
        PropertyKind::Struct { struct_type } => registry.type_name(*struct_type),
        PropertyKind::Enum { enum_type, .. } => registry.type_name(*enum_type),
        PropertyKind::Delegate { signature } | PropertyKind::MulticastDelegate { signature } => {
            registry.type_name(*signature)
        }
        PropertyKind::Array { inner } => format!("Array({})", script_type_name(inner, registry)),
        PropertyKind::Set { element } => format!("Set({})", script_type_name(element, registry)),
        PropertyKind::Map { key, value } => format!(
            "Map({}, {})",
            script_type_name(key, registry),
            script_type_name(value, registry)
        ),
    }
}

/// Documentation of a property accessor.
pub fn property_doc(property: &PropertyDescriptor, registry: &ReflectionRegistry) -> String {
    let access = if property.flags.is_script_writable() {
        "Read-Write"
    } else {
        "Read-Only"
    };
    let mut ty = script_type_name(&property.kind, registry);
    if property.is_fixed_array() {
        ty = format!("{ty}[{}]", property.array_dim);
    }
    format!("({ty}): [{access}] {}", property.name)
}

/// Documentation of a method: parameters and the packed return value.
///
/// A leading bool result followed by further outputs gates the result, so
/// such methods document their return as `<types> or None`.
pub fn method_doc(script_name: &str, function: &FunctionEntry, registry: &ReflectionRegistry) -> String {
    let params: Vec<String> = function
        .input_params()
        .map(|(_, p)| format!("{}: {}", to_snake_case(&p.name), script_type_name(&p.kind, registry)))
        .collect();
    let results = function.result_params();
    let types: Vec<String> = results
        .iter()
        .map(|(_, p)| script_type_name(&p.kind, registry))
        .collect();
    let returns = match types.as_slice() {
        [] => "None".to_string(),
        [single] => single.clone(),
        [_, rest @ ..] if results[0].1.kind == PropertyKind::Bool => match rest {
            [single] => format!("{single} or None"),
            many => format!("({}) or None", many.join(", ")),
        },
        many => format!("({})", many.join(", ")),
    };
    format!("{script_name}({}) -> {returns}", params.join(", "))
}
