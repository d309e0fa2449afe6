//! Text export and import of native values.
//!
//! Used for parameter default metadata: a default is stored as the text
//! form of its value and parsed back when a call omits the argument.
//!
//! Formats:
//!
//! - bool: `True` / `False`
//! - integers: decimal; floats: six decimals (`1.500000`)
//! - strings, names, texts: raw at top level, double-quoted when nested
//! - enums: enumerator name
//! - structs: `(X=1.000000,Y=2.000000)`
//! - arrays and sets: `(1,2,3)`; maps: `(("a",1),("b",2))`
//! - null references: `None`

use crate::layout::TypeLayout;
use crate::{
    ConversionError, DelegateValue, Name, NativeValue, NumericKind, PropertyKind, StructValue, Text,
};

/// Export a value of `kind` to text.
pub fn export_text(
    value: &NativeValue,
    kind: &PropertyKind,
    layout: &dyn TypeLayout,
) -> Result<String, ConversionError> {
    let mut out = String::new();
    export_into(&mut out, value, kind, layout, false)?;
    Ok(out)
}

/// Import a value of `kind` from text.
pub fn import_text(
    text: &str,
    kind: &PropertyKind,
    layout: &dyn TypeLayout,
) -> Result<NativeValue, ConversionError> {
    import_value(text.trim(), kind, layout, false)
}

fn cannot_export(value: &NativeValue, kind: &PropertyKind) -> ConversionError {
    ConversionError::TypeMismatch {
        operation: "export",
        from: value.type_name().to_string(),
        to: kind.to_string(),
    }
}

fn invalid(text: &str, kind: &PropertyKind) -> ConversionError {
    ConversionError::InvalidText {
        text: text.to_string(),
        kind: kind.to_string(),
    }
}

fn export_into(
    out: &mut String,
    value: &NativeValue,
    kind: &PropertyKind,
    layout: &dyn TypeLayout,
    nested: bool,
) -> Result<(), ConversionError> {
    match (kind, value) {
        (PropertyKind::Bool, NativeValue::Bool(b)) => out.push_str(if *b { "True" } else { "False" }),
        (PropertyKind::Enum { enum_type, .. }, v) => {
            let raw = v.as_i64().ok_or_else(|| cannot_export(value, kind))?;
            match layout.enum_of(*enum_type).and_then(|e| e.name_of(raw)) {
                Some(name) => out.push_str(name),
                None => out.push_str(&raw.to_string()),
            }
        }
        (PropertyKind::Numeric(n), v) if n.is_float() => {
            let f = v.as_f64().ok_or_else(|| cannot_export(value, kind))?;
            out.push_str(&format!("{f:.6}"));
        }
        (PropertyKind::Numeric(NumericKind::U64), NativeValue::U64(v)) => out.push_str(&v.to_string()),
        (PropertyKind::Numeric(_), v) => {
            let i = v.as_i64().ok_or_else(|| cannot_export(value, kind))?;
            out.push_str(&i.to_string());
        }
        (PropertyKind::Str, NativeValue::Str(s)) => push_string(out, s, nested),
        (PropertyKind::Name, NativeValue::Name(n)) => push_string(out, n.as_str(), nested),
        (PropertyKind::Text, NativeValue::Text(t)) => push_string(out, &t.source, nested),
        (PropertyKind::Object { .. } | PropertyKind::Interface { .. }, NativeValue::Object(None))
        | (PropertyKind::Class { .. }, NativeValue::Class(None)) => out.push_str("None"),
        (PropertyKind::Delegate { .. }, NativeValue::Delegate(d)) if !d.is_bound() => out.push_str("None"),
        (PropertyKind::Struct { struct_type }, NativeValue::Struct(s)) => {
            let fields = layout
                .fields_of(*struct_type)
                .ok_or(ConversionError::UnknownType(*struct_type))?;
            out.push('(');
            for (i, (field, field_value)) in fields.iter().zip(&s.fields).enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&field.name);
                out.push('=');
                export_into(out, field_value, &field.kind, layout, true)?;
            }
            out.push(')');
        }
        (PropertyKind::Array { inner: element }, NativeValue::Array(items))
        | (PropertyKind::Set { element }, NativeValue::Set(items)) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                export_into(out, item, element, layout, true)?;
            }
            out.push(')');
        }
        (PropertyKind::Map { key, value: value_kind }, NativeValue::Map(entries)) => {
            out.push('(');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('(');
                export_into(out, k, key, layout, true)?;
                out.push(',');
                export_into(out, v, value_kind, layout, true)?;
                out.push(')');
            }
            out.push(')');
        }
        _ => return Err(cannot_export(value, kind)),
    }
    Ok(())
}

fn push_string(out: &mut String, s: &str, nested: bool) {
    if nested {
        out.push('"');
        for c in s.chars() {
            if c == '"' || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('"');
    } else {
        out.push_str(s);
    }
}

fn unquote(text: &str, nested: bool) -> Option<String> {
    if !nested {
        return Some(text.to_string());
    }
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(chars.next()?);
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Split the body of a parenthesized list on top-level commas.
fn split_list(text: &str) -> Option<Vec<&str>> {
    let body = text.strip_prefix('(')?.strip_suffix(')')?;
    if body.trim().is_empty() {
        return Some(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_string || depth != 0 {
        return None;
    }
    parts.push(body[start..].trim());
    Some(parts)
}

fn import_value(
    text: &str,
    kind: &PropertyKind,
    layout: &dyn TypeLayout,
    nested: bool,
) -> Result<NativeValue, ConversionError> {
    let value = match kind {
        PropertyKind::Bool => match text.to_ascii_lowercase().as_str() {
            "true" | "1" => NativeValue::Bool(true),
            "false" | "0" => NativeValue::Bool(false),
            _ => return Err(invalid(text, kind)),
        },
        PropertyKind::Enum { enum_type, underlying } => {
            let raw = match layout.enum_of(*enum_type).and_then(|e| e.value_of(text)) {
                Some(v) => v,
                None => text.parse::<i64>().map_err(|_| invalid(text, kind))?,
            };
            NativeValue::from_i64(*underlying, raw)
        }
        PropertyKind::Numeric(n) if n.is_float() => {
            NativeValue::from_f64(*n, text.parse::<f64>().map_err(|_| invalid(text, kind))?)
        }
        PropertyKind::Numeric(NumericKind::U64) => {
            NativeValue::U64(text.parse::<u64>().map_err(|_| invalid(text, kind))?)
        }
        PropertyKind::Numeric(n) => NativeValue::from_i64(*n, text.parse::<i64>().map_err(|_| invalid(text, kind))?),
        PropertyKind::Str => NativeValue::Str(unquote(text, nested).ok_or_else(|| invalid(text, kind))?),
        PropertyKind::Name => NativeValue::Name(Name::new(unquote(text, nested).ok_or_else(|| invalid(text, kind))?)),
        PropertyKind::Text => {
            NativeValue::Text(Text::invariant(unquote(text, nested).ok_or_else(|| invalid(text, kind))?))
        }
        PropertyKind::Object { .. } | PropertyKind::Interface { .. } if text == "None" => NativeValue::Object(None),
        PropertyKind::Class { .. } if text == "None" => NativeValue::Class(None),
        PropertyKind::Delegate { .. } if text == "None" => NativeValue::Delegate(DelegateValue::default()),
        PropertyKind::Struct { struct_type } => {
            let fields = layout
                .fields_of(*struct_type)
                .ok_or(ConversionError::UnknownType(*struct_type))?;
            let mut value = crate::layout::default_struct(*struct_type, layout);
            for part in split_list(text).ok_or_else(|| invalid(text, kind))? {
                let (name, field_text) = part.split_once('=').ok_or_else(|| invalid(text, kind))?;
                let index = fields
                    .iter()
                    .position(|f| f.name == name.trim())
                    .ok_or_else(|| invalid(text, kind))?;
                value.fields[index] = import_value(field_text.trim(), &fields[index].kind, layout, true)?;
            }
            NativeValue::Struct(StructValue {
                struct_type: *struct_type,
                fields: value.fields,
            })
        }
        PropertyKind::Array { inner } => NativeValue::Array(import_list(text, inner, layout, kind)?),
        PropertyKind::Set { element } => {
            let mut unique: Vec<NativeValue> = Vec::new();
            for item in import_list(text, element, layout, kind)? {
                if !unique.iter().any(|u| u.identical(&item)) {
                    unique.push(item);
                }
            }
            NativeValue::Set(unique)
        }
        PropertyKind::Map { key, value } => {
            let mut entries: Vec<(NativeValue, NativeValue)> = Vec::new();
            for part in split_list(text).ok_or_else(|| invalid(text, kind))? {
                let pair = split_list(part).ok_or_else(|| invalid(text, kind))?;
                let [k, v] = pair.as_slice() else {
                    return Err(invalid(text, kind));
                };
                let k = import_value(k, key, layout, true)?;
                let v = import_value(v, value, layout, true)?;
                match entries.iter_mut().find(|(existing, _)| existing.identical(&k)) {
                    Some(entry) => entry.1 = v,
                    None => entries.push((k, v)),
                }
            }
            NativeValue::Map(entries)
        }
        _ => return Err(invalid(text, kind)),
    };
    Ok(value)
}

fn import_list(
    text: &str,
    element: &PropertyKind,
    layout: &dyn TypeLayout,
    kind: &PropertyKind,
) -> Result<Vec<NativeValue>, ConversionError> {
    split_list(text)
        .ok_or_else(|| invalid(text, kind))?
        .into_iter()
        .map(|part| import_value(part, element, layout, true))
        .collect()
}
