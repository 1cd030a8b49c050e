//! Generates modifier boilerplate from reflected overlay descriptions
//!
//! Input is the JSON a reflection pass dumps for one SDK overlay class: its
//! constructors and setters with ordered parameter lists. Output is Rust
//! source with one builder per setter and one node constructor per SDK
//! constructor, all routed through [`Property`](crate::overlay::Property).
use crate::config::GeneratorConfig;
use crate::errors::MapError;
use crate::map_view::OverlayKind;
use indexmap::IndexMap;
use phf::{phf_map, phf_set};
use serde::{Deserialize, Serialize};

// Reflected (simple) type name -> Rust type
static RUST_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "int" => "i32",
    "Integer" => "i32",
    "long" => "i64",
    "Long" => "i64",
    "float" => "f32",
    "Float" => "f32",
    "double" => "f64",
    "Double" => "f64",
    "boolean" => "bool",
    "Boolean" => "bool",
    "String" => "String",
    "CharSequence" => "String",
    "LatLng" => "LatLng",
    "List<LatLng>" => "Vec<LatLng>",
};

static RUST_KEYWORDS: phf::Set<&'static str> = phf_set! {
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else",
    "enum", "extern", "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop",
    "match", "mod", "move", "mut", "pub", "ref", "return", "self", "Self", "static",
    "struct", "super", "trait", "true", "try", "type", "unsafe", "use", "where",
    "while", "yield", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "typeof", "unsized", "virtual",
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    pub name: String,
    /// Parameter name -> reflected type, in declaration order.
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub doc_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayDescriptor {
    pub name: String,
    /// Overlay kind; derived from `name` when absent.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub doc_link: Option<String>,
    #[serde(default)]
    pub constructors: Vec<MethodDescriptor>,
    #[serde(default)]
    pub setters: Vec<MethodDescriptor>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(OverlayDescriptor),
    Many(Vec<OverlayDescriptor>),
}

/// Accepts either a single descriptor object or an array of them.
pub fn parse_descriptors(json: &str) -> Result<Vec<OverlayDescriptor>, MapError> {
    Ok(match serde_json::from_str::<OneOrMany>(json)? {
        OneOrMany::One(descriptor) => vec![descriptor],
        OneOrMany::Many(descriptors) => descriptors,
    })
}

/// Parses `json` and generates one source file per descriptor, keyed by
/// the overlay name.
pub fn generate_from_json(
    json: &str,
    config: &GeneratorConfig,
) -> Result<IndexMap<String, String>, MapError> {
    parse_descriptors(json)?
        .iter()
        .map(|descriptor| Ok((descriptor.name.clone(), generate(descriptor, config)?)))
        .collect()
}

struct Param {
    ident: String,
    rust_type: String,
    value: String,
}

/// Rust source for one overlay descriptor
pub fn generate(descriptor: &OverlayDescriptor, config: &GeneratorConfig) -> Result<String, MapError> {
    let kind = resolve_kind(descriptor)?;
    let kind_const = kind_const(kind);
    let prefix = config
        .fn_prefix
        .clone()
        .unwrap_or_else(|| to_snake_case(&descriptor.name));
    let krate = &config.crate_path;

    let mut out = String::new();
    out.push_str(&format!(
        "//! Modifiers for `{}`. Generated from its SDK description; do not edit.\n",
        descriptor.name
    ));
    if config.emit_doc_links {
        if let Some(link) = &descriptor.doc_link {
            out.push_str(&format!("//!\n//! SDK reference: <{}>\n", doc_text(link)));
        }
    }
    out.push_str(&format!(
        "#![allow(unused_imports)]\nuse {krate}::{{KindSet, LatLng, MapNode, MapNodeRef, Modifier, OverlayKind, OverlayModifiers, PropertyValue}};\n"
    ));

    for (index, constructor) in descriptor.constructors.iter().enumerate() {
        let params = method_params(constructor)?;
        let fn_name = if index == 0 {
            prefix.clone()
        } else {
            let suffix: Vec<String> = constructor.parameters.keys().map(|p| to_snake_case(p)).collect();
            format!("{}_with_{}", prefix, suffix.join("_"))
        };
        out.push('\n');
        push_docs(&mut out, &format!("Creates a detached `{}` node.", descriptor.name), constructor, config);
        let signature: Vec<String> = params.iter().map(|p| format!("{}: {}", p.ident, p.rust_type)).collect();
        out.push_str(&format!("pub fn {}({}) -> MapNodeRef {{\n", escape_ident(&fn_name), signature.join(", ")));
        if params.is_empty() {
            out.push_str(&format!("    MapNode::overlay(OverlayKind::{:?})\n", kind));
        } else {
            out.push_str("    let modifier = Modifier::empty()");
            for (name, param) in constructor.parameters.keys().zip(&params) {
                out.push_str(&format!(
                    "\n        .property(KindSet::{}, \"{}\", {})",
                    kind_const, name, param.value
                ));
            }
            out.push_str(";\n");
            out.push_str(&format!("    MapNode::overlay_with(OverlayKind::{:?}, modifier)\n", kind));
        }
        out.push_str("}\n");
    }

    for setter in &descriptor.setters {
        if setter.deprecated && !config.include_deprecated {
            continue;
        }
        let params = method_params(setter)?;
        if params.is_empty() {
            return Err(MapError::DescriptorError {
                name: descriptor.name.clone(),
                details: format!("setter '{}' takes no parameters", setter.name),
            });
        }
        let property = property_name(&setter.name);
        let fn_name = format!("{}_{}", prefix, to_snake_case(&property));
        let value = match params.as_slice() {
            [single] => single.value.clone(),
            many => format!(
                "PropertyValue::List(vec![{}])",
                many.iter().map(|p| p.value.as_str()).collect::<Vec<_>>().join(", ")
            ),
        };
        out.push('\n');
        push_docs(
            &mut out,
            &format!("Sets `{}` on a `{}`.", property, descriptor.name),
            setter,
            config,
        );
        let signature: Vec<String> = params.iter().map(|p| format!("{}: {}", p.ident, p.rust_type)).collect();
        out.push_str(&format!(
            "pub fn {}(modifier: Modifier, {}) -> Modifier {{\n",
            escape_ident(&fn_name),
            signature.join(", ")
        ));
        out.push_str(&format!(
            "    modifier.property(KindSet::{}, \"{}\", {})\n}}\n",
            kind_const, property, value
        ));
    }

    Ok(out)
}

fn push_docs(out: &mut String, summary: &str, method: &MethodDescriptor, config: &GeneratorConfig) {
    out.push_str(&format!("/// {}\n", summary));
    if config.emit_doc_links {
        if let Some(link) = &method.doc_link {
            out.push_str(&format!("///\n/// See <{}>.\n", doc_text(link)));
        }
    }
    if method.deprecated {
        out.push_str(&format!(
            "#[deprecated(note = \"`{}` is deprecated in the SDK\")]\n",
            method.name
        ));
    }
}

fn resolve_kind(descriptor: &OverlayDescriptor) -> Result<OverlayKind, MapError> {
    let name = descriptor.kind.as_deref().unwrap_or(&descriptor.name);
    OverlayKind::parse(name).ok_or_else(|| MapError::UnknownOverlayKind(name.to_string()))
}

fn kind_const(kind: OverlayKind) -> &'static str {
    match kind {
        OverlayKind::Marker => "MARKER",
        OverlayKind::InfoWindow => "INFO_WINDOW",
        OverlayKind::Circle => "CIRCLE",
        OverlayKind::Polyline => "POLYLINE",
        OverlayKind::Polygon => "POLYGON",
        OverlayKind::Path => "PATH",
        OverlayKind::GroundOverlay => "GROUND_OVERLAY",
        OverlayKind::LocationOverlay => "LOCATION_OVERLAY",
    }
}

fn method_params(method: &MethodDescriptor) -> Result<Vec<Param>, MapError> {
    method
        .parameters
        .iter()
        .map(|(name, reflected)| {
            let ident = escape_ident(&to_snake_case(name));
            let simple = simple_type_name(reflected);
            // Colors arrive as plain ints; the name is the only hint.
            if simple == "int" && name.to_ascii_lowercase().ends_with("color") {
                return Ok(Param {
                    value: format!("PropertyValue::Color({})", ident),
                    rust_type: "u32".to_string(),
                    ident,
                });
            }
            let rust_type = RUST_TYPES.get(simple.as_str()).ok_or_else(|| MapError::UnsupportedType {
                method: method.name.clone(),
                parameter: name.clone(),
                type_name: reflected.clone(),
            })?;
            Ok(Param {
                value: format!("PropertyValue::from({})", ident),
                rust_type: rust_type.to_string(),
                ident,
            })
        })
        .collect()
}

/// Drops package qualifiers everywhere in a type, generics included:
/// `java.util.List<com.sdk.LatLng>` becomes `List<LatLng>`.
fn simple_type_name(reflected: &str) -> String {
    let mut out = String::with_capacity(reflected.len());
    let mut segment = String::new();
    for c in reflected.chars() {
        if c.is_alphanumeric() || c == '_' || c == '$' {
            segment.push(c);
        } else if c == '.' {
            segment.clear();
        } else {
            out.push_str(&segment);
            segment.clear();
            if !c.is_whitespace() {
                out.push(c);
            }
        }
    }
    out.push_str(&segment);
    out
}

/// `setZIndex` -> `zIndex`; names without a `set` prefix are kept.
fn property_name(setter: &str) -> String {
    match setter.strip_prefix("set") {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_uppercase()) => {
            let mut chars = rest.chars();
            let first = chars.next().map(|c| c.to_ascii_lowercase());
            first.into_iter().chain(chars).collect()
        }
        _ => setter.to_string(),
    }
}

/// `zIndex` -> `z_index`, `HTMLText` -> `html_text`
fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn escape_ident(ident: &str) -> String {
    match ident {
        "self" | "Self" | "super" | "crate" => format!("{}_", ident),
        _ if RUST_KEYWORDS.contains(ident) => format!("r#{}", ident),
        _ => ident.to_string(),
    }
}

/// Keeps reflected text from breaking out of a doc comment line.
fn doc_text(s: &str) -> String {
    s.replace(['\n', '\r'], " ").replace('>', "%3E")
}
