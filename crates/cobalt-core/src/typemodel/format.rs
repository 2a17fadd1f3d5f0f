//! Type names and value formatting.
//!
//! Formatting never fails: missing nodes, short buffers and unresolved
//! children render as `??` (or `N/A` for enums with no matching constant)
//! in place, so one bad member never hides the rest of a value.

use super::{TypeArena, TypeHandle, TypeNode};
use crate::types::Address;

/// Maximum number of array elements shown
pub const ARRAY_DISPLAY_LIMIT: u32 = 32;

/// Guard against malformed debug info describing a type through itself
const MAX_NESTING: usize = 24;

impl TypeArena
{
    /// Display name of a type.
    pub fn type_name(&self, handle: TypeHandle) -> String
    {
        self.name_at(handle, 0)
    }

    /// Render the value stored in `bytes` as this type.
    pub fn format_value(&self, handle: TypeHandle, bytes: &[u8]) -> String
    {
        self.format_at(handle, bytes, 0)
    }

    fn name_at(&self, handle: TypeHandle, depth: usize) -> String
    {
        let Some(node) = self.node(handle).filter(|_| depth < MAX_NESTING) else {
            return "??".to_string();
        };
        match node {
            TypeNode::Primitive(primitive) => primitive.name().to_string(),
            TypeNode::Pointer { inner, reference } => {
                let inner = inner.map_or_else(|| "Unknown".to_string(), |inner| self.name_at(inner, depth + 1));
                format!("{inner}{}", if *reference { "&" } else { "*" })
            }
            TypeNode::Array { inner, count, .. } => {
                let inner = inner.map_or_else(|| "Unknown".to_string(), |inner| self.name_at(inner, depth + 1));
                format!("{inner}[{count}]")
            }
            TypeNode::Function { ret, params } => {
                let optional = |ty: &Option<TypeHandle>| ty.map_or_else(|| "??".to_string(), |ty| self.name_at(ty, depth + 1));
                let params: Vec<String> = params.iter().map(&optional).collect();
                format!("{}({})", optional(ret), params.join(", "))
            }
            TypeNode::Enum { name, .. } | TypeNode::Typedef { name, .. } | TypeNode::Record { name, .. } => {
                name.clone()
            }
            TypeNode::Unknown => "Unknown".to_string(),
        }
    }

    fn format_at(&self, handle: TypeHandle, bytes: &[u8], depth: usize) -> String
    {
        let Some(node) = self.node(handle).filter(|_| depth < MAX_NESTING) else {
            return "??".to_string();
        };
        match node {
            TypeNode::Primitive(primitive) => primitive.format(bytes),
            TypeNode::Pointer { .. } => self
                .word_size()
                .read(bytes)
                .map_or_else(|| "??".to_string(), |value| Address::from(value).to_hex(self.word_size())),
            TypeNode::Array {
                inner,
                element_len,
                count,
            } => {
                let Some(inner) = inner else {
                    return String::new();
                };
                let mut text = String::from("\n");
                for index in 0..(*count).min(ARRAY_DISPLAY_LIMIT) {
                    let element = usize::try_from(u64::from(index) * element_len)
                        .ok()
                        .and_then(|start| bytes.get(start..))
                        .unwrap_or(&[]);
                    text.push_str(&format!("[{index}]: {}\n", self.format_at(*inner, element, depth + 1)));
                }
                text
            }
            TypeNode::Enum {
                underlying, constants, ..
            } => match underlying.integer_value(bytes) {
                Some(value) => constants
                    .iter()
                    .find(|constant| constant.value == value)
                    .map_or_else(|| "N/A".to_string(), |constant| constant.name.clone()),
                None => "??".to_string(),
            },
            TypeNode::Function { .. } => "{ ..function.. }".to_string(),
            TypeNode::Typedef { target, .. } => {
                target.map_or_else(|| "??".to_string(), |target| self.format_at(target, bytes, depth + 1))
            }
            TypeNode::Record { members, .. } => {
                let mut text = String::from("{ ");
                for member in members {
                    match member.ty {
                        Some(ty) => {
                            let field = usize::try_from(member.offset)
                                .ok()
                                .and_then(|start| bytes.get(start..))
                                .unwrap_or(&[]);
                            text.push_str(&format!(
                                "{}({}): {}, ",
                                member.name,
                                self.name_at(ty, depth + 1),
                                self.format_at(ty, field, depth + 1)
                            ));
                        }
                        None => text.push_str(&format!("{} ??, ", member.name)),
                    }
                }
                text.push_str(" }");
                text
            }
            TypeNode::Unknown => bytes
                .get(..4)
                .map_or_else(|| "??".to_string(), |raw| format!("{:08X}", u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))),
        }
    }
}
