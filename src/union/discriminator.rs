//! Discriminator resolution: an explicit `discriminator.propertyName` wins,
//! otherwise a property that carries a distinct single value in every member.
use serde_json::Value;

use crate::naming;
use crate::schema::{Discriminator, ObjectShape, SchemaDocument, SchemaKind, SchemaNode};

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub property: String,
    /// One entry per member, in member order.
    pub values: Vec<Option<Value>>,
}

/// Object shape of a member, following `$ref` chains.
pub fn member_object(doc: &SchemaDocument, member: &SchemaNode) -> Option<ObjectShape> {
    doc.resolve_deep(member).and_then(|n| n.as_object().cloned())
}

/// The literal a member pins `property` to, if any.
fn pinned_value(doc: &SchemaDocument, obj: &ObjectShape, property: &str) -> Option<Value> {
    let prop = obj.properties.get(property)?;
    doc.resolve_deep(prop).and_then(|n| n.single_value().cloned())
}

pub fn explicit(doc: &SchemaDocument, disc: &Discriminator, members: &[SchemaNode]) -> Resolved {
    let values = members
        .iter()
        .map(|member| {
            if let SchemaKind::Ref(reference) = &member.kind {
                let target = naming::type_name_from_ref(reference);
                let mapped = disc.mapping.iter().find(|(_, to)| {
                    *to == reference || naming::type_name_from_ref(to) == target
                });
                if let Some((value, _)) = mapped {
                    return Some(Value::String(value.clone()));
                }
            }
            let pinned = member_object(doc, member)
                .and_then(|obj| pinned_value(doc, &obj, &disc.property_name));
            if pinned.is_some() {
                return pinned;
            }
            match &member.kind {
                SchemaKind::Ref(reference) => {
                    let segment = reference.rsplit('/').next().unwrap_or(reference);
                    Some(Value::String(naming::unescape_pointer_segment(segment)))
                }
                _ => None,
            }
        })
        .collect();
    Resolved { property: disc.property_name.clone(), values }
}

/// First property (in the first member's declaration order) that every
/// member pins to a single value, with one distinct value per member.
/// Overlapping values disqualify a candidate.
pub fn infer(doc: &SchemaDocument, members: &[SchemaNode], strict: bool) -> Option<Resolved> {
    if members.len() < 2 {
        return None;
    }
    let objects: Vec<ObjectShape> = members.iter().map(|m| member_object(doc, m)).collect::<Option<_>>()?;

    'candidates: for property in objects[0].properties.keys() {
        let mut values: Vec<Value> = Vec::with_capacity(objects.len());
        for obj in &objects {
            if strict && !obj.is_required(property) {
                continue 'candidates;
            }
            let Some(v) = pinned_value(doc, obj, property) else {
                continue 'candidates;
            };
            if values.contains(&v) {
                tracing::debug!(%property, value = %v, "discriminator candidate has overlapping values");
                continue 'candidates;
            }
            values.push(v);
        }
        return Some(Resolved {
            property: property.clone(),
            values: values.into_iter().map(Some).collect(),
        });
    }
    None
}
