//! Tooling descriptions of context types.
//!
//! Walks the same [`TypeCatalog`] the compiler uses and produces a serialisable
//! tree of members and methods a rule editor can offer. Nothing here takes
//! part in compilation.

mod cache;

use std::collections::{BTreeMap, HashSet};
use std::any::TypeId;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::BinaryOperator;
use crate::types::{MethodDescriptor, ObjectType, TypeCatalog, TypeRef};

pub use cache::DescriptionCache;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    #[error("Type '{0}' is not registered in the type catalog")]
    UnknownType(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDescription {
    pub context_name: String,
    pub members: Vec<ContextMemberDescription>,
    pub methods: Vec<ContextMemberMethodDescription>,
    pub operator_names_by_type: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMemberDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Dotted path usable in a `MemberAccess` node.
    pub path: String,
    pub members: Vec<ContextMemberDescription>,
    pub methods: Vec<ContextMemberMethodDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMemberMethodDescription {
    pub name: String,
    pub description: Option<String>,
    pub return_type: String,
    pub parameters: Vec<MethodParameterDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodParameterDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub value_provider_endpoint: Option<String>,
}

/// Operators applicable to each kind tag.
pub fn operator_names_by_type() -> BTreeMap<String, Vec<String>> {
    use BinaryOperator::*;

    let numeric = [
        AddChecked,
        SubtractChecked,
        LessThan,
        LessThanOrEqual,
        GreaterThan,
        GreaterThanOrEqual,
        Equal,
        NotEqual,
    ];
    let names = |operators: &[BinaryOperator]| -> Vec<String> {
        operators.iter().map(ToString::to_string).collect()
    };

    BTreeMap::from([
        ("BOOL".to_string(), names(&[Equal, AndAlso, OrElse, NotEqual])),
        ("STRING".to_string(), names(&[Equal])),
        ("INT".to_string(), names(&numeric)),
        ("DECIMAL".to_string(), names(&numeric)),
    ])
}

/// Describes `context` and everything reachable from its members.
///
/// Nested object members expand recursively; a type already being expanded
/// on the current branch yields no members, which stops recursive and
/// co-recursive types.
pub fn describe_context(
    catalog: &dyn TypeCatalog,
    context: &ObjectType,
) -> Result<ContextDescription, MetadataError> {
    let descriptor = catalog
        .descriptor(context)
        .ok_or_else(|| MetadataError::UnknownType(context.name().to_string()))?;
    let visited = HashSet::from([context.id()]);

    let members = descriptor
        .members
        .iter()
        .filter(|member| !member.omitted)
        .map(|member| ContextMemberDescription {
            name: member.name.clone(),
            kind: member.ty.kind_tag().to_string(),
            path: member.name.clone(),
            members: members_of(catalog, &member.ty, &member.name, &visited),
            methods: methods_of(catalog, &member.ty),
        })
        .collect();

    Ok(ContextDescription {
        context_name: context.name().to_string(),
        members,
        methods: methods_of(catalog, &TypeRef::Object(context.clone())),
        operator_names_by_type: operator_names_by_type(),
    })
}

fn members_of(
    catalog: &dyn TypeCatalog,
    ty: &TypeRef,
    path: &str,
    visited: &HashSet<TypeId>,
) -> Vec<ContextMemberDescription> {
    let Some(object) = ty.as_object() else {
        return Vec::new();
    };
    if visited.contains(&object.id()) {
        return Vec::new();
    }
    let mut visited = visited.clone();
    visited.insert(object.id());

    catalog
        .list_members(object)
        .iter()
        .filter(|member| !member.omitted)
        .map(|member| {
            let child_path = format!("{}.{}", path, member.name);
            ContextMemberDescription {
                name: member.name.clone(),
                kind: member.ty.kind_tag().to_string(),
                members: members_of(catalog, &member.ty, &child_path, &visited),
                methods: methods_of(catalog, &member.ty),
                path: child_path,
            }
        })
        .collect()
}

/// Instance methods declared on `ty`; static and extension functions are left out.
fn methods_of(catalog: &dyn TypeCatalog, ty: &TypeRef) -> Vec<ContextMemberMethodDescription> {
    let Some(object) = ty.as_object() else {
        return Vec::new();
    };
    catalog
        .list_methods(object)
        .iter()
        .filter(|method| !method.omitted && !method.is_static() && !method.extension)
        .map(|method| describe_method(method))
        .collect()
}

fn describe_method(method: &MethodDescriptor) -> ContextMemberMethodDescription {
    ContextMemberMethodDescription {
        name: method.name.clone(),
        description: method.description.clone(),
        return_type: method.return_type.kind_tag().to_string(),
        parameters: method
            .parameters
            .iter()
            .map(|parameter| MethodParameterDescription {
                name: parameter.name.clone(),
                kind: parameter.ty.kind_tag().to_string(),
                description: parameter.description.clone(),
                value_provider_endpoint: parameter.value_provider.clone(),
            })
            .collect(),
    }
}
