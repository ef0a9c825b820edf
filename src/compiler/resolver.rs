//! Method Resolver: native members first, then extension providers in order.

use std::any::Any;
use std::sync::Arc;

use tracing::debug;

use crate::types::{BaseLink, MethodDescriptor, ObjectType, TypeCatalog, TypeRef};

use super::error::{CompileError, CompileResult};

/// Context type a compiler is bound to plus the providers searched for
/// extension methods. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodResolutionOptions {
    context_type: ObjectType,
    providers: Vec<ObjectType>,
}

impl MethodResolutionOptions {
    /// Native members only.
    pub fn new(context_type: ObjectType) -> Self {
        Self {
            context_type,
            providers: Vec::new(),
        }
    }

    pub fn for_context<C: Any>() -> Self {
        Self::new(ObjectType::of::<C>())
    }

    pub fn with_extension_methods(context_type: ObjectType, provider: ObjectType) -> Self {
        Self::with_providers(context_type, vec![provider])
    }

    pub fn with_providers(context_type: ObjectType, providers: Vec<ObjectType>) -> Self {
        Self {
            context_type,
            providers,
        }
    }

    pub fn context_type(&self) -> &ObjectType {
        &self.context_type
    }

    pub fn providers(&self) -> &[ObjectType] {
        &self.providers
    }

    pub fn extensions_enabled(&self) -> bool {
        !self.providers.is_empty()
    }
}

/// Outcome of resolving one call site.
#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    pub method: Arc<MethodDescriptor>,
    /// Type the method is declared on: the receiver, one of its bases, or a provider.
    pub declaring_type: ObjectType,
    /// Base hops from the receiver to `declaring_type`. Empty for extensions.
    pub via: Vec<BaseLink>,
    /// Receiver is passed as the leading argument.
    pub is_extension: bool,
}

#[derive(Clone)]
pub struct MethodResolver {
    catalog: Arc<dyn TypeCatalog>,
}

impl MethodResolver {
    pub fn new(catalog: Arc<dyn TypeCatalog>) -> Self {
        Self { catalog }
    }

    pub fn resolve(
        &self,
        name: &str,
        receiver: &TypeRef,
        argument_types: &[TypeRef],
        options: &MethodResolutionOptions,
    ) -> CompileResult<ResolvedMethod> {
        if let Some(owner) = receiver.as_object() {
            if let Some(lookup) = self.catalog.find_method(owner, name, argument_types) {
                let declaring_type = lookup
                    .via
                    .last()
                    .map(|link| link.base.clone())
                    .unwrap_or_else(|| owner.clone());
                debug!(method = name, receiver = %receiver, declaring = %declaring_type, "resolved native method");
                return Ok(ResolvedMethod {
                    method: lookup.item,
                    declaring_type,
                    via: lookup.via,
                    is_extension: false,
                });
            }
        }

        let mut extended = Vec::with_capacity(argument_types.len() + 1);
        extended.push(receiver.clone());
        extended.extend_from_slice(argument_types);

        for provider in options.providers() {
            if let Some(lookup) = self.catalog.find_method(provider, name, &extended) {
                debug!(method = name, receiver = %receiver, provider = %provider, "resolved extension method");
                return Ok(ResolvedMethod {
                    method: lookup.item,
                    declaring_type: provider.clone(),
                    via: Vec::new(),
                    is_extension: true,
                });
            }
        }

        Err(CompileError::resolution(name, argument_types))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    struct Shape;
    struct Helpers;
    struct MoreHelpers;

    fn resolver() -> MethodResolver {
        let mut registry = TypeRegistry::new();
        registry
            .register::<Shape>(|ty| {
                ty.method("Area", |_, _| Ok(1));
            })
            .register::<Helpers>(|ty| {
                ty.extension::<Shape, _, _>("Area", |_, _| Ok(2));
                ty.extension::<Shape, _, _>("Scaled", |_, args| args.int(0))
                    .param(("factor", TypeRef::Int));
            })
            .register::<MoreHelpers>(|ty| {
                ty.extension::<Shape, _, _>("Scaled", |_, _| Ok(0))
                    .param(("factor", TypeRef::Int));
                ty.static_method("Double", |args| Ok(args.int(0)? * 2))
                    .param(("value", TypeRef::Int));
            });
        MethodResolver::new(Arc::new(registry))
    }

    #[test]
    fn test_native_wins_over_extension() -> CompileResult<()> {
        let options = MethodResolutionOptions::with_extension_methods(
            ObjectType::of::<Shape>(),
            ObjectType::of::<Helpers>(),
        );
        let resolved = resolver().resolve("Area", &TypeRef::object::<Shape>(), &[], &options)?;
        assert!(!resolved.is_extension);
        assert_eq!(resolved.declaring_type, ObjectType::of::<Shape>());
        Ok(())
    }

    #[test]
    fn test_providers_tried_in_order() -> CompileResult<()> {
        let options = MethodResolutionOptions::with_providers(
            ObjectType::of::<Shape>(),
            vec![ObjectType::of::<MoreHelpers>(), ObjectType::of::<Helpers>()],
        );
        let resolved =
            resolver().resolve("Scaled", &TypeRef::object::<Shape>(), &[TypeRef::Int], &options)?;
        assert!(resolved.is_extension);
        assert_eq!(resolved.declaring_type, ObjectType::of::<MoreHelpers>());
        Ok(())
    }

    #[test]
    fn test_extension_on_value_receiver() -> CompileResult<()> {
        let options = MethodResolutionOptions::with_extension_methods(
            ObjectType::of::<Shape>(),
            ObjectType::of::<MoreHelpers>(),
        );
        let resolved = resolver().resolve("Double", &TypeRef::Int, &[], &options)?;
        assert!(resolved.is_extension);
        assert!(resolved.method.is_static());
        Ok(())
    }

    #[test]
    fn test_unresolved_names_arguments() {
        let options = MethodResolutionOptions::for_context::<Shape>();
        let error = resolver()
            .resolve("Scaled", &TypeRef::object::<Shape>(), &[TypeRef::Int], &options)
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Failed to resolve method 'Scaled' with arguments: Int32"
        );
    }
}
