use std::any::TypeId;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::{describe_context, ContextDescription, MetadataError};
use crate::types::{Context, ObjectType, TypeCatalog};

/// Context descriptions keyed by type, each computed at most once.
///
/// Owned by the embedder; there is no process-wide instance.
#[derive(Debug, Default)]
pub struct DescriptionCache {
    descriptions: DashMap<TypeId, Arc<ContextDescription>>,
}

impl DescriptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn describe<C: Context>(
        &self,
        catalog: &dyn TypeCatalog,
    ) -> Result<Arc<ContextDescription>, MetadataError> {
        self.get_or_describe(catalog, &ObjectType::of::<C>())
    }

    pub fn get_or_describe(
        &self,
        catalog: &dyn TypeCatalog,
        context: &ObjectType,
    ) -> Result<Arc<ContextDescription>, MetadataError> {
        if let Some(found) = self.descriptions.get(&context.id()) {
            return Ok(found.clone());
        }
        // the vacant entry keeps its shard locked while describing
        match self.descriptions.entry(context.id()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                debug!(context = %context, "describing context type");
                let description = Arc::new(describe_context(catalog, context)?);
                entry.insert(description.clone());
                Ok(description)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}
