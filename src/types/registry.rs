//! Runtime type registry.
//!
//! Context types are described once at startup through [`TypeRegistry::register`]
//! and looked up afterwards through the read-only [`TypeCatalog`] capability.
//! Host objects are reached through type-erased projections, so the compiler
//! never needs to know a context type statically.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{short_type_name, Arguments, HostType, ObjectType, TypeRef, Value};
use crate::eval::{EvalError, EvalResult};

pub type Projection =
    Arc<dyn for<'a> Fn(&'a dyn Any) -> EvalResult<&'a dyn Any> + Send + Sync>;
pub type ProjectionMut =
    Arc<dyn for<'a> Fn(&'a mut dyn Any) -> EvalResult<&'a mut dyn Any> + Send + Sync>;
pub type Getter = Arc<dyn Fn(&dyn Any) -> EvalResult<Value> + Send + Sync>;

type StaticFn = dyn Fn(Arguments<'_>) -> EvalResult<Value> + Send + Sync;
type SharedFn = dyn Fn(&dyn Any, Arguments<'_>) -> EvalResult<Value> + Send + Sync;
type ExclusiveFn = dyn Fn(&mut dyn Any, Arguments<'_>) -> EvalResult<Value> + Send + Sync;

pub(crate) fn downcast_ref<T: Any>(target: &dyn Any) -> EvalResult<&T> {
    target
        .downcast_ref::<T>()
        .ok_or_else(|| EvalError::ReceiverMismatch {
            expected: short_type_name::<T>().to_string(),
        })
}

pub(crate) fn downcast_mut<T: Any>(target: &mut dyn Any) -> EvalResult<&mut T> {
    target
        .downcast_mut::<T>()
        .ok_or_else(|| EvalError::ReceiverMismatch {
            expected: short_type_name::<T>().to_string(),
        })
}

fn projection<F>(f: F) -> Projection
where
    F: for<'a> Fn(&'a dyn Any) -> EvalResult<&'a dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn projection_mut<F>(f: F) -> ProjectionMut
where
    F: for<'a> Fn(&'a mut dyn Any) -> EvalResult<&'a mut dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn getter<F>(f: F) -> Getter
where
    F: Fn(&dyn Any) -> EvalResult<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn static_invoker<F>(f: F) -> Invoker
where
    F: Fn(Arguments<'_>) -> EvalResult<Value> + Send + Sync + 'static,
{
    Invoker::Static(Arc::new(f))
}

fn shared_invoker<F>(f: F) -> Invoker
where
    F: Fn(&dyn Any, Arguments<'_>) -> EvalResult<Value> + Send + Sync + 'static,
{
    Invoker::Shared(Arc::new(f))
}

fn exclusive_invoker<F>(f: F) -> Invoker
where
    F: Fn(&mut dyn Any, Arguments<'_>) -> EvalResult<Value> + Send + Sync + 'static,
{
    Invoker::Exclusive(Arc::new(f))
}

/// How a member is read from its owner.
#[derive(Clone)]
pub enum MemberAccessor {
    /// Member holding a rule value (`Int32`, `String`, arrays...).
    Value(Getter),
    /// Nested host object; only reachable as a receiver.
    Object {
        get: Projection,
        get_mut: ProjectionMut,
    },
}

#[derive(Clone)]
pub struct MemberDescriptor {
    pub name: String,
    pub ty: TypeRef,
    pub accessor: MemberAccessor,
    pub omitted: bool,
}

impl MemberDescriptor {
    /// Hides the member from tooling descriptions. It stays usable in rules.
    pub fn omit(&mut self) -> &mut Self {
        self.omitted = true;
        self
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("omitted", &self.omitted)
            .finish_non_exhaustive()
    }
}

/// Callable behind a method descriptor.
///
/// `Shared` and `Exclusive` receive the receiver object separately from the
/// arguments. `Static` receives everything positionally, including the
/// receiver value of an extension on a primitive type.
#[derive(Clone)]
pub enum Invoker {
    Static(Arc<StaticFn>),
    Shared(Arc<SharedFn>),
    Exclusive(Arc<ExclusiveFn>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub ty: TypeRef,
    pub description: Option<String>,
    pub value_provider: Option<String>,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            value_provider: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Endpoint tooling can query for the admissible values of this parameter.
    pub fn with_value_provider(mut self, endpoint: impl Into<String>) -> Self {
        self.value_provider = Some(endpoint.into());
        self
    }
}

impl<S: Into<String>> From<(S, TypeRef)> for ParameterDescriptor {
    fn from((name, ty): (S, TypeRef)) -> Self {
        ParameterDescriptor::new(name, ty)
    }
}

#[derive(Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub parameters: Vec<ParameterDescriptor>,
    pub return_type: TypeRef,
    pub description: Option<String>,
    pub omitted: bool,
    /// Provider function whose leading parameter is the receiver.
    pub extension: bool,
    pub invoker: Invoker,
}

impl MethodDescriptor {
    fn new(name: &str, return_type: TypeRef, invoker: Invoker) -> Self {
        Self {
            name: name.to_string(),
            parameters: Vec::new(),
            return_type,
            description: None,
            omitted: false,
            extension: false,
            invoker,
        }
    }

    fn extending(mut self, receiver: TypeRef) -> Self {
        self.extension = true;
        self.parameters.push(ParameterDescriptor::new("receiver", receiver));
        self
    }

    pub fn param(&mut self, parameter: impl Into<ParameterDescriptor>) -> &mut Self {
        self.parameters.push(parameter.into());
        self
    }

    pub fn describe(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn omit(&mut self) -> &mut Self {
        self.omitted = true;
        self
    }

    /// Exact match of the parameter tuple, arity included.
    pub fn accepts(&self, argument_types: &[TypeRef]) -> bool {
        self.parameters.len() == argument_types.len()
            && self
                .parameters
                .iter()
                .zip(argument_types)
                .all(|(parameter, argument)| parameter.ty == *argument)
    }

    pub fn parameter_types(&self) -> Vec<TypeRef> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn is_static(&self) -> bool {
        matches!(self.invoker, Invoker::Static(_))
    }

    pub fn is_mutating(&self) -> bool {
        matches!(self.invoker, Invoker::Exclusive(_))
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .field("extension", &self.extension)
            .field("static", &self.is_static())
            .field("mutating", &self.is_mutating())
            .finish_non_exhaustive()
    }
}

/// Composition-based inheritance: the derived type embeds its base.
#[derive(Clone)]
pub struct BaseLink {
    pub base: ObjectType,
    pub get: Projection,
    pub get_mut: ProjectionMut,
}

impl fmt::Debug for BaseLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BaseLink({})", self.base)
    }
}

#[derive(Debug)]
pub struct TypeDescriptor {
    pub ty: ObjectType,
    pub members: Vec<Arc<MemberDescriptor>>,
    pub methods: Vec<Arc<MethodDescriptor>>,
    pub base: Option<BaseLink>,
}

/// Result of a lookup that may have walked up the inheritance chain.
///
/// `via` lists the base hops, nearest first, that turn the receiver into the
/// declaring type.
#[derive(Debug, Clone)]
pub struct Lookup<T> {
    pub item: Arc<T>,
    pub via: Vec<BaseLink>,
}

impl<T> Lookup<T> {
    pub fn is_inherited(&self) -> bool {
        !self.via.is_empty()
    }
}

/// Read-only view over the types rules can be compiled against.
pub trait TypeCatalog: Send + Sync {
    fn descriptor(&self, ty: &ObjectType) -> Option<Arc<TypeDescriptor>>;

    /// Members declared on `ty` itself.
    fn list_members(&self, ty: &ObjectType) -> Vec<Arc<MemberDescriptor>> {
        self.descriptor(ty)
            .map(|d| d.members.clone())
            .unwrap_or_default()
    }

    /// Methods declared on `ty` itself.
    fn list_methods(&self, ty: &ObjectType) -> Vec<Arc<MethodDescriptor>> {
        self.descriptor(ty)
            .map(|d| d.methods.clone())
            .unwrap_or_default()
    }

    fn member_type(&self, ty: &ObjectType, name: &str) -> Option<TypeRef> {
        self.find_member(ty, name).map(|lookup| lookup.item.ty.clone())
    }

    fn find_member(&self, ty: &ObjectType, name: &str) -> Option<Lookup<MemberDescriptor>> {
        walk(self, ty, |descriptor| {
            descriptor
                .members
                .iter()
                .find(|member| member.name == name)
                .cloned()
        })
    }

    fn find_method(
        &self,
        ty: &ObjectType,
        name: &str,
        argument_types: &[TypeRef],
    ) -> Option<Lookup<MethodDescriptor>> {
        walk(self, ty, |descriptor| {
            descriptor
                .methods
                .iter()
                .find(|method| method.name == name && method.accepts(argument_types))
                .cloned()
        })
    }
}

fn walk<C, T, F>(catalog: &C, ty: &ObjectType, find: F) -> Option<Lookup<T>>
where
    C: TypeCatalog + ?Sized,
    F: Fn(&TypeDescriptor) -> Option<Arc<T>>,
{
    let mut visited = HashSet::new();
    let mut via = Vec::new();
    let mut current = catalog.descriptor(ty)?;
    loop {
        if !visited.insert(current.ty.id()) {
            return None;
        }
        if let Some(item) = find(&current) {
            return Some(Lookup { item, via });
        }
        let base = current.base.clone()?;
        current = catalog.descriptor(&base.base)?;
        via.push(base);
    }
}

/// Registry populated once at startup and shared read-only afterwards.
#[derive(Default, Clone)]
pub struct TypeRegistry {
    types: HashMap<TypeId, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Any>(&mut self, build: impl FnOnce(&mut TypeBuilder<T>)) -> &mut Self {
        let mut builder = TypeBuilder::<T>::new();
        build(&mut builder);
        let descriptor = builder.finish();
        debug!(
            "Registered type {} ({} members, {} methods)",
            descriptor.ty,
            descriptor.members.len(),
            descriptor.methods.len()
        );
        if let Some(previous) = self
            .types
            .insert(TypeId::of::<T>(), Arc::new(descriptor))
        {
            warn!("Type {} registered twice, replacing previous entry", previous.ty);
        }
        self
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.types.values().map(|d| d.ty.name()))
            .finish()
    }
}

impl TypeCatalog for TypeRegistry {
    fn descriptor(&self, ty: &ObjectType) -> Option<Arc<TypeDescriptor>> {
        self.types.get(&ty.id()).cloned()
    }
}

/// Declares the members and methods of `T`.
pub struct TypeBuilder<T> {
    members: Vec<MemberDescriptor>,
    methods: Vec<MethodDescriptor>,
    base: Option<BaseLink>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> TypeBuilder<T> {
    fn new() -> Self {
        Self {
            members: Vec::new(),
            methods: Vec::new(),
            base: None,
            _marker: PhantomData,
        }
    }

    fn finish(self) -> TypeDescriptor {
        TypeDescriptor {
            ty: ObjectType::of::<T>(),
            members: self.members.into_iter().map(Arc::new).collect(),
            methods: self.methods.into_iter().map(Arc::new).collect(),
            base: self.base,
        }
    }

    fn push_member(&mut self, member: MemberDescriptor) -> &mut MemberDescriptor {
        let index = self.members.len();
        self.members.push(member);
        &mut self.members[index]
    }

    fn push_method(&mut self, method: MethodDescriptor) -> &mut MethodDescriptor {
        let index = self.methods.len();
        self.methods.push(method);
        &mut self.methods[index]
    }

    /// Value-typed member; its rule type follows from `V`.
    pub fn field<V, F>(&mut self, name: &str, get: F) -> &mut MemberDescriptor
    where
        V: HostType,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        let getter = getter(move |target| Ok(get(downcast_ref::<T>(target)?).into_value()));
        self.push_member(MemberDescriptor {
            name: name.to_string(),
            ty: V::type_ref(),
            accessor: MemberAccessor::Value(getter),
            omitted: false,
        })
    }

    /// Nested object member, walked through by dotted paths.
    pub fn object<U, G, M>(&mut self, name: &str, get: G, get_mut: M) -> &mut MemberDescriptor
    where
        U: Any,
        G: for<'a> Fn(&'a T) -> &'a U + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut U + Send + Sync + 'static,
    {
        let get = projection(move |target| Ok(get(downcast_ref::<T>(target)?) as &dyn Any));
        let get_mut = projection_mut(move |target| {
            Ok(get_mut(downcast_mut::<T>(target)?) as &mut dyn Any)
        });
        self.push_member(MemberDescriptor {
            name: name.to_string(),
            ty: TypeRef::object::<U>(),
            accessor: MemberAccessor::Object { get, get_mut },
            omitted: false,
        })
    }

    /// Nested object member that may be absent. Walking through an absent
    /// member fails evaluation with [`EvalError::MissingObject`].
    pub fn optional_object<U, G, M>(
        &mut self,
        name: &str,
        get: G,
        get_mut: M,
    ) -> &mut MemberDescriptor
    where
        U: Any,
        G: for<'a> Fn(&'a T) -> Option<&'a U> + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> Option<&'a mut U> + Send + Sync + 'static,
    {
        let missing = {
            let member = name.to_string();
            move || EvalError::MissingObject {
                owner: short_type_name::<T>().to_string(),
                member: member.clone(),
            }
        };
        let missing_mut = missing.clone();
        let get = projection(move |target| {
            get(downcast_ref::<T>(target)?)
                .map(|object| object as &dyn Any)
                .ok_or_else(&missing)
        });
        let get_mut = projection_mut(move |target| {
            get_mut(downcast_mut::<T>(target)?)
                .map(|object| object as &mut dyn Any)
                .ok_or_else(&missing_mut)
        });
        self.push_member(MemberDescriptor {
            name: name.to_string(),
            ty: TypeRef::object::<U>(),
            accessor: MemberAccessor::Object { get, get_mut },
            omitted: false,
        })
    }

    /// Instance method reading `T`.
    pub fn method<R, F>(&mut self, name: &str, f: F) -> &mut MethodDescriptor
    where
        R: HostType,
        F: Fn(&T, Arguments<'_>) -> EvalResult<R> + Send + Sync + 'static,
    {
        let invoker = shared_invoker(move |target, args| {
            f(downcast_ref::<T>(target)?, args).map(HostType::into_value)
        });
        self.push_method(MethodDescriptor::new(name, R::type_ref(), invoker))
    }

    /// Instance method that mutates `T`. Only callable from actions.
    pub fn method_mut<R, F>(&mut self, name: &str, f: F) -> &mut MethodDescriptor
    where
        R: HostType,
        F: Fn(&mut T, Arguments<'_>) -> EvalResult<R> + Send + Sync + 'static,
    {
        let invoker = exclusive_invoker(move |target, args| {
            f(downcast_mut::<T>(target)?, args).map(HostType::into_value)
        });
        self.push_method(MethodDescriptor::new(name, R::type_ref(), invoker))
    }

    pub fn static_method<R, F>(&mut self, name: &str, f: F) -> &mut MethodDescriptor
    where
        R: HostType,
        F: Fn(Arguments<'_>) -> EvalResult<R> + Send + Sync + 'static,
    {
        let invoker = static_invoker(move |args| f(args).map(HostType::into_value));
        self.push_method(MethodDescriptor::new(name, R::type_ref(), invoker))
    }

    /// Provider function extending the object type `Recv`.
    ///
    /// The receiver is the leading parameter of the descriptor, so resolution
    /// sees the same signature a free function taking the receiver would have.
    pub fn extension<Recv, R, F>(&mut self, name: &str, f: F) -> &mut MethodDescriptor
    where
        Recv: Any,
        R: HostType,
        F: Fn(&Recv, Arguments<'_>) -> EvalResult<R> + Send + Sync + 'static,
    {
        let invoker = shared_invoker(move |target, args| {
            f(downcast_ref::<Recv>(target)?, args).map(HostType::into_value)
        });
        self.push_method(
            MethodDescriptor::new(name, R::type_ref(), invoker).extending(TypeRef::object::<Recv>()),
        )
    }

    pub fn extension_mut<Recv, R, F>(&mut self, name: &str, f: F) -> &mut MethodDescriptor
    where
        Recv: Any,
        R: HostType,
        F: Fn(&mut Recv, Arguments<'_>) -> EvalResult<R> + Send + Sync + 'static,
    {
        let invoker = exclusive_invoker(move |target, args| {
            f(downcast_mut::<Recv>(target)?, args).map(HostType::into_value)
        });
        self.push_method(
            MethodDescriptor::new(name, R::type_ref(), invoker).extending(TypeRef::object::<Recv>()),
        )
    }

    /// Declares `B` as the base of `T`; its members and methods are found
    /// after the ones declared on `T`.
    pub fn inherits<B, G, M>(&mut self, get: G, get_mut: M) -> &mut Self
    where
        B: Any,
        G: for<'a> Fn(&'a T) -> &'a B + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut B + Send + Sync + 'static,
    {
        self.base = Some(BaseLink {
            base: ObjectType::of::<B>(),
            get: projection(move |target| Ok(get(downcast_ref::<T>(target)?) as &dyn Any)),
            get_mut: projection_mut(move |target| {
                Ok(get_mut(downcast_mut::<T>(target)?) as &mut dyn Any)
            }),
        });
        self
    }
}
