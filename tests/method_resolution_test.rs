mod common;

use common::{
    registry, test_context_compiler, DerivedTestMethodProvider, InnerContext, TestContext,
    TestExtensionMethods, TestMethodProvider,
};
use kettei::compiler::{CompileError, MethodResolver, ResolvedMethod};
use kettei::{Error, Expression, MethodResolutionOptions, ObjectType, TypeRef};
use pretty_assertions::assert_eq;

fn resolve(
    name: &str,
    receiver: TypeRef,
    arguments: &[TypeRef],
    options: &MethodResolutionOptions,
) -> Result<ResolvedMethod, CompileError> {
    MethodResolver::new(registry()).resolve(name, &receiver, arguments, options)
}

fn provider_options() -> MethodResolutionOptions {
    MethodResolutionOptions::for_context::<TestMethodProvider>()
}

fn extension_options() -> MethodResolutionOptions {
    MethodResolutionOptions::with_extension_methods(
        ObjectType::of::<TestMethodProvider>(),
        ObjectType::of::<TestExtensionMethods>(),
    )
}

#[test]
fn test_instance_method() -> Result<(), CompileError> {
    let resolved = resolve(
        "InstanceMethod",
        TypeRef::object::<TestMethodProvider>(),
        &[],
        &provider_options(),
    )?;
    assert!(!resolved.is_extension);
    assert_eq!(resolved.method.name, "InstanceMethod");
    assert_eq!(resolved.declaring_type, ObjectType::of::<TestMethodProvider>());
    Ok(())
}

#[test]
fn test_static_method() -> Result<(), CompileError> {
    let resolved = resolve(
        "StaticMethod",
        TypeRef::object::<TestMethodProvider>(),
        &[],
        &provider_options(),
    )?;
    assert!(!resolved.is_extension);
    assert!(resolved.method.is_static());
    assert_eq!(resolved.method.name, "StaticMethod");
    Ok(())
}

#[test]
fn test_method_from_base() -> Result<(), CompileError> {
    let options = MethodResolutionOptions::for_context::<DerivedTestMethodProvider>();
    let resolved = resolve(
        "InstanceMethod",
        TypeRef::object::<DerivedTestMethodProvider>(),
        &[],
        &options,
    )?;
    assert!(!resolved.is_extension);
    assert_eq!(resolved.method.name, "InstanceMethod");
    assert_eq!(resolved.declaring_type, ObjectType::of::<TestMethodProvider>());
    assert_eq!(resolved.via.len(), 1);
    Ok(())
}

#[test]
fn test_extension_method() -> Result<(), CompileError> {
    let resolved = resolve(
        "ExtensionMethod",
        TypeRef::object::<TestMethodProvider>(),
        &[],
        &extension_options(),
    )?;
    assert!(resolved.is_extension);
    assert_eq!(resolved.method.name, "ExtensionMethod");
    assert_eq!(resolved.declaring_type, ObjectType::of::<TestExtensionMethods>());
    Ok(())
}

#[test]
fn test_extension_method_with_argument() -> Result<(), CompileError> {
    let resolved = resolve(
        "ExtensionMethodWithArg",
        TypeRef::object::<TestMethodProvider>(),
        &[TypeRef::Int],
        &extension_options(),
    )?;
    assert!(resolved.is_extension);
    assert_eq!(
        resolved.method.parameter_types(),
        vec![TypeRef::object::<TestMethodProvider>(), TypeRef::Int]
    );
    Ok(())
}

#[test]
fn test_nonexistent_method() {
    let error = resolve(
        "NonExistent",
        TypeRef::object::<TestMethodProvider>(),
        &[],
        &provider_options(),
    )
    .unwrap_err();
    assert!(error
        .to_string()
        .contains("Failed to resolve method 'NonExistent'"));
}

#[test]
fn test_extension_methods_not_enabled() {
    let error = resolve(
        "ExtensionMethod",
        TypeRef::object::<TestMethodProvider>(),
        &[],
        &provider_options(),
    )
    .unwrap_err();
    assert!(error
        .to_string()
        .contains("Failed to resolve method 'ExtensionMethod'"));
}

#[test]
fn test_overloaded_method() -> Result<(), CompileError> {
    let receiver = TypeRef::object::<TestMethodProvider>();
    let by_string = resolve(
        "OverloadedMethod",
        receiver.clone(),
        &[TypeRef::String],
        &provider_options(),
    )?;
    let by_int = resolve("OverloadedMethod", receiver, &[TypeRef::Int], &provider_options())?;

    assert!(!by_string.is_extension);
    assert_eq!(by_string.method.parameter_types(), vec![TypeRef::String]);
    assert_eq!(by_string.method.return_type, TypeRef::Int);
    assert!(!by_int.is_extension);
    assert_eq!(by_int.method.parameter_types(), vec![TypeRef::Int]);
    Ok(())
}

#[test]
fn test_no_widening_between_numeric_types() {
    let error = resolve(
        "OverloadedMethod",
        TypeRef::object::<TestMethodProvider>(),
        &[TypeRef::Decimal],
        &provider_options(),
    )
    .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Failed to resolve method 'OverloadedMethod' with arguments: Decimal"
    );
}

#[test]
fn test_extension_method_on_context() -> Result<(), Error> {
    let expression = Expression::call("IsAdult", vec![Expression::int(18)]);
    let condition = test_context_compiler().compile_condition::<TestContext>(&expression)?;
    assert_eq!(condition.expression(), "ctx => IsAdult(ctx, 18)");

    let adult = TestContext {
        test_field1: "Adult".to_string(),
        ..TestContext::default()
    };
    assert!(condition.evaluate(&adult)?);
    assert!(!condition.evaluate(&TestContext::default())?);
    Ok(())
}

#[test]
fn test_extension_method_on_primitive_type() -> Result<(), Error> {
    let expression = Expression::call_on("Inner.Value", "IsEven", vec![]);
    let condition = test_context_compiler().compile_condition::<TestContext>(&expression)?;
    assert_eq!(condition.expression(), "ctx => IsEven(ctx.Inner.Value)");

    let even = TestContext {
        inner: InnerContext { value: 4 },
        ..TestContext::default()
    };
    let odd = TestContext {
        inner: InnerContext { value: 7 },
        ..TestContext::default()
    };
    assert!(condition.evaluate(&even)?);
    assert!(!condition.evaluate(&odd)?);
    Ok(())
}

#[test]
fn test_nonexistent_extension_method() {
    let expression = Expression::call("NonExistentExtensionMethod", vec![]);
    let error = test_context_compiler()
        .compile_condition::<TestContext>(&expression)
        .unwrap_err();
    assert!(error
        .to_string()
        .contains("Failed to resolve method 'NonExistentExtensionMethod'"));
}

#[test]
fn test_native_method_shadows_extension() -> Result<(), Error> {
    // TestMethod1 exists natively; the provider is never consulted
    let expression = Expression::call("TestMethod1", vec![Expression::int(3)]);
    let condition = test_context_compiler().compile_condition::<TestContext>(&expression)?;
    assert_eq!(condition.expression(), "ctx => ctx.TestMethod1(3)");
    assert!(!condition.evaluate(&TestContext::default())?);
    Ok(())
}
