#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Datelike, Months, NaiveDate};
use kettei::types::ParameterDescriptor;
use kettei::{
    Context, ExpressionCompiler, MethodResolutionOptions, ObjectType, RuleCompiler, TypeRef,
    TypeRegistry,
};
use lazy_static::lazy_static;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

lazy_static! {
    pub static ref REGISTRY: Arc<TypeRegistry> = Arc::new(build_registry());
}

pub fn registry() -> Arc<TypeRegistry> {
    REGISTRY.clone()
}

// --- Test context ---

#[derive(Debug, Clone)]
pub struct TestContext {
    pub test_field1: String,
    pub inner: InnerContext,
    pub date_field: NaiveDate,
    pub omitted_property: String,
}

impl Default for TestContext {
    fn default() -> Self {
        Self {
            test_field1: String::new(),
            inner: InnerContext::default(),
            date_field: date(2024, 1, 1),
            omitted_property: String::new(),
        }
    }
}

impl Context for TestContext {}

#[derive(Debug, Clone, Default)]
pub struct InnerContext {
    pub value: i32,
}

pub struct TestContextExtensions;

// --- Resolution fixtures ---

#[derive(Default)]
pub struct TestMethodProvider {
    pub calls: i32,
}

impl Context for TestMethodProvider {}

#[derive(Default)]
pub struct DerivedTestMethodProvider {
    pub base: TestMethodProvider,
}

impl Context for DerivedTestMethodProvider {}

pub struct TestExtensionMethods;

// --- Recursive types ---

pub struct RecursiveContext {
    pub name: String,
    pub parent: Option<Box<RecursiveContext>>,
}

impl Context for RecursiveContext {}

pub struct CoRecursiveA {
    pub b: CoRecursiveB,
}

impl Context for CoRecursiveA {}

pub struct CoRecursiveB {
    pub a: Option<Box<CoRecursiveA>>,
}

// --- Maintenance scheduling ---

#[derive(Debug, Clone)]
pub struct Customer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct Equipment {
    pub equipment_type: String,
    pub install_date: NaiveDate,
    pub last_service_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionInstruction {
    CreateWorkOrder {
        customer: String,
        equipment: String,
        work_order_type: String,
    },
    SendCustomerNotification {
        customer: String,
        message_template: String,
    },
}

#[derive(Debug, Clone)]
pub struct MaintenanceContext {
    pub customer: Customer,
    pub equipment: Equipment,
    pub current_date: NaiveDate,
    pub instructions: Vec<ActionInstruction>,
}

impl Context for MaintenanceContext {
    fn context_name(&self) -> &str {
        "MaintenanceContext"
    }
}

impl MaintenanceContext {
    pub fn create_work_order(&mut self, work_order_type: &str) {
        self.instructions.push(ActionInstruction::CreateWorkOrder {
            customer: self.customer.name.clone(),
            equipment: self.equipment.equipment_type.clone(),
            work_order_type: work_order_type.to_string(),
        });
    }

    pub fn send_customer_notification(&mut self, message_template: &str) {
        self.instructions
            .push(ActionInstruction::SendCustomerNotification {
                customer: self.customer.name.clone(),
                message_template: message_template.to_string(),
            });
    }

    pub fn is_service_overdue(&self, months: i32) -> bool {
        let cutoff = self
            .current_date
            .checked_sub_months(Months::new(months.max(0) as u32));
        matches!(cutoff, Some(cutoff) if self.equipment.last_service_date < cutoff)
    }

    pub fn is_in_pre_winter_season(&self) -> bool {
        (9..=10).contains(&self.current_date.month())
    }
}

pub struct MaintenanceContextExtensions;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn maintenance_context(
    equipment_type: &str,
    last_service: NaiveDate,
    today: NaiveDate,
) -> MaintenanceContext {
    MaintenanceContext {
        customer: Customer {
            name: "John Smith".to_string(),
            email: "john@example.com".to_string(),
        },
        equipment: Equipment {
            equipment_type: equipment_type.to_string(),
            install_date: date(2018, 1, 1),
            last_service_date: last_service,
        },
        current_date: today,
        instructions: Vec::new(),
    }
}

fn build_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register::<TestContext>(|ty| {
            ty.field("TestField1", |c| c.test_field1.clone());
            ty.object("Inner", |c| &c.inner, |c| &mut c.inner);
            ty.object("DateField", |c| &c.date_field, |c| &mut c.date_field);
            ty.field("OmittedProperty", |c| c.omitted_property.clone())
                .omit();
            ty.method("TestMethod1", |_, args| Ok(args.int(0)? > 10))
                .param(("someId", TypeRef::Int));
            ty.method("TestMethodWithArray", |_, args| {
                Ok(args.get::<Vec<i32>>(0)?.len() == 2)
            })
            .param(("values", TypeRef::array(TypeRef::Int)));
            ty.method("TestMagicValueMethod", |_, _| Ok("a42".to_string()));
            ty.method("TestMethodWithValueProvider", |_, args| {
                Ok(!args.str(0)?.is_empty())
            })
            .describe("A test method with a value provider.")
            .param(
                ParameterDescriptor::new("role", TypeRef::String)
                    .with_value_provider("/api/v1/roles"),
            );
        })
        .register::<InnerContext>(|ty| {
            ty.field("Value", |i| i.value);
            ty.method("IsPositive", |i, _| Ok(i.value > 0));
        })
        .register::<TestContextExtensions>(|ty| {
            ty.extension::<TestContext, _, _>("IsAdult", |ctx, args| {
                let threshold = args.int(0)?;
                Ok(ctx.test_field1 == "Adult" && threshold > 10)
            })
            .param(("ageThreshold", TypeRef::Int));
            ty.static_method("IsEven", |args| Ok(args.int(0)? % 2 == 0))
                .param(("value", TypeRef::Int));
        })
        .register::<TestMethodProvider>(|ty| {
            ty.method("InstanceMethod", |_, _| Ok(true));
            ty.static_method("StaticMethod", |_| Ok(true));
            ty.method("OverloadedMethod", |_, args| Ok(args.str(0)?.len() as i32))
                .param(("value", TypeRef::String));
            ty.method("OverloadedMethod", |_, args| Ok(args.int(0)?))
                .param(("value", TypeRef::Int));
            ty.method_mut("Touch", |p, _| {
                p.calls += 1;
                Ok(())
            });
        })
        .register::<DerivedTestMethodProvider>(|ty| {
            ty.inherits::<TestMethodProvider, _, _>(|d| &d.base, |d| &mut d.base);
        })
        .register::<TestExtensionMethods>(|ty| {
            ty.extension::<TestMethodProvider, _, _>("ExtensionMethod", |_, _| Ok(true));
            ty.extension::<TestMethodProvider, _, _>("ExtensionMethodWithArg", |_, args| {
                Ok(args.int(0)? > 0)
            })
            .param(("value", TypeRef::Int));
        })
        .register::<RecursiveContext>(|ty| {
            ty.optional_object("Parent", |c| c.parent.as_deref(), |c| c.parent.as_deref_mut());
            ty.field("Name", |c| c.name.clone());
        })
        .register::<CoRecursiveA>(|ty| {
            ty.object("B", |a| &a.b, |a| &mut a.b);
        })
        .register::<CoRecursiveB>(|ty| {
            ty.optional_object("A", |b| b.a.as_deref(), |b| b.a.as_deref_mut());
        })
        .register::<Customer>(|ty| {
            ty.field("Name", |c| c.name.clone());
            ty.field("Email", |c| c.email.clone());
        })
        .register::<Equipment>(|ty| {
            ty.field("EquipmentType", |e| e.equipment_type.clone());
            ty.object("InstallDate", |e| &e.install_date, |e| &mut e.install_date);
            ty.object(
                "LastServiceDate",
                |e| &e.last_service_date,
                |e| &mut e.last_service_date,
            );
        })
        .register::<MaintenanceContext>(|ty| {
            ty.object("Customer", |c| &c.customer, |c| &mut c.customer);
            ty.object("Equipment", |c| &c.equipment, |c| &mut c.equipment);
            ty.object("CurrentDate", |c| &c.current_date, |c| &mut c.current_date);
            ty.method_mut("CreateWorkOrder", |c, args| {
                c.create_work_order(args.str(0)?);
                Ok(())
            })
            .param(("workOrderType", TypeRef::String))
            .describe("Creates a new work order for the customer and equipment.");
            ty.method_mut("SendCustomerNotification", |c, args| {
                c.send_customer_notification(args.str(0)?);
                Ok(())
            })
            .param(("messageTemplate", TypeRef::String))
            .describe("Sends a notification to the customer.");
        })
        .register::<MaintenanceContextExtensions>(|ty| {
            ty.extension::<MaintenanceContext, _, _>("IsEquipmentType", |ctx, args| {
                Ok(ctx.equipment.equipment_type == args.str(0)?)
            })
            .param(("type", TypeRef::String))
            .describe("Checks the type of equipment.");
            ty.extension::<MaintenanceContext, _, _>("IsServiceOverdue", |ctx, args| {
                Ok(ctx.is_service_overdue(args.int(0)?))
            })
            .param(("months", TypeRef::Int))
            .describe("Checks if the last service was more than a specified number of months ago.");
            ty.extension::<MaintenanceContext, _, _>("IsInPreWinterSeason", |ctx, _| {
                Ok(ctx.is_in_pre_winter_season())
            })
            .describe("Checks if the current date is in the pre-winter season (Sept/Oct).");
        });
    registry
}

pub fn test_context_compiler() -> ExpressionCompiler {
    ExpressionCompiler::new(
        registry(),
        MethodResolutionOptions::with_extension_methods(
            ObjectType::of::<TestContext>(),
            ObjectType::of::<TestContextExtensions>(),
        ),
    )
}

pub fn maintenance_compiler() -> RuleCompiler {
    RuleCompiler::new(ExpressionCompiler::new(
        registry(),
        MethodResolutionOptions::with_extension_methods(
            ObjectType::of::<MaintenanceContext>(),
            ObjectType::of::<MaintenanceContextExtensions>(),
        ),
    ))
}
