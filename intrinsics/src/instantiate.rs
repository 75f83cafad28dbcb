//! Instantiation of intrinsic modules into compartments.
//!
//! Instantiation is all-or-nothing: every export name is checked before any
//! object is created, and if creating an object fails anyway the compartment
//! is rolled back to the state it had on entry.

use std::collections::HashMap;

use keystone_runtime::{
    Compartment, FunctionInstance, MemoryRef, ModuleInstance, ModuleRef, Object, ObjectKind,
    RuntimeError, TableRef,
};

use crate::error::IntrinsicError;
use crate::module::{Entry, IntrinsicModule};

/// Instantiate `module` into `compartment` as a module instance named
/// `debug_name`, merging `extra_exports` into its export set.
///
/// Every call creates a fresh, independent set of objects, so a registry
/// may be instantiated into many compartments, or several times into one.
pub fn instantiate_module(
    compartment: &mut Compartment,
    module: &IntrinsicModule,
    debug_name: &str,
    extra_exports: &HashMap<String, Object>,
) -> Result<ModuleRef, IntrinsicError> {
    check_exports(compartment, module, extra_exports)?;

    let checkpoint = compartment.checkpoint();
    match populate(compartment, module, debug_name, extra_exports) {
        Ok(instance) => {
            log::debug!(
                "instantiated intrinsic module {} as {} in {} ({} exports, fingerprint {})",
                module.name(),
                debug_name,
                compartment.id(),
                module.len() + extra_exports.len(),
                module.fingerprint().to_hex(),
            );
            Ok(instance)
        }
        Err(err) => {
            compartment.rollback(checkpoint);
            log::debug!("instantiation of {} failed, rolled back: {}", debug_name, err);
            Err(err)
        }
    }
}

/// Reject export name collisions and unusable extra exports.
fn check_exports(
    compartment: &Compartment,
    module: &IntrinsicModule,
    extra_exports: &HashMap<String, Object>,
) -> Result<(), IntrinsicError> {
    let mut names: HashMap<&str, ObjectKind> = HashMap::with_capacity(module.len());
    let registered = module.entries().iter().map(|entry| match *entry {
        Entry::Function(i) => (module.functions()[i].name(), ObjectKind::Function),
        Entry::Global(i) => (module.globals()[i].name(), ObjectKind::Global),
        Entry::Memory(i) => (module.memories()[i].name(), ObjectKind::Memory),
        Entry::Table(i) => (module.tables()[i].name(), ObjectKind::Table),
    });
    let mut extras: Vec<(&String, &Object)> = extra_exports.iter().collect();
    extras.sort_by(|a, b| a.0.cmp(b.0));

    for (name, object) in &extras {
        if object.compartment() != compartment.id() {
            return Err(IntrinsicError::ForeignExport((*name).clone()));
        }
        if !compartment.contains(**object) {
            return Err(RuntimeError::StaleHandle(object.kind()).into());
        }
    }

    let extras = extras
        .into_iter()
        .map(|(name, object)| (name.as_str(), object.kind()));
    for (name, added) in registered.chain(extras) {
        if let Some(&existing) = names.get(name) {
            return Err(IntrinsicError::DuplicateExport {
                name: name.to_owned(),
                existing,
                added,
            });
        }
        names.insert(name, added);
    }
    Ok(())
}

/// Create every object of `module` inside `compartment`. Leaves partially
/// created objects behind on error; the caller rolls them back.
fn populate(
    compartment: &mut Compartment,
    module: &IntrinsicModule,
    debug_name: &str,
    extra_exports: &HashMap<String, Object>,
) -> Result<ModuleRef, IntrinsicError> {
    let mut exports = HashMap::with_capacity(module.len() + extra_exports.len());

    let mut default_memory: Option<MemoryRef> = None;
    for memory in module.memories() {
        let handle = compartment.create_memory(*memory.ty())?;
        default_memory.get_or_insert(handle);
        exports.insert(memory.name().to_owned(), Object::Memory(handle));
    }

    let mut default_table: Option<TableRef> = None;
    for table in module.tables() {
        let handle = compartment.create_table(*table.ty())?;
        default_table.get_or_insert(handle);
        exports.insert(table.name().to_owned(), Object::Table(handle));
    }

    // Without registered ones, the defaults come from the extra exports.
    let mut extras: Vec<(&String, &Object)> = extra_exports.iter().collect();
    extras.sort_by(|a, b| a.0.cmp(b.0));
    if default_memory.is_none() {
        default_memory = extras.iter().find_map(|(_, object)| object.as_memory());
    }
    if default_table.is_none() {
        default_table = extras.iter().find_map(|(_, object)| object.as_table());
    }

    for global in module.globals() {
        let handle = compartment.create_global(global.ty(), global.value())?;
        exports.insert(global.name().to_owned(), Object::Global(handle));
    }

    for function in module.functions() {
        let instance = FunctionInstance::new(
            format!("{}.{}", debug_name, function.name()),
            function.signature().clone(),
            function.native().clone(),
            default_memory,
            default_table,
        );
        let handle = compartment.create_function(instance);
        exports.insert(function.name().to_owned(), Object::Function(handle));
    }

    for (name, object) in extras {
        exports.insert(name.clone(), *object);
    }

    Ok(compartment.add_module_instance(ModuleInstance::new(
        debug_name,
        exports,
        default_memory,
        default_table,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_primitives::{
        FeatureSpec, GlobalType, MemoryType, ReferenceType, TableType, Value, ValueType,
    };
    use keystone_runtime::{Caller, CompartmentConfig};

    fn nop(_: &mut Caller<'_>) {}

    #[test]
    fn test_exports_and_defaults() {
        let mut module = IntrinsicModule::new("env");
        module
            .function("nop", nop)
            .unwrap()
            .memory("mem0", MemoryType::new(1, None))
            .unwrap()
            .memory("mem1", MemoryType::new(0, None))
            .unwrap()
            .global("g", 7i32)
            .unwrap();

        let mut c = Compartment::default();
        let instance = instantiate_module(&mut c, &module, "env", &HashMap::new()).unwrap();
        let instance = c.module(instance).unwrap();
        assert_eq!(instance.export_count(), 4);
        assert_eq!(instance.default_memory(), instance.memory("mem0"));
        assert_eq!(instance.default_table(), None);

        let nop = c.function(instance.function("nop").unwrap()).unwrap();
        assert_eq!(nop.debug_name(), "env.nop");
        assert_eq!(nop.default_memory(), instance.memory("mem0"));

        let g = c.global(instance.global("g").unwrap()).unwrap();
        assert_eq!(g.ty(), &GlobalType::immutable(ValueType::I32));
        assert_eq!(g.get(), Value::I32(7));
    }

    #[test]
    fn test_cross_kind_collision_is_duplicate_export() {
        let mut module = IntrinsicModule::new("env");
        module.function("x", nop).unwrap();
        module.global("x", 1i32).unwrap();

        let mut c = Compartment::default();
        let before = c.checkpoint();
        let err = instantiate_module(&mut c, &module, "env", &HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            IntrinsicError::DuplicateExport {
                name: "x".into(),
                existing: ObjectKind::Function,
                added: ObjectKind::Global,
            }
        );
        assert_eq!(c.checkpoint(), before);
    }

    #[test]
    fn test_extra_export_collision() {
        let mut module = IntrinsicModule::new("env");
        module.function("memory", nop).unwrap();

        let mut c = Compartment::default();
        let memory = c.create_memory(MemoryType::new(1, None)).unwrap();
        let before = c.checkpoint();
        let extra = HashMap::from([("memory".to_owned(), Object::Memory(memory))]);
        let err = instantiate_module(&mut c, &module, "env", &extra).unwrap_err();
        assert!(matches!(err, IntrinsicError::DuplicateExport { ref name, .. } if name == "memory"));
        assert_eq!(c.checkpoint(), before);
    }

    #[test]
    fn test_extra_exports_supply_defaults() {
        let mut module = IntrinsicModule::new("env");
        module.function("nop", nop).unwrap();

        let mut c = Compartment::default();
        let a = c.create_memory(MemoryType::new(1, None)).unwrap();
        let b = c.create_memory(MemoryType::new(1, None)).unwrap();
        let table = c
            .create_table(TableType::new(ReferenceType::FuncRef, 1, None))
            .unwrap();
        let extra = HashMap::from([
            ("z_memory".to_owned(), Object::Memory(a)),
            ("a_memory".to_owned(), Object::Memory(b)),
            ("table".to_owned(), Object::Table(table)),
        ]);
        let instance = instantiate_module(&mut c, &module, "env", &extra).unwrap();
        let instance = c.module(instance).unwrap();
        assert_eq!(instance.default_memory(), Some(b));
        assert_eq!(instance.default_table(), Some(table));
        assert_eq!(instance.memory("z_memory"), Some(a));
    }

    #[test]
    fn test_foreign_extra_export_rejected() {
        let module = IntrinsicModule::new("env");
        let mut other = Compartment::default();
        let memory = other.create_memory(MemoryType::new(1, None)).unwrap();

        let mut c = Compartment::default();
        let extra = HashMap::from([("memory".to_owned(), Object::Memory(memory))]);
        assert_eq!(
            instantiate_module(&mut c, &module, "env", &extra).unwrap_err(),
            IntrinsicError::ForeignExport("memory".into())
        );
    }

    #[test]
    fn test_failure_after_partial_creation_rolls_back() {
        let mut module = IntrinsicModule::new("env");
        module
            .function("nop", nop)
            .unwrap()
            .memory("ok", MemoryType::new(1, None))
            .unwrap();
        let mut shared = MemoryType::new(1, Some(1));
        shared.shared = true;
        module.memory("shared", shared).unwrap();

        // Atomics are off by default, so the second memory is rejected.
        let mut c = Compartment::default();
        let before = c.checkpoint();
        let err = instantiate_module(&mut c, &module, "env", &HashMap::new()).unwrap_err();
        assert!(matches!(err, IntrinsicError::Runtime(RuntimeError::InvalidType(_))));
        assert_eq!(c.checkpoint(), before);
        assert_eq!(c.module_by_name("env"), None);

        let mut c = Compartment::new(CompartmentConfig {
            features: FeatureSpec::all(),
            ..CompartmentConfig::default()
        });
        assert!(instantiate_module(&mut c, &module, "env", &HashMap::new()).is_ok());
    }

    #[test]
    fn test_oversized_table_fails_without_side_effects() {
        let mut module = IntrinsicModule::new("env");
        module
            .memory("memory", MemoryType::new(1, None))
            .unwrap()
            .table(
                "table",
                TableType::new(ReferenceType::FuncRef, u32::MAX as u64, None),
            )
            .unwrap();

        let mut c = Compartment::default();
        let before = c.checkpoint();
        let err = instantiate_module(&mut c, &module, "env", &HashMap::new()).unwrap_err();
        assert!(matches!(
            err,
            IntrinsicError::Runtime(RuntimeError::ResourceLimit { .. })
        ));
        assert_eq!(c.checkpoint(), before);
        assert_eq!(c.module_by_name("env"), None);
    }

    #[test]
    fn test_reinstantiation_is_independent() {
        let mut module = IntrinsicModule::new("env");
        module.memory("memory", MemoryType::new(1, None)).unwrap();

        let mut c = Compartment::default();
        let first = instantiate_module(&mut c, &module, "first", &HashMap::new()).unwrap();
        let second = instantiate_module(&mut c, &module, "second", &HashMap::new()).unwrap();
        let m1 = module.memory_instance(&c, first, "memory").unwrap().unwrap();
        let m2 = module.memory_instance(&c, second, "memory").unwrap().unwrap();
        assert_ne!(m1, m2);

        c.memory_mut(m1).unwrap().store_u8(0, 1).unwrap();
        assert_eq!(c.memory(m2).unwrap().load_u8(0).unwrap(), 0);
    }
}
