//! Table instances holding function references.

use keystone_primitives::TableType;

use crate::compartment::CompartmentId;
use crate::error::RuntimeError;
use crate::instance::{FunctionRef, ObjectKind};

/// A table of optional function references owned by one compartment.
#[derive(Debug, Clone)]
pub struct TableInstance {
    ty: TableType,
    compartment: CompartmentId,
    max_elems: u64,
    elements: Vec<Option<FunctionRef>>,
}

impl TableInstance {
    /// Allocate `ty.size.min` empty elements. Fails instead of aborting if
    /// the host cannot provide the storage.
    pub(crate) fn new(
        ty: TableType,
        compartment: CompartmentId,
        limit_elems: u64,
    ) -> Result<Self, RuntimeError> {
        let out_of_memory = || RuntimeError::OutOfMemory {
            what: "table",
            bytes: ty
                .size
                .min
                .saturating_mul(std::mem::size_of::<Option<FunctionRef>>() as u64),
        };
        let len = usize::try_from(ty.size.min).map_err(|_| out_of_memory())?;
        let mut elements = Vec::new();
        elements.try_reserve_exact(len).map_err(|_| out_of_memory())?;
        elements.resize(len, None);
        Ok(Self {
            ty,
            compartment,
            max_elems: ty.size.effective_max(limit_elems).min(limit_elems),
            elements,
        })
    }

    pub fn ty(&self) -> &TableType {
        &self.ty
    }

    pub fn size(&self) -> u64 {
        self.elements.len() as u64
    }

    pub fn get(&self, index: u64) -> Result<Option<FunctionRef>, RuntimeError> {
        self.elements
            .get(index as usize)
            .copied()
            .ok_or_else(|| RuntimeError::TableIndexOutOfBounds {
                index,
                size: self.size(),
            })
    }

    /// Store `element` at `index`. The function must live in the table's
    /// own compartment.
    pub fn set(&mut self, index: u64, element: Option<FunctionRef>) -> Result<(), RuntimeError> {
        if let Some(function) = element {
            if function.compartment() != self.compartment {
                return Err(RuntimeError::ForeignObject(ObjectKind::Function));
            }
        }
        let size = self.size();
        let slot = self
            .elements
            .get_mut(index as usize)
            .ok_or_else(|| RuntimeError::TableIndexOutOfBounds { index, size })?;
        *slot = element;
        Ok(())
    }

    /// Grow by `delta` empty elements. Returns the previous size, or `None`
    /// if the maximum would be exceeded.
    pub fn grow(&mut self, delta: u64) -> Option<u64> {
        let previous = self.size();
        let new_size = previous.checked_add(delta)?;
        if new_size > self.max_elems {
            return None;
        }
        let len = usize::try_from(new_size).ok()?;
        self.elements.try_reserve_exact(len - self.elements.len()).ok()?;
        self.elements.resize(len, None);
        Some(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_primitives::ReferenceType;

    fn table(compartment: CompartmentId) -> TableInstance {
        TableInstance::new(
            TableType::new(ReferenceType::FuncRef, 2, Some(3)),
            compartment,
            u32::MAX as u64,
        )
        .unwrap()
    }

    #[test]
    fn test_get_set() {
        let id = CompartmentId::next();
        let mut t = table(id);
        let f = FunctionRef::new(id, 0, 0);
        assert_eq!(t.get(1).unwrap(), None);
        t.set(1, Some(f)).unwrap();
        assert_eq!(t.get(1).unwrap(), Some(f));
    }

    #[test]
    fn test_out_of_bounds() {
        let id = CompartmentId::next();
        let mut t = table(id);
        assert_eq!(
            t.get(2),
            Err(RuntimeError::TableIndexOutOfBounds { index: 2, size: 2 })
        );
        assert!(t.set(5, None).is_err());
    }

    #[test]
    fn test_rejects_foreign_function() {
        let mut t = table(CompartmentId::next());
        let foreign = FunctionRef::new(CompartmentId::next(), 0, 0);
        assert_eq!(
            t.set(0, Some(foreign)),
            Err(RuntimeError::ForeignObject(ObjectKind::Function))
        );
    }

    #[test]
    fn test_grow() {
        let mut t = table(CompartmentId::next());
        assert_eq!(t.grow(1), Some(2));
        assert_eq!(t.grow(1), None);
        assert_eq!(t.size(), 3);
    }
}
