//! Instance migration after a type is superseded.

use scriptbridge_core::{AccessError, NativeValue, ObjectHandle, TypeHash};
use tracing::debug;

use crate::bridge::Bridge;
use crate::error::BridgeResult;

/// Objects of `old` waiting to move to `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReinstance {
    pub old: TypeHash,
    pub new: TypeHash,
}

impl Bridge {
    /// Migrations queued by redefinitions and not yet processed.
    pub fn pending_reinstance(&self) -> &[PendingReinstance] {
        &self.generator.pending
    }

    /// Move every instance of a superseded type to its replacement.
    ///
    /// Returns the number of migrated objects.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn process_pending_reinstancing(&mut self) -> BridgeResult<usize> {
        let jobs = std::mem::take(&mut self.generator.pending);
        let mut migrated = 0;
        for job in jobs {
            let instances = self.heap.instances_of(job.old);
            for handle in &instances {
                self.migrate_object(*handle, job.old, job.new)?;
            }
            debug!(
                old = %self.reflection.type_name(job.old),
                new = %job.new,
                count = instances.len(),
                "reinstanced objects"
            );
            migrated += instances.len();
        }
        Ok(migrated)
    }

    /// Rebuild one object as a default instance of `new`, carrying over
    /// every field whose name and kind are unchanged.
    ///
    /// Cached wrappers of carried fields follow them to their new slots.
    fn migrate_object(&mut self, handle: ObjectHandle, old: TypeHash, new: TypeHash) -> BridgeResult<()> {
        let old_layout = self.reflection.layout(old);
        let new_layout = self.reflection.layout(new);
        let moved: Vec<Option<usize>> = old_layout
            .iter()
            .map(|p| {
                new_layout
                    .iter()
                    .position(|q| q.name == p.name && q.kind == p.kind && q.array_dim == p.array_dim)
            })
            .collect();
        let mut fresh = self.reflection.default_fields(new);
        let object = self.heap.get_mut(handle).ok_or(AccessError::StaleHandle {
            index: handle.index,
            generation: handle.generation,
        })?;

        if let (NativeValue::Struct(target), NativeValue::Struct(source)) = (&mut fresh, &object.value) {
            for (from, to) in moved.iter().enumerate() {
                if let Some(to) = to
                    && let (Some(slot), Some(value)) = (target.fields.get_mut(*to), source.fields.get(from))
                {
                    *slot = value.clone();
                }
            }
        }
        object.class = new;
        object.value = fresh;
        self.factories.rebase_object(handle, &moved);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeConfig;
    use crate::generator::{ClassDefinition, FieldDefinition};
    use crate::script::ScriptValue;
    use scriptbridge_core::PropertyKind;

    fn car(fields: &[(&str, PropertyKind)]) -> ClassDefinition {
        fields.iter().fold(ClassDefinition::new("Car"), |def, (name, kind)| {
            def.with_field(FieldDefinition::new(*name, kind.clone()))
        })
    }

    #[test]
    fn matching_fields_survive() {
        let mut bridge = Bridge::new(BridgeConfig::default().with_auto_reinstance(false));
        let first = bridge
            .define_class(car(&[("Speed", PropertyKind::I32), ("Color", PropertyKind::Str)]))
            .unwrap();
        let object = bridge.new_object(first).unwrap();
        bridge.set_attr(&object, "Speed", &ScriptValue::Int(42)).unwrap();
        bridge.set_attr(&object, "Color", &ScriptValue::from("red")).unwrap();

        let second = bridge
            .define_class(car(&[
                ("Color", PropertyKind::Name),
                ("Speed", PropertyKind::I32),
                ("Wheels", PropertyKind::U8),
            ]))
            .unwrap();
        assert_eq!(bridge.pending_reinstance(), &[PendingReinstance { old: first, new: second }]);
        assert_eq!(bridge.process_pending_reinstancing().unwrap(), 1);
        assert!(bridge.pending_reinstance().is_empty());

        assert_eq!(bridge.get_attr(&object, "Speed").unwrap(), ScriptValue::Int(42));
        assert_eq!(bridge.get_attr(&object, "Wheels").unwrap(), ScriptValue::Int(0));
        let color = bridge.get_attr(&object, "Color").unwrap();
        assert!(color.as_wrapper().and_then(|w| w.name_value()).is_some_and(|n| n.is_none()));
    }

    #[test]
    fn nothing_pending_is_a_noop() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        assert_eq!(bridge.process_pending_reinstancing().unwrap(), 0);
    }
}
