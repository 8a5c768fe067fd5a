/*
 * Identity & subclass registry: the reverse lookup from native handle to the
 * owning object, plus the parent-reflection relation. The registry is plain
 * data. It owns nothing (entries hold `Weak` references) and never calls the
 * windowing system; the dispatcher translates `Installed::first_on_handle` /
 * `Removed::last_on_handle` into native attach/detach calls.
 */
use crate::error::{PlatformError, Result as PlatformResult};
use crate::types::NativeHandle;
use crate::window_common::Window;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Identifies exactly one interception so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubclassId(usize);

impl SubclassId {
    pub fn raw(self) -> usize {
        self.0
    }

    pub fn from_raw(raw: usize) -> Self {
        SubclassId(raw)
    }
}

// Process-wide and never reset, so ids are never reused.
static NEXT_SUBCLASS_ID: AtomicUsize = AtomicUsize::new(1);

pub fn next_subclass_id() -> SubclassId {
    SubclassId(NEXT_SUBCLASS_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptionKind {
    // messages sent to the object's own handle
    Direct,
    // messages sent to the parent handle that concern the object
    Reflect,
}

struct Entry {
    handle: NativeHandle,
    kind: InterceptionKind,
    object: Weak<dyn Window>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Installed {
    pub id: SubclassId,
    // No other interception existed on the handle before this one.
    pub first_on_handle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removed {
    pub handle: NativeHandle,
    pub kind: InterceptionKind,
    // The handle has no interception left after this removal.
    pub last_on_handle: bool,
}

#[derive(Default)]
pub struct Registry {
    // Ordered by id, which is also installation order.
    entries: BTreeMap<SubclassId, Entry>,
    direct: HashMap<NativeHandle, SubclassId>,
    // parent -> reflecting interceptions, in installation order
    reflect: HashMap<NativeHandle, BTreeSet<SubclassId>>,
    per_handle: HashMap<NativeHandle, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /*
     * Records that messages for `handle` are dispatched to `object`. A handle
     * that already has a direct interception keeps it; the attempt is rejected
     * with `AlreadyIntercepted` and the table is left untouched.
     */
    pub fn install(
        &mut self,
        object: &Rc<dyn Window>,
        handle: NativeHandle,
    ) -> PlatformResult<Installed> {
        if let Some(&existing) = self.direct.get(&handle) {
            log::warn!(
                "Registry: {handle:?} already intercepted by {existing:?}, install ignored"
            );
            return Err(PlatformError::AlreadyIntercepted { handle, existing });
        }
        let installed = self.insert(object, handle, InterceptionKind::Direct);
        self.direct.insert(handle, installed.id);
        Ok(installed)
    }

    /*
     * Records that `object` wants reflected messages arriving at `parent`.
     * Several objects may reflect from the same parent; the same object twice
     * on the same parent is rejected like a duplicate direct install.
     */
    pub fn install_on_parent(
        &mut self,
        object: &Rc<dyn Window>,
        parent: NativeHandle,
    ) -> PlatformResult<Installed> {
        let weak = Rc::downgrade(object);
        let duplicate = self.reflect.get(&parent).and_then(|ids| {
            ids.iter()
                .copied()
                .find(|id| self.entries.get(id).is_some_and(|e| e.object.ptr_eq(&weak)))
        });
        if let Some(existing) = duplicate {
            log::warn!(
                "Registry: object already reflects from {parent:?} as {existing:?}, install ignored"
            );
            return Err(PlatformError::AlreadyIntercepted {
                handle: parent,
                existing,
            });
        }
        let installed = self.insert(object, parent, InterceptionKind::Reflect);
        self.reflect.entry(parent).or_default().insert(installed.id);
        Ok(installed)
    }

    fn insert(
        &mut self,
        object: &Rc<dyn Window>,
        handle: NativeHandle,
        kind: InterceptionKind,
    ) -> Installed {
        let id = next_subclass_id();
        let count = self.per_handle.entry(handle).or_insert(0);
        *count += 1;
        let first_on_handle = *count == 1;
        self.entries.insert(
            id,
            Entry {
                handle,
                kind,
                object: Rc::downgrade(object),
            },
        );
        log::debug!("Registry: installed {id:?} ({kind:?}) on {handle:?}");
        Installed {
            id,
            first_on_handle,
        }
    }

    /// Removes exactly this interception. Unknown or already removed ids are a no-op.
    pub fn remove(&mut self, id: SubclassId) -> Option<Removed> {
        let Some(entry) = self.entries.remove(&id) else {
            log::trace!("Registry: remove of unknown {id:?} ignored");
            return None;
        };
        match entry.kind {
            InterceptionKind::Direct => {
                self.direct.remove(&entry.handle);
            }
            InterceptionKind::Reflect => {
                if let Some(ids) = self.reflect.get_mut(&entry.handle) {
                    ids.remove(&id);
                    if ids.is_empty() {
                        self.reflect.remove(&entry.handle);
                    }
                }
            }
        }
        let last_on_handle = match self.per_handle.get_mut(&entry.handle) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            _ => {
                self.per_handle.remove(&entry.handle);
                true
            }
        };
        log::debug!("Registry: removed {id:?} from {:?}", entry.handle);
        Some(Removed {
            handle: entry.handle,
            kind: entry.kind,
            last_on_handle,
        })
    }

    /// The object receiving direct dispatch for `handle`, if it is still alive.
    pub fn resolve(&self, handle: NativeHandle) -> Option<Rc<dyn Window>> {
        let id = self.direct.get(&handle)?;
        let object = self.entries.get(id)?.object.upgrade();
        if object.is_none() {
            log::trace!("Registry: object for {handle:?} already dropped");
        }
        object
    }

    /// Live objects reflecting from `parent`, in installation order.
    pub fn reflection_targets(&self, parent: NativeHandle) -> Vec<Rc<dyn Window>> {
        let Some(ids) = self.reflect.get(&parent) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.entries.get(id))
            .filter_map(|e| e.object.upgrade())
            .collect()
    }

    pub fn is_intercepted(&self, handle: NativeHandle) -> bool {
        self.per_handle.contains_key(&handle)
    }

    /// Drops every entry still referring to `handle` (a destroyed window).
    pub fn purge_handle(&mut self, handle: NativeHandle) -> Vec<(SubclassId, Removed)> {
        let mut ids: Vec<SubclassId> = self.direct.get(&handle).copied().into_iter().collect();
        if let Some(reflecting) = self.reflect.get(&handle) {
            ids.extend(reflecting.iter().copied());
        }
        ids.into_iter()
            .filter_map(|id| self.remove(id).map(|removed| (id, removed)))
            .collect()
    }

    /// Empties the table and returns the handles that still had interceptions.
    pub fn clear(&mut self) -> Vec<NativeHandle> {
        let handles = self.per_handle.keys().copied().collect();
        self.entries.clear();
        self.direct.clear();
        self.reflect.clear();
        self.per_handle.clear();
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::Control;
    use crate::types::WindowConfig;

    fn object() -> Rc<dyn Window> {
        Control::new(WindowConfig::new("STATIC").with_parent(NativeHandle(1)))
    }

    #[test]
    fn sequential_installs_produce_distinct_ids_despite_removals() {
        // Arrange
        let mut registry = Registry::new();
        let objects: Vec<_> = (0..5).map(|_| object()).collect();
        let mut ids = Vec::new();
        // Act
        for (i, obj) in objects.iter().enumerate() {
            let installed = registry.install(obj, NativeHandle(100 + i as isize)).unwrap();
            ids.push(installed.id);
            if i % 2 == 0 {
                registry.remove(installed.id);
            }
        }
        // Assert
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn double_remove_is_a_no_op_and_leaves_other_ids() {
        let mut registry = Registry::new();
        let a = object();
        let b = object();
        let id_a = registry.install(&a, NativeHandle(10)).unwrap().id;
        let id_b = registry.install(&b, NativeHandle(11)).unwrap().id;

        assert!(registry.remove(id_a).is_some());
        assert!(registry.remove(id_a).is_none());

        assert_eq!(registry.len(), 1);
        assert!(registry.resolve(NativeHandle(11)).is_some());
        assert!(registry.remove(id_b).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_install_keeps_existing_binding() {
        // Arrange
        let mut registry = Registry::new();
        let first = object();
        let second = object();
        let id = registry.install(&first, NativeHandle(20)).unwrap().id;
        // Act
        let err = registry.install(&second, NativeHandle(20)).unwrap_err();
        // Assert
        assert!(matches!(
            err,
            PlatformError::AlreadyIntercepted { existing, .. } if existing == id
        ));
        let resolved = registry.resolve(NativeHandle(20)).unwrap();
        assert!(Rc::ptr_eq(&resolved, &first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn removed_object_is_never_resolved() {
        let mut registry = Registry::new();
        let obj = object();
        let id = registry.install(&obj, NativeHandle(30)).unwrap().id;

        registry.remove(id);

        assert!(registry.resolve(NativeHandle(30)).is_none());
        assert!(!registry.is_intercepted(NativeHandle(30)));
    }

    #[test]
    fn registry_holds_no_ownership() {
        let mut registry = Registry::new();
        let obj = object();
        registry.install(&obj, NativeHandle(40)).unwrap();

        drop(obj);

        assert!(registry.resolve(NativeHandle(40)).is_none());
    }

    #[test]
    fn reflection_targets_keep_installation_order() {
        // Arrange
        let mut registry = Registry::new();
        let parent = NativeHandle(50);
        let first = object();
        let second = object();
        let a = registry.install_on_parent(&first, parent).unwrap();
        let b = registry.install_on_parent(&second, parent).unwrap();
        // Act
        let targets = registry.reflection_targets(parent);
        // Assert
        assert!(a.first_on_handle);
        assert!(!b.first_on_handle);
        assert_eq!(targets.len(), 2);
        assert!(Rc::ptr_eq(&targets[0], &first));
        assert!(Rc::ptr_eq(&targets[1], &second));
        assert!(registry.install_on_parent(&first, parent).is_err());
    }

    #[test]
    fn reflection_targets_are_scoped_to_their_parent() {
        let mut registry = Registry::new();
        let first = object();
        let second = object();
        let removed = registry.install_on_parent(&first, NativeHandle(80)).unwrap();
        registry.install_on_parent(&second, NativeHandle(81)).unwrap();

        registry.remove(removed.id);

        assert!(registry.reflection_targets(NativeHandle(80)).is_empty());
        let others = registry.reflection_targets(NativeHandle(81));
        assert_eq!(others.len(), 1);
        assert!(Rc::ptr_eq(&others[0], &second));
        // The freed slot accepts the same object again.
        assert!(registry.install_on_parent(&first, NativeHandle(80)).is_ok());
    }

    #[test]
    fn handle_refcount_reports_last_removal() {
        let mut registry = Registry::new();
        let parent = NativeHandle(60);
        let owner = object();
        let child = object();
        let direct = registry.install(&owner, parent).unwrap();
        let reflect = registry.install_on_parent(&child, parent).unwrap();

        assert!(direct.first_on_handle);
        assert!(!reflect.first_on_handle);
        assert!(!registry.remove(direct.id).unwrap().last_on_handle);
        assert!(registry.remove(reflect.id).unwrap().last_on_handle);
    }

    #[test]
    fn purge_handle_drops_all_entries_for_handle() {
        let mut registry = Registry::new();
        let handle = NativeHandle(70);
        let owner = object();
        let child = object();
        registry.install(&owner, handle).unwrap();
        registry.install_on_parent(&child, handle).unwrap();
        registry.install(&child, NativeHandle(71)).unwrap();

        let purged = registry.purge_handle(handle);

        assert_eq!(purged.len(), 2);
        assert!(purged.last().unwrap().1.last_on_handle);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.clear(), vec![NativeHandle(71)]);
        assert!(registry.is_empty());
    }
}
