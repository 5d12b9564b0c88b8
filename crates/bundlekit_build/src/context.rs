//! Shared state threaded through the build pipeline.
//!
//! A [`BuildContext`] holds at most one value per [`ContextKind`]. Tasks
//! publish their results with [`BuildContext::set`] and read what earlier
//! tasks published with [`BuildContext::get`]. Setting a kind twice or reading
//! a kind nobody published is a pipeline ordering bug and returns an error.

use crate::error::{Error, Result};
use crate::progress::{BuildProgress, ProgressCallback};
use std::any::{type_name, Any};
use std::collections::BTreeMap;

/// Tag identifying one slot of the build context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextKind {
    Parameters,
    BuildMap,
    Packager,
    Manifest,
    Report,
    Package,
}

/// A value that can be stored in the build context.
///
/// Each implementing type owns exactly one [`ContextKind`]; two types must not
/// share a kind.
pub trait ContextObject: Any {
    const KIND: ContextKind;
}

/// Type-tagged, write-once registry for one build invocation.
#[derive(Default)]
pub struct BuildContext {
    objects: BTreeMap<ContextKind, Box<dyn Any>>,
    progress_callback: Option<ProgressCallback>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context forwarding progress events to `callback`.
    pub fn with_progress(callback: ProgressCallback) -> Self {
        Self {
            objects: BTreeMap::new(),
            progress_callback: Some(callback),
        }
    }

    /// Publish a value. Fails if a value of the same kind was already published.
    pub fn set<T: ContextObject>(&mut self, value: T) -> Result<()> {
        if self.objects.contains_key(&T::KIND) {
            return Err(Error::ContextAlreadySet(type_name::<T>()));
        }
        self.objects.insert(T::KIND, Box::new(value));
        Ok(())
    }

    pub fn get<T: ContextObject>(&self) -> Result<&T> {
        self.objects
            .get(&T::KIND)
            .and_then(|value| value.downcast_ref::<T>())
            .ok_or(Error::ContextMissing(type_name::<T>()))
    }

    pub fn get_mut<T: ContextObject>(&mut self) -> Result<&mut T> {
        self.objects
            .get_mut(&T::KIND)
            .and_then(|value| value.downcast_mut::<T>())
            .ok_or(Error::ContextMissing(type_name::<T>()))
    }

    pub fn contains<T: ContextObject>(&self) -> bool {
        self.objects
            .get(&T::KIND)
            .is_some_and(|value| value.is::<T>())
    }

    /// Drop every published value. The progress callback is kept.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Forward a progress event to the registered callback, if any.
    pub fn emit_progress(&self, progress: BuildProgress) {
        if let Some(callback) = &self.progress_callback {
            callback(progress);
        }
    }

    pub fn progress_callback(&self) -> Option<ProgressCallback> {
        self.progress_callback.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Counter(u32);

    impl ContextObject for Counter {
        const KIND: ContextKind = ContextKind::Report;
    }

    #[derive(Debug)]
    struct Other;

    impl ContextObject for Other {
        const KIND: ContextKind = ContextKind::Package;
    }

    #[test]
    fn test_set_once() {
        let mut ctx = BuildContext::new();
        ctx.set(Counter(1)).unwrap();

        assert!(matches!(
            ctx.set(Counter(2)),
            Err(Error::ContextAlreadySet(_))
        ));
        assert_eq!(ctx.get::<Counter>().unwrap(), &Counter(1));
    }

    #[test]
    fn test_missing() {
        let ctx = BuildContext::new();
        assert!(matches!(
            ctx.get::<Other>(),
            Err(Error::ContextMissing(name)) if name.ends_with("Other")
        ));
        assert!(!ctx.contains::<Other>());
    }

    #[test]
    fn test_get_mut_and_clear() {
        let mut ctx = BuildContext::new();
        ctx.set(Counter(1)).unwrap();
        ctx.get_mut::<Counter>().unwrap().0 += 1;
        assert_eq!(ctx.get::<Counter>().unwrap().0, 2);
        assert_eq!(ctx.len(), 1);

        ctx.clear();
        assert!(ctx.is_empty());
        ctx.set(Counter(5)).unwrap();
        assert_eq!(ctx.get::<Counter>().unwrap().0, 5);
    }
}
