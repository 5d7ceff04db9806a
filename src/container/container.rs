use std::any::type_name;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;

use crate::container::constructor::{self, Injectable, Upcast};
use crate::container::settings::ContainerSettings;
use crate::container::types::{
    ContainerError, ContainerResult, Dispose, Instance, Lifecycle, ServiceId,
};

type Factory = Rc<dyn Fn(&Container) -> ContainerResult<Instance>>;

#[derive(Clone)]
struct Registration {
    factory: Factory,
    lifecycle: Lifecycle,
}

/// Registry of services and the instances produced for them.
///
/// The container is meant for a single owner: it is neither `Send` nor `Sync`,
/// and every method takes `&self` so factories can resolve their own
/// dependencies from the container they are handed.
pub struct Container {
    settings: ContainerSettings,
    registrations: RefCell<IndexMap<ServiceId, Registration>>,
    named_registrations: RefCell<HashMap<(ServiceId, String), Factory>>,
    scoped_instances: RefCell<HashMap<ServiceId, Instance>>,
    resolution_stack: RefCell<Vec<ServiceId>>,
    disposables: RefCell<Vec<Arc<dyn Dispose>>>,
}

impl Container {
    pub fn new() -> Self {
        Self::with_settings(ContainerSettings::default())
    }

    pub fn with_settings(settings: ContainerSettings) -> Self {
        Self {
            settings,
            registrations: RefCell::new(IndexMap::new()),
            named_registrations: RefCell::new(HashMap::new()),
            scoped_instances: RefCell::new(HashMap::new()),
            resolution_stack: RefCell::new(Vec::new()),
            disposables: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        self.settings.resolved_name()
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    /// Registers `I` as the implementation of `S`, built through its richest constructor.
    ///
    /// Nothing about `I` is checked here; a missing dependency or a constructor
    /// problem shows up when `S` is resolved. With a `name`, the lifecycle is
    /// ignored and every resolution produces a fresh instance.
    pub fn register_type<S, I>(&self, lifecycle: Lifecycle, name: Option<&str>)
    where
        S: ?Sized + 'static,
        I: Injectable + Upcast<S>,
    {
        let factory: Factory = Rc::new(|container: &Container| {
            constructor::construct_instance::<S, I>(container)
        });
        self.insert(ServiceId::of::<S>(), type_name::<I>(), factory, lifecycle, name);
    }

    pub fn register_transient<S, I>(&self)
    where
        S: ?Sized + 'static,
        I: Injectable + Upcast<S>,
    {
        self.register_type::<S, I>(Lifecycle::Transient, None);
    }

    pub fn register_scoped<S, I>(&self)
    where
        S: ?Sized + 'static,
        I: Injectable + Upcast<S>,
    {
        self.register_type::<S, I>(Lifecycle::Scoped, None);
    }

    /// Like [`register_type`](Self::register_type), for implementations that
    /// expose a release capability. Transient instances built this way are
    /// released by [`dispose`](Self::dispose).
    pub fn register_disposable_type<S, I>(&self, lifecycle: Lifecycle, name: Option<&str>)
    where
        S: ?Sized + 'static,
        I: Injectable + Dispose + Upcast<S>,
    {
        let factory: Factory = Rc::new(|container: &Container| {
            constructor::construct::<I>(container).map(Instance::disposable::<S, I>)
        });
        self.insert(ServiceId::of::<S>(), type_name::<I>(), factory, lifecycle, name);
    }

    /// Registers a caller supplied factory for `S`.
    pub fn register_factory<S, F>(&self, factory: F, lifecycle: Lifecycle, name: Option<&str>)
    where
        S: ?Sized + 'static,
        F: Fn(&Container) -> ContainerResult<Arc<S>> + 'static,
    {
        let factory: Factory =
            Rc::new(move |container: &Container| factory(container).map(Instance::new::<S>));
        self.insert(ServiceId::of::<S>(), type_name::<S>(), factory, lifecycle, name);
    }

    /// Like [`register_factory`](Self::register_factory), for values that expose a
    /// release capability. Transient instances produced this way are released by
    /// [`dispose`](Self::dispose).
    pub fn register_disposable_factory<S, I, F>(
        &self,
        factory: F,
        lifecycle: Lifecycle,
        name: Option<&str>,
    ) where
        S: ?Sized + 'static,
        I: Dispose + Upcast<S>,
        F: Fn(&Container) -> ContainerResult<I> + 'static,
    {
        let factory: Factory = Rc::new(move |container: &Container| {
            factory(container).map(|value| Instance::disposable::<S, I>(Arc::new(value)))
        });
        self.insert(ServiceId::of::<S>(), type_name::<I>(), factory, lifecycle, name);
    }

    /// Builds one `I` right away through `Default` and serves it as the singleton
    /// for `S`. No dependencies are injected.
    pub fn register_singleton<S, I>(&self)
    where
        S: ?Sized + 'static,
        I: Default + Upcast<S>,
    {
        let value = <I as Upcast<S>>::upcast(Arc::new(I::default()));
        let instance = Instance::from_parts::<S>(value, type_name::<I>(), None);
        let factory: Factory = Rc::new(move |_: &Container| Ok(instance.clone()));
        self.insert(
            ServiceId::of::<S>(),
            type_name::<I>(),
            factory,
            Lifecycle::Singleton,
            None,
        );
    }

    /// Registers `I` as the singleton for `S`, built on first resolution through
    /// its richest constructor and kept for the life of the container.
    pub fn register_lazy<S, I>(&self)
    where
        S: ?Sized + 'static,
        I: Injectable + Upcast<S>,
    {
        self.register_type::<S, I>(Lifecycle::Singleton, None);
    }

    fn insert(
        &self,
        service: ServiceId,
        implementation: &'static str,
        factory: Factory,
        lifecycle: Lifecycle,
        name: Option<&str>,
    ) {
        match name {
            Some(name) => {
                log::debug!(
                    "container {}: registered {service} ({name}) -> {implementation}",
                    self.name()
                );
                self.named_registrations
                    .borrow_mut()
                    .insert((service, name.to_owned()), factory);
            }
            None => {
                log::debug!(
                    "container {}: registered {service} -> {implementation} ({lifecycle:?})",
                    self.name()
                );
                let factory = match lifecycle {
                    Lifecycle::Singleton => memoize(factory),
                    Lifecycle::Transient | Lifecycle::Scoped => factory,
                };
                self.registrations
                    .borrow_mut()
                    .insert(service, Registration { factory, lifecycle });
                self.scoped_instances.borrow_mut().remove(&service);
            }
        }
    }

    pub fn is_registered<S: ?Sized + 'static>(&self, name: Option<&str>) -> bool {
        let service = ServiceId::of::<S>();
        match name {
            Some(name) => self
                .named_registrations
                .borrow()
                .contains_key(&(service, name.to_owned())),
            None => self.registrations.borrow().contains_key(&service),
        }
    }

    /// Unnamed registrations, in the order they were first registered.
    pub fn registered_services(&self) -> Vec<ServiceId> {
        self.registrations.borrow().keys().copied().collect()
    }

    pub fn resolve<S: ?Sized + 'static>(&self, name: Option<&str>) -> ContainerResult<Arc<S>> {
        self.resolve_id(ServiceId::of::<S>(), name)?.downcast::<S>()
    }

    /// Untyped resolution.
    ///
    /// Lookup failures for `service` itself come back as `NotRegistered` or
    /// `CyclicDependency`. Anything that goes wrong inside the factory,
    /// including failures of nested dependencies, is wrapped in
    /// `ResolutionFailed` naming `service`.
    pub fn resolve_id(&self, service: ServiceId, name: Option<&str>) -> ContainerResult<Instance> {
        let _guard = ResolutionGuard::enter(&self.resolution_stack, service)?;
        log::trace!("container {}: resolving {service}", self.name());

        if let Some(name) = name {
            let factory = self
                .named_registrations
                .borrow()
                .get(&(service, name.to_owned()))
                .cloned();
            let factory = factory.ok_or_else(|| ContainerError::NotRegistered {
                service,
                name: Some(name.to_owned()),
            })?;
            return self.invoke(service, &factory);
        }

        let registration = self.registrations.borrow().get(&service).cloned();
        let registration =
            registration.ok_or(ContainerError::NotRegistered { service, name: None })?;

        match registration.lifecycle {
            Lifecycle::Singleton => self.invoke(service, &registration.factory),
            Lifecycle::Scoped => {
                let cached = self.scoped_instances.borrow().get(&service).cloned();
                if let Some(instance) = cached {
                    return Ok(instance);
                }
                let instance = self.invoke(service, &registration.factory)?;
                self.scoped_instances
                    .borrow_mut()
                    .insert(service, instance.clone());
                Ok(instance)
            }
            Lifecycle::Transient => {
                let instance = self.invoke(service, &registration.factory)?;
                if let Some(disposer) = instance.disposer() {
                    self.disposables.borrow_mut().push(Arc::clone(disposer));
                }
                Ok(instance)
            }
        }
    }

    fn invoke(&self, service: ServiceId, factory: &Factory) -> ContainerResult<Instance> {
        factory(self).map_err(|source| ContainerError::ResolutionFailed {
            service,
            source: Box::new(source),
        })
    }

    /// Resolves every unnamed registration once, stopping at the first failure.
    ///
    /// Has the usual side effects of resolution: transient disposables are
    /// tracked and scoped instances cached.
    pub fn validate_all(&self) -> ContainerResult<()> {
        for service in self.registered_services() {
            if let Err(source) = self.resolve_id(service, None) {
                log::warn!(
                    "container {}: validation of {service} failed: {source}",
                    self.name()
                );
                return Err(ContainerError::ValidationFailed {
                    service,
                    source: Box::new(source),
                });
            }
        }
        Ok(())
    }

    /// Starts a new scope by dropping every cached scoped instance.
    pub fn begin_scope(&self) {
        let previous = mem::take(&mut *self.scoped_instances.borrow_mut());
        log::debug!(
            "container {}: new scope, dropped {} scoped instance(s)",
            self.name(),
            previous.len()
        );
    }

    /// Releases every tracked transient disposable in the order it was produced.
    /// Calling it again without new transient resolutions does nothing.
    pub fn dispose(&self) {
        let disposables = mem::take(&mut *self.disposables.borrow_mut());
        if disposables.is_empty() {
            return;
        }
        log::debug!(
            "container {}: disposing {} instance(s)",
            self.name(),
            disposables.len()
        );
        for disposable in disposables {
            disposable.dispose();
        }
    }

    pub fn tracked_disposables(&self) -> usize {
        self.disposables.borrow().len()
    }

    pub fn scoped_instance_count(&self) -> usize {
        self.scoped_instances.borrow().len()
    }

    /// Number of services currently being resolved on this call path.
    pub fn resolution_depth(&self) -> usize {
        self.resolution_stack.borrow().len()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if self.settings.dispose_on_drop {
            self.dispose();
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.name())
            .field("registrations", &self.registrations.borrow().len())
            .field("named_registrations", &self.named_registrations.borrow().len())
            .field("scoped_instances", &self.scoped_instance_count())
            .field("tracked_disposables", &self.tracked_disposables())
            .finish()
    }
}

/// Wraps `factory` so it runs until it first succeeds and then keeps serving
/// that instance.
fn memoize(factory: Factory) -> Factory {
    let cell: OnceCell<Instance> = OnceCell::new();
    Rc::new(move |container: &Container| {
        cell.get_or_try_init(|| factory(container)).cloned()
    })
}

/// Marks a service as being resolved for as long as the guard lives.
struct ResolutionGuard<'a> {
    stack: &'a RefCell<Vec<ServiceId>>,
}

impl<'a> ResolutionGuard<'a> {
    fn enter(stack: &'a RefCell<Vec<ServiceId>>, service: ServiceId) -> ContainerResult<Self> {
        let mut entries = stack.borrow_mut();
        if entries.contains(&service) {
            let mut path = entries.clone();
            path.push(service);
            return Err(ContainerError::CyclicDependency { service, path });
        }
        entries.push(service);
        drop(entries);
        Ok(Self { stack })
    }
}

impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}
