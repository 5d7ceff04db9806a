//! Constructor descriptors.
//!
//! Rust has no runtime reflection over constructors, so every implementation
//! type that the container builds by itself describes its constructors through
//! [`Injectable`]: the service identities each one needs and a closure that
//! receives those services once they are resolved.

use std::any::type_name;
use std::rc::Rc;
use std::sync::Arc;
use std::vec;

use crate::container::container::Container;
use crate::container::types::{ContainerError, ContainerResult, Dispose, Instance, ServiceId};

/// Conversion of a shared implementation handle into the handle of a service it provides.
///
/// Every type provides itself. Use [`provides!`](crate::provides) to declare
/// that an implementation provides a trait object.
pub trait Upcast<S: ?Sized + 'static>: 'static {
    fn upcast(self: Arc<Self>) -> Arc<S>;
}

impl<T: 'static> Upcast<T> for T {
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Implements [`Upcast`] from an implementation type to one or more service types.
///
/// ```
/// use service_container::provides;
///
/// trait Clock {
///     fn now(&self) -> u64;
/// }
///
/// struct FixedClock;
///
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 {
///         42
///     }
/// }
///
/// provides!(FixedClock => dyn Clock);
/// ```
#[macro_export]
macro_rules! provides {
    ($implementation:ty => $($service:ty),+ $(,)?) => {
        $(
            impl $crate::container::Upcast<$service> for $implementation {
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$service> {
                    self
                }
            }
        )+
    };
}

/// Constructor descriptor of a type the container can build.
pub trait Injectable: Sized + 'static {
    /// Available constructors, in declaration order.
    ///
    /// The container picks the one with the most parameters. When several
    /// share that count, the first one declared wins.
    fn constructors() -> Vec<Constructor<Self>>;

    /// Release capability of a constructed value, if it has one.
    ///
    /// Types that implement [`Dispose`] return `Some(instance.clone())` here so
    /// transient instances get released when the container is disposed, unless
    /// they are registered through `Container::register_disposable_type`.
    fn disposer(_instance: &Arc<Self>) -> Option<Arc<dyn Dispose>> {
        None
    }
}

type BuildFn<T> = Rc<dyn Fn(&mut Arguments) -> ContainerResult<T>>;

pub struct Constructor<T> {
    parameters: Vec<ServiceId>,
    build: BuildFn<T>,
}

impl<T: 'static> Constructor<T> {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&mut Arguments) -> ContainerResult<T> + 'static,
    {
        Self {
            parameters: Vec::new(),
            build: Rc::new(build),
        }
    }

    /// Declares the next parameter. Parameters are resolved and handed to the
    /// build closure in the order they are declared.
    pub fn param<S: ?Sized + 'static>(mut self) -> Self {
        self.parameters.push(ServiceId::of::<S>());
        self
    }

    pub fn parameters(&self) -> &[ServiceId] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub(crate) fn invoke(&self, mut arguments: Arguments) -> ContainerResult<T> {
        (self.build)(&mut arguments)
    }
}

impl<T: Default + 'static> Constructor<T> {
    /// Parameterless constructor backed by `Default`.
    pub fn from_default() -> Self {
        Self::new(|_| Ok(T::default()))
    }
}

impl<T> Clone for Constructor<T> {
    fn clone(&self) -> Self {
        Self {
            parameters: self.parameters.clone(),
            build: Rc::clone(&self.build),
        }
    }
}

/// Resolved constructor arguments, consumed in declaration order.
pub struct Arguments {
    implementation: &'static str,
    values: vec::IntoIter<Instance>,
    position: usize,
}

impl Arguments {
    pub(crate) fn new(implementation: &'static str, values: Vec<Instance>) -> Self {
        Self {
            implementation,
            values: values.into_iter(),
            position: 0,
        }
    }

    pub fn take<S: ?Sized + 'static>(&mut self) -> ContainerResult<Arc<S>> {
        let index = self.position;
        let instance = self.values.next().ok_or(ContainerError::MissingArgument {
            implementation: self.implementation,
            index,
        })?;
        self.position += 1;
        instance.downcast::<S>()
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// Picks the constructor with the most parameters; the earliest one wins a tie.
pub(crate) fn select_constructor<T: 'static>(
    constructors: Vec<Constructor<T>>,
) -> Option<Constructor<T>> {
    let mut selected: Option<Constructor<T>> = None;
    for candidate in constructors {
        let richer = selected
            .as_ref()
            .map_or(true, |current| candidate.arity() > current.arity());
        if richer {
            selected = Some(candidate);
        }
    }
    selected
}

/// Builds `I` through its richest constructor, resolving each parameter as an
/// unnamed service of `container`.
pub(crate) fn construct<I: Injectable>(container: &Container) -> ContainerResult<Arc<I>> {
    let implementation = type_name::<I>();
    let constructor = select_constructor(I::constructors())
        .ok_or(ContainerError::NoConstructor { implementation })?;

    log::trace!(
        "constructing {implementation} with {} argument(s)",
        constructor.arity()
    );

    let values = constructor
        .parameters()
        .iter()
        .map(|parameter| container.resolve_id(*parameter, None))
        .collect::<ContainerResult<Vec<_>>>()?;

    constructor
        .invoke(Arguments::new(implementation, values))
        .map(Arc::new)
}

/// Same as [`construct`], wrapped as an [`Instance`] of service `S`.
pub(crate) fn construct_instance<S, I>(container: &Container) -> ContainerResult<Instance>
where
    S: ?Sized + 'static,
    I: Injectable + Upcast<S>,
{
    let value = construct::<I>(container)?;
    let disposer = I::disposer(&value);
    Ok(Instance::from_parts::<S>(
        <I as Upcast<S>>::upcast(value),
        type_name::<I>(),
        disposer,
    ))
}
