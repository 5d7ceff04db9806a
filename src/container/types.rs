use std::any::{type_name, Any, TypeId};
use std::error::Error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::container::constructor::Upcast;

/// Type-erased service handle. Always wraps an `Arc<S>` for the service type `S`
/// it was produced for, so unsized services (`dyn Trait`) survive the erasure.
pub type DynService = Arc<dyn Any>;

pub type ContainerResult<T> = Result<T, ContainerError>;

/// Opaque identity of a service contract, usually a `dyn Trait`.
#[derive(Clone, Copy)]
pub struct ServiceId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ServiceId {
    pub fn of<S: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            type_name: type_name::<S>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for ServiceId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ServiceId {}

impl Hash for ServiceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceId({})", self.type_name)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// A fresh instance for every resolution.
    #[default]
    Transient,
    /// One instance for the lifetime of the container.
    Singleton,
    /// One instance per active scope.
    Scoped,
}

/// Release capability of a produced service.
///
/// The container only calls this for instances it produced under
/// [`Lifecycle::Transient`], once each, when the container is disposed.
/// Implementations registered by type declare the capability either by
/// registering through `Container::register_disposable_type` or by
/// overriding `Injectable::disposer`.
pub trait Dispose {
    fn dispose(&self);
}

/// A produced service together with what the container needs to know about it.
#[derive(Clone)]
pub struct Instance {
    service: DynService,
    implementation: &'static str,
    disposer: Option<Arc<dyn Dispose>>,
}

impl Instance {
    pub fn new<S: ?Sized + 'static>(service: Arc<S>) -> Self {
        Self::from_parts(service, type_name::<S>(), None)
    }

    /// Wraps a value that exposes a release capability.
    pub fn disposable<S, I>(value: Arc<I>) -> Self
    where
        S: ?Sized + 'static,
        I: Dispose + Upcast<S>,
    {
        let disposer: Arc<dyn Dispose> = value.clone();
        Self::from_parts::<S>(<I as Upcast<S>>::upcast(value), type_name::<I>(), Some(disposer))
    }

    pub(crate) fn from_parts<S: ?Sized + 'static>(
        service: Arc<S>,
        implementation: &'static str,
        disposer: Option<Arc<dyn Dispose>>,
    ) -> Self {
        Self {
            service: Arc::new(service),
            implementation,
            disposer,
        }
    }

    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    pub fn disposer(&self) -> Option<&Arc<dyn Dispose>> {
        self.disposer.as_ref()
    }

    pub fn is_disposable(&self) -> bool {
        self.disposer.is_some()
    }

    pub fn downcast<S: ?Sized + 'static>(&self) -> ContainerResult<Arc<S>> {
        self.service
            .downcast_ref::<Arc<S>>()
            .cloned()
            .ok_or(ContainerError::TypeMismatch {
                expected: type_name::<S>(),
                found: self.implementation,
            })
    }

    /// True when both handles point at the same produced value.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.service, &other.service)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("implementation", &self.implementation)
            .field("disposable", &self.is_disposable())
            .finish()
    }
}

#[derive(Debug)]
pub enum ContainerError {
    NotRegistered {
        service: ServiceId,
        name: Option<String>,
    },
    CyclicDependency {
        service: ServiceId,
        path: Vec<ServiceId>,
    },
    ResolutionFailed {
        service: ServiceId,
        source: Box<ContainerError>,
    },
    ValidationFailed {
        service: ServiceId,
        source: Box<ContainerError>,
    },
    NoConstructor {
        implementation: &'static str,
    },
    MissingArgument {
        implementation: &'static str,
        index: usize,
    },
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    InitializationFailed {
        service: String,
        reason: String,
    },
}

impl ContainerError {
    pub fn initialization_failed(service: impl Into<String>, reason: impl fmt::Display) -> Self {
        ContainerError::InitializationFailed {
            service: service.into(),
            reason: reason.to_string(),
        }
    }

    /// Follows `ResolutionFailed`/`ValidationFailed` wrappers down to the original failure.
    pub fn root_cause(&self) -> &ContainerError {
        let mut current = self;
        while let ContainerError::ResolutionFailed { source, .. }
        | ContainerError::ValidationFailed { source, .. } = current
        {
            current = source.as_ref();
        }
        current
    }

    /// Outer identity named by a wrapper or by a lookup failure.
    pub fn service(&self) -> Option<ServiceId> {
        match self {
            ContainerError::NotRegistered { service, .. }
            | ContainerError::CyclicDependency { service, .. }
            | ContainerError::ResolutionFailed { service, .. }
            | ContainerError::ValidationFailed { service, .. } => Some(*service),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::NotRegistered {
                service,
                name: Some(name),
            } => {
                write!(f, "Service of type {service} with name {name} is not registered")
            }
            ContainerError::NotRegistered { service, name: None } => {
                write!(f, "Service of type {service} is not registered")
            }
            ContainerError::CyclicDependency { service, path } => {
                let chain = path
                    .iter()
                    .map(ServiceId::type_name)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                write!(f, "Cyclic dependency detected for type {service}: {chain}")
            }
            ContainerError::ResolutionFailed { service, .. } => {
                write!(f, "Failed to resolve service of type {service}")
            }
            ContainerError::ValidationFailed { service, .. } => {
                write!(f, "Validation failed for service of type {service}")
            }
            ContainerError::NoConstructor { implementation } => {
                write!(f, "{implementation} does not declare any constructor")
            }
            ContainerError::MissingArgument {
                implementation,
                index,
            } => {
                write!(
                    f,
                    "Constructor of {implementation} requested argument #{index} which was not declared"
                )
            }
            ContainerError::TypeMismatch { expected, found } => {
                write!(f, "Expected an instance of {expected}, found {found}")
            }
            ContainerError::InitializationFailed { service, reason } => {
                write!(f, "Service {service} failed to initialize: {reason}")
            }
        }
    }
}

impl Error for ContainerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ContainerError::ResolutionFailed { source, .. }
            | ContainerError::ValidationFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
