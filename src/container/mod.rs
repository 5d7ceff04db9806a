mod constructor;
mod container;
pub mod settings;
pub mod types;

pub use constructor::{Arguments, Constructor, Injectable, Upcast};
pub use container::Container;
pub use settings::{ContainerSettings, DEFAULT_CONTAINER_NAME};
pub use types::{
    ContainerError, ContainerResult, Dispose, DynService, Instance, Lifecycle, ServiceId,
};
