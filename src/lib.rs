//! A small inversion-of-control container.
//!
//! Services are registered against a [`ServiceId`](container::ServiceId),
//! usually a trait object type, together with a way to build them: either a
//! factory closure or the constructor descriptor of an implementation type
//! ([`Injectable`](container::Injectable)). Instances follow one of three
//! lifecycles: transient, singleton or scoped.
//!
//! ```
//! use std::sync::Arc;
//!
//! use service_container::container::{Constructor, Container, Injectable, Lifecycle};
//! use service_container::provides;
//!
//! trait Repository {
//!     fn find(&self, id: u32) -> String;
//! }
//!
//! trait Greeter {
//!     fn greet(&self, id: u32) -> String;
//! }
//!
//! #[derive(Default)]
//! struct InMemoryRepository;
//!
//! impl Repository for InMemoryRepository {
//!     fn find(&self, id: u32) -> String {
//!         format!("user-{id}")
//!     }
//! }
//!
//! impl Injectable for InMemoryRepository {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::from_default()]
//!     }
//! }
//!
//! struct RepositoryGreeter {
//!     repository: Arc<dyn Repository>,
//! }
//!
//! impl Greeter for RepositoryGreeter {
//!     fn greet(&self, id: u32) -> String {
//!         format!("hello {}", self.repository.find(id))
//!     }
//! }
//!
//! impl Injectable for RepositoryGreeter {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::new(|args| {
//!             Ok(RepositoryGreeter {
//!                 repository: args.take::<dyn Repository>()?,
//!             })
//!         })
//!         .param::<dyn Repository>()]
//!     }
//! }
//!
//! provides!(InMemoryRepository => dyn Repository);
//! provides!(RepositoryGreeter => dyn Greeter);
//!
//! let container = Container::new();
//! container.register_type::<dyn Repository, InMemoryRepository>(Lifecycle::Singleton, None);
//! container.register_type::<dyn Greeter, RepositoryGreeter>(Lifecycle::Transient, None);
//!
//! let greeter = container.resolve::<dyn Greeter>(None).unwrap();
//! assert_eq!(greeter.greet(7), "hello user-7");
//! ```

pub mod container;
