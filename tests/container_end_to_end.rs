use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use service_container::container::{
    Constructor, Container, ContainerError, ContainerSettings, Dispose, Injectable, Lifecycle,
    ServiceId,
};
use service_container::provides;

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

trait Foo {
    fn id(&self) -> usize;
}

trait Bar {
    fn foo(&self) -> &Arc<dyn Foo>;
    fn id(&self) -> usize;
}

struct FooImpl {
    id: usize,
}

impl Default for FooImpl {
    fn default() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
        }
    }
}

impl Foo for FooImpl {
    fn id(&self) -> usize {
        self.id
    }
}

impl Injectable for FooImpl {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::from_default()]
    }
}

struct BarImpl {
    id: usize,
    foo: Arc<dyn Foo>,
}

impl Bar for BarImpl {
    fn foo(&self) -> &Arc<dyn Foo> {
        &self.foo
    }

    fn id(&self) -> usize {
        self.id
    }
}

impl Injectable for BarImpl {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(|args| {
            Ok(BarImpl {
                id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
                foo: args.take::<dyn Foo>()?,
            })
        })
        .param::<dyn Foo>()]
    }
}

provides!(FooImpl => dyn Foo);
provides!(BarImpl => dyn Bar);

struct Connection {
    id: usize,
    closed: Rc<RefCell<Vec<usize>>>,
}

impl Dispose for Connection {
    fn dispose(&self) {
        self.closed.borrow_mut().push(self.id);
    }
}

static CLOSED_FILES: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct ScratchFile;

impl Dispose for ScratchFile {
    fn dispose(&self) {
        CLOSED_FILES.fetch_add(1, Ordering::SeqCst);
    }
}

impl Injectable for ScratchFile {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::from_default()]
    }
}

fn wired_container() -> Container {
    let container = Container::with_settings(ContainerSettings::default().with_name("app"));
    container.register_type::<dyn Foo, FooImpl>(Lifecycle::Transient, None);
    container.register_type::<dyn Bar, BarImpl>(Lifecycle::Transient, None);
    container
}

#[test]
fn transient_graph_builds_fresh_dependencies() {
    let container = wired_container();
    container.validate_all().expect("graph is complete");

    let first = container.resolve::<dyn Bar>(None).expect("resolve bar");
    let second = container.resolve::<dyn Bar>(None).expect("resolve bar");

    assert_ne!(first.id(), second.id());
    assert!(!Arc::ptr_eq(first.foo(), second.foo()));
    assert_ne!(first.foo().id(), second.foo().id());
}

#[test]
fn singleton_dependency_is_shared_by_transient_consumers() {
    let container = wired_container();
    container.register_lazy::<dyn Foo, FooImpl>();

    let first = container.resolve::<dyn Bar>(None).expect("resolve bar");
    let second = container.resolve::<dyn Bar>(None).expect("resolve bar");

    assert_ne!(first.id(), second.id());
    assert!(Arc::ptr_eq(first.foo(), second.foo()));
}

#[test]
fn scoped_dependency_changes_with_each_scope() {
    let container = wired_container();
    container.register_type::<dyn Foo, FooImpl>(Lifecycle::Scoped, None);

    let before = container.resolve::<dyn Bar>(None).expect("resolve bar");
    let same_scope = container.resolve::<dyn Bar>(None).expect("resolve bar");
    assert!(Arc::ptr_eq(before.foo(), same_scope.foo()));

    container.begin_scope();
    let after = container.resolve::<dyn Bar>(None).expect("resolve bar");
    assert!(!Arc::ptr_eq(before.foo(), after.foo()));
}

#[test]
fn missing_dependency_is_reported_against_the_consumer() {
    let container = Container::new();
    container.register_transient::<dyn Bar, BarImpl>();

    let err = match container.resolve::<dyn Bar>(None) {
        Ok(_) => panic!("bar should not resolve without foo"),
        Err(err) => err,
    };
    assert_eq!(err.service(), Some(ServiceId::of::<dyn Bar>()));
    assert!(matches!(
        err.root_cause(),
        ContainerError::NotRegistered { service, name: None } if *service == ServiceId::of::<dyn Foo>()
    ));

    assert!(matches!(
        container.validate_all(),
        Err(ContainerError::ValidationFailed { .. })
    ));
}

#[test]
fn named_connections_live_next_to_the_default_one() {
    let closed = Rc::new(RefCell::new(Vec::new()));
    let container = Container::new();

    let primary = Rc::clone(&closed);
    container.register_disposable_factory::<Connection, Connection, _>(
        move |_| {
            Ok(Connection {
                id: 1,
                closed: Rc::clone(&primary),
            })
        },
        Lifecycle::Transient,
        None,
    );
    let replica = Rc::clone(&closed);
    container.register_disposable_factory::<Connection, Connection, _>(
        move |_| {
            Ok(Connection {
                id: 2,
                closed: Rc::clone(&replica),
            })
        },
        Lifecycle::Transient,
        Some("replica"),
    );

    let default = container.resolve::<Connection>(None).expect("default connection");
    let named = container
        .resolve::<Connection>(Some("replica"))
        .expect("replica connection");
    assert_eq!(default.id, 1);
    assert_eq!(named.id, 2);

    drop(container);
    assert_eq!(*closed.borrow(), vec![1]);
}

#[test]
fn disposable_types_are_released_on_dispose() {
    let container = Container::new();
    container.register_disposable_type::<ScratchFile, ScratchFile>(Lifecycle::Transient, None);

    container.resolve::<ScratchFile>(None).expect("first file");
    container.resolve::<ScratchFile>(None).expect("second file");
    assert_eq!(container.tracked_disposables(), 2);

    container.dispose();
    assert_eq!(CLOSED_FILES.load(Ordering::SeqCst), 2);
    assert_eq!(container.tracked_disposables(), 0);
}
