//! Change notifications flowing from the model to the viewport, plus the
//! small single-threaded subscription list both sides use. Everything runs
//! on one logical thread, so listeners are plain `FnMut` closures invoked
//! synchronously at the emit site.

use std::cell::RefCell;
use std::rc::Rc;

/// Notifications the viewport reacts to. Raising one of these is the only
/// way external code gets the scene graph to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEvent {
    /// A new mesh payload (or `None`) is ready to become the active mesh.
    NewMeshAvailable,
    /// The landmark set identity changed; all views must be rebuilt.
    LandmarksChanged,
    /// Connectivity line display toggled.
    ConnectivityToggled(bool),
    /// Editing gesture mode toggled.
    EditingToggled(bool),
}

/// Handle returned by [`Notifier::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Listener<T> = Box<dyn FnMut(&T)>;

/// Synchronous subscription list. Cloning shares the listener set, so a
/// model can hand a notifier to several producers.
pub struct Notifier<T> {
    inner: Rc<RefCell<NotifierInner<T>>>,
}

struct NotifierInner<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(NotifierInner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Notifier<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl FnMut(&T) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Box::new(listener)));
        Subscription(id)
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.inner
            .borrow_mut()
            .listeners
            .retain(|(id, _)| *id != subscription.0);
    }

    pub fn emit(&self, event: &T) {
        let mut inner = self.inner.borrow_mut();
        for (_, listener) in inner.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}
