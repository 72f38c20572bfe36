/*!
Observable value holder.

A [`Store`] keeps one value and a list of listeners. Every call to
[`Store::update`] (or [`Store::set`]) is one committed transition: the whole
closure is applied, then every listener is called once, synchronously, in the
order they subscribed.

Listeners may update the store they are listening to. Such updates are queued
and applied, each followed by its own notification round, once the current
round is over: a listener never observes a transition out of order.

The handle is cheap to clone, all the clones share the same value.
*/

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::{Rc, Weak},
};

type Listener<T> = Rc<dyn Fn(&T)>;
type Mutation<T> = Box<dyn FnOnce(&mut T)>;

pub struct Store<T> {
    inner: Rc<Inner<T>>,
}

struct Inner<T> {
    value: RefCell<T>,
    listeners: RefCell<Vec<(u64, Listener<T>)>>,
    next_listener: Cell<u64>,
    notifying: Cell<bool>,
    pending: RefCell<VecDeque<Mutation<T>>>,
}

/// Keeps a listener registered. Dropping it (or calling
/// [`Subscription::unsubscribe`]) removes the listener.
#[must_use = "the listener is removed as soon as the subscription is dropped"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl<T: Clone + 'static> Store<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
                notifying: Cell::new(false),
                pending: RefCell::new(VecDeque::new()),
            }),
        }
    }

    /// copy of the current value
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// read the current value without copying it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    pub fn set(&self, value: T) {
        self.update(move |current| *current = value)
    }

    /// apply `mutation` to the value and notify the listeners once
    pub fn update(&self, mutation: impl FnOnce(&mut T) + 'static) {
        self.inner.pending.borrow_mut().push_back(Box::new(mutation));

        if self.inner.notifying.get() {
            // applied by the notification loop already running
            return;
        }

        self.inner.notifying.set(true);
        loop {
            let Some(mutation) = self.inner.pending.borrow_mut().pop_front() else {
                break;
            };
            {
                let mut value = self.inner.value.borrow_mut();
                mutation(&mut *value);
            }

            let committed = self.get();
            // listeners may (un)subscribe while being called
            let listeners: Vec<Listener<T>> = self
                .inner
                .listeners
                .borrow()
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            for listener in listeners {
                listener(&committed);
            }
        }
        self.inner.notifying.set(false);
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        let inner: Weak<Inner<T>> = Rc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner
                        .listeners
                        .borrow_mut()
                        .retain(|(listener, _)| *listener != id);
                }
            })),
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

impl<T: Default + Clone + 'static> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe()
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe()
        }
    }
}
