use crate::{ProviderId, Store, Subscription};
use std::{collections::BTreeMap, rc::Rc};

/// Detect whether a wallet provider is usable in the current environment.
///
/// In the browser this is [`WindowProbe`](crate::WindowProbe), which looks
/// for the objects the extensions inject in `window`. Any `Fn(ProviderId) -> bool`
/// is a probe too.
pub trait Probe {
    fn is_available(&self, provider: ProviderId) -> bool;
}

impl<F> Probe for F
where
    F: Fn(ProviderId) -> bool,
{
    fn is_available(&self, provider: ProviderId) -> bool {
        self(provider)
    }
}

pub type Availability = BTreeMap<ProviderId, bool>;

/// Which of the known [`ProviderId`] are available.
///
/// Entries are only created by [`CapabilityRegistry::refresh`] and never
/// removed; a refresh only flips their value.
#[derive(Clone)]
pub struct CapabilityRegistry {
    probe: Rc<dyn Probe>,
    availability: Store<Availability>,
}

impl CapabilityRegistry {
    pub fn new(probe: Rc<dyn Probe>) -> Self {
        Self {
            probe,
            availability: Store::default(),
        }
    }

    /// probe every known provider again
    ///
    /// Nothing else than the availability map is touched, in particular no
    /// connection is attempted.
    pub fn refresh(&self) {
        let detected: Availability = ProviderId::ALL
            .into_iter()
            .map(|provider| (provider, self.probe.is_available(provider)))
            .collect();
        log::debug!("wallet providers detected: {detected:?}");

        self.availability
            .update(move |availability| availability.extend(detected));
    }

    pub fn has(&self, provider: ProviderId) -> bool {
        self.availability
            .with(|availability| availability.get(&provider).copied().unwrap_or(false))
    }

    pub fn snapshot(&self) -> Availability {
        self.availability.get()
    }

    pub fn subscribe(&self, listener: impl Fn(&Availability) + 'static) -> Subscription {
        self.availability.subscribe(listener)
    }
}
