/*!
Binding of a [`Client`] to a user interface.

A [`WalletContext`] listens to the stores of its client and republishes one
[`Snapshot`] combining them, only when the combined value actually changes.
The [`ContextProvider`] keeps one context per configuration value, so that
rendering again with the same configuration reuses the same session.
*/

use crate::{
    Client, Config, NetworkId, ProviderId, SessionState, Store, Stores, Subscription,
    adapter::{AdapterSet, Inscription, SignPsbtOptions, SignedPsbt},
    error::Error,
    registry::{Availability, Probe},
};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::JsValue;

/// What the user interface reads.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub address: String,
    pub payment_address: String,
    pub public_key: String,
    pub payment_public_key: String,
    pub accounts: Vec<String>,
    /// satoshis, empty until the balance was read
    pub balance: String,
    pub connected: bool,
    pub is_connecting: bool,
    pub is_initializing: bool,
    pub provider: Option<ProviderId>,
    pub library: Option<ProviderId>,
    pub network: NetworkId,
    pub has_leather: bool,
    pub has_magic_eden: bool,
    pub has_okx: bool,
    pub has_oyl: bool,
    pub has_phantom: bool,
    pub has_unisat: bool,
    pub has_wizz: bool,
    pub has_xverse: bool,
}

impl Snapshot {
    pub fn collect(
        session: &SessionState,
        library: Option<ProviderId>,
        availability: &Availability,
    ) -> Self {
        let has = |provider: ProviderId| availability.get(&provider).copied().unwrap_or(false);

        Self {
            address: session.address.clone(),
            payment_address: session.payment_address.clone(),
            public_key: session.public_key.clone(),
            payment_public_key: session.payment_public_key.clone(),
            accounts: session.accounts.clone(),
            balance: session
                .balance
                .map(|balance| balance.to_sat().to_string())
                .unwrap_or_default(),
            connected: session.connected,
            is_connecting: session.is_connecting,
            is_initializing: session.is_initializing,
            provider: session.provider,
            library,
            network: session.network,
            has_leather: has(ProviderId::Leather),
            has_magic_eden: has(ProviderId::MagicEden),
            has_okx: has(ProviderId::Okx),
            has_oyl: has(ProviderId::Oyl),
            has_phantom: has(ProviderId::Phantom),
            has_unisat: has(ProviderId::Unisat),
            has_wizz: has(ProviderId::Wizz),
            has_xverse: has(ProviderId::Xverse),
        }
    }

    pub fn has_provider(&self, provider: ProviderId) -> bool {
        match provider {
            ProviderId::Leather => self.has_leather,
            ProviderId::MagicEden => self.has_magic_eden,
            ProviderId::Okx => self.has_okx,
            ProviderId::Oyl => self.has_oyl,
            ProviderId::Phantom => self.has_phantom,
            ProviderId::Unisat => self.has_unisat,
            ProviderId::Wizz => self.has_wizz,
            ProviderId::Xverse => self.has_xverse,
        }
    }

    pub fn to_js(&self) -> Result<JsValue, Error> {
        Ok(serde_wasm_bindgen::to_value(self)?)
    }
}

/// A [`Client`] with its published [`Snapshot`].
pub struct WalletContext {
    client: Rc<Client>,
    published: Store<Snapshot>,
    _subscriptions: Vec<Subscription>,
}

impl WalletContext {
    pub fn new(client: Client) -> Self {
        let client = Rc::new(client);
        let Stores {
            session,
            library,
            network,
        } = client.stores().clone();
        let registry = client.registry().clone();

        let published = Store::new(Snapshot::collect(
            &session.get(),
            library.get(),
            &registry.snapshot(),
        ));

        let recompute: Rc<dyn Fn()> = {
            let session = session.clone();
            let library = library.clone();
            let registry = registry.clone();
            let published = published.clone();
            Rc::new(move || {
                let next = Snapshot::collect(&session.get(), library.get(), &registry.snapshot());
                if published.with(|current| *current != next) {
                    published.set(next);
                }
            })
        };
        let subscriptions = vec![
            {
                let recompute = Rc::clone(&recompute);
                session.subscribe(move |_| recompute())
            },
            {
                let recompute = Rc::clone(&recompute);
                library.subscribe(move |_| recompute())
            },
            {
                let recompute = Rc::clone(&recompute);
                network.subscribe(move |_| recompute())
            },
            {
                let recompute = Rc::clone(&recompute);
                registry.subscribe(move |_| recompute())
            },
        ];

        Self {
            client,
            published,
            _subscriptions: subscriptions,
        }
    }

    pub fn client(&self) -> &Rc<Client> {
        &self.client
    }

    pub fn snapshot(&self) -> Snapshot {
        self.published.get()
    }

    /// `listener` is called each time the snapshot changes
    pub fn subscribe(&self, listener: impl Fn(&Snapshot) + 'static) -> Subscription {
        self.published.subscribe(listener)
    }

    pub fn has_provider(&self, provider: ProviderId) -> bool {
        self.published.with(|snapshot| snapshot.has_provider(provider))
    }

    pub async fn connect(&self, provider: ProviderId) -> Result<(), Error> {
        self.client.connect(provider).await
    }

    pub async fn disconnect(&self) -> Result<(), Error> {
        self.client.disconnect().await
    }

    pub async fn get_balance(&self) -> Result<String, Error> {
        self.client.get_balance().await
    }

    pub async fn get_inscriptions(&self) -> Result<Vec<Inscription>, Error> {
        self.client.get_inscriptions().await
    }

    pub async fn get_network(&self) -> NetworkId {
        self.client.get_network().await
    }

    pub async fn get_public_key(&self) -> Result<String, Error> {
        self.client.get_public_key().await
    }

    pub async fn push_psbt(&self, psbt: &str) -> Result<String, Error> {
        self.client.push_psbt(psbt).await
    }

    pub async fn sign_message(&self, message: &str, address: Option<&str>) -> Result<String, Error> {
        self.client.sign_message(message, address).await
    }

    pub async fn request_accounts(&self) -> Result<Vec<String>, Error> {
        self.client.request_accounts().await
    }

    pub async fn send_btc(&self, to: &str, amount: u64) -> Result<String, Error> {
        self.client.send_btc(to, amount).await
    }

    pub async fn sign_psbt(&self, psbt: &str, options: SignPsbtOptions) -> Result<SignedPsbt, Error> {
        self.client.sign_psbt(psbt, options).await
    }

    pub async fn switch_network(&self, network: NetworkId) -> Result<(), Error> {
        self.client.switch_network(network).await
    }
}

/// Builds the [`WalletContext`], once per distinct [`Config`].
pub struct ContextProvider {
    adapters: AdapterSet,
    probe: Rc<dyn Probe>,
    current: RefCell<Option<(Config, Rc<WalletContext>)>>,
}

impl ContextProvider {
    pub fn new(adapters: AdapterSet, probe: Rc<dyn Probe>) -> Self {
        Self {
            adapters,
            probe,
            current: RefCell::new(None),
        }
    }

    /// the context for `config` (the default configuration if `None`)
    ///
    /// The same context is returned as long as the configuration is equal to
    /// the previous one; a different configuration starts a new session.
    pub fn context(&self, config: Option<&Config>) -> Rc<WalletContext> {
        let config = Config::resolve(config.cloned());

        if let Some((current, context)) = self.current.borrow().as_ref() {
            if *current == config {
                return Rc::clone(context);
            }
        }

        log::debug!("new wallet session for {config:?}");
        let client = Client::new(
            Stores::new(),
            config.clone(),
            self.adapters.clone(),
            Rc::clone(&self.probe),
        );
        let context = Rc::new(WalletContext::new(client));
        context.client().refresh_providers();

        *self.current.borrow_mut() = Some((config, Rc::clone(&context)));
        context
    }
}
