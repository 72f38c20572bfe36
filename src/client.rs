use crate::{
    Config, NetworkId, ProviderId, SessionState, Store, Subscription,
    adapter::{AdapterSet, Inscription, SignPsbtOptions, SignedPsbt, WalletAdapter},
    error::{Error, Rejection},
    psbt,
    registry::{CapabilityRegistry, Probe},
};
use bitcoin::Amount;
use std::{cell::Cell, rc::Rc};

/// The observable stores a [`Client`] publishes to.
#[derive(Clone, Default)]
pub struct Stores {
    pub session: Store<SessionState>,
    /// provider handling the current (or pending) connection
    pub library: Store<Option<ProviderId>>,
    pub network: Store<NetworkId>,
}

impl Stores {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Notifications a wallet emits on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    NetworkChanged(NetworkId),
    Disconnected,
}

/// One wallet session.
///
/// Every operation is forwarded to the adapter of the connected provider.
/// Failures of the wallet are returned as [`Error::AdapterRejected`], but a
/// wallet that succeeds without returning anything yields the empty value of
/// the operation (`""`, an empty list or an empty [`SignedPsbt`]).
pub struct Client {
    config: Config,
    stores: Stores,
    registry: CapabilityRegistry,
    adapters: AdapterSet,
    attempt: Cell<bool>,
    connection_epoch: Cell<u64>,
    network_epoch: Cell<u64>,
    _availability: Subscription,
}

/// Marks a connection attempt (connect or initialize) in progress. Clears
/// the busy flags of the session however the attempt ends.
struct Attempt<'a> {
    client: &'a Client,
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        self.client.attempt.set(false);

        let session = &self.client.stores.session;
        if session.with(|state| state.is_connecting || state.is_initializing) {
            session.update(|state| {
                state.is_connecting = false;
                state.is_initializing = false;
            });
        }
    }
}

fn rejected(provider: ProviderId) -> impl FnOnce(Rejection) -> Error {
    move |rejection| {
        log::warn!("wallet {provider} rejected the request: {rejection}");
        Error::AdapterRejected {
            provider,
            rejection,
        }
    }
}

impl Client {
    pub fn new(stores: Stores, config: Config, adapters: AdapterSet, probe: Rc<dyn Probe>) -> Self {
        stores.session.set(SessionState::new(config.network));
        stores.library.set(None);
        stores.network.set(config.network);

        log::debug!(
            "wallet adapters: {:?}",
            adapters.providers().collect::<Vec<_>>()
        );
        let registry = CapabilityRegistry::new(probe);
        let session = stores.session.clone();
        let availability = registry.subscribe(move |availability| {
            let availability = availability.clone();
            session.update(move |state| state.has_provider = availability);
        });

        Self {
            config,
            stores,
            registry,
            adapters,
            attempt: Cell::new(false),
            connection_epoch: Cell::new(0),
            network_epoch: Cell::new(0),
            _availability: availability,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// copy of the current session
    pub fn session(&self) -> SessionState {
        self.stores.session.get()
    }

    /// probe the environment for the wallet providers again
    pub fn refresh_providers(&self) {
        self.registry.refresh()
    }

    fn begin_attempt(&self) -> Result<Attempt<'_>, Error> {
        if self.attempt.replace(true) {
            Err(Error::AlreadyConnecting)
        } else {
            Ok(Attempt { client: self })
        }
    }

    fn next_connection_epoch(&self) -> u64 {
        let epoch = self.connection_epoch.get() + 1;
        self.connection_epoch.set(epoch);
        epoch
    }

    fn epochs(&self) -> (u64, u64) {
        (self.connection_epoch.get(), self.network_epoch.get())
    }

    fn active(&self) -> Result<(ProviderId, Rc<dyn WalletAdapter>), Error> {
        let provider = self
            .stores
            .session
            .with(|state| state.provider.filter(|_| state.connected))
            .ok_or(Error::NotConnected)?;
        let adapter = self
            .adapters
            .get(provider)
            .ok_or(Error::ProviderUnavailable(provider))?;
        Ok((provider, adapter))
    }

    fn available_adapter(&self, provider: ProviderId) -> Result<Rc<dyn WalletAdapter>, Error> {
        if !self.registry.has(provider) {
            return Err(Error::ProviderUnavailable(provider));
        }
        self.adapters
            .get(provider)
            .ok_or(Error::ProviderUnavailable(provider))
    }

    /// detect the installed wallets and, if the configuration names one,
    /// silently reconnect to it
    pub async fn initialize(&self) -> Result<(), Error> {
        let _attempt = self.begin_attempt()?;

        if self.stores.session.with(|state| state.connected) {
            self.registry.refresh();
            return Ok(());
        }

        self.stores
            .session
            .update(|state| state.is_initializing = true);
        self.registry.refresh();

        let Some(provider) = self.config.providers.auto_connect else {
            return Ok(());
        };
        if !self.registry.has(provider) {
            log::debug!("{provider} is not installed, not reconnecting");
            return Ok(());
        }

        let adapter = self.available_adapter(provider)?;
        self.establish(provider, adapter).await
    }

    /// connect to the wallet `provider`
    ///
    /// Fails with [`Error::AlreadyConnecting`] if another connection attempt is
    /// pending. Connecting to another provider than the connected one first
    /// disconnects the current one, so the session goes through
    /// `Disconnected` and stays there if the new wallet refuses.
    pub async fn connect(&self, provider: ProviderId) -> Result<(), Error> {
        let _attempt = self.begin_attempt()?;
        let adapter = self.available_adapter(provider)?;

        let current = self
            .stores
            .session
            .with(|state| state.provider.filter(|_| state.connected));
        match current {
            Some(current) if current == provider => return Ok(()),
            Some(_) => self.disconnect().await?,
            None => (),
        }

        self.stores.session.update(|state| state.is_connecting = true);
        self.establish(provider, adapter).await
    }

    async fn establish(
        &self,
        provider: ProviderId,
        adapter: Rc<dyn WalletAdapter>,
    ) -> Result<(), Error> {
        self.next_connection_epoch();
        self.stores.library.set(Some(provider));
        log::info!("connecting to {provider}");

        let network = self.stores.session.with(|state| state.network);
        let options = self.config.provider_options(provider);
        let connection = match adapter.connect(network, options).await {
            Ok(Some(connection)) if !connection.address.is_empty() => Ok(connection.normalize()),
            Ok(_) => Err(Rejection::internal("the wallet did not share any address")),
            Err(rejection) => Err(rejection),
        };

        match connection {
            Ok(connection) => {
                log::info!("connected to {provider} ({})", connection.address);
                self.stores
                    .session
                    .update(move |state| state.apply_connection(provider, connection));
                Ok(())
            }
            Err(rejection) => {
                self.stores.library.set(None);
                Err(rejected(provider)(rejection))
            }
        }
    }

    pub async fn disconnect(&self) -> Result<(), Error> {
        let (provider, adapter) = self.active()?;
        adapter.disconnect().await.map_err(rejected(provider))?;

        log::info!("disconnected from {provider}");
        self.reset_connection();
        Ok(())
    }

    fn reset_connection(&self) {
        self.next_connection_epoch();
        self.stores.session.update(SessionState::clear_connection);
        self.stores.library.set(None);
    }

    /// balance of the connected wallet, in satoshis
    ///
    /// The session keeps the value only if neither the account nor the network
    /// changed while the wallet was answering.
    pub async fn get_balance(&self) -> Result<String, Error> {
        let (provider, adapter) = self.active()?;
        let epochs = self.epochs();

        let Some(balance) = adapter.get_balance().await.map_err(rejected(provider))? else {
            return Ok(String::new());
        };

        if self.epochs() == epochs {
            log::debug!("balance of {provider}: {balance}");
            self.stores
                .session
                .update(move |state| state.balance = Some(balance));
        } else {
            log::warn!("discarding the balance read from {provider}, the session changed meanwhile");
        }

        Ok(balance.to_sat().to_string())
    }

    pub async fn get_inscriptions(&self) -> Result<Vec<Inscription>, Error> {
        let (provider, adapter) = self.active()?;
        let inscriptions = adapter
            .get_inscriptions()
            .await
            .map_err(rejected(provider))?;
        Ok(inscriptions.unwrap_or_default())
    }

    pub async fn get_network(&self) -> NetworkId {
        self.stores.session.with(|state| state.network)
    }

    pub async fn get_public_key(&self) -> Result<String, Error> {
        let (provider, adapter) = self.active()?;
        let public_key = adapter.get_public_key().await.map_err(rejected(provider))?;
        Ok(public_key.unwrap_or_default())
    }

    /// broadcast a signed PSBT (hex or base64), returns the transaction id
    pub async fn push_psbt(&self, psbt: &str) -> Result<String, Error> {
        psbt::encoding(psbt)?;
        let (provider, adapter) = self.active()?;
        let txid = adapter
            .push_psbt(psbt.trim())
            .await
            .map_err(rejected(provider))?;
        Ok(txid.unwrap_or_default())
    }

    /// sign `message` with the key of `address`, or of the connected address
    pub async fn sign_message(&self, message: &str, address: Option<&str>) -> Result<String, Error> {
        if message.is_empty() {
            return Err(Error::InvalidArgument("empty message".to_owned()));
        }
        if let Some(address) = address {
            let network = self.stores.session.with(|state| state.network);
            network.validate_address(address)?;
        }

        let (provider, adapter) = self.active()?;
        let signature = adapter
            .sign_message(message, address)
            .await
            .map_err(rejected(provider))?;
        Ok(signature.unwrap_or_default())
    }

    pub async fn request_accounts(&self) -> Result<Vec<String>, Error> {
        let (provider, adapter) = self.active()?;
        let accounts = adapter.request_accounts().await.map_err(rejected(provider))?;
        Ok(accounts.unwrap_or_default())
    }

    /// send `amount` satoshis to `to`, returns the transaction id
    pub async fn send_btc(&self, to: &str, amount: u64) -> Result<String, Error> {
        if amount == 0 {
            return Err(Error::InvalidArgument("nothing to send".to_owned()));
        }
        if amount > Amount::MAX_MONEY.to_sat() {
            return Err(Error::InvalidArgument(format!(
                "{amount} sats is more than the bitcoin supply"
            )));
        }
        let network = self.stores.session.with(|state| state.network);
        network.validate_address(to)?;

        let (provider, adapter) = self.active()?;
        let txid = adapter
            .send_btc(to, Amount::from_sat(amount))
            .await
            .map_err(rejected(provider))?;
        Ok(txid.unwrap_or_default())
    }

    pub async fn sign_psbt(&self, psbt: &str, options: SignPsbtOptions) -> Result<SignedPsbt, Error> {
        psbt::encoding(psbt)?;
        let (provider, adapter) = self.active()?;

        let Some(signed) = adapter
            .sign_psbt(psbt.trim(), options)
            .await
            .map_err(rejected(provider))?
        else {
            return Ok(SignedPsbt::default());
        };

        complete_signed_psbt(signed)
            .map_err(|error| rejected(provider)(Rejection::internal(error.to_string())))
    }

    /// point the session (and the connected wallet if any) to `network`
    pub async fn switch_network(&self, network: NetworkId) -> Result<(), Error> {
        match self.active() {
            Ok((provider, adapter)) => {
                if !adapter.supports_network(network) {
                    return Err(Error::unsupported_network(network));
                }
                adapter
                    .switch_network(network)
                    .await
                    .map_err(rejected(provider))?;
            }
            Err(Error::NotConnected) => (),
            Err(error) => return Err(error),
        }

        self.commit_network(network);
        Ok(())
    }

    fn commit_network(&self, network: NetworkId) {
        if self.stores.session.with(|state| state.network) == network {
            return;
        }

        log::info!("switching to {network}");
        self.network_epoch.set(self.network_epoch.get() + 1);
        self.stores.session.update(move |state| {
            state.network = network;
            state.balance = None;
        });
        self.stores.network.set(network);
    }

    /// apply a notification emitted by the wallet `provider`
    ///
    /// Notifications from a wallet other than the connected one are ignored.
    pub fn handle_event(&self, provider: ProviderId, event: ProviderEvent) {
        let active = self
            .stores
            .session
            .with(|state| state.connected && state.provider == Some(provider));
        if !active {
            log::debug!("ignoring {event:?} from {provider}");
            return;
        }

        match event {
            ProviderEvent::AccountsChanged(accounts) if accounts.is_empty() => {
                self.reset_connection()
            }
            ProviderEvent::AccountsChanged(accounts) => {
                self.next_connection_epoch();
                self.stores.session.update(move |state| {
                    state.address = accounts[0].clone();
                    state.payment_address = accounts.get(1).unwrap_or(&accounts[0]).clone();
                    // the keys belonged to the previous account
                    state.public_key.clear();
                    state.payment_public_key.clear();
                    state.balance = None;
                    state.accounts = accounts;
                });
            }
            ProviderEvent::NetworkChanged(network) => self.commit_network(network),
            ProviderEvent::Disconnected => {
                log::info!("{provider} disconnected");
                self.reset_connection()
            }
        }
    }
}

fn complete_signed_psbt(mut signed: SignedPsbt) -> Result<SignedPsbt, Error> {
    match (
        signed.signed_psbt_hex.is_empty(),
        signed.signed_psbt_base64.is_empty(),
    ) {
        (true, true) | (false, false) => (),
        (true, false) => signed.signed_psbt_hex = psbt::to_hex(&signed.signed_psbt_base64)?,
        (false, true) => signed.signed_psbt_base64 = psbt::to_base64(&signed.signed_psbt_hex)?,
    }
    Ok(signed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ConnectionStatus,
        adapter::{Connection, mock::MockAdapter},
        error::RejectionCode,
    };
    use futures::{channel::oneshot, executor::block_on, join};
    use std::cell::RefCell;

    const ADDRESS: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
    const PSBT_HEX: &str = "70736274ff01000000";
    const PSBT_BASE64: &str = "cHNidP8BAAAA";

    fn client(adapters: &[Rc<MockAdapter>]) -> Client {
        client_with(Config::default(), adapters, Rc::new(|_: ProviderId| true))
    }

    fn client_with(config: Config, adapters: &[Rc<MockAdapter>], probe: Rc<dyn Probe>) -> Client {
        let adapters = adapters.iter().fold(AdapterSet::new(), |set, adapter| {
            set.with(Rc::clone(adapter) as Rc<dyn WalletAdapter>)
        });
        let client = Client::new(Stores::new(), config, adapters, probe);
        client.refresh_providers();
        client
    }

    fn unisat() -> Rc<MockAdapter> {
        Rc::new(MockAdapter::new(ProviderId::Unisat))
    }

    fn connected(adapter: &Rc<MockAdapter>) -> Client {
        let client = client(std::slice::from_ref(adapter));
        block_on(client.connect(adapter.provider)).unwrap();
        client
    }

    fn refused() -> Rejection {
        Rejection::new(RejectionCode::UserRejected, "nope")
    }

    #[test]
    fn initial_session() {
        let client = client(&[]);
        let session = client.session();

        assert!(!session.connected);
        assert_eq!(session.address, "");
        assert_eq!(session.balance, None);
        assert_eq!(session.network, NetworkId::Mainnet);
        assert_eq!(client.stores().library.get(), None);
        assert_eq!(block_on(client.get_network()), NetworkId::Mainnet);
    }

    #[test]
    fn connect_populates_the_session() {
        let adapter = unisat();
        *adapter.connection.borrow_mut() = Ok(Some(Connection {
            address: "bc1qxyz".to_owned(),
            public_key: "02ab".to_owned(),
            ..Connection::default()
        }));
        let client = connected(&adapter);
        let session = client.session();

        assert!(session.connected);
        assert!(!session.is_connecting);
        assert_eq!(session.provider, Some(ProviderId::Unisat));
        assert_eq!(session.address, "bc1qxyz");
        assert_eq!(session.public_key, "02ab");
        assert_eq!(session.payment_address, "bc1qxyz");
        assert_eq!(session.accounts, vec!["bc1qxyz".to_owned()]);
        assert!(session.is_consistent());
        assert_eq!(client.stores().library.get(), Some(ProviderId::Unisat));
    }

    #[test]
    fn connect_then_disconnect_is_the_initial_session() {
        let adapter = unisat();
        let client = client(std::slice::from_ref(&adapter));
        let initial = client.session();

        for _ in 0..3 {
            block_on(client.connect(ProviderId::Unisat)).unwrap();
            block_on(client.disconnect()).unwrap();
            assert_eq!(client.session(), initial);
        }
        assert_eq!(client.stores().library.get(), None);
    }

    #[test]
    fn connect_is_one_transition_after_the_pending_flag() {
        let adapter = unisat();
        let client = client(std::slice::from_ref(&adapter));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _subscription = {
            let seen = Rc::clone(&seen);
            client
                .stores()
                .session
                .subscribe(move |state| seen.borrow_mut().push(state.status()))
        };

        block_on(client.connect(ProviderId::Unisat)).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
        );
    }

    #[test]
    fn connect_unavailable_provider() {
        let adapter = unisat();
        let probe = Rc::new(|provider: ProviderId| provider != ProviderId::Unisat);
        let client = client_with(Config::default(), &[Rc::clone(&adapter)], probe);
        let before = client.session();

        assert!(matches!(
            block_on(client.connect(ProviderId::Unisat)),
            Err(Error::ProviderUnavailable(ProviderId::Unisat))
        ));
        // available but without adapter
        assert!(matches!(
            block_on(client.connect(ProviderId::Xverse)),
            Err(Error::ProviderUnavailable(ProviderId::Xverse))
        ));
        assert_eq!(client.session(), before);
        assert_eq!(adapter.calls.get(), 0);
    }

    #[test]
    fn connect_rejected() {
        let adapter = unisat();
        *adapter.connection.borrow_mut() = Err(refused());
        let client = client(std::slice::from_ref(&adapter));
        let before = client.session();

        let error = block_on(client.connect(ProviderId::Unisat)).unwrap_err();

        assert!(matches!(
            error,
            Error::AdapterRejected { provider: ProviderId::Unisat, rejection } if rejection == refused()
        ));
        assert_eq!(client.session(), before);
        assert_eq!(client.stores().library.get(), None);
    }

    #[test]
    fn connect_without_any_address_is_rejected() {
        let adapter = unisat();
        *adapter.connection.borrow_mut() = Ok(None);
        let client = client(std::slice::from_ref(&adapter));

        assert!(matches!(
            block_on(client.connect(ProviderId::Unisat)),
            Err(Error::AdapterRejected { .. })
        ));
        assert!(!client.session().connected);
        assert!(!client.session().is_connecting);
    }

    #[test]
    fn second_connect_while_pending() {
        let adapter = unisat();
        let (reply, gate) = oneshot::channel();
        *adapter.connection_gate.borrow_mut() = Some(gate);
        let client = client(std::slice::from_ref(&adapter));

        let (first, second) = block_on(async {
            join!(client.connect(ProviderId::Unisat), async {
                assert!(client.session().is_connecting);
                let second = client.connect(ProviderId::Unisat).await;
                reply
                    .send(Ok(Some(Connection {
                        address: ADDRESS.to_owned(),
                        ..Connection::default()
                    })))
                    .unwrap();
                second
            })
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(Error::AlreadyConnecting)));
        assert!(client.session().connected);
        assert_eq!(adapter.calls.get(), 1);
    }

    #[test]
    fn connect_to_another_provider_disconnects_first() {
        let unisat = unisat();
        let xverse = Rc::new(MockAdapter::new(ProviderId::Xverse));
        let client = client(&[Rc::clone(&unisat), Rc::clone(&xverse)]);

        block_on(client.connect(ProviderId::Unisat)).unwrap();
        block_on(client.connect(ProviderId::Xverse)).unwrap();

        let session = client.session();
        assert_eq!(session.provider, Some(ProviderId::Xverse));
        assert!(session.is_consistent());

        // connecting again to the same wallet is a no-op
        block_on(client.connect(ProviderId::Xverse)).unwrap();
        assert_eq!(xverse.calls.get(), 1);
    }

    #[test]
    fn operations_require_a_connection() {
        let adapter = unisat();
        let client = client(std::slice::from_ref(&adapter));

        block_on(async {
            assert!(matches!(client.disconnect().await, Err(Error::NotConnected)));
            assert!(matches!(client.get_balance().await, Err(Error::NotConnected)));
            assert!(matches!(client.get_inscriptions().await, Err(Error::NotConnected)));
            assert!(matches!(client.get_public_key().await, Err(Error::NotConnected)));
            assert!(matches!(client.request_accounts().await, Err(Error::NotConnected)));
            assert!(matches!(client.push_psbt(PSBT_HEX).await, Err(Error::NotConnected)));
            assert!(matches!(
                client.sign_message("hello", None).await,
                Err(Error::NotConnected)
            ));
            assert!(matches!(client.send_btc(ADDRESS, 1_000).await, Err(Error::NotConnected)));
            assert!(matches!(
                client.sign_psbt(PSBT_HEX, SignPsbtOptions::default()).await,
                Err(Error::NotConnected)
            ));
        });
        assert_eq!(adapter.calls.get(), 0);
    }

    #[test]
    fn absent_results_are_empty_values() {
        let adapter = unisat();
        let client = connected(&adapter);

        block_on(async {
            assert_eq!(client.get_balance().await.unwrap(), "");
            assert_eq!(client.get_inscriptions().await.unwrap(), Vec::<Inscription>::new());
            assert_eq!(client.get_public_key().await.unwrap(), "");
            assert_eq!(client.request_accounts().await.unwrap(), Vec::<String>::new());
            assert_eq!(client.push_psbt(PSBT_BASE64).await.unwrap(), "");
            assert_eq!(client.sign_message("hello", None).await.unwrap(), "");
            assert_eq!(client.send_btc(ADDRESS, 1_000).await.unwrap(), "");
            assert_eq!(
                client
                    .sign_psbt(PSBT_HEX, SignPsbtOptions::default())
                    .await
                    .unwrap(),
                SignedPsbt::default()
            );
        });
        assert_eq!(client.session().balance, None);
    }

    #[test]
    fn results_are_forwarded() {
        let adapter = unisat();
        *adapter.balance.borrow_mut() = Ok(Some(Amount::from_sat(21_000_000)));
        *adapter.public_key.borrow_mut() = Ok(Some("02ab".to_owned()));
        *adapter.txid.borrow_mut() = Ok(Some("txid".to_owned()));
        *adapter.accounts.borrow_mut() = Ok(Some(vec![ADDRESS.to_owned()]));
        let client = connected(&adapter);

        block_on(async {
            assert_eq!(client.get_balance().await.unwrap(), "21000000");
            assert_eq!(client.get_public_key().await.unwrap(), "02ab");
            assert_eq!(client.send_btc(ADDRESS, 1_000).await.unwrap(), "txid");
            assert_eq!(client.request_accounts().await.unwrap(), vec![ADDRESS.to_owned()]);
        });
        assert_eq!(client.session().balance, Some(Amount::from_sat(21_000_000)));
    }

    #[test]
    fn signed_psbt_has_both_encodings() {
        let adapter = unisat();
        *adapter.signed_psbt.borrow_mut() = Ok(Some(SignedPsbt {
            signed_psbt_hex: PSBT_HEX.to_owned(),
            ..SignedPsbt::default()
        }));
        let client = connected(&adapter);

        let signed = block_on(client.sign_psbt(PSBT_BASE64, SignPsbtOptions::default())).unwrap();
        assert_eq!(signed.signed_psbt_hex, PSBT_HEX);
        assert_eq!(signed.signed_psbt_base64, PSBT_BASE64);

        *adapter.signed_psbt.borrow_mut() = Ok(Some(SignedPsbt {
            signed_psbt_base64: "garbage".to_owned(),
            ..SignedPsbt::default()
        }));
        assert!(matches!(
            block_on(client.sign_psbt(PSBT_BASE64, SignPsbtOptions::default())),
            Err(Error::AdapterRejected { .. })
        ));
    }

    #[test]
    fn sign_psbt_rejected_leaves_the_session() {
        let adapter = unisat();
        *adapter.signed_psbt.borrow_mut() = Err(refused());
        let client = connected(&adapter);
        let before = client.session();

        assert!(matches!(
            block_on(client.sign_psbt(PSBT_HEX, SignPsbtOptions { finalize: true, broadcast: true })),
            Err(Error::AdapterRejected { provider: ProviderId::Unisat, .. })
        ));
        assert_eq!(client.session(), before);
    }

    #[test]
    fn invalid_arguments_fail_before_the_wallet() {
        let adapter = unisat();
        let client = connected(&adapter);
        let calls = adapter.calls.get();

        block_on(async {
            assert!(matches!(client.send_btc(ADDRESS, 0).await, Err(Error::InvalidArgument(_))));
            assert!(matches!(
                client.send_btc("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx", 1).await,
                Err(Error::InvalidArgument(_))
            ));
            assert!(matches!(client.sign_message("", None).await, Err(Error::InvalidArgument(_))));
            assert!(matches!(
                client.sign_message("hello", Some("bc1-nope")).await,
                Err(Error::InvalidArgument(_))
            ));
            assert!(matches!(client.push_psbt("").await, Err(Error::InvalidArgument(_))));
            assert!(matches!(
                client.sign_psbt("0200000001", SignPsbtOptions::default()).await,
                Err(Error::InvalidArgument(_))
            ));
        });
        assert_eq!(adapter.calls.get(), calls);
    }

    #[test]
    fn amounts_above_the_supply_are_refused() {
        let adapter = unisat();
        let client = connected(&adapter);
        let calls = adapter.calls.get();

        block_on(async {
            assert!(matches!(
                client.send_btc(ADDRESS, u64::MAX).await,
                Err(Error::InvalidArgument(_))
            ));
            assert!(matches!(
                client.send_btc(ADDRESS, 9_007_199_254_740_993).await,
                Err(Error::InvalidArgument(_))
            ));
        });
        assert_eq!(adapter.calls.get(), calls);

        block_on(client.send_btc(ADDRESS, Amount::MAX_MONEY.to_sat())).unwrap();
        assert_eq!(adapter.calls.get(), calls + 1);
    }

    #[test]
    fn provider_options_reach_the_adapter() {
        let unisat = unisat();
        let xverse = Rc::new(MockAdapter::new(ProviderId::Xverse));
        let config: Config = serde_json::from_value(serde_json::json! { {
            "providers": { "options": { "unisat": { "skipPublicKey": true } } },
        }})
        .unwrap();
        let client = client_with(
            config,
            &[Rc::clone(&unisat), Rc::clone(&xverse)],
            Rc::new(|_: ProviderId| true),
        );

        block_on(client.connect(ProviderId::Unisat)).unwrap();
        assert_eq!(
            *unisat.connect_options.borrow(),
            Some(serde_json::json! { { "skipPublicKey": true } })
        );

        block_on(client.connect(ProviderId::Xverse)).unwrap();
        assert_eq!(*xverse.connect_options.borrow(), None);
    }

    #[test]
    fn refused_switch_of_wallet_ends_disconnected() {
        let unisat = unisat();
        let xverse = Rc::new(MockAdapter::new(ProviderId::Xverse));
        *xverse.connection.borrow_mut() = Err(refused());
        let client = client(&[Rc::clone(&unisat), Rc::clone(&xverse)]);
        block_on(client.connect(ProviderId::Unisat)).unwrap();

        assert!(matches!(
            block_on(client.connect(ProviderId::Xverse)),
            Err(Error::AdapterRejected { provider: ProviderId::Xverse, .. })
        ));

        let session = client.session();
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(session.provider, None);
        assert!(session.is_consistent());
    }

    #[test]
    fn switch_network() {
        let adapter = unisat();
        let client = connected(&adapter);
        *adapter.balance.borrow_mut() = Ok(Some(Amount::from_sat(1_000)));
        block_on(client.get_balance()).unwrap();

        block_on(client.switch_network(NetworkId::Testnet4)).unwrap();

        let session = client.session();
        assert_eq!(session.network, NetworkId::Testnet4);
        assert_eq!(session.balance, None);
        assert!(session.connected);
        assert_eq!(client.stores().network.get(), NetworkId::Testnet4);
        assert_eq!(block_on(client.get_network()), NetworkId::Testnet4);
    }

    #[test]
    fn switch_network_without_wallet() {
        let client = client(&[]);
        block_on(client.switch_network(NetworkId::Signet)).unwrap();
        assert_eq!(client.session().network, NetworkId::Signet);
        assert!(!client.session().connected);
    }

    #[test]
    fn switch_to_an_unsupported_network() {
        let adapter = Rc::new(MockAdapter {
            networks: vec![NetworkId::Mainnet],
            ..MockAdapter::new(ProviderId::Okx)
        });
        let client = connected(&adapter);
        let before = client.session();

        assert!(matches!(
            block_on(client.switch_network(NetworkId::Testnet)),
            Err(Error::UnsupportedNetwork(network)) if network == "testnet"
        ));
        assert_eq!(client.session(), before);

        *adapter.switch.borrow_mut() = Err(refused());
        assert!(matches!(
            block_on(client.switch_network(NetworkId::Mainnet)),
            Err(Error::AdapterRejected { .. })
        ));
        assert_eq!(client.session(), before);
    }

    #[test]
    fn balance_read_before_a_network_switch_is_not_kept() {
        let adapter = unisat();
        let client = connected(&adapter);
        let (reply, gate) = oneshot::channel();
        *adapter.balance_gate.borrow_mut() = Some(gate);

        let (balance, switched) = block_on(async {
            join!(client.get_balance(), async {
                let switched = client.switch_network(NetworkId::Testnet).await;
                reply.send(Ok(Some(Amount::from_sat(5_000)))).unwrap();
                switched
            })
        });

        assert_eq!(balance.unwrap(), "5000");
        switched.unwrap();
        let session = client.session();
        assert_eq!(session.network, NetworkId::Testnet);
        assert_eq!(session.balance, None);
    }

    #[test]
    fn availability_is_independent_of_the_connection() {
        let installed = Rc::new(std::cell::Cell::new(true));
        let probe = {
            let installed = Rc::clone(&installed);
            move |provider: ProviderId| provider == ProviderId::Unisat || installed.get()
        };
        let adapter = unisat();
        let client = client_with(Config::default(), &[Rc::clone(&adapter)], Rc::new(probe));
        block_on(client.connect(ProviderId::Unisat)).unwrap();
        assert!(client.session().has_provider(ProviderId::Xverse));

        installed.set(false);
        client.refresh_providers();

        let session = client.session();
        assert!(!session.has_provider(ProviderId::Xverse));
        assert!(session.has_provider(ProviderId::Unisat));
        assert!(session.connected);
        assert_eq!(session.provider, Some(ProviderId::Unisat));
    }

    #[test]
    fn provider_events() {
        let adapter = unisat();
        let client = connected(&adapter);

        // not the connected wallet
        client.handle_event(ProviderId::Xverse, ProviderEvent::Disconnected);
        assert!(client.session().connected);

        client.handle_event(
            ProviderId::Unisat,
            ProviderEvent::AccountsChanged(vec!["bc1qother".to_owned()]),
        );
        let session = client.session();
        assert_eq!(session.address, "bc1qother");
        assert_eq!(session.payment_address, "bc1qother");
        assert_eq!(session.public_key, "");
        assert!(session.is_consistent());

        client.handle_event(
            ProviderId::Unisat,
            ProviderEvent::NetworkChanged(NetworkId::Signet),
        );
        assert_eq!(client.session().network, NetworkId::Signet);

        client.handle_event(ProviderId::Unisat, ProviderEvent::AccountsChanged(vec![]));
        assert!(!client.session().connected);
        assert_eq!(client.session().address, "");
    }

    #[test]
    fn externally_disconnected() {
        let adapter = unisat();
        let client = connected(&adapter);

        client.handle_event(ProviderId::Unisat, ProviderEvent::Disconnected);

        assert_eq!(client.session().status(), ConnectionStatus::Disconnected);
        assert_eq!(client.session().provider, None);
        assert!(matches!(block_on(client.get_balance()), Err(Error::NotConnected)));
    }

    #[test]
    fn initialize_reconnects() {
        let adapter = unisat();
        let config = Config {
            providers: crate::ProviderOptions {
                auto_connect: Some(ProviderId::Unisat),
                ..Default::default()
            },
            ..Config::default()
        };
        let client = Client::new(
            Stores::new(),
            config,
            AdapterSet::new().with(Rc::clone(&adapter) as Rc<dyn WalletAdapter>),
            Rc::new(|_: ProviderId| true),
        );
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _subscription = {
            let seen = Rc::clone(&seen);
            client
                .stores()
                .session
                .subscribe(move |state| seen.borrow_mut().push(state.is_initializing))
        };

        block_on(client.initialize()).unwrap();

        let session = client.session();
        assert!(session.connected);
        assert!(!session.is_initializing);
        assert!(session.has_provider(ProviderId::Unisat));
        assert_eq!(seen.borrow().first(), Some(&true));
        assert_eq!(seen.borrow().last(), Some(&false));
    }

    #[test]
    fn initialize_without_remembered_wallet() {
        let adapter = unisat();
        let client = client(std::slice::from_ref(&adapter));

        block_on(client.initialize()).unwrap();

        assert!(!client.session().connected);
        assert!(!client.session().is_initializing);
        assert_eq!(adapter.calls.get(), 0);
    }
}
