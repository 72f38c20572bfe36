/*!
Adapters for the wallets exposing the Unisat bitcoin API in `window`.

Unisat, OKX and Wizz inject objects with the same methods (`requestAccounts`,
`getBalance`, `signPsbt`, ...). They only differ in where the object lives,
how the network is switched and, for OKX, how the connection is requested.
*/

use crate::{
    Client, ContextProvider, NetworkId, ProviderEvent, ProviderId,
    adapter::{AdapterSet, Connection, Inscription, SignPsbtOptions, SignedPsbt, WalletAdapter},
    error::{Rejection, RejectionCode},
    ffi::{InjectedBitcoin, window},
    psbt,
    registry::Probe,
};
use async_trait::async_trait;
use bitcoin::{Amount, amount::Denomination};
use serde::de::DeserializeOwned;
use std::rc::{Rc, Weak};
use wasm_bindgen::{JsValue, prelude::Closure};

const INSCRIPTIONS_PAGE: u32 = 100;
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedWallet {
    provider: ProviderId,
}

/// the adapters of every wallet of this module
pub fn injected_adapters() -> AdapterSet {
    AdapterSet::new()
        .with(Rc::new(InjectedWallet::unisat()))
        .with(Rc::new(InjectedWallet::okx()))
        .with(Rc::new(InjectedWallet::wizz()))
}

impl ContextProvider {
    /// contexts detecting the wallets in `window` and connecting through the
    /// [`InjectedWallet`] adapters
    pub fn browser() -> Self {
        ContextProvider::new(injected_adapters(), Rc::new(WindowProbe))
    }
}

fn rejection(error: JsValue) -> Rejection {
    serde_wasm_bindgen::from_value(error.clone()).unwrap_or_else(|decode_error| {
        Rejection::internal(format!(
            "Couldn't decode the error content: {decode_error} ({error:?})"
        ))
    })
}

/// `undefined` and `null` decode to `None`
fn decode<T: DeserializeOwned>(value: JsValue) -> Result<Option<T>, Rejection> {
    serde_wasm_bindgen::from_value(value).map_err(|decode_error| {
        Rejection::internal(format!("Unexpected value returned by the wallet: {decode_error}"))
    })
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Sats {
    Number(f64),
    Text(String),
}

impl Sats {
    fn amount(self) -> Result<Amount, Rejection> {
        match self {
            // integers above 2^53 are already rounded by javascript
            Sats::Number(sats) if sats >= 0.0 && sats.fract() == 0.0 && sats <= MAX_SAFE_INTEGER => {
                Ok(Amount::from_sat(sats as u64))
            }
            Sats::Number(sats) => Err(Rejection::internal(format!("Invalid balance {sats}"))),
            Sats::Text(sats) => Amount::from_str_in(sats.trim(), Denomination::Satoshi)
                .map_err(|error| Rejection::internal(format!("Invalid balance `{sats}': {error}"))),
        }
    }
}

#[derive(serde::Deserialize)]
struct Balance {
    total: Option<Sats>,
    confirmed: Option<Sats>,
}

impl Balance {
    /// the total, or the confirmed part when the wallet only reports that
    fn amount(self) -> Result<Option<Amount>, Rejection> {
        self.total.or(self.confirmed).map(Sats::amount).transpose()
    }
}

#[derive(serde::Deserialize)]
struct InscriptionPage {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    list: Vec<Inscription>,
}

/// A failed broadcast does not lose the signature: the signed PSBT is still
/// returned, without transaction id.
fn broadcast_txid(
    provider: ProviderId,
    pushed: Result<Option<String>, Rejection>,
) -> Option<String> {
    pushed.unwrap_or_else(|rejection| {
        log::warn!("{provider} signed the PSBT but did not broadcast it: {rejection}");
        None
    })
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct OkxConnection {
    address: String,
    #[serde(default, alias = "compressedPublicKey")]
    public_key: String,
}

/// Settings read from the `providers.options` entry of the wallet.
#[derive(Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConnectOptions {
    /// do not ask for the public key when connecting
    skip_public_key: bool,
}

impl ConnectOptions {
    fn from_config(options: Option<&serde_json::Value>) -> Result<Self, Rejection> {
        options
            .map(|options| {
                serde_json::from_value(options.clone()).map_err(|error| {
                    Rejection::new(
                        RejectionCode::InvalidParams,
                        format!("Invalid provider options: {error}"),
                    )
                })
            })
            .transpose()
            .map(Option::unwrap_or_default)
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SignOptions {
    auto_finalized: bool,
}

impl InjectedWallet {
    pub fn unisat() -> Self {
        Self {
            provider: ProviderId::Unisat,
        }
    }

    pub fn okx() -> Self {
        Self {
            provider: ProviderId::Okx,
        }
    }

    pub fn wizz() -> Self {
        Self {
            provider: ProviderId::Wizz,
        }
    }

    fn path(&self) -> &'static [&'static str] {
        match self.provider {
            ProviderId::Okx => &["okxwallet", "bitcoin"],
            ProviderId::Wizz => &["wizz"],
            _ => &["unisat"],
        }
    }

    fn api(&self) -> Result<InjectedBitcoin, Rejection> {
        window::lookup_as(self.path()).ok_or_else(|| {
            Rejection::new(
                RejectionCode::Disconnected,
                format!("{} is not installed", self.provider),
            )
        })
    }

    /// forward the `accountsChanged` and `networkChanged` notifications of
    /// the wallet to `client`, until the returned value is dropped
    pub fn watch(&self, client: &Rc<Client>) -> Option<EventWatch> {
        let api: JsValue = self.api().ok()?.into();
        if !window::has_method(&api, "on") {
            return None;
        }
        let provider = self.provider;

        let accounts_changed = {
            let client: Weak<Client> = Rc::downgrade(client);
            Closure::<dyn Fn(JsValue)>::new(move |accounts: JsValue| {
                let Some(client) = client.upgrade() else {
                    return;
                };
                let accounts = decode::<Vec<String>>(accounts)
                    .ok()
                    .flatten()
                    .unwrap_or_default();
                client.handle_event(provider, ProviderEvent::AccountsChanged(accounts));
            })
        };
        let network_changed = {
            let client: Weak<Client> = Rc::downgrade(client);
            Closure::<dyn Fn(JsValue)>::new(move |network: JsValue| {
                let Some(client) = client.upgrade() else {
                    return;
                };
                match network.as_string().as_deref() {
                    Some("livenet") => {
                        client.handle_event(provider, ProviderEvent::NetworkChanged(NetworkId::Mainnet))
                    }
                    Some("testnet") => {
                        client.handle_event(provider, ProviderEvent::NetworkChanged(NetworkId::Testnet))
                    }
                    other => log::warn!("{provider} switched to an unknown network {other:?}"),
                }
            })
        };

        let watch = EventWatch {
            api,
            accounts_changed,
            network_changed,
        };
        watch.call("on");
        Some(watch)
    }
}

/// Listeners registered by [`InjectedWallet::watch`], removed on drop.
pub struct EventWatch {
    api: JsValue,
    accounts_changed: Closure<dyn Fn(JsValue)>,
    network_changed: Closure<dyn Fn(JsValue)>,
}

impl EventWatch {
    fn call(&self, method: &str) {
        let Ok(function) = js_sys::Reflect::get(&self.api, &JsValue::from_str(method)) else {
            return;
        };
        let function: js_sys::Function = function.into();

        for (event, listener) in [
            ("accountsChanged", &self.accounts_changed),
            ("networkChanged", &self.network_changed),
        ] {
            if let Err(error) = function.call2(&self.api, &JsValue::from_str(event), listener.as_ref())
            {
                log::warn!("Couldn't {method} `{event}': {error:?}");
            }
        }
    }
}

impl Drop for EventWatch {
    fn drop(&mut self) {
        if window::has_method(&self.api, "removeListener") {
            self.call("removeListener");
        }
    }
}

#[async_trait(?Send)]
impl WalletAdapter for InjectedWallet {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn supports_network(&self, network: NetworkId) -> bool {
        match self.provider {
            // the other networks are served by other objects
            ProviderId::Okx => network == NetworkId::Mainnet,
            ProviderId::Wizz => matches!(network, NetworkId::Mainnet | NetworkId::Testnet),
            _ => true,
        }
    }

    async fn connect(
        &self,
        _network: NetworkId,
        options: Option<&serde_json::Value>,
    ) -> Result<Option<Connection>, Rejection> {
        let api = self.api()?;
        let options = ConnectOptions::from_config(options)?;

        if self.provider == ProviderId::Okx {
            let connected = api.connect().await.map_err(rejection)?;
            return Ok(decode::<OkxConnection>(connected)?.map(|connected| Connection {
                address: connected.address,
                public_key: connected.public_key,
                ..Connection::default()
            }));
        }

        let accounts = api.request_accounts().await.map_err(rejection)?;
        let Some(accounts) = decode::<Vec<String>>(accounts)? else {
            return Ok(None);
        };
        let Some(address) = accounts.first().cloned() else {
            return Ok(None);
        };
        let public_key = if options.skip_public_key {
            String::new()
        } else {
            self.get_public_key().await?.unwrap_or_default()
        };

        Ok(Some(Connection {
            address,
            public_key,
            accounts,
            ..Connection::default()
        }))
    }

    async fn disconnect(&self) -> Result<(), Rejection> {
        let api = self.api()?;
        if window::has_method(&api, "disconnect") {
            api.disconnect().await.map_err(rejection)?;
        }
        Ok(())
    }

    async fn request_accounts(&self) -> Result<Option<Vec<String>>, Rejection> {
        let accounts = self.api()?.request_accounts().await.map_err(rejection)?;
        decode(accounts)
    }

    async fn get_balance(&self) -> Result<Option<Amount>, Rejection> {
        let balance = self.api()?.get_balance().await.map_err(rejection)?;
        match decode::<Balance>(balance)? {
            Some(balance) => balance.amount(),
            None => Ok(None),
        }
    }

    async fn get_inscriptions(&self) -> Result<Option<Vec<Inscription>>, Rejection> {
        let api = self.api()?;
        let mut inscriptions = Vec::new();

        loop {
            let cursor = u32::try_from(inscriptions.len()).unwrap_or(u32::MAX);
            let page = api
                .get_inscriptions(cursor, INSCRIPTIONS_PAGE)
                .await
                .map_err(rejection)?;
            let Some(page) = decode::<InscriptionPage>(page)? else {
                break;
            };
            let received = page.list.len();
            inscriptions.extend(page.list);

            if received == 0 || inscriptions.len() as u64 >= page.total {
                break;
            }
        }

        Ok(Some(inscriptions))
    }

    async fn get_public_key(&self) -> Result<Option<String>, Rejection> {
        let public_key = self.api()?.get_public_key().await.map_err(rejection)?;
        decode(public_key)
    }

    async fn push_psbt(&self, psbt: &str) -> Result<Option<String>, Rejection> {
        let psbt = psbt::to_hex(psbt)
            .map_err(|error| Rejection::new(RejectionCode::InvalidParams, error.to_string()))?;
        let txid = self.api()?.push_psbt(&psbt).await.map_err(rejection)?;
        decode(txid)
    }

    async fn sign_message(
        &self,
        message: &str,
        _address: Option<&str>,
    ) -> Result<Option<String>, Rejection> {
        let signature = self
            .api()?
            .sign_message(message, "ecdsa")
            .await
            .map_err(rejection)?;
        decode(signature)
    }

    async fn send_btc(&self, to: &str, amount: Amount) -> Result<Option<String>, Rejection> {
        let txid = self
            .api()?
            .send_bitcoin(to, amount.to_sat() as f64)
            .await
            .map_err(rejection)?;
        decode(txid)
    }

    async fn sign_psbt(
        &self,
        psbt: &str,
        options: SignPsbtOptions,
    ) -> Result<Option<SignedPsbt>, Rejection> {
        let api = self.api()?;
        let psbt = psbt::to_hex(psbt)
            .map_err(|error| Rejection::new(RejectionCode::InvalidParams, error.to_string()))?;
        let sign_options = serde_wasm_bindgen::to_value(&SignOptions {
            auto_finalized: options.finalize,
        })
        .map_err(|error| Rejection::internal(error.to_string()))?;

        let signed = api.sign_psbt(&psbt, sign_options).await.map_err(rejection)?;
        let Some(signed_psbt_hex) = decode::<String>(signed)? else {
            return Ok(None);
        };

        let txid = if options.broadcast {
            let pushed = match api.push_psbt(&signed_psbt_hex).await {
                Ok(txid) => decode(txid),
                Err(error) => Err(rejection(error)),
            };
            broadcast_txid(self.provider, pushed)
        } else {
            None
        };

        Ok(Some(SignedPsbt {
            signed_psbt_hex,
            txid,
            ..SignedPsbt::default()
        }))
    }

    async fn switch_network(&self, network: NetworkId) -> Result<(), Rejection> {
        let api = self.api()?;

        match self.provider {
            ProviderId::Okx => Ok(()),
            ProviderId::Wizz => {
                let name = if network == NetworkId::Mainnet { "livenet" } else { "testnet" };
                api.switch_network(name).await.map_err(rejection)?;
                Ok(())
            }
            _ => {
                let chain = match network {
                    NetworkId::Mainnet => "BITCOIN_MAINNET",
                    NetworkId::Testnet => "BITCOIN_TESTNET",
                    NetworkId::Testnet4 => "BITCOIN_TESTNET4",
                    NetworkId::Signet => "BITCOIN_SIGNET",
                    NetworkId::FractalMainnet => "FRACTAL_BITCOIN_MAINNET",
                    NetworkId::FractalTestnet => "FRACTAL_BITCOIN_TESTNET",
                };
                api.switch_chain(chain).await.map_err(rejection)?;
                Ok(())
            }
        }
    }
}

/// Detects the wallets from the objects their extension injects in `window`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowProbe;

impl WindowProbe {
    fn path(provider: ProviderId) -> &'static [&'static str] {
        match provider {
            ProviderId::Leather => &["LeatherProvider"],
            ProviderId::MagicEden => &["magicEden", "bitcoin"],
            ProviderId::Okx => &["okxwallet", "bitcoin"],
            ProviderId::Oyl => &["oyl"],
            ProviderId::Phantom => &["phantom", "bitcoin"],
            ProviderId::Unisat => &["unisat"],
            ProviderId::Wizz => &["wizz"],
            ProviderId::Xverse => &["XverseProviders", "BitcoinProvider"],
        }
    }
}

impl Probe for WindowProbe {
    fn is_available(&self, provider: ProviderId) -> bool {
        let Some(object) = window::lookup(Self::path(provider)) else {
            return false;
        };

        match provider {
            // must look like the API the injected adapters drive
            ProviderId::Unisat | ProviderId::Okx | ProviderId::Wizz => {
                window::has_method(&object, "requestAccounts")
                    && window::has_method(&object, "signPsbt")
            }
            _ => object.is_object(),
        }
    }
}
