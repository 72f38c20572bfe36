/*!

# Bitcoin Connector for browser wallets

This library is meant to be used for web applications that need to interact with
Bitcoin browser wallets (Unisat, Xverse, Leather, OKX, Magic Eden, ...). Each wallet
has its own API: different connection prompts, address and key formats, balance
units, PSBT encodings. This crate puts them behind one session with one set of
operations.

## Features

- Detect the installed wallets
- Connect, disconnect and follow account and network changes
- Read the balance, the public key and the inscriptions
- Sign messages and PSBTs, send and broadcast transactions
- One observable snapshot of the whole session for the user interface

## Usage

The [`ContextProvider`] builds one [`WalletContext`] per configuration. In the
browser, [`ContextProvider::browser`] looks for the wallets in `window`:

```no_run
use bitcoin_connector::{Config, ContextProvider, NetworkId, ProviderId};

# async fn test() -> anyhow::Result<()> {
let provider = ContextProvider::browser();
let context = provider.context(Some(&Config::new(NetworkId::Mainnet)));

if context.has_provider(ProviderId::Unisat) {
    context.connect(ProviderId::Unisat).await?;
    println!("balance: {} sats", context.get_balance().await?);
}
# Ok(()) }
```

The user interface keeps itself up to date by subscribing to the context:

```no_run
# use bitcoin_connector::ContextProvider;
# let context = ContextProvider::browser().context(None);
let _subscription = context.subscribe(|snapshot| {
    println!("connected: {} ({})", snapshot.connected, snapshot.address);
});
```

Account and network changes made in the wallet itself are followed with
[`InjectedWallet::watch`]; the listeners stay registered as long as the returned
[`EventWatch`] is kept.

Other wallets are supported by implementing [`WalletAdapter`] and registering the
adapter in the [`AdapterSet`] given to [`ContextProvider::new`].

*/

pub mod adapter;
mod client;
mod config;
mod context;
pub mod error;
pub mod ffi;
mod injected;
mod network;
mod provider;
pub mod psbt;
mod registry;
mod state;
mod store;

pub use self::{
    adapter::{AdapterSet, Connection, Inscription, SignPsbtOptions, SignedPsbt, WalletAdapter},
    client::{Client, ProviderEvent, Stores},
    config::{Config, ProviderOptions},
    context::{ContextProvider, Snapshot, WalletContext},
    error::Error,
    injected::{EventWatch, InjectedWallet, WindowProbe, injected_adapters},
    network::NetworkId,
    provider::ProviderId,
    registry::{Availability, CapabilityRegistry, Probe},
    state::{ConnectionStatus, SessionState},
    store::{Store, Subscription},
};
