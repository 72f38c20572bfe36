use crate::{NetworkId, ProviderId, error::Rejection};
use async_trait::async_trait;
use bitcoin::Amount;
use std::{collections::BTreeMap, rc::Rc};

/// What a wallet returns once the user approved the connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Connection {
    pub address: String,
    /// may be left empty, the [`Client`](crate::Client) falls back to `address`
    pub payment_address: String,
    pub public_key: String,
    /// may be left empty, the [`Client`](crate::Client) falls back to `public_key`
    pub payment_public_key: String,
    pub accounts: Vec<String>,
}

impl Connection {
    pub(crate) fn normalize(mut self) -> Self {
        if self.payment_address.is_empty() {
            self.payment_address = self.address.clone();
        }
        if self.payment_public_key.is_empty() {
            self.payment_public_key = self.public_key.clone();
        }
        if self.accounts.is_empty() {
            self.accounts.push(self.address.clone());
            if self.payment_address != self.address {
                self.accounts.push(self.payment_address.clone());
            }
        }
        self
    }
}

/// An ordinal inscription owned by the connected wallet.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inscription {
    #[serde(alias = "inscriptionId")]
    pub id: String,
    #[serde(default, alias = "inscriptionNumber")]
    pub number: Option<i64>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// `txid:vout` of the output holding the inscription
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub output_value: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub genesis_transaction: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignPsbtOptions {
    /// finalize the inputs the wallet signed
    pub finalize: bool,
    /// let the wallet broadcast the finalized transaction
    pub broadcast: bool,
}

/// Result of signing a PSBT. Both encodings are always filled by the
/// [`Client`](crate::Client), or both empty if the wallet returned nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPsbt {
    pub signed_psbt_base64: String,
    pub signed_psbt_hex: String,
    /// transaction id, when the wallet also broadcast the transaction
    pub txid: Option<String>,
}

/// One implementation per wallet provider.
///
/// Each call returns `Ok(None)` when the wallet succeeded without handing
/// back any data, and `Err` only when the wallet actually failed. The
/// [`Client`](crate::Client) does the rest of the normalization.
#[async_trait(?Send)]
pub trait WalletAdapter {
    fn provider(&self) -> ProviderId;

    fn supports_network(&self, network: NetworkId) -> bool {
        let _ = network;
        true
    }

    /// prompt the user for access to their accounts
    ///
    /// `options` are the settings of this provider from
    /// [`ProviderOptions`](crate::ProviderOptions), as configured.
    async fn connect(
        &self,
        network: NetworkId,
        options: Option<&serde_json::Value>,
    ) -> Result<Option<Connection>, Rejection>;

    /// most wallets have no such notion, dropping the session is enough
    async fn disconnect(&self) -> Result<(), Rejection> {
        Ok(())
    }

    async fn request_accounts(&self) -> Result<Option<Vec<String>>, Rejection>;

    async fn get_balance(&self) -> Result<Option<Amount>, Rejection>;

    async fn get_inscriptions(&self) -> Result<Option<Vec<Inscription>>, Rejection>;

    async fn get_public_key(&self) -> Result<Option<String>, Rejection>;

    async fn push_psbt(&self, psbt: &str) -> Result<Option<String>, Rejection>;

    async fn sign_message(
        &self,
        message: &str,
        address: Option<&str>,
    ) -> Result<Option<String>, Rejection>;

    async fn send_btc(&self, to: &str, amount: Amount) -> Result<Option<String>, Rejection>;

    async fn sign_psbt(
        &self,
        psbt: &str,
        options: SignPsbtOptions,
    ) -> Result<Option<SignedPsbt>, Rejection>;

    async fn switch_network(&self, network: NetworkId) -> Result<(), Rejection>;
}

/// The adapters a [`Client`](crate::Client) may connect through.
#[derive(Clone, Default)]
pub struct AdapterSet {
    adapters: BTreeMap<ProviderId, Rc<dyn WalletAdapter>>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// register `adapter`, replacing the one for the same provider
    pub fn with(mut self, adapter: Rc<dyn WalletAdapter>) -> Self {
        self.insert(adapter);
        self
    }

    pub fn insert(&mut self, adapter: Rc<dyn WalletAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    pub fn get(&self, provider: ProviderId) -> Option<Rc<dyn WalletAdapter>> {
        self.adapters.get(&provider).cloned()
    }

    pub fn providers(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.adapters.keys().copied()
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn connection_fallbacks() {
        let connection = Connection {
            address: "bc1p-ordinals".to_owned(),
            public_key: "02ab".to_owned(),
            ..Connection::default()
        }
        .normalize();

        assert_eq!(connection.payment_address, "bc1p-ordinals");
        assert_eq!(connection.payment_public_key, "02ab");
        assert_eq!(connection.accounts, vec!["bc1p-ordinals".to_owned()]);

        let split = Connection {
            address: "bc1p-ordinals".to_owned(),
            payment_address: "bc1q-payment".to_owned(),
            ..Connection::default()
        }
        .normalize();
        assert_eq!(split.accounts, vec!["bc1p-ordinals", "bc1q-payment"]);
    }

    #[test]
    fn inscription_json() {
        let inscription: Inscription = serde_json::from_value(json! { {
            "inscriptionId": "6fb976ab49dcec017f1e201e84395983204ae1a7c2abf7ced0a85d692e442799i0",
            "inscriptionNumber": 959941,
            "address": "bc1pyz0d2ymcjtjdpqkt9fqhf5l5ypqxxy0ufmew3zxyhxkvu2jtv6ts9xdflz",
            "outputValue": 546,
            "contentType": "image/png",
            "output": "6fb976ab49dcec017f1e201e84395983204ae1a7c2abf7ced0a85d692e442799:0",
            "offset": 0,
            "timestamp": 1680865285,
        }})
        .unwrap();

        assert_eq!(inscription.number, Some(959941));
        assert_eq!(inscription.output_value, Some(546));
        assert_eq!(inscription.content_type.as_deref(), Some("image/png"));
        assert_eq!(inscription.genesis_transaction, None);
    }

    #[test]
    fn adapter_set_replaces_by_provider() {
        let set = AdapterSet::new()
            .with(Rc::new(mock::MockAdapter::new(ProviderId::Unisat)))
            .with(Rc::new(mock::MockAdapter::new(ProviderId::Unisat)))
            .with(Rc::new(mock::MockAdapter::new(ProviderId::Xverse)));

        assert_eq!(
            set.providers().collect::<Vec<_>>(),
            vec![ProviderId::Unisat, ProviderId::Xverse]
        );
        assert!(set.get(ProviderId::Okx).is_none());
    }
}
