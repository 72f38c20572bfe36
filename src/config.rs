use crate::{NetworkId, ProviderId, error::Error};
use std::collections::BTreeMap;
use wasm_bindgen::JsValue;

/// Configuration of a [`Client`](crate::Client).
///
/// Every field has a default, so `{}` (or no configuration at all) is a
/// mainnet configuration.
#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub network: NetworkId,
    pub providers: ProviderOptions,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderOptions {
    /// provider the application remembers the user connected with, it is
    /// reconnected by [`Client::initialize`](crate::Client::initialize)
    pub auto_connect: Option<ProviderId>,
    /// adapter specific settings, handed as is to
    /// [`WalletAdapter::connect`](crate::WalletAdapter::connect)
    pub options: BTreeMap<ProviderId, serde_json::Value>,
}

impl Config {
    pub fn new(network: NetworkId) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// the given configuration or, if absent, the default one
    pub fn resolve(config: Option<Config>) -> Self {
        config.unwrap_or_default()
    }

    /// decode the configuration object handed over by the javascript side
    ///
    /// `undefined` and `null` resolve to the default configuration.
    pub fn from_js(value: JsValue) -> Result<Self, Error> {
        let config: Option<Config> = serde_wasm_bindgen::from_value(value)?;
        Ok(Self::resolve(config))
    }

    pub fn provider_options(&self, provider: ProviderId) -> Option<&serde_json::Value> {
        self.providers.options.get(&provider)
    }
}
