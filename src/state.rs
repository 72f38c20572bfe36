use crate::{NetworkId, ProviderId, adapter::Connection};
use bitcoin::Amount;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// The unified state of the wallet session.
///
/// Only the [`Client`](crate::Client) mutates it, always through one
/// [`Store::update`](crate::Store::update) per transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub address: String,
    pub payment_address: String,
    pub public_key: String,
    pub payment_public_key: String,
    pub accounts: Vec<String>,
    /// last balance read from the wallet, `None` until the first read
    pub balance: Option<Amount>,
    pub connected: bool,
    pub is_connecting: bool,
    pub is_initializing: bool,
    pub provider: Option<ProviderId>,
    pub has_provider: BTreeMap<ProviderId, bool>,
    pub network: NetworkId,
}

impl SessionState {
    pub fn new(network: NetworkId) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        if self.connected {
            ConnectionStatus::Connected
        } else if self.is_connecting || self.is_initializing {
            ConnectionStatus::Connecting
        } else {
            ConnectionStatus::Disconnected
        }
    }

    pub fn has_provider(&self, provider: ProviderId) -> bool {
        self.has_provider.get(&provider).copied().unwrap_or(false)
    }

    /// check the relations between the connection fields hold
    pub fn is_consistent(&self) -> bool {
        let busy = !(self.is_connecting && self.is_initializing);
        let connected = !self.connected
            || (self.provider.is_some()
                && !self.address.is_empty()
                && !self.is_connecting
                && !self.is_initializing);
        busy && connected
    }

    pub(crate) fn apply_connection(&mut self, provider: ProviderId, connection: Connection) {
        self.address = connection.address;
        self.payment_address = connection.payment_address;
        self.public_key = connection.public_key;
        self.payment_public_key = connection.payment_public_key;
        self.accounts = connection.accounts;
        self.balance = None;
        self.provider = Some(provider);
        self.connected = true;
        self.is_connecting = false;
        self.is_initializing = false;
    }

    /// forget everything about the connected wallet, keeps the network and
    /// the providers' availability
    pub(crate) fn clear_connection(&mut self) {
        *self = Self {
            network: self.network,
            has_provider: std::mem::take(&mut self.has_provider),
            is_initializing: self.is_initializing,
            ..Self::default()
        };
    }
}
