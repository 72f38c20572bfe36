use crate::{NetworkId, ProviderId};

/// Errors returned by the [`Client`](crate::Client) operations.
///
/// All the variants but [`Error::AdapterRejected`] are detected before any
/// wallet is called and leave the session untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Wallet provider `{0}' is not available.")]
    ProviderUnavailable(ProviderId),
    #[error("No wallet connected.")]
    NotConnected,
    #[error("Wallet `{provider}' rejected the request: {rejection}")]
    AdapterRejected {
        provider: ProviderId,
        #[source]
        rejection: Rejection,
    },
    #[error("Unsupported network `{0}'.")]
    UnsupportedNetwork(String),
    #[error("Invalid argument: {0}.")]
    InvalidArgument(String),
    /// a connection attempt (or the initialization) is still pending
    #[error("A connection is already in progress.")]
    AlreadyConnecting,
    #[error("Couldn't convert from/to javascript: {0}")]
    Serialization(String),
}

// `serde_wasm_bindgen::Error` wraps a `JsValue`, which is neither `Send` nor `Sync`
impl From<serde_wasm_bindgen::Error> for Error {
    fn from(error: serde_wasm_bindgen::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl Error {
    pub(crate) fn unsupported_network(network: NetworkId) -> Self {
        Self::UnsupportedNetwork(network.to_string())
    }
}

/// Error codes wallets attach to the errors they throw. Most injected Bitcoin
/// wallets reuse the EIP-1193 provider codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum RejectionCode {
    #[error("The user rejected the request.")]
    UserRejected,
    #[error("The requested method or account has not been authorized by the user.")]
    Unauthorized,
    #[error("The wallet does not support the requested method.")]
    UnsupportedMethod,
    #[error("The wallet is disconnected.")]
    Disconnected,
    #[error("The wallet is not connected to the requested chain.")]
    ChainDisconnected,
    #[error("Invalid method parameters.")]
    InvalidParams,
    #[error("An error occured inside the wallet.")]
    Internal,
    #[error("Unknown error code `{0}'")]
    Unknown(i64),
}

/// What a wallet threw (or rejected its promise with).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error, serde::Deserialize,
)]
#[error("{}{message}", code_prefix(.code))]
pub struct Rejection {
    #[serde(default)]
    pub code: Option<RejectionCode>,
    #[serde(default, alias = "info")]
    pub message: String,
}

impl Rejection {
    pub fn new(code: RejectionCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(RejectionCode::Internal, message)
    }
}

fn code_prefix(code: &Option<RejectionCode>) -> String {
    code.map(|code| format!("{code} ")).unwrap_or_default()
}

impl<'de> serde::Deserialize<'de> for RejectionCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;
        impl serde::de::Visitor<'_> for Visitor {
            type Value = RejectionCode;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "Expecting an integer RejectionCode")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match v {
                    4001 => Ok(RejectionCode::UserRejected),
                    4100 => Ok(RejectionCode::Unauthorized),
                    4200 => Ok(RejectionCode::UnsupportedMethod),
                    4900 => Ok(RejectionCode::Disconnected),
                    4901 => Ok(RejectionCode::ChainDisconnected),
                    -32602 => Ok(RejectionCode::InvalidParams),
                    -32603 => Ok(RejectionCode::Internal),
                    unknown => Ok(RejectionCode::Unknown(unknown)),
                }
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let v = i64::try_from(v).map_err(E::custom)?;
                self.visit_i64(v)
            }

            // javascript only has doubles
            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v.fract() != 0.0 {
                    return Err(E::custom(format!("non integer error code {v}")));
                }
                self.visit_i64(v as i64)
            }
        }

        deserializer.deserialize_i64(Visitor)
    }
}
