use crate::error::Error;
use core::{fmt, str::FromStr};

/// The browser wallet applications this crate knows how to talk to.
///
/// The textual form (see [`ProviderId::as_str`]) is the one used in
/// configuration objects and in the [`Snapshot`](crate::Snapshot).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    Leather,
    MagicEden,
    Okx,
    Oyl,
    Phantom,
    Unisat,
    Wizz,
    Xverse,
}

impl ProviderId {
    pub const ALL: [ProviderId; 8] = [
        ProviderId::Leather,
        ProviderId::MagicEden,
        ProviderId::Okx,
        ProviderId::Oyl,
        ProviderId::Phantom,
        ProviderId::Unisat,
        ProviderId::Wizz,
        ProviderId::Xverse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Leather => "leather",
            ProviderId::MagicEden => "magic-eden",
            ProviderId::Okx => "okx",
            ProviderId::Oyl => "oyl",
            ProviderId::Phantom => "phantom",
            ProviderId::Unisat => "unisat",
            ProviderId::Wizz => "wizz",
            ProviderId::Xverse => "xverse",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|provider| provider.as_str() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("Unknown wallet provider `{s}'")))
    }
}
