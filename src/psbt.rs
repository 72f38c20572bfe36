//! PSBT payloads are passed through to the wallets untouched. We only make
//! sure they look like a PSBT (hex or base64 of bytes starting with the BIP-174
//! magic) and convert between the two encodings.

use crate::error::Error;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

const MAGIC: &[u8] = b"psbt\xff";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Hex,
    Base64,
}

/// detect the encoding of a PSBT payload and check it carries a PSBT
pub fn encoding(payload: &str) -> Result<Encoding, Error> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(Error::InvalidArgument("empty PSBT".to_owned()));
    }

    let (encoding, bytes) = if let Ok(bytes) = hex::decode(payload) {
        (Encoding::Hex, bytes)
    } else if let Ok(bytes) = BASE64.decode(payload) {
        (Encoding::Base64, bytes)
    } else {
        return Err(Error::InvalidArgument(
            "PSBT is neither hex nor base64 encoded".to_owned(),
        ));
    };

    if bytes.starts_with(MAGIC) {
        Ok(encoding)
    } else {
        Err(Error::InvalidArgument("missing PSBT magic bytes".to_owned()))
    }
}

pub fn to_hex(payload: &str) -> Result<String, Error> {
    match encoding(payload)? {
        Encoding::Hex => Ok(payload.trim().to_owned()),
        Encoding::Base64 => {
            let bytes = BASE64
                .decode(payload.trim())
                .map_err(|error| Error::InvalidArgument(format!("Invalid base64 PSBT: {error}")))?;
            Ok(hex::encode(bytes))
        }
    }
}

pub fn to_base64(payload: &str) -> Result<String, Error> {
    match encoding(payload)? {
        Encoding::Base64 => Ok(payload.trim().to_owned()),
        Encoding::Hex => {
            let bytes = hex::decode(payload.trim())
                .map_err(|error| Error::InvalidArgument(format!("Invalid hex PSBT: {error}")))?;
            Ok(BASE64.encode(bytes))
        }
    }
}
