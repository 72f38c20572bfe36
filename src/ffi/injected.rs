use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    /// The bitcoin API object injected by Unisat (`window.unisat`) and the
    /// wallets mimicking it (`window.okxwallet.bitcoin`, `window.wizz`).
    #[derive(Clone, PartialEq)]
    pub type InjectedBitcoin;

    /// OKX only: prompt the user and returns `{ address, publicKey }`.
    #[wasm_bindgen(method, catch, js_name = "connect")]
    pub async fn connect(this: &InjectedBitcoin) -> Result<JsValue, JsValue>;

    /// Prompt the user for access to their accounts, resolves to the list of
    /// addresses of the current account.
    #[wasm_bindgen(method, catch, js_name = "requestAccounts")]
    pub async fn request_accounts(this: &InjectedBitcoin) -> Result<JsValue, JsValue>;

    /// hexadecimal public key of the current account
    #[wasm_bindgen(method, catch, js_name = "getPublicKey")]
    pub async fn get_public_key(this: &InjectedBitcoin) -> Result<JsValue, JsValue>;

    /// Resolves to `{ confirmed, unconfirmed, total }`, in satoshis.
    #[wasm_bindgen(method, catch, js_name = "getBalance")]
    pub async fn get_balance(this: &InjectedBitcoin) -> Result<JsValue, JsValue>;

    /// Resolves to `{ total, list }`, `list` being the page of inscriptions
    /// starting at `cursor`.
    #[wasm_bindgen(method, catch, js_name = "getInscriptions")]
    pub async fn get_inscriptions(
        this: &InjectedBitcoin,
        cursor: u32,
        size: u32,
    ) -> Result<JsValue, JsValue>;

    /// `kind` is `"ecdsa"` or `"bip322-simple"`, the signature is base64
    /// encoded.
    #[wasm_bindgen(method, catch, js_name = "signMessage")]
    pub async fn sign_message(
        this: &InjectedBitcoin,
        message: &str,
        kind: &str,
    ) -> Result<JsValue, JsValue>;

    /// `options` is `{ autoFinalized }`, the PSBT is hexadecimal in both
    /// directions.
    #[wasm_bindgen(method, catch, js_name = "signPsbt")]
    pub async fn sign_psbt(
        this: &InjectedBitcoin,
        psbt_hex: &str,
        options: JsValue,
    ) -> Result<JsValue, JsValue>;

    /// Broadcast the finalized PSBT, resolves to the transaction id.
    #[wasm_bindgen(method, catch, js_name = "pushPsbt")]
    pub async fn push_psbt(this: &InjectedBitcoin, psbt_hex: &str) -> Result<JsValue, JsValue>;

    /// Build, sign and broadcast a payment, resolves to the transaction id.
    #[wasm_bindgen(method, catch, js_name = "sendBitcoin")]
    pub async fn send_bitcoin(
        this: &InjectedBitcoin,
        to: &str,
        satoshis: f64,
    ) -> Result<JsValue, JsValue>;

    /// Unisat: `chain` is one of `BITCOIN_MAINNET`, `BITCOIN_TESTNET`,
    /// `BITCOIN_TESTNET4`, `BITCOIN_SIGNET`, `FRACTAL_BITCOIN_MAINNET` or
    /// `FRACTAL_BITCOIN_TESTNET`.
    #[wasm_bindgen(method, catch, js_name = "switchChain")]
    pub async fn switch_chain(this: &InjectedBitcoin, chain: &str) -> Result<JsValue, JsValue>;

    /// Older API: `network` is `livenet` or `testnet`.
    #[wasm_bindgen(method, catch, js_name = "switchNetwork")]
    pub async fn switch_network(this: &InjectedBitcoin, network: &str)
    -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = "disconnect")]
    pub async fn disconnect(this: &InjectedBitcoin) -> Result<JsValue, JsValue>;
}
