pub mod injected;
pub mod window;

pub use self::injected::InjectedBitcoin;
