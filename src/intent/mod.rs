//! Intent construction: primitives, nonces, the salt cache and the payload builder.

pub mod nonce;
pub mod payload;
pub mod primitives;
pub mod salt;

pub use nonce::{decode_nonce, encode_nonce, encode_nonce_with_inner, Nonce, NonceError, VersionedNonce};
pub use payload::{
    IntentPayload, IntentPayloadBuilder, NoSigner, SignerBoundPayload, SignerField, WithSigner,
};
pub use primitives::{FtWithdraw, Intent, MtWithdraw, NativeWithdraw, NftWithdraw, TokenDiff, Transfer};
pub use salt::{Salt, SaltManager, SaltSource};
