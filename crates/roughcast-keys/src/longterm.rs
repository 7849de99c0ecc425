//! The server's long-term identity.
//!
//! The long-term key signs only delegation certificates; every response
//! signature comes from a short-lived online key. Clients know the server
//! by this key's 32 public bytes (or their SRV commitment).

use std::fmt::{self, Display, Formatter};

use data_encoding::HEXLOWER;
use roughcast_common::crypto::srv_commitment;
use roughcast_protocol::message::Message;
use roughcast_protocol::tag::Tag;
use roughcast_protocol::{PUBKEY_LENGTH, wire};

use crate::KeyError;
use crate::seed::Seed;
use crate::signer::ContextSigner;

pub struct LongTermKey {
    signer: ContextSigner,
    srv_value: [u8; 32],
}

impl LongTermKey {
    pub fn from_seed(seed: &Seed) -> Result<LongTermKey, KeyError> {
        let signer = ContextSigner::from_seed(seed)?;
        let srv_value = srv_commitment(&signer.public_key_bytes());

        Ok(LongTermKey { signer, srv_value })
    }

    pub fn generate() -> LongTermKey {
        LongTermKey::from_seed(&Seed::new_random()).expect("random seed is valid")
    }

    pub fn public_key_bytes(&self) -> [u8; PUBKEY_LENGTH] {
        self.signer.public_key_bytes()
    }

    /// `SHA512(0xff || public_key)[0..32]`; what clients put in SRV.
    pub fn srv_value(&self) -> &[u8; 32] {
        &self.srv_value
    }

    /// Build a CERT delegating to `online_pub` for the window
    /// `[mint, maxt]`, signed over `context || DELE`. The bounds are
    /// already in the target timescale.
    pub fn make_cert(
        &mut self,
        context: &[u8],
        online_pub: &[u8; PUBKEY_LENGTH],
        mint: u64,
        maxt: u64,
    ) -> Vec<u8> {
        let mut dele = Message::with_capacity(3);
        dele.insert(Tag::PUBK, online_pub).expect("distinct tags");
        dele.insert(Tag::MINT, &wire::encode_u64(mint))
            .expect("distinct tags");
        dele.insert(Tag::MAXT, &wire::encode_u64(maxt))
            .expect("distinct tags");
        let dele_bytes = dele.encode();

        let signature = self.signer.sign_with_context(context, &dele_bytes);

        let mut cert = Message::with_capacity(2);
        cert.insert(Tag::SIG, &signature).expect("distinct tags");
        cert.insert(Tag::DELE, &dele_bytes).expect("distinct tags");
        cert.encode()
    }
}

impl Display for LongTermKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HEXLOWER.encode(&self.public_key_bytes()))
    }
}
