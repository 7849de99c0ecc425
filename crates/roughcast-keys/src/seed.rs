use std::fmt::{Debug, Formatter};

use roughcast_common::crypto::random_bytes;
use roughcast_protocol::SEED_LENGTH;
use zeroize::ZeroizeOnDrop;

use crate::KeyError;

/// The 32-byte secret a long-term key pair is derived from. Wiped from
/// memory on drop and never printed.
#[derive(ZeroizeOnDrop)]
pub struct Seed {
    value: Vec<u8>,
}

impl Seed {
    pub fn new(value: &[u8]) -> Result<Seed, KeyError> {
        if value.len() != SEED_LENGTH {
            return Err(KeyError::WrongSeedLength {
                expected: SEED_LENGTH,
                actual: value.len(),
            });
        }

        Ok(Seed {
            value: Vec::from(value),
        })
    }

    pub fn new_random() -> Seed {
        Seed {
            value: Vec::from(random_bytes::<SEED_LENGTH>()),
        }
    }

    pub fn expose(&self) -> &[u8] {
        &self.value
    }
}

impl Debug for Seed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Seed(len={})", self.value.len())
    }
}
