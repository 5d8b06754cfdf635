//! # Typed-Data Hasher (EIP-712)
//!
//! Operation and message hashes bound to one account on one chain:
//!
//! ```text
//! hash = keccak256(0x19 ++ 0x01 ++ domainSeparator ++ structHash)
//! domainSeparator = keccak256(abi.encode(DOMAIN_TYPEHASH, keccak("MultiSigWallet"),
//!                                        keccak("2"), chainId, account))
//! ```
//!
//! Operations and messages use different struct types, so a signature over
//! one can never be replayed as the other.

use crate::domain::abi::{encode, Token};
use crate::domain::entities::Operation;
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Hash, U256};

/// EIP-712 domain name.
pub const DOMAIN_NAME: &str = "MultiSigWallet";
/// EIP-712 domain version.
pub const DOMAIN_VERSION: &str = "2";

/// Domain struct type.
pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
/// Operation struct type.
pub const TRANSACTION_TYPE: &str =
    "Transaction(address destination,uint256 value,bytes data,uint8 operation,uint256 nonce)";
/// Off-chain message struct type.
pub const MESSAGE_TYPE: &str = "NXVMessage(bytes message)";

/// Hasher for one `(chain, account)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypedDataHasher {
    chain_id: U256,
    account: Address,
}

impl TypedDataHasher {
    /// Hasher for `account` on `chain_id`.
    #[must_use]
    pub fn new(chain_id: u64, account: Address) -> Self {
        Self {
            chain_id: U256::from(chain_id),
            account,
        }
    }

    /// Account the hashes are bound to.
    #[must_use]
    pub fn account(&self) -> Address {
        self.account
    }

    /// EIP-712 domain separator.
    #[must_use]
    pub fn domain_separator(&self) -> Hash {
        keccak256(&encode(&[
            Token::FixedBytes(keccak256(DOMAIN_TYPE.as_bytes())),
            Token::FixedBytes(keccak256(DOMAIN_NAME.as_bytes())),
            Token::FixedBytes(keccak256(DOMAIN_VERSION.as_bytes())),
            Token::Uint(self.chain_id),
            Token::Address(self.account),
        ]))
    }

    /// `hashStruct(Transaction)`.
    #[must_use]
    pub fn transaction_struct_hash(&self, op: &Operation) -> Hash {
        keccak256(&encode(&[
            Token::FixedBytes(keccak256(TRANSACTION_TYPE.as_bytes())),
            Token::Address(op.destination),
            Token::Uint(op.value),
            Token::FixedBytes(keccak256(op.data.as_slice())),
            Token::Uint(U256::from(op.operation.as_u8())),
            Token::Uint(op.nonce),
        ]))
    }

    /// 66-byte preimage `0x1901 ++ domainSeparator ++ structHash` of an operation.
    #[must_use]
    pub fn encode_transaction_data(&self, op: &Operation) -> Vec<u8> {
        self.preimage(self.transaction_struct_hash(op))
    }

    /// Hash the owners sign to authorize `op`.
    #[must_use]
    pub fn transaction_hash(&self, op: &Operation) -> Hash {
        keccak256(&self.encode_transaction_data(op))
    }

    /// Hash of an off-chain message, as approved by `signMessage`.
    #[must_use]
    pub fn message_hash(&self, message: &[u8]) -> Hash {
        let struct_hash = keccak256(&encode(&[
            Token::FixedBytes(keccak256(MESSAGE_TYPE.as_bytes())),
            Token::FixedBytes(keccak256(message)),
        ]));
        keccak256(&self.preimage(struct_hash))
    }

    fn preimage(&self, struct_hash: Hash) -> Vec<u8> {
        let mut out = Vec::with_capacity(66);
        out.extend_from_slice(&[0x19, 0x01]);
        out.extend_from_slice(self.domain_separator().as_bytes());
        out.extend_from_slice(struct_hash.as_bytes());
        out
    }
}
