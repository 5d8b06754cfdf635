//! # Batch Executor
//!
//! `multiSend(bytes)`: runs a packed list of sub-operations (see
//! `domain::batch`) left to right inside the calling wallet's context. The
//! first failing item fails the whole batch, so the host rolls every earlier
//! item back.

use crate::contracts::{dispatch, only_delegate_call};
use crate::domain::abi::{selector_table, AbiDecoder, AbiFunction, SelectorTable, Token};
use crate::domain::batch::BatchReader;
use crate::domain::entities::{ExecutionMode, SubOperation};
use crate::domain::value_objects::Bytes;
use crate::errors::{ExecutionError, ValidationError, WalletError};
use crate::ports::outbound::Contract;
use crate::vm::CallContext;
use tracing::debug;

/// Functions of the batch executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MultiSendFunction {
    /// `multiSend(bytes)`
    MultiSend,
}

impl AbiFunction for MultiSendFunction {
    const ALL: &'static [Self] = &[Self::MultiSend];

    fn signature(self) -> &'static str {
        "multiSend(bytes)"
    }

    fn selectors() -> &'static SelectorTable<Self> {
        selector_table!(MultiSendFunction)
    }
}

/// Calldata for `multiSend` over an already packed batch.
#[must_use]
pub fn encode_multi_send(packed: &[u8]) -> Bytes {
    MultiSendFunction::MultiSend.encode(&[Token::Bytes(packed.to_vec())])
}

/// Batch executor code; `call_only` refuses delegate-call items.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchExecutor {
    call_only: bool,
}

impl BatchExecutor {
    /// Executor allowing delegate-call items.
    #[must_use]
    pub fn new() -> Self {
        Self { call_only: false }
    }

    /// Executor rejecting delegate-call items.
    #[must_use]
    pub fn call_only() -> Self {
        Self { call_only: true }
    }

    fn run_item(&self, ctx: &mut CallContext<'_>, index: usize, item: &SubOperation) -> Result<(), WalletError> {
        let result = match item.operation {
            ExecutionMode::Call => ctx.call(item.destination, item.value, item.data.as_slice()),
            ExecutionMode::DelegateCall if self.call_only => {
                return Err(ValidationError::MalformedBatch("delegate call in call-only batch").into());
            }
            ExecutionMode::DelegateCall => ctx.delegate_call(item.destination, item.data.as_slice()),
        };
        result.map_err(|err| {
            debug!(index, destination = %item.destination, error = %err, "batch item failed");
            WalletError::from(ExecutionError::call_failed(err))
        })?;
        Ok(())
    }
}

impl Contract for BatchExecutor {
    fn name(&self) -> &'static str {
        if self.call_only {
            "MultiSendCallOnly"
        } else {
            "MultiSend"
        }
    }

    fn execute(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, WalletError> {
        let (MultiSendFunction::MultiSend, args) = dispatch::<MultiSendFunction>(input)?;
        only_delegate_call(ctx, self.name())?;

        let packed = AbiDecoder::new(args).bytes()?;
        let mut count = 0usize;
        for (index, item) in BatchReader::new(&packed).enumerate() {
            self.run_item(ctx, index, &item?)?;
            count += 1;
        }
        debug!(items = count, "batch executed");
        Ok(Bytes::new())
    }
}
