//! Call frames and the messages that create them.

use crate::domain::value_objects::{Address, Bytes, U256};

/// How a frame was entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// Ordinary call, may transfer value.
    Call,
    /// Callee code, caller's storage and identity.
    DelegateCall,
    /// Read-only call.
    StaticCall,
}

/// Identity and permissions of one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    /// How the frame was entered.
    pub kind: CallKind,
    /// Immediate caller (`msg.sender`).
    pub caller: Address,
    /// Account whose storage and balance the frame uses (`address(this)`).
    pub address: Address,
    /// Account whose code runs.
    pub code_address: Address,
    /// Value attached (`msg.value`).
    pub value: U256,
    /// Nesting depth, 0 for the top-level transaction.
    pub depth: u16,
    /// Writes forbidden.
    pub is_static: bool,
}

/// A frame plus its calldata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Frame to create.
    pub frame: Frame,
    /// Calldata.
    pub input: Bytes,
}

impl Message {
    /// Top-level call from an externally owned account.
    #[must_use]
    pub fn transaction(from: Address, to: Address, value: U256, input: Bytes) -> Self {
        Self {
            frame: Frame {
                kind: CallKind::Call,
                caller: from,
                address: to,
                code_address: to,
                value,
                depth: 0,
                is_static: false,
            },
            input,
        }
    }

    /// Top-level read-only call.
    #[must_use]
    pub fn query(from: Address, to: Address, input: Bytes) -> Self {
        let mut message = Self::transaction(from, to, U256::zero(), input);
        message.frame.kind = CallKind::StaticCall;
        message.frame.is_static = true;
        message
    }

    /// True when the host has to move `value` from caller to callee.
    #[must_use]
    pub fn transfers_value(&self) -> bool {
        self.frame.kind == CallKind::Call && !self.frame.value.is_zero()
    }
}
