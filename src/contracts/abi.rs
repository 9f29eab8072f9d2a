//! Calldata encoding for the two governance contracts.
//!
//! Only static argument types occur in this surface (`uint256`, `uint8`,
//! `address`, `bool`), so every argument and return value is one 32-byte
//! word. Selectors are the first four bytes of the keccak-256 hash of the
//! canonical signature and are fixed by the deployed contracts.

use thiserror::Error;

pub use alloy_primitives::U256;

use crate::ledger::traits::Address;

/// Size of an ABI word.
pub const WORD_LEN: usize = 32;

/// Four-byte function selector.
pub type Selector = [u8; 4];

/// One function of a contract interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Function {
    pub name: &'static str,
    pub signature: &'static str,
    pub selector: Selector,
    /// Number of return words.
    pub outputs: usize,
}

pub const NUM_PROPOSALS: Function = Function {
    name: "numProposals",
    signature: "numProposals()",
    selector: [0x40, 0x0e, 0x39, 0x49],
    outputs: 1,
};

pub const PROPOSALS: Function = Function {
    name: "proposals",
    signature: "proposals(uint256)",
    selector: [0x01, 0x3c, 0xf0, 0x8b],
    outputs: 5,
};

pub const CREATE_PROPOSAL: Function = Function {
    name: "createProposal",
    signature: "createProposal(uint256)",
    selector: [0x5a, 0x43, 0xdc, 0x00],
    outputs: 1,
};

pub const VOTE_ON_PROPOSAL: Function = Function {
    name: "voteOnProposal",
    signature: "voteOnProposal(uint256,uint8)",
    selector: [0xef, 0xaf, 0xb2, 0x2e],
    outputs: 0,
};

pub const EXECUTE_PROPOSAL: Function = Function {
    name: "executeProposal",
    signature: "executeProposal(uint256)",
    selector: [0x0d, 0x61, 0xb5, 0x19],
    outputs: 0,
};

pub const BALANCE_OF: Function = Function {
    name: "balanceOf",
    signature: "balanceOf(address)",
    selector: [0x70, 0xa0, 0x82, 0x31],
    outputs: 1,
};

/// Interface of a bound contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractSchema {
    pub name: &'static str,
    pub functions: &'static [Function],
}

impl ContractSchema {
    pub fn function(&self, name: &str) -> Option<&'static Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn by_selector(&self, selector: &[u8]) -> Option<&'static Function> {
        self.functions.iter().find(|f| f.selector[..] == *selector)
    }
}

pub const GOVERNANCE_SCHEMA: ContractSchema = ContractSchema {
    name: "governance",
    functions: &[
        NUM_PROPOSALS,
        PROPOSALS,
        CREATE_PROPOSAL,
        VOTE_ON_PROPOSAL,
        EXECUTE_PROPOSAL,
    ],
};

pub const MEMBERSHIP_SCHEMA: ContractSchema = ContractSchema {
    name: "membership",
    functions: &[BALANCE_OF],
};

/// ABI decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("{function}: expected {expected} bytes of return data, got {actual}")]
    Length {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("value does not fit in {0} bits")]
    Overflow(u32),

    #[error("invalid boolean word")]
    InvalidBool,

    #[error("invalid address word")]
    InvalidAddress,

    #[error("calldata too short")]
    ShortCalldata,
}

/// One ABI word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word(pub [u8; WORD_LEN]);

impl Word {
    pub fn from_u128(value: u128) -> Self {
        let mut out = [0u8; WORD_LEN];
        out[16..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_u128(value as u128)
    }

    pub fn from_u256(value: U256) -> Self {
        Self(value.to_be_bytes::<WORD_LEN>())
    }

    pub fn from_bool(value: bool) -> Self {
        Self::from_u128(value as u128)
    }

    pub fn from_address(address: &Address) -> Self {
        let mut out = [0u8; WORD_LEN];
        out[12..].copy_from_slice(address.as_bytes());
        Self(out)
    }

    pub fn to_u128(&self) -> Result<u128, AbiError> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow(128));
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&self.0[16..]);
        Ok(u128::from_be_bytes(buf))
    }

    /// Full-width `uint256`; never overflows.
    pub fn to_u256(&self) -> U256 {
        U256::from_be_bytes(self.0)
    }

    pub fn to_u64(&self) -> Result<u64, AbiError> {
        let value = self.to_u128()?;
        u64::try_from(value).map_err(|_| AbiError::Overflow(64))
    }

    pub fn to_bool(&self) -> Result<bool, AbiError> {
        match self.to_u128() {
            Ok(0) => Ok(false),
            Ok(1) => Ok(true),
            _ => Err(AbiError::InvalidBool),
        }
    }

    pub fn to_address(&self) -> Result<Address, AbiError> {
        if self.0[..12].iter().any(|b| *b != 0) {
            return Err(AbiError::InvalidAddress);
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&self.0[12..]);
        Ok(Address::new(out))
    }
}

/// Selector followed by the argument words.
pub fn encode_call(function: &Function, args: &[Word]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD_LEN);
    data.extend_from_slice(&function.selector);
    for arg in args {
        data.extend_from_slice(&arg.0);
    }
    data
}

/// Split return data into exactly `function.outputs` words.
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Vec<Word>, AbiError> {
    let expected = function.outputs * WORD_LEN;
    if data.len() != expected {
        return Err(AbiError::Length {
            function: function.name,
            expected,
            actual: data.len(),
        });
    }
    Ok(split_words(data))
}

/// Split calldata into selector and argument words.
pub fn decode_call(data: &[u8]) -> Result<(Selector, Vec<Word>), AbiError> {
    if data.len() < 4 || (data.len() - 4) % WORD_LEN != 0 {
        return Err(AbiError::ShortCalldata);
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&data[..4]);
    Ok((selector, split_words(&data[4..])))
}

/// Concatenate words into return data.
pub fn encode_output(words: &[Word]) -> Vec<u8> {
    words.iter().flat_map(|w| w.0).collect()
}

fn split_words(data: &[u8]) -> Vec<Word> {
    data.chunks_exact(WORD_LEN)
        .map(|chunk| {
            let mut word = [0u8; WORD_LEN];
            word.copy_from_slice(chunk);
            Word(word)
        })
        .collect()
}

/// Render a wei amount as ether with trailing zeros trimmed.
pub fn format_ether(wei: u128) -> String {
    const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac == 0 {
        return format!("{}.0", whole);
    }
    let frac = format!("{:018}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_of_calldata() {
        let owner = Address::new([0x11; 20]);
        let data = encode_call(&BALANCE_OF, &[Word::from_address(&owner)]);
        assert_eq!(data.len(), 36);
        assert_eq!(hex::encode(&data[..4]), "70a08231");
        assert!(data[4..16].iter().all(|b| *b == 0));
        assert_eq!(&data[16..], &[0x11; 20]);
    }

    #[test]
    fn test_decode_call_splits_arguments() {
        let data = encode_call(&VOTE_ON_PROPOSAL, &[Word::from_u64(7), Word::from_u64(1)]);
        let (selector, args) = decode_call(&data).unwrap();
        assert_eq!(selector, VOTE_ON_PROPOSAL.selector);
        assert_eq!(args[0].to_u64().unwrap(), 7);
        assert_eq!(args[1].to_u64().unwrap(), 1);
    }

    #[test]
    fn test_decode_call_rejects_ragged_data() {
        assert_eq!(decode_call(&[0x01, 0x02]), Err(AbiError::ShortCalldata));
        assert_eq!(decode_call(&[0u8; 10]), Err(AbiError::ShortCalldata));
    }

    #[test]
    fn test_decode_output_checks_length() {
        let err = decode_output(&PROPOSALS, &[0u8; 64]).unwrap_err();
        assert_eq!(
            err,
            AbiError::Length {
                function: "proposals",
                expected: 160,
                actual: 64
            }
        );
    }

    #[test]
    fn test_word_overflow() {
        let mut raw = [0u8; WORD_LEN];
        raw[0] = 1;
        assert_eq!(Word(raw).to_u128(), Err(AbiError::Overflow(128)));
        assert_eq!(
            Word::from_u128(u64::MAX as u128 + 1).to_u64(),
            Err(AbiError::Overflow(64))
        );
    }

    #[test]
    fn test_word_u256_is_big_endian() {
        let mut raw = [0u8; WORD_LEN];
        raw[0] = 0x80;
        raw[31] = 0x01;
        let value = Word(raw).to_u256();
        assert_eq!(value, (U256::from(1u64) << 255usize) + U256::from(1u64));
        assert_eq!(Word::from_u256(value), Word(raw));
        assert_eq!(Word::from_u256(U256::from(42u64)), Word::from_u64(42));
    }

    #[test]
    fn test_word_bool() {
        assert!(Word::from_bool(true).to_bool().unwrap());
        assert!(!Word::from_bool(false).to_bool().unwrap());
        assert_eq!(Word::from_u64(2).to_bool(), Err(AbiError::InvalidBool));
    }

    #[test]
    fn test_word_address_rejects_dirty_padding() {
        let mut word = Word::from_address(&Address::new([0xaa; 20]));
        assert_eq!(word.to_address().unwrap(), Address::new([0xaa; 20]));
        word.0[0] = 1;
        assert_eq!(word.to_address(), Err(AbiError::InvalidAddress));
    }

    #[test]
    fn test_schema_lookup() {
        assert_eq!(
            GOVERNANCE_SCHEMA.function("executeProposal"),
            Some(&EXECUTE_PROPOSAL)
        );
        assert_eq!(
            MEMBERSHIP_SCHEMA.by_selector(&BALANCE_OF.selector),
            Some(&BALANCE_OF)
        );
        assert!(MEMBERSHIP_SCHEMA.function("numProposals").is_none());
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(0), "0.0");
        assert_eq!(format_ether(1_000_000_000_000_000_000), "1.0");
        assert_eq!(format_ether(100_000_000_000_000_000), "0.1");
        assert_eq!(format_ether(1_234_500_000_000_000_000), "1.2345");
        assert_eq!(format_ether(1), "0.000000000000000001");
    }
}
