//! In-memory ledger for testing.
//!
//! Decodes real calldata and simulates a governance contract and a
//! membership token contract, so the whole client stack can be exercised
//! without a node. Failure switches cover the error paths.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::connection::DEFAULT_CHAIN_ID;
use super::traits::*;
use crate::contracts::abi::{
    self, Word, U256, BALANCE_OF, CREATE_PROPOSAL, EXECUTE_PROPOSAL, NUM_PROPOSALS, PROPOSALS,
    VOTE_ON_PROPOSAL,
};
use crate::contracts::ContractAddresses;
use crate::governance::Clock;

/// Voting window given to new proposals.
pub const MOCK_VOTING_PERIOD: Duration = Duration::from_secs(300);

/// Amount spent from the treasury when a proposal passes.
pub const MOCK_PURCHASE_PRICE: u128 = 100_000_000_000_000_000;

/// A proposal as stored by the simulated contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockProposal {
    pub nft_token_id: U256,
    pub deadline: u64,
    pub yay_votes: u64,
    pub nay_votes: u64,
    pub executed: bool,
    voters: HashSet<Address>,
}

/// Mock ledger, usable as both wallet provider and transport.
#[derive(Clone)]
pub struct MockLedger {
    state: Arc<Mutex<MockState>>,
}

struct MockState {
    chain_id: ChainId,
    accounts: Vec<Address>,
    addresses: ContractAddresses,
    treasury: u128,
    members: HashMap<Address, u64>,
    proposals: Vec<MockProposal>,
    receipts: HashMap<TxHash, Receipt>,
    clock_offset_secs: i64,
    next_tx: u64,
    block_number: u64,
    connects: u64,
    reads: u64,
    submitted: u64,
    fail_connect: bool,
    corrupt_reads: bool,
    failing_proposal_reads: HashSet<u64>,
    decline_signatures: bool,
    hold_confirmations: bool,
    failing_receipt_polls: u64,
    receipt_polls: u64,
    revert_on_chain: bool,
}

impl MockLedger {
    /// One funded member account on the supported network.
    pub fn new() -> Self {
        Self::with_accounts(vec![Address::new([0xa1; 20])])
    }

    pub fn with_accounts(accounts: Vec<Address>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                chain_id: DEFAULT_CHAIN_ID,
                accounts,
                addresses: ContractAddresses {
                    governance: Address::new([0xda; 20]),
                    membership: Address::new([0x4f; 20]),
                },
                treasury: 0,
                members: HashMap::new(),
                proposals: Vec::new(),
                receipts: HashMap::new(),
                clock_offset_secs: 0,
                next_tx: 1,
                block_number: 1,
                connects: 0,
                reads: 0,
                submitted: 0,
                fail_connect: false,
                corrupt_reads: false,
                failing_proposal_reads: HashSet::new(),
                decline_signatures: false,
                hold_confirmations: false,
                failing_receipt_polls: 0,
                receipt_polls: 0,
                revert_on_chain: false,
            })),
        }
    }

    pub fn addresses(&self) -> ContractAddresses {
        self.state.lock().unwrap().addresses
    }

    /// First account, or the zero address when there is none.
    pub fn active_account(&self) -> Address {
        self.state
            .lock()
            .unwrap()
            .accounts
            .first()
            .copied()
            .unwrap_or(Address::ZERO)
    }

    /// Current ledger time in seconds since the epoch.
    pub fn now_secs(&self) -> u64 {
        self.state.lock().unwrap().now_secs()
    }

    /// Clock that follows `advance_time`.
    pub fn clock(&self) -> Clock {
        let ledger = self.clone();
        Arc::new(move || UNIX_EPOCH + Duration::from_secs(ledger.now_secs()))
    }

    pub fn advance_time(&self, by: Duration) {
        self.state.lock().unwrap().clock_offset_secs += by.as_secs() as i64;
    }

    pub fn set_chain_id(&self, chain_id: ChainId) {
        self.state.lock().unwrap().chain_id = chain_id;
    }

    pub fn set_treasury_balance(&self, wei: u128) {
        self.state.lock().unwrap().treasury = wei;
    }

    pub fn treasury_balance(&self) -> u128 {
        self.state.lock().unwrap().treasury
    }

    pub fn set_membership_balance(&self, owner: Address, tokens: u64) {
        self.state.lock().unwrap().members.insert(owner, tokens);
    }

    /// Append a proposal directly (test setup). Returns its id.
    pub fn insert_proposal(
        &self,
        nft_token_id: u64,
        deadline: u64,
        yay_votes: u64,
        nay_votes: u64,
        executed: bool,
    ) -> u64 {
        self.insert_proposal_with_token(
            U256::from(nft_token_id),
            deadline,
            yay_votes,
            nay_votes,
            executed,
        )
    }

    pub fn insert_proposal_with_token(
        &self,
        nft_token_id: U256,
        deadline: u64,
        yay_votes: u64,
        nay_votes: u64,
        executed: bool,
    ) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.proposals.push(MockProposal {
            nft_token_id,
            deadline,
            yay_votes,
            nay_votes,
            executed,
            voters: HashSet::new(),
        });
        state.proposals.len() as u64 - 1
    }

    pub fn proposal(&self, id: u64) -> Option<MockProposal> {
        self.state
            .lock()
            .unwrap()
            .proposals
            .get(id as usize)
            .cloned()
    }

    /// Store a finished receipt and return its hash.
    pub fn record_receipt(&self, success: bool) -> TxHash {
        let mut state = self.state.lock().unwrap();
        let hash = state.next_hash();
        let block_number = state.next_block();
        state.receipts.insert(
            hash,
            Receipt {
                hash,
                block_number,
                success,
            },
        );
        hash
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().unwrap().fail_connect = fail;
    }

    /// Return garbage from every contract call.
    pub fn corrupt_reads(&self, corrupt: bool) {
        self.state.lock().unwrap().corrupt_reads = corrupt;
    }

    /// Make `proposals(id)` fail with a transport error.
    pub fn fail_proposal_read(&self, id: u64) {
        self.state.lock().unwrap().failing_proposal_reads.insert(id);
    }

    pub fn decline_signatures(&self, decline: bool) {
        self.state.lock().unwrap().decline_signatures = decline;
    }

    /// Keep receipts hidden, as if the transaction never gets mined.
    pub fn hold_confirmations(&self, hold: bool) {
        self.state.lock().unwrap().hold_confirmations = hold;
    }

    /// Fail the next `count` receipt lookups with a transport error.
    pub fn fail_receipt_polls(&self, count: u64) {
        self.state.lock().unwrap().failing_receipt_polls = count;
    }

    pub fn receipt_poll_count(&self) -> u64 {
        self.state.lock().unwrap().receipt_polls
    }

    /// Accept submissions and report failed receipts instead of refusing them.
    pub fn revert_on_chain(&self, on_chain: bool) {
        self.state.lock().unwrap().revert_on_chain = on_chain;
    }

    pub fn connect_count(&self) -> u64 {
        self.state.lock().unwrap().connects
    }

    pub fn read_count(&self) -> u64 {
        self.state.lock().unwrap().reads
    }

    pub fn submitted_transactions(&self) -> u64 {
        self.state.lock().unwrap().submitted
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    fn now_secs(&self) -> u64 {
        let real = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        (real + self.clock_offset_secs).max(0) as u64
    }

    fn next_hash(&mut self) -> TxHash {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&self.next_tx.to_be_bytes());
        self.next_tx += 1;
        TxHash::new(bytes)
    }

    fn next_block(&mut self) -> u64 {
        self.block_number += 1;
        self.block_number
    }

    fn member_tokens(&self, account: &Address) -> u64 {
        self.members.get(account).copied().unwrap_or(0)
    }

    fn governance_read(&self, selector: [u8; 4], args: &[Word]) -> LedgerResult<Vec<u8>> {
        if selector == NUM_PROPOSALS.selector {
            return Ok(abi::encode_output(&[Word::from_u64(
                self.proposals.len() as u64,
            )]));
        }
        if selector == PROPOSALS.selector {
            let id = arg_u64(args, 0)?;
            if self.failing_proposal_reads.contains(&id) {
                return Err(LedgerError::Transport(format!(
                    "connection reset reading proposal {}",
                    id
                )));
            }
            // Solidity getters on missing mapping keys return zeroed structs.
            let p = self.proposals.get(id as usize);
            return Ok(abi::encode_output(&[
                Word::from_u256(p.map_or(U256::ZERO, |p| p.nft_token_id)),
                Word::from_u64(p.map_or(0, |p| p.deadline)),
                Word::from_u64(p.map_or(0, |p| p.yay_votes)),
                Word::from_u64(p.map_or(0, |p| p.nay_votes)),
                Word::from_bool(p.is_some_and(|p| p.executed)),
            ]));
        }
        Err(LedgerError::Reverted("function not readable".to_string()))
    }

    fn governance_write(
        &mut self,
        from: &Address,
        selector: [u8; 4],
        args: &[Word],
    ) -> Result<(), String> {
        let tokens = self.member_tokens(from);
        if tokens == 0 {
            return Err("NOT_A_DAO_MEMBER".to_string());
        }
        let now = self.now_secs();

        if selector == CREATE_PROPOSAL.selector {
            let nft_token_id = args
                .first()
                .map(Word::to_u256)
                .ok_or_else(|| "missing argument".to_string())?;
            self.proposals.push(MockProposal {
                nft_token_id,
                deadline: now + MOCK_VOTING_PERIOD.as_secs(),
                yay_votes: 0,
                nay_votes: 0,
                executed: false,
                voters: HashSet::new(),
            });
            return Ok(());
        }

        if selector == VOTE_ON_PROPOSAL.selector {
            let id = arg_u64(args, 0).map_err(|e| e.to_string())?;
            let code = arg_u64(args, 1).map_err(|e| e.to_string())?;
            let proposal = self
                .proposals
                .get_mut(id as usize)
                .ok_or_else(|| "INVALID_PROPOSAL".to_string())?;
            if now >= proposal.deadline {
                return Err("DEADLINE_EXCEEDED".to_string());
            }
            if code > 1 {
                return Err("INVALID_VOTE".to_string());
            }
            if !proposal.voters.insert(*from) {
                return Err("ALREADY_VOTED".to_string());
            }
            if code == 0 {
                proposal.yay_votes += tokens;
            } else {
                proposal.nay_votes += tokens;
            }
            return Ok(());
        }

        if selector == EXECUTE_PROPOSAL.selector {
            let id = arg_u64(args, 0).map_err(|e| e.to_string())?;
            let treasury = self.treasury;
            let proposal = self
                .proposals
                .get_mut(id as usize)
                .ok_or_else(|| "INVALID_PROPOSAL".to_string())?;
            if now < proposal.deadline {
                return Err("DEADLINE_NOT_EXCEEDED".to_string());
            }
            if proposal.executed {
                return Err("PROPOSAL_ALREADY_EXECUTED".to_string());
            }
            let spend = proposal.yay_votes > proposal.nay_votes;
            if spend && treasury < MOCK_PURCHASE_PRICE {
                return Err("NOT_ENOUGH_FUNDS".to_string());
            }
            proposal.executed = true;
            if spend {
                self.treasury -= MOCK_PURCHASE_PRICE;
            }
            return Ok(());
        }

        Err("unknown function".to_string())
    }
}

fn arg_u64(args: &[Word], index: usize) -> LedgerResult<u64> {
    args.get(index)
        .ok_or_else(|| LedgerError::Reverted("missing argument".to_string()))?
        .to_u64()
        .map_err(|e| LedgerError::Reverted(e.to_string()))
}

#[async_trait]
impl WalletProvider for MockLedger {
    async fn connect(&self) -> LedgerResult<Arc<dyn LedgerTransport>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_connect {
            return Err(LedgerError::Transport("wallet provider unavailable".to_string()));
        }
        state.connects += 1;
        drop(state);
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl LedgerTransport for MockLedger {
    async fn chain_id(&self) -> LedgerResult<ChainId> {
        Ok(self.state.lock().unwrap().chain_id)
    }

    async fn accounts(&self) -> LedgerResult<Vec<Address>> {
        Ok(self.state.lock().unwrap().accounts.clone())
    }

    async fn balance(&self, address: &Address) -> LedgerResult<u128> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if *address == state.addresses.governance {
            Ok(state.treasury)
        } else {
            Ok(0)
        }
    }

    async fn call(&self, to: &Address, data: &[u8]) -> LedgerResult<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if state.corrupt_reads {
            return Ok(vec![0xff; 7]);
        }
        let (selector, args) =
            abi::decode_call(data).map_err(|e| LedgerError::Reverted(e.to_string()))?;

        if *to == state.addresses.governance {
            state.governance_read(selector, &args)
        } else if *to == state.addresses.membership && selector == BALANCE_OF.selector {
            let owner = args
                .first()
                .ok_or_else(|| LedgerError::Reverted("missing argument".to_string()))?
                .to_address()
                .map_err(|e| LedgerError::Reverted(e.to_string()))?;
            Ok(abi::encode_output(&[Word::from_u64(
                state.member_tokens(&owner),
            )]))
        } else {
            // Calls to an address without code return no data.
            Ok(Vec::new())
        }
    }

    async fn send_transaction(
        &self,
        from: &Address,
        to: &Address,
        data: &[u8],
    ) -> LedgerResult<TxHash> {
        let mut state = self.state.lock().unwrap();
        if state.decline_signatures {
            return Err(LedgerError::SignatureDeclined);
        }
        if *to != state.addresses.governance {
            return Err(LedgerError::Reverted("no contract at target".to_string()));
        }
        let (selector, args) =
            abi::decode_call(data).map_err(|e| LedgerError::Reverted(e.to_string()))?;

        let outcome = state.governance_write(from, selector, &args);
        if let Err(reason) = &outcome {
            if !state.revert_on_chain {
                return Err(LedgerError::Reverted(reason.clone()));
            }
        }

        state.submitted += 1;
        let hash = state.next_hash();
        let block_number = state.next_block();
        state.receipts.insert(
            hash,
            Receipt {
                hash,
                block_number,
                success: outcome.is_ok(),
            },
        );
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: &TxHash) -> LedgerResult<Option<Receipt>> {
        let mut state = self.state.lock().unwrap();
        state.receipt_polls += 1;
        if state.failing_receipt_polls > 0 {
            state.failing_receipt_polls -= 1;
            return Err(LedgerError::Transport("connection reset".to_string()));
        }
        if state.hold_confirmations {
            return Ok(None);
        }
        Ok(state.receipts.get(hash).copied())
    }
}
