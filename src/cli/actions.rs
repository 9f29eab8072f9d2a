//! State-changing commands: create, vote, execute.
//!
//! Each one loads a session first so the client-side gates see the
//! current membership balance and proposal states.

use super::render;
use daoctl::contracts::abi::U256;
use daoctl::governance::{GovernanceWorkflow, VoteChoice};
use daoctl::ledger::Receipt;
use daoctl::session::{SessionState, Tab};

/// Propose buying `token_id` with treasury funds
pub async fn create(
    workflow: &GovernanceWorkflow,
    token_id: U256,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = SessionState::new();
    workflow.start_session(&mut session).await?;
    workflow.select_tab(&mut session, Tab::CreateProposal).await;

    println!("⏳ Creating proposal to purchase NFT {}...", token_id);
    let receipt = workflow.create_proposal(&mut session, token_id).await?;
    confirmed(&receipt);
    println!("   Total number of proposals: {}", session.proposal_count());
    Ok(())
}

pub async fn vote(
    workflow: &GovernanceWorkflow,
    id: u64,
    choice: VoteChoice,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = proposals_session(workflow).await?;

    println!("⏳ Voting {} on proposal {}...", choice, id);
    let receipt = workflow.vote_on_proposal(&mut session, id, choice).await?;
    confirmed(&receipt);
    print_card(workflow, &session, id);
    Ok(())
}

pub async fn execute(
    workflow: &GovernanceWorkflow,
    id: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = proposals_session(workflow).await?;

    println!("⏳ Executing proposal {}...", id);
    let receipt = workflow.execute_proposal(&mut session, id).await?;
    confirmed(&receipt);
    print_card(workflow, &session, id);
    Ok(())
}

async fn proposals_session(
    workflow: &GovernanceWorkflow,
) -> Result<SessionState, Box<dyn std::error::Error>> {
    let mut session = SessionState::new();
    workflow.start_session(&mut session).await?;
    workflow.select_tab(&mut session, Tab::ViewProposals).await;
    Ok(session)
}

fn confirmed(receipt: &Receipt) {
    println!(
        "✅ Confirmed in block {} (tx {})",
        receipt.block_number, receipt.hash
    );
}

fn print_card(workflow: &GovernanceWorkflow, session: &SessionState, id: u64) {
    if let Some(proposal) = session.proposal(id) {
        println!();
        print!("{}", render::proposal_card(session, proposal, workflow.now()));
    }
}
