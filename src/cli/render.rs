//! Plain-text rendering of session views.

use std::time::SystemTime;

use daoctl::governance::{Proposal, ProposalState};
use daoctl::session::{SessionState, SessionView};

/// Join lines with a trailing newline.
fn block(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn overview(view: &SessionView) -> String {
    let mut lines = vec![
        "🏛  DAO Overview".to_string(),
        String::new(),
        format!("  Your membership NFT balance: {}", view.nft_balance),
        format!("  Treasury balance: {} ETH", view.treasury_balance_eth),
        format!("  Total number of proposals: {}", view.num_proposals),
    ];
    if view.nft_balance == 0 {
        lines.push(String::new());
        lines.push(
            "  You do not own any membership NFTs. You cannot create or vote on proposals."
                .to_string(),
        );
    }
    block(lines)
}

/// One proposal card, with the action currently available on it.
pub fn proposal_card(session: &SessionState, proposal: &Proposal, now: SystemTime) -> String {
    let state = proposal.state_at(now);
    let actions = session.permitted_actions(proposal, now);
    let action = match state {
        ProposalState::Closed => "Proposal executed".to_string(),
        ProposalState::Open if actions.can_vote => {
            format!("Vote: daoctl vote {} <yay|nay>", proposal.id)
        }
        ProposalState::Open => "Voting open (membership NFT required)".to_string(),
        ProposalState::DecidedPendingExecution => format!(
            "Execute Proposal ({}): daoctl execute {}",
            proposal.projected_outcome(),
            proposal.id
        ),
    };

    block(vec![
        format!("Proposal ID: {}", proposal.id),
        format!("  NFT to purchase: {}", proposal.target_token_id),
        format!(
            "  Deadline: {}",
            humantime::format_rfc3339_seconds(proposal.deadline)
        ),
        format!("  Yay votes: {}", proposal.yay_votes),
        format!("  Nay votes: {}", proposal.nay_votes),
        format!("  Executed?: {}", proposal.executed),
        format!("  State: {}", state),
        format!("  ➜ {}", action),
    ])
}

pub fn proposal_list(session: &SessionState, now: SystemTime) -> String {
    if session.proposals().is_empty() {
        return "No proposals have been created\n".to_string();
    }
    session
        .proposals()
        .iter()
        .map(|p| proposal_card(session, p, now))
        .collect::<Vec<_>>()
        .join("\n")
}
