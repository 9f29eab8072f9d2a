use serde::Serialize;

use super::render;
use daoctl::governance::{GovernanceWorkflow, Proposal, ProposalState};
use daoctl::session::{PermittedActions, SessionState};

/// JSON shape of a single proposal with its derived state.
#[derive(Serialize)]
struct ProposalDetail<'a> {
    #[serde(flatten)]
    proposal: &'a Proposal,
    state: ProposalState,
    #[serde(flatten)]
    actions: PermittedActions,
}

/// List every proposal, oldest first
pub async fn list(
    workflow: &GovernanceWorkflow,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = SessionState::new();
    workflow.start_session(&mut session).await?;
    if !workflow.refresh_proposals(&mut session).await {
        return Err("Could not load proposals from the governance contract".into());
    }

    let now = workflow.now();
    if json {
        let details: Vec<_> = session
            .proposals()
            .iter()
            .map(|p| detail(&session, p, now))
            .collect();
        println!("{}", serde_json::to_string_pretty(&details)?);
    } else {
        print!("{}", render::proposal_list(&session, now));
    }
    Ok(())
}

/// Show one proposal
pub async fn show(
    workflow: &GovernanceWorkflow,
    id: u64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = SessionState::new();
    workflow.start_session(&mut session).await?;
    ensure_exists(workflow, id).await?;

    let proposal = workflow.repository().fetch_proposal(id).await?;
    let now = workflow.now();
    if json {
        let detail = detail(&session, &proposal, now);
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print!("{}", render::proposal_card(&session, &proposal, now));
    }
    Ok(())
}

/// Fail unless `id` is below the contract's current proposal count.
///
/// The contract getter returns a zeroed record for unknown ids, so the count
/// is read fresh; a failed read is reported as such.
async fn ensure_exists(
    workflow: &GovernanceWorkflow,
    id: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let count = workflow.repository().num_proposals().await?;
    if id >= count {
        return Err(format!("Proposal {} does not exist ({} proposals)", id, count).into());
    }
    Ok(())
}

fn detail<'a>(
    session: &SessionState,
    proposal: &'a Proposal,
    now: std::time::SystemTime,
) -> ProposalDetail<'a> {
    ProposalDetail {
        proposal,
        state: proposal.state_at(now),
        actions: session.permitted_actions(proposal, now),
    }
}
