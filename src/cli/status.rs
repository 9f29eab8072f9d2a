use super::render;
use daoctl::governance::GovernanceWorkflow;
use daoctl::session::SessionState;

/// Show treasury balance, proposal count and the membership balance
/// of the active account.
pub async fn execute(
    workflow: &GovernanceWorkflow,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = SessionState::new();
    workflow.start_session(&mut session).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session.view())?);
    } else {
        print!("{}", render::overview(&session.view()));
    }
    Ok(())
}
