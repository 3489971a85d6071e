//! Walk through the applicant flow against a running server.
//!
//! # Usage
//!
//! ```bash
//! vd-cli apply --server http://localhost:3000 --phone +255712345678 --pin 1234
//! vd-cli apply --server http://localhost:3000 --phone +255712345678 --pin 1234 --admin ADM-1a2b3c4d5e
//! ```
//!
//! Submits the application, waits for the admin's PIN decision, then asks
//! for the code on stdin and waits again. A code flagged as wrong can be
//! re-entered. A PIN flagged as wrong at the code step asks for a new PIN
//! and starts over with a new application. Every other outcome ends the run.

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use verifydesk_core::{CodeStage, PinStage};

use crate::client::DeskClient;
use crate::poller::{PollOutcome, PollPolicy, poll_until_settled};

use super::CommandError;

/// How the run ended, for the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Approved,
    Rejected,
    NoResponse,
}

/// What the applicant does after a poll settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    Finish(ApplyResult),
    EnterCode,
    EnterPin,
}

fn after_pin(outcome: &PollOutcome<PinStage>) -> Next {
    match outcome {
        PollOutcome::Settled(PinStage::Approved) => Next::EnterCode,
        PollOutcome::Settled(_) => Next::Finish(ApplyResult::Rejected),
        PollOutcome::NoResponse { .. } => Next::Finish(ApplyResult::NoResponse),
    }
}

fn after_code(outcome: &PollOutcome<CodeStage>) -> Next {
    match outcome {
        PollOutcome::Settled(CodeStage::Approved) => Next::Finish(ApplyResult::Approved),
        PollOutcome::Settled(CodeStage::WrongCode) => Next::EnterCode,
        PollOutcome::Settled(CodeStage::WrongPin) => Next::EnterPin,
        // Unreachable once settled; treat it like a silent admin.
        PollOutcome::Settled(CodeStage::Pending) | PollOutcome::NoResponse { .. } => {
            Next::Finish(ApplyResult::NoResponse)
        }
    }
}

/// # Errors
///
/// Returns error if the server rejects an application or a code, or stdin
/// closes while a code or PIN is expected.
pub async fn run(
    server: &str,
    phone_number: &str,
    pin: &str,
    admin_id: Option<&str>,
    policy: PollPolicy,
) -> Result<ApplyResult, CommandError> {
    let client = DeskClient::new(server)?;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut pin = pin.to_string();

    'application: loop {
        let submitted = client
            .submit_application(phone_number, &pin, admin_id)
            .await?;
        let id = submitted.application_id;
        tracing::info!(
            "Application {} assigned to {} ({})",
            id,
            submitted.assigned_admin_name,
            submitted.assigned_admin_id
        );
        tracing::info!(
            "Waiting for the PIN decision (up to {}s)...",
            policy.budget().as_secs()
        );

        let pin_stage = poll_until_settled(
            policy,
            || client.pin_status(&id),
            |stage: &PinStage| !stage.is_pending(),
        )
        .await;

        match (after_pin(&pin_stage), pin_stage) {
            (Next::Finish(result), PollOutcome::NoResponse { attempts }) => {
                tracing::warn!("No PIN decision after {attempts} checks.");
                return Ok(result);
            }
            (Next::Finish(result), PollOutcome::Settled(stage)) => {
                tracing::warn!("PIN {stage}. Application closed.");
                return Ok(result);
            }
            _ => tracing::info!("PIN approved."),
        }

        loop {
            let code = read_line(&mut stdin, "verification code").await?;
            client.submit_code(&id, &code).await?;
            tracing::info!("Code submitted. Waiting for the admin...");

            let code_stage = poll_until_settled(
                policy,
                || client.code_status(&id),
                |stage: &CodeStage| !stage.is_pending(),
            )
            .await;

            match after_code(&code_stage) {
                Next::EnterCode => {
                    tracing::warn!("The admin marked the code as wrong. Try again.");
                }
                Next::EnterPin => {
                    tracing::warn!("The admin marked the PIN as wrong. Starting over.");
                    pin = read_line(&mut stdin, "PIN").await?;
                    continue 'application;
                }
                Next::Finish(ApplyResult::Approved) => {
                    tracing::info!("Code approved. Verification complete.");
                    return Ok(ApplyResult::Approved);
                }
                Next::Finish(result) => {
                    if let PollOutcome::NoResponse { attempts } = code_stage {
                        tracing::warn!("No code decision after {attempts} checks.");
                    }
                    return Ok(result);
                }
            }
        }
    }
}

async fn read_line(
    stdin: &mut Lines<BufReader<Stdin>>,
    what: &str,
) -> Result<String, CommandError> {
    tracing::info!("Enter the {what}:");
    let line = stdin.next_line().await?.ok_or_else(|| {
        CommandError::Invalid(format!("stdin closed before a {what} was entered"))
    })?;
    Ok(line.trim().to_string())
}
