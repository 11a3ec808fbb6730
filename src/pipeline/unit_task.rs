//! Per-unit state machine: initiate → upload → (fetch existing) → submit
//!
//! Each step is strictly sequential within the unit, and any step error is
//! terminal for the unit only. The payload is staged through a spool file
//! whose cleanup is guaranteed on every exit path.

use tokio::sync::broadcast;

use crate::client::CanvasClient;
use crate::config::{AttachmentPolicy, Config, SubmissionMode};
use crate::error::{Error, Result};
use crate::retry::call_with_retry;
use crate::spool::SpooledPayload;
use crate::types::{Event, SubmissionResult, SubmissionUnit, UnitOutcome};

/// Process one unit to a terminal outcome, isolating every failure
pub(super) async fn process_unit(
    client: &CanvasClient,
    config: &Config,
    event_tx: &broadcast::Sender<Event>,
    unit: SubmissionUnit,
) -> SubmissionResult {
    let student_id = unit.student_id.clone();
    event_tx
        .send(Event::UnitStarted {
            student_id: student_id.clone(),
        })
        .ok();

    match run_steps(client, config, event_tx, &unit).await {
        Ok(outcome) => SubmissionResult {
            student_id,
            outcome,
        },
        Err(e) => {
            match &e {
                Error::NotFound(path) => {
                    tracing::warn!(student_id = %student_id, path = %path.display(), "payload missing, no remote calls made")
                }
                _ => tracing::error!(student_id = %student_id, error = %e, "unit failed"),
            }
            let reason = e.to_string();
            event_tx
                .send(Event::UnitFailed {
                    student_id: student_id.clone(),
                    reason: reason.clone(),
                })
                .ok();
            SubmissionResult {
                student_id,
                outcome: UnitOutcome::Failed(reason),
            }
        }
    }
}

async fn run_steps(
    client: &CanvasClient,
    config: &Config,
    event_tx: &broadcast::Sender<Event>,
    unit: &SubmissionUnit,
) -> Result<UnitOutcome> {
    // Stage the payload first: a vanished source file fails here, before
    // any remote call. The spool file is removed when this function
    // returns, whatever the path out.
    let spool = SpooledPayload::materialize(unit, &config.batch.spool_dir).await?;

    let ticket = call_with_retry(&config.retry, || {
        client.initiate_upload(
            &unit.student_id,
            &unit.filename,
            spool.len(),
            &config.batch.content_type,
        )
    })
    .await?;
    tracing::debug!(
        student_id = %unit.student_id,
        upload_url = %ticket.upload_url,
        "upload ticket issued"
    );

    let file_id = call_with_retry(&config.retry, || {
        client.upload_file(
            &unit.student_id,
            ticket.clone(),
            &unit.filename,
            spool.bytes().to_vec(),
        )
    })
    .await?;
    tracing::info!(student_id = %unit.student_id, file_id = %file_id, "file uploaded");
    event_tx
        .send(Event::FileUploaded {
            student_id: unit.student_id.clone(),
            file_id: file_id.clone(),
        })
        .ok();

    if config.batch.mode == SubmissionMode::UploadOnly {
        return Ok(UnitOutcome::Uploaded(file_id));
    }

    // Merge keeps whatever is already attached; a failed fetch degrades to
    // an empty set inside the client and is never an error here.
    let mut file_ids = match config.batch.attachment_policy {
        AttachmentPolicy::Merge => client.fetch_existing_file_ids(&unit.student_id).await,
        AttachmentPolicy::Replace => Vec::new(),
    };
    if !file_ids.contains(&file_id) {
        file_ids.push(file_id.clone());
    }

    call_with_retry(&config.retry, || {
        client.submit(&unit.student_id, &file_ids)
    })
    .await?;
    tracing::info!(
        student_id = %unit.student_id,
        file_count = file_ids.len(),
        "submission recorded"
    );
    event_tx
        .send(Event::UnitSubmitted {
            student_id: unit.student_id.clone(),
            file_id: file_id.clone(),
        })
        .ok();

    Ok(UnitOutcome::Submitted(file_id))
}
