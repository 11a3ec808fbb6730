//! HTTP client for the grading service's submission surface
//!
//! Wraps the four remote calls the pipeline drives per unit: initiate the
//! upload handshake, post the bytes to the issued ticket, fetch a student's
//! existing submission attachments, and post the submission record. Built
//! once per batch run from an explicit [`ApiConfig`]; the bearer token rides
//! on every call to the grading service. Redirect following is disabled so
//! the upload step can observe the 302 that carries the new file id.

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use std::collections::HashSet;

use crate::config::{ApiConfig, AssignmentTarget};
use crate::error::{Error, Result};
use crate::types::{RemoteFileId, StudentId, UploadTicket};

/// Client for one course/assignment pair on one grading service
#[derive(Debug)]
pub struct CanvasClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    target: AssignmentTarget,
}

impl CanvasClient {
    /// Build a client from API configuration and an assignment target
    ///
    /// Fails when the base URL is empty or the underlying HTTP client cannot
    /// be constructed.
    pub fn new(api: &ApiConfig, target: AssignmentTarget) -> Result<Self> {
        if api.base_url.is_empty() {
            return Err(Error::Config {
                message: "API base URL must not be empty".to_string(),
                key: Some("api.base_url".to_string()),
            });
        }

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(api.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token: api.token.clone(),
            target,
        })
    }

    /// The assignment this client submits against
    pub fn target(&self) -> &AssignmentTarget {
        &self.target
    }

    fn assignment_base(&self) -> String {
        format!(
            "{}/api/v1/courses/{}/assignments/{}",
            self.base_url, self.target.course_id, self.target.assignment_id
        )
    }

    /// Request an upload ticket for a student's file
    ///
    /// POST `/submissions/{student}/files` with name, size and content type
    /// as form fields. Anything but 200 is an initiation failure, terminal
    /// for the unit.
    pub async fn initiate_upload(
        &self,
        student: &StudentId,
        filename: &str,
        size: u64,
        content_type: &str,
    ) -> Result<UploadTicket> {
        let url = format!("{}/submissions/{}/files", self.assignment_base(), student);
        let form = [
            ("name", filename.to_string()),
            ("size", size.to_string()),
            ("content_type", content_type.to_string()),
        ];

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Initiation {
                student_id: student.to_string(),
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json::<UploadTicket>().await?)
    }

    /// Post the payload bytes to the ticket's target URL
    ///
    /// The ticket's parameters ride along as text parts of the multipart
    /// form, followed by the file part (the service requires the file to be
    /// the last field). 200, 201 and 302 all count as success; the file id
    /// comes from the redirect `Location`'s trailing path segment when
    /// present, otherwise from the JSON body's `id` field. The ticket's
    /// upload URL is pre-authorized, so no bearer token is attached.
    pub async fn upload_file(
        &self,
        student: &StudentId,
        ticket: UploadTicket,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<RemoteFileId> {
        let UploadTicket {
            upload_url,
            upload_params,
        } = ticket;

        let mut form = Form::new();
        for (key, value) in upload_params {
            form = form.text(key, value);
        }
        form = form.part("file", Part::bytes(bytes).file_name(filename.to_string()));

        let response = self.http.post(&upload_url).multipart(form).send().await?;

        let status = response.status();
        if !matches!(status.as_u16(), 200 | 201 | 302) {
            return Err(Error::Upload {
                student_id: student.to_string(),
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let location_id = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(RemoteFileId::from_location);
        if let Some(id) = location_id {
            return Ok(id);
        }

        // 302 bodies are frequently empty, so tolerate non-JSON here and
        // fail with an upload error rather than a decode error.
        let body_text = response.text().await.unwrap_or_default();
        serde_json::from_str::<serde_json::Value>(&body_text)
            .ok()
            .as_ref()
            .and_then(|body| body.get("id"))
            .and_then(RemoteFileId::from_json)
            .ok_or_else(|| Error::Upload {
                student_id: student.to_string(),
                status: status.as_u16(),
                message: "upload response carried no file id".to_string(),
            })
    }

    /// Fetch the file ids already attached to a student's submission
    ///
    /// Any failure — non-200 status, transport error, unparseable body —
    /// degrades to an empty set. A student with no prior submission is not
    /// an error, so nothing here is ever propagated.
    pub async fn fetch_existing_file_ids(&self, student: &StudentId) -> Vec<RemoteFileId> {
        match self.try_fetch_existing(student).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::debug!(
                    student_id = %student,
                    error = %e,
                    "could not fetch existing submission, treating as empty"
                );
                Vec::new()
            }
        }
    }

    async fn try_fetch_existing(&self, student: &StudentId) -> Result<Vec<RemoteFileId>> {
        let url = format!("{}/submissions/{}", self.assignment_base(), student);
        let response = self.http.get(&url).bearer_auth(&self.token).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Other(format!(
                "existing-submission fetch returned HTTP {status}"
            )));
        }

        let body: serde_json::Value = response.json().await?;
        let mut seen = HashSet::new();
        let ids = body
            .get("attachments")
            .and_then(|attachments| attachments.as_array())
            .map(|attachments| {
                attachments
                    .iter()
                    .filter_map(|attachment| attachment.get("id"))
                    .filter_map(RemoteFileId::from_json)
                    .filter(|id| seen.insert(id.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(ids)
    }

    /// Post the submission record on the student's behalf
    ///
    /// POST `/submissions` with submission type fixed to "online upload" and
    /// `as_user_id` set so the service records the student, not the API
    /// caller, as the submitter. Anything but 200 is a submission failure,
    /// terminal for the unit.
    pub async fn submit(&self, student: &StudentId, file_ids: &[RemoteFileId]) -> Result<()> {
        let url = format!("{}/submissions", self.assignment_base());
        let body = serde_json::json!({
            "submission": {
                "submission_type": "online_upload",
                "file_ids": file_ids,
            },
            "as_user_id": student,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Submission {
                student_id: student.to_string(),
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn api(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            token: "test-token".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn empty_base_url_is_a_config_error() {
        let err = CanvasClient::new(&api(""), AssignmentTarget::new("1", "2")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn assignment_base_strips_trailing_slash() {
        let client = CanvasClient::new(
            &api("https://canvas.example.edu/"),
            AssignmentTarget::new("101", "2002"),
        )
        .unwrap();
        assert_eq!(
            client.assignment_base(),
            "https://canvas.example.edu/api/v1/courses/101/assignments/2002"
        );
    }
}
