use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};

use std::time::Duration;

/// File name the challenge's test suite is uploaded under.
pub const TESTS_FILE_NAME: &str = "tests.py";
/// File name the submitted code is uploaded under. Test suites import it as `user_code`.
pub const USER_CODE_FILE_NAME: &str = "user_code.py";

#[derive(Serialize)]
struct RunRequest<'a> {
    files: [SourceFile<'a>; 2],
}

#[derive(Serialize)]
struct SourceFile<'a> {
    name: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct RunResponse {
    stderr: Option<String>,
}

/// Client for a glot.io-style "run" endpoint.
#[derive(Debug, Clone)]
pub struct GlotClient {
    client: Client,
    url: String,
}

impl GlotClient {
    pub fn new(url: impl Into<String>, authorization: &str, timeout: Duration) -> Result<Self> {
        let mut authorization = HeaderValue::from_str(authorization)
            .context("Grading service authorization is not a valid header value.")?;
        authorization.set_sensitive(true);

        let headers = HeaderMap::from_iter([
            (header::AUTHORIZATION, authorization),
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
        ]);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Could not build the grading client.")?;

        Ok(Self { client, url: url.into() })
    }

    /// Runs `code` against `tests` and returns the captured stderr, which is where
    /// unittest writes its report.
    pub async fn run(&self, tests: &str, code: &str) -> Result<String> {
        let body = RunRequest {
            files: [
                SourceFile { name: TESTS_FILE_NAME, content: tests },
                SourceFile { name: USER_CODE_FILE_NAME, content: code },
            ],
        };

        log::trace!("[run] Sending {} bytes of code to {}", code.len(), self.url);

        let response = self.client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("Could not reach the grading service.")?
            .error_for_status()
            .context("The grading service rejected the run.")?
            .json::<RunResponse>()
            .await
            .context("Couldn't deserialize the grading service's response.")?;

        response.stderr.context("No stderr found in the grading service's response.")
    }
}
