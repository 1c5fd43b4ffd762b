use reqwest::{Client, StatusCode};

/// What a submission came back as, after folding HTTP status and body into
/// the categories the form cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The email is now on the waitlist.
    Accepted { message: String },
    /// The email was already on the waitlist.
    AlreadyRegistered { message: String },
    /// The server rejected the address as invalid.
    Rejected { message: String },
    /// Configuration, transport, or any other server-side failure.
    Failed { message: String },
}

pub struct WaitlistClient {
    http_client: Client,
    base_url: String,
}

#[derive(serde::Serialize)]
struct SubmitRequest<'a> {
    email: &'a str,
}

#[derive(serde::Deserialize)]
struct ResponseBody {
    message: Option<String>,
    #[serde(default)]
    duplicate: bool,
}

impl WaitlistClient {
    pub fn new(base_url: String, timeout: std::time::Duration) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap();
        Self {
            http_client,
            base_url,
        }
    }

    /// Submit an email to the waitlist endpoint.
    ///
    /// Every HTTP response, success or not, maps to a [`SubmissionOutcome`];
    /// `Err` is reserved for transport failures (connection refused,
    /// timeout) where no response was received at all.
    pub async fn submit(&self, email: &str) -> Result<SubmissionOutcome, reqwest::Error> {
        let url = format!("{}/api/waitlist", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&SubmitRequest { email })
            .send()
            .await?;
        let status = response.status();
        let body = match response.json::<ResponseBody>().await {
            Ok(body) => body,
            // A body that is not the expected shape is a failure to report,
            // not a reason to fall over.
            Err(_) => {
                return Ok(SubmissionOutcome::Failed {
                    message: "The server returned an unreadable response.".into(),
                });
            }
        };
        Ok(interpret(status, body))
    }
}

fn interpret(status: StatusCode, body: ResponseBody) -> SubmissionOutcome {
    let message = body.message;
    if status.is_success() {
        if body.duplicate {
            SubmissionOutcome::AlreadyRegistered {
                message: message.unwrap_or_else(|| "This email is already on the waitlist.".into()),
            }
        } else {
            SubmissionOutcome::Accepted {
                message: message.unwrap_or_else(|| "Thank you! You've been added.".into()),
            }
        }
    } else {
        match status {
            StatusCode::CONFLICT => SubmissionOutcome::AlreadyRegistered {
                message: message.unwrap_or_else(|| "This email is already on the waitlist.".into()),
            },
            StatusCode::BAD_REQUEST => SubmissionOutcome::Rejected {
                message: message.unwrap_or_else(|| "Please provide a valid email address.".into()),
            },
            _ => SubmissionOutcome::Failed {
                message: message.unwrap_or_else(|| format!("Server error: {}", status.as_u16())),
            },
        }
    }
}
