//! HTTP-backed page sessions.
//!
//! Each session owns its own `reqwest` client (and with it its own cookie
//! jar and connection pool), so sessions opened for different sources never
//! contend with each other.

use super::{Browser, Document, Page, PageError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Opens [`HttpPage`] sessions with a shared user agent and navigation timeout.
#[derive(Debug, Clone)]
pub struct HttpBrowser {
    user_agent: String,
    timeout: Duration,
}

impl HttpBrowser {
    /// # Arguments
    ///
    /// * `user_agent` - Sent with every request
    /// * `timeout` - Upper bound for a single navigation
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn new_session(&self) -> Result<Box<dyn Page>, PageError> {
        let client = Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout)
            .cookie_store(true)
            .build()?;
        Ok(Box::new(HttpPage {
            client,
            document: None,
        }))
    }
}

/// A session that renders pages by fetching their server-side HTML.
#[derive(Debug)]
pub struct HttpPage {
    client: Client,
    document: Option<Document>,
}

#[async_trait]
impl Page for HttpPage {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), PageError> {
        let t0 = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PageError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await?;
        debug!(
            %final_url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Loaded page"
        );
        self.document = Some(Document::new(final_url, body));
        Ok(())
    }

    fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    async fn close(&mut self) {
        self.document = None;
        debug!("Closed HTTP page session");
    }
}
