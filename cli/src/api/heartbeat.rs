use std::time::Duration;

use ureq::Agent;

use crate::prelude::*;

/// Dead man's switch pinged after each successful cycle.
pub struct Client {
    agent: Agent,
    url: Option<String>,
}

impl Client {
    pub fn new(url: Option<String>) -> Self {
        let agent =
            Agent::config_builder().timeout_global(Some(Duration::from_secs(3))).build().into();
        Self { agent, url }
    }

    pub fn send(&self) {
        if let Some(url) = &self.url
            && let Err(error) = self.send_fallible(url)
        {
            warn!("failed to send the heartbeat: {error:#}");
        }
    }

    #[instrument(skip_all)]
    fn send_fallible(&self, url: &str) -> Result {
        info!("sending a heartbeat…");
        self.agent.post(url).send_empty()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_url() {
        let url = "http://127.0.0.1:9/heartbeat";
        let client = Client::new(Some(url.to_owned()));
        assert!(client.send_fallible(url).is_err());
        client.send();
    }

    #[test]
    fn test_without_url() {
        let client = Client::new(None);
        assert!(client.url.is_none());
        client.send();
    }
}
