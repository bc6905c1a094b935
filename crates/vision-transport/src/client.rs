//! The blocking HTTP client: POSTs per-frame state deltas and learn-mode
//! reports, PUTs crop profiles. Synchronous and single-threaded per §A.5 —
//! one racer process, one connection, no retry on failure.

use std::time::Duration;

use tracing::warn;
use vision_proto::{crop_profile::CropProfile, delta::StateDelta, report::LearnReport};

use crate::error::TransportError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

pub struct VisionClient {
    base_url: String,
    agent: ureq::Agent,
}

impl VisionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder().timeout_global(Some(REQUEST_TIMEOUT)).build();
        Self { base_url: base_url.into(), agent: config.into() }
    }

    fn delta_url(&self, racer: &str) -> String {
        format!("{}/api/vision/{}", self.base_url, racer)
    }

    fn learn_report_url(&self, session_id: &str) -> String {
        format!("{}/api/learn/sessions/{}/report", self.base_url, session_id)
    }

    fn crop_profile_url(&self, profile_id: &str) -> String {
        format!("{}/api/crop-profiles/{}", self.base_url, profile_id)
    }

    /// POST a per-frame state delta. Failures are logged and dropped — a
    /// single missed frame is not worth retrying on the hot path.
    pub fn post_delta(&self, racer: &str, delta: &StateDelta) {
        let url = self.delta_url(racer);
        if let Err(err) = self.agent.post(&url).send_json(delta) {
            warn!(url, error = %err, "state-delta POST failed");
        }
    }

    /// POST the learn-mode batch report at EOF.
    pub fn post_learn_report(
        &self,
        session_id: &str,
        report: &LearnReport,
    ) -> Result<(), TransportError> {
        let url = self.learn_report_url(session_id);
        self.agent.post(&url).send_json(report).map_err(|err| {
            warn!(url, error = %err, "learn-report POST failed");
            TransportError::from(err)
        })?;
        Ok(())
    }

    /// PUT a persisted crop profile.
    pub fn put_crop_profile(
        &self,
        profile_id: &str,
        profile: &CropProfile,
    ) -> Result<(), TransportError> {
        let url = self.crop_profile_url(profile_id);
        self.agent.put(&url).send_json(profile).map_err(|err| {
            warn!(url, error = %err, "crop-profile PUT failed");
            TransportError::from(err)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls_match_the_documented_shape() {
        let client = VisionClient::new("http://localhost:8080");
        assert_eq!(client.delta_url("racer-1"), "http://localhost:8080/api/vision/racer-1");
        assert_eq!(
            client.learn_report_url("sess-42"),
            "http://localhost:8080/api/learn/sessions/sess-42/report"
        );
        assert_eq!(
            client.crop_profile_url("profile-9"),
            "http://localhost:8080/api/crop-profiles/profile-9"
        );
    }
}
