use std::env;
use triage_core::llm::LlmConfig;
use triage_core::Mode;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// `TRIAGE_MODE`, when set to a recognised value.
    pub requested_mode: Option<Mode>,
    pub llm: LlmConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let requested_mode = parse_requested_mode(env::var("TRIAGE_MODE").ok().as_deref());

        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            requested_mode,
            llm: LlmConfig::from_env(),
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::select(&self.llm, self.requested_mode)
    }
}

/// Blank or unrecognised values leave the choice to credential detection.
fn parse_requested_mode(raw: Option<&str>) -> Option<Mode> {
    let raw = raw.map(str::trim).filter(|v| !v.is_empty())?;
    match raw.parse::<Mode>() {
        Ok(mode) => Some(mode),
        Err(e) => {
            tracing::warn!("ignoring TRIAGE_MODE: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: &str, requested_mode: Option<Mode>) -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1".into(),
            port: 8000,
            requested_mode,
            llm: LlmConfig {
                api_key: api_key.into(),
                ..LlmConfig::default()
            },
        }
    }

    #[test]
    fn recognised_modes_are_requested() {
        assert_eq!(parse_requested_mode(Some("live")), Some(Mode::Live));
        assert_eq!(parse_requested_mode(Some(" Demo ")), Some(Mode::Demo));
    }

    #[test]
    fn blank_or_unknown_mode_is_ignored() {
        assert_eq!(parse_requested_mode(None), None);
        assert_eq!(parse_requested_mode(Some("   ")), None);
        assert_eq!(parse_requested_mode(Some("auto")), None);
    }

    #[test]
    fn ignored_mode_falls_back_to_credential() {
        let requested = parse_requested_mode(Some("turbo"));
        assert_eq!(config("do-key", requested).mode(), Mode::Live);
        assert_eq!(config("", requested).mode(), Mode::Demo);
    }

    #[test]
    fn requested_mode_overrides_credential() {
        assert_eq!(config("", Some(Mode::Live)).mode(), Mode::Live);
        assert_eq!(config("do-key", Some(Mode::Demo)).mode(), Mode::Demo);
    }
}
