use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_REFRESH_DELAY_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub request_timeout: Duration,
    /// Wait between a successful test call and the follow-up reload.
    pub refresh_delay: Duration,
    pub bind: SocketAddr,
}

impl Settings {
    pub fn new(api_url: String, request_timeout_secs: u64) -> Self {
        Self {
            api_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            refresh_delay: Duration::from_secs(DEFAULT_REFRESH_DELAY_SECS),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }

    pub fn with_server(mut self, bind: SocketAddr, refresh_delay_secs: u64) -> Self {
        self.bind = bind;
        self.refresh_delay = Duration::from_secs(refresh_delay_secs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_behaviour() {
        let settings = Settings::new("http://127.0.0.1:8000".to_string(), DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(settings.refresh_delay, Duration::from_secs(30));
        assert_eq!(settings.bind, DEFAULT_BIND.parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn server_overrides_apply() {
        let bind: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        let settings = Settings::new("http://backend".to_string(), 5).with_server(bind, 2);
        assert_eq!(settings.bind, bind);
        assert_eq!(settings.refresh_delay, Duration::from_secs(2));
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
    }
}
