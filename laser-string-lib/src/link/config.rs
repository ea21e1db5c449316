use std::time::Duration;

/// Controller address used when none is configured.
pub const DEFAULT_HOST: &str = "192.168.60.207";
/// Controller port used when none is configured.
pub const DEFAULT_PORT: u16 = 10000;
/// Connect and write timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the light controller lives and how long to wait for it.
///
/// The library never reads the environment; callers build this from whatever
/// configuration surface they have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub host: String,
    pub port: u16,
    /// Applies to connecting, to each write and to closing.
    pub timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LinkConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        LinkConfig {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `host:port`, as used in log lines and errors.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.host, "192.168.60.207");
        assert_eq!(config.port, 10000);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_endpoint() {
        let config = LinkConfig::new("127.0.0.1", 4242).with_timeout(Duration::from_millis(10));
        assert_eq!(config.endpoint(), "127.0.0.1:4242");
        assert_eq!(config.timeout, Duration::from_millis(10));
    }
}
