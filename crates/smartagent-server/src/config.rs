//! Server configuration from the environment

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_MAX_HOPS: usize = 5;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Directory served for the chat page
    pub static_dir: String,

    /// Provider calls allowed per chat turn
    pub max_hops: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            static_dir: DEFAULT_STATIC_DIR.into(),
            max_hops: DEFAULT_MAX_HOPS,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_hops = match var("AGENT_MAX_HOPS").map(|v| v.trim().parse::<usize>()) {
            Some(Ok(hops)) if hops > 0 => hops,
            Some(_) => {
                tracing::warn!(
                    "AGENT_MAX_HOPS must be a positive integer, using {}",
                    defaults.max_hops
                );
                defaults.max_hops
            }
            None => defaults.max_hops,
        };

        Self {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            static_dir: var("STATIC_DIR").unwrap_or(defaults.static_dir),
            max_hops,
        }
    }
}
