use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use session_core::SessionConfig;

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub auth_dir: String,
    pub client_id: String,
    pub auto_reply: String,
    pub startup_timeout_secs: u64,
    pub qr_max_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            auth_dir: "./auth_state".into(),
            client_id: "default".into(),
            auto_reply: session_core::DEFAULT_AUTO_REPLY.into(),
            startup_timeout_secs: 60,
            qr_max_retries: 3,
        }
    }
}

impl Settings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            client_id: self.client_id.clone(),
            auth_dir: PathBuf::from(&self.auth_dir),
            auto_reply: self.auto_reply.clone(),
            startup_timeout: Duration::from_secs(self.startup_timeout_secs),
            qr_max_retries: self.qr_max_retries,
            ..SessionConfig::default()
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            apply_file_values(&mut settings, &file_cfg);
        }
    }

    apply_env_overrides(&mut settings);
    settings
}

fn apply_file_values(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.bind_addr = v.clone();
    }
    if let Some(v) = file_cfg.get("auth_dir") {
        settings.auth_dir = v.clone();
    }
    if let Some(v) = file_cfg.get("client_id") {
        settings.client_id = v.clone();
    }
    if let Some(v) = file_cfg.get("auto_reply") {
        settings.auto_reply = v.clone();
    }
    if let Some(v) = file_cfg.get("startup_timeout_secs") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.startup_timeout_secs = parsed;
        }
    }
    if let Some(v) = file_cfg.get("qr_max_retries") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.qr_max_retries = parsed;
        }
    }
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.bind_addr = v;
    }
    if let Ok(v) = std::env::var("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }

    if let Ok(v) = std::env::var("AUTH_DIR") {
        settings.auth_dir = v;
    }
    if let Ok(v) = std::env::var("APP__AUTH_DIR") {
        settings.auth_dir = v;
    }

    if let Ok(v) = std::env::var("CLIENT_ID") {
        settings.client_id = v;
    }
    if let Ok(v) = std::env::var("APP__CLIENT_ID") {
        settings.client_id = v;
    }

    if let Ok(v) = std::env::var("AUTO_REPLY") {
        settings.auto_reply = v;
    }
    if let Ok(v) = std::env::var("APP__AUTO_REPLY") {
        settings.auto_reply = v;
    }

    if let Ok(v) = std::env::var("APP__STARTUP_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.startup_timeout_secs = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__QR_MAX_RETRIES") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.qr_max_retries = parsed;
        }
    }
}
