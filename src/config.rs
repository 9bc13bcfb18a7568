use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub offline: OfflineConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub student_portal: StudentPortalConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// kosong = semua origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Antrian offline lokal (SQLite)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub max_retries: i32,
    pub max_concurrency: usize,
    pub backoff_base_secs: i64,
    pub backoff_max_secs: i64,
    pub probe_interval_secs: u64,
    pub retry_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_concurrency: 4,
            backoff_base_secs: 30,
            backoff_max_secs: 1800,
            probe_interval_secs: 15,
            retry_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// secret HS256 dari auth provider
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentPortalConfig {
    pub session_hours: i64,
    pub max_login_attempts: u32,
    pub lockout_minutes: u64,
    pub rate_limit_per_minute: u32,
}

impl Default for StudentPortalConfig {
    fn default() -> Self {
        Self {
            session_hours: 24,
            max_login_attempts: 5,
            lockout_minutes: 15,
            rate_limit_per_minute: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub enabled: bool,
    pub api_url: String,
    pub api_token: String,
    #[serde(default)]
    pub targets: Vec<String>,
    /// jam kirim harian, format HH:MM (waktu lokal)
    pub send_time: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://api.fonnte.com/send".to_string(),
            api_token: String::new(),
            targets: Vec::new(),
            send_time: "16:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// dipakai untuk URL verifikasi QR buku tabungan
    pub public_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:5173".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // file konfigurasi opsional; tanpa file semua dari environment
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => toml::from_str(&config_str)
                .map_err(|e| format!("Gagal membaca file konfigurasi: {e}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL belum diset dan config.toml tidak ditemukan")?;

                let sync_defaults = SyncConfig::default();
                let portal_defaults = StudentPortalConfig::default();
                let report_defaults = ReportConfig::default();

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                        cors_origins: get_env("CORS_ORIGINS")
                            .map(|v| split_targets(&v))
                            .unwrap_or_default(),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    offline: OfflineConfig {
                        url: get_env("OFFLINE_DB_URL")
                            .unwrap_or_else(|| "sqlite://tabungan_offline.db?mode=rwc".to_string()),
                    },
                    sync: SyncConfig {
                        max_retries: get_env_parse("SYNC_MAX_RETRIES", sync_defaults.max_retries),
                        max_concurrency: get_env_parse(
                            "SYNC_MAX_CONCURRENCY",
                            sync_defaults.max_concurrency,
                        ),
                        backoff_base_secs: get_env_parse(
                            "SYNC_BACKOFF_BASE_SECS",
                            sync_defaults.backoff_base_secs,
                        ),
                        backoff_max_secs: get_env_parse(
                            "SYNC_BACKOFF_MAX_SECS",
                            sync_defaults.backoff_max_secs,
                        ),
                        probe_interval_secs: get_env_parse(
                            "SYNC_PROBE_INTERVAL_SECS",
                            sync_defaults.probe_interval_secs,
                        ),
                        retry_interval_secs: get_env_parse(
                            "SYNC_RETRY_INTERVAL_SECS",
                            sync_defaults.retry_interval_secs,
                        ),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                    },
                    student_portal: StudentPortalConfig {
                        session_hours: get_env_parse(
                            "STUDENT_SESSION_HOURS",
                            portal_defaults.session_hours,
                        ),
                        max_login_attempts: get_env_parse(
                            "STUDENT_MAX_LOGIN_ATTEMPTS",
                            portal_defaults.max_login_attempts,
                        ),
                        lockout_minutes: get_env_parse(
                            "STUDENT_LOCKOUT_MINUTES",
                            portal_defaults.lockout_minutes,
                        ),
                        rate_limit_per_minute: get_env_parse(
                            "STUDENT_RATE_LIMIT_PER_MINUTE",
                            portal_defaults.rate_limit_per_minute,
                        ),
                    },
                    report: ReportConfig {
                        enabled: get_env_parse("REPORT_ENABLED", false),
                        api_url: get_env("REPORT_API_URL").unwrap_or(report_defaults.api_url),
                        api_token: get_env("REPORT_API_TOKEN").unwrap_or_default(),
                        targets: get_env("REPORT_TARGETS")
                            .map(|v| split_targets(&v))
                            .unwrap_or_default(),
                        send_time: get_env("REPORT_SEND_TIME")
                            .unwrap_or(report_defaults.send_time),
                    },
                    app: AppConfig {
                        public_base_url: get_env("PUBLIC_BASE_URL")
                            .unwrap_or_else(|| AppConfig::default().public_base_url),
                    },
                }
            }
            Err(e) => {
                return Err(format!("Tidak dapat membaca file konfigurasi {config_path}: {e}").into());
            }
        };

        // environment tetap menimpa isi file
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("OFFLINE_DB_URL") {
            config.offline.url = v;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("REPORT_ENABLED")
            && let Ok(b) = v.parse()
        {
            config.report.enabled = b;
        }
        if let Ok(v) = env::var("REPORT_API_URL") {
            config.report.api_url = v;
        }
        if let Ok(v) = env::var("REPORT_API_TOKEN") {
            config.report.api_token = v;
        }
        if let Ok(v) = env::var("REPORT_TARGETS") {
            config.report.targets = split_targets(&v);
        }
        if let Ok(v) = env::var("REPORT_SEND_TIME") {
            config.report.send_time = v;
        }
        if let Ok(v) = env::var("PUBLIC_BASE_URL") {
            config.app.public_base_url = v;
        }

        Ok(config)
    }
}

fn split_targets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
