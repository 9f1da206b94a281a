use std::env;

/// Fallback signing secret for local development. Never accepted in production.
const LOCAL_SESSION_SECRET: &str = "fallback-secret-key";

/// 24 hours, the lifetime of a login session cookie.
const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 24 * 60 * 60;

/// Upper bound for `SESSION_MAX_AGE_SECS`: one year.
pub const MAX_SESSION_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and shared
/// with every handler through `FromRef`, so the session gate, the store bootstrap and the
/// static page handlers all read the same values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls cookie hardening and the log format.
    pub env: Env,
    // TCP port the HTTP server binds to.
    pub port: u16,
    // MongoDB connection string. `None` selects the in-memory store (local only).
    pub mongodb_uri: Option<String>,
    // Database holding the users/questions/responses/comments collections.
    pub mongodb_database: String,
    // HMAC secret used to sign the session token carried by the cookie.
    pub session_secret: String,
    // Session lifetime, applied both to the token `exp` and to the cookie Max-Age.
    pub session_max_age_secs: u64,
    // Directory containing `login.html` and `dashboard.html`.
    pub static_dir: String,
    // Directory of JSON seed files used to prime the in-memory store.
    pub seed_data_dir: String,
}

/// Env
///
/// Defines the runtime context: permissive local defaults versus a production deployment
/// that requires every secret to be set explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance for test setup. No environment
    /// variables are read.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: 3000,
            mongodb_uri: None,
            mongodb_database: "question_board_test".to_string(),
            session_secret: "super-secure-test-secret-value-local".to_string(),
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
            static_dir: "public".to_string(),
            seed_data_dir: "seed-data".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the application configuration at startup.
    /// It reads all parameters from environment variables and fails fast.
    ///
    /// # Panics
    /// Panics if `MONGODB_URI` or `SESSION_SECRET` is missing in production, if a numeric
    /// variable cannot be parsed, or if `SESSION_MAX_AGE_SECS` is outside 1s..=1 year.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let port = env::var("PORT")
            .map(|raw| raw.parse().expect("FATAL: PORT must be a valid port number"))
            .unwrap_or(3000);

        let session_max_age_secs = env::var("SESSION_MAX_AGE_SECS")
            .map(|raw| {
                raw.parse()
                    .expect("FATAL: SESSION_MAX_AGE_SECS must be a number of seconds")
            })
            .unwrap_or(DEFAULT_SESSION_MAX_AGE_SECS);
        assert!(
            (1..=MAX_SESSION_MAX_AGE_SECS).contains(&session_max_age_secs),
            "FATAL: SESSION_MAX_AGE_SECS must be between 1 and {} seconds",
            MAX_SESSION_MAX_AGE_SECS
        );

        let mongodb_database =
            env::var("MONGODB_DATABASE").unwrap_or_else(|_| "question_board".to_string());
        let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string());
        let seed_data_dir = env::var("SEED_DATA_DIR").unwrap_or_else(|_| "seed-data".to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                port,
                // Without a URI the service runs on the in-memory store.
                mongodb_uri: env::var("MONGODB_URI").ok(),
                mongodb_database,
                session_secret: env::var("SESSION_SECRET")
                    .unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string()),
                session_max_age_secs,
                static_dir,
                seed_data_dir,
            },
            Env::Production => Self {
                env: Env::Production,
                port,
                mongodb_uri: Some(
                    env::var("MONGODB_URI").expect("FATAL: MONGODB_URI required in prod"),
                ),
                mongodb_database,
                session_secret: env::var("SESSION_SECRET")
                    .expect("FATAL: SESSION_SECRET must be set in production."),
                session_max_age_secs,
                static_dir,
                seed_data_dir,
            },
        }
    }

    /// Whether cookies must carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.env == Env::Production
    }
}
