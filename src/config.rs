use std::env;

/// Runtime configuration, sourced from the environment. A local `.env`
/// file is honored for development.
#[derive(Clone)]
pub struct Config {
    /// Postgres connection string for the booking store.
    pub database_url: String,
    /// HS256 secret signing rider/garage/admin session tokens.
    pub jwt_secret: String,
    /// Session token lifetime in hours.
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env_or("JWT_EXPIRATION_HOURS", "24")
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env_or("SERVER_HOST", "0.0.0.0"),
            server_port: env_or("SERVER_PORT", "8080")
                .parse()
                .expect("SERVER_PORT must be a number"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
