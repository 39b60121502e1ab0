use std::env;

pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    /// Local hour (0-23) at which the daily reminder scan fires.
    pub reminder_hour: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            reminder_hour: env::var("REMINDER_HOUR")
                .unwrap_or_else(|_| "20".to_string())
                .parse::<u32>()
                .expect("REMINDER_HOUR must be an hour (0-23)")
                .min(23),
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Both tests mutate process environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_config_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();

        // Set required environment variables
        env::set_var("DATABASE_URL", "postgres://test");
        env::remove_var("SERVER_PORT");
        env::remove_var("SERVER_HOST");
        env::remove_var("REMINDER_HOUR");

        let config = Config::from_env();

        assert_eq!(config.database_url, "postgres://test");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.reminder_hour, 20);

        // Test custom values
        env::set_var("SERVER_PORT", "3000");
        env::set_var("SERVER_HOST", "0.0.0.0");
        env::set_var("REMINDER_HOUR", "7");

        let config = Config::from_env();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.reminder_hour, 7);

        env::remove_var("SERVER_PORT");
        env::remove_var("SERVER_HOST");
        env::remove_var("REMINDER_HOUR");
    }

    #[test]
    fn test_reminder_hour_is_clamped() {
        let _guard = ENV_LOCK.lock().unwrap();

        env::set_var("DATABASE_URL", "postgres://test");
        env::set_var("REMINDER_HOUR", "99");

        let config = Config::from_env();
        assert_eq!(config.reminder_hour, 23);

        env::remove_var("REMINDER_HOUR");
    }
}
