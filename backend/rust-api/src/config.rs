use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub jwt_secret: String,
    /// Course name printed on issued certificates.
    pub course_name: String,
    pub bind_addr: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "certcourse".to_string());

        let jwt_secret = settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: JWT_SECRET must be set in production!");
                }
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            });

        let course_name = settings
            .get_string("course.name")
            .or_else(|_| env::var("COURSE_NAME"))
            .unwrap_or_else(|_| "Advisor Certification Course".to_string());

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        Ok(Config {
            mongo_uri,
            mongo_database,
            jwt_secret,
            course_name,
            bind_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn load_uses_defaults_when_env_is_empty() {
        std::env::remove_var("MONGO_URI");
        std::env::remove_var("MONGO_DATABASE");
        std::env::remove_var("COURSE_NAME");
        std::env::remove_var("BIND_ADDR");

        let config = Config::load().unwrap();
        assert_eq!(config.mongo_database, "certcourse");
        assert_eq!(config.bind_addr, "0.0.0.0:8081");
        assert_eq!(config.course_name, "Advisor Certification Course");
    }

    #[test]
    #[serial]
    fn env_variables_override_defaults() {
        std::env::set_var("MONGO_DATABASE", "certcourse_test");
        std::env::set_var("COURSE_NAME", "Test Course");

        let config = Config::load().unwrap();
        assert_eq!(config.mongo_database, "certcourse_test");
        assert_eq!(config.course_name, "Test Course");

        std::env::remove_var("MONGO_DATABASE");
        std::env::remove_var("COURSE_NAME");
    }
}
