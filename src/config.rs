use std::fmt;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_DBNAME: &str = "postgres";

/// Where the destination table lives.
///
/// `Display` and `Debug` never print the password, so the value can be logged.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub connect_timeout: Duration,
}

impl DbConfig {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: user.into(),
            password: password.into(),
            dbname: DEFAULT_DBNAME.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn pg_config(&self) -> postgres::Config {
        let mut cfg = postgres::Config::new();
        cfg.host(&self.host)
            .port(self.port)
            .user(&self.user)
            .password(&self.password)
            .dbname(&self.dbname)
            .connect_timeout(self.connect_timeout)
            .application_name("hrsync");
        cfg
    }
}

impl fmt::Display for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host={} port={} user={} dbname={} password=***",
            self.host, self.port, self.user, self.dbname
        )
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("dbname", &self.dbname)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_never_printed() {
        let mut db = DbConfig::new("alice", "hunter2");
        db.host = "db.internal".into();

        let shown = db.to_string();
        assert_eq!(
            shown,
            "host=db.internal port=5432 user=alice dbname=postgres password=***"
        );
        assert!(!format!("{db:?}").contains("hunter2"));
    }

    #[test]
    fn pg_config_carries_every_field() {
        let mut db = DbConfig::new("alice", "hunter2");
        db.dbname = "fitness".into();
        let cfg = db.pg_config();

        assert_eq!(cfg.get_user(), Some("alice"));
        assert_eq!(cfg.get_password(), Some(b"hunter2".as_slice()));
        assert_eq!(cfg.get_dbname(), Some("fitness"));
        assert_eq!(cfg.get_ports(), &[5432]);
    }
}
