use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "musicalart", about = "Music social network prototype")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Override the id generation strategy
    #[arg(long, value_enum)]
    pub ids: Option<IdStrategy>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in with an email and secret
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        secret: String,
    },
    /// Register a new identity and log in as it
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        secret: String,
        #[arg(long)]
        bio: Option<String>,
        /// Avatar image URL
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Forget the persisted identity
    Logout,
    /// Print the persisted identity
    Whoami,
    /// Dump a registry as JSON
    Show {
        #[arg(value_enum)]
        what: ShowTarget,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowTarget {
    Posts,
    Feed,
    Competitions,
    Streams,
    Donations,
}

#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    #[default]
    UuidV7,
    Sequential,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub ledger: LedgerConfig,
    pub ids: IdsConfig,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub storage_key: String,
    pub bcrypt_cost: u32,
    /// Cost for the demo accounts' shared secret, hashed on every start
    pub seed_bcrypt_cost: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LedgerConfig {
    pub recent_limit: usize,
    pub top_donators_limit: usize,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct IdsConfig {
    pub strategy: IdStrategy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            storage_key: "musicalart_user".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            seed_bcrypt_cost: 4,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            recent_limit: 10,
            top_donators_limit: 5,
        }
    }
}

impl AuthConfig {
    /// bcrypt rejects costs outside 4..=31
    pub fn effective_cost(&self) -> u32 {
        self.bcrypt_cost.clamp(4, 31)
    }

    pub fn effective_seed_cost(&self) -> u32 {
        self.seed_bcrypt_cost.clamp(4, 31)
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(strategy) = cli.ids {
            config.ids.strategy = strategy;
        }

        // Resolve paths relative to data dir
        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("musicalart.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match cli.data_dir.clone() {
            Some(dir) => Ok(dir),
            None => dirs::home_dir()
                .map(|home| home.join(".musicalart"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    /// Only `None` before `load` has resolved it.
    pub fn storage_path(&self) -> Option<&PathBuf> {
        self.storage.path.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(data_dir: Option<PathBuf>) -> Cli {
        Cli {
            config: None,
            data_dir,
            ids: None,
            command: None,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.auth.storage_key, "musicalart_user");
        assert_eq!(config.auth.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.ledger.recent_limit, 10);
        assert_eq!(config.ledger.top_donators_limit, 5);
        assert_eq!(config.ids.strategy, IdStrategy::UuidV7);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn effective_cost_is_clamped() {
        let mut auth = AuthConfig::default();
        auth.bcrypt_cost = 1;
        assert_eq!(auth.effective_cost(), 4);
        auth.bcrypt_cost = 99;
        assert_eq!(auth.effective_cost(), 31);
        auth.seed_bcrypt_cost = 0;
        assert_eq!(auth.effective_seed_cost(), 4);
    }

    #[test]
    fn seed_accounts_hash_cheaply_by_default() {
        let auth = AuthConfig::default();
        assert_eq!(auth.effective_seed_cost(), 4);
        assert!(auth.effective_seed_cost() < auth.effective_cost());
    }

    #[test]
    fn register_accepts_avatar() {
        let cli = Cli::parse_from([
            "musicalart",
            "register",
            "--username",
            "nueva",
            "--email",
            "nueva@test.com",
            "--name",
            "Nueva",
            "--secret",
            "pw",
            "--avatar",
            "https://example.com/a.png",
        ]);
        match cli.command {
            Some(Command::Register { avatar, bio, .. }) => {
                assert_eq!(avatar.as_deref(), Some("https://example.com/a.png"));
                assert!(bio.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli(Some(PathBuf::from("/tmp/test-musicalart")));
        assert_eq!(
            Config::data_dir(&cli).unwrap(),
            PathBuf::from("/tmp/test-musicalart")
        );
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli(Some(tmp.path().to_path_buf()))).unwrap();
        assert_eq!(config.auth.storage_key, "musicalart_user");
        assert_eq!(
            config.storage_path(),
            Some(&tmp.path().join("musicalart.db"))
        );
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[auth]
storage_key = "other_user"
bcrypt_cost = 6

[ledger]
recent_limit = 3

[ids]
strategy = "sequential"
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            data_dir: Some(tmp.path().to_path_buf()),
            ids: None,
            command: None,
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.auth.storage_key, "other_user");
        assert_eq!(config.auth.bcrypt_cost, 6);
        assert_eq!(config.ledger.recent_limit, 3);
        assert_eq!(config.ledger.top_donators_limit, 5);
        assert_eq!(config.ids.strategy, IdStrategy::Sequential);
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[ids]\nstrategy = \"sequential\"\n").unwrap();

        let cli = Cli {
            config: Some(config_path),
            data_dir: Some(tmp.path().to_path_buf()),
            ids: Some(IdStrategy::UuidV7),
            command: None,
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.ids.strategy, IdStrategy::UuidV7);
    }

    #[test]
    fn explicit_storage_path_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[storage]\npath = \"/var/lib/ma.db\"\n").unwrap();

        let cli = Cli {
            config: Some(config_path),
            data_dir: Some(tmp.path().to_path_buf()),
            ids: None,
            command: None,
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.storage_path(), Some(&PathBuf::from("/var/lib/ma.db")));
    }
}
