use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::{
    database::DatabaseConfig,
    observability::ObservabilityConfig,
    queue_policy::{QueueClassConfig, QueuePolicyConfig},
    scheduler::SchedulerConfig,
};
use crate::validation::ConfigValidator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub queue_policy: QueuePolicyConfig,
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // 出厂策略沿用历史默认：github类别串行高优先，其余并发2/优先级2
        let mut classes = HashMap::new();
        classes.insert(
            "github".to_string(),
            QueueClassConfig {
                concurrency: 1,
                priority: 1,
            },
        );

        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/syncsched".to_string(),
                max_connections: 10,
                min_connections: 1,
                connection_timeout_seconds: 30,
                idle_timeout_seconds: 600,
            },
            scheduler: SchedulerConfig {
                enabled: true,
                poll_interval_seconds: 60,
                due_delay_seconds: 600,
            },
            queue_policy: QueuePolicyConfig {
                default: QueueClassConfig {
                    concurrency: 2,
                    priority: 2,
                },
                classes,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                metrics_enabled: true,
                metrics_bind_address: "0.0.0.0:9090".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = [
                "config/syncsched.toml",
                "syncsched.toml",
                "/etc/syncsched/config.toml",
            ];

            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        let defaults =
            config::Config::try_from(&AppConfig::default()).context("构造默认配置失败")?;

        let config = ConfigBuilder::builder()
            .add_source(defaults)
            .add_source(builder.build().context("读取配置文件失败")?)
            .add_source(Environment::with_prefix("SYNCSCHED").separator("__"))
            .build()
            .context("合并配置源失败")?;

        let app_config: AppConfig = config.try_deserialize().context("反序列化配置失败")?;

        app_config
            .validate()
            .map_err(|e| anyhow::anyhow!("配置验证失败: {e}"))?;

        Ok(app_config)
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.database.validate()?;
        self.scheduler.validate()?;
        self.queue_policy.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue_policy.classes["github"].concurrency, 1);
        assert_eq!(config.queue_policy.default.concurrency, 2);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Failed to create temp file");
        writeln!(
            file,
            r#"
[database]
url = "postgresql://db.internal/syncsched"

[scheduler]
poll_interval_seconds = 30
due_delay_seconds = 1200
"#
        )
        .expect("Failed to write temp config");

        let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.database.url, "postgresql://db.internal/syncsched");
        assert_eq!(config.scheduler.poll_interval_seconds, 30);
        assert_eq!(config.scheduler.due_delay_seconds, 1200);
        // 未覆盖的部分保持默认
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load(Some("/nonexistent/syncsched.toml")).is_err());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Failed to create temp file");
        writeln!(
            file,
            r#"
[scheduler]
due_delay_seconds = 0
"#
        )
        .expect("Failed to write temp config");

        assert!(AppConfig::load(Some(file.path().to_str().unwrap())).is_err());
    }
}
