use std::collections::HashMap;

use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

/// 单个镜像队列类别的并发/优先级配置。concurrency为0表示不限并发。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueClassConfig {
    pub concurrency: i32,
    pub priority: i32,
}

/// 镜像队列类别到并发/优先级的映射。
///
/// 原始设计把这个映射写死在资格查询里；这里作为配置面暴露，
/// 演进时无需改代码。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePolicyConfig {
    pub default: QueueClassConfig,
    #[serde(default)]
    pub classes: HashMap<String, QueueClassConfig>,
}

impl ConfigValidator for QueuePolicyConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        Self::validate_class("queue_policy.default", &self.default)?;
        for (name, class) in &self.classes {
            ValidationUtils::validate_not_empty(name, "queue_policy.classes key")?;
            Self::validate_class(&format!("queue_policy.classes.{name}"), class)?;
        }
        Ok(())
    }
}

impl QueuePolicyConfig {
    fn validate_class(field: &str, class: &QueueClassConfig) -> crate::ConfigResult<()> {
        ValidationUtils::validate_non_negative(class.concurrency, &format!("{field}.concurrency"))?;
        ValidationUtils::validate_non_negative(class.priority, &format!("{field}.priority"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_config() -> QueuePolicyConfig {
        let mut classes = HashMap::new();
        classes.insert(
            "github".to_string(),
            QueueClassConfig {
                concurrency: 1,
                priority: 1,
            },
        );
        QueuePolicyConfig {
            default: QueueClassConfig {
                concurrency: 2,
                priority: 2,
            },
            classes,
        }
    }

    #[test]
    fn test_queue_policy_validation() {
        assert!(policy_config().validate().is_ok());

        let mut invalid = policy_config();
        invalid.default.concurrency = -1;
        assert!(invalid.validate().is_err());

        let mut invalid = policy_config();
        invalid.classes.insert(
            "gitlab".to_string(),
            QueueClassConfig {
                concurrency: 2,
                priority: -5,
            },
        );
        assert!(invalid.validate().is_err());

        // 0并发合法，表示不限
        let mut unbounded = policy_config();
        unbounded.default.concurrency = 0;
        assert!(unbounded.validate().is_ok());
    }

    #[test]
    fn test_queue_policy_classes_default_empty() {
        let toml = r#"
            [default]
            concurrency = 2
            priority = 2
        "#;
        let parsed: QueuePolicyConfig = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(parsed.classes.is_empty());
        assert_eq!(parsed.default.priority, 2);
    }
}
