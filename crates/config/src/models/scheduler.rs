use std::time::Duration;

use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// 调度周期的执行间隔
    pub poll_interval_seconds: u64,
    /// 上次作业完成后多久任务才重新到期
    pub due_delay_seconds: u64,
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
    pub fn due_delay(&self) -> Duration {
        Duration::from_secs(self.due_delay_seconds)
    }
}

impl ConfigValidator for SchedulerConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_timeout_seconds(self.poll_interval_seconds)?;

        // due_delay 允许超过1小时，但不能为0
        if self.due_delay_seconds == 0 {
            return Err(crate::ConfigError::Validation(
                "scheduler.due_delay_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_validation() {
        let config = SchedulerConfig {
            enabled: true,
            poll_interval_seconds: 60,
            due_delay_seconds: 600,
        };

        assert!(config.validate().is_ok());

        let mut invalid_config = config.clone();
        invalid_config.poll_interval_seconds = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.due_delay_seconds = 0;
        assert!(invalid_config.validate().is_err());

        // 超过1小时的到期延迟是合法的
        let mut long_delay = config.clone();
        long_delay.due_delay_seconds = 86400;
        assert!(long_delay.validate().is_ok());
    }

    #[test]
    fn test_scheduler_config_durations() {
        let config = SchedulerConfig {
            enabled: true,
            poll_interval_seconds: 60,
            due_delay_seconds: 600,
        };

        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.due_delay(), Duration::from_secs(600));
    }
}
