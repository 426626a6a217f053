use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entities::DueSync;

/// 某个镜像队列类别的并发/优先级策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueClass {
    /// None 表示不限并发
    pub concurrency: Option<i32>,
    pub priority: i32,
}

impl QueueClass {
    pub fn new(concurrency: Option<i32>, priority: i32) -> Self {
        // 并发为0等同于"不限"，存为None而不是字面0（字面0意味着不允许任何作业）
        let concurrency = concurrency.filter(|c| *c > 0);
        Self {
            concurrency,
            priority,
        }
    }
}

/// 镜像队列类别到并发/优先级的映射，由配置提供而非写死在查询里
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    default_class: QueueClass,
    classes: HashMap<String, QueueClass>,
}

impl QueuePolicy {
    pub fn new(default_class: QueueClass, classes: HashMap<String, QueueClass>) -> Self {
        Self {
            default_class,
            classes,
        }
    }

    pub fn class_for(&self, image_queue: &str) -> QueueClass {
        self.classes
            .get(image_queue)
            .copied()
            .unwrap_or(self.default_class)
    }

    /// 队列标识是 (镜像队列, 提供方) 的纯函数；共享该组合的同步任务共享同一队列
    pub fn queue_name(image_queue: &str, provider: &str) -> String {
        format!("{image_queue}-{provider}")
    }

    pub fn spec_for(&self, due: &DueSync) -> QueueSpec {
        let class = self.class_for(&due.image_queue);
        QueueSpec::new(
            Self::queue_name(&due.image_queue, &due.provider),
            class.concurrency,
            class.priority,
        )
    }
}

/// 队列注册器的输入：队列名及其应当生效的并发/优先级
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSpec {
    pub name: String,
    pub concurrency: Option<i32>,
    pub priority: i32,
}

impl QueueSpec {
    pub fn new(name: String, concurrency: Option<i32>, priority: i32) -> Self {
        let concurrency = concurrency.filter(|c| *c > 0);
        Self {
            name,
            concurrency,
            priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn due(provider: &str, image_queue: &str) -> DueSync {
        DueSync {
            sync_id: Uuid::new_v4(),
            provider: provider.to_string(),
            image_queue: image_queue.to_string(),
        }
    }

    fn policy() -> QueuePolicy {
        let mut classes = HashMap::new();
        classes.insert("github".to_string(), QueueClass::new(Some(1), 1));
        QueuePolicy::new(QueueClass::new(Some(2), 2), classes)
    }

    #[test]
    fn test_queue_name_is_pure_function_of_pairing() {
        assert_eq!(QueuePolicy::queue_name("github", "github"), "github-github");
        assert_eq!(QueuePolicy::queue_name("sync", "gitlab"), "sync-gitlab");
    }

    #[test]
    fn test_policy_resolves_override_and_default() {
        let policy = policy();

        let spec = policy.spec_for(&due("github", "github"));
        assert_eq!(spec.name, "github-github");
        assert_eq!(spec.concurrency, Some(1));
        assert_eq!(spec.priority, 1);

        let spec = policy.spec_for(&due("gitlab", "sync"));
        assert_eq!(spec.name, "sync-gitlab");
        assert_eq!(spec.concurrency, Some(2));
        assert_eq!(spec.priority, 2);
    }

    #[test]
    fn test_zero_concurrency_normalized_to_unbounded() {
        let class = QueueClass::new(Some(0), 3);
        assert_eq!(class.concurrency, None);

        let spec = QueueSpec::new("sync-github".to_string(), Some(0), 3);
        assert_eq!(spec.concurrency, None);
    }
}
