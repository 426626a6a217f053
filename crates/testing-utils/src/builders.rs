//! Test data builders for creating test entities
//!
//! This module provides builder patterns for creating test data with
//! sensible defaults and easy customization.

use chrono::Utc;
use uuid::Uuid;

use syncsched_domain::entities::ContainerSync;

/// Builder for creating test ContainerSync entities
pub struct ContainerSyncBuilder {
    sync: ContainerSync,
}

impl ContainerSyncBuilder {
    pub fn new() -> Self {
        Self {
            sync: ContainerSync {
                id: Uuid::new_v4(),
                repo: "github.com/acme/widgets".to_string(),
                provider: "github".to_string(),
                image_queue: "sync".to_string(),
                created_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.sync.id = id;
        self
    }

    pub fn with_repo(mut self, repo: &str) -> Self {
        self.sync.repo = repo.to_string();
        self
    }

    pub fn with_provider(mut self, provider: &str) -> Self {
        self.sync.provider = provider.to_string();
        self
    }

    pub fn with_image_queue(mut self, image_queue: &str) -> Self {
        self.sync.image_queue = image_queue.to_string();
        self
    }

    pub fn build(self) -> ContainerSync {
        self.sync
    }
}

impl Default for ContainerSyncBuilder {
    fn default() -> Self {
        Self::new()
    }
}
