//! Doctor command for system diagnostics
//!
//! Probes the embedding service, the vector index and the language model
//! concurrently, and checks that the session directory is writable.

use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::clients::{EmbeddingClient, LanguageModelClient, VectorIndex};
use crate::errors::Result;
use crate::rag::retrieval::engine::with_timeout;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

/// Doctor diagnostics system
pub struct Doctor {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LanguageModelClient>,
    storage_dir: PathBuf,
    probe_timeout: Duration,
}

fn probe_status(component: &str, result: Result<bool>) -> HealthStatus {
    match result {
        Ok(true) => HealthStatus::Pass,
        Ok(false) => HealthStatus::Warn(format!("{} reachable but not ready", component)),
        Err(e) => HealthStatus::Fail(e.to_string()),
    }
}

impl Doctor {
    /// Create a new doctor instance
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LanguageModelClient>,
        storage_dir: PathBuf,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            storage_dir,
            probe_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let limit = self.probe_timeout;
        let (embedding, index, llm) = tokio::join!(
            with_timeout("embedding health check", limit, self.embedder.health_check()),
            with_timeout("index health check", limit, self.index.health_check()),
            with_timeout("model health check", limit, self.llm.health_check()),
        );

        vec![
            HealthCheck {
                name: "Embedding service".to_string(),
                status: probe_status("Embedding service", embedding),
            },
            HealthCheck {
                name: "Vector index".to_string(),
                status: probe_status("Vector index", index),
            },
            HealthCheck {
                name: format!("Language model ({})", self.llm.model_name()),
                status: probe_status("Language model", llm),
            },
            self.check_storage(),
        ]
    }

    /// Session directory exists (or can be created) and is writable
    fn check_storage(&self) -> HealthCheck {
        let name = "Session storage".to_string();

        if let Err(e) = std::fs::create_dir_all(&self.storage_dir) {
            return HealthCheck {
                name,
                status: HealthStatus::Fail(format!("Cannot create {}: {}", self.storage_dir.display(), e)),
            };
        }

        let test_file = self.storage_dir.join(".longevity_rag_test");
        match std::fs::write(&test_file, "test") {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_file);
                HealthCheck {
                    name,
                    status: HealthStatus::Pass,
                }
            }
            Err(_) => HealthCheck {
                name,
                status: HealthStatus::Warn(format!(
                    "No write permission in {}; sessions will not be saved",
                    self.storage_dir.display()
                )),
            },
        }
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n{}\n", "Longevity RAG Diagnostics".bold());
        println!("{:<32} Status", "Check");
        println!("{}", "=".repeat(60));

        for check in checks {
            let message = match &check.status {
                HealthStatus::Pass => "PASS".green().to_string(),
                HealthStatus::Warn(msg) => format!("WARN: {}", msg).yellow().to_string(),
                HealthStatus::Fail(msg) => format!("FAIL: {}", msg).red().to_string(),
            };
            println!("{:<32} {}", check.name, message);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryIndex;
    use crate::errors::RagError;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct DownEmbedder;

    #[async_trait]
    impl EmbeddingClient for DownEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(RagError::Embedding("connection refused".to_string()))
        }

        async fn health_check(&self) -> Result<bool> {
            Err(RagError::Embedding("connection refused".to_string()))
        }
    }

    struct SlowModel;

    #[async_trait]
    impl LanguageModelClient for SlowModel {
        async fn generate(&self, _prompt: &str, _max_tokens: usize) -> Result<String> {
            Ok(String::new())
        }

        fn model_name(&self) -> &str {
            "slow"
        }

        async fn health_check(&self) -> Result<bool> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(true)
        }
    }

    #[test]
    fn test_health_status_equality() {
        assert_eq!(HealthStatus::Pass, HealthStatus::Pass);
        assert_eq!(
            HealthStatus::Warn("test".to_string()),
            HealthStatus::Warn("test".to_string())
        );
    }

    #[test]
    fn test_overall_status() {
        let checks = vec![
            HealthCheck {
                name: "Test 1".to_string(),
                status: HealthStatus::Pass,
            },
            HealthCheck {
                name: "Test 2".to_string(),
                status: HealthStatus::Warn("warning".to_string()),
            },
        ];
        assert!(Doctor::overall_status(&checks));

        let failing = vec![HealthCheck {
            name: "Test 3".to_string(),
            status: HealthStatus::Fail("error".to_string()),
        }];
        assert!(!Doctor::overall_status(&failing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_diagnostics_report_each_component() {
        let dir = TempDir::new().unwrap();
        let doctor = Doctor::new(
            Arc::new(DownEmbedder),
            Arc::new(InMemoryIndex::new()),
            Arc::new(SlowModel),
            dir.path().join("sessions"),
        );

        let checks = doctor.run_diagnostics().await;
        assert_eq!(checks.len(), 4);
        assert!(matches!(checks[0].status, HealthStatus::Fail(_)));
        assert_eq!(checks[1].status, HealthStatus::Pass);
        assert_eq!(checks[2].name, "Language model (slow)");
        assert!(matches!(&checks[2].status, HealthStatus::Fail(msg) if msg.contains("timed out")));
        assert_eq!(checks[3].status, HealthStatus::Pass);
        assert!(!Doctor::overall_status(&checks));
    }
}
