//! Integration tests for IaCDrift.
//!
//! These tests verify the end-to-end behavior of the chunker over fixture
//! repositories, the JSONL writer, and the command-line interface.

use iacdrift::{ChunkRecord, Chunker, Config, RepoChunks, RepoTarget};
use std::path::PathBuf;

/// Get the path to the test fixtures directory.
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn chunk_fixture(name: &str) -> RepoChunks {
    Chunker::new(Config::default())
        .with_update_at("2024-05-01T00:00:00Z")
        .chunk_directory(&RepoTarget::local(fixtures_path().join(name)))
        .unwrap()
}

fn find<'a>(records: &'a [ChunkRecord], address: &str) -> &'a ChunkRecord {
    records
        .iter()
        .find(|r| r.resource_address == address)
        .unwrap_or_else(|| panic!("no chunk with address {address}"))
}

mod chunking_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resource_and_provider() {
        let repo = chunk_fixture("basic");
        assert_eq!(repo.records.len(), 2);

        let resource = find(&repo.records, "resource.aws_instance.web");
        assert_eq!(resource.resource_type, "resource");
        assert_eq!(resource.region, "us-east-1");
        assert_eq!(resource.lines, "1-1");
        assert_eq!(resource.file, "main.tf");
        assert_eq!(resource.module, "root");

        let provider = find(&repo.records, "aws");
        assert_eq!(provider.lines, "2-2");
    }

    #[test]
    fn test_malformed_file_falls_back_to_windows() {
        let repo = chunk_fixture("malformed");
        assert_eq!(repo.fallback_files, 1);
        assert!(!repo.records.is_empty());
        assert!(repo.records.iter().all(|r| r.resource_type == "fallback"));
        assert_eq!(repo.records[0].lines, "1-6");
        assert_eq!(repo.records[0].region, "unknown");
    }

    #[test]
    fn test_variables_resolved_from_tfvars() {
        let repo = chunk_fixture("variables");
        assert_eq!(
            repo.var_files,
            vec![fixtures_path().join("variables/terraform.tfvars")]
        );

        let app = find(&repo.records, "resource.aws_instance.app");
        assert!(app.content.contains("instance_type = \"t3.micro\""));
        assert_eq!(app.lines, "5-8");
        assert_eq!(app.region, "eu-west-1");

        // The declaration keeps its own default
        let declared = find(&repo.records, "instance_type");
        assert_eq!(declared.resource_type, "variable");
        assert!(declared.content.contains("default = \"t2.micro\""));

        let tfvars = find(&repo.records, "terraform.tfvars");
        assert_eq!(tfvars.resource_type, "tfvars");
        assert_eq!(tfvars.lines, "1-1");
    }

    #[test]
    fn test_same_module_in_two_directories() {
        let repo = chunk_fixture("monorepo");
        let networks: Vec<&ChunkRecord> = repo
            .records
            .iter()
            .filter(|r| r.resource_address == "network")
            .collect();

        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].file, "envs/prod/main.tf");
        assert_eq!(networks[0].module, "root");
        assert_eq!(networks[1].file, "modules/net/main.tf");
        assert_eq!(networks[1].module, "modules/net");
        assert_ne!(networks[0].id, networks[1].id);

        let vpc = find(&repo.records, "resource.aws_vpc.this");
        assert_eq!(vpc.module, "modules/net");
        assert_eq!(vpc.lines, "5-7");
    }

    #[test]
    fn test_one_chunk_per_block() {
        let repo = chunk_fixture("coverage");

        let mut spans: Vec<(String, String)> = repo
            .records
            .iter()
            .map(|r| (r.resource_address.clone(), r.lines.clone()))
            .collect();
        spans.sort();

        let mut expected: Vec<(String, String)> = [
            ("terraform", "1-3"),
            ("aws", "5-7"),
            ("name", "9-12"),
            ("locals", "14-18"),
            ("data.aws_ami.ubuntu", "20-22"),
            ("resource.aws_instance.web", "24-27"),
            ("resource.aws_s3_bucket.logs", "29-31"),
            ("network", "33-35"),
            ("instance_id", "37-39"),
        ]
        .iter()
        .map(|(a, l)| ((*a).to_string(), (*l).to_string()))
        .collect();
        expected.sort();

        assert_eq!(spans, expected);
    }

    #[test]
    fn test_line_ranges_are_valid() {
        for fixture in ["basic", "malformed", "variables", "monorepo", "coverage"] {
            let root = fixtures_path().join(fixture);
            for record in chunk_fixture(fixture).records {
                let total = std::fs::read_to_string(root.join(&record.file))
                    .unwrap()
                    .lines()
                    .count();
                let (start, end) = record.lines.split_once('-').unwrap();
                let (start, end): (usize, usize) = (start.parse().unwrap(), end.parse().unwrap());
                assert!(1 <= start && start <= end && end <= total, "{fixture}: {}", record.lines);
            }
        }
    }

    #[test]
    fn test_deterministic_across_runs() {
        let first = chunk_fixture("coverage");
        let second = chunk_fixture("coverage");
        assert_eq!(first.records, second.records);
    }

    #[test]
    fn test_record_metadata() {
        let repo = Chunker::new(Config::default())
            .chunk_directory(&RepoTarget {
                path: fixtures_path().join("basic"),
                url: Some("https://github.com/acme/network-infra.git".to_string()),
                commit: Some("abc1234".to_string()),
                var_file: None,
            })
            .unwrap();

        let record = &repo.records[0];
        assert_eq!(record.repo, "https://github.com/acme/network-infra.git");
        assert_eq!(record.owner, "acme");
        assert_eq!(record.account, "acme");
        assert_eq!(record.record_type, "iac_configuration");
        assert_eq!(record.metadata.owner, "acme");
        assert_eq!(record.update_at.len(), "2024-05-01T00:00:00Z".len());
        assert!(record.update_at.ends_with('Z'));
    }
}

mod orchestration_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use iacdrift::IacDriftError;

    #[tokio::test]
    async fn test_chunk_repositories_aggregates() {
        let mut config = Config::default();
        config.repository.owner = Some("platform".to_string());
        let chunker = Chunker::new(config);

        let targets = vec![
            RepoTarget::local(fixtures_path().join("basic")),
            RepoTarget::local(fixtures_path().join("coverage")),
        ];
        let result = chunker.chunk_repositories(&targets).await;

        assert_eq!(result.repositories.len(), 2);
        assert_eq!(result.total_chunks(), 11);
        assert_eq!(result.owners(), vec!["platform".to_string()]);
        assert!(result.failures.is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let chunker = Chunker::new(Config::default());
        let err = chunker
            .chunk_path(RepoTarget::local(fixtures_path().join("does-not-exist")))
            .await
            .unwrap_err();
        assert!(matches!(err, IacDriftError::DirectoryNotFound { .. }));
        assert_eq!(err.exit_code(), 15);
    }
}

mod reporter_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use iacdrift::reporter::{JsonlWriter, Reporter};
    use iacdrift::types::{ChunkRunResult, OutputFormat};
    use tempfile::TempDir;

    fn run_result() -> ChunkRunResult {
        ChunkRunResult {
            repositories: vec![chunk_fixture("coverage")],
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_jsonl_files_split_by_size() {
        let out = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.dir = out.path().to_path_buf();
        config.output.max_bytes_per_file = 2048;

        let result = run_result();
        let files = JsonlWriter::new(&config).write_all(&result).unwrap();
        assert!(files.len() > 1);
        assert!(files[0].ends_with("coverage/coverage_0.jsonl"));

        let mut lines = 0;
        for file in &files {
            let content = std::fs::read_to_string(file).unwrap();
            for line in content.lines() {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                assert_eq!(value["type"], "iac_configuration");
                lines += 1;
            }
        }
        assert_eq!(lines, 9);
    }

    #[test]
    fn test_json_report() {
        let config = Config::default();
        let json = Reporter::new(&config)
            .generate(&run_result(), OutputFormat::Json)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["total_chunks"], 9);
        assert_eq!(parsed["repositories"][0]["chunks"].as_array().unwrap().len(), 9);
    }
}

mod cli_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn iacdrift() -> Command {
        let mut cmd = Command::cargo_bin("iacdrift").unwrap();
        cmd.env_remove("IACDRIFT_IGNORE")
            .env_remove("LIST_IGNORE_FILE")
            .env_remove("IACDRIFT_CONFIG");
        cmd
    }

    #[test]
    fn test_help() {
        iacdrift()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("chunk"));
    }

    #[test]
    fn test_chunk_json_to_stdout() {
        let work = TempDir::new().unwrap();
        let output = iacdrift()
            .current_dir(work.path())
            .args(["chunk", "--format", "json", "--repo-url", "https://github.com/acme/infra"])
            .arg(fixtures_path().join("basic"))
            .output()
            .unwrap();
        assert!(output.status.success());

        let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(parsed["total_chunks"], 2);
        assert_eq!(parsed["owners"][0], "acme");
    }

    #[test]
    fn test_chunk_jsonl_to_directory() {
        let work = TempDir::new().unwrap();
        let out = work.path().join("chunks");
        iacdrift()
            .current_dir(work.path())
            .args(["-q", "chunk", "--output"])
            .arg(&out)
            .arg(fixtures_path().join("monorepo"))
            .assert()
            .success();

        let content = std::fs::read_to_string(out.join("monorepo/monorepo_0.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_exclude_pattern() {
        let work = TempDir::new().unwrap();
        iacdrift()
            .current_dir(work.path())
            .args(["chunk", "--format", "text", "--exclude", "*.tfvars"])
            .arg(fixtures_path().join("variables"))
            .env("NO_COLOR", "1")
            .assert()
            .success()
            .stdout(predicate::str::contains("3 chunks from 1 repositories"));
    }

    #[test]
    fn test_missing_path_fails() {
        let work = TempDir::new().unwrap();
        iacdrift()
            .current_dir(work.path())
            .args(["chunk", "--format", "json", "does-not-exist"])
            .assert()
            .code(2);
    }

    #[test]
    fn test_init_and_validate() {
        let work = TempDir::new().unwrap();
        iacdrift().current_dir(work.path()).arg("init").assert().success();
        assert!(work.path().join("iacdrift.yaml").exists());

        iacdrift()
            .current_dir(work.path())
            .arg("validate")
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid"));

        iacdrift().current_dir(work.path()).arg("init").assert().failure();
    }
}
