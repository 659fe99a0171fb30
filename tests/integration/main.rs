//! Integration tests for cachegate

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn cachegate() -> Command {
        cargo_bin_cmd!("cachegate")
    }

    #[test]
    fn help_displays() {
        cachegate()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache restore/save steps"));
    }

    #[test]
    fn version_displays() {
        cachegate()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cachegate"));
    }

    #[test]
    fn config_path() {
        cachegate()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn unknown_subcommand_fails() {
        cachegate().arg("evict").assert().failure();
    }
}

mod step_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SCRUBBED_VARS: &[&str] = &[
        "INPUT_KEY",
        "INPUT_PATH",
        "INPUT_RESTORE-KEYS",
        "INPUT_RESTORE_KEYS",
        "INPUT_REQUIRED",
        "INPUT_UPLOAD-CHUNK-SIZE",
        "INPUT_UPLOAD_CHUNK_SIZE",
        "GITHUB_OUTPUT",
        "GITHUB_RUN_ID",
        "CI_JOB_ID",
        "BUILDKITE_JOB_ID",
        "CACHEGATE_RUN_ID",
        "CACHEGATE_STORE_DIR",
        "CACHEGATE_STATE_DIR",
    ];

    /// Workspace with its own store, state dir, output file and config
    struct Pipeline {
        temp: TempDir,
    }

    impl Pipeline {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            fs::create_dir_all(temp.path().join("work")).unwrap();
            Self { temp }
        }

        fn work(&self) -> PathBuf {
            self.temp.path().join("work")
        }

        fn output_file(&self) -> PathBuf {
            self.temp.path().join("github_output")
        }

        fn outputs(&self) -> String {
            fs::read_to_string(self.output_file()).unwrap_or_default()
        }

        fn clear_outputs(&self) {
            let _ = fs::remove_file(self.output_file());
        }

        fn step(&self, name: &str) -> Command {
            let mut cmd = cargo_bin_cmd!("cachegate");
            for var in SCRUBBED_VARS {
                cmd.env_remove(var);
            }
            cmd.current_dir(self.work())
                .env("CACHEGATE_CONFIG", self.temp.path().join("config.toml"))
                .arg(name)
                .arg("--run-id")
                .arg("run-1")
                .arg("--store-dir")
                .arg(self.temp.path().join("store"))
                .arg("--state-dir")
                .arg(self.temp.path().join("state"))
                .arg("--output-file")
                .arg(self.output_file());
            cmd
        }

        fn write_deps(&self, content: &str) {
            let deps = self.work().join("deps");
            fs::create_dir_all(&deps).unwrap();
            fs::write(deps.join("lib.txt"), content).unwrap();
        }

        fn read_deps(&self) -> Option<String> {
            fs::read_to_string(self.work().join("deps").join("lib.txt")).ok()
        }

        fn remove_deps(&self) {
            fs::remove_dir_all(self.work().join("deps")).unwrap();
        }

        fn save(&self, key: &str) {
            self.step("save")
                .args(["--key", key, "--path", "deps"])
                .assert()
                .success();
        }

        fn write_file(&self, rel: &str, content: &str) {
            let path = self.work().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn read_file(&self, rel: &str) -> Option<String> {
            fs::read_to_string(self.work().join(rel)).ok()
        }

        /// Run state files currently on disk
        fn state_files(&self) -> Vec<PathBuf> {
            let dir = self.temp.path().join("state").join("runs");
            match fs::read_dir(dir) {
                Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
                Err(_) => vec![],
            }
        }
    }

    fn has_line(outputs: &str, line: &str) -> bool {
        outputs.lines().any(|l| l == line)
    }

    #[test]
    fn key_emits_primary_key() {
        let pipeline = Pipeline::new();

        pipeline
            .step("key")
            .args(["--key", "  v1-deps-abc  "])
            .assert()
            .success();

        assert_eq!(pipeline.outputs(), "cache-primary-key=v1-deps-abc\n");
    }

    #[test]
    fn key_reads_step_input_from_env() {
        let pipeline = Pipeline::new();

        pipeline
            .step("key")
            .env("INPUT_KEY", "v2-env")
            .assert()
            .success();

        assert!(has_line(&pipeline.outputs(), "cache-primary-key=v2-env"));
    }

    #[test]
    fn key_missing_is_configuration_error() {
        let pipeline = Pipeline::new();

        pipeline
            .step("key")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Input required and not supplied: key"));
    }

    #[test]
    fn required_miss_fails_with_every_key() {
        let pipeline = Pipeline::new();

        pipeline
            .step("restore")
            .args(["--key", "v1-deps", "--path", "deps", "--restore-key", "v1-"])
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "Cache not found for input keys: v1-deps, v1-",
            ));

        // Primary key is emitted and recorded before the lookup
        assert!(has_line(&pipeline.outputs(), "cache-primary-key=v1-deps"));
        assert_eq!(pipeline.state_files().len(), 1);
    }

    #[test]
    fn optional_miss_succeeds_without_hit() {
        let pipeline = Pipeline::new();

        pipeline
            .step("restore")
            .args(["--key", "v1-deps", "--path", "deps", "--required", "false"])
            .assert()
            .success();

        let outputs = pipeline.outputs();
        assert!(has_line(&outputs, "cache-hit=false"));
        assert!(!outputs.contains("cache-matched-key"));
    }

    #[test]
    fn save_then_restore_exact_hit() {
        let pipeline = Pipeline::new();
        pipeline.write_deps("left-pad");
        pipeline
            .step("save")
            .args(["--key", "v1-deps", "--path", "deps"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Cache saved with key: v1-deps"));
        pipeline.remove_deps();

        pipeline
            .step("restore")
            .args(["--key", "v1-deps", "--path", "deps"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Cache restored from key: v1-deps"));

        let outputs = pipeline.outputs();
        assert!(has_line(&outputs, "cache-primary-key=v1-deps"));
        assert!(has_line(&outputs, "cache-matched-key=v1-deps"));
        assert!(has_line(&outputs, "cache-hit=true"));
        assert_eq!(pipeline.read_deps().as_deref(), Some("left-pad"));
    }

    #[test]
    fn restore_key_gives_fallback_hit() {
        let pipeline = Pipeline::new();
        pipeline.write_deps("old");
        pipeline.save("v1-deps-old");
        pipeline.remove_deps();

        pipeline
            .step("restore")
            .args([
                "--key",
                "v1-deps-new",
                "--path",
                "deps",
                "--restore-key",
                "v1-deps-",
            ])
            .assert()
            .success();

        let outputs = pipeline.outputs();
        assert!(has_line(&outputs, "cache-matched-key=v1-deps-old"));
        assert!(has_line(&outputs, "cache-hit=false"));
        assert_eq!(pipeline.read_deps().as_deref(), Some("old"));
    }

    #[test]
    fn save_uses_key_recorded_by_restore() {
        let pipeline = Pipeline::new();

        pipeline
            .step("restore")
            .args(["--key", "v1-recorded", "--path", "deps", "--required", "false"])
            .assert()
            .success();
        assert_eq!(pipeline.state_files().len(), 1);

        pipeline.write_deps("built");
        pipeline
            .step("save")
            .args(["--path", "deps"])
            .assert()
            .success();

        // Run state is discarded once saved
        assert!(pipeline.state_files().is_empty());

        pipeline.clear_outputs();
        pipeline
            .step("check")
            .args(["--key", "v1-recorded", "--path", "deps"])
            .assert()
            .success();
        assert!(has_line(&pipeline.outputs(), "cache-hit=true"));
    }

    #[test]
    fn save_without_any_key_fails() {
        let pipeline = Pipeline::new();
        pipeline.write_deps("built");

        pipeline
            .step("save")
            .args(["--path", "deps"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Input required and not supplied: key"));
    }

    #[test]
    fn second_save_of_same_key_succeeds() {
        let pipeline = Pipeline::new();
        pipeline.write_deps("first");
        pipeline.save("v1-deps");

        pipeline.write_deps("second");
        pipeline.save("v1-deps");

        pipeline.remove_deps();
        pipeline
            .step("restore")
            .args(["--key", "v1-deps", "--path", "deps"])
            .assert()
            .success();
        assert_eq!(pipeline.read_deps().as_deref(), Some("first"));
    }

    #[test]
    fn key_with_comma_is_fatal_on_save() {
        let pipeline = Pipeline::new();
        pipeline.write_deps("x");

        pipeline
            .step("save")
            .args(["--key", "v1,deps", "--path", "deps"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot contain commas"));
    }

    #[test]
    fn save_with_nothing_to_save_only_warns() {
        let pipeline = Pipeline::new();

        pipeline
            .step("save")
            .args(["--key", "v1-deps", "--path", "missing-dir"])
            .assert()
            .success();
    }

    #[test]
    fn check_reports_missing_key() {
        let pipeline = Pipeline::new();

        pipeline
            .step("check")
            .args(["--key", "v1-absent", "--path", "deps"])
            .assert()
            .success();

        let outputs = pipeline.outputs();
        assert!(has_line(&outputs, "cache-primary-key=v1-absent"));
        assert!(has_line(&outputs, "cache-hit=false"));
    }

    #[test]
    fn non_integer_chunk_size_from_env_is_rejected() {
        let pipeline = Pipeline::new();
        pipeline.write_deps("x");

        pipeline
            .step("save")
            .env("INPUT_UPLOAD_CHUNK_SIZE", "big")
            .args(["--key", "v1-deps", "--path", "deps"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("upload-chunk-size"));
    }

    #[test]
    fn two_caches_share_one_run() {
        let pipeline = Pipeline::new();

        for (key, path) in [("npm-abc", "node_modules"), ("cargo-def", "target")] {
            pipeline
                .step("restore")
                .args(["--key", key, "--path", path, "--required", "false"])
                .assert()
                .success();
        }
        assert_eq!(pipeline.state_files().len(), 2);

        pipeline.write_file("node_modules/pkg.json", "npm");
        pipeline.write_file("target/app", "cargo");
        for path in ["node_modules", "target"] {
            pipeline
                .step("save")
                .args(["--path", path])
                .assert()
                .success();
        }
        assert!(pipeline.state_files().is_empty());

        fs::remove_dir_all(pipeline.work().join("node_modules")).unwrap();
        fs::remove_dir_all(pipeline.work().join("target")).unwrap();
        for (key, path) in [("npm-abc", "node_modules"), ("cargo-def", "target")] {
            pipeline
                .step("restore")
                .args(["--key", key, "--path", path])
                .assert()
                .success();
        }
        assert_eq!(pipeline.read_file("node_modules/pkg.json").as_deref(), Some("npm"));
        assert_eq!(pipeline.read_file("target/app").as_deref(), Some("cargo"));
    }

    #[test]
    fn restore_replaces_state_of_unfinished_attempt() {
        let pipeline = Pipeline::new();

        for key in ["v1-first", "v1-second"] {
            pipeline
                .step("restore")
                .args(["--key", key, "--path", "deps", "--required", "false"])
                .assert()
                .success();
        }
        assert_eq!(pipeline.state_files().len(), 1);

        pipeline.write_deps("built");
        pipeline
            .step("save")
            .args(["--path", "deps"])
            .assert()
            .success();

        pipeline.clear_outputs();
        pipeline
            .step("check")
            .args(["--key", "v1-second", "--path", "deps"])
            .assert()
            .success();
        assert!(has_line(&pipeline.outputs(), "cache-hit=true"));
    }
}
