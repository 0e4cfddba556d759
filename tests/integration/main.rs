//! Integration tests for dotpub

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const PROJECT: &str = r#"<Project Sdk="Microsoft.NET.Sdk.Web">
  <PropertyGroup><TargetFramework>net6.0</TargetFramework></PropertyGroup>
</Project>"#;

    fn dotpub() -> Command {
        let mut cmd = cargo_bin_cmd!("dotpub");
        cmd.env_remove("BP_LOG_LEVEL").env_remove("DOTPUB_CONFIG");
        cmd
    }

    /// Isolated config, store and source directories
    struct Workspace {
        root: TempDir,
    }

    impl Workspace {
        fn new(dotnet: &str) -> Self {
            let root = TempDir::new().unwrap();
            let store = root.path().join("store");
            let config = format!(
                "[store]\nroot = {:?}\n\n[toolchain]\ndotnet = {:?}\nsdks = [\"6.0.100\"]\n",
                store.display().to_string(),
                dotnet
            );
            std::fs::create_dir_all(root.path().join("app")).unwrap();
            std::fs::write(root.path().join("config.toml"), config).unwrap();
            Self { root }
        }

        fn with_project(self) -> Self {
            std::fs::write(self.source().join("app.csproj"), PROJECT).unwrap();
            std::fs::write(self.source().join("Program.cs"), "// My API V1\n").unwrap();
            self
        }

        fn source(&self) -> PathBuf {
            self.root.path().join("app")
        }

        fn cmd(&self, args: &[&str]) -> Command {
            let mut cmd = dotpub();
            cmd.arg("--no-local")
                .arg("--config")
                .arg(self.root.path().join("config.toml"))
                .args(args);
            cmd
        }
    }

    #[cfg(unix)]
    fn fake_dotnet(dir: &Path) -> String {
        use std::os::unix::fs::PermissionsExt;
        let script = dir.join("dotnet");
        std::fs::write(&script, "#!/bin/sh\necho \"fake dotnet $1\"\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.display().to_string()
    }

    #[test]
    fn help_displays() {
        dotpub()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("layer-caching build core"));
    }

    #[test]
    fn version_displays() {
        dotpub()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("dotpub"));
    }

    #[test]
    fn layers_empty_context() {
        let ws = Workspace::new("dotnet");
        ws.cmd(&["layers", "--context", "empty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No layers stored for context empty"));

        ws.cmd(&["layers", "--context", "empty", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn clear_missing_layer() {
        let ws = Workspace::new("dotnet");
        ws.cmd(&["clear", "--context", "empty", "--layer", "nuget-cache"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Layer not found"));
    }

    #[test]
    fn invalid_context_rejected() {
        let ws = Workspace::new("dotnet");
        ws.cmd(&["layers", "--context", "../escape"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid build context id"));
    }

    #[test]
    fn plan_missing_project() {
        let ws = Workspace::new("dotnet");
        let source = ws.source().display().to_string();
        ws.cmd(&["plan", "--no-env", "--source", &source])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read dependency manifest"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn plan_prints_invocation() {
        let ws = Workspace::new("dotnet").with_project();
        let source = ws.source().display().to_string();
        ws.cmd(&[
            "plan",
            "--no-env",
            "--source",
            &source,
            "-e",
            "BP_DOTNET_PUBLISH_FLAGS=--verbosity=normal",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("dotnet publish"))
        .stdout(predicate::str::contains("--configuration Release"))
        .stdout(predicate::str::contains("--verbosity=normal"));
    }

    #[cfg(unix)]
    #[test]
    fn plan_tolerates_non_utf8_environment() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let ws = Workspace::new("dotnet").with_project();
        let source = ws.source().display().to_string();
        ws.cmd(&["plan", "--source", &source])
            .env("DOTPUB_TEST_UNRELATED", OsStr::from_bytes(b"\xff"))
            .env("BP_CUSTOM_BYTES", OsStr::from_bytes(b"a\xffb"))
            .assert()
            .success()
            .stdout(predicate::str::starts_with("dotnet publish"));
    }

    #[test]
    fn plan_warns_on_conflicting_configuration() {
        let ws = Workspace::new("dotnet").with_project();
        let source = ws.source().display().to_string();
        ws.cmd(&[
            "plan",
            "--no-env",
            "--source",
            &source,
            "-e",
            "BP_DEBUG_ENABLED=true",
            "-e",
            "BP_DOTNET_PUBLISH_FLAGS=--configuration Release",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("--configuration Release"))
        .stderr(predicate::str::contains(
            "BP_DEBUG_ENABLED forces Debug but publish flags request the Release configuration",
        ));
    }

    #[test]
    fn plan_unsupported_framework() {
        let ws = Workspace::new("dotnet");
        std::fs::write(
            ws.source().join("app.csproj"),
            PROJECT.replace("net6.0", "net8.0"),
        )
        .unwrap();
        let source = ws.source().display().to_string();
        ws.cmd(&["plan", "--no-env", "--source", &source])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported target framework net8.0"));
    }

    #[test]
    fn config_show_and_path() {
        let ws = Workspace::new("dotnet");
        ws.cmd(&["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[toolchain]"))
            .stdout(predicate::str::contains("6.0.100"));
        ws.cmd(&["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[cfg(unix)]
    #[test]
    fn build_then_reuse() {
        let bin = TempDir::new().unwrap();
        let ws = Workspace::new(&fake_dotnet(bin.path())).with_project();
        let source = ws.source().display().to_string();
        let args = ["build", "--no-env", "--context", "app", "--source", &source];

        ws.cmd(&args)
            .assert()
            .success()
            .stdout(predicate::str::contains("Setting up layer 'nuget-cache'"))
            .stdout(predicate::str::contains("Rebuilding layer"))
            .stdout(predicate::str::contains("fake dotnet publish"));

        ws.cmd(&args)
            .assert()
            .success()
            .stdout(predicate::str::contains("Reusing cached layer"))
            .stdout(predicate::str::contains("Rebuilding layer").not());

        ws.cmd(&["layers", "--context", "app", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("nuget-cache"))
            .stdout(predicate::str::contains("publish-output"));

        ws.cmd(&["clear", "--context", "app"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 2 layer(s)"));
    }
}
