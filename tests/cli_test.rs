//! End-to-end tests of the droid-e2e binary.
//!
//! Every run gets a fresh working directory so no stray `droid-e2e.toml` is
//! picked up, and SDK tools are replaced by shell scripts where needed.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn droid_e2e(workdir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_droid-e2e"));
    cmd.args(args)
        .current_dir(workdir)
        .env_remove("DROID_E2E_CONFIG")
        .env("RUST_LOG", "warn");
    cmd
}

fn run(args: &[&str]) -> Output {
    let workdir = TempDir::new().unwrap();
    droid_e2e(workdir.path(), args).output().unwrap()
}

fn combined(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn test_no_arguments_prints_usage() {
    let output = run(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage: droid-e2e <command>"));
}

#[test]
fn test_unknown_command() {
    let output = run(&["launchRockets"]);
    assert_eq!(output.status.code(), Some(1));
    let text = combined(&output);
    assert!(text.contains("Unknown command launchRockets"));
    assert!(text.contains("Usage: droid-e2e <command>"));
}

#[test]
fn test_create_and_start_requires_api_level() {
    let output = run(&["createAndStart", "-d", "pixel_5"]);
    assert_eq!(output.status.code(), Some(1));
    let text = combined(&output);
    assert!(text.contains("API-LEVEL (-a) is required and was not provided"));
    assert!(text.contains("Usage: droid-e2e <command>"));
}

#[test]
fn test_create_and_start_requires_device() {
    let output = run(&["createAndStart", "-a", "33"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(combined(&output).contains("DEVICE (-d) is required and was not provided"));
}

#[test]
fn test_bugreport_requires_output_directory() {
    let output = run(&["bugreport"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(combined(&output).contains("OUTPUT-DIRECTORY (-o) is required and was not provided"));
}

#[test]
fn test_setup_reverse_port_requires_port() {
    let output = run(&["setupReversePort"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(combined(&output).contains("PORT is required and was not provided"));
}

#[test]
fn test_unrecognized_flag_is_usage_error() {
    let output = run(&["bugreport", "-z", "/tmp"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(combined(&output).contains("Usage: droid-e2e <command>"));
}

#[test]
fn test_help_and_version_succeed() {
    let help = run(&["--help"]);
    assert_eq!(help.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&help.stdout).contains("copyAppData"));

    let version = run(&["--version"]);
    assert_eq!(version.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&version.stdout).starts_with("droid-e2e "));
}

#[test]
fn test_malformed_config_file_fails() {
    let workdir = TempDir::new().unwrap();
    std::fs::write(workdir.path().join("droid-e2e.toml"), "[emulator\n").unwrap();

    let output = droid_e2e(workdir.path(), &["setupReversePort", "8081"])
        .env("ANDROID_HOME", workdir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined(&output).contains("TOML parse error"));
}

#[cfg(unix)]
mod with_fake_sdk {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// An SDK root whose `adb` runs `body`
    fn fake_sdk(body: &str) -> TempDir {
        let sdk = TempDir::new().unwrap();
        let tools = sdk.path().join("platform-tools");
        std::fs::create_dir_all(&tools).unwrap();
        let adb = tools.join("adb");
        std::fs::write(&adb, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&adb, std::fs::Permissions::from_mode(0o755)).unwrap();
        sdk
    }

    #[test]
    fn test_bugreport_writes_tool_output() {
        let sdk = fake_sdk("printf 'BUGREPORT\\nline two\\n'");
        let workdir = TempDir::new().unwrap();
        let out = workdir.path().join("artifacts").join("out");

        let output = droid_e2e(workdir.path(), &["bugreport", "-o", out.to_str().unwrap()])
            .env("ANDROID_HOME", sdk.path())
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(0), "{}", combined(&output));
        assert!(out.is_dir());
        assert_eq!(std::fs::read(out.join("bugreport")).unwrap(), b"BUGREPORT\nline two\n");
    }

    #[test]
    fn test_tool_exit_code_propagates() {
        let sdk = fake_sdk("echo 'error: no devices/emulators found' >&2; exit 4");
        let workdir = TempDir::new().unwrap();

        let output = droid_e2e(workdir.path(), &["setupReversePort", "8081"])
            .env("ANDROID_HOME", sdk.path())
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(4));
        assert!(combined(&output).contains("no devices/emulators found"));
    }

    #[test]
    fn test_config_file_changes_target_serial() {
        let workdir = TempDir::new().unwrap();
        let record = workdir.path().join("adb-args");
        let sdk = fake_sdk(&format!("echo \"$@\" > {}", record.display()));
        let config = workdir.path().join("ci.toml");
        std::fs::write(&config, "[emulator]\nport = 5560\n").unwrap();

        let output = droid_e2e(workdir.path(), &["setupReversePort", "9000"])
            .env("ANDROID_HOME", sdk.path())
            .env("DROID_E2E_CONFIG", &config)
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(0), "{}", combined(&output));
        assert_eq!(
            std::fs::read_to_string(record).unwrap().trim(),
            "-s emulator-5560 reverse tcp:9000 tcp:9000"
        );
    }

    fn script(path: &Path, body: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Host tools on `PATH` and SDK tools under `sdk/`, each appending
    /// `<name> <args>` to `calls.log`. The emulator marks itself started so
    /// adb only reports a device after the launch.
    struct FakeHost {
        dir: TempDir,
    }

    impl FakeHost {
        fn new(sdkmanager_body: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            let log = root.join("calls.log");
            let started = root.join("started");
            let record = |name: &str| format!("echo \"{} $*\" >> {}", name, log.display());

            script(&root.join("bin").join("udevadm"), &record("udevadm"));
            script(&root.join("bin").join("apt-get"), &record("apt-get"));

            let sdk_bin = root.join("sdk").join("cmdline-tools").join("latest").join("bin");
            script(
                &sdk_bin.join("sdkmanager"),
                &format!("{}\n{}", record("sdkmanager"), sdkmanager_body),
            );
            script(&sdk_bin.join("avdmanager"), &record("avdmanager"));
            script(
                &root.join("sdk").join("emulator").join("emulator"),
                &format!(
                    "{}\necho \"emulator booting\"\ntouch {}\nexec sleep 5",
                    record("emulator"),
                    started.display()
                ),
            );
            script(
                &root.join("sdk").join("platform-tools").join("adb"),
                &format!(
                    "{}\ncase \"$3\" in\n  get-state) if [ -f {} ]; then echo device; else echo offline; fi ;;\n  shell) echo 1 ;;\nesac",
                    record("adb"),
                    started.display()
                ),
            );

            std::fs::write(
                root.join("ci.toml"),
                format!(
                    "[emulator]\nlog_file = \"{}\"\npid_file = \"{}\"\nboot_timeout_secs = 30\npoll_initial_ms = 20\npoll_max_ms = 80\n\n[host]\nkvm_rule_path = \"{}\"\n",
                    root.join("emulator-logs.txt").display(),
                    root.join("emulator.pid").display(),
                    root.join("99-kvm4all.rules").display()
                ),
            )
            .unwrap();

            Self { dir }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn create_and_start(&self) -> Output {
            let path = format!(
                "{}:{}",
                self.path().join("bin").display(),
                std::env::var("PATH").unwrap_or_default()
            );
            droid_e2e(self.path(), &["createAndStart", "-a", "33", "-d", "pixel_5"])
                .env("PATH", path)
                .env("ANDROID_HOME", self.path().join("sdk"))
                .env("DROID_E2E_CONFIG", self.path().join("ci.toml"))
                .output()
                .unwrap()
        }

        fn calls(&self) -> Vec<String> {
            std::fs::read_to_string(self.path().join("calls.log"))
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[test]
    fn test_create_and_start_runs_steps_in_order() {
        let host = FakeHost::new("");

        let output = host.create_and_start();

        assert_eq!(output.status.code(), Some(0), "{}", combined(&output));
        let rule = std::fs::read_to_string(host.path().join("99-kvm4all.rules")).unwrap();
        assert!(rule.contains("KERNEL==\"kvm\""));

        let calls = host.calls();
        let image = "system-images;android-33;default;x86_64";
        let expected = [
            "udevadm control --reload-rules".to_string(),
            "udevadm trigger --name-match=kvm".to_string(),
            "apt-get install -y libpulse0".to_string(),
            "sdkmanager --licenses".to_string(),
            format!("sdkmanager emulator {} platform-tools", image),
            format!("avdmanager create avd -n e2e_emulator -k {} -d pixel_5 --force", image),
            "emulator -avd e2e_emulator -port 5554 -no-window -no-audio -no-boot-anim -partition-size 4096"
                .to_string(),
        ];
        assert!(calls.len() > expected.len(), "{:?}", calls);
        assert_eq!(&calls[..expected.len()], &expected[..]);
        assert!(calls[expected.len()..]
            .iter()
            .all(|call| call.starts_with("adb -s emulator-5554 ")));
        assert!(calls.contains(&"adb -s emulator-5554 shell getprop sys.boot_completed".to_string()));

        // The emulator log is echoed once the boot wait ends
        assert!(String::from_utf8_lossy(&output.stdout).contains("emulator booting"));
        assert!(host.path().join("emulator.pid").is_file());
    }

    #[test]
    fn test_create_and_start_stops_at_failing_sdk_step() {
        let host = FakeHost::new("exit 9");

        let output = host.create_and_start();

        assert_eq!(output.status.code(), Some(9));
        let calls = host.calls();
        assert_eq!(calls.last().map(String::as_str), Some("sdkmanager --licenses"));
        assert!(!calls.iter().any(|call| call.starts_with("avdmanager")
            || call.starts_with("emulator")
            || call.starts_with("adb")));
        assert!(!host.path().join("emulator-logs.txt").exists());
    }

    #[test]
    fn test_create_and_start_survives_unwritable_pid_file() {
        let host = FakeHost::new("");
        let config = host.path().join("ci.toml");
        let mut text = std::fs::read_to_string(&config).unwrap();
        text = text.replace(
            &format!("pid_file = \"{}\"", host.path().join("emulator.pid").display()),
            &format!(
                "pid_file = \"{}\"",
                host.path().join("missing").join("emulator.pid").display()
            ),
        );
        std::fs::write(&config, text).unwrap();

        let output = host.create_and_start();

        assert_eq!(output.status.code(), Some(0), "{}", combined(&output));
        assert!(combined(&output).contains("Cannot record emulator pid"));
        assert!(host
            .calls()
            .contains(&"adb -s emulator-5554 shell getprop sys.boot_completed".to_string()));
    }
}
