//! A stateful in-memory WSL host for scenario tests.
//!
//! Understands exactly the commands the provisioner issues and keeps enough
//! state (registered distros, accounts, guest files, registry) to make the
//! second run of a scenario observe the effects of the first.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::collections::BTreeMap;
use std::sync::Mutex;
use wslup_boundary::{
    Boundary, BoundaryError, ExecOutput, ExecuteOptions, Identity, StdinSource, Target,
};
use wslup_converge::test_utils::command_line;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestFile {
    pub content: Vec<u8>,
    pub mode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub uid: u32,
    pub password: Option<String>,
    pub groups: Vec<String>,
}

#[derive(Debug, Default)]
pub struct State {
    /// Registered distros and the WSL version they run under.
    pub distros: BTreeMap<String, u32>,
    pub default_version: u32,
    pub accounts: BTreeMap<String, Account>,
    pub files: BTreeMap<String, GuestFile>,
    /// `DefaultUid` per distro.
    pub registry: BTreeMap<String, u32>,
    pub terminated: Vec<String>,
    pub bootstrap_runs: Vec<Vec<String>>,
    pub fail_install: bool,
    pub fail_chpasswd: bool,
}

#[derive(Default)]
pub struct FakeWsl {
    pub state: Mutex<State>,
    log: Mutex<Vec<(Target, String)>>,
}

impl FakeWsl {
    /// Windows host with WSL enabled but nothing installed.
    pub fn fresh() -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().default_version = 1;
        fake
    }

    /// A WSL2 Ubuntu without any account besides root.
    pub fn with_distro(name: &str) -> Self {
        let fake = Self::fresh();
        fake.state.lock().unwrap().distros.insert(name.to_string(), 2);
        fake
    }

    pub fn add_account(&self, name: &str, password: &str) {
        let mut state = self.state.lock().unwrap();
        let uid = 1000 + state.accounts.len() as u32;
        state.accounts.insert(
            name.to_string(),
            Account {
                uid,
                password: Some(password.to_string()),
                groups: vec![],
            },
        );
    }

    pub fn file(&self, path: &str) -> Option<GuestFile> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    pub fn put_file(&self, path: &str, content: &[u8], mode: u32) {
        self.state.lock().unwrap().files.insert(
            path.to_string(),
            GuestFile {
                content: content.to_vec(),
                mode,
            },
        );
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.commands().iter().any(|c| c.contains(pattern))
    }

    fn host(&self, state: &mut State, options: &ExecuteOptions) -> ExecOutput {
        let args: Vec<&str> = options.args.iter().map(String::as_str).collect();
        match (options.program.as_str(), args.as_slice()) {
            ("net", ["session"]) => ExecOutput::ok(""),
            ("wsl.exe", ["--set-default-version", v]) => {
                state.default_version = v.parse().unwrap_or(1);
                ExecOutput::ok("")
            }
            ("wsl.exe", ["--list", "--quiet"]) if state.distros.is_empty() => {
                ExecOutput::exit(-1, "Windows Subsystem for Linux has no installed distributions.")
            }
            ("wsl.exe", ["--list", "--quiet"]) => {
                let names: Vec<&str> = state.distros.keys().map(String::as_str).collect();
                ExecOutput::ok(format!("{}\n", names.join("\n")))
            }
            ("wsl.exe", ["--list", "--verbose"]) => {
                let mut out = String::from("  NAME      STATE           VERSION\n");
                for (name, version) in &state.distros {
                    out.push_str(&format!("  {name}    Stopped         {version}\n"));
                }
                ExecOutput::ok(out)
            }
            ("wsl.exe", ["--install", "--distribution", name, "--no-launch"]) => {
                if state.fail_install {
                    return ExecOutput::exit(1, "Error: 0x80370102 virtualization is disabled");
                }
                // older installers register the distro as WSL1 regardless
                state.distros.insert(name.to_string(), 1);
                ExecOutput::ok("Installing: Ubuntu\nUbuntu has been installed.\n")
            }
            ("wsl.exe", ["--set-version", name, v]) => match state.distros.get_mut(*name) {
                Some(version) => {
                    *version = v.parse().unwrap_or(2);
                    ExecOutput::ok("Conversion complete.\n")
                }
                None => ExecOutput::exit(1, "There is no distribution with the supplied name."),
            },
            ("wsl.exe", ["--terminate", name]) => {
                state.terminated.push(name.to_string());
                ExecOutput::ok("")
            }
            ("powershell.exe", [.., script]) => powershell(state, script),
            _ => ExecOutput::exit(127, format!("fake host: unknown command {}", command_line(options))),
        }
    }

    fn guest(
        &self,
        state: &mut State,
        distro: &str,
        identity: &Identity,
        options: &ExecuteOptions,
        stdin: Option<Vec<u8>>,
    ) -> ExecOutput {
        if !state.distros.contains_key(distro) {
            return ExecOutput::exit(-1, "There is no distribution with the supplied name.");
        }
        let args: Vec<&str> = options.args.iter().map(String::as_str).collect();
        let home = format!("/home/{}", identity.name());

        match (options.program.as_str(), args.as_slice()) {
            ("id", ["-u", name]) => match state.accounts.get(*name) {
                Some(account) => ExecOutput::ok(format!("{}\n", account.uid)),
                None => ExecOutput::exit(1, format!("id: '{name}': no such user")),
            },
            ("useradd", [.., name]) => {
                if state.accounts.contains_key(*name) {
                    return ExecOutput::exit(9, "useradd: user already exists");
                }
                let uid = 1000 + state.accounts.len() as u32;
                state.accounts.insert(
                    name.to_string(),
                    Account {
                        uid,
                        password: None,
                        groups: vec![],
                    },
                );
                ExecOutput::ok("")
            }
            ("chpasswd", []) => {
                if state.fail_chpasswd {
                    return ExecOutput::exit(1, "chpasswd: (line 1) cannot update password");
                }
                let line = String::from_utf8(stdin.unwrap_or_default()).unwrap();
                let (name, password) = line.trim_end_matches('\n').split_once(':').unwrap();
                match state.accounts.get_mut(name) {
                    Some(account) => {
                        account.password = Some(password.to_string());
                        ExecOutput::ok("")
                    }
                    None => ExecOutput::exit(1, "chpasswd: line 1: user does not exist"),
                }
            }
            ("usermod", ["-aG", group, name]) => match state.accounts.get_mut(*name) {
                Some(account) => {
                    account.groups.push(group.to_string());
                    ExecOutput::ok("")
                }
                None => ExecOutput::exit(6, "usermod: user does not exist"),
            },
            ("visudo", ["-cf", path]) => match state.files.get(*path) {
                Some(f) if f.content.ends_with(b"ALL=(ALL) NOPASSWD:ALL\n") => {
                    ExecOutput::ok(format!("{path}: parsed OK\n"))
                }
                _ => ExecOutput::exit(1, format!("{path}: syntax error")),
            },
            ("rm", ["-f", path]) => {
                state.files.remove(*path);
                ExecOutput::ok("")
            }
            ("bash", [path, rest @ ..]) => {
                if !state.files.contains_key(*path) {
                    return ExecOutput::exit(127, format!("bash: {path}: No such file or directory"));
                }
                state
                    .bootstrap_runs
                    .push(rest.iter().map(|s| s.to_string()).collect());
                bootstrap_report(rest)
            }
            ("sh", ["-c", script]) => shell(state, &home, script),
            _ => ExecOutput::exit(127, format!("fake guest: unknown command {}", command_line(options))),
        }
    }
}

fn powershell(state: &mut State, script: &str) -> ExecOutput {
    let distro = script
        .split("-eq '")
        .nth(1)
        .and_then(|rest| rest.split('\'').next())
        .unwrap_or_default()
        .to_string();
    if !state.distros.contains_key(&distro) {
        return if script.contains("Set-ItemProperty") {
            ExecOutput::exit(3, "")
        } else {
            ExecOutput::ok("")
        };
    }

    if let Some(rest) = script.split("-Value ").nth(1) {
        let uid = rest.split_whitespace().next().unwrap().parse().unwrap();
        state.registry.insert(distro, uid);
        return ExecOutput::ok("");
    }
    // WSL defaults to root until told otherwise
    let uid = state.registry.get(&distro).copied().unwrap_or(0);
    ExecOutput::ok(format!("{uid}\r\n"))
}

/// Interprets the guest `sh -c` scripts: payload injection, the profile
/// marker probe and `$HOME` lookup.
fn shell(state: &mut State, home: &str, script: &str) -> ExecOutput {
    if script.starts_with("grep -qxF") {
        let rc = script.rsplit('/').next().unwrap();
        let path = format!("{home}/{rc}");
        let marker = b"# >>> wslup >>>";
        return match state.files.get(&path) {
            Some(f) if f.content.split(|b| *b == b'\n').any(|l| l == marker) => ExecOutput::ok(""),
            _ => ExecOutput::exit(1, ""),
        };
    }
    if script == "printf '%s' \"$HOME\"" {
        return ExecOutput::ok(home);
    }

    let mut content = None;
    let mut mode = 0o644;
    for line in script.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["printf", "'%s'", b64, "|", "base64", "-d", ">", _tmp] => {
                content = Some(BASE64.decode(b64).unwrap());
            }
            ["printf", "'%s'", b64, "|", "base64", "-d", ">>", dest] => {
                let decoded = BASE64.decode(b64).unwrap();
                let file = state.files.entry(dest.to_string()).or_insert(GuestFile {
                    content: vec![],
                    mode: 0o644,
                });
                file.content.extend_from_slice(&decoded);
            }
            ["chmod", m, _] => mode = u32::from_str_radix(m, 8).unwrap(),
            ["mv", "-f", _, dest] => {
                let content = content.take().expect("mv without decoded content");
                state
                    .files
                    .insert(dest.to_string(), GuestFile { content, mode });
            }
            _ => {}
        }
    }
    assert!(
        !script.contains(".wslup-b64"),
        "chunked payloads are not modelled: {script}"
    );
    ExecOutput::ok("")
}

/// Mirrors the guest report of the real template for the component toggles.
fn bootstrap_report(args: &[&str]) -> ExecOutput {
    let flag = |i: usize| args.get(i).copied() == Some("1");
    let mut out = String::new();
    let mut step = |name: &str, enabled: bool| {
        let outcome = if enabled { "applied" } else { "skipped" };
        out.push_str(&format!("::wslup-step {name} {outcome}\n"));
    };
    step("core-tools", true);
    step("git-identity", !args.get(5).copied().unwrap_or_default().is_empty());
    step("docker", flag(0));
    step("pyenv", flag(1));
    step("python", flag(1));
    step("packaging-tools", flag(1));
    step("cuda", flag(3));
    step("zsh", flag(4));
    ExecOutput::ok(out)
}

#[async_trait]
impl Boundary for FakeWsl {
    async fn run(&self, options: ExecuteOptions) -> Result<ExecOutput, BoundaryError> {
        let stdin = match &options.stdin {
            StdinSource::Null => None,
            StdinSource::Bytes(b) => Some(b.clone()),
            StdinSource::File(path) => Some(std::fs::read(path)?),
        };
        self.log
            .lock()
            .unwrap()
            .push((options.target.clone(), command_line(&options)));

        let mut state = self.state.lock().unwrap();
        let out = match &options.target {
            Target::Host => self.host(&mut state, &options),
            Target::Guest { distro, identity } => {
                self.guest(&mut state, distro, identity, &options, stdin)
            }
        };
        Ok(out)
    }

    async fn attach(&self, _target: &Target) -> Result<Option<i32>, BoundaryError> {
        Ok(Some(0))
    }
}
