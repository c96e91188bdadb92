use std::fmt;
use std::process::{Command, Stdio};

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check prerequisites for running the engine binary `binary`.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_engine_prereqs(binary: &str) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !command_exists(binary) {
        missing.push(MissingPrereq {
            name: binary.to_owned(),
            purpose: "infrastructure-as-code engine that provisions clusters",
            install_hint: "https://developer.hashicorp.com/terraform/install | https://opentofu.org/docs/intro/install/",
        });
    }

    if !command_exists("git") {
        missing.push(MissingPrereq {
            name: "git".to_owned(),
            purpose: "fetching git:: module sources during engine init",
            install_hint: "zypper install git | apt install git | dnf install git | pacman -S git",
        });
    }

    missing
}

pub fn format_missing(missing: &[MissingPrereq]) -> String {
    let mut msg = String::from("missing engine prerequisites:\n");
    for m in missing {
        msg.push_str(&m.to_string());
        msg.push('\n');
    }
    msg
}
