use super::{EXIT_FAILURE, EXIT_SUCCESS};
use std::path::Path;
use stratum_core::Options;
use stratum_engine::{check_engine_prereqs, format_missing, select_backend};

pub fn run(options: &Options, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_backend(options, &mut checks, &mut all_pass);
    check_data_dir(&options.data_dir, &mut checks, &mut all_pass);

    let modules = options.effective_modules_dir();
    if modules.is_dir() {
        checks.push(Check::pass(
            "modules_dir",
            &format!("Provider modules directory: {}", modules.display()),
        ));
    } else {
        checks.push(Check::warn(
            "modules_dir",
            &format!(
                "No provider modules at {} (configs must set module_source)",
                modules.display()
            ),
        ));
    }

    print_results(&checks, all_pass, json_output)
}

fn check_backend(options: &Options, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let backend = match select_backend(&options.backend, &options.engine_binary) {
        Ok(b) => b,
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("engine_backend", &e.to_string()));
            return;
        }
    };
    if backend.name() == "mock" {
        checks.push(Check::info(
            "engine_backend",
            "Mock backend selected (no external engine required)",
        ));
        return;
    }

    let missing = check_engine_prereqs(&options.engine_binary);
    if missing.is_empty() {
        checks.push(Check::pass(
            "engine_prereqs",
            "Engine prerequisites satisfied",
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail("engine_prereqs", &format_missing(&missing)));
        return;
    }

    if backend.available() {
        checks.push(Check::pass(
            "engine_backend",
            &format!("'{} version' succeeded", options.engine_binary),
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "engine_backend",
            &format!("'{} version' failed", options.engine_binary),
        ));
    }
}

fn check_data_dir(dir: &Path, checks: &mut Vec<Check>, all_pass: &mut bool) {
    if !dir.exists() {
        checks.push(Check::info(
            "data_dir",
            &format!(
                "Data directory {} does not exist (will be created on first use)",
                dir.display()
            ),
        ));
        return;
    }
    match try_write(dir) {
        Ok(()) => checks.push(Check::pass(
            "data_dir",
            &format!("Data directory {} is writable", dir.display()),
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "data_dir",
                &format!("Data directory {} is not writable: {e}", dir.display()),
            ));
        }
    }
}

fn try_write(dir: &Path) -> std::io::Result<()> {
    let marker = dir.join(format!(".stratum-doctor-{}", std::process::id()));
    std::fs::write(&marker, b"")?;
    std::fs::remove_file(&marker)
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status.as_str(),
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("Stratum Doctor\n");
        for check in checks {
            let icon = match check.status {
                Status::Pass => "✓",
                Status::Fail => "✗",
                Status::Warn => "⚠",
                Status::Info => "ℹ",
            };
            println!("  {icon} {}", check.message.trim_end());
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Pass,
    Fail,
    Warn,
    Info,
}

impl Status {
    fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Fail => "fail",
            Status::Warn => "warn",
            Status::Info => "info",
        }
    }
}

struct Check {
    name: &'static str,
    status: Status,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: Status, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, Status::Pass, message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, Status::Fail, message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, Status::Warn, message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, Status::Info, message)
    }
}
