use super::EXIT_SUCCESS;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io::Write;

/// Print the completion script for `shell` to stdout.
pub fn run<C: CommandFactory>(shell: Shell) -> Result<u8, String> {
    write_script::<C>(shell, &mut std::io::stdout().lock())?;
    Ok(EXIT_SUCCESS)
}

fn write_script<C: CommandFactory>(shell: Shell, out: &mut dyn Write) -> Result<(), String> {
    let mut cmd = C::command();
    let bin = cmd.get_name().to_owned();
    clap_complete::generate(shell, &mut cmd, bin, out);
    out.flush()
        .map_err(|e| format!("failed to write completions: {e}"))
}
