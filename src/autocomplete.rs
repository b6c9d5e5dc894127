// Shell completion: generate from the clap command tree and install into the rc file

use crate::config::{config_dir, home_dir};
pub use crate::gen::com::{detect_shell, Shell};
use anyhow::{Context, Result};
use clap::Command;
use log::info;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

// ============================================================================
// SCRIPT GENERATION
// ============================================================================

/// Every command path (`ind`, `ind gen`, `ind gen stat`, ...) with its completion words
pub fn command_paths(cmd: &Command) -> Vec<(String, Vec<String>)> {
    let mut out = Vec::new();
    walk(cmd, cmd.get_name().to_string(), &mut out);
    out
}

fn walk(cmd: &Command, path: String, out: &mut Vec<(String, Vec<String>)>) {
    let mut words: Vec<String> = cmd
        .get_subcommands()
        .filter(|s| !s.is_hide_set())
        .map(|s| s.get_name().to_string())
        .collect();
    for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
        if let Some(long) = arg.get_long() {
            words.push(format!("--{}", long));
        }
    }
    words.push("--help".to_string());
    words.dedup();
    out.push((path.clone(), words));
    for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
        walk(sub, format!("{} {}", path, sub.get_name()), out);
    }
}

pub fn completion_script(shell: Shell, cmd: &Command) -> String {
    let name = cmd.get_name();
    let func = format!("_{}_complete", name.replace('-', "_"));
    let paths = command_paths(cmd);

    let known: Vec<String> = paths.iter().map(|(p, _)| format!("\"{}\"", p)).collect();
    let cases: String = paths
        .iter()
        .map(|(path, words)| format!("        \"{}\") opts=\"{}\" ;;\n", path, words.join(" ")))
        .collect();

    let mut script = String::new();
    if shell == Shell::Zsh {
        script.push_str("autoload -U +X compinit && compinit\nautoload -U +X bashcompinit && bashcompinit\n\n");
    }
    script.push_str(&format!(
        r#"# {name} completion ({shell})
{func}() {{
    local cur path word candidate opts i
    local -a known=({known})
    cur="${{COMP_WORDS[COMP_CWORD]}}"
    path="{name}"
    for ((i = 1; i < COMP_CWORD; i++)); do
        word="${{COMP_WORDS[i]}}"
        [[ "$word" == -* ]] && continue
        candidate="$path $word"
        for k in "${{known[@]}}"; do
            if [[ "$k" == "$candidate" ]]; then
                path="$candidate"
                break
            fi
        done
    done
    opts=""
    case "$path" in
{cases}    esac
    COMPREPLY=( $(compgen -W "$opts" -- "$cur") )
    return 0
}}
complete -o default -F {func} {name}
"#,
        name = name,
        shell = shell.name(),
        func = func,
        known = known.join(" "),
        cases = cases
    ));
    script
}

// ============================================================================
// INSTALL
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct InstallReport {
    pub script: PathBuf,
    pub rc_file: PathBuf,
    /// False when the rc file already sourced the script
    pub appended: bool,
}

impl InstallReport {
    pub fn summary(&self) -> String {
        let rc = if self.appended {
            format!("added source line to {}", self.rc_file.display())
        } else {
            format!("{} already sources it", self.rc_file.display())
        };
        format!("wrote {}; {}", self.script.display(), rc)
    }
}

/// `~/.config/ind/completions/ind.{bash|zsh}` plus the user's rc file
pub fn install(shell: Shell, cmd: &Command) -> Result<InstallReport> {
    let dir = config_dir()?.join("completions");
    let rc = shell.config_file(&home_dir()?);
    install_to(shell, cmd, &dir, &rc)
}

pub fn install_to(shell: Shell, cmd: &Command, dir: &Path, rc_file: &Path) -> Result<InstallReport> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let script = dir.join(format!("{}.{}", cmd.get_name(), shell.name()));
    fs::write(&script, completion_script(shell, cmd))
        .with_context(|| format!("Failed to write {}", script.display()))?;

    let line = format!("source \"{}\"", script.display());
    let existing = match fs::read_to_string(rc_file) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", rc_file.display())),
    };
    let appended = !existing.lines().any(|l| l.trim() == line);
    if appended {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(rc_file)
            .with_context(|| format!("Failed to open {}", rc_file.display()))?;
        let sep = if existing.is_empty() || existing.ends_with('\n') { "" } else { "\n" };
        writeln!(f, "{}# ind shell completion\n{}", sep, line)?;
    }
    info!("completion for {} installed at {}", shell.name(), script.display());
    Ok(InstallReport {
        script,
        rc_file: rc_file.to_path_buf(),
        appended,
    })
}
