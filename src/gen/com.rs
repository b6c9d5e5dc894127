// Com: persistent environment variables in the user's shell config

use crate::config::home_dir;
use anyhow::{bail, Context, Result};
use log::info;
use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
}

impl Shell {
    pub fn name(&self) -> &'static str {
        match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bash" => Ok(Shell::Bash),
            "zsh" => Ok(Shell::Zsh),
            _ => bail!("Unsupported shell: {}", s),
        }
    }

    /// `~/.bashrc` or `~/.zshrc` under `home`
    pub fn config_file(&self, home: &Path) -> PathBuf {
        match self {
            Shell::Bash => home.join(".bashrc"),
            Shell::Zsh => home.join(".zshrc"),
        }
    }
}

/// Shell named by `$SHELL`; only bash and zsh are supported
pub fn detect_shell() -> Result<Shell> {
    let shell_path = env::var("SHELL").unwrap_or_default();
    shell_from_path(&shell_path)
}

fn shell_from_path(shell_path: &str) -> Result<Shell> {
    let name = Path::new(shell_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    Shell::parse(name).map_err(|_| anyhow::anyhow!("Unsupported or undetected shell: {}", shell_path))
}

/// Absolute form of `path` with `~` expanded and `.`/`..` folded; the path need not exist
fn absolute(path: &str, home: &Path) -> Result<PathBuf> {
    let expanded = match path.strip_prefix('~') {
        Some(rest) => home.join(rest.trim_start_matches('/')),
        None => PathBuf::from(path),
    };
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        env::current_dir().context("Failed to read current directory")?.join(expanded)
    };
    let mut out = PathBuf::new();
    for part in joined.components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Added { config_file: PathBuf, line: String },
    AlreadyPresent { config_file: PathBuf },
}

impl ExportOutcome {
    pub fn summary(&self) -> String {
        match self {
            ExportOutcome::Added { config_file, line } => format!(
                "Added {}\nRun `source {}` or restart your terminal to apply it.",
                line,
                config_file.display()
            ),
            ExportOutcome::AlreadyPresent { config_file } => {
                format!("Environment variable already exists in {}", config_file.display())
            }
        }
    }
}

/// Append `export NAME="abs path"` to the shell config unless it is already there
pub fn create_export_var(name: &str, path: &str, shell: Option<Shell>) -> Result<ExportOutcome> {
    let shell = match shell {
        Some(s) => s,
        None => detect_shell()?,
    };
    create_export_var_in(&home_dir()?, name, path, shell)
}

pub fn create_export_var_in(home: &Path, name: &str, path: &str, shell: Shell) -> Result<ExportOutcome> {
    if name.trim().is_empty() {
        bail!("Variable name must not be empty");
    }
    let config_file = shell.config_file(home);
    let abs = absolute(path, home)?;
    let line = format!("export {}=\"{}\"", name.trim().to_uppercase(), abs.display());

    if config_file.exists() {
        let existing = fs::read_to_string(&config_file)
            .with_context(|| format!("Failed to read {}", config_file.display()))?;
        if existing.contains(&line) {
            info!("{} already exports {}", config_file.display(), name);
            return Ok(ExportOutcome::AlreadyPresent { config_file });
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config_file)
        .with_context(|| format!("Failed to open {}", config_file.display()))?;
    write!(file, "\n# Added by script\n{}\n", line)
        .with_context(|| format!("Failed to write {}", config_file.display()))?;
    info!("appended {} to {}", line, config_file.display());
    Ok(ExportOutcome::Added { config_file, line })
}

/// `export ...` lines of the shell config (trimmed, in file order)
pub fn view_export_vars(shell: Option<Shell>) -> Result<Vec<String>> {
    let shell = match shell {
        Some(s) => s,
        None => detect_shell()?,
    };
    view_export_vars_in(&home_dir()?, shell)
}

pub fn view_export_vars_in(home: &Path, shell: Shell) -> Result<Vec<String>> {
    let config_file = shell.config_file(home);
    if !config_file.exists() {
        bail!("Shell config file not found for {}: {}", shell.name(), config_file.display());
    }
    let text = fs::read_to_string(&config_file)
        .with_context(|| format!("Failed to read {}", config_file.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("export "))
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shell_from_path() {
        assert_eq!(shell_from_path("/bin/zsh").unwrap(), Shell::Zsh);
        assert_eq!(shell_from_path("/usr/local/bin/bash").unwrap(), Shell::Bash);
        assert!(shell_from_path("/usr/bin/fish").is_err());
        assert!(shell_from_path("").is_err());
    }

    #[test]
    fn test_create_export_var_appends_once() {
        let home = TempDir::new().unwrap();
        let first = create_export_var_in(home.path(), "myproj", "~/work/../proj", Shell::Bash).unwrap();
        let expected = format!("export MYPROJ=\"{}\"", home.path().join("proj").display());
        assert_eq!(
            first,
            ExportOutcome::Added {
                config_file: home.path().join(".bashrc"),
                line: expected.clone()
            }
        );

        let second = create_export_var_in(home.path(), "MYPROJ", "~/proj", Shell::Bash).unwrap();
        assert!(matches!(second, ExportOutcome::AlreadyPresent { .. }));

        let text = fs::read_to_string(home.path().join(".bashrc")).unwrap();
        assert_eq!(text, format!("\n# Added by script\n{}\n", expected));
    }

    #[test]
    fn test_view_export_vars() {
        let home = TempDir::new().unwrap();
        fs::write(home.path().join(".zshrc"), "alias ll='ls -l'\n  export A=\"1\"\nexport B=\"2\"\n").unwrap();
        let vars = view_export_vars_in(home.path(), Shell::Zsh).unwrap();
        assert_eq!(vars, vec!["export A=\"1\"", "export B=\"2\""]);
        assert!(view_export_vars_in(home.path(), Shell::Bash).is_err());
    }
}
