use crate::config::ConfigStore;
use anyhow::Result;
use clap::Subcommand;
use serde_json::Value;

#[derive(Subcommand, Debug)]
pub enum ConfigCmd {
    /// Print a key (or the whole config when the key is missing)
    Get {
        id: String,
    },
    /// Store a value; JSON and Python-style literals are parsed
    Set {
        id: String,
        info: String,
    },
    /// Remove a key
    Del {
        id: String,
    },
}

pub fn run(cmd: ConfigCmd) -> Result<()> {
    let mut store = ConfigStore::open_default()?;
    match cmd {
        ConfigCmd::Get { id } => match store.get(&id) {
            Some(info) => println!("Got {}: {}", id, display(info)),
            None => {
                println!("{} not found in {}", id, store.path().display());
                println!("{}", serde_json::to_string_pretty(store.all())?);
            }
        },
        ConfigCmd::Set { id, info } => {
            let value = store.set(&id, &info)?;
            println!("Set {}: {}", id, display(&value));
        }
        ConfigCmd::Del { id } => {
            if !store.del(&id)? {
                log::info!("{} was not set", id);
            }
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

/// Strings print bare, everything else as JSON
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display() {
        assert_eq!(display(&json!("abc")), "abc");
        assert_eq!(display(&json!([1, 2])), "[1,2]");
        assert_eq!(display(&json!(true)), "true");
    }
}
