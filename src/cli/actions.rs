use action_primitives::ActionRegistry;
use anyhow::Result;

use crate::config::Config;

pub fn cmd_actions(config: &Config) -> Result<bool> {
    let registry = ActionRegistry::with_builtins(config.tempo.clone());
    for name in registry.names() {
        println!("{name}");
    }
    Ok(true)
}
