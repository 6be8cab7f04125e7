//! Doctor Command
//!
//! Checks that the environment can actually run a generation: config loads,
//! an API key is resolvable, and the gateway endpoint is reachable.

use console::style;
use tokio::runtime::Runtime;

use crate::ai::gateway::{AnthropicGateway, ModelGateway};
use crate::config::ConfigLoader;
use crate::types::Result;

pub fn run() -> Result<()> {
    println!("{}", style("Environment check").bold());

    // Config resolution
    let config = match ConfigLoader::load() {
        Ok(config) => {
            println!("  {} config loads and validates", style("✓").green());
            Some(config)
        }
        Err(e) => {
            println!("  {} config: {}", style("✗").red(), e);
            None
        }
    };

    // API key resolution
    let api_key = config.as_ref().and_then(|c| c.llm.api_key.clone());
    match AnthropicGateway::from_env_or(api_key) {
        Ok(gateway) => {
            println!("  {} API key resolved", style("✓").green());

            // Endpoint reachability
            let rt = Runtime::new()?;
            match rt.block_on(gateway.health_check()) {
                Ok(true) => println!("  {} gateway reachable", style("✓").green()),
                Ok(false) => println!("  {} gateway unreachable", style("✗").red()),
                Err(e) => println!("  {} gateway check failed: {}", style("✗").red(), e),
            }
        }
        Err(e) => {
            println!("  {} {}", style("✗").red(), e);
        }
    }

    Ok(())
}
