//! `cocochat serve`: start the HTTP gateway.

use cocochat_config::AppConfig;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Cocochat Gateway");
    println!("   Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:      {}", config.model.model_id);
    println!("   Max rounds: {}", config.agent.max_rounds);
    println!(
        "   Catalog:    {}",
        config
            .tools
            .item_search
            .api_url
            .as_deref()
            .unwrap_or("built-in sample")
    );

    cocochat_gateway::start(config).await?;

    Ok(())
}
