//! Delayed reboot/shutdown through `shutdown(8)`
//!
//! Needs root or a polkit rule allowing the service user to run `shutdown`.

use rmcp::{model::*, ErrorData as McpError};
use std::process::Command;

use crate::config::Config;
use crate::shared::format_minutes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemAction {
    Reboot,
    Shutdown,
}

impl SystemAction {
    pub fn verb(self) -> &'static str {
        match self {
            SystemAction::Reboot => "reboot",
            SystemAction::Shutdown => "shutdown",
        }
    }

    fn flag(self) -> &'static str {
        match self {
            SystemAction::Reboot => "-r",
            SystemAction::Shutdown => "-P",
        }
    }
}

/// Arguments passed to `shutdown`
pub fn command_args(action: SystemAction, delay_minutes: u32) -> [String; 2] {
    [action.flag().to_string(), format!("+{}", delay_minutes)]
}

/// Schedule `action` in `delay_minutes`. Returns whether the OS accepted it.
pub fn execute_system_action(action: SystemAction, delay_minutes: u32) -> bool {
    let args = command_args(action, delay_minutes);
    match Command::new("shutdown").args(&args).output() {
        Ok(output) if output.status.success() => {
            tracing::info!("Scheduled system {} in {} minute(s)", action.verb(), delay_minutes);
            true
        }
        Ok(output) => {
            tracing::warn!(
                "Failed to execute system action command, please check user permissions: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            false
        }
        Err(e) => {
            tracing::warn!("Failed to run shutdown: {}", e);
            false
        }
    }
}

// === Tool Functions ===

pub async fn reboot_host(config: &Config) -> Result<CallToolResult, McpError> {
    run_tool(SystemAction::Reboot, config.reboot_delay_minutes)
}

pub async fn shutdown_host(config: &Config) -> Result<CallToolResult, McpError> {
    run_tool(SystemAction::Shutdown, config.shutdown_delay_minutes)
}

fn run_tool(action: SystemAction, delay_minutes: u32) -> Result<CallToolResult, McpError> {
    let text = if execute_system_action(action, delay_minutes) {
        format!(
            "The system is going to {} in {}",
            action.verb(),
            format_minutes(delay_minutes)
        )
    } else {
        "Failed to execute system action command, please check user permissions".to_string()
    };
    Ok(CallToolResult::success(vec![Content::text(text)]))
}
