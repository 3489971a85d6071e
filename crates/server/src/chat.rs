//! Chat commands admins send to the bot.
//!
//! Transport neutral: the Slack and Telegram routes parse their payloads
//! into a [`ChatCommand`] plus the sender's endpoint and send back whatever
//! text [`ChatCommands::reply`] returns.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use verifydesk_core::{AdminId, ChatEndpoint};

use crate::config::ServerConfig;
use crate::db::RecordStore;
use crate::directory::{AdminDirectory, DirectoryError};
use crate::models::Admin;
use crate::workflow::WorkflowError;

const HELP: &str = "Commands:\n\
/start <admin id> - connect this chat to your admin account\n\
/mylink - your personal application link\n\
/stats - your statistics\n\
/pending - applications waiting for you\n\
/myinfo - your admin details\n\
/help - this message";

pub const NOT_CONNECTED: &str =
    "This chat is not connected to an admin account. Send /start <admin id> to connect.";

/// Text shown to an admin whose decision button was refused.
///
/// Store failures are logged and yield `None`; the admin can simply press
/// the button again.
#[must_use]
pub fn decision_refusal(error: &WorkflowError) -> Option<String> {
    match error {
        WorkflowError::AlreadyDecided(_) => {
            Some("This stage has already been decided.".to_string())
        }
        WorkflowError::Forbidden(reason) => Some(format!("Not allowed: {reason}")),
        WorkflowError::NotFound(_) => Some("This application no longer exists.".to_string()),
        WorkflowError::InvalidAssignment(_)
        | WorkflowError::NoAdminsAvailable
        | WorkflowError::Repository(_) => {
            error!(error = %error, "Decision from chat failed");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Start(Option<String>),
    MyLink,
    Stats,
    Pending,
    MyInfo,
    Help,
    Unknown(String),
}

impl ChatCommand {
    /// Parse a message. Returns `None` for text that is not a command.
    ///
    /// Telegram's `/cmd@BotName` form is accepted.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let mut parts = rest.split_whitespace();
        let name = parts.next()?;
        let name = name.split('@').next().unwrap_or(name).to_ascii_lowercase();
        let argument = parts.next().map(str::to_string);

        Some(match name.as_str() {
            "start" => Self::Start(argument),
            "mylink" => Self::MyLink,
            "stats" => Self::Stats,
            "pending" => Self::Pending,
            "myinfo" => Self::MyInfo,
            "help" => Self::Help,
            _ => Self::Unknown(name),
        })
    }

    /// Build a command from a slash-command name and its argument text, as
    /// Slack delivers them.
    #[must_use]
    pub fn from_slash(command: &str, text: &str) -> Self {
        let line = format!("{} {}", command.trim(), text.trim());
        Self::parse(&line).unwrap_or(Self::Help)
    }
}

/// Answers chat commands for the admin behind an endpoint.
#[derive(Clone)]
pub struct ChatCommands {
    directory: AdminDirectory,
    store: Arc<dyn RecordStore>,
    config: Arc<ServerConfig>,
}

impl ChatCommands {
    #[must_use]
    pub fn new(
        directory: AdminDirectory,
        store: Arc<dyn RecordStore>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            directory,
            store,
            config,
        }
    }

    /// Run a command sent from `endpoint` and return the reply text.
    ///
    /// Never fails; store errors become an apology and are logged.
    #[instrument(skip(self))]
    pub async fn reply(&self, endpoint: &ChatEndpoint, command: ChatCommand) -> String {
        match self.run(endpoint, command).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Chat command failed");
                "Something went wrong. Please try again later.".to_string()
            }
        }
    }

    async fn run(
        &self,
        endpoint: &ChatEndpoint,
        command: ChatCommand,
    ) -> Result<String, DirectoryError> {
        if let ChatCommand::Start(Some(admin_id)) = &command {
            return self.connect(endpoint, AdminId::new(admin_id.as_str())).await;
        }
        if command == ChatCommand::Help {
            return Ok(HELP.to_string());
        }
        if let ChatCommand::Unknown(name) = &command {
            return Ok(format!("Unknown command /{name}.\n\n{HELP}"));
        }

        let Some(admin) = self.directory.resolve_endpoint(endpoint).await? else {
            return Ok(NOT_CONNECTED.to_string());
        };

        match command {
            ChatCommand::Start(_) => Ok(self.welcome(&admin)),
            ChatCommand::MyLink => Ok(format!(
                "Your personal application link:\n{}\n\nApplications from this link are assigned to {}.",
                self.config.admin_link(admin.admin_id.as_str()),
                admin.name
            )),
            ChatCommand::Stats => self.stats(&admin).await,
            ChatCommand::Pending => self.pending(&admin).await,
            ChatCommand::MyInfo => Ok(self.info(&admin)),
            ChatCommand::Help | ChatCommand::Unknown(_) => Ok(HELP.to_string()),
        }
    }

    async fn connect(
        &self,
        endpoint: &ChatEndpoint,
        admin_id: AdminId,
    ) -> Result<String, DirectoryError> {
        match self.directory.claim_endpoint(&admin_id, endpoint).await {
            Ok(admin) => {
                info!(admin_id = %admin.admin_id, %endpoint, "Chat connected");
                Ok(self.welcome(&admin))
            }
            Err(DirectoryError::NotFound(_)) => Ok(format!(
                "No admin with id {admin_id} exists. Check the id with your operator."
            )),
            Err(DirectoryError::Conflict(_)) => Ok(
                "This chat is already connected to another admin account.".to_string(),
            ),
            Err(DirectoryError::AlreadyConnected(_)) => {
                warn!(
                    admin_id = %admin_id,
                    %endpoint,
                    "Refused /start for an admin connected elsewhere"
                );
                Ok(format!(
                    "Admin {admin_id} is already connected to another chat. \
                     Ask your operator to move it to this one."
                ))
            }
            Err(e) => Err(e),
        }
    }

    fn welcome(&self, admin: &Admin) -> String {
        format!(
            "Welcome {}!\n\nThis chat now receives your verification requests.\n\
             Admin ID: {}\nPersonal link: {}\n\n{HELP}",
            admin.name,
            admin.admin_id,
            self.config.admin_link(admin.admin_id.as_str())
        )
    }

    async fn stats(&self, admin: &Admin) -> Result<String, DirectoryError> {
        let stats = self.store.admin_stats(&admin.admin_id).await?;
        Ok(format!(
            "Your statistics\n\n\
             Total applications: {}\n\
             Awaiting PIN decision: {}\n\
             PIN approved: {}\n\
             Awaiting code decision: {}\n\
             Fully approved: {}",
            stats.total,
            stats.pin_pending,
            stats.pin_approved,
            stats.code_pending,
            stats.fully_approved
        ))
    }

    async fn pending(&self, admin: &Admin) -> Result<String, DirectoryError> {
        let applications = self
            .store
            .list_applications_for_admin(&admin.admin_id)
            .await?;
        let pin: Vec<_> = applications
            .iter()
            .filter(|a| a.pin_stage.is_pending())
            .collect();
        let code: Vec<_> = applications
            .iter()
            .filter(|a| a.awaits_code_decision() && a.code.is_some())
            .collect();

        if pin.is_empty() && code.is_empty() {
            return Ok("No pending applications.".to_string());
        }

        let mut reply = String::from("Pending applications\n");
        if !pin.is_empty() {
            let _ = write!(reply, "\nAwaiting PIN decision ({}):", pin.len());
            for (i, app) in pin.iter().enumerate() {
                let _ = write!(reply, "\n{}. {} - {}", i + 1, app.phone_number, app.id);
            }
            reply.push('\n');
        }
        if !code.is_empty() {
            let _ = write!(reply, "\nAwaiting code decision ({}):", code.len());
            for (i, app) in code.iter().enumerate() {
                let _ = write!(
                    reply,
                    "\n{}. {} - code {} - {}",
                    i + 1,
                    app.phone_number,
                    app.code.as_deref().unwrap_or("-"),
                    app.id
                );
            }
        }
        Ok(reply.trim_end().to_string())
    }

    fn info(&self, admin: &Admin) -> String {
        format!(
            "Name: {}\nEmail: {}\nAdmin ID: {}\nChat: {}\nStatus: {}\nCreated: {}\nLink: {}",
            admin.name,
            admin.email.as_deref().unwrap_or("-"),
            admin.admin_id,
            admin
                .endpoint
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            admin.status,
            admin.created_at.format("%Y-%m-%d %H:%M UTC"),
            self.config.admin_link(admin.admin_id.as_str())
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ChatCommand::parse("/start ADM-1"),
            Some(ChatCommand::Start(Some("ADM-1".to_string())))
        );
        assert_eq!(ChatCommand::parse("/start"), Some(ChatCommand::Start(None)));
        assert_eq!(
            ChatCommand::parse("/stats@verifydesk_bot"),
            Some(ChatCommand::Stats)
        );
        assert_eq!(ChatCommand::parse(" /MyLink "), Some(ChatCommand::MyLink));
        assert_eq!(
            ChatCommand::parse("/frobnicate"),
            Some(ChatCommand::Unknown("frobnicate".to_string()))
        );
        assert_eq!(ChatCommand::parse("hello"), None);
    }

    #[test]
    fn test_decision_refusal() {
        assert_eq!(
            decision_refusal(&WorkflowError::AlreadyDecided("pin".into())).as_deref(),
            Some("This stage has already been decided.")
        );
        assert!(
            decision_refusal(&WorkflowError::Forbidden("not the owner".into()))
                .unwrap()
                .contains("not the owner")
        );
        assert_eq!(decision_refusal(&WorkflowError::NoAdminsAvailable), None);
    }

    #[test]
    fn test_from_slash() {
        assert_eq!(
            ChatCommand::from_slash("/start", "ADM-2"),
            ChatCommand::Start(Some("ADM-2".to_string()))
        );
        assert_eq!(ChatCommand::from_slash("/pending", ""), ChatCommand::Pending);
    }

    fn commands() -> (ChatCommands, AdminDirectory) {
        let store = Arc::new(MemoryStore::new());
        let directory = AdminDirectory::new(store.clone(), Duration::from_secs(60));
        let commands = ChatCommands::new(
            directory.clone(),
            store,
            Arc::new(ServerConfig::local()),
        );
        (commands, directory)
    }

    #[tokio::test]
    async fn test_start_connects_chat() {
        let (commands, directory) = commands();
        let admin = directory
            .add_admin(Some(AdminId::new("ADM-1")), "Alice", None)
            .await
            .unwrap();
        let endpoint = ChatEndpoint::parse("4242").unwrap();

        let before = commands.reply(&endpoint, ChatCommand::Stats).await;
        assert_eq!(before, NOT_CONNECTED);

        let reply = commands
            .reply(&endpoint, ChatCommand::Start(Some("ADM-1".to_string())))
            .await;
        assert!(reply.starts_with("Welcome Alice"));
        assert!(reply.contains("http://localhost:3000/?admin=ADM-1"));

        let connected = directory.get_admin(&admin.admin_id).await.unwrap();
        assert_eq!(connected.endpoint, Some(endpoint.clone()));

        let stats = commands.reply(&endpoint, ChatCommand::Stats).await;
        assert!(stats.contains("Total applications: 0"));
    }

    #[tokio::test]
    async fn test_start_with_unknown_admin() {
        let (commands, _) = commands();
        let endpoint = ChatEndpoint::parse("4242").unwrap();
        let reply = commands
            .reply(&endpoint, ChatCommand::Start(Some("ADM-nope".to_string())))
            .await;
        assert!(reply.starts_with("No admin with id ADM-nope"));
    }

    #[tokio::test]
    async fn test_start_cannot_take_over_a_connected_admin() {
        let (commands, directory) = commands();
        let id = AdminId::new("ADM-1");
        directory
            .add_admin(Some(id.clone()), "Alice", None)
            .await
            .unwrap();
        let own = ChatEndpoint::parse("42").unwrap();
        let stranger = ChatEndpoint::parse("999").unwrap();
        commands
            .reply(&own, ChatCommand::Start(Some("ADM-1".to_string())))
            .await;

        let reply = commands
            .reply(&stranger, ChatCommand::Start(Some("ADM-1".to_string())))
            .await;
        assert!(reply.starts_with("Admin ADM-1 is already connected"), "{reply}");
        assert_eq!(directory.get_admin(&id).await.unwrap().endpoint, Some(own));
        assert_eq!(
            commands.reply(&stranger, ChatCommand::Stats).await,
            NOT_CONNECTED
        );
    }

    #[tokio::test]
    async fn test_pending_when_empty() {
        let (commands, directory) = commands();
        directory
            .add_admin(Some(AdminId::new("ADM-1")), "Alice", None)
            .await
            .unwrap();
        let endpoint = ChatEndpoint::parse("4242").unwrap();
        directory
            .connect_endpoint(&AdminId::new("ADM-1"), &endpoint)
            .await
            .unwrap();
        let reply = commands.reply(&endpoint, ChatCommand::Pending).await;
        assert_eq!(reply, "No pending applications.");
    }
}
