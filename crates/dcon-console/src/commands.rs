use anyhow::{anyhow, bail, Context, Result};
use dcon_bridge::CommandOrigin;
use dcon_cli::{render_help_overview, CommandSpec, ParsedCommand};
use dcon_platform::{ChannelKind, RoleEdit};
use dcon_session::BookmarkCommand;

use crate::console::{CommandAction, Console};
use crate::render::render_table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandKind {
    Communities,
    Community,
    TextChannels,
    VoiceChannels,
    PrivateChannels,
    Channel,
    DirectMessage,
    Bookmarks,
    Bookmark,
    Go,
    Location,
    Refresh,
    Role,
    AutomationStart,
    AutomationStop,
    AutomationSend,
    Help,
    Exit,
}

const fn command(
    name: &'static str,
    aliases: &'static [&'static str],
    usage: &'static str,
    description: &'static str,
) -> CommandSpec {
    CommandSpec {
        name,
        aliases,
        usage,
        description,
    }
}

pub(crate) const COMMAND_TABLE: &[(CommandSpec, CommandKind)] = &[
    (
        command("guilds", &["servers", "communities"], "guilds", "List communities"),
        CommandKind::Communities,
    ),
    (
        command(
            "guild",
            &["server", "community"],
            "guild <id or name>",
            "Enter a community at its first channel",
        ),
        CommandKind::Community,
    ),
    (
        command("channels", &[], "channels", "List text channels of the current community"),
        CommandKind::TextChannels,
    ),
    (
        command("vchannels", &[], "vchannels", "List voice channels of the current community"),
        CommandKind::VoiceChannels,
    ),
    (
        command("pchannels", &[], "pchannels", "List private channels"),
        CommandKind::PrivateChannels,
    ),
    (
        command("channel", &[], "channel <id or name>", "Switch to a channel"),
        CommandKind::Channel,
    ),
    (
        command("dm", &[], "dm <user id>", "Open a direct-message channel"),
        CommandKind::DirectMessage,
    ),
    (
        command("bookmarks", &[], "bookmarks", "List bookmark names"),
        CommandKind::Bookmarks,
    ),
    (
        command(
            "bookmark",
            &[],
            "bookmark [-]<name>",
            "Bookmark the current channel (prefix - to remove)",
        ),
        CommandKind::Bookmark,
    ),
    (
        command("go", &[], "go <bookmark>", "Jump to a bookmarked channel"),
        CommandKind::Go,
    ),
    (
        command("location", &["where"], "location", "Show the current location"),
        CommandKind::Location,
    ),
    (
        command(
            "refresh",
            &[],
            "refresh",
            "Drop cached community and channel listings",
        ),
        CommandKind::Refresh,
    ),
    (
        command(
            "role",
            &[],
            "role list|add|rem|create|edit|delete",
            "Manage roles of the current community",
        ),
        CommandKind::Role,
    ),
    (
        command("api-start", &["api_start"], "api-start", "Start the automation bridge"),
        CommandKind::AutomationStart,
    ),
    (
        command("api-stop", &["api_stop"], "api-stop", "Stop the automation bridge"),
        CommandKind::AutomationStop,
    ),
    (
        command(
            "api-send",
            &["api_send"],
            "api-send <command>",
            "Publish a command through the automation file",
        ),
        CommandKind::AutomationSend,
    ),
    (
        command("help", &[], "help", "Show this list"),
        CommandKind::Help,
    ),
    (
        command("exit", &["quit"], "exit", "Leave the console"),
        CommandKind::Exit,
    ),
];

/// Every name and alias, for line-editor completion.
pub(crate) fn command_names() -> Vec<&'static str> {
    COMMAND_TABLE
        .iter()
        .flat_map(|(spec, _)| std::iter::once(spec.name).chain(spec.aliases.iter().copied()))
        .collect()
}

fn lookup_command(name: &str) -> Option<CommandKind> {
    COMMAND_TABLE
        .iter()
        .find(|(spec, _)| spec.matches(name))
        .map(|(_, kind)| *kind)
}

pub(crate) async fn dispatch_command(
    console: &Console,
    parsed: ParsedCommand<'_>,
) -> Result<CommandAction> {
    let kind = lookup_command(parsed.name).ok_or_else(|| {
        anyhow!(
            "unknown command '{}'; type `help` for a list",
            parsed.name
        )
    })?;

    let value = match kind {
        CommandKind::Communities => list_communities(console).await?,
        CommandKind::Community => enter_community(console, parsed.args).await?,
        CommandKind::TextChannels => list_channels(console, ChannelKind::Text).await?,
        CommandKind::VoiceChannels => list_channels(console, ChannelKind::Voice).await?,
        CommandKind::PrivateChannels => list_private_channels(console).await?,
        CommandKind::Channel => enter_channel(console, parsed.args).await?,
        CommandKind::DirectMessage => open_direct_message(console, &parsed).await?,
        CommandKind::Bookmarks => {
            console.output.line(&console.bookmarks.names().join("\n"));
            None
        }
        CommandKind::Bookmark => apply_bookmark(console, parsed.args)?,
        CommandKind::Go => go_to_bookmark(console, parsed.args).await?,
        CommandKind::Location => {
            console.output.line(&format!(
                "{} depth={} automation={}",
                console.navigation.current().describe(),
                console.navigation.depth(),
                automation_status(console)
            ));
            None
        }
        CommandKind::Refresh => {
            console.cache.invalidate();
            console.output.line("cached listings cleared");
            None
        }
        CommandKind::Role => run_role_command(console, &parsed).await?,
        CommandKind::AutomationStart => {
            let path = console.start_automation()?;
            console
                .output
                .line(&format!("automation file: {}", path.display()));
            if !console.bridge.is_polling() {
                console.output.line(AUTOMATION_HALTED_NOTICE);
            }
            None
        }
        CommandKind::AutomationStop => {
            if console.bridge.is_running() {
                console.bridge.stop();
                console.output.line("automation bridge stopped");
            } else {
                console.output.line("automation bridge is not running");
            }
            None
        }
        CommandKind::AutomationSend => {
            let text = required_args(parsed.args, "api-send <command>")?;
            if !console.bridge.is_running() {
                console.output.line("automation bridge is not running");
            }
            console.bridge.send(text)?;
            None
        }
        CommandKind::Help => {
            let specs = COMMAND_TABLE
                .iter()
                .map(|(spec, _)| *spec)
                .collect::<Vec<_>>();
            console.output.line(&render_help_overview(&specs));
            None
        }
        CommandKind::Exit => {
            if console.output.origin() == CommandOrigin::Automated {
                tracing::debug!("exit requested by automated command");
            }
            return Ok(CommandAction::Exit);
        }
    };
    Ok(CommandAction::Continue(value))
}

const AUTOMATION_HALTED_NOTICE: &str =
    "automation polling halted after a read failure; run api-stop then api-start";

fn automation_status(console: &Console) -> &'static str {
    match (console.bridge.is_running(), console.bridge.is_polling()) {
        (false, _) => "off",
        (true, true) => "polling",
        (true, false) => "halted",
    }
}

fn required_args<'a>(args: &'a str, usage: &str) -> Result<&'a str> {
    if args.is_empty() {
        bail!("usage: {usage}");
    }
    Ok(args)
}

fn current_community_id(console: &Console) -> Result<String> {
    console
        .navigation
        .current()
        .community_id()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("no community selected; use `guild` first"))
}

async fn list_communities(console: &Console) -> Result<Option<String>> {
    let slot = console
        .cache
        .communities()
        .await
        .context("failed to fetch communities")?;
    let rows = slot
        .items
        .iter()
        .map(|community| vec![community.id.clone(), community.name.clone()])
        .collect::<Vec<_>>();
    console.output.line(&render_table(&["ID", "Name"], &rows));
    Ok(None)
}

async fn enter_community(console: &Console, args: &str) -> Result<Option<String>> {
    let target = required_args(args, "guild <id or name>")?;
    let wanted = target.to_lowercase();
    let community_id = console
        .cache
        .cached_communities()
        .into_iter()
        .find(|community| community.name.to_lowercase() == wanted)
        .map_or_else(|| target.to_string(), |community| community.id);

    let community = console
        .client()
        .community(&community_id)
        .await
        .context("failed to fetch community")?;
    let channels = console
        .cache
        .channels(&community.id, ChannelKind::Text)
        .await
        .context("failed to fetch channels")?;
    let channel = channels
        .items
        .iter()
        .find(|channel| channel.position == 0)
        .cloned()
        .ok_or_else(|| anyhow!("community '{}' has no channel at position 0", community.name))?;

    console.navigation.push(Some(community), channel)?;
    Ok(None)
}

async fn list_channels(console: &Console, kind: ChannelKind) -> Result<Option<String>> {
    let community_id = current_community_id(console)?;
    let slot = console
        .cache
        .channels(&community_id, kind)
        .await
        .context("failed to fetch channels")?;
    let rows = slot
        .items
        .iter()
        .map(|channel| vec![channel.id.clone(), channel.name.clone()])
        .collect::<Vec<_>>();
    console.output.line(&render_table(&["ID", "Name"], &rows));
    Ok(None)
}

async fn list_private_channels(console: &Console) -> Result<Option<String>> {
    let channels = console
        .client()
        .private_channels()
        .await
        .context("failed to fetch private channels")?;
    let rows = channels
        .iter()
        .map(|channel| {
            let kind = match channel.kind {
                ChannelKind::GroupDirectMessage if channel.recipients.is_empty() => "Empty Group",
                ChannelKind::GroupDirectMessage => "Group",
                _ => "DM",
            };
            vec![
                channel.id.clone(),
                kind.to_string(),
                channel.recipient_names(),
            ]
        })
        .collect::<Vec<_>>();
    console
        .output
        .line(&render_table(&["ID", "Type", "Recipient(s)"], &rows));
    Ok(None)
}

async fn enter_channel(console: &Console, args: &str) -> Result<Option<String>> {
    let target = required_args(args, "channel <id or name>")?;
    let wanted = target.to_lowercase();
    let cached = console
        .cache
        .cached_channels()
        .into_iter()
        .find(|channel| channel.name.to_lowercase() == wanted);
    let channel = match cached {
        Some(channel) => channel,
        None => console
            .client()
            .channel(target)
            .await
            .context("failed to fetch channel")?,
    };

    if channel.is_private() {
        console.navigation.push(None, channel)?;
        return Ok(None);
    }

    let parent_id = channel
        .community_id
        .clone()
        .ok_or_else(|| anyhow!("channel {} has no parent community", channel.id))?;
    let current = console.navigation.current();
    let community = match current.community {
        Some(community) if community.id == parent_id => community,
        _ => console
            .client()
            .community(&parent_id)
            .await
            .context("failed to fetch community")?,
    };
    console.navigation.push(Some(community), channel)?;
    Ok(None)
}

async fn open_direct_message(
    console: &Console,
    parsed: &ParsedCommand<'_>,
) -> Result<Option<String>> {
    let tokens = parsed.arg_tokens();
    let Some(user_id) = tokens.first() else {
        bail!("usage: dm <user id>");
    };
    let channel = console
        .client()
        .create_dm_channel(user_id)
        .await
        .context("failed to create direct-message channel")?;
    let channel_id = channel.id.clone();
    console.navigation.push(None, channel)?;
    console.output.line(&format!("channel {channel_id}"));
    Ok(Some(channel_id))
}

fn apply_bookmark(console: &Console, args: &str) -> Result<Option<String>> {
    let command = BookmarkCommand::parse(args)?;
    let current = console.navigation.current();
    match &command {
        BookmarkCommand::Add(name) => {
            // the entry stays in memory even if the save below fails
            console.bookmarks.add(name, &current)?;
            console.output.line(&format!("bookmarked '{name}'"));
        }
        BookmarkCommand::Remove(name) => {
            if console.bookmarks.remove(name)? {
                console.output.line(&format!("removed bookmark '{name}'"));
            } else {
                console.output.line(&format!("no bookmark named '{name}'"));
            }
        }
    }
    Ok(None)
}

async fn go_to_bookmark(console: &Console, args: &str) -> Result<Option<String>> {
    let name = required_args(args, "go <bookmark>")?;
    let location = console
        .bookmarks
        .resolve(name, console.client().as_ref())
        .await?;
    let channel = location
        .channel
        .ok_or_else(|| anyhow!("bookmark '{name}' does not point at a channel"))?;
    console.navigation.push(location.community, channel)?;
    Ok(None)
}

const ROLE_USAGE: &str = "usage: role list|add|rem|create|edit|delete";

#[derive(Debug, Clone, PartialEq, Eq)]
/// One field change requested by `role edit`.
enum RoleFieldEdit {
    Name(String),
    Color(u32),
    Separate(bool),
    Permissions(i64),
    Mentionable(bool),
}

impl RoleFieldEdit {
    fn parse(field: &str, value: &str) -> Result<Self> {
        match field.to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name(value.to_string())),
            "color" => {
                let hex = value.trim_start_matches('#');
                u32::from_str_radix(hex, 16)
                    .map(Self::Color)
                    .map_err(|_| anyhow!("invalid number '{value}'"))
            }
            "separate" => parse_bool(value).map(Self::Separate),
            "perms" => value
                .parse::<i64>()
                .map(Self::Permissions)
                .map_err(|_| anyhow!("invalid number '{value}'")),
            "mention" => parse_bool(value).map(Self::Mentionable),
            other => bail!(
                "invalid role field '{other}'; expected name, color, separate, perms or mention"
            ),
        }
    }

    fn apply(self, edit: &mut RoleEdit) {
        match self {
            Self::Name(name) => edit.name = name,
            Self::Color(color) => edit.color = color,
            Self::Separate(hoist) => edit.hoist = hoist,
            Self::Permissions(permissions) => edit.permissions = permissions,
            Self::Mentionable(mentionable) => edit.mentionable = mentionable,
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" => Ok(true),
        "false" | "no" | "n" | "0" | "off" => Ok(false),
        other => bail!("invalid boolean '{other}'; expected yes or no"),
    }
}

async fn run_role_command(console: &Console, parsed: &ParsedCommand<'_>) -> Result<Option<String>> {
    let tokens = parsed.arg_tokens();
    let Some(subcommand) = tokens.first() else {
        bail!("{ROLE_USAGE}");
    };
    let client = console.client();

    match subcommand.to_ascii_lowercase().as_str() {
        "list" => {
            let community_id = current_community_id(console)?;
            let mut roles = client
                .community_roles(&community_id)
                .await
                .context("failed to fetch roles")?;
            roles.sort_by(|left, right| right.position.cmp(&left.position));
            let rows = roles
                .iter()
                .map(|role| {
                    vec![
                        role.id.clone(),
                        role.name.clone(),
                        role.permissions.to_string(),
                        role.color.to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            console.output.line(&render_table(
                &["ID", "Name", "Permissions", "Color"],
                &rows,
            ));
            Ok(None)
        }
        verb @ ("add" | "rem") => {
            if tokens.len() < 3 {
                bail!("usage: role add/rem <user id> <role id>");
            }
            let community_id = current_community_id(console)?;
            let (user_id, role_id) = (tokens[1], tokens[2]);
            let result = if verb == "add" {
                client.add_member_role(&community_id, user_id, role_id).await
            } else {
                client
                    .remove_member_role(&community_id, user_id, role_id)
                    .await
            };
            result.context("failed to change member roles")?;
            Ok(None)
        }
        "create" => {
            let community_id = current_community_id(console)?;
            let role = client
                .create_role(&community_id)
                .await
                .context("failed to create role")?;
            console
                .output
                .line(&format!("created role with id {}", role.id));
            Ok(Some(role.id))
        }
        "edit" => {
            if tokens.len() < 4 {
                bail!("usage: role edit <role id> <name|color|separate|perms|mention> <value>");
            }
            let role_id = tokens[1];
            let change = RoleFieldEdit::parse(tokens[2], &tokens[3..].join(" "))?;
            let community_id = current_community_id(console)?;

            let roles = client
                .community_roles(&community_id)
                .await
                .context("failed to fetch roles")?;
            let role = roles
                .iter()
                .find(|role| role.id == role_id)
                .ok_or_else(|| anyhow!("unknown role {role_id}"))?;
            let mut edit = RoleEdit::from(role);
            change.apply(&mut edit);

            let edited = client
                .edit_role(&community_id, role_id, &edit)
                .await
                .context("failed to edit role")?;
            console.output.line(&format!("edited role {}", edited.id));
            Ok(None)
        }
        "delete" => {
            let Some(role_id) = tokens.get(1) else {
                bail!("usage: role delete <role id>");
            };
            let community_id = current_community_id(console)?;
            client
                .delete_role(&community_id, role_id)
                .await
                .context("failed to delete role")?;
            console.output.line(&format!("deleted role {role_id}"));
            Ok(None)
        }
        _ => bail!("{ROLE_USAGE}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dcon_bridge::{AutomationBridgeConfig, DEFAULT_AUTOMATION_POLL_INTERVAL};
    use dcon_platform::testing::{channel, community, role, ScriptedPlatformClient};
    use dcon_platform::ChannelKind;
    use dcon_session::{BookmarkStore, JsonFileBookmarkPersistence};
    use tempfile::{tempdir, TempDir};

    use super::{command_names, lookup_command, parse_bool, CommandKind, RoleFieldEdit};
    use crate::console::{CommandAction, Console};
    use crate::output::testing::SharedBuffer;
    use crate::output::ConsoleOutput;

    struct Fixture {
        console: Arc<Console>,
        client: Arc<ScriptedPlatformClient>,
        buffer: SharedBuffer,
        _temp: TempDir,
    }

    fn fixture() -> Fixture {
        fixture_polling_every(DEFAULT_AUTOMATION_POLL_INTERVAL)
    }

    fn fixture_polling_every(poll_interval: Duration) -> Fixture {
        let temp = tempdir().expect("tempdir");
        let client = Arc::new(
            ScriptedPlatformClient::default()
                .with_community(
                    community("1", "Rustaceans"),
                    vec![
                        channel("11", "help", ChannelKind::Text, 1, Some("1")),
                        channel("10", "general", ChannelKind::Text, 0, Some("1")),
                        channel("13", "Lounge", ChannelKind::Voice, 0, Some("1")),
                    ],
                )
                .with_community(
                    community("2", "Ferris Fans"),
                    vec![channel("20", "crabs", ChannelKind::Text, 0, Some("2"))],
                )
                .with_roles(
                    "1",
                    vec![
                        role("100", "everyone", 0),
                        role("101", "moderator", 2),
                        role("102", "helper", 1),
                    ],
                ),
        );
        let buffer = SharedBuffer::default();
        let console = Console::new(
            client.clone(),
            BookmarkStore::new(Box::new(JsonFileBookmarkPersistence::new(
                temp.path().join("bookmarks.json"),
            ))),
            AutomationBridgeConfig {
                dir: temp.path().to_path_buf(),
                poll_interval,
            },
            ConsoleOutput::new(Box::new(buffer.clone())),
        );
        Fixture {
            console,
            client,
            buffer,
            _temp: temp,
        }
    }

    #[test]
    fn unit_lookup_command_resolves_names_and_aliases() {
        assert_eq!(lookup_command("servers"), Some(CommandKind::Communities));
        assert_eq!(lookup_command("WHERE"), Some(CommandKind::Location));
        assert_eq!(lookup_command("api_send"), Some(CommandKind::AutomationSend));
        assert_eq!(lookup_command("launch"), None);
        assert!(command_names().contains(&"quit"));
    }

    #[test]
    fn unit_parse_bool_accepts_yes_no_forms() {
        assert!(parse_bool("Yes").expect("yes"));
        assert!(!parse_bool("0").expect("zero"));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn unit_role_field_edit_parses_hex_color_and_rejects_unknown_field() {
        assert_eq!(
            RoleFieldEdit::parse("color", "#ff8800").expect("color"),
            RoleFieldEdit::Color(0xff8800)
        );
        assert!(RoleFieldEdit::parse("perms", "lots").is_err());
        let error = RoleFieldEdit::parse("icon", "x").expect_err("unknown field");
        assert!(error.to_string().contains("invalid role field 'icon'"));
    }

    #[tokio::test]
    async fn functional_guild_by_name_enters_position_zero_channel() {
        let fixture = fixture();
        fixture
            .console
            .execute_line("guilds")
            .await
            .expect("list communities");
        fixture
            .console
            .execute_line("guild ferris fans")
            .await
            .expect("enter community");

        let current = fixture.console.navigation().current();
        assert_eq!(current.community_id(), Some("2"));
        assert_eq!(current.channel_id(), Some("20"));
        assert!(fixture.buffer.contents().contains("Ferris Fans"));
        assert_eq!(fixture.console.prompt_text(), "dcon Ferris Fans#crabs> ");
    }

    #[tokio::test]
    async fn functional_channel_switch_reuses_current_community() {
        let fixture = fixture();
        fixture.console.execute_line("guild 1").await.expect("guild");
        assert_eq!(fixture.client.call_count("community"), 1);

        fixture
            .console
            .execute_line("channel HELP")
            .await
            .expect("channel by cached name");

        assert_eq!(fixture.console.navigation().current().channel_id(), Some("11"));
        assert_eq!(fixture.console.navigation().depth(), 3);
        assert_eq!(fixture.client.call_count("community"), 1);
        assert_eq!(fixture.client.call_count("channel"), 0);
    }

    #[tokio::test]
    async fn functional_channel_by_id_in_other_community_fetches_parent() {
        let fixture = fixture();
        fixture.console.execute_line("guild 1").await.expect("guild");
        fixture
            .console
            .execute_line("channel 20")
            .await
            .expect("channel by id");

        let current = fixture.console.navigation().current();
        assert_eq!(current.community_id(), Some("2"));
        assert_eq!(fixture.client.call_count("community"), 2);
    }

    #[tokio::test]
    async fn functional_channel_listing_requires_community_then_lists_sorted() {
        let fixture = fixture();
        let error = fixture
            .console
            .execute_line("channels")
            .await
            .expect_err("no community selected");
        assert!(error.to_string().contains("no community selected"));
        assert_eq!(fixture.client.call_count("community_channels"), 0);

        fixture.console.execute_line("guild 1").await.expect("guild");
        fixture.console.execute_line("channels").await.expect("channels");
        fixture.console.execute_line("vchannels").await.expect("vchannels");

        let output = fixture.buffer.contents();
        let general = output.find("general").expect("general listed");
        let help = output.find("help").expect("help listed");
        assert!(general < help);
        assert!(output.contains("Lounge"));
        // guild warmed the text slot; the voice listing replaced it
        assert_eq!(fixture.client.call_count("community_channels"), 2);
    }

    #[tokio::test]
    async fn functional_dm_pushes_private_channel_and_returns_id() {
        let fixture = fixture();
        let action = fixture
            .console
            .execute_line("dm 42")
            .await
            .expect("dm");

        assert_eq!(action, CommandAction::Continue(Some("dm-42".to_string())));
        let current = fixture.console.navigation().current();
        assert!(current.community.is_none());
        assert_eq!(current.channel_id(), Some("dm-42"));
        assert!(fixture.buffer.contents().contains("channel dm-42"));
    }

    #[tokio::test]
    async fn functional_bookmark_and_go_round_trip_through_navigation() {
        let fixture = fixture();
        fixture.console.execute_line("guild 1").await.expect("guild");
        fixture
            .console
            .execute_line("bookmark Home")
            .await
            .expect("bookmark");
        fixture.console.execute_line("guild 2").await.expect("guild 2");
        fixture.console.execute_line("go home").await.expect("go");

        let current = fixture.console.navigation().current();
        assert_eq!(current.channel_id(), Some("10"));
        assert_eq!(fixture.client.call_count("channel"), 0);

        fixture
            .console
            .execute_line("bookmark -home")
            .await
            .expect("remove bookmark");
        fixture
            .console
            .execute_line("bookmarks")
            .await
            .expect("bookmarks");
        assert!(fixture.buffer.contents().contains("removed bookmark 'home'"));
        assert!(fixture.console.bookmarks().names().is_empty());
    }

    #[tokio::test]
    async fn regression_bookmark_at_home_is_rejected() {
        let fixture = fixture();
        let error = fixture
            .console
            .execute_line("bookmark home")
            .await
            .expect_err("no channel yet");
        assert!(error.to_string().contains("no channel selected"));
    }

    #[tokio::test]
    async fn functional_role_list_sorts_by_position_descending() {
        let fixture = fixture();
        fixture.console.execute_line("guild 1").await.expect("guild");
        fixture.console.execute_line("role list").await.expect("role list");

        let output = fixture.buffer.contents();
        let moderator = output.find("moderator").expect("moderator");
        let helper = output.find("helper").expect("helper");
        let everyone = output.find("everyone").expect("everyone");
        assert!(moderator < helper && helper < everyone);
    }

    #[tokio::test]
    async fn functional_role_edit_changes_only_requested_field() {
        let fixture = fixture();
        fixture.console.execute_line("guild 1").await.expect("guild");
        fixture
            .console
            .execute_line("role edit 102 name Senior Helper")
            .await
            .expect("edit");

        let edits = fixture.client.role_edits();
        assert_eq!(edits.len(), 1);
        let (role_id, edit) = &edits[0];
        assert_eq!(role_id, "102");
        assert_eq!(edit.name, "Senior Helper");
        assert_eq!(edit.permissions, 0);
        assert!(!edit.hoist);
    }

    #[tokio::test]
    async fn regression_role_edit_validates_before_network() {
        let fixture = fixture();
        fixture.console.execute_line("guild 1").await.expect("guild");
        fixture
            .console
            .execute_line("role edit 102 color zz")
            .await
            .expect_err("invalid color");
        assert_eq!(fixture.client.call_count("community_roles"), 0);
        assert_eq!(fixture.client.call_count("edit_role"), 0);
    }

    #[tokio::test]
    async fn functional_role_create_returns_new_id() {
        let fixture = fixture();
        fixture.console.execute_line("guild 1").await.expect("guild");
        let action = fixture
            .console
            .execute_line("role create")
            .await
            .expect("create");
        assert_eq!(action, CommandAction::Continue(Some("new-role".to_string())));
    }

    #[tokio::test]
    async fn unit_unknown_command_and_exit() {
        let fixture = fixture();
        let error = fixture
            .console
            .execute_line("launch rockets")
            .await
            .expect_err("unknown");
        assert!(error.to_string().contains("unknown command 'launch'"));
        assert_eq!(
            fixture.console.execute_line("quit").await.expect("quit"),
            CommandAction::Exit
        );
        assert_eq!(
            fixture.console.execute_line("   ").await.expect("blank"),
            CommandAction::Continue(None)
        );
    }

    #[tokio::test]
    async fn regression_platform_error_keeps_earlier_navigation() {
        let fixture = fixture();
        fixture.console.execute_line("guild 1").await.expect("guild");
        let action = fixture.console.run_line("channel 999").await;

        assert_eq!(action, CommandAction::Continue(None));
        assert_eq!(fixture.console.navigation().current().channel_id(), Some("10"));
        assert!(fixture
            .buffer
            .contents()
            .contains("error: failed to fetch channel: platform returned non-success status 404"));
    }

    #[tokio::test]
    async fn unit_role_usage_errors_skip_network() {
        let fixture = fixture();
        for line in ["role", "role add 1", "role delete", "role frobnicate"] {
            assert!(fixture.console.execute_line(line).await.is_err(), "{line}");
        }
        let error = fixture
            .console
            .execute_line("role list")
            .await
            .expect_err("no community");
        assert!(error.to_string().contains("no community selected"));
        assert_eq!(fixture.client.call_count("community_roles"), 0);
    }

    #[tokio::test]
    async fn functional_refresh_drops_cached_listings() {
        let fixture = fixture();
        fixture.console.execute_line("guilds").await.expect("guilds");
        fixture.console.execute_line("guilds").await.expect("cached guilds");
        assert_eq!(fixture.client.call_count("communities"), 1);

        fixture.console.execute_line("refresh").await.expect("refresh");
        assert!(fixture.console.cache().cached_communities().is_empty());
        fixture.console.execute_line("guilds").await.expect("refetched guilds");
        assert_eq!(fixture.client.call_count("communities"), 2);
        assert!(fixture.buffer.contents().contains("cached listings cleared"));
    }

    #[tokio::test]
    async fn regression_halted_poll_loop_is_reported_by_location_and_api_start() {
        let fixture = fixture_polling_every(Duration::from_millis(20));
        fixture.console.execute_line("where").await.expect("location");
        assert!(fixture.buffer.contents().contains("automation=off"));

        fixture.console.execute_line("api-start").await.expect("start");
        fixture.console.execute_line("where").await.expect("location");
        assert!(fixture.buffer.contents().contains("automation=polling"));

        let path = fixture.console.bridge().file_path().expect("running bridge");
        std::fs::remove_file(&path).expect("remove automation file");
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while fixture.console.bridge().is_polling() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        fixture.console.execute_line("location").await.expect("location");
        fixture.console.execute_line("api-start").await.expect("restart attempt");
        let contents = fixture.buffer.contents();
        assert!(contents.contains("automation=halted"));
        assert!(contents.contains("run api-stop then api-start"));

        fixture.console.execute_line("api-stop").await.expect("stop");
        fixture.console.execute_line("api-start").await.expect("fresh start");
        assert!(fixture.console.bridge().is_polling());
        fixture.console.bridge().shutdown().await;
    }
}
