use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use dcon_bridge::AutomationBridgeConfig;
use dcon_cli::CliCommandFileErrorMode;
use dcon_console::{execute_command_file, Console, ConsoleOutput};
use dcon_platform::{
    Channel, ChannelKind, Community, DiscordConfig, DiscordHttpClient, PlatformClient,
    PlatformError, Role, RoleEdit,
};
use dcon_session::{BookmarkStore, JsonFileBookmarkPersistence};
use httpmock::prelude::*;
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;

static WORKSPACE_COUNTER: AtomicU64 = AtomicU64::new(1);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

struct IsolatedWorkspace {
    root: PathBuf,
}

impl IsolatedWorkspace {
    fn new(label: &str) -> Self {
        let tick = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let count = WORKSPACE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "dcon-it-{label}-{}-{tick}-{count}",
            std::process::id()
        ));
        fs::create_dir_all(&root).expect("must create isolated workspace root");
        Self { root }
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for IsolatedWorkspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

#[derive(Clone, Default)]
struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("output lock")).into_owned()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("output lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct ScriptedClient {
    calls: AsyncMutex<Vec<String>>,
}

impl ScriptedClient {
    fn new() -> Self {
        Self {
            calls: AsyncMutex::new(Vec::new()),
        }
    }

    async fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.as_str() == name)
            .count()
    }

    async fn record(&self, name: &str) {
        self.calls.lock().await.push(name.to_string());
    }

    fn rustaceans() -> Community {
        Community {
            id: "1".to_string(),
            name: "Rustaceans".to_string(),
        }
    }

    fn general() -> Channel {
        Channel {
            id: "10".to_string(),
            name: "general".to_string(),
            kind: ChannelKind::Text,
            position: 0,
            community_id: Some("1".to_string()),
            recipients: Vec::new(),
        }
    }

    fn unsupported(operation: &str) -> PlatformError {
        PlatformError::InvalidResponse(format!("{operation} is not scripted"))
    }
}

#[async_trait]
impl PlatformClient for ScriptedClient {
    async fn communities(&self) -> Result<Vec<Community>, PlatformError> {
        self.record("communities").await;
        Ok(vec![Self::rustaceans()])
    }

    async fn community(&self, _community_id: &str) -> Result<Community, PlatformError> {
        self.record("community").await;
        Ok(Self::rustaceans())
    }

    async fn community_channels(&self, _community_id: &str) -> Result<Vec<Channel>, PlatformError> {
        self.record("community_channels").await;
        Ok(vec![Self::general()])
    }

    async fn channel(&self, _channel_id: &str) -> Result<Channel, PlatformError> {
        self.record("channel").await;
        Ok(Self::general())
    }

    async fn private_channels(&self) -> Result<Vec<Channel>, PlatformError> {
        Err(Self::unsupported("private_channels"))
    }

    async fn create_dm_channel(&self, _user_id: &str) -> Result<Channel, PlatformError> {
        Err(Self::unsupported("create_dm_channel"))
    }

    async fn community_roles(&self, _community_id: &str) -> Result<Vec<Role>, PlatformError> {
        Err(Self::unsupported("community_roles"))
    }

    async fn create_role(&self, _community_id: &str) -> Result<Role, PlatformError> {
        Err(Self::unsupported("create_role"))
    }

    async fn edit_role(
        &self,
        _community_id: &str,
        _role_id: &str,
        _edit: &RoleEdit,
    ) -> Result<Role, PlatformError> {
        Err(Self::unsupported("edit_role"))
    }

    async fn delete_role(&self, _community_id: &str, _role_id: &str) -> Result<(), PlatformError> {
        Err(Self::unsupported("delete_role"))
    }

    async fn add_member_role(
        &self,
        _community_id: &str,
        _user_id: &str,
        _role_id: &str,
    ) -> Result<(), PlatformError> {
        Err(Self::unsupported("add_member_role"))
    }

    async fn remove_member_role(
        &self,
        _community_id: &str,
        _user_id: &str,
        _role_id: &str,
    ) -> Result<(), PlatformError> {
        Err(Self::unsupported("remove_member_role"))
    }
}

fn console_in(
    workspace: &IsolatedWorkspace,
    client: Arc<dyn PlatformClient>,
    output: &CapturedOutput,
) -> Arc<Console> {
    Console::new(
        client,
        BookmarkStore::new(Box::new(JsonFileBookmarkPersistence::new(
            workspace.root().join("bookmarks.json"),
        ))),
        AutomationBridgeConfig {
            dir: workspace.root().to_path_buf(),
            poll_interval: POLL_INTERVAL,
        },
        ConsoleOutput::new(Box::new(output.clone())),
    )
}

fn write_record(path: &Path, command: &str, sent_at: i64) {
    fs::write(
        path,
        json!({ "Command": command, "SentAt": sent_at }).to_string(),
    )
    .expect("write automation record");
}

async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

#[tokio::test]
async fn integration_automation_file_commands_run_once_through_console_dispatcher() {
    let workspace = IsolatedWorkspace::new("bridge-dedup");
    let client = Arc::new(ScriptedClient::new());
    let output = CapturedOutput::default();
    let console = console_in(&workspace, client.clone(), &output);

    console.execute_line("api-start").await.expect("start bridge");
    let path = console.bridge().file_path().expect("bridge file path");
    assert_eq!(fs::read_to_string(&path).expect("seeded file"), "{}");

    write_record(&path, "guilds", 1_000);
    let mut executed = false;
    for _ in 0..400 {
        if client.call_count("communities").await == 1 {
            executed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(executed, "automated command should execute");

    // same SentAt: every later tick sees a duplicate
    write_record(&path, "guilds", 1_000);
    tokio::time::sleep(POLL_INTERVAL * 6).await;
    assert_eq!(client.call_count("communities").await, 1);

    write_record(&path, "guild Rustaceans", 1_001);
    assert!(wait_until(|| console.navigation().depth() == 2).await);
    assert_eq!(console.navigation().current().channel_id(), Some("10"));

    let captured = output.contents();
    assert!(captured.contains("[automation] guilds"));
    assert!(captured.contains("[automation] 1   Rustaceans"));
    assert!(captured.contains("dcon Rustaceans#general> "));

    console.execute_line("api-stop").await.expect("stop bridge");
    assert!(!console.bridge().is_running());
    assert!(wait_until(|| !path.exists()).await, "automation file should be deleted");
}

#[tokio::test]
async fn integration_api_send_publishes_without_self_execution() {
    let workspace = IsolatedWorkspace::new("bridge-send");
    let client = Arc::new(ScriptedClient::new());
    let output = CapturedOutput::default();
    let console = console_in(&workspace, client.clone(), &output);

    console
        .execute_line("api-send guilds")
        .await
        .expect("send while idle");
    assert!(output.contents().contains("automation bridge is not running"));

    let path = console.start_automation().expect("start bridge");
    console
        .execute_line("api_send guilds")
        .await
        .expect("send while running");

    let record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read automation file"))
            .expect("decode automation file");
    assert_eq!(record["Command"], "guilds");
    assert_eq!(
        record["SentAt"].as_i64(),
        Some(console.bridge().last_seen_sent_at())
    );

    tokio::time::sleep(POLL_INTERVAL * 6).await;
    assert_eq!(client.call_count("communities").await, 0);

    console.bridge().shutdown().await;
    assert!(!path.exists());
}

#[tokio::test]
async fn integration_command_file_drives_rest_adapter() {
    let workspace = IsolatedWorkspace::new("command-file");
    let server = MockServer::start_async().await;
    let community = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v10/guilds/1");
            then.status(200)
                .json_body(json!({"id": "1", "name": "Rustaceans"}));
        })
        .await;
    let channels = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v10/guilds/1/channels");
            then.status(200).json_body(json!([
                {"id": "11", "name": "help", "type": 0, "position": 1, "guild_id": "1"},
                {"id": "10", "name": "general", "type": 0, "position": 0, "guild_id": "1"},
                {"id": "12", "name": "stage", "type": 2, "position": 0, "guild_id": "1"}
            ]));
        })
        .await;
    let create_role = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v10/guilds/1/roles")
                .header("authorization", "Bot it-token");
            then.status(200).json_body(json!({
                "id": "555",
                "name": "new role",
                "permissions": "0",
                "color": 0,
                "hoist": false,
                "mentionable": false,
                "position": 1
            }));
        })
        .await;

    let client = DiscordHttpClient::new(DiscordConfig {
        api_base: format!("{}/api/v10", server.base_url()),
        token: "it-token".to_string(),
        bot: true,
        request_timeout_ms: 5_000,
    })
    .expect("discord client");
    let output = CapturedOutput::default();
    let console = console_in(&workspace, Arc::new(client), &output);

    let path = workspace.root().join("commands.txt");
    fs::write(&path, "# bootstrap\nguild 1\nchannels\nrole create\nbookmark start\n")
        .expect("write command file");

    let report = execute_command_file(&console, &path, CliCommandFileErrorMode::FailFast)
        .await
        .expect("command file should succeed");

    assert_eq!(report.total, 4);
    assert_eq!(report.succeeded, 4);
    community.assert_async().await;
    channels.assert_async().await;
    create_role.assert_async().await;

    let captured = output.contents();
    assert!(captured.contains("value=555"));
    assert!(captured.contains("10  general"));
    assert!(!captured.contains("stage"));

    let bookmarks = fs::read_to_string(workspace.root().join("bookmarks.json"))
        .expect("bookmark file should be written");
    let bookmarks: serde_json::Value = serde_json::from_str(&bookmarks).expect("bookmark json");
    assert_eq!(bookmarks["schema_version"], 1);
    assert_eq!(bookmarks["bookmarks"]["start"], "10");
}
