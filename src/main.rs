//! 控制台宿主
//!
//! 从标准输入逐行读取 OneBot v11 事件 (JSON)，按输入顺序交给处理器转发；
//! 桥接层以回环方式把分发出的消息再投递回 QQ 端，投递结果打印到终端。
//! 输入 `/exit` 或输入结束时，等待已分发的消息全部投递后退出。

use anyhow::{Context, anyhow};
use qqbridge::log::{self, Level};
use qqbridge::prelude::*;
use qqbridge::{debug, error, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{RwLock, mpsc, oneshot};

/// 终端模拟的 QQ 客户端
struct ConsoleClient {
    coolq_pro: bool,
    /// (群号, QQ号) -> 成员信息，来自已见过的消息帧
    members: RwLock<HashMap<(i64, i64), MemberInfo>>,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleClient {
    fn new(coolq_pro: bool, out: Box<dyn Write + Send>) -> Self {
        Self {
            coolq_pro,
            members: RwLock::new(HashMap::new()),
            out: Mutex::new(out),
        }
    }

    async fn remember(&self, group: i64, info: MemberInfo) {
        self.members.write().await.insert((group, info.user_id), info);
    }
}

#[async_trait]
impl QqClient for ConsoleClient {
    async fn say(&self, target: &str, text: &str, options: SayOptions) -> BridgeResult<()> {
        let text = if options.no_escape {
            text.to_string()
        } else {
            self.escape(text)
        };

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "[QQ -> {}] {}", target, text)?;
        out.flush()?;
        Ok(())
    }

    async fn group_member_info(&self, group: i64, member: i64) -> BridgeResult<MemberInfo> {
        self.members
            .read()
            .await
            .get(&(group, member))
            .cloned()
            .ok_or_else(|| format!("未知的群成员 {}@{}", member, group).into())
    }

    fn is_coolq_pro(&self) -> bool {
        self.coolq_pro
    }
}

async fn relay(processor: &QqProcessor, msg: BridgeMsg) {
    debug!(target: "Bridge", "分发 {} -> {}: {}", msg.nick, msg.to, msg.text);
    if let Err(e) = processor.receive(&msg).await {
        error!(target: "QQ", "消息投递失败 ({}): {}", msg.to, e);
    }
}

/// 回环分发：把桥接层收到的消息当作其他平台的消息投递回 QQ。
/// 收到关闭信号后投递完通道中剩余的消息再返回。
async fn relay_loop(
    processor: Arc<QqProcessor>,
    mut bridge_rx: mpsc::Receiver<BridgeMsg>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            Some(msg) = bridge_rx.recv() => relay(&processor, msg).await,
            _ = &mut shutdown => break,
        }
    }

    while let Ok(msg) = bridge_rx.try_recv() {
        relay(&processor, msg).await;
    }
}

/// 逐行处理输入直到 `/exit` 或输入结束
async fn run<R>(config: &AppConfig, client: Arc<ConsoleClient>, input: R) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let (bridge, bridge_rx) = ChannelBridge::new(64);
    let processor = Arc::new(QqProcessor::new(config, Arc::new(bridge), client.clone()));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let relay_task = tokio::spawn(relay_loop(processor.clone(), bridge_rx, shutdown_rx));

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("读取输入失败")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/exit" {
            break;
        }

        let frame: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "Console", "无法解析的输入: {}", e);
                continue;
            }
        };

        if let Some((group, info)) = onebot::sender_info(&frame) {
            client.remember(group, info).await;
        }

        // 逐条等待处理完成，保证转发顺序与输入一致
        match onebot::decode(&frame) {
            Some(event) => processor.handle(event).await,
            None => debug!(target: "Console", "忽略不支持的事件"),
        }
    }

    // 此时所有消息都已进入通道
    let _ = shutdown_tx.send(());
    relay_task.await.context("回环分发任务异常退出")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let manager = ConfigManager::new(&config_path);
    let config = manager
        .load()
        .await
        .map_err(|e| anyhow!("{}", e))
        .with_context(|| format!("加载配置失败: {}", config_path))?;

    match Level::parse(&config.core.log_level) {
        Some(level) => log::set_level(level),
        None => warn!("未知的日志级别 '{}'，使用 info", config.core.log_level),
    }

    if !config.qq.enabled {
        info!(target: "QQ", "QQ 转发未启用，退出");
        return Ok(());
    }

    info!(target: "Console", "配置文件: {}", manager.path().display());
    info!(target: "Console", "逐行输入 OneBot 事件 JSON，输入 /exit 退出");

    let client = Arc::new(ConsoleClient::new(
        config.qq.coolq_pro,
        Box::new(std::io::stdout()),
    ));
    run(&config, client, BufReader::new(tokio::io::stdin())).await?;

    info!(target: "Console", "再见");
    Ok(())
}
