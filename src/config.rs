use crate::BridgeResult;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

// ============================================================================
// 配置结构
// ============================================================================

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub core: CoreConfig,
    /// QQ 平台选项
    #[serde(default)]
    pub qq: QqConfig,
    /// 各平台共享的消息样式
    #[serde(default)]
    pub message_style: MessageStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// 日志级别: debug / info / warn / error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QqConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 客户端支持直接发送图片 (CoolQ Pro)
    #[serde(default)]
    pub coolq_pro: bool,
    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_true() -> bool {
    true
}

impl Default for QqConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            coolq_pro: false,
            notify: NotifyConfig::default(),
        }
    }
}

/// 群事件通知开关，默认全部关闭
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NotifyConfig {
    #[serde(default)]
    pub join: bool,
    #[serde(default)]
    pub leave: bool,
    #[serde(default)]
    pub setadmin: bool,
    #[serde(default)]
    pub ban: bool,
    /// 转发「应用消息」
    #[serde(default)]
    pub sysmessage: bool,
}

/// 消息样式，按复杂度分为两套
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageStyle {
    #[serde(default = "StyleTemplates::simple")]
    pub simple: StyleTemplates,
    #[serde(default = "StyleTemplates::complex")]
    pub complex: StyleTemplates,
}

impl Default for MessageStyle {
    fn default() -> Self {
        Self {
            simple: StyleTemplates::simple(),
            complex: StyleTemplates::complex(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleMode {
    Simple,
    Complex,
}

impl MessageStyle {
    pub fn templates(&self, mode: StyleMode) -> &StyleTemplates {
        match mode {
            StyleMode::Simple => &self.simple,
            StyleMode::Complex => &self.complex,
        }
    }
}

/// 一套消息模板
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StyleTemplates {
    pub message: String,
    pub reply: String,
    pub forward: String,
    pub action: String,
    pub notice: String,
}

impl StyleTemplates {
    pub fn simple() -> Self {
        Self {
            message: "[{nick}] {text}".to_string(),
            reply: "[{nick}] Re {reply_nick} 「{reply_text}」: {text}".to_string(),
            forward: "[{nick}] Fwd {forward_nick}: {text}".to_string(),
            action: "* {nick} {text}".to_string(),
            notice: "< {text} >".to_string(),
        }
    }

    pub fn complex() -> Self {
        Self {
            message: "[{client_short} - {nick}] {text}".to_string(),
            reply: "[{client_short} - {nick}] Re {reply_nick} 「{reply_text}」: {text}"
                .to_string(),
            forward: "[{client_short} - {nick}] Fwd {forward_nick}: {text}".to_string(),
            action: "* {client_short} - {nick} {text}".to_string(),
            notice: "< {client_full}: {text} >".to_string(),
        }
    }
}

// ============================================================================
// 配置管理器
// ============================================================================

/// 配置文件读写，只负责磁盘上的 TOML 文件，不缓存内容
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取配置，文件不存在时写入默认配置并返回
    pub async fn load(&self) -> BridgeResult<AppConfig> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let cfg = AppConfig::default();
                self.save_atomic(&cfg).await?;
                Ok(cfg)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 先写入 `<name>.toml.tmp`，落盘后 rename 覆盖目标文件
    pub async fn save_atomic(&self, cfg: &AppConfig) -> BridgeResult<()> {
        let content = toml::to_string_pretty(cfg)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.path.with_extension("toml.tmp");
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}
