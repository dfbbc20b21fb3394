use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 本适配器在桥接层中的标识
pub const HANDLER_QQ: &str = "QQ";

/// 客户端名称 (用于消息样式中的 client_short / client_full)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ClientName {
    #[serde(default)]
    pub shortname: String,
    #[serde(default)]
    pub fullname: String,
}

/// 被回复的消息
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ReplyInfo {
    #[serde(default)]
    pub nick: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub message: String,
    /// 被回复内容是否为纯文本 (纯文本会被截断显示)
    #[serde(default)]
    pub is_text: bool,
}

/// 被转发消息的原作者
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ForwardInfo {
    #[serde(default)]
    pub nick: String,
    #[serde(default)]
    pub username: String,
}

/// 附件 (图片等)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Upload {
    pub url: String,
}

impl Upload {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// 消息附加信息
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MsgExtra {
    /// 当前桥接的平台数量
    #[serde(default)]
    pub clients: u32,
    #[serde(default)]
    pub client_name: ClientName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<ForwardInfo>,
    /// `/me` 动作消息
    #[serde(default)]
    pub is_action: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uploads: Vec<Upload>,
    /// 口令红包
    #[serde(default)]
    pub is_cash: bool,
    /// 消息中 @ 到的成员
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ats: Vec<i64>,
}

/// 桥接层统一消息
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BridgeMsg {
    pub from: String,
    pub to: String,
    pub nick: String,
    pub text: String,
    #[serde(default)]
    pub is_notice: bool,
    #[serde(default)]
    pub is_private: bool,
    /// 来源适配器
    #[serde(default)]
    pub handler: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub param: String,
    #[serde(default)]
    pub extra: MsgExtra,
    /// 平台原始数据
    #[serde(default, rename = "_rawdata")]
    pub raw: Value,
}

impl BridgeMsg {
    /// 构建一条来自 QQ 群的通知消息 (加群、退群、管理员、禁言)
    pub fn notice(group: i64, nick: impl Into<String>, text: impl Into<String>, raw: Value) -> Self {
        Self {
            from: group.to_string(),
            to: group.to_string(),
            nick: nick.into(),
            text: text.into(),
            is_notice: true,
            handler: HANDLER_QQ.to_string(),
            raw,
            ..Default::default()
        }
    }

    /// 以原消息为基础生成通知，保留来源与原始数据
    pub fn into_notice(mut self) -> Self {
        self.is_notice = true;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}
