use crate::message::{BridgeMsg, HANDLER_QQ, MsgExtra};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// QQ 系统账号 (「应用消息」的发送者)
pub const SYSTEM_USER_ID: i64 = 1_000_000;

// ================== 事件定义 ==================

/// QQ 平台事件
#[derive(Debug, Clone)]
pub enum QqEvent {
    Text(TextEvent),
    Join(JoinEvent),
    Leave(LeaveEvent),
    Admin(AdminEvent),
    Ban(BanEvent),
}

impl QqEvent {
    /// 事件名称，用于日志
    pub fn kind(&self) -> &'static str {
        match self {
            QqEvent::Text(_) => "text",
            QqEvent::Join(_) => "join",
            QqEvent::Leave(_) => "leave",
            QqEvent::Admin(_) => "admin",
            QqEvent::Ban(_) => "ban",
        }
    }

    /// 事件所属群号 (私聊返回对方 QQ 号)
    pub fn group(&self) -> i64 {
        match self {
            QqEvent::Text(e) => e.to,
            QqEvent::Join(e) => e.group,
            QqEvent::Leave(e) => e.group,
            QqEvent::Admin(e) => e.group,
            QqEvent::Ban(e) => e.group,
        }
    }
}

/// 聊天消息
#[derive(Debug, Clone, Default)]
pub struct TextEvent {
    /// 发送者 QQ 号
    pub from: i64,
    /// 群号；私聊时为对方 QQ 号
    pub to: i64,
    pub nick: String,
    /// 带 CQ 码的消息文本
    pub text: String,
    pub is_private: bool,
    /// 口令红包
    pub is_cash: bool,
    /// 被 @ 的成员
    pub ats: Vec<i64>,
    pub raw: Value,
}

impl TextEvent {
    pub fn is_system(&self) -> bool {
        self.from == SYSTEM_USER_ID
    }

    /// 转为桥接层消息
    pub fn to_bridge_msg(&self) -> BridgeMsg {
        BridgeMsg {
            from: self.from.to_string(),
            to: self.to.to_string(),
            nick: self.nick.clone(),
            text: self.text.clone(),
            is_private: self.is_private,
            handler: HANDLER_QQ.to_string(),
            extra: MsgExtra {
                is_cash: self.is_cash,
                ats: self.ats.clone(),
                ..Default::default()
            },
            raw: self.raw.clone(),
            ..Default::default()
        }
    }
}

/// 成员入群
#[derive(Debug, Clone, Default)]
pub struct JoinEvent {
    pub group: i64,
    pub target: i64,
    pub target_name: String,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveKind {
    /// 主动退群
    Quit,
    /// 被管理员踢出
    Kicked { admin: i64, admin_name: String },
}

/// 成员离群
#[derive(Debug, Clone)]
pub struct LeaveEvent {
    pub group: i64,
    pub target: i64,
    pub target_name: String,
    pub kind: LeaveKind,
    pub raw: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminChange {
    Set,
    Unset,
}

/// 管理员变动
#[derive(Debug, Clone)]
pub struct AdminEvent {
    pub group: i64,
    pub target: i64,
    pub target_name: String,
    pub change: AdminChange,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanAction {
    /// 禁言，附带可读的时长文本
    Banned { duration: String },
    Lifted,
}

/// 禁言与解禁
#[derive(Debug, Clone)]
pub struct BanEvent {
    pub group: i64,
    pub target: i64,
    pub target_name: String,
    pub action: BanAction,
    pub raw: Value,
}

// ================== 群成员信息 ==================

/// 群成员信息 (get_group_member_info 的结果)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct MemberInfo {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    /// 群名片，可能为空
    #[serde(default)]
    pub card: String,
}

impl MemberInfo {
    /// 显示名称：优先群名片，其次昵称，最后 QQ 号
    pub fn display_name(&self) -> String {
        if !self.card.is_empty() {
            self.card.clone()
        } else if !self.nickname.is_empty() {
            self.nickname.clone()
        } else {
            self.user_id.to_string()
        }
    }
}
