//! QQ 转发处理器
//!
//! 入站：把 QQ 平台事件 (消息、加群、退群、管理员变动、禁言) 转为桥接层消息并分发。
//! 出站：把其他平台转发来的消息按样式模板渲染成 QQ 文本后发送。
//!
//! 分发失败只记录日志，不影响调用方；出站发送失败会返回给调用方。

use crate::bridge::Bridge;
use crate::cache::TtlCache;
use crate::client::{QqClient, SayOptions};
use crate::config::{AppConfig, MessageStyle, NotifyConfig, StyleMode, StyleTemplates};
use crate::cq;
use crate::event::{
    AdminChange, AdminEvent, BanAction, BanEvent, JoinEvent, LeaveEvent, LeaveKind, MemberInfo,
    QqEvent, TextEvent,
};
use crate::message::BridgeMsg;
use crate::template::{self, StyleFields};
use crate::BridgeResult;
use futures_util::future::join_all;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const BANNED_MESSAGE_CAPACITY: usize = 500;
const BANNED_MESSAGE_TTL: Duration = Duration::from_secs(300);
const GROUP_MEMBER_CAPACITY: usize = 500;
const GROUP_MEMBER_TTL: Duration = Duration::from_secs(3600);

/// 回复预览的最大字符数
const REPLY_PREVIEW_LEN: usize = 10;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn member_key(member: i64, group: i64) -> String {
    format!("{}@{}", member, group)
}

pub struct QqProcessor {
    bridge: Arc<dyn Bridge>,
    client: Arc<dyn QqClient>,
    notify: NotifyConfig,
    style: MessageStyle,
    /// 已提示过的口令红包，键为 "群号: 内容"
    banned_messages: Mutex<TtlCache<String, ()>>,
    /// 群成员信息，键为 "QQ号@群号"
    group_members: Mutex<TtlCache<String, MemberInfo>>,
}

impl QqProcessor {
    pub fn new(config: &AppConfig, bridge: Arc<dyn Bridge>, client: Arc<dyn QqClient>) -> Self {
        Self {
            bridge,
            client,
            notify: config.qq.notify,
            style: config.message_style.clone(),
            banned_messages: Mutex::new(TtlCache::new(
                BANNED_MESSAGE_CAPACITY,
                BANNED_MESSAGE_TTL,
            )),
            group_members: Mutex::new(TtlCache::new(GROUP_MEMBER_CAPACITY, GROUP_MEMBER_TTL)),
        }
    }

    // ========================================================================
    // 入站
    // ========================================================================

    /// 处理一条平台事件，不会失败
    pub async fn handle(&self, event: QqEvent) {
        debug!(target: "QQ", "收到 {} 事件 (群 {})", event.kind(), event.group());

        match event {
            QqEvent::Text(e) => self.on_text(e).await,
            QqEvent::Join(e) => self.on_join(e).await,
            QqEvent::Leave(e) => self.on_leave(e).await,
            QqEvent::Admin(e) => self.on_admin(e).await,
            QqEvent::Ban(e) => self.on_ban(e).await,
        }
    }

    async fn on_text(&self, mut event: TextEvent) {
        // 「应用消息」
        if event.is_system() && self.notify.sysmessage {
            self.dispatch(event.to_bridge_msg().into_notice()).await;
            return;
        }

        // 口令红包：同一内容在有效期内只提示一次
        if event.is_cash {
            let key = format!("{}: {}", event.to, event.text);
            let first_seen = {
                let mut banned = lock(&self.banned_messages);
                if banned.has(&key) {
                    false
                } else {
                    banned.set(key, ());
                    true
                }
            };

            if first_seen {
                let text = format!("已暫時屏蔽「{}」", event.text);
                self.dispatch(event.to_bridge_msg().with_text(text).into_notice())
                    .await;
            } else {
                debug!(target: "QQ", "忽略重复的口令红包 (群 {})", event.to);
            }
            return;
        }

        if !event.is_private && !event.ats.is_empty() {
            self.resolve_ats(&mut event).await;
        }

        self.dispatch(event.to_bridge_msg()).await;
    }

    /// 将 @ 的 CQ 码替换为成员显示名，查询并发进行
    async fn resolve_ats(&self, event: &mut TextEvent) {
        let group = event.to;

        let lookups = event.ats.iter().map(|&member| {
            let cached = lock(&self.group_members).get_cloned(&member_key(member, group));
            async move {
                if cached.is_some() {
                    return cached;
                }
                match self.client.group_member_info(group, member).await {
                    Ok(info) => Some(info),
                    Err(e) => {
                        debug!(target: "QQ", "查询群成员 {}@{} 失败: {}", member, group, e);
                        None
                    }
                }
            }
        });

        let infos = join_all(lookups).await;

        for info in infos.into_iter().flatten() {
            let at_text = format!("＠{}", self.client.escape(&self.client.get_nick(&info)));
            event.text = cq::replace_at(&event.text, info.user_id, &at_text);
            lock(&self.group_members).set(member_key(info.user_id, group), info);
        }
    }

    async fn on_join(&self, event: JoinEvent) {
        if !self.notify.join {
            return;
        }

        let text = format!("{} ({}) 加入QQ群", event.target_name, event.target);
        self.dispatch(BridgeMsg::notice(
            event.group,
            event.target_name,
            text,
            event.raw,
        ))
        .await;
    }

    async fn on_leave(&self, event: LeaveEvent) {
        let text = match &event.kind {
            LeaveKind::Quit => format!("{} ({}) 退出QQ群", event.target_name, event.target),
            LeaveKind::Kicked { admin, admin_name } => format!(
                "{} ({}) 被管理員 {} ({}) 踢出QQ群",
                event.target_name, event.target, admin_name, admin
            ),
        };

        // 离群成员的缓存信息不再可信
        lock(&self.group_members).del(&member_key(event.target, event.group));

        if self.notify.leave {
            self.dispatch(BridgeMsg::notice(
                event.group,
                event.target_name,
                text,
                event.raw,
            ))
            .await;
        }
    }

    async fn on_admin(&self, event: AdminEvent) {
        if !self.notify.setadmin {
            return;
        }

        let text = match event.change {
            AdminChange::Unset => format!("{} ({}) 被取消管理員", event.target_name, event.target),
            AdminChange::Set => format!("{} ({}) 成為管理員", event.target_name, event.target),
        };
        self.dispatch(BridgeMsg::notice(
            event.group,
            event.target_name,
            text,
            event.raw,
        ))
        .await;
    }

    async fn on_ban(&self, event: BanEvent) {
        if !self.notify.ban {
            return;
        }

        let text = match &event.action {
            BanAction::Banned { duration } => {
                format!("{} ({}) 被禁言{}", event.target_name, event.target, duration)
            }
            BanAction::Lifted => format!("{} ({}) 被解除禁言", event.target_name, event.target),
        };
        self.dispatch(BridgeMsg::notice(
            event.group,
            event.target_name,
            text,
            event.raw,
        ))
        .await;
    }

    /// 发往桥接层，失败时仅记录，不向上传递
    async fn dispatch(&self, msg: BridgeMsg) {
        if let Err(e) = self.bridge.send(msg).await {
            debug!(target: "QQ", "消息分发失败: {}", e);
        }
    }

    // ========================================================================
    // 出站
    // ========================================================================

    /// 发送来自其他平台的消息，发送失败返回错误
    pub async fn receive(&self, msg: &BridgeMsg) -> BridgeResult<()> {
        let output = self.render(msg);
        self.client
            .say(&msg.to, &output, SayOptions { no_escape: true })
            .await
    }

    /// 按样式模板渲染出最终发送的 QQ 文本
    pub fn render(&self, msg: &BridgeMsg) -> String {
        let fields = style_fields(msg);
        let templates = self.style.templates(style_mode(msg));
        let mut output = self
            .client
            .escape(&template::render(select_template(templates, msg), &fields));

        let uploads = &msg.extra.uploads;
        if self.client.is_coolq_pro() {
            if !uploads.is_empty() {
                output.push('\n');
                for upload in uploads {
                    output.push_str(&cq::image_code(&upload.url));
                }
            }
        } else {
            let links: String = uploads.iter().map(|u| format!(" {}", u.url)).collect();
            output.push_str(&self.client.escape(&links));
        }

        output
    }
}

fn style_fields(msg: &BridgeMsg) -> StyleFields {
    let extra = &msg.extra;
    let mut fields = StyleFields {
        nick: msg.nick.clone(),
        from: msg.from.clone(),
        to: msg.to.clone(),
        text: msg.text.clone(),
        client_short: extra.client_name.shortname.clone(),
        client_full: extra.client_name.fullname.clone(),
        command: msg.command.clone(),
        param: msg.param.clone(),
        ..Default::default()
    };

    if let Some(reply) = &extra.reply {
        fields.reply_nick = Some(reply.nick.clone());
        fields.reply_user = Some(reply.username.clone());
        fields.reply_text = Some(if reply.is_text {
            template::truncate(&reply.message, REPLY_PREVIEW_LEN)
        } else {
            reply.message.clone()
        });
    }

    if let Some(forward) = &extra.forward {
        fields.forward_nick = Some(forward.nick.clone());
        fields.forward_user = Some(forward.username.clone());
    }

    fields
}

/// 三个及以上平台互联时，使用带来源标识的样式
fn style_mode(msg: &BridgeMsg) -> StyleMode {
    let extra = &msg.extra;
    if extra.clients >= 3 && (!extra.client_name.shortname.is_empty() || msg.is_notice) {
        StyleMode::Complex
    } else {
        StyleMode::Simple
    }
}

fn select_template<'a>(templates: &'a StyleTemplates, msg: &BridgeMsg) -> &'a str {
    if msg.is_notice {
        &templates.notice
    } else if msg.extra.is_action {
        &templates.action
    } else if msg.extra.reply.is_some() {
        &templates.reply
    } else if msg.extra.forward.is_some() {
        &templates.forward
    } else {
        &templates.message
    }
}
