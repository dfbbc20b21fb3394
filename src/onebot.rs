//! OneBot v11 事件解析
//!
//! 把 OneBot 实现 (NapCat、go-cqhttp 等) 推送的 JSON 帧转换为 [`QqEvent`]。

use crate::cq;
use crate::event::{
    AdminChange, AdminEvent, BanAction, BanEvent, JoinEvent, LeaveEvent, LeaveKind, MemberInfo,
    QqEvent, TextEvent,
};
use serde_json::Value;

/// 解析一帧 OneBot 事件，不关心的事件返回 `None`
pub fn decode(json: &Value) -> Option<QqEvent> {
    match json["post_type"].as_str()? {
        "message" => convert_message_event(json),
        "notice" => convert_notice_event(json),
        _ => None,
    }
}

/// 从消息帧中提取发送者的群成员信息
pub fn sender_info(json: &Value) -> Option<(i64, MemberInfo)> {
    if json["post_type"].as_str()? != "message" || json["message_type"].as_str()? != "group" {
        return None;
    }

    let group = as_id(&json["group_id"])?;
    let sender = &json["sender"];
    let user_id = as_id(&json["user_id"]).or_else(|| as_id(&sender["user_id"]))?;

    Some((
        group,
        MemberInfo {
            user_id,
            nickname: sender["nickname"].as_str().unwrap_or("").to_string(),
            card: sender["card"].as_str().unwrap_or("").to_string(),
        },
    ))
}

/// id 字段可能是数字，也可能是数字字符串
fn as_id(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn convert_message_event(json: &Value) -> Option<QqEvent> {
    let is_private = match json["message_type"].as_str()? {
        "private" => true,
        "group" => false,
        _ => return None,
    };

    let sender = &json["sender"];
    let from = as_id(&json["user_id"]).or_else(|| as_id(&sender["user_id"]))?;
    let to = if is_private {
        from
    } else {
        as_id(&json["group_id"])?
    };

    let nick = [&sender["card"], &sender["nickname"]]
        .into_iter()
        .filter_map(|v| v.as_str())
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| from.to_string());

    let text = parse_onebot_message(&json["message"]);

    Some(QqEvent::Text(TextEvent {
        from,
        to,
        nick,
        is_private,
        is_cash: is_cash(&text),
        ats: cq::extract_ats(&text),
        text,
        raw: json.clone(),
    }))
}

fn convert_notice_event(json: &Value) -> Option<QqEvent> {
    let notice_type = json["notice_type"].as_str()?;
    let sub_type = json["sub_type"].as_str();

    let group = as_id(&json["group_id"])?;
    let target = as_id(&json["user_id"])?;
    // 通知中不携带昵称，以 QQ 号代替
    let target_name = target.to_string();
    let raw = json.clone();

    let event = match notice_type {
        "group_increase" => QqEvent::Join(JoinEvent {
            group,
            target,
            target_name,
            raw,
        }),

        "group_decrease" => {
            let kind = match sub_type {
                Some("leave") => LeaveKind::Quit,
                Some("kick") => {
                    let admin = as_id(&json["operator_id"]).unwrap_or(0);
                    LeaveKind::Kicked {
                        admin,
                        admin_name: admin.to_string(),
                    }
                }
                // 机器人自己被踢
                _ => return None,
            };
            QqEvent::Leave(LeaveEvent {
                group,
                target,
                target_name,
                kind,
                raw,
            })
        }

        "group_admin" => {
            let change = match sub_type? {
                "set" => AdminChange::Set,
                "unset" => AdminChange::Unset,
                _ => return None,
            };
            QqEvent::Admin(AdminEvent {
                group,
                target,
                target_name,
                change,
                raw,
            })
        }

        "group_ban" => {
            let action = match sub_type? {
                "ban" => BanAction::Banned {
                    duration: format_duration(json["duration"].as_u64().unwrap_or(0)),
                },
                "lift_ban" => BanAction::Lifted,
                _ => return None,
            };
            QqEvent::Ban(BanEvent {
                group,
                target,
                target_name,
                action,
                raw,
            })
        }

        _ => return None,
    };

    Some(event)
}

/// 红包消息
fn is_cash(text: &str) -> bool {
    text.contains("[CQ:hb") || text.contains("[CQ:redbag") || text.starts_with("[QQ红包]")
}

/// 将消息段数组还原为 CQ 码字符串，字符串格式的消息原样返回
fn parse_onebot_message(message: &Value) -> String {
    if let Some(s) = message.as_str() {
        return s.to_string();
    }

    let mut result = String::new();
    if let Some(arr) = message.as_array() {
        for seg in arr {
            let seg_type = seg["type"].as_str().unwrap_or("text");
            let data = &seg["data"];

            if seg_type == "text" {
                result.push_str(&cq::escape(data["text"].as_str().unwrap_or("")));
                continue;
            }

            result.push_str("[CQ:");
            result.push_str(seg_type);
            if let Some(params) = data.as_object() {
                for (key, value) in params {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        Value::Null => continue,
                        other => other.to_string(),
                    };
                    result.push(',');
                    result.push_str(key);
                    result.push('=');
                    result.push_str(&cq::escape_param(&value));
                }
            }
            result.push(']');
        }
    }
    result
}

/// 禁言时长，例如 `1天2小時3分鐘4秒`
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "0秒".to_string();
    }

    let units = [(86400, "天"), (3600, "小時"), (60, "分鐘"), (1, "秒")];
    let mut rest = seconds;
    let mut out = String::new();
    for (size, name) in units {
        let n = rest / size;
        rest %= size;
        if n > 0 {
            out.push_str(&format!("{}{}", n, name));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group_message(message: Value) -> Value {
        json!({
            "post_type": "message",
            "message_type": "group",
            "group_id": 100,
            "user_id": 10,
            "message": message,
            "sender": {"user_id": 10, "nickname": "bob", "card": "Bob"}
        })
    }

    #[test]
    fn decodes_group_text() {
        let Some(QqEvent::Text(ev)) =
            decode(&group_message(json!("hi [CQ:at,qq=11] [CQ:at,qq=all]")))
        else {
            panic!("expected text event");
        };
        assert_eq!(ev.from, 10);
        assert_eq!(ev.to, 100);
        assert_eq!(ev.nick, "Bob");
        assert!(!ev.is_private);
        assert!(!ev.is_cash);
        assert_eq!(ev.ats, vec![11]);
        assert_eq!(ev.raw["group_id"], 100);
    }

    #[test]
    fn decodes_private_text_with_nick_fallback() {
        let frame = json!({
            "post_type": "message",
            "message_type": "private",
            "user_id": "42",
            "message": "yo",
            "sender": {"nickname": "", "card": ""}
        });
        let Some(QqEvent::Text(ev)) = decode(&frame) else {
            panic!("expected text event");
        };
        assert!(ev.is_private);
        assert_eq!(ev.to, 42);
        assert_eq!(ev.nick, "42");
    }

    #[test]
    fn segments_render_as_cq_codes() {
        let frame = group_message(json!([
            {"type": "text", "data": {"text": "a[1] "}},
            {"type": "at", "data": {"qq": 11}},
            {"type": "image", "data": {"file": "x,y.png"}}
        ]));
        let Some(QqEvent::Text(ev)) = decode(&frame) else {
            panic!("expected text event");
        };
        assert_eq!(ev.text, "a&#91;1&#93; [CQ:at,qq=11][CQ:image,file=x&#44;y.png]");
        assert_eq!(ev.ats, vec![11]);
    }

    #[test]
    fn detects_red_packets() {
        for message in ["[CQ:hb,title=恭喜发财]", "[CQ:redbag,title=x]", "[QQ红包]口令"] {
            let Some(QqEvent::Text(ev)) = decode(&group_message(json!(message))) else {
                panic!("expected text event");
            };
            assert!(ev.is_cash, "{}", message);
        }
    }

    fn notice(notice_type: &str, sub_type: &str) -> Value {
        json!({
            "post_type": "notice",
            "notice_type": notice_type,
            "sub_type": sub_type,
            "group_id": 100,
            "user_id": 10,
            "operator_id": 1,
            "duration": 3723
        })
    }

    #[test]
    fn decodes_member_notices() {
        assert!(matches!(
            decode(&notice("group_increase", "approve")),
            Some(QqEvent::Join(JoinEvent { group: 100, target: 10, .. }))
        ));

        let Some(QqEvent::Leave(leave)) = decode(&notice("group_decrease", "leave")) else {
            panic!("expected leave");
        };
        assert_eq!(leave.kind, LeaveKind::Quit);
        assert_eq!(leave.target_name, "10");

        let Some(QqEvent::Leave(kick)) = decode(&notice("group_decrease", "kick")) else {
            panic!("expected kick");
        };
        assert_eq!(
            kick.kind,
            LeaveKind::Kicked {
                admin: 1,
                admin_name: "1".into()
            }
        );

        assert!(decode(&notice("group_decrease", "kick_me")).is_none());
    }

    #[test]
    fn decodes_admin_and_ban_notices() {
        let Some(QqEvent::Admin(admin)) = decode(&notice("group_admin", "unset")) else {
            panic!("expected admin");
        };
        assert_eq!(admin.change, AdminChange::Unset);

        let Some(QqEvent::Ban(ban)) = decode(&notice("group_ban", "ban")) else {
            panic!("expected ban");
        };
        assert_eq!(
            ban.action,
            BanAction::Banned {
                duration: "1小時2分鐘3秒".into()
            }
        );

        let Some(QqEvent::Ban(lift)) = decode(&notice("group_ban", "lift_ban")) else {
            panic!("expected lift");
        };
        assert_eq!(lift.action, BanAction::Lifted);
    }

    #[test]
    fn ignores_other_frames() {
        assert!(decode(&json!({"post_type": "meta_event"})).is_none());
        assert!(decode(&notice("group_recall", "")).is_none());
        assert!(decode(&json!("not an object")).is_none());
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(0), "0秒");
        assert_eq!(format_duration(600), "10分鐘");
        assert_eq!(format_duration(93784), "1天2小時3分鐘4秒");
    }

    #[test]
    fn sender_info_from_group_frames_only() {
        let (group, info) = sender_info(&group_message(json!("hi"))).unwrap();
        assert_eq!(group, 100);
        assert_eq!(info.display_name(), "Bob");

        let private = json!({"post_type": "message", "message_type": "private", "user_id": 1});
        assert!(sender_info(&private).is_none());
    }
}
