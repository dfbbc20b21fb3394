//! 消息样式模板
//!
//! 模板使用 `{name}` 形式的具名占位符，`{{` 与 `}}` 输出字面量花括号。
//! 字段集合固定 (见 [`StyleFields`])，未知或缺失的字段渲染为空字符串。

/// 模板可用字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleFields {
    pub nick: String,
    pub from: String,
    pub to: String,
    pub text: String,
    pub client_short: String,
    pub client_full: String,
    pub command: String,
    pub param: String,
    pub reply_nick: Option<String>,
    pub reply_user: Option<String>,
    pub reply_text: Option<String>,
    pub forward_nick: Option<String>,
    pub forward_user: Option<String>,
}

impl StyleFields {
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "nick" => Some(&self.nick),
            "from" => Some(&self.from),
            "to" => Some(&self.to),
            "text" => Some(&self.text),
            "client_short" => Some(&self.client_short),
            "client_full" => Some(&self.client_full),
            "command" => Some(&self.command),
            "param" => Some(&self.param),
            "reply_nick" => self.reply_nick.as_deref(),
            "reply_user" => self.reply_user.as_deref(),
            "reply_text" => self.reply_text.as_deref(),
            "forward_nick" => self.forward_nick.as_deref(),
            "forward_user" => self.forward_user.as_deref(),
            _ => None,
        }
    }
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// 渲染模板
pub fn render(template: &str, fields: &StyleFields) -> String {
    let mut out = String::with_capacity(template.len() + fields.text.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
        } else {
            match tail[1..].find('}') {
                Some(end) if is_field_name(&tail[1..1 + end]) => {
                    out.push_str(fields.get(&tail[1..1 + end]).unwrap_or(""));
                    rest = &tail[end + 2..];
                }
                Some(_) => {
                    out.push('{');
                    rest = &tail[1..];
                }
                None => {
                    // 未闭合，原样输出
                    out.push_str(tail);
                    rest = "";
                }
            }
        }
    }

    out.push_str(rest);
    out
}

/// 去掉换行，超过 `max_len` 个字符时截断并追加 `...`
pub fn truncate(s: &str, max_len: usize) -> String {
    let flat: String = s.chars().filter(|&c| c != '\n').collect();
    if flat.chars().count() > max_len {
        let kept: String = flat.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        flat
    }
}
