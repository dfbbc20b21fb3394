//! CQ 码工具
//!
//! QQ 端的消息文本以 CQ 码表示富文本，例如 `[CQ:at,qq=10001]`、
//! `[CQ:image,file=...]`。纯文本中的 `&`、`[`、`]` 必须转义，
//! CQ 码参数值中还需转义 `,`。

use regex::Regex;
use std::sync::LazyLock;

static AT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[CQ:at,qq=(\d+)\]").expect("valid at regex"));

/// 转义纯文本
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('[', "&#91;")
        .replace(']', "&#93;")
}

/// 转义 CQ 码参数值
pub fn escape_param(text: &str) -> String {
    escape(text).replace(',', "&#44;")
}

/// `escape_param` 的逆操作
pub fn unescape(text: &str) -> String {
    text.replace("&#44;", ",")
        .replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&amp;", "&")
}

pub fn at_code(id: i64) -> String {
    format!("[CQ:at,qq={}]", id)
}

pub fn image_code(file: &str) -> String {
    format!("[CQ:image,file={}]", escape_param(file))
}

/// 将文本中 @ 指定成员的 CQ 码全部替换
pub fn replace_at(text: &str, id: i64, replacement: &str) -> String {
    text.replace(&at_code(id), replacement)
}

/// 提取文本中所有被 @ 的成员 (去重，保持出现顺序)，`qq=all` 不计入
pub fn extract_ats(text: &str) -> Vec<i64> {
    let mut ids = Vec::new();
    for caps in AT_RE.captures_iter(text) {
        if let Ok(id) = caps[1].parse::<i64>()
            && !ids.contains(&id)
        {
            ids.push(id);
        }
    }
    ids
}
