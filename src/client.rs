use crate::BridgeResult;
use crate::cq;
use crate::event::MemberInfo;
use async_trait::async_trait;

/// 发送选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SayOptions {
    /// 文本已转义 (含 CQ 码)，客户端不应再次转义
    pub no_escape: bool,
}

/// QQ 客户端接口
#[async_trait]
pub trait QqClient: Send + Sync {
    /// 向群 (或私聊对象) 发送文本
    async fn say(&self, target: &str, text: &str, options: SayOptions) -> BridgeResult<()>;

    /// 查询群成员信息
    async fn group_member_info(&self, group: i64, member: i64) -> BridgeResult<MemberInfo>;

    /// 转义纯文本为 CQ 安全文本
    fn escape(&self, text: &str) -> String {
        cq::escape(text)
    }

    /// 成员显示名
    fn get_nick(&self, info: &MemberInfo) -> String {
        info.display_name()
    }

    /// 是否支持直接插入图片
    fn is_coolq_pro(&self) -> bool {
        false
    }
}
