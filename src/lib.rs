// lib.rs
//
// ================================================================================
// qqbridge - QQ 转发处理器
//
// 将 QQ 平台事件转换为桥接层的统一消息格式，并把其他平台转发来的消息
// 渲染成 QQ 文本 (CQ 码) 后投递。
// ================================================================================

#[macro_use]
pub mod log;

pub mod bridge;
pub mod cache;
pub mod client;
pub mod config;
pub mod cq;
pub mod event;
pub mod message;
pub mod onebot;
pub mod processor;
pub mod template;

// ============================================================================
// 错误类型 (统一错误处理)
// ============================================================================

/// 桥接核心错误类型
pub type BridgeError = Box<dyn std::error::Error + Send + Sync>;

pub type BridgeResult<T> = Result<T, BridgeError>;

// ============================================================================
// 重新导出
// ============================================================================

pub mod prelude {
    //! 常用类型的预导入模块
    //!
    //! ```rust
    //! use qqbridge::prelude::*;
    //! ```

    // 1. 错误处理
    pub use super::{BridgeError, BridgeResult};

    // 2. 协作方接口
    pub use super::bridge::{Bridge, ChannelBridge};
    pub use super::client::{QqClient, SayOptions};

    // 3. 配置
    pub use super::config::{AppConfig, ConfigManager, MessageStyle, NotifyConfig, QqConfig};

    // 4. 数据模型
    pub use super::event::{
        AdminChange, AdminEvent, BanAction, BanEvent, JoinEvent, LeaveEvent, LeaveKind,
        MemberInfo, QqEvent, TextEvent,
    };
    pub use super::message::{BridgeMsg, ClientName, ForwardInfo, MsgExtra, ReplyInfo, Upload};

    // 5. 核心组件
    pub use super::cache::TtlCache;
    pub use super::processor::QqProcessor;

    // 6. 工具模块
    pub use super::{cq, onebot, template};

    // 7. 外部依赖
    pub use async_trait::async_trait;
}
